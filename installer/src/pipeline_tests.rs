//! Unit tests for pipeline orchestration.

use super::*;
use crate::config::{FileConfig, Overrides};
use crate::dirs::NoBaseDirs;
use crate::error::InstallerError;
use crate::fetch::download::{HttpDownloader, file_url};
use crate::fetch::extraction::TarGzExtractor;
use crate::install::{BIN_DIR, BUILD_DIR, LIBEXEC_DIR, VENV_BIN_DIR, venv_python};
use crate::receipt::read_receipt;
use crate::test_utils::{
    ExpectedCall, StubExecutor, failure_output, stdout_output, success_output, write_sdist,
};
use rstest::{fixture, rstest};

struct Fixture {
    _temp: tempfile::TempDir,
    root: Utf8PathBuf,
    settings: Settings,
    descriptor_path: Utf8PathBuf,
}

impl Fixture {
    fn prefix(&self) -> Utf8PathBuf {
        self.root.join("Cellar").join("gen-commit").join("0.5.3")
    }

    fn sdist(&self, name: &str, top_dir: &str) -> (String, String) {
        let path = self.root.join("mirror").join(format!("{top_dir}.tar.gz"));
        std::fs::create_dir_all(path.parent().expect("mirror dir")).expect("create mirror");
        let digest = write_sdist(
            path.as_std_path(),
            top_dir,
            &[("pyproject.toml", format!("[project]\nname = \"{name}\"\n").as_bytes())],
        )
        .expect("write sdist");
        (file_url(path.as_std_path()), digest.into_inner())
    }
}

#[fixture]
fn fixture() -> Fixture {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
    let settings = Settings::resolve(
        FileConfig {
            prefix_root: Some(root.join("Cellar")),
            cache_dir: Some(root.join("cache")),
            ..FileConfig::default()
        },
        Overrides::default(),
        &NoBaseDirs,
    );
    let fixture = Fixture {
        _temp: temp,
        descriptor_path: root.join("gen-commit.toml"),
        root,
        settings,
    };

    let (source_url, source_sha) = fixture.sdist("gen-commit", "gen-commit-0.5.3");
    let (tomli_url, tomli_sha) = fixture.sdist("tomli", "tomli-2.0.1");
    let text = format!(
        r#"
name = "gen-commit"
version = "0.5.3"
source_url = "{source_url}"
source_checksum = "{source_sha}"
build_dependencies = ["python@3.12"]

[[bundled_resources]]
name = "tomli"
source_url = "{tomli_url}"
source_checksum = "{tomli_sha}"

[test_procedure]
command = "gencommit"
args = ["--version"]
"#
    );
    std::fs::write(&fixture.descriptor_path, text).expect("write descriptor");
    fixture
}

fn pip_call(prefix: &Utf8Path, name: &str, top_dir: &str) -> ExpectedCall {
    let root = prefix.join(BUILD_DIR).join(name).join(top_dir);
    ExpectedCall::new(
        venv_python(prefix).as_str(),
        [
            "-m",
            "pip",
            "install",
            "--no-deps",
            "--ignore-installed",
            root.as_str(),
        ],
        Ok(success_output()),
    )
}

fn install_calls(prefix: &Utf8Path) -> Vec<ExpectedCall> {
    vec![
        ExpectedCall::new("python3.12", ["--version"], Ok(stdout_output("Python 3.12.4"))),
        ExpectedCall::new(
            "python3.12",
            ["-m", "venv", prefix.join(LIBEXEC_DIR).as_str()],
            Ok(success_output()),
        )
        .creating(venv_python(prefix)),
        pip_call(prefix, "tomli", "tomli-2.0.1"),
        pip_call(prefix, "gen-commit", "gen-commit-0.5.3")
            .creating(prefix.join(LIBEXEC_DIR).join(VENV_BIN_DIR).join("gencommit")),
    ]
}

fn smoke_call(prefix: &Utf8Path, output: std::process::Output) -> ExpectedCall {
    ExpectedCall::new(
        prefix.join(BIN_DIR).join("gencommit").as_str(),
        ["--version"],
        Ok(output),
    )
}

fn run(
    fixture: &Fixture,
    executor: &StubExecutor,
    options: &PipelineOptions,
) -> (Result<PipelineOutcome>, String) {
    let downloader = HttpDownloader::default();
    let extractor = TarGzExtractor;
    let context = PipelineContext {
        settings: &fixture.settings,
        executor,
        downloader: &downloader,
        extractor: &extractor,
        quiet: false,
    };
    let mut stderr = Vec::new();
    let result = run_pipeline(&context, &fixture.descriptor_path, options, &mut stderr);
    (result, String::from_utf8(stderr).expect("UTF-8 output"))
}

#[rstest]
fn installs_and_smoke_tests_into_default_prefix(fixture: Fixture) {
    let prefix = fixture.prefix();
    let mut calls = install_calls(&prefix);
    calls.push(smoke_call(&prefix, stdout_output("gencommit 0.5.3\n")));
    let executor = StubExecutor::new(calls);

    let (result, stderr) = run(&fixture, &executor, &PipelineOptions::default());

    executor.assert_finished();
    match result.expect("pipeline succeeds") {
        PipelineOutcome::Installed {
            installation,
            smoke,
        } => {
            assert_eq!(installation.prefix, prefix);
            assert!(matches!(smoke, Some(SmokeOutcome::Passed { .. })));
        }
        other => panic!("expected an install, got {other:?}"),
    }
    assert_eq!(read_receipt(&prefix).expect("receipt").version(), "0.5.3");
    assert!(stderr.contains("Validated gen-commit 0.5.3 (1 bundled resources)"));
    assert!(stderr.contains("Fetching tomli from"));
    assert!(stderr.contains("Smoke test passed: gencommit --version"));
    assert!(stderr.contains("1 executable"));
}

#[rstest]
fn skip_test_does_not_run_the_smoke_test(fixture: Fixture) {
    let prefix = fixture.prefix();
    let executor = StubExecutor::new(install_calls(&prefix));
    let options = PipelineOptions {
        skip_test: true,
        ..PipelineOptions::default()
    };

    let (result, _) = run(&fixture, &executor, &options);

    executor.assert_finished();
    assert!(matches!(
        result.expect("pipeline succeeds"),
        PipelineOutcome::Installed { smoke: None, .. }
    ));
}

#[rstest]
fn second_install_uses_the_cache(fixture: Fixture) {
    let prefix = fixture.prefix();
    let executor = StubExecutor::new(install_calls(&prefix));
    let options = PipelineOptions {
        skip_test: true,
        ..PipelineOptions::default()
    };
    run(&fixture, &executor, &options).0.expect("first install");

    let reinstall_executor = StubExecutor::new(install_calls(&prefix));
    let reinstall = PipelineOptions {
        force: true,
        ..options
    };
    let (result, stderr) = run(&fixture, &reinstall_executor, &reinstall);

    result.expect("second install");
    assert!(stderr.contains("Using cached gen-commit"));
    assert!(stderr.contains("(0 downloaded)"));
}

#[rstest]
fn dry_run_changes_nothing(fixture: Fixture) {
    let executor = StubExecutor::new(Vec::new());
    let options = PipelineOptions {
        dry_run: true,
        ..PipelineOptions::default()
    };

    let (result, stderr) = run(&fixture, &executor, &options);

    assert!(matches!(result.expect("dry run"), PipelineOutcome::DryRun { .. }));
    assert!(executor.invocations().is_empty());
    assert!(!fixture.root.join("Cellar").exists());
    assert!(!fixture.root.join("cache").exists());
    assert!(stderr.contains("Dry run"));
}

#[rstest]
fn explicit_prefix_wins(fixture: Fixture) {
    let prefix = fixture.root.join("opt").join("gen-commit");
    let executor = StubExecutor::new(install_calls(&prefix));
    let options = PipelineOptions {
        prefix: Some(prefix.clone()),
        skip_test: true,
        ..PipelineOptions::default()
    };

    let (result, _) = run(&fixture, &executor, &options);

    result.expect("pipeline succeeds");
    assert!(prefix.join(BIN_DIR).join("gencommit").exists());
    assert!(!fixture.prefix().exists());
}

#[rstest]
fn smoke_failure_keeps_the_install(fixture: Fixture) {
    let prefix = fixture.prefix();
    let mut calls = install_calls(&prefix);
    calls.push(smoke_call(&prefix, failure_output("ModuleNotFoundError: tomli")));
    let executor = StubExecutor::new(calls);

    let (result, _) = run(&fixture, &executor, &PipelineOptions::default());

    let err = result.expect_err("smoke test fails");
    assert!(matches!(err, InstallerError::SmokeTest { .. }));
    assert!(prefix.join(BIN_DIR).join("gencommit").exists());
}

#[rstest]
fn tampered_archive_stops_before_install(fixture: Fixture) {
    let tampered = fixture.root.join("mirror").join("tomli-2.0.1.tar.gz");
    std::fs::write(&tampered, b"not the archive you are looking for").expect("tamper");
    let executor = StubExecutor::new(Vec::new());

    let (result, _) = run(&fixture, &executor, &PipelineOptions::default());

    assert!(matches!(
        result.expect_err("integrity failure"),
        InstallerError::Integrity { .. }
    ));
    assert!(executor.invocations().is_empty());
    assert!(!fixture.prefix().exists());
}

#[rstest]
fn invalid_descriptor_is_reported_before_anything_else(fixture: Fixture) {
    std::fs::write(&fixture.descriptor_path, "name = \"gen-commit\"\n").expect("write descriptor");
    let executor = StubExecutor::new(Vec::new());

    let (result, _) = run(&fixture, &executor, &PipelineOptions::default());

    assert!(matches!(
        result.expect_err("invalid descriptor"),
        InstallerError::Descriptor(_)
    ));
}

#[rstest]
fn quiet_context_writes_nothing(fixture: Fixture) {
    let prefix = fixture.prefix();
    let mut calls = install_calls(&prefix);
    calls.push(smoke_call(&prefix, success_output()));
    let executor = StubExecutor::new(calls);
    let downloader = HttpDownloader::default();
    let context = PipelineContext {
        settings: &fixture.settings,
        executor: &executor,
        downloader: &downloader,
        extractor: &TarGzExtractor,
        quiet: true,
    };
    let mut stderr = Vec::new();

    run_pipeline(
        &context,
        &fixture.descriptor_path,
        &PipelineOptions::default(),
        &mut stderr,
    )
    .expect("pipeline succeeds");

    assert!(stderr.is_empty());
}

#[test]
fn missing_prefix_root_is_reported() {
    let settings = Settings::resolve(FileConfig::default(), Overrides::default(), &NoBaseDirs);
    let text = format!(
        "name = \"demo\"\nsource_url = \"https://example.test/demo-1.0.tar.gz\"\nsource_checksum = \"{}\"\n",
        "ab".repeat(32)
    );
    let descriptor =
        keg_descriptor::parse_and_validate(&text, keg_descriptor::DescriptorFormat::Toml)
            .expect("valid descriptor");

    let err = target_prefix(None, &settings, &descriptor).expect_err("no prefix root");
    assert!(matches!(err, InstallerError::MissingDirectory { .. }));
}
