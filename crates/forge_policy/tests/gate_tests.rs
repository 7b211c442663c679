//! Integration tests for the validation gate.
//!
//! Most tests drive the gate through `MockSandbox` so tool output can be
//! scripted; a few run real shell commands through `LocalSandbox`.

use std::sync::Arc;

use forge_oracle::ScriptedOracle;
use forge_policy::{CheckKind, CheckSpec, GateConfig, ValidationGate};
use forge_runner::{LocalSandbox, MockResponse, MockSandbox, SandboxProvider};

/// Every check passes when every command exits 0 and the review is clean.
#[tokio::test]
async fn test_all_checks_pass() {
    let sandbox = MockSandbox::new();
    let oracle = ScriptedOracle::new().reply("NONE");
    let mut session = sandbox.create().await.unwrap();
    session.write_file("src/index.ts", "export {};\n").unwrap();

    let gate = ValidationGate::new(GateConfig::default(), Arc::new(sandbox.clone()))
        .with_oracle(Arc::new(oracle.clone()));
    let result = gate.validate(&session).await;

    assert!(result.all_passed);
    assert_eq!(result.checks.len(), 6);
    assert_eq!(oracle.call_count(), 1);

    // Tool checks ran in the fixed order
    let commands: Vec<String> = sandbox.commands().iter().map(|c| c.command.display()).collect();
    let position = |needle: &str| commands.iter().position(|c| c.contains(needle)).unwrap();
    assert!(position("npm install") < position("lint"));
    assert!(position("lint") < position("typecheck"));
    assert!(position("typecheck") < position("build"));
    assert!(position("build") < position("npm test"));

    sandbox.destroy(&mut session).await.unwrap();
}

/// A failing check does not stop the checks after it.
#[tokio::test]
async fn test_failure_does_not_abort_gate() {
    let sandbox = MockSandbox::new().respond_to(
        "typecheck",
        vec![MockResponse::failure(
            2,
            "src/index.ts(1,7): error TS2322: Type 'string' is not assignable to type 'number'.",
        )],
    );
    let mut session = sandbox.create().await.unwrap();

    let config = GateConfig::default().without(CheckKind::Security);
    let gate = ValidationGate::new(config, Arc::new(sandbox.clone()));
    let result = gate.validate(&session).await;

    assert!(!result.all_passed);
    let typecheck = result.get(CheckKind::Typecheck).unwrap();
    assert!(!typecheck.passed);
    assert_eq!(typecheck.error_count, 1);
    assert!(typecheck.diagnostics[0].contains("TS2322"));

    assert!(result.get(CheckKind::Build).unwrap().passed);
    assert!(result.get(CheckKind::Test).unwrap().passed);
    assert!(sandbox.was_executed("npm test"));

    sandbox.destroy(&mut session).await.unwrap();
}

/// A gate with nothing configured never passes.
#[tokio::test]
async fn test_unconfigured_checks_fail_gate() {
    let sandbox = MockSandbox::new();
    let mut session = sandbox.create().await.unwrap();

    let gate = ValidationGate::new(GateConfig::empty(), Arc::new(sandbox.clone()));
    let result = gate.validate(&session).await;

    assert!(!result.all_passed);
    assert_eq!(result.checks.len(), 6);
    assert_eq!(result.passed_count(), 0);
    assert_eq!(result.get(CheckKind::Lint).unwrap().diagnostics, vec!["lint is not configured"]);
    assert_eq!(sandbox.commands().len(), 0);

    sandbox.destroy(&mut session).await.unwrap();
}

/// Leaving out one kind fails the gate even when every other check passes.
#[tokio::test]
async fn test_missing_security_fails_gate() {
    let sandbox = MockSandbox::new();
    let mut session = sandbox.create().await.unwrap();

    let gate = ValidationGate::new(GateConfig::default().without(CheckKind::Security), Arc::new(sandbox.clone()));
    let result = gate.validate(&session).await;

    assert!(!result.all_passed);
    assert_eq!(result.passed_count(), 5);
    assert!(!result.get(CheckKind::Security).unwrap().passed);

    sandbox.destroy(&mut session).await.unwrap();
}

/// A command that cannot start is a failed check with a synthetic diagnostic.
#[tokio::test]
async fn test_unrunnable_check_is_synthetic_failure() {
    let sandbox = MockSandbox::new().respond_to("lint", vec![MockResponse::error("eslint: command not found")]);
    let mut session = sandbox.create().await.unwrap();

    let gate = ValidationGate::new(GateConfig::default().without(CheckKind::Security), Arc::new(sandbox.clone()));
    let result = gate.validate(&session).await;

    let lint = result.get(CheckKind::Lint).unwrap();
    assert!(!lint.passed);
    assert!(lint.diagnostics[0].starts_with("lint could not run:"));
    assert!(result.get(CheckKind::Typecheck).unwrap().passed);

    sandbox.destroy(&mut session).await.unwrap();
}

/// A check that outlives its timeout is abandoned and recorded as timed out.
#[tokio::test]
async fn test_check_timeout() {
    let sandbox = MockSandbox::new().respond_to("slow-build", vec![MockResponse::success("").with_delay(5_000)]);
    let mut session = sandbox.create().await.unwrap();

    let config = GateConfig::empty()
        .with_check(CheckSpec::new(CheckKind::Build, "slow-build").timeout_secs(1))
        .with_check(CheckSpec::new(CheckKind::Test, "quick-test"));
    let gate = ValidationGate::new(config, Arc::new(sandbox.clone()));
    let result = gate.validate(&session).await;

    let build = result.get(CheckKind::Build).unwrap();
    assert_eq!(build.diagnostics, vec!["build timed out after 1s"]);
    assert!(result.get(CheckKind::Test).unwrap().passed);
    assert!(!result.all_passed);

    sandbox.destroy(&mut session).await.unwrap();
}

/// Security issues reported by the oracle fail the gate.
#[tokio::test]
async fn test_security_issues_fail_gate() {
    let sandbox = MockSandbox::new();
    let oracle = ScriptedOracle::new().reply("ISSUE: src/index.ts: API key hard-coded\nISSUE: src/index.ts: eval of input");
    let mut session = sandbox.create().await.unwrap();
    session.write_file("src/index.ts", "const key = 'sk-123'; eval(input);\n").unwrap();

    let config = GateConfig::empty().with_check(CheckSpec::security());
    let gate = ValidationGate::new(config, Arc::new(sandbox.clone())).with_oracle(Arc::new(oracle));
    let result = gate.validate(&session).await;

    let security = result.get(CheckKind::Security).unwrap();
    assert!(!security.passed);
    assert_eq!(security.error_count, 2);
    assert!(result.failure_summary().contains("API key hard-coded"));

    sandbox.destroy(&mut session).await.unwrap();
}

/// Security without an oracle cannot run.
#[tokio::test]
async fn test_security_without_oracle() {
    let sandbox = MockSandbox::new();
    let mut session = sandbox.create().await.unwrap();

    let gate = ValidationGate::new(GateConfig::empty().with_check(CheckSpec::security()), Arc::new(sandbox.clone()));
    let result = gate.validate(&session).await;

    assert!(!result.all_passed);
    assert_eq!(
        result.get(CheckKind::Security).unwrap().diagnostics,
        vec!["security could not run: no oracle configured"]
    );

    sandbox.destroy(&mut session).await.unwrap();
}

/// Real shell checks against an on-disk project.
#[tokio::test]
async fn test_local_gate_on_attached_project() {
    let project = tempfile::tempdir().unwrap();
    std::fs::write(project.path().join("package.json"), "{\"name\": \"demo\"}").unwrap();

    let sandbox = Arc::new(LocalSandbox::new());
    let config = GateConfig::empty()
        .with_check(CheckSpec::new(CheckKind::Install, "test -f package.json"))
        .with_check(CheckSpec::new(CheckKind::Build, "grep -q demo package.json"))
        .with_check(CheckSpec::new(CheckKind::Test, "echo '1 failed' && exit 1"));
    let gate = ValidationGate::new(config, sandbox.clone());

    let mut session = sandbox.attach(project.path()).unwrap();
    let result = gate.validate(&session).await;

    assert!(result.get(CheckKind::Install).unwrap().passed);
    assert!(result.get(CheckKind::Build).unwrap().passed);
    let test = result.get(CheckKind::Test).unwrap();
    assert!(!test.passed);
    assert_eq!(test.error_count, 1);
    assert!(!result.all_passed);

    sandbox.destroy(&mut session).await.unwrap();
    assert!(project.path().exists());
}
