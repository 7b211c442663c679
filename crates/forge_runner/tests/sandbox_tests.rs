//! Integration tests for sandbox providers.
//!
//! The local provider runs real child processes through `sh`; the mock
//! provider covers scripted responses and session accounting.

use forge_runner::{
    Command, LocalSandbox, MockResponse, MockSandbox, NullSandbox, SandboxError, SandboxProvider,
    SandboxState,
};

/// Files written through the session are visible to executed commands.
#[tokio::test]
async fn test_local_files_visible_to_commands() {
    let sandbox = LocalSandbox::new();
    let mut session = sandbox.create().await.unwrap();

    session
        .write_file("src/index.ts", "export const answer = 42;\n")
        .unwrap();

    let output = sandbox
        .execute(&session, &Command::shell("cat src/index.ts").timeout_secs(10))
        .await
        .unwrap();
    assert!(output.stdout.contains("answer = 42"));

    sandbox.destroy(&mut session).await.unwrap();
}

/// Working directory is relative to the session root.
#[tokio::test]
async fn test_local_working_dir() {
    let sandbox = LocalSandbox::new();
    let mut session = sandbox.create().await.unwrap();
    session.write_file("packages/core/marker.txt", "core").unwrap();

    let output = sandbox
        .execute(
            &session,
            &Command::new("cat").arg("marker.txt").working_dir("packages/core"),
        )
        .await
        .unwrap();
    assert_eq!(output.stdout, "core");

    let escape = sandbox
        .execute(&session, &Command::new("ls").working_dir("../"))
        .await;
    assert!(matches!(escape, Err(SandboxError::InvalidPath(_))));

    sandbox.destroy(&mut session).await.unwrap();
}

/// Environment variables reach the process and non-zero exits are reported, not raised.
#[tokio::test]
async fn test_local_env_and_exit_code() {
    let sandbox = LocalSandbox::new();
    let mut session = sandbox.create().await.unwrap();

    let output = sandbox
        .execute(
            &session,
            &Command::shell("echo $FORGE_MARK; echo oops >&2; exit 3").env("FORGE_MARK", "present"),
        )
        .await
        .unwrap();

    assert_eq!(output.exit_code, 3);
    assert_eq!(output.stdout.trim(), "present");
    assert_eq!(output.stderr.trim(), "oops");
    assert!(!output.success());

    sandbox.destroy(&mut session).await.unwrap();
}

/// Two sessions never share a working directory.
#[tokio::test]
async fn test_local_sessions_are_separate() {
    let base = tempfile::tempdir().unwrap();
    let sandbox = LocalSandbox::in_dir(base.path());

    let mut a = sandbox.create().await.unwrap();
    let mut b = sandbox.create().await.unwrap();
    assert_ne!(a.working_directory, b.working_directory);
    assert!(a.working_directory.starts_with(base.path()));

    a.write_file("only-a.txt", "a").unwrap();
    assert!(!b.exists("only-a.txt"));
    assert_eq!(sandbox.live_sessions(), 2);

    sandbox.destroy(&mut a).await.unwrap();
    sandbox.destroy(&mut b).await.unwrap();
    assert_eq!(sandbox.live_sessions(), 0);
}

/// A destroyed session rejects further commands.
#[tokio::test]
async fn test_execute_after_destroy() {
    let sandbox = LocalSandbox::new();
    let mut session = sandbox.create().await.unwrap();
    sandbox.destroy(&mut session).await.unwrap();

    assert_eq!(session.state, SandboxState::Destroyed);
    let result = sandbox.execute(&session, &Command::new("true")).await;
    assert!(matches!(result, Err(SandboxError::SessionDestroyed(_))));
}

/// Mock rules match on the rendered command line.
#[tokio::test]
async fn test_mock_pattern_matching() {
    let mock = MockSandbox::new()
        .respond_to("tsc", vec![MockResponse::failure(2, "error TS2304: Cannot find name 'x'.")])
        .respond_to("eslint", vec![MockResponse::success("")]);
    let mut session = mock.create().await.unwrap();

    let typecheck = mock
        .execute(&session, &Command::new("npx").args(["tsc", "--noEmit"]))
        .await
        .unwrap();
    assert_eq!(typecheck.exit_code, 2);
    assert!(typecheck.stderr.contains("TS2304"));

    let lint = mock
        .execute(&session, &Command::new("npx").arg("eslint"))
        .await
        .unwrap();
    assert!(lint.success());

    let commands = mock.commands();
    assert_eq!(commands.len(), 2);
    assert!(commands.iter().all(|c| c.session_id == session.id));

    mock.destroy(&mut session).await.unwrap();
}

/// Error responses surface as execution failures without killing the session.
#[tokio::test]
async fn test_mock_error_response() {
    let mock = MockSandbox::new().respond_to("npm install", vec![MockResponse::error("npm: not found")]);
    let mut session = mock.create().await.unwrap();

    let result = mock.execute(&session, &Command::shell("npm install")).await;
    assert!(matches!(result, Err(SandboxError::ExecutionFailed(_))));
    assert!(session.is_active());

    let next = mock.execute(&session, &Command::new("true")).await.unwrap();
    assert!(next.success());

    mock.destroy(&mut session).await.unwrap();
}

/// Unavailable providers report themselves as such.
#[tokio::test]
async fn test_unavailable_providers() {
    let mock = MockSandbox::new().set_available(false);
    assert!(!mock.is_available().await);
    assert!(!NullSandbox.is_available().await);
    assert_eq!(NullSandbox.name(), "none");
}
