//! # forge_runner
//!
//! Sandbox sessions and command execution for Forge.
//!
//! Every generation request owns exactly one [`SandboxSession`]: an
//! ephemeral working directory plus whatever isolation the provider adds.
//! Work is submitted as structured [`Command`] values and comes back as
//! captured output; nothing above this crate knows the shell syntax or the
//! substrate used underneath.
//!
//! # Providers
//!
//! - **LocalSandbox**: child processes in a fresh temp directory per session
//! - **DockerSandbox**: one container per session, directory bind-mounted
//! - **MockSandbox**: scripted responses and call capture for tests
//! - **NullSandbox**: never available, selects the degraded path
//!
//! # Example
//!
//! ```rust,no_run
//! use forge_runner::{Command, LocalSandbox, SandboxProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sandbox = LocalSandbox::new();
//!     let mut session = sandbox.create().await?;
//!
//!     session.write_file("hello.txt", "hi")?;
//!     let output = sandbox
//!         .execute(&session, &Command::new("cat").arg("hello.txt").timeout_secs(5))
//!         .await?;
//!     println!("{}", output.stdout);
//!
//!     sandbox.destroy(&mut session).await?;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod docker;
pub mod error;
pub mod local;
pub mod mock;
pub mod sandbox;

pub use command::Command;
pub use docker::{DockerSandbox, DockerSandboxOptions};
pub use error::{SandboxError, SandboxResult};
pub use local::LocalSandbox;
pub use mock::{CapturedCommand, MockResponse, MockSandbox};
pub use sandbox::{ExecOutput, NullSandbox, SandboxProvider, SandboxSession, SandboxState};
