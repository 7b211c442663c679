//! # forge_oracle
//!
//! Code-generation oracle adapters for Forge.
//!
//! An oracle takes a prompt and a turn budget and streams back text
//! followed by a completion event. The orchestrator only depends on the
//! [`GenerationOracle`] trait; this crate ships two implementations:
//!
//! - **LlmOracle**: OpenAI or Anthropic chat completions over HTTP
//! - **ScriptedOracle**: queued replies and prompt capture for tests
//!
//! Oracle text is turned into files with [`extract_file_blocks`].
//!
//! # Example
//!
//! ```rust,no_run
//! use forge_oracle::{collect_text, extract_file_blocks, GenerationOracle, LlmOracle};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let oracle = LlmOracle::from_env()?;
//!     let stream = oracle.query("Create a hello world package", 1).await?;
//!     let reply = collect_text(stream).await?;
//!
//!     for file in extract_file_blocks(&reply.text) {
//!         println!("{}", file.path);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod files;
pub mod llm;
pub mod oracle;
pub mod scripted;

pub use error::{OracleError, OracleResult};
pub use files::extract_file_blocks;
pub use llm::{LlmOracle, LlmProvider};
pub use oracle::{ask, collect_text, GenerationOracle, OracleEvent, OracleReply, OracleStream};
pub use scripted::{ScriptedOracle, ScriptedReply};
