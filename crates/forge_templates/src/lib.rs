//! # forge_templates
//!
//! Project skeleton templates for Forge.
//!
//! Templates are compiled into the binary and rendered with a small
//! `{{variable}}` renderer. Every target type shares a TypeScript toolchain
//! (manifest, compiler and lint config, README, environment template) and
//! adds its own source layout.
//!
//! Two file sets are produced:
//!
//! - [`scaffold`]: the starting skeleton written into a sandbox session
//! - [`chunked_project`]: a minimal but complete project rendered directly
//!   when the iterative loop cannot finish
//!
//! ## Example
//!
//! ```rust
//! use forge_spec::{GenerationRequest, KeywordClassifier, RequirementClassifier, TargetType};
//! use forge_templates::scaffold;
//!
//! let request = GenerationRequest::new("weather", "A weather plugin", TargetType::Plugin);
//! let model = KeywordClassifier::new().parse(&request.description);
//! let files = scaffold(&request, &model).unwrap();
//! assert!(files.iter().any(|f| f.path == "package.json"));
//! ```

mod content;
pub mod error;
pub mod project;
pub mod renderer;

pub use error::{TemplateError, TemplateResult};
pub use project::{chunked_project, project_variables, scaffold, ProjectTemplate};
pub use renderer::{to_camel_case, to_pascal_case, to_snake_case, FileTemplate, TemplateRenderer};
