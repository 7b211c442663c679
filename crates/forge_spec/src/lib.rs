//! # forge_spec
//!
//! Generation requests and requirement models for Forge.
//!
//! This crate holds the pure data that enters the generation pipeline:
//!
//! - **GenerationRequest**: an accepted, immutable description of one pipeline run
//! - **RequirementModel**: structured capabilities, API integrations and
//!   environment variables derived from free text
//! - **Classifier**: deterministic keyword matching from text to a model
//! - **Complexity**: a weighted score used only to size time budgets
//!
//! ## Example
//!
//! ```rust
//! use forge_spec::{KeywordClassifier, RequirementClassifier};
//!
//! let classifier = KeywordClassifier::new();
//! let model = classifier.parse("Create a weather plugin using OpenWeatherMap");
//!
//! assert!(model.has_action("GET_WEATHER"));
//! assert!(model.env_var("OPENWEATHER_API_KEY").is_some());
//! ```

pub mod classifier;
pub mod complexity;
pub mod error;
pub mod request;
pub mod requirements;

pub use classifier::{KeywordClassifier, RequirementClassifier};
pub use complexity::{Complexity, ResourceBudget};
pub use error::{SpecError, SpecResult};
pub use request::{slugify, GeneratedFile, GenerationRequest, TargetType};
pub use requirements::{ApiIntegration, AuthType, Capability, EnvVar, RequirementModel};
