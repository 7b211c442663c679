//! Complexity scoring.
//!
//! Complexity only sizes resource budgets. It never changes what the
//! pipeline considers a correct result.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::requirements::RequirementModel;

const ACTION_WEIGHT: u32 = 1;
const PROVIDER_WEIGHT: u32 = 1;
const SERVICE_WEIGHT: u32 = 2;
const EVALUATOR_WEIGHT: u32 = 2;
const API_WEIGHT: u32 = 2;

const SIMPLE_MAX: u32 = 3;
const MEDIUM_MAX: u32 = 8;

/// Complexity bucket of a requirement model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

impl Complexity {
    /// Weighted sum over capability and integration counts.
    pub fn weight(model: &RequirementModel) -> u32 {
        model.actions.len() as u32 * ACTION_WEIGHT
            + model.providers.len() as u32 * PROVIDER_WEIGHT
            + model.services.len() as u32 * SERVICE_WEIGHT
            + model.evaluators.len() as u32 * EVALUATOR_WEIGHT
            + model.api_integrations.len() as u32 * API_WEIGHT
    }

    pub fn from_weight(weight: u32) -> Self {
        match weight {
            0..=SIMPLE_MAX => Self::Simple,
            w if w <= MEDIUM_MAX => Self::Medium,
            _ => Self::Complex,
        }
    }

    pub fn score(model: &RequirementModel) -> Self {
        Self::from_weight(Self::weight(model))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Medium => "medium",
            Self::Complex => "complex",
        }
    }

    /// Default budgets for this complexity.
    pub fn budget(&self) -> ResourceBudget {
        match self {
            Self::Simple => ResourceBudget {
                oracle_timeout_secs: 60,
                estimated_minutes: 2,
            },
            Self::Medium => ResourceBudget {
                oracle_timeout_secs: 120,
                estimated_minutes: 4,
            },
            Self::Complex => ResourceBudget {
                oracle_timeout_secs: 180,
                estimated_minutes: 8,
            },
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Time budgets derived from complexity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceBudget {
    /// Timeout for a single oracle call
    pub oracle_timeout_secs: u64,
    /// Rough wall-clock estimate shown to users
    pub estimated_minutes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::TargetType;
    use crate::requirements::Capability;

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(Complexity::from_weight(0), Complexity::Simple);
        assert_eq!(Complexity::from_weight(3), Complexity::Simple);
        assert_eq!(Complexity::from_weight(4), Complexity::Medium);
        assert_eq!(Complexity::from_weight(8), Complexity::Medium);
        assert_eq!(Complexity::from_weight(9), Complexity::Complex);
    }

    #[test]
    fn test_services_weigh_more_than_actions() {
        let mut actions = RequirementModel::new("a", "a", TargetType::Plugin);
        actions.push_action(Capability::new("A", ""));
        actions.push_action(Capability::new("B", ""));

        let mut services = RequirementModel::new("s", "s", TargetType::Plugin);
        services.push_service(Capability::new("S1", ""));
        services.push_service(Capability::new("S2", ""));

        assert!(Complexity::weight(&services) > Complexity::weight(&actions));
    }

    #[test]
    fn test_budget_grows_with_complexity() {
        assert!(
            Complexity::Complex.budget().oracle_timeout_secs
                > Complexity::Simple.budget().oracle_timeout_secs
        );
    }
}
