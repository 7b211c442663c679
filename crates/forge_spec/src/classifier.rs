//! Requirement classification from free text.
//!
//! The classifier is a pure function of its input: the same description
//! always yields the same [`RequirementModel`]. Matching is keyword based,
//! with word-boundary regexes compiled once per classifier.

use regex::Regex;
use tracing::debug;

use crate::request::{slugify, TargetType};
use crate::requirements::{ApiIntegration, AuthType, Capability, EnvVar, RequirementModel};

/// Turns free text into a structured requirement model.
pub trait RequirementClassifier: Send + Sync {
    /// Classify a description. Must be pure.
    fn parse(&self, description: &str) -> RequirementModel;
}

/// Known third-party integration: keywords, the action it enables, its API
/// and the secrets it needs.
struct IntegrationRule {
    keywords: &'static [&'static str],
    stem: &'static str,
    action: (&'static str, &'static str),
    api_name: &'static str,
    base_url: &'static str,
    auth_type: AuthType,
    endpoints: &'static [&'static str],
    env: &'static [(&'static str, &'static str, bool)],
}

const INTEGRATIONS: &[IntegrationRule] = &[
    IntegrationRule {
        keywords: &["weather", "openweather", "forecast"],
        stem: "weather",
        action: ("GET_WEATHER", "Fetch current weather conditions for a location"),
        api_name: "OpenWeatherMap",
        base_url: "https://api.openweathermap.org/data/2.5",
        auth_type: AuthType::ApiKey,
        endpoints: &["/weather", "/forecast"],
        env: &[("OPENWEATHER_API_KEY", "OpenWeatherMap API key", true)],
    },
    IntegrationRule {
        keywords: &["twitter", "tweet"],
        stem: "twitter",
        action: ("POST_TWEET", "Publish a post to Twitter/X"),
        api_name: "Twitter",
        base_url: "https://api.twitter.com/2",
        auth_type: AuthType::OAuth,
        endpoints: &["/tweets", "/users/me"],
        env: &[
            ("TWITTER_API_KEY", "Twitter API key", true),
            ("TWITTER_API_SECRET", "Twitter API secret", true),
        ],
    },
    IntegrationRule {
        keywords: &["discord"],
        stem: "discord",
        action: ("SEND_DISCORD_MESSAGE", "Send a message to a Discord channel"),
        api_name: "Discord",
        base_url: "https://discord.com/api/v10",
        auth_type: AuthType::BotToken,
        endpoints: &["/channels/{id}/messages"],
        env: &[("DISCORD_BOT_TOKEN", "Discord bot token", true)],
    },
    IntegrationRule {
        keywords: &["slack"],
        stem: "slack",
        action: ("SEND_SLACK_MESSAGE", "Post a message to a Slack channel"),
        api_name: "Slack",
        base_url: "https://slack.com/api",
        auth_type: AuthType::Bearer,
        endpoints: &["/chat.postMessage"],
        env: &[("SLACK_BOT_TOKEN", "Slack bot token", true)],
    },
    IntegrationRule {
        keywords: &["github", "pull request", "repository"],
        stem: "github",
        action: ("CREATE_GITHUB_ISSUE", "Open an issue on a GitHub repository"),
        api_name: "GitHub",
        base_url: "https://api.github.com",
        auth_type: AuthType::Bearer,
        endpoints: &["/repos/{owner}/{repo}/issues"],
        env: &[("GITHUB_TOKEN", "GitHub personal access token", true)],
    },
    IntegrationRule {
        keywords: &["crypto", "bitcoin", "ethereum", "coingecko", "token price"],
        stem: "price",
        action: ("GET_PRICE", "Look up the current price of a crypto asset"),
        api_name: "CoinGecko",
        base_url: "https://api.coingecko.com/api/v3",
        auth_type: AuthType::ApiKey,
        endpoints: &["/simple/price"],
        env: &[("COINGECKO_API_KEY", "CoinGecko API key", false)],
    },
    IntegrationRule {
        keywords: &["news", "headline"],
        stem: "news",
        action: ("GET_NEWS", "Fetch top news headlines"),
        api_name: "NewsAPI",
        base_url: "https://newsapi.org/v2",
        auth_type: AuthType::ApiKey,
        endpoints: &["/top-headlines", "/everything"],
        env: &[("NEWS_API_KEY", "NewsAPI key", true)],
    },
    IntegrationRule {
        keywords: &["email", "sendgrid", "newsletter"],
        stem: "email",
        action: ("SEND_EMAIL", "Send a transactional email"),
        api_name: "SendGrid",
        base_url: "https://api.sendgrid.com/v3",
        auth_type: AuthType::Bearer,
        endpoints: &["/mail/send"],
        env: &[("SENDGRID_API_KEY", "SendGrid API key", true)],
    },
    IntegrationRule {
        keywords: &["stripe", "payment", "checkout", "invoice"],
        stem: "payments",
        action: ("CREATE_PAYMENT", "Create a payment intent"),
        api_name: "Stripe",
        base_url: "https://api.stripe.com/v1",
        auth_type: AuthType::Bearer,
        endpoints: &["/payment_intents"],
        env: &[("STRIPE_SECRET_KEY", "Stripe secret key", true)],
    },
    IntegrationRule {
        keywords: &["openai", "gpt", "summariz", "translat"],
        stem: "ai",
        action: ("GENERATE_TEXT", "Generate text with a language model"),
        api_name: "OpenAI",
        base_url: "https://api.openai.com/v1",
        auth_type: AuthType::Bearer,
        endpoints: &["/chat/completions"],
        env: &[("OPENAI_API_KEY", "OpenAI API key", true)],
    },
];

#[derive(Clone, Copy)]
enum Bucket {
    Provider,
    Service,
    Evaluator,
}

/// Capability that does not imply a third-party API.
struct CapabilityRule {
    keywords: &'static [&'static str],
    bucket: Bucket,
    name: &'static str,
    description: &'static str,
    env: Option<(&'static str, &'static str)>,
}

const CAPABILITIES: &[CapabilityRule] = &[
    CapabilityRule {
        keywords: &["database", "storage", "persist", "store"],
        bucket: Bucket::Provider,
        name: "StorageProvider",
        description: "Expose persisted records to the runtime context",
        env: Some(("DATABASE_URL", "Connection string for the backing database")),
    },
    CapabilityRule {
        keywords: &["remember", "memory", "history"],
        bucket: Bucket::Provider,
        name: "MemoryProvider",
        description: "Provide recent conversation memory",
        env: None,
    },
    CapabilityRule {
        keywords: &["time", "date", "calendar"],
        bucket: Bucket::Provider,
        name: "TimeProvider",
        description: "Provide the current date and time",
        env: None,
    },
    CapabilityRule {
        keywords: &["monitor", "watch", "alert", "poll"],
        bucket: Bucket::Service,
        name: "MonitorService",
        description: "Poll an external source and raise alerts on change",
        env: None,
    },
    CapabilityRule {
        keywords: &["schedule", "periodic", "every", "daily", "hourly", "cron", "background"],
        bucket: Bucket::Service,
        name: "SchedulerService",
        description: "Run recurring background tasks",
        env: None,
    },
    CapabilityRule {
        keywords: &["sentiment", "tone", "mood"],
        bucket: Bucket::Evaluator,
        name: "SentimentEvaluator",
        description: "Score the sentiment of incoming messages",
        env: None,
    },
    CapabilityRule {
        keywords: &["evaluate", "score", "quality", "rating", "review"],
        bucket: Bucket::Evaluator,
        name: "QualityEvaluator",
        description: "Evaluate responses against quality criteria",
        env: None,
    },
];

/// Ordered: the first matching hint wins.
const TARGET_HINTS: &[(TargetType, &[&str])] = &[
    (TargetType::Plugin, &["plugin", "extension"]),
    (TargetType::FullStack, &["full-stack", "fullstack", "full stack", "web app", "website", "dashboard"]),
    (TargetType::Workflow, &["workflow", "pipeline"]),
    (TargetType::Integration, &["integration", "connector", "sync"]),
    (TargetType::Agent, &["agent", "bot", "assistant", "character"]),
];

/// Deterministic keyword classifier.
pub struct KeywordClassifier {
    name_pattern: Regex,
    integrations: Vec<Regex>,
    capabilities: Vec<Regex>,
    targets: Vec<Regex>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self {
            name_pattern: Regex::new(r#"(?i)\b(?:called|named)\s+["'`]?([A-Za-z][\w-]*)"#)
                .expect("name pattern is a valid regex"),
            integrations: INTEGRATIONS.iter().map(|r| keyword_regex(r.keywords)).collect(),
            capabilities: CAPABILITIES.iter().map(|r| keyword_regex(r.keywords)).collect(),
            targets: TARGET_HINTS.iter().map(|(_, kw)| keyword_regex(kw)).collect(),
        }
    }

    /// Infer the target type from hint words; plugins are the default.
    pub fn detect_target(&self, text: &str) -> TargetType {
        TARGET_HINTS
            .iter()
            .zip(&self.targets)
            .find(|(_, re)| re.is_match(text))
            .map(|((target, _), _)| *target)
            .unwrap_or_default()
    }

    fn derive_name(&self, text: &str, stem: Option<&str>, target: TargetType) -> String {
        if let Some(caps) = self.name_pattern.captures(text) {
            let explicit = slugify(&caps[1]);
            if !explicit.is_empty() {
                return explicit;
            }
        }

        if let Some(stem) = stem {
            return format!("{}-{}", stem, target.as_str());
        }

        let words: Vec<&str> = text
            .split_whitespace()
            .filter(|w| w.len() > 3)
            .take(3)
            .collect();
        let fallback = slugify(&words.join(" "));
        if fallback.is_empty() {
            format!("generated-{}", target.as_str())
        } else {
            fallback
        }
    }
}

impl RequirementClassifier for KeywordClassifier {
    fn parse(&self, description: &str) -> RequirementModel {
        let target = self.detect_target(description);
        let mut stem = None;
        let mut model = RequirementModel::new("", description.trim(), target);

        for (rule, re) in INTEGRATIONS.iter().zip(&self.integrations) {
            if !re.is_match(description) {
                continue;
            }
            stem.get_or_insert(rule.stem);

            model.push_action(Capability::new(rule.action.0, rule.action.1));
            model.push_api(ApiIntegration {
                name: rule.api_name.to_string(),
                base_url: rule.base_url.to_string(),
                auth_type: rule.auth_type,
                endpoints: rule.endpoints.iter().map(|e| e.to_string()).collect(),
            });
            for (name, desc, required) in rule.env {
                let var = EnvVar::secret(*name, *desc);
                model.push_env(if *required { var } else { var.optional() });
            }
        }

        for (rule, re) in CAPABILITIES.iter().zip(&self.capabilities) {
            if !re.is_match(description) {
                continue;
            }
            let capability = Capability::new(rule.name, rule.description);
            match rule.bucket {
                Bucket::Provider => model.push_provider(capability),
                Bucket::Service => model.push_service(capability),
                Bucket::Evaluator => model.push_evaluator(capability),
            }
            if let Some((name, desc)) = rule.env {
                model.push_env(EnvVar::secret(name, desc));
            }
        }

        if model.actions.is_empty() && target == TargetType::Plugin {
            model.push_action(Capability::new(
                "HANDLE_REQUEST",
                "Respond to the request described by the user",
            ));
        }

        model.name = self.derive_name(description, stem, target);
        model.refresh_complexity();

        debug!(
            "Classified '{}' as {} ({} capabilities, {} APIs, {})",
            model.name,
            model.target_type,
            model.capability_count(),
            model.api_integrations.len(),
            model.complexity
        );

        model
    }
}

fn keyword_regex(keywords: &[&str]) -> Regex {
    let alternatives: Vec<String> = keywords.iter().map(|k| regex::escape(k)).collect();
    Regex::new(&format!(r"(?i)\b(?:{})", alternatives.join("|")))
        .expect("escaped keyword alternation is a valid regex")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complexity::Complexity;

    #[test]
    fn test_weather_plugin() {
        let model = KeywordClassifier::new().parse("Create a weather plugin using OpenWeatherMap");

        assert_eq!(model.target_type, TargetType::Plugin);
        assert!(model.has_action("GET_WEATHER"));
        let key = model.env_var("OPENWEATHER_API_KEY").unwrap();
        assert!(key.required);
        assert!(key.sensitive);
        assert_eq!(model.api_integrations[0].auth_type, AuthType::ApiKey);
        assert_eq!(model.name, "weather-plugin");
    }

    #[test]
    fn test_explicit_name_wins() {
        let model = KeywordClassifier::new().parse("Build a discord bot called MoodRing that tracks sentiment");

        assert_eq!(model.name, "moodring");
        assert_eq!(model.target_type, TargetType::Agent);
        assert!(model.has_action("SEND_DISCORD_MESSAGE"));
        assert_eq!(model.evaluators[0].name, "SentimentEvaluator");
    }

    #[test]
    fn test_word_boundaries() {
        // "generate" must not trigger the "rating" evaluator
        let model = KeywordClassifier::new().parse("A plugin to generate greetings");
        assert!(model.evaluators.is_empty());
        assert!(model.has_action("HANDLE_REQUEST"));
    }

    #[test]
    fn test_optional_secret() {
        let model = KeywordClassifier::new().parse("Track bitcoin prices");
        let key = model.env_var("COINGECKO_API_KEY").unwrap();
        assert!(!key.required);
    }

    #[test]
    fn test_complex_request() {
        let model = KeywordClassifier::new().parse(
            "An agent that monitors github and slack every hour, stores results in a database, \
             scores sentiment and emails a daily news digest",
        );
        assert_eq!(model.complexity, Complexity::Complex);
    }
}
