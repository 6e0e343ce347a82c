use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of deployment environments the resilience and auth
/// subsystems key policy off of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Testing,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    /// Parses the first of `ENVIRONMENT`, `APP_ENV`, `NODE_ENV`, `FLASK_ENV`
    /// that is set in the process environment, falling back to
    /// [`Environment::Development`] when none are set. Unrecognized values
    /// are pattern-matched (`.*prod.*`, `.*stag.*`, `.*test.*`) before giving
    /// up and defaulting to development.
    pub fn from_env() -> Self {
        for var in ["ENVIRONMENT", "APP_ENV", "NODE_ENV", "FLASK_ENV"] {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    return Self::parse(&value);
                }
            }
        }
        Environment::Development
    }

    /// Parses a raw string into an `Environment`, falling back to
    /// substring pattern matching for values like `prod-us-east` or
    /// `staging-2`.
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        match lower.as_str() {
            "development" | "dev" => return Environment::Development,
            "testing" | "test" => return Environment::Testing,
            "staging" | "stage" => return Environment::Staging,
            "production" | "prod" => return Environment::Production,
            _ => {}
        }
        if lower.contains("prod") {
            Environment::Production
        } else if lower.contains("stag") {
            Environment::Staging
        } else if lower.contains("test") {
            Environment::Testing
        } else {
            Environment::Development
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional override flags that take precedence over environment-derived
/// policy. Constructed by the embedding application; the gateway only reads
/// it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FeatureContext {
    /// Forces production-strict auth behavior regardless of `Environment`.
    pub security_enforcement: bool,
    /// Overrides whether the AI response cache is consulted/populated.
    pub ai_cache_enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_matching_fallback() {
        assert_eq!(Environment::parse("prod-us-east-1"), Environment::Production);
        assert_eq!(Environment::parse("staging-2"), Environment::Staging);
        assert_eq!(Environment::parse("integration-test"), Environment::Testing);
        assert_eq!(Environment::parse("whatever-else"), Environment::Development);
    }
}
