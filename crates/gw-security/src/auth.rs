use crate::error::AuthError;
use gw_core::{AuthMode, ConfigurationError, Environment, FeatureContext, GatewaySettings};
use std::collections::{HashMap, HashSet};

/// Per-key metadata attached in `AuthMode::Advanced`. Never alters the
/// authentication decision itself (§4.5); purely informational context
/// carried alongside a successful [`Principal`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMetadata {
    pub role: Option<String>,
    pub permissions: Vec<String>,
    pub user_tracking: bool,
    pub request_logging: bool,
}

/// The authenticated identity attached to a request once `verify` succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Display/logging identifier: `"development"` in permissive mode, or
    /// the truncated key prefix otherwise. The raw key never leaves the
    /// auth boundary (§4.5).
    pub id: String,
    pub permissive: bool,
    pub metadata: Option<KeyMetadata>,
}

impl Principal {
    fn development() -> Self {
        Self { id: "development".to_string(), permissive: true, metadata: None }
    }
}

/// The environment-driven auth subsystem: holds the configured key set and
/// decides, at construction time, whether permissive mode is in effect.
/// See SPEC_FULL.md §4.5.
pub struct AuthGate {
    keys: HashSet<String>,
    mode: AuthMode,
    metadata: HashMap<String, KeyMetadata>,
    permissive: bool,
}

impl AuthGate {
    /// Builds the gate from process settings and the feature-context
    /// override. Fails hard (per §4.5) when production-strict policy is in
    /// effect and zero keys are configured.
    pub fn new(
        settings: &GatewaySettings,
        feature_context: FeatureContext,
    ) -> Result<Self, ConfigurationError> {
        let keys: HashSet<String> = settings
            .all_api_keys()
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        let strict = feature_context.security_enforcement
            || settings.environment == Environment::Production;

        if strict && keys.is_empty() {
            return Err(ConfigurationError::Invalid {
                field: "API_KEY".to_string(),
                reason: format!(
                    "production security policy requires at least one API key to be configured \
                     (environment={}, security_enforcement={})",
                    settings.environment, feature_context.security_enforcement
                ),
            });
        }

        // Permissive mode is allowed only in development with zero keys
        // configured; a strict override or any non-development environment
        // with zero keys cannot reach this branch with an empty key set
        // because the check above would already have failed for `strict`.
        // A non-development, non-strict environment with zero keys (e.g.
        // `testing`) falls through to "no keys ever verify" rather than
        // permissive, matching the letter of §4.5 ("allowed only in
        // development").
        let permissive = keys.is_empty() && !strict && settings.environment == Environment::Development;

        Ok(Self { keys, mode: settings.auth_mode, metadata: HashMap::new(), permissive })
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn is_permissive(&self) -> bool {
        self.permissive
    }

    /// Attaches advanced-mode metadata to a configured key. No-op if the key
    /// was never registered; metadata never grants access on its own.
    pub fn with_metadata(mut self, key: impl Into<String>, metadata: KeyMetadata) -> Self {
        let key = key.into();
        if self.keys.contains(&key) {
            self.metadata.insert(key, metadata);
        }
        self
    }

    /// `verify(key)` is an O(1) set lookup, case-sensitive, against
    /// whitespace-trimmed keys. Returns the authenticated [`Principal`], or
    /// [`AuthError`] distinguishing "nothing presented" from "wrong key",
    /// matching the `credentials_provided` distinction in §4.5.
    pub fn verify(&self, credential: Option<&str>) -> Result<Principal, AuthError> {
        if self.permissive {
            return Ok(Principal::development());
        }

        let raw = credential.ok_or(AuthError::MissingCredentials)?;
        let key = raw.trim();
        if key.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        if !self.keys.contains(key) {
            return Err(AuthError::InvalidKey);
        }

        Ok(Principal {
            id: truncated_prefix(key),
            permissive: false,
            metadata: self.metadata.get(key).cloned(),
        })
    }
}

/// `first 8 chars + "..."`, per §4.5 "Protocol". Never the raw key.
pub fn truncated_prefix(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    format!("{prefix}...")
}

/// Extracts the bearer credential from the two accepted header shapes:
/// `Authorization: Bearer <key>` (preferred) or `X-API-Key: <key>`.
pub fn extract_credential(authorization: Option<&str>, x_api_key: Option<&str>) -> Option<String> {
    if let Some(header) = authorization {
        if let Some(rest) = header.strip_prefix("Bearer ") {
            let trimmed = rest.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    x_api_key.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_core::AuthMode as CoreAuthMode;

    fn settings(environment: Environment, api_key: Option<&str>) -> GatewaySettings {
        GatewaySettings {
            environment,
            api_key: api_key.map(str::to_string),
            additional_api_keys: vec![],
            auth_mode: CoreAuthMode::Simple,
            resilience_preset: "simple".to_string(),
            resilience_custom_config: None,
            cache_preset: "disabled".to_string(),
            cache_redis_url: None,
            redis_encryption_key: None,
            input_max_length: 2048,
            batch_concurrency: 10,
            enable_ai_cache: true,
            enforce_auth: true,
            enable_user_tracking: false,
            enable_request_logging: false,
            rate_limiting_enabled: false,
        }
    }

    #[test]
    fn production_with_no_keys_fails_construction() {
        let err = AuthGate::new(&settings(Environment::Production, None), FeatureContext::default());
        assert!(err.is_err());
    }

    #[test]
    fn development_with_no_keys_is_permissive() {
        let gate =
            AuthGate::new(&settings(Environment::Development, None), FeatureContext::default()).unwrap();
        assert!(gate.is_permissive());
        let principal = gate.verify(None).unwrap();
        assert_eq!(principal.id, "development");
        assert!(principal.permissive);
    }

    #[test]
    fn security_enforcement_forces_strict_even_in_development() {
        let err = AuthGate::new(
            &settings(Environment::Development, None),
            FeatureContext { security_enforcement: true, ..Default::default() },
        );
        assert!(err.is_err());
    }

    #[test]
    fn valid_key_yields_prefixed_principal_never_raw_key() {
        let gate =
            AuthGate::new(&settings(Environment::Production, Some("sk-verysecretkey")), FeatureContext::default())
                .unwrap();
        let principal = gate.verify(Some("sk-verysecretkey")).unwrap();
        assert_eq!(principal.id, "sk-verys...");
        assert!(!principal.permissive);
    }

    #[test]
    fn invalid_key_is_distinguished_from_missing() {
        let gate =
            AuthGate::new(&settings(Environment::Production, Some("good-key")), FeatureContext::default())
                .unwrap();
        assert_eq!(gate.verify(None).unwrap_err(), AuthError::MissingCredentials);
        assert_eq!(gate.verify(Some("bad-key")).unwrap_err(), AuthError::InvalidKey);
        assert!(!AuthError::MissingCredentials.credentials_provided());
        assert!(AuthError::InvalidKey.credentials_provided());
    }

    #[test]
    fn extract_prefers_bearer_over_api_key_header() {
        assert_eq!(
            extract_credential(Some("Bearer abc"), Some("xyz")).as_deref(),
            Some("abc")
        );
        assert_eq!(extract_credential(None, Some("xyz")).as_deref(), Some("xyz"));
        assert_eq!(extract_credential(None, None), None);
    }
}
