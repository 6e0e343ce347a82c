use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The four named retry/backoff shapes a preset can assign per operation.
/// Parameters are derived from the variant, never stored per-call — see
/// SPEC_FULL.md §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Aggressive,
    Balanced,
    Conservative,
    Critical,
}

/// Concrete retry/backoff parameters for a [`Strategy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyParams {
    pub max_attempts: u32,
    pub exp_min: Duration,
    pub exp_max: Duration,
    pub exp_multiplier: f64,
    pub jitter: Duration,
}

impl Strategy {
    pub const ALL: [Strategy; 4] =
        [Strategy::Aggressive, Strategy::Balanced, Strategy::Conservative, Strategy::Critical];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Aggressive => "aggressive",
            Strategy::Balanced => "balanced",
            Strategy::Conservative => "conservative",
            Strategy::Critical => "critical",
        }
    }

    pub fn parse(raw: &str) -> Option<Strategy> {
        match raw {
            "aggressive" => Some(Strategy::Aggressive),
            "balanced" => Some(Strategy::Balanced),
            "conservative" => Some(Strategy::Conservative),
            "critical" => Some(Strategy::Critical),
            _ => None,
        }
    }

    /// The fixed parameter table from SPEC_FULL.md §4.1.
    pub fn params(self) -> StrategyParams {
        match self {
            Strategy::Aggressive => StrategyParams {
                max_attempts: 2,
                exp_min: Duration::from_millis(500),
                exp_max: Duration::from_secs(4),
                exp_multiplier: 1.5,
                jitter: Duration::from_millis(300),
            },
            Strategy::Balanced => StrategyParams {
                max_attempts: 3,
                exp_min: Duration::from_secs(1),
                exp_max: Duration::from_secs(10),
                exp_multiplier: 2.0,
                jitter: Duration::from_secs(1),
            },
            Strategy::Conservative => StrategyParams {
                max_attempts: 5,
                exp_min: Duration::from_secs(2),
                exp_max: Duration::from_secs(30),
                exp_multiplier: 2.0,
                jitter: Duration::from_secs(2),
            },
            Strategy::Critical => StrategyParams {
                max_attempts: 7,
                exp_min: Duration::from_secs(2),
                exp_max: Duration::from_secs(60),
                exp_multiplier: 2.0,
                jitter: Duration::from_secs(2),
            },
        }
    }

    /// `min(exp_max, exp_min * exp_multiplier^(attempt-1)) + uniform(-jitter, +jitter)`,
    /// floored at zero. `attempt` is 1-based (the first retry is `attempt = 1`).
    pub fn backoff_delay(self, attempt: u32) -> Duration {
        self.params().backoff_delay(attempt)
    }
}

impl StrategyParams {
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = (attempt.saturating_sub(1)) as i32;
        let grown = self.exp_min.as_secs_f64() * self.exp_multiplier.powi(exponent);
        let base = grown.min(self.exp_max.as_secs_f64());

        let jitter_secs = self.jitter.as_secs_f64();
        let offset = if jitter_secs > 0.0 {
            rand::rng().random_range(-jitter_secs..=jitter_secs)
        } else {
            0.0
        };

        Duration::from_secs_f64((base + offset).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_first_attempt_without_jitter_is_exp_min() {
        let params = StrategyParams { jitter: Duration::ZERO, ..Strategy::Balanced.params() };
        assert_eq!(params.backoff_delay(1), Duration::from_secs(1));
    }

    #[test]
    fn delay_is_capped_at_exp_max() {
        let params = StrategyParams { jitter: Duration::ZERO, ..Strategy::Critical.params() };
        // attempt 10 would exponentially blow past exp_max absent the cap.
        assert_eq!(params.backoff_delay(10), Duration::from_secs(60));
    }

    #[test]
    fn delay_never_goes_negative() {
        let params = Strategy::Aggressive.params();
        for attempt in 1..=params.max_attempts {
            assert!(params.backoff_delay(attempt) >= Duration::ZERO);
        }
    }

    #[test]
    fn parse_round_trips_as_str() {
        for s in Strategy::ALL {
            assert_eq!(Strategy::parse(s.as_str()), Some(s));
        }
        assert_eq!(Strategy::parse("unknown"), None);
    }
}
