//! Harness configuration.
//!
//! Every knob has a fixed default below. The binary additionally honours a
//! few environment overrides through [`Config::from_env`]:
//!
//! | Variable             | Meaning                                             |
//! |----------------------|-----------------------------------------------------|
//! | `LIO_RACE_TRIALS`    | number of trials                                    |
//! | `LIO_RACE_SEED`      | seed for [`Interleaving::Seeded`], decimal or `0x`  |
//! | `LIO_RACE_SANDBOXED` | `1`/`true` to accept fatal signals from the sandbox |

use std::time::Duration;

use crate::{error::ConfigError, interleave::Interleaving};

pub const DEFAULT_TRIALS: usize = 10_000;
pub const DEFAULT_TRIAL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RUN_BUDGET: Duration = Duration::from_secs(100);
pub const DEFAULT_LINGER: Duration = Duration::from_secs(15);
/// Bytes sent and received per trial.
pub const PAYLOAD_LEN: usize = 1;

pub const ENV_TRIALS: &str = "LIO_RACE_TRIALS";
pub const ENV_SEED: &str = "LIO_RACE_SEED";
pub const ENV_SANDBOXED: &str = "LIO_RACE_SANDBOXED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub trials: usize,
  /// Wall-clock bound for one trial; exceeding it is a hang.
  pub trial_timeout: Duration,
  /// Wall-clock bound for the whole run, `None` for unbounded.
  pub run_budget: Option<Duration>,
  /// `SO_LINGER` applied when the client is closed.
  pub linger: Duration,
  /// Accept fatal signals reported by a sandboxed execution context.
  pub sandboxed: bool,
  pub interleaving: Interleaving,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      trials: DEFAULT_TRIALS,
      trial_timeout: DEFAULT_TRIAL_TIMEOUT,
      run_budget: Some(DEFAULT_RUN_BUDGET),
      linger: DEFAULT_LINGER,
      sandboxed: false,
      interleaving: Interleaving::Free,
    }
  }
}

impl Config {
  pub fn with_trials(mut self, trials: usize) -> Self {
    self.trials = trials;
    self
  }

  pub fn with_trial_timeout(mut self, timeout: Duration) -> Self {
    self.trial_timeout = timeout;
    self
  }

  pub fn with_run_budget(mut self, budget: Option<Duration>) -> Self {
    self.run_budget = budget;
    self
  }

  pub fn with_linger(mut self, linger: Duration) -> Self {
    self.linger = linger;
    self
  }

  pub fn with_sandboxed(mut self, sandboxed: bool) -> Self {
    self.sandboxed = sandboxed;
    self
  }

  pub fn with_interleaving(mut self, interleaving: Interleaving) -> Self {
    self.interleaving = interleaving;
    self
  }

  /// Defaults overridden by the `LIO_RACE_*` environment variables.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|var| std::env::var(var).ok())
  }

  fn from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
  ) -> Result<Self, ConfigError> {
    let mut config = Self::default();
    let invalid =
      |var: &'static str, value: &str| ConfigError { var, value: value.to_owned() };

    if let Some(value) = lookup(ENV_TRIALS) {
      config.trials =
        value.trim().parse().map_err(|_| invalid(ENV_TRIALS, &value))?;
    }

    if let Some(value) = lookup(ENV_SEED) {
      let trimmed = value.trim();
      let seed = match trimmed.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse(),
      }
      .map_err(|_| invalid(ENV_SEED, &value))?;
      config.interleaving = Interleaving::Seeded(seed);
    }

    if let Some(value) = lookup(ENV_SANDBOXED) {
      config.sandboxed = match value.trim() {
        "1" | "true" | "yes" => true,
        "0" | "false" | "no" | "" => false,
        _ => return Err(invalid(ENV_SANDBOXED, &value)),
      };
    }

    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    move |var| map.get(var).cloned()
  }

  #[test]
  fn defaults_match_constants() {
    let config = Config::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.trials, 10_000);
    assert_eq!(config.linger, Duration::from_secs(15));
    assert!(!config.sandboxed);
  }

  #[test]
  fn overrides_apply() {
    let config = Config::from_lookup(lookup(&[
      (ENV_TRIALS, "250"),
      (ENV_SEED, "0x2a"),
      (ENV_SANDBOXED, "true"),
    ]))
    .unwrap();

    assert_eq!(config.trials, 250);
    assert_eq!(config.interleaving, Interleaving::Seeded(42));
    assert!(config.sandboxed);
  }

  #[test]
  fn garbage_is_reported_with_variable_name() {
    let err = Config::from_lookup(lookup(&[(ENV_SANDBOXED, "maybe")])).unwrap_err();
    assert_eq!(err, ConfigError { var: ENV_SANDBOXED, value: "maybe".into() });

    let err = Config::from_lookup(lookup(&[(ENV_TRIALS, "-3")])).unwrap_err();
    assert_eq!(err.var, ENV_TRIALS);
  }
}
