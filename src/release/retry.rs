//! Retry with exponential backoff for remote calls
//!
//! Only transient failures (transport errors, HTTP 5xx, HTTP 429) are retried.
//! The default policy makes a single attempt.

use crate::core::error::PublishError;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
  /// Total attempts including the first one
  #[serde(default = "default_attempts")]
  pub max_attempts: u32,

  #[serde(default = "default_initial_backoff_ms")]
  pub initial_backoff_ms: u64,

  #[serde(default = "default_max_backoff_ms")]
  pub max_backoff_ms: u64,

  #[serde(default = "default_multiplier")]
  pub multiplier: f64,
}

fn default_attempts() -> u32 {
  1
}

fn default_initial_backoff_ms() -> u64 {
  1_000
}

fn default_max_backoff_ms() -> u64 {
  30_000
}

fn default_multiplier() -> f64 {
  2.0
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: default_attempts(),
      initial_backoff_ms: default_initial_backoff_ms(),
      max_backoff_ms: default_max_backoff_ms(),
      multiplier: default_multiplier(),
    }
  }
}

impl RetryPolicy {
  pub fn validate(&self) -> Result<(), String> {
    if self.max_attempts == 0 {
      return Err("max_attempts must be at least 1".to_string());
    }
    if !self.multiplier.is_finite() || self.multiplier < 1.0 {
      return Err("multiplier must be a finite number >= 1.0".to_string());
    }
    if self.initial_backoff_ms > self.max_backoff_ms {
      return Err("initial_backoff_ms must not exceed max_backoff_ms".to_string());
    }
    Ok(())
  }

  /// Delay before retry number `retry` (1-based)
  pub fn backoff(&self, retry: u32) -> Duration {
    let factor = self.multiplier.powi(retry.saturating_sub(1) as i32);
    let millis = (self.initial_backoff_ms as f64 * factor).min(self.max_backoff_ms as f64);
    Duration::from_millis(millis as u64)
  }

  /// Run `op` until it succeeds, fails permanently, or attempts run out
  ///
  /// `op` receives the 1-based attempt number.
  pub fn run<T, F>(&self, label: &str, mut op: F) -> Result<T, PublishError>
  where
    F: FnMut(u32) -> Result<T, PublishError>,
  {
    let mut attempt = 1;
    loop {
      match op(attempt) {
        Ok(value) => return Ok(value),
        Err(err) if err.is_transient() && attempt < self.max_attempts => {
          let delay = self.backoff(attempt);
          tracing::warn!(
            operation = label,
            attempt,
            max_attempts = self.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "transient failure, retrying"
          );
          if !delay.is_zero() {
            thread::sleep(delay);
          }
          attempt += 1;
        }
        Err(err) => return Err(err),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fast(attempts: u32) -> RetryPolicy {
    RetryPolicy {
      max_attempts: attempts,
      initial_backoff_ms: 0,
      max_backoff_ms: 0,
      multiplier: 2.0,
    }
  }

  fn transient() -> PublishError {
    PublishError::Api {
      operation: "upload".to_string(),
      status: 503,
      message: "unavailable".to_string(),
    }
  }

  #[test]
  fn test_default_is_single_attempt() {
    let mut calls = 0;
    let result: Result<(), _> = RetryPolicy::default().run("op", |_| {
      calls += 1;
      Err(transient())
    });
    assert!(result.is_err());
    assert_eq!(calls, 1);
  }

  #[test]
  fn test_transient_failures_are_retried() {
    let mut calls = 0;
    let result = fast(3).run("op", |attempt| {
      calls += 1;
      if attempt < 3 { Err(transient()) } else { Ok(attempt) }
    });
    assert_eq!(result.unwrap(), 3);
    assert_eq!(calls, 3);
  }

  #[test]
  fn test_permanent_failures_are_not_retried() {
    let mut calls = 0;
    let result: Result<(), _> = fast(5).run("op", |_| {
      calls += 1;
      Err(PublishError::Api {
        operation: "create release".to_string(),
        status: 422,
        message: "already_exists".to_string(),
      })
    });
    assert!(result.is_err());
    assert_eq!(calls, 1);
  }

  #[test]
  fn test_backoff_grows_and_caps() {
    let policy = RetryPolicy {
      max_attempts: 5,
      initial_backoff_ms: 100,
      max_backoff_ms: 350,
      multiplier: 2.0,
    };
    assert_eq!(policy.backoff(1), Duration::from_millis(100));
    assert_eq!(policy.backoff(2), Duration::from_millis(200));
    assert_eq!(policy.backoff(3), Duration::from_millis(350));
  }

  #[test]
  fn test_validation() {
    assert!(RetryPolicy::default().validate().is_ok());
    assert!(fast(0).validate().is_err());
    let mut bad = fast(2);
    bad.multiplier = 0.5;
    assert!(bad.validate().is_err());
  }
}
