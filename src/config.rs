//! Compilation options and their environment overrides.

use std::env;

/// Environment variable that toggles the in-place update rewrite.
pub const OPT_ENV: &str = "RCLEARC_OPT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
  /// Rewrite `x = x + k` / `x = x - k` into a single memory update.
  pub in_place_updates: bool,
}

impl Default for CompileOptions {
  fn default() -> Self {
    Self {
      in_place_updates: true,
    }
  }
}

impl CompileOptions {
  /// Options with every rewrite disabled; each statement goes through the
  /// general evaluator.
  pub fn unoptimized() -> Self {
    Self {
      in_place_updates: false,
    }
  }

  /// Defaults, adjusted by `RCLEARC_OPT`.
  pub fn from_env() -> Self {
    Self::from_opt_value(env::var(OPT_ENV).ok().as_deref())
  }

  fn from_opt_value(value: Option<&str>) -> Self {
    let disabled = value
      .map(|value| {
        matches!(
          value.trim().to_ascii_lowercase().as_str(),
          "0" | "false" | "no" | "off"
        )
      })
      .unwrap_or(false);
    Self {
      in_place_updates: !disabled,
    }
  }
}
