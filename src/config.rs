//! Process-wide cleaner settings
//!
//! Cleaning can be switched off with the `STACKSCRUB_DISABLE` environment
//! variable, for example when debugging the assertion library itself and
//! the full trace is wanted. The variable is read once per process.

use std::sync::OnceLock;

/// Environment variable that disables cleaning when set to a truthy value
pub const DISABLE_ENV_VAR: &str = "STACKSCRUB_DISABLE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanerConfig {
    /// Whether `clean_stack_trace` rewrites traces at all
    pub enabled: bool,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl CleanerConfig {
    pub fn from_env() -> Self {
        Self::from_disable_value(std::env::var(DISABLE_ENV_VAR).ok().as_deref())
    }

    /// Interpret the value of [`DISABLE_ENV_VAR`]; unset, empty, `0` and
    /// `false` keep cleaning enabled
    pub fn from_disable_value(value: Option<&str>) -> Self {
        let disabled = match value.map(str::trim) {
            None | Some("") | Some("0") => false,
            Some(v) => !v.eq_ignore_ascii_case("false"),
        };
        Self { enabled: !disabled }
    }

    /// Settings read from the environment on first use
    pub fn global() -> &'static CleanerConfig {
        static GLOBAL: OnceLock<CleanerConfig> = OnceLock::new();
        GLOBAL.get_or_init(Self::from_env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enabled() {
        assert!(CleanerConfig::default().enabled);
    }

    #[test]
    fn test_unset_or_falsy_keeps_enabled() {
        for value in [None, Some(""), Some("0"), Some("false"), Some("FALSE"), Some(" 0 ")] {
            assert!(CleanerConfig::from_disable_value(value).enabled, "{:?}", value);
        }
    }

    #[test]
    fn test_truthy_disables() {
        for value in ["1", "true", "yes"] {
            assert!(!CleanerConfig::from_disable_value(Some(value)).enabled, "{}", value);
        }
    }
}
