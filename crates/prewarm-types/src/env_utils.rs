//! Environment variable parsing utilities.
//!
//! Type-safe helpers for reading configuration from the process environment
//! with default values, eliminating repeated boilerplate like:
//!
//! ```ignore
//! std::env::var("VAR_NAME")
//!     .ok()
//!     .and_then(|v| v.parse::<u64>().ok())
//!     .unwrap_or(default_value)
//! ```

use std::str::FromStr;

/// Parse an environment variable into a type that implements `FromStr`.
///
/// Returns `None` if the variable is not set or cannot be parsed.
///
/// # Example
///
/// ```
/// use prewarm_types::env_utils::env_var;
///
/// let value: Option<u64> = env_var("MY_VAR");
/// ```
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Parse an environment variable with a default value.
///
/// Returns the default if the variable is not set or cannot be parsed.
///
/// # Example
///
/// ```
/// use prewarm_types::env_utils::env_var_or;
///
/// let timeout: u64 = env_var_or("TIMEOUT_MS", 5000);
/// ```
pub fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    env_var(key).unwrap_or(default)
}

/// Check if an environment variable is set to a truthy value.
///
/// Returns `true` if the variable is set to "1", "true", "yes", or "on"
/// (case-insensitive). Returns `false` otherwise.
pub fn env_bool(key: &str) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_parsing() {
        std::env::set_var("PREWARM_TEST_U64", "42");
        let val: Option<u64> = env_var("PREWARM_TEST_U64");
        assert_eq!(val, Some(42));

        let missing: Option<u64> = env_var("PREWARM_NONEXISTENT_VAR_12345");
        assert_eq!(missing, None);

        std::env::remove_var("PREWARM_TEST_U64");
    }

    #[test]
    fn test_env_var_or() {
        std::env::set_var("PREWARM_TEST_WITH_DEFAULT", "100");
        let val: u64 = env_var_or("PREWARM_TEST_WITH_DEFAULT", 50);
        assert_eq!(val, 100);

        let default_val: u64 = env_var_or("PREWARM_NONEXISTENT_VAR_12346", 50);
        assert_eq!(default_val, 50);

        std::env::remove_var("PREWARM_TEST_WITH_DEFAULT");
    }

    #[test]
    fn test_env_var_unparseable_falls_back() {
        std::env::set_var("PREWARM_TEST_GARBAGE", "not a number");
        let val: u64 = env_var_or("PREWARM_TEST_GARBAGE", 7);
        assert_eq!(val, 7);
        std::env::remove_var("PREWARM_TEST_GARBAGE");
    }

    #[test]
    fn test_env_bool() {
        std::env::set_var("PREWARM_TEST_BOOL_TRUE", "true");
        std::env::set_var("PREWARM_TEST_BOOL_1", "1");
        std::env::set_var("PREWARM_TEST_BOOL_YES", "YES");
        std::env::set_var("PREWARM_TEST_BOOL_FALSE", "false");

        assert!(env_bool("PREWARM_TEST_BOOL_TRUE"));
        assert!(env_bool("PREWARM_TEST_BOOL_1"));
        assert!(env_bool("PREWARM_TEST_BOOL_YES"));
        assert!(!env_bool("PREWARM_TEST_BOOL_FALSE"));
        assert!(!env_bool("PREWARM_NONEXISTENT_VAR_12347"));

        std::env::remove_var("PREWARM_TEST_BOOL_TRUE");
        std::env::remove_var("PREWARM_TEST_BOOL_1");
        std::env::remove_var("PREWARM_TEST_BOOL_YES");
        std::env::remove_var("PREWARM_TEST_BOOL_FALSE");
    }
}
