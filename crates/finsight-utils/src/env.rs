//! Environment variable helpers

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while reading typed environment values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    /// Variable is required but not set
    #[error("{0} environment variable not set")]
    Missing(String),

    /// Variable is set but does not parse as the expected type
    #[error("{name} has invalid value '{value}': {detail}")]
    Invalid {
        name: String,
        value: String,
        detail: String,
    },
}

/// Load a `.env` file from the current directory or its parents, if any.
///
/// Returns the path of the applied file. Runs before logging is set up, so
/// reporting the path is left to the caller.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Read a variable, treating empty or whitespace-only values as unset.
pub fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse a variable. Unset yields `Ok(None)`.
pub fn env_parse<T>(name: &str) -> Result<Option<T>, EnvError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(name) {
        None => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(|e| EnvError::Invalid {
            name: name.to_string(),
            detail: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable name so they can run in parallel.

    #[test]
    fn test_env_opt_ignores_blank() {
        unsafe {
            std::env::set_var("FINSIGHT_TEST_BLANK", "   ");
        }
        assert_eq!(env_opt("FINSIGHT_TEST_BLANK"), None);
        unsafe {
            std::env::remove_var("FINSIGHT_TEST_BLANK");
        }
    }

    #[test]
    fn test_env_parse() {
        unsafe {
            std::env::set_var("FINSIGHT_TEST_NUMBER", "42");
            std::env::set_var("FINSIGHT_TEST_BAD_NUMBER", "forty-two");
        }

        assert_eq!(env_parse::<u32>("FINSIGHT_TEST_NUMBER"), Ok(Some(42)));
        assert_eq!(env_parse::<u32>("FINSIGHT_TEST_UNSET_NUMBER"), Ok(None));
        assert!(matches!(
            env_parse::<u32>("FINSIGHT_TEST_BAD_NUMBER"),
            Err(EnvError::Invalid { .. })
        ));

        unsafe {
            std::env::remove_var("FINSIGHT_TEST_NUMBER");
            std::env::remove_var("FINSIGHT_TEST_BAD_NUMBER");
        }
    }
}
