//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::CacheConfig;
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "ember.toml";

/// Loads and validates `ember.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<CacheConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE_NAME);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<CacheConfig, ConfigError> {
    let config: CacheConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates value ranges and host flag names.
fn validate_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.cache.max_objects == Some(0) {
        return Err(ConfigError::ValidationError(
            "cache.max_objects must be positive".to_string(),
        ));
    }
    for name in config.flags.extra.keys() {
        let valid = name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            && name.starts_with(|c: char| c.is_ascii_lowercase());
        if !valid {
            return Err(ConfigError::ValidationError(format!(
                "flag name '{name}' must be snake_case"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let config = load_config_from_str("").unwrap();
        assert!(config.cache.verify_checksum);
        assert!(!config.flags.native_stack_frames);
        assert!(config.flags.extra.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[cache]
verify_checksum = false
trace_serializer = true
profile = true
log_function_events = true
log_code_creation = true
eager_line_ends = true
stress_background_deserialize = true
max_objects = 4096

[flags]
native_stack_frames = true
optimize_for_size = true
harmony_shipping = true
stack_size = 984
"#;
        let config = load_config_from_str(toml).unwrap();
        assert!(!config.cache.verify_checksum);
        assert!(config.cache.trace_serializer);
        assert!(config.cache.profile);
        assert!(config.cache.log_function_events);
        assert!(config.cache.log_code_creation);
        assert!(config.cache.eager_line_ends);
        assert!(config.cache.stress_background_deserialize);
        assert_eq!(config.cache.max_objects, Some(4096));
        assert!(config.flags.native_stack_frames);
        assert!(config.flags.optimize_for_size);
        assert_eq!(config.flags.extra.len(), 2);
        assert_eq!(
            config.flags.extra["stack_size"],
            toml::Value::Integer(984)
        );
    }

    #[test]
    fn extra_flags_change_hash() {
        let plain = load_config_from_str("[flags]\n").unwrap();
        let extra = load_config_from_str("[flags]\nharmony_shipping = true\n").unwrap();
        assert_ne!(plain.flags.hash(), extra.flags.hash());
    }

    #[test]
    fn cache_settings_do_not_change_hash() {
        let a = load_config_from_str("[cache]\nverify_checksum = true\n").unwrap();
        let b = load_config_from_str("[cache]\nverify_checksum = false\n").unwrap();
        assert_eq!(a.flags.hash(), b.flags.hash());
    }

    #[test]
    fn zero_max_objects_errors() {
        let err = load_config_from_str("[cache]\nmax_objects = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn bad_flag_name_errors() {
        let err = load_config_from_str("[flags]\n\"Not-Snake\" = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[flags]\nnative_stack_frames = true\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert!(config.flags.native_stack_frames);
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
