//! Settings loading from configuration files.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `FORMFORGE_DEBUG` | `debug` |
//! | `FORMFORGE_LOG_LEVEL` | `log_level` |
//! | `FORMFORGE_COMPILE_MODE` | `compile_mode` (`runtime` / `generated`) |
//! | `FORMFORGE_UNIT_DIR` | `unit_dir` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use formforge_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/formforge.toml").unwrap();
//! ```

use std::path::{Path, PathBuf};

use crate::error::FormforgeError;
use crate::settings::{CompileMode, Settings};

/// Loads settings from a TOML string.
///
/// Fields not present in the TOML keep their default values.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, FormforgeError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| FormforgeError::Configuration(format!("Failed to parse TOML: {e}")))?;
    merge_into_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, FormforgeError> {
    from_toml_str(&read_config(path.as_ref(), "TOML")?)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, FormforgeError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
pub fn from_json_str(json_str: &str) -> Result<Settings, FormforgeError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| FormforgeError::Configuration(format!("Failed to parse JSON: {e}")))?;
    merge_into_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, FormforgeError> {
    from_json_str(&read_config(path.as_ref(), "JSON")?)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies environment variable overrides to a settings struct.
///
/// An unrecognized `FORMFORGE_COMPILE_MODE` is ignored with a warning.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(val) = std::env::var("FORMFORGE_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Ok(val) = std::env::var("FORMFORGE_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("FORMFORGE_COMPILE_MODE") {
        match CompileMode::parse(&val) {
            Some(mode) => settings.compile_mode = mode,
            None => tracing::warn!(value = %val, "ignoring unknown FORMFORGE_COMPILE_MODE"),
        }
    }

    if let Ok(val) = std::env::var("FORMFORGE_UNIT_DIR") {
        if !val.is_empty() {
            settings.unit_dir = PathBuf::from(val);
        }
    }
}

// ============================================================
// Helpers
// ============================================================

fn read_config(path: &Path, format: &str) -> Result<String, FormforgeError> {
    std::fs::read_to_string(path).map_err(|e| {
        FormforgeError::Configuration(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_into_defaults(
    overrides: serde_json::Value,
    format: &str,
) -> Result<Settings, FormforgeError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        FormforgeError::Configuration(format!("Failed to serialize default settings: {e}"))
    })?;
    let merged = merge_json(default_json, overrides);
    serde_json::from_value(merged).map_err(|e| {
        FormforgeError::Configuration(format!("Failed to deserialize settings from {format}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml_str_basic() {
        let toml = r#"
            debug = false
            compile_mode = "runtime"
            unit_dir = "/var/cache/formforge"
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.compile_mode, CompileMode::Runtime);
        assert_eq!(settings.unit_dir, PathBuf::from("/var/cache/formforge"));
        // Defaults preserved
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_from_toml_str_empty() {
        let settings = from_toml_str("").unwrap();
        assert!(settings.debug);
        assert_eq!(settings.compile_mode, CompileMode::Generated);
    }

    #[test]
    fn test_from_toml_str_invalid() {
        assert!(from_toml_str("[[invalid toml content").is_err());
    }

    #[test]
    fn test_from_toml_str_unknown_mode() {
        let result = from_toml_str(r#"compile_mode = "jit""#);
        assert!(matches!(result, Err(FormforgeError::Configuration(_))));
    }

    #[test]
    fn test_from_toml_str_extra() {
        let toml = r#"
            [extra]
            team = "forms"
        "#;
        let settings = from_toml_str(toml).unwrap();
        assert_eq!(
            settings.extra.get("team"),
            Some(&serde_json::Value::String("forms".into()))
        );
    }

    #[test]
    fn test_from_json_str_basic() {
        let json = r#"{ "log_level": "debug", "compile_mode": "generated" }"#;
        let settings = from_json_str(json).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.compile_mode, CompileMode::Generated);
        assert!(settings.debug);
    }

    #[test]
    fn test_from_json_str_invalid() {
        assert!(from_json_str("{not json").is_err());
    }

    #[test]
    fn test_from_toml_file_missing() {
        let result = from_toml_file("/definitely/not/here/formforge.toml");
        assert!(matches!(result, Err(FormforgeError::Configuration(_))));
    }

    #[test]
    fn test_merge_json_nested() {
        let base = serde_json::json!({"a": {"b": 1, "c": 2}});
        let over = serde_json::json!({"a": {"c": 3}});
        assert_eq!(
            merge_json(base, over),
            serde_json::json!({"a": {"b": 1, "c": 3}})
        );
    }
}
