//! Settings for formforge.
//!
//! This module provides the [`Settings`] struct, which decides whether forms
//! run interpreted or from generated units and where generated units live.
//! Settings are passed explicitly to the factories; there is no global instance.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How form strategies are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileMode {
    /// Always interpret the runtime strategy objects.
    Runtime,
    /// Load generated units from storage, compiling them on first use.
    #[default]
    Generated,
}

impl CompileMode {
    /// Parses a mode name as used in configuration files and environment variables.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "runtime" | "interpreted" => Some(Self::Runtime),
            "generated" | "compiled" => Some(Self::Generated),
            _ => None,
        }
    }
}

/// The complete set of formforge settings.
///
/// # Examples
///
/// ```
/// use formforge_core::settings::{CompileMode, Settings};
///
/// let settings = Settings::default();
/// assert_eq!(settings.compile_mode, CompileMode::Generated);
/// assert!(settings.unit_dir.ends_with("formforge"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled.
    pub debug: bool,

    // ── Compilation ──────────────────────────────────────────────────

    /// Interpreted or generated execution.
    pub compile_mode: CompileMode,
    /// Directory holding generated units.
    pub unit_dir: PathBuf,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log level (e.g. "info", "debug", "warn").
    pub log_level: String,

    // ── Escape hatch ─────────────────────────────────────────────────

    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            compile_mode: CompileMode::default(),
            unit_dir: default_unit_dir(),
            log_level: "info".to_string(),
            extra: HashMap::new(),
        }
    }
}

/// The default storage location for generated units: a process temp directory.
pub fn default_unit_dir() -> PathBuf {
    std::env::temp_dir().join("formforge")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert!(s.debug);
        assert_eq!(s.compile_mode, CompileMode::Generated);
        assert_eq!(s.unit_dir, std::env::temp_dir().join("formforge"));
        assert_eq!(s.log_level, "info");
        assert!(s.extra.is_empty());
    }

    #[test]
    fn test_compile_mode_parse() {
        assert_eq!(CompileMode::parse("runtime"), Some(CompileMode::Runtime));
        assert_eq!(CompileMode::parse(" Generated "), Some(CompileMode::Generated));
        assert_eq!(CompileMode::parse("compiled"), Some(CompileMode::Generated));
        assert_eq!(CompileMode::parse("jit"), None);
    }

    #[test]
    fn test_compile_mode_serde() {
        let json = serde_json::to_string(&CompileMode::Runtime).unwrap();
        assert_eq!(json, "\"runtime\"");
    }
}
