//! Configuration file discovery and deserialization.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and the
//! deserialization helper used by [`crate::config`].

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required configuration file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A value parsed but is out of range.
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_config_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, ConfigError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(ConfigError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_config_file`], but returns an error if no file is found.
pub fn require_config_file(dir: &Path, base_name: &str) -> Result<PathBuf, ConfigError> {
    find_config_file(dir, base_name)?.ok_or_else(|| ConfigError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format).map_err(|detail| ConfigError::Parse {
        file: path.to_path_buf(),
        detail,
    })
}

/// Deserialize in-memory text in the given format.
pub fn deserialize_str<T: DeserializeOwned>(content: &str, format: Format) -> Result<T, String> {
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        Format::Toml => toml::from_str(content).map_err(|e| e.to_string()),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[derive(Debug, serde::Deserialize)]
    struct FloorsOnly {
        floors: u32,
    }

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "automail_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    // -----------------------------------------------------------------------
    // detect_format
    // -----------------------------------------------------------------------

    #[test]
    fn detect_known_formats() {
        assert_eq!(detect_format(Path::new("a.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("a.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("a.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_format_unsupported() {
        assert!(matches!(
            detect_format(Path::new("automail.properties")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("automail")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // find_config_file
    // -----------------------------------------------------------------------

    #[test]
    fn find_config_file_found_toml() {
        let dir = make_test_dir("find_toml");
        fs::write(dir.join("automail.toml"), "floors = 3").unwrap();

        let result = find_config_file(&dir, "automail").unwrap();
        assert_eq!(result, Some(dir.join("automail.toml")));

        cleanup(&dir);
    }

    #[test]
    fn find_config_file_missing() {
        let dir = make_test_dir("find_missing");
        assert_eq!(find_config_file(&dir, "automail").unwrap(), None);
        assert!(matches!(
            require_config_file(&dir, "automail"),
            Err(ConfigError::MissingRequired { .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn find_config_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("automail.ron"), "()").unwrap();
        fs::write(dir.join("automail.json"), "{}").unwrap();

        let result = find_config_file(&dir, "automail");
        assert!(matches!(
            result,
            Err(ConfigError::ConflictingFormats { .. })
        ));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // deserialize_file
    // -----------------------------------------------------------------------

    #[test]
    fn deserialize_each_format() {
        let dir = make_test_dir("deser");
        let cases = [
            ("a.ron", "(floors: 4)"),
            ("b.toml", "floors = 4"),
            ("c.json", r#"{"floors": 4}"#),
        ];
        for (name, body) in cases {
            let path = dir.join(name);
            fs::write(&path, body).unwrap();
            let parsed: FloorsOnly = deserialize_file(&path).unwrap();
            assert_eq!(parsed.floors, 4, "{name}");
        }
        cleanup(&dir);
    }

    #[test]
    fn deserialize_file_parse_error() {
        let dir = make_test_dir("deser_parse_err");
        let path = dir.join("bad.ron");
        fs::write(&path, "this is not valid RON {{{").unwrap();

        let result: Result<FloorsOnly, _> = deserialize_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));

        cleanup(&dir);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result: Result<FloorsOnly, _> = deserialize_file(Path::new("/nonexistent/automail.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn error_display_messages() {
        let e = ConfigError::ConflictingFormats {
            a: PathBuf::from("automail.ron"),
            b: PathBuf::from("automail.json"),
        };
        let msg = e.to_string();
        assert!(msg.contains("automail.ron"));
        assert!(msg.contains("automail.json"));

        let e = ConfigError::Invalid {
            field: "floors",
            reason: "must be at least 1".into(),
        };
        assert_eq!(e.to_string(), "invalid floors: must be at least 1");
    }
}
