//! Untyped configuration lookup over JSON, YAML and TOML files.
//!
//! [`FileConfig`] parses a whole file into a tree and answers dotted-key
//! queries such as `"server.http.addr"`. The typed getters of [`Config`]
//! never fail: a missing key or a value of the wrong type yields the zero
//! value of the requested type.

use crate::ConfigError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Read access to configuration values by dotted key.
pub trait Config: Send + Sync {
    /// Returns the value at `key`, or `None` if any segment is missing.
    ///
    /// A key naming a section returns the whole section.
    fn get(&self, key: &str) -> Option<&Value>;

    /// Returns the string at `key`, or `""`.
    fn get_string(&self, key: &str) -> String {
        self.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default()
    }

    /// Returns the integer at `key`, or `0`.
    ///
    /// Floating point values are truncated.
    #[allow(clippy::cast_possible_truncation)]
    fn get_int(&self, key: &str) -> i64 {
        match self.get(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// Returns the boolean at `key`, or `false`.
    fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Returns the number at `key`, or `0.0`.
    fn get_f64(&self, key: &str) -> f64 {
        self.get(key).and_then(Value::as_f64).unwrap_or(0.0)
    }
}

/// A configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// JSON.
    Json,
    /// YAML (`.yaml` or `.yml`).
    Yaml,
    /// TOML.
    Toml,
}

impl FileFormat {
    /// Selects the format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnsupportedFormat` for a missing or unknown
    /// extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        extension.parse()
    }

    /// Returns the canonical name of the format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
        }
    }

    fn parse_tree(self, content: &str) -> Result<Value, ConfigError> {
        let value = match self {
            Self::Json => serde_json::from_str(content)?,
            Self::Yaml => serde_yaml::from_str(content)?,
            Self::Toml => toml::from_str(content)?,
        };
        Ok(value)
    }
}

impl FromStr for FileFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            _ => Err(ConfigError::unsupported_format(s)),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration parsed from a file.
///
/// # Example
///
/// ```
/// use hermes_config::{Config, FileConfig, FileFormat};
///
/// let config = FileConfig::from_str("server:\n  port: 8080\n", FileFormat::Yaml).unwrap();
/// assert_eq!(config.get_int("server.port"), 8080);
/// assert_eq!(config.get_string("server.host"), "");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FileConfig {
    data: Value,
}

impl FileConfig {
    /// Reads and parses the file at `path`.
    ///
    /// The format is chosen from the extension, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the extension is unsupported, the file cannot
    /// be read, or the content does not parse into a mapping.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = FileFormat::from_path(path)?;

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        Self::from_str(&content, format)
    }

    /// Parses `content` in the given format.
    ///
    /// An empty document is an empty mapping.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the content does not parse, or parses into
    /// something other than a mapping.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str, format: FileFormat) -> Result<Self, ConfigError> {
        let data = match format.parse_tree(content)? {
            Value::Null => Value::Object(Map::new()),
            object @ Value::Object(_) => object,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "{format} configuration root must be a mapping"
                )))
            }
        };
        Ok(Self { data })
    }

    /// Deserialises the section at `key` into `T`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` if the key is absent, and
    /// `ConfigError::JsonError` if the section does not match `T`.
    pub fn section<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        let value = self.get(key).ok_or_else(|| ConfigError::missing_field(key))?;
        Ok(T::deserialize(value)?)
    }

    /// Returns the whole tree.
    #[must_use]
    pub const fn data(&self) -> &Value {
        &self.data
    }

    pub(crate) fn into_data(self) -> Value {
        self.data
    }
}

impl Config for FileConfig {
    fn get(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.data, |current, segment| current.as_object()?.get(segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    const YAML: &str = r"
server:
  http:
    addr: 0.0.0.0:8000
    timeout: 1.5
  grpc:
    port: 9000
    enabled: true
name: alerting
";

    #[derive(Deserialize)]
    struct Grpc {
        port: u16,
        enabled: bool,
    }

    fn yaml() -> FileConfig {
        FileConfig::from_str(YAML, FileFormat::Yaml).unwrap()
    }

    #[test]
    fn test_nested_lookup() {
        let config = yaml();
        assert_eq!(config.get_string("server.http.addr"), "0.0.0.0:8000");
        assert_eq!(config.get_int("server.grpc.port"), 9000);
        assert!(config.get_bool("server.grpc.enabled"));
        assert_eq!(config.get_f64("server.http.timeout"), 1.5);
        assert_eq!(config.get_string("name"), "alerting");
    }

    #[test]
    fn test_missing_keys_are_zero_values() {
        let config = yaml();
        assert!(config.get("server.missing").is_none());
        assert_eq!(config.get_string("nope"), "");
        assert_eq!(config.get_int("nope"), 0);
        assert!(!config.get_bool("nope"));
        assert_eq!(config.get_f64("nope"), 0.0);
    }

    #[test]
    fn test_type_mismatch_is_zero_value() {
        let config = yaml();
        assert_eq!(config.get_string("server.grpc.port"), "");
        assert_eq!(config.get_int("name"), 0);
        assert!(!config.get_bool("server.http.addr"));
    }

    #[test]
    fn test_float_truncates_to_int() {
        assert_eq!(yaml().get_int("server.http.timeout"), 1);
    }

    #[test]
    fn test_scalar_is_not_a_section() {
        assert!(yaml().get("name.first").is_none());
    }

    #[test]
    fn test_section_value() {
        let config = yaml();
        let grpc = config.get("server.grpc").unwrap();
        assert!(grpc.is_object());

        let grpc: Grpc = config.section("server.grpc").unwrap();
        assert_eq!(grpc.port, 9000);
        assert!(grpc.enabled);

        assert!(matches!(
            config.section::<Grpc>("server.rest"),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_json_and_toml() {
        let json = FileConfig::from_str(r#"{"db": {"pool": 8}}"#, FileFormat::Json).unwrap();
        assert_eq!(json.get_int("db.pool"), 8);

        let toml = FileConfig::from_str("[db]\npool = 8\n", FileFormat::Toml).unwrap();
        assert_eq!(toml.get_int("db.pool"), 8);
    }

    #[test]
    fn test_empty_document() {
        let config = FileConfig::from_str("", FileFormat::Yaml).unwrap();
        assert_eq!(config.data(), &Value::Object(Map::new()));
    }

    #[test]
    fn test_non_mapping_root_rejected() {
        assert!(FileConfig::from_str("[1, 2]", FileFormat::Json).is_err());
        assert!(FileConfig::from_str("- a\n- b\n", FileFormat::Yaml).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.JSON")).unwrap(), FileFormat::Json);
        assert_eq!(FileFormat::from_path(Path::new("a.yml")).unwrap(), FileFormat::Yaml);
        assert_eq!(FileFormat::from_path(Path::new("a.Yaml")).unwrap(), FileFormat::Yaml);
        assert_eq!(FileFormat::from_path(Path::new("a.toml")).unwrap(), FileFormat::Toml);
        assert!(matches!(
            FileFormat::from_path(Path::new("a.ini")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
        assert!(FileFormat::from_path(Path::new("config")).is_err());
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let config = FileConfig::from_path(file.path()).unwrap();
        assert_eq!(config.get_int("server.grpc.port"), 9000);
    }

    #[test]
    fn test_from_path_errors() {
        assert!(matches!(
            FileConfig::from_path("/nonexistent/hermes.yaml"),
            Err(ConfigError::FileNotFound { .. })
        ));

        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(b"{not json").unwrap();
        assert!(matches!(
            FileConfig::from_path(file.path()),
            Err(ConfigError::JsonError(_))
        ));
    }
}
