//! Configuration sources for layered settings
//!
//! Sources are merged in priority order (environment variables > TOML files >
//! in-memory maps); a key loaded from a higher priority source replaces the same
//! key from a lower one.

use crate::settings::SettingsError;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync {
	/// Load the flat key/value pairs provided by this source
	fn load(&self) -> Result<IndexMap<String, String>, SettingsError>;

	/// Get the priority of this source (higher = more important)
	fn priority(&self) -> u8;

	/// Get a description of this source
	fn description(&self) -> String;
}

/// In-memory settings, typically the mapping handed to the configurator
#[derive(Debug, Clone, Default)]
pub struct MapSource {
	values: IndexMap<String, String>,
}

impl MapSource {
	/// Create an empty map source
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a key/value pair using builder style
	///
	/// # Examples
	///
	/// ```
	/// use cornice_conf::{ConfigSource, MapSource};
	///
	/// let source = MapSource::new().with("debug_all", "true");
	/// assert_eq!(source.load().unwrap()["debug_all"], "true");
	/// ```
	pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.values.insert(key.into(), value.into());
		self
	}
}

impl<K, V> FromIterator<(K, V)> for MapSource
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			values: iter
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		}
	}
}

impl ConfigSource for MapSource {
	fn load(&self) -> Result<IndexMap<String, String>, SettingsError> {
		Ok(self.values.clone())
	}

	fn priority(&self) -> u8 {
		10
	}

	fn description(&self) -> String {
		format!("in-memory settings ({} keys)", self.values.len())
	}
}

/// Environment variable source
///
/// Only variables starting with the prefix (`CORNICE_` by default) are read.
/// The prefix is stripped and the rest lowercased, so `CORNICE_DEBUG_NOTFOUND`
/// becomes `debug_notfound`.
pub struct EnvSource {
	prefix: String,
	vars: Option<Vec<(String, String)>>,
}

impl EnvSource {
	/// Create a source reading the process environment
	pub fn new() -> Self {
		Self {
			prefix: "CORNICE_".to_string(),
			vars: None,
		}
	}

	/// Create a source over an explicit set of variables instead of the process environment
	///
	/// # Examples
	///
	/// ```
	/// use cornice_conf::{ConfigSource, EnvSource};
	///
	/// let source = EnvSource::from_vars([
	///     ("CORNICE_DEBUG_ROUTEMATCH".to_string(), "1".to_string()),
	///     ("PATH".to_string(), "/usr/bin".to_string()),
	/// ]);
	/// let values = source.load().unwrap();
	/// assert_eq!(values.len(), 1);
	/// assert_eq!(values["debug_routematch"], "1");
	/// ```
	pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
		Self {
			prefix: "CORNICE_".to_string(),
			vars: Some(vars.into_iter().collect()),
		}
	}

	/// Set the prefix filter for environment variables
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = prefix.into();
		self
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for EnvSource {
	fn load(&self) -> Result<IndexMap<String, String>, SettingsError> {
		let vars: Vec<(String, String)> = match &self.vars {
			Some(vars) => vars.clone(),
			None => std::env::vars().collect(),
		};

		let mut config = IndexMap::new();
		for (key, value) in vars {
			if let Some(stripped) = key.strip_prefix(&self.prefix) {
				config.insert(stripped.to_lowercase(), value);
			}
		}
		Ok(config)
	}

	fn priority(&self) -> u8 {
		100
	}

	fn description(&self) -> String {
		format!("environment variables ({}*)", self.prefix)
	}
}

/// TOML file source
///
/// Nested tables are flattened with `.` separators, scalars are stringified and
/// arrays are joined with newlines (so a `tweens = [..]` array reads back as a list).
pub struct TomlFileSource {
	path: PathBuf,
}

impl TomlFileSource {
	/// Create a source for the given file path
	pub fn new(path: impl AsRef<Path>) -> Self {
		Self {
			path: path.as_ref().to_path_buf(),
		}
	}
}

impl ConfigSource for TomlFileSource {
	fn load(&self) -> Result<IndexMap<String, String>, SettingsError> {
		let content = std::fs::read_to_string(&self.path)?;
		let table: toml::Table = toml::from_str(&content)?;

		let mut config = IndexMap::new();
		flatten_table(None, &table, &mut config);
		Ok(config)
	}

	fn priority(&self) -> u8 {
		50
	}

	fn description(&self) -> String {
		format!("TOML file: {}", self.path.display())
	}
}

fn flatten_table(prefix: Option<&str>, table: &toml::Table, out: &mut IndexMap<String, String>) {
	for (key, value) in table {
		let full_key = match prefix {
			Some(prefix) => format!("{}.{}", prefix, key),
			None => key.clone(),
		};
		match value {
			toml::Value::Table(inner) => flatten_table(Some(&full_key), inner, out),
			other => {
				out.insert(full_key, stringify(other));
			}
		}
	}
}

fn stringify(value: &toml::Value) -> String {
	match value {
		toml::Value::String(s) => s.clone(),
		toml::Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join("\n"),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::io::Write;

	#[rstest]
	fn test_env_source_custom_prefix() {
		// Arrange
		let source = EnvSource::from_vars([
			("APP_DEBUG_ALL".to_string(), "true".to_string()),
			("CORNICE_DEBUG_ALL".to_string(), "false".to_string()),
		])
		.with_prefix("APP_");

		// Act
		let values = source.load().unwrap();

		// Assert
		assert_eq!(values.len(), 1);
		assert_eq!(values["debug_all"], "true");
	}

	#[rstest]
	fn test_toml_source_flattens_tables_and_arrays() {
		// Arrange
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			"debug_notfound = true\ntweens = [\"a:one\", \"b:two\"]\n[cornice]\ndefault_locale_name = \"fr\""
		)
		.unwrap();
		let source = TomlFileSource::new(file.path());

		// Act
		let values = source.load().unwrap();

		// Assert
		assert_eq!(values["debug_notfound"], "true");
		assert_eq!(values["tweens"], "a:one\nb:two");
		assert_eq!(values["cornice.default_locale_name"], "fr");
	}

	#[rstest]
	fn test_toml_source_missing_file_is_error() {
		let source = TomlFileSource::new("/definitely/not/here.toml");
		assert!(matches!(source.load(), Err(SettingsError::Io(_))));
	}
}
