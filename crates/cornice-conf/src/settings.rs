//! The settings mapping and its recognised keys

use crate::convert::{as_bool, as_list};
use crate::sources::ConfigSource;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Prefix that may be used to namespace recognised keys (`cornice.debug_notfound`)
pub const SETTINGS_PREFIX: &str = "cornice.";

/// Error type for settings loading
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("Invalid source {source_name}: {message}")]
	InvalidSource {
		source_name: String,
		message: String,
	},
}

/// Application settings
///
/// A flat mapping of every configured key plus the parsed values of the keys
/// the framework itself reads.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
	values: IndexMap<String, String>,

	/// Log the permit/deny decision of every secured view
	pub debug_authorization: bool,

	/// Log rich diagnostics when no view can be found for a request
	pub debug_notfound: bool,

	/// Log every route match (and miss)
	pub debug_routematch: bool,

	/// Ignore `http_cache` view options
	pub prevent_http_cache: bool,

	/// Locale used when no negotiator decides otherwise
	pub default_locale_name: String,

	/// Explicit tween order (dotted names); empty means "use the implicit order"
	pub tweens: Vec<String>,
}

impl Settings {
	/// Create settings with every recognised key at its default
	///
	/// # Examples
	///
	/// ```
	/// use cornice_conf::Settings;
	///
	/// let settings = Settings::new();
	/// assert!(!settings.debug_notfound);
	/// assert_eq!(settings.default_locale_name, "en");
	/// assert!(settings.tweens.is_empty());
	/// ```
	pub fn new() -> Self {
		Self::from_values(IndexMap::new())
	}

	/// Build settings from a flat mapping, parsing the recognised keys
	///
	/// Recognised keys may be given bare or with the `cornice.` prefix; the bare
	/// spelling wins when both are present. `debug_all` switches every debug flag on.
	///
	/// # Examples
	///
	/// ```
	/// use cornice_conf::Settings;
	/// use indexmap::IndexMap;
	///
	/// let mut values = IndexMap::new();
	/// values.insert("cornice.debug_all".to_string(), "true".to_string());
	/// values.insert("app.title".to_string(), "demo".to_string());
	///
	/// let settings = Settings::from_values(values);
	/// assert!(settings.debug_authorization);
	/// assert!(settings.debug_notfound);
	/// assert!(settings.debug_routematch);
	/// assert_eq!(settings.get("app.title"), Some("demo"));
	/// ```
	pub fn from_values(values: IndexMap<String, String>) -> Self {
		let mut settings = Self {
			values,
			debug_authorization: false,
			debug_notfound: false,
			debug_routematch: false,
			prevent_http_cache: false,
			default_locale_name: "en".to_string(),
			tweens: Vec::new(),
		};
		settings.reparse();
		settings
	}

	fn lookup(&self, key: &str) -> Option<&str> {
		self.values
			.get(key)
			.or_else(|| self.values.get(&format!("{}{}", SETTINGS_PREFIX, key)))
			.map(String::as_str)
	}

	fn flag(&self, key: &str) -> bool {
		self.lookup(key).map(as_bool).unwrap_or(false)
	}

	fn reparse(&mut self) {
		let debug_all = self.flag("debug_all");
		self.debug_authorization = debug_all || self.flag("debug_authorization");
		self.debug_notfound = debug_all || self.flag("debug_notfound");
		self.debug_routematch = debug_all || self.flag("debug_routematch");
		self.prevent_http_cache = self.flag("prevent_http_cache");
		self.default_locale_name = self
			.lookup("default_locale_name")
			.unwrap_or("en")
			.to_string();
		self.tweens = self.lookup("tweens").map(as_list).unwrap_or_default();
	}

	/// Get a raw setting value
	pub fn get(&self, key: &str) -> Option<&str> {
		self.values.get(key).map(String::as_str)
	}

	/// Get a raw setting value interpreted as a boolean (missing keys are `false`)
	pub fn get_bool(&self, key: &str) -> bool {
		self.get(key).map(as_bool).unwrap_or(false)
	}

	/// Merge additional values into the mapping, re-parsing recognised keys
	///
	/// # Examples
	///
	/// ```
	/// use cornice_conf::Settings;
	///
	/// let mut settings = Settings::new();
	/// settings.update([("debug_notfound", "yes")]);
	/// assert!(settings.debug_notfound);
	/// ```
	pub fn update<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>)
	where
		K: Into<String>,
		V: Into<String>,
	{
		for (key, value) in values {
			self.values.insert(key.into(), value.into());
		}
		self.reparse();
	}

	/// Iterate over every raw key/value pair in insertion order
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Number of raw keys
	pub fn len(&self) -> usize {
		self.values.len()
	}

	/// Whether no raw keys are set
	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

impl Default for Settings {
	fn default() -> Self {
		Self::new()
	}
}

/// Builder merging several [`ConfigSource`]s into [`Settings`]
#[derive(Default)]
pub struct SettingsBuilder {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl SettingsBuilder {
	/// Create a builder with no sources
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a source
	pub fn add_source(mut self, source: impl ConfigSource + 'static) -> Self {
		self.sources.push(Box::new(source));
		self
	}

	/// Load every source (lowest priority first) and build the settings
	pub fn build(mut self) -> Result<Settings, SettingsError> {
		self.sources.sort_by_key(|source| source.priority());

		let mut values = IndexMap::new();
		for source in &self.sources {
			let loaded = source.load()?;
			tracing::debug!(
				target: "cornice::conf",
				source = %source.description(),
				keys = loaded.len(),
				"loaded settings source"
			);
			values.extend(loaded);
		}
		Ok(Settings::from_values(values))
	}
}
