//! # Cornice Configuration
//!
//! Settings management for cornice applications.
//!
//! Settings are a flat, ordered `String → String` mapping read once at
//! configuration time. A handful of keys are recognised and parsed into typed
//! fields (debug flags, the explicit tween order, cache prevention); every other
//! key is kept verbatim and stays readable through [`Settings::get`].
//!
//! ## Sources
//!
//! Values can be merged from several [`ConfigSource`]s in priority order
//! (environment variables > TOML files > in-memory defaults):
//!
//! ```rust
//! use cornice_conf::{MapSource, SettingsBuilder};
//!
//! let settings = SettingsBuilder::new()
//!     .add_source(MapSource::new().with("debug_notfound", "true"))
//!     .build()
//!     .unwrap();
//! assert!(settings.debug_notfound);
//! assert!(!settings.debug_routematch);
//! ```

pub mod convert;
pub mod settings;
pub mod sources;

pub use convert::{as_bool, as_list};
pub use settings::{Settings, SettingsBuilder, SettingsError};
pub use sources::{ConfigSource, EnvSource, MapSource, TomlFileSource};
