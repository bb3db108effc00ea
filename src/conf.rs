//! Settings and their sources.
//!
//! # Examples
//!
//! ```rust
//! use cornice::conf::Settings;
//!
//! let mut settings = Settings::new();
//! settings.update([("cornice.debug_all", "true")]);
//! assert!(settings.debug_routematch);
//! ```

pub use cornice_conf::*;
