//! The configurator, its action ledger and dotted-name resolution.
//!
//! # Examples
//!
//! ```rust
//! use cornice::config::{Configurator, RouteConfig};
//!
//! let mut config = Configurator::new();
//! config.add_route("home", "/", RouteConfig::new()).unwrap();
//! assert_eq!(config.pending_actions(), 1);
//! ```

pub use cornice_config::*;
