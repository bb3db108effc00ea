//! Core types: errors, interfaces, resources, requests and the registry.
//!
//! # Examples
//!
//! ```rust
//! use cornice::core::exception::Error;
//! use cornice::core::interfaces::{INotFound, Interface};
//!
//! let error = Error::NotFound("/missing".into());
//! assert!(error.provided().contains(&Interface::of::<INotFound>()));
//! ```

pub use cornice_core::*;
