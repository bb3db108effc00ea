//! # Cornice Core
//!
//! Core types shared by every cornice crate.
//!
//! ## Overview
//!
//! - [`exception`]: the error taxonomy and `Result` alias
//! - [`interfaces`]: interface markers used as registry keys
//! - [`resource`]: resource tree nodes (contexts)
//! - [`http`]: request, response and `Accept` negotiation
//! - [`predicates`]: the predicate compiler and ranking
//! - [`urldispatch`]: route patterns and the routes mapper
//! - [`traversal`]: root factories and the resource tree traverser
//! - [`tweens`]: request handler wrappers and their ordering graph
//! - [`registry`]: the component registry built by configuration
//!
//! ## Architecture
//!
//! ```text
//! Configurator ──builds──> Registry <──reads── Router ──> Tweens ──> View
//!                          (views, routes, tweens, renderers, policies)
//! ```
//!
//! ## Examples
//!
//! ```rust
//! use cornice_core::predicates::{PredicateOptions, compile_predicates};
//! use cornice_core::http::Request;
//! use http::Method;
//!
//! let set = compile_predicates(&PredicateOptions {
//!     request_method: Some(vec![Method::POST]),
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! let request = Request::builder().method(Method::POST).uri("/").build().unwrap();
//! let context: cornice_core::resource::Context =
//!     std::sync::Arc::new(cornice_core::traversal::DefaultRoot::default());
//! assert!(set.predicates.iter().all(|p| p.evaluate(&context, &request)));
//! ```

pub mod events;
pub mod exception;
pub mod http;
pub mod interfaces;
pub mod introspection;
pub mod predicates;
pub mod registry;
pub mod rendering;
pub mod resource;
pub mod security;
pub mod session;
pub mod traversal;
pub mod tweens;
pub mod urldispatch;
pub mod view;

// Re-exports
pub use exception::{Error, Result, SourceInfo};
pub use crate::http::{Request, Response};
pub use interfaces::{Interface, RequestType};
pub use registry::{Notifier, Registry};
pub use resource::{Context, Resource};
pub use tweens::{Handler, INGRESS, MAIN};
pub use view::{View, ViewKey};
