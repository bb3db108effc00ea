//! # Cornice Dispatch
//!
//! Request dispatching for cornice applications.
//!
//! ## Overview
//!
//! The [`Router`] takes a committed [`Registry`](cornice_core::Registry) and
//! handles each request:
//! - Route matching, swapping in the route's root factory and request type
//! - Traversal from the root to the context resource
//! - View lookup and invocation, trying the next view on a predicate mismatch
//! - Exception view fallback for errors raised along the way
//! - Request lifecycle events and response/finished callbacks
//!
//! ## Architecture
//!
//! ```text
//! Request → Tweens (… → EXCVIEW → …) → RequestHandler → View → Response
//!                      ↓                       ↓
//!               exception views         NewRequest, ContextFound,
//!                                       NewResponse events
//! ```
//!
//! Exception views are served by the tween registered as
//! [`EXCVIEW_NAME`](cornice_core::tweens::EXCVIEW_NAME); a registry without it
//! lets every error reach the caller.
//!
//! Dispatch is synchronous; a transport serving concurrent requests calls
//! [`Router::invoke_request`] from as many threads as it likes.
//!
//! ## Examples
//!
//! ```rust
//! use cornice_core::http::{Request, Response};
//! use cornice_core::interfaces::{IRequest, IViewClassifier, Interface};
//! use cornice_core::registry::Registry;
//! use cornice_core::resource::Context;
//! use cornice_core::view::{View, ViewKey};
//! use cornice_dispatch::Router;
//! use std::sync::Arc;
//!
//! struct Home;
//! impl View for Home {
//!     fn call(&self, _: &Context, _: &mut Request) -> cornice_core::Result<Response> {
//!         Ok(Response::text_plain("home"))
//!     }
//! }
//!
//! let mut registry = Registry::new("app");
//! registry.register_view(
//!     ViewKey::new(
//!         Interface::of::<IViewClassifier>(),
//!         Interface::of::<IRequest>(),
//!         Interface::any(),
//!         "",
//!     ),
//!     Arc::new(Home),
//! );
//! let router = Router::new(Arc::new(registry)).unwrap();
//!
//! let response = router.invoke_request(&mut Request::blank("/")).unwrap();
//! assert_eq!(response.text(), "home");
//!
//! let missing = router.respond(Request::blank("/nothing/here"));
//! assert_eq!(missing.status(), http::StatusCode::NOT_FOUND);
//! ```

pub mod excview;
pub mod router;

// Re-exports
pub use excview::{ExceptionViewHandler, excview_tween_factory, handle_exception};
pub use router::Router;
