//! # Cornice Views
//!
//! Everything between a registered view callable and the response it
//! produces.
//!
//! ## Overview
//!
//! - [`mapper`]: the shapes a view callable may take and the mapper turning
//!   them into one `(context, request)` form
//! - [`deriver`]: the wrapping pipeline adding predicates, security, wrapper
//!   views, HTTP caching, decoration and rendering
//! - [`multiview`]: several views sharing one registration slot
//! - [`renderers`]: the `json` and `string` renderers
//! - [`static_view`]: serving files below a directory
//!
//! ## Examples
//!
//! ```rust
//! use cornice_core::http::Request;
//! use cornice_core::registry::Registry;
//! use cornice_core::resource::Context;
//! use cornice_core::traversal::DefaultRoot;
//! use cornice_core::view::View;
//! use cornice_views::{ViewCallable, ViewOptions, derive_view};
//! use std::sync::Arc;
//!
//! let registry = Registry::new("docs");
//! let view = ViewCallable::request_only(|_request| {
//!     Ok(cornice_core::http::Response::text_plain("hi"))
//! });
//! let derived = derive_view(&registry, &view, &ViewOptions::default()).unwrap();
//!
//! let context: Context = Arc::new(DefaultRoot::default());
//! let response = derived.call(&context, &mut Request::blank("/")).unwrap();
//! assert_eq!(response.text(), "hi");
//! ```

pub mod deriver;
pub mod mapper;
pub mod multiview;
pub mod render;
pub mod renderers;
pub mod static_view;

// Re-exports
pub use deriver::{DerivedView, HttpCache, ViewOptions, derive_view};
pub use mapper::{Signature, ViewCallable, ViewInstance, ViewOutput};
pub use multiview::{MultiView, ViewMatch};
pub use render::{render_view, render_view_to_response};
pub use renderers::register_default_renderers;
pub use static_view::StaticView;
