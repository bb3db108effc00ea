//! # Cornice Config
//!
//! Declarative application configuration.
//!
//! ## Overview
//!
//! - [`configurator`]: the [`Configurator`], its scopes, `include` and
//!   building the application
//! - [`actions`]: the action ledger and conflict resolution
//! - [`dotted`]: resolving objects by dotted name
//! - view, route, tween and policy registration, as methods of the
//!   configurator
//!
//! ## Conflicts
//!
//! Registrations are recorded, not applied. On commit, two registrations of
//! the same thing conflict unless one was made in a scope including the
//! other, in which case the includer's wins:
//!
//! ```rust
//! use cornice_config::{Configurator, Include, ViewConfig};
//! use cornice_core::http::{Request, Response};
//! use cornice_views::ViewCallable;
//!
//! fn text(body: &'static str) -> ViewCallable {
//!     ViewCallable::request_only(move |_request| Ok(Response::text_plain(body)))
//! }
//!
//! let mut config = Configurator::new();
//! config
//!     .include(Include::new("addon", |config: &mut Configurator| {
//!         config.add_view(ViewConfig::new(text("addon")))
//!     }))
//!     .unwrap();
//! config.add_view(ViewConfig::new(text("local"))).unwrap();
//!
//! let app = config.make_app().unwrap();
//! let response = app.invoke_request(&mut Request::blank("/")).unwrap();
//! assert_eq!(response.text(), "local");
//! ```

pub mod actions;
pub mod configurator;
pub mod dotted;
mod policies;
mod routes;
mod tweens;
mod views;

// Re-export inventory for the registration macro
pub use inventory;

// Re-exports
pub use actions::{Action, Discriminator, PHASE1_CONFIG, PHASE2_CONFIG, PHASE3_CONFIG, resolve_conflicts};
pub use configurator::{Configurator, Include, IncludeTarget};
pub use dotted::{Catalog, Dotted, DottedEntry, Resolvable};
pub use routes::RouteConfig;
pub use tweens::TweenPlacement;
pub use views::ViewConfig;
