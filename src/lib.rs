//! # Cornice
//!
//! A declarative configuration and request dispatch framework.
//!
//! Applications describe themselves to a [`Configurator`]: views, routes,
//! tweens, renderers and security policies. Registrations are recorded as
//! actions and only applied on commit, after conflicting registrations have
//! been detected and registrations made by an including scope have
//! overridden those of the scopes it included. The committed registry is
//! served by a [`Router`], which finds a context through URL dispatch or
//! traversal, picks the best matching view and falls back to exception
//! views when anything goes wrong.
//!
//! ## Crates
//!
//! - [`conf`]: settings and their sources
//! - [`core`]: errors, interfaces, resources, requests, predicates and the registry
//! - [`views`]: view callables, the view deriver, multi-views and renderers
//! - [`config`]: the configurator, the action ledger and dotted names
//! - [`dispatch`]: the router and exception view handling
//!
//! ## Quick Example
//!
//! ```rust
//! use cornice::prelude::*;
//!
//! let mut config = Configurator::new();
//! config
//!     .add_route(
//!         "hello",
//!         "/hello/{name}",
//!         RouteConfig::new().view(ViewCallable::request_only(|request: &mut Request| {
//!             let name = request.match_value("name").unwrap_or("world").to_string();
//!             Ok(Response::text_plain(format!("Hello, {}!", name)))
//!         })),
//!     )
//!     .unwrap();
//!
//! let app = config.make_app().unwrap();
//! let response = app.invoke_request(&mut Request::blank("/hello/cornice")).unwrap();
//! assert_eq!(response.text(), "Hello, cornice!");
//! ```
//!
//! ## Feature Flags
//!
//! Each member crate sits behind a feature of the same name; `default`
//! enables `full`.
//!
//! - `minimal` - `core` and `dispatch`, for serving a hand-built registry
//! - `full` - every crate, including the configurator
//! - `conf`, `core`, `views`, `dispatch`, `config` - one crate each

#[cfg(feature = "conf")]
pub mod conf;
#[cfg(feature = "config")]
pub mod config;
#[cfg(feature = "core")]
pub mod core;
#[cfg(feature = "dispatch")]
pub mod dispatch;
#[cfg(feature = "views")]
pub mod views;

// Re-export settings
#[cfg(feature = "conf")]
pub use cornice_conf::Settings;

// Re-export the configurator
#[cfg(feature = "config")]
pub use cornice_config::{Configurator, Include, RouteConfig, TweenPlacement, ViewConfig};

// Re-export core types
#[cfg(feature = "core")]
pub use cornice_core::{
	events::{Event, EventKind, Subscriber},
	exception::{Error, Result},
	http::{Request, Response},
	registry::Registry,
	resource::{Context, Resource},
	security::{
		AUTHENTICATED, AuthenticationPolicy, AuthorizationPolicy, EVERYONE, NO_PERMISSION_REQUIRED,
	},
	tweens::{Handler, Tween, TweenFactory, tween_factory},
};

#[cfg(feature = "dispatch")]
pub use cornice_dispatch::Router;

#[cfg(feature = "views")]
pub use cornice_views::{StaticView, ViewCallable, ViewInstance, ViewOutput};

/// Prelude module for convenient imports
///
/// ```rust
/// use cornice::prelude::*;
///
/// let config = Configurator::with_settings(Settings::new());
/// assert!(!config.is_autocommit());
/// ```
pub mod prelude {
	#[cfg(feature = "conf")]
	pub use crate::Settings;

	// Core feature
	#[cfg(feature = "core")]
	pub use crate::{
		AUTHENTICATED, AuthenticationPolicy, AuthorizationPolicy, Context, EVERYONE, Error, Event,
		EventKind, Handler, NO_PERMISSION_REQUIRED, Registry, Request, Resource, Response, Result,
		Subscriber, Tween, TweenFactory, tween_factory,
	};

	// Views feature
	#[cfg(feature = "views")]
	pub use crate::{StaticView, ViewCallable, ViewInstance, ViewOutput};

	#[cfg(feature = "dispatch")]
	pub use crate::Router;

	// Config feature
	#[cfg(feature = "config")]
	pub use crate::{Configurator, Include, RouteConfig, TweenPlacement, ViewConfig};

	// External
	#[cfg(feature = "views")]
	pub use serde_json::json;
}
