//! The configurator
//!
//! [`Configurator`] is what applications talk to. It owns the registry being
//! configured and the ledger of pending actions, and tracks the scope
//! (package, route prefix, include path) registrations are made in.

use crate::actions::{Action, ActionCallable, Discriminator, resolve_conflicts};
use crate::dotted::{Catalog, Dotted, FromDotted, IncludeFn, Resolvable, absolute_name, package_of};
use cornice_conf::Settings;
use cornice_core::events::Event;
use cornice_core::exception::{Error, ExceptionResource, Result, SourceInfo};
use cornice_core::http::Request;
use cornice_core::interfaces::{IExceptionViewClassifier, IHttpException, IRequest, Interface};
use cornice_core::introspection::Introspectable;
use cornice_core::registry::{Notifier, Registry};
use cornice_core::resource::Context;
use cornice_core::tweens::{EXCVIEW, EXCVIEW_NAME, MAIN};
use cornice_core::view::ViewKey;
use cornice_dispatch::{Router, excview_tween_factory};
use cornice_views::{ViewCallable, ViewOptions, derive_view, register_default_renderers};
use std::collections::HashSet;
use std::fmt;
use std::mem;
use std::sync::Arc;

/// A named include body
///
/// # Examples
///
/// ```
/// use cornice_config::{Configurator, Include, RouteConfig};
///
/// let api = Include::new("myapp.api", |config: &mut Configurator| {
///     config.add_route("users", "/users", RouteConfig::default())
/// });
///
/// let mut config = Configurator::new();
/// config.include_with_prefix(api, Some("/api")).unwrap();
/// let app = config.make_app().unwrap();
/// assert_eq!(app.route_path("users", &Default::default()).unwrap(), "/api/users");
/// ```
#[derive(Clone)]
pub struct Include {
	name: String,
	body: IncludeFn,
}

impl Include {
	pub fn new<F>(name: impl Into<String>, body: F) -> Self
	where
		F: Fn(&mut Configurator) -> Result<()> + 'static,
	{
		Self {
			name: name.into(),
			body: Arc::new(body),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}
}

impl fmt::Debug for Include {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Include").field("name", &self.name).finish_non_exhaustive()
	}
}

/// What [`Configurator::include`] accepts
#[derive(Debug, Clone)]
pub enum IncludeTarget {
	/// A dotted name of an include body, or of a package providing `includeme`
	Name(String),
	Include(Include),
}

impl From<&str> for IncludeTarget {
	fn from(name: &str) -> Self {
		Self::Name(name.to_string())
	}
}

impl From<String> for IncludeTarget {
	fn from(name: String) -> Self {
		Self::Name(name)
	}
}

impl From<Include> for IncludeTarget {
	fn from(include: Include) -> Self {
		Self::Include(include)
	}
}

/// Registers views, routes, tweens and policies, then builds the application
///
/// Outside autocommit mode every registration is deferred until
/// [`commit`](Self::commit) (or [`make_app`](Self::make_app)), where
/// conflicting registrations are detected.
///
/// # Examples
///
/// ```
/// use cornice_config::{Configurator, ViewConfig};
/// use cornice_core::http::{Request, Response};
/// use cornice_views::ViewCallable;
///
/// let mut config = Configurator::new();
/// config
///     .add_view(ViewConfig::new(ViewCallable::request_only(|_request| {
///         Ok(Response::text_plain("Hello"))
///     })))
///     .unwrap();
/// let app = config.make_app().unwrap();
///
/// let response = app.invoke_request(&mut Request::blank("/")).unwrap();
/// assert_eq!(response.text(), "Hello");
/// ```
pub struct Configurator {
	pub(crate) registry: Registry,
	pub(crate) package: Option<String>,
	pub(crate) route_prefix: Option<String>,
	pub(crate) includepath: Vec<String>,
	pub(crate) autocommit: bool,
	pub(crate) catalog: Catalog,
	actions: Vec<Action>,
	included: HashSet<String>,
}

impl Configurator {
	/// A configurator with default settings
	pub fn new() -> Self {
		Self::with_settings(Settings::new())
	}

	pub fn with_settings(settings: Settings) -> Self {
		let mut registry = Registry::new("cornice");
		registry.set_settings(settings);
		Self::from_registry(registry)
	}

	/// Configure an existing registry
	///
	/// The default renderers, the default exception response view and the
	/// exception view tween are registered right away, so later registrations
	/// override them without conflict.
	pub fn from_registry(mut registry: Registry) -> Self {
		register_default_renderers(&mut registry);
		register_exception_response_view(&mut registry);
		let mut catalog = Catalog::new();
		let excview = excview_tween_factory();
		catalog.register(EXCVIEW_NAME, Dotted::Tween(excview.clone()));
		registry.tweens_mut().add_implicit(
			EXCVIEW_NAME,
			excview,
			Some(EXCVIEW.to_string()),
			None,
			Some(vec![MAIN.to_string()]),
		);
		Self {
			registry,
			package: None,
			route_prefix: None,
			includepath: Vec::new(),
			autocommit: false,
			catalog,
			actions: Vec::new(),
			included: HashSet::new(),
		}
	}

	/// Make relative dotted names resolve against `package`
	pub fn with_package(mut self, package: impl Into<String>) -> Self {
		self.package = Some(package.into());
		self
	}

	/// Apply registrations immediately, without conflict detection
	pub fn with_autocommit(mut self, autocommit: bool) -> Self {
		self.autocommit = autocommit;
		self
	}

	/// Prefix every route pattern registered from now on
	pub fn with_route_prefix(mut self, route_prefix: impl Into<String>) -> Self {
		self.route_prefix = normalize_prefix(&route_prefix.into());
		self
	}

	pub fn package(&self) -> Option<&str> {
		self.package.as_deref()
	}

	pub fn route_prefix(&self) -> Option<&str> {
		self.route_prefix.as_deref()
	}

	pub fn is_autocommit(&self) -> bool {
		self.autocommit
	}

	pub fn registry(&self) -> &Registry {
		&self.registry
	}

	pub fn registry_mut(&mut self) -> &mut Registry {
		&mut self.registry
	}

	/// Number of actions waiting for commit
	pub fn pending_actions(&self) -> usize {
		self.actions.len()
	}

	pub fn catalog(&self) -> &Catalog {
		&self.catalog
	}

	pub fn catalog_mut(&mut self) -> &mut Catalog {
		&mut self.catalog
	}

	/// Register a dotted name, relative names resolving against the package
	pub fn register_dotted(&mut self, name: &str, value: Dotted) -> Result<()> {
		let name = absolute_name(name, self.package.as_deref())?;
		self.catalog.register(&name, value);
		Ok(())
	}

	/// Resolve a value that may be given by dotted name
	pub fn maybe_dotted<T: FromDotted>(&self, value: impl Into<Resolvable<T>>) -> Result<T> {
		value.into().resolve(&self.catalog, self.package.as_deref())
	}

	pub fn get_settings(&self) -> &Settings {
		self.registry.settings()
	}

	/// Merge settings into the registry's settings
	pub fn add_settings<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>)
	where
		K: Into<String>,
		V: Into<String>,
	{
		self.registry.settings_mut().update(values);
	}

	/// Record a configuration action
	///
	/// In autocommit mode the callable runs at once and its errors are
	/// returned as is. Otherwise it is queued with the caller's location and
	/// the current include path.
	#[track_caller]
	pub fn action(
		&mut self,
		discriminator: Option<Discriminator>,
		callable: Option<ActionCallable>,
		order: i32,
		introspectables: Vec<Introspectable>,
	) -> Result<()> {
		let info = SourceInfo::caller();
		if self.autocommit {
			if let Some(callable) = callable {
				callable(&mut self.registry)?;
			}
			for intr in introspectables {
				self.registry.introspector_mut().register(intr, Some(info));
			}
			return Ok(());
		}
		self.actions.push(Action {
			discriminator,
			callable,
			order,
			includepath: self.includepath.clone(),
			info,
			introspectables,
		});
		Ok(())
	}

	/// Resolve conflicts and execute every pending action
	pub fn commit(&mut self) -> Result<()> {
		let actions = mem::take(&mut self.actions);
		let pending = actions.len();
		let actions = resolve_conflicts(actions)?;
		tracing::debug!(
			target: "cornice::config",
			pending,
			executing = actions.len(),
			"committing configuration"
		);
		for action in actions {
			action.execute(&mut self.registry)?;
		}
		Ok(())
	}

	/// Run an include body in a nested scope
	///
	/// The body sees a package derived from the include's name and the
	/// include appended to the include path, so its actions are overridden
	/// by the includer's. Including the same name twice is a no-op.
	#[track_caller]
	pub fn include(&mut self, target: impl Into<IncludeTarget>) -> Result<()> {
		self.include_with_prefix(target, None)
	}

	/// [`include`](Self::include) with a route prefix composed onto the current one
	#[track_caller]
	pub fn include_with_prefix(
		&mut self,
		target: impl Into<IncludeTarget>,
		route_prefix: Option<&str>,
	) -> Result<()> {
		let (include_name, body) = match target.into() {
			IncludeTarget::Include(include) => (include.name, include.body),
			IncludeTarget::Name(name) => self.resolve_include(&name)?,
		};
		if !self.included.insert(include_name.clone()) {
			tracing::debug!(target: "cornice::config", name = %include_name, "already included");
			return Ok(());
		}
		tracing::debug!(target: "cornice::config", name = %include_name, "including");

		let prefix = compose_prefix(self.route_prefix.as_deref(), route_prefix);
		let mut includepath = self.includepath.clone();
		includepath.push(include_name.clone());
		let saved = (
			mem::replace(&mut self.package, Some(package_of(&include_name).to_string())),
			mem::replace(&mut self.route_prefix, prefix),
			mem::replace(&mut self.includepath, includepath),
		);
		let result = body(self);
		(self.package, self.route_prefix, self.includepath) = saved;
		result
	}

	fn resolve_include(&self, name: &str) -> Result<(String, IncludeFn)> {
		let absolute = absolute_name(name, self.package.as_deref())?;
		if !self.catalog.contains(&absolute) {
			let includeme = format!("{}:includeme", absolute);
			if self.catalog.contains(&includeme) {
				let body = self.catalog.resolve(&includeme, None)?;
				return Ok((includeme, body));
			}
		}
		let body = self.catalog.resolve(&absolute, None)?;
		Ok((absolute, body))
	}

	/// Commit and build the router
	///
	/// Tweens named by the `tweens` setting form the explicit tween order.
	/// Subscribers of `ApplicationCreated` are notified once the router
	/// exists.
	pub fn make_app(mut self) -> Result<Router> {
		let explicit = self.registry.settings().tweens.clone();
		for name in explicit {
			self.add_explicit_tween(&name)?;
		}
		self.commit()?;

		let registry = Arc::new(self.registry);
		let router = Router::new(registry.clone())?;
		if registry.has_listeners() {
			registry.notify(&mut Event::ApplicationCreated {
				registry: registry.as_ref(),
			})?;
		}
		tracing::debug!(target: "cornice::config", registry = registry.name(), "application created");
		Ok(router)
	}
}

impl Default for Configurator {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Configurator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Configurator")
			.field("package", &self.package)
			.field("route_prefix", &self.route_prefix)
			.field("includepath", &self.includepath)
			.field("autocommit", &self.autocommit)
			.field("pending_actions", &self.actions.len())
			.finish_non_exhaustive()
	}
}

fn normalize_prefix(prefix: &str) -> Option<String> {
	let prefix = prefix.trim_matches('/');
	(!prefix.is_empty()).then(|| prefix.to_string())
}

/// Join an include's route prefix onto the enclosing one
fn compose_prefix(outer: Option<&str>, inner: Option<&str>) -> Option<String> {
	let outer = outer.unwrap_or("");
	let inner = inner.unwrap_or("");
	normalize_prefix(&format!(
		"{}/{}",
		outer.trim_end_matches('/'),
		inner.trim_start_matches('/')
	))
}

/// Prefix a route pattern with the current route prefix
pub(crate) fn prefixed_pattern(route_prefix: Option<&str>, pattern: &str) -> String {
	match route_prefix {
		Some(prefix) => format!(
			"{}/{}",
			prefix.trim_end_matches('/'),
			pattern.trim_start_matches('/')
		),
		None => pattern.to_string(),
	}
}

/// Render HTTP errors without an exception view of their own as their response
fn register_exception_response_view(registry: &mut Registry) {
	let view = ViewCallable::function(|context: &Context, _request: &mut Request| {
		context
			.downcast_ref::<ExceptionResource>()
			.map(|resource| resource.error().to_response())
			.ok_or_else(|| Error::Internal("exception response view called without an exception".into()))
	});
	match derive_view(registry, &view, &ViewOptions::default()) {
		Ok(derived) => {
			registry.register_view(
				ViewKey::new(
					Interface::of::<IExceptionViewClassifier>(),
					Interface::of::<IRequest>(),
					Interface::of::<IHttpException>(),
					"",
				),
				Arc::new(derived),
			);
		}
		Err(error) => {
			tracing::warn!(target: "cornice::config", %error, "default exception response view not registered");
		}
	}
}
