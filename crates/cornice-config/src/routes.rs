//! Route and static view registration

use crate::actions::{Discriminator, PHASE2_CONFIG};
use crate::configurator::{Configurator, prefixed_pattern};
use crate::dotted::Resolvable;
use crate::views::ViewConfig;
use cornice_core::exception::{Error, Result};
use cornice_core::interfaces::Interface;
use cornice_core::introspection::Introspectable;
use cornice_core::predicates::{CustomPredicate, PredicateOptions, compile_route_predicates};
use cornice_core::registry::Registry;
use cornice_core::security::NO_PERMISSION_REQUIRED;
use cornice_core::traversal::RootFactory;
use cornice_core::urldispatch::{Pregenerator, Route};
use cornice_views::{StaticView, ViewCallable};
use http::Method;
use serde_json::json;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Options of a route registration
///
/// The `view*` options register a view for the route in the same call.
#[derive(Clone, Default)]
pub struct RouteConfig {
	factory: Option<Resolvable<RootFactory>>,
	predicates: PredicateOptions,
	pregenerator: Option<Pregenerator>,
	use_global_views: bool,
	is_static: bool,
	view: Option<Resolvable<ViewCallable>>,
	view_context: Option<Interface>,
	view_permission: Option<String>,
	view_renderer: Option<String>,
	view_attr: Option<String>,
}

impl RouteConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Root factory for requests matching the route
	pub fn factory(mut self, factory: impl Into<Resolvable<RootFactory>>) -> Self {
		self.factory = Some(factory.into());
		self
	}

	pub fn xhr(mut self, xhr: bool) -> Self {
		self.predicates.xhr = xhr;
		self
	}

	pub fn request_method(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
		self.predicates.request_method = Some(methods.into_iter().collect());
		self
	}

	pub fn path_info(mut self, pattern: impl Into<String>) -> Self {
		self.predicates.path_info = Some(pattern.into());
		self
	}

	pub fn request_param(mut self, param: impl Into<String>) -> Self {
		self.predicates.request_param = Some(param.into());
		self
	}

	pub fn header(mut self, header: impl Into<String>) -> Self {
		self.predicates.header = Some(header.into());
		self
	}

	pub fn accept(mut self, accept: impl Into<String>) -> Self {
		self.predicates.accept = Some(accept.into().to_ascii_lowercase());
		self
	}

	pub fn custom_predicate(mut self, predicate: Arc<dyn CustomPredicate>) -> Self {
		self.predicates.custom.push(predicate);
		self
	}

	/// Pattern over the match dict producing the traversal path
	pub fn traverse(mut self, traverse: impl Into<String>) -> Self {
		self.predicates.traverse = Some(traverse.into());
		self
	}

	pub fn pregenerator(mut self, pregenerator: Pregenerator) -> Self {
		self.pregenerator = Some(pregenerator);
		self
	}

	/// Let views registered without a route name serve this route too
	pub fn use_global_views(mut self, use_global_views: bool) -> Self {
		self.use_global_views = use_global_views;
		self
	}

	/// Generate URLs only, never match
	pub fn is_static(mut self, is_static: bool) -> Self {
		self.is_static = is_static;
		self
	}

	pub fn view(mut self, view: impl Into<Resolvable<ViewCallable>>) -> Self {
		self.view = Some(view.into());
		self
	}

	pub fn view_context<T: ?Sized + 'static>(mut self) -> Self {
		self.view_context = Some(Interface::of::<T>());
		self
	}

	pub fn view_permission(mut self, permission: impl Into<String>) -> Self {
		self.view_permission = Some(permission.into());
		self
	}

	pub fn view_renderer(mut self, renderer: impl Into<String>) -> Self {
		self.view_renderer = Some(renderer.into());
		self
	}

	pub fn view_attr(mut self, attr: impl Into<String>) -> Self {
		self.view_attr = Some(attr.into());
		self
	}
}

impl fmt::Debug for RouteConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteConfig")
			.field("factory", &self.factory)
			.field("predicates", &self.predicates)
			.field("use_global_views", &self.use_global_views)
			.field("is_static", &self.is_static)
			.field("view", &self.view)
			.finish_non_exhaustive()
	}
}

impl Configurator {
	/// Register a route
	///
	/// The pattern is prefixed with the current route prefix. Routes are
	/// connected before any view is registered, in declaration order.
	#[track_caller]
	pub fn add_route(&mut self, name: &str, pattern: &str, config: RouteConfig) -> Result<()> {
		let RouteConfig {
			factory,
			predicates,
			pregenerator,
			use_global_views,
			is_static,
			view,
			view_context,
			view_permission,
			view_renderer,
			view_attr,
		} = config;

		if view.is_none() {
			let given = [
				("view_context", view_context.is_some()),
				("view_permission", view_permission.is_some()),
				("view_renderer", view_renderer.is_some()),
				("view_attr", view_attr.is_some()),
			];
			if let Some((option, _)) = given.iter().find(|(_, given)| *given) {
				return Err(Error::Configuration(format!(
					"{} may only be used together with view when adding route {:?}",
					option, name
				)));
			}
		}

		let factory = factory
			.map(|factory| factory.resolve(&self.catalog, self.package.as_deref()))
			.transpose()?;
		let compiled = compile_route_predicates(&predicates)?;
		let pattern = prefixed_pattern(self.route_prefix.as_deref(), pattern);
		let route = Route::new(name, &pattern)?
			.with_factory(factory.clone())
			.with_predicates(compiled)
			.with_pregenerator(pregenerator)
			.with_global_views(use_global_views)
			.with_static(is_static);

		let mut introspectables = vec![
			Introspectable::new("routes", name, format!("{} (pattern: {:?})", name, route.pattern()), "route")
				.with_attr("name", name)
				.with_attr("pattern", route.pattern())
				.with_attr(
					"predicates",
					route.predicates().iter().map(|p| p.text()).collect::<Vec<_>>(),
				)
				.with_attr("static", is_static)
				.with_attr("use_global_views", use_global_views)
				.with_attr("factory", json!(factory.is_some())),
		];
		if factory.is_some() {
			let mut factory_intr = Introspectable::new("root factories", name, name, "root factory")
				.with_attr("route_name", name);
			factory_intr.relate("routes", name);
			introspectables.push(factory_intr);
		}

		let connect = move |registry: &mut Registry| -> Result<()> {
			registry.routes_mapper_mut().connect(route);
			Ok(())
		};
		self.action(
			Some(Discriminator::new(["route", name])),
			Some(Box::new(connect)),
			PHASE2_CONFIG,
			introspectables,
		)?;

		if let Some(view) = view {
			let mut view_config = ViewConfig::new(view).route_name(name);
			if let Some(context) = view_context {
				view_config = view_config.context_iface(context);
			}
			if let Some(permission) = view_permission {
				view_config = view_config.permission(permission);
			}
			if let Some(renderer) = view_renderer {
				view_config = view_config.renderer(renderer);
			}
			if let Some(attr) = view_attr {
				view_config = view_config.attr(attr);
			}
			self.add_view(view_config)?;
		}
		Ok(())
	}

	/// Serve the files below `directory` under the URL prefix `name`
	///
	/// Registers the route `__<name>/` with the pattern `<name>/*subpath` and a
	/// static view for it. Without a permission the files are public even
	/// when a default permission is set. `cache_max_age` is in seconds.
	#[track_caller]
	pub fn add_static_view(
		&mut self,
		name: &str,
		directory: impl Into<PathBuf>,
		cache_max_age: Option<u64>,
		permission: Option<&str>,
	) -> Result<()> {
		let name = format!("{}/", name.trim_end_matches('/'));
		let route_name = match &self.route_prefix {
			Some(prefix) => format!("__{}/{}", prefix, name),
			None => format!("__{}", name),
		};
		let pattern = format!("{}*subpath", name);
		let view = StaticView::new(directory).with_cache_max_age(cache_max_age);

		self.add_route(&route_name, &pattern, RouteConfig::new())?;
		self.add_view(
			ViewConfig::new(view.into_callable())
				.route_name(route_name)
				.permission(permission.unwrap_or(NO_PERMISSION_REQUIRED)),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use cornice_core::http::{Request, Response};
	use rstest::rstest;

	fn text(body: &'static str) -> ViewCallable {
		ViewCallable::request_only(move |_request: &mut Request| Ok(Response::text_plain(body)))
	}

	#[rstest]
	#[case(RouteConfig::new().view_renderer("json"))]
	#[case(RouteConfig::new().view_permission("edit"))]
	#[case(RouteConfig::new().view_attr("index"))]
	#[case(RouteConfig::new().view_context::<String>())]
	fn test_view_options_require_view(#[case] route: RouteConfig) {
		let mut config = Configurator::new();

		let result = config.add_route("home", "/", route);

		assert!(matches!(result, Err(Error::Configuration(message)) if message.contains("only be used together with view")));
	}

	#[rstest]
	fn test_route_view_shortcut() {
		// Arrange
		let mut config = Configurator::new();
		config
			.add_route("home", "/home", RouteConfig::new().view(text("home")))
			.unwrap();
		let app = config.make_app().unwrap();

		// Act
		let response = app.invoke_request(&mut Request::blank("/home")).unwrap();

		// Assert
		assert_eq!(response.text(), "home");
	}

	#[rstest]
	fn test_view_declared_before_its_route() {
		// Arrange
		let mut config = Configurator::new();
		config
			.add_view(ViewConfig::new(text("late route")).route_name("late"))
			.unwrap();
		config.add_route("late", "/late", RouteConfig::new()).unwrap();
		let app = config.make_app().unwrap();

		// Act
		let response = app.invoke_request(&mut Request::blank("/late")).unwrap();

		// Assert
		assert_eq!(response.text(), "late route");
	}

	#[rstest]
	fn test_duplicate_route_names_conflict() {
		let mut config = Configurator::new();
		config.add_route("home", "/a", RouteConfig::new()).unwrap();
		config.add_route("home", "/b", RouteConfig::new()).unwrap();

		let result = config.commit();

		assert!(matches!(result, Err(Error::Conflict(_))));
	}

	#[rstest]
	fn test_route_prefix_applies() {
		let mut config = Configurator::new().with_route_prefix("/api/");
		config.add_route("users", "/users", RouteConfig::new()).unwrap();

		let app = config.make_app().unwrap();

		assert_eq!(app.route_path("users", &Default::default()).unwrap(), "/api/users");
	}

	#[rstest]
	fn test_static_view_serves_files() {
		// Arrange
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("site.css"), "body {}").unwrap();
		let mut config = Configurator::new();
		config
			.add_static_view("static", dir.path(), Some(60), None)
			.unwrap();
		let app = config.make_app().unwrap();

		// Act
		let response = app
			.invoke_request(&mut Request::blank("/static/site.css"))
			.unwrap();

		// Assert
		assert_eq!(response.text(), "body {}");
		assert!(app.registry().introspector().get("routes", "__static/").is_some());
	}
}
