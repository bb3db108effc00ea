//! View registration

use crate::actions::{Discriminator, PHASE3_CONFIG};
use crate::configurator::Configurator;
use crate::dotted::Resolvable;
use cornice_core::exception::{Error, Result};
use cornice_core::http::Request;
use cornice_core::interfaces::{
	IException, IExceptionViewClassifier, IForbidden, INotFound, IRequest, IViewClassifier, Interface,
};
use cornice_core::introspection::Introspectable;
use cornice_core::predicates::{CustomPredicate, PredicateOptions, compile_predicates};
use cornice_core::registry::Registry;
use cornice_core::security::NO_PERMISSION_REQUIRED;
use cornice_core::view::{View, ViewKey};
use cornice_views::deriver::Decorator;
use cornice_views::mapper::ViewMapper;
use cornice_views::{HttpCache, MultiView, ViewCallable, ViewOptions, derive_view};
use http::Method;
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::Arc;

/// Options of a view registration
///
/// # Examples
///
/// ```
/// use cornice_config::ViewConfig;
/// use http::Method;
///
/// let config = ViewConfig::named("edit")
///     .route_name("item")
///     .request_method([Method::POST])
///     .permission("edit")
///     .renderer("json");
/// assert_eq!(config.view_name(), "edit");
/// ```
#[derive(Clone, Default)]
pub struct ViewConfig {
	view: Option<Resolvable<ViewCallable>>,
	name: String,
	context: Option<Interface>,
	route_name: Option<String>,
	permission: Option<String>,
	attr: Option<String>,
	renderer: Option<String>,
	wrapper: Option<String>,
	http_cache: Option<HttpCache>,
	decorator: Option<Decorator>,
	mapper: Option<Arc<dyn ViewMapper>>,
	predicates: PredicateOptions,
}

impl ViewConfig {
	/// Options for registering `view`, given directly or by dotted name
	pub fn new(view: impl Into<Resolvable<ViewCallable>>) -> Self {
		Self {
			view: Some(view.into()),
			..Default::default()
		}
	}

	/// Options without a view yet, for a view name
	pub fn named(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Default::default()
		}
	}

	pub fn view(mut self, view: impl Into<Resolvable<ViewCallable>>) -> Self {
		self.view = Some(view.into());
		self
	}

	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	pub fn view_name(&self) -> &str {
		&self.name
	}

	/// Only for contexts providing `T`
	pub fn context<T: ?Sized + 'static>(self) -> Self {
		self.context_iface(Interface::of::<T>())
	}

	pub fn context_iface(mut self, iface: Interface) -> Self {
		self.context = Some(iface);
		self
	}

	/// Only for requests matched by the named route
	pub fn route_name(mut self, route_name: impl Into<String>) -> Self {
		self.route_name = Some(route_name.into());
		self
	}

	pub fn permission(mut self, permission: impl Into<String>) -> Self {
		self.permission = Some(permission.into());
		self
	}

	/// Method of a class or instance view to call
	pub fn attr(mut self, attr: impl Into<String>) -> Self {
		self.attr = Some(attr.into());
		self
	}

	pub fn renderer(mut self, renderer: impl Into<String>) -> Self {
		self.renderer = Some(renderer.into());
		self
	}

	/// Name of a view wrapping this view's response
	pub fn wrapper(mut self, wrapper: impl Into<String>) -> Self {
		self.wrapper = Some(wrapper.into());
		self
	}

	pub fn http_cache(mut self, http_cache: impl Into<HttpCache>) -> Self {
		self.http_cache = Some(http_cache.into());
		self
	}

	pub fn decorator(mut self, decorator: Decorator) -> Self {
		self.decorator = Some(decorator);
		self
	}

	pub fn mapper(mut self, mapper: Arc<dyn ViewMapper>) -> Self {
		self.mapper = Some(mapper);
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

	/// `name` or `name=value`
	pub fn request_param(mut self, param: impl Into<String>) -> Self {
		self.predicates.request_param = Some(param.into());
		self
	}

	/// `name` or `name:regex`
	pub fn header(mut self, header: impl Into<String>) -> Self {
		self.predicates.header = Some(header.into());
		self
	}

	/// Media type the request must accept; also selects the multi-view bucket
	pub fn accept(mut self, accept: impl Into<String>) -> Self {
		self.predicates.accept = Some(accept.into().to_ascii_lowercase());
		self
	}

	/// `key=value` entries the route match must contain
	pub fn match_param<I, S>(mut self, params: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.predicates.match_param = Some(params.into_iter().map(Into::into).collect());
		self
	}

	/// Only when the context or one of its parents provides `T`
	pub fn containment<T: ?Sized + 'static>(mut self) -> Self {
		self.predicates.containment = Some(Interface::of::<T>());
		self
	}

	pub fn request_type(mut self, iface: Interface) -> Self {
		self.predicates.request_type = Some(iface);
		self
	}

	pub fn custom_predicate(mut self, predicate: Arc<dyn CustomPredicate>) -> Self {
		self.predicates.custom.push(predicate);
		self
	}

	/// Replace every predicate option at once
	pub fn predicates(mut self, predicates: PredicateOptions) -> Self {
		self.predicates = predicates;
		self
	}
}

impl fmt::Debug for ViewConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ViewConfig")
			.field("view", &self.view)
			.field("name", &self.name)
			.field("context", &self.context)
			.field("route_name", &self.route_name)
			.field("permission", &self.permission)
			.field("renderer", &self.renderer)
			.field("predicates", &self.predicates)
			.finish_non_exhaustive()
	}
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Classifier {
	View,
	Exception,
}

impl Configurator {
	/// Register a view
	///
	/// Without a view but with a renderer, the view renders an empty mapping.
	/// Predicates are compiled here, so a bad regex fails at once. The route
	/// named by `route_name` must exist by the time the view is registered
	/// on commit.
	///
	/// A second view for the same slot with different predicates is merged
	/// with the first into a [`MultiView`]; with identical predicates it
	/// conflicts, unless one overrides the other through an include.
	#[track_caller]
	pub fn add_view(&mut self, config: ViewConfig) -> Result<()> {
		self.register_view(config, Classifier::View)
	}

	/// Register a view for errors providing the configured context
	///
	/// The context defaults to every error. Exception views have no name and
	/// no permission.
	#[track_caller]
	pub fn add_exception_view(&mut self, config: ViewConfig) -> Result<()> {
		reject_exception_view_options(&config, "add_exception_view", false)?;
		let config = match config.context {
			Some(_) => config,
			None => config.context::<IException>(),
		};
		self.register_view(config, Classifier::Exception)
	}

	/// Register the view rendering not-found errors
	#[track_caller]
	pub fn set_notfound_view(&mut self, config: ViewConfig) -> Result<()> {
		reject_exception_view_options(&config, "set_notfound_view", true)?;
		self.register_view(config.context::<INotFound>(), Classifier::Exception)
	}

	/// Register the view rendering forbidden errors
	#[track_caller]
	pub fn set_forbidden_view(&mut self, config: ViewConfig) -> Result<()> {
		reject_exception_view_options(&config, "set_forbidden_view", true)?;
		self.register_view(config.context::<IForbidden>(), Classifier::Exception)
	}

	#[track_caller]
	fn register_view(&mut self, config: ViewConfig, classifier: Classifier) -> Result<()> {
		let ViewConfig {
			view,
			name,
			context,
			route_name,
			permission,
			attr,
			renderer,
			wrapper,
			http_cache,
			decorator,
			mapper,
			predicates,
		} = config;

		let view = match view {
			Some(view) => view.resolve(&self.catalog, self.package.as_deref())?,
			None if renderer.is_some() => {
				ViewCallable::request_only(|_request: &mut Request| -> Result<Value> {
					Ok(Value::Object(Map::new()))
				})
			}
			None => {
				return Err(Error::Configuration(
					"\"view\" was not specified and no \"renderer\" specified".into(),
				));
			}
		};
		let accept = predicates.accept.clone();
		let compiled = compile_predicates(&predicates)?;
		let context = context.unwrap_or_else(Interface::any);
		// The default permission never guards an exception view
		let permission = match classifier {
			Classifier::View => permission,
			Classifier::Exception => Some(NO_PERMISSION_REQUIRED.to_string()),
		};

		let discriminator = Discriminator::new([
			"view".to_string(),
			context.name().to_string(),
			name.clone(),
			route_name.clone().unwrap_or_else(|| "None".into()),
			compiled.phash.clone(),
		]);

		let category = match classifier {
			Classifier::View => "views",
			Classifier::Exception => "exception views",
		};
		let mut intr = Introspectable::new(
			category,
			discriminator.to_string(),
			format!("{:?}", view),
			"view",
		)
		.with_attr("name", name.clone())
		.with_attr("context", context.name())
		.with_attr("route_name", json!(route_name))
		.with_attr("permission", json!(permission))
		.with_attr("attr", json!(attr))
		.with_attr("renderer", json!(renderer))
		.with_attr("accept", json!(accept))
		.with_attr("order", compiled.order)
		.with_attr("phash", compiled.phash.clone())
		.with_attr(
			"predicates",
			compiled.predicates.iter().map(|p| p.text()).collect::<Vec<_>>(),
		);
		let mut introspectables = Vec::new();
		if let Some(route_name) = &route_name {
			intr.relate("routes", route_name.clone());
		}
		if let Some(permission) = permission.as_ref().filter(|p| *p != NO_PERMISSION_REQUIRED) {
			intr.relate("permissions", permission.clone());
			introspectables.push(Introspectable::new(
				"permissions",
				permission.clone(),
				permission.clone(),
				"permission",
			));
		}
		introspectables.insert(0, intr);

		let options = ViewOptions {
			name,
			permission,
			predicates: compiled.predicates,
			attr,
			renderer,
			wrapper,
			http_cache,
			accept,
			order: compiled.order,
			phash: compiled.phash,
			decorator,
			mapper,
			package: self.package.clone(),
		};
		let register = move |registry: &mut Registry| -> Result<()> {
			let request_iface = match &route_name {
				Some(route_name) => route_request_iface(registry, route_name)?,
				None => Interface::of::<IRequest>(),
			};
			let derived: Arc<dyn View> = Arc::new(derive_view(registry, &view, &options)?);
			let classifier = match classifier {
				Classifier::View => Interface::of::<IViewClassifier>(),
				Classifier::Exception => Interface::of::<IExceptionViewClassifier>(),
			};
			let key = ViewKey::new(classifier, request_iface, context, options.name.clone());
			let view = match registry.registered_view(&key) {
				Some(existing) => merge_views(existing, derived, &options),
				None => derived,
			};
			registry.register_view(key, view);
			Ok(())
		};

		self.action(
			Some(discriminator),
			Some(Box::new(register)),
			PHASE3_CONFIG,
			introspectables,
		)
	}
}

fn reject_exception_view_options(config: &ViewConfig, method: &str, with_context: bool) -> Result<()> {
	let mut given = Vec::new();
	if !config.name.is_empty() {
		given.push("name");
	}
	if config.permission.is_some() {
		given.push("permission");
	}
	if config.http_cache.is_some() {
		given.push("http_cache");
	}
	if with_context && config.context.is_some() {
		given.push("context");
	}
	match given.first() {
		Some(option) => Err(Error::Configuration(format!(
			"{} may not be used as an argument to {}",
			option, method
		))),
		None => Ok(()),
	}
}

/// The request interface of a registered route
fn route_request_iface(registry: &Registry, route_name: &str) -> Result<Interface> {
	registry
		.routes_mapper()
		.and_then(|mapper| mapper.get_route(route_name))
		.map(|route| route.request_type().iface().clone())
		.ok_or_else(|| {
			Error::Configuration(format!(
				"No route named {} found for view registration",
				route_name
			))
		})
}

/// Combine a newly derived view with the one already in its slot
///
/// Same predicates replace a plain view; anything else becomes or extends a
/// multi-view.
fn merge_views(existing: Arc<dyn View>, derived: Arc<dyn View>, options: &ViewOptions) -> Arc<dyn View> {
	let mut multiview = match existing.downcast_ref::<MultiView>() {
		Some(multiview) => multiview.clone(),
		None if existing.phash() == options.phash => return derived,
		None => {
			let mut multiview = MultiView::new(options.name.clone());
			multiview.add(existing.clone(), existing.order(), existing.phash(), existing.accept());
			multiview
		}
	};
	multiview.add(derived, options.order, &options.phash, options.accept.as_deref());
	tracing::debug!(
		target: "cornice::config",
		name = %options.name,
		candidates = multiview.len(),
		"views merged into a multi-view"
	);
	Arc::new(multiview)
}
