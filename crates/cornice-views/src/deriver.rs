//! The view deriver
//!
//! [`derive_view`] wraps a mapped view callable in the standard pipeline.
//! Listed outermost first, a call passes through:
//!
//! ```text
//! predicates -> authorization debug -> security -> wrapper view
//!   -> http cache -> decorator -> renderer -> mapper -> view callable
//! ```
//!
//! The result is a [`DerivedView`]: the wrapped callable together with the
//! ranking metadata (`accept`, `order`, `phash`), a predicate checker and a
//! permission checker, so a [`MultiView`](crate::multiview::MultiView) can
//! probe it without calling it.

use crate::mapper::{DefaultViewMapper, ViewCallable, ViewMapper, ViewOutput};
use crate::renderers::RendererHelper;
use crate::render_view_to_response;
use cornice_core::exception::{Error, Result};
use cornice_core::http::{Request, Response};
use cornice_core::predicates::{DEFAULT_PHASH, MAX_ORDER, Predicate};
use cornice_core::registry::Registry;
use cornice_core::resource::{Context, resource_path};
use cornice_core::security::NO_PERMISSION_REQUIRED;
use cornice_core::view::View;
use http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// A view in its final `(context, request) -> response` form
pub type ViewFn = Arc<dyn Fn(&Context, &mut Request) -> Result<Response> + Send + Sync>;

/// User supplied wrapper applied between rendering and caching
pub type Decorator = Arc<dyn Fn(ViewFn) -> ViewFn + Send + Sync>;

type PermissionCheck = Arc<dyn Fn(&Context, &Request) -> bool + Send + Sync>;

/// Caching headers set on every response of a view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpCache {
	/// `max-age` in seconds; zero forbids caching
	pub seconds: Option<u64>,
	/// Extra `Cache-Control` directives such as `public`
	pub directives: Vec<String>,
}

impl From<u64> for HttpCache {
	fn from(seconds: u64) -> Self {
		Self {
			seconds: Some(seconds),
			directives: Vec::new(),
		}
	}
}

impl From<Duration> for HttpCache {
	fn from(duration: Duration) -> Self {
		duration.as_secs().into()
	}
}

/// Options controlling how a view is wrapped
#[derive(Clone)]
pub struct ViewOptions {
	/// View name the view is registered under
	pub name: String,
	pub permission: Option<String>,
	pub predicates: Vec<Predicate>,
	/// Method selected on class and bound method views
	pub attr: Option<String>,
	pub renderer: Option<String>,
	/// Name of a view that wraps this view's response
	pub wrapper: Option<String>,
	pub http_cache: Option<HttpCache>,
	pub accept: Option<String>,
	pub order: u64,
	pub phash: String,
	pub decorator: Option<Decorator>,
	pub mapper: Option<Arc<dyn ViewMapper>>,
	/// Package of the registering configurator, passed to renderer factories
	pub package: Option<String>,
}

impl Default for ViewOptions {
	fn default() -> Self {
		Self {
			name: String::new(),
			permission: None,
			predicates: Vec::new(),
			attr: None,
			renderer: None,
			wrapper: None,
			http_cache: None,
			accept: None,
			order: MAX_ORDER,
			phash: DEFAULT_PHASH.to_string(),
			decorator: None,
			mapper: None,
			package: None,
		}
	}
}

impl fmt::Debug for ViewOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ViewOptions")
			.field("name", &self.name)
			.field("permission", &self.permission)
			.field("predicates", &self.predicates)
			.field("attr", &self.attr)
			.field("renderer", &self.renderer)
			.field("wrapper", &self.wrapper)
			.field("http_cache", &self.http_cache)
			.field("accept", &self.accept)
			.field("order", &self.order)
			.field("phash", &self.phash)
			.finish_non_exhaustive()
	}
}

/// A fully wrapped view plus the metadata used to rank and probe it
#[derive(Clone)]
pub struct DerivedView {
	description: String,
	call: ViewFn,
	permissive: ViewFn,
	predicates: Arc<[Predicate]>,
	permitted: Option<PermissionCheck>,
	accept: Option<String>,
	order: u64,
	phash: String,
}

impl DerivedView {
	/// Whether a permission is enforced on calls
	pub fn is_secured(&self) -> bool {
		self.permitted.is_some()
	}

	pub fn predicates(&self) -> &[Predicate] {
		&self.predicates
	}
}

impl View for DerivedView {
	fn call(&self, context: &Context, request: &mut Request) -> Result<Response> {
		(self.call)(context, request)
	}

	fn call_permissive(&self, context: &Context, request: &mut Request) -> Result<Response> {
		(self.permissive)(context, request)
	}

	fn permitted(&self, context: &Context, request: &Request) -> bool {
		match &self.permitted {
			Some(check) => check(context, request),
			None => true,
		}
	}

	fn check_predicates(&self, context: &Context, request: &Request) -> Option<bool> {
		if self.predicates.is_empty() {
			return None;
		}
		Some(self.predicates.iter().all(|p| p.evaluate(context, request)))
	}

	fn accept(&self) -> Option<&str> {
		self.accept.as_deref()
	}

	fn order(&self) -> u64 {
		self.order
	}

	fn phash(&self) -> &str {
		&self.phash
	}

	fn describe(&self) -> String {
		self.description.clone()
	}
}

/// Wrap `view` in the standard pipeline
///
/// Fails when the named renderer has no registered factory or when `attr` is
/// given for a function view.
///
/// # Examples
///
/// ```
/// use cornice_core::http::Request;
/// use cornice_core::registry::Registry;
/// use cornice_core::resource::Context;
/// use cornice_core::traversal::DefaultRoot;
/// use cornice_core::view::View;
/// use cornice_views::deriver::{ViewOptions, derive_view};
/// use cornice_views::mapper::ViewCallable;
/// use cornice_views::renderers::register_default_renderers;
/// use std::sync::Arc;
///
/// let mut registry = Registry::new("docs");
/// register_default_renderers(&mut registry);
/// let view = ViewCallable::request_only(|_request| Ok(serde_json::json!({"ok": true})));
/// let options = ViewOptions { renderer: Some("json".into()), ..Default::default() };
///
/// let derived = derive_view(&registry, &view, &options).unwrap();
/// let context: Context = Arc::new(DefaultRoot::default());
/// let response = derived.call(&context, &mut Request::blank("/")).unwrap();
/// assert_eq!(response.text(), r#"{"ok":true}"#);
/// ```
pub fn derive_view(
	registry: &Registry,
	view: &ViewCallable,
	options: &ViewOptions,
) -> Result<DerivedView> {
	let description = describe(view, options);
	let mapper: Arc<dyn ViewMapper> = options
		.mapper
		.clone()
		.unwrap_or_else(|| Arc::new(DefaultViewMapper));
	let mapped = mapper.map(view, options.attr.as_deref())?;

	let rendered = rendered_view(registry, mapped, options, &description)?;
	let decorated = match &options.decorator {
		Some(decorator) => decorator(rendered),
		None => rendered,
	};
	let cached = http_cached_view(registry, decorated, options);
	let wrapped = owrapped_view(cached, options, &description);
	let permissive = wrapped.clone();
	let (secured, permitted) = secured_view(registry, wrapped, options, &description);
	let debugged = authdebug_view(registry, secured, options);
	let predicated = predicated_view(debugged, options, &description);

	Ok(DerivedView {
		description,
		call: predicated,
		permissive,
		predicates: options.predicates.clone().into(),
		permitted,
		accept: options.accept.clone(),
		order: options.order,
		phash: options.phash.clone(),
	})
}

fn describe(view: &ViewCallable, options: &ViewOptions) -> String {
	let mut description = format!("{:?}", view);
	if !options.name.is_empty() {
		description.push_str(&format!(" named {:?}", options.name));
	}
	if let Some(attr) = &options.attr {
		description.push_str(&format!(" (attr {:?})", attr));
	}
	description
}

fn effective_permission(registry: &Registry, options: &ViewOptions) -> Option<String> {
	options
		.permission
		.clone()
		.or_else(|| registry.default_permission().map(str::to_string))
}

fn rendered_view(
	registry: &Registry,
	view: crate::mapper::MappedView,
	options: &ViewOptions,
	description: &str,
) -> Result<ViewFn> {
	let helper = match &options.renderer {
		Some(name) => Some(RendererHelper::resolve(
			registry,
			name,
			options.package.as_deref(),
		)?),
		// A renderer registered under the empty name is the default one
		None => match registry.renderer_factory("") {
			Some(_) => Some(RendererHelper::resolve(
				registry,
				"",
				options.package.as_deref(),
			)?),
			None => None,
		},
	};
	let view_name = options.name.clone();
	let description = description.to_string();

	Ok(Arc::new(move |context: &Context, request: &mut Request| {
		let value = match view(context, request)? {
			ViewOutput::Response(response) => return Ok(response),
			ViewOutput::Value(value) => value,
		};
		let Some(helper) = &helper else {
			return Err(Error::InvalidViewResponse(format!(
				"Could not convert return value of the view callable {} into a response object. The value returned was {}.",
				description, value
			)));
		};
		match request.override_renderer.clone() {
			Some(name) => {
				let registry = request.registry()?.clone();
				RendererHelper::resolve(&registry, &name, None)?
					.render_view(value, &view_name, context, request)
			}
			None => helper.render_view(value, &view_name, context, request),
		}
	}))
}

fn http_cached_view(registry: &Registry, view: ViewFn, options: &ViewOptions) -> ViewFn {
	if registry.settings().prevent_http_cache {
		return view;
	}
	let Some(cache) = options.http_cache.clone() else {
		return view;
	};
	Arc::new(move |context: &Context, request: &mut Request| {
		let mut response = view(context, request)?;
		apply_http_cache(&mut response, &cache);
		Ok(response)
	})
}

fn apply_http_cache(response: &mut Response, cache: &HttpCache) {
	let mut directives = Vec::new();
	match cache.seconds {
		Some(0) => {
			directives.extend(["max-age=0", "must-revalidate", "no-cache", "no-store"].map(String::from));
			response.set_header(EXPIRES, &httpdate::fmt_http_date(SystemTime::now()));
			response.set_header(PRAGMA, "no-cache");
		}
		Some(seconds) => {
			directives.push(format!("max-age={}", seconds));
			let expires = SystemTime::now() + Duration::from_secs(seconds);
			response.set_header(EXPIRES, &httpdate::fmt_http_date(expires));
		}
		None => {}
	}
	directives.extend(cache.directives.iter().cloned());
	if !directives.is_empty() {
		response.set_header(CACHE_CONTROL, &directives.join(", "));
	}
}

fn owrapped_view(view: ViewFn, options: &ViewOptions, description: &str) -> ViewFn {
	let Some(wrapper) = options.wrapper.clone() else {
		return view;
	};
	let description = description.to_string();
	Arc::new(move |context: &Context, request: &mut Request| {
		let wrapped = view(context, request)?;
		request.wrapped_body = Some(wrapped.body().clone());
		request.wrapped_response = Some(wrapped);
		render_view_to_response(context, request, &wrapper, true)?.ok_or_else(|| {
			Error::Configuration(format!(
				"No wrapper view named {:?} found when executing view {}",
				wrapper, description
			))
		})
	})
}

fn secured_view(
	registry: &Registry,
	view: ViewFn,
	options: &ViewOptions,
	description: &str,
) -> (ViewFn, Option<PermissionCheck>) {
	let permission = match effective_permission(registry, options) {
		Some(permission) if permission == NO_PERMISSION_REQUIRED => None,
		other => other,
	};
	let (Some(authn), Some(authz), Some(permission)) = (
		registry.authentication_policy().cloned(),
		registry.authorization_policy().cloned(),
		permission,
	) else {
		return (view, None);
	};

	let permitted: PermissionCheck = Arc::new(move |context: &Context, request: &Request| {
		let principals = authn.effective_principals(request);
		authz.permits(context, &principals, &permission)
	});
	let check = permitted.clone();
	let description = description.to_string();
	let secured: ViewFn = Arc::new(move |context: &Context, request: &mut Request| {
		if check(context, request) {
			return view(context, request);
		}
		let message = request
			.authdebug_message
			.clone()
			.unwrap_or_else(|| format!("Unauthorized: {} failed permission check", description));
		Err(Error::forbidden(message))
	});
	(secured, Some(permitted))
}

fn authdebug_view(registry: &Registry, view: ViewFn, options: &ViewOptions) -> ViewFn {
	if !registry.settings().debug_authorization {
		return view;
	}
	let permission = effective_permission(registry, options);
	let authn = registry.authentication_policy().cloned();
	let authz = registry.authorization_policy().cloned();

	Arc::new(move |context: &Context, request: &mut Request| {
		let decision = match (&authn, &authz, permission.as_deref()) {
			(Some(_), Some(_), Some(NO_PERMISSION_REQUIRED)) => {
				"Allowed (NO_PERMISSION_REQUIRED)".to_string()
			}
			(Some(_), Some(_), None) => "Allowed (no permission registered)".to_string(),
			(Some(authn), Some(authz), Some(permission)) => {
				let principals = authn.effective_principals(request);
				let verdict = if authz.permits(context, &principals, permission) {
					"Allowed"
				} else {
					"Denied"
				};
				format!(
					"{} (permission {:?} for principals {:?})",
					verdict, permission, principals
				)
			}
			_ => "Allowed (no authorization policy in use)".to_string(),
		};
		let message = format!(
			"debug_authorization of url {} (view name {:?} against context {}): {}",
			request.uri,
			request.view_name,
			resource_path(context),
			decision
		);
		tracing::debug!(target: "cornice::views", "{}", message);
		request.authdebug_message = Some(message);
		view(context, request)
	})
}

fn predicated_view(view: ViewFn, options: &ViewOptions, description: &str) -> ViewFn {
	if options.predicates.is_empty() {
		return view;
	}
	let predicates = options.predicates.clone();
	let description = description.to_string();
	Arc::new(move |context: &Context, request: &mut Request| {
		match predicates.iter().find(|p| !p.evaluate(context, request)) {
			Some(failed) => Err(Error::PredicateMismatch(format!(
				"predicate mismatch for view {} ({})",
				description,
				failed.text()
			))),
			None => view(context, request),
		}
	})
}
