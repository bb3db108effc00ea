//! The router: per-request dispatch

use cornice_core::events::Event;
use cornice_core::exception::{Error, Result};
use cornice_core::http::{Request, Response};
use cornice_core::interfaces::{IViewClassifier, Interface};
use cornice_core::registry::{Notifier, Registry};
use cornice_core::resource::{Context, resource_path};
use cornice_core::traversal::{RootFactory, default_root_factory};
use cornice_core::tweens::Handler;
use cornice_core::urldispatch::{MatchDict, RouteMatch};
use std::fmt;
use std::sync::Arc;

/// Dispatches requests against a committed registry
///
/// The request handler is wrapped by the configured tweens, outermost first.
/// Exception views take part as the tween aliased `EXCVIEW`:
///
/// ```text
/// tween 1 -> ... -> EXCVIEW -> ... -> tween N -> request handler -> view
/// ```
pub struct Router {
	registry: Arc<Registry>,
	handler: Arc<dyn Handler>,
}

impl Router {
	/// Build the handler chain for `registry`
	///
	/// Fails when the implicit tween ordering has a cycle or names a missing
	/// tween.
	pub fn new(registry: Arc<Registry>) -> Result<Self> {
		let root_factory = registry
			.root_factory()
			.cloned()
			.unwrap_or_else(default_root_factory);
		let settings = registry.settings();
		let core: Arc<dyn Handler> = Arc::new(RequestHandler {
			registry: registry.clone(),
			root_factory,
			debug_notfound: settings.debug_notfound,
			debug_routematch: settings.debug_routematch,
		});
		let handler = registry.tweens().wrap(core, &registry)?;
		Ok(Self { registry, handler })
	}

	pub fn registry(&self) -> &Arc<Registry> {
		&self.registry
	}

	/// Run `request` through the tween chain, without request callbacks
	pub fn handle_request(&self, request: &mut Request) -> Result<Response> {
		request.registry = Some(self.registry.clone());
		self.handler.handle(request)
	}

	/// Dispatch a request
	///
	/// Response callbacks run against a successful response. Finished
	/// callbacks run on every exit path. The request keeps whatever dispatch
	/// recorded on it, including the handled `exception`.
	pub fn invoke_request(&self, request: &mut Request) -> Result<Response> {
		let mut guard = scopeguard::guard(request, |request: &mut Request| {
			request.process_finished_callbacks()
		});
		let request: &mut Request = &mut guard;

		let mut response = self.handle_request(request)?;
		request.process_response_callbacks(&mut response);
		Ok(response)
	}

	/// Dispatch a request and turn unhandled errors into plain error responses
	pub fn respond(&self, mut request: Request) -> Response {
		match self.invoke_request(&mut request) {
			Ok(response) => response,
			Err(error) => {
				tracing::warn!(
					target: "cornice::router",
					url = %request.uri,
					error = %error,
					"unhandled error while dispatching"
				);
				error.to_response()
			}
		}
	}

	/// Path of the named route
	pub fn route_path(&self, name: &str, values: &MatchDict) -> Result<String> {
		self.registry
			.routes_mapper()
			.ok_or_else(|| Error::Configuration("no routes are configured".into()))?
			.generate(name, values)
	}
}

impl Handler for Router {
	fn handle(&self, request: &mut Request) -> Result<Response> {
		self.invoke_request(request)
	}
}

impl fmt::Debug for Router {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field("registry", &self.registry)
			.finish_non_exhaustive()
	}
}

/// Routing, traversal, view lookup and view invocation
struct RequestHandler {
	registry: Arc<Registry>,
	root_factory: RootFactory,
	debug_notfound: bool,
	debug_routematch: bool,
}

impl RequestHandler {
	/// Match a route, returning the root factory to use
	fn route(&self, request: &mut Request) -> RootFactory {
		let Some(mapper) = self.registry.routes_mapper() else {
			return self.root_factory.clone();
		};
		let Some(RouteMatch { route, matchdict }) = mapper.route_request(request) else {
			if self.debug_routematch {
				tracing::debug!(
					target: "cornice::router",
					"no route matched for url {}",
					request.uri
				);
			}
			return self.root_factory.clone();
		};

		if self.debug_routematch {
			let predicates: Vec<String> = route.predicates().iter().map(|p| p.text()).collect();
			tracing::debug!(
				target: "cornice::router",
				"route matched for url {}; route_name: {:?}, path_info: {:?}, pattern: {:?}, matchdict: {:?}, predicates: {:?}",
				request.uri,
				route.name(),
				request.path_info(),
				route.pattern(),
				matchdict,
				predicates.join(", ")
			);
		}
		let factory = route.factory().cloned().unwrap_or_else(|| self.root_factory.clone());
		request.matchdict = Some(matchdict);
		request.request_type = route.request_type().clone();
		request.matched_route = Some(route);
		factory
	}

	fn not_found(&self, request: &Request, context: &Context) -> Error {
		let message = if self.debug_notfound {
			let message = format!(
				"debug_notfound of url {}; path_info: {:?}, context: {}, view_name: {:?}, subpath: {:?}, traversed: {:?}, root: {}, vroot_path: {:?}",
				request.uri,
				request.path_info(),
				resource_path(context),
				request.view_name,
				request.subpath,
				request.traversed,
				request.root.as_ref().map(resource_path).unwrap_or_default(),
				request.virtual_root_path,
			);
			tracing::debug!(target: "cornice::router", "{}", message);
			message
		} else {
			request.path_info()
		};
		Error::NotFound(message)
	}

	fn call_view(&self, context: &Context, request: &mut Request) -> Result<Response> {
		let views = self.registry.find_views(
			&Interface::of::<IViewClassifier>(),
			&request.request_type.resolution_order(),
			&context.provided(),
			&request.view_name,
		);

		let mut mismatch = None;
		for view in views {
			if view.check_predicates(context, request) == Some(false) {
				mismatch = Some(Error::PredicateMismatch(view.describe()));
				continue;
			}
			match view.call(context, request) {
				Err(error @ Error::PredicateMismatch(_)) => mismatch = Some(error),
				other => return other,
			}
		}
		Err(mismatch.unwrap_or_else(|| self.not_found(request, context)))
	}
}

impl Handler for RequestHandler {
	fn handle(&self, request: &mut Request) -> Result<Response> {
		let registry = &self.registry;
		let has_listeners = registry.has_listeners();
		if has_listeners {
			registry.notify(&mut Event::NewRequest { request: &mut *request })?;
		}

		let root_factory = self.route(request);
		let root = root_factory(&*request)?;
		let info = registry.traverser().traverse(&root, request)?;
		request.root = Some(info.root);
		request.context = Some(info.context.clone());
		request.view_name = info.view_name;
		request.subpath = info.subpath;
		request.traversed = info.traversed;
		request.virtual_root = Some(info.virtual_root);
		request.virtual_root_path = info.virtual_root_path;

		if has_listeners {
			registry.notify(&mut Event::ContextFound { request: &mut *request })?;
		}

		let mut response = self.call_view(&info.context, request)?;

		if has_listeners {
			registry.notify(&mut Event::NewResponse {
				request: &mut *request,
				response: &mut response,
			})?;
		}
		Ok(response)
	}
}
