//! Integration tests for the router's dispatch pipeline
//!
//! Tests the router against registries populated with derived views:
//! - Exception views handling application errors
//! - Fallback to traversal views when no route matches
//! - Route specific views and predicate mismatch fallthrough
//! - Response and finished callbacks
//! - Request lifecycle events

use cornice_core::events::{Event, EventKind};
use cornice_core::exception::{Error, ExceptionResource};
use cornice_core::http::{Request, Response};
use cornice_core::interfaces::{IExceptionViewClassifier, INotFound, IRequest, IViewClassifier, Interface, RequestType};
use cornice_core::predicates::{PredicateOptions, compile_predicates};
use cornice_core::registry::Registry;
use cornice_core::resource::Context;
use cornice_core::tweens::{EXCVIEW, EXCVIEW_NAME, MAIN};
use cornice_core::urldispatch::Route;
use cornice_core::view::ViewKey;
use cornice_dispatch::{Router, excview_tween_factory};
use cornice_views::{ViewCallable, ViewOptions, derive_view};
use http::StatusCode;
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, thiserror::Error)]
#[error("boom")]
struct RuntimeError;

fn key(classifier: Interface, request_iface: Interface, context_iface: Interface) -> ViewKey {
	ViewKey::new(classifier, request_iface, context_iface, "")
}

fn add_view(registry: &mut Registry, key: ViewKey, view: ViewCallable, options: ViewOptions) {
	let derived = derive_view(registry, &view, &options).unwrap();
	registry.register_view(key, Arc::new(derived));
}

fn text(body: &'static str) -> ViewCallable {
	ViewCallable::request_only(move |_request| Ok(Response::text_plain(body)))
}

fn with_excview(registry: &mut Registry) {
	registry.tweens_mut().add_implicit(
		EXCVIEW_NAME,
		excview_tween_factory(),
		Some(EXCVIEW.into()),
		None,
		Some(vec![MAIN.into()]),
	);
}

fn default_key() -> ViewKey {
	key(
		Interface::of::<IViewClassifier>(),
		Interface::of::<IRequest>(),
		Interface::any(),
	)
}

#[rstest]
fn test_exception_view_handles_application_error() {
	// Arrange
	let mut registry = Registry::new("excview");
	add_view(
		&mut registry,
		default_key(),
		ViewCallable::request_only(|_request| -> cornice_core::Result<Response> {
			Err(Error::application(RuntimeError))
		}),
		ViewOptions::default(),
	);
	add_view(
		&mut registry,
		key(
			Interface::of::<IExceptionViewClassifier>(),
			Interface::of::<IRequest>(),
			Interface::of::<RuntimeError>(),
		),
		ViewCallable::function(|context: &Context, _request: &mut Request| {
			let error = context.downcast_ref::<ExceptionResource>().unwrap().error();
			Ok(Response::text_plain(format!("caught: {}", error)))
		}),
		ViewOptions::default(),
	);
	with_excview(&mut registry);
	let router = Router::new(Arc::new(registry)).unwrap();
	let mut request = Request::blank("/");

	// Act
	let response = router.invoke_request(&mut request).unwrap();

	// Assert
	assert_eq!(response.text(), "caught: boom");
	let exception = request.exception.as_ref().unwrap();
	assert!(exception.downcast_ref::<RuntimeError>().is_some());
}

#[rstest]
fn test_unhandled_error_propagates() {
	let mut registry = Registry::new("excview");
	add_view(
		&mut registry,
		default_key(),
		ViewCallable::request_only(|_request| -> cornice_core::Result<Response> {
			Err(Error::application(RuntimeError))
		}),
		ViewOptions::default(),
	);
	let router = Router::new(Arc::new(registry)).unwrap();

	let result = router.invoke_request(&mut Request::blank("/"));

	assert!(matches!(result, Err(Error::Application(_))));
}

#[rstest]
fn test_unmatched_route_falls_back_to_default_view() {
	// Arrange
	let mut registry = Registry::new("fallback");
	registry
		.routes_mapper_mut()
		.connect(Route::new("home", "/home").unwrap());
	add_view(&mut registry, default_key(), text("default"), ViewOptions::default());
	let router = Router::new(Arc::new(registry)).unwrap();
	let mut request = Request::blank("/");

	// Act
	let response = router.invoke_request(&mut request).unwrap();

	// Assert
	assert_eq!(response.text(), "default");
	assert!(request.matched_route.is_none());
	assert_eq!(request.request_type, RequestType::generic());
}

#[rstest]
#[case("/home", "route")]
#[case("/", "default")]
fn test_route_views_use_route_request_type(#[case] path: &str, #[case] expected: &str) {
	// Arrange
	let mut registry = Registry::new("routes");
	registry
		.routes_mapper_mut()
		.connect(Route::new("home", "/home").unwrap());
	let route_type = RequestType::route("home", false);
	add_view(
		&mut registry,
		key(
			Interface::of::<IViewClassifier>(),
			route_type.iface().clone(),
			Interface::any(),
		),
		text("route"),
		ViewOptions::default(),
	);
	add_view(&mut registry, default_key(), text("default"), ViewOptions::default());
	let router = Router::new(Arc::new(registry)).unwrap();

	// Act
	let response = router.invoke_request(&mut Request::blank(path)).unwrap();

	// Assert
	assert_eq!(response.text(), expected);
}

#[rstest]
fn test_predicate_mismatch_falls_through_to_global_view() {
	// Arrange
	let mut registry = Registry::new("global");
	registry
		.routes_mapper_mut()
		.connect(Route::new("api", "/api").unwrap().with_global_views(true));
	let xhr = compile_predicates(&PredicateOptions {
		xhr: true,
		..Default::default()
	})
	.unwrap();
	add_view(
		&mut registry,
		key(
			Interface::of::<IViewClassifier>(),
			Interface::route_request("api"),
			Interface::any(),
		),
		text("ajax"),
		ViewOptions {
			predicates: xhr.predicates,
			order: xhr.order,
			phash: xhr.phash,
			..Default::default()
		},
	);
	add_view(&mut registry, default_key(), text("page"), ViewOptions::default());
	let router = Router::new(Arc::new(registry)).unwrap();

	// Act
	let plain = router.invoke_request(&mut Request::blank("/api")).unwrap();
	let mut ajax_request = Request::builder()
		.uri("/api")
		.header("X-Requested-With", "XMLHttpRequest")
		.build()
		.unwrap();
	let ajax = router.invoke_request(&mut ajax_request).unwrap();

	// Assert
	assert_eq!(plain.text(), "page");
	assert_eq!(ajax.text(), "ajax");
}

#[rstest]
#[case(|| Error::NotFound("gone".into()))]
#[case(|| Error::forbidden("no"))]
fn test_view_errors_are_not_retried_with_lower_ranked_views(#[case] error: fn() -> Error) {
	// Arrange
	let mut registry = Registry::new("propagate");
	registry
		.routes_mapper_mut()
		.connect(Route::new("api", "/api").unwrap().with_global_views(true));
	add_view(
		&mut registry,
		key(
			Interface::of::<IViewClassifier>(),
			Interface::route_request("api"),
			Interface::any(),
		),
		ViewCallable::request_only(move |_request| -> cornice_core::Result<Response> { Err(error()) }),
		ViewOptions::default(),
	);
	add_view(&mut registry, default_key(), text("page"), ViewOptions::default());
	let router = Router::new(Arc::new(registry)).unwrap();

	// Act
	let result = router.invoke_request(&mut Request::blank("/api"));

	// Assert
	let err = result.err().unwrap();
	assert_eq!(err.to_string(), error().to_string());
}

#[rstest]
fn test_not_found_uses_not_found_exception_view() {
	// Arrange
	let mut registry = Registry::new("notfound");
	add_view(
		&mut registry,
		key(
			Interface::of::<IExceptionViewClassifier>(),
			Interface::of::<IRequest>(),
			Interface::of::<INotFound>(),
		),
		ViewCallable::request_only(|_request| {
			Ok(Response::text_plain("missing").with_status(StatusCode::NOT_FOUND))
		}),
		ViewOptions::default(),
	);
	with_excview(&mut registry);
	let router = Router::new(Arc::new(registry)).unwrap();
	let mut request = Request::blank("/nowhere");

	// Act
	let response = router.invoke_request(&mut request).unwrap();

	// Assert
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	assert_eq!(response.text(), "missing");
	assert!(request.exception.as_ref().unwrap().is_not_found());
}

#[rstest]
#[case(false)]
#[case(true)]
fn test_finished_callbacks_run_on_every_path(#[case] fail: bool) {
	// Arrange
	let mut registry = Registry::new("callbacks");
	add_view(
		&mut registry,
		default_key(),
		ViewCallable::request_only(move |request: &mut Request| {
			request.add_response_callback(|_request, response| {
				response.set_header(http::header::SERVER, "callback");
			});
			if fail {
				return Err(Error::Internal("failed".into()));
			}
			Ok(Response::text_plain("ok"))
		}),
		ViewOptions::default(),
	);
	let router = Router::new(Arc::new(registry)).unwrap();
	let finished = Arc::new(AtomicBool::new(false));
	let flag = finished.clone();
	let mut request = Request::blank("/");
	request.add_finished_callback(move |_request| flag.store(true, Ordering::SeqCst));

	// Act
	let result = router.invoke_request(&mut request);

	// Assert
	assert!(finished.load(Ordering::SeqCst));
	match result {
		Ok(response) => {
			assert!(!fail);
			assert_eq!(response.headers()["server"], "callback");
		}
		Err(error) => {
			assert!(fail);
			assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
		}
	}
}

#[rstest]
fn test_lifecycle_events_fire_in_order() {
	// Arrange
	let mut registry = Registry::new("events");
	add_view(&mut registry, default_key(), text("body"), ViewOptions::default());
	let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
	for kind in [EventKind::NewRequest, EventKind::ContextFound, EventKind::NewResponse] {
		let seen = seen.clone();
		registry.subscribe(
			kind,
			Arc::new(move |event: &mut Event<'_>| {
				seen.lock().unwrap().push(event.kind());
				if let Event::NewResponse { response, .. } = event {
					response.set_header(http::header::SERVER, "events");
				}
				Ok(())
			}),
		);
	}
	let router = Router::new(Arc::new(registry)).unwrap();

	// Act
	let response = router.invoke_request(&mut Request::blank("/")).unwrap();

	// Assert
	assert_eq!(
		*seen.lock().unwrap(),
		vec![EventKind::NewRequest, EventKind::ContextFound, EventKind::NewResponse]
	);
	assert_eq!(response.headers()["server"], "events");
}

#[rstest]
fn test_respond_renders_unhandled_forbidden() {
	let mut registry = Registry::new("respond");
	add_view(
		&mut registry,
		default_key(),
		ViewCallable::request_only(|_request| -> cornice_core::Result<Response> {
			Err(Error::forbidden("no"))
		}),
		ViewOptions::default(),
	);
	let router = Router::new(Arc::new(registry)).unwrap();

	let response = router.respond(Request::blank("/"));

	assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
