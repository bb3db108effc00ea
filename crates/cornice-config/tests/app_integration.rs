//! End-to-end tests: configure an application, then dispatch requests
//!
//! - Exception views for application errors, not-found and forbidden
//! - Fallback to the default view when no route matches
//! - Request-only, context and class views
//! - Route prefixes across nested includes
//! - Tween order from the `tweens` setting and placement around exception views
//! - Dotted names submitted through the registration macro

use cornice_conf::Settings;
use cornice_config::dotted::Dotted;
use cornice_config::{Configurator, Include, RouteConfig, TweenPlacement, ViewConfig};
use cornice_core::events::{Event, EventKind, Subscriber};
use cornice_core::exception::{Error, ExceptionResource, Result};
use cornice_core::http::{Request, Response};
use cornice_core::interfaces::Interface;
use cornice_core::registry::Registry;
use cornice_core::resource::Context;
use cornice_core::security::{AuthenticationPolicy, AuthorizationPolicy};
use cornice_core::tweens::{EXCVIEW, Handler, Tween, TweenFactory, tween_factory};
use cornice_views::{ViewCallable, ViewInstance, ViewOutput};
use http::StatusCode;
use rstest::rstest;
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Debug, thiserror::Error)]
#[error("runtime failure")]
struct RuntimeError;

fn text(body: &'static str) -> ViewCallable {
	ViewCallable::request_only(move |_request: &mut Request| Ok(Response::text_plain(body)))
}

fn api_routes() -> Dotted {
	Dotted::include(|config: &mut Configurator| {
		config.add_route("status", "/status", RouteConfig::new().view(text("ok")))
	})
}

cornice_config::register_dotted!("tests.api:includeme", api_routes);

#[rstest]
fn test_exception_view_catches_application_error() {
	// Arrange
	let mut config = Configurator::new();
	config
		.add_view(ViewConfig::new(ViewCallable::request_only(
			|_request: &mut Request| -> Result<Response> { Err(Error::application(RuntimeError)) },
		)))
		.unwrap();
	config
		.add_exception_view(
			ViewConfig::new(ViewCallable::function(|context: &Context, _request: &mut Request| {
				let error = context
					.downcast_ref::<ExceptionResource>()
					.map(|resource| resource.error().to_string())
					.unwrap_or_default();
				Ok(Response::text_plain(format!("handled: {}", error)))
			}))
			.context::<RuntimeError>(),
		)
		.unwrap();
	let app = config.make_app().unwrap();
	let mut request = Request::blank("/");

	// Act
	let response = app.invoke_request(&mut request).unwrap();

	// Assert
	assert_eq!(response.text(), "handled: runtime failure");
	let exception = request.exception.as_ref().unwrap();
	assert!(exception.downcast_ref::<RuntimeError>().is_some());
}

#[rstest]
fn test_unmatched_route_dispatches_default_view() {
	// Arrange
	let mut config = Configurator::new();
	config
		.add_route("item", "/items/{id}", RouteConfig::new().view(text("item")))
		.unwrap();
	config.add_view(ViewConfig::new(text("default"))).unwrap();
	let app = config.make_app().unwrap();

	// Act
	let unmatched = app.invoke_request(&mut Request::blank("/")).unwrap();
	let matched = app.invoke_request(&mut Request::blank("/items/7")).unwrap();

	// Assert
	assert_eq!(unmatched.text(), "default");
	assert_eq!(matched.text(), "item");
}

#[rstest]
fn test_unhandled_not_found_renders_as_404() {
	let config = Configurator::new();
	let app = config.make_app().unwrap();

	let response = app.invoke_request(&mut Request::blank("/nowhere")).unwrap();

	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[rstest]
fn test_notfound_view_replaces_default_rendering() {
	// Arrange
	let mut config = Configurator::new();
	config
		.set_notfound_view(ViewConfig::new(ViewCallable::request_only(|_request: &mut Request| {
			Ok(Response::text_plain("no such page").with_status(StatusCode::NOT_FOUND))
		})))
		.unwrap();
	let app = config.make_app().unwrap();

	// Act
	let response = app.invoke_request(&mut Request::blank("/nowhere")).unwrap();

	// Assert
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	assert_eq!(response.text(), "no such page");
}

struct HeaderAuthn;

impl AuthenticationPolicy for HeaderAuthn {
	fn effective_principals(&self, request: &Request) -> Vec<String> {
		let mut principals = vec![cornice_core::security::EVERYONE.to_string()];
		if let Some(user) = request.header("x-user") {
			principals.push(user.to_string());
		}
		principals
	}
}

struct AdminOnly;

impl AuthorizationPolicy for AdminOnly {
	fn permits(&self, _context: &Context, principals: &[String], _permission: &str) -> bool {
		principals.iter().any(|p| p == "admin")
	}
}

#[rstest]
#[case(None, "denied")]
#[case(Some("admin"), "secret")]
fn test_forbidden_view_and_default_permission(#[case] user: Option<&str>, #[case] expected: &str) {
	// Arrange
	let mut config = Configurator::new();
	config.set_authentication_policy(Arc::new(HeaderAuthn)).unwrap();
	config.set_authorization_policy(Arc::new(AdminOnly)).unwrap();
	config.set_default_permission("view").unwrap();
	config.add_view(ViewConfig::new(text("secret"))).unwrap();
	config
		.set_forbidden_view(ViewConfig::new(text("denied")))
		.unwrap();
	let app = config.make_app().unwrap();
	let mut builder = Request::builder().uri("/");
	if let Some(user) = user {
		builder = builder.header("X-User", user);
	}

	// Act
	let response = app.invoke_request(&mut builder.build().unwrap()).unwrap();

	// Assert
	assert_eq!(response.text(), expected);
}

struct Page {
	title: String,
}

impl ViewInstance for Page {
	fn invoke(&self, attr: Option<&str>, _request: &mut Request) -> Result<ViewOutput> {
		let body = match attr {
			Some("summary") => format!("summary of {}", self.title),
			_ => self.title.clone(),
		};
		Ok(json!({ "body": body }).into())
	}
}

#[rstest]
#[case(None, "/", "home")]
#[case(Some("summary"), "/summary", "summary of home")]
fn test_class_view_built_from_request(
	#[case] attr: Option<&str>,
	#[case] name: &str,
	#[case] expected: &str,
) {
	// Arrange
	let mut config = Configurator::new();
	let view = ViewCallable::class(|_request: &Request| {
		Ok(Page {
			title: "home".into(),
		})
	});
	let mut view_config = ViewConfig::new(view)
		.name(name.trim_start_matches('/'))
		.renderer("json");
	if let Some(attr) = attr {
		view_config = view_config.attr(attr);
	}
	config.add_view(view_config).unwrap();
	let app = config.make_app().unwrap();
	let mut request = Request::blank(name);

	// Act
	let response = app.invoke_request(&mut request).unwrap();

	// Assert
	let body: serde_json::Value = serde_json::from_str(&response.text()).unwrap();
	assert_eq!(body["body"], expected);
	assert!(request.view_instance.is_some());
}

#[rstest]
fn test_context_view_receives_context() {
	// Arrange
	let mut config = Configurator::new();
	config
		.add_view(ViewConfig::new(ViewCallable::function(
			|context: &Context, _request: &mut Request| {
				Ok(Response::text_plain(format!("root is {}", cornice_core::resource::resource_path(context))))
			},
		)))
		.unwrap();
	let app = config.make_app().unwrap();

	// Act
	let response = app.invoke_request(&mut Request::blank("/")).unwrap();

	// Assert
	assert_eq!(response.text(), "root is /");
}

#[rstest]
fn test_nested_include_prefixes_compose() {
	// Arrange
	let v1 = Include::new("api.v1", |config: &mut Configurator| {
		config.add_route("users", "/users", RouteConfig::new().view(text("users")))
	});
	let api = Include::new("api", move |config: &mut Configurator| {
		config.include_with_prefix(v1.clone(), Some("v1"))
	});
	let mut config = Configurator::new();
	config.include_with_prefix(api, Some("/api/")).unwrap();
	let app = config.make_app().unwrap();

	// Act
	let response = app.invoke_request(&mut Request::blank("/api/v1/users")).unwrap();

	// Assert
	assert_eq!(response.text(), "users");
	assert_eq!(app.route_path("users", &Default::default()).unwrap(), "/api/v1/users");
}

#[rstest]
fn test_include_by_submitted_dotted_name() {
	// Arrange
	let mut config = Configurator::new();
	config.include("tests.api").unwrap();
	let app = config.make_app().unwrap();

	// Act
	let response = app.invoke_request(&mut Request::blank("/status")).unwrap();

	// Assert
	assert_eq!(response.text(), "ok");
}

struct Recording {
	name: &'static str,
	log: Arc<Mutex<Vec<&'static str>>>,
}

impl Tween for Recording {
	fn process(&self, request: &mut Request, next: &dyn Handler) -> Result<Response> {
		self.log.lock().unwrap().push(self.name);
		next.handle(request)
	}
}

fn recording(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> TweenFactory {
	tween_factory(Recording {
		name,
		log: log.clone(),
	})
}

#[rstest]
#[case(None, vec!["app.txn", "app.timing"])]
#[case(Some("app.timing\napp.txn"), vec!["app.timing", "app.txn"])]
fn test_tween_order_setting(#[case] setting: Option<&str>, #[case] expected: Vec<&'static str>) {
	// Arrange
	let log = Arc::new(Mutex::new(Vec::new()));
	let mut settings = Settings::new();
	if let Some(setting) = setting {
		settings.update([("tweens", setting)]);
	}
	let mut config = Configurator::with_settings(settings);
	config
		.add_tween_factory("app.timing", recording("app.timing", &log), TweenPlacement::default())
		.unwrap();
	config
		.add_tween_factory(
			"app.txn",
			recording("app.txn", &log),
			TweenPlacement::over(["app.timing"]),
		)
		.unwrap();
	config.add_view(ViewConfig::new(text("app"))).unwrap();
	let app = config.make_app().unwrap();

	// Act
	app.invoke_request(&mut Request::blank("/")).unwrap();

	// Assert
	assert_eq!(*log.lock().unwrap(), expected);
}

struct Failing;

impl Tween for Failing {
	fn process(&self, _request: &mut Request, _next: &dyn Handler) -> Result<Response> {
		Err(Error::application(RuntimeError))
	}
}

#[rstest]
#[case(TweenPlacement::under([EXCVIEW]), Some("handled: runtime failure"))]
#[case(TweenPlacement::default(), None)]
fn test_exception_views_cover_tweens_placed_under_them(
	#[case] placement: TweenPlacement,
	#[case] expected: Option<&str>,
) {
	// Arrange
	let mut config = Configurator::new();
	config
		.add_tween_factory("app.failing", tween_factory(Failing), placement)
		.unwrap();
	config.add_view(ViewConfig::new(text("app"))).unwrap();
	config
		.add_exception_view(
			ViewConfig::new(ViewCallable::function(|context: &Context, _request: &mut Request| {
				let error = context
					.downcast_ref::<ExceptionResource>()
					.map(|resource| resource.error().to_string())
					.unwrap_or_default();
				Ok(Response::text_plain(format!("handled: {}", error)))
			}))
			.context::<RuntimeError>(),
		)
		.unwrap();
	let app = config.make_app().unwrap();

	// Act
	let result = app.invoke_request(&mut Request::blank("/"));

	// Assert
	match expected {
		Some(body) => assert_eq!(result.unwrap().text(), body),
		None => assert!(matches!(result, Err(Error::Application(_)))),
	}
}

#[rstest]
fn test_application_created_sees_committed_registry() {
	// Arrange
	let routes = Arc::new(Mutex::new(0));
	let seen = routes.clone();
	let subscriber: Subscriber = Arc::new(move |event: &mut Event<'_>| {
		if let Event::ApplicationCreated { registry } = event {
			*seen.lock().unwrap() = count_routes(registry);
		}
		Ok(())
	});
	let mut config = Configurator::new();
	config.add_subscriber(EventKind::ApplicationCreated, subscriber).unwrap();
	config.add_route("a", "/a", RouteConfig::new()).unwrap();
	config.add_route("b", "/b", RouteConfig::new()).unwrap();

	// Act
	config.make_app().unwrap();

	// Assert
	assert_eq!(*routes.lock().unwrap(), 2);
}

fn count_routes(registry: &Registry) -> usize {
	registry
		.routes_mapper()
		.map(|mapper| mapper.get_routes().len())
		.unwrap_or(0)
}

#[rstest]
fn test_exception_view_for_route_only_applies_to_route() {
	// Arrange
	let mut config = Configurator::new();
	let failing = ViewCallable::request_only(|_request: &mut Request| -> Result<Response> {
		Err(Error::application(RuntimeError))
	});
	config
		.add_route("api", "/api", RouteConfig::new().view(failing.clone()))
		.unwrap();
	config.add_view(ViewConfig::new(failing)).unwrap();
	config
		.add_exception_view(
			ViewConfig::new(text("api failure"))
				.route_name("api")
				.context_iface(Interface::of::<RuntimeError>()),
		)
		.unwrap();
	let app = config.make_app().unwrap();

	// Act
	let api = app.invoke_request(&mut Request::blank("/api")).unwrap();
	let other = app.invoke_request(&mut Request::blank("/"));

	// Assert
	assert_eq!(api.text(), "api failure");
	assert!(matches!(other, Err(Error::Application(_))));
}
