//! Integration tests for derived views sharing a registry
//!
//! - Wrapper views receive the wrapped response through the request
//! - Derived views ranked inside a multi-view by predicate order
//! - A missing wrapper view is a configuration error at call time

use cornice_core::exception::Error;
use cornice_core::http::{Request, Response};
use cornice_core::interfaces::{IRequest, IViewClassifier, Interface};
use cornice_core::predicates::{PredicateOptions, compile_predicates};
use cornice_core::registry::Registry;
use cornice_core::resource::Context;
use cornice_core::traversal::DefaultRoot;
use cornice_core::view::{View, ViewKey};
use cornice_views::{MultiView, ViewCallable, ViewOptions, derive_view, register_default_renderers};
use http::Method;
use rstest::rstest;
use std::sync::Arc;

fn slot(name: &str) -> ViewKey {
	ViewKey::new(
		Interface::of::<IViewClassifier>(),
		Interface::of::<IRequest>(),
		Interface::any(),
		name,
	)
}

fn context() -> Context {
	Arc::new(DefaultRoot::default())
}

fn text_view(text: &'static str) -> ViewCallable {
	ViewCallable::request_only(move |_request| Ok(Response::text_plain(text)))
}

#[rstest]
fn test_wrapper_view_receives_wrapped_body() {
	// Arrange
	let mut registry = Registry::new("wrapping");
	register_default_renderers(&mut registry);
	let layout = ViewCallable::request_only(|request: &mut Request| {
		let inner = request
			.wrapped_body
			.as_ref()
			.map(|b| String::from_utf8_lossy(b).into_owned())
			.unwrap_or_default();
		Ok(Response::text_plain(format!("<main>{}</main>", inner)))
	});
	let layout = derive_view(&registry, &layout, &ViewOptions::default()).unwrap();
	registry.register_view(slot("layout"), Arc::new(layout));

	let page = derive_view(
		&registry,
		&text_view("page"),
		&ViewOptions {
			wrapper: Some("layout".into()),
			..Default::default()
		},
	)
	.unwrap();
	let mut request = Request::blank("/");
	request.registry = Some(Arc::new(registry));

	// Act
	let response = page.call(&context(), &mut request).unwrap();

	// Assert
	assert_eq!(response.text(), "<main>page</main>");
	assert!(request.wrapped_response.is_some());
}

#[rstest]
fn test_missing_wrapper_is_configuration_error() {
	let registry = Registry::new("wrapping");
	let page = derive_view(
		&registry,
		&text_view("page"),
		&ViewOptions {
			wrapper: Some("absent".into()),
			..Default::default()
		},
	)
	.unwrap();
	let mut request = Request::blank("/");
	request.registry = Some(Arc::new(registry));

	let result = page.call(&context(), &mut request);

	assert!(matches!(result, Err(Error::Configuration(message)) if message.contains("absent")));
}

#[rstest]
#[case(Method::POST, "post")]
#[case(Method::GET, "any")]
fn test_multiview_orders_derived_views(#[case] method: Method, #[case] expected: &str) {
	// Arrange
	let registry = Registry::new("multi");
	let post = compile_predicates(&PredicateOptions {
		request_method: Some(vec![Method::POST]),
		..Default::default()
	})
	.unwrap();
	let any = compile_predicates(&PredicateOptions::default()).unwrap();

	let mut multi = MultiView::new("");
	for (text, set) in [("any", any), ("post", post)] {
		let options = ViewOptions {
			predicates: set.predicates,
			order: set.order,
			phash: set.phash,
			..Default::default()
		};
		let view = derive_view(&registry, &text_view(text), &options).unwrap();
		multi.add(Arc::new(view), options.order, &options.phash, None);
	}
	let mut request = Request::builder().method(method).uri("/").build().unwrap();

	// Act
	let response = multi.call(&context(), &mut request).unwrap();

	// Assert
	assert_eq!(response.text(), expected);
}
