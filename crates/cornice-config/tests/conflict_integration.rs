//! Integration tests for conflict detection across includes
//!
//! - Identical registrations from one scope conflict
//! - Local registrations override included ones, at any depth
//! - Sibling includes conflict with each other
//! - Including the same name twice is a no-op

use cornice_config::{Configurator, Include, RouteConfig, ViewConfig};
use cornice_core::exception::Error;
use cornice_core::http::{Request, Response};
use cornice_views::ViewCallable;
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn text(body: &'static str) -> ViewCallable {
	ViewCallable::request_only(move |_request: &mut Request| Ok(Response::text_plain(body)))
}

fn include_view(name: &'static str, body: &'static str) -> Include {
	Include::new(name, move |config: &mut Configurator| {
		config.add_view(ViewConfig::new(text(body)))
	})
}

fn dispatch(config: Configurator) -> String {
	let app = config.make_app().unwrap();
	app.invoke_request(&mut Request::blank("/")).unwrap().text()
}

#[rstest]
fn test_identical_views_conflict() {
	// Arrange
	let mut config = Configurator::new();
	config.add_view(ViewConfig::new(text("one"))).unwrap();
	config.add_view(ViewConfig::new(text("two"))).unwrap();

	// Act
	let result = config.commit();

	// Assert
	let Err(Error::Conflict(conflict)) = result else {
		panic!("expected a conflict, got {:?}", result);
	};
	assert_eq!(conflict.conflicts.len(), 1);
	let (discriminator, sites) = conflict.conflicts.first().unwrap();
	assert!(discriminator.starts_with("('view'"));
	assert_eq!(sites.len(), 2);
	assert!(sites.iter().all(|site| site.file.ends_with("conflict_integration.rs")));
	assert_ne!(sites[0].line, sites[1].line);
}

#[rstest]
fn test_local_view_overrides_included_view() {
	// Arrange
	let mut config = Configurator::new();
	config.include(include_view("addon", "included")).unwrap();
	config.add_view(ViewConfig::new(text("local"))).unwrap();

	// Act
	let body = dispatch(config);

	// Assert
	assert_eq!(body, "local");
}

#[rstest]
fn test_local_view_wins_regardless_of_declaration_order() {
	let mut config = Configurator::new();
	config.add_view(ViewConfig::new(text("local"))).unwrap();
	config.include(include_view("addon", "included")).unwrap();

	assert_eq!(dispatch(config), "local");
}

#[rstest]
fn test_shallower_include_overrides_deeper_include() {
	// Arrange
	let outer = Include::new("outer", |config: &mut Configurator| {
		config.include(include_view("inner", "inner"))?;
		config.add_view(ViewConfig::new(text("outer")))
	});
	let mut config = Configurator::new();
	config.include(outer).unwrap();

	// Act
	let body = dispatch(config);

	// Assert
	assert_eq!(body, "outer");
}

#[rstest]
fn test_sibling_includes_conflict() {
	// Arrange
	let mut config = Configurator::new();
	config.include(include_view("first", "first")).unwrap();
	config.include(include_view("second", "second")).unwrap();

	// Act
	let result = config.commit();

	// Assert
	assert!(matches!(result, Err(Error::Conflict(_))));
}

#[rstest]
fn test_different_predicates_do_not_conflict() {
	// Arrange
	let mut config = Configurator::new();
	config.add_view(ViewConfig::new(text("page"))).unwrap();
	config.add_view(ViewConfig::new(text("ajax")).xhr(true)).unwrap();
	let app = config.make_app().unwrap();
	let mut ajax = Request::builder()
		.uri("/")
		.header("X-Requested-With", "XMLHttpRequest")
		.build()
		.unwrap();

	// Act
	let page = app.invoke_request(&mut Request::blank("/")).unwrap();
	let ajax = app.invoke_request(&mut ajax).unwrap();

	// Assert
	assert_eq!(page.text(), "page");
	assert_eq!(ajax.text(), "ajax");
}

#[rstest]
fn test_include_runs_once() {
	// Arrange
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	let once = Include::new("once", move |config: &mut Configurator| {
		counter.fetch_add(1, Ordering::SeqCst);
		config.add_route("once", "/once", RouteConfig::new())
	});
	let mut config = Configurator::new();

	// Act
	config.include(once.clone()).unwrap();
	config.include(once).unwrap();
	let result = config.commit();

	// Assert
	assert!(result.is_ok());
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[rstest]
fn test_conflicts_in_separate_commits_are_not_detected() {
	let mut config = Configurator::new();
	config.add_route("home", "/a", RouteConfig::new()).unwrap();
	config.commit().unwrap();
	config.add_route("home", "/b", RouteConfig::new()).unwrap();

	let result = config.commit();

	assert!(result.is_ok());
}
