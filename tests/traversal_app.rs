//! A small blog served through traversal
//!
//! Views are registered against resource types and view names; the root
//! factory builds the tree for every request.

use cornice::core::resource::resource_path;
use cornice::core::traversal::RootFactory;
use cornice::prelude::*;
use http::Method;
use http::header::CACHE_CONTROL;
use rstest::{fixture, rstest};
use std::sync::{Arc, Weak};

struct Site {
	blog: Arc<Blog>,
}

impl Resource for Site {
	fn child(&self, name: &str) -> Option<Context> {
		match name {
			"blog" => Some(self.blog.clone() as Context),
			_ => None,
		}
	}
}

struct Blog {
	site: Weak<Site>,
	posts: Vec<Arc<Post>>,
}

impl Resource for Blog {
	fn name(&self) -> Option<&str> {
		Some("blog")
	}

	fn parent(&self) -> Option<Context> {
		self.site.upgrade().map(|site| site as Context)
	}

	fn child(&self, name: &str) -> Option<Context> {
		self.posts
			.iter()
			.find(|post| post.slug == name)
			.map(|post| post.clone() as Context)
	}
}

struct Post {
	blog: Weak<Blog>,
	slug: String,
	title: String,
}

impl Resource for Post {
	fn name(&self) -> Option<&str> {
		Some(self.slug.as_str())
	}

	fn parent(&self) -> Option<Context> {
		self.blog.upgrade().map(|blog| blog as Context)
	}
}

fn build_site() -> Arc<Site> {
	Arc::new_cyclic(|site: &Weak<Site>| Site {
		blog: Arc::new_cyclic(|blog: &Weak<Blog>| Blog {
			site: site.clone(),
			posts: ["first", "second"]
				.into_iter()
				.map(|slug| {
					Arc::new(Post {
						blog: blog.clone(),
						slug: slug.to_string(),
						title: format!("The {} post", slug),
					})
				})
				.collect(),
		}),
	})
}

fn post_title(context: &Context) -> String {
	context
		.downcast_ref::<Post>()
		.map(|post| post.title.clone())
		.unwrap_or_default()
}

#[fixture]
fn app() -> Router {
	let site = build_site();
	let root_factory: RootFactory = Arc::new(move |_request: &Request| -> Result<Context> {
		Ok(site.clone() as Context)
	});

	let mut config = Configurator::new();
	config.set_root_factory(root_factory).unwrap();
	config
		.add_view(
			ViewConfig::new(ViewCallable::function(|context: &Context, _request: &mut Request| {
				Ok(Response::text_plain(post_title(context)))
			}))
			.context::<Post>()
			.accept("text/plain")
			.http_cache(3600u64),
		)
		.unwrap();
	config
		.add_view(
			ViewConfig::new(ViewCallable::function(|context: &Context, _request: &mut Request| {
				Ok(json!({ "title": post_title(context), "path": resource_path(context) }))
			}))
			.context::<Post>()
			.accept("application/json")
			.renderer("json"),
		)
		.unwrap();
	config
		.add_view(
			ViewConfig::new(ViewCallable::function(|context: &Context, _request: &mut Request| {
				Ok(Response::text_plain(format!("saved {}", resource_path(context))))
			}))
			.name("edit")
			.context::<Post>()
			.request_method([Method::POST]),
		)
		.unwrap();
	config
		.add_view(
			ViewConfig::new(ViewCallable::request_only(|request: &mut Request| {
				Ok(Response::text_plain(format!("{} posts", request.subpath.len())))
			}))
			.context::<Blog>(),
		)
		.unwrap();
	config.make_app().unwrap()
}

fn get(path: &str, accept: &str) -> Request {
	Request::builder().uri(path).header("Accept", accept).build().unwrap()
}

#[rstest]
fn test_accept_selects_plain_text_view(app: Router) {
	// Arrange
	let mut request = get("/blog/first", "text/plain");

	// Act
	let response = app.invoke_request(&mut request).unwrap();

	// Assert
	assert_eq!(response.text(), "The first post");
	assert_eq!(response.headers().get(CACHE_CONTROL).unwrap(), "max-age=3600");
}

#[rstest]
fn test_accept_selects_json_view(app: Router) {
	// Arrange
	let mut request = get("/blog/second", "application/json");

	// Act
	let response = app.invoke_request(&mut request).unwrap();

	// Assert
	let body: serde_json::Value = serde_json::from_str(&response.text()).unwrap();
	assert_eq!(body["title"], "The second post");
	assert_eq!(body["path"], "/blog/second");
}

#[rstest]
fn test_unacceptable_media_type_is_not_found(app: Router) {
	let mut request = get("/blog/first", "image/png");

	let response = app.invoke_request(&mut request).unwrap();

	assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
}

#[rstest]
fn test_named_view_on_post(app: Router) {
	// Arrange
	let mut request = Request::builder()
		.method(Method::POST)
		.uri("/blog/first/edit")
		.build()
		.unwrap();

	// Act
	let response = app.invoke_request(&mut request).unwrap();

	// Assert
	assert_eq!(response.text(), "saved /blog/first");
	assert_eq!(request.view_name, "edit");
}

#[rstest]
fn test_named_view_predicate_mismatch_is_not_found(app: Router) {
	let mut request = Request::blank("/blog/first/edit");

	let response = app.invoke_request(&mut request).unwrap();

	assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
}

#[rstest]
fn test_container_view_receives_context(app: Router) {
	let response = app.invoke_request(&mut Request::blank("/blog")).unwrap();

	assert_eq!(response.text(), "0 posts");
}
