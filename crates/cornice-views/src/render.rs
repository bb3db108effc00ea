//! Calling registered views by name from application code

use bytes::Bytes;
use cornice_core::exception::Result;
use cornice_core::http::{Request, Response};
use cornice_core::interfaces::{IViewClassifier, Interface};
use cornice_core::resource::Context;

/// Call the view registered under `name` for `context`
///
/// Returns `Ok(None)` when no view is registered for the context and the
/// request's type. With `secure` false the view's permission is not checked.
///
/// # Examples
///
/// ```
/// use cornice_core::http::{Request, Response};
/// use cornice_core::interfaces::{IRequest, IViewClassifier, Interface};
/// use cornice_core::registry::Registry;
/// use cornice_core::resource::Context;
/// use cornice_core::traversal::DefaultRoot;
/// use cornice_core::view::{View, ViewKey};
/// use cornice_views::render_view_to_response;
/// use std::sync::Arc;
///
/// struct Hello;
/// impl View for Hello {
///     fn call(&self, _: &Context, _: &mut Request) -> cornice_core::Result<Response> {
///         Ok(Response::text_plain("hello"))
///     }
/// }
///
/// let mut registry = Registry::new("docs");
/// registry.register_view(
///     ViewKey::new(
///         Interface::of::<IViewClassifier>(),
///         Interface::of::<IRequest>(),
///         Interface::any(),
///         "hello",
///     ),
///     Arc::new(Hello),
/// );
/// let mut request = Request::blank("/");
/// request.registry = Some(Arc::new(registry));
/// let context: Context = Arc::new(DefaultRoot::default());
///
/// let response = render_view_to_response(&context, &mut request, "hello", true).unwrap();
/// assert_eq!(response.unwrap().text(), "hello");
/// assert!(render_view_to_response(&context, &mut request, "other", true).unwrap().is_none());
/// ```
pub fn render_view_to_response(
	context: &Context,
	request: &mut Request,
	name: &str,
	secure: bool,
) -> Result<Option<Response>> {
	let registry = request.registry()?.clone();
	let view = registry.lookup_view(
		&Interface::of::<IViewClassifier>(),
		&request.request_type.resolution_order(),
		&context.provided(),
		name,
	);
	let Some(view) = view else {
		return Ok(None);
	};
	let response = if secure {
		view.call(context, request)?
	} else {
		view.call_permissive(context, request)?
	};
	Ok(Some(response))
}

/// Like [`render_view_to_response`], returning only the body
pub fn render_view(
	context: &Context,
	request: &mut Request,
	name: &str,
	secure: bool,
) -> Result<Option<Bytes>> {
	Ok(render_view_to_response(context, request, name, secure)?.map(|r| r.body().clone()))
}
