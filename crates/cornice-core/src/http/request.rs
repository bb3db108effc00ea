//! HTTP request type carrying per-request dispatch state

use super::accept::AcceptHeader;
use super::response::Response;
use crate::exception::{Error, Result};
use crate::interfaces::RequestType;
use crate::registry::Registry;
use crate::resource::Context;
use crate::session::{Session, default_locale_negotiator};
use crate::urldispatch::{MatchDict, MatchValue, Route};
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use http::{Extensions, HeaderMap, Method, Uri, Version};
use percent_encoding::percent_decode_str;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Callback run against the final response
pub type ResponseCallback = Box<dyn FnOnce(&mut Request, &mut Response) + Send>;

/// Callback run when request processing ends, whatever the outcome
pub type FinishedCallback = Box<dyn FnOnce(&mut Request) + Send>;

/// An HTTP request and the state dispatch accumulates on it
///
/// The transport fills in the HTTP part (method, URI, headers, body). The
/// router then records what it found: the matched route and its match dict,
/// the root and context resources, the view name and subpath, and on failure
/// the exception being handled.
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	pub body: Bytes,

	/// Registry of the application handling this request
	pub registry: Option<Arc<Registry>>,
	/// Request type views are looked up under
	pub request_type: RequestType,
	pub matchdict: Option<MatchDict>,
	pub matched_route: Option<Arc<Route>>,

	pub root: Option<Context>,
	pub context: Option<Context>,
	pub view_name: String,
	pub subpath: Vec<String>,
	pub traversed: Vec<String>,
	pub virtual_root: Option<Context>,
	pub virtual_root_path: Vec<String>,

	/// Error being handled by an exception view (kept after dispatch)
	pub exception: Option<Error>,
	/// Explanation of the last authorization decision
	pub authdebug_message: Option<String>,
	/// Renderer name that replaces the view's configured renderer
	pub override_renderer: Option<String>,
	/// Response of the inner view while its wrapper view runs
	pub wrapped_response: Option<Response>,
	pub wrapped_body: Option<Bytes>,
	/// Instance created by a constructor-style view
	pub view_instance: Option<Arc<dyn Any + Send + Sync>>,

	/// Application specific per-request data
	pub extensions: Extensions,

	response: Option<Response>,
	session: Option<Arc<dyn Session>>,
	response_callbacks: Vec<ResponseCallback>,
	finished_callbacks: Vec<FinishedCallback>,
}

impl Request {
	/// Create a request for `method` and `uri`
	pub fn new(method: Method, uri: Uri) -> Self {
		Self {
			method,
			uri,
			version: Version::HTTP_11,
			headers: HeaderMap::new(),
			body: Bytes::new(),
			registry: None,
			request_type: RequestType::generic(),
			matchdict: None,
			matched_route: None,
			root: None,
			context: None,
			view_name: String::new(),
			subpath: Vec::new(),
			traversed: Vec::new(),
			virtual_root: None,
			virtual_root_path: Vec::new(),
			exception: None,
			authdebug_message: None,
			override_renderer: None,
			wrapped_response: None,
			wrapped_body: None,
			view_instance: None,
			extensions: Extensions::new(),
			response: None,
			session: None,
			response_callbacks: Vec::new(),
			finished_callbacks: Vec::new(),
		}
	}

	/// Create a request builder
	///
	/// # Examples
	///
	/// ```
	/// use cornice_core::http::Request;
	/// use http::Method;
	///
	/// let request = Request::builder()
	///     .method(Method::POST)
	///     .uri("/items?sort=name")
	///     .header("X-Requested-With", "XMLHttpRequest")
	///     .build()
	///     .unwrap();
	/// assert!(request.is_xhr());
	/// assert_eq!(request.param("sort").as_deref(), Some("name"));
	/// ```
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	/// A `GET` request for `path` (an unparsable path becomes `/`)
	pub fn blank(path: &str) -> Self {
		Self::new(Method::GET, path.parse().unwrap_or_default())
	}

	/// Percent-decoded request path
	pub fn path_info(&self) -> String {
		percent_decode_str(self.uri.path())
			.decode_utf8_lossy()
			.into_owned()
	}

	/// Raw query string
	pub fn query_string(&self) -> &str {
		self.uri.query().unwrap_or("")
	}

	/// Header value as text
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	/// Whether the request was sent by `XMLHttpRequest`
	pub fn is_xhr(&self) -> bool {
		self.header("X-Requested-With") == Some("XMLHttpRequest")
	}

	/// Parsed Accept header
	pub fn accept(&self) -> AcceptHeader {
		match self.headers.get(ACCEPT).and_then(|v| v.to_str().ok()) {
			Some(value) => AcceptHeader::parse(value),
			None => AcceptHeader::any(),
		}
	}

	/// Query string parameters
	pub fn query_params(&self) -> Vec<(String, String)> {
		serde_urlencoded::from_str(self.query_string()).unwrap_or_default()
	}

	/// Form-encoded body parameters
	pub fn post_params(&self) -> Vec<(String, String)> {
		let is_form = self
			.header(CONTENT_TYPE.as_str())
			.is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
		if !is_form {
			return Vec::new();
		}
		serde_urlencoded::from_bytes(&self.body).unwrap_or_default()
	}

	/// Query and body parameters combined, query first
	pub fn params(&self) -> Vec<(String, String)> {
		let mut params = self.query_params();
		params.extend(self.post_params());
		params
	}

	/// First value of parameter `name`
	pub fn param(&self, name: &str) -> Option<String> {
		self.params()
			.into_iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value)
	}

	/// Match dict value `name` as text
	pub fn match_value(&self, name: &str) -> Option<&str> {
		self.matchdict
			.as_ref()
			.and_then(|m| m.get(name))
			.and_then(MatchValue::as_str)
	}

	/// The registry, or a configuration error when dispatch has not attached one
	pub fn registry(&self) -> Result<&Arc<Registry>> {
		self.registry
			.as_ref()
			.ok_or_else(|| Error::Configuration("request has no registry attached".into()))
	}

	/// The response views should mutate, created on first access
	pub fn response_mut(&mut self) -> &mut Response {
		self.response.get_or_insert_with(Response::ok)
	}

	/// Whether a response has been created through [`Request::response_mut`]
	pub fn has_response(&self) -> bool {
		self.response.is_some()
	}

	/// Remove and return the stashed response
	pub fn take_response(&mut self) -> Option<Response> {
		self.response.take()
	}

	/// Register a callback run against the final response
	pub fn add_response_callback<F>(&mut self, callback: F)
	where
		F: FnOnce(&mut Request, &mut Response) + Send + 'static,
	{
		self.response_callbacks.push(Box::new(callback));
	}

	/// Register a callback run when processing ends, even on error
	pub fn add_finished_callback<F>(&mut self, callback: F)
	where
		F: FnOnce(&mut Request) + Send + 'static,
	{
		self.finished_callbacks.push(Box::new(callback));
	}

	/// Run response callbacks in registration order, including ones added while running
	pub fn process_response_callbacks(&mut self, response: &mut Response) {
		while !self.response_callbacks.is_empty() {
			let callback = self.response_callbacks.remove(0);
			callback(self, response);
		}
	}

	/// Run finished callbacks in registration order, including ones added while running
	pub fn process_finished_callbacks(&mut self) {
		while !self.finished_callbacks.is_empty() {
			let callback = self.finished_callbacks.remove(0);
			callback(self);
		}
	}

	/// The session, created by the configured session factory on first access
	pub fn session(&mut self) -> Result<Arc<dyn Session>> {
		if let Some(session) = &self.session {
			return Ok(session.clone());
		}
		let factory = self
			.registry()?
			.session_factory()
			.cloned()
			.ok_or_else(|| Error::Configuration("No session factory registered".into()))?;
		let session = factory(self)?;
		self.session = Some(session.clone());
		Ok(session)
	}

	/// Locale of this request
	///
	/// Asks the configured locale negotiator (or the `_LOCALE_` parameter when
	/// none is configured), falling back to the `default_locale_name` setting.
	pub fn locale_name(&self) -> String {
		let registry = self.registry.as_ref();
		let negotiated = match registry.and_then(|r| r.locale_negotiator()) {
			Some(negotiator) => negotiator(self),
			None => default_locale_negotiator(self),
		};
		negotiated.unwrap_or_else(|| {
			registry
				.map(|r| r.settings().default_locale_name.clone())
				.unwrap_or_else(|| "en".to_string())
		})
	}

	/// Path of the named route, generated by the registry's routes mapper
	pub fn route_path(&self, name: &str, values: &MatchDict) -> Result<String> {
		let registry = self.registry()?;
		let mapper = registry
			.routes_mapper()
			.ok_or_else(|| Error::Configuration("no routes are configured".into()))?;
		mapper.generate(name, values)
	}
}

impl fmt::Debug for Request {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Request")
			.field("method", &self.method)
			.field("uri", &self.uri)
			.field("request_type", &self.request_type)
			.field("matched_route", &self.matched_route.as_ref().map(|r| r.name()))
			.field("view_name", &self.view_name)
			.field("subpath", &self.subpath)
			.field("exception", &self.exception)
			.finish_non_exhaustive()
	}
}

/// Builder for [`Request`]
#[derive(Default)]
pub struct RequestBuilder {
	method: Option<Method>,
	uri: Option<String>,
	headers: Vec<(String, String)>,
	body: Bytes,
}

impl RequestBuilder {
	pub fn method(mut self, method: Method) -> Self {
		self.method = Some(method);
		self
	}

	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = Some(uri.into());
		self
	}

	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Build the request, failing on an invalid URI or header
	pub fn build(self) -> Result<Request> {
		let uri: Uri = self
			.uri
			.as_deref()
			.unwrap_or("/")
			.parse()
			.map_err(|e: http::uri::InvalidUri| Error::Internal(e.to_string()))?;

		let mut request = Request::new(self.method.unwrap_or(Method::GET), uri);
		for (name, value) in self.headers {
			let name = HeaderName::from_bytes(name.as_bytes())
				.map_err(|e| Error::Internal(e.to_string()))?;
			let value =
				HeaderValue::from_str(&value).map_err(|e| Error::Internal(e.to_string()))?;
			request.headers.append(name, value);
		}
		request.body = self.body;
		Ok(request)
	}
}
