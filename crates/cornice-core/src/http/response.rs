//! HTTP response type

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};

/// An HTTP response produced by a view
#[derive(Debug, Clone)]
pub struct Response {
	status: StatusCode,
	headers: HeaderMap,
	body: Bytes,
}

impl Response {
	/// Create an empty response with the given status
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	/// Create an empty `200 OK` response
	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	/// Create a `200 OK` plain text response
	///
	/// # Examples
	///
	/// ```
	/// use cornice_core::http::Response;
	///
	/// let response = Response::text_plain("hello");
	/// assert_eq!(response.text(), "hello");
	/// assert_eq!(response.content_type(), Some("text/plain; charset=UTF-8"));
	/// ```
	pub fn text_plain(body: impl Into<String>) -> Self {
		Self::ok()
			.with_content_type("text/plain; charset=UTF-8")
			.with_body(Bytes::from(body.into()))
	}

	/// Set the body
	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Set the status code
	pub fn with_status(mut self, status: StatusCode) -> Self {
		self.status = status;
		self
	}

	/// Set a header, ignoring values that are not valid header text
	pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
		self.set_header(name, value);
		self
	}

	/// Set the `Content-Type` header
	pub fn with_content_type(self, content_type: &str) -> Self {
		self.with_header(CONTENT_TYPE, content_type)
	}

	pub fn status(&self) -> StatusCode {
		self.status
	}

	pub fn set_status(&mut self, status: StatusCode) {
		self.status = status;
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	pub fn headers_mut(&mut self) -> &mut HeaderMap {
		&mut self.headers
	}

	/// Set a header in place, ignoring values that are not valid header text
	pub fn set_header(&mut self, name: HeaderName, value: &str) {
		if let Ok(value) = HeaderValue::from_str(value) {
			self.headers.insert(name, value);
		}
	}

	pub fn body(&self) -> &Bytes {
		&self.body
	}

	pub fn set_body(&mut self, body: impl Into<Bytes>) {
		self.body = body.into();
	}

	/// Body decoded as UTF-8 (lossy)
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Value of the `Content-Type` header
	pub fn content_type(&self) -> Option<&str> {
		self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
	}

	pub fn set_content_type(&mut self, content_type: &str) {
		self.set_header(CONTENT_TYPE, content_type);
	}
}

impl Default for Response {
	fn default() -> Self {
		Self::ok()
	}
}
