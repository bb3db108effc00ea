//! Session and locale collaborators
//!
//! Session storage and locale negotiation strategies live outside cornice; the
//! framework only stores the configured factory and hands its product to views
//! through [`Request::session`](crate::http::Request::session) and
//! [`Request::locale_name`](crate::http::Request::locale_name).

use crate::exception::Result;
use crate::http::Request;
use serde_json::Value;
use std::sync::Arc;

/// Per-request session data
pub trait Session: Send + Sync {
	fn get(&self, key: &str) -> Option<Value>;

	fn set(&self, key: &str, value: Value);

	fn remove(&self, key: &str) -> Option<Value>;

	/// Drop every value and mark the session for deletion
	fn invalidate(&self);
}

/// Produces the session of a request
pub type SessionFactory = Arc<dyn Fn(&Request) -> Result<Arc<dyn Session>> + Send + Sync>;

/// Chooses the locale of a request, `None` meaning "use the default"
pub type LocaleNegotiator = Arc<dyn Fn(&Request) -> Option<String> + Send + Sync>;

/// Request parameter consulted by [`default_locale_negotiator`]
pub const LOCALE_PARAM: &str = "_LOCALE_";

/// Locale negotiator used when none is configured: the `_LOCALE_` request parameter
pub fn default_locale_negotiator(request: &Request) -> Option<String> {
	request.param(LOCALE_PARAM)
}
