//! Security policy collaborators
//!
//! cornice ships no policy implementations. Applications plug in an
//! authentication policy (who is calling) and an authorization policy (may
//! they do this); views registered with a permission are then guarded by them.

use crate::http::Request;
use crate::resource::Context;

/// Permission that disables the default permission for a view
pub const NO_PERMISSION_REQUIRED: &str = "__no_permission_required__";

/// Principal every request has
pub const EVERYONE: &str = "system.Everyone";

/// Principal of every authenticated request
pub const AUTHENTICATED: &str = "system.Authenticated";

/// Determines who is making a request
pub trait AuthenticationPolicy: Send + Sync {
	/// Every principal the request acts as, including [`EVERYONE`]
	fn effective_principals(&self, request: &Request) -> Vec<String>;

	/// The authenticated user id, if any
	fn authenticated_userid(&self, request: &Request) -> Option<String> {
		let _ = request;
		None
	}
}

/// Decides whether principals hold a permission on a context
pub trait AuthorizationPolicy: Send + Sync {
	fn permits(&self, context: &Context, principals: &[String], permission: &str) -> bool;

	/// Principals allowed `permission` on `context`, when the policy can tell
	fn principals_allowed_by_permission(&self, context: &Context, permission: &str) -> Vec<String> {
		let _ = (context, permission);
		Vec::new()
	}
}
