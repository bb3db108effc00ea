//! The normalized view contract stored in the registry
//!
//! Whatever shape an application view has, registration turns it into a
//! [`View`]: a `(context, request) -> response` callable that also carries the
//! metadata a multi-view needs to rank and probe it.

use crate::exception::Result;
use crate::http::{Request, Response};
use crate::interfaces::Interface;
use crate::predicates::{DEFAULT_PHASH, MAX_ORDER};
use crate::resource::Context;
use std::any::Any;
use std::fmt;

/// A registered, normalized view
pub trait View: Any + Send + Sync {
	/// Invoke the view, enforcing its predicates and permission
	fn call(&self, context: &Context, request: &mut Request) -> Result<Response>;

	/// Invoke the view without its permission check
	fn call_permissive(&self, context: &Context, request: &mut Request) -> Result<Response> {
		self.call(context, request)
	}

	/// Whether the active security policy lets the request call this view
	fn permitted(&self, context: &Context, request: &Request) -> bool {
		let _ = (context, request);
		true
	}

	/// Evaluate the view's predicates without calling it
	///
	/// `None` means the view is unconditional.
	fn check_predicates(&self, context: &Context, request: &Request) -> Option<bool> {
		let _ = (context, request);
		None
	}

	/// Media type this view was registered for
	fn accept(&self) -> Option<&str> {
		None
	}

	/// Rank among views sharing a registration slot, lower first
	fn order(&self) -> u64 {
		MAX_ORDER
	}

	fn phash(&self) -> &str {
		DEFAULT_PHASH
	}

	/// Short description for debug output
	fn describe(&self) -> String {
		std::any::type_name::<Self>().to_string()
	}
}

impl dyn View {
	/// Downcast to a concrete view type
	pub fn downcast_ref<T: View>(&self) -> Option<&T> {
		let any: &dyn Any = self;
		any.downcast_ref::<T>()
	}
}

impl fmt::Debug for dyn View {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "<View {}>", self.describe())
	}
}

/// A registration slot: classifier, request type, context type and name
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ViewKey {
	pub classifier: Interface,
	pub request_iface: Interface,
	pub context_iface: Interface,
	pub name: String,
}

impl ViewKey {
	pub fn new(
		classifier: Interface,
		request_iface: Interface,
		context_iface: Interface,
		name: impl Into<String>,
	) -> Self {
		Self {
			classifier,
			request_iface,
			context_iface,
			name: name.into(),
		}
	}
}
