//! Interfaces: the keys views, routes and exception views are registered under
//!
//! An [`Interface`] is either derived from a Rust type (`Interface::of::<T>()`)
//! or named at runtime (per-route request types). Equality and hashing only
//! look at the identity part, never at the human readable name.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A registration key describing "what something provides"
#[derive(Clone)]
pub enum Interface {
	/// Interface derived from a Rust type
	Type {
		/// Type identity
		id: TypeId,
		/// Type name, used for display only
		name: &'static str,
	},
	/// Interface created at runtime from a name
	Named(Arc<str>),
}

impl Interface {
	/// Interface for the type `T`
	///
	/// # Examples
	///
	/// ```
	/// use cornice_core::interfaces::Interface;
	///
	/// struct Folder;
	/// assert_eq!(Interface::of::<Folder>(), Interface::of::<Folder>());
	/// assert_ne!(Interface::of::<Folder>(), Interface::of::<String>());
	/// ```
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self::Type {
			id: TypeId::of::<T>(),
			name: std::any::type_name::<T>(),
		}
	}

	/// Interface identified by a runtime name
	pub fn named(name: impl Into<Arc<str>>) -> Self {
		Self::Named(name.into())
	}

	/// The request interface dedicated to the route called `route_name`
	///
	/// # Examples
	///
	/// ```
	/// use cornice_core::interfaces::Interface;
	///
	/// let iface = Interface::route_request("home");
	/// assert_eq!(iface.name(), "home_IRequest");
	/// assert_eq!(iface, Interface::route_request("home"));
	/// ```
	pub fn route_request(route_name: &str) -> Self {
		Self::named(format!("{}_IRequest", route_name))
	}

	/// The root interface every object provides
	pub fn any() -> Self {
		Self::of::<IInterface>()
	}

	/// Display name
	pub fn name(&self) -> &str {
		match self {
			Self::Type { name, .. } => name,
			Self::Named(name) => name,
		}
	}
}

impl PartialEq for Interface {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Type { id: a, .. }, Self::Type { id: b, .. }) => a == b,
			(Self::Named(a), Self::Named(b)) => a == b,
			_ => false,
		}
	}
}

impl Eq for Interface {}

impl Hash for Interface {
	fn hash<H: Hasher>(&self, state: &mut H) {
		match self {
			Self::Type { id, .. } => {
				0u8.hash(state);
				id.hash(state);
			}
			Self::Named(name) => {
				1u8.hash(state);
				name.hash(state);
			}
		}
	}
}

impl fmt::Debug for Interface {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "<Interface {}>", self.name())
	}
}

impl fmt::Display for Interface {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// The request interface a request currently provides
///
/// Requests that matched no route provide [`IRequest`]. A matched route swaps
/// in its own interface; with `use_global_views` that interface extends
/// [`IRequest`] so views registered without a route also apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestType {
	iface: Interface,
	bases: Vec<Interface>,
}

impl RequestType {
	/// The generic request type
	pub fn generic() -> Self {
		Self {
			iface: Interface::of::<IRequest>(),
			bases: Vec::new(),
		}
	}

	/// The request type of a route
	pub fn route(route_name: &str, use_global_views: bool) -> Self {
		let bases = if use_global_views {
			vec![Interface::of::<IRequest>()]
		} else {
			Vec::new()
		};
		Self {
			iface: Interface::route_request(route_name),
			bases,
		}
	}

	/// The primary interface
	pub fn iface(&self) -> &Interface {
		&self.iface
	}

	/// Interfaces used for view lookup, most specific first
	pub fn resolution_order(&self) -> Vec<Interface> {
		let mut order = Vec::with_capacity(self.bases.len() + 2);
		order.push(self.iface.clone());
		order.extend(self.bases.iter().cloned());
		order.push(Interface::any());
		order
	}

	/// Interfaces used for exception view lookup
	///
	/// Always includes [`IRequest`], so exception views registered without a
	/// route catch errors raised under any route.
	///
	/// # Examples
	///
	/// ```
	/// use cornice_core::interfaces::{IRequest, Interface, RequestType};
	///
	/// let route = RequestType::route("home", false);
	/// assert!(!route.resolution_order().contains(&Interface::of::<IRequest>()));
	/// assert!(route.combined().contains(&Interface::of::<IRequest>()));
	/// ```
	pub fn combined(&self) -> Vec<Interface> {
		let mut order = self.resolution_order();
		let generic = Interface::of::<IRequest>();
		if !order.contains(&generic) {
			order.insert(order.len() - 1, generic);
		}
		order
	}
}

impl Default for RequestType {
	fn default() -> Self {
		Self::generic()
	}
}

/// Root interface, provided by every object
pub struct IInterface;

/// The generic request type
pub struct IRequest;

/// Classifier for ordinary views
pub struct IViewClassifier;

/// Classifier for exception views
pub struct IExceptionViewClassifier;

/// Provided by every error
pub struct IException;

/// Provided by errors that map onto an HTTP status (not found, forbidden)
pub struct IHttpException;

/// Provided by not-found errors (including predicate mismatches)
pub struct INotFound;

/// Provided by forbidden errors
pub struct IForbidden;

/// Provided by predicate mismatch errors
pub struct IPredicateMismatch;

/// Provided by configuration errors
pub struct IConfigurationError;
