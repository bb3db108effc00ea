//! Resources: the objects traversal walks and views are registered against

use crate::interfaces::Interface;
use std::any::Any;
use std::sync::Arc;

/// Shared handle to a resource, as stored on the request
pub type Context = Arc<dyn Resource>;

/// A node of the resource tree
///
/// Every method has a default, so a plain struct only needs an empty
/// `impl Resource for T {}` to become a leaf context. Containers override
/// [`Resource::child`]; location-aware resources override [`Resource::name`]
/// and [`Resource::parent`].
pub trait Resource: Any + Send + Sync {
	/// Name of this resource within its parent
	fn name(&self) -> Option<&str> {
		None
	}

	/// Parent resource, `None` for the root
	fn parent(&self) -> Option<Context> {
		None
	}

	/// Child resource called `name`, if any
	fn child(&self, name: &str) -> Option<Context> {
		let _ = name;
		None
	}

	/// Extra interfaces provided directly by this object
	///
	/// These take precedence over the interface of the object's type.
	fn interfaces(&self) -> Vec<Interface> {
		Vec::new()
	}

	/// Full interface resolution order, most specific first
	fn provided(&self) -> Vec<Interface> {
		let mut provided = self.interfaces();
		provided.push(Interface::of::<Self>());
		provided.push(Interface::any());
		provided
	}
}

impl dyn Resource {
	/// Downcast to a concrete resource type
	pub fn downcast_ref<T: Resource>(&self) -> Option<&T> {
		let any: &dyn Any = self;
		any.downcast_ref::<T>()
	}

	/// Whether this resource provides `iface`
	pub fn provides(&self, iface: &Interface) -> bool {
		self.provided().contains(iface)
	}
}

/// Iterate over `resource` and its parents, nearest first
pub fn lineage(resource: &Context) -> impl Iterator<Item = Context> {
	std::iter::successors(Some(resource.clone()), |current| current.parent())
}

/// First resource in the lineage providing `iface`
pub fn find_interface(resource: &Context, iface: &Interface) -> Option<Context> {
	lineage(resource).find(|candidate| candidate.provides(iface))
}

/// The root of the tree `resource` lives in
pub fn find_root(resource: &Context) -> Context {
	lineage(resource).last().unwrap_or_else(|| resource.clone())
}

/// Names from the root down to `resource`
pub fn resource_path_tuple(resource: &Context) -> Vec<String> {
	let mut names: Vec<String> = lineage(resource)
		.filter(|r| r.parent().is_some())
		.map(|r| r.name().unwrap_or_default().to_string())
		.collect();
	names.reverse();
	names
}

/// Absolute path of `resource`, always starting with `/`
pub fn resource_path(resource: &Context) -> String {
	let names = resource_path_tuple(resource);
	format!("/{}", names.join("/"))
}
