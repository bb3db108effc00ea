//! Resource tree traversal
//!
//! After routing, the router calls the active [`RootFactory`] and hands the
//! root to a [`Traverser`], which walks the tree along the path and reports the
//! context resource, the view name and the remaining subpath.

use crate::exception::Result;
use crate::http::Request;
use crate::resource::{Context, Resource};
use crate::urldispatch::{MatchDict, MatchValue, split_path_info};
use std::sync::Arc;

/// Header naming the virtual root path of a virtually hosted site
pub const VH_ROOT_HEADER: &str = "X-Vhm-Root";

/// Segment prefix that forces the rest of the segment to be the view name
pub const VIEW_SELECTOR: &str = "@@";

/// Produces the root resource of a request
pub type RootFactory = Arc<dyn Fn(&Request) -> Result<Context> + Send + Sync>;

/// Root resource used when no root factory is configured
///
/// Carries the match dict of the matched route, if any.
#[derive(Debug, Clone, Default)]
pub struct DefaultRoot {
	pub matchdict: Option<MatchDict>,
}

impl Resource for DefaultRoot {
	fn name(&self) -> Option<&str> {
		Some("")
	}
}

/// Root factory creating a [`DefaultRoot`]
pub fn default_root_factory() -> RootFactory {
	Arc::new(|request: &Request| {
		Ok(Arc::new(DefaultRoot {
			matchdict: request.matchdict.clone(),
		}) as Context)
	})
}

/// Everything traversal found
#[derive(Clone)]
pub struct TraversalInfo {
	pub context: Context,
	pub root: Context,
	pub view_name: String,
	pub subpath: Vec<String>,
	pub traversed: Vec<String>,
	pub virtual_root: Context,
	pub virtual_root_path: Vec<String>,
}

/// Finds the context of a request below a root
pub trait Traverser: Send + Sync {
	fn traverse(&self, root: &Context, request: &Request) -> Result<TraversalInfo>;
}

/// The default traverser, walking children with [`Resource::child`]
///
/// The path comes from the route's `traverse` match value when a route
/// matched, from the request path otherwise. Both are already decoded. Traversal stops at the first
/// segment without a child of that name, which becomes the view name; a
/// segment starting with `@@` always becomes the view name.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceTreeTraverser;

impl Traverser for ResourceTreeTraverser {
	fn traverse(&self, root: &Context, request: &Request) -> Result<TraversalInfo> {
		let (path, subpath) = match &request.matchdict {
			Some(matchdict) => {
				let path = match matchdict.get("traverse") {
					Some(MatchValue::Segments(segments)) => format!("/{}", segments.join("/")),
					Some(MatchValue::Str(s)) if !s.is_empty() => s.clone(),
					_ => "/".to_string(),
				};
				let subpath = match matchdict.get("subpath") {
					Some(MatchValue::Segments(segments)) => segments.clone(),
					Some(MatchValue::Str(s)) => split_path_info(s),
					None => Vec::new(),
				};
				(path, subpath)
			}
			None => {
				let path = request.path_info();
				let path = if path.is_empty() { "/".to_string() } else { path };
				(path, Vec::new())
			}
		};

		let (vroot_tuple, vpath, vroot_idx) = match request.header(VH_ROOT_HEADER) {
			Some(vroot_path) => {
				let vroot_path = vroot_path.trim_end_matches('/');
				let vroot_tuple = split_path_info(vroot_path);
				let idx = vroot_tuple.len() as isize - 1;
				(vroot_tuple, format!("{}{}", vroot_path, path), idx)
			}
			None => (Vec::new(), path, -1),
		};

		let vpath_tuple = if vpath == "/" {
			Vec::new()
		} else {
			split_path_info(&vpath)
		};

		let mut ob = root.clone();
		let mut vroot = root.clone();
		let traversed_until = |i: usize| -> Vec<String> {
			let end = (vroot_idx + i as isize + 1).max(0) as usize;
			vpath_tuple[..end.min(vpath_tuple.len())].to_vec()
		};

		for (i, segment) in vpath_tuple.iter().enumerate() {
			let stop_at = |view_name: &str| TraversalInfo {
				context: ob.clone(),
				root: root.clone(),
				view_name: view_name.to_string(),
				subpath: vpath_tuple[i + 1..].to_vec(),
				traversed: traversed_until(i),
				virtual_root: vroot.clone(),
				virtual_root_path: vroot_tuple.clone(),
			};

			if let Some(view_name) = segment.strip_prefix(VIEW_SELECTOR) {
				return Ok(stop_at(view_name));
			}
			let Some(next) = ob.child(segment) else {
				return Ok(stop_at(segment));
			};
			if i as isize == vroot_idx {
				vroot = next.clone();
			}
			ob = next;
		}

		Ok(TraversalInfo {
			context: ob,
			root: root.clone(),
			view_name: String::new(),
			subpath,
			traversed: vpath_tuple.clone(),
			virtual_root: vroot,
			virtual_root_path: vroot_tuple,
		})
	}
}
