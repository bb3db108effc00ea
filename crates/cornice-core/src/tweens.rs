//! Tweens: request handler wrappers ordered by a partial-order graph
//!
//! A tween factory receives the handler below it and returns a handler that
//! wraps it. Tweens are ordered either explicitly (the `tweens` setting) or
//! implicitly from `under`/`over` constraints between aliases and the two
//! sentinels: [`INGRESS`] (closest to the wire) and [`MAIN`] (closest to the
//! application). Exception views are served by an ordinary tween aliased
//! [`EXCVIEW`], so other tweens may be placed above or below them.
//!
//! # Examples
//!
//! ```
//! use cornice_core::tweens::{INGRESS, MAIN, Tweens};
//! # use cornice_core::tweens::TweenFactory;
//! # use std::sync::Arc;
//! # let f: TweenFactory = Arc::new(|handler, _| handler);
//!
//! let mut tweens = Tweens::new();
//! tweens.add_implicit("auth", f.clone(), None, None, None);
//! tweens.add_implicit("timing", f.clone(), None, None, Some(vec!["auth".into()]));
//! tweens.add_implicit("txn", f, None, Some(vec![INGRESS.into()]), Some(vec![MAIN.into()]));
//!
//! let names: Vec<String> = tweens.implicit().unwrap().into_iter().map(|(n, _)| n).collect();
//! assert_eq!(names, vec!["txn", "timing", "auth"]);
//! ```

use crate::exception::{CyclicDependencyError, Error, Result};
use crate::http::{Request, Response};
use crate::registry::Registry;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::sync::Arc;

/// Sentinel: the wire side of the tween chain
pub const INGRESS: &str = "INGRESS";

/// Sentinel: the application side of the tween chain
pub const MAIN: &str = "MAIN";

/// Alias of the exception view tween
pub const EXCVIEW: &str = "EXCVIEW";

/// Dotted name of the exception view tween factory
pub const EXCVIEW_NAME: &str = "cornice.tweens.excview_tween_factory";

/// Something that turns a request into a response
pub trait Handler: Send + Sync {
	fn handle(&self, request: &mut Request) -> Result<Response>;
}

/// Blanket implementation for `Arc<T>` where T: Handler
impl<T: Handler + ?Sized> Handler for Arc<T> {
	fn handle(&self, request: &mut Request) -> Result<Response> {
		(**self).handle(request)
	}
}

/// A closure used as a [`Handler`]
pub struct FnHandler<F>(pub F);

impl<F> Handler for FnHandler<F>
where
	F: Fn(&mut Request) -> Result<Response> + Send + Sync,
{
	fn handle(&self, request: &mut Request) -> Result<Response> {
		(self.0)(request)
	}
}

/// Wrap a closure as a shared handler
pub fn handler_fn<F>(f: F) -> Arc<dyn Handler>
where
	F: Fn(&mut Request) -> Result<Response> + Send + Sync + 'static,
{
	Arc::new(FnHandler(f))
}

/// Builds a tween around the handler below it
pub type TweenFactory = Arc<dyn Fn(Arc<dyn Handler>, &Registry) -> Arc<dyn Handler> + Send + Sync>;

/// Middleware-style tween: processes a request and delegates to `next`
pub trait Tween: Send + Sync {
	fn process(&self, request: &mut Request, next: &dyn Handler) -> Result<Response>;
}

struct TweenHandler<T> {
	tween: Arc<T>,
	next: Arc<dyn Handler>,
}

impl<T: Tween> Handler for TweenHandler<T> {
	fn handle(&self, request: &mut Request) -> Result<Response> {
		self.tween.process(request, self.next.as_ref())
	}
}

/// Factory placing a shared [`Tween`] in the chain
pub fn tween_factory<T: Tween + 'static>(tween: T) -> TweenFactory {
	let tween = Arc::new(tween);
	Arc::new(move |next, _registry: &Registry| {
		Arc::new(TweenHandler {
			tween: tween.clone(),
			next,
		}) as Arc<dyn Handler>
	})
}

/// The tween graph
#[derive(Default, Clone)]
pub struct Tweens {
	explicit: Vec<(String, TweenFactory)>,
	names: Vec<String>,
	req_over: IndexSet<String>,
	req_under: IndexSet<String>,
	factories: HashMap<String, TweenFactory>,
	order: Vec<(String, String)>,
	alias_to_name: HashMap<String, String>,
	name_to_alias: HashMap<String, String>,
}

impl Tweens {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a tween to the explicit order
	pub fn add_explicit(&mut self, name: impl Into<String>, factory: TweenFactory) {
		self.explicit.push((name.into(), factory));
	}

	/// Add a tween ordered by constraints
	///
	/// `under` places the tween below any of the listed names/aliases/sentinels
	/// (closer to the application), `over` above them. Each list is a set of
	/// fallbacks: it is satisfied when any listed node exists. With neither
	/// given the tween goes under [`INGRESS`].
	pub fn add_implicit(
		&mut self,
		name: impl Into<String>,
		factory: TweenFactory,
		alias: Option<String>,
		under: Option<Vec<String>>,
		over: Option<Vec<String>>,
	) {
		let name = name.into();
		let alias = alias.unwrap_or_else(|| name.clone());
		self.alias_to_name.insert(alias.clone(), name.clone());
		self.name_to_alias.insert(name.clone(), alias.clone());
		self.names.push(name.clone());
		self.factories.insert(name, factory);

		let under = match (&under, &over) {
			(None, None) => Some(vec![INGRESS.to_string()]),
			_ => under,
		};
		if let Some(under) = under {
			for u in under {
				self.order.push((u, alias.clone()));
			}
			self.req_under.insert(alias.clone());
		}
		if let Some(over) = over {
			for o in over {
				self.order.push((alias.clone(), o));
			}
			self.req_over.insert(alias);
		}
	}

	/// Names of implicitly ordered tweens, in registration order
	pub fn implicit_names(&self) -> &[String] {
		&self.names
	}

	/// Explicitly ordered tweens
	pub fn explicit(&self) -> &[(String, TweenFactory)] {
		&self.explicit
	}

	fn resolve<'a>(&'a self, node: &'a str, aliases: &IndexSet<&str>) -> Option<&'a str> {
		if aliases.contains(node) {
			return Some(node);
		}
		self.name_to_alias
			.get(node)
			.map(String::as_str)
			.filter(|alias| aliases.contains(alias))
	}

	/// Resolve the implicit order, wire side first
	///
	/// Constraints naming absent nodes are dropped; a tween whose every
	/// `over` (or `under`) constraint was dropped is a configuration error.
	/// A cycle is a [`CyclicDependencyError`].
	pub fn implicit(&self) -> Result<Vec<(String, TweenFactory)>> {
		let mut aliases: IndexSet<&str> = IndexSet::new();
		aliases.insert(INGRESS);
		aliases.insert(MAIN);
		for name in &self.names {
			if let Some(alias) = self.name_to_alias.get(name) {
				aliases.insert(alias.as_str());
			}
		}

		// node -> (incoming arc count, successors)
		let mut graph: IndexMap<&str, (usize, Vec<&str>)> = IndexMap::new();
		let mut roots: Vec<&str> = Vec::new();
		for alias in &aliases {
			graph.insert(*alias, (0, Vec::new()));
			roots.push(*alias);
		}

		let mut has_over: IndexSet<&str> = IndexSet::new();
		let mut has_under: IndexSet<&str> = IndexSet::new();
		let edges = std::iter::once((INGRESS, MAIN))
			.chain(self.order.iter().map(|(a, b)| (a.as_str(), b.as_str())));
		for (a, b) in edges {
			let (Some(a), Some(b)) = (self.resolve(a, &aliases), self.resolve(b, &aliases)) else {
				continue;
			};
			if let Some((_, successors)) = graph.get_mut(a) {
				successors.push(b);
			}
			if let Some((arcs, _)) = graph.get_mut(b) {
				*arcs += 1;
			}
			roots.retain(|r| *r != b);
			has_over.insert(a);
			has_under.insert(b);
		}

		let mut missing_over: Vec<&str> = self
			.req_over
			.iter()
			.map(String::as_str)
			.filter(|alias| !has_over.contains(alias))
			.collect();
		if !missing_over.is_empty() {
			missing_over.sort_unstable();
			return Err(Error::Configuration(format!(
				"Detected tweens with no satisfied over dependencies: {}",
				missing_over.join(", ")
			)));
		}
		let mut missing_under: Vec<&str> = self
			.req_under
			.iter()
			.map(String::as_str)
			.filter(|alias| !has_under.contains(alias))
			.collect();
		if !missing_under.is_empty() {
			missing_under.sort_unstable();
			return Err(Error::Configuration(format!(
				"Detected tweens with no satisfied under dependencies: {}",
				missing_under.join(", ")
			)));
		}

		let mut sorted_aliases = Vec::with_capacity(graph.len());
		while !roots.is_empty() {
			let root = roots.remove(0);
			sorted_aliases.push(root);
			let Some((_, children)) = graph.shift_remove(root) else {
				continue;
			};
			for child in children {
				if let Some((arcs, _)) = graph.get_mut(child) {
					*arcs -= 1;
					if *arcs == 0 {
						roots.insert(0, child);
					}
				}
			}
		}

		if !graph.is_empty() {
			let cycles = graph
				.into_iter()
				.map(|(node, (_, successors))| {
					(
						node.to_string(),
						successors.into_iter().map(str::to_string).collect(),
					)
				})
				.collect();
			return Err(CyclicDependencyError { cycles }.into());
		}

		let mut result = Vec::new();
		for alias in sorted_aliases {
			let name = self
				.alias_to_name
				.get(alias)
				.map(String::as_str)
				.unwrap_or(alias);
			if let Some(factory) = self.factories.get(name) {
				result.push((name.to_string(), factory.clone()));
			}
		}
		Ok(result)
	}

	/// The order in effect: explicit when configured, implicit otherwise
	pub fn resolved(&self) -> Result<Vec<(String, TweenFactory)>> {
		if self.explicit.is_empty() {
			self.implicit()
		} else {
			Ok(self.explicit.clone())
		}
	}

	/// Wrap `handler` so the first tween of the order runs first
	pub fn wrap(&self, handler: Arc<dyn Handler>, registry: &Registry) -> Result<Arc<dyn Handler>> {
		let mut handler = handler;
		for (name, factory) in self.resolved()?.into_iter().rev() {
			tracing::debug!(target: "cornice::tweens", tween = %name, "wrapping handler");
			handler = factory(handler, registry);
		}
		Ok(handler)
	}
}
