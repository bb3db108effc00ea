//! Several views sharing one registration slot
//!
//! When two registrations land on the same (classifier, request type, context
//! type, name) slot, the slot holds a [`MultiView`] instead. It keeps the
//! candidates ranked by predicate order and grouped by the media type they
//! accept, and at call time dispatches to the first one whose predicates hold.

use cornice_core::exception::{Error, Result};
use cornice_core::http::{Request, Response};
use cornice_core::resource::Context;
use cornice_core::view::View;
use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
struct Candidate {
	order: u64,
	view: Arc<dyn View>,
	phash: String,
}

impl fmt::Debug for Candidate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Candidate")
			.field("order", &self.order)
			.field("view", &self.view)
			.field("phash", &self.phash)
			.finish()
	}
}

/// Outcome of probing a [`MultiView`]'s candidates
#[derive(Debug, Clone)]
pub enum ViewMatch {
	Matched(Arc<dyn View>),
	NoMatch,
}

impl ViewMatch {
	pub fn is_matched(&self) -> bool {
		matches!(self, Self::Matched(_))
	}
}

/// Ranked candidate views of one registration slot
#[derive(Clone, Debug, Default)]
pub struct MultiView {
	name: String,
	views: Vec<Candidate>,
	media_views: IndexMap<String, Vec<Candidate>>,
	accepts: IndexSet<String>,
}

impl MultiView {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Default::default()
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Add a candidate
	///
	/// A candidate with the same predicate hash as an existing one replaces it
	/// in place. Otherwise it is inserted after every candidate of lower or
	/// equal order. Candidates registered for a concrete media type go in
	/// that type's bucket.
	///
	/// # Examples
	///
	/// ```
	/// use cornice_core::http::{Request, Response};
	/// use cornice_core::resource::Context;
	/// use cornice_core::view::View;
	/// use cornice_views::multiview::MultiView;
	/// use std::sync::Arc;
	///
	/// struct Named(&'static str);
	/// impl View for Named {
	///     fn call(&self, _: &Context, _: &mut Request) -> cornice_core::Result<Response> {
	///         Ok(Response::text_plain(self.0))
	///     }
	/// }
	///
	/// let mut multi = MultiView::new("");
	/// multi.add(Arc::new(Named("late")), 100, "a", None);
	/// multi.add(Arc::new(Named("early")), 10, "b", None);
	/// multi.add(Arc::new(Named("replaced")), 100, "a", None);
	/// assert_eq!(multi.len(), 2);
	/// ```
	pub fn add(&mut self, view: Arc<dyn View>, order: u64, phash: &str, accept: Option<&str>) {
		let candidate = Candidate {
			order,
			view,
			phash: phash.to_string(),
		};
		match accept {
			Some(accept) if !accept.contains('*') => {
				let bucket = self.media_views.entry(accept.to_string()).or_default();
				insert_ranked(bucket, candidate);
				self.accepts.insert(accept.to_string());
			}
			_ => insert_ranked(&mut self.views, candidate),
		}
	}

	/// Number of candidates across all buckets
	pub fn len(&self) -> usize {
		self.views.len() + self.media_views.values().map(Vec::len).sum::<usize>()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Media types with a dedicated bucket, in registration order
	pub fn accepts(&self) -> impl Iterator<Item = &str> {
		self.accepts.iter().map(String::as_str)
	}

	/// Candidates in the order they are tried for `request`
	///
	/// Buckets are taken in the order of the client's `Accept` preferences,
	/// registration order when it sent none. Candidates without a media type
	/// come last.
	pub fn get_views(&self, request: &Request) -> Vec<Arc<dyn View>> {
		let mut ordered = Vec::new();
		if !self.accepts.is_empty() {
			let accept = request.accept();
			let mut offers: Vec<&str> = self.accepts.iter().map(String::as_str).collect();
			while let Some(best) = accept.best_match(&offers) {
				let best = best.to_string();
				if let Some(bucket) = self.media_views.get(&best) {
					ordered.extend(bucket.iter().map(|c| c.view.clone()));
				}
				offers.retain(|offer| *offer != best);
			}
		}
		ordered.extend(self.views.iter().map(|c| c.view.clone()));
		ordered
	}

	/// The first candidate whose predicates hold, without calling it
	pub fn match_view(&self, context: &Context, request: &Request) -> ViewMatch {
		self.get_views(request)
			.into_iter()
			.find(|view| view.check_predicates(context, request) != Some(false))
			.map_or(ViewMatch::NoMatch, ViewMatch::Matched)
	}

	fn mismatch(&self) -> Error {
		Error::PredicateMismatch(self.name.clone())
	}
}

fn insert_ranked(bucket: &mut Vec<Candidate>, candidate: Candidate) {
	if let Some(existing) = bucket.iter_mut().find(|c| c.phash == candidate.phash) {
		*existing = candidate;
		return;
	}
	bucket.push(candidate);
	// stable: equal orders keep registration order
	bucket.sort_by_key(|c| c.order);
}

impl View for MultiView {
	fn call(&self, context: &Context, request: &mut Request) -> Result<Response> {
		for view in self.get_views(request) {
			if view.check_predicates(context, request) == Some(false) {
				continue;
			}
			match view.call(context, request) {
				Err(Error::PredicateMismatch(_)) => continue,
				other => return other,
			}
		}
		Err(self.mismatch())
	}

	fn call_permissive(&self, context: &Context, request: &mut Request) -> Result<Response> {
		match self.match_view(context, request) {
			ViewMatch::Matched(view) => view.call_permissive(context, request),
			ViewMatch::NoMatch => Err(self.mismatch()),
		}
	}

	fn permitted(&self, context: &Context, request: &Request) -> bool {
		match self.match_view(context, request) {
			ViewMatch::Matched(view) => view.permitted(context, request),
			ViewMatch::NoMatch => true,
		}
	}

	fn check_predicates(&self, context: &Context, request: &Request) -> Option<bool> {
		Some(self.match_view(context, request).is_matched())
	}

	fn describe(&self) -> String {
		format!("MultiView {:?} ({} views)", self.name, self.len())
	}
}
