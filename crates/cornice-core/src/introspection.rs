//! Introspection: a queryable record of what configuration registered
//!
//! Configuration actions carry [`Introspectable`]s describing the views,
//! routes, renderers and policies they register. When an action executes, its
//! introspectables are stored in the registry's [`Introspector`]. Nothing in
//! dispatch reads this data; it exists for debugging tools and tests.

use crate::exception::SourceInfo;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

type Key = (String, String);

/// Description of one registered thing
#[derive(Debug, Clone, Serialize)]
pub struct Introspectable {
	pub category: String,
	pub discriminator: String,
	pub title: String,
	pub type_name: String,
	pub attrs: IndexMap<String, Value>,
	/// Where the registering action was declared
	pub action_info: Option<SourceInfo>,
	/// Registration order, assigned by the introspector
	pub order: usize,
	relations: Vec<(bool, String, String)>,
}

impl Introspectable {
	pub fn new(
		category: impl Into<String>,
		discriminator: impl Into<String>,
		title: impl Into<String>,
		type_name: impl Into<String>,
	) -> Self {
		Self {
			category: category.into(),
			discriminator: discriminator.into(),
			title: title.into(),
			type_name: type_name.into(),
			attrs: IndexMap::new(),
			action_info: None,
			order: 0,
			relations: Vec::new(),
		}
	}

	/// Set an attribute
	pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attrs.insert(key.into(), value.into());
		self
	}

	/// Set an attribute in place
	pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
		self.attrs.insert(key.into(), value.into());
	}

	/// Relate to another introspectable once both are registered
	pub fn relate(&mut self, category: impl Into<String>, discriminator: impl Into<String>) {
		self.relations
			.push((true, category.into(), discriminator.into()));
	}

	/// Remove a relation once both are registered
	pub fn unrelate(&mut self, category: impl Into<String>, discriminator: impl Into<String>) {
		self.relations
			.push((false, category.into(), discriminator.into()));
	}

	fn key(&self) -> Key {
		(self.category.clone(), self.discriminator.clone())
	}
}

/// Store of registered introspectables, grouped by category
#[derive(Debug, Default, Clone)]
pub struct Introspector {
	categories: IndexMap<String, IndexMap<String, Introspectable>>,
	refs: IndexMap<Key, Vec<Key>>,
	counter: usize,
}

impl Introspector {
	pub fn new() -> Self {
		Self::default()
	}

	/// Store an introspectable, replacing one with the same key
	pub fn add(&mut self, mut intr: Introspectable) {
		intr.order = self.counter;
		self.counter += 1;
		self.categories
			.entry(intr.category.clone())
			.or_default()
			.insert(intr.discriminator.clone(), intr);
	}

	/// Store an introspectable and apply its pending relations
	pub fn register(&mut self, intr: Introspectable, action_info: Option<SourceInfo>) {
		let mut intr = intr;
		intr.action_info = action_info;
		let key = intr.key();
		let relations = std::mem::take(&mut intr.relations);
		self.add(intr);
		for (relate, category, discriminator) in relations {
			let other = (category, discriminator);
			if relate {
				self.relate(&key, &other);
			} else {
				self.unrelate(&key, &other);
			}
		}
	}

	pub fn get(&self, category: &str, discriminator: &str) -> Option<&Introspectable> {
		self.categories.get(category)?.get(discriminator)
	}

	/// Every introspectable of `category`, in registration order
	pub fn get_category(&self, category: &str) -> Vec<&Introspectable> {
		let mut items: Vec<&Introspectable> = self
			.categories
			.get(category)
			.map(|c| c.values().collect())
			.unwrap_or_default();
		items.sort_by_key(|i| i.order);
		items
	}

	/// Category names, in first-registration order
	pub fn categories(&self) -> Vec<&str> {
		self.categories.keys().map(String::as_str).collect()
	}

	/// Remove an introspectable and its relations
	pub fn remove(&mut self, category: &str, discriminator: &str) -> Option<Introspectable> {
		let removed = self.categories.get_mut(category)?.shift_remove(discriminator)?;
		let key = removed.key();
		self.refs.shift_remove(&key);
		for targets in self.refs.values_mut() {
			targets.retain(|t| *t != key);
		}
		Some(removed)
	}

	fn relate(&mut self, a: &Key, b: &Key) {
		for (from, to) in [(a, b), (b, a)] {
			let targets = self.refs.entry(from.clone()).or_default();
			if !targets.contains(to) {
				targets.push(to.clone());
			}
		}
	}

	fn unrelate(&mut self, a: &Key, b: &Key) {
		for (from, to) in [(a, b), (b, a)] {
			if let Some(targets) = self.refs.get_mut(from) {
				targets.retain(|t| t != to);
			}
		}
	}

	/// Introspectables related to the one at `(category, discriminator)`
	pub fn related(&self, category: &str, discriminator: &str) -> Vec<&Introspectable> {
		let key = (category.to_string(), discriminator.to_string());
		self.refs
			.get(&key)
			.map(|targets| {
				targets
					.iter()
					.filter_map(|(c, d)| self.get(c, d))
					.collect()
			})
			.unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_register_relates_both_ways() {
		// Arrange
		let mut introspector = Introspector::new();
		introspector.add(Introspectable::new("routes", "home", "home", "route"));
		let mut view = Introspectable::new("views", "v1", "home view", "view")
			.with_attr("route_name", "home");
		view.relate("routes", "home");

		// Act
		introspector.register(view, None);

		// Assert
		let related = introspector.related("routes", "home");
		assert_eq!(related.len(), 1);
		assert_eq!(related[0].discriminator, "v1");
		assert_eq!(introspector.related("views", "v1")[0].title, "home");
	}

	#[rstest]
	fn test_category_keeps_registration_order() {
		let mut introspector = Introspector::new();
		introspector.add(Introspectable::new("views", "b", "b", "view"));
		introspector.add(Introspectable::new("views", "a", "a", "view"));
		let titles: Vec<&str> = introspector
			.get_category("views")
			.into_iter()
			.map(|i| i.title.as_str())
			.collect();
		assert_eq!(titles, vec!["b", "a"]);
	}

	#[rstest]
	fn test_remove_drops_relations() {
		let mut introspector = Introspector::new();
		introspector.add(Introspectable::new("routes", "r", "r", "route"));
		let mut view = Introspectable::new("views", "v", "v", "view");
		view.relate("routes", "r");
		introspector.register(view, None);

		introspector.remove("views", "v");

		assert!(introspector.related("routes", "r").is_empty());
		assert!(introspector.get("views", "v").is_none());
	}
}
