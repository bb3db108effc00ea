//! The action ledger
//!
//! Configuration calls do not touch the registry directly. Each one records an
//! [`Action`]: a deferred callable keyed by a [`Discriminator`] naming what it
//! configures. On commit the ledger is checked for conflicts and the
//! surviving actions run in phase order.
//!
//! Two actions with the same discriminator conflict unless one of them comes
//! from a configuration scope enclosing the other's. Local configuration then
//! overrides what it included.

use cornice_core::exception::{ConflictError, Error, Result, SourceInfo};
use cornice_core::introspection::Introspectable;
use cornice_core::registry::Registry;
use indexmap::IndexMap;
use std::fmt;

/// Renderers, policies, default permission, session factory, locale negotiator
pub const PHASE1_CONFIG: i32 = -20;

/// Routes and policy consistency checks
pub const PHASE2_CONFIG: i32 = -10;

/// Views and everything else
pub const PHASE3_CONFIG: i32 = 0;

/// The deferred work of an action
pub type ActionCallable = Box<dyn FnOnce(&mut Registry) -> Result<()>>;

/// What an action configures
///
/// # Examples
///
/// ```
/// use cornice_config::actions::Discriminator;
///
/// let discriminator = Discriminator::new(["route", "home"]);
/// assert_eq!(discriminator.to_string(), "('route', 'home')");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Discriminator(Vec<String>);

impl Discriminator {
	pub fn new<I, S>(parts: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self(parts.into_iter().map(Into::into).collect())
	}

	pub fn parts(&self) -> &[String] {
		&self.0
	}
}

impl From<&str> for Discriminator {
	fn from(value: &str) -> Self {
		Self(vec![value.to_string()])
	}
}

impl fmt::Display for Discriminator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let parts: Vec<String> = self.0.iter().map(|part| format!("'{}'", part)).collect();
		write!(f, "({})", parts.join(", "))
	}
}

/// One pending configuration action
pub struct Action {
	/// `None` never conflicts
	pub discriminator: Option<Discriminator>,
	pub callable: Option<ActionCallable>,
	/// Phase; lower runs first
	pub order: i32,
	/// Specs of the includes this action was declared under, outermost first
	pub includepath: Vec<String>,
	/// Where the action was declared
	pub info: SourceInfo,
	pub introspectables: Vec<Introspectable>,
}

impl Action {
	/// Run the callable and record the introspectables
	///
	/// A failing callable is reported as [`Error::ConfigurationExecution`]
	/// carrying the declaration site.
	pub fn execute(self, registry: &mut Registry) -> Result<()> {
		let Action {
			discriminator,
			callable,
			info,
			introspectables,
			..
		} = self;
		if let Some(callable) = callable {
			tracing::trace!(
				target: "cornice::config",
				discriminator = ?discriminator.as_ref().map(ToString::to_string),
				%info,
				"executing action"
			);
			callable(registry).map_err(|source| {
				tracing::warn!(target: "cornice::config", %info, error = %source, "configuration action failed");
				Error::ConfigurationExecution {
					info,
					source: Box::new(source),
				}
			})?;
		}
		for intr in introspectables {
			registry.introspector_mut().register(intr, Some(info));
		}
		Ok(())
	}
}

impl fmt::Debug for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Action")
			.field("discriminator", &self.discriminator)
			.field("order", &self.order)
			.field("includepath", &self.includepath)
			.field("info", &self.info)
			.finish_non_exhaustive()
	}
}

/// Drop overridden actions and order the rest for execution
///
/// Actions sharing a discriminator are sorted by include path, then ledger
/// position. The first one wins; every other must have been declared under
/// an include nested strictly inside the winner's scope, or it is a
/// conflict. Actions repeated from the very same call site are ignored
/// rather than reported. All conflicts are returned together.
///
/// Surviving actions are ordered by phase, then ledger position.
///
/// # Examples
///
/// ```
/// use cornice_config::actions::{Action, Discriminator, resolve_conflicts};
/// use cornice_core::exception::{Error, SourceInfo};
///
/// let action = |line: u32, includepath: Vec<String>| Action {
///     discriminator: Some(Discriminator::new(["renderer", "json"])),
///     callable: None,
///     order: 0,
///     includepath,
///     info: SourceInfo { file: "app.rs", line, column: 1 },
///     introspectables: Vec::new(),
/// };
///
/// // An included action is overridden by the local one
/// let resolved = resolve_conflicts(vec![action(1, vec!["pkg.inc".into()]), action(2, vec![])]).unwrap();
/// assert_eq!(resolved.len(), 1);
/// assert_eq!(resolved[0].info.line, 2);
///
/// // Two local actions conflict
/// let result = resolve_conflicts(vec![action(1, vec![]), action(2, vec![])]);
/// assert!(matches!(result, Err(Error::Conflict(_))));
/// ```
pub fn resolve_conflicts(actions: Vec<Action>) -> Result<Vec<Action>> {
	let mut output: Vec<(i32, usize, Action)> = Vec::new();
	let mut unique: IndexMap<Discriminator, Vec<(usize, Action)>> = IndexMap::new();

	for (index, action) in actions.into_iter().enumerate() {
		match action.discriminator.clone() {
			None => output.push((action.order, index, action)),
			Some(discriminator) => unique.entry(discriminator).or_default().push((index, action)),
		}
	}

	let mut conflict = ConflictError::default();
	for (discriminator, mut dups) in unique {
		dups.sort_by(|(ia, a), (ib, b)| a.includepath.cmp(&b.includepath).then(ia.cmp(ib)));
		let mut dups = dups.into_iter();
		let Some((index, base)) = dups.next() else {
			continue;
		};

		for (_, action) in dups {
			let nested = action.includepath.len() > base.includepath.len()
				&& action.includepath.starts_with(&base.includepath);
			if nested {
				tracing::debug!(
					target: "cornice::config",
					discriminator = %discriminator,
					winner = %base.info,
					overridden = %action.info,
					"included action overridden"
				);
				continue;
			}
			if action.includepath == base.includepath && action.info == base.info {
				continue;
			}
			conflict
				.conflicts
				.entry(discriminator.to_string())
				.or_insert_with(|| vec![base.info])
				.push(action.info);
		}
		output.push((base.order, index, base));
	}

	if !conflict.conflicts.is_empty() {
		tracing::warn!(target: "cornice::config", "{}", conflict);
		return Err(conflict.into());
	}

	output.sort_by(|(oa, ia, _), (ob, ib, _)| oa.cmp(ob).then(ia.cmp(ib)));
	Ok(output.into_iter().map(|(_, _, action)| action).collect())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn action(discriminator: Option<&str>, order: i32, includepath: &[&str], line: u32) -> Action {
		Action {
			discriminator: discriminator.map(Discriminator::from),
			callable: None,
			order,
			includepath: includepath.iter().map(|s| s.to_string()).collect(),
			info: SourceInfo {
				file: "config.rs",
				line,
				column: 1,
			},
			introspectables: Vec::new(),
		}
	}

	fn lines(actions: &[Action]) -> Vec<u32> {
		actions.iter().map(|a| a.info.line).collect()
	}

	#[rstest]
	fn test_none_discriminators_never_conflict() {
		let resolved = resolve_conflicts(vec![action(None, 0, &[], 1), action(None, 0, &[], 2)]).unwrap();

		assert_eq!(lines(&resolved), vec![1, 2]);
	}

	#[rstest]
	fn test_sorted_by_phase_then_ledger_position() {
		// Arrange
		let actions = vec![
			action(Some("view"), 0, &[], 1),
			action(Some("route"), -10, &[], 2),
			action(None, 0, &[], 3),
			action(Some("renderer"), -20, &[], 4),
			action(Some("other route"), -10, &[], 5),
		];

		// Act
		let resolved = resolve_conflicts(actions).unwrap();

		// Assert
		assert_eq!(lines(&resolved), vec![4, 2, 5, 1, 3]);
	}

	#[rstest]
	fn test_deeper_include_is_overridden_by_shallower() {
		// Arrange
		let actions = vec![
			action(Some("x"), 0, &["a", "b"], 1),
			action(Some("x"), 0, &["a"], 2),
		];

		// Act
		let resolved = resolve_conflicts(actions).unwrap();

		// Assert
		assert_eq!(lines(&resolved), vec![2]);
	}

	#[rstest]
	#[case(&["a"], &["b"])]
	#[case(&[], &[])]
	#[case(&["a"], &["a"])]
	fn test_sibling_scopes_conflict(#[case] first: &[&str], #[case] second: &[&str]) {
		// Arrange
		let actions = vec![action(Some("x"), 0, first, 1), action(Some("x"), 0, second, 2)];

		// Act
		let result = resolve_conflicts(actions);

		// Assert
		let Err(Error::Conflict(conflict)) = result else {
			panic!("expected a conflict, got {:?}", result);
		};
		let sites: Vec<u32> = conflict.conflicts["('x')"].iter().map(|i| i.line).collect();
		assert_eq!(sites, vec![1, 2]);
	}

	#[rstest]
	fn test_all_conflicts_reported_together() {
		let actions = vec![
			action(Some("x"), 0, &[], 1),
			action(Some("x"), 0, &[], 2),
			action(Some("y"), 0, &[], 3),
			action(Some("y"), 0, &[], 4),
			action(Some("x"), 0, &[], 5),
		];

		let Err(Error::Conflict(conflict)) = resolve_conflicts(actions) else {
			panic!("expected a conflict");
		};

		assert_eq!(conflict.conflicts.len(), 2);
		assert_eq!(conflict.conflicts["('x')"].len(), 3);
	}

	#[rstest]
	fn test_same_call_site_is_not_a_conflict() {
		let resolved = resolve_conflicts(vec![action(Some("x"), 0, &[], 7), action(Some("x"), 0, &[], 7)]).unwrap();

		assert_eq!(resolved.len(), 1);
	}

	#[rstest]
	fn test_failing_callable_reports_declaration_site() {
		// Arrange
		let mut registry = Registry::new("actions");
		let mut failing = action(Some("x"), 0, &[], 42);
		failing.callable = Some(Box::new(|_registry: &mut Registry| {
			Err(Error::Configuration("bad".into()))
		}));

		// Act
		let result = failing.execute(&mut registry);

		// Assert
		match result {
			Err(Error::ConfigurationExecution { info, source }) => {
				assert_eq!(info.line, 42);
				assert!(matches!(*source, Error::Configuration(_)));
			}
			other => panic!("unexpected {:?}", other),
		}
	}

	#[rstest]
	fn test_execute_registers_introspectables() {
		let mut registry = Registry::new("actions");
		let mut with_intr = action(Some("x"), 0, &[], 3);
		with_intr.introspectables.push(Introspectable::new("routes", "home", "home", "route"));

		with_intr.execute(&mut registry).unwrap();

		let intr = registry.introspector().get("routes", "home").unwrap();
		assert_eq!(intr.action_info.map(|i| i.line), Some(3));
	}
}
