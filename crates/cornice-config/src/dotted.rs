//! Dotted names
//!
//! Configuration may refer to views, tweens, includes and other objects by a
//! dotted name (`myapp.views.home`, `myapp.views:home`) instead of by value.
//! Names are looked up in the configurator's [`Catalog`] and then among the
//! entries submitted with [`register_dotted!`](crate::register_dotted).
//!
//! A name starting with `.` or `:` is relative to the configurator's package:
//! `.views` is `<package>.views`, each further leading dot climbs one level,
//! and `:home` is `<package>:home`.

use crate::configurator::Configurator;
use cornice_core::events::Subscriber;
use cornice_core::exception::{Error, Result};
use cornice_core::rendering::RendererFactory;
use cornice_core::traversal::RootFactory;
use cornice_core::tweens::TweenFactory;
use cornice_views::ViewCallable;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// The body of an include
pub type IncludeFn = Arc<dyn Fn(&mut Configurator) -> Result<()>>;

/// Anything a dotted name may refer to
#[derive(Clone)]
pub enum Dotted {
	Include(IncludeFn),
	View(ViewCallable),
	Tween(TweenFactory),
	RootFactory(RootFactory),
	Renderer(Arc<dyn RendererFactory>),
	Subscriber(Subscriber),
}

impl Dotted {
	/// An include body
	pub fn include<F>(f: F) -> Self
	where
		F: Fn(&mut Configurator) -> Result<()> + 'static,
	{
		Self::Include(Arc::new(f))
	}

	fn kind(&self) -> &'static str {
		match self {
			Self::Include(_) => "include",
			Self::View(_) => "view",
			Self::Tween(_) => "tween factory",
			Self::RootFactory(_) => "root factory",
			Self::Renderer(_) => "renderer factory",
			Self::Subscriber(_) => "subscriber",
		}
	}
}

impl fmt::Debug for Dotted {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "<Dotted {}>", self.kind())
	}
}

/// A dotted name registered at link time
///
/// Submit entries with [`register_dotted!`](crate::register_dotted).
pub struct DottedEntry {
	pub name: &'static str,
	pub make: fn() -> Dotted,
}

inventory::collect!(DottedEntry);

/// Register a dotted name for every configurator in the program
///
/// # Example
///
/// ```rust,ignore
/// use cornice_config::dotted::Dotted;
///
/// fn includeme() -> Dotted {
///     Dotted::include(|config| config.add_route("home", "/", Default::default()))
/// }
///
/// cornice_config::register_dotted!("myapp.routes:includeme", includeme);
/// ```
#[macro_export]
macro_rules! register_dotted {
	($name:expr, $make:expr) => {
		$crate::inventory::submit! {
			$crate::dotted::DottedEntry {
				name: $name,
				make: $make,
			}
		}
	};
}

/// Values that may be extracted from a [`Dotted`]
pub trait FromDotted: Sized {
	/// What the name should refer to, for error messages
	const KIND: &'static str;

	fn from_dotted(value: Dotted) -> Option<Self>;
}

macro_rules! from_dotted {
	($ty:ty, $variant:ident, $kind:expr) => {
		impl FromDotted for $ty {
			const KIND: &'static str = $kind;

			fn from_dotted(value: Dotted) -> Option<Self> {
				match value {
					Dotted::$variant(inner) => Some(inner),
					_ => None,
				}
			}
		}

		impl From<$ty> for Resolvable<$ty> {
			fn from(value: $ty) -> Self {
				Self::Value(value)
			}
		}
	};
}

from_dotted!(IncludeFn, Include, "include");
from_dotted!(ViewCallable, View, "view");
from_dotted!(TweenFactory, Tween, "tween factory");
from_dotted!(RootFactory, RootFactory, "root factory");
from_dotted!(Arc<dyn RendererFactory>, Renderer, "renderer factory");
from_dotted!(Subscriber, Subscriber, "subscriber");

/// A value given directly or by dotted name
#[derive(Clone)]
pub enum Resolvable<T> {
	Name(String),
	Value(T),
}

impl<T> From<&str> for Resolvable<T> {
	fn from(name: &str) -> Self {
		Self::Name(name.to_string())
	}
}

impl<T> From<String> for Resolvable<T> {
	fn from(name: String) -> Self {
		Self::Name(name)
	}
}

impl<T: FromDotted> Resolvable<T> {
	/// The value itself, or what its name refers to
	pub fn resolve(self, catalog: &Catalog, package: Option<&str>) -> Result<T> {
		match self {
			Self::Value(value) => Ok(value),
			Self::Name(name) => catalog.resolve(&name, package),
		}
	}
}

impl<T> fmt::Debug for Resolvable<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Name(name) => write!(f, "Name({:?})", name),
			Self::Value(_) => f.write_str("Value(..)"),
		}
	}
}

/// Names known to one configurator
#[derive(Clone, Debug, Default)]
pub struct Catalog {
	entries: IndexMap<String, Dotted>,
}

impl Catalog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register `value` under an absolute name, replacing an earlier entry
	pub fn register(&mut self, name: &str, value: Dotted) {
		self.entries.insert(canonical(name), value);
	}

	pub fn contains(&self, name: &str) -> bool {
		self.lookup(name).is_some()
	}

	/// Find an absolute name, here first and then among submitted entries
	pub fn lookup(&self, name: &str) -> Option<Dotted> {
		let name = canonical(name);
		if let Some(value) = self.entries.get(&name) {
			return Some(value.clone());
		}
		inventory::iter::<DottedEntry>
			.into_iter()
			.find(|entry| canonical(entry.name) == name)
			.map(|entry| (entry.make)())
	}

	/// Resolve a possibly relative name to a value of the expected kind
	pub fn resolve<T: FromDotted>(&self, name: &str, package: Option<&str>) -> Result<T> {
		let absolute = absolute_name(name, package)?;
		let value = self.lookup(&absolute).ok_or_else(|| {
			Error::Configuration(format!("The dotted name {:?} cannot be resolved", absolute))
		})?;
		let kind = value.kind();
		T::from_dotted(value).ok_or_else(|| {
			Error::Configuration(format!(
				"The dotted name {:?} refers to a {}, not a {}",
				absolute,
				kind,
				T::KIND
			))
		})
	}
}

fn canonical(name: &str) -> String {
	name.replace(':', ".")
}

/// Make a relative dotted name absolute
///
/// # Examples
///
/// ```
/// use cornice_config::dotted::absolute_name;
///
/// assert_eq!(absolute_name(".views", Some("myapp.web")).unwrap(), "myapp.web.views");
/// assert_eq!(absolute_name("..views", Some("myapp.web")).unwrap(), "myapp.views");
/// assert_eq!(absolute_name(":home", Some("myapp")).unwrap(), "myapp:home");
/// assert_eq!(absolute_name("other.views", Some("myapp")).unwrap(), "other.views");
/// assert!(absolute_name(".views", None).is_err());
/// ```
pub fn absolute_name(name: &str, package: Option<&str>) -> Result<String> {
	if !name.starts_with('.') && !name.starts_with(':') {
		return Ok(name.to_string());
	}
	let package = package.ok_or_else(|| {
		Error::Configuration(format!(
			"relative name {:?} irrelevant when no package is set",
			name
		))
	})?;
	if name.starts_with(':') {
		return Ok(format!("{}{}", package, name));
	}

	let dots = name.chars().take_while(|c| *c == '.').count();
	let rest = &name[dots..];
	let mut parts: Vec<&str> = package.split('.').collect();
	let up = dots - 1;
	if up >= parts.len() {
		return Err(Error::Configuration(format!(
			"relative name {:?} climbs above package {:?}",
			name, package
		)));
	}
	parts.truncate(parts.len() - up);
	let base = parts.join(".");
	Ok(if rest.is_empty() {
		base
	} else if rest.starts_with(':') {
		format!("{}{}", base, rest)
	} else {
		format!("{}.{}", base, rest)
	})
}

/// Package the objects of a dotted name live in: everything before `:`, or the whole name
pub(crate) fn package_of(name: &str) -> &str {
	name.split(':').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
	use super::*;
	use cornice_core::http::{Request, Response};
	use rstest::rstest;

	fn catalog_view() -> Dotted {
		Dotted::View(ViewCallable::request_only(|_request: &mut Request| {
			Ok(Response::text_plain("registered"))
		}))
	}

	crate::register_dotted!("cornice_config.tests:submitted", catalog_view);

	#[rstest]
	#[case(".views", "app.web", "app.web.views")]
	#[case("..views", "app.web", "app.views")]
	#[case(".", "app.web", "app.web")]
	#[case(".:home", "app.web", "app.web:home")]
	#[case(":home", "app.web", "app.web:home")]
	fn test_relative_names(#[case] name: &str, #[case] package: &str, #[case] expected: &str) {
		assert_eq!(absolute_name(name, Some(package)).unwrap(), expected);
	}

	#[rstest]
	fn test_climbing_above_package_fails() {
		assert!(matches!(
			absolute_name("...views", Some("app")),
			Err(Error::Configuration(_))
		));
	}

	#[rstest]
	fn test_colon_and_dot_spellings_are_equivalent() {
		// Arrange
		let mut catalog = Catalog::new();
		catalog.register("app.views:home", catalog_view());

		// Act
		let by_dot: Result<ViewCallable> = catalog.resolve("app.views.home", None);
		let relative: Result<ViewCallable> = catalog.resolve(".views:home", Some("app"));

		// Assert
		assert!(by_dot.is_ok());
		assert!(relative.is_ok());
	}

	#[rstest]
	fn test_submitted_entries_are_found() {
		let catalog = Catalog::new();

		let view: Result<ViewCallable> = catalog.resolve("cornice_config.tests.submitted", None);

		assert!(view.is_ok());
	}

	#[rstest]
	fn test_wrong_kind_is_configuration_error() {
		let mut catalog = Catalog::new();
		catalog.register("app.home", catalog_view());

		let result: Result<TweenFactory> = catalog.resolve("app.home", None);

		assert!(matches!(result, Err(Error::Configuration(message)) if message.contains("not a tween factory")));
	}

	#[rstest]
	fn test_values_pass_through() {
		let catalog = Catalog::new();
		let value: Resolvable<ViewCallable> = catalog_view_callable().into();

		assert!(value.resolve(&catalog, None).is_ok());
	}

	fn catalog_view_callable() -> ViewCallable {
		ViewCallable::request_only(|_request: &mut Request| Ok(Response::ok()))
	}
}
