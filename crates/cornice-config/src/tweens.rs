//! Tween registration

use crate::actions::Discriminator;
use crate::configurator::Configurator;
use crate::dotted::{Dotted, absolute_name};
use cornice_core::exception::{Error, Result};
use cornice_core::introspection::Introspectable;
use cornice_core::registry::Registry;
use cornice_core::tweens::{INGRESS, MAIN, TweenFactory};
use serde_json::json;

/// Where an implicitly ordered tween goes
///
/// `under` and `over` each list fallbacks: names, aliases or the
/// [`INGRESS`] and [`MAIN`] sentinels, any one of which satisfies the
/// constraint. Without either the tween goes directly under [`INGRESS`].
///
/// # Examples
///
/// ```
/// use cornice_config::TweenPlacement;
/// use cornice_core::tweens::MAIN;
///
/// let placement = TweenPlacement::over([MAIN]).with_under(["myapp.auth"]);
/// assert_eq!(placement.over, Some(vec![MAIN.to_string()]));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TweenPlacement {
	pub alias: Option<String>,
	pub under: Option<Vec<String>>,
	pub over: Option<Vec<String>>,
}

impl TweenPlacement {
	pub fn under<I, S>(names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self::default().with_under(names)
	}

	pub fn over<I, S>(names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self::default().with_over(names)
	}

	pub fn with_under<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.under = Some(names.into_iter().map(Into::into).collect());
		self
	}

	pub fn with_over<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.over = Some(names.into_iter().map(Into::into).collect());
		self
	}

	pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
		self.alias = Some(alias.into());
		self
	}
}

impl Configurator {
	/// Add the tween factory registered under the dotted name `name`
	///
	/// The name identifies the tween in placements and in the `tweens`
	/// setting, which overrides implicit ordering entirely.
	#[track_caller]
	pub fn add_tween(&mut self, name: &str, placement: TweenPlacement) -> Result<()> {
		let name = absolute_name(name, self.package.as_deref())?;
		if name == INGRESS || name == MAIN {
			return Err(Error::Configuration(format!("{} is a reserved tween name", name)));
		}
		let factory: TweenFactory = self.catalog.resolve(&name, None)?;
		if placement.over.iter().flatten().any(|o| o == INGRESS) {
			return Err(Error::Configuration(format!("{} cannot be over INGRESS", name)));
		}
		if placement.under.iter().flatten().any(|u| u == MAIN) {
			return Err(Error::Configuration(format!("{} cannot be under MAIN", name)));
		}

		let intr = Introspectable::new(
			"tweens",
			format!("implicit {}", name),
			name.clone(),
			"implicit tween",
		)
		.with_attr("name", name.clone())
		.with_attr("type", "implicit")
		.with_attr("alias", json!(placement.alias))
		.with_attr("under", json!(placement.under))
		.with_attr("over", json!(placement.over));
		let discriminator = Discriminator::new(["tween", name.as_str(), "implicit"]);
		let TweenPlacement { alias, under, over } = placement;
		let register = move |registry: &mut Registry| -> Result<()> {
			registry
				.tweens_mut()
				.add_implicit(name, factory, alias, under, over);
			Ok(())
		};
		self.action(Some(discriminator), Some(Box::new(register)), 0, vec![intr])
	}

	/// Register `factory` under `name`, then [`add_tween`](Self::add_tween) it
	#[track_caller]
	pub fn add_tween_factory(
		&mut self,
		name: &str,
		factory: TweenFactory,
		placement: TweenPlacement,
	) -> Result<()> {
		self.register_dotted(name, Dotted::Tween(factory))?;
		self.add_tween(name, placement)
	}

	/// Append a tween to the explicit order
	#[track_caller]
	pub(crate) fn add_explicit_tween(&mut self, name: &str) -> Result<()> {
		if name == INGRESS || name == MAIN {
			return Err(Error::Configuration(format!("{} is a reserved tween name", name)));
		}
		let factory: TweenFactory = self.catalog.resolve(name, None)?;
		let name = name.to_string();
		let intr = Introspectable::new("tweens", format!("explicit {}", name), name.clone(), "explicit tween")
			.with_attr("name", name.clone())
			.with_attr("type", "explicit");
		let discriminator = Discriminator::new(["tween", name.as_str(), "explicit"]);
		let register = move |registry: &mut Registry| -> Result<()> {
			registry.tweens_mut().add_explicit(name, factory);
			Ok(())
		};
		self.action(Some(discriminator), Some(Box::new(register)), 0, vec![intr])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use cornice_core::tweens::{EXCVIEW_NAME, Handler};
	use rstest::rstest;
	use std::sync::Arc;

	fn passthrough() -> TweenFactory {
		Arc::new(|next: Arc<dyn Handler>, _registry: &Registry| next)
	}

	#[rstest]
	#[case(INGRESS)]
	#[case(MAIN)]
	fn test_reserved_names(#[case] name: &str) {
		let mut config = Configurator::new();

		let result = config.add_tween_factory(name, passthrough(), TweenPlacement::default());

		assert!(matches!(result, Err(Error::Configuration(message)) if message.contains("reserved")));
	}

	#[rstest]
	fn test_cannot_be_over_ingress() {
		let mut config = Configurator::new();

		let result = config.add_tween_factory("app.t", passthrough(), TweenPlacement::over([INGRESS]));

		assert!(matches!(result, Err(Error::Configuration(message)) if message.contains("over INGRESS")));
	}

	#[rstest]
	fn test_cannot_be_under_main() {
		let mut config = Configurator::new();

		let result = config.add_tween_factory("app.t", passthrough(), TweenPlacement::under([MAIN]));

		assert!(matches!(result, Err(Error::Configuration(message)) if message.contains("under MAIN")));
	}

	#[rstest]
	fn test_unknown_tween_name() {
		let mut config = Configurator::new();

		let result = config.add_tween("app.missing", TweenPlacement::default());

		assert!(matches!(result, Err(Error::Configuration(_))));
	}

	#[rstest]
	fn test_relative_tween_name_uses_package() {
		// Arrange
		let mut config = Configurator::new().with_package("app");
		config
			.register_dotted(".timing", Dotted::Tween(passthrough()))
			.unwrap();

		// Act
		config.add_tween(".timing", TweenPlacement::default()).unwrap();
		config.commit().unwrap();

		// Assert
		assert_eq!(
			config.registry().tweens().implicit_names(),
			[EXCVIEW_NAME, "app.timing"]
		);
	}

	#[rstest]
	fn test_same_tween_twice_conflicts() {
		let mut config = Configurator::new();
		config
			.add_tween_factory("app.t", passthrough(), TweenPlacement::default())
			.unwrap();
		config.add_tween("app.t", TweenPlacement::default()).unwrap();

		let result = config.commit();

		assert!(matches!(result, Err(Error::Conflict(_))));
	}
}
