//! Renderers, security policies, factories and subscribers

use crate::actions::{Discriminator, PHASE1_CONFIG, PHASE2_CONFIG, PHASE3_CONFIG};
use crate::configurator::Configurator;
use crate::dotted::Resolvable;
use cornice_core::events::{EventKind, Subscriber};
use cornice_core::exception::{Error, Result};
use cornice_core::introspection::Introspectable;
use cornice_core::registry::Registry;
use cornice_core::rendering::RendererFactory;
use cornice_core::security::{AuthenticationPolicy, AuthorizationPolicy};
use cornice_core::session::{LocaleNegotiator, SessionFactory};
use cornice_core::traversal::RootFactory;
use std::sync::Arc;

impl Configurator {
	/// Register a renderer factory by name (`json`) or extension (`.txt`)
	#[track_caller]
	pub fn add_renderer(
		&mut self,
		name: &str,
		factory: impl Into<Resolvable<Arc<dyn RendererFactory>>>,
	) -> Result<()> {
		let factory = self.maybe_dotted(factory)?;
		let name = name.to_string();
		let intr = Introspectable::new("renderer factories", name.clone(), name.clone(), "renderer factory")
			.with_attr("name", name.clone());
		let discriminator = Discriminator::new(["renderer", name.as_str()]);
		let register = move |registry: &mut Registry| -> Result<()> {
			registry.register_renderer(name, factory);
			Ok(())
		};
		self.action(Some(discriminator), Some(Box::new(register)), PHASE1_CONFIG, vec![intr])
	}

	/// Permission required by views registered without one
	#[track_caller]
	pub fn set_default_permission(&mut self, permission: &str) -> Result<()> {
		let permission = permission.to_string();
		let mut intr = Introspectable::new("default permission", "", permission.clone(), "default permission")
			.with_attr("value", permission.clone());
		intr.relate("permissions", permission.clone());
		let perm_intr = Introspectable::new("permissions", permission.clone(), permission.clone(), "permission");
		let register = move |registry: &mut Registry| -> Result<()> {
			registry.set_default_permission(Some(permission));
			Ok(())
		};
		self.action(
			Some("default permission".into()),
			Some(Box::new(register)),
			PHASE1_CONFIG,
			vec![intr, perm_intr],
		)
	}

	#[track_caller]
	pub fn set_authentication_policy(&mut self, policy: Arc<dyn AuthenticationPolicy>) -> Result<()> {
		let intr = Introspectable::new(
			"authentication policy",
			"",
			"authentication policy",
			"authentication policy",
		);
		let register = move |registry: &mut Registry| -> Result<()> {
			registry.set_authentication_policy(policy);
			Ok(())
		};
		self.action(
			Some("authentication policy".into()),
			Some(Box::new(register)),
			PHASE1_CONFIG,
			vec![intr],
		)
	}

	/// Set the authorization policy
	///
	/// Committing an authorization policy without an authentication policy
	/// is a configuration error. Autocommit mode skips that check.
	#[track_caller]
	pub fn set_authorization_policy(&mut self, policy: Arc<dyn AuthorizationPolicy>) -> Result<()> {
		let intr = Introspectable::new(
			"authorization policy",
			"",
			"authorization policy",
			"authorization policy",
		);
		let register = move |registry: &mut Registry| -> Result<()> {
			registry.set_authorization_policy(policy);
			Ok(())
		};
		self.action(
			Some("authorization policy".into()),
			Some(Box::new(register)),
			PHASE1_CONFIG,
			vec![intr],
		)?;
		if self.autocommit {
			return Ok(());
		}

		let ensure = |registry: &mut Registry| -> Result<()> {
			if registry.authentication_policy().is_none() {
				return Err(Error::Configuration(
					"Cannot configure an authorization policy without also configuring an authentication policy".into(),
				));
			}
			Ok(())
		};
		self.action(None, Some(Box::new(ensure)), PHASE2_CONFIG, Vec::new())
	}

	/// Root factory for requests no route supplies one for
	#[track_caller]
	pub fn set_root_factory(&mut self, factory: impl Into<Resolvable<RootFactory>>) -> Result<()> {
		let factory = self.maybe_dotted(factory)?;
		let intr = Introspectable::new("root factories", "", "root factory", "root factory");
		let register = move |registry: &mut Registry| -> Result<()> {
			registry.set_root_factory(Some(factory));
			Ok(())
		};
		self.action(
			Some("root factory".into()),
			Some(Box::new(register)),
			PHASE1_CONFIG,
			vec![intr],
		)
	}

	#[track_caller]
	pub fn set_session_factory(&mut self, factory: SessionFactory) -> Result<()> {
		let intr = Introspectable::new("session factory", "", "session factory", "session factory");
		let register = move |registry: &mut Registry| -> Result<()> {
			registry.set_session_factory(factory);
			Ok(())
		};
		self.action(
			Some("session factory".into()),
			Some(Box::new(register)),
			PHASE1_CONFIG,
			vec![intr],
		)
	}

	#[track_caller]
	pub fn set_locale_negotiator(&mut self, negotiator: LocaleNegotiator) -> Result<()> {
		let intr = Introspectable::new("locale negotiator", "", "locale negotiator", "locale negotiator");
		let register = move |registry: &mut Registry| -> Result<()> {
			registry.set_locale_negotiator(negotiator);
			Ok(())
		};
		self.action(
			Some("locale negotiator".into()),
			Some(Box::new(register)),
			PHASE1_CONFIG,
			vec![intr],
		)
	}

	/// Subscribe to an event; subscriptions never conflict
	#[track_caller]
	pub fn add_subscriber(
		&mut self,
		kind: EventKind,
		subscriber: impl Into<Resolvable<Subscriber>>,
	) -> Result<()> {
		let subscriber = self.maybe_dotted(subscriber)?;
		let intr = Introspectable::new(
			"subscribers",
			format!("{:?} {}", kind, self.pending_actions()),
			format!("{:?} subscriber", kind),
			"subscriber",
		)
		.with_attr("event", format!("{:?}", kind));
		let register = move |registry: &mut Registry| -> Result<()> {
			registry.subscribe(kind, subscriber);
			Ok(())
		};
		self.action(None, Some(Box::new(register)), PHASE3_CONFIG, vec![intr])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use cornice_core::events::Event;
	use cornice_core::http::Request;
	use cornice_core::resource::Context;
	use rstest::rstest;
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct Nobody;

	impl AuthenticationPolicy for Nobody {
		fn effective_principals(&self, _request: &Request) -> Vec<String> {
			Vec::new()
		}
	}

	struct DenyAll;

	impl AuthorizationPolicy for DenyAll {
		fn permits(&self, _context: &Context, _principals: &[String], _permission: &str) -> bool {
			false
		}
	}

	#[rstest]
	fn test_authorization_without_authentication_fails_on_commit() {
		let mut config = Configurator::new();
		config.set_authorization_policy(Arc::new(DenyAll)).unwrap();

		let result = config.commit();

		let Err(Error::ConfigurationExecution { source, .. }) = result else {
			panic!("expected an execution error, got {:?}", result);
		};
		assert!(source.to_string().contains("without also configuring an authentication policy"));
	}

	#[rstest]
	fn test_authorization_set_before_authentication() {
		// Arrange
		let mut config = Configurator::new();
		config.set_authorization_policy(Arc::new(DenyAll)).unwrap();
		config.set_authentication_policy(Arc::new(Nobody)).unwrap();

		// Act
		let result = config.commit();

		// Assert
		assert!(result.is_ok());
		assert!(config.registry().authorization_policy().is_some());
	}

	#[rstest]
	fn test_default_permission_twice_conflicts() {
		let mut config = Configurator::new();
		config.set_default_permission("view").unwrap();
		config.set_default_permission("edit").unwrap();

		assert!(matches!(config.commit(), Err(Error::Conflict(_))));
	}

	#[rstest]
	fn test_subscribers_never_conflict() {
		// Arrange
		let calls = Arc::new(AtomicUsize::new(0));
		let mut config = Configurator::new();
		for _ in 0..2 {
			let calls = calls.clone();
			let subscriber: Subscriber = Arc::new(move |_event: &mut Event<'_>| {
				calls.fetch_add(1, Ordering::SeqCst);
				Ok(())
			});
			config.add_subscriber(EventKind::ApplicationCreated, subscriber).unwrap();
		}

		// Act
		config.make_app().unwrap();

		// Assert
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[rstest]
	fn test_renderers_registered_before_views() {
		// Arrange
		let mut config = Configurator::new();
		config
			.add_view(crate::ViewConfig::named("").renderer("custom"))
			.unwrap();
		config
			.add_renderer("custom", Arc::new(cornice_views::renderers::StringRendererFactory) as Arc<dyn RendererFactory>)
			.unwrap();

		// Act
		let result = config.commit();

		// Assert
		assert!(result.is_ok());
	}
}
