//! The component registry
//!
//! One [`Registry`] holds everything configuration produced: registered views,
//! the routes mapper, the tween graph, renderer factories, policies, settings,
//! subscribers and introspection data. It is built by the configurator and then
//! shared read-only (behind an `Arc`) by the router and every request.

use crate::events::{Event, EventDispatcher, EventKind, Subscriber};
use crate::exception::Result;
use crate::interfaces::Interface;
use crate::introspection::Introspector;
use crate::rendering::RendererFactory;
use crate::security::{AuthenticationPolicy, AuthorizationPolicy};
use crate::session::{LocaleNegotiator, SessionFactory};
use crate::traversal::{ResourceTreeTraverser, RootFactory, Traverser};
use crate::tweens::Tweens;
use crate::urldispatch::{RoutesMapper, UrlDispatcher};
use crate::view::{View, ViewKey};
use cornice_conf::Settings;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Event delivery capability the router relies on
///
/// A registry implementation must provide both operations; the router skips
/// building events entirely when `has_listeners` is false.
pub trait Notifier {
	fn has_listeners(&self) -> bool;

	fn notify(&self, event: &mut Event<'_>) -> Result<()>;
}

/// Registry of an application
pub struct Registry {
	name: String,
	settings: Settings,
	views: HashMap<ViewKey, Arc<dyn View>>,
	routes_mapper: Option<Box<dyn RoutesMapper>>,
	tweens: Tweens,
	renderers: IndexMap<String, Arc<dyn RendererFactory>>,
	authentication_policy: Option<Arc<dyn AuthenticationPolicy>>,
	authorization_policy: Option<Arc<dyn AuthorizationPolicy>>,
	default_permission: Option<String>,
	root_factory: Option<RootFactory>,
	traverser: Arc<dyn Traverser>,
	session_factory: Option<SessionFactory>,
	locale_negotiator: Option<LocaleNegotiator>,
	events: EventDispatcher,
	introspector: Introspector,
}

impl Registry {
	/// Create an empty registry
	///
	/// # Examples
	///
	/// ```
	/// use cornice_core::registry::Registry;
	///
	/// let registry = Registry::new("myapp");
	/// assert_eq!(registry.name(), "myapp");
	/// assert!(registry.routes_mapper().is_none());
	/// ```
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			settings: Settings::default(),
			views: HashMap::new(),
			routes_mapper: None,
			tweens: Tweens::new(),
			renderers: IndexMap::new(),
			authentication_policy: None,
			authorization_policy: None,
			default_permission: None,
			root_factory: None,
			traverser: Arc::new(ResourceTreeTraverser),
			session_factory: None,
			locale_negotiator: None,
			events: EventDispatcher::new(),
			introspector: Introspector::new(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	pub fn settings_mut(&mut self) -> &mut Settings {
		&mut self.settings
	}

	pub fn set_settings(&mut self, settings: Settings) {
		self.settings = settings;
	}

	/// Register a view in a slot, returning the view it replaced
	pub fn register_view(&mut self, key: ViewKey, view: Arc<dyn View>) -> Option<Arc<dyn View>> {
		self.views.insert(key, view)
	}

	pub fn unregister_view(&mut self, key: &ViewKey) -> Option<Arc<dyn View>> {
		self.views.remove(key)
	}

	/// The view registered in exactly this slot
	pub fn registered_view(&self, key: &ViewKey) -> Option<Arc<dyn View>> {
		self.views.get(key).cloned()
	}

	/// Number of occupied view slots
	pub fn view_count(&self) -> usize {
		self.views.len()
	}

	/// Every view matching a lookup, most specific first
	///
	/// Request interfaces are the outer loop and context interfaces the inner
	/// one, so a view registered for the request's route beats one registered
	/// for the generic request type regardless of context specificity.
	pub fn find_views(
		&self,
		classifier: &Interface,
		request_ifaces: &[Interface],
		context_ifaces: &[Interface],
		name: &str,
	) -> Vec<Arc<dyn View>> {
		let mut found = Vec::new();
		for request_iface in request_ifaces {
			for context_iface in context_ifaces {
				let key = ViewKey::new(
					classifier.clone(),
					request_iface.clone(),
					context_iface.clone(),
					name,
				);
				if let Some(view) = self.views.get(&key) {
					found.push(view.clone());
				}
			}
		}
		found
	}

	/// The most specific view matching a lookup
	pub fn lookup_view(
		&self,
		classifier: &Interface,
		request_ifaces: &[Interface],
		context_ifaces: &[Interface],
		name: &str,
	) -> Option<Arc<dyn View>> {
		for request_iface in request_ifaces {
			for context_iface in context_ifaces {
				let key = ViewKey::new(
					classifier.clone(),
					request_iface.clone(),
					context_iface.clone(),
					name,
				);
				if let Some(view) = self.views.get(&key) {
					return Some(view.clone());
				}
			}
		}
		None
	}

	pub fn routes_mapper(&self) -> Option<&dyn RoutesMapper> {
		self.routes_mapper.as_deref()
	}

	/// The routes mapper, creating the default one on first use
	pub fn routes_mapper_mut(&mut self) -> &mut dyn RoutesMapper {
		self.routes_mapper
			.get_or_insert_with(|| Box::new(UrlDispatcher::new()))
			.as_mut()
	}

	pub fn set_routes_mapper(&mut self, mapper: Box<dyn RoutesMapper>) {
		self.routes_mapper = Some(mapper);
	}

	pub fn tweens(&self) -> &Tweens {
		&self.tweens
	}

	pub fn tweens_mut(&mut self) -> &mut Tweens {
		&mut self.tweens
	}

	/// Register a renderer factory under a name or a `.ext` extension
	pub fn register_renderer(&mut self, name: impl Into<String>, factory: Arc<dyn RendererFactory>) {
		self.renderers.insert(name.into(), factory);
	}

	pub fn renderer_factory(&self, name: &str) -> Option<Arc<dyn RendererFactory>> {
		self.renderers.get(name).cloned()
	}

	/// Registered renderer names, in registration order
	pub fn renderer_names(&self) -> Vec<&str> {
		self.renderers.keys().map(String::as_str).collect()
	}

	pub fn authentication_policy(&self) -> Option<&Arc<dyn AuthenticationPolicy>> {
		self.authentication_policy.as_ref()
	}

	pub fn set_authentication_policy(&mut self, policy: Arc<dyn AuthenticationPolicy>) {
		self.authentication_policy = Some(policy);
	}

	pub fn authorization_policy(&self) -> Option<&Arc<dyn AuthorizationPolicy>> {
		self.authorization_policy.as_ref()
	}

	pub fn set_authorization_policy(&mut self, policy: Arc<dyn AuthorizationPolicy>) {
		self.authorization_policy = Some(policy);
	}

	/// Permission applied to views registered without one
	pub fn default_permission(&self) -> Option<&str> {
		self.default_permission.as_deref()
	}

	pub fn set_default_permission(&mut self, permission: Option<String>) {
		self.default_permission = permission;
	}

	pub fn root_factory(&self) -> Option<&RootFactory> {
		self.root_factory.as_ref()
	}

	pub fn set_root_factory(&mut self, factory: Option<RootFactory>) {
		self.root_factory = factory;
	}

	pub fn traverser(&self) -> &Arc<dyn Traverser> {
		&self.traverser
	}

	pub fn set_traverser(&mut self, traverser: Arc<dyn Traverser>) {
		self.traverser = traverser;
	}

	pub fn session_factory(&self) -> Option<&SessionFactory> {
		self.session_factory.as_ref()
	}

	pub fn set_session_factory(&mut self, factory: SessionFactory) {
		self.session_factory = Some(factory);
	}

	pub fn locale_negotiator(&self) -> Option<&LocaleNegotiator> {
		self.locale_negotiator.as_ref()
	}

	pub fn set_locale_negotiator(&mut self, negotiator: LocaleNegotiator) {
		self.locale_negotiator = Some(negotiator);
	}

	pub fn events(&self) -> &EventDispatcher {
		&self.events
	}

	/// Subscribe to an event kind
	pub fn subscribe(&self, kind: EventKind, subscriber: Subscriber) {
		self.events.subscribe(kind, subscriber);
	}

	pub fn introspector(&self) -> &Introspector {
		&self.introspector
	}

	pub fn introspector_mut(&mut self) -> &mut Introspector {
		&mut self.introspector
	}
}

impl Notifier for Registry {
	fn has_listeners(&self) -> bool {
		self.events.has_listeners()
	}

	fn notify(&self, event: &mut Event<'_>) -> Result<()> {
		self.events.notify(event)
	}
}

impl fmt::Debug for Registry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Registry")
			.field("name", &self.name)
			.field("views", &self.views.len())
			.field("renderers", &self.renderer_names())
			.field("default_permission", &self.default_permission)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::http::{Request, Response};
	use crate::interfaces::{IRequest, IViewClassifier, RequestType};
	use crate::resource::Context;
	use rstest::rstest;

	struct Fixed(&'static str);

	impl View for Fixed {
		fn call(&self, _context: &Context, _request: &mut Request) -> Result<Response> {
			Ok(Response::text_plain(self.0))
		}
	}

	struct Page;

	fn key(request_iface: Interface, context_iface: Interface) -> ViewKey {
		ViewKey::new(
			Interface::of::<IViewClassifier>(),
			request_iface,
			context_iface,
			"",
		)
	}

	#[rstest]
	fn test_lookup_prefers_request_type_over_context() {
		// Arrange
		let mut registry = Registry::new("test");
		let route = RequestType::route("home", true);
		registry.register_view(
			key(Interface::of::<IRequest>(), Interface::of::<Page>()),
			Arc::new(Fixed("generic")),
		);
		registry.register_view(
			key(route.iface().clone(), Interface::any()),
			Arc::new(Fixed("route")),
		);

		// Act
		let views = registry.find_views(
			&Interface::of::<IViewClassifier>(),
			&route.resolution_order(),
			&[Interface::of::<Page>(), Interface::any()],
			"",
		);

		// Assert
		assert_eq!(views.len(), 2);
		let first = views[0].downcast_ref::<Fixed>().unwrap();
		assert_eq!(first.0, "route");
	}

	#[rstest]
	fn test_lookup_misses_other_name() {
		let mut registry = Registry::new("test");
		registry.register_view(
			key(Interface::of::<IRequest>(), Interface::any()),
			Arc::new(Fixed("a")),
		);
		let found = registry.lookup_view(
			&Interface::of::<IViewClassifier>(),
			&RequestType::generic().resolution_order(),
			&[Interface::any()],
			"edit",
		);
		assert!(found.is_none());
	}

	#[rstest]
	fn test_register_replaces_slot() {
		let mut registry = Registry::new("test");
		let slot = key(Interface::of::<IRequest>(), Interface::any());
		assert!(registry.register_view(slot.clone(), Arc::new(Fixed("a"))).is_none());
		let old = registry.register_view(slot.clone(), Arc::new(Fixed("b")));
		assert!(old.is_some());
		assert_eq!(registry.view_count(), 1);
	}

	#[rstest]
	fn test_routes_mapper_created_lazily() {
		let mut registry = Registry::new("test");
		assert!(registry.routes_mapper().is_none());
		registry.routes_mapper_mut();
		assert!(registry.routes_mapper().is_some());
		assert!(!registry.routes_mapper().unwrap().has_routes());
	}
}
