//! Framework events and their subscribers
//!
//! Subscribers are registered per [`EventKind`] and called synchronously in
//! registration order. A subscriber returning an error stops notification and
//! the error propagates to whoever raised the event (for request events, the
//! router, where an exception view may handle it).

use crate::exception::Result;
use crate::http::{Request, Response};
use crate::registry::Registry;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

/// Discriminant of an [`Event`], used to subscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
	NewRequest,
	ContextFound,
	NewResponse,
	ApplicationCreated,
	BeforeRender,
}

/// An event raised by the framework
pub enum Event<'a> {
	/// A request entered the router, before any route matching
	NewRequest { request: &'a mut Request },
	/// Traversal found the context, before view lookup
	ContextFound { request: &'a mut Request },
	/// A view produced a response
	NewResponse {
		request: &'a mut Request,
		response: &'a mut Response,
	},
	/// `make_app` finished building the application
	ApplicationCreated { registry: &'a Registry },
	/// A renderer is about to render `value`; `system` values may be changed
	BeforeRender {
		system: &'a mut IndexMap<String, Value>,
		value: &'a mut Value,
	},
}

impl Event<'_> {
	pub fn kind(&self) -> EventKind {
		match self {
			Self::NewRequest { .. } => EventKind::NewRequest,
			Self::ContextFound { .. } => EventKind::ContextFound,
			Self::NewResponse { .. } => EventKind::NewResponse,
			Self::ApplicationCreated { .. } => EventKind::ApplicationCreated,
			Self::BeforeRender { .. } => EventKind::BeforeRender,
		}
	}
}

/// Subscriber callable
pub type Subscriber = Arc<dyn Fn(&mut Event<'_>) -> Result<()> + Send + Sync>;

/// Ordered subscriber list, keyed by event kind
#[derive(Default)]
pub struct EventDispatcher {
	subscribers: RwLock<Vec<(EventKind, Subscriber)>>,
}

impl EventDispatcher {
	pub fn new() -> Self {
		Self::default()
	}

	/// Subscribe to `kind`
	pub fn subscribe(&self, kind: EventKind, subscriber: Subscriber) {
		self.subscribers.write().push((kind, subscriber));
	}

	/// Whether any subscriber at all is registered
	pub fn has_listeners(&self) -> bool {
		!self.subscribers.read().is_empty()
	}

	/// Number of subscribers for `kind`
	pub fn count(&self, kind: EventKind) -> usize {
		self.subscribers
			.read()
			.iter()
			.filter(|(k, _)| *k == kind)
			.count()
	}

	/// Call every subscriber of the event's kind
	pub fn notify(&self, event: &mut Event<'_>) -> Result<()> {
		let kind = event.kind();
		// Snapshot so subscribers may subscribe further without deadlocking
		let matching: Vec<Subscriber> = self
			.subscribers
			.read()
			.iter()
			.filter(|(k, _)| *k == kind)
			.map(|(_, s)| s.clone())
			.collect();

		for subscriber in matching {
			subscriber(event)?;
		}
		Ok(())
	}
}
