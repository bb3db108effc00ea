//! Exception view fallback
//!
//! [`ExceptionViewHandler`] is the handler built by the exception view tween
//! ([`excview_tween_factory`]). When the handler below it fails, it looks for
//! an exception view registered for the error's type and lets that view
//! produce the response. The configurator places the tween directly over
//! `MAIN` under the alias [`EXCVIEW`](cornice_core::tweens::EXCVIEW).

use cornice_core::exception::{Error, ExceptionResource, Result};
use cornice_core::http::{Request, Response};
use cornice_core::interfaces::{IExceptionViewClassifier, Interface};
use cornice_core::registry::Registry;
use cornice_core::resource::Context;
use cornice_core::tweens::{Handler, TweenFactory};
use std::sync::Arc;

/// Converts errors of the wrapped handler into exception view responses
///
/// Views are looked up in the registry the request is being dispatched
/// against.
pub struct ExceptionViewHandler {
	next: Arc<dyn Handler>,
}

impl ExceptionViewHandler {
	pub fn new(next: Arc<dyn Handler>) -> Self {
		Self { next }
	}
}

impl Handler for ExceptionViewHandler {
	fn handle(&self, request: &mut Request) -> Result<Response> {
		let error = match self.next.handle(request) {
			Ok(response) => return Ok(response),
			Err(error) => error,
		};
		let Some(registry) = request.registry.clone() else {
			return Err(error);
		};
		// A response a view started before failing must not leak its headers
		request.take_response();
		request.exception = Some(error.clone());

		match handle_exception(&registry, error.clone(), request)? {
			Some(response) => Ok(response),
			None => Err(error),
		}
	}
}

/// Tween factory wrapping the handler below it in an [`ExceptionViewHandler`]
pub fn excview_tween_factory() -> TweenFactory {
	Arc::new(|next: Arc<dyn Handler>, _registry: &Registry| {
		Arc::new(ExceptionViewHandler::new(next)) as Arc<dyn Handler>
	})
}

/// Call the exception view registered for `error`, if there is one
///
/// Returns `Ok(None)` when no exception view matches, so the caller can
/// re-raise the original error.
pub fn handle_exception(
	registry: &Registry,
	error: Error,
	request: &mut Request,
) -> Result<Option<Response>> {
	let provided = error.provided();
	let view = registry.lookup_view(
		&Interface::of::<IExceptionViewClassifier>(),
		&request.request_type.combined(),
		&provided,
		"",
	);
	let Some(view) = view else {
		tracing::debug!(target: "cornice::router", error = %error, "no exception view registered");
		return Ok(None);
	};

	tracing::debug!(
		target: "cornice::router",
		error = %error,
		view = %view.describe(),
		"calling exception view"
	);
	let context: Context = Arc::new(ExceptionResource::new(error));
	match view.call(&context, request) {
		Ok(response) => Ok(Some(response)),
		// The exception view declined; the original error stands
		Err(Error::PredicateMismatch(_)) => Ok(None),
		Err(other) => Err(other),
	}
}
