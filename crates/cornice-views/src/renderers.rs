//! Built-in renderers and the helper binding a renderer to a view
//!
//! Two renderer factories are registered by default: `json` serializes the
//! view's value, `string` writes its text form.

use cornice_core::events::Event;
use cornice_core::exception::{Error, Result};
use cornice_core::http::{Request, Response};
use cornice_core::registry::{Notifier, Registry};
use cornice_core::rendering::{RenderSystem, Renderer, RendererFactory, RendererInfo};
use cornice_core::resource::Context;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Content type given to rendered responses that set none
pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

/// Renders values as JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
	fn render(&self, value: &Value, system: &mut RenderSystem<'_>) -> Result<String> {
		let response = system.request.response_mut();
		if response.content_type().is_none() {
			response.set_content_type("application/json");
		}
		serde_json::to_string(value)
			.map_err(|e| Error::InvalidViewResponse(format!("value is not JSON serializable: {}", e)))
	}
}

/// Factory for [`JsonRenderer`]
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRendererFactory;

impl RendererFactory for JsonRendererFactory {
	fn create(&self, _info: &RendererInfo) -> Result<Arc<dyn Renderer>> {
		Ok(Arc::new(JsonRenderer))
	}
}

/// Renders values as plain text; strings are written without quotes
#[derive(Debug, Default, Clone, Copy)]
pub struct StringRenderer;

impl Renderer for StringRenderer {
	fn render(&self, value: &Value, system: &mut RenderSystem<'_>) -> Result<String> {
		let response = system.request.response_mut();
		if response.content_type().is_none() {
			response.set_content_type("text/plain; charset=UTF-8");
		}
		Ok(match value {
			Value::String(s) => s.clone(),
			other => other.to_string(),
		})
	}
}

/// Factory for [`StringRenderer`]
#[derive(Debug, Default, Clone, Copy)]
pub struct StringRendererFactory;

impl RendererFactory for StringRendererFactory {
	fn create(&self, _info: &RendererInfo) -> Result<Arc<dyn Renderer>> {
		Ok(Arc::new(StringRenderer))
	}
}

/// Register the built-in renderers
pub fn register_default_renderers(registry: &mut Registry) {
	registry.register_renderer("json", Arc::new(JsonRendererFactory));
	registry.register_renderer("string", Arc::new(StringRendererFactory));
}

/// A renderer resolved for a view registration
#[derive(Clone)]
pub struct RendererHelper {
	name: String,
	renderer: Arc<dyn Renderer>,
}

impl RendererHelper {
	/// Resolve `name` against the registered factories
	///
	/// A name with an extension (`page.txt`) is looked up by extension.
	pub fn resolve(registry: &Registry, name: &str, package: Option<&str>) -> Result<Self> {
		let info = RendererInfo {
			name: name.to_string(),
			package: package.map(str::to_string),
			registry_name: registry.name().to_string(),
		};
		let factory = registry
			.renderer_factory(info.renderer_type())
			.ok_or_else(|| {
				Error::Configuration(format!("No such renderer factory {}", info.renderer_type()))
			})?;
		Ok(Self {
			name: name.to_string(),
			renderer: factory.create(&info)?,
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Render `value` into the request's response
	///
	/// Subscribers of `BeforeRender` see the system values and the value
	/// first and may change both.
	pub fn render_view(
		&self,
		value: Value,
		view_name: &str,
		context: &Context,
		request: &mut Request,
	) -> Result<Response> {
		let mut value = value;
		let mut values = IndexMap::new();
		values.insert("renderer_name".to_string(), Value::from(self.name.as_str()));
		values.insert("view_name".to_string(), Value::from(view_name));
		values.insert("req_path".to_string(), Value::from(request.uri.path()));

		if let Some(registry) = request.registry.clone() {
			if registry.has_listeners() {
				registry.notify(&mut Event::BeforeRender {
					system: &mut values,
					value: &mut value,
				})?;
			}
		}

		let mut system = RenderSystem {
			renderer_name: self.name.clone(),
			view_name: view_name.to_string(),
			context: Some(context.clone()),
			request: &mut *request,
			values,
		};
		let body = self.renderer.render(&value, &mut system)?;

		let mut response = request.take_response().unwrap_or_default();
		if response.content_type().is_none() {
			response.set_content_type(DEFAULT_CONTENT_TYPE);
		}
		response.set_body(body);
		Ok(response)
	}
}
