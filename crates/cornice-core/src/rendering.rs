//! Renderer collaborators
//!
//! A renderer turns the value a view returned into a response body. Renderer
//! factories are registered by name (`json`) or file extension (`.txt`); the
//! view deriver asks the factory for a renderer once, at registration.

use crate::exception::Result;
use crate::http::Request;
use crate::resource::Context;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// What a renderer factory is asked to build
#[derive(Debug, Clone)]
pub struct RendererInfo {
	/// Renderer name as given at view registration (`json`, `page.txt`)
	pub name: String,
	/// Package of the configurator that registered the view
	pub package: Option<String>,
	/// Registry name, for renderers that keep per-application state
	pub registry_name: String,
}

impl RendererInfo {
	/// The renderer type: the name itself, or its extension when it has one
	///
	/// # Examples
	///
	/// ```
	/// use cornice_core::rendering::RendererInfo;
	///
	/// let info = RendererInfo { name: "templates/home.txt".into(), package: None, registry_name: String::new() };
	/// assert_eq!(info.renderer_type(), ".txt");
	/// let info = RendererInfo { name: "json".into(), package: None, registry_name: String::new() };
	/// assert_eq!(info.renderer_type(), "json");
	/// ```
	pub fn renderer_type(&self) -> &str {
		let file = self.name.rsplit('/').next().unwrap_or(&self.name);
		match file.rfind('.') {
			Some(idx) => &file[idx..],
			None => &self.name,
		}
	}
}

/// Values available to a renderer beyond the view's return value
pub struct RenderSystem<'a> {
	pub renderer_name: String,
	pub view_name: String,
	pub context: Option<Context>,
	pub request: &'a mut Request,
	/// Extra values subscribers of `BeforeRender` may add or change
	pub values: IndexMap<String, Value>,
}

/// Converts a view's return value into a body
pub trait Renderer: Send + Sync {
	fn render(&self, value: &Value, system: &mut RenderSystem<'_>) -> Result<String>;
}

/// Builds renderers for a name or extension
pub trait RendererFactory: Send + Sync {
	fn create(&self, info: &RendererInfo) -> Result<Arc<dyn Renderer>>;
}
