//! View callable shapes and the mapper normalizing them
//!
//! Application views come in a small closed set of shapes ([`ViewCallable`]).
//! The shape is picked at registration, either directly by the author or from
//! a [`Signature`] describing a dynamically provided callable. A [`ViewMapper`]
//! turns any shape into the canonical `(context, request)` form.

use cornice_core::exception::{Error, Result};
use cornice_core::http::{Request, Response};
use cornice_core::resource::Context;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// What a view callable returns
#[derive(Debug, Clone)]
pub enum ViewOutput {
	/// A finished response, used as is
	Response(Response),
	/// A value for the view's renderer
	Value(Value),
}

impl From<Response> for ViewOutput {
	fn from(response: Response) -> Self {
		Self::Response(response)
	}
}

impl From<Value> for ViewOutput {
	fn from(value: Value) -> Self {
		Self::Value(value)
	}
}

/// A view in canonical form, before rendering
pub type MappedView = Arc<dyn Fn(&Context, &mut Request) -> Result<ViewOutput> + Send + Sync>;

type ContextFn = Arc<dyn Fn(&Context, &mut Request) -> Result<ViewOutput> + Send + Sync>;
type RequestFn = Arc<dyn Fn(&mut Request) -> Result<ViewOutput> + Send + Sync>;
type ConstructFn =
	Arc<dyn Fn(&Context, &mut Request, Option<&str>) -> Result<ViewOutput> + Send + Sync>;

/// An object whose methods handle requests
///
/// `attr` names the method selected at registration; `None` is the object's
/// default entry point.
pub trait ViewInstance: Send + Sync + 'static {
	fn invoke(&self, attr: Option<&str>, request: &mut Request) -> Result<ViewOutput>;
}

/// The shapes a view callable may take
#[derive(Clone)]
pub enum ViewCallable {
	/// Called with the context and the request
	Function(ContextFn),
	/// Called with the request only
	RequestOnly(RequestFn),
	/// A method of an existing object, selected by `attr`
	BoundMethod(Arc<dyn ViewInstance>),
	/// A type built per request, then called through `attr`
	Constructor { requestonly: bool, build: ConstructFn },
}

impl ViewCallable {
	/// A `(context, request)` function
	pub fn function<F, O>(f: F) -> Self
	where
		F: Fn(&Context, &mut Request) -> Result<O> + Send + Sync + 'static,
		O: Into<ViewOutput>,
	{
		Self::Function(Arc::new(move |context: &Context, request: &mut Request| {
			f(context, request).map(Into::into)
		}))
	}

	/// A `(request)` function
	pub fn request_only<F, O>(f: F) -> Self
	where
		F: Fn(&mut Request) -> Result<O> + Send + Sync + 'static,
		O: Into<ViewOutput>,
	{
		Self::RequestOnly(Arc::new(move |request: &mut Request| f(request).map(Into::into)))
	}

	/// Methods of an existing object
	pub fn method<T: ViewInstance>(target: Arc<T>) -> Self {
		Self::BoundMethod(target)
	}

	/// A type constructed from the request
	///
	/// The instance is attached to the request as `view_instance` before it is
	/// called.
	pub fn class<T, F>(construct: F) -> Self
	where
		T: ViewInstance,
		F: Fn(&Request) -> Result<T> + Send + Sync + 'static,
	{
		Self::Constructor {
			requestonly: true,
			build: Arc::new(move |_context: &Context, request: &mut Request, attr: Option<&str>| {
				let instance = Arc::new(construct(request)?);
				request.view_instance = Some(instance.clone());
				instance.invoke(attr, request)
			}),
		}
	}

	/// A type constructed from the context and the request
	pub fn class_with_context<T, F>(construct: F) -> Self
	where
		T: ViewInstance,
		F: Fn(&Context, &Request) -> Result<T> + Send + Sync + 'static,
	{
		Self::Constructor {
			requestonly: false,
			build: Arc::new(move |context: &Context, request: &mut Request, attr: Option<&str>| {
				let instance = Arc::new(construct(context, request)?);
				request.view_instance = Some(instance.clone());
				instance.invoke(attr, request)
			}),
		}
	}

	/// A callable described by a [`Signature`]
	///
	/// The signature decides once, here, whether the callable receives the
	/// context.
	///
	/// # Examples
	///
	/// ```
	/// use cornice_views::mapper::{Signature, ViewCallable};
	///
	/// let view = ViewCallable::described(&Signature::parse("request"), |_context, _request| {
	///     Ok(serde_json::json!("hi"))
	/// });
	/// assert!(matches!(view, ViewCallable::RequestOnly(_)));
	/// ```
	pub fn described<F, O>(signature: &Signature, f: F) -> Self
	where
		F: Fn(Option<&Context>, &mut Request) -> Result<O> + Send + Sync + 'static,
		O: Into<ViewOutput>,
	{
		if signature.is_requestonly() {
			Self::request_only(move |request: &mut Request| f(None, request))
		} else {
			Self::function(move |context: &Context, request: &mut Request| f(Some(context), request))
		}
	}

	/// Whether the callable is invoked without the context
	pub fn is_requestonly(&self) -> bool {
		match self {
			Self::Function(_) | Self::BoundMethod(_) => false,
			Self::RequestOnly(_) => true,
			Self::Constructor { requestonly, .. } => *requestonly,
		}
	}
}

impl fmt::Debug for ViewCallable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let shape = match self {
			Self::Function(_) => "function",
			Self::RequestOnly(_) => "request-only function",
			Self::BoundMethod(_) => "bound method",
			Self::Constructor { .. } => "constructor",
		};
		write!(f, "<ViewCallable {}>", shape)
	}
}

/// One parameter of a [`Signature`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
	pub name: String,
	pub has_default: bool,
}

/// Parameter list of a dynamically described callable, receiver excluded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
	params: Vec<Param>,
}

impl Signature {
	pub fn new(params: Vec<Param>) -> Self {
		Self { params }
	}

	/// Parse a comma separated list such as `"request, page=1"`
	pub fn parse(signature: &str) -> Self {
		let params = signature
			.split(',')
			.map(str::trim)
			.filter(|p| !p.is_empty())
			.map(|p| match p.split_once('=') {
				Some((name, _)) => Param {
					name: name.trim().to_string(),
					has_default: true,
				},
				None => Param {
					name: p.to_string(),
					has_default: false,
				},
			})
			.collect();
		Self { params }
	}

	pub fn params(&self) -> &[Param] {
		&self.params
	}

	/// Whether the callable takes the request alone
	///
	/// True when there is exactly one parameter, or when the first parameter
	/// is named `request` and every other one has a default.
	///
	/// # Examples
	///
	/// ```
	/// use cornice_views::mapper::Signature;
	///
	/// assert!(Signature::parse("req").is_requestonly());
	/// assert!(Signature::parse("request, extra=None").is_requestonly());
	/// assert!(!Signature::parse("context, request").is_requestonly());
	/// assert!(!Signature::parse("").is_requestonly());
	/// ```
	pub fn is_requestonly(&self) -> bool {
		let Some(first) = self.params.first() else {
			return false;
		};
		if self.params.len() == 1 {
			return true;
		}
		first.name == "request" && self.params[1..].iter().all(|p| p.has_default)
	}
}

/// Turns a view callable into its canonical form
pub trait ViewMapper: Send + Sync {
	fn map(&self, view: &ViewCallable, attr: Option<&str>) -> Result<MappedView>;
}

/// The mapper used when a registration names none
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultViewMapper;

impl ViewMapper for DefaultViewMapper {
	fn map(&self, view: &ViewCallable, attr: Option<&str>) -> Result<MappedView> {
		let mapped: MappedView = match view.clone() {
			ViewCallable::Function(f) => {
				reject_attr(attr, "function")?;
				f
			}
			ViewCallable::RequestOnly(f) => {
				reject_attr(attr, "request-only function")?;
				Arc::new(move |_context: &Context, request: &mut Request| f(request))
			}
			ViewCallable::BoundMethod(target) => {
				let attr = attr.map(str::to_string);
				Arc::new(move |_context: &Context, request: &mut Request| {
					target.invoke(attr.as_deref(), request)
				})
			}
			ViewCallable::Constructor { build, .. } => {
				let attr = attr.map(str::to_string);
				Arc::new(move |context: &Context, request: &mut Request| {
					build(context, request, attr.as_deref())
				})
			}
		};
		Ok(mapped)
	}
}

fn reject_attr(attr: Option<&str>, shape: &str) -> Result<()> {
	match attr {
		Some(attr) => Err(Error::Configuration(format!(
			"attr {:?} cannot be used with a {} view",
			attr, shape
		))),
		None => Ok(()),
	}
}
