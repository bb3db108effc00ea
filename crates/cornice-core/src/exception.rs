//! Error taxonomy shared by every cornice crate
//!
//! Configuration-time failures ([`Error::Configuration`], [`Error::Conflict`],
//! [`Error::CyclicDependency`]) are raised while an application is being
//! configured. Dispatch-time failures ([`Error::NotFound`], [`Error::Forbidden`],
//! [`Error::Application`]) travel out of views and may be converted into a
//! response by an exception view registered for their interface.

use crate::http::Response;
use crate::interfaces::{
	IConfigurationError, IException, IForbidden, IHttpException, INotFound, IPredicateMismatch,
	Interface,
};
use crate::resource::Resource;
use bytes::Bytes;
use http::StatusCode;
use indexmap::IndexMap;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Result type alias used throughout cornice
pub type Result<T> = std::result::Result<T, Error>;

/// Source location of a configuration call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct SourceInfo {
	pub file: &'static str,
	pub line: u32,
	pub column: u32,
}

impl SourceInfo {
	/// Location of the caller of the current `#[track_caller]` chain
	#[track_caller]
	pub fn caller() -> Self {
		Location::caller().into()
	}
}

impl From<&'static Location<'static>> for SourceInfo {
	fn from(location: &'static Location<'static>) -> Self {
		Self {
			file: location.file(),
			line: location.line(),
			column: location.column(),
		}
	}
}

impl fmt::Display for SourceInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}:{}", self.file, self.line, self.column)
	}
}

/// Two or more non-overriding configuration actions share a discriminator
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConflictError {
	/// Discriminator (rendered) to every conflicting call site, winner first
	pub conflicts: IndexMap<String, Vec<SourceInfo>>,
}

impl fmt::Display for ConflictError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Conflicting configuration actions")?;
		for (discriminator, infos) in &self.conflicts {
			write!(f, "\n  For: {}", discriminator)?;
			for info in infos {
				write!(f, "\n    {}", info)?;
			}
		}
		Ok(())
	}
}

impl std::error::Error for ConflictError {}

/// The implicit tween ordering contains a cycle
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CyclicDependencyError {
	/// Each node left in the graph mapped to its unresolved successors
	pub cycles: IndexMap<String, Vec<String>>,
}

impl fmt::Display for CyclicDependencyError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let parts: Vec<String> = self
			.cycles
			.iter()
			.map(|(node, successors)| format!("{:?} sorts before {:?}", node, successors))
			.collect();
		write!(f, "Implicit ordering cycle: {}", parts.join("; "))
	}
}

impl std::error::Error for CyclicDependencyError {}

/// An arbitrary application error together with the interface it provides
///
/// Exception views registered for `Interface::of::<E>()` catch errors created
/// with [`Error::application`] from an `E`.
#[derive(Clone)]
pub struct ApplicationError {
	interface: Interface,
	inner: Arc<dyn std::error::Error + Send + Sync>,
}

impl ApplicationError {
	/// Interface of the wrapped error's type
	pub fn interface(&self) -> &Interface {
		&self.interface
	}

	/// The wrapped error
	pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
		self.inner.as_ref()
	}
}

impl fmt::Debug for ApplicationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ApplicationError")
			.field("interface", &self.interface)
			.field("inner", &self.inner)
			.finish()
	}
}

impl fmt::Display for ApplicationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.inner, f)
	}
}

impl std::error::Error for ApplicationError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		self.inner.source()
	}
}

/// Errors raised while configuring or dispatching
#[non_exhaustive]
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
	/// Invalid configuration detected at registration time
	#[error("Configuration error: {0}")]
	Configuration(String),

	/// Conflicting configuration actions detected at commit time
	#[error(transparent)]
	Conflict(#[from] ConflictError),

	/// The implicit tween ordering contains a cycle
	#[error(transparent)]
	CyclicDependency(#[from] CyclicDependencyError),

	/// A configuration action failed while being executed
	#[error("Error executing configuration action at {info}: {source}")]
	ConfigurationExecution {
		/// Where the failing action was declared
		info: SourceInfo,
		/// What the action raised
		source: Box<Error>,
	},

	/// No resource or view could be found for the request
	#[error("Not found: {0}")]
	NotFound(String),

	/// A view's predicates rejected the request
	#[error("Predicate mismatch: {0}")]
	PredicateMismatch(String),

	/// The security policy denied access
	#[error("Forbidden: {message}")]
	Forbidden {
		/// Explanation, detailed when `debug_authorization` is on
		message: String,
	},

	/// A view returned something that could not be turned into a response
	#[error("Invalid view response: {0}")]
	InvalidViewResponse(String),

	/// Error raised by application code
	#[error(transparent)]
	Application(ApplicationError),

	/// Internal error
	#[error("Internal error: {0}")]
	Internal(String),
}

impl Error {
	/// Wrap an application error, capturing its type as an interface
	///
	/// # Examples
	///
	/// ```
	/// use cornice_core::exception::Error;
	/// use cornice_core::interfaces::Interface;
	///
	/// #[derive(Debug)]
	/// struct RuntimeError;
	/// impl std::fmt::Display for RuntimeError {
	///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
	///         f.write_str("boom")
	///     }
	/// }
	/// impl std::error::Error for RuntimeError {}
	///
	/// let err = Error::application(RuntimeError);
	/// assert_eq!(err.provided()[0], Interface::of::<RuntimeError>());
	/// assert!(err.downcast_ref::<RuntimeError>().is_some());
	/// ```
	pub fn application<E>(error: E) -> Self
	where
		E: std::error::Error + Send + Sync + 'static,
	{
		Self::Application(ApplicationError {
			interface: Interface::of::<E>(),
			inner: Arc::new(error),
		})
	}

	/// Forbidden error with a message
	pub fn forbidden(message: impl Into<String>) -> Self {
		Self::Forbidden {
			message: message.into(),
		}
	}

	/// Downcast a wrapped application error to its concrete type
	pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
		match self {
			Self::Application(app) => {
				let inner: &(dyn std::error::Error + 'static) = app.inner.as_ref();
				inner.downcast_ref::<E>()
			}
			_ => None,
		}
	}

	/// Interfaces this error provides, most specific first
	///
	/// Exception views are looked up against this list in order.
	pub fn provided(&self) -> Vec<Interface> {
		let mut provided = match self {
			Self::PredicateMismatch(_) => vec![
				Interface::of::<IPredicateMismatch>(),
				Interface::of::<INotFound>(),
				Interface::of::<IHttpException>(),
			],
			Self::NotFound(_) => vec![
				Interface::of::<INotFound>(),
				Interface::of::<IHttpException>(),
			],
			Self::Forbidden { .. } => vec![
				Interface::of::<IForbidden>(),
				Interface::of::<IHttpException>(),
			],
			Self::Configuration(_)
			| Self::Conflict(_)
			| Self::CyclicDependency(_)
			| Self::ConfigurationExecution { .. } => vec![Interface::of::<IConfigurationError>()],
			Self::Application(app) => vec![app.interface.clone()],
			Self::InvalidViewResponse(_) | Self::Internal(_) => Vec::new(),
		};
		provided.push(Interface::of::<IException>());
		provided.push(Interface::any());
		provided
	}

	/// Whether this is a not-found kind (including predicate mismatch)
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound(_) | Self::PredicateMismatch(_))
	}

	/// HTTP status the transport should use when no exception view handled this error
	pub fn status_code(&self) -> StatusCode {
		match self {
			Self::NotFound(_) | Self::PredicateMismatch(_) => StatusCode::NOT_FOUND,
			Self::Forbidden { .. } => StatusCode::FORBIDDEN,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Generic plain-text error response for the transport layer
	pub fn to_response(&self) -> Response {
		let status = self.status_code();
		let body = match status.canonical_reason() {
			Some(reason) => format!("{} {}\n\n{}", status.as_u16(), reason, self),
			None => self.to_string(),
		};
		Response::new(status)
			.with_content_type("text/plain; charset=UTF-8")
			.with_body(Bytes::from(body))
	}
}

impl From<cornice_conf::SettingsError> for Error {
	fn from(err: cornice_conf::SettingsError) -> Self {
		Self::Configuration(err.to_string())
	}
}

impl From<regex::Error> for Error {
	fn from(err: regex::Error) -> Self {
		Self::Configuration(err.to_string())
	}
}

/// The context handed to exception views: the error being handled
#[derive(Clone, Debug)]
pub struct ExceptionResource {
	error: Error,
}

impl ExceptionResource {
	pub fn new(error: Error) -> Self {
		Self { error }
	}

	/// The error being handled
	pub fn error(&self) -> &Error {
		&self.error
	}
}

impl Resource for ExceptionResource {
	fn provided(&self) -> Vec<Interface> {
		self.error.provided()
	}
}
