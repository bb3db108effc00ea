//! URL dispatch: route patterns, routes and the routes mapper
//!
//! # Pattern syntax
//!
//! - `{name}` matches one path segment (anything but `/`)
//! - `{name:regex}` matches `regex`
//! - a trailing `*name` matches the rest of the path, captured as a list of
//!   segments
//!
//! Patterns without a leading `/` get one.

use crate::exception::{Error, Result};
use crate::http::Request;
use crate::interfaces::RequestType;
use crate::predicates::Predicate;
use crate::traversal::RootFactory;
use indexmap::IndexMap;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Characters left unescaped in a generated path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'-')
	.remove(b'.')
	.remove(b'_')
	.remove(b'~')
	.remove(b'!')
	.remove(b'$')
	.remove(b'&')
	.remove(b'\'')
	.remove(b'(')
	.remove(b')')
	.remove(b'*')
	.remove(b'+')
	.remove(b',')
	.remove(b';')
	.remove(b'=')
	.remove(b':')
	.remove(b'@');

/// Same as [`PATH_SEGMENT`] but keeping `/`
const PATH: &AsciiSet = &PATH_SEGMENT.remove(b'/');

static REPLACEMENT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"\{[_a-zA-Z][^{}]*(?:\{[^{}]*\}[^{}]*)*\}")
		.expect("REPLACEMENT_MARKER: invalid regex pattern")
});

static STAR_AT_END: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\*\w*$").expect("STAR_AT_END: invalid regex pattern"));

/// Quote one path segment for inclusion in a URL
pub fn quote_path_segment(segment: &str) -> String {
	utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Split a path into segments, dropping empty and `.` segments and resolving `..`
///
/// # Examples
///
/// ```
/// use cornice_core::urldispatch::split_path_info;
///
/// assert_eq!(split_path_info("/a//b/./c/../d/"), vec!["a", "b", "d"]);
/// assert!(split_path_info("/").is_empty());
/// ```
pub fn split_path_info(path: &str) -> Vec<String> {
	let mut clean: Vec<String> = Vec::new();
	for segment in path.trim_matches('/').split('/') {
		match segment {
			"" | "." => {}
			".." => {
				clean.pop();
			}
			other => clean.push(other.to_string()),
		}
	}
	clean
}

/// A value captured by a route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchValue {
	/// A `{name}` replacement marker
	Str(String),
	/// A `*name` remainder
	Segments(Vec<String>),
}

impl MatchValue {
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Str(s) => Some(s),
			Self::Segments(_) => None,
		}
	}

	pub fn segments(&self) -> Option<&[String]> {
		match self {
			Self::Segments(s) => Some(s),
			Self::Str(_) => None,
		}
	}
}

impl From<&str> for MatchValue {
	fn from(value: &str) -> Self {
		Self::Str(value.to_string())
	}
}

impl From<String> for MatchValue {
	fn from(value: String) -> Self {
		Self::Str(value)
	}
}

impl From<Vec<String>> for MatchValue {
	fn from(value: Vec<String>) -> Self {
		Self::Segments(value)
	}
}

impl fmt::Display for MatchValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Str(s) => f.write_str(s),
			Self::Segments(s) => f.write_str(&s.join("/")),
		}
	}
}

/// Values captured by a matching route
pub type MatchDict = IndexMap<String, MatchValue>;

#[derive(Debug, Clone)]
enum GenPart {
	Literal(String),
	Var(String),
	Remainder(String),
}

/// A compiled route pattern: a matcher plus a URL generator
#[derive(Debug, Clone)]
pub struct RoutePattern {
	pattern: String,
	regex: Regex,
	remainder: Option<String>,
	parts: Vec<GenPart>,
}

impl RoutePattern {
	/// Compile `pattern`
	///
	/// Fails with a configuration error when a `{name:regex}` marker holds an
	/// invalid regular expression.
	///
	/// # Examples
	///
	/// ```
	/// use cornice_core::urldispatch::{MatchValue, RoutePattern};
	///
	/// let pattern = RoutePattern::compile("/docs/{id:\\d+}/*rest").unwrap();
	/// let matched = pattern.match_path("/docs/42/a/b").unwrap();
	/// assert_eq!(matched["id"], MatchValue::from("42"));
	/// assert_eq!(matched["rest"], MatchValue::from(vec!["a".to_string(), "b".to_string()]));
	/// assert!(pattern.match_path("/docs/abc/a").is_none());
	/// ```
	pub fn compile(pattern: &str) -> Result<Self> {
		let mut body = pattern.to_string();
		let mut remainder = None;
		if let Some(star) = STAR_AT_END.find(pattern) {
			let name = &pattern[star.start() + 1..];
			body = pattern[..star.start()].to_string();
			if !name.is_empty() {
				remainder = Some(name.to_string());
			}
		}
		if !body.starts_with('/') {
			body.insert(0, '/');
		}

		let mut regex_src = String::from("^");
		let mut parts = Vec::new();
		let mut last = 0;
		for marker in REPLACEMENT_MARKER.find_iter(&body) {
			let literal = &body[last..marker.start()];
			if !literal.is_empty() {
				regex_src.push_str(&regex::escape(literal));
				parts.push(GenPart::Literal(literal.to_string()));
			}
			let inner = &body[marker.start() + 1..marker.end() - 1];
			let (name, reg) = inner.split_once(':').unwrap_or((inner, "[^/]+"));
			regex_src.push_str(&format!("(?P<{}>{})", name, reg));
			parts.push(GenPart::Var(name.to_string()));
			last = marker.end();
		}
		let tail = &body[last..];
		if !tail.is_empty() {
			regex_src.push_str(&regex::escape(tail));
			parts.push(GenPart::Literal(tail.to_string()));
		}
		if let Some(name) = &remainder {
			regex_src.push_str(&format!("(?P<{}>.*?)", name));
			parts.push(GenPart::Remainder(name.clone()));
		}
		regex_src.push('$');

		let regex = Regex::new(&regex_src).map_err(|e| {
			Error::Configuration(format!("invalid route pattern {:?}: {}", pattern, e))
		})?;

		Ok(Self {
			pattern: pattern.to_string(),
			regex,
			remainder,
			parts,
		})
	}

	/// The pattern as written
	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	/// Match a decoded path
	pub fn match_path(&self, path: &str) -> Option<MatchDict> {
		let captures = self.regex.captures(path)?;
		let mut matchdict = MatchDict::new();
		for name in self.regex.capture_names().flatten() {
			let value = captures.name(name).map(|m| m.as_str()).unwrap_or_default();
			let value = if self.remainder.as_deref() == Some(name) {
				MatchValue::Segments(split_path_info(value))
			} else {
				MatchValue::Str(value.to_string())
			};
			matchdict.insert(name.to_string(), value);
		}
		Some(matchdict)
	}

	/// Generate a path from `values`, quoting each value
	///
	/// # Examples
	///
	/// ```
	/// use cornice_core::urldispatch::{MatchDict, RoutePattern};
	///
	/// let pattern = RoutePattern::compile("users/{name}/*path").unwrap();
	/// let mut values = MatchDict::new();
	/// values.insert("name".into(), "jo e".into());
	/// values.insert("path".into(), vec!["a".to_string(), "b/c".to_string()].into());
	/// assert_eq!(pattern.generate(&values).unwrap(), "/users/jo%20e/a/b%2Fc");
	/// ```
	pub fn generate(&self, values: &MatchDict) -> Result<String> {
		let mut out = String::new();
		for part in &self.parts {
			match part {
				GenPart::Literal(text) => {
					out.push_str(&utf8_percent_encode(text, PATH).to_string());
				}
				GenPart::Var(name) => match self.value(values, name)? {
					MatchValue::Str(s) => out.push_str(&quote_path_segment(s)),
					MatchValue::Segments(s) => out.push_str(&quote_path_segment(&s.join("/"))),
				},
				GenPart::Remainder(name) => match self.value(values, name)? {
					MatchValue::Str(s) => out.push_str(&utf8_percent_encode(s, PATH).to_string()),
					MatchValue::Segments(s) => {
						let quoted: Vec<String> = s.iter().map(|x| quote_path_segment(x)).collect();
						out.push_str(&quoted.join("/"));
					}
				},
			}
		}
		Ok(out)
	}

	fn value<'a>(&self, values: &'a MatchDict, name: &str) -> Result<&'a MatchValue> {
		values.get(name).ok_or_else(|| {
			Error::Configuration(format!(
				"missing value for {:?} when generating {:?}",
				name, self.pattern
			))
		})
	}
}

/// Adjusts generation values before a URL is generated
pub type Pregenerator = Arc<dyn Fn(&mut MatchDict) + Send + Sync>;

/// A named route
pub struct Route {
	name: String,
	pattern: RoutePattern,
	factory: Option<RootFactory>,
	predicates: Vec<Predicate>,
	pregenerator: Option<Pregenerator>,
	request_type: RequestType,
	is_static: bool,
}

impl Route {
	/// Create a route; fails when the pattern does not compile
	pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self> {
		let name = name.into();
		Ok(Self {
			request_type: RequestType::route(&name, false),
			name,
			pattern: RoutePattern::compile(pattern)?,
			factory: None,
			predicates: Vec::new(),
			pregenerator: None,
			is_static: false,
		})
	}

	pub fn with_factory(mut self, factory: Option<RootFactory>) -> Self {
		self.factory = factory;
		self
	}

	pub fn with_predicates(mut self, predicates: Vec<Predicate>) -> Self {
		self.predicates = predicates;
		self
	}

	pub fn with_pregenerator(mut self, pregenerator: Option<Pregenerator>) -> Self {
		self.pregenerator = pregenerator;
		self
	}

	/// Let views registered without a route name apply to this route too
	pub fn with_global_views(mut self, use_global_views: bool) -> Self {
		self.request_type = RequestType::route(&self.name, use_global_views);
		self
	}

	/// Mark the route generation-only
	pub fn with_static(mut self, is_static: bool) -> Self {
		self.is_static = is_static;
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn pattern(&self) -> &str {
		self.pattern.pattern()
	}

	pub fn factory(&self) -> Option<&RootFactory> {
		self.factory.as_ref()
	}

	pub fn predicates(&self) -> &[Predicate] {
		&self.predicates
	}

	pub fn request_type(&self) -> &RequestType {
		&self.request_type
	}

	pub fn is_static(&self) -> bool {
		self.is_static
	}

	/// Match a decoded path against the pattern only
	pub fn match_path(&self, path: &str) -> Option<MatchDict> {
		self.pattern.match_path(path)
	}

	/// Generate a path, running the pregenerator first
	pub fn generate(&self, values: &MatchDict) -> Result<String> {
		match &self.pregenerator {
			Some(pregenerator) => {
				let mut values = values.clone();
				pregenerator(&mut values);
				self.pattern.generate(&values)
			}
			None => self.pattern.generate(values),
		}
	}
}

impl fmt::Debug for Route {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Route")
			.field("name", &self.name)
			.field("pattern", &self.pattern.pattern())
			.field("predicates", &self.predicates.len())
			.field("static", &self.is_static)
			.finish()
	}
}

/// The result of routing a request
#[derive(Debug, Clone)]
pub struct RouteMatch {
	pub route: Arc<Route>,
	pub matchdict: MatchDict,
}

/// Maps requests onto routes
pub trait RoutesMapper: Send + Sync {
	/// Add a route, replacing any route with the same name
	fn connect(&mut self, route: Route) -> Arc<Route>;

	fn get_route(&self, name: &str) -> Option<Arc<Route>>;

	/// Every route, static ones included, in connection order
	fn get_routes(&self) -> Vec<Arc<Route>>;

	fn has_routes(&self) -> bool {
		!self.get_routes().is_empty()
	}

	/// First non-static route whose pattern and predicates match the request
	fn route_request(&self, request: &Request) -> Option<RouteMatch>;

	/// Generate the path of the named route
	fn generate(&self, name: &str, values: &MatchDict) -> Result<String> {
		self.get_route(name)
			.ok_or_else(|| Error::Configuration(format!("No route named {}", name)))?
			.generate(values)
	}
}

/// The default [`RoutesMapper`]: routes tried in connection order
#[derive(Default)]
pub struct UrlDispatcher {
	routes: IndexMap<String, Arc<Route>>,
	routelist: Vec<Arc<Route>>,
}

impl UrlDispatcher {
	pub fn new() -> Self {
		Self::default()
	}
}

impl RoutesMapper for UrlDispatcher {
	fn connect(&mut self, route: Route) -> Arc<Route> {
		let route = Arc::new(route);
		if let Some(old) = self.routes.shift_remove(route.name()) {
			self.routelist.retain(|r| !Arc::ptr_eq(r, &old));
		}
		if !route.is_static() {
			self.routelist.push(route.clone());
		}
		self.routes.insert(route.name().to_string(), route.clone());
		route
	}

	fn get_route(&self, name: &str) -> Option<Arc<Route>> {
		self.routes.get(name).cloned()
	}

	fn get_routes(&self) -> Vec<Arc<Route>> {
		self.routes.values().cloned().collect()
	}

	fn route_request(&self, request: &Request) -> Option<RouteMatch> {
		let path = request.path_info();
		for route in &self.routelist {
			let Some(mut matchdict) = route.match_path(&path) else {
				continue;
			};
			if route
				.predicates()
				.iter()
				.all(|p| p.evaluate_route(&mut matchdict, request))
			{
				return Some(RouteMatch {
					route: route.clone(),
					matchdict,
				});
			}
		}
		None
	}
}
