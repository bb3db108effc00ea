//! Predicate compiler
//!
//! Turns the predicate options of a view or route into:
//!
//! - the ordered list of [`Predicate`]s to evaluate,
//! - an `order` ranking the set against competing registrations (lower sorts
//!   first),
//! - a `phash` identifying the exact predicate values.
//!
//! Predicates are always emitted in the same category order: xhr, request
//! method, path info, request param, header, accept, containment, request type,
//! match param, custom predicates, and for routes the traverse pseudo-predicate.

use crate::exception::{Error, Result};
use crate::http::{MediaRange, Request};
use crate::interfaces::Interface;
use crate::resource::{Context, find_interface};
use crate::urldispatch::{MatchDict, MatchValue, RoutePattern, split_path_info};
use http::Method;
use percent_encoding::percent_decode_str;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Ranking ceiling; an empty predicate set has exactly this order
pub const MAX_ORDER: u64 = 1 << 30;

/// Phash of an empty predicate set (SHA-256 of no input)
pub const DEFAULT_PHASH: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

const WEIGHT_XHR: u64 = 1 << 1;
const WEIGHT_REQUEST_METHOD: u64 = 1 << 2;
const WEIGHT_PATH_INFO: u64 = 1 << 3;
const WEIGHT_REQUEST_PARAM: u64 = 1 << 4;
const WEIGHT_HEADER: u64 = 1 << 5;
const WEIGHT_ACCEPT: u64 = 1 << 6;
const WEIGHT_CONTAINMENT: u64 = 1 << 7;
const WEIGHT_REQUEST_TYPE: u64 = 1 << 8;
const WEIGHT_MATCH_PARAM: u64 = 1 << 9;
const WEIGHT_CUSTOM: u64 = 1 << 10;

/// What a custom predicate is evaluated against
#[derive(Clone, Copy)]
pub enum PredicateTarget<'a> {
	/// View predicates see the context resource
	Context(&'a Context),
	/// Route predicates see the route's match dict
	Route(&'a MatchDict),
}

/// An application supplied predicate
pub trait CustomPredicate: Send + Sync {
	fn check(&self, target: PredicateTarget<'_>, request: &Request) -> bool;

	/// Human readable description
	fn text(&self) -> String {
		"<unknown custom predicate>".to_string()
	}

	/// Value folded into the phash
	///
	/// Defaults to the object's address. Predicates that should override each
	/// other when registered separately return equal hashes.
	fn predicate_hash(&self) -> u64 {
		self as *const Self as *const () as usize as u64
	}
}

struct FnPredicate<F> {
	text: String,
	check: F,
}

impl<F> CustomPredicate for FnPredicate<F>
where
	F: Fn(PredicateTarget<'_>, &Request) -> bool + Send + Sync,
{
	fn check(&self, target: PredicateTarget<'_>, request: &Request) -> bool {
		(self.check)(target, request)
	}

	fn text(&self) -> String {
		self.text.clone()
	}
}

/// Wrap a closure as a custom predicate
///
/// # Examples
///
/// ```
/// use cornice_core::http::Request;
/// use cornice_core::predicates::custom_predicate;
///
/// let is_admin = custom_predicate("path starts with /admin", |_, request: &Request| {
///     request.path_info().starts_with("/admin")
/// });
/// assert_eq!(is_admin.text(), "path starts with /admin");
/// ```
pub fn custom_predicate<F>(text: impl Into<String>, check: F) -> Arc<dyn CustomPredicate>
where
	F: Fn(PredicateTarget<'_>, &Request) -> bool + Send + Sync + 'static,
{
	Arc::new(FnPredicate {
		text: text.into(),
		check,
	})
}

/// A compiled predicate
#[derive(Clone)]
pub enum Predicate {
	Xhr,
	RequestMethod(Vec<Method>),
	PathInfo(Regex),
	RequestParam { name: String, value: Option<String> },
	Header { name: String, value: Option<Regex> },
	Accept(String),
	MatchParam(Vec<(String, String)>),
	Containment(Interface),
	RequestType(Interface),
	Custom(Arc<dyn CustomPredicate>),
	/// Injects a `traverse` value into a route's match dict; always true
	Traverse(RoutePattern),
}

impl Predicate {
	/// Human readable description, used in mismatch messages
	pub fn text(&self) -> String {
		match self {
			Self::Xhr => "xhr = True".to_string(),
			Self::RequestMethod(methods) => {
				let names: Vec<&str> = methods.iter().map(Method::as_str).collect();
				format!("request method = {}", names.join(","))
			}
			Self::PathInfo(regex) => format!("path_info = {}", regex.as_str()),
			Self::RequestParam { name, value: None } => format!("request_param {}", name),
			Self::RequestParam {
				name,
				value: Some(value),
			} => format!("request_param {} = {}", name, value),
			Self::Header { name, value: None } => format!("header {}", name),
			Self::Header {
				name,
				value: Some(value),
			} => format!("header {} = {}", name, value.as_str()),
			Self::Accept(accept) => format!("accept = {}", accept),
			Self::MatchParam(pairs) => {
				let pairs: Vec<String> = pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
				format!("match_param {}", pairs.join(","))
			}
			Self::Containment(iface) => format!("containment = {}", iface),
			Self::RequestType(iface) => format!("request_type = {}", iface),
			Self::Custom(predicate) => predicate.text(),
			Self::Traverse(_) => "traverse matchdict pseudo-predicate".to_string(),
		}
	}

	fn check_request(&self, request: &Request) -> Option<bool> {
		let result = match self {
			Self::Xhr => request.is_xhr(),
			Self::RequestMethod(methods) => methods.contains(&request.method),
			Self::PathInfo(regex) => regex.is_match(&request.path_info()),
			Self::RequestParam { name, value } => {
				let found = request.param(name);
				match value {
					None => found.is_some(),
					Some(value) => found.as_deref() == Some(value.as_str()),
				}
			}
			Self::Header { name, value } => match (request.header(name), value) {
				(None, _) => false,
				(Some(_), None) => true,
				(Some(found), Some(regex)) => regex.is_match(found),
			},
			Self::Accept(accept) => request.accept().contains(accept),
			Self::RequestType(iface) => request.request_type.resolution_order().contains(iface),
			_ => return None,
		};
		Some(result)
	}

	/// Evaluate as a view predicate
	pub fn evaluate(&self, context: &Context, request: &Request) -> bool {
		if let Some(result) = self.check_request(request) {
			return result;
		}
		match self {
			Self::MatchParam(pairs) => match &request.matchdict {
				Some(matchdict) => match_params(pairs, matchdict),
				None => false,
			},
			Self::Containment(iface) => find_interface(context, iface).is_some(),
			Self::Custom(predicate) => predicate.check(PredicateTarget::Context(context), request),
			_ => true,
		}
	}

	/// Evaluate as a route predicate against the route's match dict
	pub fn evaluate_route(&self, matchdict: &mut MatchDict, request: &Request) -> bool {
		if let Some(result) = self.check_request(request) {
			return result;
		}
		match self {
			Self::MatchParam(pairs) => match_params(pairs, matchdict),
			Self::Containment(_) => false,
			Self::Custom(predicate) => predicate.check(PredicateTarget::Route(matchdict), request),
			Self::Traverse(pattern) => {
				if !matchdict.contains_key("traverse") {
					let Ok(path) = pattern.generate(matchdict) else {
						return false;
					};
					let decoded = percent_decode_str(&path).decode_utf8_lossy();
					matchdict.insert(
						"traverse".to_string(),
						MatchValue::Segments(split_path_info(&decoded)),
					);
				}
				true
			}
			_ => true,
		}
	}
}

impl fmt::Debug for Predicate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "<Predicate {}>", self.text())
	}
}

fn match_params(pairs: &[(String, String)], matchdict: &MatchDict) -> bool {
	pairs.iter().all(|(key, expected)| {
		matchdict.get(key).and_then(MatchValue::as_str) == Some(expected.as_str())
	})
}

/// Predicate options of a view or route registration
///
/// `request_param` is `name` or `name=value`; `header` is `name` or
/// `name:regex`; each `match_param` entry is `key=value`.
#[derive(Clone, Default)]
pub struct PredicateOptions {
	pub xhr: bool,
	pub request_method: Option<Vec<Method>>,
	pub path_info: Option<String>,
	pub request_param: Option<String>,
	pub header: Option<String>,
	pub accept: Option<String>,
	pub match_param: Option<Vec<String>>,
	pub containment: Option<Interface>,
	pub request_type: Option<Interface>,
	pub custom: Vec<Arc<dyn CustomPredicate>>,
	/// Route only: pattern generating the traversal path from the match dict
	pub traverse: Option<String>,
}

impl fmt::Debug for PredicateOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let custom: Vec<String> = self.custom.iter().map(|p| p.text()).collect();
		f.debug_struct("PredicateOptions")
			.field("xhr", &self.xhr)
			.field("request_method", &self.request_method)
			.field("path_info", &self.path_info)
			.field("request_param", &self.request_param)
			.field("header", &self.header)
			.field("accept", &self.accept)
			.field("match_param", &self.match_param)
			.field("containment", &self.containment)
			.field("request_type", &self.request_type)
			.field("custom", &custom)
			.field("traverse", &self.traverse)
			.finish()
	}
}

/// The output of [`compile_predicates`]
#[derive(Clone, Debug)]
pub struct PredicateSet {
	pub order: u64,
	pub predicates: Vec<Predicate>,
	pub phash: String,
}

impl PredicateSet {
	/// Empty set: matches everything and ranks last
	pub fn empty() -> Self {
		Self {
			order: MAX_ORDER,
			predicates: Vec::new(),
			phash: DEFAULT_PHASH.to_string(),
		}
	}
}

fn compile_regex(option: &str, pattern: &str) -> Result<Regex> {
	Regex::new(pattern).map_err(|e| {
		Error::Configuration(format!("{} regex {:?} is invalid: {}", option, pattern, e))
	})
}

/// Compile predicate options
///
/// Invalid `path_info` or `header` regexes are configuration errors, as is an
/// `accept` offer that is a media range such as `text/*`.
///
/// # Examples
///
/// ```
/// use cornice_core::predicates::{DEFAULT_PHASH, MAX_ORDER, PredicateOptions, compile_predicates};
/// use http::Method;
///
/// let empty = compile_predicates(&PredicateOptions::default()).unwrap();
/// assert_eq!(empty.order, MAX_ORDER);
/// assert_eq!(empty.phash, DEFAULT_PHASH);
///
/// let get = compile_predicates(&PredicateOptions {
///     request_method: Some(vec![Method::GET]),
///     ..Default::default()
/// })
/// .unwrap();
/// assert!(get.order < empty.order);
/// assert_ne!(get.phash, empty.phash);
/// ```
pub fn compile_predicates(options: &PredicateOptions) -> Result<PredicateSet> {
	let mut predicates = Vec::new();
	let mut score = 0u64;
	let mut hasher = Sha256::new();

	if options.xhr {
		predicates.push(Predicate::Xhr);
		score |= WEIGHT_XHR;
		hasher.update(b"xhr:True");
	}

	if let Some(methods) = &options.request_method {
		let mut methods = methods.clone();
		if methods.contains(&Method::GET) && !methods.contains(&Method::HEAD) {
			methods.push(Method::HEAD);
		}
		let mut names: Vec<&str> = methods.iter().map(Method::as_str).collect();
		names.sort_unstable();
		hasher.update(format!("request_method:{:?}", names).as_bytes());
		predicates.push(Predicate::RequestMethod(methods));
		score |= WEIGHT_REQUEST_METHOD;
	}

	if let Some(path_info) = &options.path_info {
		let regex = compile_regex("path_info", path_info)?;
		hasher.update(format!("path_info:{:?}", path_info).as_bytes());
		predicates.push(Predicate::PathInfo(regex));
		score |= WEIGHT_PATH_INFO;
	}

	if let Some(param) = &options.request_param {
		let (name, value) = match param.split_once('=') {
			Some((name, value)) => (name.trim().to_string(), Some(value.trim().to_string())),
			None => (param.trim().to_string(), None),
		};
		hasher.update(format!("request_param:{:?}={:?}", name, value).as_bytes());
		predicates.push(Predicate::RequestParam { name, value });
		score |= WEIGHT_REQUEST_PARAM;
	}

	if let Some(header) = &options.header {
		let (name, value) = match header.split_once(':') {
			Some((name, pattern)) => (name.to_string(), Some(compile_regex("header", pattern)?)),
			None => (header.clone(), None),
		};
		hasher.update(
			format!(
				"header:{:?}={:?}",
				name,
				value.as_ref().map(Regex::as_str)
			)
			.as_bytes(),
		);
		predicates.push(Predicate::Header { name, value });
		score |= WEIGHT_HEADER;
	}

	if let Some(accept) = &options.accept {
		// Offers are concrete media types; ranges only appear in Accept headers
		if accept.contains('*') || MediaRange::parse(accept).is_none() {
			return Err(Error::Configuration(format!(
				"accept {:?} must be a concrete media type, not a media range",
				accept
			)));
		}
		hasher.update(format!("accept:{:?}", accept).as_bytes());
		predicates.push(Predicate::Accept(accept.clone()));
		score |= WEIGHT_ACCEPT;
	}

	if let Some(iface) = &options.containment {
		hasher.update(format!("containment:{}", iface.name()).as_bytes());
		predicates.push(Predicate::Containment(iface.clone()));
		score |= WEIGHT_CONTAINMENT;
	}

	if let Some(iface) = &options.request_type {
		hasher.update(format!("request_type:{}", iface.name()).as_bytes());
		predicates.push(Predicate::RequestType(iface.clone()));
		score |= WEIGHT_REQUEST_TYPE;
	}

	if let Some(params) = &options.match_param {
		let mut pairs = Vec::with_capacity(params.len());
		for param in params {
			let (key, value) = param.split_once('=').ok_or_else(|| {
				Error::Configuration(format!("match_param {:?} must be key=value", param))
			})?;
			pairs.push((key.trim().to_string(), value.trim().to_string()));
		}
		pairs.sort();
		hasher.update(format!("match_param:{:?}", pairs).as_bytes());
		predicates.push(Predicate::MatchParam(pairs));
		score |= WEIGHT_MATCH_PARAM;
	}

	if !options.custom.is_empty() {
		for (num, predicate) in options.custom.iter().enumerate() {
			hasher.update(format!("custom{}:{}", num, predicate.predicate_hash()).as_bytes());
			predicates.push(Predicate::Custom(predicate.clone()));
		}
		score |= WEIGHT_CUSTOM;
	}

	if let Some(traverse) = &options.traverse {
		predicates.push(Predicate::Traverse(RoutePattern::compile(traverse)?));
	}

	let order = (MAX_ORDER - score) / (predicates.len() as u64 + 1);
	let phash = hex::encode(hasher.finalize());

	Ok(PredicateSet {
		order,
		predicates,
		phash,
	})
}

/// Compile the predicates of a route (ranking and phash are not used for routes)
pub fn compile_route_predicates(options: &PredicateOptions) -> Result<Vec<Predicate>> {
	Ok(compile_predicates(options)?.predicates)
}
