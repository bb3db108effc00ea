//! Serving files below a directory

use crate::mapper::{ViewCallable, ViewOutput};
use cornice_core::exception::{Error, Result};
use cornice_core::http::{Request, Response};
use cornice_core::resource::Context;
use http::StatusCode;
use http::header::{CACHE_CONTROL, EXPIRES, IF_MODIFIED_SINCE, LAST_MODIFIED, LOCATION};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// File served when a directory is requested
pub const INDEX_FILE: &str = "index.html";

/// A view serving files from a directory
///
/// The file is located by the request's subpath. Segments that could escape
/// the directory (`..`, `.`, empty segments, segments with separators) make
/// the request a not-found.
#[derive(Debug, Clone)]
pub struct StaticView {
	root: PathBuf,
	cache_max_age: Option<u64>,
}

impl StaticView {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			cache_max_age: Some(3600),
		}
	}

	/// Seconds clients may cache served files; `None` sends no caching headers
	pub fn with_cache_max_age(mut self, seconds: Option<u64>) -> Self {
		self.cache_max_age = seconds;
		self
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// The view callable to register
	pub fn into_callable(self) -> ViewCallable {
		ViewCallable::function(move |_context: &Context, request: &mut Request| {
			self.serve(request).map(ViewOutput::Response)
		})
	}

	/// Serve the file named by the request's subpath
	pub fn serve(&self, request: &Request) -> Result<Response> {
		let subpath = request_subpath(request);
		let Some(relative) = secure_path(&subpath) else {
			return Err(Error::NotFound(format!(
				"static path {:?} is not allowed",
				subpath.join("/")
			)));
		};
		let mut path = self.root.join(relative);

		if path.is_dir() {
			let url_path = request.uri.path();
			if !url_path.ends_with('/') {
				return Ok(redirect_to_slash(request));
			}
			path.push(INDEX_FILE);
		}

		let metadata = fs::metadata(&path).map_err(|e| not_found_or_internal(e, &path))?;
		if !metadata.is_file() {
			return Err(Error::NotFound(path.display().to_string()));
		}
		let modified = metadata.modified().ok();

		if let (Some(modified), Some(since)) = (modified, if_modified_since(request)) {
			if truncate_to_secs(modified) <= since {
				return Ok(Response::new(StatusCode::NOT_MODIFIED));
			}
		}

		let body = fs::read(&path).map_err(|e| not_found_or_internal(e, &path))?;
		let content_type = mime_guess::from_path(&path).first_or_octet_stream();
		let mut response = Response::ok()
			.with_content_type(content_type.essence_str())
			.with_body(body);
		if let Some(modified) = modified {
			response.set_header(LAST_MODIFIED, &httpdate::fmt_http_date(modified));
		}
		if let Some(seconds) = self.cache_max_age {
			response.set_header(CACHE_CONTROL, &format!("max-age={}", seconds));
			let expires = SystemTime::now() + Duration::from_secs(seconds);
			response.set_header(EXPIRES, &httpdate::fmt_http_date(expires));
		}
		tracing::trace!(target: "cornice::static", path = %path.display(), "serving static file");
		Ok(response)
	}
}

fn request_subpath(request: &Request) -> Vec<String> {
	if !request.subpath.is_empty() {
		return request.subpath.clone();
	}
	request
		.matchdict
		.as_ref()
		.and_then(|m| m.get("subpath"))
		.and_then(|value| value.segments())
		.map(<[String]>::to_vec)
		.unwrap_or_default()
}

/// Join subpath segments, refusing any that could leave the root
fn secure_path(segments: &[String]) -> Option<PathBuf> {
	let mut path = PathBuf::new();
	for segment in segments {
		if segment.is_empty()
			|| segment == "."
			|| segment == ".."
			|| segment.contains('/')
			|| segment.contains('\\')
			|| segment.contains('\0')
		{
			return None;
		}
		path.push(segment);
	}
	Some(path)
}

fn redirect_to_slash(request: &Request) -> Response {
	let mut location = format!("{}/", request.uri.path());
	if let Some(query) = request.uri.query() {
		location.push('?');
		location.push_str(query);
	}
	Response::new(StatusCode::MOVED_PERMANENTLY).with_header(LOCATION, &location)
}

fn if_modified_since(request: &Request) -> Option<SystemTime> {
	let value = request.headers.get(IF_MODIFIED_SINCE)?.to_str().ok()?;
	httpdate::parse_http_date(value).ok()
}

fn truncate_to_secs(time: SystemTime) -> SystemTime {
	match time.duration_since(SystemTime::UNIX_EPOCH) {
		Ok(elapsed) => SystemTime::UNIX_EPOCH + Duration::from_secs(elapsed.as_secs()),
		Err(_) => time,
	}
}

fn not_found_or_internal(error: io::Error, path: &Path) -> Error {
	match error.kind() {
		io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
			Error::NotFound(path.display().to_string())
		}
		_ => Error::Internal(format!("cannot read {}: {}", path.display(), error)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use tempfile::TempDir;

	#[fixture]
	fn site() -> TempDir {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("style.css"), "body {}").unwrap();
		fs::create_dir(dir.path().join("docs")).unwrap();
		fs::write(dir.path().join("docs").join("index.html"), "<h1>docs</h1>").unwrap();
		dir
	}

	fn request(path: &str, subpath: &[&str]) -> Request {
		let mut request = Request::blank(path);
		request.subpath = subpath.iter().map(|s| s.to_string()).collect();
		request
	}

	#[rstest]
	fn test_serves_file_with_guessed_type(site: TempDir) {
		// Arrange
		let view = StaticView::new(site.path());

		// Act
		let response = view.serve(&request("/static/style.css", &["style.css"])).unwrap();

		// Assert
		assert_eq!(response.text(), "body {}");
		assert_eq!(response.content_type(), Some("text/css"));
		assert_eq!(response.headers()[CACHE_CONTROL], "max-age=3600");
		assert!(response.headers().contains_key(LAST_MODIFIED));
	}

	#[rstest]
	#[case(&["..", "secret"])]
	#[case(&["docs", ".", "index.html"])]
	#[case(&["a/b"])]
	#[case(&[""])]
	fn test_escaping_segments_are_not_found(site: TempDir, #[case] subpath: &[&str]) {
		let view = StaticView::new(site.path());
		let result = view.serve(&request("/static/x", subpath));
		assert!(matches!(result, Err(Error::NotFound(_))));
	}

	#[rstest]
	fn test_directory_redirects_then_serves_index(site: TempDir) {
		// Arrange
		let view = StaticView::new(site.path()).with_cache_max_age(None);

		// Act
		let redirect = view.serve(&request("/static/docs?x=1", &["docs"])).unwrap();
		let index = view.serve(&request("/static/docs/", &["docs"])).unwrap();

		// Assert
		assert_eq!(redirect.status(), StatusCode::MOVED_PERMANENTLY);
		assert_eq!(redirect.headers()[LOCATION], "/static/docs/?x=1");
		assert_eq!(index.text(), "<h1>docs</h1>");
		assert!(!index.headers().contains_key(CACHE_CONTROL));
	}

	#[rstest]
	fn test_missing_file_is_not_found(site: TempDir) {
		let view = StaticView::new(site.path());
		let result = view.serve(&request("/static/nope.js", &["nope.js"]));
		assert!(matches!(result, Err(Error::NotFound(_))));
	}

	#[rstest]
	fn test_if_modified_since_returns_not_modified(site: TempDir) {
		// Arrange
		let view = StaticView::new(site.path());
		let later = SystemTime::now() + Duration::from_secs(3600);
		let mut request = request("/static/style.css", &["style.css"]);
		request.headers.insert(
			IF_MODIFIED_SINCE,
			httpdate::fmt_http_date(later).parse().unwrap(),
		);

		// Act
		let response = view.serve(&request).unwrap();

		// Assert
		assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
		assert!(response.body().is_empty());
	}
}
