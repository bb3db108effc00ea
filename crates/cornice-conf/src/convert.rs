//! String coercion helpers for setting values.

const TRUTHY: &[&str] = &["t", "true", "y", "yes", "on", "1"];

/// Interprets a setting value as a boolean.
///
/// Accepts `true`, `yes`, `on`, `y`, `t` and `1` (case-insensitive, surrounding
/// whitespace ignored); anything else is `false`.
///
/// # Examples
///
/// ```
/// use cornice_conf::as_bool;
///
/// assert!(as_bool("Yes"));
/// assert!(as_bool(" 1 "));
/// assert!(!as_bool("off"));
/// assert!(!as_bool(""));
/// ```
pub fn as_bool(value: &str) -> bool {
	let value = value.trim().to_lowercase();
	TRUTHY.contains(&value.as_str())
}

/// Splits a setting value on any whitespace (including newlines) into a list.
///
/// # Examples
///
/// ```
/// use cornice_conf::as_list;
///
/// let tweens = as_list("app.tweens:timing\n  app.tweens:auth  ");
/// assert_eq!(tweens, vec!["app.tweens:timing", "app.tweens:auth"]);
/// ```
pub fn as_list(value: &str) -> Vec<String> {
	value.split_whitespace().map(str::to_string).collect()
}
