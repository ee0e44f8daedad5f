use cow_utils::CowUtils;
use std::path::MAIN_SEPARATOR;

/// Convert a dotted module name (`a.b.c`) to a platform path fragment (`a/b/c`).
pub fn module_path_fragment(module_name: &str) -> String {
    module_name
        .cow_replace('.', MAIN_SEPARATOR.to_string().as_str())
        .into_owned()
}

/// Substitute a path fragment into a `?` pattern template.
///
/// Returns `None` when the pattern carries no placeholder at all, so the
/// caller can treat it as a non-matching pattern rather than probing a
/// literal path that was never meant to be one.
pub fn substitute_pattern(pattern: &str, fragment: &str) -> Option<String> {
    if !pattern.contains('?') {
        return None;
    }
    Some(pattern.cow_replace('?', fragment).into_owned())
}

/// Normalize line endings to LF (\n) for cross-platform consistency.
/// This ensures reproducible bundles regardless of the platform where
/// bundling occurs.
pub fn normalize_line_endings(content: String) -> String {
    content
        .cow_replace("\r\n", "\n")
        .cow_replace('\r', "\n")
        .into_owned()
}
