//! Adapter boundary helpers.
//!
//! HTTP-client adapter shims sit outside this crate; what they owe the
//! tunnel is fixed: a verb, a path (path+query+fragment, never a full
//! URL), headers flattened to ordered `"Name: Value"` strings with
//! duplicates preserved, and a raw byte body. An adapter that cannot
//! produce one of these raises [`UnresolvableUrl`](crate::TunnelError::UnresolvableUrl)
//! or [`UnsupportedBody`](crate::TunnelError::UnsupportedBody) before any
//! frame is sent. This module holds the conversions every adapter needs.

use url::Url;

use crate::error::{Result, TunnelError};

/// Resolve an absolute or relative URL down to path+query+fragment.
///
/// A target already starting with `/` passes through untouched. An
/// absolute URL is stripped to its path, query, and fragment. Anything
/// else (a relative path without a leading slash, an opaque URL like
/// `mailto:`) cannot be resolved and is rejected.
///
/// # Example
///
/// ```
/// use webtunnel::http::resolve_request_path;
///
/// let path = resolve_request_path("https://example.com/a/b?x=1#frag").unwrap();
/// assert_eq!(path, "/a/b?x=1#frag");
/// ```
pub fn resolve_request_path(target: &str) -> Result<String> {
    if target.starts_with('/') {
        return Ok(target.to_string());
    }

    let url = Url::parse(target).map_err(|_| TunnelError::UnresolvableUrl(target.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(TunnelError::UnresolvableUrl(target.to_string()));
    }

    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        path.push('#');
        path.push_str(fragment);
    }

    Ok(path)
}

/// Flatten header pairs into ordered `"Name: Value"` lines.
///
/// Order and duplicate names are preserved exactly; no casing or folding
/// is applied.
pub fn flatten_headers<'a, I>(pairs: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect()
}

/// Split one `"Name: Value"` line back into its parts.
///
/// Returns `None` for a line with no colon. The value has any single
/// leading space after the colon removed; further whitespace is data.
pub fn split_header_line(line: &str) -> Option<(&str, &str)> {
    let pos = line.find(':')?;
    let name = &line[..pos];
    let value = line[pos + 1..].strip_prefix(' ').unwrap_or(&line[pos + 1..]);
    Some((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rooted_path_passes_through() {
        assert_eq!(resolve_request_path("/a/b?x=1").unwrap(), "/a/b?x=1");
    }

    #[test]
    fn test_absolute_url_stripped_to_path() {
        let path = resolve_request_path("http://h:8080/a/b?x=1&y=2#frag").unwrap();
        assert_eq!(path, "/a/b?x=1&y=2#frag");
    }

    #[test]
    fn test_bare_origin_resolves_to_root() {
        assert_eq!(resolve_request_path("http://example.com").unwrap(), "/");
    }

    #[test]
    fn test_relative_path_rejected() {
        assert!(matches!(
            resolve_request_path("a/b/c"),
            Err(TunnelError::UnresolvableUrl(_))
        ));
    }

    #[test]
    fn test_opaque_url_rejected() {
        assert!(matches!(
            resolve_request_path("mailto:user@example.com"),
            Err(TunnelError::UnresolvableUrl(_))
        ));
    }

    #[test]
    fn test_flatten_preserves_order_and_duplicates() {
        let lines = flatten_headers([
            ("Accept", "text/html"),
            ("X-Trace", "a"),
            ("X-Trace", "b"),
        ]);

        assert_eq!(
            lines,
            vec!["Accept: text/html", "X-Trace: a", "X-Trace: b"]
        );
    }

    #[test]
    fn test_split_header_line() {
        assert_eq!(
            split_header_line("Content-Type: text/html"),
            Some(("Content-Type", "text/html"))
        );
        // Only the single canonical space is eaten.
        assert_eq!(split_header_line("K:  padded"), Some(("K", " padded")));
        assert_eq!(split_header_line("K:v"), Some(("K", "v")));
        assert_eq!(split_header_line("no colon here"), None);
    }

    #[test]
    fn test_flatten_then_split_roundtrip() {
        let pairs = [("Accept", "text/html"), ("Cookie", "k=v; j=w")];
        let lines = flatten_headers(pairs);

        let back: Vec<_> = lines
            .iter()
            .filter_map(|l| split_header_line(l))
            .collect();
        assert_eq!(back, pairs);
    }
}
