//! URL helpers shared by the agency client and the RED builder.

/// Normalize a user-supplied base URL.
///
/// Prepends `https://` when no scheme is present and appends a trailing
/// slash when missing. Idempotent, so already-normalized values pass
/// through unchanged.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    if with_scheme.ends_with('/') {
        with_scheme
    } else {
        format!("{with_scheme}/")
    }
}

/// Join a path fragment onto a normalized base URL.
///
/// The base must already end with `/` (see [`normalize_url`]) and the
/// fragment must not start with one, so the result contains exactly one
/// separating slash.
pub fn join_url(base: &str, path: &str) -> String {
    debug_assert!(base.ends_with('/'), "base must be normalized");
    debug_assert!(!path.starts_with('/'), "path must be relative");
    format!("{base}{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_scheme_and_slash() {
        assert_eq!(normalize_url("agency.example.org"), "https://agency.example.org/");
    }

    #[test]
    fn test_normalize_keeps_explicit_http() {
        assert_eq!(normalize_url("http://localhost:8080"), "http://localhost:8080/");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_url("agency.example.org/cc");
        let twice = normalize_url(&once);
        assert_eq!(once, twice);
        assert_eq!(twice, "https://agency.example.org/cc/");
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(normalize_url("  https://a.example/  "), "https://a.example/");
    }

    #[test]
    fn test_join_produces_single_slash() {
        let base = normalize_url("https://relay.example.org");
        assert_eq!(join_url(&base, "notebook/abc"), "https://relay.example.org/notebook/abc");
    }
}
