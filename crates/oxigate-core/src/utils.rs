//! Utility helpers: path resolution, filename sanitizing, URL joining.

use std::path::PathBuf;

/// Get the Oxigate data directory (e.g. `~/.oxigate/`).
pub fn get_data_path() -> PathBuf {
    let home = dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".oxigate")
}

/// Sanitize a string for use as a filename.
pub fn safe_filename(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(rest)
    } else if path == "~" {
        dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."))
    } else {
        PathBuf::from(path)
    }
}

/// Append a fixed `suffix` path to a caller-supplied `base` URL.
///
/// Trailing slashes on `base` are dropped so the result never contains `//`
/// at the seam; nothing else about `base` is touched.
pub fn join_url(base: &str, suffix: &str) -> String {
    let base = base.trim_end_matches('/');
    let suffix = suffix.trim_start_matches('/');
    format!("{base}/{suffix}")
}

/// Strip a trailing `/` and then a trailing `/v1` from a server URL.
///
/// Local runtimes are configured either as `http://host:5000` or
/// `http://host:5000/v1`; both resolve to the same base.
pub fn trim_v1(url: &str) -> &str {
    let url = url.strip_suffix('/').unwrap_or(url);
    url.strip_suffix("/v1").unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("hello world!"), "hello_world_");
        assert_eq!(safe_filename("../etc"), ".._etc");
        assert_eq!(safe_filename("a/b/c"), "a_b_c");
        assert_eq!(safe_filename("user@example"), "user_example");
    }

    #[test]
    fn test_safe_filename_preserves_valid() {
        assert_eq!(safe_filename("default-user_v2"), "default-user_v2");
    }

    #[test]
    fn test_expand_home_tilde() {
        let expanded = expand_home("~/test/path");
        assert!(!expanded.starts_with("~"));
        assert!(expanded.to_str().unwrap().ends_with("test/path"));
    }

    #[test]
    fn test_expand_home_absolute() {
        let expanded = expand_home("/absolute/path");
        assert_eq!(expanded, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_join_url_plain() {
        assert_eq!(
            join_url("https://proxy.example.com/v1", "/chat/completions"),
            "https://proxy.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_join_url_trailing_slashes() {
        assert_eq!(
            join_url("https://proxy.example.com/v1//", "/chat/completions"),
            "https://proxy.example.com/v1/chat/completions"
        );
        assert_eq!(join_url("http://h:1/", "models"), "http://h:1/models");
    }

    #[test]
    fn test_trim_v1() {
        assert_eq!(trim_v1("http://127.0.0.1:5000/v1"), "http://127.0.0.1:5000");
        assert_eq!(trim_v1("http://127.0.0.1:5000/v1/"), "http://127.0.0.1:5000");
        assert_eq!(trim_v1("http://127.0.0.1:5000/"), "http://127.0.0.1:5000");
        assert_eq!(trim_v1("http://127.0.0.1:5000"), "http://127.0.0.1:5000");
        assert_eq!(trim_v1("http://host/v1beta"), "http://host/v1beta");
    }

    #[test]
    fn test_data_path_ends_with_oxigate() {
        let path = get_data_path();
        assert!(path.ends_with(".oxigate"));
    }
}
