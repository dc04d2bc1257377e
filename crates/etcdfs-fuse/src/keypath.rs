//! Slash-delimited key path helpers.
//!
//! Keys handled here are always absolute and cleaned: no empty, `.` or `..`
//! components and no trailing slash, with `/` as the store root.

/// Clean `path` into an absolute key.
pub fn clean(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Key of `name` inside directory `dir`.
pub fn join(dir: &str, name: &str) -> String {
    clean(&format!("{}/{}", dir, name))
}

/// Last component of `key`, `/` for the root.
pub fn base(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Directory containing `key`; the root is its own parent.
pub fn parent(key: &str) -> String {
    let cleaned = clean(key);
    match cleaned.rfind('/') {
        Some(0) | None => String::from("/"),
        Some(idx) => cleaned[..idx].to_string(),
    }
}
