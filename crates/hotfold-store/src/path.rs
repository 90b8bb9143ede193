//! Share-relative path helpers.
//!
//! Remote paths are plain strings with `/` separators; backslashes are
//! accepted on input so UNC-style configuration keeps working.

const SEPARATORS: [char; 2] = ['/', '\\'];

/// Join a child segment onto a base path.
#[must_use]
pub fn join(base: &str, child: &str) -> String {
    let base = base.trim_end_matches(SEPARATORS);
    let child = child.trim_start_matches(SEPARATORS);
    match (base.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{base}/{child}"),
    }
}

/// Final path component.
#[must_use]
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(SEPARATORS);
    trimmed
        .rsplit_once(SEPARATORS)
        .map_or(trimmed, |(_, name)| name)
}

/// Split a path into its normalised segments, dropping empty and `.` parts.
///
/// Returns `None` when a `..` segment is present.
#[must_use]
pub fn segments(path: &str) -> Option<Vec<&str>> {
    let mut out = Vec::new();
    for segment in path.split(SEPARATORS) {
        match segment {
            "" | "." => {}
            ".." => return None,
            other => out.push(other),
        }
    }
    Some(out)
}
