//! Path helpers shared by the asset router and the texture cache.
//!
//! Asset keys are always compared in normalized form so that `"a\\b.png"`,
//! `"/a/b.png"` and `"a/./b.png"` name the same cache entry.

use crate::VfsError;

/// Normalize an asset path.
///
/// Backslashes become forward slashes, empty and `.` segments are dropped and
/// leading/trailing separators are stripped. A `..` segment is rejected since
/// assets may never escape the root of their source.
pub fn normalize(path: &str) -> Result<String, VfsError> {
    let mut normalized = String::with_capacity(path.len());

    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(VfsError::InvalidPath(format!("'{path}' escapes its root")));
            }
            name => {
                if !normalized.is_empty() {
                    normalized.push('/');
                }
                normalized.push_str(name);
            }
        }
    }

    if normalized.is_empty() {
        return Err(VfsError::InvalidPath(format!("'{path}' names no file")));
    }
    Ok(normalized)
}

/// Join a root directory and a relative asset path, then normalize the result.
///
/// An empty root yields the normalized `path` alone.
pub fn join(root: &str, path: &str) -> Result<String, VfsError> {
    if root.is_empty() {
        normalize(path)
    } else {
        normalize(&format!("{root}/{path}"))
    }
}

/// Lower-cased extension of the last path segment, if any.
pub fn extension(path: &str) -> Option<String> {
    let file = path.rsplit(['/', '\\']).next()?;
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Split a normalized path into its mount name and the remainder.
pub(crate) fn split_mount(path: &str) -> (&str, &str) {
    path.split_once('/').unwrap_or((path, ""))
}
