use std::fmt;

/// Errors produced while resolving or reading an asset.
#[derive(Debug)]
pub enum VfsError {
    /// Nothing exists at the requested path.
    NotFound(String),
    /// The underlying storage failed while reading `path`.
    Io {
        path: String,
        source: std::io::Error,
    },
    /// The path could not be normalized (empty or escaping its root).
    InvalidPath(String),
    /// No source is mounted under the given name and no default is set.
    NoSuchMount(String),
}

impl VfsError {
    /// Wrap an I/O error, folding `ErrorKind::NotFound` into [`VfsError::NotFound`].
    pub fn from_io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            VfsError::NotFound(path)
        } else {
            VfsError::Io { path, source }
        }
    }
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsError::NotFound(path) => write!(f, "asset not found: {path}"),
            VfsError::Io { path, source } => write!(f, "failed to read {path}: {source}"),
            VfsError::InvalidPath(reason) => write!(f, "invalid asset path: {reason}"),
            VfsError::NoSuchMount(name) => write!(f, "no asset source mounted as '{name}'"),
        }
    }
}

impl std::error::Error for VfsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VfsError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_folds_into_not_found() {
        let err = VfsError::from_io(
            "textures/a.png",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, VfsError::NotFound(ref p) if p == "textures/a.png"));
    }

    #[test]
    fn other_io_errors_keep_source() {
        let err = VfsError::from_io(
            "textures/a.png",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("textures/a.png"));
    }
}
