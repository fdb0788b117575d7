//! Path confinement for the managed project.

use std::path::{Path, PathBuf};

use crate::error::SandboxError;

/// The managed project: its root directory and the paths readable beyond it.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Canonical project root.
    root: PathBuf,
    /// Canonical extra directories that may be accessed.
    allowed_paths: Vec<PathBuf>,
}

impl ProjectContext {
    /// Creates a context rooted at `root`.
    ///
    /// Relative allowed paths are resolved against the root. Allowed paths
    /// that do not exist are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the root itself cannot be canonicalised.
    pub fn new(root: &Path, allowed_paths: &[PathBuf]) -> Result<Self, SandboxError> {
        let root = root
            .canonicalize()
            .map_err(|source| SandboxError::Unresolvable {
                path: root.to_path_buf(),
                source,
            })?;

        let allowed_paths = allowed_paths
            .iter()
            .filter_map(|p| match root.join(p).canonicalize() {
                Ok(canonical) => Some(canonical),
                Err(e) => {
                    tracing::warn!(path = %p.display(), error = %e, "Skipping allowed path");
                    None
                }
            })
            .collect();

        Ok(Self {
            root,
            allowed_paths,
        })
    }

    /// Returns the canonical project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `path` against the project root without any access check.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    /// Resolves `path` and checks that it lies inside the project root or one
    /// of the allowed paths.
    ///
    /// A path that does not exist yet is checked through its parent
    /// directory, which must exist.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::OutsideAllowedPaths`] if the path escapes, or
    /// [`SandboxError::Unresolvable`] if it cannot be resolved.
    pub fn confine(&self, path: &Path) -> Result<PathBuf, SandboxError> {
        let path = self.resolve(path);

        let canonical = if path.exists() {
            path.canonicalize()
                .map_err(|source| SandboxError::Unresolvable {
                    path: path.clone(),
                    source,
                })?
        } else {
            let (Some(parent), Some(file_name)) = (path.parent(), path.file_name()) else {
                return Err(SandboxError::OutsideAllowedPaths);
            };
            let canonical_parent =
                parent
                    .canonicalize()
                    .map_err(|source| SandboxError::Unresolvable {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            canonical_parent.join(file_name)
        };

        if self.is_within(&canonical) {
            Ok(canonical)
        } else {
            Err(SandboxError::OutsideAllowedPaths)
        }
    }

    fn is_within(&self, canonical: &Path) -> bool {
        canonical.starts_with(&self.root)
            || self
                .allowed_paths
                .iter()
                .any(|allowed| canonical.starts_with(allowed))
    }
}
