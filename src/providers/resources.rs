//! Resource providers: fixed in-memory lists and directory scans.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::error::ResourceError;
use crate::project::ProjectContext;
use crate::providers::ResourceProvider;

/// A listed resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    /// Identifier, e.g. `docs://guide/intro.md`.
    pub id: String,
    /// Human-readable description.
    pub description: String,
}

/// The content of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    /// Identifier the content was read under.
    pub id: String,
    /// MIME type guessed from the file extension.
    pub mime_type: String,
    /// UTF-8 text.
    pub text: String,
}

/// A resource held entirely in memory.
#[derive(Debug, Clone)]
pub struct StaticResource {
    descriptor: ResourceDescriptor,
    mime_type: String,
    text: String,
}

impl StaticResource {
    /// Creates a plain-text resource.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            descriptor: ResourceDescriptor {
                id: id.into(),
                description: description.into(),
            },
            mime_type: "text/plain".to_string(),
            text: text.into(),
        }
    }

    /// Sets the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }
}

/// A provider with a fixed list given at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticResourceProvider {
    resources: Vec<StaticResource>,
}

impl StaticResourceProvider {
    /// Creates a provider over `resources`, listed in the given order.
    #[must_use]
    pub const fn new(resources: Vec<StaticResource>) -> Self {
        Self { resources }
    }

    /// Built-in resources describing the project workflow.
    #[must_use]
    pub fn builtin() -> Self {
        use crate::project::Stage;

        let stages = Stage::ALL
            .iter()
            .map(|stage| format!("- {stage} → {}", stage.successor()))
            .collect::<Vec<_>>()
            .join("\n");

        Self::new(vec![StaticResource::new(
            "ish://workflow/stages",
            "Project lifecycle stages and their only legal successors",
            format!(
                "# Workflow stages\n\n{stages}\n\nAdvancing locks the stage being left. \
                 Leaving ACCEPTED starts a new cycle and clears the locked stages.\n"
            ),
        )
        .with_mime_type("text/markdown")])
    }
}

impl ResourceProvider for StaticResourceProvider {
    fn descriptors(&self) -> Box<dyn Iterator<Item = ResourceDescriptor> + '_> {
        Box::new(self.resources.iter().map(|r| r.descriptor.clone()))
    }

    fn read(&self, id: &str) -> Result<Option<ResourceContent>, ResourceError> {
        Ok(self
            .resources
            .iter()
            .find(|r| r.descriptor.id == id)
            .map(|r| ResourceContent {
                id: r.descriptor.id.clone(),
                mime_type: r.mime_type.clone(),
                text: r.text.clone(),
            }))
    }
}

/// A provider that maps files under a set of root directories to resources.
///
/// Files are matched with a glob pattern relative to each root and exposed
/// as `<scheme>://<path relative to root>`. Every file is confined to the
/// project sandbox; files that escape it (e.g. through symlinks) are
/// skipped.
#[derive(Debug, Clone)]
pub struct FileResourceProvider {
    scheme: String,
    roots: Vec<PathBuf>,
    pattern: glob::Pattern,
    project: ProjectContext,
}

impl FileResourceProvider {
    /// Creates a provider scanning `roots` (relative to the project root
    /// unless absolute).
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid glob pattern.
    pub fn new(
        scheme: impl Into<String>,
        roots: Vec<PathBuf>,
        pattern: &str,
        project: ProjectContext,
    ) -> Result<Self, glob::PatternError> {
        Ok(Self {
            scheme: scheme.into(),
            roots,
            pattern: glob::Pattern::new(pattern)?,
            project,
        })
    }

    fn prefix(&self) -> String {
        format!("{}://", self.scheme)
    }

    /// Resolves and confines a root; missing or escaping roots yield `None`.
    fn confined_root(&self, root: &Path) -> Option<PathBuf> {
        let resolved = self.project.resolve(root);
        if !resolved.is_dir() {
            return None;
        }
        match self.project.confine(&resolved) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "Skipping resource root");
                None
            }
        }
    }

    fn scan_root(&self, base: PathBuf) -> impl Iterator<Item = ResourceDescriptor> + '_ {
        let full_pattern = format!(
            "{}/{}",
            glob::Pattern::escape(&base.to_string_lossy()),
            self.pattern.as_str()
        );
        let paths = match glob::glob(&full_pattern) {
            Ok(paths) => Some(paths),
            Err(e) => {
                tracing::warn!(error = %e, "Invalid resource pattern");
                None
            }
        };

        paths
            .into_iter()
            .flatten()
            .filter_map(Result::ok)
            .filter(|path| path.is_file())
            .filter_map(move |path| self.describe(&base, &path))
    }

    fn describe(&self, base: &Path, path: &Path) -> Option<ResourceDescriptor> {
        let confined = match self.project.confine(path) {
            Ok(confined) => confined,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping resource file");
                return None;
            }
        };
        if !confined.starts_with(base) {
            tracing::warn!(path = %path.display(), "Skipping resource outside its root");
            return None;
        }
        let relative = path.strip_prefix(base).ok()?;

        Some(ResourceDescriptor {
            id: format!("{}{}", self.prefix(), to_slash(relative)),
            description: describe_file(&confined),
        })
    }
}

impl ResourceProvider for FileResourceProvider {
    fn descriptors(&self) -> Box<dyn Iterator<Item = ResourceDescriptor> + '_> {
        Box::new(
            self.roots
                .iter()
                .filter_map(|root| self.confined_root(root))
                .flat_map(|base| self.scan_root(base)),
        )
    }

    fn read(&self, id: &str) -> Result<Option<ResourceContent>, ResourceError> {
        let Some(relative) = id.strip_prefix(&self.prefix()) else {
            return Ok(None);
        };
        if !is_plain_relative(relative) || !self.pattern.matches_with(relative, match_options()) {
            return Ok(None);
        }

        for base in self.roots.iter().filter_map(|root| self.confined_root(root)) {
            let candidate = base.join(relative);
            if !candidate.is_file() {
                continue;
            }
            let path = self.project.confine(&candidate)?;
            if !path.starts_with(&base) {
                tracing::warn!(resource = %id, "Resource resolves outside its root");
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|source| ResourceError::Io {
                path: path.clone(),
                source,
            })?;
            return Ok(Some(ResourceContent {
                id: id.to_string(),
                mime_type: mime_type(&path).to_string(),
                text,
            }));
        }
        Ok(None)
    }
}

/// Matching rules shared by listing and reading: `*` never crosses `/`.
const fn match_options() -> glob::MatchOptions {
    glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// Returns `true` if `relative` names a path below its base: no `..`, no
/// root, no drive prefix.
fn is_plain_relative(relative: &str) -> bool {
    !relative.is_empty()
        && Path::new(relative)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// First Markdown heading of a `.md` file, else the file name.
fn describe_file(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if mime_type(path) != "text/markdown" {
        return file_name;
    }
    markdown_heading(path).unwrap_or(file_name)
}

/// Returns the text of the first non-empty Markdown heading in `path`.
pub(crate) fn markdown_heading(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    text.lines()
        .map(str::trim)
        .find(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim().to_string())
        .filter(|heading| !heading.is_empty())
}

fn mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("md" | "markdown") => "text/markdown",
        Some("json") => "application/json",
        Some("html" | "htm") => "text/html",
        _ => "text/plain",
    }
}
