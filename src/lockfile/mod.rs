mod graph;
mod matchers;
mod parser;
mod registry;

pub use graph::{DependencyTree, GemView, NvTree, Tree};
pub use parser::{parse, parse_lines};
pub use registry::Registry;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Platform recorded for a spec line without a `-platform` suffix.
pub const DEFAULT_PLATFORM: &str = "ruby";

/// How a gem was provisioned: one of the four lockfile source sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum GemKind {
    /// A RubyGems-style registry (`GEM` section).
    #[serde(rename = "GEM")]
    Registry,
    /// A local filesystem checkout (`PATH` section).
    #[serde(rename = "PATH")]
    Path,
    /// A Git checkout (`GIT` section).
    #[serde(rename = "GIT")]
    Git,
    /// A Subversion checkout (`SVN` section).
    #[serde(rename = "SVN")]
    Svn,
}

impl GemKind {
    /// The section header that introduces gems of this kind.
    pub fn header(self) -> &'static str {
        match self {
            GemKind::Registry => "GEM",
            GemKind::Path => "PATH",
            GemKind::Git => "GIT",
            GemKind::Svn => "SVN",
        }
    }

    /// Returns true for version-control checkouts.
    pub fn is_vcs(self) -> bool {
        matches!(self, GemKind::Git | GemKind::Svn)
    }
}

impl fmt::Display for GemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// The value of a source option line; `true`/`false` are normalized to flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Flag(bool),
    Text(String),
}

impl OptionValue {
    /// The text of a non-boolean value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Flag(_) => None,
            OptionValue::Text(text) => Some(text),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(text: &str) -> Self {
        OptionValue::Text(text.to_string())
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Flag(flag) => write!(f, "{}", flag),
            OptionValue::Text(text) => f.write_str(text),
        }
    }
}

/// The source options a lockfile section may carry ahead of its specs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionKey {
    Remote,
    Ref,
    Revision,
    Branch,
    Submodules,
    Tag,
}

impl OptionKey {
    /// Look up a supported option by its lockfile key. Unknown keys return `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "remote" => Some(OptionKey::Remote),
            "ref" => Some(OptionKey::Ref),
            "revision" => Some(OptionKey::Revision),
            "branch" => Some(OptionKey::Branch),
            "submodules" => Some(OptionKey::Submodules),
            "tag" => Some(OptionKey::Tag),
            _ => None,
        }
    }
}

/// One resolved dependency of the lockfile.
///
/// A gem may also be a placeholder: a name referenced as a dependency of
/// another gem before (or without) its own spec line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gem {
    pub name: String,
    pub version: Option<String>,
    pub platform: Option<String>,
    /// Provenance; `None` only for a spec listed outside any source section.
    pub kind: Option<GemKind>,
    /// Registry URL, filesystem path or VCS URL.
    pub remote: Option<OptionValue>,
    /// Filesystem path, copied from `remote` for path gems.
    pub path: Option<OptionValue>,
    /// Full VCS revision (e.g. a Git commit hash).
    pub revision: Option<OptionValue>,
    /// Short VCS ref: a tag, branch or shortened revision.
    pub reference: Option<OptionValue>,
    pub branch: Option<OptionValue>,
    pub submodules: Option<OptionValue>,
    pub tag: Option<OptionValue>,
    /// The version as declared in the specs section, kept for VCS gems
    /// whose `version` is replaced by their revision.
    pub spec_version: Option<String>,
    /// Declared with a trailing `!` in DEPENDENCIES.
    pub pinned: bool,
    /// Version constraints; top-level constraints come first.
    pub requirements: Vec<String>,
    /// Names of direct dependencies, in declaration order.
    pub dependencies: Vec<String>,
    defined: bool,
    refined: bool,
}

impl Gem {
    pub fn new(name: impl Into<String>) -> Self {
        Gem {
            name: name.into(),
            version: None,
            platform: None,
            kind: None,
            remote: None,
            path: None,
            revision: None,
            reference: None,
            branch: None,
            submodules: None,
            tag: None,
            spec_version: None,
            pinned: false,
            requirements: Vec::new(),
            dependencies: Vec::new(),
            defined: false,
            refined: false,
        }
    }

    /// The identity used to compare relationships: provenance, name and version.
    pub fn key(&self) -> GemKey {
        GemKey {
            name: self.name.clone(),
            version: self.version.clone(),
            kind: self.kind,
        }
    }

    /// The file name of the packaged gem, e.g. `rake-13.0.6.gem`.
    pub fn archive_name(&self) -> String {
        format!("{}-{}.gem", self.name, self.version.as_deref().unwrap_or(""))
    }

    /// Returns true once a spec line has defined this gem.
    pub fn is_defined(&self) -> bool {
        self.defined
    }

    pub(crate) fn define(&mut self, kind: Option<GemKind>) {
        if !self.defined {
            self.kind = kind;
            self.defined = true;
        }
    }

    pub(crate) fn apply_option(&mut self, key: OptionKey, value: Option<OptionValue>) {
        let field = match key {
            OptionKey::Remote => &mut self.remote,
            OptionKey::Ref => &mut self.reference,
            OptionKey::Revision => &mut self.revision,
            OptionKey::Branch => &mut self.branch,
            OptionKey::Submodules => &mut self.submodules,
            OptionKey::Tag => &mut self.tag,
        };
        *field = value;
    }

    /// Append a constraint unless it is already recorded.
    pub(crate) fn add_requirement(&mut self, requirement: &str) {
        if !self.requirements.iter().any(|r| r == requirement) {
            self.requirements.push(requirement.to_string());
        }
    }

    /// Place constraints at the front in their written order. An equal
    /// constraint recorded earlier is moved rather than duplicated.
    pub(crate) fn prepend_requirements(&mut self, requirements: &[&str]) {
        let mut merged: Vec<String> =
            Vec::with_capacity(requirements.len() + self.requirements.len());
        for requirement in requirements {
            if !merged.iter().any(|r| r == requirement) {
                merged.push(requirement.to_string());
            }
        }
        for requirement in self.requirements.drain(..) {
            if !merged.contains(&requirement) {
                merged.push(requirement);
            }
        }
        self.requirements = merged;
    }

    pub(crate) fn add_dependency(&mut self, name: &str) {
        if !self.dependencies.iter().any(|d| d == name) {
            self.dependencies.push(name.to_string());
        }
    }

    /// Reconcile provenance-specific fields after the whole document is read.
    ///
    /// Path gems get `path` from `remote`. VCS gems keep their declared
    /// version in `spec_version` and take the revision (or, failing that,
    /// the ref) as `version`. Calling this more than once has no further
    /// effect.
    pub fn refine(&mut self) {
        if self.refined {
            return;
        }
        self.refined = true;

        match self.kind {
            Some(GemKind::Path) => self.path = self.remote.clone(),
            Some(kind) if kind.is_vcs() => {
                self.spec_version = self.version.clone();
                if let Some(pin) = self.revision.as_ref().or(self.reference.as_ref()) {
                    self.version = Some(pin.to_string());
                }
            }
            _ => {}
        }
    }
}

/// The (provenance, name, version) identity of a gem.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GemKey {
    pub name: String,
    pub version: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<GemKind>,
}

impl fmt::Display for GemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version.as_deref().unwrap_or(""))
    }
}

/// A parent -> child edge of the flattened graph. Top-level dependencies
/// have no parent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Relationship {
    pub parent: Option<GemKey>,
    pub child: GemKey,
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{} -> {}", parent, self.child),
            None => write!(f, "(root) -> {}", self.child),
        }
    }
}

/// A non-fatal observation made while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A line the active section could not make sense of; it was skipped.
    UnmatchedLine {
        line_number: usize,
        section: String,
        content: String,
    },
    /// A DEPENDENCIES entry repeated; the first declaration is kept.
    DuplicateDependency { line_number: usize, name: String },
    /// A DEPENDENCIES entry with no matching spec.
    MissingGem { line_number: usize, name: String },
    /// A spec dependency line with no spec above it.
    OrphanSubDependency { line_number: usize, name: String },
}

impl Diagnostic {
    pub fn line_number(&self) -> usize {
        match self {
            Diagnostic::UnmatchedLine { line_number, .. }
            | Diagnostic::DuplicateDependency { line_number, .. }
            | Diagnostic::MissingGem { line_number, .. }
            | Diagnostic::OrphanSubDependency { line_number, .. } => *line_number,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnmatchedLine {
                line_number,
                section,
                content,
            } => write!(
                f,
                "line {}: unmatched line in {}: '{}'",
                line_number, section, content
            ),
            Diagnostic::DuplicateDependency { line_number, name } => {
                write!(f, "line {}: dependency '{}' already declared", line_number, name)
            }
            Diagnostic::MissingGem { line_number, name } => {
                write!(f, "line {}: dependency '{}' has no spec", line_number, name)
            }
            Diagnostic::OrphanSubDependency { line_number, name } => write!(
                f,
                "line {}: dependency '{}' listed outside of a spec",
                line_number, name
            ),
        }
    }
}

/// A parsed Gemfile.lock.
#[derive(Debug, Clone)]
pub struct Lockfile {
    registry: Registry,
    /// Top-level dependency names from the DEPENDENCIES section.
    roots: Vec<String>,
    primary: Option<String>,
    /// Target platforms, in document order.
    pub platforms: Vec<String>,
    /// Bundler version that generated this lockfile.
    pub bundled_with: Option<String>,
    /// Lines skipped or questioned while parsing.
    pub diagnostics: Vec<Diagnostic>,
}

impl Lockfile {
    /// All gems, in the order they were first mentioned.
    pub fn gems(&self) -> impl Iterator<Item = &Gem> {
        self.registry.iter()
    }

    /// Find a gem by name.
    pub fn gem(&self, name: &str) -> Option<&Gem> {
        self.registry.get(name)
    }

    /// The top-level dependencies, in declaration order.
    pub fn dependencies(&self) -> impl Iterator<Item = &Gem> {
        self.roots.iter().filter_map(|name| self.registry.get(name))
    }

    /// The local-path gem this lockfile belongs to, if any.
    pub fn primary_gem(&self) -> Option<&Gem> {
        self.primary.as_deref().and_then(|name| self.registry.get(name))
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

/// Errors that can occur while parsing a Gemfile.lock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// An element of the line sequence holds more than one line.
    #[error("line {line_number} is not a single line of text")]
    InvalidLine { line_number: usize },
}

/// Errors that can occur while loading a Gemfile.lock from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Gemfile.lock not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse { path: PathBuf, source: ParseError },
}

/// Read and parse the lockfile at `path`.
pub fn load(path: &Path) -> Result<Lockfile, LoadError> {
    if !path.is_file() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
