use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use super::graph::select_primary;
use super::matchers::{
    is_option_line, match_bundled_with, match_dependency, match_option, match_platform, match_spec,
    match_spec_dependency,
};
use super::*;

/// The sub-header that opens the spec list of a source section.
const SPECS: &str = "  specs:";

/// Never recorded as a dependency of a spec.
const BUNDLER: &str = "bundler";

/// The handler lines are dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Options,
    Specs,
    Platforms,
    Dependencies,
    BundledWith,
}

impl Section {
    /// Match a section header line. Source headers also name a gem kind.
    fn from_header(line: &str) -> Option<(Section, Option<GemKind>)> {
        match line {
            "GEM" => Some((Section::Options, Some(GemKind::Registry))),
            "PATH" => Some((Section::Options, Some(GemKind::Path))),
            "GIT" => Some((Section::Options, Some(GemKind::Git))),
            "SVN" => Some((Section::Options, Some(GemKind::Svn))),
            SPECS => Some((Section::Specs, None)),
            "PLATFORMS" => Some((Section::Platforms, None)),
            "DEPENDENCIES" => Some((Section::Dependencies, None)),
            "BUNDLED WITH" => Some((Section::BundledWith, None)),
            _ => None,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::None => "none",
            Section::Options => "source options",
            Section::Specs => "specs",
            Section::Platforms => "PLATFORMS",
            Section::Dependencies => "DEPENDENCIES",
            Section::BundledWith => "BUNDLED WITH",
        };
        f.write_str(name)
    }
}

/// Parse a Gemfile.lock string into a `Lockfile`.
pub fn parse(input: &str) -> Result<Lockfile, ParseError> {
    parse_lines(input.lines())
}

/// Parse a Gemfile.lock given as a sequence of lines.
///
/// Each item must be exactly one line; trailing whitespace is ignored and
/// leading whitespace is significant.
pub fn parse_lines<I, S>(lines: I) -> Result<Lockfile, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = LockfileParser::new();
    for (idx, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        let line_number = idx + 1;
        if line.contains('\n') {
            return Err(ParseError::InvalidLine { line_number });
        }
        parser.feed(line_number, line.trim_end());
    }
    Ok(parser.finish())
}

/// Parsing state for one document.
struct LockfileParser {
    registry: Registry,
    roots: Vec<String>,
    platforms: Vec<String>,
    bundled_with: Option<String>,
    diagnostics: Vec<Diagnostic>,

    section: Section,
    // Scratch data of the current block, cleared by a blank line.
    current_kind: Option<GemKind>,
    current_options: BTreeMap<OptionKey, Option<OptionValue>>,
    current_gem: Option<String>,
}

impl LockfileParser {
    fn new() -> Self {
        LockfileParser {
            registry: Registry::new(),
            roots: Vec::new(),
            platforms: Vec::new(),
            bundled_with: None,
            diagnostics: Vec::new(),
            section: Section::None,
            current_kind: None,
            current_options: BTreeMap::new(),
            current_gem: None,
        }
    }

    fn reset(&mut self) {
        self.section = Section::None;
        self.current_kind = None;
        self.current_options.clear();
        self.current_gem = None;
    }

    fn feed(&mut self, line_number: usize, line: &str) {
        if line.is_empty() {
            self.reset();
            return;
        }

        if let Some((section, kind)) = Section::from_header(line) {
            if kind.is_some() {
                self.current_kind = kind;
            }
            self.section = section;
            return;
        }

        match self.section {
            Section::Options => self.parse_option(line_number, line),
            Section::Specs => self.parse_spec(line_number, line),
            Section::Dependencies => self.parse_dependency(line_number, line),
            Section::Platforms => self.parse_platform(line_number, line),
            Section::BundledWith => self.parse_bundled_with(line_number, line),
            Section::None => {}
        }
    }

    fn unmatched(&mut self, line_number: usize, line: &str) {
        debug!(line_number, section = %self.section, line, "skipping unmatched line");
        self.diagnostics.push(Diagnostic::UnmatchedLine {
            line_number,
            section: self.section.to_string(),
            content: line.to_string(),
        });
    }

    fn parse_option(&mut self, line_number: usize, line: &str) {
        match match_option(line) {
            Some((key, value)) => {
                self.current_options.insert(key, value);
            }
            None if is_option_line(line) => {
                debug!(line_number, line, "dropping unsupported option");
            }
            None => self.unmatched(line_number, line),
        }
    }

    fn parse_spec(&mut self, line_number: usize, line: &str) {
        if let Some(spec) = match_spec(line) {
            let platform = spec.platform.unwrap_or(DEFAULT_PLATFORM);
            let gem = self
                .registry
                .get_or_create(spec.name, spec.version, Some(platform));
            gem.define(self.current_kind);
            if let Some(version) = spec.version {
                gem.version = Some(version.to_string());
            }
            gem.platform = Some(platform.to_string());
            for (key, value) in &self.current_options {
                gem.apply_option(*key, value.clone());
            }
            self.current_gem = Some(spec.name.to_string());
            return;
        }

        let Some(dep) = match_spec_dependency(line) else {
            self.unmatched(line_number, line);
            return;
        };
        if dep.name == BUNDLER {
            return;
        }
        let Some(parent) = self.current_gem.clone() else {
            debug!(line_number, name = dep.name, "dependency listed outside of a spec");
            self.diagnostics.push(Diagnostic::OrphanSubDependency {
                line_number,
                name: dep.name.to_string(),
            });
            return;
        };

        let child = self.registry.get_or_create(dep.name, None, None);
        if child.kind.is_none() {
            child.kind = Some(GemKind::Registry);
        }
        for constraint in dep.constraints() {
            child.add_requirement(constraint);
        }
        if let Some(parent) = self.registry.get_mut(&parent) {
            parent.add_dependency(dep.name);
        }
    }

    fn parse_dependency(&mut self, line_number: usize, line: &str) {
        let Some(dep) = match_dependency(line) else {
            self.unmatched(line_number, line);
            return;
        };
        let name = dep.spec.name;

        if !self.registry.contains(name) && name != BUNDLER {
            warn!(line_number, name, "dependency has no spec");
            self.diagnostics.push(Diagnostic::MissingGem {
                line_number,
                name: name.to_string(),
            });
        }
        let gem = self.registry.get_or_create(name, None, None);
        gem.prepend_requirements(&dep.spec.constraints());
        gem.pinned = dep.pinned;

        if self.roots.iter().any(|root| root == name) {
            warn!(line_number, name, "dependency already declared");
            self.diagnostics.push(Diagnostic::DuplicateDependency {
                line_number,
                name: name.to_string(),
            });
        } else {
            self.roots.push(name.to_string());
        }
    }

    fn parse_platform(&mut self, line_number: usize, line: &str) {
        match match_platform(line) {
            Some(platform) => self.platforms.push(platform.to_string()),
            None => self.unmatched(line_number, line),
        }
    }

    fn parse_bundled_with(&mut self, line_number: usize, line: &str) {
        match match_bundled_with(line) {
            Some(version) => self.bundled_with = Some(version.to_string()),
            None => self.unmatched(line_number, line),
        }
    }

    /// Refine every gem and pick the primary one.
    fn finish(mut self) -> Lockfile {
        self.registry.iter_mut().for_each(Gem::refine);
        let primary = select_primary(&self.registry);

        debug!(
            gems = self.registry.len(),
            dependencies = self.roots.len(),
            diagnostics = self.diagnostics.len(),
            primary = primary.as_deref(),
            "parsed lockfile"
        );

        Lockfile {
            registry: self.registry,
            roots: self.roots,
            primary,
            platforms: self.platforms,
            bundled_with: self.bundled_with,
            diagnostics: self.diagnostics,
        }
    }
}
