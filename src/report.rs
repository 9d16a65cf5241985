use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::lockfile::{Diagnostic, Gem, GemKind, GemView, Lockfile, Relationship};

/// Report options.
#[derive(Debug, Default)]
pub struct ReportOptions {
    /// Gem names to leave out of the report.
    pub ignore: HashSet<String>,
    /// Treat diagnostics as a failure.
    pub strict: bool,
}

/// Everything a renderer prints about one lockfile.
#[derive(Debug)]
pub struct Report {
    pub primary_gem: Option<GemView>,
    pub platforms: Vec<String>,
    pub bundled_with: Option<String>,
    /// Top-level dependencies, in declaration order.
    pub dependencies: Vec<GemView>,
    /// Every gem, in first-mention order.
    pub packages: Vec<GemView>,
    pub relationships: Vec<Relationship>,
    pub diagnostics: Vec<Diagnostic>,
    strict: bool,
}

impl Report {
    /// Assemble the report for `lockfile`, leaving out ignored gems, any
    /// relationship that touches one and their branches of every nested
    /// dependency tree.
    pub fn build(lockfile: &Lockfile, options: &ReportOptions) -> Self {
        let keep = |name: &str| !options.ignore.contains(name);
        let view = |gem: &Gem| lockfile.view_excluding(gem, &options.ignore);

        let dependencies = lockfile
            .dependencies()
            .filter(|gem| keep(&gem.name))
            .map(view)
            .collect();

        let packages = lockfile
            .gems()
            .filter(|gem| keep(&gem.name))
            .map(view)
            .collect();

        let relationships = lockfile
            .flatten()
            .into_iter()
            .filter(|rel| {
                keep(&rel.child.name) && rel.parent.as_ref().is_none_or(|p| keep(&p.name))
            })
            .collect();

        Report {
            primary_gem: lockfile
                .primary_gem()
                .filter(|gem| keep(&gem.name))
                .map(view),
            platforms: lockfile.platforms.clone(),
            bundled_with: lockfile.bundled_with.clone(),
            dependencies,
            packages,
            relationships,
            diagnostics: lockfile.diagnostics.clone(),
            strict: options.strict,
        }
    }

    /// Returns true if the report should fail the run.
    pub fn failed(&self) -> bool {
        self.strict && !self.diagnostics.is_empty()
    }

    /// Number of reported gems per provenance, in `GEM`, `PATH`, `GIT`,
    /// `SVN` order. Gems without a provenance are not counted.
    pub fn kind_counts(&self) -> BTreeMap<GemKind, usize> {
        let mut counts = BTreeMap::new();
        for kind in self.packages.iter().filter_map(|gem| gem.kind) {
            *counts.entry(kind).or_insert(0) += 1;
        }
        counts
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} gems, {} dependencies, {} relationships",
            self.packages.len(),
            self.dependencies.len(),
            self.relationships.len()
        )
    }
}
