//! Line matchers, one per line shape of a Gemfile.lock.
//!
//! Every matcher takes a right-trimmed line and returns `None` when the line
//! does not have its shape. Leading indentation is part of the shape.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{OptionKey, OptionValue};

/// `name` or `name (version[-platform])`.
///
/// A name is anything but a space, parentheses, comma, bang or colon. The
/// version runs up to the first dash; whatever follows the dash is the
/// platform.
macro_rules! name_version {
    () => {
        r"(?P<name>[^ )(,!:]+)(?: \((?P<version>[^-]*)(?:-(?P<platform>[^!]*))?\))?"
    };
}

static OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^  (?P<key>[a-z]+):(?: (?P<value>.*))?$").expect("option pattern"));

static SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!("^ {4}", name_version!(), "$")).expect("spec pattern")
});

static SPEC_DEPENDENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!("^ {6}", name_version!(), "$")).expect("spec dependency pattern")
});

static DEPENDENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!("^ {2}", name_version!(), "(?P<pinned>!)?$")).expect("dependency pattern")
});

static PLATFORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^  (?P<platform>.*)$").expect("platform pattern"));

static BUNDLED_WITH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+(?P<version>(?:\d+\.)+\d+)\s*$").expect("bundled with pattern")
});

/// The fields of a `name (version-platform)` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NameVersion<'a> {
    pub name: &'a str,
    /// A resolved version on spec lines, a constraint list elsewhere.
    pub version: Option<&'a str>,
    pub platform: Option<&'a str>,
}

impl<'a> NameVersion<'a> {
    fn from_captures(caps: &Captures<'a>) -> Option<Self> {
        let non_empty = |group: &str| caps.name(group).map(|m| m.as_str()).filter(|s| !s.is_empty());
        Some(NameVersion {
            name: non_empty("name")?,
            version: non_empty("version"),
            platform: non_empty("platform"),
        })
    }

    /// The version field read as a comma-separated constraint list.
    pub fn constraints(&self) -> Vec<&'a str> {
        self.version.map(split_constraints).unwrap_or_default()
    }
}

/// A DEPENDENCIES entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DependencyLine<'a> {
    pub spec: NameVersion<'a>,
    pub pinned: bool,
}

/// `  key: value` under a source section. An empty value reads as `None`.
/// Keys outside the supported set are treated as no match.
pub(crate) fn match_option(line: &str) -> Option<(OptionKey, Option<OptionValue>)> {
    let caps = OPTION.captures(line)?;
    let key = OptionKey::from_key(caps.name("key")?.as_str())?;
    let value = match caps.name("value").map(|m| m.as_str()) {
        Some("true") => Some(OptionValue::Flag(true)),
        Some("false") => Some(OptionValue::Flag(false)),
        Some("") | None => None,
        Some(text) => Some(OptionValue::Text(text.to_string())),
    };
    Some((key, value))
}

/// Returns true for any `  key: value` line, supported key or not.
pub(crate) fn is_option_line(line: &str) -> bool {
    OPTION.is_match(line)
}

/// `    name (version-platform)`: a resolved gem under `specs:`.
pub(crate) fn match_spec(line: &str) -> Option<NameVersion<'_>> {
    let caps = SPEC.captures(line)?;
    NameVersion::from_captures(&caps)
}

/// `      name (constraint, ...)`: a direct dependency of the spec above.
pub(crate) fn match_spec_dependency(line: &str) -> Option<NameVersion<'_>> {
    let caps = SPEC_DEPENDENCY.captures(line)?;
    NameVersion::from_captures(&caps)
}

/// `  name (constraint, ...)!` under DEPENDENCIES.
pub(crate) fn match_dependency(line: &str) -> Option<DependencyLine<'_>> {
    let caps = DEPENDENCY.captures(line)?;
    Some(DependencyLine {
        spec: NameVersion::from_captures(&caps)?,
        pinned: caps.name("pinned").is_some(),
    })
}

/// `  platform` under PLATFORMS.
pub(crate) fn match_platform(line: &str) -> Option<&str> {
    let caps = PLATFORM.captures(line)?;
    let platform = caps.name("platform")?.as_str().trim();
    (!platform.is_empty()).then_some(platform)
}

/// `   2.4.10` under BUNDLED WITH.
pub(crate) fn match_bundled_with(line: &str) -> Option<&str> {
    let caps = BUNDLED_WITH.captures(line)?;
    Some(caps.name("version")?.as_str())
}

/// Split `"~> 2.0, >= 2.0.8"` into its constraints.
pub(crate) fn split_constraints(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Options ==========

    #[test]
    fn option_remote() {
        let (key, value) = match_option("  remote: https://rubygems.org/").unwrap();
        assert_eq!(key, OptionKey::Remote);
        assert_eq!(value, Some(OptionValue::Text("https://rubygems.org/".to_string())));
    }

    #[test]
    fn option_booleans_are_normalized() {
        let (_, value) = match_option("  submodules: true").unwrap();
        assert_eq!(value, Some(OptionValue::Flag(true)));
        let (_, value) = match_option("  submodules: false").unwrap();
        assert_eq!(value, Some(OptionValue::Flag(false)));
    }

    #[test]
    fn option_unknown_key_is_discarded() {
        assert!(match_option("  glob: *.gemspec").is_none());
    }

    #[test]
    fn unknown_option_still_has_option_shape() {
        assert!(is_option_line("  glob: *.gemspec"));
        assert!(!is_option_line("  specs"));
    }

    #[test]
    fn option_requires_two_space_indent() {
        assert!(match_option("    remote: .").is_none());
        assert!(match_option("remote: .").is_none());
    }

    #[test]
    fn option_without_value_reads_as_none() {
        assert_eq!(match_option("  remote:"), Some((OptionKey::Remote, None)));
        assert_eq!(match_option("  branch: "), Some((OptionKey::Branch, None)));
        assert!(match_option("  glob:").is_none());
        assert!(is_option_line("  glob:"));
        assert!(match_option("  remote:.").is_none());
    }

    // ========== Specs ==========

    #[test]
    fn spec_name_and_version() {
        let nv = match_spec("    rake (13.0.6)").unwrap();
        assert_eq!(nv.name, "rake");
        assert_eq!(nv.version, Some("13.0.6"));
        assert_eq!(nv.platform, None);
    }

    #[test]
    fn spec_with_platform() {
        let nv = match_spec("    nokogiri (1.13.10-x86_64-linux)").unwrap();
        assert_eq!(nv.name, "nokogiri");
        assert_eq!(nv.version, Some("1.13.10"));
        assert_eq!(nv.platform, Some("x86_64-linux"));
    }

    #[test]
    fn spec_with_java_platform() {
        let nv = match_spec("    json (1.8.0-java)").unwrap();
        assert_eq!(nv.version, Some("1.8.0"));
        assert_eq!(nv.platform, Some("java"));
    }

    #[test]
    fn spec_without_version() {
        let nv = match_spec("    foo").unwrap();
        assert_eq!(nv.name, "foo");
        assert_eq!(nv.version, None);
    }

    #[test]
    fn spec_rejects_other_indents() {
        assert!(match_spec("  rake (13.0.6)").is_none());
        assert!(match_spec("      rake (13.0.6)").is_none());
    }

    #[test]
    fn spec_rejects_pin_marker() {
        assert!(match_spec("    rake (13.0.6)!").is_none());
    }

    #[test]
    fn spec_rejects_garbage() {
        assert!(match_spec("    rake (13.0.6").is_none());
        assert!(match_spec("    rake: 13").is_none());
    }

    // ========== Spec dependencies ==========

    #[test]
    fn spec_dependency_constraint_list() {
        let nv = match_spec_dependency("      rack (~> 2.0, >= 2.0.8)").unwrap();
        assert_eq!(nv.name, "rack");
        assert_eq!(nv.constraints(), vec!["~> 2.0", ">= 2.0.8"]);
    }

    #[test]
    fn spec_dependency_without_constraint() {
        let nv = match_spec_dependency("      method_source").unwrap();
        assert_eq!(nv.name, "method_source");
        assert!(nv.constraints().is_empty());
    }

    #[test]
    fn spec_dependency_rejects_spec_indent() {
        assert!(match_spec_dependency("    rack (2.2.0)").is_none());
    }

    // ========== Dependencies ==========

    #[test]
    fn dependency_plain() {
        let dep = match_dependency("  rails").unwrap();
        assert_eq!(dep.spec.name, "rails");
        assert!(dep.spec.constraints().is_empty());
        assert!(!dep.pinned);
    }

    #[test]
    fn dependency_with_constraints_and_pin() {
        let dep = match_dependency("  foo (>= 1.0, < 2.0)!").unwrap();
        assert_eq!(dep.spec.name, "foo");
        assert_eq!(dep.spec.constraints(), vec![">= 1.0", "< 2.0"]);
        assert!(dep.pinned);
    }

    #[test]
    fn dependency_pinned_without_constraint() {
        let dep = match_dependency("  jquery-rails!").unwrap();
        assert_eq!(dep.spec.name, "jquery-rails");
        assert!(dep.pinned);
    }

    #[test]
    fn dependency_rejects_deeper_indent() {
        assert!(match_dependency("    rails").is_none());
    }

    // ========== Platforms and Bundler ==========

    #[test]
    fn platform_line() {
        assert_eq!(match_platform("  x86_64-linux"), Some("x86_64-linux"));
        assert_eq!(match_platform("  ruby"), Some("ruby"));
        assert_eq!(match_platform("ruby"), None);
    }

    #[test]
    fn bundled_with_version() {
        assert_eq!(match_bundled_with("   2.4.10"), Some("2.4.10"));
        assert_eq!(match_bundled_with("  1.17.3  "), Some("1.17.3"));
    }

    #[test]
    fn bundled_with_rejects_non_numeric() {
        assert!(match_bundled_with("   2").is_none());
        assert!(match_bundled_with("   2.x.1").is_none());
        assert!(match_bundled_with("2.4.10").is_none());
    }

    #[test]
    fn split_constraints_trims_and_drops_empty() {
        assert_eq!(split_constraints(" >= 1.0 ,, < 2 "), vec![">= 1.0", "< 2"]);
        assert!(split_constraints("").is_empty());
    }
}
