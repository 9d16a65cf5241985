//! Parse Bundler `Gemfile.lock` files into a dependency graph.
//!
//! ```
//! let lockfile = gem_lockgraph::lockfile::parse(
//!     "GEM\n  remote: https://rubygems.org/\n  specs:\n    rake (13.0.6)\n\nDEPENDENCIES\n  rake\n",
//! )
//! .unwrap();
//! assert_eq!(lockfile.gem("rake").unwrap().version.as_deref(), Some("13.0.6"));
//! assert_eq!(lockfile.flatten().len(), 1);
//! ```

pub mod configuration;
pub mod format;
pub mod lockfile;
pub mod report;
