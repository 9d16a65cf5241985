use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use super::{Gem, GemKind, Lockfile, OptionValue, Registry, Relationship};

/// A nested dependency tree: each key maps to the tree of its dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tree<K: Ord>(pub BTreeMap<K, Tree<K>>);

impl<K: Ord> Default for Tree<K> {
    fn default() -> Self {
        Tree(BTreeMap::new())
    }
}

impl<K: Ord> Tree<K> {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&Tree<K>> {
        self.0.get(key)
    }
}

/// A tree keyed by `(name, version)`.
pub type NvTree = Tree<(String, Option<String>)>;

/// A tree keyed by `"name@version"`.
pub type DependencyTree = Tree<String>;

/// The first path gem, in registry order, is the project the lockfile
/// describes.
pub(crate) fn select_primary(registry: &Registry) -> Option<String> {
    registry
        .iter()
        .find(|gem| gem.kind == Some(GemKind::Path))
        .map(|gem| gem.name.clone())
}

impl Lockfile {
    /// The dependency tree rooted at `name`, keyed by `(name, version)`.
    pub fn nv_tree(&self, name: &str) -> Option<NvTree> {
        let gem = self.gem(name)?;
        Some(self.tree_from(
            gem,
            &|g: &Gem| (g.name.clone(), g.version.clone()),
            &HashSet::new(),
        ))
    }

    /// The dependency tree rooted at `name`, keyed by `"name@version"`.
    pub fn dependency_tree(&self, name: &str) -> Option<DependencyTree> {
        let gem = self.gem(name)?;
        Some(self.tree_from(gem, &|g: &Gem| g.key().to_string(), &HashSet::new()))
    }

    /// Dependencies named in `hidden` are left out together with their
    /// subtrees.
    fn tree_from<K: Ord>(
        &self,
        root: &Gem,
        key: &dyn Fn(&Gem) -> K,
        hidden: &HashSet<String>,
    ) -> Tree<K> {
        let mut ancestors = Vec::new();
        let mut tree = Tree::default();
        tree.0
            .insert(key(root), self.subtree(root, key, hidden, &mut ancestors));
        tree
    }

    fn subtree<'a, K: Ord>(
        &'a self,
        gem: &'a Gem,
        key: &dyn Fn(&Gem) -> K,
        hidden: &HashSet<String>,
        ancestors: &mut Vec<&'a str>,
    ) -> Tree<K> {
        let mut tree = Tree::default();
        // a gem already on the path is rendered as a leaf
        if ancestors.contains(&gem.name.as_str()) {
            return tree;
        }
        ancestors.push(&gem.name);
        let deps = gem
            .dependencies
            .iter()
            .filter(|name| !hidden.contains(name.as_str()))
            .filter_map(|name| self.gem(name));
        for dep in deps {
            let children = self.subtree(dep, key, hidden, ancestors);
            tree.0.insert(key(dep), children);
        }
        ancestors.pop();
        tree
    }

    /// Every relationship reachable from the top-level dependencies, as a
    /// sorted list without duplicates.
    ///
    /// Each top-level dependency appears with no parent. Relationships are
    /// compared by the (provenance, name, version) of both ends.
    pub fn flatten(&self) -> Vec<Relationship> {
        let mut seen: BTreeSet<Relationship> = BTreeSet::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut pending: Vec<&Gem> = Vec::new();

        for root in self.dependencies() {
            seen.insert(Relationship {
                parent: None,
                child: root.key(),
            });
            pending.push(root);
        }

        while let Some(gem) = pending.pop() {
            if !visited.insert(gem.name.as_str()) {
                continue;
            }
            let parent = gem.key();
            for dep in gem.dependencies.iter().filter_map(|name| self.gem(name)) {
                seen.insert(Relationship {
                    parent: Some(parent.clone()),
                    child: dep.key(),
                });
                pending.push(dep);
            }
        }

        seen.into_iter().collect()
    }

    /// The serializable view of `gem`.
    pub fn view(&self, gem: &Gem) -> GemView {
        self.view_excluding(gem, &HashSet::new())
    }

    /// The serializable view of `gem`, with the gems named in `hidden`
    /// pruned from its dependency tree.
    pub fn view_excluding(&self, gem: &Gem, hidden: &HashSet<String>) -> GemView {
        GemView {
            name: gem.name.clone(),
            version: gem.version.clone(),
            platform: gem.platform.clone(),
            pinned: gem.pinned,
            remote: gem.remote.clone(),
            kind: gem.kind,
            path: gem.path.clone(),
            revision: gem.revision.clone(),
            reference: gem.reference.clone(),
            branch: gem.branch.clone(),
            submodules: gem.submodules.clone(),
            tag: gem.tag.clone(),
            requirements: gem.requirements.clone(),
            dependencies: self.tree_from(gem, &|g: &Gem| g.key().to_string(), hidden),
        }
    }
}

/// The flat record of one gem as reported to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GemView {
    pub name: String,
    pub version: Option<String>,
    pub platform: Option<String>,
    pub pinned: bool,
    pub remote: Option<OptionValue>,
    #[serde(rename = "type")]
    pub kind: Option<GemKind>,
    pub path: Option<OptionValue>,
    pub revision: Option<OptionValue>,
    #[serde(rename = "ref")]
    pub reference: Option<OptionValue>,
    pub branch: Option<OptionValue>,
    pub submodules: Option<OptionValue>,
    pub tag: Option<OptionValue>,
    pub requirements: Vec<String>,
    pub dependencies: DependencyTree,
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use super::*;

    const NESTED: &str = "\
PATH
  remote: .
  specs:
    myapp (0.1)
      rails (~> 7.0)

GEM
  remote: https://rubygems.org/
  specs:
    actionpack (7.0.4)
      rack (~> 2.0)
    rack (2.2.4)
    rails (7.0.4)
      actionpack (= 7.0.4)
      rack (>= 2.0)

DEPENDENCIES
  myapp!
  rails
";

    fn key(name: &str, version: &str) -> String {
        format!("{}@{}", name, version)
    }

    #[test]
    fn primary_is_first_path_gem() {
        let lockfile = parse(NESTED).unwrap();
        assert_eq!(lockfile.primary_gem().unwrap().name, "myapp");
    }

    #[test]
    fn no_path_gem_means_no_primary() {
        let lockfile = parse("GEM\n  specs:\n    rake (13.0)\n").unwrap();
        assert!(lockfile.primary_gem().is_none());
    }

    #[test]
    fn dependency_tree_nests_by_name_at_version() {
        let lockfile = parse(NESTED).unwrap();
        let tree = lockfile.dependency_tree("myapp").unwrap();

        let myapp = tree.get(&key("myapp", "0.1")).unwrap();
        let rails = myapp.get(&key("rails", "7.0.4")).unwrap();
        let actionpack = rails.get(&key("actionpack", "7.0.4")).unwrap();
        assert!(actionpack.get(&key("rack", "2.2.4")).unwrap().is_empty());
        assert!(rails.get(&key("rack", "2.2.4")).is_some());
    }

    #[test]
    fn nv_tree_keys_are_name_version_pairs() {
        let lockfile = parse(NESTED).unwrap();
        let tree = lockfile.nv_tree("rails").unwrap();
        let root = tree
            .get(&("rails".to_string(), Some("7.0.4".to_string())))
            .unwrap();
        assert_eq!(root.0.len(), 2);
        assert!(root
            .get(&("rack".to_string(), Some("2.2.4".to_string())))
            .is_some());
    }

    #[test]
    fn tree_of_unknown_gem_is_none() {
        let lockfile = parse(NESTED).unwrap();
        assert!(lockfile.dependency_tree("nope").is_none());
        assert!(lockfile.nv_tree("nope").is_none());
    }

    #[test]
    fn flatten_lists_roots_then_edges() {
        let lockfile = parse(NESTED).unwrap();
        let edges: Vec<String> = lockfile.flatten().iter().map(|r| r.to_string()).collect();
        assert_eq!(
            edges,
            vec![
                "(root) -> myapp@0.1",
                "(root) -> rails@7.0.4",
                "actionpack@7.0.4 -> rack@2.2.4",
                "myapp@0.1 -> rails@7.0.4",
                "rails@7.0.4 -> actionpack@7.0.4",
                "rails@7.0.4 -> rack@2.2.4",
            ]
        );
    }

    #[test]
    fn flatten_has_no_duplicate_keys() {
        let lockfile = parse(NESTED).unwrap();
        let edges = lockfile.flatten();
        let unique: BTreeSet<&Relationship> = edges.iter().collect();
        assert_eq!(unique.len(), edges.len());
    }

    #[test]
    fn flatten_terminates_on_cycles() {
        let input = "\
GEM
  specs:
    a (1.0)
      b
    b (1.0)
      a

DEPENDENCIES
  a
";
        let lockfile = parse(input).unwrap();
        let edges: Vec<String> = lockfile.flatten().iter().map(|r| r.to_string()).collect();
        assert_eq!(edges, vec!["(root) -> a@1.0", "a@1.0 -> b@1.0", "b@1.0 -> a@1.0"]);

        let tree = lockfile.dependency_tree("a").unwrap();
        let a = tree.get(&key("a", "1.0")).unwrap();
        let b = a.get(&key("b", "1.0")).unwrap();
        assert!(b.get(&key("a", "1.0")).unwrap().is_empty());
    }

    #[test]
    fn view_excluding_prunes_hidden_subtrees() {
        let lockfile = parse(NESTED).unwrap();
        let hidden = HashSet::from(["actionpack".to_string()]);
        let view = lockfile.view_excluding(lockfile.gem("myapp").unwrap(), &hidden);

        let myapp = view.dependencies.get(&key("myapp", "0.1")).unwrap();
        let rails = myapp.get(&key("rails", "7.0.4")).unwrap();
        assert!(rails.get(&key("actionpack", "7.0.4")).is_none());
        assert!(rails.get(&key("rack", "2.2.4")).is_some());

        let full = lockfile.view(lockfile.gem("myapp").unwrap());
        assert_ne!(full.dependencies, view.dependencies);
    }

    #[test]
    fn view_serializes_all_fields() {
        let lockfile = parse(NESTED).unwrap();
        let view = lockfile.view(lockfile.gem("myapp").unwrap());
        let value = serde_json::to_value(&view).unwrap();

        assert_eq!(value["name"], "myapp");
        assert_eq!(value["version"], "0.1");
        assert_eq!(value["platform"], "ruby");
        assert_eq!(value["pinned"], true);
        assert_eq!(value["type"], "PATH");
        assert_eq!(value["path"], ".");
        assert!(value["ref"].is_null());
        assert!(value["submodules"].is_null());
        assert!(value["dependencies"]["myapp@0.1"]["rails@7.0.4"].is_object());
    }
}
