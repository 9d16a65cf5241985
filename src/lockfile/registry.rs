use std::collections::HashMap;

use super::Gem;

/// Every gem of one document, keyed by name and kept in first-seen order.
///
/// Gems refer to their dependencies by name, so the registry is the only
/// owner of gem records.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    gems: Vec<Gem>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the gem named `name`, creating it when absent.
    ///
    /// An existing gem keeps its version and platform; the given values only
    /// fill fields that are still empty.
    pub fn get_or_create(
        &mut self,
        name: &str,
        version: Option<&str>,
        platform: Option<&str>,
    ) -> &mut Gem {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                self.gems.push(Gem::new(name));
                let idx = self.gems.len() - 1;
                self.index.insert(name.to_string(), idx);
                idx
            }
        };

        let gem = &mut self.gems[idx];
        if gem.version.is_none() {
            gem.version = version.map(str::to_string);
        }
        if gem.platform.is_none() {
            gem.platform = platform.map(str::to_string);
        }
        gem
    }

    pub fn get(&self, name: &str) -> Option<&Gem> {
        self.index.get(name).map(|&idx| &self.gems[idx])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Gem> {
        self.index.get(name).map(|&idx| &mut self.gems[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Gem> {
        self.gems.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Gem> {
        self.gems.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.gems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gems.is_empty()
    }
}
