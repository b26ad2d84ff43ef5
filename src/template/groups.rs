//! Script groups keyed by target reference, in discovery order.

use rustc_hash::FxHashMap;
use serde::{Serialize, Serializer};

/// Sources of one produced artifact. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptGroup {
    pub key: String,
    pub sources: Vec<String>,
}

/// Ordered `key → sources` mapping.
///
/// Keys keep first-discovery order; sources keep document order and may
/// repeat.
#[derive(Debug, Clone, Default)]
pub struct ScriptGroups {
    groups: Vec<ScriptGroup>,
    index: FxHashMap<String, usize>,
}

impl ScriptGroups {
    /// Append `source` to the group of `key`, creating it on first sight.
    pub fn push(&mut self, key: &str, source: &str) {
        match self.index.get(key) {
            Some(&i) => self.groups[i].sources.push(source.to_owned()),
            None => {
                self.index.insert(key.to_owned(), self.groups.len());
                self.groups.push(ScriptGroup {
                    key: key.to_owned(),
                    sources: vec![source.to_owned()],
                });
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.index
            .get(key)
            .map(|&i| self.groups[i].sources.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScriptGroup> {
        self.groups.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<'a> IntoIterator for &'a ScriptGroups {
    type Item = &'a ScriptGroup;
    type IntoIter = std::slice::Iter<'a, ScriptGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

// Serialized as a JSON object in discovery order
impl Serialize for ScriptGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.groups.iter().map(|g| (&g.key, &g.sources)))
    }
}
