use std::collections::HashMap;

use log::debug;
use snafu::{ensure, OptionExt};

use crate::alias::AliasTable;
use crate::config::*;

/// A reference to a party in a predefined categorization: either its
/// position in the party order of the election, or one of its names.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum PartyRef {
    Index(usize),
    Name(String),
}

impl From<usize> for PartyRef {
    fn from(idx: usize) -> Self {
        PartyRef::Index(idx)
    }
}

impl From<&str> for PartyRef {
    fn from(name: &str) -> Self {
        PartyRef::Name(name.to_string())
    }
}

/// A predefined grouping of the parties of an election.
///
/// `members[i]` lists the parties of `categories[i]`. When a remainder label
/// is given, it becomes the last category and collects every party that is
/// not listed.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CategoryScheme {
    pub categories: Vec<String>,
    pub members: Vec<Vec<PartyRef>>,
    pub remainder: Option<String>,
}

impl CategoryScheme {
    /// A scheme that lists every party explicitly.
    pub fn complete(categories: &[&str], members: Vec<Vec<PartyRef>>) -> CategoryScheme {
        CategoryScheme {
            categories: categories.iter().map(|c| c.to_string()).collect(),
            members,
            remainder: None,
        }
    }

    /// A scheme in which the unlisted parties go to the `remainder` category.
    pub fn with_remainder(
        categories: &[&str],
        members: Vec<Vec<PartyRef>>,
        remainder: &str,
    ) -> CategoryScheme {
        CategoryScheme {
            categories: categories.iter().map(|c| c.to_string()).collect(),
            members,
            remainder: Some(remainder.to_string()),
        }
    }

    /// Turns the scheme into the list of categories and the party to category
    /// map of an election.
    pub fn resolve(
        &self,
        parties: &[Name],
        aliases: &AliasTable,
    ) -> Result<(Vec<String>, HashMap<String, String>), CategorizationError> {
        ensure!(
            self.categories.len() == self.members.len(),
            MissingPartySnafu {
                party: format!(
                    "{} categories but {} member lists",
                    self.categories.len(),
                    self.members.len()
                )
            }
        );
        let mut categories = self.categories.clone();
        let mut map: HashMap<String, String> = HashMap::new();
        for (cat, refs) in self.categories.iter().zip(self.members.iter()) {
            for r in refs.iter() {
                let party: &Name = match r {
                    PartyRef::Index(idx) => parties
                        .get(*idx)
                        .context(MissingPartySnafu { party: format!("#{}", idx) })?,
                    PartyRef::Name(name) => aliases
                        .resolve(name)
                        .context(MissingPartySnafu { party: name.clone() })?,
                };
                map.insert(party.to_string(), cat.clone());
            }
        }
        if let Some(rem) = &self.remainder {
            categories.push(rem.clone());
            for p in parties.iter() {
                if !map.contains_key(&**p) {
                    map.insert(p.to_string(), rem.clone());
                }
            }
        }
        Ok((categories, map))
    }
}

/// An active grouping of the canonical parties into categories.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CategoryOverlay {
    parties: Vec<Name>,
    categories: Vec<Name>,
    // Party to category, and every category to itself.
    lookup: HashMap<String, Name>,
}

impl CategoryOverlay {
    /// Checks that every party belongs to one of the categories.
    pub fn new(
        parties: &[Name],
        categories: &[String],
        map: &HashMap<String, String>,
    ) -> Result<CategoryOverlay, CategorizationError> {
        for p in parties.iter() {
            let cat = map
                .get(&**p)
                .context(MissingPartySnafu { party: p.to_string() })?;
            ensure!(
                categories.contains(cat),
                MissingPartySnafu { party: p.to_string() }
            );
        }

        let cats: Vec<Name> = categories.iter().map(|c| Name::from(c.as_str())).collect();
        let mut lookup: HashMap<String, Name> = HashMap::new();
        for (party, cat) in map.iter() {
            match cats.iter().find(|c| ***c == **cat) {
                Some(c) => {
                    lookup.insert(party.clone(), c.clone());
                }
                None => {
                    debug!(
                        "CategoryOverlay::new: ignoring {:?}: unknown category {:?}",
                        party, cat
                    );
                }
            }
        }
        for c in cats.iter() {
            lookup.insert(c.to_string(), c.clone());
        }
        Ok(CategoryOverlay {
            parties: parties.to_vec(),
            categories: cats,
            lookup,
        })
    }

    /// The category of a canonical party. A category name resolves to itself.
    pub fn category_of(&self, name: &str) -> Option<&Name> {
        self.lookup.get(name)
    }

    pub fn categories(&self) -> &[Name] {
        &self.categories
    }

    pub fn index_of(&self, category: &str) -> Option<usize> {
        self.categories.iter().position(|c| &**c == category)
    }

    /// The parties of a category, in party order.
    pub fn members(&self, category: &str) -> Vec<Name> {
        self.parties
            .iter()
            .filter(|p| self.category_of(p).map(|c| &**c) == Some(category))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
