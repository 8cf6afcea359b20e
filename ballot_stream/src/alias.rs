use std::collections::HashMap;

use log::debug;

use crate::config::Name;

/// Maps the names found in raw files to canonical party names.
///
/// Every canonical name maps to itself, so resolving twice gives the same
/// result as resolving once. When the same alias is given several times, the
/// last entry wins.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct AliasTable {
    table: HashMap<String, Name>,
}

impl AliasTable {
    pub fn new<S: AsRef<str>, A: AsRef<str>, C: AsRef<str>>(
        canonical: &[S],
        pairs: &[(A, C)],
    ) -> AliasTable {
        let mut table: HashMap<String, Name> = HashMap::new();
        for c in canonical.iter() {
            table.insert(c.as_ref().to_string(), Name::from(c.as_ref()));
        }
        for (alias, real) in pairs.iter() {
            if let Some(previous) = table.insert(alias.as_ref().to_string(), Name::from(real.as_ref())) {
                if &*previous != real.as_ref() {
                    debug!(
                        "AliasTable::new: alias {:?} remapped from {:?} to {:?}",
                        alias.as_ref(),
                        previous,
                        real.as_ref()
                    );
                }
            }
        }
        AliasTable { table }
    }

    /// The canonical name for a raw name, if the table knows it.
    pub fn resolve(&self, raw: &str) -> Option<&Name> {
        self.table.get(raw)
    }

    /// True when both names designate the same party, whether they are given
    /// in raw or canonical form.
    pub fn names_equal(&self, a: &str, b: &str) -> bool {
        let ra = self.resolve(a).map(|n| &**n);
        let rb = self.resolve(b).map(|n| &**n);
        a == b || ra == Some(b) || rb == Some(a) || (ra.is_some() && ra == rb)
    }

    pub fn contains(&self, raw: &str) -> bool {
        self.table.contains_key(raw)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
