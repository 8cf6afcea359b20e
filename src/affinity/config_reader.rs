use std::fs;
use std::str::FromStr;

use ballot_stream::{CategoryKind, CategoryScheme, PartyRef};
use log::debug;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::affinity::*;

/// The format of the data files.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "aec2016")]
    Aec2016,
    #[serde(rename = "aec2019")]
    Aec2019,
    #[serde(rename = "aec2022")]
    Aec2022,
    #[serde(rename = "nsw")]
    Nsw,
    #[serde(rename = "nyc2021")]
    Nyc2021,
}

impl Provider {
    /// The minimum number of ranked parties and candidates for a ballot to be
    /// formal above and below the line.
    pub fn default_minimums(&self) -> (usize, usize) {
        match self {
            Provider::Aec2016 | Provider::Aec2019 | Provider::Aec2022 => (1, 6),
            Provider::Nsw => (1, 15),
            Provider::Nyc2021 => (1, 1),
        }
    }

    /// Only formal ballots are published by NSW.
    pub fn forces_formal(&self) -> bool {
        matches!(self, Provider::Nsw)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSettings {
    pub name: String,
    pub provider: Provider,
    #[serde(rename = "dataLocation")]
    pub data_location: String,
    #[serde(rename = "partyOrder")]
    pub party_order: Option<Vec<String>>,
    #[serde(rename = "partyOrderFile")]
    pub party_order_file: Option<String>,
    #[serde(rename = "aliasFile")]
    pub alias_file: Option<String>,
    #[serde(rename = "candidateFile")]
    pub candidate_file: Option<String>,
    #[serde(rename = "candidacyIdFile")]
    pub candidacy_id_file: Option<String>,
    pub race: Option<String>,
    #[serde(rename = "minRankedAbove")]
    pub min_ranked_above: Option<usize>,
    #[serde(rename = "minRankedBelow")]
    pub min_ranked_below: Option<usize>,
    #[serde(rename = "forceFormal")]
    pub force_formal: Option<bool>,
}

/// A party in a categorization: its canonical name or its index in the
/// party order.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartyRefSetting {
    Index(usize),
    Name(String),
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CategorizationSettings {
    pub kind: String,
    pub categories: Vec<String>,
    pub members: Vec<Vec<PartyRefSetting>>,
    pub remainder: Option<String>,
}

impl CategorizationSettings {
    pub fn kind(&self) -> AffinityResult<CategoryKind> {
        CategoryKind::from_str(&self.kind)
            .ok()
            .context(UnknownCategorizationSnafu {
                kind: self.kind.clone(),
            })
    }

    pub fn scheme(&self) -> CategoryScheme {
        let cats: Vec<&str> = self.categories.iter().map(|c| c.as_str()).collect();
        let members: Vec<Vec<PartyRef>> = self
            .members
            .iter()
            .map(|ms| {
                ms.iter()
                    .map(|m| match m {
                        PartyRefSetting::Index(i) => PartyRef::Index(*i),
                        PartyRefSetting::Name(n) => PartyRef::Name(n.clone()),
                    })
                    .collect()
            })
            .collect();
        match &self.remainder {
            Some(r) => CategoryScheme::with_remainder(&cats, members, r),
            None => CategoryScheme::complete(&cats, members),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisSettings {
    pub categorization: Option<String>,
    #[serde(rename = "usePrimary")]
    pub use_primary: Option<bool>,
    #[serde(rename = "useSecondary")]
    pub use_secondary: Option<bool>,
    #[serde(default)]
    pub comparisons: Vec<(String, String)>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AffinityConfig {
    pub election: ElectionSettings,
    #[serde(default)]
    pub categorizations: Vec<CategorizationSettings>,
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

pub fn read_config(path: &str) -> AffinityResult<AffinityConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: AffinityConfig =
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}
