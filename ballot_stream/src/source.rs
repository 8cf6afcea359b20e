use std::collections::VecDeque;
use std::fmt::Display;

use crate::ballot::Ballot;
use crate::categories::CategoryScheme;
use crate::config::CategoryKind;

/// A reader for one raw ballot file.
///
/// A raw ballot is a list of rank tokens. The first `parties().len()` tokens
/// rank the parties (above the line), the following `candidates().len()`
/// tokens rank the candidates (below the line). A token is either absent or a
/// 1-based rank. Format quirks (such as `*` standing for a first preference)
/// are resolved by the adapter.
pub trait SourceAdapter {
    /// The name of the file being read.
    fn file_name(&self) -> &str;

    /// The parties in above-the-line order, before alias resolution.
    fn parties(&self) -> &[String];

    /// The parties as written in the file, before any cleaning.
    fn parties_unaltered(&self) -> Vec<String> {
        self.parties().to_vec()
    }

    /// Every party contesting this file, including the parties that only
    /// have candidates below the line.
    fn parties_including_secondary(&self) -> Vec<String> {
        self.parties().to_vec()
    }

    /// The candidates in below-the-line order.
    fn candidates(&self) -> &[String];

    /// The party of a candidate, before alias resolution.
    fn party_of(&self, candidate: &str) -> Option<String>;

    /// The party of the candidate at a below-the-line position. Candidates
    /// sharing a name are told apart by their position.
    fn candidate_party_at(&self, idx: usize) -> Option<String> {
        self.candidates().get(idx).and_then(|c| self.party_of(c))
    }

    fn has_more_raw_ballots(&mut self) -> bool;

    /// The tokens of the next ballot, or `None` at the end of the file.
    /// The returned slice is only valid until the next call.
    fn next_raw_ballot(&mut self) -> Option<&[Option<String>]>;

    /// Whether two tokens with the same rank spoil the position.
    fn stops_on_collision(&self) -> bool {
        true
    }
}

/// Everything a stream needs to know about one election.
pub trait ElectionResource {
    type Source: SourceAdapter;
    type Error: Display;

    fn election_name(&self) -> &str;

    /// The canonical parties, in the order used for reports and indices.
    fn party_list(&self) -> &[String];

    /// `(alias, canonical)` pairs, applied in order.
    fn alias_pairs(&self) -> Vec<(String, String)>;

    /// The files to read, in order.
    fn datafile_queue(&self) -> VecDeque<String>;

    fn open_source(&self, file: &str) -> Result<Self::Source, Self::Error>;

    fn min_ranked_above(&self) -> usize;

    fn min_ranked_below(&self) -> usize;

    /// Applied to every ballot after validation.
    fn additional_processing(&self, _ballot: &mut Ballot) {}

    /// The predefined categorization of the given kind, if this election has one.
    fn categorization_scheme(&self, _kind: CategoryKind) -> Option<CategoryScheme> {
        None
    }
}
