use std::collections::VecDeque;
use std::fmt::Display;

use crate::config::*;
use crate::{Ballot, CategoryScheme, ElectionResource, SourceAdapter};

/// An election held in memory, for tests and examples.
///
/// ```
/// use ballot_stream::builder::{Builder, FileBuilder};
/// use ballot_stream::BallotStream;
///
/// let election = Builder::new("Senate")
///     .parties(&["Greens", "Labor"])
///     .alias("Grn (WA)", "Greens")
///     .minimums(1, 2)
///     .file(
///         FileBuilder::new("wa.csv")
///             .parties(&["Grn (WA)", "Labor"])
///             .candidates(&[("Jane", "Grn (WA)"), ("Bob", "Labor")])
///             .row(&["2", "1", "", ""])
///             .row(&["", "", "2", "1"]),
///     )
///     .build();
///
/// let mut stream = BallotStream::new(election);
/// let first = stream.next_ballot().map(|b| b.status());
/// assert_eq!(first, Some(ballot_stream::BallotStatus::AboveTheLine));
/// let second = stream.next_ballot().map(|b| b.status());
/// assert_eq!(second, Some(ballot_stream::BallotStatus::BelowTheLine));
/// assert!(stream.next_ballot().is_none());
/// ```
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Builder {
    name: String,
    parties: Vec<String>,
    aliases: Vec<(String, String)>,
    files: Vec<FileBuilder>,
    min_above: usize,
    min_below: usize,
    force_formal: bool,
    schemes: Vec<(CategoryKind, CategoryScheme)>,
}

impl Builder {
    /// A new election, with the minimums of an Australian senate ballot
    /// (one party above the line, six candidates below).
    pub fn new(name: &str) -> Builder {
        Builder {
            name: name.to_string(),
            parties: Vec::new(),
            aliases: Vec::new(),
            files: Vec::new(),
            min_above: 1,
            min_below: 6,
            force_formal: false,
            schemes: Vec::new(),
        }
    }

    /// The canonical parties.
    pub fn parties(mut self, parties: &[&str]) -> Builder {
        self.parties = parties.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn alias(mut self, alias: &str, canonical: &str) -> Builder {
        self.aliases.push((alias.to_string(), canonical.to_string()));
        self
    }

    pub fn minimums(mut self, above: usize, below: usize) -> Builder {
        self.min_above = above;
        self.min_below = below;
        self
    }

    /// Every ballot is made formal after validation.
    pub fn force_formal(mut self) -> Builder {
        self.force_formal = true;
        self
    }

    pub fn scheme(mut self, kind: CategoryKind, scheme: CategoryScheme) -> Builder {
        self.schemes.push((kind, scheme));
        self
    }

    pub fn file(mut self, file: FileBuilder) -> Builder {
        self.files.push(file);
        self
    }

    pub fn build(self) -> MemoryElection {
        MemoryElection { builder: self }
    }
}

/// The content of one raw file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FileBuilder {
    name: String,
    parties: Vec<String>,
    secondary_parties: Vec<String>,
    candidates: Vec<String>,
    candidate_parties: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    stops_on_collision: bool,
    unreadable: bool,
}

impl FileBuilder {
    pub fn new(name: &str) -> FileBuilder {
        FileBuilder {
            name: name.to_string(),
            parties: Vec::new(),
            secondary_parties: Vec::new(),
            candidates: Vec::new(),
            candidate_parties: Vec::new(),
            rows: Vec::new(),
            stops_on_collision: true,
            unreadable: false,
        }
    }

    /// The above-the-line parties, as written in the file.
    pub fn parties(mut self, parties: &[&str]) -> FileBuilder {
        self.parties = parties.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Parties that only run below the line.
    pub fn secondary_parties(mut self, parties: &[&str]) -> FileBuilder {
        self.secondary_parties = parties.iter().map(|p| p.to_string()).collect();
        self
    }

    /// The below-the-line candidates, with their party.
    pub fn candidates(mut self, candidates: &[(&str, &str)]) -> FileBuilder {
        self.candidates = candidates.iter().map(|(c, _)| c.to_string()).collect();
        self.candidate_parties = candidates.iter().map(|(_, p)| p.to_string()).collect();
        self
    }

    /// Adds a ballot. Empty tokens are blanks.
    pub fn row(mut self, tokens: &[&str]) -> FileBuilder {
        self.rows.push(
            tokens
                .iter()
                .map(|t| {
                    if t.is_empty() {
                        None
                    } else {
                        Some(t.to_string())
                    }
                })
                .collect(),
        );
        self
    }

    /// Repeated ranks overwrite each other instead of spoiling the position.
    pub fn no_collisions(mut self) -> FileBuilder {
        self.stops_on_collision = false;
        self
    }

    /// The file fails to open.
    pub fn unreadable(mut self) -> FileBuilder {
        self.unreadable = true;
        self
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MemoryError {
    pub file: String,
}

impl Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot read {:?}", self.file)
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MemoryElection {
    builder: Builder,
}

impl ElectionResource for MemoryElection {
    type Source = MemorySource;
    type Error = MemoryError;

    fn election_name(&self) -> &str {
        &self.builder.name
    }

    fn party_list(&self) -> &[String] {
        &self.builder.parties
    }

    fn alias_pairs(&self) -> Vec<(String, String)> {
        self.builder.aliases.clone()
    }

    fn datafile_queue(&self) -> VecDeque<String> {
        self.builder.files.iter().map(|f| f.name.clone()).collect()
    }

    fn open_source(&self, file: &str) -> Result<MemorySource, MemoryError> {
        match self.builder.files.iter().find(|f| f.name == file) {
            Some(f) if !f.unreadable => Ok(MemorySource {
                file: f.clone(),
                next: 0,
            }),
            _ => Err(MemoryError {
                file: file.to_string(),
            }),
        }
    }

    fn min_ranked_above(&self) -> usize {
        self.builder.min_above
    }

    fn min_ranked_below(&self) -> usize {
        self.builder.min_below
    }

    fn additional_processing(&self, ballot: &mut Ballot) {
        if self.builder.force_formal {
            ballot.force_formal();
        }
    }

    fn categorization_scheme(&self, kind: CategoryKind) -> Option<CategoryScheme> {
        self.builder
            .schemes
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, s)| s.clone())
    }
}

/// Reads the rows of a [`FileBuilder`].
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MemorySource {
    file: FileBuilder,
    next: usize,
}

impl SourceAdapter for MemorySource {
    fn file_name(&self) -> &str {
        &self.file.name
    }

    fn parties(&self) -> &[String] {
        &self.file.parties
    }

    fn parties_including_secondary(&self) -> Vec<String> {
        let mut res = self.file.parties.clone();
        res.extend(self.file.secondary_parties.iter().cloned());
        res
    }

    fn candidates(&self) -> &[String] {
        &self.file.candidates
    }

    fn party_of(&self, candidate: &str) -> Option<String> {
        let idx = self.file.candidates.iter().position(|c| c == candidate)?;
        self.file.candidate_parties.get(idx).cloned()
    }

    fn candidate_party_at(&self, idx: usize) -> Option<String> {
        self.file.candidate_parties.get(idx).cloned()
    }

    fn has_more_raw_ballots(&mut self) -> bool {
        self.next < self.file.rows.len()
    }

    fn next_raw_ballot(&mut self) -> Option<&[Option<String>]> {
        let idx = self.next;
        self.next += 1;
        self.file.rows.get(idx).map(|r| r.as_slice())
    }

    fn stops_on_collision(&self) -> bool {
        self.file.stops_on_collision
    }
}
