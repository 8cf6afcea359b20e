/*!

Normalization of ranked ballots coming from heterogeneous election files.

The central type is [`BallotStream`]: it reads raw ballots from the files of
an [`ElectionResource`], resolves the raw party names through an
[`AliasTable`], optionally groups the parties into categories, and exposes
the current ballot through preference queries.

```
use ballot_stream::builder::{Builder, FileBuilder};
use ballot_stream::{BallotStream, Preference, Ranking};

let election = Builder::new("Example")
    .parties(&["A", "B", "C"])
    .file(FileBuilder::new("example.csv").parties(&["A", "B", "C"]).row(&["1", "2", "3"]))
    .build();

let mut stream = BallotStream::new(election);
while let Some(ballot) = stream.next_ballot() {
    assert_eq!(ballot.primary_preference(), Some(Preference::Named("A".into())));
    assert_eq!(ballot.prefer_between_parties("B", "C"), Some(Ranking::FirstPreferred));
}
assert_eq!(stream.current_ballot_num(), 1);
```

The stream owns a single [`Ballot`] that is overwritten by every read. Use
[`BallotStream::snapshot`] to keep a ballot past the next read.
*/

mod alias;
mod ballot;
pub mod builder;
mod categories;
mod config;
pub mod manual;
mod source;

use std::collections::{HashMap, VecDeque};

use log::{debug, info, warn};
use snafu::{ensure, OptionExt};

pub use crate::alias::AliasTable;
pub use crate::ballot::Ballot;
pub use crate::categories::*;
pub use crate::config::*;
pub use crate::source::*;

// The names found in the file being read.
#[derive(Debug, Clone, Default)]
struct FileLayout {
    file_name: String,
    parties: Vec<Name>,
    candidates: Vec<Name>,
    // Canonical party of each candidate, by position in `candidates`.
    candidate_party: Vec<Option<Name>>,
}

// Converts a 1-based rank token to a position in a section of length `len`.
fn parse_rank(token: &str, len: usize) -> Option<usize> {
    let rank: usize = token.trim().parse().ok()?;
    let pos = rank.checked_sub(1)?;
    if pos < len {
        Some(pos)
    } else {
        None
    }
}

// Writes the raw names of a ballot at their ranked positions. `below_origin`
// receives the candidate written at each below-the-line position.
fn transcribe(
    tokens: &[Option<String>],
    layout: &FileLayout,
    ballot: &mut Ballot,
    below_origin: &mut Vec<Option<usize>>,
    stop_on_collision: bool,
) {
    ballot.clear();
    below_origin.clear();
    below_origin.resize(layout.candidates.len(), None);
    let num_parties = layout.parties.len();
    let num_candidates = layout.candidates.len();
    for (idx, token_o) in tokens.iter().enumerate() {
        let token = match token_o {
            Some(t) => t,
            None => continue,
        };
        if idx < num_parties {
            let name = &layout.parties[idx];
            match parse_rank(token, num_parties) {
                Some(pos) => ballot.set_above(pos, Some(name.clone()), stop_on_collision),
                None => debug!("transcribe: dropping rank {:?} for party {:?}", token, name),
            }
        } else if idx - num_parties < num_candidates {
            let name = &layout.candidates[idx - num_parties];
            match parse_rank(token, num_candidates) {
                Some(pos) => {
                    ballot.set_below(pos, Some(name.clone()), stop_on_collision);
                    below_origin[pos] = Some(idx - num_parties);
                }
                None => debug!("transcribe: dropping rank {:?} for candidate {:?}", token, name),
            }
        } else {
            debug!("transcribe: dropping token {:?} at position {}: no such option", token, idx);
        }
    }
}

/// A stream of canonical ballots over all the files of an election.
///
/// Reading follows a destructive convention: [`BallotStream::has_more_ballots`]
/// and [`BallotStream::next_ballot`] invalidate the current ballot. All the
/// queries return `None` when there is no current ballot.
pub struct BallotStream<E: ElectionResource> {
    resource: E,
    parties: Vec<Name>,
    aliases: AliasTable,
    files: VecDeque<String>,
    source: Option<E::Source>,
    layout: FileLayout,
    running: HashMap<Name, bool>,
    categories_running: HashMap<Name, bool>,
    overlay: Option<CategoryOverlay>,
    use_for_primary: bool,
    use_for_secondary: bool,
    processed: usize,
    ballot: Ballot,
    below_origin: Vec<Option<usize>>,
    has_current: bool,
}

impl<E: ElectionResource> BallotStream<E> {
    pub fn new(resource: E) -> BallotStream<E> {
        let parties: Vec<Name> = resource
            .party_list()
            .iter()
            .map(|p| Name::from(p.as_str()))
            .collect();
        let aliases = AliasTable::new(resource.party_list(), &resource.alias_pairs());
        debug!(
            "BallotStream::new: {} parties, {} aliases",
            parties.len(),
            aliases.len()
        );
        let mut stream = BallotStream {
            resource,
            parties,
            aliases,
            files: VecDeque::new(),
            source: None,
            layout: FileLayout::default(),
            running: HashMap::new(),
            categories_running: HashMap::new(),
            overlay: None,
            use_for_primary: false,
            use_for_secondary: false,
            processed: 0,
            ballot: Ballot::default(),
            below_origin: Vec::new(),
            has_current: false,
        };
        stream.restart();
        stream
    }

    /// Goes back to the first ballot of the first file. The categorization is
    /// kept, and can be changed again.
    pub fn restart(&mut self) {
        self.files = self.resource.datafile_queue();
        info!(
            "restart: {}: {} files to read",
            self.resource.election_name(),
            self.files.len()
        );
        self.processed = 0;
        self.has_current = false;
        self.next_file();
    }

    // Opens the next file of the queue that can be opened. Returns false when
    // the queue is exhausted.
    fn next_file(&mut self) -> bool {
        self.source = None;
        self.layout = FileLayout::default();
        while let Some(file) = self.files.pop_front() {
            info!("next_file: opening {:?}", file);
            match self.resource.open_source(&file) {
                Ok(src) => {
                    self.layout = self.read_layout(&src);
                    self.ballot
                        .resize(self.layout.parties.len(), self.layout.candidates.len());
                    self.source = Some(src);
                    self.update_who_is_running();
                    return true;
                }
                Err(e) => {
                    warn!("next_file: skipping {:?}: {}", file, e);
                }
            }
        }
        self.update_who_is_running();
        false
    }

    fn read_layout(&self, src: &E::Source) -> FileLayout {
        let mut candidate_party: Vec<Option<Name>> = Vec::with_capacity(src.candidates().len());
        for (idx, c) in src.candidates().iter().enumerate() {
            let party = src
                .candidate_party_at(idx)
                .and_then(|p| self.aliases.resolve(&p).cloned());
            if party.is_none() {
                debug!(
                    "read_layout: {}: no canonical party for candidate {:?}",
                    src.file_name(),
                    c
                );
            }
            candidate_party.push(party);
        }
        FileLayout {
            file_name: src.file_name().to_string(),
            parties: src.parties().iter().map(|p| Name::from(p.as_str())).collect(),
            candidates: src
                .candidates()
                .iter()
                .map(|c| Name::from(c.as_str()))
                .collect(),
            candidate_party,
        }
    }

    fn update_who_is_running(&mut self) {
        let raw_parties = match &self.source {
            Some(src) => src.parties_including_secondary(),
            None => vec![],
        };
        let mut running: HashMap<Name, bool> =
            self.parties.iter().map(|p| (p.clone(), false)).collect();
        for (party, r) in running.iter_mut() {
            *r = raw_parties
                .iter()
                .any(|raw| self.aliases.names_equal(raw, party));
        }
        let mut categories_running: HashMap<Name, bool> = HashMap::new();
        if let Some(overlay) = &self.overlay {
            for cat in overlay.categories().iter() {
                let r = overlay
                    .members(cat)
                    .iter()
                    .any(|p| running.get(p).copied().unwrap_or(false));
                categories_running.insert(cat.clone(), r);
            }
        }
        debug!(
            "update_who_is_running: {:?}: {} of {} parties running",
            self.layout.file_name,
            running.values().filter(|r| **r).count(),
            running.len()
        );
        self.running = running;
        self.categories_running = categories_running;
    }

    /// True if a ballot can be read. May open the next files of the queue.
    /// The current ballot is no longer available after this call.
    pub fn has_more_ballots(&mut self) -> bool {
        self.has_current = false;
        loop {
            if let Some(src) = self.source.as_mut() {
                if src.has_more_raw_ballots() {
                    return true;
                }
            }
            if !self.next_file() {
                return false;
            }
        }
    }

    /// Reads, normalizes and validates the next ballot.
    pub fn next_ballot(&mut self) -> Option<&Ballot> {
        if !self.has_more_ballots() {
            return None;
        }
        let src = self.source.as_mut()?;
        let stop_on_collision = src.stops_on_collision();
        let tokens = src.next_raw_ballot()?;
        transcribe(
            tokens,
            &self.layout,
            &mut self.ballot,
            &mut self.below_origin,
            stop_on_collision,
        );
        self.resolve_names();

        self.processed += 1;
        self.ballot.validate(
            self.resource.min_ranked_above(),
            self.resource.min_ranked_below(),
        );
        self.resource.additional_processing(&mut self.ballot);
        self.has_current = true;
        debug!("next_ballot: {}: {}", self.processed, self.ballot);
        Some(&self.ballot)
    }

    // Replaces the raw names of the valid prefixes by canonical parties, and
    // adds the categories.
    fn resolve_names(&mut self) {
        let categorized = self.overlay.is_some();
        if categorized && !self.ballot.uses_categories() {
            self.ballot.turn_categories_on();
        } else if !categorized && self.ballot.uses_categories() {
            self.ballot.stop_using_categories();
        }

        for idx in 0..self.ballot.above().len() {
            let raw = match self.ballot.above()[idx].name() {
                Some(n) => n.clone(),
                None => break,
            };
            let party = self.aliases.resolve(&raw).cloned();
            if party.is_none() {
                debug!("resolve_names: no alias for party {:?}", raw);
            }
            let cat = self.category_of_canonical(&party);
            self.ballot.set_above(idx, party, false);
            if categorized {
                self.ballot.set_above_category(idx, cat, false);
            }
        }

        for idx in 0..self.ballot.below().len() {
            if !self.ballot.below()[idx].is_filled() {
                break;
            }
            let party = self
                .below_origin
                .get(idx)
                .copied()
                .flatten()
                .and_then(|c| self.layout.candidate_party.get(c).cloned())
                .flatten();
            let cat = self.category_of_canonical(&party);
            self.ballot.set_below(idx, party, false);
            if categorized {
                self.ballot.set_below_category(idx, cat, false);
            }
        }
    }

    fn category_of_canonical(&self, party: &Option<Name>) -> Option<Name> {
        let overlay = self.overlay.as_ref()?;
        party.as_ref().and_then(|p| overlay.category_of(p)).cloned()
    }

    // ********* Current ballot *********

    /// The ballot returned by the last [`BallotStream::next_ballot`], if it
    /// was not invalidated since.
    pub fn current_ballot(&self) -> Option<&Ballot> {
        if self.has_current {
            Some(&self.ballot)
        } else {
            None
        }
    }

    /// An owned copy of the current ballot.
    pub fn snapshot(&self) -> Option<Ballot> {
        self.current_ballot().cloned()
    }

    /// The number of ballots read since the last restart.
    pub fn current_ballot_num(&self) -> usize {
        self.processed
    }

    pub fn ballot_is_formal(&self) -> Option<bool> {
        self.current_ballot().map(|b| b.is_formal())
    }

    /// The first preference, as a party or as a category depending on the
    /// primary toggle.
    pub fn primary_choice(&self) -> Option<Preference> {
        let b = self.current_ballot()?;
        if self.uses_categories_for_primary() {
            b.primary_category_preference()
        } else {
            b.primary_preference()
        }
    }

    /// The position of the first preference in [`BallotStream::prim_options`].
    pub fn primary_choice_index(&self) -> Option<usize> {
        let choice = self.primary_choice()?;
        let name = choice.name()?;
        self.prim_options().iter().position(|o| o == name)
    }

    pub fn secondary_choice(&self) -> Option<Preference> {
        let b = self.current_ballot()?;
        if self.uses_categories_for_secondary() {
            b.second_category_preference()
        } else {
            b.second_preference()
        }
    }

    /// The first distinct secondary options of the current ballot, starting
    /// with the first preference. With categories, the list has one more
    /// element since the category of the first preference can appear twice.
    pub fn secondary_ordered_choices(&self) -> Option<Vec<Option<Name>>> {
        let b = self.current_ballot()?;
        if self.uses_categories_for_secondary() {
            b.first_n_categories(self.sec_num_options() + 1)
        } else {
            b.first_n_parties(self.sec_num_options())
        }
    }

    /// Which of two secondary options the current ballot prefers.
    pub fn preference_between(&self, first: &str, second: &str) -> Option<Ranking> {
        let b = self.current_ballot()?;
        if self.uses_categories_for_secondary() {
            b.prefer_between_categories(first, second)
        } else {
            let f = self.real_name_of(first).map(|n| &**n).unwrap_or(first);
            let s = self.real_name_of(second).map(|n| &**n).unwrap_or(second);
            b.prefer_between_parties(f, s)
        }
    }

    // ********* Categories *********

    /// Groups the parties into categories.
    ///
    /// Every canonical party must be mapped to one of `categories`. Fails when
    /// ballots were already read since the last restart.
    pub fn categorize_parties(
        &mut self,
        categories: &[String],
        map: &HashMap<String, String>,
        use_for_primary: bool,
        use_for_secondary: bool,
    ) -> Result<(), CategorizationError> {
        ensure!(
            self.processed == 0,
            StreamInProgressSnafu {
                processed: self.processed
            }
        );
        let overlay = CategoryOverlay::new(&self.parties, categories, map)?;
        info!(
            "categorize_parties: {} categories (primary: {}, secondary: {})",
            overlay.len(),
            use_for_primary,
            use_for_secondary
        );
        self.overlay = Some(overlay);
        self.use_for_primary = use_for_primary;
        self.use_for_secondary = use_for_secondary;
        self.ballot.turn_categories_on();
        self.update_who_is_running();
        Ok(())
    }

    /// Goes back to plain parties.
    pub fn decategorize(&mut self) -> Result<(), CategorizationError> {
        ensure!(
            self.processed == 0 || self.overlay.is_none(),
            StreamInProgressSnafu {
                processed: self.processed
            }
        );
        self.overlay = None;
        self.use_for_primary = false;
        self.use_for_secondary = false;
        self.ballot.stop_using_categories();
        self.update_who_is_running();
        Ok(())
    }

    /// Applies one of the categorizations provided by the election.
    pub fn predefined_categorization(
        &mut self,
        kind: CategoryKind,
        use_for_primary: bool,
        use_for_secondary: bool,
    ) -> Result<(), CategorizationError> {
        match kind {
            CategoryKind::Uncategorized => self.decategorize(),
            CategoryKind::AllAustralia | CategoryKind::CrossElection | CategoryKind::SizeBased => {
                ensure!(
                    self.processed == 0,
                    StreamInProgressSnafu {
                        processed: self.processed
                    }
                );
                let scheme = self.resource.categorization_scheme(kind).context(NotDefinedSnafu {
                    kind,
                    election: self.resource.election_name(),
                })?;
                let (categories, map) = scheme.resolve(&self.parties, &self.aliases)?;
                self.categorize_parties(&categories, &map, use_for_primary, use_for_secondary)
            }
        }
    }

    pub fn categories_are_active(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn uses_categories_for_primary(&self) -> bool {
        self.overlay.is_some() && self.use_for_primary
    }

    pub fn uses_categories_for_secondary(&self) -> bool {
        self.overlay.is_some() && self.use_for_secondary
    }

    /// The category of a party, given by any of its names. A category name
    /// resolves to itself.
    pub fn category_of(&self, name: &str) -> Option<&Name> {
        let overlay = self.overlay.as_ref()?;
        let canonical = self.real_name_of(name).map(|n| &**n).unwrap_or(name);
        overlay.category_of(canonical)
    }

    pub fn category_members(&self, category: &str) -> Vec<Name> {
        match &self.overlay {
            Some(o) => o.members(category),
            None => vec![],
        }
    }

    // ********* Election metadata *********

    pub fn resource(&self) -> &E {
        &self.resource
    }

    pub fn election_name(&self) -> String {
        if self.categories_are_active() {
            format!("{} - Using Categories", self.resource.election_name())
        } else {
            self.resource.election_name().to_string()
        }
    }

    /// The file being read, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.file_name())
    }

    pub fn party_list(&self) -> &[Name] {
        &self.parties
    }

    pub fn category_list(&self) -> &[Name] {
        match &self.overlay {
            Some(o) => o.categories(),
            None => &[],
        }
    }

    pub fn number_of_parties(&self) -> usize {
        self.parties.len()
    }

    pub fn number_of_categories(&self) -> usize {
        self.category_list().len()
    }

    /// The options of first preference queries.
    pub fn prim_options(&self) -> &[Name] {
        if self.uses_categories_for_primary() {
            self.category_list()
        } else {
            self.party_list()
        }
    }

    /// The options of second preference queries.
    pub fn sec_options(&self) -> &[Name] {
        if self.uses_categories_for_secondary() {
            self.category_list()
        } else {
            self.party_list()
        }
    }

    pub fn prim_num_options(&self) -> usize {
        self.prim_options().len()
    }

    pub fn sec_num_options(&self) -> usize {
        self.sec_options().len()
    }

    pub fn index_party_to_name(&self, idx: usize) -> Option<&Name> {
        self.parties.get(idx)
    }

    pub fn name_party_to_index(&self, name: &str) -> Option<usize> {
        let canonical = self.real_name_of(name)?;
        self.parties.iter().position(|p| p == canonical)
    }

    pub fn index_category_to_name(&self, idx: usize) -> Option<&Name> {
        self.category_list().get(idx)
    }

    pub fn name_category_to_index(&self, name: &str) -> Option<usize> {
        let cat = self.category_of(name)?;
        self.overlay.as_ref()?.index_of(cat)
    }

    /// The canonical party for a raw name.
    pub fn real_name_of(&self, raw: &str) -> Option<&Name> {
        self.aliases.resolve(raw)
    }

    pub fn names_equal(&self, a: &str, b: &str) -> bool {
        self.aliases.names_equal(a, b)
    }

    /// The canonical party of a candidate of the current file.
    pub fn party_of_candidate(&self, candidate: &str) -> Option<&Name> {
        let idx = self
            .layout
            .candidates
            .iter()
            .position(|c| &**c == candidate)?;
        self.layout.candidate_party.get(idx)?.as_ref()
    }

    /// Whether a primary option contests the current file.
    pub fn prim_runs_in_current_file(&self, name: &str) -> bool {
        self.runs_in_current_file(name, self.uses_categories_for_primary())
    }

    /// Whether a secondary option contests the current file.
    pub fn sec_runs_in_current_file(&self, name: &str) -> bool {
        self.runs_in_current_file(name, self.uses_categories_for_secondary())
    }

    fn runs_in_current_file(&self, name: &str, as_category: bool) -> bool {
        if as_category {
            self.category_of(name)
                .and_then(|c| self.categories_running.get(c))
                .copied()
                .unwrap_or(false)
        } else {
            self.running
                .get(name)
                .or_else(|| self.real_name_of(name).and_then(|p| self.running.get(p)))
                .copied()
                .unwrap_or(false)
        }
    }
}

/// Lists the party names of every file of an election, as
/// `(name in the file, cleaned name)` pairs. Each cleaned name is also paired
/// with itself. The list is sorted without regard to case and has no
/// duplicates, ready to be edited into an alias table.
pub fn collect_party_names<E: ElectionResource>(resource: &E) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for file in resource.datafile_queue() {
        match resource.open_source(&file) {
            Ok(src) => {
                for (raw, clean) in src.parties_unaltered().into_iter().zip(src.parties().iter()) {
                    pairs.push((raw, clean.clone()));
                    pairs.push((clean.clone(), clean.clone()));
                }
            }
            Err(e) => {
                warn!("collect_party_names: skipping {:?}: {}", file, e);
            }
        }
    }
    pairs.sort_by(|a, b| {
        a.0.to_lowercase()
            .cmp(&b.0.to_lowercase())
            .then_with(|| a.cmp(b))
    });
    pairs.dedup();
    pairs
}
