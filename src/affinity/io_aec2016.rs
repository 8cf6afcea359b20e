// Reader for the AEC senate formal preferences of 2016.
//
// The candidates come from the candidate information file of the whole
// election; the data file of a state only holds the ranks.

use std::io::Read;
use std::iter::Peekable;

use ballot_stream::SourceAdapter;
use log::debug;
use snafu::prelude::*;

use crate::affinity::io_common::*;
use crate::affinity::*;

const INDEPENDENT: &str = "Independent";
const PREFERENCES: &str = "Preferences";

pub struct Aec2016Source {
    file_name: String,
    list: CandidateList,
    all_parties: Vec<String>,
    preferences: usize,
    records: Peekable<RecordCursor>,
    current: Vec<Option<String>>,
}

impl Aec2016Source {
    pub fn open(candidate_file: &str, path: &str) -> AffinityResult<Aec2016Source> {
        let candidates = open_file(candidate_file)?;
        let data = open_file(path)?;
        Aec2016Source::from_readers(path, candidate_file, candidates, data)
    }

    pub fn from_readers(
        path: &str,
        candidate_path: &str,
        candidates: Box<dyn Read>,
        data: Box<dyn Read>,
    ) -> AffinityResult<Aec2016Source> {
        let state = state_from_file_name(path);
        let list = read_candidates(candidate_path, candidates, &state)?;
        debug!(
            "Aec2016Source::from_readers: {}: state {}, {} groups, {} candidates",
            path,
            state,
            list.parties.len(),
            list.candidates.len()
        );

        let mut records = RecordCursor::new(csv_reader(data, b','), path).peekable();
        let header = records.next().context(MalformedHeaderSnafu {
            path,
            message: "the file is empty",
        })?;
        let preferences = column_index(&header, PREFERENCES, path)
            .unwrap_or_else(|_| header.len().saturating_sub(1));
        // The second line only underlines the header.
        records.next();

        Ok(Aec2016Source {
            file_name: path.to_string(),
            all_parties: list.all_parties(),
            list,
            preferences,
            records,
            current: Vec::new(),
        })
    }
}

// The senate candidates of one state.
fn read_candidates(path: &str, input: Box<dyn Read>, state: &str) -> AffinityResult<CandidateList> {
    let mut records = RecordCursor::new(csv_reader(input, b','), path);
    let header = records.next().context(MalformedHeaderSnafu {
        path,
        message: "the file is empty",
    })?;
    let nom_ty = column_index(&header, "nom_ty", path)?;
    let state_ab = column_index(&header, "state_ab", path)?;
    let ticket = column_index(&header, "ticket", path)?;
    let surname = column_index(&header, "surname", path)?;
    let given = column_index(&header, "ballot_given_nm", path)?;
    let party = column_index(&header, "party_ballot_nm", path)?;

    let mut list = CandidateList::default();
    for rec in records {
        let field = |i: usize| rec.get(i).unwrap_or("").trim();
        if field(nom_ty) != "S" || field(state_ab) != state {
            continue;
        }
        let name = format!("{} {}", field(given), field(surname));
        let p = party_or_group(field(party), field(ticket), state, INDEPENDENT);
        list.push(field(ticket), name, p);
    }
    Ok(list)
}

impl SourceAdapter for Aec2016Source {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn parties(&self) -> &[String] {
        &self.list.parties
    }

    fn parties_including_secondary(&self) -> Vec<String> {
        self.all_parties.clone()
    }

    fn candidates(&self) -> &[String] {
        &self.list.candidates
    }

    fn party_of(&self, candidate: &str) -> Option<String> {
        self.list.candidate_party.get(candidate).cloned()
    }

    fn candidate_party_at(&self, idx: usize) -> Option<String> {
        self.list.party_by_position.get(idx).cloned()
    }

    fn has_more_raw_ballots(&mut self) -> bool {
        self.records.peek().is_some()
    }

    fn next_raw_ballot(&mut self) -> Option<&[Option<String>]> {
        let row = self.records.next()?;
        let len = self.list.parties.len() + self.list.candidates.len();
        let prefs = row.get(self.preferences).unwrap_or("");
        row_tokens(prefs.split(','), len, &mut self.current);
        Some(&self.current)
    }
}
