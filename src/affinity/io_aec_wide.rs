// Reader for the AEC senate files of 2019 and 2022: one line per ballot, one
// column per group then per candidate.

use std::collections::HashMap;
use std::io::Read;
use std::iter::Peekable;

use ballot_stream::SourceAdapter;
use csv::StringRecord;
use log::debug;
use snafu::prelude::*;

use crate::affinity::io_common::*;
use crate::affinity::*;

const INDEPENDENT: &str = "Independent";

pub struct AecWideSource {
    file_name: String,
    parties: Vec<String>,
    parties_unaltered: Vec<String>,
    candidates: Vec<String>,
    candidate_party: HashMap<String, String>,
    party_by_position: Vec<Option<String>>,
    first_party: usize,
    records: Peekable<RecordCursor>,
    current: Vec<Option<String>>,
}

impl AecWideSource {
    pub fn open(path: &str, repair_header: bool) -> AffinityResult<AecWideSource> {
        let input = open_file(path)?;
        AecWideSource::from_reader(path, input, repair_header)
    }

    pub fn from_reader(
        path: &str,
        input: Box<dyn Read>,
        repair_header: bool,
    ) -> AffinityResult<AecWideSource> {
        let mut records = RecordCursor::new(csv_reader(input, b','), path).peekable();
        let raw_header = records.next().context(MalformedHeaderSnafu {
            path,
            message: "the file is empty",
        })?;
        let header = clean_header(&raw_header, repair_header);
        let first_party = header
            .iter()
            .position(|h| h.contains(':'))
            .context(MalformedHeaderSnafu {
                path,
                message: "no group column",
            })?;
        let first_candidate = first_candidate_index(&header, first_party);
        let state = state_from_file_name(path);
        debug!(
            "AecWideSource::from_reader: {}: state {}, groups {}..{}, {} columns",
            path,
            state,
            first_party,
            first_candidate,
            header.len()
        );

        let parties_unaltered: Vec<String> = header[first_party..first_candidate].to_vec();
        let mut group_party: HashMap<String, String> = HashMap::new();
        let mut parties: Vec<String> = Vec::new();
        for col in parties_unaltered.iter() {
            let (group, name) = split_column(col);
            let party = match name {
                Some(n) if !n.is_empty() => n.replace(',', ""),
                _ => format!("{} - {}", group, state),
            };
            group_party.insert(group.to_string(), party.clone());
            parties.push(party);
        }
        group_party.insert(UNGROUPED.to_string(), INDEPENDENT.to_string());

        let mut candidates: Vec<String> = Vec::new();
        let mut candidate_party: HashMap<String, String> = HashMap::new();
        let mut party_by_position: Vec<Option<String>> = Vec::new();
        for col in header[first_candidate..].iter() {
            let (group, name) = split_column(col);
            let candidate = name.unwrap_or("").to_string();
            let party = group_party.get(group).cloned();
            match &party {
                Some(p) => {
                    candidate_party.insert(candidate.clone(), p.clone());
                }
                None => debug!(
                    "AecWideSource::from_reader: {}: candidate {:?} has no group",
                    path, col
                ),
            }
            party_by_position.push(party);
            candidates.push(candidate);
        }

        Ok(AecWideSource {
            file_name: path.to_string(),
            parties,
            parties_unaltered,
            candidates,
            candidate_party,
            party_by_position,
            first_party,
            records,
            current: Vec::new(),
        })
    }
}

// Splits `A:Name` in its group and name.
fn split_column(col: &str) -> (&str, Option<&str>) {
    match col.split_once(':') {
        Some((g, n)) => (g.trim(), Some(n.trim())),
        None => (col.trim(), None),
    }
}

// The header without byte order mark. When repairing, the fragments of the
// names with unquoted commas are glued back to their column.
fn clean_header(raw: &StringRecord, repair: bool) -> Vec<String> {
    let mut header: Vec<String> = Vec::new();
    let mut in_groups = false;
    for field in raw.iter() {
        let field = strip_bom(field);
        let field = if repair { field.trim_matches('"') } else { field };
        if repair && in_groups && !field.contains(':') {
            if let Some(last) = header.last_mut() {
                last.push_str(field);
                continue;
            }
        }
        if field.trim() == "Paper No" {
            in_groups = true;
        }
        header.push(field.to_string());
    }
    header
}

// The candidates start at the first column whose group was already seen.
fn first_candidate_index(header: &[String], first_party: usize) -> usize {
    let mut seen: Vec<&str> = Vec::new();
    for (idx, col) in header.iter().enumerate().skip(first_party) {
        let (group, name) = split_column(col);
        if name.is_some() && seen.contains(&group) {
            return idx;
        }
        seen.push(group);
    }
    header.len()
}

impl SourceAdapter for AecWideSource {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn parties(&self) -> &[String] {
        &self.parties
    }

    fn parties_unaltered(&self) -> Vec<String> {
        self.parties_unaltered.clone()
    }

    fn candidates(&self) -> &[String] {
        &self.candidates
    }

    fn party_of(&self, candidate: &str) -> Option<String> {
        self.candidate_party.get(candidate).cloned()
    }

    fn candidate_party_at(&self, idx: usize) -> Option<String> {
        self.party_by_position.get(idx).cloned().flatten()
    }

    fn has_more_raw_ballots(&mut self) -> bool {
        self.records.peek().is_some()
    }

    fn next_raw_ballot(&mut self) -> Option<&[Option<String>]> {
        let row = self.records.next()?;
        let len = self.parties.len() + self.candidates.len();
        row_tokens(row.iter().skip(self.first_party), len, &mut self.current);
        Some(&self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn source(path: &str, s: &str, repair: bool) -> AecWideSource {
        let input: Box<dyn Read> = Box::new(Cursor::new(s.as_bytes().to_vec()));
        AecWideSource::from_reader(path, input, repair).unwrap()
    }

    const FILE_2019: &str = "\
State,Division,Vote Collection Point Name,Vote Collection Point ID,Batch No,Paper No,A:Liberal,B:,C:The Greens,A:SMITH John,A:DOE Jane,B:ROE Rick,C:GREEN Gail,UG:LONE Lou
TAS,Bass,Launceston,1,1,1,1,,2,,,,,
TAS,Bass,Launceston,1,1,2,,,,2,1,*,3,6
";

    #[test]
    fn groups_and_candidates() {
        let src = source("aec-senate-formalpreferences-24310-TAS.csv", FILE_2019, false);
        assert_eq!(src.parties(), &["Liberal", "B - TAS", "The Greens"]);
        assert_eq!(
            src.parties_unaltered(),
            vec!["A:Liberal", "B:", "C:The Greens"]
        );
        assert_eq!(
            src.candidates(),
            &["SMITH John", "DOE Jane", "ROE Rick", "GREEN Gail", "LONE Lou"]
        );
        assert_eq!(src.party_of("ROE Rick"), Some("B - TAS".to_string()));
        assert_eq!(src.party_of("LONE Lou"), Some("Independent".to_string()));
        assert_eq!(src.candidate_party_at(3), Some("The Greens".to_string()));
        assert_eq!(src.candidate_party_at(5), None);
    }

    #[test]
    fn namesakes_in_two_groups() {
        let file = "State,Division,Vote Collection Point Name,Vote Collection Point ID,Batch No,Paper No,A:Liberal,B:Labor,A:LEE Sam,B:LEE Sam\nTAS,Bass,Launceston,1,1,1,,,2,1\n";
        let src = source("aec-senate-formalpreferences-24310-TAS.csv", file, false);
        assert_eq!(src.candidate_party_at(0), Some("Liberal".to_string()));
        assert_eq!(src.candidate_party_at(1), Some("Labor".to_string()));
    }

    #[test]
    fn rows() {
        let mut src = source("aec-senate-formalpreferences-24310-TAS.csv", FILE_2019, false);
        assert!(src.has_more_raw_ballots());
        let first: Vec<Option<String>> = src.next_raw_ballot().unwrap().to_vec();
        assert_eq!(first.len(), 8);
        assert_eq!(first[0], Some("1".to_string()));
        assert_eq!(first[2], Some("2".to_string()));
        assert!(first[3..].iter().all(|t| t.is_none()));
        let second: Vec<Option<String>> = src.next_raw_ballot().unwrap().to_vec();
        assert_eq!(second[5], Some("1".to_string()));
        assert_eq!(second[7], Some("6".to_string()));
        assert!(!src.has_more_raw_ballots());
        assert!(src.next_raw_ballot().is_none());
    }

    #[test]
    fn repaired_header() {
        let file = "\u{feff}State,Division,Vote Collection Point Name,Vote Collection Point ID,Batch No,Paper No,A:Liberal, National,B:Labor,A:SMITH John,B:JONES Jo\nVIC,Kooyong,Hawthorn,1,1,1,,1,2,\n";
        let src = source("aec-senate-formalpreferences-27966-VIC.csv", file, true);
        assert_eq!(src.parties(), &["Liberal National", "Labor"]);
        assert_eq!(src.candidates(), &["SMITH John", "JONES Jo"]);
    }
}
