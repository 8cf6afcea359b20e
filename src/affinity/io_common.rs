// Primitives shared by the readers of the election files.

use std::collections::{HashMap, VecDeque};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use log::{debug, warn};
use snafu::prelude::*;

use crate::affinity::*;

/// The party of the ungrouped candidates in the Australian files.
pub const UNGROUPED: &str = "UG";

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn strip_bom(s: &str) -> &str {
    s.strip_prefix('\u{feff}').unwrap_or(s)
}

/// Converts a raw rank cell to a rank token. `*` and `/` mark a first
/// preference; an empty cell and `-1` are blanks.
pub fn normalize_rank(cell: &str) -> Option<String> {
    match cell.trim() {
        "" | "-1" => None,
        "*" | "/" => Some("1".to_string()),
        t => Some(t.to_string()),
    }
}

/// The state of an Australian file: the last `-` separated part of the file
/// name, without extension (`...-20499-TAS.csv` is `TAS`).
pub fn state_from_file_name(path: &str) -> String {
    let name = simplify_file_name(path);
    let stem = match name.rsplit_once('.') {
        Some((s, _)) => s,
        None => name.as_str(),
    };
    stem.rsplit('-').next().unwrap_or(stem).to_string()
}

/// The name of a party, or a placeholder built from its group when the
/// party has no name.
pub fn party_or_group(party: &str, group: &str, state: &str, independent: &str) -> String {
    let party = party.trim();
    if party.is_empty() {
        if group.trim() == UNGROUPED {
            independent.to_string()
        } else {
            format!("{} - {}", group.trim().replace(',', ""), state)
        }
    } else {
        party.replace(',', "")
    }
}

/// The files of a data location: the file itself, or every regular file of
/// a directory in name order.
pub fn datafile_queue(location: &Path) -> VecDeque<String> {
    if !location.is_dir() {
        return VecDeque::from(vec![location.display().to_string()]);
    }
    let entries = match fs::read_dir(location) {
        Ok(e) => e,
        Err(e) => {
            warn!("datafile_queue: cannot list {:?}: {}", location, e);
            return VecDeque::new();
        }
    };
    let mut files: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .map(|p| p.display().to_string())
        .collect();
    files.sort();
    debug!("datafile_queue: {:?}: {:?}", location, files);
    files.into()
}

/// The non-empty lines of a text file, trimmed.
pub fn read_lines(path: &str) -> AffinityResult<Vec<String>> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    Ok(strip_bom(&contents)
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect())
}

/// The first two fields of every line of a CSV file without header. Lines
/// with fewer fields are skipped.
pub fn read_pairs(path: &str) -> AffinityResult<Vec<(String, String)>> {
    let input = open_file(path)?;
    pairs_from_reader(path, input)
}

pub fn pairs_from_reader(path: &str, input: Box<dyn Read>) -> AffinityResult<Vec<(String, String)>> {
    let mut res: Vec<(String, String)> = Vec::new();
    for (idx, rec_r) in csv_reader(input, b',').into_records().enumerate() {
        let lineno = idx + 1;
        let rec = rec_r.context(CsvLineParseSnafu { path, lineno })?;
        match (rec.get(0), rec.get(1)) {
            (Some(a), Some(b)) => res.push((strip_bom(a).trim().to_string(), b.trim().to_string())),
            _ => debug!("read_pairs: {}: skipping line {}: {:?}", path, lineno, rec),
        }
    }
    Ok(res)
}

pub fn open_file(path: &str) -> AffinityResult<Box<dyn Read>> {
    let f = File::open(path).context(OpeningFileSnafu { path })?;
    Ok(Box::new(f))
}

/// A reader of delimited records. The header, if any, is read as a record.
/// Tab separated files are not quoted.
pub fn csv_reader(input: Box<dyn Read>, delimiter: u8) -> csv::Reader<Box<dyn Read>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .quoting(delimiter != b'\t')
        .from_reader(input)
}

/// The position of a column in a header record.
pub fn column_index(header: &StringRecord, name: &str, path: &str) -> AffinityResult<usize> {
    header
        .iter()
        .position(|h| strip_bom(h).trim().trim_matches('"') == name)
        .context(MissingColumnSnafu {
            column: name,
            path,
        })
}

/// The records of a file. Records that cannot be read are skipped with a
/// warning.
pub struct RecordCursor {
    records: csv::StringRecordsIntoIter<Box<dyn Read>>,
    path: String,
    lineno: usize,
}

impl RecordCursor {
    pub fn new(reader: csv::Reader<Box<dyn Read>>, path: &str) -> RecordCursor {
        RecordCursor {
            records: reader.into_records(),
            path: path.to_string(),
            lineno: 0,
        }
    }
}

impl Iterator for RecordCursor {
    type Item = StringRecord;

    fn next(&mut self) -> Option<StringRecord> {
        for rec in self.records.by_ref() {
            self.lineno += 1;
            match rec {
                Ok(r) => return Some(r),
                Err(e) => warn!(
                    "RecordCursor: {}: skipping line {}: {}",
                    self.path, self.lineno, e
                ),
            }
        }
        None
    }
}

/// The candidates of a file, in ballot order, with their groups.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CandidateList {
    /// The party of each group, in group order. Ungrouped candidates have
    /// no above-the-line entry.
    pub parties: Vec<String>,
    pub candidates: Vec<String>,
    pub candidate_party: HashMap<String, String>,
    /// The party of each candidate, in ballot order.
    pub party_by_position: Vec<String>,
    pub group_party: HashMap<String, String>,
}

impl CandidateList {
    /// Adds a candidate. The first candidate of a group names the party of
    /// the group.
    pub fn push(&mut self, group: &str, candidate: String, party: String) {
        let group = group.trim();
        if group != UNGROUPED && !self.group_party.contains_key(group) {
            self.group_party.insert(group.to_string(), party.clone());
            self.parties.push(party.clone());
        }
        self.candidate_party.insert(candidate.clone(), party.clone());
        self.party_by_position.push(party);
        self.candidates.push(candidate);
    }

    /// The distinct parties of the candidates, in ballot order.
    pub fn all_parties(&self) -> Vec<String> {
        let mut res: Vec<String> = Vec::new();
        for p in self.party_by_position.iter() {
            if !res.contains(p) {
                res.push(p.clone());
            }
        }
        res
    }
}

/// Lays the tokens of a row out as a raw ballot of `len` tokens.
pub fn row_tokens<'a, I: Iterator<Item = &'a str>>(cells: I, len: usize, out: &mut Vec<Option<String>>) {
    out.clear();
    out.extend(cells.take(len).map(normalize_rank));
    out.resize(len, None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn input(s: &str) -> Box<dyn Read> {
        Box::new(Cursor::new(s.as_bytes().to_vec()))
    }

    #[test]
    fn rank_tokens() {
        assert_eq!(normalize_rank("*"), Some("1".to_string()));
        assert_eq!(normalize_rank("/"), Some("1".to_string()));
        assert_eq!(normalize_rank(" 3 "), Some("3".to_string()));
        assert_eq!(normalize_rank(""), None);
        assert_eq!(normalize_rank("-1"), None);
    }

    #[test]
    fn states() {
        assert_eq!(
            state_from_file_name("data/aec-senate-formalpreferences-20499-TAS.csv"),
            "TAS"
        );
        assert_eq!(state_from_file_name("SA"), "SA");
    }

    #[test]
    fn group_placeholders() {
        assert_eq!(party_or_group("Liberal, National", "A", "VIC", "Independent"), "Liberal National");
        assert_eq!(party_or_group("", "B", "VIC", "Independent"), "B - VIC");
        assert_eq!(party_or_group("", "UG", "VIC", "Independent"), "Independent");
    }

    #[test]
    fn pairs_skip_short_lines() {
        let pairs = pairs_from_reader("aliases.csv", input("\u{feff}Grn,Greens\nlonely\n\"Lab, NSW\",Labor\n")).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("Grn".to_string(), "Greens".to_string()),
                ("Lab, NSW".to_string(), "Labor".to_string())
            ]
        );
    }

    #[test]
    fn cursor_reads_all_records() {
        let cursor = RecordCursor::new(csv_reader(input("a,b\n1,2,3\n4\n"), b','), "t.csv");
        let lens: Vec<usize> = cursor.map(|r| r.len()).collect();
        assert_eq!(lens, vec![2, 3, 1]);
    }

    #[test]
    fn tab_separated_fields_keep_quotes() {
        let mut cursor = RecordCursor::new(csv_reader(input("a\t\"b\n"), b'\t'), "t.tsv");
        let rec = cursor.next().unwrap();
        assert_eq!(rec.get(1), Some("\"b"));
    }

    #[test]
    fn columns_by_name() {
        let header = StringRecord::from(vec!["\u{feff}nom_ty", "\"state_ab\""]);
        assert_eq!(column_index(&header, "nom_ty", "c.csv").unwrap(), 0);
        assert_eq!(column_index(&header, "state_ab", "c.csv").unwrap(), 1);
        assert!(column_index(&header, "ticket", "c.csv").is_err());
    }

    #[test]
    fn candidate_groups() {
        let mut list = CandidateList::default();
        list.push("A", "Ann".to_string(), "Greens".to_string());
        list.push("A", "Al".to_string(), "Greens".to_string());
        list.push("UG", "Uma".to_string(), "Independent".to_string());
        list.push("B", "Bo".to_string(), "Labor".to_string());
        assert_eq!(list.parties, vec!["Greens", "Labor"]);
        assert_eq!(list.all_parties(), vec!["Greens", "Independent", "Labor"]);
        assert_eq!(list.candidate_party.get("Uma").map(|s| s.as_str()), Some("Independent"));
    }

    #[test]
    fn namesakes_keep_their_party() {
        let mut list = CandidateList::default();
        list.push("A", "Lee".to_string(), "Greens".to_string());
        list.push("B", "Lee".to_string(), "Labor".to_string());
        assert_eq!(list.party_by_position, vec!["Greens", "Labor"]);
        assert_eq!(list.all_parties(), vec!["Greens", "Labor"]);
    }

    #[test]
    fn tokens_are_padded() {
        let mut out = Vec::new();
        row_tokens(vec!["*", "", "2"].into_iter(), 4, &mut out);
        assert_eq!(out, vec![Some("1".to_string()), None, Some("2".to_string()), None]);
    }
}
