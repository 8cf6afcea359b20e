// Reader for the NSW legislative council preference files: one tab separated
// line per preference, grouped by ballot paper.

use std::io::Read;
use std::iter::Peekable;

use ballot_stream::SourceAdapter;
use csv::StringRecord;
use log::debug;
use snafu::prelude::*;

use crate::affinity::io_common::*;
use crate::affinity::*;

const STATE: &str = "NSW";
const INDEPENDENT: &str = "INDEPENDENT";

// Positions of the columns of a data file.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
struct Columns {
    group: usize,
    name: usize,
    formality: usize,
    kind: usize,
    paper: usize,
    rank: usize,
}

pub struct NswSource {
    file_name: String,
    list: CandidateList,
    all_parties: Vec<String>,
    columns: Columns,
    records: Peekable<RecordCursor>,
    current: Vec<Option<String>>,
    // A ballot was assembled in `current` and not returned yet.
    ready: bool,
}

impl NswSource {
    pub fn open(candidate_file: &str, path: &str) -> AffinityResult<NswSource> {
        let candidates = open_file(candidate_file)?;
        let data = open_file(path)?;
        NswSource::from_readers(path, candidate_file, candidates, data)
    }

    pub fn from_readers(
        path: &str,
        candidate_path: &str,
        candidates: Box<dyn Read>,
        data: Box<dyn Read>,
    ) -> AffinityResult<NswSource> {
        let list = read_candidates(candidate_path, candidates)?;
        let mut records = RecordCursor::new(csv_reader(data, b'\t'), path).peekable();
        let header = records.next().context(MalformedHeaderSnafu {
            path,
            message: "the file is empty",
        })?;
        let columns = Columns {
            group: column_index(&header, "GroupCode", path)?,
            name: column_index(&header, "CandidateName", path)?,
            formality: column_index(&header, "Formality", path)?,
            kind: column_index(&header, "Type", path)?,
            paper: column_index(&header, "VCBallotPaperID", path)?,
            rank: column_index(&header, "PreferenceNumber", path)?,
        };
        debug!(
            "NswSource::from_readers: {}: {} groups, {} candidates, {:?}",
            path,
            list.parties.len(),
            list.candidates.len(),
            columns
        );
        Ok(NswSource {
            file_name: path.to_string(),
            all_parties: list.all_parties(),
            list,
            columns,
            records,
            current: Vec::new(),
            ready: false,
        })
    }

    // Assembles the next formal ballot in `current`.
    fn fill(&mut self) -> bool {
        loop {
            let first = match self.records.next() {
                Some(r) => r,
                None => return false,
            };
            let paper = first.get(self.columns.paper).unwrap_or("").to_string();
            let paper_col = self.columns.paper;
            let mut lines: Vec<StringRecord> = vec![first];
            while let Some(r) = self
                .records
                .next_if(|r| r.get(paper_col) == Some(paper.as_str()))
            {
                lines.push(r);
            }
            if lines[0].get(self.columns.formality).map(|f| f.trim()) == Some("Informal") {
                debug!("NswSource::fill: skipping informal paper {}", paper);
                continue;
            }
            self.assemble(&lines);
            return true;
        }
    }

    fn assemble(&mut self, lines: &[StringRecord]) {
        let num_parties = self.list.parties.len();
        let num_candidates = self.list.candidates.len();
        self.current.clear();
        self.current.resize(num_parties + num_candidates, None);
        let c = self.columns;
        for line in lines.iter() {
            let rank = match normalize_rank(line.get(c.rank).unwrap_or("")) {
                Some(r) => r,
                None => continue,
            };
            let pos = match line.get(c.kind).map(|k| k.trim()) {
                Some("SATL") | Some("RATL") => {
                    let group = line.get(c.group).unwrap_or("").trim();
                    self.list
                        .group_party
                        .get(group)
                        .and_then(|p| self.list.parties.iter().position(|q| q == p))
                }
                Some("BTL") => {
                    let name = line.get(c.name).unwrap_or("").trim();
                    self.list
                        .candidates
                        .iter()
                        .position(|q| q == name)
                        .map(|i| num_parties + i)
                }
                _ => None,
            };
            match pos {
                Some(p) => self.current[p] = Some(rank),
                None => debug!("NswSource::assemble: dropping line {:?}", line),
            }
        }
    }
}

fn read_candidates(path: &str, input: Box<dyn Read>) -> AffinityResult<CandidateList> {
    let mut records = RecordCursor::new(csv_reader(input, b','), path);
    let header = records.next().context(MalformedHeaderSnafu {
        path,
        message: "the file is empty",
    })?;
    let party = column_index(&header, "Party", path)?;
    let name = column_index(&header, "Group/Candidates in Ballot Order", path)?;
    let group = column_index(&header, "Group", path)?;

    let mut list = CandidateList::default();
    for rec in records {
        let field = |i: usize| rec.get(i).unwrap_or("").trim();
        let p = party_or_group(field(party), field(group), STATE, INDEPENDENT);
        list.push(field(group), field(name).to_string(), p);
    }
    Ok(list)
}

impl SourceAdapter for NswSource {
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
        if !self.ready {
            self.ready = self.fill();
        }
        self.ready
    }

    fn next_raw_ballot(&mut self) -> Option<&[Option<String>]> {
        if !self.has_more_raw_ballots() {
            return None;
        }
        self.ready = false;
        Some(&self.current)
    }

    fn stops_on_collision(&self) -> bool {
        false
    }
}
