// Reader for the cast vote records of the New York City 2021 primaries.
//
// A race is a set of columns (one per rank) whose cells hold candidacy IDs.
// The candidates are handled as parties, there is no below-the-line section.

use std::collections::HashMap;
use std::iter::Peekable;

use ballot_stream::SourceAdapter;
use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::debug;
use snafu::prelude::*;

use crate::affinity::io_common::*;
use crate::affinity::*;

type Rows = Box<dyn Iterator<Item = Vec<String>>>;

pub struct NycSource {
    file_name: String,
    parties: Vec<String>,
    party_index: HashMap<String, usize>,
    ids: HashMap<String, String>,
    columns: Vec<usize>,
    rows: Peekable<Rows>,
    current: Vec<Option<String>>,
}

impl NycSource {
    /// Opens a CSV file, or the first sheet of an Excel file.
    pub fn open(path: &str, race: &str, ids: &[(String, String)]) -> AffinityResult<NycSource> {
        let rows: Rows = if path.to_lowercase().ends_with(".xlsx") {
            Box::new(read_sheet(path)?.into_iter())
        } else {
            let cursor = RecordCursor::new(csv_reader(open_file(path)?, b','), path);
            Box::new(cursor.map(|r| r.iter().map(|s| s.to_string()).collect()))
        };
        NycSource::from_rows(path, rows, race, ids)
    }

    pub fn from_rows(
        path: &str,
        rows: Rows,
        race: &str,
        ids: &[(String, String)],
    ) -> AffinityResult<NycSource> {
        let mut rows = rows.peekable();
        let header = rows.next().context(MalformedHeaderSnafu {
            path,
            message: "the file is empty",
        })?;
        let columns: Vec<usize> = header
            .iter()
            .enumerate()
            .filter(|(_, h)| strip_bom(h).contains(race))
            .map(|(idx, _)| idx)
            .collect();
        ensure!(
            !columns.is_empty(),
            MalformedHeaderSnafu {
                path,
                message: format!("no column for the race {:?}", race),
            }
        );

        let mut parties: Vec<String> = Vec::new();
        for (_, name) in ids.iter() {
            if !parties.contains(name) {
                parties.push(name.clone());
            }
        }
        let party_index: HashMap<String, usize> = parties
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.clone(), idx))
            .collect();
        debug!(
            "NycSource::from_rows: {}: race {:?} in columns {:?}, {} candidates",
            path,
            race,
            columns,
            parties.len()
        );

        Ok(NycSource {
            file_name: path.to_string(),
            parties,
            party_index,
            ids: ids.iter().cloned().collect(),
            columns,
            rows,
            current: Vec::new(),
        })
    }

    // The candidate named by a cell, if any.
    fn candidate_of<'a>(&'a self, cell: &'a str) -> Option<&'a str> {
        let cell = cell.trim();
        if cell.is_empty()
            || cell.eq_ignore_ascii_case("undervote")
            || cell.eq_ignore_ascii_case("overvote")
        {
            return None;
        }
        match self.ids.get(cell) {
            Some(name) => Some(name.as_str()),
            None if self.party_index.contains_key(cell) => Some(cell),
            None => {
                debug!("NycSource::candidate_of: unknown candidacy {:?}", cell);
                None
            }
        }
    }
}

fn read_sheet(path: &str) -> AffinityResult<Vec<Vec<String>>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = workbook
        .worksheet_range_at(0)
        .context(EmptyExcelSnafu { path })?
        .context(OpeningExcelSnafu { path })?;
    Ok(wrange
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Empty => String::new(),
        _ => {
            debug!("cell_to_string: ignoring cell {:?}", cell);
            String::new()
        }
    }
}

impl SourceAdapter for NycSource {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn parties(&self) -> &[String] {
        &self.parties
    }

    fn candidates(&self) -> &[String] {
        &[]
    }

    fn party_of(&self, _candidate: &str) -> Option<String> {
        None
    }

    fn has_more_raw_ballots(&mut self) -> bool {
        self.rows.peek().is_some()
    }

    fn next_raw_ballot(&mut self) -> Option<&[Option<String>]> {
        let row = self.rows.next()?;
        let mut tokens: Vec<Option<String>> = vec![None; self.parties.len()];
        for (rank, col) in self.columns.iter().enumerate() {
            let cell = row.get(*col).map(|s| s.as_str()).unwrap_or("");
            let pos = self
                .candidate_of(cell)
                .and_then(|c| self.party_index.get(c).copied());
            if let Some(p) = pos {
                // A candidate ranked twice keeps its best rank.
                if tokens[p].is_none() {
                    tokens[p] = Some((rank + 1).to_string());
                }
            }
        }
        self.current = tokens;
        Some(&self.current)
    }

    fn stops_on_collision(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> Vec<(String, String)> {
        vec![
            ("1001".to_string(), "Eric Adams".to_string()),
            ("1002".to_string(), "Kathryn Garcia".to_string()),
            ("1003".to_string(), "Maya Wiley".to_string()),
        ]
    }

    fn rows(lines: &[&[&str]]) -> Rows {
        let v: Vec<Vec<String>> = lines
            .iter()
            .map(|l| l.iter().map(|s| s.to_string()).collect())
            .collect();
        Box::new(v.into_iter())
    }

    #[test]
    fn race_columns() {
        let r = rows(&[
            &["Cast Vote Record", "DEM Mayor Choice 1 of 5", "DEM Comptroller Choice 1 of 5", "DEM Mayor Choice 2 of 5"],
            &["1", "1002", "2001", "1001"],
            &["2", "undervote", "2001", "1003"],
            &["3", "1003", "", "1003"],
            &["4", "9999", "", "overvote"],
        ]);
        let mut src = NycSource::from_rows("cvr.csv", r, "DEM Mayor", &ids()).unwrap();
        assert_eq!(src.parties(), &["Eric Adams", "Kathryn Garcia", "Maya Wiley"]);
        assert!(src.candidates().is_empty());

        let b1: Vec<Option<String>> = src.next_raw_ballot().unwrap().to_vec();
        assert_eq!(b1, vec![Some("2".to_string()), Some("1".to_string()), None]);
        let b2: Vec<Option<String>> = src.next_raw_ballot().unwrap().to_vec();
        assert_eq!(b2, vec![None, None, Some("2".to_string())]);
        let b3: Vec<Option<String>> = src.next_raw_ballot().unwrap().to_vec();
        assert_eq!(b3, vec![None, None, Some("1".to_string())]);
        let b4: Vec<Option<String>> = src.next_raw_ballot().unwrap().to_vec();
        assert_eq!(b4, vec![None, None, None]);
        assert!(!src.has_more_raw_ballots());
    }

    #[test]
    fn unknown_race() {
        let r = rows(&[&["Cast Vote Record", "DEM Mayor Choice 1 of 5"]]);
        assert!(NycSource::from_rows("cvr.csv", r, "REP Mayor", &ids()).is_err());
    }

    #[test]
    fn excel_cells() {
        assert_eq!(cell_to_string(&DataType::Float(1001.0)), "1001");
        assert_eq!(cell_to_string(&DataType::String("1002".to_string())), "1002");
        assert_eq!(cell_to_string(&DataType::Empty), "");
    }
}
