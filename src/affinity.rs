use log::{debug, info, warn};

use ballot_stream::*;
use snafu::{prelude::*, Snafu};

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::affinity::config_reader::*;
use crate::affinity::io_aec2016::Aec2016Source;
use crate::affinity::io_aec_wide::AecWideSource;
use crate::affinity::io_common::{datafile_queue, read_lines, read_pairs, simplify_file_name};
use crate::affinity::io_nsw::NswSource;
use crate::affinity::io_nyc::NycSource;

pub mod config_reader;
mod io_aec2016;
mod io_aec_wide;
mod io_common;
mod io_nsw;
mod io_nyc;

#[derive(Debug, Snafu)]
pub enum AffinityError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening the configuration {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing the summary"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No sheet in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Column {column:?} not found in {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Malformed header in {path}: {message}"))]
    MalformedHeader { path: String, message: String },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("The configuration does not set {setting}, required by this provider"))]
    MissingSetting { setting: String },
    #[snafu(display("Unknown categorization {kind:?}"))]
    UnknownCategorization { kind: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type AffinityResult<T> = Result<T, AffinityError>;

/// The reader of one data file, whatever the provider.
pub enum ElectionSource {
    Aec2016(Aec2016Source),
    AecWide(AecWideSource),
    Nsw(NswSource),
    Nyc(NycSource),
}

impl ElectionSource {
    fn adapter(&self) -> &dyn SourceAdapter {
        match self {
            ElectionSource::Aec2016(s) => s,
            ElectionSource::AecWide(s) => s,
            ElectionSource::Nsw(s) => s,
            ElectionSource::Nyc(s) => s,
        }
    }

    fn adapter_mut(&mut self) -> &mut dyn SourceAdapter {
        match self {
            ElectionSource::Aec2016(s) => s,
            ElectionSource::AecWide(s) => s,
            ElectionSource::Nsw(s) => s,
            ElectionSource::Nyc(s) => s,
        }
    }
}

impl SourceAdapter for ElectionSource {
    fn file_name(&self) -> &str {
        self.adapter().file_name()
    }

    fn parties(&self) -> &[String] {
        self.adapter().parties()
    }

    fn parties_unaltered(&self) -> Vec<String> {
        self.adapter().parties_unaltered()
    }

    fn parties_including_secondary(&self) -> Vec<String> {
        self.adapter().parties_including_secondary()
    }

    fn candidates(&self) -> &[String] {
        self.adapter().candidates()
    }

    fn party_of(&self, candidate: &str) -> Option<String> {
        self.adapter().party_of(candidate)
    }

    fn candidate_party_at(&self, idx: usize) -> Option<String> {
        self.adapter().candidate_party_at(idx)
    }

    fn has_more_raw_ballots(&mut self) -> bool {
        self.adapter_mut().has_more_raw_ballots()
    }

    fn next_raw_ballot(&mut self) -> Option<&[Option<String>]> {
        self.adapter_mut().next_raw_ballot()
    }

    fn stops_on_collision(&self) -> bool {
        self.adapter().stops_on_collision()
    }
}

// What each provider needs besides the data files.
#[derive(Eq, PartialEq, Debug, Clone)]
enum ProviderSettings {
    Aec2016 { candidate_file: String },
    AecWide { repair_header: bool },
    Nsw { candidate_file: String },
    Nyc {
        race: String,
        candidacy_ids: Vec<(String, String)>,
    },
}

/// An election described by a configuration file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Election {
    name: String,
    data_location: PathBuf,
    parties: Vec<String>,
    aliases: Vec<(String, String)>,
    min_above: usize,
    min_below: usize,
    force_formal: bool,
    schemes: Vec<(CategoryKind, CategoryScheme)>,
    settings: ProviderSettings,
}

// Paths of the configuration are relative to its directory.
fn resolve_path(root: &Path, rel: &str) -> String {
    let p: PathBuf = [root, Path::new(rel)].iter().collect();
    p.display().to_string()
}

impl Election {
    pub fn from_config(
        config: &AffinityConfig,
        root: &Path,
        data_override: &Option<String>,
    ) -> AffinityResult<Election> {
        let es = &config.election;
        let data_location = match data_override {
            Some(d) => PathBuf::from(d),
            None => PathBuf::from(resolve_path(root, &es.data_location)),
        };

        let parties: Vec<String> = match (&es.party_order, &es.party_order_file) {
            (Some(p), _) => p.clone(),
            (None, Some(f)) => read_lines(&resolve_path(root, f))?,
            (None, None) => whatever!("The configuration must set partyOrder or partyOrderFile"),
        };
        let aliases = match &es.alias_file {
            Some(f) => read_pairs(&resolve_path(root, f))?,
            None => vec![],
        };

        let settings = match es.provider {
            Provider::Aec2016 => ProviderSettings::Aec2016 {
                candidate_file: resolve_path(root, required(&es.candidate_file, "candidateFile")?),
            },
            Provider::Aec2019 => ProviderSettings::AecWide {
                repair_header: false,
            },
            Provider::Aec2022 => ProviderSettings::AecWide {
                repair_header: true,
            },
            Provider::Nsw => ProviderSettings::Nsw {
                candidate_file: resolve_path(root, required(&es.candidate_file, "candidateFile")?),
            },
            Provider::Nyc2021 => {
                let id_file = required(&es.candidacy_id_file, "candidacyIdFile")?;
                ProviderSettings::Nyc {
                    race: required(&es.race, "race")?.to_string(),
                    candidacy_ids: read_pairs(&resolve_path(root, id_file))?,
                }
            }
        };

        let mut schemes: Vec<(CategoryKind, CategoryScheme)> = Vec::new();
        for cs in config.categorizations.iter() {
            schemes.push((cs.kind()?, cs.scheme()));
        }

        let (default_above, default_below) = es.provider.default_minimums();
        let election = Election {
            name: es.name.clone(),
            data_location,
            parties,
            aliases,
            min_above: es.min_ranked_above.unwrap_or(default_above),
            min_below: es.min_ranked_below.unwrap_or(default_below),
            force_formal: es.force_formal.unwrap_or_else(|| es.provider.forces_formal()),
            schemes,
            settings,
        };
        debug!("Election::from_config: {:?}", election);
        Ok(election)
    }
}

fn required<'a>(value: &'a Option<String>, setting: &str) -> AffinityResult<&'a str> {
    value
        .as_deref()
        .context(MissingSettingSnafu { setting })
}

impl ElectionResource for Election {
    type Source = ElectionSource;
    type Error = AffinityError;

    fn election_name(&self) -> &str {
        &self.name
    }

    fn party_list(&self) -> &[String] {
        &self.parties
    }

    fn alias_pairs(&self) -> Vec<(String, String)> {
        self.aliases.clone()
    }

    fn datafile_queue(&self) -> VecDeque<String> {
        datafile_queue(&self.data_location)
    }

    fn open_source(&self, file: &str) -> AffinityResult<ElectionSource> {
        let src = match &self.settings {
            ProviderSettings::Aec2016 { candidate_file } => {
                ElectionSource::Aec2016(Aec2016Source::open(candidate_file, file)?)
            }
            ProviderSettings::AecWide { repair_header } => {
                ElectionSource::AecWide(AecWideSource::open(file, *repair_header)?)
            }
            ProviderSettings::Nsw { candidate_file } => {
                ElectionSource::Nsw(NswSource::open(candidate_file, file)?)
            }
            ProviderSettings::Nyc {
                race,
                candidacy_ids,
            } => ElectionSource::Nyc(NycSource::open(file, race, candidacy_ids)?),
        };
        Ok(src)
    }

    fn min_ranked_above(&self) -> usize {
        self.min_above
    }

    fn min_ranked_below(&self) -> usize {
        self.min_below
    }

    fn additional_processing(&self, ballot: &mut Ballot) {
        if self.force_formal {
            ballot.force_formal();
        }
    }

    fn categorization_scheme(&self, kind: CategoryKind) -> Option<CategoryScheme> {
        self.schemes
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, s)| s.clone())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct OutputConfig {
    pub election: String,
    pub categorization: String,
    pub files: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct Comparison {
    first: String,
    second: String,
    counts: BTreeMap<Ranking, u64>,
}

/// The counts accumulated over a stream.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
struct Tally {
    ballots: u64,
    above_the_line: u64,
    below_the_line: u64,
    informal: u64,
    primary: BTreeMap<String, u64>,
    secondary: BTreeMap<String, u64>,
    comparisons: Vec<Comparison>,
}

impl Tally {
    fn formal(&self) -> u64 {
        self.above_the_line + self.below_the_line
    }
}

fn tally<E: ElectionResource>(stream: &mut BallotStream<E>, comparisons: &[(String, String)]) -> Tally {
    let mut res = Tally {
        comparisons: comparisons
            .iter()
            .map(|(a, b)| Comparison {
                first: a.clone(),
                second: b.clone(),
                counts: BTreeMap::new(),
            })
            .collect(),
        ..Tally::default()
    };
    while stream.next_ballot().is_some() {
        res.ballots += 1;
        let status = match stream.current_ballot() {
            Some(b) => b.status(),
            None => continue,
        };
        match status {
            BallotStatus::AboveTheLine => res.above_the_line += 1,
            BallotStatus::BelowTheLine => res.below_the_line += 1,
            BallotStatus::Informal | BallotStatus::Unfinalized => res.informal += 1,
        }
        if status.is_formal() {
            if let Some(p) = stream.primary_choice() {
                *res.primary.entry(p.to_string()).or_insert(0) += 1;
            }
            if let Some(s) = stream.secondary_choice() {
                *res.secondary.entry(s.to_string()).or_insert(0) += 1;
            }
        }
        for c in res.comparisons.iter_mut() {
            if let Some(r) = stream.preference_between(&c.first, &c.second) {
                *c.counts.entry(r).or_insert(0) += 1;
            }
        }
    }
    info!(
        "tally: {} ballots, {} formal, {} informal",
        res.ballots,
        res.formal(),
        res.informal
    );
    res
}

fn comparison_to_json(c: &Comparison) -> JSValue {
    let mut m: JSMap<String, JSValue> = JSMap::new();
    m.insert("first".to_string(), json!(c.first));
    m.insert("second".to_string(), json!(c.second));
    for r in Ranking::ALL.iter() {
        let count = c.counts.get(r).copied().unwrap_or(0);
        m.insert(r.label().to_string(), json!(count));
    }
    JSValue::Object(m)
}

fn build_summary_js(config: &OutputConfig, t: &Tally) -> JSValue {
    let comparisons: Vec<JSValue> = t.comparisons.iter().map(comparison_to_json).collect();
    json!({
        "config": config,
        "results": {
            "ballots": t.ballots,
            "formal": t.formal(),
            "aboveTheLine": t.above_the_line,
            "belowTheLine": t.below_the_line,
            "informal": t.informal,
            "primary": t.primary,
            "secondary": t.secondary,
            "comparisons": comparisons,
        }
    })
}

fn read_election(config_path: &str, data: &Option<String>) -> AffinityResult<(AffinityConfig, Election)> {
    let config = read_config(config_path)?;
    info!("config: {:?}", config);
    let root = Path::new(config_path)
        .parent()
        .context(MissingParentDirSnafu {})?;
    let election = Election::from_config(&config, root, data)?;
    Ok((config, election))
}

fn write_output(out: &Option<String>, contents: &str) -> AffinityResult<()> {
    match out.as_deref() {
        None | Some("") | Some("stdout") => {
            println!("{}", contents);
        }
        Some(path) => {
            fs::write(path, contents).context(WritingOutputSnafu { path })?;
            info!("write_output: written to {}", path);
        }
    }
    Ok(())
}

pub fn read_summary(path: &str) -> AffinityResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read content: {:?}", contents);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

fn check_reference(reference_path: &str, pretty_js_stats: &str) -> AffinityResult<()> {
    let summary_ref = read_summary(reference_path)?;
    info!("summary: {:?}", summary_ref);
    let pretty_js_summary_ref = serde_json::to_string_pretty(&summary_ref).context(WritingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference string");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        whatever!("Difference detected between calculated summary and reference summary")
    }
    Ok(())
}

/// Streams every ballot of the configured election and writes the summary.
pub fn run_analysis(
    config_path: &str,
    data: &Option<String>,
    categorization: &Option<String>,
    reference: &Option<String>,
    out: &Option<String>,
) -> AffinityResult<()> {
    let (config, election) = read_election(config_path, data)?;
    let analysis = &config.analysis;

    let kind = match categorization.as_ref().or(analysis.categorization.as_ref()) {
        Some(k) => CategoryKind::from_str(k)
            .ok()
            .context(UnknownCategorizationSnafu { kind: k })?,
        None => CategoryKind::Uncategorized,
    };
    let files: Vec<String> = election
        .datafile_queue()
        .iter()
        .map(|f| simplify_file_name(f))
        .collect();

    let mut stream = BallotStream::new(election);
    if let Err(e) = stream.predefined_categorization(
        kind,
        analysis.use_primary.unwrap_or(true),
        analysis.use_secondary.unwrap_or(true),
    ) {
        warn!("run_analysis: continuing without categories: {}", e);
    }
    let applied = if stream.categories_are_active() {
        kind
    } else {
        CategoryKind::Uncategorized
    };

    let t = tally(&mut stream, &analysis.comparisons);

    let output_config = OutputConfig {
        election: stream.election_name(),
        categorization: applied.to_string(),
        files,
    };
    let result_js = build_summary_js(&output_config, &t);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(WritingJsonSnafu {})?;
    write_output(out, &pretty_js_stats)?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = reference {
        check_reference(summary_p, &pretty_js_stats)?;
    }
    Ok(())
}

// One `alias,canonical` line per pair.
fn party_names_csv(pairs: &[(String, String)]) -> AffinityResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for (alias, canonical) in pairs.iter() {
        if let Err(e) = wtr.write_record([alias, canonical]) {
            whatever!("party_names_csv: cannot write {:?}: {}", alias, e)
        }
    }
    match wtr.into_inner() {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).to_string()),
        Err(e) => whatever!("party_names_csv: {}", e),
    }
}

/// Lists the party names found in the data files, in the alias file format.
pub fn collect_names(config_path: &str, data: &Option<String>, out: &Option<String>) -> AffinityResult<()> {
    let (_, election) = read_election(config_path, data)?;
    let pairs = collect_party_names(&election);
    info!("collect_names: {} names", pairs.len());
    let contents = party_names_csv(&pairs)?;
    write_output(out, contents.trim_end())
}
