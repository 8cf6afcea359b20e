use clap::Parser;

/// Preference analysis over ranked ballots from Australian and New York elections.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON file describing the election: provider, data files, party order,
    /// aliases and categorizations. See the manual of the ballot_stream crate for the format.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path) A reference summary in JSON format. If provided, rcvaffinity will check
    /// that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format
    /// to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file or directory path) If specified, reads the ballots from this location instead of
    /// the dataLocation of the configuration.
    #[clap(short, long, value_parser)]
    pub data: Option<String>,

    /// (uncategorized, all-Australia, cross-election, size-based) Overrides the categorization
    /// of the analysis section of the configuration.
    #[clap(long, value_parser)]
    pub categorization: Option<String>,

    /// If passed as an argument, lists the party names found in the data files as
    /// 'alias,canonical' lines instead of running the analysis.
    #[clap(long, takes_value = false)]
    pub collect_names: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
