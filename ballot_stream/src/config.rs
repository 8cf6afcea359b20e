// ********* Ballot data structures ***********

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use snafu::Snafu;

/// A canonical party, candidate or category name.
///
/// Names are shared between the alias table, the category overlay and every
/// ballot read from a stream, so they are reference counted.
pub type Name = Arc<str>;

/// The content of one position in a ballot section.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Default)]
pub enum Slot {
    /// No ranking at this position.
    #[default]
    Empty,
    /// Two raw rankings landed on this position. A collision ends the
    /// valid part of the section.
    Collision,
    /// A party (or candidate, or category) name.
    Filled(Name),
}

impl Slot {
    pub fn name(&self) -> Option<&Name> {
        match self {
            Slot::Filled(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, Slot::Filled(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    pub(crate) fn from_name(name: Option<Name>) -> Slot {
        match name {
            Some(n) => Slot::Filled(n),
            None => Slot::Empty,
        }
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::Empty => write!(f, "-"),
            Slot::Collision => write!(f, "COLLISION"),
            Slot::Filled(n) => write!(f, "{}", n),
        }
    }
}

/// The classification of a ballot.
///
/// A ballot is `Unfinalized` between a clear and a validation. Once
/// finalized, the slots can no longer be written.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Default)]
pub enum BallotStatus {
    #[default]
    Unfinalized,
    Informal,
    AboveTheLine,
    BelowTheLine,
}

impl BallotStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, BallotStatus::Unfinalized)
    }

    pub fn is_formal(&self) -> bool {
        matches!(self, BallotStatus::AboveTheLine | BallotStatus::BelowTheLine)
    }

    pub fn is_atl(&self) -> bool {
        matches!(self, BallotStatus::AboveTheLine)
    }

    pub fn is_btl(&self) -> bool {
        matches!(self, BallotStatus::BelowTheLine)
    }
}

impl Display for BallotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BallotStatus::Unfinalized => "UNFINALIZED",
            BallotStatus::Informal => "INFORMAL",
            BallotStatus::AboveTheLine => "ATL",
            BallotStatus::BelowTheLine => "BTL",
        };
        write!(f, "{}", s)
    }
}

/// The answer to a first or second preference query on a finalized ballot.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Preference {
    Named(Name),
    /// The valid part of the ballot holds no (further) distinct choice.
    NoChoice,
    /// The ballot is informal.
    Informal,
}

impl Preference {
    pub fn name(&self) -> Option<&Name> {
        match self {
            Preference::Named(n) => Some(n),
            _ => None,
        }
    }

    pub(crate) fn from_slot(slot: &Slot) -> Preference {
        match slot {
            Slot::Filled(n) => Preference::Named(n.clone()),
            _ => Preference::NoChoice,
        }
    }
}

impl Display for Preference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Preference::Named(n) => write!(f, "{}", n),
            Preference::NoChoice => write!(f, "No Choice"),
            Preference::Informal => write!(f, "Informal"),
        }
    }
}

/// How a ballot orders two options.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum Ranking {
    /// The first option appears and the second one does not.
    FirstOnly,
    /// The second option appears and the first one does not.
    SecondOnly,
    /// Both appear, the first one earlier.
    FirstPreferred,
    /// Both appear, the second one earlier.
    SecondPreferred,
    Neither,
    Informal,
}

impl Ranking {
    pub const ALL: [Ranking; 6] = [
        Ranking::FirstOnly,
        Ranking::SecondOnly,
        Ranking::FirstPreferred,
        Ranking::SecondPreferred,
        Ranking::Neither,
        Ranking::Informal,
    ];

    /// The camelCase label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Ranking::FirstOnly => "firstOnly",
            Ranking::SecondOnly => "secondOnly",
            Ranking::FirstPreferred => "firstPreferred",
            Ranking::SecondPreferred => "secondPreferred",
            Ranking::Neither => "neither",
            Ranking::Informal => "informal",
        }
    }
}

// ********* Categorization **********

/// The predefined ways of grouping the parties of an election.
///
/// An election decides which of these it can provide, see
/// [`crate::ElectionResource::categorization_scheme`].
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum CategoryKind {
    Uncategorized,
    AllAustralia,
    CrossElection,
    SizeBased,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 4] = [
        CategoryKind::Uncategorized,
        CategoryKind::AllAustralia,
        CategoryKind::CrossElection,
        CategoryKind::SizeBased,
    ];

    /// A human readable title, for report headers.
    pub fn title(&self) -> &'static str {
        match self {
            CategoryKind::Uncategorized => "Uncategorized",
            CategoryKind::AllAustralia => "All Australia",
            CategoryKind::CrossElection => "Cross Election",
            CategoryKind::SizeBased => "Size Based",
        }
    }
}

impl Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CategoryKind::Uncategorized => "uncategorized",
            CategoryKind::AllAustralia => "all-Australia",
            CategoryKind::CrossElection => "cross-election",
            CategoryKind::SizeBased => "size-based",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for CategoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryKind::ALL
            .iter()
            .find(|k| k.to_string().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown categorization: {:?}", s))
    }
}

/// Errors raised when changing how a stream groups its parties.
///
/// All of them leave the stream in the categorization it had before the call.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum CategorizationError {
    #[snafu(display("party {party:?} is not covered by the categorization"))]
    MissingParty { party: String },
    #[snafu(display(
        "cannot change the categorization after {processed} ballots were read, restart the stream first"
    ))]
    StreamInProgress { processed: usize },
    #[snafu(display("categorization {kind} is not defined for {election}"))]
    NotDefined { kind: CategoryKind, election: String },
}
