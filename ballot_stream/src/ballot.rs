use std::fmt::Display;

use crate::config::*;

/// A ballot in canonical form.
///
/// The ballot has two sections: the above-the-line section ranks parties and
/// the below-the-line section ranks candidates (already translated to the
/// party of each candidate by the stream). Each section has a parallel
/// section of category labels, filled only when categories are in use.
///
/// A ballot is meant to be reused: it is cleared and refilled for every row
/// of a file, then validated. Once validated, its slots are frozen until the
/// next clear.
///
/// ```
/// use ballot_stream::{Ballot, BallotStatus, Preference};
///
/// let mut ballot = Ballot::new(3, 0);
/// ballot.set_above(0, Some("Greens".into()), true);
/// ballot.set_above(1, Some("Labor".into()), true);
/// ballot.validate(1, 6);
///
/// assert_eq!(ballot.status(), BallotStatus::AboveTheLine);
/// assert_eq!(ballot.primary_preference(), Some(Preference::Named("Greens".into())));
/// ```
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Ballot {
    above: Vec<Slot>,
    below: Vec<Slot>,
    above_cats: Vec<Slot>,
    below_cats: Vec<Slot>,
    uses_categories: bool,
    status: BallotStatus,
}

fn write_slot(slot: &mut Slot, value: Option<Name>, stop_on_collision: bool) {
    if stop_on_collision && !slot.is_empty() {
        *slot = Slot::Collision;
    } else {
        *slot = Slot::from_name(value);
    }
}

// The length of the valid prefix: everything before the first gap or collision.
fn number_ranked(slots: &[Slot]) -> usize {
    slots.iter().take_while(|s| s.is_filled()).count()
}

fn display_slots(f: &mut std::fmt::Formatter<'_>, slots: &[Slot]) -> std::fmt::Result {
    write!(f, "[")?;
    for (idx, s) in slots.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", s)?;
    }
    write!(f, "]")
}

// Scans a section in order until the first gap or collision. Comparing an
// option with itself gives `FirstPreferred` as soon as it is found.
fn scan_between<'a>(names: impl Iterator<Item = &'a Name>, first: &str, second: &str) -> Ranking {
    let mut seen = Ranking::Neither;
    for name in names {
        if &**name == first {
            match seen {
                Ranking::Neither => seen = Ranking::FirstOnly,
                Ranking::SecondOnly => return Ranking::SecondPreferred,
                _ => {}
            }
        }
        if &**name == second {
            match seen {
                Ranking::Neither => seen = Ranking::SecondOnly,
                Ranking::FirstOnly => return Ranking::FirstPreferred,
                _ => {}
            }
        }
    }
    seen
}

impl Ballot {
    pub fn new(num_above: usize, num_below: usize) -> Ballot {
        let mut b = Ballot::default();
        b.resize(num_above, num_below);
        b
    }

    /// Changes the size of the sections. The ballot is cleared.
    pub fn resize(&mut self, num_above: usize, num_below: usize) {
        self.above.resize(num_above, Slot::Empty);
        self.below.resize(num_below, Slot::Empty);
        self.above_cats.resize(num_above, Slot::Empty);
        self.below_cats.resize(num_below, Slot::Empty);
        self.clear();
    }

    /// Resets every slot and category slot, and makes the ballot unfinalized.
    pub fn clear(&mut self) {
        for s in self
            .above
            .iter_mut()
            .chain(self.below.iter_mut())
            .chain(self.above_cats.iter_mut())
            .chain(self.below_cats.iter_mut())
        {
            *s = Slot::Empty;
        }
        self.status = BallotStatus::Unfinalized;
    }

    /// Writes a party in the above-the-line section.
    ///
    /// With `stop_on_collision`, writing over an occupied slot turns it into
    /// a collision. Has no effect on a finalized ballot.
    ///
    /// Panics if `idx` is outside the section.
    pub fn set_above(&mut self, idx: usize, value: Option<Name>, stop_on_collision: bool) {
        if self.status.is_final() {
            return;
        }
        write_slot(&mut self.above[idx], value, stop_on_collision);
    }

    /// Same as [`Ballot::set_above`] for the below-the-line section.
    pub fn set_below(&mut self, idx: usize, value: Option<Name>, stop_on_collision: bool) {
        if self.status.is_final() {
            return;
        }
        write_slot(&mut self.below[idx], value, stop_on_collision);
    }

    pub fn set_above_category(&mut self, idx: usize, value: Option<Name>, stop_on_collision: bool) {
        if self.status.is_final() {
            return;
        }
        write_slot(&mut self.above_cats[idx], value, stop_on_collision);
    }

    pub fn set_below_category(&mut self, idx: usize, value: Option<Name>, stop_on_collision: bool) {
        if self.status.is_final() {
            return;
        }
        write_slot(&mut self.below_cats[idx], value, stop_on_collision);
    }

    pub fn turn_categories_on(&mut self) {
        self.uses_categories = true;
    }

    pub fn stop_using_categories(&mut self) {
        self.uses_categories = false;
        for s in self.above_cats.iter_mut().chain(self.below_cats.iter_mut()) {
            *s = Slot::Empty;
        }
    }

    pub fn uses_categories(&self) -> bool {
        self.uses_categories
    }

    pub fn above(&self) -> &[Slot] {
        &self.above
    }

    pub fn below(&self) -> &[Slot] {
        &self.below
    }

    pub fn above_categories(&self) -> &[Slot] {
        &self.above_cats
    }

    pub fn below_categories(&self) -> &[Slot] {
        &self.below_cats
    }

    pub fn status(&self) -> BallotStatus {
        self.status
    }

    pub fn is_formal(&self) -> bool {
        self.status.is_formal()
    }

    /// Number of parties ranked above the line before the first gap or collision.
    pub fn ranked_above(&self) -> usize {
        number_ranked(&self.above)
    }

    /// Number of candidates ranked below the line before the first gap or collision.
    pub fn ranked_below(&self) -> usize {
        number_ranked(&self.below)
    }

    /// Classifies the ballot. A valid below-the-line vote takes precedence
    /// over a valid above-the-line vote.
    pub fn validate(&mut self, min_above: usize, min_below: usize) -> &mut Self {
        self.status = if self.ranked_below() >= min_below {
            BallotStatus::BelowTheLine
        } else if self.ranked_above() >= min_above {
            BallotStatus::AboveTheLine
        } else {
            BallotStatus::Informal
        };
        self
    }

    /// Makes the ballot formal regardless of the minimums, using the section
    /// with the longest valid prefix (above the line on a tie).
    pub fn force_formal(&mut self) -> &mut Self {
        self.status = if self.ranked_below() > self.ranked_above() {
            BallotStatus::BelowTheLine
        } else {
            BallotStatus::AboveTheLine
        };
        self
    }

    // The valid prefix of the section that made the ballot formal, with its
    // categories. Empty when a forced ballot has no first preference.
    fn valid_section(&self) -> Option<(&[Slot], &[Slot])> {
        let (parties, cats) = match self.status {
            BallotStatus::AboveTheLine => (&self.above, &self.above_cats),
            BallotStatus::BelowTheLine => (&self.below, &self.below_cats),
            _ => return None,
        };
        let len = number_ranked(parties).min(cats.len());
        Some((&parties[..len], &cats[..len]))
    }

    fn first_party(&self) -> Option<&Name> {
        self.valid_section()
            .and_then(|(parties, _)| parties.first())
            .and_then(Slot::name)
    }

    pub fn primary_preference(&self) -> Option<Preference> {
        match self.status {
            BallotStatus::Unfinalized => None,
            BallotStatus::Informal => Some(Preference::Informal),
            _ => {
                let (parties, _) = self.valid_section()?;
                Some(
                    parties
                        .first()
                        .map(Preference::from_slot)
                        .unwrap_or(Preference::NoChoice),
                )
            }
        }
    }

    /// The category of the first preference. `None` when the ballot does not
    /// use categories.
    pub fn primary_category_preference(&self) -> Option<Preference> {
        if !self.uses_categories {
            return None;
        }
        match self.status {
            BallotStatus::Unfinalized => None,
            BallotStatus::Informal => Some(Preference::Informal),
            _ => {
                let (_, cats) = self.valid_section()?;
                Some(
                    cats.first()
                        .map(Preference::from_slot)
                        .unwrap_or(Preference::NoChoice),
                )
            }
        }
    }

    /// The first party of the valid section that differs from the first
    /// preference.
    pub fn second_preference(&self) -> Option<Preference> {
        match self.status {
            BallotStatus::Unfinalized => None,
            BallotStatus::Informal => Some(Preference::NoChoice),
            _ => {
                let firsts = self.first_n_parties(2)?;
                Some(match firsts.get(1) {
                    Some(Some(n)) => Preference::Named(n.clone()),
                    _ => Preference::NoChoice,
                })
            }
        }
    }

    /// The category of the first slot whose party differs from the first
    /// preference. Votes for the first party again are skipped, even when
    /// their category is another one.
    pub fn second_category_preference(&self) -> Option<Preference> {
        if !self.uses_categories {
            return None;
        }
        match self.status {
            BallotStatus::Unfinalized => None,
            BallotStatus::Informal => Some(Preference::NoChoice),
            _ => {
                let (parties, cats) = self.valid_section()?;
                let first = self.first_party();
                let found = parties
                    .iter()
                    .zip(cats.iter())
                    .skip(1)
                    .find(|(p, _)| p.name() != first);
                Some(match found {
                    Some((_, c)) => Preference::from_slot(c),
                    None => Preference::NoChoice,
                })
            }
        }
    }

    /// The first `n` distinct parties of the valid prefix, padded with
    /// `None`. The first element is the first preference.
    pub fn first_n_parties(&self, n: usize) -> Option<Vec<Option<Name>>> {
        match self.status {
            BallotStatus::Unfinalized => None,
            BallotStatus::Informal => Some(vec![None; n]),
            _ => {
                let (parties, _) = self.valid_section()?;
                let mut res: Vec<Option<Name>> = Vec::with_capacity(n);
                if n == 0 {
                    return Some(res);
                }
                res.push(parties.first().and_then(Slot::name).cloned());
                for slot in parties.iter().skip(1) {
                    if res.len() >= n {
                        break;
                    }
                    let name = slot.name().cloned();
                    if !res.contains(&name) {
                        res.push(name);
                    }
                }
                res.resize(n, None);
                Some(res)
            }
        }
    }

    /// The category of the first preference, followed by the distinct
    /// categories of the slots voting for another party than the first one.
    ///
    /// The first category may appear again later in the list, when another
    /// party of the same category is ranked.
    pub fn first_n_categories(&self, n: usize) -> Option<Vec<Option<Name>>> {
        if !self.uses_categories {
            return None;
        }
        match self.status {
            BallotStatus::Unfinalized => None,
            BallotStatus::Informal => Some(vec![None; n]),
            _ => {
                let (parties, cats) = self.valid_section()?;
                let first = self.first_party();
                let mut res: Vec<Option<Name>> = Vec::with_capacity(n);
                if n == 0 {
                    return Some(res);
                }
                res.push(cats.first().and_then(Slot::name).cloned());
                for (p, c) in parties.iter().zip(cats.iter()).skip(1) {
                    if res.len() >= n {
                        break;
                    }
                    if p.name() == first {
                        continue;
                    }
                    let cat = c.name().cloned();
                    if !res[1..].contains(&cat) {
                        res.push(cat);
                    }
                }
                res.resize(n, None);
                Some(res)
            }
        }
    }

    /// Which of the two parties this ballot ranks first.
    pub fn prefer_between_parties(&self, first: &str, second: &str) -> Option<Ranking> {
        match self.status {
            BallotStatus::Unfinalized => None,
            BallotStatus::Informal => Some(Ranking::Informal),
            _ => {
                let (parties, _) = self.valid_section()?;
                let names = parties.iter().map_while(Slot::name);
                Some(scan_between(names, first, second))
            }
        }
    }

    /// Which of the two categories this ballot ranks first. The slots voting
    /// for the first party are not counted.
    pub fn prefer_between_categories(&self, first: &str, second: &str) -> Option<Ranking> {
        if !self.uses_categories {
            return None;
        }
        match self.status {
            BallotStatus::Unfinalized => None,
            BallotStatus::Informal => Some(Ranking::Informal),
            _ => {
                let (parties, cats) = self.valid_section()?;
                let first_party = self.first_party();
                let names = parties
                    .iter()
                    .zip(cats.iter())
                    .filter(|(p, _)| p.name() != first_party)
                    .filter_map(|(_, c)| c.name());
                Some(scan_between(names, first, second))
            }
        }
    }
}

impl Display for Ballot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ATL: ")?;
        display_slots(f, &self.above)?;
        write!(f, " BTL: ")?;
        display_slots(f, &self.below)?;
        if self.uses_categories {
            write!(f, " ATL categories: ")?;
            display_slots(f, &self.above_cats)?;
            write!(f, " BTL categories: ")?;
            display_slots(f, &self.below_cats)?;
        }
        write!(f, " Status: {}", self.status)
    }
}
