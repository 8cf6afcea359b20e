/*!

This is the long-form manual for `ballot_stream` and `rcvaffinity`.

## Ballots

A [`crate::Ballot`] has two sections. Above the line, the voter ranks
parties (groups); below the line, the voter ranks individual candidates.
Preference queries work on parties in both cases: the stream replaces every
candidate by the canonical party of that candidate.

Only the beginning of a section counts: the ranking stops at the first
missing rank or at the first rank given twice (a collision). A ballot is:
* below the line (`BTL`) if it ranks at least `minRankedBelow` candidates,
* otherwise above the line (`ATL`) if it ranks at least `minRankedAbove`
  parties,
* otherwise informal.

Some elections consider every ballot they publish as formal. For these, the
ballot is assigned to the section with the longest ranking.

## Input formats

The following providers are supported by `rcvaffinity`:
* `aec2016` Australian senate 2016, formal preferences files
* `aec2019`, `aec2022` Australian senate 2019 and 2022, one column per party
  and candidate
* `nsw` New South Wales legislative council, one line per preference
* `nyc2021` New York City 2021 primaries, cast vote records

### `aec2016`

Each data file covers one state; the state is the last `-` separated part of
the file name (`aec-senate-formalpreferences-20499-TAS.csv`). The data file
starts with two header lines, and every ballot holds a `Preferences` field
listing the ranks of the groups, then of the candidates. `*` and `/` stand
for a first preference.

The candidates come from the candidate information file given by
`candidateFile` (columns `nom_ty`, `state_ab`, `ticket`, `surname`,
`ballot_given_nm`, `party_ballot_nm`).

### `aec2019` and `aec2022`

One line per ballot. The header lists the groups (`A:Liberal`) then the
candidates (`A:SMITH John`). The candidates start at the first column whose
group letter was already seen. The 2022 files may contain party names with
unquoted commas in the header; they are merged back.

### `nsw`

A tab separated file with one line per preference, grouped by ballot paper
(`VCBallotPaperID`). The candidates and their groups come from
`candidateFile`. Informal papers are skipped, and every paper that is read
is considered formal.

### `nyc2021`

A CSV or Excel (`.xlsx`) cast vote record. The columns of a race are the
columns whose header contains the race label (for example `DEM Mayor`),
in preference order. Cells hold candidacy IDs, translated to names through
`candidacyIdFile`. There is no below-the-line section.

## Aliases

Party names change between files and between elections. The alias file is a
two-column CSV, `alias,canonical`. Every canonical party maps to itself. When
an alias is given twice, the last line wins. A ballot that ranks a party with
no alias stops at that party.

`rcvaffinity --collect-names` lists every party name found in the data files,
in a format that can be edited into an alias file.

## Categories

Parties can be grouped into categories, for example to compare the second
preferences of Greens voters between major and minor parties. Every party
must belong to exactly one category. Categories can be used for the first
preference, for the other preferences, or both.

Categories are named after their kind (`all-Australia`, `cross-election`,
`size-based`). Each category lists its parties by name or by their index in
the party order. With a `remainder` label, the parties that are not listed go
to that category.

The categorization can only change before the first ballot is read, or after
a restart.

## Summary format

`rcvaffinity` writes a JSON summary:

```text
{
  "config": { "election": ..., "categorization": ..., "files": [...] },
  "results": {
    "ballots": ..., "formal": ..., "aboveTheLine": ..., "belowTheLine": ...,
    "informal": ...,
    "primary": { option: count },
    "secondary": { option: count },
    "comparisons": [ { "first": ..., "second": ..., "firstOnly": ..., ... } ]
  }
}
```

When a reference summary is given with `--reference`, the program fails if the
two summaries differ, and prints the differences.
*/
