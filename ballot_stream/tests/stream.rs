use std::collections::HashMap;

use ballot_stream::builder::{Builder, FileBuilder, MemoryElection};
use ballot_stream::*;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn named(s: &str) -> Option<Preference> {
    Some(Preference::Named(s.into()))
}

fn filled(s: &str) -> Slot {
    Slot::Filled(s.into())
}

fn australia() -> Builder {
    Builder::new("Senate").parties(&["Greens", "Labor", "Liberal", "Nationals"])
}

fn left_right() -> (Vec<String>, HashMap<String, String>) {
    let cats = vec!["Left".to_string(), "Right".to_string()];
    let map: HashMap<String, String> = [
        ("Greens", "Left"),
        ("Labor", "Left"),
        ("Liberal", "Right"),
        ("Nationals", "Right"),
    ]
    .iter()
    .map(|(p, c)| (p.to_string(), c.to_string()))
    .collect();
    (cats, map)
}

fn one_file(rows: &[&[&str]]) -> MemoryElection {
    let mut file = FileBuilder::new("senate.csv").parties(&["Greens", "Labor", "Liberal", "Nationals"]);
    for r in rows.iter() {
        file = file.row(r);
    }
    australia().file(file).build()
}

#[test]
fn end_to_end_above_the_line() {
    init_logs();
    let election = Builder::new("Example")
        .parties(&["A", "B", "C"])
        .minimums(1, 6)
        .file(FileBuilder::new("example.csv").parties(&["A", "B", "C"]).row(&["1", "2", "3"]))
        .build();
    let mut stream = BallotStream::new(election);
    assert_eq!(stream.primary_choice(), None);

    let ballot = stream.next_ballot().unwrap();
    assert_eq!(ballot.above(), &[filled("A"), filled("B"), filled("C")]);
    assert_eq!(ballot.status(), BallotStatus::AboveTheLine);
    assert_eq!(ballot.primary_preference(), named("A"));
    assert_eq!(ballot.second_preference(), named("B"));
    assert_eq!(ballot.prefer_between_parties("B", "C"), Some(Ranking::FirstPreferred));

    assert_eq!(stream.primary_choice(), named("A"));
    assert_eq!(stream.primary_choice_index(), Some(0));
    assert_eq!(stream.secondary_choice(), named("B"));
    assert_eq!(stream.preference_between("C", "B"), Some(Ranking::SecondPreferred));
    assert_eq!(stream.ballot_is_formal(), Some(true));

    assert!(stream.next_ballot().is_none());
    assert_eq!(stream.primary_choice(), None);
    assert_eq!(stream.current_ballot_num(), 1);
}

#[test]
fn ranks_follow_the_tokens() {
    let mut stream = BallotStream::new(one_file(&[&["3", "", "1", "2"]]));
    let ballot = stream.next_ballot().unwrap();
    assert_eq!(
        ballot.above(),
        &[filled("Liberal"), filled("Nationals"), filled("Greens"), Slot::Empty]
    );
}

#[test]
fn multi_file_continuity() {
    init_logs();
    let election = australia()
        .file(
            FileBuilder::new("nsw.csv")
                .parties(&["Greens", "Labor"])
                .row(&["1", "2"])
                .row(&["2", "1"]),
        )
        .file(
            FileBuilder::new("vic.csv")
                .parties(&["Greens", "Liberal", "Nationals"])
                .row(&["3", "1", "2"]),
        )
        .build();
    let mut stream = BallotStream::new(election);
    assert_eq!(stream.file_name(), Some("nsw.csv"));
    assert!(stream.prim_runs_in_current_file("Labor"));
    assert!(!stream.prim_runs_in_current_file("Liberal"));

    assert_eq!(stream.next_ballot().and_then(|b| b.primary_preference()), named("Greens"));
    assert_eq!(stream.next_ballot().and_then(|b| b.primary_preference()), named("Labor"));
    assert_eq!(stream.current_ballot_num(), 2);

    // The first file is exhausted: the stream moves to the second one.
    assert!(stream.has_more_ballots());
    assert_eq!(stream.file_name(), Some("vic.csv"));
    assert!(stream.prim_runs_in_current_file("Liberal"));
    assert!(!stream.prim_runs_in_current_file("Labor"));

    let ballot = stream.next_ballot().unwrap();
    assert_eq!(
        ballot.above(),
        &[filled("Liberal"), filled("Nationals"), filled("Greens")]
    );
    assert_eq!(stream.current_ballot_num(), 3);

    assert!(!stream.has_more_ballots());
    assert!(stream.next_ballot().is_none());
    assert_eq!(stream.current_ballot_num(), 3);
}

#[test]
fn restart_reads_again() {
    let mut stream = BallotStream::new(one_file(&[&["1", "", "", ""], &["", "1", "", ""]]));
    while stream.next_ballot().is_some() {}
    assert_eq!(stream.current_ballot_num(), 2);
    stream.restart();
    assert_eq!(stream.current_ballot_num(), 0);
    assert_eq!(stream.next_ballot().and_then(|b| b.primary_preference()), named("Greens"));
}

#[test]
fn secondary_parties_are_running() {
    let election = australia()
        .file(
            FileBuilder::new("tas.csv")
                .parties(&["Greens"])
                .secondary_parties(&["Nationals"])
                .row(&["1"]),
        )
        .build();
    let stream = BallotStream::new(election);
    assert!(stream.prim_runs_in_current_file("Nationals"));
    assert!(!stream.prim_runs_in_current_file("Labor"));
}

#[test]
fn unreadable_files_are_skipped() {
    init_logs();
    let election = australia()
        .file(FileBuilder::new("missing.csv").unreadable())
        .file(FileBuilder::new("act.csv").parties(&["Labor"]).row(&["1"]))
        .file(FileBuilder::new("broken.csv").unreadable())
        .build();
    let mut stream = BallotStream::new(election);
    assert_eq!(stream.file_name(), Some("act.csv"));
    assert_eq!(stream.next_ballot().and_then(|b| b.primary_preference()), named("Labor"));
    assert!(stream.next_ballot().is_none());
    assert_eq!(stream.file_name(), None);
}

#[test]
fn aliases_are_resolved() {
    let election = Builder::new("WA")
        .parties(&["Greens", "Labor"])
        .alias("Grn (WA)", "Greens")
        .file(
            FileBuilder::new("wa.csv")
                .parties(&["Grn (WA)", "Labor"])
                .row(&["2", "1"]),
        )
        .build();
    let mut stream = BallotStream::new(election);
    assert!(stream.prim_runs_in_current_file("Greens"));
    assert!(stream.prim_runs_in_current_file("Grn (WA)"));
    assert!(stream.names_equal("Greens", "Grn (WA)"));
    assert_eq!(stream.name_party_to_index("Grn (WA)"), Some(0));

    let ballot = stream.next_ballot().unwrap();
    assert_eq!(ballot.above(), &[filled("Labor"), filled("Greens")]);
    assert_eq!(stream.preference_between("Grn (WA)", "Labor"), Some(Ranking::SecondPreferred));
}

#[test]
fn unknown_alias_ends_the_ranking() {
    let election = Builder::new("WA")
        .parties(&["Greens", "Labor"])
        .file(
            FileBuilder::new("wa.csv")
                .parties(&["Greens", "Mystery Party", "Labor"])
                .row(&["1", "2", "3"]),
        )
        .build();
    let mut stream = BallotStream::new(election);
    let ballot = stream.next_ballot().unwrap();
    assert_eq!(ballot.ranked_above(), 1);
    assert_eq!(ballot.above()[1], Slot::Empty);
    assert_eq!(ballot.primary_preference(), named("Greens"));
    assert_eq!(ballot.second_preference(), Some(Preference::NoChoice));
}

#[test]
fn bad_ranks_are_dropped() {
    let mut stream = BallotStream::new(one_file(&[
        &["1", "0", "9", "abc"],
        &["2", " 1 ", "", "-1"],
    ]));
    let ballot = stream.next_ballot().unwrap();
    assert_eq!(ballot.ranked_above(), 1);
    assert_eq!(ballot.above()[1..], [Slot::Empty, Slot::Empty, Slot::Empty]);

    let ballot = stream.next_ballot().unwrap();
    assert_eq!(ballot.above()[..2], [filled("Labor"), filled("Greens")]);
}

#[test]
fn tokens_beyond_the_ballot_are_dropped() {
    let mut stream = BallotStream::new(one_file(&[&["1", "2", "3", "4", "1", "1"]]));
    let ballot = stream.next_ballot().unwrap();
    assert_eq!(ballot.ranked_above(), 4);
}

#[test]
fn collisions() {
    let rows: &[&str] = &["1", "1", "2", ""];
    let mut stream = BallotStream::new(one_file(&[rows]));
    let ballot = stream.next_ballot().unwrap();
    assert_eq!(ballot.above()[0], Slot::Collision);
    assert_eq!(ballot.status(), BallotStatus::Informal);
    assert_eq!(stream.primary_choice(), Some(Preference::Informal));

    let election = australia()
        .file(
            FileBuilder::new("nsw.tsv")
                .parties(&["Greens", "Labor", "Liberal", "Nationals"])
                .no_collisions()
                .row(rows),
        )
        .build();
    let mut stream = BallotStream::new(election);
    let ballot = stream.next_ballot().unwrap();
    assert_eq!(ballot.above()[..2], [filled("Labor"), filled("Liberal")]);
    assert_eq!(ballot.status(), BallotStatus::AboveTheLine);
}

#[test]
fn below_the_line_uses_candidate_parties() {
    let election = Builder::new("Senate")
        .parties(&["Greens", "Labor"])
        .minimums(1, 2)
        .alias("Grn", "Greens")
        .file(
            FileBuilder::new("senate.csv")
                .parties(&["Greens", "Labor"])
                .candidates(&[("Jane", "Grn"), ("Tom", "Greens"), ("Bob", "Labor")])
                .row(&["1", "", "2", "1", "3"]),
        )
        .build();
    let mut stream = BallotStream::new(election);
    let ballot = stream.next_ballot().unwrap();
    assert_eq!(ballot.status(), BallotStatus::BelowTheLine);
    assert_eq!(
        ballot.below(),
        &[filled("Greens"), filled("Greens"), filled("Labor")]
    );
    assert_eq!(stream.primary_choice(), named("Greens"));
    assert_eq!(stream.secondary_choice(), named("Labor"));
    assert_eq!(stream.party_of_candidate("Jane").map(|n| &**n), Some("Greens"));
}

#[test]
fn forced_formality() {
    let election = Builder::new("NSW")
        .parties(&["A", "B"])
        .minimums(1, 15)
        .force_formal()
        .file(
            FileBuilder::new("nsw.tsv")
                .parties(&["A", "B"])
                .candidates(&[("c1", "A"), ("c2", "B")])
                .row(&["", "", "", ""])
                .row(&["", "", "2", "1"]),
        )
        .build();
    let mut stream = BallotStream::new(election);
    let ballot = stream.next_ballot().unwrap();
    assert_eq!(ballot.status(), BallotStatus::AboveTheLine);
    assert_eq!(ballot.primary_preference(), Some(Preference::NoChoice));
    let ballot = stream.next_ballot().unwrap();
    assert_eq!(ballot.status(), BallotStatus::BelowTheLine);
    assert_eq!(ballot.primary_preference(), named("B"));
}

#[test]
fn forced_ballot_with_missing_first_rank() {
    init_logs();
    let election = Builder::new("NSW")
        .parties(&["Greens", "Labor", "Liberal"])
        .alias("Grn (NSW)", "Greens")
        .minimums(1, 15)
        .force_formal()
        .file(
            FileBuilder::new("nsw.tsv")
                .parties(&["Labor", "Grn (NSW)", "Liberal"])
                .row(&["", "2", "3"]),
        )
        .build();
    let mut stream = BallotStream::new(election);
    let ballot = stream.next_ballot().unwrap();
    assert_eq!(ballot.status(), BallotStatus::AboveTheLine);
    assert_eq!(ballot.ranked_above(), 0);
    assert_eq!(stream.primary_choice(), Some(Preference::NoChoice));
    assert_eq!(stream.secondary_choice(), Some(Preference::NoChoice));
    assert_eq!(stream.secondary_ordered_choices(), Some(vec![None, None, None]));
    assert_eq!(
        stream.preference_between("Greens", "Liberal"),
        Some(Ranking::Neither)
    );
}

#[test]
fn namesakes_keep_their_party() {
    let election = Builder::new("Senate")
        .parties(&["Greens", "Labor"])
        .minimums(1, 2)
        .file(
            FileBuilder::new("senate.csv")
                .parties(&["Greens", "Labor"])
                .candidates(&[("Lee", "Greens"), ("Lee", "Labor")])
                .row(&["", "", "2", "1"]),
        )
        .build();
    let mut stream = BallotStream::new(election);
    let ballot = stream.next_ballot().unwrap();
    assert_eq!(ballot.status(), BallotStatus::BelowTheLine);
    assert_eq!(ballot.below(), &[filled("Labor"), filled("Greens")]);
    assert_eq!(stream.primary_choice(), named("Labor"));
    assert_eq!(stream.secondary_choice(), named("Greens"));
}

#[test]
fn running_parties_follow_name_equality() {
    // "Labor" in the file is an alias of "Country Labor", and is also a
    // canonical party of its own.
    let election = Builder::new("Senate")
        .parties(&["Labor", "Country Labor"])
        .alias("Labor", "Country Labor")
        .file(FileBuilder::new("nsw.csv").parties(&["Labor"]).row(&["1"]))
        .build();
    let mut stream = BallotStream::new(election);
    let cats = vec!["City".to_string(), "Rural".to_string()];
    let map: HashMap<String, String> = [("Labor", "City"), ("Country Labor", "Rural")]
        .iter()
        .map(|(p, c)| (p.to_string(), c.to_string()))
        .collect();
    stream.categorize_parties(&cats, &map, true, true).unwrap();
    assert!(stream.prim_runs_in_current_file("City"));
    assert!(stream.prim_runs_in_current_file("Rural"));
}

#[test]
fn reading_invalidates_the_current_ballot() {
    let mut stream = BallotStream::new(one_file(&[&["1", "2", "", ""], &["", "", "1", ""]]));
    stream.next_ballot();
    let kept = stream.snapshot().unwrap();
    assert!(stream.current_ballot().is_some());
    assert!(stream.has_more_ballots());
    assert!(stream.current_ballot().is_none());
    assert_eq!(stream.primary_choice(), None);
    assert_eq!(stream.secondary_ordered_choices(), None);

    stream.next_ballot();
    assert_eq!(stream.primary_choice(), named("Liberal"));
    assert_eq!(kept.primary_preference(), named("Greens"));
    assert_eq!(kept.second_preference(), named("Labor"));
}

#[test]
fn incomplete_categories_are_rejected() {
    let mut stream = BallotStream::new(one_file(&[&["1", "", "", ""]]));
    let (cats, mut map) = left_right();
    map.remove("Nationals");
    assert_eq!(
        stream.categorize_parties(&cats, &map, true, true),
        Err(CategorizationError::MissingParty {
            party: "Nationals".to_string()
        })
    );
    assert!(!stream.categories_are_active());
    assert_eq!(stream.election_name(), "Senate");
    assert_eq!(stream.next_ballot().and_then(|b| b.primary_category_preference()), None);
}

#[test]
fn category_queries() {
    init_logs();
    let mut stream = BallotStream::new(one_file(&[&["1", "3", "2", ""]]));
    let (cats, map) = left_right();
    stream.categorize_parties(&cats, &map, true, true).unwrap();
    assert!(stream.categories_are_active());
    assert_eq!(stream.election_name(), "Senate - Using Categories");
    assert_eq!(stream.prim_num_options(), 2);
    assert!(stream.prim_runs_in_current_file("Right"));

    let ballot = stream.next_ballot().unwrap();
    assert_eq!(ballot.above_categories()[..3], [filled("Left"), filled("Right"), filled("Left")]);
    assert_eq!(stream.primary_choice(), named("Left"));
    assert_eq!(stream.primary_choice_index(), Some(0));
    assert_eq!(stream.secondary_choice(), named("Right"));
    assert_eq!(stream.preference_between("Left", "Right"), Some(Ranking::SecondPreferred));
    assert_eq!(
        stream.secondary_ordered_choices(),
        Some(vec![
            Some(Name::from("Left")),
            Some(Name::from("Right")),
            Some(Name::from("Left"))
        ])
    );
    assert_eq!(stream.category_of("Labor").map(|c| &**c), Some("Left"));
    assert_eq!(stream.category_of("Right").map(|c| &**c), Some("Right"));
    assert_eq!(stream.name_category_to_index("Nationals"), Some(1));
    assert_eq!(stream.index_category_to_name(0).map(|c| &**c), Some("Left"));
}

#[test]
fn categories_only_for_secondary() {
    let mut stream = BallotStream::new(one_file(&[&["1", "3", "2", ""]]));
    let (cats, map) = left_right();
    stream.categorize_parties(&cats, &map, false, true).unwrap();
    assert_eq!(stream.prim_options().len(), 4);
    assert_eq!(stream.sec_options().len(), 2);
    stream.next_ballot();
    assert_eq!(stream.primary_choice(), named("Greens"));
    assert_eq!(stream.secondary_choice(), named("Right"));
}

#[test]
fn categories_are_locked_while_reading() {
    let mut stream = BallotStream::new(one_file(&[&["1", "", "", ""]]));
    let (cats, map) = left_right();
    stream.categorize_parties(&cats, &map, true, true).unwrap();
    stream.next_ballot();
    assert_eq!(
        stream.categorize_parties(&cats, &map, true, false),
        Err(CategorizationError::StreamInProgress { processed: 1 })
    );
    assert_eq!(
        stream.decategorize(),
        Err(CategorizationError::StreamInProgress { processed: 1 })
    );
    // The previous categorization is still in place.
    assert!(stream.uses_categories_for_secondary());

    stream.restart();
    assert!(stream.decategorize().is_ok());
    assert!(!stream.categories_are_active());
    assert_eq!(stream.next_ballot().and_then(|b| b.primary_category_preference()), None);
}

#[test]
fn predefined_categorizations() {
    let election = australia()
        .scheme(
            CategoryKind::SizeBased,
            CategoryScheme::with_remainder(
                &["Majors"],
                vec![vec!["Labor".into(), 2.into()]],
                "Minors",
            ),
        )
        .file(FileBuilder::new("senate.csv").parties(&["Greens", "Labor"]).row(&["1", "2"]))
        .build();
    let mut stream = BallotStream::new(election);
    assert_eq!(
        stream.predefined_categorization(CategoryKind::AllAustralia, true, true),
        Err(CategorizationError::NotDefined {
            kind: CategoryKind::AllAustralia,
            election: "Senate".to_string()
        })
    );
    assert!(!stream.categories_are_active());

    stream
        .predefined_categorization(CategoryKind::SizeBased, false, true)
        .unwrap();
    let cats: Vec<String> = stream.category_list().iter().map(|c| c.to_string()).collect();
    assert_eq!(cats, vec!["Majors", "Minors"]);
    let majors: Vec<String> = stream
        .category_members("Majors")
        .iter()
        .map(|c| c.to_string())
        .collect();
    assert_eq!(majors, vec!["Labor", "Liberal"]);
    assert!(stream.sec_runs_in_current_file("Majors"));
    assert!(stream.sec_runs_in_current_file("Minors"));

    stream.next_ballot();
    assert_eq!(stream.secondary_choice(), named("Majors"));

    stream.restart();
    stream
        .predefined_categorization(CategoryKind::Uncategorized, true, true)
        .unwrap();
    assert!(!stream.categories_are_active());
}

#[test]
fn party_names_are_collected() {
    let election = australia()
        .file(FileBuilder::new("wa.csv").parties(&["Labor", "Grn (WA)"]))
        .file(FileBuilder::new("gone.csv").unreadable())
        .file(FileBuilder::new("vic.csv").parties(&["greens", "Labor"]))
        .build();
    let names = collect_party_names(&election);
    let expected: Vec<(String, String)> = [
        ("greens", "greens"),
        ("Grn (WA)", "Grn (WA)"),
        ("Labor", "Labor"),
    ]
    .iter()
    .map(|(a, b)| (a.to_string(), b.to_string()))
    .collect();
    assert_eq!(names, expected);
}
