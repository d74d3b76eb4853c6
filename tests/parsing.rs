mod common;

use common::read_fixture;
use unity_cup_terminal::model::{
    GroupStandings, NewsItem, Participant, PlaceholderKind, Stage, Team, fill_team_names,
    parse_list, parse_match_json, parse_matches_json,
};
use unity_cup_terminal::views::strip_html;

#[test]
fn parses_polymorphic_team_references() {
    let matches = parse_matches_json(&read_fixture("matches.json")).expect("fixture should parse");
    assert_eq!(matches.len(), 10);

    let first = &matches[0];
    assert_eq!(first.season_id, Some(5));
    assert_eq!(first.season_name.as_deref(), Some("2025 SENIOR BOYS CUP"));
    assert_eq!(first.home.display_name(), "ABAM FC");
    assert_eq!(first.home.team_id(), Some(1));
    assert_eq!(first.venue.as_deref(), Some("Ubakala Central Field"));

    // Bare ids carry no name until the team list fills it.
    let bare = &matches[1];
    assert_eq!(bare.season_id, Some(5));
    assert_eq!(bare.home.team_id(), Some(2));
    assert_eq!(bare.home.display_name(), "Team #2");

    let semi = &matches[8];
    assert!(semi.has_placeholder());
    match &semi.home {
        Participant::Placeholder(p) => {
            assert_eq!(p.kind, PlaceholderKind::Winner);
            assert_eq!(p.matchday, Some(22));
        }
        other => panic!("expected placeholder, got {other:?}"),
    }
    assert!(semi.away.is_placeholder());
    assert_eq!(semi.home_score, None);
}

#[test]
fn fills_names_for_bare_ids() {
    let mut matches = parse_matches_json(&read_fixture("matches.json")).expect("fixture should parse");
    let teams = vec![
        Team {
            id: 2,
            name: "LAGURU".to_string(),
            short_name: String::new(),
            archived: false,
        },
        Team {
            id: 3,
            name: "UMUOSU".to_string(),
            short_name: String::new(),
            archived: false,
        },
    ];

    fill_team_names(&mut matches, &teams);

    assert_eq!(matches[1].home.display_name(), "LAGURU");
    assert_eq!(matches[1].away.display_name(), "UMUOSU");
    assert_eq!(matches[0].home.display_name(), "ABAM FC");
}

#[test]
fn parses_flags_awards_and_penalties() {
    let matches = parse_matches_json(&read_fixture("matches.json")).expect("fixture should parse");

    assert!(matches[2].void);
    let awarded = matches[3].award.as_ref().expect("match 104 was awarded");
    assert_eq!(awarded.reason.as_deref(), Some("Ineligible player"));
    assert_eq!(awarded.awarded_to.as_ref().and_then(|t| t.id), Some(5));
    assert_eq!(
        (awarded.original_home_score, awarded.original_away_score),
        (Some(1), Some(1))
    );

    let shootout = &matches[7];
    assert_eq!(shootout.stage(), Stage::Quarterfinal);
    assert_eq!(shootout.score_label(), "0 - 0 (4-3 pens)");
    assert!(!shootout.is_decisive());
    assert_eq!(matches[6].stage(), Stage::Quarterfinal);
    assert_eq!(matches[9].stage(), Stage::Final);
}

#[test]
fn parses_match_dates_in_every_served_format() {
    let matches = parse_matches_json(&read_fixture("matches.json")).expect("fixture should parse");

    let rfc = matches[0].match_date.expect("rfc3339 date");
    assert_eq!(rfc.offset().local_minus_utc(), 3600);
    let naive = matches[1].match_date.expect("naive date");
    assert_eq!(naive.to_rfc3339(), "2025-02-11T16:00:00+01:00");
    assert!(matches[9].match_date.is_none());
    assert!(matches[9].match_date_raw.is_empty());
}

#[test]
fn empty_and_null_lists_read_as_empty() {
    assert!(parse_matches_json("").expect("empty").is_empty());
    assert!(parse_matches_json("null").expect("null").is_empty());
    assert!(parse_matches_json("[]").expect("array").is_empty());
    assert!(parse_matches_json("{\"detail\":\"x\"}").is_err());
}

#[test]
fn single_match_with_missing_teams_is_unknown() {
    let m = parse_match_json(r#"{"id":9}"#).expect("minimal match");
    assert_eq!(m.home, Participant::Unknown);
    assert_eq!(m.home.display_name(), "TBD");
    assert!(!m.is_played);
    assert_eq!(m.stage(), Stage::Group);
}

#[test]
fn parses_grouped_standings_fixture() {
    let groups: Vec<GroupStandings> =
        parse_list(&read_fixture("grouped_standings.json")).expect("fixture should parse");
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].group.name, "Group A");
    assert_eq!(groups[0].standings[0].team_name, "ABAM FC");
    assert_eq!(groups[1].standings[1].goal_diff, -2);
}

#[test]
fn parses_news_fixture_and_strips_markup() {
    let news: Vec<NewsItem> = parse_list(&read_fixture("news.json")).expect("fixture should parse");
    assert_eq!(news.len(), 2);
    assert_eq!(news[0].author.as_deref(), Some("League Office"));
    assert!(news[1].subtitle.is_none());

    let text = strip_html(&news[0].content);
    assert_eq!(
        text,
        "The draw took place at the town hall.\nFixtures start on Saturday & Sunday.\n- ABAM FC v AMAPU\n- LAGURU v EZIAMA"
    );
    assert_eq!(
        strip_html(&news[1].content),
        "Welcome back!\nMatches every weekend."
    );
}
