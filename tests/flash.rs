use std::time::{Duration, Instant};

use unity_cup_terminal::flash::{FlashBuffer, IngestOutcome, diff_tracked};
use unity_cup_terminal::model::{Match, StandingsRow, parse_match_json};

const FLASH: Duration = Duration::from_millis(800);

fn scored(id: u64, home: Option<u32>, away: Option<u32>) -> Match {
    let score = |s: Option<u32>| s.map(|v| v.to_string()).unwrap_or_else(|| "null".to_string());
    let raw = format!(
        r#"{{"id":{id},"home_team":{{"id":1,"name":"ABAM FC"}},"away_team":{{"id":2,"name":"LAGURU"}},"home_score":{},"away_score":{},"matchday":3}}"#,
        score(home),
        score(away)
    );
    parse_match_json(&raw).expect("match json")
}

fn loaded(matches: Vec<Match>) -> FlashBuffer<Match> {
    let mut buffer = FlashBuffer::new(FLASH);
    buffer.reset(matches);
    buffer
}

#[test]
fn unchanged_poll_applies_immediately_without_flash() {
    let start = Instant::now();
    let mut buffer = loaded(vec![scored(1, Some(0), Some(0))]);

    let outcome = buffer.ingest(vec![scored(1, Some(0), Some(0))], start);

    assert_eq!(outcome, IngestOutcome::Applied);
    assert!(!buffer.has_pending());
    assert!(buffer.flash_state().is_empty());
}

#[test]
fn changed_score_flashes_then_lands_after_duration() {
    let start = Instant::now();
    let mut buffer = loaded(vec![scored(1, Some(0), Some(0)), scored(2, Some(1), Some(1))]);

    let outcome = buffer.ingest(
        vec![scored(1, Some(1), Some(0)), scored(2, Some(1), Some(1))],
        start,
    );

    assert_eq!(outcome, IngestOutcome::Deferred { changed_records: 1 });
    assert!(buffer.is_field_flashing(&1, "home_score"));
    assert!(!buffer.is_field_flashing(&1, "away_score"));
    assert!(!buffer.is_flashing(&2));
    // Old values stay on screen while the change is highlighted.
    assert_eq!(buffer.displayed()[0].home_score, Some(0));
    assert_eq!(buffer.pending_due(), Some(start + FLASH));

    assert!(!buffer.tick(start + Duration::from_millis(799)));
    assert_eq!(buffer.displayed()[0].home_score, Some(0));

    assert!(buffer.tick(start + FLASH));
    assert_eq!(buffer.displayed()[0].home_score, Some(1));
    assert!(buffer.flash_state().is_empty());
    assert!(!buffer.has_pending());
}

#[test]
fn newer_poll_replaces_pending_update() {
    let start = Instant::now();
    let mut buffer = loaded(vec![scored(1, Some(0), Some(0))]);

    buffer.ingest(vec![scored(1, Some(1), Some(0))], start);
    let later = start + Duration::from_millis(300);
    buffer.ingest(vec![scored(1, Some(2), Some(0))], later);

    assert!(!buffer.tick(start + FLASH));
    assert!(buffer.tick(later + FLASH));
    assert_eq!(buffer.displayed()[0].home_score, Some(2));
}

#[test]
fn unchanged_poll_cancels_pending_update() {
    let start = Instant::now();
    let mut buffer = loaded(vec![scored(1, Some(0), Some(0))]);

    buffer.ingest(vec![scored(1, Some(1), Some(0))], start);
    let outcome = buffer.ingest(vec![scored(1, Some(0), Some(0))], start + Duration::from_millis(100));

    assert_eq!(outcome, IngestOutcome::Applied);
    assert!(!buffer.tick(start + Duration::from_secs(5)));
    assert_eq!(buffer.displayed()[0].home_score, Some(0));
}

#[test]
fn new_records_are_not_changes() {
    let previous = vec![scored(1, None, None)];
    let incoming = vec![scored(1, None, None), scored(9, Some(3), Some(2))];
    assert!(diff_tracked(&previous, &incoming).is_empty());

    let mut buffer = loaded(previous);
    assert_eq!(buffer.ingest(incoming, Instant::now()), IngestOutcome::Applied);
    assert_eq!(buffer.displayed().len(), 2);
}

#[test]
fn score_appearing_counts_as_change() {
    let changes = diff_tracked(&[scored(4, None, None)], &[scored(4, Some(0), None)]);
    let fields = changes.get(&4).expect("match 4 changed");
    assert!(fields.contains("home_score"));
    assert!(!fields.contains("away_score"));
}

#[test]
fn standings_fields_flash_individually() {
    let row = |points: u32, gf: u32| StandingsRow {
        team_id: 11,
        team_name: "ABAM FC".to_string(),
        played: 1,
        wins: 1,
        goals_for: gf,
        goals_against: 1,
        goal_diff: i64::from(gf) - 1,
        points,
        ..StandingsRow::default()
    };
    let start = Instant::now();
    let mut buffer = FlashBuffer::new(FLASH);
    buffer.reset(vec![row(3, 2)]);

    buffer.ingest(vec![row(3, 3)], start);

    assert!(buffer.is_field_flashing(&11, "goals_for"));
    assert!(buffer.is_field_flashing(&11, "goal_diff"));
    assert!(!buffer.is_field_flashing(&11, "points"));
    assert!(!buffer.is_field_flashing(&11, "played"));
}

#[test]
fn local_patch_reaches_pending_copy() {
    let start = Instant::now();
    let mut buffer = loaded(vec![scored(1, Some(0), Some(0))]);
    buffer.ingest(vec![scored(1, Some(1), Some(0))], start);

    buffer.patch(|m| m.away_score = Some(5));

    assert_eq!(buffer.displayed()[0].away_score, Some(5));
    buffer.tick(start + FLASH);
    assert_eq!(buffer.displayed()[0].home_score, Some(1));
    assert_eq!(buffer.displayed()[0].away_score, Some(5));
}
