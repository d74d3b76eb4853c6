use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Instant;

use unity_cup_terminal::flash::{DEFAULT_FLASH, FlashBuffer};
use unity_cup_terminal::model::{GroupWithTeams, Match, TeamEntry, parse_matches_json};
use unity_cup_terminal::standings::{aggregate_groups, reconcile};
use unity_cup_terminal::views::results_by_stage;

const GROUPS: u64 = 8;
const TEAMS_PER_GROUP: u64 = 6;

fn synthetic_groups() -> Vec<GroupWithTeams> {
    (0..GROUPS)
        .map(|g| GroupWithTeams {
            id: g + 1,
            name: format!("Group {}", (b'A' + g as u8) as char),
            teams: (0..TEAMS_PER_GROUP)
                .map(|t| {
                    let id = g * TEAMS_PER_GROUP + t + 1;
                    TeamEntry {
                        id,
                        name: format!("TEAM {id}"),
                    }
                })
                .collect(),
        })
        .collect()
}

/// Round robin inside every group plus a full knockout tree.
fn synthetic_matches_json() -> String {
    let mut items = Vec::new();
    let mut id = 1u64;
    for g in 0..GROUPS {
        let base = g * TEAMS_PER_GROUP + 1;
        for h in 0..TEAMS_PER_GROUP {
            for a in (h + 1)..TEAMS_PER_GROUP {
                items.push(format!(
                    r#"{{"id":{id},"season":5,"home_team":{{"id":{},"name":"TEAM {}"}},"away_team":{},"home_score":{},"away_score":{},"matchday":{},"is_played":true,"match_date":"2025-02-{:02}T16:00:00+01:00"}}"#,
                    base + h,
                    base + h,
                    base + a,
                    (id * 7) % 4,
                    (id * 3) % 3,
                    (h + a) % 21 + 1,
                    (id % 27) + 1,
                ));
                id += 1;
            }
        }
    }
    for md in 22..=29 {
        items.push(format!(
            r#"{{"id":{id},"season":5,"home_team":"Winner MD{}","away_team":"Winner MD{}","matchday":{md},"is_played":false}}"#,
            md - 1,
            md - 2,
        ));
        id += 1;
    }
    format!("[{}]", items.join(","))
}

fn bench_parse_matches(c: &mut Criterion) {
    let raw = synthetic_matches_json();
    c.bench_function("parse_matches_json", |b| {
        b.iter(|| {
            let matches = parse_matches_json(black_box(&raw)).expect("synthetic json");
            black_box(matches.len());
        })
    });
}

fn bench_aggregate_and_reconcile(c: &mut Criterion) {
    let groups = synthetic_groups();
    let matches = parse_matches_json(&synthetic_matches_json()).expect("synthetic json");
    let server = aggregate_groups(&groups, &matches);

    c.bench_function("aggregate_groups", |b| {
        b.iter(|| {
            let tables = aggregate_groups(black_box(&groups), black_box(&matches));
            black_box(tables.len());
        })
    });
    c.bench_function("reconcile_standings", |b| {
        b.iter(|| {
            let local = aggregate_groups(&groups, &matches);
            black_box(reconcile(black_box(&server), &local).len());
        })
    });
}

fn bench_results_sections(c: &mut Criterion) {
    let matches = parse_matches_json(&synthetic_matches_json()).expect("synthetic json");
    c.bench_function("results_by_stage", |b| {
        b.iter(|| black_box(results_by_stage(black_box(&matches)).len()))
    });
}

fn bench_flash_ingest(c: &mut Criterion) {
    let before = parse_matches_json(&synthetic_matches_json()).expect("synthetic json");
    let mut after = before.clone();
    for m in after.iter_mut().step_by(5) {
        m.home_score = m.home_score.map(|s| s + 1);
    }

    c.bench_function("flash_ingest_diff", |b| {
        b.iter(|| {
            let mut board: FlashBuffer<Match> = FlashBuffer::new(DEFAULT_FLASH);
            let now = Instant::now();
            board.ingest(before.clone(), now);
            board.ingest(black_box(after.clone()), now);
            black_box(board.displayed().len());
        })
    });
}

criterion_group!(
    perf,
    bench_parse_matches,
    bench_aggregate_and_reconcile,
    bench_results_sections,
    bench_flash_ingest
);
criterion_main!(perf);
