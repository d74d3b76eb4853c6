use std::collections::HashMap;

use crate::model::{GroupStandings, GroupRef, GroupWithTeams, Match, StandingsRow, TeamEntry};

/// Tallies one group from raw matches. Only group-stage matches that were
/// played, are not void, and have both participants inside the group count.
pub fn aggregate_group(teams: &[TeamEntry], matches: &[Match]) -> Vec<StandingsRow> {
    let mut rows: Vec<StandingsRow> = teams
        .iter()
        .map(|t| StandingsRow {
            team_id: t.id,
            team_name: t.name.clone(),
            ..StandingsRow::default()
        })
        .collect();
    let index: HashMap<u64, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| (row.team_id, i))
        .collect();

    for m in matches {
        if !m.stage().is_group() || !m.is_played || m.void {
            continue;
        }
        let (Some(home_id), Some(away_id)) = (m.home.team_id(), m.away.team_id()) else {
            continue;
        };
        let (Some(&hi), Some(&ai)) = (index.get(&home_id), index.get(&away_id)) else {
            continue;
        };
        let (hs, as_) = (m.home_score.unwrap_or(0), m.away_score.unwrap_or(0));
        record_result(&mut rows[hi], hs, as_);
        record_result(&mut rows[ai], as_, hs);
    }

    for row in rows.iter_mut() {
        row.goal_diff = i64::from(row.goals_for) - i64::from(row.goals_against);
    }
    rank(&mut rows);
    rows
}

fn record_result(row: &mut StandingsRow, scored: u32, conceded: u32) {
    row.played += 1;
    row.goals_for = row.goals_for.saturating_add(scored);
    row.goals_against = row.goals_against.saturating_add(conceded);
    if scored > conceded {
        row.wins += 1;
        row.points += 3;
    } else if scored == conceded {
        row.draws += 1;
        row.points += 1;
    } else {
        row.losses += 1;
    }
}

/// Points, then goal difference, then goals for, all descending. Ties keep
/// their input order.
pub fn rank(rows: &mut [StandingsRow]) {
    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.goal_diff.cmp(&a.goal_diff))
            .then(b.goals_for.cmp(&a.goals_for))
    });
}

pub fn aggregate_groups(groups: &[GroupWithTeams], matches: &[Match]) -> Vec<GroupStandings> {
    groups
        .iter()
        .map(|g| GroupStandings {
            group: GroupRef {
                id: g.id,
                name: g.name.clone(),
            },
            standings: aggregate_group(&g.teams, matches),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discrepancy {
    pub group: String,
    pub team_id: u64,
    pub team_name: String,
    pub detail: String,
}

impl std::fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}: {}", self.group, self.team_name, self.detail)
    }
}

/// Compares server standings against a local tally, group by group (matched
/// on group id). Teams missing on either side and differing totals are
/// reported; ordering is not compared.
pub fn reconcile(server: &[GroupStandings], client: &[GroupStandings]) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    for block in server {
        let Some(local) = client.iter().find(|c| c.group.id == block.group.id) else {
            continue;
        };
        let local_rows: HashMap<u64, &StandingsRow> =
            local.standings.iter().map(|r| (r.team_id, r)).collect();
        for row in &block.standings {
            let Some(mine) = local_rows.get(&row.team_id) else {
                out.push(Discrepancy {
                    group: block.group.name.clone(),
                    team_id: row.team_id,
                    team_name: row.team_name.clone(),
                    detail: "missing from local tally".to_string(),
                });
                continue;
            };
            let diffs = field_diffs(row, mine);
            if !diffs.is_empty() {
                out.push(Discrepancy {
                    group: block.group.name.clone(),
                    team_id: row.team_id,
                    team_name: row.team_name.clone(),
                    detail: diffs.join(", "),
                });
            }
        }
        for row in &local.standings {
            if !block.standings.iter().any(|r| r.team_id == row.team_id) {
                out.push(Discrepancy {
                    group: block.group.name.clone(),
                    team_id: row.team_id,
                    team_name: row.team_name.clone(),
                    detail: "missing from server standings".to_string(),
                });
            }
        }
    }
    out
}

fn field_diffs(server: &StandingsRow, local: &StandingsRow) -> Vec<String> {
    let pairs: [(&str, i64, i64); 8] = [
        ("played", server.played.into(), local.played.into()),
        ("wins", server.wins.into(), local.wins.into()),
        ("draws", server.draws.into(), local.draws.into()),
        ("losses", server.losses.into(), local.losses.into()),
        ("gf", server.goals_for.into(), local.goals_for.into()),
        ("ga", server.goals_against.into(), local.goals_against.into()),
        ("gd", server.goal_diff, local.goal_diff),
        ("pts", server.points.into(), local.points.into()),
    ];
    pairs
        .iter()
        .filter(|(_, s, l)| s != l)
        .map(|(name, s, l)| format!("{name} server={s} local={l}"))
        .collect()
}
