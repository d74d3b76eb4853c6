use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::auth::AuthSession;
use crate::error::ApiError;
use crate::events::{EventBus, MatchEvent};
use crate::model::{
    Category, GroupRef, GroupWithTeams, ImportRow, Match, NewsDraft, NewsItem, parse_match_json,
    parse_matches_json,
};
use crate::transport::{HttpRequest, Method, RequestBody};

/// Permission names that unlock the results editor.
pub const RESULTS_GROUPS: [&str; 1] = ["edit_matches"];
/// Permission names that unlock group and team management.
pub const TEAMS_GROUPS: [&str; 1] = ["manage_teams"];

pub const KNOCKOUT_DRAW_MESSAGE: &str = "For knockout draws please provide penalty scores";

/// Score entry for `set_result`. Penalties are sent only when both sides
/// are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResultInput {
    pub home_score: u32,
    pub away_score: u32,
    pub penalties: Option<(u32, u32)>,
}

impl ResultInput {
    pub fn new(home_score: u32, away_score: u32) -> Self {
        Self {
            home_score,
            away_score,
            penalties: None,
        }
    }

    pub fn with_penalties(mut self, home: u32, away: u32) -> Self {
        self.penalties = Some((home, away));
        self
    }

    /// Knockout draws must be settled on penalties.
    pub fn validate(&self, knockout: bool) -> Result<(), String> {
        if knockout && self.home_score == self.away_score && self.penalties.is_none() {
            return Err(KNOCKOUT_DRAW_MESSAGE.to_string());
        }
        Ok(())
    }

    pub fn payload(&self) -> Value {
        let mut body = Map::new();
        body.insert("home_score".into(), json!(self.home_score));
        body.insert("away_score".into(), json!(self.away_score));
        if let Some((ph, pa)) = self.penalties {
            body.insert("penalty_home".into(), json!(ph));
            body.insert("penalty_away".into(), json!(pa));
        }
        Value::Object(body)
    }
}

/// Row for `POST /manual-team-group/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualTeam {
    pub team_name: String,
    pub category: Category,
    pub season_id: u64,
    pub group_name: String,
}

#[derive(Debug, Deserialize)]
struct ImportResponse {
    #[serde(default)]
    results: Vec<ImportRow>,
}

/// Authenticated write operations. Every request goes through
/// `AuthSession::fetch_with_auth`; match writes are broadcast on the bus.
#[derive(Clone)]
pub struct AdminClient {
    session: Arc<AuthSession>,
    bus: EventBus,
}

impl AdminClient {
    pub fn new(session: Arc<AuthSession>, bus: EventBus) -> Self {
        Self { session, bus }
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    fn ensure_logged_in(&self) -> Result<(), ApiError> {
        self.ensure_allowed(&[])
    }

    /// Local permission check ahead of a write. Groups are re-read from the
    /// server once when none are stored yet.
    fn ensure_allowed(&self, allowed: &[&str]) -> Result<(), ApiError> {
        if !self.session.is_logged_in() {
            return Err(ApiError::NotLoggedIn);
        }
        if !allowed.is_empty() && self.session.groups().is_empty() {
            if let Err(err) = self.session.current_user() {
                log::warn!("could not load permissions: {err}");
            }
        }
        if self.session.require_group(allowed) {
            Ok(())
        } else {
            Err(ApiError::Forbidden {
                body: format!("requires one of: {}", allowed.join(", ")),
            })
        }
    }

    /// Unplayed matches, the editor's working set.
    pub fn load_pending(&self) -> Result<Vec<Match>, ApiError> {
        self.ensure_allowed(&RESULTS_GROUPS)?;
        let resp = self
            .session
            .send_checked(&HttpRequest::get(self.session.url("/matches/")))?;
        Ok(pending_matches(parse_matches_json(&resp.body)?))
    }

    pub fn find_match(&self, match_id: u64) -> Result<Option<Match>, ApiError> {
        self.ensure_logged_in()?;
        let resp = self
            .session
            .send_checked(&HttpRequest::get(self.session.url("/matches/")))?;
        Ok(parse_matches_json(&resp.body)?
            .into_iter()
            .find(|m| m.id == match_id))
    }

    pub fn set_result(&self, match_id: u64, input: ResultInput) -> Result<Match, ApiError> {
        self.ensure_allowed(&RESULTS_GROUPS)?;
        let url = self.session.url(&format!("/matches/{match_id}/set_result/"));
        let resp = self
            .session
            .send_checked(&HttpRequest::post_json(url, input.payload()))?;
        let updated = parse_match_json(&resp.body)?;
        log::info!("result saved for match {}: {}", updated.id, updated.score_label());
        self.bus.publish(MatchEvent::ScoresSaved(updated.clone()));
        Ok(updated)
    }

    pub fn mark_finished(
        &self,
        match_id: u64,
        extra_time_minutes: Option<u32>,
    ) -> Result<Match, ApiError> {
        self.ensure_allowed(&RESULTS_GROUPS)?;
        let url = self
            .session
            .url(&format!("/matches/{match_id}/mark_finished/"));
        let body = match extra_time_minutes {
            Some(mins) => json!({ "extra_time_minutes": mins }),
            None => json!({}),
        };
        let resp = self.session.send_checked(&HttpRequest::post_json(url, body))?;
        let updated = parse_match_json(&resp.body)?;
        log::info!("match {} marked finished", updated.id);
        self.bus.publish(MatchEvent::Updated(updated.clone()));
        Ok(updated)
    }

    pub fn create_news(&self, draft: &NewsDraft) -> Result<NewsItem, ApiError> {
        self.ensure_logged_in()?;
        let body = serde_json::to_value(draft).map_err(|err| ApiError::Local(err.to_string()))?;
        let resp = self
            .session
            .send_checked(&HttpRequest::post_json(self.session.url("/news/"), body))?;
        let item: NewsItem = resp.json()?;
        log::info!("news {} created", item.id);
        Ok(item)
    }

    pub fn update_news(&self, id: u64, fields: Value) -> Result<NewsItem, ApiError> {
        self.ensure_logged_in()?;
        let url = self.session.url(&format!("/news/{id}/"));
        let resp = self
            .session
            .send_checked(&HttpRequest::with_json(Method::Patch, url, fields))?;
        resp.json()
    }

    pub fn delete_news(&self, id: u64) -> Result<(), ApiError> {
        self.ensure_logged_in()?;
        let url = self.session.url(&format!("/news/{id}/"));
        self.session.send_checked(&HttpRequest::delete(url))?;
        log::info!("news {id} deleted");
        Ok(())
    }

    pub fn move_team(&self, team_id: u64, to_group_id: u64, season_id: u64) -> Result<(), ApiError> {
        self.ensure_allowed(&TEAMS_GROUPS)?;
        let body = json!({
            "team_id": team_id,
            "to_group_id": to_group_id,
            "season_id": season_id,
        });
        self.session
            .send_checked(&HttpRequest::post_json(self.session.url("/move-team/"), body))?;
        log::info!("team {team_id} moved to group {to_group_id}");
        Ok(())
    }

    pub fn add_team_to_group(&self, team: &ManualTeam) -> Result<Value, ApiError> {
        self.ensure_allowed(&TEAMS_GROUPS)?;
        let body = json!({
            "team_name": team.team_name,
            "category": team.category.as_str(),
            "season_id": team.season_id,
            "group_name": team.group_name,
        });
        let resp = self.session.send_checked(&HttpRequest::post_json(
            self.session.url("/manual-team-group/"),
            body,
        ))?;
        if resp.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        resp.json()
    }

    /// Uploads a workbook as multipart field `file`. The server does the
    /// parsing and answers with one status row per team.
    pub fn import_excel(&self, path: &Path) -> Result<Vec<ImportRow>, ApiError> {
        self.ensure_allowed(&TEAMS_GROUPS)?;
        let bytes = std::fs::read(path)
            .map_err(|err| ApiError::Local(format!("read {}: {err}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "teams.xlsx".to_string());
        let request = HttpRequest {
            method: Method::Post,
            url: self.session.url("/import-excel/"),
            headers: Vec::new(),
            body: RequestBody::File {
                field: "file".to_string(),
                file_name,
                bytes,
            },
        };
        let resp = self.session.send_checked(&request)?;
        let parsed: ImportResponse = resp.json()?;
        Ok(parsed.results)
    }
}

pub fn pending_matches(matches: Vec<Match>) -> Vec<Match> {
    matches.into_iter().filter(|m| !m.is_played).collect()
}

/// Knockout matches accept a penalty shootout score.
pub fn accepts_penalties(m: &Match) -> bool {
    !m.stage().is_group()
        || m
            .stage_label
            .as_deref()
            .is_some_and(|s| s.to_ascii_lowercase().contains("knock"))
}

/// Moves a team between groups in a local copy. Returns false (and leaves
/// `groups` untouched) when the team or either group is missing or the
/// groups are the same.
pub fn move_team_locally(
    groups: &mut [GroupWithTeams],
    team_id: u64,
    from_group: u64,
    to_group: u64,
) -> bool {
    if from_group == to_group {
        return false;
    }
    let Some(from_idx) = groups.iter().position(|g| g.id == from_group) else {
        return false;
    };
    if !groups.iter().any(|g| g.id == to_group) {
        return false;
    }
    let Some(team_idx) = groups[from_idx].teams.iter().position(|t| t.id == team_id) else {
        return false;
    };
    let team = groups[from_idx].teams.remove(team_idx);
    if let Some(target) = groups.iter_mut().find(|g| g.id == to_group) {
        target.teams.push(team);
    }
    true
}

/// Applies a move to the local lineup before it is sent. Returns the group
/// the team leaves.
pub fn plan_move(groups: &mut [GroupWithTeams], team_id: u64, to_group: u64) -> Result<u64, String> {
    let from = group_of(groups, team_id)
        .ok_or_else(|| format!("Team {team_id} is not in any group of this season"))?;
    if from == to_group {
        return Err(format!("Team {team_id} is already in that group"));
    }
    if !move_team_locally(groups, team_id, from, to_group) {
        return Err(format!("Group {to_group} does not exist in this season"));
    }
    Ok(from)
}

/// Case-insensitive lookup of a season group by name.
pub fn find_group<'a>(groups: &'a [GroupRef], name: &str) -> Result<&'a GroupRef, String> {
    let wanted = name.trim();
    groups
        .iter()
        .find(|g| g.name.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| {
            let known = groups.iter().map(|g| g.name.as_str()).collect::<Vec<_>>();
            if known.is_empty() {
                "This season has no groups yet".to_string()
            } else {
                format!("Unknown group {wanted}; choose one of: {}", known.join(", "))
            }
        })
}

/// Group a team currently sits in.
pub fn group_of(groups: &[GroupWithTeams], team_id: u64) -> Option<u64> {
    groups
        .iter()
        .find(|g| g.teams.iter().any(|t| t.id == team_id))
        .map(|g| g.id)
}
