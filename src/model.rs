use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// First matchday that belongs to the knockout rounds.
pub const KNOCKOUT_FIRST_MATCHDAY: u32 = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    SeniorBoys,
    Girls,
    JuniorBoys,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::SeniorBoys, Category::Girls, Category::JuniorBoys];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::SeniorBoys => "senior_boys",
            Category::Girls => "girls",
            Category::JuniorBoys => "junior_boys",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::SeniorBoys => "Senior Boys",
            Category::Girls => "Girls",
            Category::JuniorBoys => "Junior Boys",
        }
    }

    pub fn next(self) -> Category {
        match self {
            Category::SeniorBoys => Category::Girls,
            Category::Girls => Category::JuniorBoys,
            Category::JuniorBoys => Category::SeniorBoys,
        }
    }

    pub fn parse(raw: &str) -> Option<Category> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "senior_boys" => Some(Category::SeniorBoys),
            "girls" => Some(Category::Girls),
            "junior_boys" => Some(Category::JuniorBoys),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamEntry {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupWithTeams {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub teams: Vec<TeamEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StandingsRow {
    pub team_id: u64,
    pub team_name: String,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_diff: i64,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStandings {
    pub group: GroupRef,
    #[serde(default)]
    pub standings: Vec<StandingsRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NewsDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CurrentUser {
    #[serde(default)]
    pub id: Option<u64>,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role_profile: Option<RoleProfile>,
}

impl CurrentUser {
    pub fn role(&self) -> &str {
        self.role_profile
            .as_ref()
            .map(|p| p.role.as_str())
            .unwrap_or("user")
    }

    pub fn permission_names(&self) -> Vec<String> {
        self.role_profile
            .as_ref()
            .map(|p| p.permissions.iter().map(|perm| perm.name.clone()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleProfile {
    pub role: String,
    #[serde(default)]
    pub role_display: Option<String>,
    #[serde(default)]
    pub permissions: Vec<PermissionEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PermissionEntry {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImportRow {
    #[serde(default)]
    pub team: Option<String>,
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Group,
    Quarterfinal,
    Semifinal,
    ThirdPlace,
    Final,
    Knockout,
}

impl Stage {
    pub fn from_matchday(matchday: Option<u32>) -> Stage {
        match matchday {
            None => Stage::Group,
            Some(md) if md < KNOCKOUT_FIRST_MATCHDAY => Stage::Group,
            Some(22..=25) => Stage::Quarterfinal,
            Some(26..=27) => Stage::Semifinal,
            Some(28) => Stage::ThirdPlace,
            Some(29) => Stage::Final,
            Some(_) => Stage::Knockout,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Group => "Group Stage",
            Stage::Quarterfinal => "Quarterfinals",
            Stage::Semifinal => "Semifinals",
            Stage::ThirdPlace => "Third Place",
            Stage::Final => "Final",
            Stage::Knockout => "Knockout",
        }
    }

    pub fn is_group(self) -> bool {
        self == Stage::Group
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    Winner,
    Loser,
}

/// An unresolved knockout participant such as `WINNER MD22`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub kind: PlaceholderKind,
    pub matchday: Option<u32>,
    pub raw: String,
}

impl Placeholder {
    pub fn parse(name: &str) -> Option<Placeholder> {
        let upper = name.to_ascii_uppercase();
        let kind = if upper.contains("WINNER") {
            PlaceholderKind::Winner
        } else if upper.contains("LOSER") {
            PlaceholderKind::Loser
        } else {
            return None;
        };
        Some(Placeholder {
            kind,
            matchday: first_number(name),
            raw: name.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRef {
    pub id: Option<u64>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Participant {
    Team(TeamRef),
    Placeholder(Placeholder),
    Unknown,
}

impl Participant {
    fn from_parts(id: Option<u64>, name: Option<String>) -> Participant {
        let name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        match (id, name) {
            (_, Some(name)) => match Placeholder::parse(&name) {
                Some(p) => Participant::Placeholder(p),
                None => Participant::Team(TeamRef { id, name }),
            },
            (Some(id), None) => Participant::Team(TeamRef {
                id: Some(id),
                name: String::new(),
            }),
            (None, None) => Participant::Unknown,
        }
    }

    pub fn team_id(&self) -> Option<u64> {
        match self {
            Participant::Team(team) => team.id,
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Participant::Placeholder(_))
    }

    pub fn display_name(&self) -> String {
        match self {
            Participant::Team(team) if !team.name.is_empty() => team.name.clone(),
            Participant::Team(team) => team
                .id
                .map(|id| format!("Team #{id}"))
                .unwrap_or_else(|| "TBD".to_string()),
            Participant::Placeholder(p) => p.raw.clone(),
            Participant::Unknown => "TBD".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Award {
    pub reason: Option<String>,
    pub awarded_to: Option<TeamRef>,
    pub original_home_score: Option<u32>,
    pub original_away_score: Option<u32>,
}

/// A match after the polymorphic wire shape has been normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub id: u64,
    pub season_id: Option<u64>,
    pub season_name: Option<String>,
    pub home: Participant,
    pub away: Participant,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub penalty_home: Option<u32>,
    pub penalty_away: Option<u32>,
    pub matchday: Option<u32>,
    pub is_played: bool,
    pub void: bool,
    pub match_date: Option<DateTime<FixedOffset>>,
    pub match_date_raw: String,
    pub venue: Option<String>,
    pub award: Option<Award>,
    pub stage_label: Option<String>,
    pub manual_finished_at: Option<String>,
    pub extra_time_minutes: Option<u32>,
}

impl Match {
    pub fn stage(&self) -> Stage {
        Stage::from_matchday(self.matchday)
    }

    pub fn has_placeholder(&self) -> bool {
        self.home.is_placeholder() || self.away.is_placeholder()
    }

    pub fn scores(&self) -> Option<(u32, u32)> {
        Some((self.home_score?, self.away_score?))
    }

    /// Both scores present and different.
    pub fn is_decisive(&self) -> bool {
        self.scores().is_some_and(|(h, a)| h != a)
    }

    pub fn score_label(&self) -> String {
        let home = self
            .home_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let away = self
            .away_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        match (self.penalty_home, self.penalty_away) {
            (Some(ph), Some(pa)) => format!("{home} - {away} ({ph}-{pa} pens)"),
            _ => format!("{home} - {away}"),
        }
    }

    pub fn merge_scores_from(&mut self, other: &Match) {
        self.home_score = other.home_score;
        self.away_score = other.away_score;
        self.penalty_home = other.penalty_home;
        self.penalty_away = other.penalty_away;
    }
}

/// Fills names of participants that arrived as bare ids.
pub fn fill_team_names(matches: &mut [Match], teams: &[Team]) {
    let names: HashMap<u64, &str> = teams.iter().map(|t| (t.id, t.name.as_str())).collect();
    for m in matches.iter_mut() {
        for side in [&mut m.home, &mut m.away] {
            if let Participant::Team(team) = side {
                if team.name.is_empty() {
                    if let Some(name) = team.id.and_then(|id| names.get(&id)) {
                        team.name = name.to_string();
                    }
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTeamRef {
    Id(u64),
    Name(String),
    Object {
        #[serde(default)]
        id: Option<u64>,
        #[serde(default)]
        name: Option<String>,
    },
}

impl RawTeamRef {
    fn into_parts(self) -> (Option<u64>, Option<String>) {
        match self {
            RawTeamRef::Id(id) => (Some(id), None),
            RawTeamRef::Name(name) => (None, Some(name)),
            RawTeamRef::Object { id, name } => (id, name),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSeasonRef {
    Id(u64),
    Object {
        id: u64,
        #[serde(default)]
        name: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    id: u64,
    #[serde(default)]
    season: Option<RawSeasonRef>,
    #[serde(default)]
    home_team: Option<RawTeamRef>,
    #[serde(default)]
    away_team: Option<RawTeamRef>,
    #[serde(default)]
    home_score: Option<u32>,
    #[serde(default)]
    away_score: Option<u32>,
    #[serde(default)]
    penalty_home: Option<u32>,
    #[serde(default)]
    penalty_away: Option<u32>,
    #[serde(default)]
    matchday: Option<u32>,
    #[serde(default)]
    is_played: bool,
    #[serde(default)]
    void: bool,
    #[serde(default)]
    match_date: Option<String>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    awarded: bool,
    #[serde(default)]
    awarded_reason: Option<String>,
    #[serde(default)]
    awarded_to: Option<RawTeamRef>,
    #[serde(default)]
    original_home_score: Option<u32>,
    #[serde(default)]
    original_away_score: Option<u32>,
    #[serde(default)]
    match_stage: Option<String>,
    #[serde(default)]
    manual_finished_at: Option<String>,
    #[serde(default)]
    extra_time_minutes: Option<u32>,
}

impl RawMatch {
    fn normalize(self) -> Match {
        let (season_id, season_name) = match self.season {
            Some(RawSeasonRef::Id(id)) => (Some(id), None),
            Some(RawSeasonRef::Object { id, name }) => (Some(id), name),
            None => (None, None),
        };
        let side = |raw: Option<RawTeamRef>| match raw {
            Some(raw) => {
                let (id, name) = raw.into_parts();
                Participant::from_parts(id, name)
            }
            None => Participant::Unknown,
        };
        let award = if self.awarded {
            let awarded_to = self.awarded_to.map(|raw| {
                let (id, name) = raw.into_parts();
                TeamRef {
                    id,
                    name: name.unwrap_or_default(),
                }
            });
            Some(Award {
                reason: self.awarded_reason.filter(|r| !r.is_empty()),
                awarded_to,
                original_home_score: self.original_home_score,
                original_away_score: self.original_away_score,
            })
        } else {
            None
        };
        let match_date_raw = self.match_date.unwrap_or_default();

        Match {
            id: self.id,
            season_id,
            season_name,
            home: side(self.home_team),
            away: side(self.away_team),
            home_score: self.home_score,
            away_score: self.away_score,
            penalty_home: self.penalty_home,
            penalty_away: self.penalty_away,
            matchday: self.matchday,
            is_played: self.is_played,
            void: self.void,
            match_date: parse_match_date(&match_date_raw),
            match_date_raw,
            venue: self.venue.filter(|v| !v.trim().is_empty()),
            award,
            stage_label: self.match_stage.filter(|s| !s.is_empty()),
            manual_finished_at: self.manual_finished_at,
            extra_time_minutes: self.extra_time_minutes,
        }
    }
}

pub fn parse_match_json(raw: &str) -> Result<Match, ApiError> {
    let parsed: RawMatch =
        serde_json::from_str(raw.trim()).map_err(|err| ApiError::Decode(err.to_string()))?;
    Ok(parsed.normalize())
}

pub fn parse_matches_json(raw: &str) -> Result<Vec<Match>, ApiError> {
    let rows: Vec<RawMatch> = parse_list(raw)?;
    Ok(rows.into_iter().map(RawMatch::normalize).collect())
}

/// Lists answered with `null` or an empty body read as empty.
pub fn parse_list<T: serde::de::DeserializeOwned>(raw: &str) -> Result<Vec<T>, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).map_err(|err| ApiError::Decode(err.to_string()))
}

/// Accepts RFC 3339, the server's `%Y-%m-%dT%H:%M:%S%z`, and naive
/// `YYYY-MM-DD HH:MM:SS` which the league publishes in West Africa Time.
pub fn parse_match_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt);
    }
    const NAIVE: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let wat = FixedOffset::east_opt(3600)?;
    NAIVE
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| wat.from_local_datetime(&naive).single())
}

fn first_number(raw: &str) -> Option<u32> {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .take(3)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_boundaries() {
        assert_eq!(Stage::from_matchday(None), Stage::Group);
        assert_eq!(Stage::from_matchday(Some(0)), Stage::Group);
        assert_eq!(Stage::from_matchday(Some(21)), Stage::Group);
        assert_eq!(Stage::from_matchday(Some(22)), Stage::Quarterfinal);
        assert_eq!(Stage::from_matchday(Some(25)), Stage::Quarterfinal);
        assert_eq!(Stage::from_matchday(Some(27)), Stage::Semifinal);
        assert_eq!(Stage::from_matchday(Some(28)), Stage::ThirdPlace);
        assert_eq!(Stage::from_matchday(Some(29)), Stage::Final);
        assert_eq!(Stage::from_matchday(Some(31)), Stage::Knockout);
    }

    #[test]
    fn placeholder_tokens() {
        let p = Placeholder::parse("Winner of MD22").expect("placeholder");
        assert_eq!(p.kind, PlaceholderKind::Winner);
        assert_eq!(p.matchday, Some(22));
        let p = Placeholder::parse("LOSER 26").expect("placeholder");
        assert_eq!(p.kind, PlaceholderKind::Loser);
        assert_eq!(p.matchday, Some(26));
        assert!(Placeholder::parse("ABAM FC").is_none());
    }

    #[test]
    fn naive_dates_assume_wat() {
        let dt = parse_match_date("2025-02-12 16:00:00").expect("date");
        assert_eq!(dt.offset().local_minus_utc(), 3600);
        assert!(parse_match_date("not a date").is_none());
        assert!(parse_match_date("2025-02-12T16:00:00+0000").is_some());
    }
}
