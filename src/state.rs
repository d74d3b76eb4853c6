use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::admin::ResultInput;
use crate::bracket::Bracket;
use crate::config::ClientConfig;
use crate::events::MatchEvent;
use crate::flash::FlashBuffer;
use crate::model::{Category, GroupRef, GroupStandings, Match, NewsItem, Season, StandingsRow, Team};
use crate::standings::Discrepancy;
use crate::views::{self, StageSection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Home,
    Results,
    Standings,
    Bracket,
    News,
    History,
    Admin,
}

impl Screen {
    pub const ALL: [Screen; 7] = [
        Screen::Home,
        Screen::Results,
        Screen::Standings,
        Screen::Bracket,
        Screen::News,
        Screen::History,
        Screen::Admin,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Screen::Home => "Home",
            Screen::Results => "Results",
            Screen::Standings => "Standings",
            Screen::Bracket => "Bracket",
            Screen::News => "News",
            Screen::History => "History",
            Screen::Admin => "Admin",
        }
    }

    /// Number-key shortcut, `1` for Home through `7` for Admin.
    pub fn from_digit(c: char) -> Option<Screen> {
        let idx = c.to_digit(10)?.checked_sub(1)? as usize;
        Screen::ALL.get(idx).copied()
    }

    pub fn next(self) -> Screen {
        let idx = Screen::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Screen::ALL[(idx + 1) % Screen::ALL.len()]
    }

    pub fn prev(self) -> Screen {
        let idx = Screen::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Screen::ALL[(idx + Screen::ALL.len() - 1) % Screen::ALL.len()]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    pub username: Option<String>,
    pub groups: Vec<String>,
    pub login_time_millis: Option<i64>,
    pub expires_in_secs: Option<i64>,
    pub can_edit_results: bool,
}

impl SessionInfo {
    pub fn is_logged_in(&self) -> bool {
        self.username.is_some() || self.expires_in_secs.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftField {
    #[default]
    Home,
    Away,
    PenaltyHome,
    PenaltyAway,
    ExtraTime,
}

impl DraftField {
    fn next(self, penalties: bool) -> DraftField {
        match self {
            DraftField::Home => DraftField::Away,
            DraftField::Away if penalties => DraftField::PenaltyHome,
            DraftField::Away => DraftField::ExtraTime,
            DraftField::PenaltyHome => DraftField::PenaltyAway,
            DraftField::PenaltyAway => DraftField::ExtraTime,
            DraftField::ExtraTime => DraftField::Home,
        }
    }
}

/// Text typed into the results editor for the selected match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreDraft {
    pub home: String,
    pub away: String,
    pub penalty_home: String,
    pub penalty_away: String,
    pub extra_time: String,
    pub field: DraftField,
}

impl ScoreDraft {
    pub fn for_match(m: &Match) -> Self {
        Self {
            home: m.home_score.map(|s| s.to_string()).unwrap_or_default(),
            away: m.away_score.map(|s| s.to_string()).unwrap_or_default(),
            ..Self::default()
        }
    }

    fn slot(&mut self) -> &mut String {
        match self.field {
            DraftField::Home => &mut self.home,
            DraftField::Away => &mut self.away,
            DraftField::PenaltyHome => &mut self.penalty_home,
            DraftField::PenaltyAway => &mut self.penalty_away,
            DraftField::ExtraTime => &mut self.extra_time,
        }
    }

    pub fn push_digit(&mut self, c: char) {
        if c.is_ascii_digit() {
            let slot = self.slot();
            if slot.len() < 3 {
                slot.push(c);
            }
        }
    }

    pub fn backspace(&mut self) {
        self.slot().pop();
    }

    pub fn next_field(&mut self, penalties: bool) {
        self.field = self.field.next(penalties);
    }

    /// Both scores are required; penalties only count when both are given.
    /// A knockout draw without penalties is rejected.
    pub fn to_input(&self, knockout: bool) -> Result<ResultInput, String> {
        let home = parse_score(&self.home).ok_or("Enter the home score")?;
        let away = parse_score(&self.away).ok_or("Enter the away score")?;
        let mut input = ResultInput::new(home, away);
        if let (Some(ph), Some(pa)) = (parse_score(&self.penalty_home), parse_score(&self.penalty_away)) {
            input = input.with_penalties(ph, pa);
        }
        input.validate(knockout)?;
        Ok(input)
    }

    pub fn extra_time_minutes(&self) -> Option<u32> {
        parse_score(&self.extra_time)
    }
}

fn parse_score(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminMessage {
    pub ok: bool,
    pub text: String,
}

/// One standings group with its own flash buffer.
#[derive(Debug, Clone)]
pub struct GroupTable {
    pub group: GroupRef,
    pub rows: FlashBuffer<StandingsRow>,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub help_overlay: bool,
    pub logs: VecDeque<String>,
    pub errors: HashMap<Screen, String>,
    pub flash_duration: Duration,
    pub resolved_highlight: Duration,

    pub teams: Vec<Team>,
    pub home_matches: FlashBuffer<Match>,

    pub seasons: Vec<Season>,
    pub results_season: Option<u64>,
    pub results: Vec<Match>,
    pub results_loaded_for: Option<u64>,
    pub resolved_until: HashMap<u64, Instant>,
    pub results_scroll: u16,

    pub standings_category: Category,
    pub standings_seasons: Vec<Season>,
    pub standings_season: Option<u64>,
    pub standings_loaded_for: Option<u64>,
    pub standings: Vec<GroupTable>,
    pub standings_group_filter: Option<u64>,
    pub discrepancies: Vec<Discrepancy>,

    pub news: Vec<NewsItem>,
    pub news_selected: usize,
    pub news_detail: Option<NewsItem>,
    pub news_scroll: u16,

    pub session: SessionInfo,
    pub pending: Vec<Match>,
    pub pending_selected: usize,
    pub draft: ScoreDraft,
    pub admin_message: Option<AdminMessage>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(&ClientConfig::default())
    }

    pub fn with_config(config: &ClientConfig) -> Self {
        Self {
            screen: Screen::Home,
            help_overlay: false,
            logs: VecDeque::new(),
            errors: HashMap::new(),
            flash_duration: config.flash,
            resolved_highlight: config.resolved_highlight,
            teams: Vec::new(),
            home_matches: FlashBuffer::new(config.flash),
            seasons: Vec::new(),
            results_season: None,
            results: Vec::new(),
            results_loaded_for: None,
            resolved_until: HashMap::new(),
            results_scroll: 0,
            standings_category: Category::default(),
            standings_seasons: Vec::new(),
            standings_season: None,
            standings_loaded_for: None,
            standings: Vec::new(),
            standings_group_filter: None,
            discrepancies: Vec::new(),
            news: Vec::new(),
            news_selected: 0,
            news_detail: None,
            news_scroll: 0,
            session: SessionInfo::default(),
            pending: Vec::new(),
            pending_selected: 0,
            draft: ScoreDraft::default(),
            admin_message: None,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn error_for(&self, screen: Screen) -> Option<&str> {
        self.errors.get(&screen).map(String::as_str)
    }

    pub fn results_sections(&self) -> Vec<StageSection> {
        views::results_by_stage(&self.results)
    }

    pub fn bracket(&self) -> Bracket {
        Bracket::from_matches(&self.results)
    }

    pub fn is_resolved_highlight(&self, id: u64) -> bool {
        self.resolved_until.contains_key(&id)
    }

    pub fn visible_groups(&self) -> Vec<&GroupTable> {
        self.standings
            .iter()
            .filter(|g| self.standings_group_filter.is_none_or(|id| g.group.id == id))
            .collect()
    }

    /// Steps the group filter through "all" and each group in order.
    pub fn cycle_group_filter(&mut self) {
        let ids: Vec<u64> = self.standings.iter().map(|g| g.group.id).collect();
        self.standings_group_filter = match self.standings_group_filter {
            None => ids.first().copied(),
            Some(current) => {
                let pos = ids.iter().position(|id| *id == current);
                pos.and_then(|p| ids.get(p + 1).copied())
            }
        };
    }

    pub fn next_results_season(&self) -> Option<u64> {
        cycle_season(&self.seasons, self.results_season)
    }

    pub fn next_standings_season(&self) -> Option<u64> {
        cycle_season(&self.standings_seasons, self.standings_season)
    }

    pub fn selected_pending(&self) -> Option<&Match> {
        self.pending.get(self.pending_selected)
    }

    pub fn select_pending(&mut self, delta: isize) {
        if self.pending.is_empty() {
            self.pending_selected = 0;
            return;
        }
        let max = self.pending.len() as isize - 1;
        let next = (self.pending_selected as isize + delta).clamp(0, max) as usize;
        if next != self.pending_selected {
            self.pending_selected = next;
            self.reset_draft();
        }
    }

    pub fn reset_draft(&mut self) {
        self.draft = self
            .selected_pending()
            .map(ScoreDraft::for_match)
            .unwrap_or_default();
    }

    pub fn select_news(&mut self, delta: isize) {
        if self.news.is_empty() {
            self.news_selected = 0;
            return;
        }
        let max = self.news.len() as isize - 1;
        self.news_selected = (self.news_selected as isize + delta).clamp(0, max) as usize;
    }

    pub fn selected_news(&self) -> Option<&NewsItem> {
        self.news.get(self.news_selected)
    }

    /// Advances timers: due flash updates land and expired highlights clear.
    /// Returns true when anything visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = self.home_matches.tick(now);
        for table in self.standings.iter_mut() {
            changed |= table.rows.tick(now);
        }
        let before = self.resolved_until.len();
        self.resolved_until.retain(|_, until| *until > now);
        changed || before != self.resolved_until.len()
    }
}

fn cycle_season(seasons: &[Season], current: Option<u64>) -> Option<u64> {
    if seasons.is_empty() {
        return None;
    }
    let pos = current.and_then(|id| seasons.iter().position(|s| s.id == id));
    let next = match pos {
        Some(p) => (p + 1) % seasons.len(),
        None => 0,
    };
    Some(seasons[next].id)
}

#[derive(Debug, Clone)]
pub enum Delta {
    SetTeams(Vec<Team>),
    SetHomeMatches(Vec<Match>),
    SetSeasons(Vec<Season>),
    SetResults {
        season_id: u64,
        matches: Vec<Match>,
    },
    SetStandingsSeasons {
        category: Category,
        seasons: Vec<Season>,
    },
    SetGroupedStandings {
        season_id: u64,
        groups: Vec<GroupStandings>,
    },
    SetDiscrepancies {
        season_id: u64,
        discrepancies: Vec<Discrepancy>,
    },
    SetNews(Vec<NewsItem>),
    SetNewsDetail(NewsItem),
    SetPendingMatches(Vec<Match>),
    MatchEvent(MatchEvent),
    Session(SessionInfo),
    AdminResult {
        ok: bool,
        text: String,
    },
    PageError {
        screen: Screen,
        message: String,
    },
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    SelectResultsSeason(u64),
    SelectStandings {
        category: Category,
        season_id: Option<u64>,
    },
    RefreshNews,
    OpenNews(u64),
    /// Re-reads the session; loads the pending list when the user may edit results.
    RefreshSession,
    SetResult {
        match_id: u64,
        input: ResultInput,
    },
    MarkFinished {
        match_id: u64,
        extra_time_minutes: Option<u32>,
    },
    Logout,
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    apply_delta_at(state, delta, Instant::now());
}

/// Applies one provider message. `now` drives flash deadlines and the
/// resolved highlight.
pub fn apply_delta_at(state: &mut AppState, delta: Delta, now: Instant) {
    match delta {
        Delta::SetTeams(teams) => {
            state.teams = teams;
        }
        Delta::SetHomeMatches(matches) => {
            state.errors.remove(&Screen::Home);
            state.home_matches.ingest(matches, now);
        }
        Delta::SetSeasons(seasons) => {
            state.errors.remove(&Screen::Results);
            let keep = state
                .results_season
                .is_some_and(|id| seasons.iter().any(|s| s.id == id));
            if !keep {
                state.results_season = seasons.first().map(|s| s.id);
            }
            state.seasons = seasons;
        }
        Delta::SetResults { season_id, matches } => {
            if state.results_season.is_some_and(|id| id != season_id) {
                return;
            }
            state.errors.remove(&Screen::Results);
            if state.results_loaded_for == Some(season_id) {
                let until = now + state.resolved_highlight;
                for id in views::newly_resolved(&state.results, &matches) {
                    state.resolved_until.insert(id, until);
                }
            } else {
                state.resolved_until.clear();
                state.results_scroll = 0;
            }
            state.results_loaded_for = Some(season_id);
            state.results = matches;
        }
        Delta::SetStandingsSeasons { category, seasons } => {
            if category != state.standings_category {
                return;
            }
            let keep = state
                .standings_season
                .is_some_and(|id| seasons.iter().any(|s| s.id == id));
            if !keep {
                state.standings_season = seasons.first().map(|s| s.id);
            }
            if state.standings_season.is_none() {
                state.standings.clear();
                state.standings_loaded_for = None;
            }
            state.standings_seasons = seasons;
        }
        Delta::SetGroupedStandings { season_id, groups } => {
            if state.standings_season.is_some_and(|id| id != season_id) {
                return;
            }
            state.errors.remove(&Screen::Standings);
            apply_grouped_standings(state, season_id, groups, now);
        }
        Delta::SetDiscrepancies {
            season_id,
            discrepancies,
        } => {
            if state.standings_season == Some(season_id) {
                state.discrepancies = discrepancies;
            }
        }
        Delta::SetNews(news) => {
            state.errors.remove(&Screen::News);
            state.news = news;
            if state.news_selected >= state.news.len() {
                state.news_selected = state.news.len().saturating_sub(1);
            }
        }
        Delta::SetNewsDetail(item) => {
            state.errors.remove(&Screen::News);
            state.news_scroll = 0;
            state.news_detail = Some(item);
        }
        Delta::SetPendingMatches(matches) => {
            state.errors.remove(&Screen::Admin);
            let selected_id = state.selected_pending().map(|m| m.id);
            state.pending = matches;
            state.pending_selected = selected_id
                .and_then(|id| state.pending.iter().position(|m| m.id == id))
                .unwrap_or(0);
            state.reset_draft();
        }
        Delta::MatchEvent(event) => apply_match_event(state, &event),
        Delta::Session(info) => {
            if !info.can_edit_results {
                state.pending.clear();
                state.pending_selected = 0;
                state.reset_draft();
            }
            state.session = info;
        }
        Delta::AdminResult { ok, text } => {
            let line = if ok {
                format!("[INFO] {text}")
            } else {
                format!("[WARN] {text}")
            };
            state.push_log(line);
            state.admin_message = Some(AdminMessage { ok, text });
        }
        Delta::PageError { screen, message } => {
            state.errors.insert(screen, message);
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

fn apply_grouped_standings(
    state: &mut AppState,
    season_id: u64,
    groups: Vec<GroupStandings>,
    now: Instant,
) {
    let same_season = state.standings_loaded_for == Some(season_id);
    let mut previous: Vec<GroupTable> = if same_season {
        std::mem::take(&mut state.standings)
    } else {
        state.discrepancies.clear();
        state.standings_group_filter = None;
        Vec::new()
    };
    let mut tables = Vec::with_capacity(groups.len());
    for block in groups {
        let existing = previous
            .iter()
            .position(|t| t.group.id == block.group.id)
            .map(|idx| previous.swap_remove(idx));
        let table = match existing {
            Some(mut table) => {
                table.group = block.group;
                table.rows.ingest(block.standings, now);
                table
            }
            None => {
                let mut rows = FlashBuffer::new(state.flash_duration);
                rows.reset(block.standings);
                GroupTable {
                    group: block.group,
                    rows,
                }
            }
        };
        tables.push(table);
    }
    if let Some(filter) = state.standings_group_filter {
        if !tables.iter().any(|t| t.group.id == filter) {
            state.standings_group_filter = None;
        }
    }
    state.standings = tables;
    state.standings_loaded_for = Some(season_id);
}

/// Updated replaces the match wherever it is shown; ScoresSaved merges only
/// the score fields.
pub fn apply_match_event(state: &mut AppState, event: &MatchEvent) {
    state.home_matches.patch(|m| {
        event.apply_to(m);
    });
    for m in state.results.iter_mut() {
        event.apply_to(m);
    }
    for m in state.pending.iter_mut() {
        event.apply_to(m);
    }
    let record = event.record();
    state.push_log(format!(
        "[INFO] Match {} updated: {}",
        record.id,
        record.score_label()
    ));
}
