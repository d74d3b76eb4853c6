use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::anyhow;

use crate::admin::{AdminClient, RESULTS_GROUPS};
use crate::api::{LeagueApi, MatchQuery};
use crate::auth::{AuthSession, SystemClock};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::events::{EventBus, MatchEvent};
use crate::model::{Category, Participant, fill_team_names};
use crate::polling::{PollConfig, PollHandle, spawn_poller};
use crate::standings::{Discrepancy, aggregate_groups, reconcile};
use crate::state::{Delta, ProviderCommand, Screen, SessionInfo};
use crate::token_store::{MemoryTokenStore, SqliteTokenStore, TokenStore};
use crate::transport::{ReqwestTransport, Transport};
use crate::views;

/// Everything the provider thread needs, built once in `main`.
#[derive(Clone)]
pub struct Provider {
    pub config: ClientConfig,
    pub api: LeagueApi,
    pub session: Arc<AuthSession>,
    pub admin: AdminClient,
    pub bus: EventBus,
}

impl Provider {
    /// Wires the HTTP transport, the SQLite session store and the event bus.
    /// An unusable session file falls back to an in-memory session.
    pub fn from_config(config: &ClientConfig) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(config.http_timeout));
        let store: Arc<dyn TokenStore> = match config.token_db_path() {
            Some(path) => match SqliteTokenStore::open(&path) {
                Ok(store) => Arc::new(store),
                Err(err) => {
                    log::warn!("session db unavailable, keeping session in memory: {err:#}");
                    Arc::new(MemoryTokenStore::new())
                }
            },
            None => Arc::new(MemoryTokenStore::new()),
        };
        let session = Arc::new(AuthSession::new(
            &config.api_url,
            transport.clone(),
            store,
            Arc::new(SystemClock),
        ));
        let bus = EventBus::new();
        Self {
            config: config.clone(),
            api: LeagueApi::new(&config.api_url, transport),
            admin: AdminClient::new(session.clone(), bus.clone()),
            session,
            bus,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StandingsSelection {
    category: Category,
    season_id: u64,
}

/// Spawns the provider: one poller each for Home, Results and Standings,
/// plus a command loop for selection changes and admin writes. The thread
/// exits (and its pollers stop) when the command channel closes.
pub fn spawn_provider(provider: Provider, tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>) {
    thread::spawn(move || run_provider(provider, tx, cmd_rx));
}

fn run_provider(provider: Provider, tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>) {
    let events = provider.bus.subscribe();
    let poll = provider.config.poll_config();

    let results_season: Arc<Mutex<Option<u64>>> = Arc::new(Mutex::new(None));
    let standings_sel: Arc<Mutex<Option<StandingsSelection>>> = Arc::new(Mutex::new(None));

    let _ = tx.send(Delta::Session(session_info(&provider.session)));
    if let Ok(teams) = provider.api.get_teams() {
        let _ = tx.send(Delta::SetTeams(teams));
    }
    match provider.api.get_seasons(None) {
        Ok(seasons) => {
            if let Some(first) = seasons.first() {
                set_shared(&results_season, Some(first.id));
            }
            let _ = tx.send(Delta::SetSeasons(seasons));
        }
        Err(err) => send_page_error(&tx, Screen::Results, &err, "view results"),
    }
    select_standings(&provider, &tx, &standings_sel, Category::default(), None);
    send_news(&provider, &tx);

    let mut pollers: Vec<PollHandle> = Vec::new();
    pollers.push(home_poller(&provider, &tx, poll));
    pollers.push(results_poller(&provider, &tx, poll, results_season.clone()));
    pollers.push(standings_poller(&provider, &tx, poll, standings_sel.clone()));
    let _ = tx.send(Delta::Log(format!(
        "[INFO] Polling {} every {}-{} ms",
        provider.api.base(),
        provider.config.poll_min.as_millis(),
        provider.config.poll_max.as_millis()
    )));

    loop {
        while let Ok(event) = events.try_recv() {
            let shown = get_shared(&standings_sel).map(|sel| (sel.season_id, sel.category));
            for delta in match_event_deltas(&provider.api, event, shown) {
                if tx.send(delta).is_err() {
                    return;
                }
            }
        }
        match cmd_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(cmd) => handle_command(&provider, &tx, cmd, &results_season, &standings_sel),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    for poller in pollers {
        log::debug!("stopping poller {}", poller.name());
        poller.stop();
    }
}

fn handle_command(
    provider: &Provider,
    tx: &Sender<Delta>,
    cmd: ProviderCommand,
    results_season: &Arc<Mutex<Option<u64>>>,
    standings_sel: &Arc<Mutex<Option<StandingsSelection>>>,
) {
    match cmd {
        ProviderCommand::SelectResultsSeason(season_id) => {
            set_shared(results_season, Some(season_id));
            match results_delta(&provider.api, season_id) {
                Ok(delta) => {
                    let _ = tx.send(delta);
                }
                Err(err) => send_page_error(tx, Screen::Results, &err, "view results"),
            }
        }
        ProviderCommand::SelectStandings {
            category,
            season_id,
        } => select_standings(provider, tx, standings_sel, category, season_id),
        ProviderCommand::RefreshNews => send_news(provider, tx),
        ProviderCommand::OpenNews(id) => match provider.api.get_news_item(id) {
            Ok(item) => {
                let _ = tx.send(Delta::SetNewsDetail(item));
            }
            Err(err) => send_page_error(tx, Screen::News, &err, "read news"),
        },
        ProviderCommand::RefreshSession => {
            if provider.session.is_logged_in() {
                if let Err(err) = provider.session.current_user() {
                    let _ = tx.send(Delta::Log(format!("[WARN] Session check failed: {err}")));
                }
            }
            let info = session_info(&provider.session);
            let can_edit = info.can_edit_results;
            let _ = tx.send(Delta::Session(info));
            if can_edit {
                match provider.admin.load_pending() {
                    Ok(pending) => {
                        let _ = tx.send(Delta::SetPendingMatches(pending));
                    }
                    Err(err) => send_page_error(tx, Screen::Admin, &err, "load matches"),
                }
            }
        }
        ProviderCommand::SetResult { match_id, input } => {
            let delta = match provider.admin.set_result(match_id, input) {
                Ok(_) => Delta::AdminResult {
                    ok: true,
                    text: "Result updated".to_string(),
                },
                Err(err) => Delta::AdminResult {
                    ok: false,
                    text: err.user_message("update results"),
                },
            };
            let _ = tx.send(delta);
        }
        ProviderCommand::MarkFinished {
            match_id,
            extra_time_minutes,
        } => {
            let delta = match provider.admin.mark_finished(match_id, extra_time_minutes) {
                Ok(_) => Delta::AdminResult {
                    ok: true,
                    text: "Match marked finished".to_string(),
                },
                Err(err) => Delta::AdminResult {
                    ok: false,
                    text: err.user_message("update results"),
                },
            };
            let _ = tx.send(delta);
        }
        ProviderCommand::Logout => {
            provider.session.logout();
            let _ = tx.send(Delta::Session(session_info(&provider.session)));
            let _ = tx.send(Delta::SetPendingMatches(Vec::new()));
            let _ = tx.send(Delta::Log("[INFO] Logged out".to_string()));
        }
    }
}

pub fn session_info(session: &AuthSession) -> SessionInfo {
    if !session.is_logged_in() {
        return SessionInfo::default();
    }
    SessionInfo {
        username: session.username(),
        groups: session.groups(),
        login_time_millis: session.login_time_millis(),
        expires_in_secs: session.access_expires_in(),
        can_edit_results: session.require_group(&RESULTS_GROUPS),
    }
}

fn home_poller(provider: &Provider, tx: &Sender<Delta>, poll: PollConfig) -> PollHandle {
    let api = provider.api.clone();
    let tx = tx.clone();
    spawn_poller("home", poll, move || {
        match home_delta(&api) {
            Ok(delta) => send(&tx, delta),
            Err(err) => {
                send_page_error(&tx, Screen::Home, &err, "view matches");
                Err(err.into())
            }
        }
    })
}

fn results_poller(
    provider: &Provider,
    tx: &Sender<Delta>,
    poll: PollConfig,
    season: Arc<Mutex<Option<u64>>>,
) -> PollHandle {
    let api = provider.api.clone();
    let tx = tx.clone();
    spawn_poller("results", poll, move || {
        let Some(season_id) = get_shared(&season) else {
            return Ok(());
        };
        match results_delta(&api, season_id) {
            Ok(delta) => send(&tx, delta),
            Err(err) => {
                send_page_error(&tx, Screen::Results, &err, "view results");
                Err(err.into())
            }
        }
    })
}

fn standings_poller(
    provider: &Provider,
    tx: &Sender<Delta>,
    poll: PollConfig,
    selection: Arc<Mutex<Option<StandingsSelection>>>,
) -> PollHandle {
    let api = provider.api.clone();
    let tx = tx.clone();
    let mut last_reported: Vec<Discrepancy> = Vec::new();
    // The immediate first tick would repeat the fetch `select_standings`
    // just made.
    spawn_poller("standings", poll.immediate(false), move || {
        let Some(sel) = get_shared(&selection) else {
            return Ok(());
        };
        let deltas = match standings_deltas(&api, sel.season_id, Some(sel.category)) {
            Ok(deltas) => deltas,
            Err(err) => {
                send_page_error(&tx, Screen::Standings, &err, "view standings");
                return Err(err.into());
            }
        };
        for delta in deltas {
            if let Delta::SetDiscrepancies { discrepancies, .. } = &delta {
                if *discrepancies != last_reported {
                    for d in discrepancies {
                        log::warn!("standings mismatch: {d}");
                    }
                    last_reported = discrepancies.clone();
                }
            }
            send(&tx, delta)?;
        }
        Ok(())
    })
}

/// Today's matches for the Home cards, names filled from the team list
/// when the server sent bare ids.
pub fn home_delta(api: &LeagueApi) -> Result<Delta, ApiError> {
    let mut matches = api.get_matches(&MatchQuery::All)?;
    let bare_ids = matches.iter().any(|m| {
        [&m.home, &m.away]
            .iter()
            .any(|side| matches!(side, Participant::Team(t) if t.name.is_empty()))
    });
    if bare_ids {
        if let Ok(teams) = api.get_teams() {
            fill_team_names(&mut matches, &teams);
        }
    }
    Ok(Delta::SetHomeMatches(views::todays_matches(
        &matches,
        views::today(),
        views::HOME_MATCH_LIMIT,
    )))
}

pub fn results_delta(api: &LeagueApi, season_id: u64) -> Result<Delta, ApiError> {
    let matches = api.get_matches(&MatchQuery::Season(season_id))?;
    Ok(Delta::SetResults { season_id, matches })
}

/// Patches every view with the event and, for a group-stage match of the
/// shown standings season, reloads that table right away.
pub fn match_event_deltas(
    api: &LeagueApi,
    event: MatchEvent,
    standings: Option<(u64, Category)>,
) -> Vec<Delta> {
    let reload = standings.filter(|(season_id, _)| event.affects_standings(*season_id));
    let mut deltas = vec![Delta::MatchEvent(event)];
    if let Some((season_id, category)) = reload {
        match standings_deltas(api, season_id, Some(category)) {
            Ok(more) => deltas.extend(more),
            Err(err) => log::warn!("standings reload after match update failed: {err}"),
        }
    }
    deltas
}

/// Server standings (shown) followed by the local consistency check. A
/// failed check only skips the discrepancy report.
pub fn standings_deltas(
    api: &LeagueApi,
    season_id: u64,
    category: Option<Category>,
) -> Result<Vec<Delta>, ApiError> {
    let server = api.get_grouped_standings(season_id, category)?;
    let mut deltas = Vec::with_capacity(2);
    let check = api
        .get_groups_with_teams(season_id)
        .and_then(|groups| Ok((groups, api.get_matches(&MatchQuery::Season(season_id))?)));
    match check {
        Ok((groups, matches)) => {
            let local = aggregate_groups(&groups, &matches);
            let discrepancies = reconcile(&server, &local);
            deltas.push(Delta::SetGroupedStandings {
                season_id,
                groups: server,
            });
            deltas.push(Delta::SetDiscrepancies {
                season_id,
                discrepancies,
            });
        }
        Err(err) => {
            log::debug!("standings check skipped for season {season_id}: {err}");
            deltas.push(Delta::SetGroupedStandings {
                season_id,
                groups: server,
            });
        }
    }
    Ok(deltas)
}

fn select_standings(
    provider: &Provider,
    tx: &Sender<Delta>,
    selection: &Arc<Mutex<Option<StandingsSelection>>>,
    category: Category,
    season_id: Option<u64>,
) {
    let season_id = match season_id {
        Some(id) => Some(id),
        None => match provider.api.get_seasons(Some(category)) {
            Ok(seasons) => {
                let first = seasons.first().map(|s| s.id);
                let _ = tx.send(Delta::SetStandingsSeasons { category, seasons });
                first
            }
            Err(err) => {
                send_page_error(tx, Screen::Standings, &err, "view standings");
                None
            }
        },
    };
    let Some(season_id) = season_id else {
        set_shared(selection, None);
        return;
    };
    set_shared(
        selection,
        Some(StandingsSelection {
            category,
            season_id,
        }),
    );
    match standings_deltas(&provider.api, season_id, Some(category)) {
        Ok(deltas) => {
            for delta in deltas {
                let _ = tx.send(delta);
            }
        }
        Err(err) => send_page_error(tx, Screen::Standings, &err, "view standings"),
    }
}

fn send_news(provider: &Provider, tx: &Sender<Delta>) {
    match provider.api.get_news() {
        Ok(news) => {
            let _ = tx.send(Delta::SetNews(news));
        }
        Err(err) => send_page_error(tx, Screen::News, &err, "read news"),
    }
}

fn send(tx: &Sender<Delta>, delta: Delta) -> anyhow::Result<()> {
    tx.send(delta).map_err(|_| anyhow!("ui channel closed"))
}

fn send_page_error(tx: &Sender<Delta>, screen: Screen, err: &ApiError, action: &str) {
    let _ = tx.send(Delta::PageError {
        screen,
        message: err.user_message(action),
    });
}

fn get_shared<T: Copy>(slot: &Mutex<Option<T>>) -> Option<T> {
    slot.lock().ok().and_then(|guard| *guard)
}

fn set_shared<T>(slot: &Mutex<Option<T>>, value: Option<T>) {
    if let Ok(mut guard) = slot.lock() {
        *guard = value;
    }
}
