use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use unity_cup_terminal::admin::accepts_penalties;
use unity_cup_terminal::bracket::{Bracket, participant_label};
use unity_cup_terminal::config::ClientConfig;
use unity_cup_terminal::feed::{self, Provider};
use unity_cup_terminal::history;
use unity_cup_terminal::logging;
use unity_cup_terminal::model::{Match, StandingsRow};
use unity_cup_terminal::state::{
    AppState, Delta, DraftField, GroupTable, ProviderCommand, Screen, apply_delta,
};
use unity_cup_terminal::views::{badges, kickoff_label, strip_html};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    editing: bool,
}

impl App {
    fn new(state: AppState, cmd_tx: Option<mpsc::Sender<ProviderCommand>>) -> Self {
        Self {
            state,
            should_quit: false,
            cmd_tx,
            editing: false,
        }
    }

    fn send(&mut self, cmd: ProviderCommand) {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log("[INFO] Provider unavailable");
            return;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log("[WARN] Provider request failed");
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.editing {
            self.on_edit_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Char(c @ '1'..='7') => {
                if let Some(screen) = Screen::from_digit(c) {
                    self.switch_to(screen);
                }
            }
            KeyCode::Tab | KeyCode::Right => self.switch_to(self.state.screen.next()),
            KeyCode::BackTab | KeyCode::Left => self.switch_to(self.state.screen.prev()),
            _ => self.on_page_key(key),
        }
    }

    fn switch_to(&mut self, screen: Screen) {
        self.state.screen = screen;
        if screen == Screen::Admin {
            self.send(ProviderCommand::RefreshSession);
        }
    }

    fn on_page_key(&mut self, key: KeyEvent) {
        match (self.state.screen, key.code) {
            (Screen::Results | Screen::Bracket, KeyCode::Char('s')) => {
                if let Some(id) = self.state.next_results_season() {
                    self.state.results_season = Some(id);
                    self.send(ProviderCommand::SelectResultsSeason(id));
                }
            }
            (Screen::Results, KeyCode::Char('j') | KeyCode::Down) => {
                self.state.results_scroll = self.state.results_scroll.saturating_add(1);
            }
            (Screen::Results, KeyCode::Char('k') | KeyCode::Up) => {
                self.state.results_scroll = self.state.results_scroll.saturating_sub(1);
            }
            (Screen::Standings, KeyCode::Char('c')) => {
                let category = self.state.standings_category.next();
                self.state.standings_category = category;
                self.state.standings_season = None;
                self.state.standings_seasons.clear();
                self.send(ProviderCommand::SelectStandings {
                    category,
                    season_id: None,
                });
            }
            (Screen::Standings, KeyCode::Char('s')) => {
                if let Some(id) = self.state.next_standings_season() {
                    self.state.standings_season = Some(id);
                    self.send(ProviderCommand::SelectStandings {
                        category: self.state.standings_category,
                        season_id: Some(id),
                    });
                }
            }
            (Screen::Standings, KeyCode::Char('g')) => self.state.cycle_group_filter(),
            (Screen::News, KeyCode::Char('j') | KeyCode::Down) => {
                if self.state.news_detail.is_some() {
                    self.state.news_scroll = self.state.news_scroll.saturating_add(1);
                } else {
                    self.state.select_news(1);
                }
            }
            (Screen::News, KeyCode::Char('k') | KeyCode::Up) => {
                if self.state.news_detail.is_some() {
                    self.state.news_scroll = self.state.news_scroll.saturating_sub(1);
                } else {
                    self.state.select_news(-1);
                }
            }
            (Screen::News, KeyCode::Enter | KeyCode::Char('d')) => {
                if let Some(id) = self.state.selected_news().map(|n| n.id) {
                    self.send(ProviderCommand::OpenNews(id));
                }
            }
            (Screen::News, KeyCode::Esc | KeyCode::Char('b')) => self.state.news_detail = None,
            (Screen::News, KeyCode::Char('r')) => self.send(ProviderCommand::RefreshNews),
            (Screen::Admin, KeyCode::Char('r')) => self.send(ProviderCommand::RefreshSession),
            (Screen::Admin, KeyCode::Char('j') | KeyCode::Down) => self.state.select_pending(1),
            (Screen::Admin, KeyCode::Char('k') | KeyCode::Up) => self.state.select_pending(-1),
            (Screen::Admin, KeyCode::Char('e') | KeyCode::Enter) => {
                if self.state.selected_pending().is_some() {
                    self.editing = true;
                    self.state.admin_message = None;
                }
            }
            (Screen::Admin, KeyCode::Char('f')) => self.mark_finished(),
            (Screen::Admin, KeyCode::Char('x')) => self.send(ProviderCommand::Logout),
            _ => {}
        }
    }

    fn on_edit_key(&mut self, key: KeyEvent) {
        let penalties = self.state.selected_pending().is_some_and(accepts_penalties);
        match key.code {
            KeyCode::Esc => {
                self.editing = false;
                self.state.reset_draft();
            }
            KeyCode::Tab => self.state.draft.next_field(penalties),
            KeyCode::Backspace => self.state.draft.backspace(),
            KeyCode::Char(c) if c.is_ascii_digit() => self.state.draft.push_digit(c),
            KeyCode::Enter => self.save_result(),
            _ => {}
        }
    }

    fn save_result(&mut self) {
        let Some((match_id, knockout)) = self
            .state
            .selected_pending()
            .map(|m| (m.id, accepts_penalties(m)))
        else {
            return;
        };
        match self.state.draft.to_input(knockout) {
            Ok(input) => {
                self.editing = false;
                self.send(ProviderCommand::SetResult { match_id, input });
            }
            Err(msg) => apply_delta(
                &mut self.state,
                Delta::AdminResult {
                    ok: false,
                    text: msg,
                },
            ),
        }
    }

    fn mark_finished(&mut self) {
        let Some(match_id) = self.state.selected_pending().map(|m| m.id) else {
            return;
        };
        let extra_time_minutes = self.state.draft.extra_time_minutes();
        self.send(ProviderCommand::MarkFinished {
            match_id,
            extra_time_minutes,
        });
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let log_path = logging::init_file("info").ok();
    let config = ClientConfig::from_env();
    let provider = Provider::from_config(&config);

    let mut state = AppState::with_config(&config);
    match &log_path {
        Some(path) => state.push_log(format!("[INFO] Logging to {}", path.display())),
        None => state.push_log("[WARN] File logging unavailable"),
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    feed::spawn_provider(provider, tx, cmd_rx);

    let mut app = App::new(state, Some(cmd_tx));
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }
        app.state.tick(Instant::now());

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(4),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let body = chunks[1];
    let body = match app.state.error_for(app.state.screen) {
        Some(err) => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Min(1)])
                .split(body);
            let line = Paragraph::new(format!("! {err}")).style(Style::default().fg(Color::Red));
            frame.render_widget(line, parts[0]);
            parts[1]
        }
        None => body,
    };

    match app.state.screen {
        Screen::Home => render_home(frame, body, &app.state),
        Screen::Results => render_results(frame, body, &app.state),
        Screen::Standings => render_standings(frame, body, &app.state),
        Screen::Bracket => render_bracket(frame, body, &app.state),
        Screen::News => render_news(frame, body, &app.state),
        Screen::History => render_history(frame, body),
        Screen::Admin => render_admin(frame, body, app),
    }

    let console = Paragraph::new(console_text(&app.state))
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().title("Console").borders(Borders::TOP));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(app));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let tabs = Screen::ALL
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if *s == state.screen {
                format!("[{} {}]", i + 1, s.label())
            } else {
                format!(" {} {} ", i + 1, s.label())
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let user = match &state.session.username {
        Some(name) => format!("admin: {name}"),
        None => "public".to_string(),
    };
    format!("  UBAKALA UNITY CUP | {user}\n  {tabs}")
}

fn footer_text(app: &App) -> String {
    if app.editing {
        return "0-9 Score | Tab Next field | Backspace Delete | Enter Save | Esc Cancel".to_string();
    }
    let page = match app.state.screen {
        Screen::Home | Screen::History => "",
        Screen::Results => "s Season | j/k Scroll | ",
        Screen::Standings => "c Category | s Season | g Group | ",
        Screen::Bracket => "s Season | ",
        Screen::News => "j/k Move | Enter Open | b Back | r Refresh | ",
        Screen::Admin => "j/k Move | e Edit | f Finish | r Reload | x Logout | ",
    };
    format!("{page}1-7/Tab Pages | ? Help | q Quit")
}

fn flash_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn score_text(score: Option<u32>) -> String {
    score.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())
}

fn render_home(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(6)])
        .split(area);

    let buffer = &state.home_matches;
    let mut lines = vec![Line::from(Span::styled(
        "Today's Matches",
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    if buffer.displayed().is_empty() {
        lines.push(Line::from(Span::styled("No matches today", dim())));
    }
    for m in buffer.displayed() {
        let field_style = |field: &str| {
            if buffer.is_field_flashing(&m.id, field) {
                flash_style()
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            }
        };
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::raw(format!("  {:>22}  ", m.home.display_name())),
            Span::styled(format!(" {} ", score_text(m.home_score)), field_style("home_score")),
            Span::raw(" - "),
            Span::styled(format!(" {} ", score_text(m.away_score)), field_style("away_score")),
            Span::raw(format!("  {}", m.away.display_name())),
        ]));
        let mut meta = kickoff_label(m);
        if let Some(venue) = &m.venue {
            meta.push_str(&format!(" | {venue}"));
        }
        if let Some(season) = &m.season_name {
            meta.push_str(&format!(" | {season}"));
        }
        lines.push(Line::from(Span::styled(format!("  {meta}"), dim())));
    }
    frame.render_widget(Paragraph::new(lines), sections[0]);

    let names = state
        .teams
        .iter()
        .filter(|t| !t.archived)
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let teams = Paragraph::new(names)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(format!("Participating teams ({})", state.teams.len()))
                .borders(Borders::TOP),
        );
    frame.render_widget(teams, sections[1]);
}

fn season_name(state: &AppState, id: Option<u64>) -> String {
    id.and_then(|id| state.seasons.iter().find(|s| s.id == id))
        .map(|s| s.name.clone())
        .unwrap_or_else(|| "no season".to_string())
}

fn match_line(m: &Match, highlighted: bool) -> Line<'static> {
    let base = if highlighted {
        Style::default().fg(Color::Black).bg(Color::Green)
    } else if m.void {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    let tags = badges(m)
        .iter()
        .map(|b| b.label())
        .collect::<Vec<_>>()
        .join(" ");
    let home = participant_label(&m.home, m.matchday);
    let away = participant_label(&m.away, m.matchday);
    let mut text = format!(
        "  {:<16} {:>26} {:^15} {:<26} {}",
        kickoff_label(m),
        home,
        m.score_label(),
        away,
        tags
    );
    if let Some(award) = &m.award {
        if let Some(reason) = &award.reason {
            text.push_str(&format!(" ({reason})"));
        }
    }
    Line::from(Span::styled(text, base))
}

fn render_results(frame: &mut Frame, area: Rect, state: &AppState) {
    let mut lines = vec![Line::from(Span::styled(
        format!("Season: {}", season_name(state, state.results_season)),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    let sections = state.results_sections();
    if sections.is_empty() {
        lines.push(Line::from(Span::styled("No matches for this season", dim())));
    }
    for section in sections {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            section.stage.label().to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        for m in &section.matches {
            lines.push(match_line(m, state.is_resolved_highlight(m.id)));
        }
    }
    let paragraph = Paragraph::new(lines).scroll((state.results_scroll, 0));
    frame.render_widget(paragraph, area);
}

const STANDINGS_FIELDS: [&str; 8] = [
    "played",
    "wins",
    "draws",
    "losses",
    "goals_for",
    "goals_against",
    "goal_diff",
    "points",
];

fn standings_values(row: &StandingsRow) -> [String; 8] {
    [
        row.played.to_string(),
        row.wins.to_string(),
        row.draws.to_string(),
        row.losses.to_string(),
        row.goals_for.to_string(),
        row.goals_against.to_string(),
        format!("{:+}", row.goal_diff),
        row.points.to_string(),
    ]
}

fn group_lines(table: &GroupTable) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            table.group.name.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(
                "  {:>2}  {:<24}{:>4}{:>4}{:>4}{:>4}{:>4}{:>4}{:>5}{:>5}",
                "#", "Team", "P", "W", "D", "L", "GF", "GA", "GD", "Pts"
            ),
            dim(),
        )),
    ];
    for (pos, row) in table.rows.displayed().iter().enumerate() {
        let mut spans = vec![Span::raw(format!("  {:>2}  {:<24}", pos + 1, row.team_name))];
        for (i, (field, value)) in STANDINGS_FIELDS
            .iter()
            .zip(standings_values(row))
            .enumerate()
        {
            let width = if i >= 6 { 5 } else { 4 };
            let style = if table.rows.is_field_flashing(&row.team_id, field) {
                flash_style()
            } else {
                Style::default()
            };
            spans.push(Span::styled(format!("{value:>width$}"), style));
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));
    lines
}

fn render_standings(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let season = state
        .standings_season
        .and_then(|id| state.standings_seasons.iter().find(|s| s.id == id))
        .map(|s| s.name.clone())
        .unwrap_or_else(|| "no season".to_string());
    let filter = match state.standings_group_filter {
        Some(id) => state
            .standings
            .iter()
            .find(|g| g.group.id == id)
            .map(|g| g.group.name.clone())
            .unwrap_or_else(|| "all groups".to_string()),
        None => "all groups".to_string(),
    };
    let mut lines = vec![Line::from(Span::styled(
        format!(
            "{} | {} | {}",
            state.standings_category.label(),
            season,
            filter
        ),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    let groups = state.visible_groups();
    if groups.is_empty() {
        lines.push(Line::from(Span::styled("No standings available", dim())));
    }
    for table in groups {
        lines.extend(group_lines(table));
    }
    frame.render_widget(Paragraph::new(lines), sections[0]);

    let check = if state.discrepancies.is_empty() {
        Paragraph::new("Local tally agrees with server standings").style(dim())
    } else {
        let text = state
            .discrepancies
            .iter()
            .take(2)
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Paragraph::new(format!(
            "{} mismatch(es) with local tally\n{text}",
            state.discrepancies.len()
        ))
        .style(Style::default().fg(Color::Yellow))
    };
    frame.render_widget(check, sections[1]);
}

fn bracket_box(m: &Match) -> Vec<Line<'static>> {
    let side = |label: String, score: Option<u32>| {
        Line::from(format!(" {:<28}{:>3}", label, score_text(score)))
    };
    vec![
        side(participant_label(&m.home, m.matchday), m.home_score),
        side(participant_label(&m.away, m.matchday), m.away_score),
        Line::from(Span::styled(format!(" {}", kickoff_label(m)), dim())),
        Line::from(""),
    ]
}

fn bracket_column(title: &str, matches: &[Match]) -> Paragraph<'static> {
    let mut lines = Vec::new();
    if matches.is_empty() {
        lines.push(Line::from(Span::styled(" TBD", dim())));
    }
    for m in matches {
        lines.extend(bracket_box(m));
    }
    Paragraph::new(lines).block(Block::default().title(title.to_string()).borders(Borders::ALL))
}

fn render_bracket(frame: &mut Frame, area: Rect, state: &AppState) {
    let bracket: Bracket = state.bracket();
    if bracket.is_empty() {
        let empty = Paragraph::new(format!(
            "No knockout matches for {}",
            season_name(state, state.results_season)
        ))
        .style(dim());
        frame.render_widget(empty, area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(4)])
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(rows[0]);
    frame.render_widget(bracket_column("Quarterfinals", &bracket.quarterfinals), cols[0]);
    frame.render_widget(bracket_column("Semifinals", &bracket.semifinals), cols[1]);
    let finals: Vec<Match> = bracket
        .final_round
        .iter()
        .chain(&bracket.third_place)
        .cloned()
        .collect();
    frame.render_widget(bracket_column("Final / Third Place", &finals), cols[2]);

    let links = bracket
        .connectors()
        .iter()
        .map(|c| {
            let mark = if c.revealed { "==>" } else { "-->" };
            format!("#{} {mark} #{}", c.from, c.to)
        })
        .collect::<Vec<_>>()
        .join("   ");
    let connectors = Paragraph::new(links)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Path (==> decided)").borders(Borders::TOP));
    frame.render_widget(connectors, rows[1]);
}

fn render_news(frame: &mut Frame, area: Rect, state: &AppState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    let mut list = Vec::new();
    if state.news.is_empty() {
        list.push(Line::from(Span::styled("No news yet", dim())));
    }
    for (idx, item) in state.news.iter().enumerate() {
        let style = if idx == state.news_selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        list.push(Line::from(Span::styled(item.title.clone(), style)));
        if let Some(date) = &item.published_at {
            list.push(Line::from(Span::styled(format!("  {date}"), dim())));
        }
    }
    frame.render_widget(
        Paragraph::new(list).block(Block::default().title("News").borders(Borders::RIGHT)),
        cols[0],
    );

    let detail = match &state.news_detail {
        Some(item) => {
            let mut text = item.title.clone();
            if let Some(sub) = item.subtitle.as_deref().filter(|s| !s.is_empty()) {
                text.push_str(&format!("\n{sub}"));
            }
            if let Some(author) = &item.author {
                text.push_str(&format!("\nby {author}"));
            }
            text.push_str("\n\n");
            text.push_str(&strip_html(&item.content));
            if let Some(url) = &item.image_url {
                text.push_str(&format!("\n\nImage: {url}"));
            }
            text
        }
        None => "Select a story and press Enter".to_string(),
    };
    frame.render_widget(
        Paragraph::new(detail)
            .wrap(Wrap { trim: false })
            .scroll((state.news_scroll, 0)),
        cols[1],
    );
}

fn render_history(frame: &mut Frame, area: Rect) {
    let mut lines = vec![Line::from(Span::styled(
        "League History",
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    for entry in history::timeline() {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled(
                format!("{}  ", entry.year),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(entry.title),
            Span::styled(format!("  [{}]", entry.status.label()), dim()),
        ]));
        lines.push(Line::from(format!("      {}", entry.description)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(history::MILESTONES, dim())));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

fn session_text(state: &AppState) -> String {
    let session = &state.session;
    let Some(user) = &session.username else {
        return "Not logged in. Run `league_admin login <username>` and press r.".to_string();
    };
    let login = session
        .login_time_millis
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let expiry = match session.expires_in_secs {
        Some(secs) if secs > 0 => format!("access token expires in {}m {}s", secs / 60, secs % 60),
        Some(_) => "access token expired (refreshes on next write)".to_string(),
        None => "access token expiry unknown".to_string(),
    };
    let groups = if session.groups.is_empty() {
        "-".to_string()
    } else {
        session.groups.join(", ")
    };
    let access = if session.can_edit_results {
        ""
    } else {
        " (results editor needs edit_matches)"
    };
    format!("User: {user} | since {login}\nGroups: {groups}{access}\n{expiry}")
}

fn render_admin(frame: &mut Frame, area: Rect, app: &App) {
    let state = &app.state;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(3), Constraint::Length(4)])
        .split(area);

    frame.render_widget(
        Paragraph::new(session_text(state)).block(Block::default().borders(Borders::BOTTOM)),
        rows[0],
    );

    let mut lines = vec![Line::from(Span::styled(
        format!("Results Editor ({} pending)", state.pending.len()),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    let visible = rows[1].height.saturating_sub(1) as usize;
    let (start, end) = visible_range(state.pending_selected, state.pending.len(), visible);
    for idx in start..end {
        let m = &state.pending[idx];
        let style = if idx == state.pending_selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!(
                "  {:<16} {:>24} {:^13} {:<24} {}",
                kickoff_label(m),
                participant_label(&m.home, m.matchday),
                m.score_label(),
                participant_label(&m.away, m.matchday),
                m.stage().label()
            ),
            style,
        )));
    }
    frame.render_widget(Paragraph::new(lines), rows[1]);

    let draft = &state.draft;
    let field = |label: &str, value: &str, which: DraftField| {
        let style = if app.editing && draft.field == which {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default()
        };
        vec![
            Span::raw(format!("{label} ")),
            Span::styled(format!("[{value:>3}]"), style),
            Span::raw("  "),
        ]
    };
    let mut spans = Vec::new();
    spans.extend(field("Home", &draft.home, DraftField::Home));
    spans.extend(field("Away", &draft.away, DraftField::Away));
    if state.selected_pending().is_some_and(accepts_penalties) {
        spans.extend(field("Pens H", &draft.penalty_home, DraftField::PenaltyHome));
        spans.extend(field("Pens A", &draft.penalty_away, DraftField::PenaltyAway));
    }
    spans.extend(field("Extra time", &draft.extra_time, DraftField::ExtraTime));
    let mut editor = vec![Line::from(spans)];
    if let Some(msg) = &state.admin_message {
        let style = if msg.ok {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Red)
        };
        editor.push(Line::from(Span::styled(msg.text.clone(), style)));
    }
    frame.render_widget(
        Paragraph::new(editor).block(Block::default().borders(Borders::TOP)),
        rows[2],
    );
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Unity Cup Terminal - Help",
        "",
        "Global:",
        "  1-7          Home, Results, Standings, Bracket, News, History, Admin",
        "  Tab / ←/→    Next / previous page",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Results / Bracket:",
        "  s            Next season",
        "",
        "Standings:",
        "  c            Next category",
        "  s            Next season",
        "  g            Cycle group filter",
        "",
        "Admin:",
        "  e / Enter    Edit score of selected match",
        "  f            Mark finished",
        "  x            Log out",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
