use std::io;
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Circle, Line as CanvasLine, Points, Rectangle};
use ratatui::widgets::{
    Bar, BarChart, BarGroup, Block, Borders, Clear, Gauge, Paragraph, Sparkline, Wrap,
};

use matchvision_terminal::api::{BackendApi, HttpBackend};
use matchvision_terminal::config::AppConfig;
use matchvision_terminal::forms::TextForm;
use matchvision_terminal::job::JobStatus;
use matchvision_terminal::match_stats::{
    DEFAULT_FPS, MatchStats, NOT_AVAILABLE, TEAM_A, TEAM_B, TimelineKind, fmt_or_na, frame_clock,
    goals_label, short_team,
};
use matchvision_terminal::pitch::{PITCH_LENGTH, PITCH_WIDTH, Side, jitter_dots};
use matchvision_terminal::provider::spawn_provider;
use matchvision_terminal::report_export::default_report_path;
use matchvision_terminal::routes::{NAV_SCREENS, Screen};
use matchvision_terminal::session::{Session, SessionStore};
use matchvision_terminal::state::{AppState, Delta, ProviderCommand, apply_delta};

struct App {
    state: AppState,
    config: AppConfig,
    store: SessionStore,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
}

impl App {
    fn new(
        config: AppConfig,
        store: SessionStore,
        session: Session,
        cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    ) -> Self {
        Self {
            state: AppState::from_session(session),
            config,
            store,
            should_quit: false,
            cmd_tx,
        }
    }

    fn start(&mut self) {
        self.state.push_log(format!("[INFO] Backend {}", self.config.api_base));
        if let Some(path) = self.store.path() {
            self.state
                .push_log(format!("[INFO] Session file {}", path.display()));
        }
        let Some(token) = self.state.session.token().map(str::to_string) else {
            return;
        };
        let resume_job = self.state.session.video_id();
        self.send(
            ProviderCommand::ValidateSession { token, resume_job },
            "Session check",
        );
    }

    fn send(&mut self, cmd: ProviderCommand, what: &str) -> bool {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log(format!("[INFO] {what} unavailable"));
            return false;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log(format!("[WARN] {what} request failed"));
            return false;
        }
        true
    }

    fn on_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
            self.should_quit = true;
            return;
        }
        if self.state.help_overlay {
            if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc) {
                self.state.help_overlay = false;
            }
            return;
        }
        if self.state.upload_input.is_some() {
            self.on_upload_key(key);
            return;
        }
        match self.state.screen {
            Screen::SignIn | Screen::SignUp => self.on_auth_key(key),
            Screen::Settings => self.on_settings_key(key, ctrl),
            _ => self.on_analytics_key(key),
        }
    }

    fn on_analytics_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = true,
            KeyCode::Char(ch @ '1'..='6') => {
                if let Some(screen) = Screen::from_shortcut(ch) {
                    self.state.navigate(screen);
                }
            }
            KeyCode::Char('u') => self.state.upload_input = Some(String::new()),
            KeyCode::Char('x') => self.reset_job(),
            KeyCode::Char('r') => self.generate_report(),
            KeyCode::Char('L') => self.logout(),
            KeyCode::Char('t') if self.state.screen == Screen::PlayerTracking => {
                self.state.toggle_player_team()
            }
            KeyCode::Char('f') if self.state.screen == Screen::EventDetection => {
                self.state.cycle_timeline_filter()
            }
            KeyCode::Char('j') | KeyCode::Down => self.scroll(1),
            KeyCode::Char('k') | KeyCode::Up => self.scroll(-1),
            _ => {}
        }
    }

    fn scroll(&mut self, step: isize) {
        match self.state.screen {
            Screen::PlayerTracking => self.state.move_player_selection(step),
            Screen::EventDetection => {
                let max = self.state.timeline_events().len().saturating_sub(1) as u16;
                let next = self.state.timeline_scroll as isize + step;
                self.state.timeline_scroll = next.clamp(0, max as isize) as u16;
            }
            _ => {}
        }
    }

    fn on_upload_key(&mut self, key: KeyEvent) {
        let Some(input) = self.state.upload_input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.state.upload_input = None,
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(ch) => input.push(ch),
            KeyCode::Enter => {
                let raw = input.trim().to_string();
                self.state.upload_input = None;
                self.submit_upload(PathBuf::from(raw));
            }
            _ => {}
        }
    }

    fn on_auth_key(&mut self, key: KeyEvent) {
        let on_sign_in = self.state.screen == Screen::SignIn;
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::F(2) => {
                let target = if on_sign_in { Screen::SignUp } else { Screen::SignIn };
                self.state.navigate(target);
            }
            KeyCode::Enter => {
                if on_sign_in {
                    self.submit_sign_in();
                } else {
                    self.submit_sign_up();
                }
            }
            _ => {
                let form = if on_sign_in {
                    &mut self.state.sign_in
                } else {
                    &mut self.state.sign_up
                };
                edit_form(form, key);
            }
        }
    }

    fn on_settings_key(&mut self, key: KeyEvent, ctrl: bool) {
        match key.code {
            KeyCode::Esc => self.state.navigate(Screen::Dashboard),
            KeyCode::Char('l') if ctrl => self.logout(),
            KeyCode::Enter => self.submit_profile(),
            _ => edit_form(&mut self.state.profile_form, key),
        }
    }

    fn submit_sign_in(&mut self) {
        if self.state.sign_in.submitting {
            return;
        }
        let form = self.state.sign_in.to_sign_in();
        let errors = form.validate();
        if !errors.is_empty() {
            self.state.sign_in.errors = errors;
            return;
        }
        self.state.banner = None;
        let cmd = ProviderCommand::SignIn {
            request: form.to_request(),
            resume_job: self.state.session.video_id(),
        };
        self.state.sign_in.submitting = self.send(cmd, "Sign in");
    }

    fn submit_sign_up(&mut self) {
        if self.state.sign_up.submitting {
            return;
        }
        let form = self.state.sign_up.to_sign_up();
        let errors = form.validate();
        if !errors.is_empty() {
            self.state.sign_up.errors = errors;
            return;
        }
        self.state.banner = None;
        let cmd = ProviderCommand::SignUp {
            request: form.to_request(),
        };
        self.state.sign_up.submitting = self.send(cmd, "Sign up");
    }

    fn submit_profile(&mut self) {
        let Some(token) = self.state.session.token().map(str::to_string) else {
            return;
        };
        let Some(update) = self.state.profile_changes() else {
            return;
        };
        if update.is_empty() {
            self.state.banner = Some("No changes to save".to_string());
            return;
        }
        self.state.profile_form.submitting =
            self.send(ProviderCommand::UpdateProfile { token, update }, "Profile update");
    }

    fn submit_upload(&mut self, path: PathBuf) {
        if path.as_os_str().is_empty() {
            return;
        }
        if !path.is_file() {
            self.state.banner = Some(format!("File not found: {}", path.display()));
            return;
        }
        let ticket = self.state.begin_upload(&path);
        let token = self.state.session.token().map(str::to_string);
        if !self.send(ProviderCommand::Upload { ticket, path, token }, "Upload") {
            apply_delta(
                &mut self.state,
                Delta::UploadFailed {
                    ticket,
                    error: "background worker unavailable".to_string(),
                },
            );
        }
    }

    fn reset_job(&mut self) {
        self.state.reset_job();
        self.send(ProviderCommand::StopPolling, "Stop polling");
    }

    fn logout(&mut self) {
        self.send(ProviderCommand::StopPolling, "Stop polling");
        self.state.logout();
    }

    fn generate_report(&mut self) {
        let Some(stats) = self.state.match_stats.clone() else {
            self.state.push_log("[INFO] No match statistics to export");
            return;
        };
        if self.state.export.active && !self.state.export.done {
            self.state.push_log("[INFO] Export already running");
            return;
        }
        let job_id = self.state.job.id;
        let path = default_report_path(&self.config.report_dir, job_id);
        self.send(
            ProviderCommand::ExportReport {
                path,
                stats: Box::new(stats),
                job_id,
            },
            "Report export",
        );
    }

    fn on_tick(&mut self, now: Instant) {
        if self.state.screen == Screen::TacticalAnalysis && !self.state.pitch_dots.is_empty() {
            jitter_dots(&mut self.state.pitch_dots, &mut rand::thread_rng());
        }
        self.state.maybe_clear_export(now);
    }

    fn persist_session(&mut self) {
        if !self.state.take_session_dirty() {
            return;
        }
        let result = if self.state.session == Session::default() {
            self.store.clear()
        } else {
            self.store.save(&self.state.session)
        };
        if let Err(err) = result {
            self.state
                .push_log(format!("[WARN] Session not saved: {err:#}"));
        }
    }
}

fn edit_form(form: &mut TextForm, key: KeyEvent) {
    match key.code {
        KeyCode::Tab | KeyCode::Down => form.focus_next(),
        KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(ch) => form.push_char(ch),
        _ => {}
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = AppConfig::from_env();
    let store = SessionStore::new(config.session_path.clone());
    let session = store.load();
    let api: Arc<dyn BackendApi> = Arc::new(HttpBackend::new(&config));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let _provider = spawn_provider(api, config.clone(), tx, cmd_rx);

    let mut app = App::new(config, store, session, Some(cmd_tx));
    app.start();
    let res = run_app(&mut terminal, &mut app, rx);

    // Closing the command channel stops the provider and its poll loop.
    app.cmd_tx = None;
    app.persist_session();

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
        app.persist_session();

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick(Instant::now());
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let state = &app.state;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(state)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    if state.screen.requires_auth() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(24), Constraint::Min(1)])
            .split(chunks[1]);
        render_sidebar(frame, cols[0], state);
        render_screen(frame, cols[1], app);
    } else {
        render_screen(frame, chunks[1], app);
    }

    let footer = Paragraph::new(footer_text(state)).block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);

    if let Some(input) = &state.upload_input {
        render_upload_prompt(frame, frame.size(), input);
    }
    if state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn render_screen(frame: &mut Frame, area: Rect, app: &App) {
    let state = &app.state;
    match state.screen {
        Screen::SignIn => render_form(frame, area, state, &state.sign_in, "Sign In"),
        Screen::SignUp => render_form(frame, area, state, &state.sign_up, "Create Account"),
        Screen::Dashboard => render_dashboard(frame, area, state),
        Screen::PlayerTracking => render_player_tracking(frame, area, state),
        Screen::EventDetection => render_event_detection(frame, area, state),
        Screen::TacticalAnalysis => render_tactical(frame, area, state),
        Screen::MatchReports => render_reports(frame, area, state),
        Screen::Settings => render_settings(frame, area, state, &app.config.api_base),
    }
}

fn header_text(state: &AppState) -> String {
    let user = state
        .session
        .user()
        .map(|u| u.display_name())
        .unwrap_or_else(|| "guest".to_string());
    let mut line1 = format!("  MATCHVISION | {} | {}", state.screen.title(), user);
    if state.validating_session {
        line1.push_str(" | validating session...");
    }
    let line2 = match &state.banner {
        Some(banner) => format!("  ! {banner}"),
        None => format!("  {}", state.job.status_line()),
    };
    format!("{line1}\n{line2}")
}

fn footer_text(state: &AppState) -> String {
    if state.upload_input.is_some() {
        return "Enter Upload | Esc Cancel".to_string();
    }
    match state.screen {
        Screen::SignIn => "Tab Next field | Enter Sign in | F2 Create account | Esc Quit".to_string(),
        Screen::SignUp => {
            "Tab Next field | Space Toggle | Enter Sign up | F2 Sign in | Esc Quit".to_string()
        }
        Screen::Settings => {
            "Tab Next field | Space Cycle level | Enter Save | Esc Back | Ctrl-L Sign out"
                .to_string()
        }
        Screen::PlayerTracking => {
            "1-6 Screens | j/k Player | t Team | u Upload | x Reset | ? Help | q Quit".to_string()
        }
        Screen::EventDetection => {
            "1-6 Screens | j/k Scroll | f Filter | u Upload | x Reset | ? Help | q Quit".to_string()
        }
        _ => "1-6 Screens | u Upload | x Reset | r Report | L Sign out | ? Help | q Quit"
            .to_string(),
    }
}

fn render_sidebar(frame: &mut Frame, area: Rect, state: &AppState) {
    let mut lines = Vec::new();
    if let Some(user) = state.session.user() {
        lines.push(Line::from(Span::styled(
            format!(" ({}) {}", user.initials(), user.display_name()),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));
    }
    for (idx, screen) in NAV_SCREENS.iter().enumerate() {
        let style = if *screen == state.screen {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!(" {} {}", idx + 1, screen.title()),
            style,
        )));
    }
    let sidebar = Paragraph::new(lines).block(Block::default().borders(Borders::RIGHT));
    frame.render_widget(sidebar, area);
}

fn render_form(frame: &mut Frame, area: Rect, state: &AppState, form: &TextForm, title: &str) {
    let popup = centered_rect(60, 80, area);
    let mut lines = Vec::new();
    if let Some(banner) = &state.banner {
        lines.push(Line::from(Span::styled(
            banner.clone(),
            Style::default().fg(Color::Red),
        )));
        lines.push(Line::from(""));
    }
    lines.extend(form_lines(form));
    if form.submitting {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Submitting...",
            Style::default().fg(Color::DarkGray),
        )));
    }
    let widget = Paragraph::new(lines)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, popup);
}

fn form_lines(form: &TextForm) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (idx, field) in form.fields.iter().enumerate() {
        let focused = idx == form.focus;
        let marker = if focused { ">" } else { " " };
        let style = if focused {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker} {:<18}", field.label), style),
            Span::raw(field.display_value()),
        ]));
        if let Some(err) = form.errors.get(field.key) {
            lines.push(Line::from(Span::styled(
                format!("    {err}"),
                Style::default().fg(Color::Red),
            )));
        }
    }
    lines
}

fn render_dashboard(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Min(6),
            Constraint::Length(8),
        ])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    let job = Paragraph::new(job_text(state))
        .block(Block::default().title("Job").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    frame.render_widget(job, top[0]);

    let stats = state.match_stats.as_ref();
    let score = Paragraph::new(vec![
        Line::from(goals_label(stats, TEAM_A)),
        Line::from(goals_label(stats, TEAM_B)),
        Line::from(format!(
            "Top speed: {}",
            stats
                .and_then(|s| s.top_speed())
                .map(|r| format!("{:.1} km/h (#{} {})", r.speed_kmph, r.player_id, short_team(&r.team)))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        )),
        Line::from(stats_placeholder(state).unwrap_or_default()),
    ])
    .block(Block::default().title("Score").borders(Borders::ALL));
    frame.render_widget(score, top[1]);

    match stats {
        Some(stats) => render_team_comparison(frame, rows[1], stats),
        None => {
            let empty = Paragraph::new(stats_placeholder(state).unwrap_or_default())
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().title("Match").borders(Borders::ALL));
            frame.render_widget(empty, rows[1]);
        }
    }

    let console = Paragraph::new(console_text(state, rows[2].height.saturating_sub(2) as usize))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, rows[2]);
}

fn job_text(state: &AppState) -> String {
    let job = &state.job;
    let mut lines = vec![
        format!(
            "Id: {}",
            job.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())
        ),
        format!("Status: {}", job.status),
        format!("Polls: {}", job.polls),
    ];
    if let Some(results) = &job.results {
        lines.push(format!(
            "Video: {}",
            results.output_video_url.as_deref().unwrap_or(NOT_AVAILABLE)
        ));
        lines.push(format!("Event frames: {}", results.event_frame_urls.len()));
    }
    if let Some(err) = &job.error {
        lines.push(format!("Error: {err}"));
    }
    lines.join("\n")
}

/// Why there are no statistics to show, if there are none.
fn stats_placeholder(state: &AppState) -> Option<String> {
    if state.match_stats.is_some() {
        return None;
    }
    let text = match state.job.status {
        JobStatus::Idle => "Upload a match video with u".to_string(),
        JobStatus::Uploading => "Uploading...".to_string(),
        JobStatus::Pending | JobStatus::Processing => "Processing match video...".to_string(),
        JobStatus::Failed => "Processing failed".to_string(),
        JobStatus::Completed if state.stats_loading => "Loading summary...".to_string(),
        JobStatus::Completed => format!("Match summary: {NOT_AVAILABLE}"),
    };
    Some(text)
}

fn render_team_comparison(frame: &mut Frame, area: Rect, stats: &MatchStats) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let possession = stats.possession_split();
    let share = stats.pass_share();
    let text = vec![
        format!("{:<18}{:>10}{:>10}", "", "Team A", "Team B"),
        format!(
            "{:<18}{:>10}{:>10}",
            "Possession %",
            fmt_or_na(possession.map(|p| p.0), ""),
            fmt_or_na(possession.map(|p| p.1), "")
        ),
        format!(
            "{:<18}{:>10}{:>10}",
            "Passes",
            stats.passes_for(TEAM_A),
            stats.passes_for(TEAM_B)
        ),
        format!(
            "{:<18}{:>10}{:>10}",
            "Pass share %",
            fmt_or_na(share.map(|p| p.0), ""),
            fmt_or_na(share.map(|p| p.1), "")
        ),
        format!(
            "{:<18}{:>10}{:>10}",
            "Pass accuracy %",
            fmt_or_na(stats.pass_accuracy(TEAM_A), ""),
            fmt_or_na(stats.pass_accuracy(TEAM_B), "")
        ),
        format!(
            "{:<18}{:>10}{:>10}",
            "Shots (on tgt)",
            format!("{} ({})", stats.shots_for(TEAM_A), stats.shots_on_target_for(TEAM_A)),
            format!("{} ({})", stats.shots_for(TEAM_B), stats.shots_on_target_for(TEAM_B))
        ),
        format!(
            "{:<18}{:>10.2}{:>10.2}",
            "Distance km",
            stats.team_distance_km(TEAM_A),
            stats.team_distance_km(TEAM_B)
        ),
    ]
    .join("\n");
    let table = Paragraph::new(text).block(Block::default().title("Teams").borders(Borders::ALL));
    frame.render_widget(table, cols[0]);

    let (a, b) = possession.unwrap_or((0.0, 0.0));
    let bars = [
        Bar::default()
            .value(a.round() as u64)
            .label(Line::from("A"))
            .style(Style::default().fg(Color::Cyan)),
        Bar::default()
            .value(b.round() as u64)
            .label(Line::from("B"))
            .style(Style::default().fg(Color::Magenta)),
    ];
    let chart = BarChart::default()
        .block(Block::default().title("Possession %").borders(Borders::ALL))
        .data(BarGroup::default().bars(&bars))
        .bar_width(5)
        .bar_gap(2)
        .max(100);
    frame.render_widget(chart, cols[1]);
}

fn console_text(state: &AppState, rows: usize) -> String {
    let skip = state.logs.len().saturating_sub(rows);
    state
        .logs
        .iter()
        .skip(skip)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_player_tracking(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(stats) = state.match_stats.as_ref() else {
        render_placeholder(frame, area, state, "Player Tracking");
        return;
    };
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(1)])
        .split(area);

    let players = stats.players_for_team(state.player_team);
    let lines: Vec<Line> = if players.is_empty() {
        vec![Line::from(Span::styled(
            "No tracked players",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        players
            .iter()
            .enumerate()
            .map(|(idx, (id, p))| {
                let style = if idx == state.player_selected {
                    Style::default().fg(Color::White).bg(Color::DarkGray)
                } else {
                    Style::default()
                };
                Line::from(Span::styled(
                    format!("#{id:<5} {:>7.0} m {:>6.1} km/h", p.total_distance_m, p.max_speed_kmph),
                    style,
                ))
            })
            .collect()
    };
    let visible = cols[0].height.saturating_sub(2) as usize;
    let (start, _) = visible_range(state.player_selected, lines.len(), visible);
    let list = Paragraph::new(lines)
        .scroll((start as u16, 0))
        .block(
            Block::default()
                .title(format!("{} players", state.player_team))
                .borders(Borders::ALL),
        );
    frame.render_widget(list, cols[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(11), Constraint::Min(3)])
        .split(cols[1]);

    let Some(player_id) = state.selected_player_id() else {
        frame.render_widget(Block::default().title("Player").borders(Borders::ALL), cols[1]);
        return;
    };
    let detail = match stats.player_summary(player_id) {
        Some(summary) => vec![
            format!("Player #{} ({})", summary.player_id, summary.team),
            format!("Distance:   {:.2} km", summary.distance_km),
            format!("Max speed:  {:.1} km/h", summary.max_speed_kmph),
            format!("Avg speed:  {:.1} km/h", summary.avg_speed_kmph),
            format!("Passes:     {} made / {} received", summary.passes_made, summary.passes_received),
            format!("Shots:      {}", summary.shots),
            format!("Goals:      {}", summary.goals),
        ]
        .join("\n"),
        None => NOT_AVAILABLE.to_string(),
    };
    let detail = Paragraph::new(detail).block(Block::default().title("Player").borders(Borders::ALL));
    frame.render_widget(detail, right[0]);

    let speeds: Vec<u64> = stats
        .player(player_id)
        .map(|p| {
            p.speed_history
                .iter()
                .map(|v| v.max(0.0).round() as u64)
                .collect()
        })
        .unwrap_or_default();
    let spark = Sparkline::default()
        .block(Block::default().title("Speed (km/h)").borders(Borders::ALL))
        .data(&speeds)
        .style(Style::default().fg(Color::Green));
    frame.render_widget(spark, right[1]);
}

fn render_event_detection(frame: &mut Frame, area: Rect, state: &AppState) {
    if state.match_stats.is_none() {
        render_placeholder(frame, area, state, "Event Detection");
        return;
    }
    let events = state.timeline_events();
    let filter = state
        .timeline_filter
        .map(|kind| kind.label())
        .unwrap_or("ALL");
    let lines: Vec<Line> = if events.is_empty() {
        vec![Line::from(Span::styled(
            "No events",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        events
            .iter()
            .map(|event| {
                let color = match event.kind {
                    TimelineKind::Goal => Color::Green,
                    TimelineKind::Shot => Color::Yellow,
                    TimelineKind::Pass => Color::Reset,
                };
                Line::from(vec![
                    Span::raw(format!("{} ", frame_clock(event.frame, DEFAULT_FPS))),
                    Span::styled(format!("{:<5}", event.kind.label()), Style::default().fg(color)),
                    Span::raw(format!(" {:<7} {}", event.team, event.detail)),
                ])
            })
            .collect()
    };
    let timeline = Paragraph::new(lines)
        .scroll((state.timeline_scroll, 0))
        .block(
            Block::default()
                .title(format!("Timeline [{filter}] ({} events)", events.len()))
                .borders(Borders::ALL),
        );
    frame.render_widget(timeline, area);
}

fn render_tactical(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(stats) = state.match_stats.as_ref() else {
        render_placeholder(frame, area, state, "Tactical Analysis");
        return;
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    let home: Vec<(f64, f64)> = state
        .pitch_dots
        .iter()
        .filter(|d| d.side == Side::Home)
        .map(|d| (d.x, d.y))
        .collect();
    let away: Vec<(f64, f64)> = state
        .pitch_dots
        .iter()
        .filter(|d| d.side == Side::Away)
        .map(|d| (d.x, d.y))
        .collect();
    let pitch = Canvas::default()
        .block(Block::default().title("Pitch").borders(Borders::ALL))
        .marker(Marker::Braille)
        .x_bounds([0.0, PITCH_LENGTH])
        .y_bounds([0.0, PITCH_WIDTH])
        .paint(|ctx| {
            ctx.draw(&Rectangle {
                x: 0.0,
                y: 0.0,
                width: PITCH_LENGTH,
                height: PITCH_WIDTH,
                color: Color::DarkGray,
            });
            ctx.draw(&CanvasLine {
                x1: PITCH_LENGTH / 2.0,
                y1: 0.0,
                x2: PITCH_LENGTH / 2.0,
                y2: PITCH_WIDTH,
                color: Color::DarkGray,
            });
            ctx.draw(&Circle {
                x: PITCH_LENGTH / 2.0,
                y: PITCH_WIDTH / 2.0,
                radius: 9.15,
                color: Color::DarkGray,
            });
            ctx.layer();
            ctx.draw(&Points {
                coords: &home,
                color: Color::Cyan,
            });
            ctx.draw(&Points {
                coords: &away,
                color: Color::Magenta,
            });
        });
    frame.render_widget(pitch, rows[0]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);

    let windows = stats.possession_windows(10);
    let bars: Vec<Bar> = windows
        .iter()
        .enumerate()
        .map(|(idx, share)| {
            Bar::default()
                .value(share.map(|v| v.round() as u64).unwrap_or(0))
                .label(Line::from(format!("{}", idx + 1)))
                .text_value(share.map(|v| format!("{v:.0}")).unwrap_or_else(|| "-".to_string()))
        })
        .collect();
    let chart = BarChart::default()
        .block(
            Block::default()
                .title("Team A possession by phase")
                .borders(Borders::ALL),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(3)
        .bar_gap(1)
        .max(100);
    frame.render_widget(chart, bottom[0]);

    let mut links = Vec::new();
    for team in [TEAM_A, TEAM_B] {
        for link in stats.pass_links(team, 4) {
            links.push(format!(
                "{} #{} -> #{}  x{}",
                short_team(team),
                link.from,
                link.to,
                link.count
            ));
        }
    }
    if links.is_empty() {
        links.push(NOT_AVAILABLE.to_string());
    }
    let links = Paragraph::new(links.join("\n"))
        .block(Block::default().title("Pass links").borders(Borders::ALL));
    frame.render_widget(links, bottom[1]);
}

fn render_reports(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(3), Constraint::Length(4)])
        .split(area);

    let summary = match state.match_stats.as_ref() {
        Some(stats) => {
            let rankings = &stats.rankings;
            let mut lines = vec![
                goals_label(Some(stats), TEAM_A),
                goals_label(Some(stats), TEAM_B),
                String::new(),
                "Distance leaders:".to_string(),
            ];
            lines.extend(rankings.distance.iter().take(5).enumerate().map(|(idx, r)| {
                format!("  {}. #{} {} {:.0} m", idx + 1, r.player_id, short_team(&r.team), r.distance_m)
            }));
            if rankings.distance.is_empty() {
                lines.push(format!("  {NOT_AVAILABLE}"));
            }
            lines.push("Top shooters:".to_string());
            lines.extend(rankings.top_shooters.iter().take(5).enumerate().map(|(idx, r)| {
                format!(
                    "  {}. #{} {} {} shots ({} on target)",
                    idx + 1,
                    r.player_id,
                    short_team(&r.team),
                    r.shots,
                    r.on_target
                )
            }));
            if rankings.top_shooters.is_empty() {
                lines.push(format!("  {NOT_AVAILABLE}"));
            }
            lines.join("\n")
        }
        None => stats_placeholder(state).unwrap_or_default(),
    };
    let summary = Paragraph::new(summary)
        .block(Block::default().title("Match report").borders(Borders::ALL));
    frame.render_widget(summary, rows[0]);

    let export = &state.export;
    let ratio = if export.total > 0 {
        (export.current as f64 / export.total as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let label = if export.active {
        export.message.clone()
    } else {
        "Press r to generate an .xlsx report".to_string()
    };
    let color = if export.failed { Color::Red } else { Color::Green };
    let gauge = Gauge::default()
        .block(Block::default().title("Export").borders(Borders::ALL))
        .gauge_style(Style::default().fg(color))
        .ratio(ratio)
        .label(label);
    frame.render_widget(gauge, rows[1]);

    let path = export
        .path
        .clone()
        .unwrap_or_else(|| report_hint(state));
    let info = Paragraph::new(path).block(Block::default().title("File").borders(Borders::ALL));
    frame.render_widget(info, rows[2]);
}

fn report_hint(state: &AppState) -> String {
    match state.job.id {
        Some(id) => format!("match_report_{id}_<timestamp>.xlsx"),
        None => "-".to_string(),
    }
}

fn render_settings(frame: &mut Frame, area: Rect, state: &AppState, api_base: &str) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let mut lines = Vec::new();
    if let Some(banner) = &state.banner {
        lines.push(Line::from(Span::styled(
            banner.clone(),
            Style::default().fg(Color::Yellow),
        )));
        lines.push(Line::from(""));
    }
    lines.extend(form_lines(&state.profile_form));
    let form = Paragraph::new(lines).block(Block::default().title("Profile").borders(Borders::ALL));
    frame.render_widget(form, cols[0]);

    let user = state.session.user();
    let profile = state.session.profile();
    let account = [
        format!("Email: {}", user.map(|u| u.email.as_str()).unwrap_or("-")),
        format!(
            "Last login: {}",
            user.and_then(|u| u.last_login.as_deref()).unwrap_or("-")
        ),
        format!(
            "Member since: {}",
            profile.and_then(|p| p.created_at.as_deref()).unwrap_or("-")
        ),
        String::new(),
        format!("Backend: {api_base}"),
    ]
    .join("\n");
    let account = Paragraph::new(account)
        .block(Block::default().title("Account").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    frame.render_widget(account, cols[1]);
}

fn render_placeholder(frame: &mut Frame, area: Rect, state: &AppState, title: &str) {
    let text = stats_placeholder(state).unwrap_or_default();
    let widget = Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().title(title.to_string()).borders(Borders::ALL));
    frame.render_widget(widget, area);
}

fn render_upload_prompt(frame: &mut Frame, area: Rect, input: &str) {
    let popup = centered_rect(60, 20, area);
    frame.render_widget(Clear, popup);
    let prompt = Paragraph::new(format!("{input}_"))
        .block(Block::default().title("Video file path").borders(Borders::ALL));
    frame.render_widget(prompt, popup);
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total <= visible || visible == 0 {
        return (0, total);
    }
    let half = visible / 2;
    let start = selected.saturating_sub(half).min(total - visible);
    (start, start + visible)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "MatchVision - Help",
        "",
        "Global:",
        "  1-6          Dashboard / Players / Events / Tactics / Reports / Settings",
        "  u            Upload a match video",
        "  x            Reset the current job",
        "  r            Generate match report (.xlsx)",
        "  L            Sign out",
        "  ?            Toggle help",
        "  q / Ctrl-C   Quit",
        "",
        "Players:",
        "  j/k or ↑/↓   Select player",
        "  t            Switch team",
        "",
        "Events:",
        "  j/k or ↑/↓   Scroll",
        "  f            Filter goals / shots / passes",
        "",
        "Forms:",
        "  Tab / ↓      Next field",
        "  Space        Toggle / cycle choice",
        "  Enter        Submit",
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
