use std::io;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant, SystemTime};

use anyhow::Result;
use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Table};

use arena_screens::competition::{CompetitionSource, HttpCompetition};
use arena_screens::config::{ModeRequest, ScreenConfig, SourceKind, resolve_display_mode};
use arena_screens::demo_source::DemoCompetition;
use arena_screens::feed::{load_reference, spawn_provider};
use arena_screens::rotation::PageKind;
use arena_screens::scheduler::{Cadence, DualLoop};
use arena_screens::state::{AppState, Delta, DisplayMode, ProviderCommand, apply_delta};
use arena_screens::view::{
    self, CornerLabel, RowEmphasis, leaderboard_rows, schedule_rows, score_grid, status_line,
    team_or_dash,
};

const CONSOLE_LINES: usize = 12;

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    loops: DualLoop,
    page_ticks: Cadence,
}

impl App {
    fn new(
        state: AppState,
        config: &ScreenConfig,
        cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    ) -> Self {
        let (refresh, render_open) = match state.mode {
            DisplayMode::Arena { .. } => (config.match_poll, false),
            // the rotating pages have something to show before any data
            DisplayMode::Outside => (config.page_poll, true),
        };
        let mut loops = DualLoop::new(refresh, config.render_interval);
        if render_open {
            loops.arm();
        }
        Self {
            state,
            should_quit: false,
            cmd_tx,
            loops,
            page_ticks: Cadence::new(config.page_tick),
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') => self.state.console_overlay = !self.state.console_overlay,
            _ => {}
        }
    }

    fn on_delta(&mut self, delta: Delta) {
        if matches!(delta, Delta::SetCurrentNext(_)) {
            self.loops.refresh_completed();
        }
        apply_delta(&mut self.state, delta);
    }

    fn request_refresh(&mut self) {
        let commands = match &self.state.mode {
            DisplayMode::Arena { arena, .. } => vec![ProviderCommand::RefreshCurrentNext {
                arena: arena.clone(),
            }],
            DisplayMode::Outside => {
                let mut commands = self
                    .state
                    .reference
                    .arenas
                    .iter()
                    .map(|arena| ProviderCommand::RefreshSchedule {
                        arena: arena.clone(),
                    })
                    .collect::<Vec<_>>();
                commands.push(ProviderCommand::RefreshLeague);
                commands.push(ProviderCommand::RefreshKnockouts);
                commands
            }
        };
        let Some(tx) = &self.cmd_tx else {
            return;
        };
        for cmd in commands {
            if tx.send(cmd).is_err() {
                self.state.push_log("[WARN] Provider unavailable");
                self.cmd_tx = None;
                return;
            }
        }
    }

    fn advance_pages(&mut self, now: Instant) {
        let ticks = self.page_ticks.drain(now);
        let Some(rotator) = self.state.rotator.as_mut() else {
            return;
        };
        for _ in 0..ticks {
            rotator.tick();
        }
    }

    fn time_until_due(&self, now: Instant) -> Duration {
        let mut wait = self.loops.time_until_due(now);
        if self.state.rotator.is_some() {
            wait = wait.min(self.page_ticks.time_until_due(now));
        }
        wait
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let config = ScreenConfig::from_env(&args)?;

    let source: Arc<dyn CompetitionSource> = match config.source {
        SourceKind::Http => Arc::new(HttpCompetition::new(config.base_url.clone())),
        SourceKind::Demo => Arc::new(DemoCompetition::new()),
    };
    let outside = matches!(config.mode, ModeRequest::Outside);
    let reference = load_reference(source.as_ref(), outside)?;
    let mode = resolve_display_mode(&config.mode, &reference)?;

    let mut state = AppState::new(mode, reference);
    state.stale_after = config.stale_after;
    state.push_log(match config.source {
        SourceKind::Http => format!("[INFO] Competition API: {}", config.base_url),
        SourceKind::Demo => "[INFO] Using demo competition".to_string(),
    });

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_provider(source, tx, cmd_rx);

    let mut app = App::new(state, &config, Some(cmd_tx));
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
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
    if !app.loops.is_armed() {
        terminal.draw(|f| render_waiting(f, &app.state))?;
    }

    loop {
        let now = Instant::now();
        while let Ok(delta) = rx.try_recv() {
            app.on_delta(delta);
        }

        let tick = app.loops.tick(now);
        if tick.refresh {
            app.request_refresh();
        }
        app.advance_pages(now);

        if tick.render {
            let now_utc = Utc::now();
            if matches!(app.state.mode, DisplayMode::Arena { .. }) {
                view::sync_countdown(&mut app.state, now_utc);
            }
            terminal.draw(|f| ui(f, &app.state, now_utc))?;
        }

        let timeout = app.time_until_due(Instant::now());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, state: &AppState, now: chrono::DateTime<Utc>) {
    let area = frame.size();
    match state.mode {
        DisplayMode::Arena { .. } => render_arena(frame, area, state, now),
        DisplayMode::Outside => render_outside(frame, area, state),
    }

    if state.console_overlay {
        render_console_overlay(frame, area, state);
    }
}

fn render_waiting(frame: &mut Frame, state: &AppState) {
    let area = centered_rect(50, 20, frame.size());
    let text = match &state.mode {
        DisplayMode::Arena { arena, .. } => format!("Arena {arena}\nWaiting for match data"),
        DisplayMode::Outside => "Waiting for competition data".to_string(),
    };
    let waiting = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(waiting, area);
}

fn render_arena(frame: &mut Frame, area: Rect, state: &AppState, now: chrono::DateTime<Utc>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(rows[0]);

    let labels = view::corner_labels(state, now);
    let (main, small): (Vec<_>, Vec<_>) = labels.into_iter().partition(|c| c.main);

    if let Some(corner) = main.first() {
        render_corner(frame, columns[0], corner);
    }

    if !small.is_empty() {
        let constraints = small
            .iter()
            .map(|_| Constraint::Ratio(1, small.len() as u32))
            .collect::<Vec<_>>();
        let cells = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(columns[1]);
        for (corner, cell) in small.iter().zip(cells.iter()) {
            render_corner(frame, *cell, corner);
        }
    }

    let footer = if state.is_stale(SystemTime::now()) {
        Paragraph::new(" STALE: no match data received recently")
            .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
    } else {
        Paragraph::new("").style(Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(footer, rows[1]);

    if state.countdown.visible() {
        let popup = centered_rect(40, 40, area);
        frame.render_widget(Clear, popup);
        let big = Paragraph::new(format!("\n\n{}", state.countdown.text()))
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(big, popup);
    }
}

fn render_corner(frame: &mut Frame, area: Rect, corner: &CornerLabel) {
    let colour = corner_color(&corner.colour);
    let block = Block::default()
        .borders(Borders::LEFT | Borders::RIGHT)
        .border_style(Style::default().fg(colour).bg(colour));

    let mut lines = Vec::new();
    if let Some(label) = &corner.match_label {
        lines.push(Line::from(Span::styled(
            label.clone(),
            Style::default().fg(Color::Gray),
        )));
    }
    let team_style = if corner.main {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    lines.push(Line::from(Span::styled(corner.team.clone(), team_style)));
    if let Some(time_left) = &corner.time_left {
        let style = if corner.waiting {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        };
        lines.push(Line::from(Span::styled(time_left.clone(), style)));
    }

    let inner_height = lines.len() as u16;
    let padding = area.height.saturating_sub(inner_height) / 2;
    let mut padded = vec![Line::from(""); padding as usize];
    padded.extend(lines);

    let paragraph = Paragraph::new(padded)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}

fn render_outside(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let Some(rotator) = state.rotator.as_ref() else {
        return;
    };

    match rotator.current_page().map(|p| p.kind) {
        Some(PageKind::Schedule) => render_schedule_page(frame, rows[0], state),
        Some(PageKind::Scores) => render_scores_page(frame, rows[0], state),
        Some(PageKind::Leaderboard) => render_leaderboard_page(frame, rows[0], state),
        Some(PageKind::Knockouts) => render_knockouts_page(frame, rows[0], state),
        None => {}
    }

    let status = status_line(rotator);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Blue).bg(Color::Black))
        .ratio(status.progress.clamp(0.0, 1.0))
        .label(format!(
            "{}   {} / {}",
            status.page, status.position, status.count
        ));
    frame.render_widget(gauge, rows[1]);
}

fn render_schedule_page(frame: &mut Frame, area: Rect, state: &AppState) {
    let arenas = &state.reference.arenas;
    if arenas.is_empty() {
        return;
    }
    let constraints = arenas
        .iter()
        .map(|_| Constraint::Ratio(1, arenas.len() as u32))
        .collect::<Vec<_>>();
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    let corner_count = state.corner_count();
    for (arena, cell) in arenas.iter().zip(cells.iter()) {
        let rows = state
            .schedule
            .get(arena)
            .map(|rows| schedule_rows(rows))
            .unwrap_or_default();
        let table_rows = rows
            .iter()
            .map(|row| {
                let style = match row.emphasis {
                    RowEmphasis::Previous => Style::default().add_modifier(Modifier::ITALIC),
                    RowEmphasis::Current => Style::default().add_modifier(Modifier::BOLD),
                    RowEmphasis::Upcoming => Style::default(),
                };
                let mut cells = vec![
                    Cell::from(row.number.clone().unwrap_or_default()),
                    Cell::from(row.time.clone().unwrap_or_default()),
                ];
                for (slot, team) in row.teams.iter().enumerate() {
                    let colour =
                        corner_color(state.reference.corner_colour(slot).unwrap_or_default());
                    cells.push(Cell::from(Span::styled(
                        team.clone(),
                        Style::default().fg(colour),
                    )));
                }
                Row::new(cells).style(style)
            })
            .collect::<Vec<_>>();

        let mut widths = vec![Constraint::Length(5), Constraint::Length(7)];
        widths.extend((0..corner_count).map(|_| Constraint::Length(6)));

        let mut header = vec![Cell::from("№"), Cell::from("Time"), Cell::from("Teams")];
        header.extend((1..corner_count).map(|_| Cell::from("")));

        let mut block = Block::default().borders(Borders::ALL);
        if arenas.len() > 1 {
            block = block.title(format!("Arena {arena}"));
        }
        let table = Table::new(table_rows, widths)
            .header(Row::new(header).style(Style::default().add_modifier(Modifier::BOLD)))
            .block(block);
        frame.render_widget(table, *cell);
    }
}

fn render_scores_page(frame: &mut Frame, area: Rect, state: &AppState) {
    let grid = score_grid(&state.league);
    let rows = grid
        .iter()
        .map(|row| {
            let cells = row.iter().flat_map(|(tla, points)| {
                [
                    Cell::from(tla.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
                    Cell::from(points.clone()),
                ]
            });
            Row::new(cells.collect::<Vec<_>>())
        })
        .collect::<Vec<_>>();
    let widths = (0..view::SCORES_PER_ROW)
        .flat_map(|_| [Constraint::Length(6), Constraint::Length(8)])
        .collect::<Vec<_>>();
    let table = Table::new(rows, widths)
        .block(Block::default().title("League points").borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn render_leaderboard_page(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = leaderboard_rows(&state.league, &state.reference.teams)
        .into_iter()
        .map(|row| Row::new(vec![row.tla, row.name, row.points]))
        .collect::<Vec<_>>();
    let caption = match state.league.last_scored {
        Some(num) => format!("Leaderboard (up to date as of match {num})"),
        None => "Leaderboard".to_string(),
    };
    let widths = [
        Constraint::Length(6),
        Constraint::Min(20),
        Constraint::Length(8),
    ];
    let table = Table::new(rows, widths)
        .block(Block::default().title(caption).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn render_knockouts_page(frame: &mut Frame, area: Rect, state: &AppState) {
    let rounds = &state.knockouts;
    if rounds.is_empty() {
        let empty = Paragraph::new("No knockout matches yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title("Knockouts").borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    }

    let constraints = rounds
        .iter()
        .map(|_| Constraint::Ratio(1, rounds.len() as u32))
        .collect::<Vec<_>>();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (round, column) in rounds.iter().zip(columns.iter()) {
        let mut lines = Vec::new();
        for group in &round.groups {
            lines.push(Line::from(Span::styled(
                group.description.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for game in &group.games {
                let mut spans = Vec::new();
                if let Some(arena) = group.arena_label(game) {
                    spans.push(Span::raw(format!("{arena}: ")));
                }
                for (slot, team) in game.teams.iter().enumerate() {
                    let colour =
                        corner_color(state.reference.corner_colour(slot).unwrap_or_default());
                    spans.push(Span::styled(
                        format!(" {} ", team_or_dash(team.as_deref())),
                        Style::default().fg(colour),
                    ));
                }
                lines.push(Line::from(spans));
            }
            lines.push(Line::from(""));
        }
        let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, *column);
    }
}

fn render_console_overlay(frame: &mut Frame, area: Rect, state: &AppState) {
    let popup = centered_rect(80, 60, area);
    frame.render_widget(Clear, popup);
    let console = Paragraph::new(console_text(state)).block(
        Block::default()
            .title("Console (c to close)")
            .borders(Borders::ALL),
    );
    frame.render_widget(console, popup);
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    let skip = state.logs.len().saturating_sub(CONSOLE_LINES);
    state
        .logs
        .iter()
        .skip(skip)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn corner_color(colour: &str) -> Color {
    colour.trim().parse::<Color>().unwrap_or(Color::White)
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
