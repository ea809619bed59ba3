mod charts;
mod export;
mod help;
pub(crate) mod state;

use crate::budget;
use crate::cli::Cli;
use crate::engine::AnalysisEngine;
use crate::model::{AnalysisEvent, AnalysisRecord, BudgetTier};
use crate::orchestrator::{self, UiCommand};
use crate::panels::{self, Panel, Tone};
use crate::storage::RecordStore;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{InputMode, UiState, View, TAB_ANALYSIS, TAB_HELP, TAB_HISTORY};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<AnalysisEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let cfg = crate::cli::build_config(&args, BudgetTier::Indie);
    let engine = Arc::new(AnalysisEngine::from_config(cfg)?);
    let store = engine.store();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(store, event_rx, cmd_tx));

    let res = orchestrator::run_controller(engine, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    store: Arc<dyn RecordStore>,
    mut event_rx: UnboundedReceiver<AnalysisEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::default();
    match store.list(state.history_load) {
        Ok(h) => state.set_history(h),
        Err(e) => state.info = format!("Could not load history: {e}"),
    }

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            match ev {
                AnalysisEvent::RunCompleted { record } => {
                    handle_run_completed(store.as_ref(), &mut state, *record);
                }
                other => state.apply_event(other),
            }
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(k, &mut state, store.as_ref(), &cmd_tx) == KeyOutcome::Quit {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Quit,
}

fn handle_key(
    k: KeyEvent,
    state: &mut UiState,
    store: &dyn RecordStore,
    cmd_tx: &UnboundedSender<UiCommand>,
) -> KeyOutcome {
    if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
        return KeyOutcome::Quit;
    }
    if state.mode != InputMode::Normal {
        handle_text_input(k, state, cmd_tx);
        return KeyOutcome::Continue;
    }

    match k.code {
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Tab => state.tab = (state.tab + 1) % 3,
        KeyCode::Char('?') => state.tab = TAB_HELP,
        _ => match state.tab {
            TAB_ANALYSIS => handle_analysis_key(k, state, store, cmd_tx),
            TAB_HISTORY => handle_history_key(k, state, store),
            _ => {}
        },
    }
    KeyOutcome::Continue
}

fn handle_text_input(k: KeyEvent, state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>) {
    let mode = state.mode;
    let buf = match mode {
        InputMode::EditPath => &mut state.path_input,
        InputMode::EditTitle => &mut state.title_input,
        InputMode::EditFilter => &mut state.view_opts.scene_filter,
        InputMode::Normal => return,
    };
    match k.code {
        KeyCode::Char(c) => buf.push(c),
        KeyCode::Backspace => {
            buf.pop();
        }
        KeyCode::Esc => state.mode = InputMode::Normal,
        KeyCode::Enter => {
            state.mode = InputMode::Normal;
            if mode == InputMode::EditPath {
                start_analysis(state, cmd_tx);
            }
        }
        KeyCode::Up | KeyCode::Down if mode != InputMode::EditFilter => {
            state.mode = if mode == InputMode::EditPath {
                InputMode::EditTitle
            } else {
                InputMode::EditPath
            };
        }
        _ => {}
    }
    if mode == InputMode::EditFilter {
        state.scroll = 0;
    }
}

fn start_analysis(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>) {
    if let Some((path, title)) = state.begin_run() {
        if cmd_tx.send(UiCommand::Analyze { path, title }).is_err() {
            state.run_in_flight = false;
            state.info = "Analysis controller is not running".into();
        }
    }
}

fn handle_analysis_key(
    k: KeyEvent,
    state: &mut UiState,
    store: &dyn RecordStore,
    cmd_tx: &UnboundedSender<UiCommand>,
) {
    match (state.view, k.code) {
        (View::Upload, KeyCode::Char('i')) => state.mode = InputMode::EditPath,
        (View::Upload, KeyCode::Char('t')) => state.mode = InputMode::EditTitle,
        (View::Upload, KeyCode::Enter) => start_analysis(state, cmd_tx),
        (View::Upload, _) => {}

        (_, KeyCode::Char('u')) => state.new_analysis(),
        (View::Progress, _) => {}

        (View::Results, KeyCode::Up | KeyCode::Char('k')) => state.scroll_by(-1),
        (View::Results, KeyCode::Down | KeyCode::Char('j')) => state.scroll_by(1),
        (View::Results, KeyCode::PageUp) => state.scroll_by(-10),
        (View::Results, KeyCode::PageDown) => state.scroll_by(10),
        (View::Results, KeyCode::Home) => state.scroll = 0,
        (View::Results, KeyCode::Char('x')) => state.view_opts.expanded = !state.view_opts.expanded,
        (View::Results, KeyCode::Char('/')) => state.mode = InputMode::EditFilter,
        (View::Results, KeyCode::Char(c @ ('1' | '2' | '3'))) => {
            let tier = match c {
                '1' => BudgetTier::Micro,
                '2' => BudgetTier::Indie,
                _ => BudgetTier::Studio,
            };
            change_tier(state, store, tier);
        }
        (View::Results, KeyCode::Char(c @ ('[' | ']' | 'n' | 'b'))) => {
            if let Some(r) = state.selected.clone() {
                let a = &r.analysis;
                match c {
                    '[' => state.nav.prev(a),
                    ']' => state.nav.next(a),
                    'n' => state.nav.drill(a),
                    _ => state.nav.back(a),
                }
            }
        }
        (View::Results, KeyCode::Char('e')) => {
            if let Some(r) = state.results_record() {
                match export::export_record_json(r) {
                    Ok(p) => {
                        let path_str = p.to_string_lossy().to_string();
                        state.info = format!("Exported JSON: {}", export::display_path(&path_str));
                        state.last_exported_path = Some(path_str);
                    }
                    Err(e) => state.info = format!("JSON export failed: {e:#}"),
                }
            }
        }
        (View::Results, KeyCode::Char('y')) => {
            if let Some(r) = state.results_record() {
                let res = crate::export::export_string(r).and_then(|s| export::copy_to_clipboard(&s));
                state.info = match res {
                    Ok(()) => "✓ Copied analysis JSON to clipboard".into(),
                    Err(e) => format!("Clipboard copy failed: {e:#}"),
                };
            }
        }
        _ => {}
    }
}

fn change_tier(state: &mut UiState, store: &dyn RecordStore, tier: BudgetTier) {
    let Some(record) = state.results_record() else {
        return;
    };
    if record.budget_tier == tier {
        return;
    }
    match store.update(&record.id, budget::tier_change(record, tier)) {
        Ok(updated) => {
            state.info = format!("Budget tier: {}", tier.info().label);
            state.replace_record(updated);
        }
        Err(e) => state.info = format!("Tier change failed: {e}"),
    }
}

fn handle_history_key(k: KeyEvent, state: &mut UiState, store: &dyn RecordStore) {
    match k.code {
        KeyCode::Up | KeyCode::Char('k') => {
            state.history_selected = state.history_selected.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if state.history_selected + 1 < state.history.len() {
                state.history_selected += 1;
            }
        }
        KeyCode::Enter => {
            if let Some(r) = state.history_cursor_record().cloned() {
                // Re-read so the view reflects what is on disk now.
                let fresh = store.get(&r.id).unwrap_or(r);
                state.select_record(fresh);
            }
        }
        KeyCode::Char('r') => match store.list(state.history_load) {
            Ok(h) => {
                state.set_history(h);
                state.info = "Refreshed".into();
            }
            Err(e) => state.info = format!("Refresh failed: {e}"),
        },
        KeyCode::Char('d') => {
            if let Some(id) = state.history_cursor_record().map(|r| r.id.clone()) {
                match store.delete(&id) {
                    Ok(()) => {
                        state.remove_record(&id);
                        state.info = "Deleted".into();
                    }
                    Err(e) => state.info = format!("Delete failed: {e}"),
                }
            }
        }
        _ => {}
    }
}

fn handle_run_completed(store: &dyn RecordStore, state: &mut UiState, record: AnalysisRecord) {
    let reload_size = (state.history.len() + 1).max(state.history_load);
    let processed = orchestrator::process_run_completion(store, None, reload_size, &record);
    if !processed.export_messages.is_empty() {
        state.info = processed.export_messages.join("; ");
    } else {
        state.info = format!("Analysis complete: {}", record.title);
    }
    state.complete_run(record, Some(processed.history));
}

fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Normal => Style::default(),
        Tone::Muted => Style::default().fg(Color::DarkGray),
        Tone::Heading => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        Tone::Accent => Style::default().fg(Color::Magenta),
        Tone::Good => Style::default().fg(Color::Green),
        Tone::Warn => Style::default().fg(Color::Yellow),
        Tone::Danger => Style::default().fg(Color::Red),
    }
}

fn panel_lines(panels: &[Panel]) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    for (i, p) in panels.iter().enumerate() {
        if i > 0 {
            out.push(Line::from(""));
        }
        let mut header = vec![Span::styled(
            p.title.clone(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )];
        if let Some(sub) = &p.subtitle {
            header.push(Span::styled(format!("  {sub}"), Style::default().fg(Color::Gray)));
        }
        out.push(Line::from(header));
        out.extend(
            p.lines
                .iter()
                .map(|l| Line::from(Span::styled(l.text.clone(), tone_style(l.tone)))),
        );
    }
    out
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Analysis"),
        Line::from("History"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("script-breakdown"),
    )
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_ANALYSIS => draw_analysis(chunks[1], f, state),
        TAB_HISTORY => draw_history(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }

    let status = Paragraph::new(Line::from(vec![
        Span::styled(" ", Style::default()),
        Span::styled(state.info.clone(), Style::default().fg(Color::Gray)),
    ]));
    f.render_widget(status, chunks[2]);
}

fn draw_analysis(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    match state.view {
        View::Upload => draw_upload(area, f, state),
        View::Progress => draw_progress(area, f, state),
        View::Results => draw_results(area, f, state),
    }
}

fn input_line(label: &str, value: &str, active: bool, placeholder: &str) -> Line<'static> {
    let label_style = if active {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let value_span = if value.is_empty() && !active {
        Span::styled(placeholder.to_string(), Style::default().fg(Color::DarkGray))
    } else if active {
        Span::raw(format!("{value}▏"))
    } else {
        Span::raw(value.to_string())
    };
    Line::from(vec![Span::styled(format!("{label:<7}"), label_style), value_span])
}

fn draw_upload(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)].as_ref())
        .split(area);

    let hint = |k: &str| Span::styled(k.to_string(), Style::default().fg(Color::Magenta));
    let form = Paragraph::new(vec![
        input_line(
            "File",
            &state.path_input,
            state.mode == InputMode::EditPath,
            "path to .pdf, .fdx, .fountain or .txt",
        ),
        input_line(
            "Title",
            &state.title_input,
            state.mode == InputMode::EditTitle,
            "(defaults to the file name)",
        ),
        Line::from(""),
        Line::from(vec![
            hint("i"),
            Span::raw(": edit file, "),
            hint("t"),
            Span::raw(": edit title, "),
            hint("enter"),
            Span::raw(": analyze, "),
            hint("esc"),
            Span::raw(": stop editing"),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Upload Your Screenplay"));
    f.render_widget(form, rows[0]);

    let history = panels::history(&state.history, state.selected_id());
    let p = Paragraph::new(panel_lines(&[history]))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(p, rows[1]);
}

fn draw_progress(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut panel = panels::progress(state.progress_status());
    let title = match &state.selected {
        Some(r) => r.title.clone(),
        None => state.title_input.trim().to_string(),
    };
    if !title.is_empty() {
        panel.title = format!("{title}: {}", panel.title);
    }
    let mut lines = panel_lines(&[panel]);
    lines.push(Line::from(""));
    let footer = if state.processing {
        "Working… the analysis keeps running while you browse other tabs."
    } else {
        "Press u to start a new analysis."
    };
    lines.push(Line::from(Span::styled(footer, Style::default().fg(Color::DarkGray))));

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Progress"));
    f.render_widget(p, area);
}

fn draw_results(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let Some(record) = state.results_record() else {
        return draw_progress(area, f, state);
    };

    let (main, side) = if area.width >= 110 {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(60), Constraint::Length(44)].as_ref())
            .split(area);
        (cols[0], Some(cols[1]))
    } else {
        (area, None)
    };

    let panels = panels::results_panels(record, &state.view_opts, &state.nav);
    let mut lines = panel_lines(&panels);
    if state.mode == InputMode::EditFilter {
        lines.insert(
            0,
            Line::from(vec![
                Span::styled("Filter scenes: ", Style::default().fg(Color::Yellow)),
                Span::raw(format!("{}▏", state.view_opts.scene_filter)),
            ]),
        );
    }

    let title = format!(
        "Results  ·  tier {}  ·  {}",
        record.budget_tier.info().label,
        if state.view_opts.expanded { "all items" } else { "collapsed" }
    );
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((state.scroll, 0))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, main);

    if let Some(side) = side {
        charts::draw_sidebar(f, side, &record.analysis);
    }
}

fn draw_history(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let total = state.history.len();
    let pos = if total > 0 { state.history_selected + 1 } else { 0 };
    let key = |k: &str| Span::styled(k.to_string(), Style::default().fg(Color::Magenta));
    let mut lines = vec![
        Line::from(vec![
            Span::raw(format!("History ({pos}/{total}) - ")),
            key("↑/↓/j/k"),
            Span::raw(": navigate, "),
            key("enter"),
            Span::raw(": open, "),
            key("d"),
            Span::raw(": delete, "),
            key("r"),
            Span::raw(": refresh"),
        ]),
        Line::from(""),
    ];

    let cursor_id = state.history_cursor_record().map(|r| r.id.as_str());
    let body = panel_lines(&[panels::history(&state.history, cursor_id)]);

    // Keep the cursor on screen: header lines, panel title, then one line per record.
    let visible = (area.height as usize).saturating_sub(2 + lines.len() + 1).max(1);
    let skip = state.history_selected.saturating_sub(visible.saturating_sub(1));
    let mut body = body.into_iter();
    if let Some(header) = body.next() {
        lines.push(header);
    }
    lines.extend(body.skip(skip).take(visible));

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_lines_keep_titles_and_tones() {
        let mut a = Panel::new("Budget Estimate").with_subtitle("Independent");
        a.push("$1,000,000 — $3,000,000", Tone::Good);
        let b = Panel::new("Genre & Tone");
        let lines = panel_lines(&[a, b]);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].spans[0].content, "Budget Estimate");
        assert_eq!(lines[0].spans[1].content, "  Independent");
        assert_eq!(lines[1].spans[0].style, tone_style(Tone::Good));
        assert_eq!(lines[2].width(), 0);
        assert_eq!(lines[3].spans[0].content, "Genre & Tone");
    }

    #[test]
    fn text_input_edits_and_filters() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut state = UiState::default();
        state.mode = InputMode::EditFilter;
        state.scroll = 7;
        for c in "int".chars() {
            handle_text_input(KeyEvent::from(KeyCode::Char(c)), &mut state, &tx);
        }
        handle_text_input(KeyEvent::from(KeyCode::Backspace), &mut state, &tx);
        assert_eq!(state.view_opts.scene_filter, "in");
        assert_eq!(state.scroll, 0);
        handle_text_input(KeyEvent::from(KeyCode::Esc), &mut state, &tx);
        assert_eq!(state.mode, InputMode::Normal);
    }

    #[test]
    fn enter_on_path_sends_analyze() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = UiState::default();
        state.mode = InputMode::EditPath;
        for c in "/tmp/a.txt".chars() {
            handle_text_input(KeyEvent::from(KeyCode::Char(c)), &mut state, &tx);
        }
        handle_text_input(KeyEvent::from(KeyCode::Enter), &mut state, &tx);
        match rx.try_recv().unwrap() {
            UiCommand::Analyze { path, title } => {
                assert_eq!(path, std::path::PathBuf::from("/tmp/a.txt"));
                assert_eq!(title, None);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(state.view, View::Progress);
    }
}
