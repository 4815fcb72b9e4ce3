mod clipboard;
mod help;
mod state;

use crate::cli::Cli;
use crate::model::{AppEvent, CandidateFile};
use crate::orchestrator::{self, UiCommand};
use crate::preview::Preview;
use crate::upload::{Completion, StatusIndicator, SubmitState};
use anyhow::{Context, Result};
use clipboard::copy_to_clipboard;
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use help::draw_help;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{TuiState, TAB_HELP, TAB_UPLOAD};
use std::path::Path;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let client = crate::client::ProcessClient::new(&crate::cli::build_client_config(&args))?;

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let res = orchestrator::run_controller(client, event_tx, cmd_rx).await;

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
pub fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<AppEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // TuiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = TuiState::new(args.phase);
    state.auto_save_to = args.output.clone();
    if let Some(path) = args.image.as_deref() {
        select_path(&mut state, path);
    }

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, &cmd_tx, ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(k)) if k.kind == KeyEventKind::Press => {
                    if handle_key(&mut state, &cmd_tx, k.modifiers, k.code) == KeyOutcome::Quit {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                }
                Ok(Event::Paste(text)) => handle_paste(&mut state, &text),
                _ => {}
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, DisableBracketedPaste, LeaveAlternateScreen).ok();
    res
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Quit,
}

fn select_path(state: &mut TuiState, path: &Path) {
    match CandidateFile::from_path(path) {
        Ok(candidate) => {
            if state.controller.select(candidate).is_ok() {
                state.info = format!("Selected {}", path.display());
            }
        }
        Err(e) => state.controller.reject(e),
    }
}

/// A paste outside the prompt is a dropped file. Ignored while an alert is open.
fn handle_paste(state: &mut TuiState, text: &str) {
    if state.controller.view().alert.is_some() {
        return;
    }
    if let Some(buf) = state.path_input.as_mut() {
        buf.push_str(text.trim_end_matches(['\r', '\n']));
        return;
    }
    match crate::selection::path_from_paste(text) {
        Some(path) => select_path(state, &path),
        None => state.info = "Nothing to select in pasted text".into(),
    }
}

fn submit(state: &mut TuiState, cmd_tx: &UnboundedSender<UiCommand>) {
    if !state.controller.view().trigger_enabled && state.controller.pending().is_some() {
        return;
    }
    if let Ok(req) = state.controller.begin_submit() {
        let _ = cmd_tx.send(UiCommand::Submit(req));
    }
}

fn handle_key(
    state: &mut TuiState,
    cmd_tx: &UnboundedSender<UiCommand>,
    modifiers: KeyModifiers,
    code: KeyCode,
) -> KeyOutcome {
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return KeyOutcome::Quit;
    }

    // A pending alert is modal.
    if state.controller.view().alert.is_some() {
        if matches!(code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            state.controller.dismiss_alert();
        }
        return KeyOutcome::Continue;
    }

    if let Some(buf) = state.path_input.as_mut() {
        match code {
            KeyCode::Enter => {
                let input = buf.trim().to_string();
                state.path_input = None;
                if let Some(path) = crate::selection::path_from_paste(&input) {
                    select_path(state, &path);
                }
            }
            KeyCode::Esc => state.path_input = None,
            KeyCode::Backspace => {
                buf.pop();
            }
            KeyCode::Char(c) => buf.push(c),
            _ => {}
        }
        return KeyOutcome::Continue;
    }

    match code {
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Char('o') => {
            state.tab = TAB_UPLOAD;
            state.path_input = Some(String::new());
        }
        KeyCode::Char('p') | KeyCode::Left | KeyCode::Right => {
            state.controller.toggle_phase();
            state.info = format!("Phase: {}", state.controller.view().phase.label());
        }
        KeyCode::Enter => {
            if state.tab == TAB_UPLOAD {
                submit(state, cmd_tx);
            }
        }
        KeyCode::Char('x') => {
            if let Some(ticket) = state.controller.cancel() {
                let _ = cmd_tx.send(UiCommand::Cancel(ticket));
            }
        }
        KeyCode::Char('s') => match visible_result(state) {
            Some(image) => {
                state.info = "Saving…".into();
                let _ = cmd_tx.send(UiCommand::Save { image, dest: None });
            }
            None => state.info = "No processed image to save yet.".into(),
        },
        KeyCode::Char('y') => match state.last_saved_path.as_deref() {
            Some(path) => {
                state.info = match copy_to_clipboard(path) {
                    Ok(()) => format!("✓ Copied to clipboard: {}", path),
                    Err(e) => format!("Clipboard copy failed: {e:#}"),
                };
            }
            None => state.info = "No saved file path to copy. Save a result first (s)".into(),
        },
        KeyCode::Char('h') => {
            state.info = "Checking backend health…".into();
            let _ = cmd_tx.send(UiCommand::CheckHealth);
        }
        KeyCode::Tab => state.tab = (state.tab + 1) % 2,
        KeyCode::Char('?') => state.tab = TAB_HELP,
        _ => {}
    }
    KeyOutcome::Continue
}

fn visible_result(state: &TuiState) -> Option<crate::model::ProcessedImage> {
    let view = state.controller.view();
    view.results_visible.then(|| view.processed.clone()).flatten()
}

fn apply_event(state: &mut TuiState, cmd_tx: &UnboundedSender<UiCommand>, ev: AppEvent) {
    match ev {
        AppEvent::SubmitCompleted { ticket, outcome } => {
            match state.controller.finish_submit(ticket, outcome) {
                Completion::Displayed => {
                    state.info = "Processing complete".into();
                    if let (Some(dest), Some(image)) = (
                        state.auto_save_to.clone(),
                        state.controller.view().processed.clone(),
                    ) {
                        let _ = cmd_tx.send(UiCommand::Save {
                            image,
                            dest: Some(dest),
                        });
                    }
                }
                Completion::Failed(message) => state.info = format!("Failed: {message}"),
                Completion::Stale => {}
            }
        }
        AppEvent::Health(res) => {
            let text = match res {
                Ok(h) => format!("Backend: {}", h.status),
                Err(e) => format!("Health check failed: {e}"),
            };
            state.info = text.clone();
            state.health = Some(text);
        }
        AppEvent::Saved(res) => match res {
            Ok(path) => {
                let shown = path.display().to_string();
                state.info = format!("Saved: {} (press 'y' to copy path)", shown);
                state.last_saved_path = Some(shown);
            }
            Err(e) => state.info = format!("Save failed: {e}"),
        },
        AppEvent::Info(info) => state.info = info.to_message(),
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &TuiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Upload"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("phase-viewer"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_UPLOAD => draw_upload(chunks[1], f, state),
        _ => draw_help(chunks[1], f),
    }

    if let Some(alert) = state.controller.view().alert.as_deref() {
        draw_alert(area, f, alert);
    }
}

fn draw_upload(area: Rect, f: &mut ratatui::Frame, state: &TuiState) {
    let view = state.controller.view();
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(6), // Upload box + controls
                Constraint::Min(0),    // Original / processed previews
                Constraint::Length(3), // Status or path prompt
            ]
            .as_ref(),
        )
        .split(area);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(main[0]);

    let upload_lines = match &view.status {
        StatusIndicator::AwaitingFile => vec![
            Line::from(Span::styled(
                view.status.headline(),
                Style::default().fg(Color::Gray),
            )),
            Line::from(Span::styled(
                "JPG or PNG",
                Style::default().fg(Color::DarkGray),
            )),
        ],
        StatusIndicator::Uploaded { name } => vec![
            Line::from(Span::styled(
                format!("✓ {}", view.status.headline()),
                Style::default().fg(Color::Green),
            )),
            Line::from(name.clone()),
        ],
    };
    let upload_box = Paragraph::new(upload_lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Image"));
    f.render_widget(upload_box, top[0]);

    let trigger_style = if view.trigger_enabled {
        Style::default().fg(Color::Black).bg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let mut control_lines = vec![
        Line::from(vec![
            Span::styled("Phase: ", Style::default().fg(Color::Gray)),
            Span::styled(
                view.phase.label(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  (p to switch)"),
        ]),
        Line::from(vec![
            Span::styled(" Process Image ", trigger_style),
            Span::raw("  "),
            Span::raw(if view.trigger_enabled { "Enter" } else { "" }),
        ]),
    ];
    if let Some(health) = state.health.as_deref() {
        control_lines.push(Line::from(Span::styled(
            health.to_string(),
            Style::default().fg(Color::Gray),
        )));
    }
    if view.busy {
        control_lines.push(Line::from(Span::styled(
            "Processing image…  (x to cancel)",
            Style::default().fg(Color::Yellow),
        )));
    }
    let controls =
        Paragraph::new(control_lines).block(Block::default().borders(Borders::ALL).title("Process"));
    f.render_widget(controls, top[1]);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(main[1]);

    match view.preview.as_ref() {
        Some(p) => draw_preview(panes[0], f, p, "Original Image".to_string()),
        None => {
            let empty = Paragraph::new("No image selected.")
                .block(Block::default().borders(Borders::ALL).title("Original Image"));
            f.render_widget(empty, panes[0]);
        }
    }

    match (view.results_visible, view.processed.as_ref()) {
        (true, Some(processed)) => match view.processed_preview.as_ref() {
            Some(p) => draw_preview(panes[1], f, p, processed.title.clone()),
            None => {
                let body = Paragraph::new(vec![
                    Line::from(Span::styled("Source:", Style::default().fg(Color::Gray))),
                    Line::from(processed.source.clone()),
                ])
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(processed.title.clone()),
                );
                f.render_widget(body, panes[1]);
            }
        },
        _ => {
            let text = match view.submit_state {
                SubmitState::Submitting => "Waiting for the backend…",
                _ => "Results appear here after processing.",
            };
            let empty = Paragraph::new(text)
                .block(Block::default().borders(Borders::ALL).title("Processed Image"));
            f.render_widget(empty, panes[1]);
        }
    }

    let bottom = match state.path_input.as_deref() {
        Some(buf) => Paragraph::new(Line::from(vec![
            Span::raw(buf.to_string()),
            Span::styled("▏", Style::default().fg(Color::Yellow)),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Open image (Enter to select, Esc to cancel)"),
        ),
        None => Paragraph::new(state.info.clone())
            .block(Block::default().borders(Borders::ALL).title("Status")),
    };
    f.render_widget(bottom, main[2]);
}

/// Render a preview with half-block glyphs: two pixel rows per text row.
fn preview_lines(p: &Preview) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(p.text_rows() as usize);
    for row in 0..p.text_rows() {
        let spans: Vec<Span<'static>> = (0..p.width)
            .map(|x| {
                let top = p.pixel(x, row * 2).unwrap_or([0, 0, 0]);
                let mut style = Style::default().fg(Color::Rgb(top[0], top[1], top[2]));
                if let Some(bottom) = p.pixel(x, row * 2 + 1) {
                    style = style.bg(Color::Rgb(bottom[0], bottom[1], bottom[2]));
                }
                Span::styled("▀", style)
            })
            .collect();
        lines.push(Line::from(spans));
    }
    lines
}

fn draw_preview(area: Rect, f: &mut ratatui::Frame, p: &Preview, title: String) {
    let mut lines = preview_lines(p);
    lines.push(Line::from(Span::styled(
        format!("{}x{}", p.source_width, p.source_height),
        Style::default().fg(Color::DarkGray),
    )));
    let w = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(w, area);
}

fn draw_alert(area: Rect, f: &mut ratatui::Frame, message: &str) {
    let width = area.width.saturating_sub(4).min(60).max(20);
    let height = 5.min(area.height);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height,
    };
    let body = Paragraph::new(vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter to dismiss",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title("Alert"),
    );
    f.render_widget(Clear, popup);
    f.render_widget(body, popup);
}
