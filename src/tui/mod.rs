mod help;
mod state;

use crate::gateway::{Backend, HttpGateway};
use crate::generation::GenerationState;
use crate::model::{ClientConfig, GeneratedItem, IdentityProfile};
use crate::orchestrator::{self, Orchestrator, Snapshot, UiCommand};
use crate::publish::PublishState;
use crate::session::Location;
use crate::text_summary::{display_timestamp, share_badge, welcome_line};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
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
use state::{Controls, Focus, KeyAction, UiState, TAB_COMPOSE};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tracing::{info, warn};

pub async fn run(
    cfg: ClientConfig,
    gateway: Arc<HttpGateway>,
    mut location: Location,
) -> Result<()> {
    let login_url = gateway.login_url();
    let backend: Arc<dyn Backend> = gateway;
    let orch = Arc::new(Orchestrator::new(&cfg, backend));
    orch.bootstrap(&mut location);

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_orch = orch.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_orch, login_url, cmd_tx));

    let res = orchestrator::run_controller(orch, cmd_rx).await;

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

/// Change feeds from the orchestrator. Any change forces a redraw ahead of the
/// next tick.
struct Watchers {
    profile: watch::Receiver<Option<IdentityProfile>>,
    history: watch::Receiver<Vec<GeneratedItem>>,
    generation: watch::Receiver<GenerationState>,
    publish: watch::Receiver<PublishState>,
    alert: watch::Receiver<Option<String>>,
}

impl Watchers {
    fn new(orch: &Orchestrator) -> Self {
        Self {
            profile: orch.session().subscribe_profile(),
            history: orch.history().subscribe(),
            generation: orch.generation().subscribe(),
            publish: orch.publish().subscribe(),
            alert: orch.subscribe_alert(),
        }
    }

    fn any_changed(&mut self) -> bool {
        // No short-circuit: every receiver is marked seen.
        take_change(&mut self.profile)
            | take_change(&mut self.history)
            | take_change(&mut self.generation)
            | take_change(&mut self.publish)
            | take_change(&mut self.alert)
    }
}

fn take_change<T>(rx: &mut watch::Receiver<T>) -> bool {
    if rx.has_changed().unwrap_or(false) {
        let _ = rx.borrow_and_update();
        true
    } else {
        false
    }
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    orch: Arc<Orchestrator>,
    login_url: String,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState::default();
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut redraw = true;
    let mut snap = orch.snapshot();
    let mut watchers = Watchers::new(&orch);

    let res = loop {
        redraw |= watchers.any_changed();
        if redraw || last_tick.elapsed() >= tick_rate {
            snap = orch.snapshot();
            if let Some(alert) = orch.take_alert() {
                state.info = alert;
            }
            state.clamp_selection(snap.history.len());
            terminal
                .draw(|f| draw(f.area(), f, &mut state, &snap, &login_url))
                .ok();
            last_tick = Instant::now();
            redraw = false;
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                let controls = Controls {
                    can_submit: orch.can_submit(),
                    can_share: orch.can_share(),
                };
                match state.handle_key(k, &snap, controls) {
                    KeyAction::None => {}
                    KeyAction::Send(cmd) => {
                        if cmd_tx.send(cmd).is_err() {
                            break Err(anyhow::anyhow!("controller stopped"));
                        }
                    }
                    KeyAction::Copy(text) => match copy_to_clipboard(&text) {
                        Ok(_) => state.info = "✓ Copied post to clipboard".into(),
                        Err(e) => state.info = format!("Clipboard copy failed: {e:#}"),
                    },
                    KeyAction::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                }
                redraw = true;
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    info!("ui closed");
    res
}

fn draw(
    area: Rect,
    f: &mut ratatui::Frame,
    state: &mut UiState,
    snap: &Snapshot,
    login_url: &str,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Compose"), Line::from("Help")])
        .select(state.tab)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Influence AI Content Generator"),
        )
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    if state.tab == TAB_COMPOSE {
        draw_compose(chunks[1], f, state, snap, login_url);
    } else {
        help::draw_help(chunks[1], f);
    }

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(" info ", Style::default().fg(Color::Black).bg(Color::Gray)),
        Span::raw(" "),
        Span::raw(state.info.clone()),
    ]));
    f.render_widget(footer, chunks[2]);
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn draw_compose(
    area: Rect,
    f: &mut ratatui::Frame,
    state: &mut UiState,
    snap: &Snapshot,
    login_url: &str,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(6),
        ])
        .split(area);

    let welcome = welcome_line(snap.profile.as_ref(), login_url);
    let welcome_style = if snap.profile.is_some() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Cyan)
    };
    f.render_widget(
        Paragraph::new(Span::styled(welcome, welcome_style)),
        rows[0],
    );

    let inputs = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    draw_input(inputs[0], f, "Your role", &state.role, state.focus == Focus::Role);
    draw_input(inputs[1], f, "Topic", &state.topic, state.focus == Focus::Topic);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[2]);
    draw_result(body[0], f, snap);
    draw_history(body[1], f, state, snap);
}

fn draw_input(area: Rect, f: &mut ratatui::Frame, title: &str, value: &str, focused: bool) {
    let mut spans = vec![Span::raw(value.to_string())];
    if focused {
        spans.push(Span::styled("▏", Style::default().fg(Color::Yellow)));
    }
    let p = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(focus_style(focused))
            .title(title.to_string()),
    );
    f.render_widget(p, area);
}

fn draw_result(area: Rect, f: &mut ratatui::Frame, snap: &Snapshot) {
    let gen = &snap.generation;
    let (title, text) = if gen.is_loading {
        ("Generated post (generating...)", "Generating...".to_string())
    } else if gen.result_text.is_empty() {
        (
            "Generated post",
            "Fill in role and topic, then press Enter.".to_string(),
        )
    } else {
        ("Generated post (y: copy)", gen.result_text.clone())
    };
    let p = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_history(area: Rect, f: &mut ratatui::Frame, state: &mut UiState, snap: &Snapshot) {
    let focused = state.focus == Focus::History;
    let title = format!("History ({})", snap.history.len());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(focus_style(focused))
        .title(title);

    if snap.history.is_empty() {
        f.render_widget(Paragraph::new("No posts yet.").block(block), area);
        return;
    }

    // Two rows per item: header and first line of the post.
    let visible = (area.height.saturating_sub(2) as usize / 2).max(1);
    state.scroll_into_view(visible);

    let share_hint = if !snap.logged_in {
        Span::styled("  login to share", Style::default().fg(Color::DarkGray))
    } else if snap.publish.is_busy() {
        Span::styled("  share busy", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw("")
    };

    let mut lines: Vec<Line> = Vec::new();
    for (idx, item) in snap
        .history
        .iter()
        .enumerate()
        .skip(state.history_scroll_offset)
        .take(visible)
    {
        let selected = idx == state.history_selected;
        let marker = if selected { "▶ " } else { "  " };
        let header_style = if selected && focused {
            Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        };
        let mut header = vec![
            Span::styled(format!("{marker}#{} ", item.id), header_style),
            Span::styled(display_timestamp(item), Style::default().fg(Color::DarkGray)),
        ];
        if let Some(badge) = share_badge(item, &snap.publish) {
            header.push(Span::raw("  "));
            header.push(Span::styled(badge, Style::default().fg(Color::Magenta)));
        }
        if selected {
            header.push(share_hint.clone());
        }
        lines.push(Line::from(header));
        let first = item.post_text.lines().next().unwrap_or_default();
        lines.push(Line::from(Span::raw(format!("    {first}"))));
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}

// Global clipboard manager channel - initialized once on first use
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;

static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Start the clipboard thread on first use. Each copy keeps its clipboard
/// instance alive for a while so clipboard managers on Linux can read it.
fn init_clipboard_manager() -> &'static std_mpsc::Sender<String> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();
        std::thread::spawn(move || {
            use arboard::Clipboard;
            for text in rx {
                match Clipboard::new() {
                    Ok(mut clipboard) => {
                        if clipboard.set_text(&text).is_ok() {
                            std::thread::sleep(Duration::from_secs(2));
                        }
                    }
                    Err(e) => warn!(error = %e, "clipboard unavailable"),
                }
            }
        });
        tx
    })
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    init_clipboard_manager()
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))
}
