//! TUI for browsing, syncing and exporting subscription links

use crate::app::{HubCommand, HubEvent};
use crate::subscription::export::{self, ExportKind};
use crate::subscription::{LinkFilter, LinkStats, LinkStatus, SubscriptionLink};
use crate::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::time::Duration;

const HELP: &str = "s sync | r/R re-check pending/all | m summary | f fast | Tab type | / search | u show URL | v/c/e export | q quit";

/// Link browser TUI state. The collection itself is owned by the hub worker;
/// this side only holds the latest snapshot.
pub struct HubApp {
    links: Vec<SubscriptionLink>,
    filter: LinkFilter,
    commands: UnboundedSender<HubCommand>,
    events: UnboundedReceiver<HubEvent>,
    /// Directory exports are written to
    export_dir: PathBuf,
    discovery_enabled: bool,
    list_state: ListState,
    /// Search input mode
    searching: bool,
    progress: String,
    status_message: String,
    /// Hub worker has stopped
    worker_done: bool,
    should_quit: bool,
}

impl HubApp {
    pub fn new(
        commands: UnboundedSender<HubCommand>,
        events: UnboundedReceiver<HubEvent>,
        discovery_enabled: bool,
        export_dir: PathBuf,
    ) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));

        Self {
            links: Vec::new(),
            // Fast-only is the default view
            filter: LinkFilter::new().with_only_fast(true),
            commands,
            events,
            export_dir,
            discovery_enabled,
            list_state,
            searching: false,
            progress: String::new(),
            status_message: HELP.to_string(),
            worker_done: false,
            should_quit: false,
        }
    }

    /// Run the TUI application
    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_app(&mut terminal).await;

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    async fn run_app<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|f| self.ui(f))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_input(key.code);
                        if self.should_quit {
                            break;
                        }
                    }
                }
            }

            self.drain_events();
            // Let the worker task make progress between frames
            tokio::task::yield_now().await;
        }

        Ok(())
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.worker_done {
                        self.worker_done = true;
                        self.status_message = "Background worker stopped. Press 'q' to quit".to_string();
                    }
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::Progress(progress) => self.progress = progress,
            HubEvent::Links(links) => {
                self.links = links;
                self.clamp_selection();
            }
            HubEvent::LinkUpdated(link) => {
                if let Some(slot) = self.links.iter_mut().find(|l| l.id == link.id) {
                    *slot = link;
                }
            }
            HubEvent::Notice(message) => self.status_message = message,
        }
    }

    fn visible(&self) -> Vec<&SubscriptionLink> {
        self.links.iter().filter(|l| self.filter.matches(l)).collect()
    }

    fn selected(&self) -> Option<&SubscriptionLink> {
        let index = self.list_state.selected()?;
        self.links.iter().filter(|l| self.filter.matches(l)).nth(index)
    }

    /// Full URL of the selected row, for copying out of the status bar
    fn show_selected_url(&mut self) {
        self.status_message = match self.selected() {
            Some(link) => format!("URL: {}", link.url),
            None => "No link selected".to_string(),
        };
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        let selected = self.list_state.selected().unwrap_or(0);
        self.list_state
            .select(Some(selected.min(len.saturating_sub(1))));
    }

    fn send(&mut self, command: HubCommand) {
        if self.commands.send(command).is_err() {
            self.status_message = "Background worker is not running".to_string();
        }
    }

    fn export(&mut self, kind: ExportKind) {
        let now = chrono::Local::now();
        self.status_message = match export::render(kind, &self.links, self.filter.only_fast, now) {
            Some(artifact) => match artifact.save_to_dir(&self.export_dir) {
                Ok(path) => format!("Exported {} links to {}", artifact.count, path.display()),
                Err(e) => format!("Export failed: {}", e),
            },
            None => format!("No usable links in category [{}]", kind),
        };
    }

    fn handle_input(&mut self, key: KeyCode) {
        if self.searching {
            match key {
                KeyCode::Enter | KeyCode::Esc => self.searching = false,
                KeyCode::Backspace => {
                    self.filter.search.pop();
                }
                KeyCode::Char(c) => self.filter.search.push(c),
                _ => {}
            }
            self.clamp_selection();
            return;
        }

        match key {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('s') => {
                if self.discovery_enabled {
                    self.send(HubCommand::Sync);
                } else {
                    self.status_message = crate::app::MISSING_KEY_NOTICE.to_string();
                }
            }
            KeyCode::Char('r') => self.send(HubCommand::ValidatePending),
            KeyCode::Char('R') => self.send(HubCommand::RevalidateAll),
            KeyCode::Char('m') => self.send(HubCommand::Summary),
            KeyCode::Char('f') => {
                self.filter.only_fast = !self.filter.only_fast;
                self.clamp_selection();
            }
            KeyCode::Tab => {
                self.filter.next_type();
                self.list_state.select(Some(0));
            }
            KeyCode::Char('/') => {
                self.searching = true;
            }
            KeyCode::Char('u') => self.show_selected_url(),
            KeyCode::Char('v') => self.export(ExportKind::V2Ray),
            KeyCode::Char('c') => self.export(ExportKind::Clash),
            KeyCode::Char('e') => self.export(ExportKind::Report),
            KeyCode::Down => {
                let len = self.visible().len();
                let i = match self.list_state.selected() {
                    Some(i) if i + 1 < len => i + 1,
                    _ => 0,
                };
                self.list_state.select(Some(i));
            }
            KeyCode::Up => {
                let len = self.visible().len();
                let i = match self.list_state.selected() {
                    Some(0) | None => len.saturating_sub(1),
                    Some(i) => i - 1,
                };
                self.list_state.select(Some(i));
            }
            _ => {}
        }
    }

    fn ui(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(3), // Stats
                Constraint::Length(3), // Validation progress
                Constraint::Length(3), // Filters
                Constraint::Min(0),    // Links and details
                Constraint::Length(3), // Status bar
            ])
            .split(f.size());

        let (title_text, title_color) = if self.discovery_enabled {
            ("VPN HUB".to_string(), Color::Cyan)
        } else {
            (
                format!("VPN HUB - {}", crate::app::MISSING_KEY_NOTICE),
                Color::Red,
            )
        };
        let title = Paragraph::new(title_text)
            .style(Style::default().fg(title_color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(title, chunks[0]);

        let stats = LinkStats::from_links(&self.links);
        let mut stats_line = format!(
            "Total: {} | Active: {} | Fast: {} | Avg ping: {}ms",
            stats.total, stats.active, stats.fast, stats.avg_ping_ms
        );
        if !self.progress.is_empty() {
            stats_line.push_str(&format!(" | {}", self.progress));
        }
        let stats_widget = Paragraph::new(stats_line)
            .style(Style::default().fg(Color::White))
            .block(Block::default().borders(Borders::ALL).title("Pool"));
        f.render_widget(stats_widget, chunks[1]);

        let checked = self
            .links
            .iter()
            .filter(|l| l.status != LinkStatus::Testing)
            .count();
        let percent = if self.links.is_empty() {
            0
        } else {
            (checked as f64 / self.links.len() as f64 * 100.0) as u16
        };
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Checked"))
            .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
            .percent(percent)
            .label(format!("{}/{} ({}%)", checked, self.links.len(), percent));
        f.render_widget(gauge, chunks[2]);

        let type_label = self
            .filter
            .link_type
            .map_or_else(|| "All".to_string(), |t| t.to_string());
        let search_label = if self.searching {
            format!("{}_", self.filter.search)
        } else {
            self.filter.search.clone()
        };
        let filters = Paragraph::new(format!(
            "Type: {} | Fast only: {} | Search: {}",
            type_label,
            if self.filter.only_fast { "ON" } else { "OFF" },
            search_label
        ))
        .block(Block::default().borders(Borders::ALL).title("Filters"));
        f.render_widget(filters, chunks[3]);

        let items: Vec<ListItem> = self
            .visible()
            .into_iter()
            .map(|link| {
                let ping = match (link.status, link.ping) {
                    (LinkStatus::Active, Some(p)) => format!("{}ms", p),
                    (LinkStatus::Testing, _) => "...".to_string(),
                    _ => "-".to_string(),
                };
                let color = match link.status {
                    LinkStatus::Active if link.is_fast() => Color::Green,
                    LinkStatus::Active => Color::Yellow,
                    LinkStatus::Testing => Color::Blue,
                    LinkStatus::Expired => Color::Red,
                };
                let content = format!(
                    "{:<7} {:<8} {:>7}  {}  {}",
                    link.link_type.to_string(),
                    link.status.to_string(),
                    ping,
                    link.title,
                    link.url
                );
                ListItem::new(content).style(Style::default().fg(color))
            })
            .collect();
        let count = items.len();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Links ({})", count))
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol(">> ");

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(chunks[4]);
        f.render_stateful_widget(list, body[0], &mut self.list_state);

        let details = match self.selected() {
            Some(link) => format!(
                "{}\n\n{}\n\nType: {}\nStatus: {}\nPing: {}\nSource: {}\nUpdated: {}",
                link.title,
                link.url,
                link.link_type,
                link.status,
                link.ping.map_or_else(|| "-".to_string(), |p| format!("{}ms", p)),
                link.source,
                link.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            None => "No link selected".to_string(),
        };
        let details = Paragraph::new(details)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Details"));
        f.render_widget(details, body[1]);

        let status = Paragraph::new(self.status_message.clone())
            .style(if self.progress.is_empty() {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Yellow)
            })
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Status"));
        f.render_widget(status, chunks[5]);
    }
}
