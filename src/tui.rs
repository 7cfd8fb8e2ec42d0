use std::collections::HashMap;
use std::io::stdout;

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::poller::Snapshot;
use crate::types::{NewBid, ProjectRow};

/// Description length cap in the detail popup.
const MAX_DESCRIPTION_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortKey {
    Listed,
    Newest,
    FewestBids,
    LowestAvg,
}

impl SortKey {
    fn next(self) -> Self {
        match self {
            SortKey::Listed => SortKey::Newest,
            SortKey::Newest => SortKey::FewestBids,
            SortKey::FewestBids => SortKey::LowestAvg,
            SortKey::LowestAvg => SortKey::Listed,
        }
    }

    fn label(self) -> &'static str {
        match self {
            SortKey::Listed => "listed",
            SortKey::Newest => "newest",
            SortKey::FewestBids => "fewest bids",
            SortKey::LowestAvg => "lowest avg",
        }
    }
}

/// A bid the user asked to place from the table.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BidCommand {
    project_id: u64,
    amount: f64,
}

struct DashState {
    /// Rows in published (listing) order.
    rows: Vec<ProjectRow>,
    /// Display order: indices into `rows`.
    order: Vec<usize>,
    updated_at: String,
    /// Index into `order`.
    selected: usize,
    /// Bid amount drafts keyed by project id. Kept across refreshes and
    /// after submission.
    drafts: HashMap<u64, String>,
    editing: bool,
    show_detail: bool,
    sort: SortKey,
    quit: bool,
}

impl DashState {
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            order: Vec::new(),
            updated_at: String::new(),
            selected: 0,
            drafts: HashMap::new(),
            editing: false,
            show_detail: false,
            sort: SortKey::Listed,
            quit: false,
        }
    }

    fn selected_row(&self) -> Option<&ProjectRow> {
        self.order.get(self.selected).map(|&i| &self.rows[i])
    }

    /// Replace the row list with a fresh snapshot, keeping the selection on
    /// the same project when it survives the refresh.
    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        let selected_id = self.selected_row().map(|r| r.id);
        self.rows = snapshot.rows;
        self.updated_at = snapshot.updated_at;
        self.resort();
        self.restore_selection(selected_id);
        if self.editing && self.selected_row().map(|r| r.id) != selected_id {
            self.editing = false;
        }
    }

    fn resort(&mut self) {
        let mut order: Vec<usize> = (0..self.rows.len()).collect();
        match self.sort {
            SortKey::Listed => {}
            SortKey::Newest => order.sort_by_key(|&i| {
                std::cmp::Reverse(self.rows[i].submitdate.unwrap_or(i64::MIN))
            }),
            SortKey::FewestBids => order.sort_by_key(|&i| self.rows[i].bid_count),
            SortKey::LowestAvg => order.sort_by(|&a, &b| {
                let x = self.rows[a].bid_avg.unwrap_or(f64::INFINITY);
                let y = self.rows[b].bid_avg.unwrap_or(f64::INFINITY);
                x.total_cmp(&y)
            }),
        }
        self.order = order;
    }

    fn restore_selection(&mut self, id: Option<u64>) {
        self.selected = id
            .and_then(|id| self.order.iter().position(|&i| self.rows[i].id == id))
            .unwrap_or(0)
            .min(self.order.len().saturating_sub(1));
    }

    fn next(&mut self) {
        if !self.order.is_empty() && self.selected < self.order.len() - 1 {
            self.selected += 1;
        }
    }

    fn prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn cycle_sort(&mut self) {
        let selected_id = self.selected_row().map(|r| r.id);
        self.sort = self.sort.next();
        self.resort();
        self.restore_selection(selected_id);
    }

    fn selected_draft(&self) -> &str {
        self.selected_row()
            .and_then(|r| self.drafts.get(&r.id))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn push_draft_char(&mut self, c: char) {
        if let Some(id) = self.selected_row().map(|r| r.id) {
            self.drafts.entry(id).or_default().push(c);
        }
    }

    fn pop_draft_char(&mut self) {
        if let Some(id) = self.selected_row().map(|r| r.id) {
            if let Some(draft) = self.drafts.get_mut(&id) {
                draft.pop();
            }
        }
    }

    /// The draft amount for the selected row, when it parses as a finite
    /// number. Submission is enabled iff this returns `Some`.
    fn selected_amount(&self) -> Option<f64> {
        parse_amount(self.selected_draft())
    }
}

/// Parse a user-entered amount, accepting only finite numbers.
fn parse_amount(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Epoch seconds as a zero-padded UTC clock.
fn format_clock(secs: i64) -> String {
    match chrono::DateTime::from_timestamp(secs, 0) {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        None => "--:--:--".to_string(),
    }
}

fn format_budget(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract().abs() < 1e-9 => format!("{v:.0}"),
        Some(v) => format!("{v:.1}"),
        None => "-".to_string(),
    }
}

fn format_avg(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.0}", v.round()),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

/// Run the dashboard until the user quits. Snapshots arrive over `rx`; bid
/// submissions are spawned fire-and-forget, surfaced only by a later poll
/// cycle marking the project as bidded.
pub async fn run(
    client: ApiClient,
    config: AppConfig,
    rx: watch::Receiver<Snapshot>,
) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &client, &config, rx).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    client: &ApiClient,
    config: &AppConfig,
    mut rx: watch::Receiver<Snapshot>,
) -> Result<()> {
    let mut state = DashState::new();
    state.apply_snapshot(rx.borrow_and_update().clone());

    let mut events = EventStream::new();
    let mut table_state = TableState::default();
    let mut poller_alive = true;

    while !state.quit {
        table_state.select(if state.order.is_empty() {
            None
        } else {
            Some(state.selected)
        });
        terminal.draw(|frame| draw(frame, &state, &mut table_state))?;

        tokio::select! {
            changed = rx.changed(), if poller_alive => {
                match changed {
                    Ok(()) => {
                        let snapshot = rx.borrow_and_update().clone();
                        state.apply_snapshot(snapshot);
                    }
                    // Poller is gone; keep showing the last snapshot.
                    Err(_) => poller_alive = false,
                }
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(cmd) = handle_key(&mut state, key) {
                            submit_bid(client, config, cmd);
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                }
            }
        }
    }
    Ok(())
}

/// Apply one key press. Returns a bid to place when the user submits a
/// valid draft.
fn handle_key(state: &mut DashState, key: KeyEvent) -> Option<BidCommand> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        state.quit = true;
        return None;
    }

    if state.editing {
        match key.code {
            KeyCode::Esc => state.editing = false,
            KeyCode::Enter => {
                // Disabled unless the draft parses as a finite number.
                if let Some(amount) = state.selected_amount() {
                    let project_id = state.selected_row()?.id;
                    state.editing = false;
                    return Some(BidCommand { project_id, amount });
                }
            }
            KeyCode::Backspace => state.pop_draft_char(),
            KeyCode::Char(c) if !c.is_control() => state.push_draft_char(c),
            _ => {}
        }
        return None;
    }

    match key.code {
        KeyCode::Char('q') => state.quit = true,
        KeyCode::Esc => {
            if state.show_detail {
                state.show_detail = false;
            } else {
                state.quit = true;
            }
        }
        KeyCode::Down | KeyCode::Char('j') => state.next(),
        KeyCode::Up | KeyCode::Char('k') => state.prev(),
        KeyCode::Char('s') => state.cycle_sort(),
        KeyCode::Char('d') | KeyCode::Tab => state.show_detail = !state.show_detail,
        KeyCode::Enter | KeyCode::Char('b') => {
            if state.selected_row().is_some() {
                state.editing = true;
            }
        }
        _ => {}
    }
    None
}

fn submit_bid(client: &ApiClient, config: &AppConfig, cmd: BidCommand) {
    let client = client.clone();
    let bid = NewBid::new(
        cmd.project_id,
        cmd.amount,
        config.account.user_id,
        &config.bid.proposal,
    );
    tokio::spawn(async move {
        info!("Placing bid: {:.2} on project {}", bid.amount, bid.project_id);
        match client.place_bid(&bid).await {
            Ok(()) => info!("Bid accepted for project {}", bid.project_id),
            Err(e) => warn!("Bid failed for project {}: {e:#}", bid.project_id),
        }
    });
}

fn draw(frame: &mut Frame, state: &DashState, table_state: &mut TableState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    // Header: last-updated stamp and current sort.
    let updated = if state.updated_at.is_empty() {
        "waiting for first poll...".to_string()
    } else {
        state.updated_at.clone()
    };
    let header = Line::from(vec![
        Span::styled(
            format!(" Last updated: {updated}"),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("   sort: {}   {} project(s)", state.sort.label(), state.rows.len()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(header), chunks[0]);

    // Project table.
    let header_row = Row::new(vec![
        "#", "Title", "Submitted", "Min", "Max", "Cur", "Bids", "Avg", "Bid", "Bidded",
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let body: Vec<Row> = state
        .order
        .iter()
        .enumerate()
        .map(|(seq, &i)| {
            let row = &state.rows[i];
            let draft = state.drafts.get(&row.id).map(String::as_str).unwrap_or("");
            let editing_here = state.editing && seq == state.selected;
            let (draft_text, draft_style) = if editing_here {
                (format!("{draft}_"), Style::default().fg(Color::Yellow))
            } else if draft.is_empty() {
                (String::new(), Style::default())
            } else if parse_amount(draft).is_some() {
                (draft.to_string(), Style::default().fg(Color::Green))
            } else {
                (draft.to_string(), Style::default().fg(Color::Red))
            };

            let clock = row
                .submitdate
                .map(format_clock)
                .unwrap_or_else(|| "--:--:--".to_string());

            Row::new(vec![
                Cell::from(format!("{}", seq + 1)),
                Cell::from(truncate(&row.title, 48)),
                Cell::from(clock),
                Cell::from(format_budget(row.budget_min)),
                Cell::from(format_budget(row.budget_max)),
                Cell::from(row.currency_code.clone()),
                Cell::from(format!("{}", row.bid_count)),
                Cell::from(format_avg(row.bid_avg)),
                Cell::from(draft_text).style(draft_style),
                if row.bidded {
                    Cell::from("*").style(
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Cell::from("")
                },
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Fill(1),
        Constraint::Length(9),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(4),
        Constraint::Length(5),
        Constraint::Length(7),
        Constraint::Length(12),
        Constraint::Length(6),
    ];
    let table = Table::new(body, widths)
        .header(header_row)
        .block(Block::default().borders(Borders::ALL).title(" Active projects "))
        .row_highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    frame.render_stateful_widget(table, chunks[1], table_state);

    // Footer help.
    let help = if state.editing {
        " type amount  enter:submit  esc:cancel  backspace:delete"
    } else {
        " j/k:move  enter:bid  d:details  s:sort  q:quit"
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );

    if state.show_detail {
        draw_detail(frame, state);
    }
}

fn draw_detail(frame: &mut Frame, state: &DashState) {
    let Some(row) = state.selected_row() else {
        return;
    };

    let area = centered_rect(80, 70, frame.area());
    frame.render_widget(Clear, area);

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        row.title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(row.listing_url()));
    let currency = if row.currency_country.is_empty() {
        row.currency_code.clone()
    } else {
        format!("{} ({})", row.currency_code, row.currency_country)
    };
    lines.push(Line::from(format!(
        "Budget: {} - {} {}   Bids: {} (avg {})",
        format_budget(row.budget_min),
        format_budget(row.budget_max),
        currency,
        row.bid_count,
        format_avg(row.bid_avg),
    )));
    if row.bidded {
        lines.push(Line::from(Span::styled(
            "Already bidded",
            Style::default().fg(Color::Cyan),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Skills Required",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(row.skills.join(", ")));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Description",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for line in truncate(&row.description, MAX_DESCRIPTION_LEN).lines() {
        lines.push(Line::from(line.to_string()));
    }

    let detail = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(" Details "))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, area);
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
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
