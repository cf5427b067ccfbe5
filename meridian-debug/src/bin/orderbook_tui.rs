//! Real-Time Orderbook Terminal UI
//!
//! Live visualization of a single symbol's L2 ladder:
//! - Top-N bid/ask levels with a size bar
//! - Spread and mid price
//! - Depth and imbalance metrics
//!
//! ## Usage
//!
//! ```bash
//! meridian-debug orderbook-tui --symbol BTC-USD
//! ```
//!
//! ## Keyboard Controls
//!
//! - `q` or `Ctrl-C` - Quit
//! - `p` - Pause/Resume the order flow simulator
//! - `r` - Reset tick counter
//! - `m` - Toggle metrics panel

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use meridian_core::core::types::{AccountId, Order, OrderId, OrderType, Side, TimeInForce};
use meridian_core::orderbook::{BookSnapshot, OrderBook};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::io;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Symbol to visualize.
    #[arg(short, long, default_value = "BTC-USD")]
    symbol: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &args.symbol);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {err:?}");
    }

    Ok(())
}

/// Feeds the book a stream of limit orders around a slow random walk, so
/// the TUI has something to render without a live matching engine behind
/// it. Each tick alternates sides and nudges the walk by a small step.
struct OrderFlowSimulator {
    mid: Decimal,
    tick: u64,
}

impl OrderFlowSimulator {
    fn new() -> Self {
        Self { mid: Decimal::new(50_000, 0), tick: 0 }
    }

    fn next_order(&mut self, symbol: &str) -> Order {
        self.tick += 1;
        let step = Decimal::new(((self.tick % 20) as i64) - 10, 1);
        self.mid += step;

        let side = if self.tick % 2 == 0 { Side::Buy } else { Side::Sell };
        let offset = Decimal::new(1 + (self.tick % 8) as i64, 0);
        let price = match side {
            Side::Buy => self.mid - offset,
            Side::Sell => self.mid + offset,
        };
        let qty = Decimal::new(1 + (self.tick % 5) as i64, 1);

        Order::new(
            OrderId::generate(),
            format!("sim-{}", self.tick),
            "simulator",
            AccountId::from("sim-account"),
            symbol,
            side,
            OrderType::Limit,
            qty,
            Some(price),
            TimeInForce::Gtc,
        )
    }
}

struct App {
    book: OrderBook,
    flow: OrderFlowSimulator,
    paused: bool,
    tick_count: u64,
    show_metrics: bool,
}

impl App {
    fn new(symbol: &str) -> Self {
        Self {
            book: OrderBook::new(symbol),
            flow: OrderFlowSimulator::new(),
            paused: false,
            tick_count: 0,
            show_metrics: true,
        }
    }

    fn tick(&mut self, symbol: &str) {
        if self.paused {
            return;
        }
        let order = self.flow.next_order(symbol);
        self.book.submit(order);
        self.tick_count += 1;
    }
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, symbol: &str) -> Result<()> {
    let mut app = App::new(symbol);
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, &app, symbol))?;

        let timeout = tick_rate.checked_sub(last_tick.elapsed()).unwrap_or_default();
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('p') => app.paused = !app.paused,
                    KeyCode::Char('m') => app.show_metrics = !app.show_metrics,
                    KeyCode::Char('r') => app.tick_count = 0,
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick(symbol);
            last_tick = Instant::now();
        }
    }
}

fn ui(f: &mut Frame, app: &App, symbol: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(10), Constraint::Length(3)])
        .split(f.area());

    render_header(f, chunks[0], app, symbol);
    render_orderbook(f, chunks[1], app);
    render_footer(f, chunks[2]);
}

fn render_header(f: &mut Frame, area: Rect, app: &App, symbol: &str) {
    let mid = match (app.book.best_bid(), app.book.best_ask()) {
        (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::new(2, 0)),
        _ => None,
    };
    let spread = match (app.book.best_bid(), app.book.best_ask()) {
        (Some(bid), Some(ask)) => Some(ask - bid),
        _ => None,
    };

    let status = if app.paused { "PAUSED" } else { "LIVE" };
    let status_color = if app.paused { Color::Yellow } else { Color::Green };

    let title = Line::from(vec![
        Span::styled("MERIDIAN ORDERBOOK VIEWER", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(format!(" | {symbol} | ")),
        Span::styled(status, Style::default().fg(status_color).add_modifier(Modifier::BOLD)),
    ]);

    let info = Line::from(vec![
        Span::raw("Ticks: "),
        Span::styled(format!("{}", app.tick_count), Style::default().fg(Color::White)),
        Span::raw(" | Mid: $"),
        Span::styled(
            mid.map(|m| format!("{m:.2}")).unwrap_or_else(|| "-".to_string()),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(" | Spread: $"),
        Span::styled(
            spread.map(|s| format!("{s:.2}")).unwrap_or_else(|| "-".to_string()),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    let block = Block::default().borders(Borders::ALL).style(Style::default().fg(Color::White));
    let paragraph = Paragraph::new(vec![title, info]).block(block).alignment(Alignment::Center);
    f.render_widget(paragraph, area);
}

fn render_orderbook(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    let snapshot = app.book.snapshot(5);
    render_ladder(f, chunks[0], &snapshot);
    if app.show_metrics {
        render_metrics(f, chunks[1], app, &snapshot);
    }
}

fn render_ladder(f: &mut Frame, area: Rect, snapshot: &BookSnapshot) {
    let max_size = snapshot
        .bids
        .iter()
        .chain(snapshot.asks.iter())
        .map(|(_, qty)| *qty)
        .max()
        .unwrap_or(Decimal::ONE);

    let mut items = Vec::new();

    for (price, qty) in snapshot.asks.iter().rev() {
        let bar = create_bar(*qty, max_size, 20);
        items.push(ListItem::new(Line::from(vec![
            Span::styled("ASK ", Style::default().fg(Color::Red)),
            Span::styled(format!("{price:>10.2}"), Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(bar, Style::default().fg(Color::Red)),
            Span::raw("  "),
            Span::styled(format!("{qty:.4}"), Style::default().fg(Color::White)),
        ])));
    }

    let mid_line = match (snapshot.bids.first(), snapshot.asks.first()) {
        (Some((bid, _)), Some((ask, _))) => format!(" MID: ${:.2} ", (bid + ask) / Decimal::new(2, 0)),
        _ => " MID: - ".to_string(),
    };
    items.push(ListItem::new(Line::from(vec![
        Span::raw("─────"),
        Span::styled(mid_line, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Span::raw("─────"),
    ])));

    for (price, qty) in &snapshot.bids {
        let bar = create_bar(*qty, max_size, 20);
        items.push(ListItem::new(Line::from(vec![
            Span::styled("BID ", Style::default().fg(Color::Green)),
            Span::styled(format!("{price:>10.2}"), Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(bar, Style::default().fg(Color::Green)),
            Span::raw("  "),
            Span::styled(format!("{qty:.4}"), Style::default().fg(Color::White)),
        ])));
    }

    let list = List::new(items)
        .block(
            Block::default()
                .title("Orderbook Ladder (Top 5 Levels)")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White)),
        )
        .style(Style::default().fg(Color::White));

    f.render_widget(list, area);
}

fn render_metrics(f: &mut Frame, area: Rect, app: &App, snapshot: &BookSnapshot) {
    let bid_total: Decimal = snapshot.bids.iter().map(|(_, q)| *q).sum();
    let ask_total: Decimal = snapshot.asks.iter().map(|(_, q)| *q).sum();
    let total = bid_total + ask_total;
    let imbalance_pct = if total.is_zero() {
        Decimal::ZERO
    } else {
        (bid_total - ask_total) / total * Decimal::new(100, 0)
    };

    let (imbalance_text, imbalance_color) = if imbalance_pct > Decimal::new(10, 0) {
        ("Buy Pressure \u{2191}", Color::Green)
    } else if imbalance_pct < Decimal::new(-10, 0) {
        ("Sell Pressure \u{2193}", Color::Red)
    } else {
        ("Balanced", Color::Yellow)
    };

    let text = vec![
        Line::from(vec![Span::styled("MARKET DEPTH", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))]),
        Line::from(""),
        Line::from(vec![
            Span::raw("Bid Levels: "),
            Span::styled(format!("{}", snapshot.bids.len()), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::raw("Ask Levels: "),
            Span::styled(format!("{}", snapshot.asks.len()), Style::default().fg(Color::Red)),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled("IMBALANCE", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))]),
        Line::from(vec![Span::styled(imbalance_text, Style::default().fg(imbalance_color))]),
        Line::from(vec![
            Span::raw("Value: "),
            Span::styled(format!("{imbalance_pct:+.1}%"), Style::default().fg(imbalance_color)),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled("STATISTICS", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))]),
        Line::from(vec![
            Span::raw("Updates: "),
            Span::styled(format!("{}", app.tick_count), Style::default().fg(Color::White)),
        ]),
    ];

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .title("Metrics")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White)),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let controls = Line::from(vec![
        Span::styled("Controls: ", Style::default().fg(Color::Cyan)),
        Span::raw("[Q]uit "),
        Span::raw("[P]ause "),
        Span::raw("[M]etrics "),
        Span::raw("[R]eset"),
    ]);
    let paragraph = Paragraph::new(controls).block(Block::default().borders(Borders::ALL)).alignment(Alignment::Center);
    f.render_widget(paragraph, area);
}

fn create_bar(size: Decimal, max_size: Decimal, width: usize) -> String {
    if max_size.is_zero() {
        return " ".repeat(width);
    }
    let ratio: f64 = (size / max_size).to_f64().unwrap_or(0.0);
    let filled = ((ratio * width as f64) as usize).min(width);
    let mut bar = String::with_capacity(width);
    for i in 0..width {
        bar.push(if i < filled { '\u{2588}' } else { '\u{2591}' });
    }
    bar
}
