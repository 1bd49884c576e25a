use std::io;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table,
        Wrap,
    },
    Frame, Terminal,
};

use crate::daily::{daily_forecast, DailyForecast};
use crate::openweather::current::CurrentConditions;
use crate::state::{AppState, Msg, Notice, Screen, Search};
use crate::units::direction::degree_to_compass;
use crate::units::temperature::format_celsius;
use crate::units::time::timestamp_to_local_time;
use crate::worker::Worker;

const MISSING: &str = "--";
const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, PartialEq)]
pub enum Action {
    Quit,
    Send(Msg),
}

pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    state: &mut AppState,
    worker: &Worker,
    rx: &Receiver<Msg>,
) -> io::Result<()> {
    send(state, worker, Msg::InitialLoad);
    loop {
        let today = Local::now().date_naive();
        terminal.draw(|f| ui(f, state, today))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match handle_key(state, key) {
                        Some(Action::Quit) => return Ok(()),
                        Some(Action::Send(msg)) => send(state, worker, msg),
                        None => {}
                    }
                }
            }
        }

        while let Ok(msg) = rx.try_recv() {
            send(state, worker, msg);
        }
    }
}

fn send(state: &mut AppState, worker: &Worker, msg: Msg) {
    for command in state.update(msg) {
        worker.dispatch(command);
    }
}

/// Maps a key press to an action for the current screen.
pub fn handle_key(state: &AppState, key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }

    // notices are only drawn over the ready screen
    if state.notice.is_some() && state.screen == Screen::Ready {
        return match key.code {
            KeyCode::Esc | KeyCode::Enter => Some(Action::Send(Msg::DismissNotice)),
            _ => None,
        };
    }

    match state.screen {
        Screen::Loading => match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            _ => None,
        },
        Screen::Error(_) => match key.code {
            KeyCode::Char('r') => Some(Action::Send(Msg::Retry)),
            KeyCode::Char('q') => Some(Action::Quit),
            _ => None,
        },
        Screen::Ready => ready_key(&state.search, key, ctrl),
    }
}

fn ready_key(search: &Search, key: KeyEvent, ctrl: bool) -> Option<Action> {
    let msg = match key.code {
        KeyCode::Char('l') if ctrl => Msg::UseCurrentLocation,
        KeyCode::Char(_) if ctrl => return None,
        KeyCode::Char(c) => {
            let mut query = search.query.clone();
            query.push(c);
            Msg::SearchChanged(query)
        }
        KeyCode::Backspace if !search.query.is_empty() => {
            let mut query = search.query.clone();
            query.pop();
            Msg::SearchChanged(query)
        }
        KeyCode::Esc if !search.query.is_empty() => Msg::ClearSearch,
        KeyCode::Down if !search.suggestions.is_empty() => Msg::HighlightNext,
        KeyCode::Up if !search.suggestions.is_empty() => Msg::HighlightPrevious,
        KeyCode::Enter if !search.suggestions.is_empty() => {
            Msg::SelectSuggestion(search.highlighted)
        }
        _ => return None,
    };
    Some(Action::Send(msg))
}

fn panel<'a>(title: &'a str) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(title, Style::default().fg(Color::Yellow)))
        .title_alignment(Alignment::Left)
        .border_style(Style::default().fg(Color::Cyan))
        .border_type(BorderType::Rounded)
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn display_loading(f: &mut Frame) {
    let area = centered(f.area(), 30, 3);
    let text = Paragraph::new(Line::from(Span::styled(
        "Loading data...",
        Style::default().fg(Color::Cyan),
    )))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).border_type(BorderType::Rounded));
    f.render_widget(text, area);
}

fn display_error(f: &mut Frame, message: &str) {
    let area = centered(f.area(), 60, 7);
    let text = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("Error: {message}"),
            Style::default().fg(Color::Red),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "[r] Retry",
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            ),
            Span::raw("   [q] Quit"),
        ]),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(panel(" Error "));
    f.render_widget(text, area);
}

fn display_search(f: &mut Frame, area: Rect, search: &Search, locating: bool) {
    let location_hint = if locating {
        Span::styled(" Getting... ", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(" [Ctrl-L] current location ", Style::default().fg(Color::Gray))
    };
    let mut block = panel(" Search ").title_bottom(location_hint.into_right_aligned_line());
    if search.loading {
        let searching = Span::styled(" Searching... ", Style::default().fg(Color::DarkGray));
        block = block.title(searching.into_right_aligned_line());
    }

    let text = if search.query.is_empty() {
        Line::from(Span::styled(
            " Search for a city...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(format!(" {}", search.query))
    };
    f.render_widget(Paragraph::new(text).block(block), area);

    let typed = u16::try_from(search.query.chars().count()).unwrap_or(u16::MAX);
    let cursor_x = area.x.saturating_add(2).saturating_add(typed);
    f.set_cursor_position((cursor_x.min(area.right().saturating_sub(2)), area.y + 1));
}

fn display_suggestions(f: &mut Frame, area: Rect, search: &Search) {
    let items: Vec<ListItem> = search
        .suggestions
        .iter()
        .map(|place| {
            let mut lines = vec![Line::from(Span::styled(
                place.label(),
                Style::default().add_modifier(Modifier::BOLD),
            ))];
            if let Some(local) = place.local_name() {
                lines.push(Line::from(Span::styled(
                    format!("  {local}"),
                    Style::default().fg(Color::Gray),
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    let title = format!(" Found {} location(s): ", search.suggestions.len());
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(title, Style::default().fg(Color::Blue)))
                .border_style(Style::default().fg(Color::Blue))
                .border_type(BorderType::Rounded),
        )
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan))
        .highlight_symbol("> ");

    let mut list_state = ListState::default().with_selected(Some(search.highlighted));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn suggestion_height(search: &Search) -> u16 {
    let lines: usize = search
        .suggestions
        .iter()
        .map(|place| if place.local_name().is_some() { 2 } else { 1 })
        .sum();
    lines as u16 + 2
}

fn display_current_conditions(current: &CurrentConditions) -> Table {
    let mut rows = vec![Row::new(vec![Cell::from("")])];

    let (glyph, description) = match current.condition() {
        Some(cond) => (cond.glyph(), cond.description.clone()),
        None => ("", MISSING.to_string()),
    };
    rows.push(Row::new(vec![
        Cell::from(format!(" {}, {}", current.name, current.sys.country))
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Cell::from(format!("{glyph} {description}")).style(Style::default().fg(Color::Green)),
    ]));
    rows.push(Row::new(vec![Cell::from("")]));

    let wind = match current.wind.deg {
        Some(deg) => format!("{} m/s ({})", current.wind.speed, degree_to_compass(deg)),
        None => format!("{} m/s", current.wind.speed),
    };
    let details = [
        ("Temperature", format!("{}°C", format_celsius(current.main.temp))),
        ("Feels like", format!("{}°C", format_celsius(current.main.feels_like))),
        ("Humidity", format!("{}%", current.main.humidity)),
        ("Wind speed", wind),
        ("Sunrise", timestamp_to_local_time(current.sys.sunrise)),
        ("Sunset", timestamp_to_local_time(current.sys.sunset)),
    ];
    for (label, value) in details {
        rows.push(Row::new(vec![
            Cell::from(format!(" {label}")),
            Cell::from(value).style(Style::default().fg(Color::Green)),
        ]));
    }

    Table::new(rows, [Constraint::Length(24), Constraint::Min(15)])
        .block(panel(" Current Conditions "))
}

fn display_forecast<'a>(day: &DailyForecast, today: NaiveDate) -> Vec<Line<'a>> {
    let sample = day.sample;
    let (glyph, description) = match sample.condition() {
        Some(cond) => (cond.glyph(), cond.description.clone()),
        None => ("", MISSING.to_string()),
    };
    vec![
        Line::from(""),
        Line::from(vec![
            Span::raw(" "),
            Span::styled(
                day.label(today),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::raw(format!(" {glyph:2} ")),
            Span::styled(
                format!("{}°", format_celsius(sample.main.temp_max)),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" / "),
            Span::styled(
                format!("{}°", format_celsius(sample.main.temp_min)),
                Style::default().fg(Color::Green),
            ),
            Span::raw("  "),
            Span::styled(description, Style::default().fg(Color::Gray)),
        ]),
    ]
}

fn display_notice(f: &mut Frame, notice: &Notice) {
    let area = centered(f.area(), 50, 6);
    let text = Paragraph::new(vec![
        Line::from(""),
        Line::from(notice.message.clone()),
        Line::from(""),
        Line::from(Span::styled("[Enter] OK", Style::default().fg(Color::Blue))),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                format!(" {} ", notice.title),
                Style::default().fg(Color::Red),
            ))
            .border_style(Style::default().fg(Color::Red))
            .border_type(BorderType::Rounded),
    );
    f.render_widget(Clear, area);
    f.render_widget(text, area);
}

pub fn ui(f: &mut Frame, state: &AppState, today: NaiveDate) {
    match state.screen {
        Screen::Loading => return display_loading(f),
        Screen::Error(ref message) => return display_error(f, message),
        Screen::Ready => {}
    }

    let search = &state.search;
    let suggestions = if search.suggestions.is_empty() {
        0
    } else {
        suggestion_height(search)
    };
    let vert_layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(suggestions),
            Constraint::Min(0),
        ])
        .split(f.area());

    display_search(f, vert_layout[0], search, state.locating);
    if suggestions > 0 {
        display_suggestions(f, vert_layout[1], search);
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(vert_layout[2]);

    if let Some(ref weather) = state.weather {
        f.render_widget(display_current_conditions(&weather.current), chunks[0]);

        let days = daily_forecast(&weather.forecast.list, &Local);
        if !days.is_empty() {
            let items: Vec<ListItem> = days
                .iter()
                .map(|day| ListItem::new(display_forecast(day, today)))
                .collect();
            f.render_widget(List::new(items).block(panel(" 5-Day Forecast ")), chunks[1]);
        }
    }

    if let Some(ref notice) = state.notice {
        display_notice(f, notice);
    }
}
