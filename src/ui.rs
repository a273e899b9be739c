use crate::tracker::Tracker;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::{io, time::Duration};

const TICK: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthField {
    #[default]
    Email,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Browse,
    Title,
    Description,
}

/// Screen-only state: what is being typed and where the cursor is.
#[derive(Debug, Default)]
pub struct Ui {
    pub email: String,
    pub password: String,
    pub auth_field: AuthField,
    pub registering: bool,
    pub focus: Focus,
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, tracker: &mut Tracker) -> io::Result<()> {
    let mut ui = Ui::default();
    loop {
        tracker.refresh();
        terminal.draw(|f| draw(f, &ui, tracker))?;

        if !event::poll(TICK)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && handle_key(&mut ui, tracker, key) {
                return Ok(());
            }
        }
    }
}

/// Applies one key press. Returns `true` when the user asked to quit.
pub fn handle_key(ui: &mut Ui, tracker: &mut Tracker, key: KeyEvent) -> bool {
    if tracker.user().is_none() {
        return handle_auth_key(ui, tracker, key);
    }
    match ui.focus {
        Focus::Browse => handle_board_key(ui, tracker, key),
        Focus::Title | Focus::Description => {
            handle_form_key(ui, tracker, key);
            false
        }
    }
}

fn handle_auth_key(ui: &mut Ui, tracker: &mut Tracker, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            ui.registering = !ui.registering;
            tracker.auth_error = None;
        }
        KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
            ui.auth_field = match ui.auth_field {
                AuthField::Email => AuthField::Password,
                AuthField::Password => AuthField::Email,
            };
        }
        KeyCode::Enter => {
            let ok = if ui.registering {
                tracker.register(&ui.email, &ui.password)
            } else {
                tracker.sign_in(&ui.email, &ui.password)
            };
            ui.password.clear();
            if ok {
                ui.focus = Focus::Browse;
                ui.auth_field = AuthField::Email;
            }
        }
        KeyCode::Backspace => {
            auth_input(ui).pop();
        }
        KeyCode::Char(c) => auth_input(ui).push(c),
        _ => {}
    }
    false
}

fn auth_input(ui: &mut Ui) -> &mut String {
    match ui.auth_field {
        AuthField::Email => &mut ui.email,
        AuthField::Password => &mut ui.password,
    }
}

fn handle_board_key(ui: &mut Ui, tracker: &mut Tracker, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Left => tracker.shift_selected_date(-1),
        KeyCode::Right => tracker.shift_selected_date(1),
        KeyCode::Char('t') => tracker.set_selected_date(Some(tracker.today())),
        KeyCode::Char('c') => tracker.set_selected_date(None),
        KeyCode::Up => tracker.select_previous(),
        KeyCode::Down => tracker.select_next(),
        KeyCode::Char(' ') | KeyCode::Enter => {
            if let Some(id) = tracker.selected().map(|t| t.id.clone()) {
                tracker.toggle_task(&id);
            }
        }
        KeyCode::Char('d') => {
            if let Some(id) = tracker.selected().map(|t| t.id.clone()) {
                tracker.delete_task(&id);
            }
        }
        KeyCode::Char('a') => ui.focus = Focus::Title,
        KeyCode::Char('L') => {
            tracker.sign_out();
            ui.focus = Focus::Browse;
        }
        _ => {}
    }
    false
}

fn handle_form_key(ui: &mut Ui, tracker: &mut Tracker, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => ui.focus = Focus::Browse,
        KeyCode::Tab => {
            ui.focus = match ui.focus {
                Focus::Title => Focus::Description,
                _ => Focus::Title,
            };
        }
        KeyCode::Enter => {
            tracker.add_task();
            if tracker.error.is_none() {
                ui.focus = Focus::Browse;
            }
        }
        KeyCode::Backspace => {
            form_input(ui, tracker).pop();
        }
        KeyCode::Char(c) => form_input(ui, tracker).push(c),
        _ => {}
    }
}

fn form_input<'a>(ui: &Ui, tracker: &'a mut Tracker) -> &'a mut String {
    match ui.focus {
        Focus::Description => &mut tracker.description,
        _ => &mut tracker.title,
    }
}

pub fn draw(f: &mut Frame, ui: &Ui, tracker: &Tracker) {
    if tracker.user().is_none() {
        draw_auth(f, ui, tracker);
    } else {
        draw_board(f, ui, tracker);
    }
}

fn draw_auth(f: &mut Frame, ui: &Ui, tracker: &Tracker) {
    let area = centered(f.area(), 60, 9);
    let (title, switch) = if ui.registering {
        ("Register", "Switch to Login")
    } else {
        ("Login", "Switch to Register")
    };

    let field = |label: &str, value: String, field: AuthField| {
        let style = if ui.auth_field == field {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::styled(format!("{label:<10}"), style),
            Span::raw(value),
        ])
    };

    let mut lines = vec![
        field("Email", ui.email.clone(), AuthField::Email),
        field("Password", "*".repeat(ui.password.chars().count()), AuthField::Password),
        Line::default(),
    ];
    if let Some(error) = &tracker.auth_error {
        lines.push(Line::styled(error.clone(), Style::default().fg(Color::Red)));
    }
    lines.push(Line::raw(format!(
        "[Enter] {title}  [Tab] Next field  [Ctrl-R] {switch}  [Esc] Quit"
    )));

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(paragraph, area);
}

fn draw_board(f: &mut Frame, ui: &Ui, tracker: &Tracker) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Length(4),
            Constraint::Min(3),
        ])
        .split(f.area());

    let email = tracker.user().map(|u| u.email.as_str()).unwrap_or_default();
    let header = Paragraph::new(Line::from(vec![
        Span::raw(format!("Signed in as {email}  ")),
        Span::styled("[L] Logout  [q] Quit", Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().title("Task Tracker").borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    let date = tracker
        .selected_date
        .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string());
    let mut status = vec![Line::from(vec![
        Span::raw("Select Date: "),
        Span::styled(date, Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            "  [←/→] Day  [t] Today  [c] Clear",
            Style::default().fg(Color::DarkGray),
        ),
    ])];
    if let Some(error) = &tracker.error {
        status.push(Line::styled(error.clone(), Style::default().fg(Color::Red)));
    }
    f.render_widget(Paragraph::new(status), chunks[1]);

    draw_form(f, ui, tracker, chunks[2]);
    draw_tasks(f, tracker, chunks[3]);
}

fn draw_form(f: &mut Frame, ui: &Ui, tracker: &Tracker, area: Rect) {
    let editing = ui.focus != Focus::Browse;
    let label = |text: &str, focus: Focus| {
        if ui.focus == focus {
            Span::styled(format!("{text:<13}"), Style::default().fg(Color::Cyan))
        } else {
            Span::raw(format!("{text:<13}"))
        }
    };
    let lines = vec![
        Line::from(vec![label("Task Title", Focus::Title), Span::raw(&tracker.title)]),
        Line::from(vec![
            label("Description", Focus::Description),
            Span::raw(&tracker.description),
        ]),
    ];
    let title = if editing {
        "Add Task  [Tab] Switch  [Enter] Add  [Esc] Done"
    } else {
        "Add Task  [a] Edit"
    };
    let form = Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(if editing {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            }),
    );
    f.render_widget(form, area);
}

fn draw_tasks(f: &mut Frame, tracker: &Tracker, area: Rect) {
    let block = Block::default()
        .title("Tasks  [↑/↓] Select  [Space] Complete/Undo  [d] Delete")
        .borders(Borders::ALL);

    if tracker.selected_date.is_none() {
        f.render_widget(block, area);
        return;
    }

    let tasks = tracker.visible_tasks();
    if tasks.is_empty() {
        let empty = Paragraph::new("No tasks for today!")
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let today = tracker.today();
    let items: Vec<ListItem> = tasks
        .iter()
        .map(|t| {
            let title_style = if t.completed {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            };
            let action = if t.completed { "Undo" } else { "Complete" };
            ListItem::new(Text::from(vec![
                Line::from(vec![
                    Span::styled(&t.title, title_style),
                    Span::styled(format!("  [{action}]"), Style::default().fg(Color::DarkGray)),
                ]),
                Line::raw(format!("  {}", t.description)),
                Line::raw(format!("  Created on: {}", t.date.format("%Y-%m-%d"))),
                Line::raw(format!(
                    "  Days spent on this task: {}",
                    t.shown_days(today)
                )),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(Color::Cyan))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(tracker.selected_task));
    f.render_stateful_widget(list, area, &mut state);
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
