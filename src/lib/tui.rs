use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::Constraint,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
};
use std::io;

use crate::lib::output::ResourceRow;

/// Interactive table of resources; returns when the user quits
pub fn display_resource_table(title: &str, namespaced: bool, data: Vec<ResourceRow>) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, title, namespaced, data);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn headers(namespaced: bool) -> Vec<&'static str> {
    let mut headers = vec!["Name", "Resource Version", "Age"];
    if namespaced {
        headers.insert(0, "Namespace");
    }
    headers
}

fn cells(row: &ResourceRow, namespaced: bool) -> Vec<String> {
    let mut cells = vec![row.name.clone(), row.resource_version.clone(), row.age.clone()];
    if namespaced {
        cells.insert(0, row.namespace.clone());
    }
    cells
}

/// Selection after moving one row through `len` rows, wrapping at both ends
fn step_selection(selected: Option<usize>, len: usize, forward: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match selected {
        Some(i) if forward => (i + 1) % len,
        Some(0) => len - 1,
        Some(i) => i - 1,
        None => 0,
    })
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    title: &str,
    namespaced: bool,
    data: Vec<ResourceRow>,
) -> io::Result<()> {
    let mut state = TableState::default();
    state.select(step_selection(None, data.len(), true));
    let title = format!(" {} ({}) (Press 'q' to quit) ", title, data.len());

    loop {
        terminal.draw(|f| {
            let area = f.area();

            let header_cells = headers(namespaced).into_iter().map(|h| {
                Cell::from(h).style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
            });
            let header = Row::new(header_cells)
                .style(Style::default().bg(Color::DarkGray))
                .height(1);

            let rows = data
                .iter()
                .map(|item| Row::new(cells(item, namespaced).into_iter().map(Cell::from)).height(1));

            let widths = if namespaced {
                vec![
                    Constraint::Percentage(25),
                    Constraint::Percentage(45),
                    Constraint::Percentage(18),
                    Constraint::Percentage(12),
                ]
            } else {
                vec![
                    Constraint::Percentage(60),
                    Constraint::Percentage(25),
                    Constraint::Percentage(15),
                ]
            };

            let table = Table::new(rows, widths)
                .header(header)
                .block(Block::default().borders(Borders::ALL).title(title.as_str()))
                .row_highlight_style(Style::default().bg(Color::DarkGray))
                .highlight_symbol(">> ");

            f.render_stateful_widget(table, area, &mut state);
        })?;

        // Handle input
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => {
                        state.select(step_selection(state.selected(), data.len(), true));
                    }
                    KeyCode::Up | KeyCode::Char('k') => {
                        state.select(step_selection(state.selected(), data.len(), false));
                    }
                    _ => {}
                }
            }
        }
    }
}
