use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table},
    Frame,
};

use super::{billed_span, expense_cells, render_empty, titled_block};
use crate::ui::app::{App, InputMode};
use crate::ui::util::format_amount;

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let p = app.palette();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    let found = app.state.search_results();
    let term = &app.state.search_term;

    let prompt_style = if app.input_mode == InputMode::Search {
        Style::default().fg(p.yellow).add_modifier(Modifier::BOLD)
    } else {
        p.dim_style()
    };
    let query = Paragraph::new(Line::from(vec![
        Span::styled(" / ", prompt_style),
        Span::styled(
            if term.is_empty() {
                "type, description, amount or date".to_string()
            } else {
                term.clone()
            },
            if term.is_empty() {
                p.dim_style()
            } else {
                p.normal_style()
            },
        ),
        Span::styled(
            format!(
                "   {} found, {}",
                found.count(),
                format_amount(found.total)
            ),
            Style::default().fg(p.accent),
        ),
    ]))
    .block(titled_block(p, "Search"));
    f.render_widget(query, chunks[0]);

    if found.rows.is_empty() {
        let message = if term.is_empty() {
            "No expenses recorded yet".to_string()
        } else {
            format!("No expenses matching '{term}'")
        };
        render_empty(f, chunks[1], p, "Results (0)", &[message.as_str(), "Press Esc to clear the search"]);
        return;
    }

    let header = Row::new(
        ["Date", "Type", "Description", "Amount", "Status"]
            .iter()
            .map(|h| Cell::from(*h).style(p.header_style())),
    );
    let rows: Vec<Row> = found
        .rows
        .iter()
        .enumerate()
        .skip(app.search_scroll)
        .take(chunks[1].height.saturating_sub(3) as usize)
        .map(|(i, expense)| {
            let [date, kind, note, amount] = expense_cells(expense, 48);
            let style = if i == app.search_index {
                p.selected_style()
            } else if i % 2 == 1 {
                p.alt_row_style()
            } else {
                p.normal_style()
            };
            Row::new(vec![
                Cell::from(date),
                Cell::from(kind),
                Cell::from(note),
                Cell::from(amount),
                Cell::from(billed_span(p, expense.billed)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(12),
        Constraint::Length(16),
        Constraint::Min(20),
        Constraint::Length(14),
        Constraint::Length(9),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(titled_block(p, format!("Results ({})", found.count())));
    f.render_widget(table, chunks[1]);
}
