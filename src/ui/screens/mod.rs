pub(crate) mod analytics;
pub(crate) mod dashboard;
pub(crate) mod forms;
pub(crate) mod insights;
pub(crate) mod search;
pub(crate) mod types;

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::calendar::format_display_date;
use crate::models::Expense;
use crate::ui::theme::Palette;
use crate::ui::util::{format_amount, truncate};

pub(crate) fn titled_block(p: &Palette, title: impl Into<String>) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(p.border_style())
        .title(Span::styled(
            format!(" {} ", title.into()),
            Style::default().fg(p.text_dim).add_modifier(Modifier::BOLD),
        ))
}

/// Centered dim lines inside a titled block.
pub(crate) fn render_empty(f: &mut Frame, area: Rect, p: &Palette, title: &str, lines: &[&str]) {
    let mut text = vec![Line::from("")];
    for line in lines {
        text.push(Line::from(Span::styled(line.to_string(), p.dim_style())));
        text.push(Line::from(""));
    }
    f.render_widget(
        Paragraph::new(text).centered().block(titled_block(p, title)),
        area,
    );
}

/// Date, type, description and amount cells shared by expense tables.
pub(crate) fn expense_cells(expense: &Expense, note_width: usize) -> [String; 4] {
    [
        format_display_date(expense.date),
        truncate(&expense.expense_type, 16),
        truncate(&expense.note, note_width),
        format_amount(expense.amount),
    ]
}

pub(crate) fn billed_span(p: &Palette, billed: bool) -> Span<'static> {
    if billed {
        Span::styled("Billed", p.billed_style())
    } else {
        Span::styled("Unbilled", p.unbilled_style())
    }
}
