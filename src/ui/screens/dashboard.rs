use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Gauge, Paragraph, Row, Table},
    Frame,
};
use rust_decimal::Decimal;

use super::{billed_span, expense_cells, render_empty, titled_block};
use crate::budget::BudgetStatus;
use crate::models::BudgetKind;
use crate::ui::app::App;
use crate::ui::util::{format_amount, format_percent, format_rupees};

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Summary cards
            Constraint::Length(8), // Budget gauges
            Constraint::Min(5),    // Recent expenses
        ])
        .split(area);

    render_summary_cards(f, chunks[0], app);
    render_budgets(f, chunks[1], app);
    render_recent(f, chunks[2], app);
}

fn render_summary_cards(f: &mut Frame, area: Rect, app: &App) {
    let p = app.palette();
    let stats = &app.state.stats;
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5])
        .split(area);

    render_card(
        f,
        cards[0],
        app,
        "This Month",
        stats.month_total,
        p.accent,
        format!("{} expenses", stats.month_count),
    );
    render_card(f, cards[1], app, "Billed", stats.billed_total, p.accent, String::new());
    render_card(f, cards[2], app, "Unbilled", stats.unbilled_total, p.yellow, String::new());

    let change = if stats.last_month_total > Decimal::ZERO {
        let diff = stats.month_total - stats.last_month_total;
        let sign = if diff >= Decimal::ZERO { "+" } else { "-" };
        format!("{sign}{} vs this month", format_rupees(diff.abs()))
    } else {
        String::new()
    };
    render_card(f, cards[3], app, "Last Month", stats.last_month_total, p.text, change);
    render_card(f, cards[4], app, "All Time", stats.all_time_total, p.green, String::new());
}

fn render_card(
    f: &mut Frame,
    area: Rect,
    app: &App,
    title: &str,
    amount: Decimal,
    color: Color,
    subtitle: String,
) {
    let p = app.palette();
    let text = Paragraph::new(vec![
        Line::from(Span::styled(
            format_rupees(amount),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(subtitle, p.dim_style())),
    ])
    .centered()
    .block(titled_block(p, title));

    f.render_widget(text, area);
}

fn render_budgets(f: &mut Frame, area: Rect, app: &App) {
    let p = app.palette();
    let Some(display) = app.state.budget.as_ref() else {
        render_empty(f, area, p, "Budgets", &["Budgets unavailable"]);
        return;
    };

    let block = titled_block(p, format!("Budgets for {}", display.month));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3)])
        .split(inner);

    for (kind, rect) in BudgetKind::all().iter().zip(rows.iter()) {
        render_gauge(f, *rect, app, display.status(*kind));
    }
}

fn render_gauge(f: &mut Frame, area: Rect, app: &App, status: &BudgetStatus) {
    let p = app.palette();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    if !status.has_budget() {
        let line = Line::from(vec![
            Span::styled(format!(" {:<10}", status.kind), p.title_style()),
            Span::styled(
                format!("{} spent, no budget set (b to set)", format_amount(status.spent)),
                p.dim_style(),
            ),
        ]);
        f.render_widget(Paragraph::new(line), chunks[0]);
        return;
    }

    let color = p.severity_color(status.severity);
    let remaining = if status.over_budget {
        format!("over by {}", format_amount(-status.remaining))
    } else {
        format!(
            "{} left ({})",
            format_amount(status.remaining),
            format_percent(status.remaining_percent)
        )
    };
    let line = Line::from(vec![
        Span::styled(format!(" {:<10}", status.kind), p.title_style()),
        Span::styled(
            format!(
                "{} of {}  ",
                format_amount(status.spent),
                format_amount(status.budget)
            ),
            p.normal_style(),
        ),
        Span::styled(remaining, Style::default().fg(color)),
    ]);
    f.render_widget(Paragraph::new(line), chunks[0]);

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(color).bg(p.surface))
        .ratio((status.progress / 100.0).clamp(0.0, 1.0))
        .label(Span::styled(
            format_percent(status.used_percent),
            Style::default().fg(p.text).add_modifier(Modifier::BOLD),
        ));
    f.render_widget(gauge, chunks[1]);
}

fn render_recent(f: &mut Frame, area: Rect, app: &App) {
    let p = app.palette();
    if app.state.recent.is_empty() {
        render_empty(
            f,
            area,
            p,
            "Recent Expenses",
            &["No expenses yet", "Press n or use :add to record one"],
        );
        return;
    }

    let header = Row::new(
        ["Date", "Type", "Description", "Amount", "Status"]
            .iter()
            .map(|h| Cell::from(*h).style(p.header_style())),
    );

    let rows: Vec<Row> = app
        .state
        .recent
        .iter()
        .enumerate()
        .map(|(i, expense)| {
            let [date, kind, note, amount] = expense_cells(expense, 40);
            let style = if i == app.recent_index {
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
        .block(titled_block(p, "Recent Expenses"));
    f.render_widget(table, area);
}
