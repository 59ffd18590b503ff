use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Paragraph},
    Frame,
};
use rust_decimal::prelude::ToPrimitive;

use super::{render_empty, titled_block};
use crate::calendar::format_display_date;
use crate::insights::Insights;
use crate::models::Expense;
use crate::ui::app::App;
use crate::ui::theme::Palette;
use crate::ui::util::{format_amount, format_percent, format_rupees, truncate};

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let p = app.palette();
    let Some(insights) = app.state.insights.as_ref() else {
        render_empty(f, area, p, "Insights", &["Insights unavailable", "Press r to retry"]);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    render_figures(f, chunks[0], p, insights);
    render_top_categories(f, chunks[1], p, insights);
}

fn figure(p: &Palette, label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {label:<24}"), p.title_style()),
        Span::styled(value, p.normal_style().add_modifier(Modifier::BOLD)),
    ])
}

fn expense_line(expense: Option<&Expense>) -> String {
    match expense {
        Some(e) => format!(
            "{} {} ({})",
            format_amount(e.amount),
            truncate(&e.note, 20),
            format_display_date(e.date)
        ),
        None => "-".to_string(),
    }
}

fn render_figures(f: &mut Frame, area: Rect, p: &Palette, insights: &Insights) {
    let change = insights.monthly_change;
    let change_color = if change > 0.0 { p.red } else { p.green };
    let arrow = if change > 0.0 { "▲" } else if change < 0.0 { "▼" } else { "=" };

    let lines = vec![
        Line::from(""),
        figure(p, "This month", format_amount(insights.this_month_total)),
        figure(p, "Last month", format_amount(insights.last_month_total)),
        Line::from(vec![
            Span::styled(format!("  {:<24}", "Change"), p.title_style()),
            Span::styled(
                format!("{arrow} {}", format_percent(change.abs())),
                Style::default().fg(change_color).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        figure(p, "Daily average", format_amount(insights.daily_average)),
        figure(p, "Projected month total", format_amount(insights.projected_total)),
        Line::from(""),
        figure(p, "Transactions", insights.count.to_string()),
        figure(p, "Average per transaction", format_amount(insights.average_per_transaction)),
        figure(p, "Highest", expense_line(insights.highest.as_ref())),
        figure(p, "Lowest", expense_line(insights.lowest.as_ref())),
    ];

    let widget = Paragraph::new(lines).block(titled_block(p, format!("Insights for {}", insights.month)));
    f.render_widget(widget, area);
}

fn render_top_categories(f: &mut Frame, area: Rect, p: &Palette, insights: &Insights) {
    if insights.top_categories.is_empty() {
        render_empty(f, area, p, "Top Categories", &["No spending this month"]);
        return;
    }

    let bars: Vec<Bar> = insights
        .top_categories
        .iter()
        .map(|(name, amount)| {
            Bar::default()
                .value(amount.round().to_u64().unwrap_or(0))
                .label(Line::from(truncate(name, 14)))
                .text_value(format_rupees(*amount))
                .style(Style::default().fg(p.yellow))
                .value_style(Style::default().fg(p.header_bg).bg(p.yellow))
        })
        .collect();

    let chart = BarChart::default()
        .block(titled_block(p, "Top Categories"))
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(1)
        .label_style(p.normal_style());
    f.render_widget(chart, area);
}
