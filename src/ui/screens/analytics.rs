use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Cell, Chart, Dataset, GraphType, List, ListItem, Paragraph,
        Row, Table,
    },
    Frame,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::{billed_span, render_empty, titled_block};
use crate::calendar::format_display_date;
use crate::expenses::total;
use crate::models::Expense;
use crate::report::{bubble_points, category_totals, cumulative_daily, ChartKind};
use crate::ui::app::App;
use crate::ui::theme::Palette;
use crate::ui::util::{format_amount, format_percent, format_rupees, truncate};

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // Filter summary
            Constraint::Percentage(45), // Chart
            Constraint::Min(5),         // Records
        ])
        .split(area);

    render_filter_summary(f, chunks[0], app);
    render_chart(f, chunks[1], app);
    render_records(f, chunks[2], app);
}

fn render_filter_summary(f: &mut Frame, area: Rect, app: &App) {
    let p = app.palette();
    let criteria = &app.state.filter.criteria;
    let rows = app.state.filter.rows();
    let range = match (criteria.start, criteria.end) {
        (None, None) => "All dates".to_string(),
        (start, end) => format!(
            "{} → {}",
            start.map(format_display_date).unwrap_or_else(|| "…".into()),
            end.map(format_display_date).unwrap_or_else(|| "…".into())
        ),
    };

    let mut spans = vec![
        Span::styled(format!(" {range}"), p.normal_style()),
        Span::styled(" | ", p.dim_style()),
        Span::styled(criteria.billing.to_string(), p.normal_style()),
        Span::styled(" | ", p.dim_style()),
        Span::styled(
            criteria.expense_type.clone().unwrap_or_else(|| "All types".into()),
            p.normal_style(),
        ),
        Span::styled(" | ", p.dim_style()),
        Span::styled(
            format!("{} records, {}", rows.len(), format_amount(total(rows))),
            Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
        ),
    ];
    let dirty = app.state.edits.dirty_count();
    if dirty > 0 {
        spans.push(Span::styled(
            format!("  {dirty} unsaved (:save)"),
            p.dirty_style(),
        ));
    }

    let summary = Paragraph::new(Line::from(spans)).block(titled_block(p, "Filter (f)"));
    f.render_widget(summary, area);
}

fn render_chart(f: &mut Frame, area: Rect, app: &App) {
    let p = app.palette();
    let rows = app.state.filter.rows();
    let kind = app.state.chart;
    let title = format!("{} [{}] (c next)", kind.title(), kind.label());
    if rows.is_empty() {
        render_empty(f, area, p, &title, &["No expenses match the current filter"]);
        return;
    }

    match kind {
        ChartKind::Line => render_line(f, area, p, rows, &title),
        ChartKind::Bar => render_bars(f, area, p, rows, &title, Direction::Vertical),
        ChartKind::HorizontalBar => render_bars(f, area, p, rows, &title, Direction::Horizontal),
        ChartKind::Doughnut => render_shares(f, area, p, rows, &title),
        ChartKind::Bubble => render_bubbles(f, area, p, rows, &title),
    }
}

fn to_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or(0.0)
}

fn render_line(f: &mut Frame, area: Rect, p: &Palette, rows: &[Expense], title: &str) {
    let series = cumulative_daily(rows);
    let points: Vec<(f64, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, (_, amount))| (i as f64, to_f64(*amount)))
        .collect();
    let max_y = points.iter().map(|(_, y)| *y).fold(0.0, f64::max).max(1.0);
    let max_x = (points.len().saturating_sub(1) as f64).max(1.0);

    let first = series.first().map(|(d, _)| format_display_date(*d)).unwrap_or_default();
    let last = series.last().map(|(d, _)| format_display_date(*d)).unwrap_or_default();
    let top = series.last().map(|(_, a)| format_rupees(*a)).unwrap_or_default();

    let datasets = vec![Dataset::default()
        .name("Cumulative spend")
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(p.accent))
        .data(&points)];

    let chart = Chart::new(datasets)
        .block(titled_block(p, title))
        .x_axis(
            Axis::default()
                .style(p.dim_style())
                .bounds([0.0, max_x])
                .labels([Span::raw(first), Span::raw(last)]),
        )
        .y_axis(
            Axis::default()
                .style(p.dim_style())
                .bounds([0.0, max_y])
                .labels([Span::raw("₹0"), Span::raw(top)]),
        );
    f.render_widget(chart, area);
}

fn render_bars(
    f: &mut Frame,
    area: Rect,
    p: &Palette,
    rows: &[Expense],
    title: &str,
    direction: Direction,
) {
    let totals = category_totals(rows);
    let bars: Vec<Bar> = totals
        .iter()
        .map(|(name, amount)| {
            Bar::default()
                .value(amount.round().to_u64().unwrap_or(0))
                .label(Line::from(truncate(name, 12)))
                .text_value(format_rupees(*amount))
                .style(Style::default().fg(p.accent))
                .value_style(Style::default().fg(p.header_bg).bg(p.accent))
        })
        .collect();

    let mut chart = BarChart::default()
        .block(titled_block(p, title))
        .data(BarGroup::default().bars(&bars))
        .direction(direction)
        .bar_gap(1)
        .label_style(p.normal_style());
    chart = match direction {
        Direction::Vertical => chart.bar_width(12),
        Direction::Horizontal => chart.bar_width(1),
    };
    f.render_widget(chart, area);
}

/// Doughnut slices as share-of-total rows.
fn render_shares(f: &mut Frame, area: Rect, p: &Palette, rows: &[Expense], title: &str) {
    let totals = category_totals(rows);
    let sum = to_f64(total(rows)).max(f64::EPSILON);
    let palette = [p.accent, p.green, p.yellow, p.red, p.text, p.text_dim];

    let items: Vec<ListItem> = totals
        .iter()
        .enumerate()
        .map(|(i, (name, amount))| {
            let share = to_f64(*amount) / sum;
            let color = palette[i % palette.len()];
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {:<16}", truncate(name, 16)), p.normal_style()),
                Span::styled(share_bar(share, 24), Style::default().fg(color)),
                Span::styled(
                    format!(" {:>7}  {}", format_percent(share * 100.0), format_amount(*amount)),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
            ]))
        })
        .collect();

    f.render_widget(List::new(items).block(titled_block(p, title)), area);
}

fn share_bar(ratio: f64, width: usize) -> String {
    let filled = (ratio.clamp(0.0, 1.0) * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

/// Frequency on x, total on y; one dataset per type so the legend names them.
fn render_bubbles(f: &mut Frame, area: Rect, p: &Palette, rows: &[Expense], title: &str) {
    let bubbles = bubble_points(rows);
    let data: Vec<[(f64, f64); 1]> = bubbles
        .iter()
        .map(|b| [(b.count as f64, to_f64(b.total))])
        .collect();
    let max_x = bubbles.iter().map(|b| b.count).max().unwrap_or(1) as f64 + 1.0;
    let max_y = bubbles
        .iter()
        .map(|b| to_f64(b.total))
        .fold(0.0, f64::max)
        .max(1.0)
        * 1.1;
    let colors = [p.accent, p.green, p.yellow, p.red, p.text];

    let datasets: Vec<Dataset> = bubbles
        .iter()
        .zip(data.iter())
        .enumerate()
        .map(|(i, (bubble, point))| {
            let marker = if bubble.radius > 20.0 {
                Marker::Block
            } else {
                Marker::Dot
            };
            Dataset::default()
                .name(format!("{} ({})", bubble.expense_type, bubble.count))
                .marker(marker)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(colors[i % colors.len()]))
                .data(point)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(titled_block(p, title))
        .x_axis(
            Axis::default()
                .title("count")
                .style(p.dim_style())
                .bounds([0.0, max_x])
                .labels([Span::raw("0"), Span::raw(format!("{}", max_x as u64))]),
        )
        .y_axis(
            Axis::default()
                .title("total")
                .style(p.dim_style())
                .bounds([0.0, max_y])
                .labels([Span::raw("₹0"), Span::raw(format!("₹{:.0}", max_y))]),
        );
    f.render_widget(chart, area);
}

fn render_records(f: &mut Frame, area: Rect, app: &App) {
    let p = app.palette();
    let rows = app.state.filter.rows();
    if rows.is_empty() {
        render_empty(
            f,
            area,
            p,
            "Records (0)",
            &["Nothing to show", "Press f to change the filter"],
        );
        return;
    }

    let header = Row::new(
        ["", "Date", "Type", "Description", "Amount", "Status"]
            .iter()
            .map(|h| Cell::from(*h).style(p.header_style())),
    );

    let edits = &app.state.edits;
    let table_rows: Vec<Row> = rows
        .iter()
        .enumerate()
        .skip(app.analytics_scroll)
        .take(area.height.saturating_sub(3) as usize)
        .map(|(i, expense)| {
            let shown = edits.display(expense);
            let dirty = edits.is_dirty(expense.id);
            let marker = if edits.is_editing(expense.id) {
                "✎"
            } else if dirty {
                "*"
            } else {
                " "
            };
            let style = if i == app.analytics_index {
                p.selected_style()
            } else if dirty {
                p.dirty_style()
            } else if i % 2 == 1 {
                p.alt_row_style()
            } else {
                p.normal_style()
            };
            Row::new(vec![
                Cell::from(marker),
                Cell::from(format_display_date(shown.date)),
                Cell::from(truncate(&shown.expense_type, 16)),
                Cell::from(truncate(&shown.note, 40)),
                Cell::from(format_amount(shown.amount)),
                Cell::from(billed_span(p, shown.billed)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(1),
        Constraint::Length(12),
        Constraint::Length(16),
        Constraint::Min(20),
        Constraint::Length(14),
        Constraint::Length(9),
    ];
    let table = Table::new(table_rows, widths)
        .header(header)
        .block(titled_block(p, format!("Records ({})", rows.len())));
    f.render_widget(table, area);
}
