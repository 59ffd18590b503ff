use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::insights::totals_by_type;
use crate::models::Expense;

pub(crate) const MIN_BUBBLE_RADIUS: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ChartKind {
    #[default]
    Line,
    Bar,
    HorizontalBar,
    Doughnut,
    Bubble,
}

impl ChartKind {
    pub(crate) fn all() -> &'static [ChartKind] {
        &[
            Self::Line,
            Self::Bar,
            Self::HorizontalBar,
            Self::Doughnut,
            Self::Bubble,
        ]
    }

    pub(crate) fn title(&self) -> &'static str {
        match self {
            Self::Line => "Expenses Over Time",
            Self::Bar | Self::HorizontalBar | Self::Doughnut => "Expenses by Type",
            Self::Bubble => "Expense Types by Amount & Frequency",
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Bar => "bar",
            Self::HorizontalBar => "hbar",
            Self::Doughnut => "doughnut",
            Self::Bubble => "bubble",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "line" => Some(Self::Line),
            "bar" => Some(Self::Bar),
            "hbar" | "horizontal" | "horizontalbar" => Some(Self::HorizontalBar),
            "doughnut" | "pie" => Some(Self::Doughnut),
            "bubble" => Some(Self::Bubble),
            _ => None,
        }
    }

    pub(crate) fn next(&self) -> Self {
        let all = Self::all();
        let idx = all.iter().position(|k| k == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }
}

/// Sum by type, first-seen order.
pub(crate) fn category_totals(records: &[Expense]) -> Vec<(String, Decimal)> {
    totals_by_type(records)
}

/// Running total per day, ascending by date.
pub(crate) fn cumulative_daily(records: &[Expense]) -> Vec<(NaiveDate, Decimal)> {
    let mut daily: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for e in records {
        *daily.entry(e.date).or_default() += e.amount;
    }
    let mut running = Decimal::ZERO;
    daily
        .into_iter()
        .map(|(date, amount)| {
            running += amount;
            (date, running)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BubblePoint {
    pub(crate) expense_type: String,
    /// x: number of transactions
    pub(crate) count: usize,
    /// y: total amount
    pub(crate) total: Decimal,
    pub(crate) radius: f64,
}

pub(crate) fn bubble_radius(total: Decimal) -> f64 {
    let total = total.to_f64().unwrap_or_default().max(0.0);
    (total.sqrt() * 0.5).max(MIN_BUBBLE_RADIUS)
}

pub(crate) fn bubble_points(records: &[Expense]) -> Vec<BubblePoint> {
    let mut points: Vec<BubblePoint> = Vec::new();
    for e in records {
        match points.iter_mut().find(|p| p.expense_type == e.expense_type) {
            Some(p) => {
                p.count += 1;
                p.total += e.amount;
            }
            None => points.push(BubblePoint {
                expense_type: e.expense_type.clone(),
                count: 1,
                total: e.amount,
                radius: 0.0,
            }),
        }
    }
    for p in &mut points {
        p.radius = bubble_radius(p.total);
    }
    points
}
