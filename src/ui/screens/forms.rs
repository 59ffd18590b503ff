use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::ui::app::App;
use crate::ui::form::{FieldKind, Form, FormKind};
use crate::ui::render::centered;

const LABEL_WIDTH: usize = 18;

/// Sign-in and its siblings take the whole content area.
pub(crate) fn render_auth(f: &mut Frame, area: Rect, app: &App, form: &Form) {
    let p = app.palette();
    f.render_widget(Block::default().style(Style::default().bg(p.header_bg)), area);

    let mut lines = form_lines(app, form);
    lines.push(Line::from(""));
    let hint = match form.kind {
        FormKind::SignIn => " F2 create account | F3 forgot password | Enter sign in ",
        FormKind::SignUp | FormKind::ForgotPassword => " Esc back to sign in | Enter submit ",
        _ => " Enter save ",
    };
    lines.push(Line::from(Span::styled(hint, p.dim_style())));

    let height = lines.len() as u16 + 2;
    let rect = centered(area, 60, height);
    draw(f, rect, app, form, lines);
}

pub(crate) fn render_popup(f: &mut Frame, area: Rect, app: &App, form: &Form) {
    let lines = form_lines(app, form);
    let height = lines.len() as u16 + 2;
    let rect = centered(area, 64, height);
    f.render_widget(Clear, rect);
    draw(f, rect, app, form, lines);
}

fn draw(f: &mut Frame, rect: Rect, app: &App, form: &Form, lines: Vec<Line<'static>>) {
    let p = app.palette();
    let widget = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(p.accent))
            .title(Span::styled(
                format!(" {} ", form.kind.title()),
                Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
            ))
            .style(Style::default().bg(p.header_bg)),
    );
    f.render_widget(widget, rect);

    // Text cursor at the end of the focused field; row 0 is the blank spacer.
    if let Some(field) = form.focused() {
        if matches!(field.kind, FieldKind::Text | FieldKind::Secret) {
            let row = rect.y + 2 + form.focus as u16;
            let col = rect.x + 3 + LABEL_WIDTH as u16 + field.display().chars().count() as u16;
            if row < rect.y + rect.height.saturating_sub(1) && col < rect.x + rect.width {
                f.set_cursor_position((col, row));
            }
        }
    }
}

fn form_lines(app: &App, form: &Form) -> Vec<Line<'static>> {
    let p = app.palette();
    let mut lines = vec![Line::from("")];
    for (i, field) in form.fields.iter().enumerate() {
        let focused = i == form.focus;
        let marker = if focused { "›" } else { " " };
        let value_style = if focused {
            Style::default().fg(p.text).add_modifier(Modifier::BOLD)
        } else {
            p.normal_style()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker} "), Style::default().fg(p.accent)),
            Span::styled(format!("{:<LABEL_WIDTH$}", field.label), p.title_style()),
            Span::styled(field.display(), value_style),
        ]));
    }

    if let Some(alert) = app.state.notifier.inline() {
        lines.push(Line::from(""));
        for message in alert.message.lines() {
            lines.push(Line::from(Span::styled(
                format!("  {message}"),
                Style::default().fg(p.level_color(alert.level)),
            )));
        }
    }
    lines
}
