use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Frame,
};

use super::app::{App, InputMode, Screen};
use super::commands;
use super::screens;
use super::util::truncate;

pub(crate) fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Tab bar
            Constraint::Min(5),    // Main content
            Constraint::Length(1), // Status bar
            Constraint::Length(1), // Command bar
        ])
        .split(f.area());

    render_tab_bar(f, chunks[0], app);
    match app.form.as_ref() {
        Some(form) if form.kind.is_auth() => screens::forms::render_auth(f, chunks[1], app, form),
        _ => render_screen(f, chunks[1], app),
    }
    render_status_bar(f, chunks[2], app);
    render_command_bar(f, chunks[3], app);

    if let Some(form) = app.form.as_ref().filter(|form| !form.kind.is_auth()) {
        screens::forms::render_popup(f, chunks[1], app, form);
    }
    render_toasts(f, chunks[1], app);

    if app.show_help {
        render_help_overlay(f, f.area(), app);
    }
}

fn render_tab_bar(f: &mut Frame, area: Rect, app: &App) {
    let p = app.palette();
    if !app.is_signed_in() {
        let title = Paragraph::new(Line::from(Span::styled(
            " Expense Tracker ",
            Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
        )))
        .style(Style::default().bg(p.header_bg));
        f.render_widget(title, area);
        return;
    }

    let titles: Vec<Line> = Screen::all()
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let num = format!("{}", i + 1);
            if *s == app.screen {
                Line::from(vec![
                    Span::styled(format!("{num}:"), Style::default().fg(p.text_dim)),
                    Span::styled(
                        format!("{s}"),
                        Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
                    ),
                ])
            } else {
                Line::from(Span::styled(
                    format!("{num}:{s}"),
                    Style::default().fg(p.text_dim),
                ))
            }
        })
        .collect();

    let tabs = Tabs::new(titles)
        .divider(Span::styled(" | ", Style::default().fg(p.overlay)))
        .style(Style::default().bg(p.header_bg));

    f.render_widget(tabs, area);
}

fn render_screen(f: &mut Frame, area: Rect, app: &App) {
    match app.screen {
        Screen::Dashboard => screens::dashboard::render(f, area, app),
        Screen::Analytics => screens::analytics::render(f, area, app),
        Screen::Search => screens::search::render(f, area, app),
        Screen::Insights => screens::insights::render(f, area, app),
        Screen::Types => screens::types::render(f, area, app),
    }
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let p = app.palette();
    let mode_label = format!(" {} ", app.input_mode);
    let mode_bg = match app.input_mode {
        InputMode::Normal => p.accent,
        InputMode::Command | InputMode::Form => p.green,
        InputMode::Search => p.yellow,
        InputMode::Confirm => p.red,
    };
    let mode_style = Style::default()
        .fg(p.header_bg)
        .bg(mode_bg)
        .add_modifier(Modifier::BOLD);

    let info = match app.state.session.user().filter(|_| app.is_signed_in()) {
        Some(user) => format!(
            " [{}] {} | {} | {}",
            user.initial(),
            truncate(&user.display_name(), 24),
            app.screen,
            app.state.month()
        ),
        None => format!(" {}", app.state.session.state()),
    };

    let right = match (app.input_mode, app.screen) {
        (InputMode::Form, _) => " Tab next | Space toggle | Enter submit | Esc cancel ",
        _ if !app.is_signed_in() => " ? help ",
        (_, Screen::Dashboard) => " n add | b budget | D delete | ? help ",
        (_, Screen::Analytics) => " e edit | x billed | c chart | f filter | :save ",
        (_, Screen::Search) => " / type to search | D delete | ? help ",
        (_, Screen::Insights) => " r refresh | ? help ",
        (_, Screen::Types) => " n add | e rename | D delete | ? help ",
    };

    let available = area.width as usize;
    let used = mode_label.chars().count() + info.chars().count() + right.chars().count();
    let pad = available.saturating_sub(used);

    let bar = Paragraph::new(Line::from(vec![
        Span::styled(&mode_label, mode_style),
        Span::styled(&info, p.status_bar_style()),
        Span::styled(" ".repeat(pad), p.status_bar_style()),
        Span::styled(right, p.status_bar_style()),
    ]));
    f.render_widget(bar, area);
}

fn render_command_bar(f: &mut Frame, area: Rect, app: &App) {
    let p = app.palette();
    let (content, cursor_offset) = match app.input_mode {
        InputMode::Command => (
            Line::from(vec![
                Span::styled(":", Style::default().fg(p.accent)),
                Span::styled(&app.command_input, p.command_bar_style()),
            ]),
            Some(1 + app.command_input.chars().count() as u16),
        ),
        InputMode::Search => {
            let found = app.state.search_results();
            let match_info = format!("  ({} matches)", found.count());
            (
                Line::from(vec![
                    Span::styled("/", Style::default().fg(p.yellow)),
                    Span::styled(&app.state.search_term, p.command_bar_style()),
                    Span::styled(match_info, p.dim_style()),
                ]),
                Some(1 + app.state.search_term.chars().count() as u16),
            )
        }
        InputMode::Confirm => (
            Line::from(vec![
                Span::styled(&app.confirm_message, Style::default().fg(p.yellow)),
                Span::styled(" [y/N] ", Style::default().fg(p.red)),
            ]),
            None,
        ),
        InputMode::Normal | InputMode::Form => (
            if app.status_message.is_empty() {
                Line::from(Span::styled(
                    " Press : for commands, / to search, ? for help",
                    p.dim_style(),
                ))
            } else {
                Line::from(Span::styled(&app.status_message, p.command_bar_style()))
            },
            None,
        ),
    };

    let bar = Paragraph::new(content).style(Style::default().bg(p.command_bg));
    f.render_widget(bar, area);

    if let Some(offset) = cursor_offset {
        f.set_cursor_position((area.x + offset, area.y));
    }
}

/// Stacked top-right, newest first.
fn render_toasts(f: &mut Frame, area: Rect, app: &App) {
    let p = app.palette();
    let width = 44.min(area.width.saturating_sub(2));
    let mut y = area.y;
    for toast in app.state.notifier.toasts().take(4) {
        let lines = (toast.message.chars().count() as u16 / width.saturating_sub(4).max(1)) + 1;
        let height = lines + 2;
        if y + height > area.y + area.height {
            break;
        }
        let x = area.x + area.width.saturating_sub(width + 1);
        let rect = Rect::new(x, y, width, height);
        let color = p.level_color(toast.level);

        f.render_widget(Clear, rect);
        let widget = Paragraph::new(Span::styled(&toast.message, Style::default().fg(p.text)))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color))
                    .style(Style::default().bg(p.header_bg)),
            );
        f.render_widget(widget, rect);
        y += height;
    }
}

fn render_help_overlay(f: &mut Frame, area: Rect, app: &App) {
    let p = app.palette();
    let mut help_text = vec![
        Line::from(Span::styled(
            " Expense Tracker Help ",
            Style::default().fg(p.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", p.section_style())),
        Line::from(Span::styled(
            "  j/k or Up/Down   Move cursor           1-5        Switch tabs",
            p.normal_style(),
        )),
        Line::from(Span::styled(
            "  Tab/Shift-Tab    Cycle tabs            g/G        Top/Bottom",
            p.normal_style(),
        )),
        Line::from(Span::styled(
            "  Ctrl-d/u         Page Down/Up          Ctrl-q     Quit",
            p.normal_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Actions", p.section_style())),
        Line::from(Span::styled(
            "  :               Command mode           /          Search (live)",
            p.normal_style(),
        )),
        Line::from(Span::styled(
            "  n               Add expense / type     D          Delete selected",
            p.normal_style(),
        )),
        Line::from(Span::styled(
            "  e (Analytics)   Edit row               x          Toggle billed",
            p.normal_style(),
        )),
        Line::from(Span::styled(
            "  c (Analytics)   Next chart             f          Filter",
            p.normal_style(),
        )),
        Line::from(Span::styled(
            "  F2 / F3 (Sign in) Create account / Forgot password",
            p.normal_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Commands", p.section_style())),
    ];

    // Build command list dynamically from COMMANDS registry
    let mut seen = std::collections::HashSet::new();
    let mut cmd_lines: Vec<(&str, &str)> = Vec::new();
    for (&name, cmd) in commands::COMMANDS.iter() {
        if name.len() <= 1 {
            continue;
        }
        if seen.insert(cmd.description) {
            cmd_lines.push((name, cmd.description));
        }
    }
    cmd_lines.sort_by_key(|(name, _)| *name);
    for (name, desc) in &cmd_lines {
        help_text.push(Line::from(Span::styled(
            format!("  :{name:<14} {desc}"),
            p.normal_style(),
        )));
    }

    help_text.push(Line::from(""));
    help_text.push(Line::from(Span::styled(
        " Press any key to close ",
        Style::default().fg(p.text_dim),
    )));

    // Center the popup, clamped to terminal height
    let popup_height = (help_text.len() as u16 + 2).min(area.height.saturating_sub(2));
    let popup_width = 72.min(area.width.saturating_sub(4));
    let popup_area = centered(area, popup_width, popup_height);

    f.render_widget(Clear, popup_area);
    let help = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(p.accent))
            .style(Style::default().bg(p.header_bg)),
    );
    f.render_widget(help, popup_area);
}

pub(crate) fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
