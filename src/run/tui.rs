use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::Config;
use crate::db::Database;
use crate::launch::LaunchParams;
use crate::state::AppState;
use crate::ui::app::{App, InputMode, Screen};
use crate::ui::commands;
use crate::ui::form::{self, FormKind};
use crate::ui::util::{scroll_down, scroll_to_bottom, scroll_to_top, scroll_up};

/// Redraw cadence while idle; toasts expire and auth events land between keys.
const TICK: Duration = Duration::from_millis(250);

pub(crate) fn as_tui(db: &mut Database, config: &Config, launch: LaunchParams) -> Result<()> {
    let mut state = AppState::new(launch, config.export_dir.clone());
    state.start(db);
    let mut app = App::new(state);
    info!(signed_in = app.is_signed_in(), "tui started");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, db);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(ref e) = result {
        eprintln!("Error: {e:?}");
    }

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    db: &mut Database,
) -> Result<()> {
    while app.running {
        terminal.draw(|f| {
            let content = f.area().height.saturating_sub(3);
            // Rows left for the selectable table after headers and borders.
            let rows = match app.screen {
                Screen::Analytics => (content.saturating_sub(3) * 55 / 100).saturating_sub(3),
                Screen::Search => content.saturating_sub(6),
                Screen::Dashboard => content.saturating_sub(16),
                Screen::Insights | Screen::Types => content.saturating_sub(2),
            };
            app.visible_rows = (rows as usize).max(1);
            crate::ui::render::render(f, app);
        })?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                handle_key(key, app, db)?;
            }
        }

        app.state.tick(db, Instant::now());
        app.state.drain_events(db);
        app.sync_session();
    }
    Ok(())
}

fn handle_key(key: KeyEvent, app: &mut App, db: &mut Database) -> Result<()> {
    if app.show_help {
        app.show_help = false;
        return Ok(());
    }
    match app.input_mode {
        InputMode::Normal => handle_normal_input(key, app, db)?,
        InputMode::Command => handle_command_input(key, app, db)?,
        InputMode::Search => handle_search_input(key, app),
        InputMode::Form => handle_form_input(key, app, db),
        InputMode::Confirm => handle_confirm_input(key, app, db),
    }
    app.sync_session();
    Ok(())
}

// ── Input handlers ───────────────────────────────────────────

fn handle_normal_input(key: KeyEvent, app: &mut App, db: &mut Database) -> Result<()> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char(':') => {
            app.input_mode = InputMode::Command;
            app.command_input.clear();
        }
        KeyCode::Char('q') | KeyCode::Char('c') if ctrl => {
            app.running = false;
        }
        KeyCode::Char('?') => app.show_help = true,
        _ if !app.is_signed_in() => {}
        KeyCode::Char('/') => {
            if app.switch_screen(db, Screen::Search) {
                app.input_mode = InputMode::Search;
            }
        }
        KeyCode::Char('s') if ctrl => {
            app.state.save_edits(&*db);
            app.clamp_cursors();
        }
        KeyCode::Char('d') if ctrl => handle_page(app, true),
        KeyCode::Char('u') if ctrl => handle_page(app, false),
        KeyCode::Char('j') | KeyCode::Down => handle_move_down(app),
        KeyCode::Char('k') | KeyCode::Up => handle_move_up(app),
        KeyCode::Char('g') | KeyCode::Home => handle_goto_top(app),
        KeyCode::Char('G') | KeyCode::End => handle_goto_bottom(app),
        KeyCode::Char(c @ '1'..='5') => {
            let idx = (c as usize) - ('1' as usize);
            if let Some(&screen) = Screen::all().get(idx) {
                app.switch_screen(db, screen);
            }
        }
        KeyCode::Tab => {
            let screens = Screen::all();
            let idx = screens.iter().position(|s| *s == app.screen).unwrap_or(0);
            let next = (idx + 1) % screens.len();
            app.switch_screen(db, screens[next]);
        }
        KeyCode::BackTab => {
            let screens = Screen::all();
            let idx = screens.iter().position(|s| *s == app.screen).unwrap_or(0);
            let prev = if idx == 0 { screens.len() - 1 } else { idx - 1 };
            app.switch_screen(db, screens[prev]);
        }
        KeyCode::Char('n') => match app.screen {
            Screen::Types => app.open_form(form::add_type()),
            _ => app.open_add_expense(),
        },
        KeyCode::Char('b') => app.open_budget(),
        KeyCode::Char('D') | KeyCode::Delete => match app.screen {
            Screen::Types => app.request_delete_type(),
            Screen::Insights => {}
            _ => app.request_delete_expense(),
        },
        KeyCode::Char('e') | KeyCode::Enter => match app.screen {
            Screen::Analytics => app.open_edit_selected(),
            Screen::Types => commands::handle_command("type-rename", app, db)?,
            _ => {}
        },
        KeyCode::Char('x') if app.screen == Screen::Analytics => {
            if let Some(expense) = app.selected_expense() {
                app.state.toggle_billed(expense.id);
            }
        }
        KeyCode::Char('c') if app.screen == Screen::Analytics => {
            commands::handle_command("chart", app, db)?;
        }
        KeyCode::Char('f') if app.screen == Screen::Analytics => app.open_filter(),
        KeyCode::Char('r') => commands::handle_command("refresh", app, db)?,
        KeyCode::Esc => {
            if app.screen == Screen::Search && !app.state.search_term.is_empty() {
                app.state.search_term.clear();
                app.search_index = 0;
                app.search_scroll = 0;
            }
            app.status_message.clear();
        }
        _ => {}
    }
    Ok(())
}

fn handle_command_input(key: KeyEvent, app: &mut App, db: &mut Database) -> Result<()> {
    match key.code {
        KeyCode::Enter => {
            let input = app.command_input.clone();
            app.input_mode = InputMode::Normal;
            app.command_input.clear();
            debug!(command = %input, "command");
            commands::handle_command(&input, app, db)?;
            // A command may have left the mode alone or opened a form.
            if app.input_mode == InputMode::Normal && app.form.is_some() {
                app.input_mode = InputMode::Form;
            }
        }
        KeyCode::Esc => {
            app.command_input.clear();
            restore_mode(app);
        }
        KeyCode::Backspace => {
            app.command_input.pop();
            if app.command_input.is_empty() {
                restore_mode(app);
            }
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.command_input.clear();
            restore_mode(app);
        }
        KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let trimmed = app.command_input.trim_end();
            if let Some(pos) = trimmed.rfind(' ') {
                app.command_input.truncate(pos + 1);
            } else {
                app.command_input.clear();
                restore_mode(app);
            }
        }
        KeyCode::Char(c) => {
            app.command_input.push(c);
        }
        _ => {}
    }
    Ok(())
}

/// Back to the form when one is still open underneath.
fn restore_mode(app: &mut App) {
    app.input_mode = if app.form.is_some() {
        InputMode::Form
    } else {
        InputMode::Normal
    };
}

fn handle_search_input(key: KeyEvent, app: &mut App) {
    match key.code {
        KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.state.search_term.clear();
        }
        KeyCode::Backspace => {
            app.state.search_term.pop();
        }
        KeyCode::Char(c) => {
            app.state.search_term.push(c);
        }
        _ => return,
    }
    app.search_index = 0;
    app.search_scroll = 0;
}

fn handle_form_input(key: KeyEvent, app: &mut App, db: &mut Database) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let kind = app.form.as_ref().map(|f| f.kind.clone());
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('c') if ctrl => app.running = false,
        KeyCode::Char(':') if !kind.as_ref().is_some_and(FormKind::is_auth) => {
            app.input_mode = InputMode::Command;
            app.command_input.clear();
        }
        KeyCode::F(2) if kind == Some(FormKind::SignIn) => {
            app.state.notifier.clear();
            app.open_form(form::sign_up());
        }
        KeyCode::F(3) if kind == Some(FormKind::SignIn) => {
            let email = app
                .form
                .as_ref()
                .map(|f| f.value("Email").to_string())
                .unwrap_or_default();
            app.state.notifier.clear();
            app.open_form(form::forgot_password(&email));
        }
        KeyCode::Esc => app.cancel_form(),
        KeyCode::Enter => app.submit_form(db),
        _ => {
            let Some(form) = app.form.as_mut() else {
                return;
            };
            match key.code {
                KeyCode::Tab | KeyCode::Down => form.next_field(),
                KeyCode::BackTab | KeyCode::Up => form.prev_field(),
                KeyCode::Left => form.cycle(-1),
                KeyCode::Right => form.cycle(1),
                KeyCode::Backspace => form.backspace(),
                KeyCode::Char(c) if !ctrl => form.input(c),
                _ => {}
            }
        }
    }
}

fn handle_confirm_input(key: KeyEvent, app: &mut App, db: &mut Database) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_pending(db),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_pending(),
        _ => {}
    }
}

// ── Navigation helpers ───────────────────────────────────────

fn list_len(app: &App) -> usize {
    match app.screen {
        Screen::Dashboard => app.state.recent.len(),
        Screen::Analytics => app.state.filter.rows().len(),
        Screen::Search => app.state.search_results().count(),
        Screen::Types => app.state.types.len(),
        Screen::Insights => 0,
    }
}

/// Run `f` on the current screen's cursor with the list length and page size.
fn with_cursor(app: &mut App, f: impl FnOnce(&mut usize, &mut usize, usize, usize)) {
    let len = list_len(app);
    let page = app.page();
    // The recent list always fits, so it never scrolls.
    let mut fixed = 0;
    let (index, scroll) = match app.screen {
        Screen::Dashboard => (&mut app.recent_index, &mut fixed),
        Screen::Analytics => (&mut app.analytics_index, &mut app.analytics_scroll),
        Screen::Search => (&mut app.search_index, &mut app.search_scroll),
        Screen::Types => (&mut app.type_index, &mut app.type_scroll),
        Screen::Insights => return,
    };
    f(index, scroll, len, page);
}

fn handle_move_down(app: &mut App) {
    with_cursor(app, |index, scroll, len, page| {
        scroll_down(index, scroll, len, page)
    });
}

fn handle_move_up(app: &mut App) {
    with_cursor(app, |index, scroll, _, _| scroll_up(index, scroll));
}

fn handle_page(app: &mut App, down: bool) {
    with_cursor(app, |index, scroll, len, page| {
        for _ in 0..page.max(1) / 2 {
            if down {
                scroll_down(index, scroll, len, page);
            } else {
                scroll_up(index, scroll);
            }
        }
    });
}

fn handle_goto_top(app: &mut App) {
    with_cursor(app, |index, scroll, _, _| scroll_to_top(index, scroll));
}

fn handle_goto_bottom(app: &mut App) {
    with_cursor(app, |index, scroll, len, page| {
        scroll_to_bottom(index, scroll, len, page)
    });
}
