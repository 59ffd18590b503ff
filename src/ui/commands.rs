use std::collections::HashMap;
use std::sync::LazyLock;

use super::app::{App, Screen};
use super::form;
use crate::db::Database;
use crate::report::ChartKind;

pub(crate) struct Command {
    pub(crate) description: &'static str,
    pub(crate) run: fn(&str, &mut App, &mut Database) -> anyhow::Result<()>,
}

macro_rules! register_command {
    ($name:expr, $desc:expr, $func:expr, $registry:expr) => {{
        $registry.insert(
            $name,
            Command {
                description: $desc,
                run: $func,
            },
        );
    }};
}

pub(crate) static COMMANDS: LazyLock<HashMap<&str, Command>> = LazyLock::new(|| {
    let mut r: HashMap<&str, Command> = HashMap::new();

    register_command!("q", "Quit", cmd_quit, r);
    register_command!("quit", "Quit", cmd_quit, r);
    register_command!("d", "Go to Dashboard", cmd_dashboard, r);
    register_command!("dashboard", "Go to Dashboard", cmd_dashboard, r);
    register_command!("a", "Go to Analytics", cmd_analytics, r);
    register_command!("analytics", "Go to Analytics", cmd_analytics, r);
    register_command!("s", "Go to Search", cmd_search, r);
    register_command!("search", "Go to Search", cmd_search, r);
    register_command!("i", "Go to Insights", cmd_insights, r);
    register_command!("insights", "Go to Insights", cmd_insights, r);
    register_command!("t", "Go to Types", cmd_types, r);
    register_command!("types", "Go to Types", cmd_types, r);
    register_command!("help", "Show available commands", cmd_help, r);
    register_command!("h", "Show available commands", cmd_help, r);
    register_command!("add", "Add an expense  (add [amount])", cmd_add, r);
    register_command!("delete", "Delete the selected expense", cmd_delete, r);
    register_command!("budget", "Set monthly budgets", cmd_budget, r);
    register_command!("filter", "Filter analytics records", cmd_filter, r);
    register_command!(
        "chart",
        "Switch chart  (chart line|bar|hbar|doughnut|bubble)",
        cmd_chart,
        r
    );
    register_command!("edit", "Edit the selected analytics row", cmd_edit, r);
    register_command!("save", "Save analytics edits", cmd_save, r);
    register_command!("export", "Export filtered records to CSV", cmd_export, r);
    register_command!("theme", "Toggle dark mode", cmd_theme, r);
    register_command!("profile", "Edit name and email", cmd_profile, r);
    register_command!("password", "Change password", cmd_password, r);
    register_command!("logout", "Sign out from all devices", cmd_logout, r);
    register_command!("type-add", "Add an expense type", cmd_type_add, r);
    register_command!("type-rename", "Rename the selected type", cmd_type_rename, r);
    register_command!("type-delete", "Delete the selected type", cmd_type_delete, r);
    register_command!("refresh", "Reload the current screen", cmd_refresh, r);

    r
});

pub(crate) fn handle_command(input: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let trimmed = input.trim();
    let mut parts = trimmed.splitn(2, ' ');
    let cmd_name = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("").trim();

    match COMMANDS.get(cmd_name) {
        Some(cmd) if app.is_signed_in() || is_always_available(cmd_name) => {
            (cmd.run)(args, app, db)?;
        }
        Some(_) => app.set_status("Sign in first"),
        None => {
            let suggestion = find_closest(cmd_name);
            app.set_status(format!(
                "Unknown command: :{cmd_name}. Did you mean :{suggestion}?"
            ));
        }
    }

    Ok(())
}

fn is_always_available(name: &str) -> bool {
    matches!(name, "q" | "quit" | "h" | "help" | "theme")
}

fn find_closest(input: &str) -> String {
    COMMANDS
        .keys()
        .filter(|k| k.len() > 1) // skip single-letter aliases for suggestions
        .min_by_key(|k| levenshtein(input, k))
        .unwrap_or(&"help")
        .to_string()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

// ── Command implementations ──────────────────────────────────

fn cmd_quit(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    app.running = false;
    Ok(())
}

fn cmd_dashboard(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    app.switch_screen(db, Screen::Dashboard);
    Ok(())
}

fn cmd_analytics(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    app.switch_screen(db, Screen::Analytics);
    Ok(())
}

fn cmd_search(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    if app.switch_screen(db, Screen::Search) && !args.is_empty() {
        app.state.search_term = args.to_string();
        app.search_index = 0;
        app.search_scroll = 0;
    }
    Ok(())
}

fn cmd_insights(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    app.switch_screen(db, Screen::Insights);
    Ok(())
}

fn cmd_types(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    app.switch_screen(db, Screen::Types);
    Ok(())
}

fn cmd_help(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    app.show_help = true;
    Ok(())
}

fn cmd_add(args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    app.open_add_expense();
    if !args.is_empty() {
        if let Some(form) = app.form.as_mut() {
            if let Some(amount) = form.fields.iter_mut().find(|f| f.label == "Amount") {
                amount.value = args.to_string();
            }
            form.focus = 2;
        }
    }
    Ok(())
}

fn cmd_delete(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    match app.screen {
        Screen::Types => app.request_delete_type(),
        _ => app.request_delete_expense(),
    }
    Ok(())
}

fn cmd_budget(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    app.open_budget();
    Ok(())
}

fn cmd_filter(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    if app.switch_screen(db, Screen::Analytics) {
        app.open_filter();
    }
    Ok(())
}

fn cmd_chart(args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    let next = if args.is_empty() {
        app.state.chart.next()
    } else {
        match ChartKind::parse(args) {
            Some(kind) => kind,
            None => {
                let names: Vec<&str> = ChartKind::all().iter().map(|k| k.label()).collect();
                app.set_status(format!(
                    "Unknown chart '{args}'. Use one of: {}",
                    names.join(", ")
                ));
                return Ok(());
            }
        }
    };
    app.state.chart = next;
    app.set_status(next.title());
    Ok(())
}

fn cmd_edit(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    if app.screen != Screen::Analytics {
        app.set_status("Rows are edited from Analytics (:a)");
        return Ok(());
    }
    app.open_edit_selected();
    Ok(())
}

fn cmd_save(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    if app.state.save_edits(&*db) {
        app.clamp_cursors();
    }
    Ok(())
}

fn cmd_export(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    if !app.state.analytics_open {
        app.set_status("Open Analytics (:a) to export its records");
        return Ok(());
    }
    if let Some(outcome) = app.state.export(&*db) {
        app.set_status(format!("Wrote {}", outcome.path.display()));
    }
    Ok(())
}

fn cmd_theme(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    app.state.toggle_theme(&*db);
    app.set_status(if app.state.dark_mode {
        "Dark mode"
    } else {
        "Light mode"
    });
    Ok(())
}

fn cmd_profile(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    app.open_profile();
    Ok(())
}

fn cmd_password(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    app.open_form(form::change_password());
    Ok(())
}

fn cmd_logout(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    app.request_sign_out();
    Ok(())
}

fn cmd_type_add(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    if args.is_empty() {
        app.open_form(form::add_type());
    } else {
        app.state.add_type(&*db, args);
    }
    Ok(())
}

fn cmd_type_rename(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    if app.screen != Screen::Types {
        app.set_status("Select a type on the Types screen (:t)");
        return Ok(());
    }
    match app.selected_type().cloned() {
        Some(name) => app.open_form(form::rename_type(&name)),
        None => app.set_status("No type selected"),
    }
    Ok(())
}

fn cmd_type_delete(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    if app.screen != Screen::Types {
        app.set_status("Select a type on the Types screen (:t)");
        return Ok(());
    }
    app.request_delete_type();
    Ok(())
}

fn cmd_refresh(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    match app.screen {
        Screen::Analytics => {
            let criteria = app.state.filter.criteria.clone();
            app.state.apply_filter(&*db, criteria);
        }
        Screen::Insights => app.state.load_insights(&*db),
        _ => app.state.refresh_dashboard(&*db),
    }
    app.clamp_cursors();
    app.set_status("Refreshed");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::launch::LaunchParams;
    use crate::state::AppState;
    use crate::testutil::db_with_user;
    use crate::ui::form::FormKind;

    fn app() -> (Database, App) {
        let (mut db, _) = db_with_user();
        let mut state = AppState::new(LaunchParams::default(), std::env::temp_dir());
        state.start(&mut db);
        (db, App::new(state))
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("chart", "chart"), 0);
        assert_eq!(levenshtein("exprot", "export"), 2);
    }

    #[test]
    fn test_unknown_command_suggests() {
        let (mut db, mut app) = app();
        handle_command("analytcs", &mut app, &mut db).unwrap();
        assert_eq!(
            app.status_message,
            "Unknown command: :analytcs. Did you mean :analytics?"
        );
    }

    #[test]
    fn test_navigation_commands() {
        let (mut db, mut app) = app();
        handle_command("a", &mut app, &mut db).unwrap();
        assert_eq!(app.screen, Screen::Analytics);
        assert!(app.state.analytics_open);
        handle_command("insights", &mut app, &mut db).unwrap();
        assert_eq!(app.screen, Screen::Insights);
        assert!(app.state.insights.is_some());
    }

    #[test]
    fn test_chart_command() {
        let (mut db, mut app) = app();
        handle_command("chart bubble", &mut app, &mut db).unwrap();
        assert_eq!(app.state.chart, ChartKind::Bubble);
        handle_command("chart radar", &mut app, &mut db).unwrap();
        assert_eq!(app.state.chart, ChartKind::Bubble);
        assert!(app.status_message.starts_with("Unknown chart 'radar'"));
    }

    #[test]
    fn test_add_with_amount_prefills() {
        let (mut db, mut app) = app();
        handle_command("add 450", &mut app, &mut db).unwrap();
        let form = app.form.as_ref().unwrap();
        assert_eq!(form.kind, FormKind::AddExpense);
        assert_eq!(form.value("Amount"), "450");
    }

    #[test]
    fn test_type_add_inline() {
        let (mut db, mut app) = app();
        handle_command("type-add Fuel", &mut app, &mut db).unwrap();
        assert!(app.state.types.iter().any(|t| t == "Fuel"));
    }

    #[test]
    fn test_commands_need_sign_in() {
        let (mut db, mut app) = app();
        app.state.sign_out(&mut db);
        app.sync_session();
        handle_command("budget", &mut app, &mut db).unwrap();
        assert_eq!(app.status_message, "Sign in first");
        handle_command("theme", &mut app, &mut db).unwrap();
        assert!(app.state.dark_mode);
    }
}
