use anyhow::Result;
use std::io::{self, BufRead, Write};

use crate::calendar::{format_display_date, parse_date, YearMonth};
use crate::config::Config;
use crate::db::Database;
use crate::expenses::{parse_amount, ExpenseInput};
use crate::launch::LaunchParams;
use crate::models::{BillingFilter, BudgetKind};
use crate::notify::Level;
use crate::report::FilterCriteria;
use crate::state::AppState;
use crate::ui::util::{format_amount, format_percent};

/// Flags that take no value.
const SWITCHES: &[&str] = &["--billed"];

pub(crate) fn as_cli(args: &[String], db: &mut Database, config: &Config) -> Result<()> {
    let rest = &args[2..];
    match args[1].as_str() {
        "open" => {
            let url = rest
                .first()
                .ok_or_else(|| anyhow::anyhow!("Usage: expensetui open <url>"))?;
            super::as_tui(db, config, LaunchParams::parse(url))
        }
        "login" => cli_login(rest, db, config),
        "signup" => cli_signup(rest, db, config),
        "logout" => cli_logout(db, config),
        "whoami" => cli_whoami(db, config),
        "add" => cli_add(rest, db, config),
        "summary" | "s" => cli_summary(rest, db, config),
        "insights" => cli_insights(db, config),
        "export" => cli_export(rest, db, config),
        "types" => cli_types(rest, db, config),
        "budget" => cli_budget(rest, db, config),
        "outbox" => cli_outbox(rest, db),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("expensetui {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            anyhow::bail!("Unknown command: {other}");
        }
    }
}

fn print_usage() {
    println!("ExpenseTUI - personal expense tracker");
    println!();
    println!("Usage: expensetui [command]");
    println!();
    println!("Commands:");
    println!("  (none)                        Launch interactive TUI");
    println!("  open <url>                    Launch the TUI with link parameters");
    println!("                                (?amount=, ?token=&type=recovery|email_change, ?link=)");
    println!("  login <email>                 Sign in (--password <pw>, or read from stdin)");
    println!("  signup <name> <email>         Create an account (--password <pw>)");
    println!("  logout                        Sign out from all devices");
    println!("  whoami                        Show the signed-in user");
    println!("  add <amount>                  Record an expense");
    println!("    --type <name>               Expense type (required)");
    println!("    --note <text>               Description (required)");
    println!("    --date <YYYY-MM-DD>         Date (default: today, IST)");
    println!("    --billed                    Mark as billed");
    println!("  summary [YYYY-MM]             Print monthly statistics and budgets");
    println!("  insights                      Print this month's insights");
    println!("  export                        Export expenses to CSV");
    println!("    --from/--to <YYYY-MM-DD>    Date range");
    println!("    --billing <all|billed|unbilled>");
    println!("    --type <name>               Only this type");
    println!("    --dir <path>                Output directory (default: home)");
    println!("  types [add <name> | rename <old> <new> | delete <name>]");
    println!("  budget [<billed> <unbilled>]  Show or set this month's budgets");
    println!("  outbox [--limit <n>]          Show links the local backend would email");
    println!("  --help, -h                    Show this help");
    println!("  --version, -V                 Show version");
}

// ── Argument helpers ─────────────────────────────────────────

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn has_switch(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

/// Arguments that are neither flags nor flag values.
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            if !SWITCHES.contains(&arg.as_str()) {
                iter.next();
            }
        } else {
            out.push(arg.as_str());
        }
    }
    out
}

fn password(args: &[String]) -> Result<String> {
    if let Some(pw) = flag(args, "--password") {
        return Ok(pw.to_string());
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn load(db: &mut Database, config: &Config) -> AppState {
    let mut state = AppState::new(LaunchParams::default(), config.export_dir.clone());
    state.start(db);
    state
}

fn require_owner(state: &AppState) -> Result<String> {
    state
        .owner()
        .ok_or_else(|| anyhow::anyhow!("Not signed in. Run: expensetui login <email>"))
}

/// Print what the operation reported, oldest first. A failed operation turns
/// its messages into the error.
fn finish(state: &mut AppState, ok: bool) -> Result<()> {
    let mut messages: Vec<(Level, String)> = state
        .notifier
        .toasts()
        .map(|n| (n.level, n.message.clone()))
        .collect();
    messages.reverse();
    if let Some(alert) = state.notifier.inline() {
        messages.push((alert.level, alert.message.clone()));
    }
    state.notifier.clear();

    if !ok {
        let text: Vec<String> = messages.into_iter().map(|(_, m)| m).collect();
        if text.is_empty() {
            anyhow::bail!("Operation failed");
        }
        anyhow::bail!("{}", text.join("\n"));
    }
    for (level, message) in messages {
        match level {
            Level::Warning | Level::Error => eprintln!("{message}"),
            Level::Info | Level::Success => println!("{message}"),
        }
    }
    Ok(())
}

// ── Session ──────────────────────────────────────────────────

fn cli_login(args: &[String], db: &mut Database, config: &Config) -> Result<()> {
    let email = positional(args)
        .first()
        .map(|e| e.to_string())
        .ok_or_else(|| anyhow::anyhow!("Usage: expensetui login <email> [--password <pw>]"))?;
    let pw = password(args)?;
    let mut state = load(db, config);
    let ok = state.sign_in(db, &email, &pw);
    finish(&mut state, ok)?;
    if let Some(user) = state.session.user() {
        println!("Signed in as {} <{}> ({})", user.display_name(), user.email, state.session.state());
    }
    Ok(())
}

fn cli_signup(args: &[String], db: &mut Database, config: &Config) -> Result<()> {
    let pos = positional(args);
    let (Some(name), Some(email)) = (pos.first(), pos.get(1)) else {
        anyhow::bail!("Usage: expensetui signup <name> <email> [--password <pw>]");
    };
    let pw = password(args)?;
    let mut state = load(db, config);
    let ok = state.sign_up(db, name, email, &pw, &pw);
    finish(&mut state, ok)
}

fn cli_logout(db: &mut Database, config: &Config) -> Result<()> {
    let mut state = load(db, config);
    if state.session.user().is_none() {
        println!("Not signed in");
        return Ok(());
    }
    state.sign_out(db);
    finish(&mut state, true)?;
    println!("Signed out");
    Ok(())
}

fn cli_whoami(db: &mut Database, config: &Config) -> Result<()> {
    let state = load(db, config);
    match state.session.user() {
        Some(user) => {
            println!("{} <{}>", user.display_name(), user.email);
            println!("  id:    {}", user.id);
            println!("  state: {}", state.session.state());
        }
        None => println!("Not signed in"),
    }
    Ok(())
}

// ── Expenses ─────────────────────────────────────────────────

fn cli_add(args: &[String], db: &mut Database, config: &Config) -> Result<()> {
    let mut state = load(db, config);
    require_owner(&state)?;

    let date = match flag(args, "--date") {
        Some(raw) => parse_date(raw).ok_or_else(|| anyhow::anyhow!("Invalid date: {raw} (expected YYYY-MM-DD)"))?,
        None => state.today,
    };
    let input = ExpenseInput {
        amount: positional(args).first().and_then(|a| parse_amount(a)),
        date,
        expense_type: flag(args, "--type").unwrap_or_default().to_string(),
        note: flag(args, "--note").unwrap_or_default().to_string(),
        billed: has_switch(args, "--billed"),
    };
    let ok = state.add_expense(&*db, &input);
    finish(&mut state, ok)
}

fn cli_summary(args: &[String], db: &mut Database, config: &Config) -> Result<()> {
    let mut state = load(db, config);
    require_owner(&state)?;

    if let Some(raw) = positional(args).first() {
        let month = YearMonth::parse(raw).ok_or_else(|| anyhow::anyhow!("Invalid month: {raw} (expected YYYY-MM)"))?;
        // Statistics are relative to "today"; pin it to the month's last day.
        if let Some((_, last)) = month.bounds() {
            state.today = last;
            state.refresh_dashboard(&*db);
        }
    }

    let stats = &state.stats;
    println!("ExpenseTUI - {}", state.month());
    println!("{}", "─".repeat(44));
    println!("  This month:   {} ({} expenses)", format_amount(stats.month_total), stats.month_count);
    println!("  Billed:       {}", format_amount(stats.billed_total));
    println!("  Unbilled:     {}", format_amount(stats.unbilled_total));
    println!("  Last month:   {}", format_amount(stats.last_month_total));
    println!("  All time:     {}", format_amount(stats.all_time_total));

    if let Some(display) = state.budget.as_ref() {
        println!();
        println!("Budgets:");
        for kind in BudgetKind::all() {
            let status = display.status(*kind);
            if status.has_budget() {
                println!(
                    "  {:<10} {} of {} ({} used)",
                    kind.to_string(),
                    format_amount(status.spent),
                    format_amount(status.budget),
                    format_percent(status.used_percent)
                );
            } else {
                println!("  {:<10} no budget set", kind.to_string());
            }
        }
    }

    if !state.recent.is_empty() {
        println!();
        println!("Recent:");
        for e in &state.recent {
            println!(
                "  {:<12} {:<14} {:>14}  {}",
                format_display_date(e.date),
                e.expense_type,
                format_amount(e.amount),
                e.note
            );
        }
    }
    finish(&mut state, true)
}

fn cli_insights(db: &mut Database, config: &Config) -> Result<()> {
    let mut state = load(db, config);
    require_owner(&state)?;
    state.load_insights(&*db);
    let Some(insights) = state.insights.clone() else {
        return finish(&mut state, false);
    };

    println!("Insights - {}", insights.month);
    println!("{}", "─".repeat(44));
    println!("  This month:          {}", format_amount(insights.this_month_total));
    println!("  Last month:          {}", format_amount(insights.last_month_total));
    println!("  Change:              {}", format_percent(insights.monthly_change));
    println!("  Daily average:       {}", format_amount(insights.daily_average));
    println!("  Projected total:     {}", format_amount(insights.projected_total));
    println!("  Transactions:        {}", insights.count);
    println!("  Avg per transaction: {}", format_amount(insights.average_per_transaction));
    if let Some(e) = &insights.highest {
        println!("  Highest:             {} {}", format_amount(e.amount), e.note);
    }
    if let Some(e) = &insights.lowest {
        println!("  Lowest:              {} {}", format_amount(e.amount), e.note);
    }
    if !insights.top_categories.is_empty() {
        println!();
        println!("Top categories:");
        for (name, amount) in &insights.top_categories {
            println!("  {name:<24} {}", format_amount(*amount));
        }
    }
    finish(&mut state, true)
}

fn cli_export(args: &[String], db: &mut Database, config: &Config) -> Result<()> {
    let mut state = load(db, config);
    require_owner(&state)?;

    let date = |name: &str| -> Result<Option<chrono::NaiveDate>> {
        flag(args, name)
            .map(|raw| parse_date(raw).ok_or_else(|| anyhow::anyhow!("Invalid date for {name}: {raw}")))
            .transpose()
    };
    let criteria = FilterCriteria {
        start: date("--from")?,
        end: date("--to")?,
        billing: flag(args, "--billing").map(BillingFilter::parse).unwrap_or_default(),
        expense_type: flag(args, "--type").map(str::to_string),
    };
    if let Some(dir) = flag(args, "--dir") {
        state.export_dir = shellexpand(dir).into();
    }

    state.apply_filter(&*db, criteria);
    let outcome = state.export(&*db);
    finish(&mut state, outcome.is_some())
}

fn cli_types(args: &[String], db: &mut Database, config: &Config) -> Result<()> {
    let mut state = load(db, config);
    require_owner(&state)?;

    let pos = positional(args);
    let ok = match pos.as_slice() {
        [] => {
            for name in &state.types {
                println!("{name}");
            }
            true
        }
        ["add", name] => state.add_type(&*db, name),
        ["rename", old, new] => state.rename_type(&*db, old, new),
        ["delete", name] => state.delete_type(&*db, name),
        _ => anyhow::bail!("Usage: expensetui types [add <name> | rename <old> <new> | delete <name>]"),
    };
    finish(&mut state, ok)
}

fn cli_budget(args: &[String], db: &mut Database, config: &Config) -> Result<()> {
    let mut state = load(db, config);
    require_owner(&state)?;

    let pos = positional(args);
    match pos.as_slice() {
        [] => {
            let Some(display) = state.budget.as_ref() else {
                return finish(&mut state, false);
            };
            println!("Budgets for {}", display.month);
            for kind in BudgetKind::all() {
                let status = display.status(*kind);
                println!(
                    "  {:<10} {:>14}  spent {}",
                    kind.to_string(),
                    format_amount(status.budget),
                    format_amount(status.spent)
                );
            }
            finish(&mut state, true)
        }
        [billed, unbilled] => {
            let (Some(billed), Some(unbilled)) = (parse_amount(billed), parse_amount(unbilled)) else {
                anyhow::bail!("Budgets must be numbers");
            };
            let ok = state.set_budget(&*db, billed, unbilled);
            finish(&mut state, ok)
        }
        _ => anyhow::bail!("Usage: expensetui budget [<billed> <unbilled>]"),
    }
}

fn cli_outbox(args: &[String], db: &mut Database) -> Result<()> {
    let limit = match flag(args, "--limit") {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Invalid --limit: {raw}"))?,
        None => 10,
    };
    let entries = db.outbox(limit)?;
    if entries.is_empty() {
        println!("Outbox is empty");
        return Ok(());
    }
    for entry in &entries {
        println!("{}  {}  {}", entry.created_at, entry.email, entry.subject);
        println!("  {}", entry.link);
    }
    Ok(())
}

pub(crate) fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/{rest}")
    } else {
        path.to_string()
    }
}
