//! Systweak CLI - snapshot-based system tweak management.
//!
//! Every apply captures the prior state first; `st restore` puts it back.
#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::io::{self, IsTerminal};
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use console::style;
use serde::Serialize;

use st::catalog::{Category, TweakCatalog, TweakDefinition};
use st::cli::{
    ApplyArgs, Cli, Commands, CompletionsArgs, ListArgs, RestoreArgs, ShowArgs,
    StartupCommands, StartupItemArgs, StartupItemsArgs,
};
use st::control::{LocalControl, PowerSchemeControl, ServiceControl};
use st::engine::{ApplyReport, RestoreReport, Subsystem};
use st::error::{Result, TweakError};
use st::startup::StartupToggle;
use st::store::{ConfigStore, FileStore};
use st::{logging, paths};

fn main() {
    let cli = Cli::parse();

    // Handle no-color flag or non-TTY
    if cli.no_color || !io::stdout().is_terminal() {
        console::set_colors_enabled(false);
    }

    logging::init_logging(cli.use_json(), cli.verbose, cli.quiet);

    if let Err(e) = run(&cli) {
        output_error(&cli, &e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        None => print_quick_start(cli),
        Some(Commands::List(args)) => cmd_list(cli, args),
        Some(Commands::Show(args)) => cmd_show(cli, args),
        Some(Commands::Apply(args)) => cmd_apply(cli, args),
        Some(Commands::Restore(args)) => cmd_restore(cli, args),
        Some(Commands::Status) => cmd_status(cli),
        Some(Commands::Startup(sub)) => cmd_startup(cli, sub),
        Some(Commands::Version) => cmd_version(cli),
        Some(Commands::Completions(args)) => cmd_completions(args),
    }
}

// === Wiring ===

/// Shared capability handles for the local backend.
struct App {
    catalog: Arc<TweakCatalog>,
    store: Arc<dyn ConfigStore>,
    services: Arc<dyn ServiceControl>,
    power: Arc<dyn PowerSchemeControl>,
}

impl App {
    fn open() -> Result<Self> {
        let store: Arc<dyn ConfigStore> = Arc::new(FileStore::open(paths::store_file()?));
        let control = Arc::new(LocalControl::new(store.clone()));
        Ok(Self {
            catalog: Arc::new(TweakCatalog::builtin()),
            store,
            services: control.clone(),
            power: control,
        })
    }

    fn subsystem(&self, category: Category) -> Result<Subsystem> {
        Ok(Subsystem::new(
            category,
            self.catalog.clone(),
            self.store.clone(),
            self.services.clone(),
            self.power.clone(),
            &paths::snapshot_dir()?,
        ))
    }
}

// === Quick Start ===

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn print_quick_start(cli: &Cli) -> Result<()> {
    if cli.use_json() {
        let help = serde_json::json!({
            "tool": "st",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Snapshot-based system tweak manager",
            "discovery": {
                "list_tweaks": "st list --robot",
                "tweak_details": "st show <ID> --robot",
                "current_state": "st status --robot",
            },
            "actions": {
                "apply": "st apply <ID>...",
                "restore": "st restore [--category <CATEGORY>]",
                "startup_disable": "st startup disable <NAME>...",
            },
        });
        println!("{}", serde_json::to_string_pretty(&help)?);
    } else {
        println!("{}", style("st - system tweak manager").bold());
        println!();
        println!("  {} list tweaks", style("st list").cyan());
        println!("  {} apply a tweak (snapshot taken first)", style("st apply <ID>").cyan());
        println!("  {} undo everything", style("st restore").cyan());
        println!("  {} applied tweaks and backups", style("st status").cyan());
        println!();
        println!("Run {} for details.", style("st --help").cyan());
    }
    Ok(())
}

// === Catalog Commands ===

#[derive(Serialize)]
struct TweakSummary<'a> {
    id: &'a str,
    display_name: &'a str,
    category: Category,
    description: &'a str,
}

impl<'a> From<&'a TweakDefinition> for TweakSummary<'a> {
    fn from(def: &'a TweakDefinition) -> Self {
        Self {
            id: &def.id,
            display_name: &def.display_name,
            category: def.category,
            description: &def.description,
        }
    }
}

fn cmd_list(cli: &Cli, args: &ListArgs) -> Result<()> {
    let app = App::open()?;
    let category = args
        .category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()?;

    let tweaks: Vec<&TweakDefinition> = app
        .catalog
        .iter()
        .filter(|def| category.is_none_or(|c| def.category == c))
        .collect();

    if cli.use_json() {
        let summaries: Vec<TweakSummary<'_>> = tweaks.iter().map(|d| (*d).into()).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    let mut current: Option<Category> = None;
    for def in tweaks {
        if current != Some(def.category) {
            current = Some(def.category);
            println!("{}", style(def.category.to_string()).bold().underlined());
        }
        println!(
            "  {:32} {}",
            style(&def.id).cyan(),
            def.display_name
        );
    }
    Ok(())
}

fn cmd_show(cli: &Cli, args: &ShowArgs) -> Result<()> {
    let app = App::open()?;
    let def = app.catalog.get(&args.id)?;

    if cli.use_json() {
        let detail = serde_json::json!({
            "id": def.id,
            "display_name": def.display_name,
            "description": def.description,
            "category": def.category,
            "mutations": def.mutations.iter().map(|m| serde_json::json!({
                "path": m.path,
                "name": m.name,
                "value": m.value.to_json(),
                "type": m.value.kind().to_string(),
                "fan_out": m.fan_out,
            })).collect::<Vec<_>>(),
            "services": def.service_changes.iter().map(|s| serde_json::json!({
                "service": s.service,
                "desired": s.desired,
            })).collect::<Vec<_>>(),
            "power_plan": def.power_plan,
        });
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    println!("{} ({})", style(&def.display_name).bold(), def.id);
    println!("{}", def.description);
    println!("category: {}", def.category);
    for m in &def.mutations {
        let target = if m.fan_out {
            format!("{}\\*\\{}", m.path, m.name)
        } else {
            format!("{}\\{}", m.path, m.name)
        };
        println!("  set {target} = {} ({})", m.value, m.value.kind());
    }
    for s in &def.service_changes {
        println!("  service {} -> {}", s.service, s.desired);
    }
    if let Some(plan) = &def.power_plan {
        println!("  power plan -> {plan}");
    }
    Ok(())
}

// === Apply & Restore ===

#[derive(Serialize)]
struct ApplyOutcome {
    category: Category,
    applied: Vec<String>,
    mutations_issued: usize,
    cancelled: bool,
    warnings: Vec<String>,
}

fn cmd_apply(cli: &Cli, args: &ApplyArgs) -> Result<()> {
    let app = App::open()?;

    // Group requested ids by category; each category owns its own
    // snapshot slot and is applied as one coherent batch.
    let mut groups: BTreeMap<Category, Vec<String>> = BTreeMap::new();
    for id in &args.ids {
        let def = app.catalog.get(id)?;
        groups.entry(def.category).or_default().push(id.clone());
    }

    let mut outcomes = Vec::new();
    for (category, ids) in groups {
        let subsystem = app.subsystem(category)?;
        let report: ApplyReport = subsystem.applier().apply_profile(&ids)?;
        outcomes.push(ApplyOutcome {
            category,
            applied: report.applied,
            mutations_issued: report.mutations_issued,
            cancelled: report.cancelled,
            warnings: report.failures.failures().iter().map(ToString::to_string).collect(),
        });
    }

    if cli.use_json() {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        return Ok(());
    }

    for outcome in &outcomes {
        if outcome.warnings.is_empty() {
            println!(
                "{} {}: applied {} tweak(s), {} mutation(s)",
                style("ok").green().bold(),
                outcome.category,
                outcome.applied.len(),
                outcome.mutations_issued,
            );
        } else {
            println!(
                "{} {}: completed with {} warning(s)",
                style("warn").yellow().bold(),
                outcome.category,
                outcome.warnings.len(),
            );
            for warning in &outcome.warnings {
                println!("  {warning}");
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct RestoreOutcome {
    category: Category,
    had_backup: bool,
    entries_restored: usize,
    services_restored: usize,
    power_restored: bool,
    warnings: Vec<String>,
}

fn cmd_restore(cli: &Cli, args: &RestoreArgs) -> Result<()> {
    let app = App::open()?;
    let categories: Vec<Category> = match args.category.as_deref() {
        Some(raw) => vec![raw.parse()?],
        None => Category::ALL.to_vec(),
    };

    let mut outcomes = Vec::new();
    for category in categories {
        let subsystem = app.subsystem(category)?;
        let report: RestoreReport = subsystem.restorer().restore_all()?;
        outcomes.push(RestoreOutcome {
            category,
            had_backup: report.had_backup,
            entries_restored: report.entries_restored,
            services_restored: report.services_restored,
            power_restored: report.power_restored,
            warnings: report.failures.failures().iter().map(ToString::to_string).collect(),
        });
    }

    if cli.use_json() {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        return Ok(());
    }

    for outcome in &outcomes {
        if !outcome.had_backup {
            println!(
                "{} {}: no backup available (nothing to restore)",
                style("ok").green().bold(),
                outcome.category,
            );
        } else if outcome.warnings.is_empty() {
            println!(
                "{} {}: restored {} entrie(s), {} service(s)",
                style("ok").green().bold(),
                outcome.category,
                outcome.entries_restored,
                outcome.services_restored,
            );
        } else {
            println!(
                "{} {}: completed with {} warning(s)",
                style("warn").yellow().bold(),
                outcome.category,
                outcome.warnings.len(),
            );
            for warning in &outcome.warnings {
                println!("  {warning}");
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct StatusEntry {
    category: Category,
    has_backup: bool,
    backup_created_at: Option<String>,
    backup_entries: usize,
}

fn cmd_status(cli: &Cli) -> Result<()> {
    let app = App::open()?;

    let mut entries = Vec::new();
    for category in Category::ALL {
        let subsystem = app.subsystem(category)?;
        let backup = subsystem.load_backup()?;
        entries.push(StatusEntry {
            category,
            has_backup: backup.is_some(),
            backup_created_at: backup.as_ref().map(|s| s.created_at.to_rfc3339()),
            backup_entries: backup.map_or(0, |s| s.entries.len()),
        });
    }

    if cli.use_json() {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        if entry.has_backup {
            println!(
                "{:8} backup from {} ({} entries)",
                entry.category.to_string(),
                entry.backup_created_at.as_deref().unwrap_or("?"),
                entry.backup_entries,
            );
        } else {
            println!("{:8} no backup", entry.category.to_string());
        }
    }
    Ok(())
}

// === Startup Items ===

fn cmd_startup(cli: &Cli, sub: &StartupCommands) -> Result<()> {
    let app = App::open()?;
    let toggle = StartupToggle::new(app.store.clone());

    match sub {
        StartupCommands::Status(StartupItemArgs { name }) => {
            let state = toggle.status(name)?;
            if cli.use_json() {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "name": name,
                        "state": state,
                    }))?
                );
            } else {
                println!("{name}: {state}");
            }
            Ok(())
        }
        StartupCommands::Disable(StartupItemsArgs { names }) => {
            report_toggle(cli, &toggle.toggle_many(names, true))
        }
        StartupCommands::Enable(StartupItemsArgs { names }) => {
            report_toggle(cli, &toggle.toggle_many(names, false))
        }
    }
}

fn report_toggle(cli: &Cli, report: &st::startup::ToggleReport) -> Result<()> {
    if cli.use_json() {
        let warnings: Vec<String> =
            report.failures.failures().iter().map(ToString::to_string).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "changed": report.changed,
                "unchanged": report.unchanged,
                "warnings": warnings,
            }))?
        );
        return Ok(());
    }

    for name in &report.changed {
        println!("{} {name}", style("moved").green());
    }
    for name in &report.unchanged {
        println!("{} {name} (already there)", style("ok").green());
    }
    for failure in report.failures.failures() {
        println!("{} {failure}", style("failed").red());
    }
    Ok(())
}

// === Utilities ===

#[allow(clippy::unnecessary_wraps)]
fn cmd_version(cli: &Cli) -> Result<()> {
    if cli.use_json() {
        println!(
            "{{\"name\":\"st\",\"version\":\"{}\"}}",
            env!("CARGO_PKG_VERSION")
        );
    } else {
        println!("st {}", env!("CARGO_PKG_VERSION"));
    }
    Ok(())
}

#[allow(clippy::unnecessary_wraps)]
fn cmd_completions(args: &CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(args.shell, &mut cmd, "st", &mut io::stdout());
    Ok(())
}

// === Error Output ===

fn output_error(cli: &Cli, error: &TweakError) {
    if cli.use_json() {
        let payload = serde_json::json!({
            "error": error.to_string(),
            "recoverable": error.is_user_recoverable(),
            "suggestion": error.suggestion(),
        });
        eprintln!("{payload}");
    } else {
        eprintln!("{} {error}", style("error:").red().bold());
        if let Some(suggestion) = error.suggestion() {
            eprintln!("  {} {suggestion}", style("hint:").yellow());
        }
    }
}
