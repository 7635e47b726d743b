//! `grants` subcommands - plan, apply and show relationship records
//!
//! Grant files declare the complete set of records per scope:
//!
//! ```toml
//! [[scope]]
//! oid = "o:workspace:41"
//!
//! [[scope.grant]]
//! subject = "o:user:7"
//! role = "editor"
//!
//! [[scope.grant]]
//! subject = "o:rbacgroup:3"
//! role = "viewer"
//! qualifier = "o:dataset:42"
//! ```
//!
//! Records found under a declared scope but missing from the file are
//! deleted. Scopes not declared are left alone.

use anyhow::{Context as _, Result, bail};
use colored::Colorize;
use oid::{Oid, TypeRegistry};
use reconcile::{CancelToken, ConvergencePlan, GrantSpec, converge_all};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::Context;
use crate::cli::{ApplyArgs, GrantsCommand, PlanArgs};
use crate::engine::{ConsoleProgress, TerminalConfirm, print_summary};
use crate::state::FileStore;
use crate::ui;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GrantFile {
    #[serde(default)]
    scope: Vec<ScopeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScopeEntry {
    oid: String,
    #[serde(default)]
    grant: Vec<GrantSpec>,
}

pub fn run(ctx: &Context, cmd: GrantsCommand) -> Result<()> {
    match cmd {
        GrantsCommand::Plan(args) => plan(ctx, &args),
        GrantsCommand::Apply(args) => apply(ctx, &args),
        GrantsCommand::Show { scope } => show(ctx, scope.as_deref()),
    }
}

/// Parse grant file text into a plan, resolving every reference
pub fn parse_grants(registry: &TypeRegistry, content: &str) -> Result<ConvergencePlan> {
    let file: GrantFile = toml::from_str(content).context("Invalid grant file")?;
    let mut plan = ConvergencePlan::new();

    for (i, entry) in file.scope.iter().enumerate() {
        let scope = Oid::parse_field(registry, &format!("scope[{i}].oid"), &entry.oid, &[])?;
        plan.add_scope(scope.clone());
        for (j, spec) in entry.grant.iter().enumerate() {
            let grant = spec.resolve(registry, &format!("scope[{i}].grant[{j}]"))?;
            plan.add_grant(scope.clone(), grant);
        }
    }
    Ok(plan)
}

fn load_plan(ctx: &Context, path: &Path, target: Option<&str>) -> Result<ConvergencePlan> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read grant file: {}", path.display()))?;
    let plan = parse_grants(&ctx.registry, &content)
        .with_context(|| format!("In {}", path.display()))?;
    log::info!(
        "Loaded {} scopes ({} grants) from {}",
        plan.len(),
        plan.total_grants(),
        path.display()
    );

    let plan = plan.filter_by_target(target);
    if plan.is_empty() {
        match target {
            Some(t) => bail!("No scope in {} matches {t:?}", path.display()),
            None => bail!("{} declares no scopes", path.display()),
        }
    }
    Ok(plan)
}

fn open_store(ctx: &Context) -> Result<FileStore> {
    let path = match &ctx.store {
        Some(path) => path.clone(),
        None => ctx.config.store_path()?,
    };
    log::debug!("Using relationship store {}", path.display());
    Ok(FileStore::new(path, ctx.registry.clone()))
}

fn plan(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let plan = load_plan(ctx, &args.file, args.target.as_deref())?;
    let store = open_store(ctx)?;

    ui::header("Grant Plan");
    let summary = converge_all(
        &store,
        &plan,
        &ctx.config.reconcile.converge_options(true),
        &CancelToken::new(),
        &mut ConsoleProgress {
            show_unchanged: ctx.verbose > 0,
        },
        &mut TerminalConfirm { yes: true },
    )?;
    print_summary(&summary, true);

    if !summary.is_success() {
        bail!("{} scopes could not be planned", summary.failed);
    }
    Ok(())
}

fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let plan = load_plan(ctx, &args.file, args.target.as_deref())?;
    let store = open_store(ctx)?;

    let mut opts = ctx.config.reconcile.converge_options(args.dry_run);
    if let Some(jobs) = args.jobs {
        opts.jobs = jobs.max(1);
    }
    let timeout = args
        .timeout
        .map(std::time::Duration::from_secs)
        .or(ctx.config.reconcile.timeout());
    let cancel = match timeout {
        Some(t) => CancelToken::with_timeout(t),
        None => CancelToken::new(),
    };

    ui::header(if args.dry_run {
        "Grant Plan (dry run)"
    } else {
        "Applying Grants"
    });
    let summary = converge_all(
        &store,
        &plan,
        &opts,
        &cancel,
        &mut ConsoleProgress {
            show_unchanged: ctx.verbose > 0,
        },
        &mut TerminalConfirm { yes: args.yes },
    )?;
    print_summary(&summary, args.dry_run);

    if !summary.is_success() {
        bail!("{} of {} scopes failed", summary.failed, plan.len());
    }
    Ok(())
}

fn show(ctx: &Context, scope: Option<&str>) -> Result<()> {
    let store = open_store(ctx)?;
    let scopes = match scope {
        Some(s) => vec![Oid::parse_field(&ctx.registry, "scope", s, &[])?],
        None => store.scopes()?,
    };

    ui::header("Relationship Records");
    ui::kv("store", &store.path().display().to_string());

    if scopes.is_empty() {
        println!();
        println!("{}", "No records stored.".dimmed());
        return Ok(());
    }

    for scope in &scopes {
        let records = store.records(scope)?;
        println!();
        println!(
            "  {} {}",
            ui::reference(scope).bold(),
            format!("({} records)", records.len()).dimmed()
        );
        for grant in &records {
            let qualifier = grant
                .qualifier
                .as_ref()
                .map(|q| format!(" on {}", ui::reference(q)))
                .unwrap_or_default();
            println!(
                "    {} {:<30} {}{}",
                "•".dimmed(),
                ui::reference(&grant.subject),
                grant.role,
                qualifier
            );
        }
    }
    Ok(())
}
