//! `oid` subcommands - parse, check, diff and staleness of references

use anyhow::{Context as _, Result};
use colored::Colorize;
use oid::{Oid, ResourceType, is_insignificant, stale_inputs};

use crate::Context;
use crate::cli::OidCommand;
use crate::ui;

pub fn run(ctx: &Context, cmd: OidCommand) -> Result<()> {
    match cmd {
        OidCommand::Parse { reference } => parse(ctx, &reference),
        OidCommand::Check { reference, allow } => check(ctx, &reference, &allow),
        OidCommand::Diff { old, new } => diff(ctx, &old, &new),
        OidCommand::Stale { current, inputs } => stale(ctx, current.as_deref(), &inputs),
    }
}

fn parse(ctx: &Context, reference: &str) -> Result<()> {
    let oid = Oid::parse(&ctx.registry, reference)?;

    ui::header(&ui::reference(&oid));
    ui::kv("type", oid.kind().tag());
    ui::kv("id", oid.id());
    match &oid {
        Oid::Simple(simple) => {
            ui::kv("version", simple.version().unwrap_or("(none)"));
        }
        Oid::Composite(composite) => {
            ui::kv("scope", composite.scope());
        }
    }
    if !ctx.quiet {
        println!();
        println!("{}", serde_json::to_string(&oid)?);
    }
    Ok(())
}

/// Resolve allowed type tags against the registry
fn allowed_types(ctx: &Context, tags: &[String]) -> Result<Vec<ResourceType>> {
    tags.iter()
        .map(|tag| {
            ctx.registry
                .type_of(tag.trim())
                .with_context(|| format!("--allow: unknown resource type {tag:?}"))
        })
        .collect()
}

fn check(ctx: &Context, reference: &str, allow: &[String]) -> Result<()> {
    let allowed = allowed_types(ctx, allow)?;
    Oid::parse_field(&ctx.registry, "reference", reference, &allowed)?;
    ui::success(&format!("{reference} is valid"));
    Ok(())
}

fn diff(ctx: &Context, old: &str, new: &str) -> Result<()> {
    if is_insignificant(&ctx.registry, old, new) {
        ui::success(&format!("{old} → {new}: {}", "no change".dimmed()));
        if let (Ok(a), Ok(b)) = (
            Oid::parse(&ctx.registry, old),
            Oid::parse(&ctx.registry, new),
        ) && a != b
        {
            ui::dim("same object; the field is left as declared");
        }
    } else {
        ui::warn(&format!("{old} → {new}: {}", "changed".yellow()));
    }
    Ok(())
}

fn stale(ctx: &Context, current: Option<&str>, inputs: &[String]) -> Result<()> {
    let mut parsed = Vec::with_capacity(inputs.len());
    for (i, input) in inputs.iter().enumerate() {
        parsed.push(Oid::parse_field(
            &ctx.registry,
            &format!("inputs[{i}]"),
            input,
            &[],
        )?);
    }
    let versions: Vec<Option<&str>> = parsed.iter().map(Oid::version).collect();
    let stale = stale_inputs(current, &versions);

    if current.is_none() {
        ui::info("No current version; nothing to compare against");
        return Ok(());
    }
    if stale.is_empty() {
        ui::success("Up to date");
        return Ok(());
    }

    ui::warn("Recompute required; newer inputs:");
    for i in &stale {
        println!("  {} {}", "•".yellow(), ui::reference(&parsed[*i]));
    }
    Ok(())
}
