use anyhow::Result;
use colored::Colorize;
use oid::Identity;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    ui::header("Resource Types");

    for kind in ctx.registry.types() {
        let identity = match kind.identity() {
            Identity::Simple => "o:{tag}:{id}[:{version}]".dimmed(),
            Identity::Composite => "o:{tag}:{id}:{scope}".yellow(),
        };
        println!("  {:<18} {}", kind.tag().bold(), identity);
    }

    println!();
    ui::kv("Registered", &ctx.registry.len().to_string());
    if !ctx.config.registry.disabled.is_empty() {
        ui::kv("Disabled", &ctx.config.registry.disabled.join(", "));
    }
    Ok(())
}
