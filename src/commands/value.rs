use anyhow::{Context as _, Result};
use scalar::{ScalarValue, ValueBag};

use crate::Context;
use crate::cli::ValueCommand;
use crate::ui;

pub fn run(ctx: &Context, cmd: ValueCommand) -> Result<()> {
    match cmd {
        ValueCommand::Decode { json } => decode(ctx, &json),
        ValueCommand::Encode { kind, text } => encode(&ScalarValue::parse(kind.into(), &text)?),
    }
}

fn decode(ctx: &Context, json: &str) -> Result<()> {
    let bag: ValueBag = serde_json::from_str(json).context("Value bag is not valid JSON")?;
    let value = ScalarValue::decode(&bag)?;

    ui::kv("kind", value.kind().slot());
    ui::kv("value", &value.to_string());
    if let ScalarValue::Duration(nanos) = value {
        ui::kv("nanoseconds", &nanos.to_string());
    }

    let canonical = value.encode()?;
    if canonical != bag && !ctx.quiet {
        ui::dim(&format!("canonical: {}", serde_json::to_string(&canonical)?));
    }
    Ok(())
}

fn encode(value: &ScalarValue) -> Result<()> {
    println!("{}", serde_json::to_string(&value.encode()?)?);
    Ok(())
}
