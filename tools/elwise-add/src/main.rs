mod cli;

use crate::cli::{AddArgs, Cli};
use anyhow::{Context, anyhow};
use clap::Parser;
use elwise_core_info::{render_summary, render_tensor, tensor_report};
use elwise_core_tensor::Tensor;
use elwise_globals::{GlobalOpts, OutputFormat, get_globals, init_globals};
use elwise_host::{HostValue, MODULE_NAME, call, from_json, register_modules};
use log::debug;

async fn load_operand(src: &str, inline: bool) -> anyhow::Result<HostValue> {
    let text = if inline {
        src.to_string()
    } else {
        tokio::fs::read_to_string(src)
            .await
            .with_context(|| format!("failed to read operand file {}", src))?
    };

    let json: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("operand {} is not valid JSON", src))?;

    Ok(from_json(&json)?)
}

fn render_output(t: &Tensor, format: OutputFormat, summary: bool) -> anyhow::Result<String> {
    let text = match format {
        OutputFormat::Pretty if summary => format!("{}\n{}", render_summary(t), render_tensor(t)),
        OutputFormat::Pretty => render_tensor(t),
        OutputFormat::Json => serde_json::to_string_pretty(&tensor_report(t))?,
    };
    Ok(text)
}

pub async fn run_add_cmd(cmd: AddArgs, globals: &GlobalOpts) -> anyhow::Result<()> {
    debug!("elwise-add: lhs={} rhs={}", cmd.lhs, cmd.rhs);

    let lhs = load_operand(&cmd.lhs, cmd.inline).await?;
    let rhs = load_operand(&cmd.rhs, cmd.inline).await?;

    let function = cmd.overflow.function_name();
    let out = call(MODULE_NAME, function, &[lhs, rhs])
        .with_context(|| format!("{}.{} failed", MODULE_NAME, function))?;

    let tensor = out
        .as_tensor()
        .ok_or_else(|| anyhow!("{}.{} returned {}, not an array", MODULE_NAME, function, out))?;
    debug!("elwise-add: result {}", render_summary(tensor));

    let text = render_output(tensor, globals.format, cmd.summary)?;

    match &globals.output {
        Some(path) => tokio::fs::write(path, format!("{}\n", text))
            .await
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", text),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_globals(cli.g)?;
    register_modules();

    run_add_cmd(cli.args, get_globals()).await
}
