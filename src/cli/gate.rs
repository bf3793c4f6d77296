//! Commands that send tool calls through the pipeline.

use std::path::Path;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::cli::CallArgs;
use crate::context::SessionContext;
use crate::pipeline::{InvocationReport, Pipeline};
use crate::policy::{ToolCall, ToolInvocation};
use crate::tools::ToolRegistry;

/// Run one call and print the text the decision-maker would receive.
///
/// Exits with an error when the call did not complete, so scripts can
/// branch on the exit status.
pub async fn run_invoke_command(
    pipeline: &Pipeline,
    call: &CallArgs,
    json_output: bool,
) -> anyhow::Result<()> {
    let call = call.to_call()?;
    let mut ctx = SessionContext::new();
    let report = pipeline.invoke(&mut ctx, call).await;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.text());
    }

    match report.error() {
        None => Ok(()),
        Some(err) => anyhow::bail!("{} ({})", err.kind(), report.tool_name),
    }
}

/// Print the decision for a call without asking anyone or running the tool.
pub async fn run_check_command(pipeline: &Pipeline, call: &CallArgs) -> anyhow::Result<()> {
    let call = call.to_call()?;
    let invocation = ToolInvocation::from_call(call, SessionContext::new().session_id());
    let decision = pipeline.check(&invocation).await;

    println!("Tool:     {}", invocation.tool_name);
    println!("Params:   {}", invocation.parameters);
    println!("Decision: {}", decision.label());
    if let Some(reason) = decision.reason() {
        println!("Reason:   {}", reason);
    }
    if !pipeline.tools().has(&invocation.tool_name).await {
        println!("Note:     no tool named '{}' is registered", invocation.tool_name);
    }

    Ok(())
}

/// Replay JSONL tool calls in order, sharing one session context.
///
/// Reading calls from stdin is only allowed with `auto_approve`: the console
/// approval prompt reads its answers from stdin too.
pub async fn run_replay_command(
    pipeline: &Pipeline,
    file: Option<&Path>,
    fail_fast: bool,
    auto_approve: bool,
) -> anyhow::Result<()> {
    match file {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            replay(pipeline, BufReader::new(file), fail_fast).await
        }
        None if !auto_approve => anyhow::bail!(
            "Replaying from stdin needs --yes, because approval answers are read from stdin. \
             Pass a file to replay with interactive approval."
        ),
        None => replay(pipeline, BufReader::new(tokio::io::stdin()), fail_fast).await,
    }
}

async fn replay<R>(pipeline: &Pipeline, reader: R, fail_fast: bool) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut ctx = SessionContext::new();
    let mut lines = reader.lines();
    let mut line_no = 0usize;
    let mut completed = 0usize;
    let mut refused = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let call = match ToolCall::parse_line(line) {
            Ok(call) => call,
            Err(e) if fail_fast => anyhow::bail!("line {}: {}", line_no, e),
            Err(e) => {
                eprintln!("line {}: skipped: {}", line_no, e);
                continue;
            }
        };

        let report = pipeline.invoke(&mut ctx, call).await;
        print_report_line(line_no, &report);

        if report.is_success() {
            completed += 1;
        } else {
            refused += 1;
            if fail_fast {
                anyhow::bail!("line {}: {} did not complete", line_no, report.tool_name);
            }
        }
    }

    println!();
    println!(
        "{} completed, {} refused (session {})",
        completed,
        refused,
        ctx.session_id()
    );
    Ok(())
}

fn print_report_line(line_no: usize, report: &InvocationReport) {
    let status = match report.error() {
        None => "ok".to_string(),
        Some(err) => err.kind().to_string(),
    };
    println!(
        "{:>4}  {:<24} {:<18} {}",
        line_no,
        report.tool_name,
        status,
        report.text()
    );
}

/// List registered tools, optionally with their parameter schemas.
pub async fn run_tools_command(tools: &ToolRegistry, verbose: bool) -> anyhow::Result<()> {
    let schemas = tools.schemas().await;
    if schemas.is_empty() {
        println!("No tools registered.");
        return Ok(());
    }

    println!("{} tools:", schemas.len());
    for schema in schemas {
        println!("  {:<24} {}", schema.name, schema.description);
        if verbose {
            let rendered = serde_json::to_string_pretty(&schema.parameters)?;
            for line in rendered.lines() {
                println!("      {}", line);
            }
        }
    }
    Ok(())
}
