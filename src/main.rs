//! Toolgate - Main entry point.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use toolgate::{
    approval::ConsoleApproval,
    cli::{
        Cli, Command, run_audit_command, run_check_command, run_invoke_command,
        run_policy_command, run_replay_command, run_tools_command,
    },
    config::Config,
    pipeline::Pipeline,
    tools::ToolRegistry,
};

/// Initialize tracing for CLI commands. Logs go to stderr so stdout stays
/// clean for tool output and JSON.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_tracing();

    let mut config = Config::from_env()?;
    cli.apply_overrides(&mut config);

    // Commands that don't run tool calls
    match &cli.command {
        Command::Policy => return run_policy_command(&config.policy),
        Command::Audit { path, json, tail } => {
            return run_audit_command(&config.audit, path.as_deref(), *json, *tail).await;
        }
        Command::Tools { verbose } => {
            let tools = ToolRegistry::with_builtin_tools().await;
            return run_tools_command(&tools, *verbose).await;
        }
        _ => {}
    }

    let tools = Arc::new(ToolRegistry::with_builtin_tools().await);
    let pipeline = Pipeline::from_config(&config, tools, Arc::new(ConsoleApproval::new())).await?;

    tracing::debug!(
        rules = pipeline.policy().len(),
        failure_mode = %pipeline.policy().failure_mode(),
        approval_timeout = ?pipeline.approval_timeout(),
        "Pipeline ready"
    );

    match &cli.command {
        Command::Invoke { call, json_output } => {
            run_invoke_command(&pipeline, call, *json_output).await
        }
        Command::Check { call } => run_check_command(&pipeline, call).await,
        Command::Replay { file, fail_fast } => {
            run_replay_command(
                &pipeline,
                file.as_deref(),
                *fail_fast,
                config.approval.auto_approve,
            )
            .await
        }
        Command::Policy | Command::Audit { .. } | Command::Tools { .. } => Ok(()),
    }
}
