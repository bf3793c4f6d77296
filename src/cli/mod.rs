//! CLI command handling.
//!
//! Provides subcommands for:
//! - Running a single tool call through the pipeline (`invoke`)
//! - Dry-running the policy decision for a call (`check`)
//! - Replaying a JSONL stream of tool calls in one session (`replay`)
//! - Printing the effective policy table (`policy`)
//! - Reading an audit log (`audit`)
//! - Listing the registered tools (`tools`)

mod audit;
mod gate;
mod policy;

pub use audit::run_audit_command;
pub use gate::{run_check_command, run_invoke_command, run_replay_command, run_tools_command};
pub use policy::run_policy_command;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::ParameterError;
use crate::policy::{Parameters, ToolCall};

#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(about = "Policy, approval, and audit gate for agent tool calls")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Policy document (JSON). Overrides TOOLGATE_POLICY_PATH.
    #[arg(long, global = true)]
    pub policy: Option<PathBuf>,

    /// Append audit records to this JSONL file. Overrides TOOLGATE_AUDIT_PATH.
    #[arg(long, global = true)]
    pub audit_log: Option<PathBuf>,

    /// Approve every request without prompting
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Seconds to wait for an approval answer before denying
    #[arg(long, global = true)]
    pub approval_timeout: Option<u64>,

    /// Disable the built-in guardrail hooks
    #[arg(long, global = true)]
    pub no_guardrails: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the environment configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(path) = &self.policy {
            config.policy.path = Some(path.clone());
        }
        if let Some(path) = &self.audit_log {
            config.audit.path = Some(path.clone());
        }
        if self.yes {
            config.approval.auto_approve = true;
        }
        if let Some(secs) = self.approval_timeout.filter(|s| *s > 0) {
            config.approval.timeout = Some(std::time::Duration::from_secs(secs));
        }
        if self.no_guardrails {
            config.guardrails.enabled = false;
        }
    }
}

/// A tool name plus `key=value` parameters.
#[derive(clap::Args, Debug, Clone)]
pub struct CallArgs {
    /// Tool name
    pub tool: String,

    /// Parameter as key=value (repeatable). Values parse as bool, number, or string.
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Parameters as a JSON object. Merged before --param values.
    #[arg(long, value_name = "JSON")]
    pub json: Option<String>,
}

impl CallArgs {
    pub fn to_call(&self) -> Result<ToolCall, ParameterError> {
        let mut parameters = match &self.json {
            Some(raw) => Parameters::from_json(&serde_json::from_str(raw)?)?,
            None => Parameters::new(),
        };
        for (key, value) in Parameters::from_pairs(&self.params)?.iter() {
            parameters.insert(key, value.clone());
        }
        Ok(ToolCall::new(self.tool.clone(), parameters))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one tool call through the full pipeline
    Invoke {
        #[command(flatten)]
        call: CallArgs,

        /// Print the full report as JSON
        #[arg(long)]
        json_output: bool,
    },

    /// Show the decision a tool call would get, without running it
    Check {
        #[command(flatten)]
        call: CallArgs,
    },

    /// Run JSONL tool calls ({"name": ..., "arguments": {...}}) one at a time
    /// in a single session. Reads stdin when no file is given, which
    /// requires --yes.
    Replay {
        file: Option<PathBuf>,

        /// Stop at the first call that does not complete
        #[arg(long)]
        fail_fast: bool,
    },

    /// Print the effective policy table as JSON
    Policy,

    /// Print records from a JSONL audit log
    Audit {
        /// Log file (default: the configured audit path)
        path: Option<PathBuf>,

        /// Print raw JSON lines instead of summaries
        #[arg(long)]
        json: bool,

        /// Only the last N records
        #[arg(short = 'n', long)]
        tail: Option<usize>,
    },

    /// List registered tools
    Tools {
        /// Include parameter schemas
        #[arg(short, long)]
        verbose: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_invoke_params() {
        let cli = Cli::try_parse_from([
            "toolgate",
            "invoke",
            "process_refund",
            "-p",
            "order_id=A-1",
            "-p",
            "amount=250",
            "--json",
            r#"{"amount": 10, "reason": "damaged"}"#,
        ])
        .unwrap();

        let Command::Invoke { call, .. } = cli.command else {
            panic!("expected invoke");
        };
        let call = call.to_call().unwrap();
        assert_eq!(call.name, "process_refund");
        assert_eq!(call.parameters.get_f64("amount"), Some(250.0));
        assert_eq!(call.parameters.get_str("reason"), Some("damaged"));
        assert_eq!(call.parameters.get_str("order_id"), Some("A-1"));
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::try_parse_from([
            "toolgate",
            "check",
            "echo",
            "--yes",
            "--approval-timeout",
            "15",
            "--no-guardrails",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert!(config.approval.auto_approve);
        assert_eq!(
            config.approval.timeout,
            Some(std::time::Duration::from_secs(15))
        );
        assert!(!config.guardrails.enabled);
    }

    #[test]
    fn test_json_params_keep_their_order() {
        let args = CallArgs {
            tool: "process_refund".into(),
            params: vec!["note=late".into()],
            json: Some(r#"{"order_id": "A-1", "amount": 250, "reason": "damaged"}"#.into()),
        };
        let call = args.to_call().unwrap();
        let keys: Vec<&str> = call.parameters.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["order_id", "amount", "reason", "note"]);
    }

    #[test]
    fn test_malformed_param() {
        let args = CallArgs {
            tool: "echo".into(),
            params: vec!["no-equals-sign".into()],
            json: None,
        };
        assert!(args.to_call().is_err());
    }
}
