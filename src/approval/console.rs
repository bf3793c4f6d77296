//! Terminal approval prompt.

use std::io::BufRead;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::approval::{ApprovalChannel, ApprovalRequest, log_request};
use crate::error::ApprovalError;
use crate::policy::ParamValue;

const CARD_WIDTH: usize = 60;
const VALUE_PREVIEW_MAX: usize = 120;

type AnswerLines = mpsc::UnboundedReceiver<std::io::Result<String>>;

/// Asks on the terminal. The card goes to stderr, the answer is read from stdin.
///
/// Only `yes` or `y` (any case) approve. Everything else, including EOF,
/// denies. Stdin is read by a single reader thread for the life of the
/// process; lines typed while no prompt is showing are discarded when the
/// next prompt opens.
#[derive(Default)]
pub struct ConsoleApproval {
    // Held for the whole prompt, so one card is on the terminal at a time.
    // `None` until the first prompt starts the reader.
    answers: Mutex<Option<AnswerLines>>,
}

impl ConsoleApproval {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read answers from `lines` instead of stdin.
    pub fn from_lines(lines: AnswerLines) -> Self {
        Self {
            answers: Mutex::new(Some(lines)),
        }
    }
}

/// Forward stdin lines until EOF or a read error.
///
/// Runs on a detached thread. A read on an idle terminal never returns, and
/// the runtime would wait for it at shutdown if it were a blocking task.
fn spawn_stdin_reader() -> AnswerLines {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let failed = line.is_err();
            if tx.send(line).is_err() || failed {
                break;
            }
        }
    });
    rx
}

#[async_trait]
impl ApprovalChannel for ConsoleApproval {
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<bool, ApprovalError> {
        let mut answers = self.answers.lock().await;
        let lines = answers.get_or_insert_with(spawn_stdin_reader);

        // Answers to earlier prompts that timed out.
        let mut stale = 0usize;
        while lines.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            tracing::debug!(stale, "Discarded input typed before the approval prompt");
        }

        log_request(request);
        eprintln!();
        eprint!("{}", render_card(request));
        eprint!("  Approve? (yes/no): ");

        let approved = match lines.recv().await {
            Some(line) => parse_answer(&line?),
            None => false,
        };
        eprintln!();

        if approved {
            tracing::info!(tool = %request.tool_name(), "Operation approved by human");
        } else {
            tracing::info!(tool = %request.tool_name(), "Operation cancelled by human");
        }
        Ok(approved)
    }
}

pub(crate) fn parse_answer(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "yes" | "y")
}

/// Box-drawn approval card, one line per parameter.
pub(crate) fn render_card(request: &ApprovalRequest) -> String {
    let mut out = String::new();

    let top_label = format!(" {} requires approval ", request.tool_name());
    let top_fill = CARD_WIDTH.saturating_sub(top_label.chars().count() + 1);
    out.push_str(&format!(
        "  \u{250C}\x1b[33m{top_label}\x1b[0m{}\n",
        "\u{2500}".repeat(top_fill)
    ));
    out.push_str(&format!("  \u{2502} {}\n", request.reason));
    out.push_str("  \u{2502}\n");

    for (key, value) in request.invocation.parameters.iter() {
        let rendered = match value {
            ParamValue::String(s) => format!("\x1b[32m\"{}\"\x1b[0m", preview(s)),
            other => other.to_string(),
        };
        out.push_str(&format!("  \u{2502}   \x1b[36m{key}\x1b[0m: {rendered}\n"));
    }
    if request.invocation.parameters.is_empty() {
        out.push_str("  \u{2502}   \x1b[90m(no parameters)\x1b[0m\n");
    }

    let id = request.id.to_string();
    let bot_label = format!(" {} ", &id[..8]);
    let bot_fill = CARD_WIDTH.saturating_sub(bot_label.len() + 2);
    out.push_str("  \u{2502}\n");
    out.push_str(&format!(
        "  \u{2514}\u{2500}\x1b[90m{bot_label}\x1b[0m{}\n",
        "\u{2500}".repeat(bot_fill)
    ));
    out
}

fn preview(s: &str) -> String {
    if s.chars().count() > VALUE_PREVIEW_MAX {
        let cut: String = s.chars().take(VALUE_PREVIEW_MAX).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}
