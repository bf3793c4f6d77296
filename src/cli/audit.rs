use std::path::{Path, PathBuf};

use crate::audit::{AuditRecord, JsonlAuditLog};
use crate::config::AuditConfig;
use crate::pipeline::Outcome;

/// Print records from a JSONL audit log, oldest first.
pub async fn run_audit_command(
    config: &AuditConfig,
    path: Option<&Path>,
    json: bool,
    tail: Option<usize>,
) -> anyhow::Result<()> {
    let path: PathBuf = match path.or(config.path.as_deref()) {
        Some(path) => path.to_path_buf(),
        None => anyhow::bail!("No audit log given. Pass a path or set TOOLGATE_AUDIT_PATH."),
    };

    let records = JsonlAuditLog::read_all(&path).await?;
    let shown = last_n(&records, tail);

    if shown.is_empty() {
        println!("No audit records in {}", path.display());
        return Ok(());
    }

    for record in shown {
        if json {
            println!("{}", serde_json::to_string(record)?);
        } else {
            println!("{}", record.summary());
        }
    }

    if !json {
        let refused = records
            .iter()
            .filter(|r| !matches!(r.outcome, Outcome::Completed { .. }))
            .count();
        println!();
        println!(
            "{} record(s), {} refused ({})",
            records.len(),
            refused,
            path.display()
        );
    }
    Ok(())
}

fn last_n(records: &[AuditRecord], n: Option<usize>) -> &[AuditRecord] {
    match n {
        Some(n) if n < records.len() => &records[records.len() - n..],
        _ => records,
    }
}
