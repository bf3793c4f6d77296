//! Database tools: schema changes and ad-hoc queries.

use async_trait::async_trait;

use crate::context::SessionContext;
use crate::policy::Parameters;
use crate::tools::tool::{Tool, ToolError, ToolOutput, require_str};

const SCHEMA_OPERATIONS: &[&str] = &["CREATE", "ALTER", "DROP", "TRUNCATE", "RENAME"];

/// Applies a schema operation to a table (simulated).
pub struct UpdateDatabaseSchemaTool;

#[async_trait]
impl Tool for UpdateDatabaseSchemaTool {
    fn name(&self) -> &str {
        "update_database_schema"
    }

    fn description(&self) -> &str {
        "Update the database schema (CREATE, ALTER, DROP, TRUNCATE, RENAME)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "table_name": {
                    "type": "string",
                    "description": "Table to change"
                },
                "operation": {
                    "type": "string",
                    "enum": SCHEMA_OPERATIONS,
                    "description": "Schema operation to perform"
                }
            },
            "required": ["table_name", "operation"]
        })
    }

    async fn execute(
        &self,
        params: &Parameters,
        _ctx: &mut SessionContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let table = require_str(params, "table_name")?;
        let operation = require_str(params, "operation")?.trim().to_uppercase();
        if !SCHEMA_OPERATIONS.contains(&operation.as_str()) {
            return Err(ToolError::InvalidParameters(format!(
                "unsupported schema operation '{}'",
                operation
            )));
        }

        tracing::info!(table = %table, operation = %operation, "Applying schema change");

        Ok(ToolOutput::text(
            format!(
                "Database schema updated\n  Table: {}\n  Operation: {}\n  Status: Schema changes applied successfully",
                table, operation
            ),
            start.elapsed(),
        ))
    }
}

/// Runs a read query (simulated) and echoes it back.
pub struct RunSqlQueryTool;

#[async_trait]
impl Tool for RunSqlQueryTool {
    fn name(&self) -> &str {
        "run_sql_query"
    }

    fn description(&self) -> &str {
        "Run a SQL query against the database."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_query": {
                    "type": "string",
                    "description": "The SQL query to run"
                }
            },
            "required": ["user_query"]
        })
    }

    async fn execute(
        &self,
        params: &Parameters,
        _ctx: &mut SessionContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();
        let query = require_str(params, "user_query")?;
        Ok(ToolOutput::text(
            format!("Query executed: {}", query),
            start.elapsed(),
        ))
    }
}
