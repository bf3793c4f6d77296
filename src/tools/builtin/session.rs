//! Tools that read and update the caller's session context.

use async_trait::async_trait;

use crate::context::SessionContext;
use crate::policy::Parameters;
use crate::tools::tool::{Tool, ToolError, ToolOutput, optional_str, require_str};

const NO_USER: &str = "No user context set. Please use set_user_context first.";

fn format_duration(elapsed: std::time::Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}m {}s", secs / 60, secs % 60)
}

/// Identifies the user for the rest of the session.
pub struct SetUserContextTool;

#[async_trait]
impl Tool for SetUserContextTool {
    fn name(&self) -> &str {
        "set_user_context"
    }

    fn description(&self) -> &str {
        "Set the current user for this session."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_id": {"type": "string", "description": "Unique user identifier"},
                "user_name": {"type": "string", "description": "Display name"},
                "language": {"type": "string", "description": "Preferred language (default: en)"}
            },
            "required": ["user_id", "user_name"]
        })
    }

    async fn execute(
        &self,
        params: &Parameters,
        ctx: &mut SessionContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let user_id = require_str(params, "user_id")?;
        let user_name = require_str(params, "user_name")?;
        let language = optional_str(params, "language").unwrap_or("en");

        ctx.set_user(user_id, user_name);
        ctx.set_preference("language", language);

        tracing::debug!(session = %ctx.session_id(), user_id = %user_id, "User context set");

        Ok(ToolOutput::text(
            format!(
                "User context initialized:\n  User ID: {}\n  Name: {}\n  Language: {}",
                user_id, user_name, language
            ),
            start.elapsed(),
        ))
    }
}

/// Reports the current user from the session context.
pub struct GetUserInfoTool;

#[async_trait]
impl Tool for GetUserInfoTool {
    fn name(&self) -> &str {
        "get_user_info"
    }

    fn description(&self) -> &str {
        "Get the current user's information from the session."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(
        &self,
        _params: &Parameters,
        ctx: &mut SessionContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let (Some(user_id), Some(user_name)) = (ctx.user_id(), ctx.user_name()) else {
            return Ok(ToolOutput::text(NO_USER, start.elapsed()));
        };

        let duration = ctx
            .identified_for()
            .map(format_duration)
            .unwrap_or_else(|| "Unknown".to_string());

        Ok(ToolOutput::text(
            format!(
                "Current User Information:\n  ID: {}\n  Name: {}\n  Language: {}\n  Session Duration: {}",
                user_id,
                user_name,
                ctx.preference("language").unwrap_or("Unknown"),
                duration
            ),
            start.elapsed(),
        ))
    }
}

/// Stores a preference for the identified user.
pub struct UpdatePreferenceTool;

#[async_trait]
impl Tool for UpdatePreferenceTool {
    fn name(&self) -> &str {
        "update_preference"
    }

    fn description(&self) -> &str {
        "Update a user preference (e.g. theme, timezone) in the session."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "key": {"type": "string", "description": "Preference name"},
                "value": {"type": "string", "description": "Preference value"}
            },
            "required": ["key", "value"]
        })
    }

    async fn execute(
        &self,
        params: &Parameters,
        ctx: &mut SessionContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        if !ctx.is_identified() {
            return Ok(ToolOutput::text(NO_USER, start.elapsed()));
        }

        let key = require_str(params, "key")?;
        let value = require_str(params, "value")?;
        ctx.set_preference(key, value);

        let all = ctx
            .preferences()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(ToolOutput::text(
            format!(
                "Preference updated:\n  {}: {}\n  All Preferences: {}",
                key, value, all
            ),
            start.elapsed(),
        ))
    }
}

/// Forgets the current user, their preferences and notes.
pub struct ClearUserContextTool;

#[async_trait]
impl Tool for ClearUserContextTool {
    fn name(&self) -> &str {
        "clear_user_context"
    }

    fn description(&self) -> &str {
        "Clear the current user and everything stored about them in this session."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(
        &self,
        _params: &Parameters,
        ctx: &mut SessionContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let old_user = ctx.clear_user().unwrap_or_else(|| "Unknown".to_string());
        tracing::debug!(session = %ctx.session_id(), "User context cleared");

        Ok(ToolOutput::text(
            format!("User context cleared for {}", old_user),
            start.elapsed(),
        ))
    }
}

/// Appends a free-text note to the session.
pub struct AddSessionNoteTool;

#[async_trait]
impl Tool for AddSessionNoteTool {
    fn name(&self) -> &str {
        "add_session_note"
    }

    fn description(&self) -> &str {
        "Add a note to the current user's session."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "note": {"type": "string", "description": "Note text to add"}
            },
            "required": ["note"]
        })
    }

    async fn execute(
        &self,
        params: &Parameters,
        ctx: &mut SessionContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let Some(user_name) = ctx.user_name().map(str::to_string) else {
            return Ok(ToolOutput::text(NO_USER, start.elapsed()));
        };

        let note = require_str(params, "note")?;
        ctx.add_note(note);

        Ok(ToolOutput::text(
            format!(
                "Note added to session for {}\n  Total notes: {}",
                user_name,
                ctx.notes().len()
            ),
            start.elapsed(),
        ))
    }
}

/// Summarizes the session: who, since when, and what was recorded.
pub struct GetSessionInfoTool;

#[async_trait]
impl Tool for GetSessionInfoTool {
    fn name(&self) -> &str {
        "get_session_info"
    }

    fn description(&self) -> &str {
        "Get information about the current session."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(
        &self,
        _params: &Parameters,
        ctx: &mut SessionContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let (Some(user_id), Some(user_name)) = (ctx.user_id(), ctx.user_name()) else {
            return Ok(ToolOutput::text(NO_USER, start.elapsed()));
        };

        let mut text = format!(
            "Active Session:\n  User: {}\n  ID: {}\n  Session: {}\n  Created: {}\n  Tool calls: {}\n  Notes: {}",
            user_name,
            user_id,
            ctx.session_id(),
            ctx.created_at().to_rfc3339(),
            ctx.invocation_count(),
            ctx.notes().len()
        );
        for note in ctx.notes() {
            text.push_str(&format!("\n    - {}", note));
        }

        Ok(ToolOutput::text(text, start.elapsed()))
    }
}
