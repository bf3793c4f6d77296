//! Per-conversation session context.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State owned by one conversation and passed into every pipeline call.
///
/// Nothing here is shared between sessions. Tools that need user data read
/// it from the context they are handed instead of from global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    session_id: Uuid,
    user_id: Option<String>,
    user_name: Option<String>,
    created_at: DateTime<Utc>,
    /// When a user was last identified in this session.
    identified_at: Option<DateTime<Utc>>,
    preferences: BTreeMap<String, String>,
    notes: Vec<String>,
    invocation_count: u64,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id: None,
            user_name: None,
            created_at: Utc::now(),
            identified_at: None,
            preferences: BTreeMap::new(),
            notes: Vec::new(),
            invocation_count: 0,
        }
    }

    /// A session already identified as `user_id`.
    pub fn with_user(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        let mut ctx = Self::new();
        ctx.set_user(user_id, user_name);
        ctx
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn preferences(&self) -> &BTreeMap<String, String> {
        &self.preferences
    }

    pub fn preference(&self, key: &str) -> Option<&str> {
        self.preferences.get(key).map(String::as_str)
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Number of invocations this session has sent through a pipeline.
    pub fn invocation_count(&self) -> u64 {
        self.invocation_count
    }

    pub fn is_identified(&self) -> bool {
        self.user_id.is_some()
    }

    /// Time since the user was identified, if they are.
    pub fn identified_for(&self) -> Option<Duration> {
        self.identified_at.map(|start| {
            let elapsed = Utc::now().signed_duration_since(start);
            Duration::from_secs(elapsed.num_seconds().max(0) as u64)
        })
    }

    pub fn set_user(&mut self, user_id: impl Into<String>, user_name: impl Into<String>) {
        self.user_id = Some(user_id.into());
        self.user_name = Some(user_name.into());
        self.identified_at = Some(Utc::now());
    }

    /// Forget the user and everything recorded about them.
    ///
    /// Returns the previous user name, if any.
    pub fn clear_user(&mut self) -> Option<String> {
        self.user_id = None;
        self.identified_at = None;
        self.preferences.clear();
        self.notes.clear();
        self.user_name.take()
    }

    /// Set a preference, returning the previous value.
    pub fn set_preference(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.preferences.insert(key.into(), value.into())
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub(crate) fn record_invocation(&mut self) {
        self.invocation_count += 1;
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
