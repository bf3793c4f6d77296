//! Tool registry for managing available tools.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::tools::builtin::{
    AddSessionNoteTool, ClearUserContextTool, DeleteUserAccountTool, EchoTool,
    GetSessionInfoTool, GetUserInfoTool, ProcessRefundTool, RunSqlQueryTool, SendBulkEmailTool,
    SetUserContextTool, UpdateDatabaseSchemaTool, UpdatePreferenceTool,
};
use crate::tools::tool::{Tool, ToolSchema};

/// Registry of available tools, keyed by name.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tool, replacing any tool with the same name.
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.write().await.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "Replaced previously registered tool");
        } else {
            tracing::debug!("Registered tool: {}", name);
        }
    }

    pub async fn unregister(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.write().await.remove(name)
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).cloned()
    }

    pub async fn has(&self, name: &str) -> bool {
        self.tools.read().await.contains_key(name)
    }

    /// All tool names, sorted.
    pub async fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn count(&self) -> usize {
        self.tools.read().await.len()
    }

    /// Schemas of every registered tool, sorted by name.
    pub async fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .read()
            .await
            .values()
            .map(|tool| tool.schema())
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Register all built-in tools.
    pub async fn register_builtin_tools(&self) {
        let builtins: Vec<Arc<dyn Tool>> = vec![
            Arc::new(EchoTool),
            Arc::new(DeleteUserAccountTool),
            Arc::new(ProcessRefundTool),
            Arc::new(SendBulkEmailTool),
            Arc::new(UpdateDatabaseSchemaTool),
            Arc::new(RunSqlQueryTool),
            Arc::new(SetUserContextTool),
            Arc::new(GetUserInfoTool),
            Arc::new(UpdatePreferenceTool),
            Arc::new(ClearUserContextTool),
            Arc::new(AddSessionNoteTool),
            Arc::new(GetSessionInfoTool),
        ];
        for tool in builtins {
            self.register(tool).await;
        }

        tracing::info!("Registered {} built-in tools", self.count().await);
    }

    /// A registry with every built-in tool.
    pub async fn with_builtin_tools() -> Self {
        let registry = Self::new();
        registry.register_builtin_tools().await;
        registry
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
