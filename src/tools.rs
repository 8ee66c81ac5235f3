//! Tool definitions and registry for MCP server.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::protocol::{ContentItem, ToolCallResult, ToolDefinition};

/// Tool trait for implementing MCP tools.
///
/// A failing tool is not a protocol error: the registry turns the failure
/// into an `isError` result for the client.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given arguments.
    async fn call(&self, arguments: Map<String, Value>) -> anyhow::Result<Vec<ContentItem>>;
}

/// Adapter that lets a plain function act as a [`Tool`].
struct FnTool<F> {
    definition: ToolDefinition,
    handler: F,
}

#[async_trait::async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(Map<String, Value>) -> anyhow::Result<Vec<ContentItem>> + Send + Sync,
{
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn call(&self, arguments: Map<String, Value>) -> anyhow::Result<Vec<ContentItem>> {
        (self.handler)(arguments)
    }
}

struct Entry {
    definition: ToolDefinition,
    tool: Arc<dyn Tool>,
}

/// Registry of available tools.
///
/// Tools are listed in registration order. Registering a name again replaces
/// the earlier tool but keeps its position.
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Entry>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let definition = tool.definition();
        tracing::debug!("Registering tool {}", definition.name);
        self.tools
            .insert(definition.name.clone(), Entry { definition, tool });
    }

    /// Register a synchronous handler under the given definition.
    pub fn register_fn<F>(&mut self, definition: ToolDefinition, handler: F)
    where
        F: Fn(Map<String, Value>) -> anyhow::Result<Vec<ContentItem>> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnTool {
            definition,
            handler,
        }));
    }

    /// Get tool definitions.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|entry| entry.definition.clone())
            .collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tool is registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name.
    ///
    /// Only an unknown name is an error. Handler failures and panics come back
    /// as a result with `is_error` set.
    pub async fn invoke(&self, name: &str, arguments: Map<String, Value>) -> Result<ToolCallResult> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))?;

        let outcome = AssertUnwindSafe(entry.tool.call(arguments))
            .catch_unwind()
            .await;

        Ok(match outcome {
            Ok(Ok(content)) => ToolCallResult::success(content),
            Ok(Err(e)) => {
                tracing::warn!("Tool {} failed: {:#}", name, e);
                ToolCallResult::failure(format!("Error: {e:#}"))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::warn!("Tool {} panicked: {}", name, message);
                ToolCallResult::failure(format!("Tool panicked: {message}"))
            }
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
