use async_trait::async_trait;

use crate::errors::AgentResult;
use crate::models::tool::{Tool, ToolCall, ToolOutput};

/// A group of related tools that the agent can operate
///
/// Tool failures the user should hear about (bad SQL, no image returned) are
/// reported as text inside an `Ok` output so the model can react to them. `Err` is
/// reserved for calls that never reached the tool, like unknown names or arguments
/// that do not fit the schema.
#[async_trait]
pub trait Toolbox: Send + Sync {
    /// Get the name of the toolbox
    fn name(&self) -> &str;

    /// Get the toolbox description
    fn description(&self) -> &str;

    /// Get available tools
    fn tools(&self) -> &[Tool];

    /// Call a tool with the given arguments
    async fn call(&self, tool_call: ToolCall) -> AgentResult<ToolOutput>;
}
