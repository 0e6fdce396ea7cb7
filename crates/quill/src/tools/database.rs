use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use super::spreadsheet::{sanitize_table_name, write_rows};
use super::{file_timestamp, output_path};
use crate::database::{strip_code_fences, Database, DatabaseError};
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Artifact, ArtifactKind, Tool, ToolCall, ToolOutput};
use crate::toolbox::Toolbox;

/// Querying, exporting and describing the connected database
pub struct DatabaseToolbox {
    tools: Vec<Tool>,
    database: Arc<dyn Database>,
    output_dir: PathBuf,
}

impl DatabaseToolbox {
    pub fn new(database: Arc<dyn Database>, output_dir: impl Into<PathBuf>) -> Self {
        let query_database = Tool::new(
            "query_database",
            "Executes a SQL query against the MySQL database and returns the result rows \
             as JSON. Use this to answer questions about the data.",
            json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The SQL query to execute"
                    }
                }
            }),
        );

        let export_to_excel = Tool::new(
            "export_to_excel",
            "Executes a SQL query and saves the result to an Excel file. Returns the path \
             of the saved file. Use this when the user asks to export data or for a file, \
             excel or spreadsheet.",
            json!({
                "type": "object",
                "required": ["query", "table_name"],
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The SQL query whose results should be exported"
                    },
                    "table_name": {
                        "type": "string",
                        "description": "The main table being queried, used to name the file"
                    }
                }
            }),
        );

        let get_database_tables = Tool::new(
            "get_database_tables",
            "Lists all tables in the database. Use this to discover the schema before \
             writing a query.",
            json!({
                "type": "object",
                "required": [],
                "properties": {}
            }),
        );

        Self {
            tools: vec![query_database, export_to_excel, get_database_tables],
            database,
            output_dir: output_dir.into(),
        }
    }

    async fn query_database(&self, query: &str) -> ToolOutput {
        let sql = strip_code_fences(query);
        tracing::debug!(%sql, "running query");
        match self.database.fetch(&sql).await {
            Ok(rows) if rows.is_empty() => ToolOutput::text("Query returned no results."),
            Ok(rows) => ToolOutput::text(rows.to_json_pretty()),
            Err(e) => ToolOutput::text(describe_error(&e)),
        }
    }

    async fn export_to_excel(&self, query: &str, table_name: &str) -> ToolOutput {
        let sql = strip_code_fences(query);
        let rows = match self.database.fetch(&sql).await {
            Ok(rows) if rows.is_empty() => {
                return ToolOutput::text("Query returned no data to export.")
            }
            Ok(rows) => rows,
            Err(e) => return ToolOutput::text(describe_error(&e)),
        };

        let file_name = format!(
            "{}_{}.xlsx",
            sanitize_table_name(table_name),
            file_timestamp()
        );
        let path = match output_path(&self.output_dir, &file_name) {
            Ok(path) => path,
            Err(e) => {
                return ToolOutput::text(format!("Error creating output directory: {}", e))
            }
        };

        if let Err(e) = write_rows(&path, &rows) {
            tracing::error!(path = %path.display(), error = %e, "failed to write spreadsheet");
            return ToolOutput::text(format!("Error writing Excel file: {}", e));
        }

        tracing::info!(path = %path.display(), rows = rows.len(), "exported query results");
        ToolOutput::text(format!("Successfully exported data to {}", path.display()))
            .with_artifact(Artifact::new(path, ArtifactKind::Spreadsheet))
    }

    async fn get_database_tables(&self) -> ToolOutput {
        match self.database.list_tables().await {
            Ok(tables) if tables.is_empty() => ToolOutput::text("No tables were found."),
            Ok(tables) => ToolOutput::text(format!("Available tables: {}", tables.join(", "))),
            Err(e) => ToolOutput::text(describe_error(&e)),
        }
    }
}

fn describe_error(error: &DatabaseError) -> String {
    tracing::warn!(error = %error, "database tool failed");
    match error {
        DatabaseError::Connection(detail) => format!("Error connecting to database: {}", detail),
        DatabaseError::Execution(detail) => format!("Error executing query: {}", detail),
    }
}

fn string_arg<'a>(tool_call: &'a ToolCall, name: &str) -> AgentResult<&'a str> {
    tool_call
        .arguments
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AgentError::InvalidParameters(format!("The {} parameter is required", name)))
}

#[async_trait]
impl Toolbox for DatabaseToolbox {
    fn name(&self) -> &str {
        "database"
    }

    fn description(&self) -> &str {
        "Query the MySQL database and export results to Excel"
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<ToolOutput> {
        match tool_call.name.as_str() {
            "query_database" => Ok(self.query_database(string_arg(&tool_call, "query")?).await),
            "export_to_excel" => {
                let query = string_arg(&tool_call, "query")?;
                let table_name = string_arg(&tool_call, "table_name")?;
                Ok(self.export_to_excel(query, table_name).await)
            }
            "get_database_tables" => Ok(self.get_database_tables().await),
            _ => Err(AgentError::ToolNotFound(tool_call.name.clone())),
        }
    }
}
