//! Stdio JSON-RPC server exposing the workspace tools
//!
//! Requests are handled one at a time in arrival order. A tool call runs to
//! completion (or to cancellation) before the next line is read.

mod protocol;
mod transport;

pub use protocol::{
    Content, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, METHOD_NOT_FOUND, Tool, ToolCallParams, ToolCallResult,
};
pub use transport::{Incoming, LineTransport};

use anyhow::Result;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::git::CancellationWatcher;
use crate::tools::ToolService;
use protocol::{InitializeResult, PROTOCOL_VERSION, ServerCapabilities, ServerInfo, ToolsListResult};

pub struct McpServer<R, W> {
    transport: LineTransport<R, W>,
    service: ToolService,
    cancel: CancellationWatcher,
}

impl<R, W> McpServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(transport: LineTransport<R, W>, service: ToolService, cancel: CancellationWatcher) -> Self {
        Self {
            transport,
            service,
            cancel,
        }
    }

    /// Serve until end of input or cancellation
    pub async fn run(&mut self) -> Result<()> {
        info!("Serving workspace {} on stdio", self.service.root().display());

        loop {
            if self.cancel.is_cancelled() {
                info!("Server cancelled");
                break;
            }

            let incoming = tokio::select! {
                message = self.transport.read_message() => message?,
                _ = self.cancel.cancelled() => {
                    info!("Server cancelled");
                    break;
                }
            };

            match incoming {
                Some(Incoming::Request(request)) => {
                    if let Some(response) = self.handle_request(request).await {
                        self.transport.write_response(&response).await?;
                    }
                }
                Some(Incoming::Malformed(reason)) => {
                    warn!("Malformed request: {}", reason);
                    let response =
                        JsonRpcResponse::failure(None, INVALID_REQUEST, format!("Invalid request: {}", reason));
                    self.transport.write_response(&response).await?;
                }
                None => {
                    info!("Client disconnected");
                    break;
                }
            }
        }

        Ok(())
    }

    pub fn into_transport(self) -> LineTransport<R, W> {
        self.transport
    }

    /// `None` for notifications
    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!("Notification {}", request.method);
            return None;
        }

        debug!("Request {}", request.method);
        let id = request.id;
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(),
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => match serde_json::from_value::<ToolCallParams>(request.params) {
                Ok(params) => self.handle_tool_call(params).await,
                Err(e) => {
                    return Some(JsonRpcResponse::failure(
                        id,
                        INVALID_PARAMS,
                        format!("Invalid tools/call params: {}", e),
                    ));
                }
            },
            other => {
                return Some(JsonRpcResponse::failure(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", other),
                ));
            }
        };

        Some(match response {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
        })
    }

    fn handle_initialize(&self) -> Result<Value> {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        Ok(serde_json::to_value(result)?)
    }

    fn handle_tools_list(&self) -> Result<Value> {
        Ok(serde_json::to_value(ToolsListResult { tools: tool_catalog() })?)
    }

    async fn handle_tool_call(&self, params: ToolCallParams) -> Result<Value> {
        info!("tools/call {}", params.name);
        let value = self.service.call(&params.name, params.arguments, &self.cancel).await;
        Ok(serde_json::to_value(ToolCallResult::from_tool_value(&value))?)
    }
}

/// Definitions advertised by `tools/list`
pub fn tool_catalog() -> Vec<Tool> {
    let types = json!({
        "type": "array",
        "items": { "type": "string" },
        "description": "Only modules of these types (core, manager, util, plugin, mcp); all when omitted"
    });

    vec![
        Tool {
            name: "list_modules".to_string(),
            description: "List every module of the workspace, optionally with scanned imports and dependency findings".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "with_imports": {
                        "type": "boolean",
                        "description": "Scan source files and compare imports with the manifest",
                        "default": false
                    },
                    "types": types.clone()
                }
            }),
        },
        Tool {
            name: "get_module_info".to_string(),
            description: "Imports, dependency findings and git status of one module".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Module name" }
                },
                "required": ["name"]
            }),
        },
        Tool {
            name: "create_module".to_string(),
            description: "Scaffold a new module, optionally creating a remote repository".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "snake_case module name" },
                    "module_type": {
                        "type": "string",
                        "enum": ["core", "manager", "util", "plugin", "mcp"]
                    },
                    "create_repo": { "type": "boolean", "default": false },
                    "owner": { "type": "string", "description": "User or organization owning the remote repository" }
                },
                "required": ["name", "module_type"]
            }),
        },
        Tool {
            name: "git_modules".to_string(),
            description: "Run status, diff, pull or push across module repositories".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": { "type": "string", "enum": ["status", "diff", "pull", "push"] },
                    "module_name": { "type": "string", "description": "Restrict to a single module" },
                    "commit_message": { "type": "string", "description": "Required to push uncommitted changes" },
                    "types": types
                },
                "required": ["action"]
            }),
        },
    ]
}
