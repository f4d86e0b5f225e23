//! MCP server implementation.
//!
//! The server handles the MCP protocol lifecycle:
//! 1. Initialize - exchange capabilities
//! 2. List and call tools - dispatch into the [`LinearService`]
//! 3. Shutdown - the transport reports end of stream; in-flight calls drain
//!
//! Tool failures never escape as JSON-RPC errors. Every `tools/call` gets a
//! result envelope with `isError` set accordingly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use linear_core::LinearService;
use serde_json::Value;

use crate::error::{ToolError, TransportError};
use crate::handlers::ToolRegistry;
use crate::protocol::{
    IncomingMessage, InitializeParams, InitializeResult, JsonRpcError, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, RequestId, ServerCapabilities, ServerInfo, ToolCallParams,
    ToolCallResult, ToolDefinition, ToolsCapability, ToolsListResult, MCP_VERSION, SERVER_NAME,
};
use crate::transport::{Inbound, Transport};

/// Deadline applied to every tool call unless configured otherwise.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// MCP server exposing a [`ToolRegistry`] backed by one shared service.
pub struct McpServer {
    registry: ToolRegistry,
    service: Arc<dyn LinearService>,
    call_timeout: Duration,
    initialized: AtomicBool,
}

impl McpServer {
    /// Create a server with the full Linear catalog.
    pub fn new(service: Arc<dyn LinearService>) -> Self {
        Self {
            registry: ToolRegistry::builtin(),
            service,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            initialized: AtomicBool::new(false),
        }
    }

    /// Set the per-call deadline.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Replace the tool catalog.
    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Whether a client has completed `initialize`.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }

    /// The catalog in wire form; stable across calls.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Invoke a tool and wrap the outcome in a result envelope.
    pub async fn call_tool(&self, name: &str, arguments: Option<Value>) -> ToolCallResult {
        tracing::info!(tool = %name, "Calling tool");

        match self.dispatch(name, arguments).await {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool call failed");
                ToolCallResult::error(e)
            }
        }
    }

    async fn dispatch(&self, name: &str, arguments: Option<Value>) -> Result<String, ToolError> {
        // Checked before the name so that every call without arguments reads the same.
        let args = arguments.ok_or(ToolError::NoArguments)?;

        let spec = self
            .registry
            .resolve(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let value = tokio::time::timeout(self.call_timeout, spec.invoke(self.service.as_ref(), args))
            .await
            .map_err(|_| ToolError::Timeout {
                tool: name.to_string(),
                after_secs: self.call_timeout.as_secs(),
            })??;

        Ok(serde_json::to_string_pretty(&value)?)
    }

    /// Handle one inbound message. Notifications produce no response.
    pub async fn handle_message(&self, msg: IncomingMessage) -> Option<JsonRpcResponse> {
        match msg {
            IncomingMessage::Request(req) => Some(self.handle_request(req).await),
            IncomingMessage::Notification(notif) => {
                self.handle_notification(&notif);
                None
            }
        }
    }

    /// Serve `transport` until it reports end of stream.
    ///
    /// Requests are dispatched concurrently; responses go out as they
    /// complete. Once the transport closes, calls already in flight are
    /// allowed to finish before this returns.
    pub async fn connect<T: Transport>(self, mut transport: T) -> Result<(), TransportError> {
        tracing::info!(tools = self.registry.len(), "MCP server connected");

        let server = &self;
        let mut in_flight = FuturesUnordered::new();
        let mut open = true;

        loop {
            tokio::select! {
                inbound = transport.recv(), if open => match inbound {
                    Ok(Some(Inbound { origin, message })) => {
                        in_flight.push(async move { (origin, server.handle_message(message).await) });
                    }
                    Ok(None) => {
                        tracing::info!(pending = in_flight.len(), "Transport closed, shutting down");
                        open = false;
                    }
                    Err(TransportError::Malformed { origin, reason }) => {
                        tracing::warn!(error = %reason, "Malformed message");
                        let response =
                            JsonRpcResponse::error(RequestId::Null, reason.to_rpc_error());
                        transport.send(&response, origin).await?;
                    }
                    Err(e) => return Err(e),
                },
                Some((origin, response)) = in_flight.next(), if !in_flight.is_empty() => {
                    if let Some(response) = response {
                        transport.send(&response, origin).await?;
                    }
                }
                else => break,
            }
        }

        tracing::info!("MCP server stopped");
        Ok(())
    }

    async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        tracing::debug!("Handling request: {} (id: {:?})", req.method, req.id);

        match req.method.as_str() {
            "initialize" => self.handle_initialize(req.id, req.params),
            "tools/list" => self.handle_tools_list(req.id),
            "tools/call" => self.handle_tools_call(req.id, req.params).await,
            "ping" => JsonRpcResponse::success(req.id, serde_json::json!({})),
            method => {
                tracing::warn!("Unknown method: {}", method);
                JsonRpcResponse::error(req.id, JsonRpcError::method_not_found(method))
            }
        }
    }

    fn handle_notification(&self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" | "initialized" => {
                tracing::info!("Client initialized");
            }
            "notifications/cancelled" => {
                tracing::debug!("Request cancelled by client");
            }
            method => {
                tracing::debug!("Ignoring notification: {}", method);
            }
        }
    }

    fn handle_initialize(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        if let Some(params) = params {
            match serde_json::from_value::<InitializeParams>(params) {
                Ok(init) => {
                    tracing::info!(
                        "Client: {} v{} (protocol: {})",
                        init.client_info.name,
                        init.client_info.version,
                        init.protocol_version
                    );
                }
                Err(e) => {
                    tracing::warn!("Failed to parse initialize params: {}", e);
                }
            }
        }

        if self.initialized.swap(true, Ordering::Relaxed) {
            tracing::info!("Client re-initialized");
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        JsonRpcResponse::from_result(id, &result)
    }

    fn handle_tools_list(&self, id: RequestId) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self.list_tools(),
        };
        JsonRpcResponse::from_result(id, &result)
    }

    async fn handle_tools_call(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p @ Value::Object(_)) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(id, JsonRpcError::invalid_params(&e.to_string()));
                }
            },
            Some(_) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("params must be an object"),
                );
            }
            None => {
                return JsonRpcResponse::error(id, JsonRpcError::invalid_params("Missing params"));
            }
        };

        let result = self.call_tool(&params.name, params.arguments).await;
        JsonRpcResponse::from_result(id, &result)
    }
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("tools", &self.registry.len())
            .field("call_timeout", &self.call_timeout)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{HandlerFuture, ToolSpec};
    use crate::protocol::JSONRPC_VERSION;
    use crate::schema::Field;
    use crate::transport::StdioTransport;
    use linear_core::{
        GetIssuesArgs, Issue, IssueMutation, MockLinearService, Priority, TeamRef, User, Viewer,
    };
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn issue(n: u32) -> Issue {
        Issue {
            id: format!("id-{}", n),
            identifier: format!("ENG-{}", n),
            title: format!("Issue {}", n),
            description: None,
            state: Some("Todo".into()),
            priority: Some(3.0),
            team: Some(TeamRef {
                id: "T1".into(),
                name: "Engineering".into(),
                key: Some("ENG".into()),
            }),
            assignee: None,
            project: None,
            cycle: None,
            parent: None,
            url: format!("https://linear.app/acme/issue/ENG-{}", n),
            created_at: "2024-01-01T00:00:00.000Z".into(),
            updated_at: None,
        }
    }

    fn server(mock: MockLinearService) -> McpServer {
        McpServer::new(Arc::new(mock))
    }

    fn request(id: i64, method: &str, params: Option<Value>) -> IncomingMessage {
        IncomingMessage::Request(JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Number(id),
            method: method.to_string(),
            params,
        })
    }

    fn parse_text(result: &ToolCallResult) -> Value {
        serde_json::from_str(result.first_text().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_get_issues_passes_limit() {
        let mut mock = MockLinearService::new();
        mock.expect_get_issues()
            .withf(|args: &GetIssuesArgs| args.limit == Some(5))
            .times(1)
            .returning(|_| Ok((1..=5).map(issue).collect()));

        let result = server(mock)
            .call_tool("linear_getIssues", Some(json!({"limit": 5})))
            .await;

        assert!(!result.is_error);
        let issues = parse_text(&result);
        assert!(issues.as_array().unwrap().len() <= 5);
        assert_eq!(issues[0]["identifier"], "ENG-1");
    }

    #[test]
    fn test_debug_summarizes_server() {
        let server = server(MockLinearService::new()).with_call_timeout(Duration::from_secs(5));
        let text = format!("{:?}", server);
        assert!(text.contains("tools: 32"));
        assert!(text.contains("call_timeout: 5s"));
    }

    #[tokio::test]
    async fn test_oversized_limit_is_a_validation_error() {
        let mut mock = MockLinearService::new();
        mock.expect_get_issues().times(0);

        let result = server(mock)
            .call_tool("linear_getIssues", Some(json!({"limit": 5_000_000_000u64})))
            .await;

        assert!(result.is_error);
        assert_eq!(
            result.first_text(),
            Some("Error: Invalid arguments for linear_getIssues: limit: must be at most 4294967295")
        );
    }

    #[tokio::test]
    async fn test_create_issue_without_assignee() {
        let mut mock = MockLinearService::new();
        mock.expect_create_issue()
            .withf(|args| args.title == "Bug" && args.team_id == "T1" && args.assignee_id.is_none())
            .times(1)
            .returning(|_| {
                let mut created = issue(7);
                created.title = "Bug".into();
                Ok(created)
            });

        let result = server(mock)
            .call_tool("linear_createIssue", Some(json!({"title": "Bug", "teamId": "T1"})))
            .await;

        assert!(!result.is_error);
        let created = parse_text(&result);
        assert_eq!(created["id"], "id-7");
        assert_eq!(created["title"], "Bug");
        assert!(created["url"].as_str().unwrap().ends_with("ENG-7"));
    }

    #[tokio::test]
    async fn test_create_issue_missing_title_never_reaches_backend() {
        let mut mock = MockLinearService::new();
        mock.expect_create_issue().never();

        let result = server(mock)
            .call_tool("linear_createIssue", Some(json!({"teamId": "T1"})))
            .await;

        assert!(result.is_error);
        assert_eq!(
            result.first_text(),
            Some("Error: Invalid arguments for linear_createIssue: title: is required")
        );
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let result = server(MockLinearService::new())
            .call_tool("linear_doesNotExist", Some(json!({})))
            .await;

        assert!(result.is_error);
        assert_eq!(result.first_text(), Some("Error: Unknown tool: linear_doesNotExist"));
    }

    #[tokio::test]
    async fn test_priority_out_of_range_rejected() {
        let mut mock = MockLinearService::new();
        mock.expect_set_issue_priority().never();

        let result = server(mock)
            .call_tool(
                "linear_setIssuePriority",
                Some(json!({"issueId": "ENG-1", "priority": 9})),
            )
            .await;

        assert!(result.is_error);
        assert!(result.first_text().unwrap().contains("priority: must be one of"));
    }

    #[tokio::test]
    async fn test_priority_in_range_admitted() {
        let mut mock = MockLinearService::new();
        mock.expect_set_issue_priority()
            .withf(|args| args.priority == Priority::Urgent)
            .times(1)
            .returning(|_| {
                Ok(IssueMutation {
                    success: true,
                    issue: issue(1),
                })
            });

        let result = server(mock)
            .call_tool(
                "linear_setIssuePriority",
                Some(json!({"issueId": "ENG-1", "priority": 1})),
            )
            .await;

        assert!(!result.is_error, "{:?}", result.first_text());
        assert_eq!(parse_text(&result)["success"], true);
    }

    #[tokio::test]
    async fn test_missing_arguments_even_for_argless_tool() {
        let mut mock = MockLinearService::new();
        mock.expect_get_viewer().never();
        let server = server(mock);

        let result = server.call_tool("linear_getViewer", None).await;
        assert_eq!(result.first_text(), Some("Error: No arguments provided"));

        // Checked before the name is resolved
        let result = server.call_tool("linear_doesNotExist", None).await;
        assert_eq!(result.first_text(), Some("Error: No arguments provided"));
    }

    #[tokio::test]
    async fn test_backend_failure_becomes_envelope() {
        let mut mock = MockLinearService::new();
        mock.expect_get_users()
            .returning(|| Err(linear_core::Error::Auth("Invalid API key".into())));

        let result = server(mock).call_tool("linear_getUsers", Some(json!({}))).await;

        assert!(result.is_error);
        assert!(result.first_text().unwrap().starts_with("Error: "));
        assert!(result.first_text().unwrap().contains("Invalid API key"));
    }

    #[tokio::test]
    async fn test_result_text_round_trips() {
        let viewer = Viewer {
            user: User {
                id: "u1".into(),
                name: "Ada".into(),
                email: Some("ada@example.com".into()),
                display_name: None,
                active: true,
            },
            organization: None,
        };
        let expected = serde_json::to_value(&viewer).unwrap();

        let mut mock = MockLinearService::new();
        mock.expect_get_viewer().returning(move || Ok(viewer.clone()));

        let result = server(mock).call_tool("linear_getViewer", Some(json!({}))).await;
        let text = result.first_text().unwrap();

        assert!(text.contains('\n'), "result text is pretty-printed");
        assert_eq!(serde_json::from_str::<Value>(text).unwrap(), expected);
    }

    fn stall<'a>(_: &'a dyn LinearService, _: Value) -> HandlerFuture<'a> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Value::Null)
        })
    }

    fn no_output() -> Value {
        json!({})
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout() {
        const INPUT: &[Field] = &[];
        let registry = ToolRegistry::new(vec![ToolSpec {
            name: "stall",
            description: "never finishes",
            input: INPUT,
            output: no_output,
            handler: stall,
        }]);
        let server = server(MockLinearService::new())
            .with_registry(registry)
            .with_call_timeout(Duration::from_secs(2));

        let result = server.call_tool("stall", Some(json!({}))).await;

        assert!(result.is_error);
        assert_eq!(result.first_text(), Some("Error: Tool stall timed out after 2s"));
    }

    #[test]
    fn test_list_tools_is_stable() {
        let server = server(MockLinearService::new());
        let first = server.list_tools();
        let second = server.list_tools();

        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
        assert!(first.iter().all(|t| t.output_schema.is_none()));
    }

    #[test]
    fn test_every_listed_tool_resolves() {
        let server = server(MockLinearService::new());
        let listed: Vec<String> = server.list_tools().into_iter().map(|t| t.name).collect();
        let registered: Vec<&str> = server.registry().names().collect();

        assert_eq!(listed, registered);
        for name in &listed {
            assert!(server.registry().resolve(name).is_some(), "{}", name);
        }
    }

    #[tokio::test]
    async fn test_initialize_response() {
        let server = server(MockLinearService::new());
        let params = json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {"name": "test-client", "version": "1.0.0"}
        });

        let response = server
            .handle_message(request(1, "initialize", Some(params)))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_VERSION);
        assert_eq!(result["serverInfo"]["name"], "linear-mcp-server");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert!(server.is_initialized());

        // A second initialize is answered as well
        let again = server.handle_message(request(2, "initialize", None)).await.unwrap();
        assert!(again.error.is_none());
    }

    #[tokio::test]
    async fn test_tools_list_request() {
        let server = server(MockLinearService::new());
        let response = server.handle_message(request(1, "tools/list", None)).await.unwrap();

        let tools = &response.result.unwrap()["tools"];
        assert_eq!(tools[0]["name"], "linear_getViewer");
        assert!(tools[0].get("inputSchema").is_some());
        assert!(tools[0].get("outputSchema").is_none());
    }

    #[tokio::test]
    async fn test_tools_call_params_errors() {
        let server = server(MockLinearService::new());

        for params in [None, Some(json!([1, 2])), Some(json!({"arguments": {}}))] {
            let response = server.handle_message(request(1, "tools/call", params)).await.unwrap();
            assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
        }
    }

    #[tokio::test]
    async fn test_tool_failure_is_not_a_jsonrpc_error() {
        let server = server(MockLinearService::new());
        let response = server
            .handle_message(request(
                3,
                "tools/call",
                Some(json!({"name": "linear_doesNotExist", "arguments": {}})),
            ))
            .await
            .unwrap();

        assert!(response.error.is_none());
        assert_eq!(response.result.unwrap()["isError"], true);
    }

    #[tokio::test]
    async fn test_unknown_method_and_ping() {
        let server = server(MockLinearService::new());

        let response = server.handle_message(request(1, "resources/list", None)).await.unwrap();
        assert_eq!(response.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);

        let response = server.handle_message(request(2, "ping", None)).await.unwrap();
        assert_eq!(response.result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let server = server(MockLinearService::new());
        let notif = IncomingMessage::Notification(JsonRpcNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: "notifications/initialized".to_string(),
            params: None,
        });
        assert!(server.handle_message(notif).await.is_none());
    }

    #[tokio::test]
    async fn test_connect_over_stream() {
        let (client, server_side) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_side);
        let (client_read, mut client_write) = tokio::io::split(client);

        let transport = StdioTransport::new(BufReader::new(server_read), server_write);
        let task = tokio::spawn(server(MockLinearService::new()).connect(transport));

        client_write
            .write_all(
                b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n\
                  {not json}\n\
                  {\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n\
                  {\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n",
            )
            .await
            .unwrap();
        client_write.shutdown().await.unwrap();

        let mut lines = BufReader::new(client_read).lines();
        let mut responses = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            responses.push(serde_json::from_str::<Value>(&line).unwrap());
        }
        task.await.unwrap().unwrap();

        assert_eq!(responses.len(), 3);
        let parse_error = responses.iter().find(|r| r["id"].is_null()).unwrap();
        assert_eq!(parse_error["error"]["code"], JsonRpcError::PARSE_ERROR);
        assert!(responses.iter().any(|r| r["id"] == 1 && r["result"] == json!({})));
        assert!(responses.iter().any(|r| r["id"] == 2 && r["result"]["tools"].is_array()));
    }

    #[tokio::test]
    async fn test_connect_survives_bad_frames() {
        let (client, server_side) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_side);
        let (client_read, mut client_write) = tokio::io::split(client);

        let transport = StdioTransport::new(BufReader::new(server_read), server_write);
        let task = tokio::spawn(server(MockLinearService::new()).connect(transport));

        client_write
            .write_all(
                b"\xff\xfe garbage\n\
                  {\"jsonrpc\":\"1.0\",\"id\":9,\"method\":\"ping\"}\n\
                  {\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n",
            )
            .await
            .unwrap();
        client_write.shutdown().await.unwrap();

        let mut lines = BufReader::new(client_read).lines();
        let mut responses = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            responses.push(serde_json::from_str::<Value>(&line).unwrap());
        }
        task.await.unwrap().unwrap();

        assert_eq!(responses.len(), 3);
        let codes: Vec<&Value> = responses
            .iter()
            .filter(|r| r["id"].is_null())
            .map(|r| &r["error"]["code"])
            .collect();
        assert!(codes.contains(&&json!(JsonRpcError::PARSE_ERROR)));
        assert!(codes.contains(&&json!(JsonRpcError::INVALID_REQUEST)));
        assert!(responses.iter().any(|r| r["id"] == 1 && r["result"] == json!({})));
    }
}
