//! MCP client speaking JSON-RPC over a byte stream, usually a gateway's stdio.

use super::protocol::*;
use crate::config::GatewaySettings;
use crate::error::{Result, ScoutError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Reply = Result<Value>;

#[derive(Default)]
struct Inflight {
    waiters: HashMap<u64, oneshot::Sender<Reply>>,
    closed: bool,
}

type SharedInflight = Arc<Mutex<Inflight>>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Client for an MCP tool gateway.
///
/// Requests may be issued concurrently; responses are matched to callers by id.
pub struct McpClient {
    writer: tokio::sync::Mutex<Writer>,
    inflight: SharedInflight,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
    _child: Option<Child>,
}

impl McpClient {
    /// Spawn the gateway process and complete the MCP handshake.
    pub async fn spawn(settings: &GatewaySettings) -> Result<Self> {
        info!("Starting tool gateway: {} {}", settings.command, settings.args.join(" "));

        let mut child = Command::new(&settings.command)
            .args(&settings.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ScoutError::Gateway(format!("failed to start '{}': {}", settings.command, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ScoutError::Gateway("gateway stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScoutError::Gateway("gateway stdout unavailable".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "scout::gateway", "{}", line);
                }
            });
        }

        let mut client = Self::new(stdout, stdin);
        client._child = Some(child);
        client.initialize().await?;
        Ok(client)
    }

    /// Wrap an already-connected transport. The handshake is not performed.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let inflight = SharedInflight::default();
        let reader = tokio::spawn(read_loop(reader, inflight.clone()));

        Self {
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            inflight,
            next_id: AtomicU64::new(1),
            reader,
            _child: None,
        }
    }

    /// Perform the `initialize` handshake.
    pub async fn initialize(&self) -> Result<InitializeResult> {
        let params = serde_json::to_value(InitializeParams::default())?;
        let result: InitializeResult =
            serde_json::from_value(self.request("initialize", Some(params)).await?)?;

        if let Some(server) = &result.server_info {
            info!(
                "Connected to {} {} (protocol {})",
                server.name, server.version, result.protocol_version
            );
        }

        self.notify("notifications/initialized", None).await?;
        Ok(result)
    }

    /// All tools offered by the gateway, following pagination.
    pub async fn list_tools(&self) -> Result<Vec<RemoteTool>> {
        let mut tools = Vec::new();
        let mut cursor = None;

        loop {
            let params = serde_json::to_value(ToolsListParams { cursor })?;
            let page: ToolsListResult =
                serde_json::from_value(self.request("tools/list", Some(params)).await?)?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        debug!("Gateway offers {} tool(s)", tools.len());
        Ok(tools)
    }

    /// Invoke a tool and return its text content.
    pub async fn call_tool(&self, name: &str, arguments: &Map<String, Value>) -> Result<String> {
        let params = serde_json::to_value(ToolCallParams { name, arguments })?;
        let result: ToolCallResult = serde_json::from_value(
            self.request("tools/call", Some(params))
                .await
                .map_err(|e| match e {
                    ScoutError::Gateway(message) => ScoutError::ToolExecution {
                        tool: name.to_string(),
                        message,
                    },
                    other => other,
                })?,
        )?;

        if result.is_error() {
            return Err(ScoutError::ToolExecution {
                tool: name.to_string(),
                message: result.text(),
            });
        }
        Ok(result.text())
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        {
            let mut inflight = lock(&self.inflight);
            if inflight.closed {
                return Err(ScoutError::Gateway("gateway connection closed".to_string()));
            }
            inflight.waiters.insert(id, tx);
        }

        debug!("-> {} (id {})", method, id);
        if let Err(e) = self.send(&JsonRpcRequest::request(id, method, params)).await {
            lock(&self.inflight).waiters.remove(&id);
            return Err(e);
        }

        rx.await
            .map_err(|_| ScoutError::Gateway("gateway connection closed".to_string()))?
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        self.send(&JsonRpcRequest::notification(method, params)).await
    }

    async fn send(&self, message: &JsonRpcRequest) -> Result<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

fn lock(inflight: &SharedInflight) -> std::sync::MutexGuard<'_, Inflight> {
    inflight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Route each response line to the caller waiting on its id.
async fn read_loop<R>(reader: R, inflight: SharedInflight)
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Gateway read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let message: JsonRpcResponse = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!("Ignoring unparseable gateway message: {}", e);
                continue;
            }
        };

        if let Some(method) = &message.method {
            debug!("Ignoring server message: {}", method);
            continue;
        }

        let Some(id) = message.id.as_ref().and_then(Value::as_u64) else {
            warn!("Ignoring response without a usable id");
            continue;
        };

        let reply = match (message.error, message.result) {
            (Some(error), _) => Err(ScoutError::Gateway(error.to_string())),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(Value::Null),
        };

        match lock(&inflight).waiters.remove(&id) {
            Some(waiter) => {
                let _ = waiter.send(reply);
            }
            None => warn!("Response for unknown request id {}", id),
        }
    }

    let mut inflight = lock(&inflight);
    inflight.closed = true;
    for (_, waiter) in inflight.waiters.drain() {
        let _ = waiter.send(Err(ScoutError::Gateway("gateway connection closed".to_string())));
    }
    debug!("Gateway reader finished");
}
