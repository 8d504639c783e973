//! One supervised tool-server subprocess: lifecycle, framing, correlation.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ToolServerConfig;
use crate::error::{Result, SwitchboardError};

use super::protocol::{self, RequestKind, WireRequest};

/// Lifecycle states of a managed subprocess. The blocked flag is orthogonal
/// and only meaningful while `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
}

/// How one in-flight request resolves.
#[derive(Debug)]
pub(crate) enum CallOutcome {
    Result(serde_json::Value),
    Error(String),
    Crashed,
}

/// One in-flight request to the subprocess, keyed by wire id.
pub(crate) struct PendingRequest {
    pub submitted_at: Instant,
    pub tx: oneshot::Sender<CallOutcome>,
}

type PendingMap = Arc<Mutex<HashMap<u64, PendingRequest>>>;
type SharedState = Arc<Mutex<ServerState>>;

/// Handle to one running tool-server subprocess.
///
/// Concurrent calls to the same server are safe: stdin writes are serialized
/// behind a mutex and responses are matched to requests by id, so replies may
/// interleave in any order.
pub struct ServerHandle {
    pub name: String,
    state: SharedState,
    blocked: AtomicBool,
    stdin: tokio::sync::Mutex<ChildStdin>,
    pending: PendingMap,
    next_id: AtomicU64,
    child: tokio::sync::Mutex<Child>,
}

impl ServerHandle {
    /// Spawn the configured subprocess and start its read loop.
    ///
    /// A spawn failure leaves nothing running and surfaces as
    /// [`SwitchboardError::ProcessStart`].
    pub async fn spawn(config: &ToolServerConfig) -> Result<Arc<Self>> {
        let state: SharedState = Arc::new(Mutex::new(ServerState::Starting));

        let mut child = Command::new(&config.command)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                *state.lock().expect("state lock") = ServerState::Stopped;
                SwitchboardError::ProcessStart {
                    server: config.name.clone(),
                    message: e.to_string(),
                }
            })?;

        let stdin = child.stdin.take().ok_or_else(|| SwitchboardError::ProcessStart {
            server: config.name.clone(),
            message: "child has no stdin pipe".into(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| SwitchboardError::ProcessStart {
            server: config.name.clone(),
            message: "child has no stdout pipe".into(),
        })?;

        *state.lock().expect("state lock") = ServerState::Running;
        info!(server = %config.name, command = %config.command, "tool server started");

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        tokio::spawn(read_loop(
            config.name.clone(),
            stdout,
            Arc::clone(&pending),
            Arc::clone(&state),
        ));

        Ok(Arc::new(Self {
            name: config.name.clone(),
            state,
            blocked: AtomicBool::new(false),
            stdin: tokio::sync::Mutex::new(stdin),
            pending,
            next_id: AtomicU64::new(1),
            child: tokio::sync::Mutex::new(child),
        }))
    }

    pub fn state(&self) -> ServerState {
        *self.state.lock().expect("state lock")
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::Relaxed)
    }

    /// Toggle the blocked flag. No effect on a server that is not running;
    /// returns whether the flag was applied.
    pub fn set_blocked(&self, blocked: bool) -> bool {
        if !self.is_running() {
            debug!(server = %self.name, "ignoring set_blocked on a stopped server");
            return false;
        }
        self.blocked.store(blocked, Ordering::Relaxed);
        true
    }

    /// Send one request and await the response line carrying the same id.
    ///
    /// On timeout the pending entry is dropped but the subprocess is left
    /// running; a single slow call must not kill the server.
    pub async fn request(
        &self,
        kind: RequestKind,
        tool: Option<&str>,
        input: Option<&serde_json::Value>,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        if !self.is_running() {
            return Err(SwitchboardError::ProcessCrash {
                server: self.name.clone(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = protocol::encode_request(&WireRequest { id, kind, tool, input })?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().expect("pending lock").insert(
            id,
            PendingRequest {
                submitted_at: Instant::now(),
                tx,
            },
        );

        {
            let mut stdin = self.stdin.lock().await;
            let write = async {
                stdin.write_all(line.as_bytes()).await?;
                stdin.write_all(b"\n").await?;
                stdin.flush().await
            };
            if let Err(e) = write.await {
                self.pending.lock().expect("pending lock").remove(&id);
                warn!(server = %self.name, error = %e, "write to tool server failed");
                return Err(SwitchboardError::ProcessCrash {
                    server: self.name.clone(),
                });
            }
        }

        match tokio::time::timeout(timeout, rx).await {
            Err(_) => {
                // Abandon the call; the subprocess stays alive for others.
                self.pending.lock().expect("pending lock").remove(&id);
                Err(SwitchboardError::ToolTimeout {
                    tool: tool.unwrap_or("listTools").to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Ok(Err(_)) => Err(SwitchboardError::ProcessCrash {
                server: self.name.clone(),
            }),
            Ok(Ok(CallOutcome::Result(value))) => Ok(value),
            Ok(Ok(CallOutcome::Error(message))) => Err(SwitchboardError::ToolExecution {
                tool: tool.unwrap_or("listTools").to_string(),
                message,
            }),
            Ok(Ok(CallOutcome::Crashed)) => Err(SwitchboardError::ProcessCrash {
                server: self.name.clone(),
            }),
        }
    }

    /// Kill the subprocess. Pending requests are rejected by the read loop
    /// when it observes EOF.
    pub async fn stop(&self) {
        if let Err(e) = self.child.lock().await.kill().await {
            debug!(server = %self.name, error = %e, "kill failed (already exited?)");
        }
        *self.state.lock().expect("state lock") = ServerState::Stopped;
    }
}

/// Per-subprocess read loop: parse each stdout line independently and
/// dispatch it to the pending request with the matching id.
///
/// When the stream ends the subprocess has exited; every request still in
/// flight is rejected and the server transitions to `Stopped`.
pub(crate) async fn read_loop<R>(name: String, reader: R, pending: PendingMap, state: SharedState)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match protocol::parse_response(line) {
                    Ok(response) => {
                        let id = response.id;
                        let entry = pending.lock().expect("pending lock").remove(&id);
                        match entry {
                            Some(req) => {
                                let outcome = match response.into_outcome() {
                                    Ok(value) => CallOutcome::Result(value),
                                    Err(message) => CallOutcome::Error(message),
                                };
                                let _ = req.tx.send(outcome);
                            }
                            None => {
                                warn!(server = %name, id, "response with no pending request")
                            }
                        }
                    }
                    Err(e) => {
                        // Scoped protocol error: skip the line, keep serving.
                        warn!(server = %name, error = %e, "unparseable line from tool server");
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(server = %name, error = %e, "read from tool server failed");
                break;
            }
        }
    }

    *state.lock().expect("state lock") = ServerState::Stopped;
    let drained: Vec<(u64, PendingRequest)> = {
        let mut map = pending.lock().expect("pending lock");
        map.drain().collect()
    };
    for (id, req) in drained {
        warn!(
            server = %name,
            id,
            in_flight_ms = req.submitted_at.elapsed().as_millis() as u64,
            "rejecting request: tool server exited"
        );
        let _ = req.tx.send(CallOutcome::Crashed);
    }
    info!(server = %name, "tool server stopped");
}
