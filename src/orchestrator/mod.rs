//! Conversation orchestrator: alternates provider calls and tool execution
//! until a final answer is produced.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::adapter::{ProviderAdapter, ProviderClient, ProviderRequest};
use crate::cache::ResponseCache;
use crate::error::{ErrorPayload, Result};
use crate::router::ToolRouter;
use crate::types::{GenerationSettings, ModelMessage, StructuredAnswer, ToolResult};
use crate::util::RetryPolicy;

/// Session states. `Error` is absorbing and reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingProvider,
    ToolCallsPending,
    Terminal,
    Error,
}

struct Session {
    id: Uuid,
    state: SessionState,
    iterations: usize,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::AwaitingProvider,
            iterations: 0,
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(
            session = %self.id,
            from = ?self.state,
            to = ?next,
            iterations = self.iterations,
            "session transition"
        );
        self.state = next;
    }
}

/// Orchestrator settings, usually derived from [`crate::config::LoopConfig`].
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Maximum tool iterations before the turn is truncated.
    pub max_iterations: usize,
    pub tool_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tool_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Drives the turn loop. All collaborators are owned, explicitly constructed
/// objects injected here — no ambient singletons.
pub struct Orchestrator {
    client: Arc<dyn ProviderClient>,
    adapter: Arc<dyn ProviderAdapter>,
    router: ToolRouter,
    cache: Arc<ResponseCache>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn ProviderClient>,
        adapter: Arc<dyn ProviderAdapter>,
        router: ToolRouter,
        cache: Arc<ResponseCache>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            client,
            adapter,
            router,
            cache,
            settings,
        }
    }

    /// Run one orchestration turn to completion.
    ///
    /// The caller always receives either a terminal structured answer or a
    /// structured error payload — never a raw error type.
    pub async fn run_turn(
        &self,
        prompt: &str,
        history: Vec<ModelMessage>,
        generation: GenerationSettings,
        blocked_servers: &[String],
    ) -> std::result::Result<StructuredAnswer, ErrorPayload> {
        self.run_inner(prompt, history, generation, blocked_servers)
            .await
            .map_err(|e| {
                error!(error = %e, "orchestration turn failed");
                e.payload()
            })
    }

    async fn run_inner(
        &self,
        prompt: &str,
        history: Vec<ModelMessage>,
        generation: GenerationSettings,
        blocked_servers: &[String],
    ) -> Result<StructuredAnswer> {
        let mut session = Session::new();
        let result = self
            .drive(&mut session, prompt, history, generation, blocked_servers)
            .await;
        if result.is_err() {
            session.transition(SessionState::Error);
        }
        result
    }

    async fn drive(
        &self,
        session: &mut Session,
        prompt: &str,
        history: Vec<ModelMessage>,
        generation: GenerationSettings,
        blocked_servers: &[String],
    ) -> Result<StructuredAnswer> {
        let mut messages = history;
        messages.push(ModelMessage::user(prompt));

        let tools = self.router.available_tools(blocked_servers).await;
        debug!(session = %session.id, tools = tools.len(), "turn started");

        let mut served_from_cache = false;

        loop {
            let request = ProviderRequest {
                messages: messages.clone(),
                settings: generation.clone(),
                tools: tools.clone(),
            };

            // Only the opening exchange is cacheable: the key covers the
            // prompt and generation parameters, not mid-loop tool results.
            let response = if session.iterations == 0 {
                match self.cache.get(prompt, &generation) {
                    Some(hit) => {
                        served_from_cache = true;
                        hit
                    }
                    None => self.call_provider(&request).await?,
                }
            } else {
                self.call_provider(&request).await?
            };

            let calls = self.adapter.extract_tool_calls(&response)?;
            if calls.is_empty() {
                // Completed answers only: a response that requests tool calls
                // must never be replayed from the cache, or the tools would
                // run their side effects again.
                if session.iterations == 0 && !served_from_cache {
                    self.cache.set(prompt, &generation, response.clone());
                }
                session.transition(SessionState::Terminal);
                let text = self.adapter.extract_text(&response)?;
                let mut answer = StructuredAnswer::parse(&text);
                answer.served_from_cache = served_from_cache;
                return Ok(answer);
            }

            session.transition(SessionState::ToolCallsPending);
            let assistant_text = self.adapter.extract_text(&response).unwrap_or_default();
            messages.push(ModelMessage::assistant_with_calls(
                assistant_text,
                calls.clone(),
            ));

            // Fan out: every call from this turn runs concurrently. A failed
            // call becomes an error result the model can react to, never an
            // aborted turn.
            let dispatches = calls.iter().map(|call| async {
                match self
                    .router
                    .dispatch(call, &tools, blocked_servers, self.settings.tool_timeout)
                    .await
                {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(tool = %call.name, error = %e, "tool call failed");
                        ToolResult::error(call, e.to_string())
                    }
                }
            });
            let results: Vec<ToolResult> = join_all(dispatches).await;
            messages.push(ModelMessage::tool_results(results));

            session.iterations += 1;
            if session.iterations > self.settings.max_iterations {
                warn!(
                    session = %session.id,
                    max_iterations = self.settings.max_iterations,
                    "iteration cap hit; truncating turn"
                );
                session.transition(SessionState::Terminal);
                return Ok(StructuredAnswer::truncation_notice(
                    self.settings.max_iterations,
                ));
            }
            session.transition(SessionState::AwaitingProvider);
        }
    }

    async fn call_provider(&self, request: &ProviderRequest) -> Result<serde_json::Value> {
        self.settings
            .retry
            .execute(|| self.client.complete(request))
            .await
    }
}
