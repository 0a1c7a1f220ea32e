//! Bounded tool-calling loop used when deterministic extraction fails.
//!
//! ```text
//! AwaitingModel --Final--------> Done --(recipe + stored record)--> success
//!      |  ^                        \--(otherwise)-----------------> Failed
//!   ToolCalls |
//!      v  |
//! ExecutingTools
//! ```
//!
//! Each turn sends the whole transcript plus the tool registry. Tool calls
//! within a turn run one at a time, in the order requested, because later
//! tools read what earlier ones wrote into the request context.

mod prompt;

pub use prompt::{build_seed_message, RECIPE_AGENT_PROMPT};

use log::{debug, error, info, warn};
use std::sync::Arc;

use crate::cache::CacheService;
use crate::error::ExtractError;
use crate::model::SavedRecipe;
use crate::providers::{ChatRequest, LlmProvider, Message, ModelTurn, ToolCall};
use crate::tools::{registry, ExtractionToolContext, ToolDispatcher};

/// Hard cap on model turns per request.
pub const MAX_ITERATIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingModel,
    ExecutingTools,
    Done,
    Failed,
}

/// How a loop run ended.
#[derive(Debug)]
pub struct LoopReport {
    pub state: LoopState,
    pub iterations: usize,
    pub context: ExtractionToolContext,
    /// The persisted record, present only on success.
    pub record: Option<SavedRecipe>,
    /// Why the run failed, when a collaborator errored.
    pub failure: Option<ExtractError>,
}

impl LoopReport {
    pub fn succeeded(&self) -> bool {
        self.state == LoopState::Done && self.record.is_some()
    }
}

pub struct OrchestrationLoop {
    provider: Arc<dyn LlmProvider>,
    dispatcher: ToolDispatcher,
    cache: CacheService,
    max_iterations: usize,
}

impl OrchestrationLoop {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        dispatcher: ToolDispatcher,
        cache: CacheService,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            cache,
            max_iterations: MAX_ITERATIONS,
        }
    }

    /// Lower the turn cap. Values above `MAX_ITERATIONS` are clamped.
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.min(MAX_ITERATIONS);
        self
    }

    pub async fn run(&self, mut context: ExtractionToolContext) -> LoopReport {
        let mut request = ChatRequest {
            system: RECIPE_AGENT_PROMPT.to_string(),
            messages: vec![Message::user(build_seed_message(&context))],
            tools: registry(),
        };

        let mut state = LoopState::AwaitingModel;
        let mut iterations = 0;
        let mut pending: Vec<ToolCall> = Vec::new();
        let mut pending_content: Option<String> = None;
        let mut failure: Option<ExtractError> = None;

        loop {
            match state {
                LoopState::AwaitingModel => {
                    if iterations >= self.max_iterations {
                        warn!(
                            "Extraction agent reached max iterations ({}) for {}",
                            self.max_iterations, context.url
                        );
                        state = LoopState::Failed;
                        continue;
                    }
                    iterations += 1;

                    info!(
                        "Agent iteration {} for {} ({} messages, provider {})",
                        iterations,
                        context.url,
                        request.messages.len(),
                        self.provider.provider_name()
                    );

                    match self.provider.complete(&request).await {
                        Ok(ModelTurn::Final { content }) => {
                            debug!("Agent finished: {}", content);
                            state = LoopState::Done;
                        }
                        Ok(ModelTurn::ToolCalls { content, calls }) => {
                            info!("Agent requested {} tool call(s)", calls.len());
                            pending = calls;
                            pending_content = content;
                            state = LoopState::ExecutingTools;
                        }
                        Err(e) => {
                            error!("Model turn failed for {}: {}", context.url, e);
                            failure = Some(e.into());
                            state = LoopState::Failed;
                        }
                    }
                }

                LoopState::ExecutingTools => {
                    // The assistant turn must precede its tool results on the wire.
                    request.messages.push(Message::Assistant {
                        content: pending_content.take(),
                        tool_calls: pending.clone(),
                    });

                    for call in std::mem::take(&mut pending) {
                        let call_id = call.id.clone();
                        let name = call.name.clone();
                        let checkpoint = interrupted(&context, &name);

                        match self.dispatcher.dispatch_owned(call, context).await {
                            Ok((next, result)) => {
                                context = next;
                                request.messages.push(Message::ToolResult {
                                    call_id,
                                    name,
                                    content: result.to_string(),
                                });
                            }
                            Err(e) => {
                                error!("Tool {} did not complete: {}", name, e);
                                return LoopReport {
                                    state: LoopState::Failed,
                                    iterations,
                                    context: checkpoint,
                                    record: None,
                                    failure: Some(e),
                                };
                            }
                        }
                    }

                    state = LoopState::AwaitingModel;
                }

                LoopState::Done => {
                    return match self.verify_saved(&context).await {
                        Ok(Some(record)) => {
                            info!(
                                "Agent saved '{}' for {} in {} iteration(s)",
                                record.recipe.title, context.url, iterations
                            );
                            LoopReport {
                                state: LoopState::Done,
                                iterations,
                                context,
                                record: Some(record),
                                failure: None,
                            }
                        }
                        Ok(None) => {
                            warn!("Agent reported completion for {} without a saved recipe", context.url);
                            LoopReport {
                                state: LoopState::Failed,
                                iterations,
                                context,
                                record: None,
                                failure: None,
                            }
                        }
                        Err(e) => LoopReport {
                            state: LoopState::Failed,
                            iterations,
                            context,
                            record: None,
                            failure: Some(e),
                        },
                    };
                }

                LoopState::Failed => {
                    return LoopReport {
                        state: LoopState::Failed,
                        iterations,
                        context,
                        record: None,
                        failure,
                    };
                }
            }
        }
    }

    /// A run only counts when the context holds a recipe and the store has
    /// the user's record under this request's key. A forced refresh must also
    /// have saved during this run.
    async fn verify_saved(
        &self,
        context: &ExtractionToolContext,
    ) -> Result<Option<SavedRecipe>, ExtractError> {
        if context.recipe.is_none() {
            return Ok(None);
        }
        if context.force_refresh && context.saved_id.is_none() {
            return Ok(None);
        }
        Ok(self
            .cache
            .get_user_record(&context.user_id, &context.cache_key)
            .await?)
    }
}

/// What survives of a context whose tool task never returned it: the
/// request identity and the trail, including the tool that was running.
fn interrupted(context: &ExtractionToolContext, tool: &str) -> ExtractionToolContext {
    let mut checkpoint =
        ExtractionToolContext::new(&context.url, &context.user_id, context.force_refresh);
    checkpoint.agents_used = context.agents_used.clone();
    checkpoint.agents_used.push(tool.to_string());
    checkpoint
}
