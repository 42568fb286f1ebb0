//! [`ActionPlanner`] – asks the model for the robot's next gestures.
//!
//! Planning one turn takes up to three round trips:
//!
//! 1. When a [`WebSearch`] backend is configured, a short classification
//!    completion decides whether the instruction needs fresh facts
//!    ([`Approach::Search`]) or not ([`Approach::General`]).
//! 2. For `Search`, the instruction is sent to the search backend and the raw
//!    result is added to the prompt as `From net: …`.
//! 3. The action-plan completion, whose reply goes through
//!    [`ActionPlanValidator`].
//!
//! Memory context recalled earlier in the turn is added as `From memory: …`.

use std::sync::Arc;

use nao_types::{ActionName, NaoError, Plan, PlanDocument};
use schemars::schema_for;
use tracing::{debug, info, warn};

use crate::llm_driver::{ChatMessage, CompletionClient, CompletionRequest};
use crate::plan_validator::ActionPlanValidator;
use crate::web_search::WebSearch;

/// How an instruction should be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approach {
    /// Needs factual or current information from the internet.
    Search,
    /// Can be handled with general knowledge.
    General,
}

const APPROACH_PROMPT: &str = "You decide how an instruction should be handled. \
Answer 'search' if it needs factual or current information from the internet, \
or 'general' if it can be handled with general knowledge. \
Reply with exactly one of these two words and nothing else.";

pub struct ActionPlanner {
    client: Arc<dyn CompletionClient>,
    search: Option<Arc<dyn WebSearch>>,
}

impl ActionPlanner {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            search: None,
        }
    }

    /// Enable the search approach.
    pub fn with_web_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.search = Some(search);
        self
    }

    /// Classify `instruction`. A failed call falls back to
    /// [`Approach::General`].
    pub async fn determine_approach(&self, instruction: &str) -> Approach {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(APPROACH_PROMPT),
            ChatMessage::user(format!("Instruction: {instruction}")),
        ]);
        match self.client.complete(&request).await {
            Ok(reply) if reply.to_lowercase().contains("search") => Approach::Search,
            Ok(_) => Approach::General,
            Err(e) => {
                warn!(error = %e, "approach classification failed; using general knowledge");
                Approach::General
            }
        }
    }

    /// The action-plan system prompt: vocabulary, reply shape, and schema.
    pub fn system_prompt() -> String {
        let actions = ActionName::ALL
            .iter()
            .map(|a| format!("- {}", a.signature()))
            .collect::<Vec<_>>()
            .join("\n");
        let schema = serde_json::to_value(schema_for!(PlanDocument))
            .unwrap_or(serde_json::Value::Null);

        format!(
            r#"You are a NAO robot. Hold a natural conversation with the user and act on their instructions.

The available actions are:
{actions}

Reply with an action plan in JSON with this structure:
{{
  "actions": [
    {{"action": "action_name", "parameters": {{"param1": "value1"}}}}
  ]
}}

JSON Schema of the reply:
{schema}

Be specific with parameters and order the actions so the sequence fulfils the instruction.
Use varied, human-like gestures to keep the conversation engaging; for example, greet a "Hello" with a wave and a spoken greeting.
End every plan with reset_nao_pose() so you are ready for the next interaction."#
        )
    }

    /// Build the message list for the action-plan completion.
    pub fn messages(
        instruction: &str,
        memory_context: &str,
        search_context: Option<&str>,
    ) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(Self::system_prompt())];
        if let Some(net) = search_context {
            messages.push(ChatMessage::user(format!("From net: {net}")));
        }
        if !memory_context.is_empty() {
            messages.push(ChatMessage::user(format!("From memory: {memory_context}")));
        }
        let mut ask =
            format!("Instruction: {instruction}\n\nCreate a detailed action plan for the NAO robot.");
        if search_context.is_some() {
            ask.push_str(" Use the information from the net to answer the user.");
        }
        messages.push(ChatMessage::user(ask));
        messages
    }

    /// Produce a validated plan for `instruction`.
    ///
    /// # Errors
    ///
    /// [`NaoError::LlmInferenceFailed`] when the plan completion fails, or the
    /// validator's [`NaoError::PlanFormat`] / [`NaoError::InvalidPlanSchema`].
    pub async fn generate_plan(
        &self,
        instruction: &str,
        memory_context: &str,
    ) -> Result<Plan, NaoError> {
        let search_context = self.search_context(instruction).await;
        let request = CompletionRequest::new(Self::messages(
            instruction,
            memory_context,
            search_context.as_deref(),
        ));

        let reply = self.client.complete(&request).await?;
        debug!(reply = %reply.chars().take(100).collect::<String>(), "action plan reply");
        ActionPlanValidator::validate(&reply)
    }

    async fn search_context(&self, instruction: &str) -> Option<String> {
        let search = self.search.as_ref()?;
        if self.determine_approach(instruction).await != Approach::Search {
            return None;
        }
        info!("answering from an internet search");
        match search.search(instruction).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(error = %e, "web search failed; planning without it");
                None
            }
        }
    }
}
