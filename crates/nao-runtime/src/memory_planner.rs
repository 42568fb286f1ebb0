//! [`MemoryPlanner`] – asks the model which memory tools an instruction needs.
//!
//! The reply is fed to [`ToolCallParser`]. Planning is fail-open: a failed
//! completion or an unparseable reply means "no memory operations" for the
//! turn, never an error the user sees.

use std::sync::Arc;

use chrono::NaiveDate;
use nao_types::{MemoryOp, NaoError, ToolInvocation};
use tracing::{debug, warn};

use crate::llm_driver::{ChatMessage, CompletionClient, CompletionRequest};
use crate::tool_parser::ToolCallParser;

pub struct MemoryPlanner {
    client: Arc<dyn CompletionClient>,
}

impl MemoryPlanner {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// System prompt for `username` on `today`.
    pub fn system_prompt(username: &str, today: NaiveDate) -> String {
        let tools = MemoryOp::ALL
            .iter()
            .map(|op| format!("{}(text)", op.function_name()))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            r#"You are a NAO robot with long-term memory. Memories are saved with the conversation date.
The user's name is {username}. Today is {today}.

There are three kinds of memory:
- "semantic": facts about the user, such as their name, address, favourite colour or food, where they study or work.
- "episodic": how the user wants you to respond, for example that they prefer brief answers, and how quickly they learn, so you can adapt your explanations.
- "procedural": step-by-step procedures the user explains to you.

Rules:
1. Use the memory tools: [{tools}].
2. Before saving a memory, search for it first in case it already exists. Search calls always come first.
3. Every call carries the text to save or the question to search for.
4. Reply with JSON only, no other text. If no memory needs to be saved or retrieved, reply with {{}}.

Example
Input: Username: Tamim, Instruction: My favourite color is blue and I am 5ft tall.
Output:
{{
  "tools": [
    "search_semantic_memory(\"What is Tamim's favourite color and height?\")",
    "save_semantic_memory(\"Tamim's favourite color is blue. Tamim is 5 ft tall.\")"
  ]
}}"#
        )
    }

    /// Ask the model for a memory plan and return its raw reply.
    ///
    /// # Errors
    ///
    /// [`NaoError::LlmInferenceFailed`] when the completion call fails.
    pub async fn generate(&self, username: &str, instruction: &str) -> Result<String, NaoError> {
        let today = chrono::Local::now().date_naive();
        let request = CompletionRequest::new(vec![
            ChatMessage::system(Self::system_prompt(username, today)),
            ChatMessage::user(format!("Username: {username}, Instruction: {instruction}")),
        ]);
        Ok(self.client.complete(&request).await?)
    }

    /// Generate and parse the memory plan. Any failure yields an empty list.
    pub async fn plan(&self, username: &str, instruction: &str) -> Vec<ToolInvocation> {
        let reply = match self.generate(username, instruction).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "memory planning failed; continuing without memory operations");
                return Vec::new();
            }
        };
        match ToolCallParser::parse(&reply) {
            Ok(calls) => {
                debug!(calls = calls.len(), "memory plan parsed");
                calls
            }
            Err(e) => {
                warn!(error = %e, "memory plan unparseable; continuing without memory operations");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_driver::LlmError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed text and remembers the last request.
    struct Canned {
        reply: Result<String, String>,
        last: Mutex<Option<CompletionRequest>>,
    }

    impl Canned {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                last: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err("connection refused".to_string()),
                last: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for Canned {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            *self.last.lock().unwrap() = Some(request.clone());
            self.reply.clone().map_err(LlmError::BadResponse)
        }
    }

    #[test]
    fn prompt_names_user_date_and_all_six_tools() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let prompt = MemoryPlanner::system_prompt("Tamim", date);
        assert!(prompt.contains("The user's name is Tamim. Today is 2024-03-09."));
        for op in MemoryOp::ALL {
            assert!(prompt.contains(&op.function_name()), "{op}");
        }
        assert!(!prompt.contains("search_web"));
    }

    #[tokio::test]
    async fn plan_parses_reply() {
        let client = Arc::new(Canned::ok(
            r#"{"tools": ["save_semantic_memory("favorite color is blue")"]}"#,
        ));
        let planner = MemoryPlanner::new(client.clone());
        let calls = planner.plan("Tamim", "My favorite color is blue").await;
        assert_eq!(
            calls,
            vec![ToolInvocation::new("save_semantic_memory", "favorite color is blue")]
        );

        let request = client.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(
            request.messages[1].content,
            "Username: Tamim, Instruction: My favorite color is blue"
        );
    }

    #[tokio::test]
    async fn empty_json_reply_means_no_calls() {
        let planner = MemoryPlanner::new(Arc::new(Canned::ok("{}")));
        assert!(planner.plan("Tamim", "Hello!").await.is_empty());
    }

    #[tokio::test]
    async fn unparseable_reply_fails_open() {
        let planner = MemoryPlanner::new(Arc::new(Canned::ok("Nothing to remember here.")));
        assert!(planner.plan("Tamim", "Hello!").await.is_empty());
    }

    #[tokio::test]
    async fn completion_failure_fails_open() {
        let planner = MemoryPlanner::new(Arc::new(Canned::failing()));
        assert!(planner.plan("Tamim", "Hello!").await.is_empty());
        let err = planner.generate("Tamim", "Hello!").await.unwrap_err();
        assert!(matches!(err, NaoError::LlmInferenceFailed(_)));
    }
}
