//! [`Conversation`] – one user's session with the robot.
//!
//! A turn runs start to finish before the next instruction is accepted:
//!
//! ```text
//! instruction ─▶ MemoryPlanner ─▶ MemoryRouter::invoke_all ─▶ memory context
//!                                                                │
//!          ActionDispatcher::execute ◀─ ActionPlanner::generate_plan
//! ```
//!
//! Nothing in a turn is fatal. Failures become [`Status`] lines in the
//! [`TurnReport`] for the front end to show.

use nao_hal::{ActionDispatcher, DispatchReport};
use nao_memory::MemoryRouter;
use nao_types::{NaoError, Plan, ToolInvocation};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::action_planner::ActionPlanner;
use crate::memory_planner::MemoryPlanner;

/// Instruction that ends the session.
pub const STOP_COMMAND: &str = "stop";

/// `true` when `input` is the stop sentinel (case-insensitive, trimmed).
pub fn is_stop_command(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case(STOP_COMMAND)
}

/// A user-visible line describing part of a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Warning(String),
    Failure(String),
}

impl Status {
    pub fn message(&self) -> &str {
        match self {
            Status::Info(m) | Status::Warning(m) | Status::Failure(m) => m,
        }
    }
}

/// Everything that happened during one turn.
#[derive(Debug)]
pub struct TurnReport {
    pub turn_id: Uuid,
    /// Memory tool calls the planner asked for, in order.
    pub tool_calls: Vec<ToolInvocation>,
    /// Joined search results handed to the action planner.
    pub memory_context: String,
    pub plan: Result<Plan, NaoError>,
    /// `None` when no plan was produced.
    pub dispatch: Option<DispatchReport>,
    pub status: Vec<Status>,
}

pub struct Conversation {
    username: String,
    memory_planner: MemoryPlanner,
    router: MemoryRouter,
    action_planner: ActionPlanner,
    dispatcher: ActionDispatcher,
}

impl Conversation {
    pub fn new(
        username: impl Into<String>,
        memory_planner: MemoryPlanner,
        router: MemoryRouter,
        action_planner: ActionPlanner,
        dispatcher: ActionDispatcher,
    ) -> Self {
        Self {
            username: username.into(),
            memory_planner,
            router,
            action_planner,
            dispatcher,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn router(&self) -> &MemoryRouter {
        &self.router
    }

    /// Process `instruction` completely: memory, then planning, then motion.
    pub async fn handle_turn(&mut self, instruction: &str) -> TurnReport {
        let turn_id = Uuid::new_v4();
        let span = info_span!("turn", %turn_id, user = %self.username);
        self.run_turn(turn_id, instruction).instrument(span).await
    }

    async fn run_turn(&mut self, turn_id: Uuid, instruction: &str) -> TurnReport {
        info!(instruction, "turn started");
        let mut status = Vec::new();

        let tool_calls = self.memory_planner.plan(&self.username, instruction).await;
        let memory_context = self.router.invoke_all(&tool_calls).await;
        if !memory_context.is_empty() {
            status.push(Status::Info(format!("Recalled: {memory_context}")));
        }

        let plan = self
            .action_planner
            .generate_plan(instruction, &memory_context)
            .await;

        let dispatch = match &plan {
            Ok(plan) => {
                let report = self.dispatcher.execute(plan).await;
                for skipped in &report.skipped {
                    status.push(Status::Warning(skipped.error.to_string()));
                }
                status.push(Status::Info(format!(
                    "Executed {} of {} steps",
                    report.executed.len(),
                    plan.len()
                )));
                Some(report)
            }
            Err(e) => {
                error!(error = %e, "no action plan for this turn");
                status.push(Status::Failure("Failed to generate a plan".to_string()));
                None
            }
        };

        info!(
            tool_calls = tool_calls.len(),
            planned = plan.is_ok(),
            "turn finished"
        );
        TurnReport {
            turn_id,
            tool_calls,
            memory_context,
            plan,
            dispatch,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_driver::{CompletionClient, CompletionRequest, LlmError};
    use async_trait::async_trait;
    use nao_hal::{SimNao, StepPacing};
    use nao_memory::{HashEmbedder, MemoryBank};
    use nao_types::{ActionName, MemoryType};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replies in order; memory-plan and action-plan calls share one queue.
    #[derive(Default)]
    struct Scripted {
        replies: Mutex<VecDeque<String>>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl Scripted {
        fn push(&self, reply: &str) {
            self.replies.lock().unwrap().push_back(reply.to_string());
        }
    }

    #[async_trait]
    impl CompletionClient for Scripted {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::BadResponse("script exhausted".into()))
        }
    }

    fn session(script: Arc<Scripted>, nao: SimNao) -> Conversation {
        Conversation::new(
            "Tamim",
            MemoryPlanner::new(script.clone()),
            MemoryRouter::new(
                MemoryBank::open_in_memory().unwrap(),
                Arc::new(HashEmbedder::default()),
            ),
            ActionPlanner::new(script),
            ActionDispatcher::new(Box::new(nao), StepPacing::None),
        )
    }

    #[test]
    fn stop_sentinel_is_case_insensitive() {
        assert!(is_stop_command("stop"));
        assert!(is_stop_command("  STOP \n"));
        assert!(!is_stop_command("stop waving"));
    }

    #[tokio::test]
    async fn favourite_color_is_saved_then_recalled() {
        let script = Arc::new(Scripted::default());
        let nao = SimNao::new();
        let robot = nao.handle();
        let mut convo = session(script.clone(), nao);

        // Turn 1: remember.
        script.push(r#"{"tools": ["save_semantic_memory("favorite color is blue")"]}"#);
        script.push(
            r#"{"actions": [{"action": "speak", "parameters": {"speech": "I will remember that."}}, {"action": "nod_head", "parameters": {"direction": "up_down"}}]}"#,
        );
        let first = convo.handle_turn("My favorite color is blue").await;
        assert_eq!(
            first.tool_calls,
            vec![ToolInvocation::new("save_semantic_memory", "favorite color is blue")]
        );
        assert_eq!(first.memory_context, "");
        assert_eq!(
            convo.router().bank().store(MemoryType::Semantic).len().unwrap(),
            1
        );

        // Turn 2: recall.
        script.push(r#"{"tools": ["search_semantic_memory("What is Tamim's favorite color?")"]}"#);
        script.push(
            "```json\n{\"actions\": [{\"action\": \"speak\", \"parameters\": {\"speech\": \"Your favorite color is blue.\"}}]}\n```",
        );
        let second = convo.handle_turn("What is my favorite color?").await;
        assert_eq!(second.memory_context, "favorite color is blue");
        assert_eq!(
            second.status[0],
            Status::Info("Recalled: favorite color is blue".into())
        );

        let seen = script.seen.lock().unwrap();
        let action_request = &seen[3];
        assert!(action_request
            .messages
            .iter()
            .any(|m| m.content == "From memory: favorite color is blue"));

        assert_eq!(
            robot.spoken(),
            vec!["I will remember that.", "Your favorite color is blue."]
        );
    }

    #[tokio::test]
    async fn bad_steps_are_reported_and_the_rest_run() {
        let script = Arc::new(Scripted::default());
        let nao = SimNao::new();
        let robot = nao.handle();
        let mut convo = session(script.clone(), nao);

        script.push("{}");
        script.push(
            r#"{"actions": [
                {"action": "wave", "parameters": {"hand": "left"}},
                {"action": "dance", "parameters": {}},
                {"action": "move", "parameters": {"x": 0.5, "theta": 0}},
                {"action": "reset_nao_pose", "parameters": {}}
            ]}"#,
        );
        let report = convo.handle_turn("Hello!").await;

        let dispatch = report.dispatch.unwrap();
        assert_eq!(
            dispatch.executed,
            vec![ActionName::Wave, ActionName::ResetNaoPose]
        );
        assert_eq!(
            report.status,
            vec![
                Status::Warning("Unknown action: dance".into()),
                Status::Warning("Missing parameter 'y' for 'move'".into()),
                Status::Info("Executed 2 of 4 steps".into()),
            ]
        );
        assert_eq!(robot.calls().len(), 2);
    }

    #[tokio::test]
    async fn unusable_plan_is_reported_not_fatal() {
        let script = Arc::new(Scripted::default());
        let nao = SimNao::new();
        let robot = nao.handle();
        let mut convo = session(script.clone(), nao);

        script.push("not json at all");
        script.push(r#"{"response": "hello"}"#);
        let report = convo.handle_turn("Hello!").await;

        assert!(report.tool_calls.is_empty());
        assert!(matches!(report.plan, Err(NaoError::InvalidPlanSchema(_))));
        assert!(report.dispatch.is_none());
        assert_eq!(
            report.status,
            vec![Status::Failure("Failed to generate a plan".into())]
        );
        assert!(robot.calls().is_empty());

        // The session survives and the next turn works.
        script.push("{}");
        script.push(r#"{"actions": [{"action": "sit"}]}"#);
        let next = convo.handle_turn("Sit down").await;
        assert!(next.plan.is_ok());
        assert_eq!(robot.calls().len(), 1);
    }

    #[tokio::test]
    async fn offline_model_degrades_to_failure_status() {
        let script = Arc::new(Scripted::default());
        let mut convo = session(script, SimNao::new());
        let report = convo.handle_turn("Hello!").await;
        assert!(matches!(report.plan, Err(NaoError::LlmInferenceFailed(_))));
        assert_eq!(report.status.last().map(Status::message), Some("Failed to generate a plan"));
    }
}
