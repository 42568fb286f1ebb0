//! `nao-runtime` – the assistant's planning brain.
//!
//! # Modules
//!
//! - [`llm_driver`] – [`LlmDriver`][llm_driver::LlmDriver] and the
//!   [`CompletionClient`][llm_driver::CompletionClient] trait the planners
//!   depend on.
//! - [`payload`] – pulls the JSON payload out of fenced, annotated replies.
//! - [`tool_parser`] – [`ToolCallParser`][tool_parser::ToolCallParser]:
//!   memory-plan reply to [`ToolInvocation`][nao_types::ToolInvocation]s,
//!   repairing unescaped quotes and missing commas.
//! - [`plan_validator`] –
//!   [`ActionPlanValidator`][plan_validator::ActionPlanValidator]: action-plan
//!   reply to [`Plan`][nao_types::Plan].
//! - [`memory_planner`] – [`MemoryPlanner`][memory_planner::MemoryPlanner]:
//!   asks the model which memory tools a turn needs (fail-open).
//! - [`action_planner`] – [`ActionPlanner`][action_planner::ActionPlanner]:
//!   approach classification, optional web search, plan generation.
//! - [`web_search`] – [`WebSearch`][web_search::WebSearch] trait and the
//!   Serper client.
//! - [`conversation`] – [`Conversation`][conversation::Conversation]: runs
//!   one turn end to end and reports what happened.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: console
//!   logging plus optional OTLP span export.

pub mod action_planner;
pub mod conversation;
pub mod llm_driver;
pub mod memory_planner;
pub mod payload;
pub mod plan_validator;
pub mod telemetry;
pub mod tool_parser;
pub mod web_search;

pub use action_planner::{ActionPlanner, Approach};
pub use conversation::{Conversation, Status, TurnReport, is_stop_command};
pub use llm_driver::{
    ChatMessage, CompletionClient, CompletionRequest, LlmDriver, LlmError, Role, SamplingParams,
};
pub use memory_planner::MemoryPlanner;
pub use plan_validator::ActionPlanValidator;
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use tool_parser::ToolCallParser;
pub use web_search::{SerperClient, WebSearch, WebSearchError};
