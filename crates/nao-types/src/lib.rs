//! `nao-types` – the shared vocabulary of the NAO assistant.
//!
//! Every other crate speaks in these types: the three disjoint memory
//! namespaces and the six memory operations over them, the fixed action
//! vocabulary of the robot, validated action plans, and the cross-crate
//! [`NaoError`] taxonomy.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Free-form named parameters attached to an action step.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

// ─────────────────────────────────────────────────────────────────────────────
// Memory vocabulary
// ─────────────────────────────────────────────────────────────────────────────

/// One of the three long-term memory namespaces.
///
/// A record saved under one type is never visible to searches against
/// another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    /// Facts about the user (name, address, favourite colour, employer …).
    Semantic,
    /// How the user wants to be answered and how fast they learn.
    Episodic,
    /// Procedures the user has explained.
    Procedural,
}

impl MemoryType {
    pub const ALL: [MemoryType; 3] = [
        MemoryType::Semantic,
        MemoryType::Episodic,
        MemoryType::Procedural,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MemoryType::Semantic => "semantic",
            MemoryType::Episodic => "episodic",
            MemoryType::Procedural => "procedural",
        }
    }

    /// Name of the backing vector collection, e.g. `"semantic_collection"`.
    pub fn collection_name(self) -> &'static str {
        match self {
            MemoryType::Semantic => "semantic_collection",
            MemoryType::Episodic => "episodic_collection",
            MemoryType::Procedural => "procedural_collection",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered memory tool: `save_<type>_memory` or `search_<type>_memory`.
///
/// The set is closed; resolving a function name that is not one of the six
/// registered tools fails with [`NaoError::UnknownTool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryOp {
    Save(MemoryType),
    Search(MemoryType),
}

impl MemoryOp {
    pub const ALL: [MemoryOp; 6] = [
        MemoryOp::Save(MemoryType::Semantic),
        MemoryOp::Save(MemoryType::Episodic),
        MemoryOp::Save(MemoryType::Procedural),
        MemoryOp::Search(MemoryType::Semantic),
        MemoryOp::Search(MemoryType::Episodic),
        MemoryOp::Search(MemoryType::Procedural),
    ];

    pub fn memory_type(self) -> MemoryType {
        match self {
            MemoryOp::Save(t) | MemoryOp::Search(t) => t,
        }
    }

    /// The tool name the planning model uses for this operation.
    pub fn function_name(self) -> String {
        match self {
            MemoryOp::Save(t) => format!("save_{t}_memory"),
            MemoryOp::Search(t) => format!("search_{t}_memory"),
        }
    }
}

impl fmt::Display for MemoryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.function_name())
    }
}

impl FromStr for MemoryOp {
    type Err = NaoError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let (verb, rest) = name
            .split_once('_')
            .ok_or_else(|| NaoError::UnknownTool(name.to_string()))?;
        let memory_type = match rest {
            "semantic_memory" => MemoryType::Semantic,
            "episodic_memory" => MemoryType::Episodic,
            "procedural_memory" => MemoryType::Procedural,
            _ => return Err(NaoError::UnknownTool(name.to_string())),
        };
        match verb {
            "save" => Ok(MemoryOp::Save(memory_type)),
            "search" => Ok(MemoryOp::Search(memory_type)),
            _ => Err(NaoError::UnknownTool(name.to_string())),
        }
    }
}

/// One parsed memory tool call, e.g. `save_semantic_memory("Ana likes tea")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub function_name: String,
    pub argument: String,
}

impl ToolInvocation {
    pub fn new(function_name: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            argument: argument.into(),
        }
    }

    /// Resolve the function name against the registered memory tools.
    pub fn op(&self) -> Result<MemoryOp, NaoError> {
        self.function_name.parse()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Action vocabulary
// ─────────────────────────────────────────────────────────────────────────────

/// The fixed set of gestures and movements the robot can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionName {
    Speak,
    Stand,
    Sit,
    Wave,
    NodHead,
    TurnHead,
    GazeHead,
    RaiseArms,
    Move,
    Handshake,
    ResetNaoPose,
}

impl ActionName {
    pub const ALL: [ActionName; 11] = [
        ActionName::Speak,
        ActionName::Stand,
        ActionName::Sit,
        ActionName::Wave,
        ActionName::NodHead,
        ActionName::TurnHead,
        ActionName::GazeHead,
        ActionName::RaiseArms,
        ActionName::Move,
        ActionName::Handshake,
        ActionName::ResetNaoPose,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionName::Speak => "speak",
            ActionName::Stand => "stand",
            ActionName::Sit => "sit",
            ActionName::Wave => "wave",
            ActionName::NodHead => "nod_head",
            ActionName::TurnHead => "turn_head",
            ActionName::GazeHead => "gaze_head",
            ActionName::RaiseArms => "raise_arms",
            ActionName::Move => "move",
            ActionName::Handshake => "handshake",
            ActionName::ResetNaoPose => "reset_nao_pose",
        }
    }

    /// Call signature shown to the planning model.
    pub fn signature(self) -> &'static str {
        match self {
            ActionName::Speak => "speak(speech=text)",
            ActionName::Stand => "stand()",
            ActionName::Sit => "sit()",
            ActionName::Wave => "wave(hand=right/left)",
            ActionName::NodHead => "nod_head(direction=up_down/right_left)",
            ActionName::TurnHead => "turn_head(direction=right/left)",
            ActionName::GazeHead => "gaze_head(direction=up/down)",
            ActionName::RaiseArms => "raise_arms(hand=left/right/both)",
            ActionName::Move => "move(x=x,y=y,theta=theta)",
            ActionName::Handshake => "handshake(hand=right/left)",
            ActionName::ResetNaoPose => "reset_nao_pose()",
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionName {
    type Err = NaoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionName::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| NaoError::UnknownAction(s.to_string()))
    }
}

/// The action of a plan step: either a member of the vocabulary, or a name
/// the model invented. Unknown steps survive validation and are rejected by
/// the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Known(ActionName),
    Unknown(String),
}

impl ActionKind {
    pub fn from_name(name: &str) -> Self {
        match name.parse() {
            Ok(action) => ActionKind::Known(action),
            Err(_) => ActionKind::Unknown(name.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, ActionKind::Known(_))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Known(a) => f.write_str(a.as_str()),
            ActionKind::Unknown(name) => f.write_str(name),
        }
    }
}

/// A single validated entry of an action plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionStep {
    pub action: ActionKind,
    pub parameters: Parameters,
}

/// An ordered, non-empty sequence of action steps.
///
/// The order is the temporal order of the gestures and is never changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    actions: Vec<ActionStep>,
}

impl Plan {
    /// Build a plan, rejecting an empty step list.
    pub fn new(actions: Vec<ActionStep>) -> Result<Self, NaoError> {
        if actions.is_empty() {
            return Err(NaoError::InvalidPlanSchema(
                "'actions' must contain at least one step".to_string(),
            ));
        }
        Ok(Self { actions })
    }

    pub fn actions(&self) -> &[ActionStep] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Number of steps whose action is outside the vocabulary.
    pub fn unknown_count(&self) -> usize {
        self.actions.iter().filter(|s| !s.action.is_known()).count()
    }
}

/// Wire shape of the action-planning reply: `{"actions": [...]}`.
///
/// Its JSON Schema is shown to the planning model.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanDocument {
    pub actions: Vec<PlanEntry>,
}

/// Wire shape of one plan entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanEntry {
    /// One of the action names, e.g. `"wave"`.
    pub action: String,
    #[serde(default)]
    pub parameters: Parameters,
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Error taxonomy shared by every layer of the assistant.
///
/// None of these is process-fatal: plan-level errors drop the plan, step-level
/// errors drop the step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NaoError {
    #[error("Plan format error: {0}")]
    PlanFormat(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid plan schema: {0}")]
    InvalidPlanSchema(String),

    #[error("Missing parameter '{parameter}' for '{action}'")]
    MissingParameter { action: String, parameter: String },

    #[error("Invalid parameter '{parameter}' for '{action}': {details}")]
    InvalidParameter {
        action: String,
        parameter: String,
        details: String,
    },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Actuator fault on {action}: {details}")]
    ActuatorFault { action: String, details: String },

    #[error("Memory error: {0}")]
    Memory(String),

    #[error("LLM Driver Error: {0}")]
    LlmInferenceFailed(String),

    #[error("Web search error: {0}")]
    WebSearch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── MemoryOp ─────────────────────────────────────────────────────────────

    #[test]
    fn memory_op_parses_all_registered_names() {
        for op in MemoryOp::ALL {
            let parsed: MemoryOp = op.function_name().parse().unwrap();
            assert_eq!(parsed, op);
        }
    }

    #[test]
    fn memory_op_rejects_unregistered_names() {
        for name in [
            "search_web",
            "save_memory",
            "delete_semantic_memory",
            "save_semantic",
            "",
        ] {
            let err = name.parse::<MemoryOp>().unwrap_err();
            assert_eq!(err, NaoError::UnknownTool(name.to_string()));
        }
    }

    #[test]
    fn memory_op_exposes_its_namespace() {
        let op: MemoryOp = "search_procedural_memory".parse().unwrap();
        assert_eq!(op, MemoryOp::Search(MemoryType::Procedural));
        assert_eq!(op.memory_type(), MemoryType::Procedural);
    }

    #[test]
    fn tool_invocation_resolves_op() {
        let call = ToolInvocation::new("save_episodic_memory", "keep answers short");
        assert_eq!(call.op().unwrap(), MemoryOp::Save(MemoryType::Episodic));
    }

    // ── ActionName ───────────────────────────────────────────────────────────

    #[test]
    fn action_name_str_matches_serde_name() {
        for action in ActionName::ALL {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
            assert_eq!(action.as_str().parse::<ActionName>().unwrap(), action);
        }
    }

    #[test]
    fn action_kind_flags_unknown_names() {
        assert_eq!(ActionKind::from_name("wave"), ActionKind::Known(ActionName::Wave));
        let kind = ActionKind::from_name("dance");
        assert_eq!(kind, ActionKind::Unknown("dance".to_string()));
        assert!(!kind.is_known());
        assert_eq!(kind.to_string(), "dance");
    }

    // ── Plan ─────────────────────────────────────────────────────────────────

    #[test]
    fn plan_rejects_empty_actions() {
        let err = Plan::new(vec![]).unwrap_err();
        assert!(matches!(err, NaoError::InvalidPlanSchema(_)));
    }

    #[test]
    fn plan_counts_unknown_steps() {
        let plan = Plan::new(vec![
            ActionStep {
                action: ActionKind::Known(ActionName::Stand),
                parameters: Parameters::new(),
            },
            ActionStep {
                action: ActionKind::Unknown("fly".into()),
                parameters: Parameters::new(),
            },
        ])
        .unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.unknown_count(), 1);
    }

    #[test]
    fn plan_document_parameters_default_to_empty() {
        let doc: PlanDocument =
            serde_json::from_str(r#"{"actions":[{"action":"sit"}]}"#).unwrap();
        assert_eq!(doc.actions[0].action, "sit");
        assert!(doc.actions[0].parameters.is_empty());
    }

    #[test]
    fn plan_document_schema_names_actions_field() {
        let schema = serde_json::to_value(schemars::schema_for!(PlanDocument)).unwrap();
        let text = schema.to_string();
        assert!(text.contains("actions"));
        assert!(text.contains("parameters"));
    }

    // ── NaoError ─────────────────────────────────────────────────────────────

    #[test]
    fn nao_error_display() {
        let err = NaoError::MissingParameter {
            action: "move".into(),
            parameter: "y".into(),
        };
        assert_eq!(err.to_string(), "Missing parameter 'y' for 'move'");
        assert_eq!(
            NaoError::UnknownAction("fly".into()).to_string(),
            "Unknown action: fly"
        );
    }
}
