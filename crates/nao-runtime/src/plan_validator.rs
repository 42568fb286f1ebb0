//! [`ActionPlanValidator`] – turns an action-plan reply into a [`Plan`].
//!
//! The reply must be (or contain, in its first fenced block) a JSON object
//! with an `actions` list. Each entry needs a string `action` and may carry a
//! `parameters` object. Structural problems reject the whole plan; an action
//! name outside the vocabulary does not, it is kept as
//! [`ActionKind::Unknown`] and left for the dispatcher to skip.

use nao_types::{ActionKind, ActionStep, NaoError, Parameters, Plan};
use serde_json::Value;
use tracing::{debug, warn};

use crate::payload::extract_payload;

/// Validator for action-plan replies.
pub struct ActionPlanValidator;

impl ActionPlanValidator {
    /// Validate `text` and build the plan.
    ///
    /// # Errors
    ///
    /// - [`NaoError::PlanFormat`] when the payload is not JSON.
    /// - [`NaoError::InvalidPlanSchema`] when the JSON lacks an `actions`
    ///   list, the list is empty, or an entry is malformed.
    pub fn validate(text: &str) -> Result<Plan, NaoError> {
        let payload = extract_payload(text);
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| NaoError::PlanFormat(format!("plan is not valid JSON: {e}")))?;

        let Some(document) = value.as_object() else {
            return Err(NaoError::InvalidPlanSchema(
                "expected a JSON object with an 'actions' key".into(),
            ));
        };
        let actions = document
            .get("actions")
            .ok_or_else(|| NaoError::InvalidPlanSchema("missing 'actions' key".into()))?
            .as_array()
            .ok_or_else(|| NaoError::InvalidPlanSchema("'actions' must be a list".into()))?;

        let steps = actions
            .iter()
            .enumerate()
            .map(|(i, entry)| step(i, entry))
            .collect::<Result<Vec<_>, _>>()?;

        let plan = Plan::new(steps)?;
        if plan.unknown_count() > 0 {
            warn!(unknown = plan.unknown_count(), "plan contains actions outside the vocabulary");
        }
        debug!(steps = plan.len(), "action plan validated");
        Ok(plan)
    }
}

fn step(index: usize, entry: &Value) -> Result<ActionStep, NaoError> {
    let entry = entry.as_object().ok_or_else(|| {
        NaoError::InvalidPlanSchema(format!("actions[{index}] is not an object"))
    })?;

    let name = entry
        .get("action")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            NaoError::InvalidPlanSchema(format!("actions[{index}] has no 'action' name"))
        })?;

    let parameters = match entry.get("parameters") {
        None | Some(Value::Null) => Parameters::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            return Err(NaoError::InvalidPlanSchema(format!(
                "actions[{index}].parameters must be an object"
            )));
        }
    };

    Ok(ActionStep {
        action: ActionKind::from_name(name),
        parameters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nao_types::ActionName;

    #[test]
    fn valid_plan_keeps_order_and_parameters() {
        let text = r#"{"actions": [
            {"action": "wave", "parameters": {"hand": "right"}},
            {"action": "speak", "parameters": {"speech": "Hello!"}},
            {"action": "reset_nao_pose"}
        ]}"#;
        let plan = ActionPlanValidator::validate(text).unwrap();
        let names: Vec<String> = plan.actions().iter().map(|s| s.action.to_string()).collect();
        assert_eq!(names, vec!["wave", "speak", "reset_nao_pose"]);
        assert_eq!(plan.actions()[1].parameters["speech"], "Hello!");
        assert!(plan.actions()[2].parameters.is_empty());
    }

    #[test]
    fn fenced_plan_with_prose_is_accepted() {
        let text = "Here is my plan:\n```json\n{\"actions\": [{\"action\": \"sit\"}]}\n```\nHope it helps.";
        let plan = ActionPlanValidator::validate(text).unwrap();
        assert_eq!(
            plan.actions()[0].action,
            ActionKind::Known(ActionName::Sit)
        );
    }

    #[test]
    fn inline_fenced_plan_is_accepted() {
        let text = "```json {\"actions\": [{\"action\": \"sit\"}, {\"action\": \"stand\"}]}```";
        let plan = ActionPlanValidator::validate(text).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(
            plan.actions()[0].action,
            ActionKind::Known(ActionName::Sit)
        );
    }

    #[test]
    fn unknown_action_is_kept_and_flagged() {
        let text = r#"{"actions": [
            {"action": "dance", "parameters": {}},
            {"action": "nod_head", "parameters": {"direction": "up_down"}}
        ]}"#;
        let plan = ActionPlanValidator::validate(text).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.unknown_count(), 1);
        assert_eq!(plan.actions()[0].action, ActionKind::Unknown("dance".into()));
        assert!(plan.actions()[1].action.is_known());
    }

    #[test]
    fn null_parameters_are_empty() {
        let plan =
            ActionPlanValidator::validate(r#"{"actions": [{"action": "stand", "parameters": null}]}"#)
                .unwrap();
        assert!(plan.actions()[0].parameters.is_empty());
    }

    // ── rejections ───────────────────────────────────────────────────────────

    #[test]
    fn malformed_json_is_plan_format_error() {
        let err = ActionPlanValidator::validate("{\"actions\": [").unwrap_err();
        assert!(matches!(err, NaoError::PlanFormat(_)));
    }

    #[test]
    fn missing_actions_key_is_schema_error() {
        let err = ActionPlanValidator::validate(r#"{"steps": []}"#).unwrap_err();
        assert_eq!(err, NaoError::InvalidPlanSchema("missing 'actions' key".into()));
    }

    #[test]
    fn non_object_document_is_schema_error() {
        let err = ActionPlanValidator::validate(r#"[{"action": "wave"}]"#).unwrap_err();
        assert!(matches!(err, NaoError::InvalidPlanSchema(_)));
    }

    #[test]
    fn actions_not_a_list_is_schema_error() {
        let err = ActionPlanValidator::validate(r#"{"actions": "wave"}"#).unwrap_err();
        assert!(matches!(err, NaoError::InvalidPlanSchema(_)));
    }

    #[test]
    fn empty_actions_is_schema_error() {
        let err = ActionPlanValidator::validate(r#"{"actions": []}"#).unwrap_err();
        assert!(matches!(err, NaoError::InvalidPlanSchema(_)));
    }

    #[test]
    fn malformed_entries_are_schema_errors() {
        for text in [
            r#"{"actions": ["wave"]}"#,
            r#"{"actions": [{"parameters": {}}]}"#,
            r#"{"actions": [{"action": 7}]}"#,
            r#"{"actions": [{"action": "  "}]}"#,
            r#"{"actions": [{"action": "wave", "parameters": ["right"]}]}"#,
        ] {
            let err = ActionPlanValidator::validate(text).unwrap_err();
            assert!(matches!(err, NaoError::InvalidPlanSchema(_)), "{text}");
        }
    }
}
