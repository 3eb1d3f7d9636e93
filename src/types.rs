//! Plan and import results handed back to the host.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One attribute whose planned value differs from prior state.
///
/// `before` is `None` when the attribute was unset, `after` is `None` when the
/// plan clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Attribute name.
    pub path: String,
    /// Prior value.
    pub before: Option<Value>,
    /// Planned value.
    pub after: Option<Value>,
}

impl AttributeChange {
    /// An attribute that gains a value.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: None,
            after: Some(value),
        }
    }

    /// An attribute that loses its value.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(value),
            after: None,
        }
    }

    /// An attribute whose value changes.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(before),
            after: Some(after),
        }
    }
}

/// What applying a plan will do to the organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    /// Nothing to apply.
    NoOp,
    /// Create a new organization.
    Create,
    /// Update the organization in place.
    Update,
    /// Delete the organization and create a new one.
    Replace,
    /// Delete the organization.
    Delete,
}

/// Planned state plus the changes that lead to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// State expected after apply; `null` when the plan destroys.
    pub planned_state: Value,
    /// Per-attribute differences from prior state.
    pub changes: Vec<AttributeChange>,
    /// A `force_new` attribute changed.
    pub requires_replace: bool,
}

impl PlanResult {
    /// A plan that leaves `state` as it is.
    pub fn no_change(state: Value) -> Self {
        Self::with_changes(state, Vec::new(), false)
    }

    /// A plan with the given changes.
    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }

    /// Returns true if a change is recorded for the given attribute.
    pub fn changes_attribute(&self, path: &str) -> bool {
        self.changes.iter().any(|c| c.path == path)
    }

    /// Classify the plan, given whether prior state existed.
    pub fn action(&self, had_prior: bool) -> PlanAction {
        match (had_prior, self.planned_state.is_null()) {
            (false, true) => PlanAction::NoOp,
            (false, false) => PlanAction::Create,
            (true, true) => PlanAction::Delete,
            (true, false) if self.requires_replace => PlanAction::Replace,
            (true, false) if self.changes.is_empty() => PlanAction::NoOp,
            (true, false) => PlanAction::Update,
        }
    }
}

/// An organization adopted by import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// Resource type the state belongs to.
    pub resource_type: String,
    /// State read from the API.
    pub state: Value,
}

impl ImportedResource {
    /// Pair imported state with its resource type.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// What the provider serves, as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names.
    pub resources: Vec<String>,
    /// The planner understands a null configuration as destroy.
    pub plan_destroy: bool,
}
