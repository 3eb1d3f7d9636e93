//! Schema-driven change planning.
//!
//! The planner compares the operator's configuration with prior state,
//! attribute by attribute, honouring the schema's plan modifiers:
//!
//! - computed attributes left unset become unknown, or keep their prior
//!   value when `use_state_for_unknown` is set; a configured unknown stays
//!   unknown and is a change
//! - a change to a `force_new` attribute requires replacement, in which case
//!   every value the remote side computes becomes unknown again
//! - JSON-typed attributes are compared as documents, not as text
//! - a configured 0 on a `zero_as_null` attribute matches an unset prior

use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::organization::metadata_equivalent;
use crate::schema::{Attribute, Schema};
use crate::types::{AttributeChange, PlanResult};
use crate::value::{is_unknown_marker, AttrValue, UNKNOWN_VALUE};

/// Plan the transition from `prior` to `config`.
///
/// A `None` prior plans a create; a null `config` plans a destroy.
pub fn plan(
    schema: &Schema,
    prior: Option<&Value>,
    config: &Value,
) -> Result<PlanResult, ProviderError> {
    match (prior, config) {
        (None, Value::Null) => Ok(PlanResult::no_change(Value::Null)),
        (Some(prior), Value::Null) => Ok(plan_destroy(object(prior, "prior state")?)),
        (None, config) => Ok(plan_create(schema, object(config, "configuration")?)),
        (Some(prior), config) => Ok(plan_update(
            schema,
            object(prior, "prior state")?,
            object(config, "configuration")?,
        )),
    }
}

fn object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, ProviderError> {
    value
        .as_object()
        .ok_or_else(|| ProviderError::InvalidState(format!("{} must be an object", what)))
}

fn unknown() -> Value {
    Value::String(UNKNOWN_VALUE.to_string())
}

fn is_unset(value: &Value) -> bool {
    value.is_null() || is_unknown_marker(value)
}

fn get(map: &Map<String, Value>, name: &str) -> Value {
    map.get(name).cloned().unwrap_or(Value::Null)
}

fn plan_create(schema: &Schema, config: &Map<String, Value>) -> PlanResult {
    let mut planned = Map::new();
    let mut changes = Vec::new();

    for (name, attr) in &schema.attributes {
        let computed_only = attr.flags.computed && !attr.flags.optional;
        let value = match get(config, name) {
            _ if computed_only => unknown(),
            v if attr.flags.computed && is_unset(&v) => unknown(),
            v => v,
        };
        if !value.is_null() {
            changes.push(AttributeChange::added(name.as_str(), value.clone()));
        }
        planned.insert(name.clone(), value);
    }

    PlanResult::with_changes(Value::Object(planned), changes, false)
}

fn plan_update(
    schema: &Schema,
    prior: &Map<String, Value>,
    config: &Map<String, Value>,
) -> PlanResult {
    let mut planned = Map::new();
    let mut changes = Vec::new();
    let mut requires_replace = false;

    for (name, attr) in &schema.attributes {
        let before = get(prior, name);
        let computed_only = attr.flags.computed && !attr.flags.optional;
        let mut after = if computed_only {
            Value::Null
        } else {
            get(config, name)
        };

        if attr.flags.computed && after.is_null() {
            after = if attr.use_state_for_unknown {
                before.clone()
            } else {
                unknown()
            };
        }

        if attr.json && json_equivalent(&before, &after) {
            after = before.clone();
        }

        if attr.zero_as_null && before.is_null() && is_zero(&after) {
            after = Value::Null;
        }

        if after != before {
            if attr.force_new {
                requires_replace = true;
            }
            changes.push(change(name, &before, &after));
        }
        planned.insert(name.clone(), after);
    }

    if requires_replace {
        let replacement = plan_create(schema, config);
        return PlanResult::with_changes(replacement.planned_state, changes, true);
    }

    PlanResult::with_changes(Value::Object(planned), changes, false)
}

fn plan_destroy(prior: &Map<String, Value>) -> PlanResult {
    let changes = prior
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| AttributeChange::removed(k.as_str(), v.clone()))
        .collect();
    PlanResult::with_changes(Value::Null, changes, false)
}

fn change(name: &str, before: &Value, after: &Value) -> AttributeChange {
    match (before.is_null(), after.is_null()) {
        (true, _) => AttributeChange::added(name, after.clone()),
        (false, true) => AttributeChange::removed(name, before.clone()),
        (false, false) => AttributeChange::modified(name, before.clone(), after.clone()),
    }
}

fn is_zero(value: &Value) -> bool {
    value.as_i64() == Some(0)
}

fn json_equivalent(a: &Value, b: &Value) -> bool {
    match (as_text(a), as_text(b)) {
        (Some(a), Some(b)) => metadata_equivalent(&a, &b),
        _ => false,
    }
}

fn as_text(value: &Value) -> Option<AttrValue<String>> {
    match value {
        Value::Null => Some(AttrValue::Null),
        v if is_unknown_marker(v) => Some(AttrValue::Unknown),
        Value::String(s) => Some(AttrValue::Known(s.clone())),
        _ => None,
    }
}

/// Whether an attribute change in `result` forces replacement under `schema`.
pub fn replaced_by(schema: &Schema, result: &PlanResult) -> Vec<String> {
    result
        .changes
        .iter()
        .filter(|c| schema.attribute(&c.path).is_some_and(|a: &Attribute| a.force_new))
        .map(|c| c.path.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::organization_schema;
    use serde_json::json;

    fn prior() -> Value {
        json!({
            "id": "org_123",
            "name": "Test Org",
            "slug": "test-org",
            "max_allowed_memberships": null,
            "public_metadata": "{\"a\":1}",
            "private_metadata": null,
            "created_by": "user_1"
        })
    }

    #[test]
    fn test_plan_create_marks_computed_unknown() {
        let result = plan(
            &organization_schema(),
            None,
            &json!({"name": "Test Org", "slug": "test-org"}),
        )
        .unwrap();

        let planned = &result.planned_state;
        assert_eq!(planned["id"], UNKNOWN_VALUE);
        assert_eq!(planned["slug"], "test-org");
        assert_eq!(planned["max_allowed_memberships"], UNKNOWN_VALUE);
        assert_eq!(planned["public_metadata"], UNKNOWN_VALUE);
        assert_eq!(planned["created_by"], Value::Null);
        assert!(!result.requires_replace);
        assert!(result.changes_attribute("name"));
        assert!(!result.changes_attribute("created_by"));
    }

    #[test]
    fn test_plan_create_ignores_configured_id() {
        let result = plan(
            &organization_schema(),
            None,
            &json!({"name": "Test Org", "id": "org_fake"}),
        )
        .unwrap();
        assert_eq!(result.planned_state["id"], UNKNOWN_VALUE);
    }

    #[test]
    fn test_plan_update_no_changes_when_config_matches() {
        let config = json!({
            "name": "Test Org",
            "created_by": "user_1",
            "public_metadata": "{ \"a\": 1 }"
        });
        let result = plan(&organization_schema(), Some(&prior()), &config).unwrap();

        assert!(result.changes.is_empty(), "{:?}", result.changes);
        assert_eq!(result.planned_state, prior());
    }

    #[test]
    fn test_plan_update_in_place() {
        let config = json!({"name": "Test Org Updated", "created_by": "user_1"});
        let result = plan(&organization_schema(), Some(&prior()), &config).unwrap();

        assert!(!result.requires_replace);
        assert_eq!(result.changes.len(), 1);
        assert_eq!(
            result.changes[0],
            AttributeChange::modified("name", json!("Test Org"), json!("Test Org Updated"))
        );
        assert_eq!(result.planned_state["id"], "org_123");
        assert_eq!(result.planned_state["slug"], "test-org");
    }

    #[test]
    fn test_plan_created_by_change_requires_replace() {
        let config = json!({"name": "Test Org", "created_by": "user_2"});
        let result = plan(&organization_schema(), Some(&prior()), &config).unwrap();

        assert!(result.requires_replace);
        assert!(result.changes_attribute("created_by"));
        assert_eq!(result.planned_state["id"], UNKNOWN_VALUE);
        assert_eq!(result.planned_state["slug"], UNKNOWN_VALUE);
        assert_eq!(result.planned_state["created_by"], "user_2");
        assert_eq!(
            replaced_by(&organization_schema(), &result),
            vec!["created_by".to_string()]
        );
    }

    #[test]
    fn test_plan_empty_metadata_matches_null() {
        let mut prior = prior();
        prior["public_metadata"] = Value::Null;
        let config = json!({"name": "Test Org", "created_by": "user_1", "public_metadata": "{}"});

        let result = plan(&organization_schema(), Some(&prior), &config).unwrap();
        assert!(result.changes.is_empty(), "{:?}", result.changes);
    }

    #[test]
    fn test_plan_update_keeps_configured_unknown() {
        let config = json!({
            "name": "Test Org",
            "created_by": "user_1",
            "slug": UNKNOWN_VALUE,
            "public_metadata": UNKNOWN_VALUE
        });
        let result = plan(&organization_schema(), Some(&prior()), &config).unwrap();

        assert_eq!(result.planned_state["slug"], UNKNOWN_VALUE);
        assert_eq!(result.planned_state["public_metadata"], UNKNOWN_VALUE);
        assert_eq!(result.planned_state["id"], "org_123");
        assert!(result.changes_attribute("slug"));
        assert!(result.changes_attribute("public_metadata"));
        assert!(!result.requires_replace);
    }

    #[test]
    fn test_plan_zero_limit_matches_unset_prior() {
        let config = json!({
            "name": "Test Org",
            "created_by": "user_1",
            "public_metadata": "{\"a\":1}",
            "max_allowed_memberships": 0
        });
        let result = plan(&organization_schema(), Some(&prior()), &config).unwrap();
        assert!(result.changes.is_empty(), "{:?}", result.changes);
        assert_eq!(result.planned_state["max_allowed_memberships"], Value::Null);

        let mut limited = prior();
        limited["max_allowed_memberships"] = json!(5);
        let result = plan(&organization_schema(), Some(&limited), &config).unwrap();
        assert_eq!(
            result.changes,
            vec![AttributeChange::modified(
                "max_allowed_memberships",
                json!(5),
                json!(0)
            )]
        );
    }

    #[test]
    fn test_plan_destroy() {
        let result = plan(&organization_schema(), Some(&prior()), &Value::Null).unwrap();
        assert_eq!(result.planned_state, Value::Null);
        assert!(result.changes_attribute("id"));
        assert!(!result.changes_attribute("max_allowed_memberships"));
        assert!(result.changes.iter().all(|c| c.after.is_none()));
    }

    #[test]
    fn test_plan_rejects_non_object() {
        let err = plan(&organization_schema(), None, &json!([1, 2])).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidState(_)));
    }
}
