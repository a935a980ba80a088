//! Template diff
//!
//! Compares a previously synthesized template with a fresh one, resource by
//! resource. This only looks at templates; what is actually deployed is the
//! provisioning engine's business.

use crate::template::Template;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Planned change for one template resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Logical ID of the resource
    pub logical_id: String,

    /// Type of change
    pub action_type: ActionType,

    /// CloudFormation type (e.g., "AWS::SQS::Queue")
    pub resource_type: String,

    /// Description of the change
    pub description: String,

    /// Additional details (changed property names, type changes)
    pub details: Map<String, Value>,
}

/// Type of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Resource is new
    Create,
    /// Resource exists in both templates but differs
    Update,
    /// Resource is gone from the new template
    Delete,
    /// No changes
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// All changes between two templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Counts per change type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}

fn type_of(resource: &Value) -> String {
    resource
        .get("Type")
        .and_then(|t| t.as_str())
        .unwrap_or("Unknown")
        .to_string()
}

/// Top-level keys (and property names) whose values differ
fn changed_keys(old: &Value, new: &Value) -> Vec<String> {
    let empty = Map::new();
    let old_props = old.get("Properties").and_then(|p| p.as_object()).unwrap_or(&empty);
    let new_props = new.get("Properties").and_then(|p| p.as_object()).unwrap_or(&empty);

    let mut changed: Vec<String> = Vec::new();
    for (key, value) in new_props {
        if old_props.get(key) != Some(value) {
            changed.push(key.clone());
        }
    }
    for key in old_props.keys() {
        if !new_props.contains_key(key) {
            changed.push(key.clone());
        }
    }

    for key in ["DependsOn", "UpdateReplacePolicy", "DeletionPolicy"] {
        if old.get(key) != new.get(key) {
            changed.push(key.to_string());
        }
    }
    changed
}

/// Diff two templates; `old` is `None` when nothing was synthesized before
pub fn diff_templates(old: Option<&Template>, new: &Template) -> Plan {
    let empty = Template {
        description: None,
        parameters: Map::new(),
        resources: Map::new(),
        rules: Map::new(),
    };
    let old = old.unwrap_or(&empty);
    let mut actions = Vec::new();

    for (logical_id, resource) in &new.resources {
        let resource_type = type_of(resource);
        let action = match old.resources.get(logical_id) {
            None => Action {
                logical_id: logical_id.clone(),
                action_type: ActionType::Create,
                description: format!("Create {} {}", resource_type, logical_id),
                resource_type,
                details: Map::new(),
            },
            Some(previous) if type_of(previous) != resource_type => {
                let mut details = Map::new();
                details.insert("previous_type".to_string(), json!(type_of(previous)));
                Action {
                    logical_id: logical_id.clone(),
                    action_type: ActionType::Update,
                    description: format!("Replace {} with {}", type_of(previous), resource_type),
                    resource_type,
                    details,
                }
            }
            Some(previous) => {
                let changed = changed_keys(previous, resource);
                if changed.is_empty() {
                    Action {
                        logical_id: logical_id.clone(),
                        action_type: ActionType::NoOp,
                        description: format!("{} {} unchanged", resource_type, logical_id),
                        resource_type,
                        details: Map::new(),
                    }
                } else {
                    let mut details = Map::new();
                    details.insert("changed".to_string(), json!(changed));
                    Action {
                        logical_id: logical_id.clone(),
                        action_type: ActionType::Update,
                        description: format!(
                            "Update {} {} ({})",
                            resource_type,
                            logical_id,
                            changed.join(", ")
                        ),
                        resource_type,
                        details,
                    }
                }
            }
        };
        actions.push(action);
    }

    for (logical_id, resource) in &old.resources {
        if !new.resources.contains_key(logical_id) {
            let resource_type = type_of(resource);
            actions.push(Action {
                logical_id: logical_id.clone(),
                action_type: ActionType::Delete,
                description: format!("Delete {} {}", resource_type, logical_id),
                resource_type,
                details: Map::new(),
            });
        }
    }

    let plan = Plan::new(actions);
    tracing::debug!("Diff: {}", plan.summary());
    plan
}
