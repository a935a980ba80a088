//! Resource declarations and their low-level template resources

use crate::error::{Result, StackError};
use crate::id::ConstructPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};

/// Kind of a declared resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    ComputeInstance,
    Queue,
    Topic,
    Secret,
}

impl ResourceKind {
    /// CloudFormation type of the primary resource behind this kind
    pub fn cfn_type(&self) -> &'static str {
        match self {
            ResourceKind::Network => "AWS::EC2::VPC",
            ResourceKind::ComputeInstance => "AWS::EC2::Instance",
            ResourceKind::Queue => "AWS::SQS::Queue",
            ResourceKind::Topic => "AWS::SNS::Topic",
            ResourceKind::Secret => "AWS::SecretsManager::Secret",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Network => write!(f, "network"),
            ResourceKind::ComputeInstance => write!(f, "compute-instance"),
            ResourceKind::Queue => write!(f, "queue"),
            ResourceKind::Topic => write!(f, "topic"),
            ResourceKind::Secret => write!(f, "secret"),
        }
    }
}

/// A resource as the stack author declared it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declaration {
    /// Author-chosen identifier, unique within the stack
    pub id: String,

    pub kind: ResourceKind,

    /// Configuration keys and their literal values
    pub config: Map<String, Value>,

    /// Ids of other declarations in the same stack
    pub references: Vec<String>,

    /// Logical IDs of the template resources this declaration expanded to
    pub logical_ids: Vec<String>,
}

impl Declaration {
    /// Get a configuration value as a specific type
    pub fn get_config<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// What happens to a resource when it leaves the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalPolicy {
    Delete,
    Retain,
    Snapshot,
}

impl RemovalPolicy {
    fn as_str(&self) -> &'static str {
        match self {
            RemovalPolicy::Delete => "Delete",
            RemovalPolicy::Retain => "Retain",
            RemovalPolicy::Snapshot => "Snapshot",
        }
    }
}

/// A single resource entry of the template
#[derive(Debug, Clone)]
pub struct CfnResource {
    pub logical_id: String,
    pub resource_type: String,
    pub properties: Map<String, Value>,
    pub depends_on: Vec<String>,
    pub removal_policy: Option<RemovalPolicy>,

    /// Full construct path including the stack id
    pub node_path: String,
}

impl CfnResource {
    pub fn new(stack_id: &str, path: &ConstructPath, resource_type: impl Into<String>) -> Self {
        Self {
            logical_id: path.logical_id(),
            resource_type: resource_type.into(),
            properties: Map::new(),
            depends_on: Vec::new(),
            removal_policy: None,
            node_path: format!("{}/{}", stack_id, path),
        }
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set a property only when a value is present
    pub fn optional_property(self, key: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.property(key, value),
            None => self,
        }
    }

    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        let logical_id = logical_id.into();
        if !self.depends_on.contains(&logical_id) {
            self.depends_on.push(logical_id);
        }
        self
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = Some(policy);
        self
    }

    /// Render the resource body as it appears under `Resources`
    pub fn to_template(&self) -> Value {
        let mut body = Map::new();
        body.insert("Type".to_string(), json!(self.resource_type));
        if !self.properties.is_empty() {
            body.insert(
                "Properties".to_string(),
                Value::Object(self.properties.clone()),
            );
        }
        if !self.depends_on.is_empty() {
            let mut depends_on = self.depends_on.clone();
            depends_on.sort();
            body.insert("DependsOn".to_string(), json!(depends_on));
        }
        if let Some(policy) = self.removal_policy {
            body.insert("UpdateReplacePolicy".to_string(), json!(policy.as_str()));
            body.insert("DeletionPolicy".to_string(), json!(policy.as_str()));
        }
        body.insert(
            "Metadata".to_string(),
            json!({ "aws:cdk:path": self.node_path }),
        );
        Value::Object(body)
    }
}

/// Order declarations so that every declaration follows the ones it references
///
/// Declaration order is kept wherever the references allow it.
pub fn dependency_order(declarations: &[Declaration]) -> Result<Vec<&Declaration>> {
    let by_id: HashMap<&str, &Declaration> = declarations
        .iter()
        .map(|d| (d.id.as_str(), d))
        .collect();

    for declaration in declarations {
        for target in &declaration.references {
            if !by_id.contains_key(target.as_str()) {
                return Err(StackError::UnknownReference {
                    from: declaration.id.clone(),
                    to: target.clone(),
                });
            }
        }
    }

    let mut ordered: Vec<&Declaration> = Vec::with_capacity(declarations.len());
    let mut placed: HashSet<&str> = HashSet::new();

    while ordered.len() < declarations.len() {
        let next = declarations.iter().find(|d| {
            !placed.contains(d.id.as_str())
                && d.references.iter().all(|r| placed.contains(r.as_str()))
        });

        match next {
            Some(declaration) => {
                placed.insert(declaration.id.as_str());
                ordered.push(declaration);
            }
            None => {
                let stuck: Vec<&str> = declarations
                    .iter()
                    .filter(|d| !placed.contains(d.id.as_str()))
                    .map(|d| d.id.as_str())
                    .collect();
                return Err(StackError::CircularDependency(stuck.join(" -> ")));
            }
        }
    }

    Ok(ordered)
}
