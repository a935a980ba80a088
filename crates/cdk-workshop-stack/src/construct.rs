//! Construct abstraction
//!
//! Every declarable resource implements [`Construct`]. Declaring one hands it
//! a [`Scope`] to expand into template resources; the stack commits the
//! expansion only if it succeeds as a whole.

use crate::error::Result;
use crate::id::ConstructPath;
use crate::resource::{CfnResource, ResourceKind};
use crate::stack::Environment;
use crate::template::Parameter;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// A resource that can be declared on a stack
pub trait Construct {
    /// Handle returned to the author after declaration
    type Output;

    fn kind(&self) -> ResourceKind;

    /// Configuration as written by the author
    fn config(&self) -> Map<String, Value>;

    /// Ids of other declarations this one points at
    fn references(&self) -> Vec<String> {
        Vec::new()
    }

    /// Expand into template resources
    fn expand(&self, scope: &mut Scope<'_>) -> Result<Self::Output>;
}

/// Expansion context for one declaration
pub struct Scope<'a> {
    stack_id: &'a str,
    construct_id: &'a str,
    env: Option<&'a Environment>,
    stack_tags: &'a BTreeMap<String, String>,
    pub(crate) resources: Vec<CfnResource>,
    pub(crate) parameters: Vec<(String, Parameter)>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(
        stack_id: &'a str,
        construct_id: &'a str,
        env: Option<&'a Environment>,
        stack_tags: &'a BTreeMap<String, String>,
    ) -> Self {
        Self {
            stack_id,
            construct_id,
            env,
            stack_tags,
            resources: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn construct_id(&self) -> &str {
        self.construct_id
    }

    /// Region of the target environment, when known at synth time
    pub fn region(&self) -> Option<&str> {
        self.env.and_then(|e| e.region.as_deref())
    }

    /// Construct path of a child of this declaration
    pub fn path(&self, children: &[&str]) -> ConstructPath {
        children
            .iter()
            .fold(ConstructPath::new(self.construct_id), |path, child| {
                path.child(*child)
            })
    }

    /// Full node path (including the stack id) of a child of this declaration
    pub fn node_path(&self, children: &[&str]) -> String {
        format!("{}/{}", self.stack_id, self.path(children))
    }

    /// Start a template resource at the given child path
    pub fn resource(&self, children: &[&str], resource_type: &str) -> CfnResource {
        CfnResource::new(self.stack_id, &self.path(children), resource_type)
    }

    /// Add a template resource, returning its logical ID
    pub fn add(&mut self, resource: CfnResource) -> String {
        let logical_id = resource.logical_id.clone();
        tracing::debug!(
            "{}: {} ({})",
            self.construct_id,
            logical_id,
            resource.resource_type
        );
        self.resources.push(resource);
        logical_id
    }

    /// Add a stack-level parameter, returning its logical ID
    ///
    /// Parameters are keyed by a stack-wide construct id so that declarations
    /// sharing a parameter end up with a single template entry.
    pub fn add_parameter(&mut self, construct_id: &str, parameter: Parameter) -> String {
        let logical_id = ConstructPath::new(construct_id).logical_id();
        if !self.parameters.iter().any(|(id, _)| *id == logical_id) {
            self.parameters.push((logical_id.clone(), parameter));
        }
        logical_id
    }

    /// Tags for a taggable resource: the given tags, an optional `Name` tag and the stack tags
    ///
    /// Returns `None` when there is nothing to tag.
    pub fn tags(&self, name: Option<String>, extra: &[(&str, &str)]) -> Option<Value> {
        let mut tags: BTreeMap<String, String> = self.stack_tags.clone();
        for (key, value) in extra {
            tags.insert(key.to_string(), value.to_string());
        }
        if let Some(name) = name {
            tags.insert("Name".to_string(), name);
        }
        if tags.is_empty() {
            return None;
        }

        let mut tags: Vec<(String, String)> = tags.into_iter().collect();
        tags.sort_by(|(a, _), (b, _)| a.to_lowercase().cmp(&b.to_lowercase()).then(a.cmp(b)));

        Some(Value::Array(
            tags.into_iter()
                .map(|(key, value)| json!({ "Key": key, "Value": value }))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let tags = BTreeMap::new();
        let scope = Scope::new("CdkWorkshopStack", "MyVpc", None, &tags);

        assert_eq!(scope.path(&["IGW"]).to_string(), "MyVpc/IGW");
        assert_eq!(scope.node_path(&[]), "CdkWorkshopStack/MyVpc");
        assert_eq!(
            scope.resource(&["Resource"], "AWS::EC2::VPC").logical_id,
            "MyVpcF9F0CA6F"
        );
    }

    #[test]
    fn test_tags_sorted_case_insensitively() {
        let mut stack_tags = BTreeMap::new();
        stack_tags.insert("team".to_string(), "platform".to_string());
        let scope = Scope::new("S", "MyVpc", None, &stack_tags);

        let tags = scope
            .tags(
                Some("S/MyVpc".to_string()),
                &[("aws-cdk:subnet-name", "public")],
            )
            .unwrap();
        let keys: Vec<&str> = tags
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["Key"].as_str().unwrap())
            .collect();
        assert_eq!(keys, vec!["aws-cdk:subnet-name", "Name", "team"]);
    }

    #[test]
    fn test_no_tags() {
        let tags = BTreeMap::new();
        let scope = Scope::new("S", "MyQueue", None, &tags);
        assert!(scope.tags(None, &[]).is_none());
    }

    #[test]
    fn test_parameters_shared() {
        let tags = BTreeMap::new();
        let mut scope = Scope::new("S", "MyInstance", None, &tags);
        let a = scope.add_parameter("Image.Parameter", Parameter::ssm("String", "/a"));
        let b = scope.add_parameter("Image.Parameter", Parameter::ssm("String", "/a"));
        assert_eq!(a, b);
        assert_eq!(a, "ImageParameter");
        assert_eq!(scope.parameters.len(), 1);
    }
}
