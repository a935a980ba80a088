//! Stack: a named, ordered collection of resource declarations

use crate::construct::{Construct, Scope};
use crate::error::{Result, StackError};
use crate::intrinsic;
use crate::resource::{CfnResource, Declaration, dependency_order};
use crate::template::{BOOTSTRAP_VERSION_PARAMETER, Parameter, Template};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Target deployment environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub account: Option<String>,
    pub region: Option<String>,
}

impl Environment {
    pub fn new(account: Option<String>, region: Option<String>) -> Self {
        Self { account, region }
    }

    /// Environment name in `aws://account/region` form
    pub fn name(&self) -> String {
        format!(
            "aws://{}/{}",
            self.account.as_deref().unwrap_or("unknown-account"),
            self.region.as_deref().unwrap_or("unknown-region")
        )
    }
}

/// Optional stack properties
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackProps {
    /// Deployed stack name (defaults to the stack id)
    pub stack_name: Option<String>,

    pub env: Option<Environment>,

    pub description: Option<String>,

    /// Tags applied to every taggable resource
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    #[serde(default)]
    pub termination_protection: bool,
}

/// A stack and everything declared on it
#[derive(Debug, Clone)]
pub struct Stack {
    id: String,
    props: StackProps,
    declarations: Vec<Declaration>,
    resources: Vec<CfnResource>,
    parameters: Vec<(String, Parameter)>,
}

impl Stack {
    pub fn new(id: impl Into<String>, props: StackProps) -> Self {
        Self {
            id: id.into(),
            props,
            declarations: Vec::new(),
            resources: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stack_name(&self) -> &str {
        self.props.stack_name.as_deref().unwrap_or(&self.id)
    }

    pub fn props(&self) -> &StackProps {
        &self.props
    }

    pub fn environment(&self) -> Environment {
        self.props.env.clone().unwrap_or_default()
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn declaration(&self, id: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.id == id)
    }

    pub fn resources(&self) -> &[CfnResource] {
        &self.resources
    }

    /// Declare a resource on this stack
    ///
    /// Fails on a duplicate id or a reference to an id that has not been
    /// declared yet. Nothing is registered when expansion fails.
    pub fn declare<C: Construct>(&mut self, id: &str, construct: C) -> Result<C::Output> {
        if self.declaration(id).is_some() {
            return Err(StackError::DuplicateId(id.to_string()));
        }

        let references = construct.references();
        for target in &references {
            if self.declaration(target).is_none() {
                return Err(StackError::UnknownReference {
                    from: id.to_string(),
                    to: target.clone(),
                });
            }
        }

        let mut scope = Scope::new(&self.id, id, self.props.env.as_ref(), &self.props.tags);
        let output = construct.expand(&mut scope)?;
        let Scope {
            resources,
            parameters,
            ..
        } = scope;

        // Resources and parameters share one logical ID namespace
        let mut seen: HashSet<&str> = self.resources.iter().map(|r| r.logical_id.as_str()).collect();
        for (logical_id, _) in &parameters {
            if seen.contains(logical_id.as_str()) {
                return Err(StackError::DuplicateId(logical_id.clone()));
            }
        }
        seen.extend(self.parameters.iter().map(|(logical_id, _)| logical_id.as_str()));
        seen.extend(parameters.iter().map(|(logical_id, _)| logical_id.as_str()));
        for resource in &resources {
            if !seen.insert(resource.logical_id.as_str()) {
                return Err(StackError::DuplicateId(resource.logical_id.clone()));
            }
        }

        let logical_ids = resources.iter().map(|r| r.logical_id.clone()).collect();
        tracing::debug!(
            "Declared {} '{}' ({} template resources)",
            construct.kind(),
            id,
            resources.len()
        );

        for (logical_id, parameter) in parameters {
            if !self.parameters.iter().any(|(existing, _)| *existing == logical_id) {
                self.parameters.push((logical_id, parameter));
            }
        }
        self.resources.extend(resources);
        self.declarations.push(Declaration {
            id: id.to_string(),
            kind: construct.kind(),
            config: construct.config(),
            references,
            logical_ids,
        });

        Ok(output)
    }

    /// Declarations in dependency order
    pub fn dependency_order(&self) -> Result<Vec<&Declaration>> {
        dependency_order(&self.declarations)
    }

    /// Convert the declarations into a template
    ///
    /// Pure function of the stack: synthesizing twice yields equal templates.
    pub fn synth(&self) -> Result<Template> {
        self.dependency_order()?;

        let mut template = Template {
            description: self.props.description.clone(),
            parameters: Default::default(),
            resources: Default::default(),
            rules: Default::default(),
        };

        for (logical_id, parameter) in &self.parameters {
            template
                .parameters
                .insert(logical_id.clone(), serde_json::to_value(parameter)?);
        }
        template.parameters.insert(
            BOOTSTRAP_VERSION_PARAMETER.to_string(),
            serde_json::to_value(Parameter::bootstrap_version())?,
        );

        for resource in &self.resources {
            template
                .resources
                .insert(resource.logical_id.clone(), resource.to_template());
        }

        self.check_references(&template)?;

        template.rules.insert(
            "CheckBootstrapVersion".to_string(),
            Template::check_bootstrap_version_rule(),
        );

        tracing::debug!(
            "Synthesized {} with {} resources",
            self.id,
            template.resources.len()
        );
        Ok(template)
    }

    /// Every `Ref`/`Fn::GetAtt`/`DependsOn` target must exist in the template
    fn check_references(&self, template: &Template) -> Result<()> {
        for resource in &self.resources {
            let targets = intrinsic::referenced_ids(&Value::Object(resource.properties.clone()))
                .into_iter()
                .chain(resource.depends_on.iter().cloned());
            for target in targets {
                let known = template.resources.contains_key(&target)
                    || template.parameters.contains_key(&target);
                if !known {
                    return Err(StackError::UnknownReference {
                        from: resource.logical_id.clone(),
                        to: target,
                    });
                }
            }
        }
        Ok(())
    }
}

/// A set of stacks synthesized together
#[derive(Debug, Clone, Default)]
pub struct App {
    stacks: Vec<Stack>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stack(&mut self, stack: Stack) -> Result<()> {
        if self.stack(stack.id()).is_some() {
            return Err(StackError::DuplicateId(stack.id().to_string()));
        }
        self.stacks.push(stack);
        Ok(())
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn stack(&self, id: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.id() == id)
    }

    /// Synthesize every stack, in the order they were added
    pub fn synth(&self) -> Result<Vec<(&Stack, Template)>> {
        self.stacks
            .iter()
            .map(|stack| Ok((stack, stack.synth()?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueProps;
    use crate::resource::ResourceKind;
    use crate::topic::TopicProps;
    use std::time::Duration;

    #[test]
    fn test_environment_name() {
        assert_eq!(
            Environment::default().name(),
            "aws://unknown-account/unknown-region"
        );
        assert_eq!(
            Environment::new(Some("123456789012".into()), Some("us-east-1".into())).name(),
            "aws://123456789012/us-east-1"
        );
    }

    #[test]
    fn test_stack_name_defaults_to_id() {
        let stack = Stack::new("MyStack", StackProps::default());
        assert_eq!(stack.stack_name(), "MyStack");

        let stack = Stack::new(
            "MyStack",
            StackProps {
                stack_name: Some("prod-stack".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(stack.stack_name(), "prod-stack");
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut stack = Stack::new("S", StackProps::default());
        stack.declare("Thing", TopicProps::default()).unwrap();

        let result = stack.declare("Thing", QueueProps::default());
        assert!(matches!(result, Err(StackError::DuplicateId(id)) if id == "Thing"));
        assert_eq!(stack.declarations().len(), 1);
        assert_eq!(stack.resources().len(), 1);
    }

    /// Adds one parameter and one resource named after the declaration itself
    struct Raw {
        parameter: Option<&'static str>,
    }

    impl Construct for Raw {
        type Output = ();

        fn kind(&self) -> ResourceKind {
            ResourceKind::Topic
        }

        fn config(&self) -> serde_json::Map<String, Value> {
            serde_json::Map::new()
        }

        fn expand(&self, scope: &mut Scope<'_>) -> Result<()> {
            if let Some(name) = self.parameter {
                scope.add_parameter(name, Parameter::ssm("String", "/raw"));
            }
            let resource = scope.resource(&[], "AWS::SNS::Topic");
            scope.add(resource);
            Ok(())
        }
    }

    #[test]
    fn test_resource_cannot_shadow_parameter() {
        let mut stack = Stack::new("S", StackProps::default());
        stack
            .declare("First", Raw { parameter: Some("Shared") })
            .unwrap();

        let result = stack.declare("Shared", Raw { parameter: None });
        assert!(matches!(result, Err(StackError::DuplicateId(id)) if id == "Shared"));
        assert_eq!(stack.declarations().len(), 1);
        assert!(stack.synth().is_ok());
    }

    #[test]
    fn test_parameter_cannot_shadow_resource() {
        let mut stack = Stack::new("S", StackProps::default());
        stack.declare("Shared", Raw { parameter: None }).unwrap();

        let result = stack.declare("Second", Raw { parameter: Some("Shared") });
        assert!(matches!(result, Err(StackError::DuplicateId(id)) if id == "Shared"));
        assert_eq!(stack.resources().len(), 1);
    }

    #[test]
    fn test_synth_contains_bootstrap_rule() {
        let mut stack = Stack::new("S", StackProps::default());
        stack
            .declare(
                "Jobs",
                QueueProps {
                    visibility_timeout: Some(Duration::from_secs(60)),
                    ..Default::default()
                },
            )
            .unwrap();

        let template = stack.synth().unwrap();
        assert!(template.parameters.contains_key("BootstrapVersion"));
        assert!(template.rules.contains_key("CheckBootstrapVersion"));
        assert_eq!(template.resources.len(), 1);
        assert!(template.description.is_none());
    }

    #[test]
    fn test_description_and_tags() {
        let mut tags = BTreeMap::new();
        tags.insert("owner".to_string(), "workshop".to_string());
        let mut stack = Stack::new(
            "S",
            StackProps {
                description: Some("demo".to_string()),
                tags,
                ..Default::default()
            },
        );
        let topic = stack.declare("Events", TopicProps::default()).unwrap();

        let template = stack.synth().unwrap();
        assert_eq!(template.description.as_deref(), Some("demo"));
        let props = template.properties(&topic.logical_id).unwrap();
        assert_eq!(
            props["Tags"],
            serde_json::json!([{ "Key": "owner", "Value": "workshop" }])
        );
    }

    #[test]
    fn test_app_rejects_duplicate_stacks() {
        let mut app = App::new();
        app.add_stack(Stack::new("A", StackProps::default())).unwrap();
        assert!(app.add_stack(Stack::new("A", StackProps::default())).is_err());
        assert_eq!(app.stacks().len(), 1);
    }
}
