//! Synthesized CloudFormation template

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

pub const BOOTSTRAP_VERSION_PARAMETER: &str = "BootstrapVersion";
const BOOTSTRAP_VERSION_SSM: &str = "/cdk-bootstrap/hnb659fds/version";
const MIN_BOOTSTRAP_VERSION: u32 = 6;

/// Template parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub parameter_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    /// A parameter resolved from SSM Parameter Store at deploy time
    pub fn ssm(value_type: &str, parameter_name: impl Into<String>) -> Self {
        Self {
            parameter_type: format!("AWS::SSM::Parameter::Value<{}>", value_type),
            default: Some(parameter_name.into()),
            description: None,
        }
    }

    pub(crate) fn bootstrap_version() -> Self {
        Self {
            description: Some(
                "Version of the CDK Bootstrap resources in this environment, \
                 automatically retrieved from SSM Parameter Store. [cdk:skip]"
                    .to_string(),
            ),
            ..Self::ssm("String", BOOTSTRAP_VERSION_SSM)
        }
    }
}

/// A complete template as handed to the provisioning engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,

    #[serde(default)]
    pub resources: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub rules: Map<String, Value>,
}

impl Template {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.resources.get(logical_id)
    }

    /// Type of a resource, if present
    pub fn resource_type(&self, logical_id: &str) -> Option<&str> {
        self.resource(logical_id)
            .and_then(|r| r.get("Type"))
            .and_then(|t| t.as_str())
    }

    /// Resources of the given type, in template order
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<(&String, &Value)> {
        self.resources
            .iter()
            .filter(|(_, r)| r.get("Type").and_then(|t| t.as_str()) == Some(resource_type))
            .collect()
    }

    /// Properties of a resource, if present
    pub fn properties(&self, logical_id: &str) -> Option<&Map<String, Value>> {
        self.resource(logical_id)
            .and_then(|r| r.get("Properties"))
            .and_then(|p| p.as_object())
    }

    pub(crate) fn check_bootstrap_version_rule() -> Value {
        let unsupported: Vec<String> = (1..MIN_BOOTSTRAP_VERSION).map(|v| v.to_string()).collect();
        json!({
            "Assertions": [{
                "Assert": {
                    "Fn::Not": [{
                        "Fn::Contains": [unsupported, { "Ref": BOOTSTRAP_VERSION_PARAMETER }]
                    }]
                },
                "AssertDescription": format!(
                    "CDK bootstrap stack version {} required. Please run 'cdk bootstrap' \
                     with a recent version of the CDK CLI.",
                    MIN_BOOTSTRAP_VERSION
                )
            }]
        })
    }
}
