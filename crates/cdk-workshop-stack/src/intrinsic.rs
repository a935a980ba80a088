//! CloudFormation intrinsic functions
//!
//! Builders for the values the template uses to point at other resources,
//! plus a walker that collects those references back out of a value.

use serde_json::{Value, json};

/// `{"Ref": logical_id}`
pub fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// `{"Fn::GetAtt": [logical_id, attribute]}`
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// The `index`-th availability zone of the deployment region
pub fn select_az(index: usize) -> Value {
    json!({ "Fn::Select": [index, { "Fn::GetAZs": "" }] })
}

pub fn base64(value: impl Into<Value>) -> Value {
    json!({ "Fn::Base64": value.into() })
}

/// `{"Fn::Join": [delimiter, parts]}`
pub fn join(delimiter: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [delimiter, parts] })
}

/// Whether a `Ref` target is a pseudo parameter such as `AWS::Region`
pub fn is_pseudo_parameter(target: &str) -> bool {
    target.starts_with("AWS::")
}

/// Collect every logical ID referenced through `Ref` or `Fn::GetAtt`
pub fn referenced_ids(value: &Value) -> Vec<String> {
    let mut ids = Vec::new();
    collect_references(value, &mut ids);
    ids
}

fn collect_references(value: &Value, ids: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get("Ref") {
                    if !is_pseudo_parameter(target) {
                        ids.push(target.clone());
                    }
                    return;
                }
                if let Some(Value::Array(args)) = map.get("Fn::GetAtt") {
                    if let Some(Value::String(target)) = args.first() {
                        ids.push(target.clone());
                    }
                    return;
                }
            }
            for v in map.values() {
                collect_references(v, ids);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_references(v, ids);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        assert_eq!(reference("MyVpcF9F0CA6F"), json!({ "Ref": "MyVpcF9F0CA6F" }));
        assert_eq!(
            get_att("Sg", "GroupId"),
            json!({ "Fn::GetAtt": ["Sg", "GroupId"] })
        );
        assert_eq!(
            select_az(1),
            json!({ "Fn::Select": [1, { "Fn::GetAZs": "" }] })
        );
        assert_eq!(base64("#!/bin/bash"), json!({ "Fn::Base64": "#!/bin/bash" }));
        assert_eq!(
            join("", vec![json!("arn:"), reference("AWS::Partition")]),
            json!({ "Fn::Join": ["", ["arn:", { "Ref": "AWS::Partition" }]] })
        );
    }

    #[test]
    fn test_referenced_ids() {
        let value = json!({
            "VpcId": reference("Vpc"),
            "SecurityGroupIds": [get_att("Sg", "GroupId")],
            "Region": reference("AWS::Region"),
            "Nested": { "Inner": [{ "Ref": "Subnet" }] },
            "Literal": "Ref",
        });

        let ids = referenced_ids(&value);
        assert_eq!(ids, vec!["Vpc", "Sg", "Subnet"]);
    }
}
