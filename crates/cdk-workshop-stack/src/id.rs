//! Construct paths and template logical IDs
//!
//! A logical ID is derived from the construct path below the stack: a short
//! human readable prefix followed by an 8 character hash of the full path.
//! The same path always yields the same ID, so re-synthesizing an unchanged
//! stack keeps every resource key stable.

use md5::{Digest, Md5};

const PATH_SEP: &str = "/";
const HASH_LEN: usize = 8;
const MAX_HUMAN_LEN: usize = 240;
const MAX_ID_LEN: usize = 255;

/// Components with this id are skipped entirely
const HIDDEN_ID: &str = "Default";

/// Components with this id only take part in the hash
const HIDDEN_FROM_HUMAN_ID: &str = "Resource";

/// Path of a construct relative to its stack
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstructPath {
    components: Vec<String>,
}

impl ConstructPath {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            components: vec![root.into()],
        }
    }

    pub fn child(&self, id: impl Into<String>) -> Self {
        let mut components = self.components.clone();
        components.push(id.into());
        Self { components }
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Logical ID of the resource at this path
    pub fn logical_id(&self) -> String {
        logical_id(&self.components)
    }
}

impl std::fmt::Display for ConstructPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.components.join(PATH_SEP))
    }
}

/// Compute the logical ID for a list of path components
pub fn logical_id<S: AsRef<str>>(components: &[S]) -> String {
    let components: Vec<&str> = components
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| *c != HIDDEN_ID)
        .collect();

    // Top-level resources keep their id as-is
    if components.len() == 1 {
        let candidate = remove_non_alphanumeric(components[0]);
        if candidate.len() <= MAX_ID_LEN {
            return candidate;
        }
    }

    let hash = path_hash(&components);
    let mut human: String = remove_dupes(&components)
        .into_iter()
        .filter(|c| *c != HIDDEN_FROM_HUMAN_ID)
        .map(remove_non_alphanumeric)
        .collect();
    human.truncate(MAX_HUMAN_LEN);

    format!("{}{}", human, hash)
}

fn path_hash(components: &[&str]) -> String {
    let digest = Md5::digest(components.join(PATH_SEP).as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(HASH_LEN);
    hash.to_uppercase()
}

fn remove_non_alphanumeric(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Drop components already covered by the end of the previous one
fn remove_dupes<'a>(components: &[&'a str]) -> Vec<&'a str> {
    let mut result: Vec<&str> = Vec::new();
    for &component in components {
        match result.last() {
            Some(last) if last.ends_with(component) => {}
            _ => result.push(component),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_component_kept_verbatim() {
        assert_eq!(logical_id(&["MyBucket"]), "MyBucket");
        assert_eq!(logical_id(&["my-bucket.v2"]), "mybucketv2");
    }

    #[test]
    fn test_resource_component_hidden_from_human_part() {
        assert_eq!(
            logical_id(&["CdkWorkshopQueue", "Resource"]),
            "CdkWorkshopQueue50D9D426"
        );
        assert_eq!(logical_id(&["MyQueue", "Resource"]), "MyQueueE6CA6235");
        assert_eq!(logical_id(&["MyVpc", "Resource"]), "MyVpcF9F0CA6F");
    }

    #[test]
    fn test_nested_path() {
        let path = ConstructPath::new("MyVpc")
            .child("public-subnetSubnet1")
            .child("Subnet");
        assert_eq!(path.to_string(), "MyVpc/public-subnetSubnet1/Subnet");
        assert_eq!(path.logical_id(), "MyVpcpublicsubnetSubnet1SubnetABA0FC9E");
    }

    #[test]
    fn test_default_component_ignored() {
        assert_eq!(logical_id(&["Default", "MyTopic"]), "MyTopic");
        assert_eq!(
            logical_id(&["MyTopic", "Default", "Resource"]),
            logical_id(&["MyTopic", "Resource"])
        );
    }

    #[test]
    fn test_consecutive_duplicates_removed() {
        let id = logical_id(&["Bucket", "Bucket", "Resource"]);
        assert!(id.starts_with("Bucket"));
        assert!(!id.starts_with("BucketBucket"));
        assert_eq!(id.len(), "Bucket".len() + HASH_LEN);
    }

    #[test]
    fn test_deterministic() {
        let a = logical_id(&["MyInstance", "InstanceRole", "Resource"]);
        let b = logical_id(&["MyInstance", "InstanceRole", "Resource"]);
        assert_eq!(a, b);
        assert!(a.starts_with("MyInstanceInstanceRole"));
    }
}
