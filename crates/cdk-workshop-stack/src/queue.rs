//! Managed message queue (`AWS::SQS::Queue`)

use crate::construct::{Construct, Scope};
use crate::error::{Result, StackError};
use crate::resource::{RemovalPolicy, ResourceKind};
use serde_json::{Map, Value, json};
use std::time::Duration;

/// Upper bound SQS accepts for the visibility timeout (12 hours)
const MAX_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(43_200);

#[derive(Debug, Clone, Default)]
pub struct QueueProps {
    /// Physical queue name (generated when unset)
    pub queue_name: Option<String>,

    /// How long a received message stays hidden from other consumers
    pub visibility_timeout: Option<Duration>,
}

/// Handle to a declared queue
#[derive(Debug, Clone)]
pub struct Queue {
    pub id: String,
    pub logical_id: String,
}

impl Construct for QueueProps {
    type Output = Queue;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Queue
    }

    fn config(&self) -> Map<String, Value> {
        let mut config = Map::new();
        if let Some(name) = &self.queue_name {
            config.insert("queueName".to_string(), json!(name));
        }
        if let Some(timeout) = self.visibility_timeout {
            config.insert("visibilityTimeout".to_string(), json!(timeout.as_secs()));
        }
        config
    }

    fn expand(&self, scope: &mut Scope<'_>) -> Result<Queue> {
        if let Some(timeout) = self.visibility_timeout {
            if timeout > MAX_VISIBILITY_TIMEOUT {
                return Err(StackError::invalid(
                    scope.construct_id(),
                    format!(
                        "visibility timeout must be at most {} seconds, got {}",
                        MAX_VISIBILITY_TIMEOUT.as_secs(),
                        timeout.as_secs()
                    ),
                ));
            }
            if timeout.subsec_nanos() != 0 {
                return Err(StackError::invalid(
                    scope.construct_id(),
                    "visibility timeout must be a whole number of seconds",
                ));
            }
        }

        let queue = scope
            .resource(&["Resource"], ResourceKind::Queue.cfn_type())
            .optional_property("QueueName", self.queue_name.clone())
            .optional_property("Tags", scope.tags(None, &[]))
            .optional_property(
                "VisibilityTimeout",
                self.visibility_timeout.map(|t| t.as_secs()),
            )
            .with_removal_policy(RemovalPolicy::Delete);
        let logical_id = scope.add(queue);

        Ok(Queue {
            id: scope.construct_id().to_string(),
            logical_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::{Stack, StackProps};

    #[test]
    fn test_queue_with_visibility_timeout() {
        let mut stack = Stack::new("S", StackProps::default());
        let queue = stack
            .declare(
                "MyQueue",
                QueueProps {
                    visibility_timeout: Some(Duration::from_secs(300)),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(queue.logical_id, "MyQueueE6CA6235");
        let template = stack.synth().unwrap();
        let resource = template.resource(&queue.logical_id).unwrap();
        assert_eq!(resource["Properties"], json!({ "VisibilityTimeout": 300 }));
        assert_eq!(resource["DeletionPolicy"], json!("Delete"));
        assert_eq!(resource["UpdateReplacePolicy"], json!("Delete"));

        let declaration = stack.declaration("MyQueue").unwrap();
        assert_eq!(declaration.get_config::<u64>("visibilityTimeout"), Some(300));
    }

    #[test]
    fn test_queue_without_options_has_no_properties() {
        let mut stack = Stack::new("S", StackProps::default());
        let queue = stack.declare("Plain", QueueProps::default()).unwrap();
        let template = stack.synth().unwrap();
        assert!(template.properties(&queue.logical_id).is_none());
    }

    #[test]
    fn test_visibility_timeout_too_long() {
        let mut stack = Stack::new("S", StackProps::default());
        let result = stack.declare(
            "Slow",
            QueueProps {
                visibility_timeout: Some(Duration::from_secs(43_201)),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(StackError::InvalidConfig { .. })));
        assert!(stack.declarations().is_empty());
        assert!(stack.resources().is_empty());
    }
}
