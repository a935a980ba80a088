//! Managed pub/sub topic (`AWS::SNS::Topic`)

use crate::construct::{Construct, Scope};
use crate::error::Result;
use crate::resource::ResourceKind;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Default)]
pub struct TopicProps {
    pub topic_name: Option<String>,
    pub display_name: Option<String>,
}

/// Handle to a declared topic
#[derive(Debug, Clone)]
pub struct Topic {
    pub id: String,
    pub logical_id: String,
}

impl Construct for TopicProps {
    type Output = Topic;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Topic
    }

    fn config(&self) -> Map<String, Value> {
        let mut config = Map::new();
        if let Some(name) = &self.topic_name {
            config.insert("topicName".to_string(), json!(name));
        }
        if let Some(display_name) = &self.display_name {
            config.insert("displayName".to_string(), json!(display_name));
        }
        config
    }

    fn expand(&self, scope: &mut Scope<'_>) -> Result<Topic> {
        let topic = scope
            .resource(&["Resource"], ResourceKind::Topic.cfn_type())
            .optional_property("DisplayName", self.display_name.clone())
            .optional_property("Tags", scope.tags(None, &[]))
            .optional_property("TopicName", self.topic_name.clone());
        let logical_id = scope.add(topic);

        Ok(Topic {
            id: scope.construct_id().to_string(),
            logical_id,
        })
    }
}
