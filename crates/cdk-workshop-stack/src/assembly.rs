//! Cloud assembly output
//!
//! Writes synthesized templates into the output directory (`cdk.out` by
//! default) together with the `manifest.json` that tells the provisioning
//! engine which stacks the assembly contains.

use crate::error::{Result, StackError};
use crate::stack::Stack;
use crate::template::Template;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const DEFAULT_OUTPUT_DIR: &str = "cdk.out";
pub const ASSEMBLY_VERSION: &str = "36.0.0";
const MANIFEST_FILE: &str = "manifest.json";
const VERSION_FILE: &str = "cdk.out";
const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";

/// `manifest.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub artifacts: BTreeMap<String, Artifact>,
}

/// One stack in the assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub environment: String,
    pub properties: ArtifactProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactProperties {
    pub template_file: String,
    pub stack_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_protection: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VersionMarker {
    version: String,
}

/// Reader/writer for an assembly directory
pub struct Assembly {
    out_dir: PathBuf,
}

impl Assembly {
    pub fn new(out_dir: impl AsRef<Path>) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn template_file(stack_id: &str) -> String {
        format!("{}.template.json", stack_id)
    }

    /// Path of a stack's template inside the assembly
    pub fn template_path(&self, stack_id: &str) -> PathBuf {
        self.out_dir.join(Self::template_file(stack_id))
    }

    fn manifest_path(&self) -> PathBuf {
        self.out_dir.join(MANIFEST_FILE)
    }

    async fn ensure_out_dir(&self) -> Result<()> {
        if !self.out_dir.exists() {
            fs::create_dir_all(&self.out_dir).await?;
            tracing::debug!("Created output directory: {}", self.out_dir.display());
        }
        Ok(())
    }

    /// Write templates and manifest for the given stacks
    pub async fn write(&self, stacks: &[(&Stack, &Template)]) -> Result<Manifest> {
        self.ensure_out_dir().await?;

        let mut artifacts = BTreeMap::new();
        for (stack, template) in stacks {
            let path = self.template_path(stack.id());
            fs::write(&path, template.to_json_pretty()?).await?;
            tracing::debug!("Wrote template: {}", path.display());

            let termination_protection = stack.props().termination_protection.then_some(true);
            artifacts.insert(
                stack.id().to_string(),
                Artifact {
                    artifact_type: STACK_ARTIFACT_TYPE.to_string(),
                    environment: stack.environment().name(),
                    properties: ArtifactProperties {
                        template_file: Self::template_file(stack.id()),
                        stack_name: stack.stack_name().to_string(),
                        termination_protection,
                    },
                },
            );
        }

        let manifest = Manifest {
            version: ASSEMBLY_VERSION.to_string(),
            artifacts,
        };
        fs::write(self.manifest_path(), serde_json::to_string_pretty(&manifest)?).await?;

        let marker = VersionMarker {
            version: ASSEMBLY_VERSION.to_string(),
        };
        fs::write(
            self.out_dir.join(VERSION_FILE),
            serde_json::to_string(&marker)?,
        )
        .await?;

        tracing::debug!(
            "Wrote assembly with {} stacks to {}",
            manifest.artifacts.len(),
            self.out_dir.display()
        );
        Ok(manifest)
    }

    /// Load the manifest, if an assembly has been written
    pub async fn load_manifest(&self) -> Result<Option<Manifest>> {
        let path = self.manifest_path();
        if !path.exists() {
            tracing::debug!("Manifest not found at {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let manifest: Manifest = serde_json::from_str(&content)?;

        // Version check
        if major_version(&manifest.version) > major_version(ASSEMBLY_VERSION) {
            return Err(StackError::AssemblyError(format!(
                "Assembly version {} is newer than supported version {}",
                manifest.version, ASSEMBLY_VERSION
            )));
        }

        Ok(Some(manifest))
    }

    /// Load a previously written template
    pub async fn load_template(&self, stack_id: &str) -> Result<Option<Template>> {
        let path = self.template_path(stack_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).await?;
        Ok(Some(Template::from_json(&content)?))
    }
}

fn major_version(version: &str) -> u64 {
    version
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::{Environment, StackProps};
    use crate::topic::TopicProps;
    use tempfile::tempdir;

    fn topic_stack(props: StackProps) -> Stack {
        let mut stack = Stack::new("Events", props);
        stack.declare("MyTopic", TopicProps::default()).unwrap();
        stack
    }

    #[tokio::test]
    async fn test_write_and_load() {
        let temp_dir = tempdir().unwrap();
        let assembly = Assembly::new(temp_dir.path().join("cdk.out"));
        let stack = topic_stack(StackProps::default());
        let template = stack.synth().unwrap();

        let manifest = assembly.write(&[(&stack, &template)]).await.unwrap();
        assert_eq!(manifest.version, ASSEMBLY_VERSION);
        assert!(assembly.template_path("Events").exists());
        assert!(assembly.out_dir().join("cdk.out").exists());

        let loaded = assembly.load_template("Events").await.unwrap().unwrap();
        assert_eq!(loaded, template);

        let manifest = assembly.load_manifest().await.unwrap().unwrap();
        let artifact = &manifest.artifacts["Events"];
        assert_eq!(artifact.artifact_type, "aws:cloudformation:stack");
        assert_eq!(artifact.environment, "aws://unknown-account/unknown-region");
        assert_eq!(artifact.properties.template_file, "Events.template.json");
        assert_eq!(artifact.properties.stack_name, "Events");
        assert_eq!(artifact.properties.termination_protection, None);
    }

    #[tokio::test]
    async fn test_manifest_carries_stack_props() {
        let temp_dir = tempdir().unwrap();
        let assembly = Assembly::new(temp_dir.path());
        let stack = topic_stack(StackProps {
            stack_name: Some("events-prod".to_string()),
            env: Some(Environment::new(
                Some("123456789012".to_string()),
                Some("ap-northeast-1".to_string()),
            )),
            termination_protection: true,
            ..Default::default()
        });
        let template = stack.synth().unwrap();

        let manifest = assembly.write(&[(&stack, &template)]).await.unwrap();
        let artifact = &manifest.artifacts["Events"];
        assert_eq!(artifact.environment, "aws://123456789012/ap-northeast-1");
        assert_eq!(artifact.properties.stack_name, "events-prod");
        assert_eq!(artifact.properties.termination_protection, Some(true));
    }

    #[tokio::test]
    async fn test_empty_assembly() {
        let temp_dir = tempdir().unwrap();
        let assembly = Assembly::new(temp_dir.path());

        assert!(assembly.load_manifest().await.unwrap().is_none());
        assert!(assembly.load_template("Missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_newer_assembly_rejected() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join("manifest.json"),
            r#"{ "version": "99.0.0", "artifacts": {} }"#,
        )
        .unwrap();

        let assembly = Assembly::new(temp_dir.path());
        let result = assembly.load_manifest().await;
        assert!(matches!(result, Err(StackError::AssemblyError(_))));
    }
}
