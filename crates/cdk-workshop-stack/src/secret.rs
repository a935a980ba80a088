//! Managed secret with a generated credential (`AWS::SecretsManager::Secret`)

use crate::construct::{Construct, Scope};
use crate::error::{Result, StackError};
use crate::resource::{RemovalPolicy, ResourceKind};
use serde_json::{Map, Value, json};

const MAX_PASSWORD_LENGTH: u32 = 4096;

/// How Secrets Manager generates the secret value
#[derive(Debug, Clone, Default)]
pub struct SecretStringGenerator {
    /// JSON object the generated field is merged into
    pub secret_string_template: Option<String>,

    /// Key of the generated field inside the template
    pub generate_string_key: Option<String>,

    pub password_length: Option<u32>,

    pub exclude_punctuation: Option<bool>,

    pub exclude_characters: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SecretProps {
    pub secret_name: Option<String>,
    pub description: Option<String>,
    pub generate_secret_string: Option<SecretStringGenerator>,
}

/// Handle to a declared secret
#[derive(Debug, Clone)]
pub struct Secret {
    pub id: String,
    pub logical_id: String,
}

impl SecretStringGenerator {
    fn validate(&self, id: &str) -> Result<()> {
        match (&self.secret_string_template, &self.generate_string_key) {
            (Some(template), Some(key)) => {
                let parsed: Value = serde_json::from_str(template).map_err(|e| {
                    StackError::invalid(id, format!("secret string template is not JSON: {}", e))
                })?;
                let object = parsed.as_object().ok_or_else(|| {
                    StackError::invalid(id, "secret string template must be a JSON object")
                })?;
                if object.contains_key(key) {
                    return Err(StackError::invalid(
                        id,
                        format!("secret string template already contains '{}'", key),
                    ));
                }
            }
            (None, None) => {}
            _ => {
                return Err(StackError::invalid(
                    id,
                    "secret string template and generate string key must be set together",
                ));
            }
        }

        if let Some(length) = self.password_length {
            if length == 0 || length > MAX_PASSWORD_LENGTH {
                return Err(StackError::invalid(
                    id,
                    format!(
                        "password length must be between 1 and {}, got {}",
                        MAX_PASSWORD_LENGTH, length
                    ),
                ));
            }
        }
        Ok(())
    }

    fn config(&self) -> Value {
        let mut config = Map::new();
        if let Some(template) = &self.secret_string_template {
            config.insert("secretStringTemplate".to_string(), json!(template));
        }
        if let Some(key) = &self.generate_string_key {
            config.insert("generateStringKey".to_string(), json!(key));
        }
        if let Some(length) = self.password_length {
            config.insert("passwordLength".to_string(), json!(length));
        }
        if let Some(exclude) = self.exclude_punctuation {
            config.insert("excludePunctuation".to_string(), json!(exclude));
        }
        if let Some(chars) = &self.exclude_characters {
            config.insert("excludeCharacters".to_string(), json!(chars));
        }
        Value::Object(config)
    }

    fn to_template(&self) -> Value {
        let mut body = Map::new();
        if let Some(chars) = &self.exclude_characters {
            body.insert("ExcludeCharacters".to_string(), json!(chars));
        }
        if let Some(exclude) = self.exclude_punctuation {
            body.insert("ExcludePunctuation".to_string(), json!(exclude));
        }
        if let Some(key) = &self.generate_string_key {
            body.insert("GenerateStringKey".to_string(), json!(key));
        }
        if let Some(length) = self.password_length {
            body.insert("PasswordLength".to_string(), json!(length));
        }
        if let Some(template) = &self.secret_string_template {
            body.insert("SecretStringTemplate".to_string(), json!(template));
        }
        Value::Object(body)
    }
}

impl Construct for SecretProps {
    type Output = Secret;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Secret
    }

    fn config(&self) -> Map<String, Value> {
        let mut config = Map::new();
        if let Some(name) = &self.secret_name {
            config.insert("secretName".to_string(), json!(name));
        }
        if let Some(description) = &self.description {
            config.insert("description".to_string(), json!(description));
        }
        if let Some(generator) = &self.generate_secret_string {
            config.insert("generateSecretString".to_string(), generator.config());
        }
        config
    }

    fn expand(&self, scope: &mut Scope<'_>) -> Result<Secret> {
        // Secrets Manager generates a value even when no generator is given
        let generator = self.generate_secret_string.clone().unwrap_or_default();
        generator.validate(scope.construct_id())?;

        let secret = scope
            .resource(&["Resource"], ResourceKind::Secret.cfn_type())
            .optional_property("Description", self.description.clone())
            .property("GenerateSecretString", generator.to_template())
            .optional_property("Name", self.secret_name.clone())
            .optional_property("Tags", scope.tags(None, &[]))
            .with_removal_policy(RemovalPolicy::Delete);
        let logical_id = scope.add(secret);

        Ok(Secret {
            id: scope.construct_id().to_string(),
            logical_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::{Stack, StackProps};

    fn generator(template: Option<&str>, key: Option<&str>) -> SecretStringGenerator {
        SecretStringGenerator {
            secret_string_template: template.map(|s| s.to_string()),
            generate_string_key: key.map(|s| s.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_secret_with_generated_password() {
        let mut stack = Stack::new("S", StackProps::default());
        let secret = stack
            .declare(
                "DbSecret",
                SecretProps {
                    secret_name: Some("db-secret".to_string()),
                    generate_secret_string: Some(SecretStringGenerator {
                        password_length: Some(16),
                        exclude_punctuation: Some(true),
                        ..generator(Some(r#"{"username":"admin"}"#), Some("password"))
                    }),
                    ..Default::default()
                },
            )
            .unwrap();

        let template = stack.synth().unwrap();
        let props = template.properties(&secret.logical_id).unwrap();
        assert_eq!(props["Name"], json!("db-secret"));
        assert_eq!(
            props["GenerateSecretString"],
            json!({
                "ExcludePunctuation": true,
                "GenerateStringKey": "password",
                "PasswordLength": 16,
                "SecretStringTemplate": "{\"username\":\"admin\"}"
            })
        );
    }

    #[test]
    fn test_secret_without_generator() {
        let mut stack = Stack::new("S", StackProps::default());
        let secret = stack.declare("Plain", SecretProps::default()).unwrap();
        let template = stack.synth().unwrap();
        let props = template.properties(&secret.logical_id).unwrap();
        assert_eq!(props["GenerateSecretString"], json!({}));
    }

    #[test]
    fn test_template_and_key_must_be_paired() {
        assert!(generator(Some("{}"), None).validate("s").is_err());
        assert!(generator(None, Some("password")).validate("s").is_err());
        assert!(generator(None, None).validate("s").is_ok());
    }

    #[test]
    fn test_template_must_be_object_without_key() {
        assert!(generator(Some("[1, 2]"), Some("password")).validate("s").is_err());
        assert!(generator(Some("not json"), Some("password")).validate("s").is_err());
        assert!(
            generator(Some(r#"{"password":"x"}"#), Some("password"))
                .validate("s")
                .is_err()
        );
        assert!(
            generator(Some(r#"{"username":"x"}"#), Some("password"))
                .validate("s")
                .is_ok()
        );
    }

    #[test]
    fn test_password_length_bounds() {
        let mut g = generator(None, None);
        g.password_length = Some(0);
        assert!(g.validate("s").is_err());
        g.password_length = Some(4097);
        assert!(g.validate("s").is_err());
        g.password_length = Some(12);
        assert!(g.validate("s").is_ok());
    }
}
