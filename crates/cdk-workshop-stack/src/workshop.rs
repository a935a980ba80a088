//! The workshop stack definition

use crate::error::Result;
use crate::instance::{InstanceClass, InstanceProps, InstanceSize, InstanceType, MachineImage};
use crate::queue::QueueProps;
use crate::secret::{SecretProps, SecretStringGenerator};
use crate::stack::{App, Stack, StackProps};
use crate::topic::TopicProps;
use crate::vpc::{SubnetConfiguration, SubnetType, VpcProps};
use serde_json::json;
use std::time::Duration;

pub const STACK_ID: &str = "CdkWorkshopStack";

/// Declare the workshop resources on a new stack
pub fn define(id: &str, props: StackProps) -> Result<Stack> {
    let mut stack = Stack::new(id, props);

    let vpc = stack.declare(
        "MyVpc",
        VpcProps {
            cidr: "10.30.0.0/16".to_string(),
            max_azs: Some(2),
            nat_gateways: Some(1),
            subnet_configuration: vec![SubnetConfiguration::new(
                "public-subnet",
                24,
                SubnetType::Public,
            )],
        },
    )?;

    stack.declare(
        "MyInstance",
        InstanceProps {
            vpc: &vpc,
            instance_type: InstanceType::of(InstanceClass::T2, InstanceSize::Micro),
            machine_image: MachineImage::AmazonLinux,
            vpc_subnets: SubnetType::Public,
        },
    )?;

    stack.declare(
        "MyQueue",
        QueueProps {
            visibility_timeout: Some(Duration::from_secs(300)),
            ..Default::default()
        },
    )?;

    stack.declare("MyTopic", TopicProps::default())?;

    stack.declare(
        "MetroDbSecrets",
        SecretProps {
            secret_name: Some("metrodb-secrets".to_string()),
            generate_secret_string: Some(SecretStringGenerator {
                secret_string_template: Some(json!({ "username": "blaycdk" }).to_string()),
                generate_string_key: Some("password".to_string()),
                password_length: Some(12),
                exclude_punctuation: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        },
    )?;

    Ok(stack)
}

/// The app: a single workshop stack
pub fn app(props: StackProps) -> Result<App> {
    let props = StackProps {
        stack_name: props.stack_name.or_else(|| Some(STACK_ID.to_string())),
        ..props
    };
    let mut app = App::new();
    app.add_stack(define(STACK_ID, props)?)?;
    Ok(app)
}
