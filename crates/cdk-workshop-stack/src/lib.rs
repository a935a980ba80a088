//! CDK Workshop stack
//!
//! Typed declarations of the workshop's cloud resources and their synthesis
//! into a CloudFormation template. Provisioning is left to the external
//! engine that consumes the template.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              cdk-workshop CLI                    │
//! │          (synth / diff / list / validate)        │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │             cdk-workshop-stack                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   Stack ── declare(id, impl Construct)    │   │
//! │  │   vpc · instance · queue · topic · secret │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │    synth     │  │     diff     │            │
//! │  │  (Template)  │  │   (Plan)     │            │
//! │  └──────┬───────┘  └──────────────┘            │
//! └─────────┼───────────────────────────────────────┘
//!           │
//! ┌─────────▼───────┐
//! │    cdk.out      │ ──▶ provisioning engine
//! └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use cdk_workshop_stack::{StackProps, workshop};
//!
//! let stack = workshop::define("CdkWorkshopStack", StackProps::default()).unwrap();
//! let template = stack.synth().unwrap();
//! assert_eq!(template.resources_of_type("AWS::SNS::Topic").len(), 1);
//! ```

pub mod assembly;
pub mod construct;
pub mod diff;
pub mod error;
pub mod id;
pub mod instance;
pub mod intrinsic;
pub mod queue;
pub mod resource;
pub mod secret;
pub mod stack;
pub mod template;
pub mod topic;
pub mod vpc;
pub mod workshop;

// Re-exports
pub use assembly::{Artifact, Assembly, DEFAULT_OUTPUT_DIR, Manifest};
pub use construct::{Construct, Scope};
pub use diff::{Action, ActionType, Plan, PlanSummary, diff_templates};
pub use error::{Result, StackError};
pub use id::{ConstructPath, logical_id};
pub use instance::{
    Instance, InstanceClass, InstanceProps, InstanceSize, InstanceType, MachineImage,
};
pub use queue::{Queue, QueueProps};
pub use resource::{CfnResource, Declaration, RemovalPolicy, ResourceKind};
pub use secret::{Secret, SecretProps, SecretStringGenerator};
pub use stack::{App, Environment, Stack, StackProps};
pub use template::{Parameter, Template};
pub use topic::{Topic, TopicProps};
pub use vpc::{Subnet, SubnetConfiguration, SubnetType, Vpc, VpcProps};
