//! Single virtual machine (`AWS::EC2::Instance`)
//!
//! An instance comes with its own security group (all outbound traffic
//! allowed), an IAM role assumable by EC2 and the instance profile wrapping
//! that role.

use crate::construct::{Construct, Scope};
use crate::error::{Result, StackError};
use crate::intrinsic::{base64, get_att, reference};
use crate::resource::ResourceKind;
use crate::template::Parameter;
use crate::vpc::{SubnetType, Vpc};
use serde_json::{Map, Value, json};

const AMAZON_LINUX_SSM_PARAMETER: &str =
    "/aws/service/ami-amazon-linux-latest/amzn-ami-hvm-x86_64-gp2";

/// Suffix shared by every SSM-backed parameter construct id
const SSM_PARAMETER_UUID: &str = "C96584B6-F00A-464E-AD19-53AFF4B05118";

const LINUX_USER_DATA: &str = "#!/bin/bash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceClass {
    T2,
    T3,
    T3a,
    M5,
    C5,
    R5,
}

impl InstanceClass {
    fn as_str(&self) -> &'static str {
        match self {
            InstanceClass::T2 => "t2",
            InstanceClass::T3 => "t3",
            InstanceClass::T3a => "t3a",
            InstanceClass::M5 => "m5",
            InstanceClass::C5 => "c5",
            InstanceClass::R5 => "r5",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceSize {
    Nano,
    Micro,
    Small,
    Medium,
    Large,
    Xlarge,
}

impl InstanceSize {
    fn as_str(&self) -> &'static str {
        match self {
            InstanceSize::Nano => "nano",
            InstanceSize::Micro => "micro",
            InstanceSize::Small => "small",
            InstanceSize::Medium => "medium",
            InstanceSize::Large => "large",
            InstanceSize::Xlarge => "xlarge",
        }
    }
}

/// Instance type such as `t2.micro`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceType(String);

impl InstanceType {
    pub fn of(class: InstanceClass, size: InstanceSize) -> Self {
        Self(format!("{}.{}", class.as_str(), size.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InstanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the instance's AMI comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineImage {
    /// Latest Amazon Linux AMI, resolved from SSM at deploy time
    AmazonLinux,
    /// Any AMI published under an SSM parameter
    SsmParameter(String),
    /// A fixed AMI id
    Generic(String),
}

impl MachineImage {
    fn describe(&self) -> String {
        match self {
            MachineImage::AmazonLinux => "amazon-linux".to_string(),
            MachineImage::SsmParameter(name) => format!("ssm:{}", name),
            MachineImage::Generic(ami) => ami.clone(),
        }
    }

    /// Image id value for the template, registering a parameter when needed
    fn image_id(&self, scope: &mut Scope<'_>) -> Value {
        let parameter_name = match self {
            MachineImage::AmazonLinux => AMAZON_LINUX_SSM_PARAMETER,
            MachineImage::SsmParameter(name) => name.as_str(),
            MachineImage::Generic(ami) => return json!(ami),
        };
        let construct_id = format!(
            "SsmParameterValue:{}:{}.Parameter",
            parameter_name.replace('/', "--"),
            SSM_PARAMETER_UUID
        );
        let logical_id = scope.add_parameter(
            &construct_id,
            Parameter::ssm("AWS::EC2::Image::Id", parameter_name),
        );
        reference(&logical_id)
    }
}

#[derive(Debug, Clone)]
pub struct InstanceProps<'a> {
    pub vpc: &'a Vpc,
    pub instance_type: InstanceType,
    pub machine_image: MachineImage,

    /// Subnet tier to launch into (the first subnet of that tier is used)
    pub vpc_subnets: SubnetType,
}

/// Handle to a declared instance
#[derive(Debug, Clone)]
pub struct Instance {
    pub id: String,
    pub logical_id: String,
    pub subnet_logical_id: String,
    pub security_group_logical_id: String,
    pub role_logical_id: String,
}

impl Construct for InstanceProps<'_> {
    type Output = Instance;

    fn kind(&self) -> ResourceKind {
        ResourceKind::ComputeInstance
    }

    fn config(&self) -> Map<String, Value> {
        let mut config = Map::new();
        config.insert("vpc".to_string(), json!(self.vpc.id));
        config.insert("instanceType".to_string(), json!(self.instance_type.as_str()));
        config.insert("machineImage".to_string(), json!(self.machine_image.describe()));
        config.insert(
            "vpcSubnets".to_string(),
            json!({ "subnetType": self.vpc_subnets.to_string() }),
        );
        config
    }

    fn references(&self) -> Vec<String> {
        vec![self.vpc.id.clone()]
    }

    fn expand(&self, scope: &mut Scope<'_>) -> Result<Instance> {
        let id = scope.construct_id().to_string();
        let subnet = self
            .vpc
            .select_subnets(self.vpc_subnets)
            .into_iter()
            .next()
            .ok_or_else(|| {
                StackError::invalid(
                    &id,
                    format!(
                        "network '{}' has no {} subnets",
                        self.vpc.id, self.vpc_subnets
                    ),
                )
            })?;
        let name_tag = scope.node_path(&[]);

        let security_group = scope
            .resource(
                &["InstanceSecurityGroup", "Resource"],
                "AWS::EC2::SecurityGroup",
            )
            .property(
                "GroupDescription",
                scope.node_path(&["InstanceSecurityGroup"]),
            )
            .property(
                "SecurityGroupEgress",
                json!([{
                    "CidrIp": "0.0.0.0/0",
                    "Description": "Allow all outbound traffic by default",
                    "IpProtocol": "-1"
                }]),
            )
            .optional_property("Tags", scope.tags(Some(name_tag.clone()), &[]))
            .property("VpcId", self.vpc.vpc_id());
        let security_group_id = scope.add(security_group);

        let role = scope
            .resource(&["InstanceRole", "Resource"], "AWS::IAM::Role")
            .property(
                "AssumeRolePolicyDocument",
                json!({
                    "Statement": [{
                        "Action": "sts:AssumeRole",
                        "Effect": "Allow",
                        "Principal": { "Service": "ec2.amazonaws.com" }
                    }],
                    "Version": "2012-10-17"
                }),
            )
            .optional_property("Tags", scope.tags(Some(name_tag.clone()), &[]));
        let role_id = scope.add(role);

        let profile = scope
            .resource(&["InstanceProfile"], "AWS::IAM::InstanceProfile")
            .property("Roles", json!([reference(&role_id)]));
        let profile_id = scope.add(profile);

        let image_id = self.machine_image.image_id(scope);

        let instance = scope
            .resource(&["Resource"], ResourceKind::ComputeInstance.cfn_type())
            .property("AvailabilityZone", subnet.availability_zone.clone())
            .property("IamInstanceProfile", reference(&profile_id))
            .property("ImageId", image_id)
            .property("InstanceType", self.instance_type.as_str())
            .property(
                "SecurityGroupIds",
                json!([get_att(&security_group_id, "GroupId")]),
            )
            .property("SubnetId", reference(&subnet.logical_id))
            .optional_property("Tags", scope.tags(Some(name_tag), &[]))
            .property("UserData", base64(LINUX_USER_DATA))
            .depends_on(role_id.clone());
        let logical_id = scope.add(instance);

        Ok(Instance {
            id,
            logical_id,
            subnet_logical_id: subnet.logical_id.clone(),
            security_group_logical_id: security_group_id,
            role_logical_id: role_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::{Stack, StackProps};
    use crate::vpc::{SubnetConfiguration, VpcProps};

    fn stack_with_vpc() -> (Stack, Vpc) {
        let mut stack = Stack::new("CdkWorkshopStack", StackProps::default());
        let vpc = stack
            .declare(
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
            )
            .unwrap();
        (stack, vpc)
    }

    fn micro(vpc: &Vpc, subnet_type: SubnetType) -> InstanceProps<'_> {
        InstanceProps {
            vpc,
            instance_type: InstanceType::of(InstanceClass::T2, InstanceSize::Micro),
            machine_image: MachineImage::AmazonLinux,
            vpc_subnets: subnet_type,
        }
    }

    #[test]
    fn test_instance_type() {
        assert_eq!(
            InstanceType::of(InstanceClass::T2, InstanceSize::Micro).as_str(),
            "t2.micro"
        );
        assert_eq!(
            InstanceType::of(InstanceClass::M5, InstanceSize::Xlarge).to_string(),
            "m5.xlarge"
        );
    }

    #[test]
    fn test_instance_in_public_subnet() {
        let (mut stack, vpc) = stack_with_vpc();
        let instance = stack
            .declare("MyInstance", micro(&vpc, SubnetType::Public))
            .unwrap();

        assert_eq!(instance.logical_id, "MyInstanceA12EC128");
        assert_eq!(instance.subnet_logical_id, vpc.public_subnets()[0].logical_id);

        let template = stack.synth().unwrap();
        let props = template.properties(&instance.logical_id).unwrap();
        assert_eq!(props["InstanceType"], json!("t2.micro"));
        assert_eq!(
            props["SubnetId"],
            json!({ "Ref": vpc.public_subnets()[0].logical_id })
        );
        assert_eq!(
            props["AvailabilityZone"],
            vpc.public_subnets()[0].availability_zone
        );
        assert_eq!(props["UserData"], json!({ "Fn::Base64": "#!/bin/bash" }));

        let resource = template.resource(&instance.logical_id).unwrap();
        assert_eq!(resource["DependsOn"], json!([instance.role_logical_id]));

        let sg = template
            .properties(&instance.security_group_logical_id)
            .unwrap();
        assert_eq!(sg["VpcId"], json!({ "Ref": vpc.logical_id }));
        assert_eq!(
            sg["GroupDescription"],
            json!("CdkWorkshopStack/MyInstance/InstanceSecurityGroup")
        );

        let declaration = stack.declaration("MyInstance").unwrap();
        assert_eq!(declaration.references, vec!["MyVpc"]);
    }

    #[test]
    fn test_amazon_linux_image_parameter() {
        let (mut stack, vpc) = stack_with_vpc();
        let instance = stack
            .declare("MyInstance", micro(&vpc, SubnetType::Public))
            .unwrap();
        let template = stack.synth().unwrap();

        let parameter_id = "SsmParameterValueawsserviceamiamazonlinuxlatestamznamihvmx8664gp2C96584B6F00A464EAD1953AFF4B05118Parameter";
        assert_eq!(
            template.parameters[parameter_id],
            json!({
                "Type": "AWS::SSM::Parameter::Value<AWS::EC2::Image::Id>",
                "Default": "/aws/service/ami-amazon-linux-latest/amzn-ami-hvm-x86_64-gp2"
            })
        );
        assert_eq!(
            template.properties(&instance.logical_id).unwrap()["ImageId"],
            json!({ "Ref": parameter_id })
        );
    }

    #[test]
    fn test_generic_image_has_no_parameter() {
        let (mut stack, vpc) = stack_with_vpc();
        let instance = stack
            .declare(
                "Vm",
                InstanceProps {
                    machine_image: MachineImage::Generic("ami-12345678".to_string()),
                    ..micro(&vpc, SubnetType::Public)
                },
            )
            .unwrap();
        let template = stack.synth().unwrap();
        assert_eq!(
            template.properties(&instance.logical_id).unwrap()["ImageId"],
            json!("ami-12345678")
        );
        assert_eq!(template.parameters.len(), 1);
    }

    #[test]
    fn test_missing_subnet_tier_rejected() {
        let (mut stack, vpc) = stack_with_vpc();
        let result = stack.declare("Vm", micro(&vpc, SubnetType::PrivateIsolated));
        assert!(matches!(result, Err(StackError::InvalidConfig { .. })));
        assert!(stack.declaration("Vm").is_none());
    }

    #[test]
    fn test_network_must_be_declared_first() {
        let (_, vpc) = stack_with_vpc();
        let mut other = Stack::new("Other", StackProps::default());
        let result = other.declare("Vm", micro(&vpc, SubnetType::Public));
        assert!(matches!(
            result,
            Err(StackError::UnknownReference { ref to, .. }) if to == "MyVpc"
        ));
    }
}
