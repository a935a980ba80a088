//! Isolated virtual network (`AWS::EC2::VPC` and its subnets)
//!
//! A network is laid out as one subnet per availability zone for every
//! subnet configuration. Subnet CIDR blocks are carved out of the network
//! block in declaration order: first configuration across all zones, then
//! the next one.
//!
//! Public subnets route to an internet gateway. The first `nat_gateways`
//! public subnets also host a NAT gateway, and private subnets with egress
//! route through those gateways round robin.

use crate::construct::{Construct, Scope};
use crate::error::{Result, StackError};
use crate::intrinsic::{get_att, reference, select_az};
use crate::resource::ResourceKind;
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::net::Ipv4Addr;

const DEFAULT_MAX_AZS: usize = 3;

/// Zones available to an environment-agnostic stack (`Fn::GetAZs`)
const AGNOSTIC_AZS: usize = 2;

const MIN_CIDR_MASK: u8 = 16;
const MAX_CIDR_MASK: u8 = 28;

const SUBNET_NAME_TAG: &str = "aws-cdk:subnet-name";
const SUBNET_TYPE_TAG: &str = "aws-cdk:subnet-type";

/// Subnet tier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubnetType {
    /// Routed to the internet gateway
    Public,
    /// Outbound traffic through a NAT gateway
    PrivateWithEgress,
    /// No route out of the network
    PrivateIsolated,
}

impl SubnetType {
    fn tag_value(&self) -> &'static str {
        match self {
            SubnetType::Public => "Public",
            SubnetType::PrivateWithEgress => "Private",
            SubnetType::PrivateIsolated => "Isolated",
        }
    }

    fn config_value(&self) -> &'static str {
        match self {
            SubnetType::Public => "PUBLIC",
            SubnetType::PrivateWithEgress => "PRIVATE_WITH_EGRESS",
            SubnetType::PrivateIsolated => "PRIVATE_ISOLATED",
        }
    }
}

impl std::fmt::Display for SubnetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag_value())
    }
}

/// One subnet tier, repeated in every availability zone
#[derive(Debug, Clone)]
pub struct SubnetConfiguration {
    pub name: String,
    pub cidr_mask: u8,
    pub subnet_type: SubnetType,
}

impl SubnetConfiguration {
    pub fn new(name: impl Into<String>, cidr_mask: u8, subnet_type: SubnetType) -> Self {
        Self {
            name: name.into(),
            cidr_mask,
            subnet_type,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VpcProps {
    /// Network address block, e.g. `10.0.0.0/16`
    pub cidr: String,

    /// Upper bound on the availability zones used
    pub max_azs: Option<usize>,

    /// NAT gateways to create (defaults to one per zone when private
    /// subnets with egress exist, otherwise none)
    pub nat_gateways: Option<usize>,

    pub subnet_configuration: Vec<SubnetConfiguration>,
}

impl Default for VpcProps {
    fn default() -> Self {
        Self {
            cidr: "10.0.0.0/16".to_string(),
            max_azs: None,
            nat_gateways: None,
            subnet_configuration: vec![
                SubnetConfiguration::new("Public", 24, SubnetType::Public),
                SubnetConfiguration::new("Private", 24, SubnetType::PrivateWithEgress),
            ],
        }
    }
}

/// A subnet created for one configuration in one zone
#[derive(Debug, Clone)]
pub struct Subnet {
    /// Name of the subnet configuration
    pub name: String,
    pub subnet_type: SubnetType,
    pub logical_id: String,
    pub route_table_logical_id: String,
    pub availability_zone: Value,
    pub cidr_block: String,
}

/// Handle to a declared network
#[derive(Debug, Clone)]
pub struct Vpc {
    pub id: String,
    pub logical_id: String,
    pub cidr: String,
    pub availability_zones: Vec<Value>,
    pub subnets: Vec<Subnet>,
    pub internet_gateway_logical_id: Option<String>,
    pub nat_gateway_logical_ids: Vec<String>,
}

impl Vpc {
    /// Subnets of the given type, in zone order
    pub fn select_subnets(&self, subnet_type: SubnetType) -> Vec<&Subnet> {
        self.subnets
            .iter()
            .filter(|s| s.subnet_type == subnet_type)
            .collect()
    }

    pub fn public_subnets(&self) -> Vec<&Subnet> {
        self.select_subnets(SubnetType::Public)
    }

    /// `Ref` to the VPC id
    pub fn vpc_id(&self) -> Value {
        reference(&self.logical_id)
    }
}

/// Parse `a.b.c.d/n` into the network address and prefix length
fn parse_cidr(cidr: &str) -> Option<(u32, u8)> {
    let (addr, prefix) = cidr.split_once('/')?;
    let addr: Ipv4Addr = addr.parse().ok()?;
    let prefix: u8 = prefix.parse().ok()?;
    if prefix > 32 {
        return None;
    }
    Some((u32::from(addr), prefix))
}

fn block_size(prefix: u8) -> u64 {
    1u64 << (32 - u32::from(prefix))
}

/// Sequential allocator of subnet blocks inside the network block
struct CidrAllocator {
    next: u64,
    end: u64,
}

impl CidrAllocator {
    fn new(network: u32, prefix: u8) -> Self {
        let start = u64::from(network);
        Self {
            next: start,
            end: start + block_size(prefix),
        }
    }

    fn allocate(&mut self, mask: u8) -> Option<String> {
        let size = block_size(mask);
        let start = self.next.div_ceil(size) * size;
        if start + size > self.end {
            return None;
        }
        self.next = start + size;
        let addr = Ipv4Addr::from(u32::try_from(start).ok()?);
        Some(format!("{}/{}", addr, mask))
    }
}

impl VpcProps {
    fn validate(&self, id: &str) -> Result<(u32, u8)> {
        let (network, prefix) = parse_cidr(&self.cidr)
            .ok_or_else(|| StackError::invalid(id, format!("invalid CIDR '{}'", self.cidr)))?;
        if !(MIN_CIDR_MASK..=MAX_CIDR_MASK).contains(&prefix) {
            return Err(StackError::invalid(
                id,
                format!(
                    "network prefix must be between /{} and /{}, got /{}",
                    MIN_CIDR_MASK, MAX_CIDR_MASK, prefix
                ),
            ));
        }
        if u64::from(network) % block_size(prefix) != 0 {
            return Err(StackError::invalid(
                id,
                format!("'{}' is not a network address", self.cidr),
            ));
        }

        if self.subnet_configuration.is_empty() {
            return Err(StackError::invalid(
                id,
                "at least one subnet configuration is required",
            ));
        }

        let mut names = HashSet::new();
        for subnet in &self.subnet_configuration {
            if !names.insert(subnet.name.as_str()) {
                return Err(StackError::invalid(
                    id,
                    format!("subnet configuration name '{}' is used twice", subnet.name),
                ));
            }
            let mask_ok = (MIN_CIDR_MASK..=MAX_CIDR_MASK).contains(&subnet.cidr_mask)
                && subnet.cidr_mask >= prefix;
            if !mask_ok {
                return Err(StackError::invalid(
                    id,
                    format!(
                        "subnet '{}' mask /{} must be between /{} and /{}",
                        subnet.name,
                        subnet.cidr_mask,
                        prefix.max(MIN_CIDR_MASK),
                        MAX_CIDR_MASK
                    ),
                ));
            }
        }

        if self.max_azs == Some(0) {
            return Err(StackError::invalid(id, "max_azs must be at least 1"));
        }

        Ok((network, prefix))
    }

    fn has_subnet_type(&self, subnet_type: SubnetType) -> bool {
        self.subnet_configuration
            .iter()
            .any(|s| s.subnet_type == subnet_type)
    }

    fn nat_gateway_count(&self, id: &str, az_count: usize) -> Result<usize> {
        let has_private = self.has_subnet_type(SubnetType::PrivateWithEgress);
        let count = match self.nat_gateways {
            Some(requested) => requested.min(az_count),
            None if has_private => az_count,
            None => 0,
        };

        if count == 0 && has_private {
            return Err(StackError::invalid(
                id,
                "private subnets with egress need at least one NAT gateway",
            ));
        }
        if count > 0 && !self.has_subnet_type(SubnetType::Public) {
            return Err(StackError::invalid(
                id,
                "NAT gateways need a public subnet to live in",
            ));
        }
        Ok(count)
    }

    fn availability_zones(&self, region: Option<&str>) -> Vec<Value> {
        let wanted = self.max_azs.unwrap_or(DEFAULT_MAX_AZS);
        match region {
            Some(region) => ['a', 'b', 'c']
                .iter()
                .take(wanted)
                .map(|zone| json!(format!("{}{}", region, zone)))
                .collect(),
            None => (0..wanted.min(AGNOSTIC_AZS)).map(select_az).collect(),
        }
    }
}

impl Construct for VpcProps {
    type Output = Vpc;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Network
    }

    fn config(&self) -> Map<String, Value> {
        let mut config = Map::new();
        config.insert("cidr".to_string(), json!(self.cidr));
        if let Some(max_azs) = self.max_azs {
            config.insert("maxAzs".to_string(), json!(max_azs));
        }
        if let Some(nat_gateways) = self.nat_gateways {
            config.insert("natGateways".to_string(), json!(nat_gateways));
        }
        let subnets: Vec<Value> = self
            .subnet_configuration
            .iter()
            .map(|s| {
                json!({
                    "cidrMask": s.cidr_mask,
                    "name": s.name,
                    "subnetType": s.subnet_type.config_value(),
                })
            })
            .collect();
        config.insert("subnetConfiguration".to_string(), json!(subnets));
        config
    }

    fn expand(&self, scope: &mut Scope<'_>) -> Result<Vpc> {
        let id = scope.construct_id().to_string();
        let (network, prefix) = self.validate(&id)?;
        let zones = self.availability_zones(scope.region());
        let nat_count = self.nat_gateway_count(&id, zones.len())?;
        let name_tag = scope.node_path(&[]);

        let vpc = scope
            .resource(&["Resource"], "AWS::EC2::VPC")
            .property("CidrBlock", self.cidr.as_str())
            .property("EnableDnsHostnames", true)
            .property("EnableDnsSupport", true)
            .property("InstanceTenancy", "default")
            .optional_property("Tags", scope.tags(Some(name_tag.clone()), &[]));
        let vpc_id = scope.add(vpc);

        // Subnets and route tables
        let mut allocator = CidrAllocator::new(network, prefix);
        let mut subnets = Vec::new();
        let mut association_ids = Vec::new();
        for config in &self.subnet_configuration {
            for (index, zone) in zones.iter().enumerate() {
                let construct = format!("{}Subnet{}", config.name, index + 1);
                let cidr_block = allocator.allocate(config.cidr_mask).ok_or_else(|| {
                    StackError::invalid(
                        &id,
                        format!(
                            "not enough address space in {} for subnet '{}'",
                            self.cidr, construct
                        ),
                    )
                })?;
                let subnet_name = scope.node_path(&[construct.as_str()]);

                let subnet = scope
                    .resource(&[construct.as_str(), "Subnet"], "AWS::EC2::Subnet")
                    .property("AvailabilityZone", zone.clone())
                    .property("CidrBlock", cidr_block.as_str())
                    .property(
                        "MapPublicIpOnLaunch",
                        config.subnet_type == SubnetType::Public,
                    )
                    .optional_property(
                        "Tags",
                        scope.tags(
                            Some(subnet_name.clone()),
                            &[
                                (SUBNET_NAME_TAG, config.name.as_str()),
                                (SUBNET_TYPE_TAG, config.subnet_type.tag_value()),
                            ],
                        ),
                    )
                    .property("VpcId", reference(&vpc_id));
                let subnet_id = scope.add(subnet);

                let route_table = scope
                    .resource(&[construct.as_str(), "RouteTable"], "AWS::EC2::RouteTable")
                    .optional_property("Tags", scope.tags(Some(subnet_name), &[]))
                    .property("VpcId", reference(&vpc_id));
                let route_table_id = scope.add(route_table);

                let association = scope
                    .resource(
                        &[construct.as_str(), "RouteTableAssociation"],
                        "AWS::EC2::SubnetRouteTableAssociation",
                    )
                    .property("RouteTableId", reference(&route_table_id))
                    .property("SubnetId", reference(&subnet_id));
                association_ids.push(scope.add(association));

                subnets.push(Subnet {
                    name: config.name.clone(),
                    subnet_type: config.subnet_type,
                    logical_id: subnet_id,
                    route_table_logical_id: route_table_id,
                    availability_zone: zone.clone(),
                    cidr_block,
                });
            }
        }

        // Internet gateway and public routes
        let mut internet_gateway_id = None;
        let mut nat_gateway_ids = Vec::new();
        let mut nat_by_zone: Vec<(Value, String)> = Vec::new();
        if self.has_subnet_type(SubnetType::Public) {
            let igw = scope
                .resource(&["IGW"], "AWS::EC2::InternetGateway")
                .optional_property("Tags", scope.tags(Some(name_tag.clone()), &[]));
            let igw_id = scope.add(igw);

            let attachment = scope
                .resource(&["VPCGW"], "AWS::EC2::VPCGatewayAttachment")
                .property("InternetGatewayId", reference(&igw_id))
                .property("VpcId", reference(&vpc_id));
            let attachment_id = scope.add(attachment);

            let public = subnets
                .iter()
                .enumerate()
                .filter(|(_, s)| s.subnet_type == SubnetType::Public);

            for (position, (index, subnet)) in public.enumerate() {
                let construct = subnet_construct_id(subnet, &subnets);

                let route = scope
                    .resource(&[construct.as_str(), "DefaultRoute"], "AWS::EC2::Route")
                    .property("DestinationCidrBlock", "0.0.0.0/0")
                    .property("GatewayId", reference(&igw_id))
                    .property("RouteTableId", reference(&subnet.route_table_logical_id))
                    .depends_on(attachment_id.clone());
                let route_id = scope.add(route);

                if position < nat_count {
                    let subnet_name = scope.node_path(&[construct.as_str()]);
                    let eip = scope
                        .resource(&[construct.as_str(), "EIP"], "AWS::EC2::EIP")
                        .property("Domain", "vpc")
                        .optional_property("Tags", scope.tags(Some(subnet_name.clone()), &[]));
                    let eip_id = scope.add(eip);

                    let nat = scope
                        .resource(&[construct.as_str(), "NATGateway"], "AWS::EC2::NatGateway")
                        .property("AllocationId", get_att(&eip_id, "AllocationId"))
                        .property("SubnetId", reference(&subnet.logical_id))
                        .optional_property("Tags", scope.tags(Some(subnet_name), &[]))
                        .depends_on(route_id)
                        .depends_on(association_ids[index].clone());
                    let nat_id = scope.add(nat);
                    nat_by_zone.push((subnet.availability_zone.clone(), nat_id.clone()));
                    nat_gateway_ids.push(nat_id);
                }
            }
            internet_gateway_id = Some(igw_id);
        }

        // Private subnets with egress use the NAT gateway in their own zone,
        // falling back to round robin for zones without one
        let mut fallback = 0;
        let private = subnets
            .iter()
            .filter(|s| s.subnet_type == SubnetType::PrivateWithEgress);
        for subnet in private {
            if nat_gateway_ids.is_empty() {
                break;
            }
            let construct = subnet_construct_id(subnet, &subnets);
            let nat_id = match nat_by_zone
                .iter()
                .find(|(zone, _)| *zone == subnet.availability_zone)
            {
                Some((_, nat_id)) => nat_id,
                None => {
                    let nat_id = &nat_gateway_ids[fallback % nat_gateway_ids.len()];
                    fallback += 1;
                    nat_id
                }
            };
            let route = scope
                .resource(&[construct.as_str(), "DefaultRoute"], "AWS::EC2::Route")
                .property("DestinationCidrBlock", "0.0.0.0/0")
                .property("NatGatewayId", reference(nat_id))
                .property("RouteTableId", reference(&subnet.route_table_logical_id));
            scope.add(route);
        }

        tracing::debug!(
            "{}: {} subnets across {} zones, {} NAT gateways",
            id,
            subnets.len(),
            zones.len(),
            nat_gateway_ids.len()
        );

        Ok(Vpc {
            id,
            logical_id: vpc_id,
            cidr: self.cidr.clone(),
            availability_zones: zones,
            subnets,
            internet_gateway_logical_id: internet_gateway_id,
            nat_gateway_logical_ids: nat_gateway_ids,
        })
    }
}

/// Construct id of a subnet: configuration name plus 1-based zone index
fn subnet_construct_id(subnet: &Subnet, all: &[Subnet]) -> String {
    let index = all
        .iter()
        .filter(|s| s.name == subnet.name)
        .position(|s| s.logical_id == subnet.logical_id)
        .unwrap_or(0);
    format!("{}Subnet{}", subnet.name, index + 1)
}
