use serde::{Deserialize, Serialize};

/// Resource taxonomy: the node set of the deletion dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Vpc,
    Subnet,
    SecurityGroup,
    KeyPair,
    Role,
    InstanceProfile,
    Instance,
    Database,
    Bucket,
}

impl ResourceKind {
    /// Declaration order. Used as the deterministic tie-break when two kinds
    /// have no ordering constraint between them.
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Instance,
        ResourceKind::Database,
        ResourceKind::Bucket,
        ResourceKind::SecurityGroup,
        ResourceKind::Subnet,
        ResourceKind::KeyPair,
        ResourceKind::InstanceProfile,
        ResourceKind::Role,
        ResourceKind::Vpc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Vpc => "vpc",
            ResourceKind::Subnet => "subnet",
            ResourceKind::SecurityGroup => "security_group",
            ResourceKind::KeyPair => "key_pair",
            ResourceKind::Role => "role",
            ResourceKind::InstanceProfile => "instance_profile",
            ResourceKind::Instance => "instance",
            ResourceKind::Database => "database",
            ResourceKind::Bucket => "bucket",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Named position in a blueprint holding exactly one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    #[serde(rename = "network.vpc")]
    Vpc,
    #[serde(rename = "network.subnet")]
    Subnet,
    #[serde(rename = "network.security_group")]
    SecurityGroup,
    #[serde(rename = "security.key_pair")]
    KeyPair,
    #[serde(rename = "security.role")]
    Role,
    #[serde(rename = "security.instance_profile")]
    InstanceProfile,
    #[serde(rename = "compute.instance")]
    Instance,
    #[serde(rename = "data.database")]
    Database,
    #[serde(rename = "data.storage")]
    Bucket,
}

impl Slot {
    pub const ALL: [Slot; 9] = [
        Slot::Vpc,
        Slot::Subnet,
        Slot::SecurityGroup,
        Slot::KeyPair,
        Slot::Role,
        Slot::InstanceProfile,
        Slot::Instance,
        Slot::Database,
        Slot::Bucket,
    ];

    /// The resource kind occupying this slot.
    pub fn kind(self) -> ResourceKind {
        match self {
            Slot::Vpc => ResourceKind::Vpc,
            Slot::Subnet => ResourceKind::Subnet,
            Slot::SecurityGroup => ResourceKind::SecurityGroup,
            Slot::KeyPair => ResourceKind::KeyPair,
            Slot::Role => ResourceKind::Role,
            Slot::InstanceProfile => ResourceKind::InstanceProfile,
            Slot::Instance => ResourceKind::Instance,
            Slot::Database => ResourceKind::Database,
            Slot::Bucket => ResourceKind::Bucket,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Vpc => "network.vpc",
            Slot::Subnet => "network.subnet",
            Slot::SecurityGroup => "network.security_group",
            Slot::KeyPair => "security.key_pair",
            Slot::Role => "security.role",
            Slot::InstanceProfile => "security.instance_profile",
            Slot::Instance => "compute.instance",
            Slot::Database => "data.database",
            Slot::Bucket => "data.storage",
        }
    }

    /// The slot a given kind maps back to.
    pub fn for_kind(kind: ResourceKind) -> Slot {
        match kind {
            ResourceKind::Vpc => Slot::Vpc,
            ResourceKind::Subnet => Slot::Subnet,
            ResourceKind::SecurityGroup => Slot::SecurityGroup,
            ResourceKind::KeyPair => Slot::KeyPair,
            ResourceKind::Role => Slot::Role,
            ResourceKind::InstanceProfile => Slot::InstanceProfile,
            ResourceKind::Instance => Slot::Instance,
            ResourceKind::Database => Slot::Database,
            ResourceKind::Bucket => Slot::Bucket,
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Start/stop intent for instances and databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerAction {
    Start,
    Stop,
}

impl std::fmt::Display for PowerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PowerAction::Start => write!(f, "start"),
            PowerAction::Stop => write!(f, "stop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_kind_round_trip() {
        for slot in Slot::ALL {
            assert_eq!(Slot::for_kind(slot.kind()), slot);
        }
    }

    #[test]
    fn test_slot_serde_names() {
        let yaml = serde_yaml::to_string(&Slot::SecurityGroup).unwrap();
        assert_eq!(yaml.trim(), "network.security_group");
    }
}
