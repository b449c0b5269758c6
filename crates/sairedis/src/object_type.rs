//! SAI object type taxonomy.
//!
//! Every object type falls into exactly one of two styles:
//!
//! - **oid-style**: identified by an opaque 64-bit handle allocated at
//!   create time (ports, virtual routers, next hops, ...).
//! - **entry-style**: identified by a composite value key (routes,
//!   neighbors, FDB entries, the DASH entry tables, ...). Entry-style
//!   objects never receive an allocated id.

use serde::{Deserialize, Serialize};

/// SAI object types handled by the synchronization core.
///
/// The set of entry-style types is closed: extending it means adding a
/// variant here plus one key variant in the view model, not changing
/// any dispatch or reconciliation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum ObjectType {
    // oid-style
    Switch = 1,
    Port = 2,
    VirtualRouter = 3,
    RouterInterface = 4,
    NextHop = 5,
    NextHopGroup = 6,
    NextHopGroupMember = 7,
    AclTable = 8,
    AclEntry = 9,
    Vlan = 10,
    VlanMember = 11,
    Lag = 12,
    LagMember = 13,
    Tunnel = 14,
    HostifTrapGroup = 15,
    HostifTrap = 16,
    BufferPool = 17,
    Queue = 18,
    Scheduler = 19,
    StpInstance = 20,
    // DASH oid-style
    Eni = 21,
    Vnet = 22,
    HaSet = 23,

    // entry-style
    RouteEntry = 100,
    NeighborEntry = 101,
    FdbEntry = 102,
    InsegEntry = 103,
    MySidEntry = 104,
    // DASH entry-style
    DirectionLookupEntry = 110,
    EniEtherAddressMapEntry = 111,
    VipEntry = 112,
    InboundRoutingEntry = 113,
    PaValidationEntry = 114,
    OutboundRoutingEntry = 115,
    OutboundCaToPaEntry = 116,
}

impl ObjectType {
    /// Returns true if this type is identified by a composite key
    /// rather than an allocated object id.
    pub const fn is_entry(self) -> bool {
        (self as u16) >= 100
    }

    /// Returns the SAI-style type name, for logging.
    pub const fn name(self) -> &'static str {
        match self {
            ObjectType::Switch => "SAI_OBJECT_TYPE_SWITCH",
            ObjectType::Port => "SAI_OBJECT_TYPE_PORT",
            ObjectType::VirtualRouter => "SAI_OBJECT_TYPE_VIRTUAL_ROUTER",
            ObjectType::RouterInterface => "SAI_OBJECT_TYPE_ROUTER_INTERFACE",
            ObjectType::NextHop => "SAI_OBJECT_TYPE_NEXT_HOP",
            ObjectType::NextHopGroup => "SAI_OBJECT_TYPE_NEXT_HOP_GROUP",
            ObjectType::NextHopGroupMember => "SAI_OBJECT_TYPE_NEXT_HOP_GROUP_MEMBER",
            ObjectType::AclTable => "SAI_OBJECT_TYPE_ACL_TABLE",
            ObjectType::AclEntry => "SAI_OBJECT_TYPE_ACL_ENTRY",
            ObjectType::Vlan => "SAI_OBJECT_TYPE_VLAN",
            ObjectType::VlanMember => "SAI_OBJECT_TYPE_VLAN_MEMBER",
            ObjectType::Lag => "SAI_OBJECT_TYPE_LAG",
            ObjectType::LagMember => "SAI_OBJECT_TYPE_LAG_MEMBER",
            ObjectType::Tunnel => "SAI_OBJECT_TYPE_TUNNEL",
            ObjectType::HostifTrapGroup => "SAI_OBJECT_TYPE_HOSTIF_TRAP_GROUP",
            ObjectType::HostifTrap => "SAI_OBJECT_TYPE_HOSTIF_TRAP",
            ObjectType::BufferPool => "SAI_OBJECT_TYPE_BUFFER_POOL",
            ObjectType::Queue => "SAI_OBJECT_TYPE_QUEUE",
            ObjectType::Scheduler => "SAI_OBJECT_TYPE_SCHEDULER",
            ObjectType::StpInstance => "SAI_OBJECT_TYPE_STP",
            ObjectType::Eni => "SAI_OBJECT_TYPE_ENI",
            ObjectType::Vnet => "SAI_OBJECT_TYPE_VNET",
            ObjectType::HaSet => "SAI_OBJECT_TYPE_HA_SET",
            ObjectType::RouteEntry => "SAI_OBJECT_TYPE_ROUTE_ENTRY",
            ObjectType::NeighborEntry => "SAI_OBJECT_TYPE_NEIGHBOR_ENTRY",
            ObjectType::FdbEntry => "SAI_OBJECT_TYPE_FDB_ENTRY",
            ObjectType::InsegEntry => "SAI_OBJECT_TYPE_INSEG_ENTRY",
            ObjectType::MySidEntry => "SAI_OBJECT_TYPE_MY_SID_ENTRY",
            ObjectType::DirectionLookupEntry => "SAI_OBJECT_TYPE_DIRECTION_LOOKUP_ENTRY",
            ObjectType::EniEtherAddressMapEntry => "SAI_OBJECT_TYPE_ENI_ETHER_ADDRESS_MAP_ENTRY",
            ObjectType::VipEntry => "SAI_OBJECT_TYPE_VIP_ENTRY",
            ObjectType::InboundRoutingEntry => "SAI_OBJECT_TYPE_INBOUND_ROUTING_ENTRY",
            ObjectType::PaValidationEntry => "SAI_OBJECT_TYPE_PA_VALIDATION_ENTRY",
            ObjectType::OutboundRoutingEntry => "SAI_OBJECT_TYPE_OUTBOUND_ROUTING_ENTRY",
            ObjectType::OutboundCaToPaEntry => "SAI_OBJECT_TYPE_OUTBOUND_CA_TO_PA_ENTRY",
        }
    }

    /// Raw discriminant, used in VID encoding.
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Inverse of [`ObjectType::as_u16`].
    pub fn from_u16(raw: u16) -> Option<Self> {
        ALL_OBJECT_TYPES.iter().copied().find(|t| t.as_u16() == raw)
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// All object types known to the core, in discriminant order.
pub const ALL_OBJECT_TYPES: &[ObjectType] = &[
    ObjectType::Switch,
    ObjectType::Port,
    ObjectType::VirtualRouter,
    ObjectType::RouterInterface,
    ObjectType::NextHop,
    ObjectType::NextHopGroup,
    ObjectType::NextHopGroupMember,
    ObjectType::AclTable,
    ObjectType::AclEntry,
    ObjectType::Vlan,
    ObjectType::VlanMember,
    ObjectType::Lag,
    ObjectType::LagMember,
    ObjectType::Tunnel,
    ObjectType::HostifTrapGroup,
    ObjectType::HostifTrap,
    ObjectType::BufferPool,
    ObjectType::Queue,
    ObjectType::Scheduler,
    ObjectType::StpInstance,
    ObjectType::Eni,
    ObjectType::Vnet,
    ObjectType::HaSet,
    ObjectType::RouteEntry,
    ObjectType::NeighborEntry,
    ObjectType::FdbEntry,
    ObjectType::InsegEntry,
    ObjectType::MySidEntry,
    ObjectType::DirectionLookupEntry,
    ObjectType::EniEtherAddressMapEntry,
    ObjectType::VipEntry,
    ObjectType::InboundRoutingEntry,
    ObjectType::PaValidationEntry,
    ObjectType::OutboundRoutingEntry,
    ObjectType::OutboundCaToPaEntry,
];
