//! Virtual and real object id newtypes.
//!
//! Syncd maintains two parallel identifier spaces: the control plane
//! only ever sees *virtual* ids (VIDs), the ASIC driver only ever sees
//! *real* ids (RIDs). The two are distinct types so they cannot be
//! mixed up at a call site; the translation between them is owned by
//! the syncd translator.

use serde::{Deserialize, Serialize};

use crate::object_type::ObjectType;

/// Number of low bits carrying the per-type sequence number in a VID.
const VID_SEQUENCE_BITS: u32 = 48;
const VID_SEQUENCE_MASK: u64 = (1 << VID_SEQUENCE_BITS) - 1;

/// Common surface of the two object id spaces.
///
/// Lets attribute values and entry keys be written once, generic over
/// whether they carry VIDs (wire side) or RIDs (driver side).
pub trait ObjectIdKind: Copy + Eq + std::hash::Hash + std::fmt::Debug {
    fn is_null(self) -> bool;
}

impl ObjectIdKind for Vid {
    fn is_null(self) -> bool {
        Vid::is_null(self)
    }
}

impl ObjectIdKind for Rid {
    fn is_null(self) -> bool {
        Rid::is_null(self)
    }
}

/// A control-plane virtual object id.
///
/// The object type is encoded in the high 16 bits, a per-type sequence
/// number in the low 48. `Vid::NULL` (all zeros) is the SAI null id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Vid(u64);

impl Vid {
    /// The null object id (SAI_NULL_OBJECT_ID).
    pub const NULL: Self = Self(0);

    /// Encodes a VID from an object type and a per-type sequence number.
    pub const fn encode(object_type: ObjectType, sequence: u64) -> Self {
        Self(((object_type.as_u16() as u64) << VID_SEQUENCE_BITS) | (sequence & VID_SEQUENCE_MASK))
    }

    /// Creates a VID from a raw wire value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw 64-bit value.
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Extracts the object type encoded in the high bits.
    ///
    /// Returns `None` for the null id or an unknown type tag.
    pub fn object_type(self) -> Option<ObjectType> {
        if self.is_null() {
            return None;
        }
        ObjectType::from_u16((self.0 >> VID_SEQUENCE_BITS) as u16)
    }
}

impl std::fmt::Debug for Vid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Vid(0x{:016x})", self.0)
    }
}

impl std::fmt::Display for Vid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// An ASIC-side real object id.
///
/// Opaque to the control plane beyond equality comparison; only the
/// driver assigns these.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rid(u64);

impl Rid {
    pub const NULL: Self = Self(0);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Debug for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rid(0x{:016x})", self.0)
    }
}

impl std::fmt::Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}
