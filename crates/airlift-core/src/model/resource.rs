// ── Radio resource model ──
//
// A ResourceBlock identifies one (access point, radio, channel, band)
// unit; a ResourcePool is a set of them with the small algebra the
// handover logic needs. Pure value types, no side effects.

use indexmap::IndexSet;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::model::mac::MacAddress;
use crate::registry::Registry;

// ── Band ────────────────────────────────────────────────────────────

/// Channel band / width family of a radio resource.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Band {
    /// 20 MHz legacy. Rate codes on this band are in 500 kb/s units.
    L20,
    /// 20 MHz HT.
    Ht20,
    /// 40 MHz HT.
    Ht40,
}

impl Band {
    pub fn code(self) -> u8 {
        match self {
            Self::L20 => 0x0,
            Self::Ht20 => 0x1,
            Self::Ht40 => 0x2,
        }
    }
}

impl TryFrom<u8> for Band {
    type Error = CoreError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x0 => Ok(Self::L20),
            0x1 => Ok(Self::Ht20),
            0x2 => Ok(Self::Ht40),
            other => Err(CoreError::UnknownBand(other)),
        }
    }
}

// ── ResourceBlock ───────────────────────────────────────────────────

/// One radio resource unit hosted on an access point.
///
/// Identity is the full tuple (wtp, hwaddr, channel, band): two blocks
/// with equal values are the same resource regardless of where the
/// instance was allocated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceBlock {
    /// Owning access point.
    pub wtp: MacAddress,
    /// Radio interface address.
    pub hwaddr: MacAddress,
    pub channel: u8,
    pub band: Band,
}

impl ResourceBlock {
    pub fn new(wtp: MacAddress, hwaddr: MacAddress, channel: u8, band: Band) -> Self {
        Self {
            wtp,
            hwaddr,
            channel,
            band,
        }
    }

    /// Same channel/band family, ignoring the owning access point and
    /// radio. This is the match used by handover-by-WTP: "does the
    /// target host an equivalent of what the client is tuned to".
    pub fn same_channel(&self, other: &Self) -> bool {
        self.channel == other.channel && self.band == other.band
    }
}

impl fmt::Display for ResourceBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "wtp {} hwaddr {} channel {} band {}",
            self.wtp, self.hwaddr, self.channel, self.band
        )
    }
}

// ── ResourcePool ────────────────────────────────────────────────────

/// A set of resource blocks (no duplicates by block value equality).
///
/// Backed by an insertion-ordered set, so [`ResourcePool::pop`] is
/// deterministic: it removes and returns the first-inserted element.
/// Equality is set equality, independent of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResourcePool(IndexSet<ResourceBlock>);

impl ResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(block: ResourceBlock) -> Self {
        let mut set = IndexSet::with_capacity(1);
        set.insert(block);
        Self(set)
    }

    /// Insert a block. Returns `false` if an equal block was present.
    pub fn insert(&mut self, block: ResourceBlock) -> bool {
        self.0.insert(block)
    }

    pub fn contains(&self, block: &ResourceBlock) -> bool {
        self.0.contains(block)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceBlock> {
        self.0.iter()
    }

    /// Blocks equal-by-value present in both pools.
    pub fn intersect(&self, other: &Self) -> Self {
        Self(self.0.intersection(&other.0).cloned().collect())
    }

    /// Remove and return one element: the first-inserted one.
    ///
    /// Callers must not rely on which element comes out beyond "some
    /// member, pool shrinks by one".
    pub fn pop(&mut self) -> Option<ResourceBlock> {
        self.0.shift_remove_index(0)
    }

    /// Find a member on the same channel/band as `block`, ignoring the
    /// owning access point. Used by the handover-by-WTP shortcut.
    pub fn equivalent_of(&self, block: &ResourceBlock) -> Option<&ResourceBlock> {
        self.0.iter().find(|candidate| candidate.same_channel(block))
    }
}

impl FromIterator<ResourceBlock> for ResourcePool {
    fn from_iter<I: IntoIterator<Item = ResourceBlock>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ResourcePool {
    type Item = ResourceBlock;
    type IntoIter = indexmap::set::IntoIter<ResourceBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// ── BlockSpec ───────────────────────────────────────────────────────

/// A loosely-specified radio resource: either a block already resolved
/// in-process, or a descriptor to be validated against what the named
/// access point actually supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSpec {
    /// A concrete block, trusted because it was produced in-process
    /// (from a WTP's supported pool or a prior `resolve`).
    Block(ResourceBlock),
    Descriptor(ResourceDescriptor),
}

/// Deserialized input always lands in the descriptor arm. The two
/// shapes share field names, so anything else would let a payload
/// skip `resolve` validation by looking like a block.
impl<'de> Deserialize<'de> for BlockSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ResourceDescriptor::deserialize(deserializer).map(Self::Descriptor)
    }
}

/// Descriptor form of a resource block. `hwaddr` may be omitted when
/// the (channel, band) pair is unambiguous on the target WTP.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceDescriptor {
    pub wtp: MacAddress,
    #[serde(default)]
    pub hwaddr: Option<MacAddress>,
    pub channel: u8,
    pub band: Band,
}

impl BlockSpec {
    /// Resolve to a concrete block hosted on a known WTP.
    ///
    /// A descriptor matching zero blocks yields `NoMatchingBlock`;
    /// matching more than one (two radios on the same channel/band with
    /// no `hwaddr` given) yields `AmbiguousBlock`.
    pub fn resolve(&self, registry: &Registry) -> Result<ResourceBlock, CoreError> {
        match self {
            Self::Block(block) => Ok(block.clone()),
            Self::Descriptor(desc) => {
                let wtp = registry.wtp(desc.wtp)?;

                let matches: Vec<&ResourceBlock> = wtp
                    .supports
                    .iter()
                    .filter(|block| {
                        block.channel == desc.channel
                            && block.band == desc.band
                            && desc.hwaddr.is_none_or(|hw| block.hwaddr == hw)
                    })
                    .collect();

                match matches.as_slice() {
                    [] => Err(CoreError::NoMatchingBlock { wtp: desc.wtp }),
                    [block] => Ok((*block).clone()),
                    many => Err(CoreError::AmbiguousBlock {
                        wtp: desc.wtp,
                        matches: many.len(),
                    }),
                }
            }
        }
    }
}
