use core::fmt;
use core::num::NonZeroU32;

/// Stable handle for an entity in the simulation network.
///
/// Ids are dense indices into the owning `Vec`, stored off-by-one in a
/// `NonZeroU32` so `Option<Id>` costs nothing extra (container links,
/// device bindings and break-connection slots are all optional).
/// Operators never re-key entities, so an id stays valid for the
/// lifetime of the simulation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    /// Wrap a 0-based collection index.
    pub fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index + 1).expect("id space exhausted");
        Self(NonZeroU32::new(raw).expect("index+1 is nonzero"))
    }

    /// The 0-based collection index this id points at.
    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Domain-specific ID aliases for clarity (no runtime cost).
///
/// `NodeId` keys flow nodes, `ThermalId` keys solid thermal nodes,
/// `ConnId` keys flow connections, `CompId`/`PortId` key the user's
/// component graph before compilation.
pub type NodeId = Id;
pub type ThermalId = Id;
pub type ConnId = Id;
pub type CompId = Id;
pub type PortId = Id;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trip_index() {
        for i in [0_usize, 1, 2, 42, 10_000] {
            let id = Id::from_index(i);
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn option_id_is_small() {
        // The NonZero payoff: optional links cost no extra space.
        assert_eq!(
            core::mem::size_of::<Id>(),
            core::mem::size_of::<Option<Id>>()
        );
    }

    #[test]
    fn display_shows_the_index() {
        assert_eq!(format!("{}", Id::from_index(7)), "7");
        assert_eq!(format!("{:?}", Id::from_index(7)), "Id(7)");
    }
}
