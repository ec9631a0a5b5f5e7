use crate::{
    action::NetworkAction,
    member::{MemberId, PlacementEdge, Position, MAX_LEVEL},
};

use super::{TreeStore, TreeStoreExt};

/// An open slot in a sponsor's downline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Slot {
    /// Structural parent owning the slot.
    pub parent: MemberId,
    /// Which side of the parent is open.
    pub position: Position,
    /// Level of the slot below the sponsor.
    pub level: u8,
}

/// Find the next open slot below `sponsor`.
///
/// The search is level-synchronous and left-biased: for each level, every
/// frontier member's left slot is checked (left to right) before any right slot
/// of the same frontier, and only when the whole frontier is full does the
/// search descend, the next frontier listing each member's left child then
/// right child.
///
/// # Errors
/// Returns [`Error::TreeFull`](crate::Error::TreeFull) if there is no open slot within
/// `max_level` levels. The search never falls back to an arbitrary slot.
pub(super) fn find_open_slot<S: TreeStore + ?Sized>(
    store: &S,
    sponsor: MemberId,
    max_level: u8,
) -> crate::Result<Slot> {
    let mut frontier = vec![sponsor];
    for level in 1..=max_level {
        let children = frontier
            .iter()
            .map(|parent| store.children(*parent))
            .collect::<crate::Result<Vec<_>>>()?;
        for position in Position::BOTH {
            let idx = usize::from(u8::from(position));
            let open = frontier
                .iter()
                .zip(children.iter())
                .find(|(_, pair)| pair[idx].is_none());
            if let Some((parent, _)) = open {
                return Ok(Slot {
                    parent: *parent,
                    position,
                    level,
                });
            }
        }
        frontier = children.into_iter().flatten().flatten().collect();
    }
    Err(crate::Error::TreeFull { sponsor, max_level })
}

/// Place Member.
#[must_use]
pub struct PlaceMember<S> {
    store: S,
    sponsor: MemberId,
    member: MemberId,
    max_level: u8,
}

/// Placement Report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Placement {
    edge: PlacementEdge,
    level: u8,
}

impl Placement {
    /// Get the inserted edge.
    pub fn edge(&self) -> &PlacementEdge {
        &self.edge
    }

    /// Get the structural parent.
    pub fn parent(&self) -> MemberId {
        self.edge.parent
    }

    /// Get the position under the parent.
    pub fn position(&self) -> Position {
        self.edge.position
    }

    /// Get the level below the sponsor.
    pub fn level(&self) -> u8 {
        self.level
    }
}

impl<S: TreeStore> PlaceMember<S> {
    /// Create a new [`PlaceMember`] action.
    pub fn try_new(store: S, sponsor: MemberId, member: MemberId) -> crate::Result<Self> {
        if sponsor == member {
            return Err(crate::Error::InvalidArgument(
                "a member cannot be placed under itself",
            ));
        }
        Ok(Self {
            store,
            sponsor,
            member,
            max_level: MAX_LEVEL,
        })
    }

    /// Search at most `max_level` levels below the sponsor.
    pub fn with_max_level(self, max_level: u8) -> crate::Result<Self> {
        if !crate::member::is_valid_level(max_level) {
            return Err(crate::Error::InvalidLevel(max_level));
        }
        Ok(Self { max_level, ..self })
    }
}

impl<S: TreeStore> NetworkAction for PlaceMember<S> {
    type Report = Placement;

    /// Inserts exactly one edge and touches nothing else. The chosen slot is
    /// re-validated by the insert itself, so a stale search result surfaces as
    /// [`Error::SlotOccupied`](crate::Error::SlotOccupied) rather than a duplicate edge.
    ///
    /// Only a member outside the tree can be placed: one with a parent or with
    /// children of its own is rejected, and so is a member in the sponsor's upline.
    fn execute(mut self) -> crate::Result<Self::Report> {
        if self.store.parent_edge(self.member)?.is_some() {
            return Err(crate::Error::AlreadyPlaced(self.member));
        }
        if self.store.is_in_upline(self.member, self.sponsor)? {
            return Err(crate::Error::WouldCycle {
                member: self.member,
                sponsor: self.sponsor,
            });
        }
        if self.store.children(self.member)?.iter().any(Option::is_some) {
            return Err(crate::Error::AlreadyPlaced(self.member));
        }
        let slot = find_open_slot(&self.store, self.sponsor, self.max_level)?;
        let edge = PlacementEdge {
            parent: slot.parent,
            child: self.member,
            position: slot.position,
            sponsor: self.sponsor,
        };
        self.store.insert_edge(edge)?;
        tracing::debug!(
            sponsor = %self.sponsor,
            member = %self.member,
            parent = %edge.parent,
            position = %edge.position,
            level = slot.level,
            "placed member"
        );
        Ok(Placement {
            edge,
            level: slot.level,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{test::TestTree, Error};

    use super::*;

    fn id(n: u64) -> MemberId {
        MemberId(n)
    }

    #[test]
    fn fills_level_lefts_before_rights() -> crate::Result<()> {
        let mut tree = TestTree::default();
        let sponsor = id(100);
        let expected = [
            (1, 100, Position::Left, 1),
            (2, 100, Position::Right, 1),
            (3, 1, Position::Left, 2),
            (4, 2, Position::Left, 2),
            (5, 1, Position::Right, 2),
            (6, 2, Position::Right, 2),
            (7, 3, Position::Left, 3),
        ];
        for (child, parent, position, level) in expected {
            let placement = tree.place(sponsor, id(child))?.execute()?;
            assert_eq!(placement.parent(), id(parent), "child {child}");
            assert_eq!(placement.position(), position, "child {child}");
            assert_eq!(placement.level(), level, "child {child}");
            assert_eq!(placement.edge().sponsor, sponsor);
        }
        Ok(())
    }

    #[test]
    fn third_level_order() -> crate::Result<()> {
        let mut tree = TestTree::default();
        let sponsor = id(100);
        for child in 1..=6 {
            _ = tree.place(sponsor, id(child))?.execute()?;
        }
        // Level 3 frontier is [3, 5, 4, 6].
        let frontier = [3, 5, 4, 6];
        for (n, parent) in frontier.iter().enumerate() {
            let placement = tree.place(sponsor, id(7 + n as u64))?.execute()?;
            assert_eq!(placement.parent(), id(*parent));
            assert_eq!(placement.position(), Position::Left);
        }
        for (n, parent) in frontier.iter().enumerate() {
            let placement = tree.place(sponsor, id(11 + n as u64))?.execute()?;
            assert_eq!(placement.parent(), id(*parent));
            assert_eq!(placement.position(), Position::Right);
            assert_eq!(placement.level(), 3);
        }
        let placement = tree.place(sponsor, id(15))?.execute()?;
        assert_eq!(placement.level(), 4);
        Ok(())
    }

    #[test]
    fn search_is_confined_to_the_sponsor_downline() -> crate::Result<()> {
        let mut tree = TestTree::default();
        let root = id(100);
        for child in 1..=3 {
            _ = tree.place(root, id(child))?.execute()?;
        }
        // Member 2 has an empty downline even though member 1 has a free right slot.
        let placement = tree.place(id(2), id(10))?.execute()?;
        assert_eq!(placement.parent(), id(2));
        assert_eq!(placement.position(), Position::Left);
        assert_eq!(placement.level(), 1);
        assert!(!placement.edge().is_spillover());

        let placement = tree.place(root, id(11))?.execute()?;
        assert_eq!(placement.parent(), id(1));
        assert_eq!(placement.position(), Position::Right);
        assert!(placement.edge().is_spillover());
        Ok(())
    }

    #[test]
    fn placing_twice_is_rejected() -> crate::Result<()> {
        let mut tree = TestTree::default();
        _ = tree.place(id(100), id(1))?.execute()?;
        let err = tree.place(id(100), id(1))?.execute().unwrap_err();
        assert!(matches!(err, Error::AlreadyPlaced(member) if member == id(1)));
        assert!(tree.place(id(1), id(1)).is_err());
        Ok(())
    }

    #[test]
    fn full_tree_is_an_error() -> crate::Result<()> {
        let mut tree = TestTree::default();
        for child in 1..=6 {
            _ = tree
                .place(id(100), id(child))?
                .with_max_level(2)?
                .execute()?;
        }
        let err = tree
            .place(id(100), id(7))?
            .with_max_level(2)?
            .execute()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::TreeFull { sponsor, max_level: 2 } if sponsor == id(100)
        ));
        // Nothing was inserted and no existing slot was reused.
        assert_eq!(tree.edge_count(), 6);
        assert!(tree.place(id(100), id(8))?.with_max_level(31).is_err());
        Ok(())
    }

    #[test]
    fn root_cannot_join_its_own_downline() -> crate::Result<()> {
        let mut tree = TestTree::default();
        // 100 <- 1 <- 3
        for child in 1..=3 {
            _ = tree.place(id(100), id(child))?.execute()?;
        }
        for sponsor in [id(1), id(3)] {
            let err = tree.place(sponsor, id(100))?.execute().unwrap_err();
            assert!(matches!(
                err,
                Error::WouldCycle { member, sponsor: s } if member == id(100) && s == sponsor
            ));
        }
        assert_eq!(tree.edge_count(), 3);
        assert!(tree.parent_edge(id(100))?.is_none());
        assert!(!tree.is_in_upline(id(1), id(2))?);
        assert!(tree.is_in_upline(id(100), id(3))?);
        Ok(())
    }

    #[test]
    fn root_with_downline_cannot_be_placed_elsewhere() -> crate::Result<()> {
        let mut tree = TestTree::default();
        _ = tree.place(id(100), id(1))?.execute()?;
        let err = tree.place(id(200), id(100))?.execute().unwrap_err();
        assert!(matches!(err, Error::AlreadyPlaced(member) if member == id(100)));
        assert_eq!(tree.edge_count(), 1);

        // A member outside the tree can still join under any sponsor.
        _ = tree.place(id(200), id(300))?.execute()?;
        Ok(())
    }
}
