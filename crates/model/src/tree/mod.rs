/// Placement.
pub mod placement;

/// Queries.
pub mod query;

pub use self::{
    placement::{PlaceMember, Placement, Slot},
    query::{PathHop, RelativePosition, TreeStatistics},
};

use crate::member::{MemberId, PlacementEdge, Position, MAX_LEVEL};

/// Persisted placement edges.
pub trait TreeStore {
    /// Get the child of `parent` at `position`.
    fn child(&self, parent: MemberId, position: Position) -> crate::Result<Option<MemberId>>;

    /// Get the edge attaching `child` to its structural parent.
    fn parent_edge(&self, child: MemberId) -> crate::Result<Option<PlacementEdge>>;

    /// Insert an edge if the slot is still empty.
    /// # Errors
    /// - Returns [`Error::SlotOccupied`](crate::Error::SlotOccupied) if `(parent, position)` is taken.
    /// - Returns [`Error::AlreadyPlaced`](crate::Error::AlreadyPlaced) if the child already has a parent.
    fn insert_edge(&mut self, edge: PlacementEdge) -> crate::Result<()>;
}

impl<T: TreeStore + ?Sized> TreeStore for &mut T {
    fn child(&self, parent: MemberId, position: Position) -> crate::Result<Option<MemberId>> {
        (**self).child(parent, position)
    }

    fn parent_edge(&self, child: MemberId) -> crate::Result<Option<PlacementEdge>> {
        (**self).parent_edge(child)
    }

    fn insert_edge(&mut self, edge: PlacementEdge) -> crate::Result<()> {
        (**self).insert_edge(edge)
    }
}

/// Extension trait for [`TreeStore`] with placement and queries.
pub trait TreeStoreExt: TreeStore {
    /// Get both children of `parent`, left first.
    fn children(&self, parent: MemberId) -> crate::Result<[Option<MemberId>; 2]> {
        Ok([
            self.child(parent, Position::Left)?,
            self.child(parent, Position::Right)?,
        ])
    }

    /// Find the next open slot in the downline of `sponsor` without touching anything.
    fn find_open_slot(&self, sponsor: MemberId) -> crate::Result<Slot> {
        placement::find_open_slot(self, sponsor, MAX_LEVEL)
    }

    /// Create a [`PlaceMember`] action placing `member` under the downline of `sponsor`.
    fn place(
        &mut self,
        sponsor: MemberId,
        member: MemberId,
    ) -> crate::Result<PlaceMember<&mut Self>>
    where
        Self: Sized,
    {
        PlaceMember::try_new(self, sponsor, member)
    }

    /// Returns whether `member` is `node` itself or one of its structural ancestors.
    ///
    /// The walk is not bounded by `MAX_LEVEL`.
    fn is_in_upline(&self, member: MemberId, node: MemberId) -> crate::Result<bool> {
        query::is_in_upline(self, member, node)
    }

    /// Compute subtree statistics of `root`.
    fn statistics(&self, root: MemberId) -> crate::Result<TreeStatistics> {
        query::statistics(self, root)
    }

    /// Get the structural ancestors of `node`, nearest first, at most `MAX_LEVEL` of them.
    fn ancestors(&self, node: MemberId) -> crate::Result<Vec<PathHop>> {
        query::ancestors(self, node, MAX_LEVEL)
    }

    /// Resolve the position of `node` relative to `ancestor`.
    ///
    /// Returns `None` if `ancestor` is not within `MAX_LEVEL` hops above `node`.
    fn position(
        &self,
        node: MemberId,
        ancestor: MemberId,
    ) -> crate::Result<Option<RelativePosition>> {
        query::position(self, node, ancestor)
    }
}

impl<T: TreeStore + ?Sized> TreeStoreExt for T {}
