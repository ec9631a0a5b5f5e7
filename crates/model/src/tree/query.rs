use std::collections::HashSet;

use crate::member::{MemberId, Position, MAX_LEVEL};

use super::{TreeStore, TreeStoreExt};

/// Subtree statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeStatistics {
    /// The root of the subtree.
    pub root: MemberId,
    /// Number of members below the root.
    pub total: u64,
    /// Number of members at each level, index `0` being level 1.
    pub by_level: Vec<u64>,
    /// Deepest populated level, `0` for an empty subtree.
    pub max_level: u8,
    /// The left child plus everything below it.
    pub left_leg_count: u64,
    /// The right child plus everything below it.
    pub right_leg_count: u64,
}

impl TreeStatistics {
    /// Get the number of members at `level`.
    pub fn count_at(&self, level: u8) -> u64 {
        level
            .checked_sub(1)
            .and_then(|idx| self.by_level.get(usize::from(idx)))
            .copied()
            .unwrap_or(0)
    }
}

/// One hop of an upward walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathHop {
    /// Number of hops from the starting node.
    pub level: u8,
    /// The ancestor reached by this hop.
    pub ancestor: MemberId,
    /// The side of `ancestor` the walk came up from.
    pub position: Position,
}

/// Position of a node relative to one of its ancestors.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelativePosition {
    /// The node.
    pub node: MemberId,
    /// The ancestor.
    pub ancestor: MemberId,
    /// Hops from the node up to the ancestor, nearest first.
    pub path: Vec<PathHop>,
}

impl RelativePosition {
    /// Get the level of the node below the ancestor.
    pub fn level(&self) -> u8 {
        self.path.last().map(|hop| hop.level).unwrap_or(0)
    }

    /// Get the leg of the ancestor the node belongs to.
    pub fn leg(&self) -> Option<Position> {
        self.path.last().map(|hop| hop.position)
    }
}

pub(super) fn statistics<S: TreeStore + ?Sized>(
    store: &S,
    root: MemberId,
) -> crate::Result<TreeStatistics> {
    let mut stats = TreeStatistics {
        root,
        ..Default::default()
    };
    let mut frontier = store
        .children(root)?
        .into_iter()
        .zip(Position::BOTH)
        .filter_map(|(child, leg)| child.map(|child| (child, leg)))
        .collect::<Vec<_>>();
    let mut level = 1;
    while !frontier.is_empty() && level <= MAX_LEVEL {
        let count = frontier.len() as u64;
        stats.total += count;
        stats.by_level.push(count);
        stats.max_level = level;
        for (_, leg) in &frontier {
            match leg {
                Position::Left => stats.left_leg_count += 1,
                Position::Right => stats.right_leg_count += 1,
            }
        }
        let mut next = Vec::with_capacity(frontier.len() * 2);
        for (member, leg) in frontier {
            next.extend(store.children(member)?.into_iter().flatten().map(|c| (c, leg)));
        }
        frontier = next;
        level += 1;
    }
    Ok(stats)
}

pub(super) fn ancestors<S: TreeStore + ?Sized>(
    store: &S,
    node: MemberId,
    max_hops: u8,
) -> crate::Result<Vec<PathHop>> {
    let mut hops = Vec::new();
    let mut current = node;
    for level in 1..=max_hops {
        let Some(edge) = store.parent_edge(current)? else {
            break;
        };
        hops.push(PathHop {
            level,
            ancestor: edge.parent,
            position: edge.position,
        });
        current = edge.parent;
    }
    Ok(hops)
}

pub(super) fn is_in_upline<S: TreeStore + ?Sized>(
    store: &S,
    member: MemberId,
    node: MemberId,
) -> crate::Result<bool> {
    let mut seen = HashSet::new();
    let mut current = node;
    loop {
        if current == member {
            return Ok(true);
        }
        if !seen.insert(current) {
            return Err(crate::Error::Storage(format!(
                "placement edges form a cycle through {current}"
            )));
        }
        match store.parent_edge(current)? {
            Some(edge) => current = edge.parent,
            None => return Ok(false),
        }
    }
}

pub(super) fn position<S: TreeStore + ?Sized>(
    store: &S,
    node: MemberId,
    ancestor: MemberId,
) -> crate::Result<Option<RelativePosition>> {
    let mut path = Vec::new();
    let mut current = node;
    for level in 1..=MAX_LEVEL {
        let Some(edge) = store.parent_edge(current)? else {
            return Ok(None);
        };
        path.push(PathHop {
            level,
            ancestor: edge.parent,
            position: edge.position,
        });
        if edge.parent == ancestor {
            return Ok(Some(RelativePosition {
                node,
                ancestor,
                path,
            }));
        }
        current = edge.parent;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use crate::{action::NetworkAction, test::TestTree};

    use super::*;

    fn id(n: u64) -> MemberId {
        MemberId(n)
    }

    fn build(count: u64) -> crate::Result<TestTree> {
        let mut tree = TestTree::default();
        for child in 1..=count {
            _ = tree.place(id(100), id(child))?.execute()?;
        }
        Ok(tree)
    }

    #[test]
    fn statistics_of_a_three_level_tree() -> crate::Result<()> {
        let tree = build(9)?;
        let stats = tree.statistics(id(100))?;
        assert_eq!(stats.total, 9);
        assert_eq!(stats.by_level, vec![2, 4, 3]);
        assert_eq!(stats.max_level, 3);
        // Level 3 so far: 3.left = 7, 5.left = 8, 4.left = 9.
        // Left leg: 1, 3, 5, 7, 8. Right leg: 2, 4, 6, 9.
        assert_eq!(stats.left_leg_count, 5);
        assert_eq!(stats.right_leg_count, 4);
        assert_eq!(stats.count_at(2), 4);
        assert_eq!(stats.count_at(0), 0);
        assert_eq!(stats.count_at(4), 0);

        let sub = tree.statistics(id(1))?;
        assert_eq!(sub.total, 4);
        assert_eq!(sub.by_level, vec![2, 2]);
        assert_eq!(sub.left_leg_count, 2);
        assert_eq!(sub.right_leg_count, 2);
        Ok(())
    }

    #[test]
    fn statistics_is_idempotent() -> crate::Result<()> {
        let tree = build(20)?;
        assert_eq!(tree.statistics(id(100))?, tree.statistics(id(100))?);
        Ok(())
    }

    #[test]
    fn empty_subtree() -> crate::Result<()> {
        let tree = build(2)?;
        let stats = tree.statistics(id(2))?;
        assert_eq!(stats.total, 0);
        assert_eq!(stats.max_level, 0);
        assert!(stats.by_level.is_empty());
        Ok(())
    }

    #[test]
    fn ancestors_and_position() -> crate::Result<()> {
        let tree = build(7)?;
        // 7 sits at 3.left, 3 at 1.left, 1 at 100.left.
        let hops = tree.ancestors(id(7))?;
        assert_eq!(
            hops.iter().map(|h| (h.level, h.ancestor)).collect::<Vec<_>>(),
            vec![(1, id(3)), (2, id(1)), (3, id(100))]
        );

        let position = tree.position(id(6), id(100))?.expect("must be found");
        assert_eq!(position.level(), 2);
        assert_eq!(position.leg(), Some(Position::Right));
        assert_eq!(position.path[0].ancestor, id(2));
        assert_eq!(position.path[0].position, Position::Right);

        assert!(tree.position(id(6), id(1))?.is_none());
        assert!(tree.position(id(100), id(1))?.is_none());
        Ok(())
    }
}
