use std::fmt::Debug;

use num_bigint::BigUint;

/// Handle to a canonical [`Node`] inside a universe's node table.
///
/// Two handles are equal iff the nodes they refer to describe the same square of cells, so
/// handles can be compared and hashed directly.
///
/// A handle stays valid until the next mutating call on the owning universe. Garbage
/// collection may renumber nodes at the end of such a call.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The dead leaf (a single empty cell)
    pub const DEAD: NodeId = NodeId(0);

    /// The live leaf (a single live cell)
    pub const LIVE: NodeId = NodeId(1);

    pub(crate) const fn leaf(alive: bool) -> Self {
        if alive { Self::LIVE } else { Self::DEAD }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            NodeId::DEAD => write!(f, "#dead"),
            NodeId::LIVE => write!(f, "#live"),
            NodeId(i) => write!(f, "#{i}"),
        }
    }
}

/// The four quadrants of a node, all one level below it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Quad {
    pub nw: NodeId,
    pub ne: NodeId,
    pub sw: NodeId,
    pub se: NodeId,
}

impl Quad {
    pub const fn new(nw: NodeId, ne: NodeId, sw: NodeId, se: NodeId) -> Self {
        Self { nw, ne, sw, se }
    }

    pub const fn splat(id: NodeId) -> Self {
        Self::new(id, id, id, id)
    }

    pub const fn to_array(self) -> [NodeId; 4] {
        [self.nw, self.ne, self.sw, self.se]
    }

    pub fn map<F>(self, mut f: F) -> Self
    where
        F: FnMut(NodeId) -> NodeId,
    {
        Self::new(f(self.nw), f(self.ne), f(self.sw), f(self.se))
    }
}

/// A square region of `2^level` cells on a side.
///
/// Nodes are only ever created by the node table, which guarantees that no two nodes share the
/// same [`Quad`]. Everything a renderer needs (level, population, children) is read-only; the
/// memo slots are owned by the generation engine.
#[derive(Clone)]
pub struct Node {
    pub(crate) level: u32,

    /// Number of live cells in this square.
    pub(crate) population: BigUint,

    /// `None` iff this is a leaf
    pub(crate) children: Option<Quad>,

    /// This node advanced by `2^step` generations, for the universe's current step exponent.
    ///
    /// Cleared whenever the step exponent or the rule changes.
    pub(crate) cache: Option<NodeId>,

    /// This node advanced by `2^(level - 2)` generations. Does not depend on the step
    /// exponent, so it is only cleared when the rule changes.
    pub(crate) quick_cache: Option<NodeId>,
}

impl Node {
    pub(crate) fn leaf(alive: bool) -> Self {
        Self {
            level: 0,
            population: BigUint::from(alive as u8),
            children: None,
            cache: None,
            quick_cache: None,
        }
    }

    pub(crate) fn branch(level: u32, population: BigUint, children: Quad) -> Self {
        Self {
            level,
            population,
            children: Some(children),
            cache: None,
            quick_cache: None,
        }
    }

    /// Side length is `2^level`; a leaf is level `0`.
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn population(&self) -> &BigUint {
        &self.population
    }

    pub fn is_empty(&self) -> bool {
        self.population == BigUint::ZERO
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// The four quadrants, or `None` for a leaf.
    pub fn children(&self) -> Option<Quad> {
        self.children
    }

    /// Like [`Node::children`], for callers that already know this is not a leaf.
    pub(crate) fn quad(&self) -> Quad {
        self.children.expect("leaf nodes have no quadrants")
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.children {
            None => write!(f, "leaf({})", self.population),
            Some(Quad { nw, ne, sw, se }) => write!(
                f,
                "[level: {}, pop: {}, nw: {nw:?}, ne: {ne:?}, sw: {sw:?}, se: {se:?}]",
                self.level, self.population
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;

    use super::Node;
    use super::NodeId;
    use super::Quad;

    #[test]
    fn leaves() {
        let dead = Node::leaf(false);
        let live = Node::leaf(true);

        assert!(dead.is_leaf() && dead.is_empty());
        assert_eq!(live.population(), &BigUint::from(1u8));
        assert_eq!(NodeId::leaf(true), NodeId::LIVE);
        assert_eq!(format!("{:?}", NodeId::leaf(false)), "#dead");
    }

    #[test]
    fn quad_map_keeps_order() {
        let q = Quad::new(NodeId(2), NodeId(3), NodeId(4), NodeId(5));
        let q = q.map(|id| NodeId(id.0 * 10));

        assert_eq!(q.to_array(), [NodeId(20), NodeId(30), NodeId(40), NodeId(50)]);
    }
}
