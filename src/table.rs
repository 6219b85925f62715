use num_bigint::BigUint;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::debug;
use tracing::warn;

use crate::error::UniverseError;
use crate::error::UniverseResult;
use crate::node::Node;
use crate::node::NodeId;
use crate::node::Quad;

/// Marks the end of a collision chain
const NIL: u32 = u32::MAX;

/// Ids below this are the two leaves, which are never hashed.
const FIRST_ID: usize = 2;

/// Hash of a children quadruple. Only meaningful modulo the table capacity.
fn calc_hash(q: &Quad) -> usize {
    let mut h: u32 = 17;
    for id in q.to_array() {
        h = h.wrapping_mul(31) ^ id.0;
    }

    h as usize
}

/// Old id to new id mapping produced by [`NodeTable::compact`].
#[derive(Debug)]
pub(crate) struct Remap(Vec<u32>);

impl Remap {
    /// New id of `id`, or `None` if the node was reclaimed.
    pub(crate) fn get(&self, id: NodeId) -> Option<NodeId> {
        match self.0.get(id.index()) {
            Some(&NIL) | None => None,
            Some(&i) => Some(NodeId(i)),
        }
    }

    /// New id of a node that was passed to [`NodeTable::compact`] as a root.
    pub(crate) fn root(&self, id: NodeId) -> NodeId {
        renumber(&self.0, id)
    }
}

/// Canonical store of quadtree nodes.
///
/// Nodes live in an arena and are addressed by their index in it. A chained hash index maps
/// each children quadruple to the one node that has it. Once more than `max_load` nodes were
/// handed out since the last collection, the table collects: every node that neither the root
/// nor a pinned node can reach has its slot freed for reuse, and the index is rebuilt from the
/// rest. The arena therefore never holds more than `max_load + 1` nodes, free slots included.
///
/// Code that holds an id across a call that may allocate must make sure the node stays
/// reachable, by [`NodeTable::pin`]ning it or by passing it as a child to that very call.
pub(crate) struct NodeTable {
    nodes: Vec<Node>,

    /// First node of each collision chain, `mask + 1` of them
    heads: Vec<u32>,

    /// Next node in the chain of `nodes[i]`
    chain: Vec<u32>,

    /// Capacity, always `2^n - 1`
    mask: usize,

    max_mask: usize,
    load_factor: f64,

    /// Rebuild the index once `last_id` goes past this
    max_load: usize,

    /// Ids handed out (or re-handed during a rebuild) since the last collection
    last_id: usize,

    /// Where reachability starts when collecting
    root: NodeId,

    collections: u64,

    /// Set by a collection, cleared by compaction
    dirty: bool,

    /// Slots freed by the last collections, handed out before the arena grows
    free: Vec<u32>,

    /// Ids held by computations in flight, kept alive like the root
    pins: Vec<NodeId>,

    /// Nodes that got a memoized result since the last [`NodeTable::settle`]. Ids whose slot
    /// gets freed are dropped from it.
    touched: FxHashSet<NodeId>,
}

impl NodeTable {
    /// `bits` sets the initial capacity to `2^bits - 1`, which can grow to `2^max_bits - 1`.
    pub(crate) fn new(bits: u32, max_bits: u32, load_factor: f64) -> UniverseResult<Self> {
        // node ids are 32 bits wide
        if bits < 1 || bits > max_bits || max_bits > 31 {
            return Err(UniverseError::TableBits { bits, max_bits });
        }
        if load_factor.is_nan() || load_factor <= 0.0 {
            return Err(UniverseError::LoadFactor(load_factor));
        }

        let mask = (1usize << bits) - 1;
        let nodes = vec![Node::leaf(false), Node::leaf(true)];

        Ok(Self {
            chain: vec![NIL; nodes.len()],
            nodes,
            heads: vec![NIL; mask + 1],
            mask,
            max_mask: (1usize << max_bits) - 1,
            load_factor,
            max_load: (mask as f64 * load_factor) as usize,
            last_id: FIRST_ID,
            root: NodeId::DEAD,
            collections: 0,
            dirty: false,
            free: Vec::new(),
            pins: Vec::new(),
            touched: FxHashSet::default(),
        })
    }

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn quad(&self, id: NodeId) -> Quad {
        self.node(id).quad()
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    /// Keep `id` alive through collections until it gets unpinned.
    #[inline]
    pub(crate) fn pin(&mut self, id: NodeId) {
        self.pins.push(id);
    }

    /// Number of pins, to pass to [`NodeTable::unpin`] later.
    #[inline]
    pub(crate) fn pinned(&self) -> usize {
        self.pins.len()
    }

    /// Drop every pin taken since [`NodeTable::pinned`] returned `depth`.
    #[inline]
    pub(crate) fn unpin(&mut self, depth: usize) {
        self.pins.truncate(depth);
    }

    /// Record that `id` got a memoized result.
    pub(crate) fn touch(&mut self, id: NodeId) {
        self.touched.insert(id);
    }

    /// End of a public operation: drop every pin, including those left behind by an error, and
    /// hand back the touched nodes.
    pub(crate) fn settle(&mut self) -> FxHashSet<NodeId> {
        self.pins.clear();
        std::mem::take(&mut self.touched)
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.mask
    }

    pub(crate) fn max_load(&self) -> usize {
        self.max_load
    }

    pub(crate) fn last_id(&self) -> usize {
        self.last_id
    }

    pub(crate) fn collections(&self) -> u64 {
        self.collections
    }

    /// Number of arena slots, including free ones.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Find the node with children `q`, creating it if needed.
    ///
    /// Panics if the four children are not all on the same level.
    pub(crate) fn canonicalize(&mut self, q: Quad) -> UniverseResult<NodeId> {
        let level = self.node(q.nw).level;
        assert!(
            q.to_array().iter().all(|&c| self.node(c).level == level),
            "children of a node must share a level: {q:?}"
        );

        self.find_or_insert(q, false)
    }

    fn find_or_insert(&mut self, q: Quad, retried: bool) -> UniverseResult<NodeId> {
        if let Some(id) = self.lookup(&q) {
            return Ok(id);
        }

        if self.last_id > self.max_load {
            if retried && self.mask == self.max_mask {
                warn!(capacity = self.mask, "node table is full");

                return Err(UniverseError::TableExhausted {
                    live: self.last_id,
                    capacity: self.mask,
                });
            }

            self.collect(&q);

            return self.find_or_insert(q, true);
        }

        let id = self.push(q)?;
        self.link(id);
        self.last_id += 1;

        Ok(id)
    }

    fn lookup(&self, q: &Quad) -> Option<NodeId> {
        let mut i = self.heads[calc_hash(q) & self.mask];

        while i != NIL {
            let node = &self.nodes[i as usize];
            if node.children.as_ref() == Some(q) {
                return Some(NodeId(i));
            }

            i = self.chain[i as usize];
        }

        None
    }

    /// Allocate an unlinked node in the arena, in a free slot if there is one.
    fn push(&mut self, q: Quad) -> UniverseResult<NodeId> {
        let level = self.node(q.nw).level + 1;
        let population: BigUint = q
            .to_array()
            .iter()
            .map(|&c| &self.node(c).population)
            .sum();
        let node = Node::branch(level, population, q);

        if let Some(i) = self.free.pop() {
            self.nodes[i as usize] = node;
            self.chain[i as usize] = NIL;

            return Ok(NodeId(i));
        }

        let i = self.nodes.len();
        let Some(id) = u32::try_from(i).ok().filter(|&id| id != NIL) else {
            return Err(UniverseError::TableExhausted {
                live: i,
                capacity: self.mask,
            });
        };

        self.nodes.push(node);
        self.chain.push(NIL);

        Ok(NodeId(id))
    }

    /// Append `id` to the tail of its collision chain.
    fn link(&mut self, id: NodeId) {
        let h = calc_hash(&self.quad(id)) & self.mask;

        let mut i = self.heads[h];
        if i == NIL {
            self.heads[h] = id.0;
            return;
        }

        while self.chain[i as usize] != NIL {
            i = self.chain[i as usize];
        }

        self.chain[i as usize] = id.0;
    }

    /// Grow the capacity (unless it's at the ceiling), free every slot that the root, the pins
    /// and the children of `pending` can't reach, and rebuild the index with the rest.
    /// Memoized results are followed as well as children.
    pub(crate) fn collect(&mut self, pending: &Quad) {
        if self.mask < self.max_mask {
            self.mask = (self.mask << 1) | 1;
        }
        self.max_load = (self.mask as f64 * self.load_factor) as usize;

        self.heads.clear();
        self.heads.resize(self.mask + 1, NIL);
        self.chain.fill(NIL);
        self.last_id = FIRST_ID;

        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        stack.extend_from_slice(&self.pins);
        stack.extend(pending.to_array());

        while let Some(id) = stack.pop() {
            let i = id.index();
            if seen[i] {
                continue;
            }
            seen[i] = true;

            let node = &self.nodes[i];
            let Some(q) = node.children else { continue };

            stack.extend(q.to_array());
            stack.extend(node.cache);
            stack.extend(node.quick_cache);

            self.link(id);
            self.last_id += 1;
        }

        // free slots hold a childless placeholder, so they are only freed once
        for (i, node) in self.nodes.iter_mut().enumerate().skip(FIRST_ID) {
            if !seen[i] && node.children.is_some() {
                *node = Node::leaf(false);
                self.free.push(i as u32);
            }
        }
        self.touched.retain(|id| seen[id.index()]);

        self.collections += 1;
        self.dirty = true;

        debug!(
            capacity = self.mask,
            reindexed = self.last_id - FIRST_ID,
            free = self.free.len(),
            arena = self.nodes.len(),
            collections = self.collections,
            "collected node table"
        );
    }

    /// Shrink the arena to the nodes reachable from `roots`, renumbering them in level order.
    ///
    /// Only does work after a collection left free slots behind. Must not run while pins are
    /// held, since pinned ids are not renumbered.
    pub(crate) fn compact<I>(&mut self, roots: I) -> Option<Remap>
    where
        I: IntoIterator<Item = NodeId>,
    {
        if !self.dirty {
            return None;
        }

        debug_assert!(self.pins.is_empty(), "compacting with pins held");

        let before = self.nodes.len();

        // mark
        let mut live = vec![false; before];
        let mut by_level: Vec<Vec<u32>> = Vec::new();
        let mut stack: Vec<NodeId> = roots.into_iter().collect();

        while let Some(id) = stack.pop() {
            let i = id.index();
            if live[i] {
                continue;
            }
            live[i] = true;

            let node = &self.nodes[i];
            let Some(q) = node.children else { continue };

            stack.extend(q.to_array());
            stack.extend(node.cache);
            stack.extend(node.quick_cache);

            let level = node.level as usize;
            if by_level.len() <= level {
                by_level.resize_with(level + 1, Vec::new);
            }
            by_level[level].push(id.0);
        }

        // rebuild, bottom up, so children and memoized results are renumbered before their users
        let mut old = std::mem::take(&mut self.nodes);
        let mut remap = vec![NIL; before];
        remap[NodeId::DEAD.index()] = NodeId::DEAD.0;
        remap[NodeId::LIVE.index()] = NodeId::LIVE.0;

        self.nodes = old.drain(..FIRST_ID).collect();
        self.chain = vec![NIL; FIRST_ID];
        self.heads.fill(NIL);

        for ids in by_level.iter().skip(1) {
            for &i in ids {
                let node = &old[i as usize - FIRST_ID];
                let q = node.quad().map(|c| renumber(&remap, c));
                let cache = node.cache.map(|c| renumber(&remap, c));
                let quick_cache = node.quick_cache.map(|c| renumber(&remap, c));

                debug_assert!(self.lookup(&q).is_none(), "duplicate node {q:?}");

                let id = NodeId(self.nodes.len() as u32);
                let mut node = Node::branch(node.level, node.population.clone(), q);
                node.cache = cache;
                node.quick_cache = quick_cache;

                self.nodes.push(node);
                self.chain.push(NIL);
                self.link(id);

                remap[i as usize] = id.0;
            }
        }

        let remap = Remap(remap);

        self.free.clear();

        self.last_id = self.nodes.len();
        self.root = remap.get(self.root).unwrap_or(NodeId::DEAD);
        self.dirty = false;

        debug!(before, after = self.nodes.len(), "compacted node table");

        Some(remap)
    }

    /// Forget memoized results. `cache` always goes; `quick_cache` only with `also_quick`.
    pub(crate) fn uncache(&mut self, also_quick: bool) {
        self.nodes.par_iter_mut().for_each(|node| {
            node.cache = None;
            if also_quick {
                node.quick_cache = None;
            }
        });
    }

    /// Sum of the four children's populations, for checking the population invariant.
    #[cfg(test)]
    pub(crate) fn child_population(&self, id: NodeId) -> BigUint {
        self.quad(id)
            .to_array()
            .iter()
            .map(|&c| self.node(c).population.clone())
            .sum()
    }
}

/// Id of `id` after renumbering. Everything reachable from a live node is live, so only ids
/// that were already marked get here.
#[inline]
fn renumber(remap: &[u32], id: NodeId) -> NodeId {
    NodeId(remap[id.index()])
}
