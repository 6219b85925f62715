use num_bigint::BigInt;
use num_bigint::BigUint;
use num_bigint::Sign;
use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use tracing::debug;
use tracing::trace;

use crate::UNIVERSE_LEVEL_LIMIT;
use crate::bounds::Bounds;
use crate::bounds::compute_bounds;
use crate::bounds::pow2;
use crate::config::Config;
use crate::error::UniverseError;
use crate::error::UniverseResult;
use crate::node::Node;
use crate::node::NodeId;
use crate::node::Quad;
use crate::rule_set::RuleSet;
use crate::stats::Stats;
use crate::table::NodeTable;
use crate::table::Remap;

/// Nodes whose contents were computed during a step: every node that got a new memoized result,
/// and that result. A renderer can keep drawing everything else from its caches.
pub type Changed = FxHashSet<NodeId>;

/// The smallest root the universe starts with, `[-4, 4)` on both axes
const MIN_LEVEL: u32 = 3;

/// A Life-like universe stored as a canonical quadtree.
///
/// The root is centered on the origin: a root of level `L` covers `[-2^(L-1), 2^(L-1))` on both
/// axes, with `x` growing east and `y` growing south.
///
/// [`NodeId`]s handed out by a universe stay valid until the next call that takes `&mut self`.
pub struct Universe {
    table: NodeTable,
    root: NodeId,

    rule: RuleSet,

    /// Each step advances `2^step` generations
    step: u32,

    generation: BigUint,

    /// `empty_trees[l]` is the empty node of level `l`
    empty_trees: Vec<NodeId>,

    /// Level 2 nodes built by the field loader, by their 16 cells
    pub(crate) level2_cache: FxHashMap<u16, NodeId>,

    /// Table collections seen by `empty_trees` and `level2_cache`. A collection may free what
    /// they point to, so both are dropped when the table has collected since.
    synced: u64,

    stats: Stats,
}

impl Universe {
    /// Create an empty universe with the default [`Config`]
    pub fn new() -> UniverseResult<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> UniverseResult<Self> {
        check_step(config.step)?;
        let table = NodeTable::new(config.table_bits, config.max_table_bits, config.load_factor)?;

        let mut universe = Self {
            table,
            root: NodeId::DEAD,
            rule: config.rule,
            step: config.step,
            generation: BigUint::ZERO,
            empty_trees: vec![NodeId::DEAD],
            level2_cache: FxHashMap::default(),
            synced: 0,
            stats: Stats::default(),
        };

        let root = universe.empty_tree(MIN_LEVEL)?;
        universe.set_root(root);
        universe.update_stats();

        Ok(universe)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Read-only view of a node, for walking the tree.
    pub fn node(&self, id: NodeId) -> &Node {
        self.table.node(id)
    }

    pub fn generation(&self) -> &BigUint {
        &self.generation
    }

    pub fn population(&self) -> &BigUint {
        self.node(self.root).population()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn rule(&self) -> RuleSet {
        self.rule
    }

    /// Each call to [`Universe::step`] advances `2^step` generations.
    pub fn step_exponent(&self) -> u32 {
        self.step
    }

    /// Change the number of generations per step to `2^step`. Forgets every memoized full step,
    /// since those were computed for the old step size.
    ///
    /// Fails with [`UniverseError::LevelLimit`] if a root large enough for such a step would be
    /// past [`UNIVERSE_LEVEL_LIMIT`].
    pub fn set_step(&mut self, step: u32) -> UniverseResult<()> {
        check_step(step)?;
        if step == self.step {
            return Ok(());
        }

        debug!(from = self.step, to = step, "changing step size");

        self.step = step;
        self.table.uncache(false);
        self.update_stats();

        Ok(())
    }

    /// Switch to another rule. Forgets every memoized result.
    pub fn set_rule(&mut self, rule: RuleSet) {
        if rule == self.rule {
            return;
        }

        debug!(from = %self.rule, to = %rule, "changing rule");

        self.rule = rule;
        self.table.uncache(true);
    }

    /// Minimal bounding box of the live cells, [`Bounds::zero`] when there are none.
    pub fn root_bounds(&self) -> Bounds {
        compute_bounds(&self.table, self.root)
    }

    /// Advance the universe by `2^step` generations.
    ///
    /// Returns the nodes computed along the way, see [`Changed`].
    pub fn step(&mut self) -> UniverseResult<Changed> {
        let root = self.expand().and_then(|()| self.advance(self.root));
        let mut changed = self.table.settle();

        self.set_root(root?);

        self.generation += BigUint::from(1u8) << self.step;

        if let Some(remap) = self.reclaim() {
            changed = changed.into_iter().filter_map(|id| remap.get(id)).collect();
        }
        self.update_stats();

        Ok(changed)
    }

    /// Whether the cell at `(x, y)` is alive. Cells outside the universe are dead.
    pub fn get_cell(&self, x: impl Into<BigInt>, y: impl Into<BigInt>) -> bool {
        let (mut x, mut y) = (x.into(), y.into());

        let mut id = self.root;
        if !covers(self.node(id).level(), &x, &y) {
            return false;
        }

        while let Some(q) = self.node(id).children() {
            let level = self.node(id).level();
            let quadrant = descend(level, &mut x, &mut y);

            id = match quadrant {
                Quadrant::Nw => q.nw,
                Quadrant::Ne => q.ne,
                Quadrant::Sw => q.sw,
                Quadrant::Se => q.se,
            };
        }

        id == NodeId::LIVE
    }

    /// Set the cell at `(x, y)`. The universe grows as needed to fit a live cell; clearing a cell
    /// outside of it does nothing.
    pub fn set_cell(
        &mut self,
        x: impl Into<BigInt>,
        y: impl Into<BigInt>,
        alive: bool,
    ) -> UniverseResult<()> {
        let placed = self.place_cell(x.into(), y.into(), alive);
        self.table.settle();
        placed?;

        self.reclaim();
        self.update_stats();

        Ok(())
    }

    fn place_cell(&mut self, x: BigInt, y: BigInt, alive: bool) -> UniverseResult<()> {
        while !covers(self.node(self.root).level(), &x, &y) {
            if !alive {
                return Ok(());
            }

            self.expand_once()?;
        }

        let root = self.set_cell_in(self.root, x, y, alive)?;
        self.set_root(root);

        Ok(())
    }

    fn set_cell_in(
        &mut self,
        id: NodeId,
        mut x: BigInt,
        mut y: BigInt,
        alive: bool,
    ) -> UniverseResult<NodeId> {
        let node = self.node(id);
        let level = node.level();
        let Some(mut q) = node.children() else {
            return Ok(NodeId::leaf(alive));
        };

        let quadrant = descend(level, &mut x, &mut y);
        let child = match quadrant {
            Quadrant::Nw => &mut q.nw,
            Quadrant::Ne => &mut q.ne,
            Quadrant::Sw => &mut q.sw,
            Quadrant::Se => &mut q.se,
        };
        *child = self.set_cell_in(*child, x, y, alive)?;

        self.canonicalize(q)
    }

    /// Every live cell, as `(x, y)`.
    pub fn live_cells(&self) -> Vec<(BigInt, BigInt)> {
        let level = self.node(self.root).level();
        let origin = -pow2(level.saturating_sub(1));

        let mut cells = Vec::new();
        self.collect_cells(self.root, &origin, &origin, &mut cells);

        cells
    }

    /// Push the live cells of `id`, whose top left corner is at `(left, top)`.
    pub(crate) fn collect_cells(
        &self,
        id: NodeId,
        left: &BigInt,
        top: &BigInt,
        cells: &mut Vec<(BigInt, BigInt)>,
    ) {
        let node = self.node(id);
        if node.is_empty() {
            return;
        }

        let Some(q) = node.children() else {
            cells.push((left.clone(), top.clone()));
            return;
        };

        let half = pow2(node.level() - 1);
        let (mid_x, mid_y) = (left + &half, top + &half);

        self.collect_cells(q.nw, left, top, cells);
        self.collect_cells(q.ne, &mid_x, top, cells);
        self.collect_cells(q.sw, left, &mid_y, cells);
        self.collect_cells(q.se, &mid_x, &mid_y, cells);
    }

    pub(crate) fn canonicalize(&mut self, q: Quad) -> UniverseResult<NodeId> {
        self.table.canonicalize(q)
    }

    /// The empty node of the given level
    pub(crate) fn empty_tree(&mut self, level: u32) -> UniverseResult<NodeId> {
        self.sync_caches();

        while self.empty_trees.len() <= level as usize {
            let t = self.empty_trees[self.empty_trees.len() - 1];
            let next = self.canonicalize(Quad::splat(t))?;

            self.empty_trees.push(next);
        }

        Ok(self.empty_trees[level as usize])
    }

    /// Level 1 node from the low 4 bits of `bits`, in nw, ne, sw, se order.
    pub(crate) fn level1(&mut self, bits: u8) -> UniverseResult<NodeId> {
        let leaf = |i: u8| NodeId::leaf(bits & (1 << i) != 0);

        self.canonicalize(Quad::new(leaf(0), leaf(1), leaf(2), leaf(3)))
    }

    /// See [`NodeTable::pinned`].
    pub(crate) fn pinned(&self) -> usize {
        self.table.pinned()
    }

    pub(crate) fn pin(&mut self, id: NodeId) {
        self.table.pin(id);
    }

    pub(crate) fn unpin(&mut self, depth: usize) {
        self.table.unpin(depth);
    }

    /// Drop every pin and take the touched nodes, at the end of a public operation.
    pub(crate) fn settle(&mut self) -> Changed {
        self.table.settle()
    }

    /// Forget cached node ids if the table collected since they were stored.
    pub(crate) fn sync_caches(&mut self) {
        let collections = self.table.collections();
        if collections == self.synced {
            return;
        }

        self.empty_trees.truncate(1);
        self.level2_cache.clear();
        self.synced = collections;
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
        self.table.set_root(root);
    }

    pub(crate) fn generation_mut(&mut self) -> &mut BigUint {
        &mut self.generation
    }

    /// Compact the node table if a collection ran, and renumber every handle we hold.
    ///
    /// Returns the renumbering so callers can fix up handles of their own.
    pub(crate) fn reclaim(&mut self) -> Option<Remap> {
        self.sync_caches();

        let roots = std::iter::once(self.root)
            .chain(self.empty_trees.iter().copied())
            .chain(self.level2_cache.values().copied());

        let remap = self.table.compact(roots)?;

        self.root = remap.root(self.root);
        for t in &mut self.empty_trees {
            *t = remap.root(*t);
        }
        for id in self.level2_cache.values_mut() {
            *id = remap.root(*id);
        }
        self.table.set_root(self.root);

        Some(remap)
    }

    pub(crate) fn update_stats(&mut self) {
        self.stats = Stats::gather(&self.table, self.root, self.step, &self.generation);
    }

    fn expand(&mut self) -> UniverseResult<()> {
        while self.needs_expansion() {
            self.expand_once()?;
        }

        Ok(())
    }

    /// Whether stepping could push live cells past the edge of the root.
    ///
    /// Content that stays inside the center half of each quadrant is known to be safe, which is
    /// checked by comparing each quadrant's population with that of its innermost grandchild.
    fn needs_expansion(&self) -> bool {
        let root = self.node(self.root);
        if root.level() <= self.step + 2 {
            return true;
        }

        let t = &self.table;
        let q = root.quad();

        let crowded = |corner: NodeId, inward: fn(Quad) -> NodeId| {
            let inner = inward(t.quad(inward(t.quad(corner))));
            t.node(corner).population() != t.node(inner).population()
        };

        crowded(q.nw, |q| q.se)
            || crowded(q.ne, |q| q.sw)
            || crowded(q.sw, |q| q.ne)
            || crowded(q.se, |q| q.nw)
    }

    /// Double the side of the root, keeping its contents centered.
    fn expand_once(&mut self) -> UniverseResult<()> {
        let level = self.node(self.root).level();
        if level >= UNIVERSE_LEVEL_LIMIT {
            return Err(UniverseError::LevelLimit {
                level: level + 1,
                limit: UNIVERSE_LEVEL_LIMIT,
            });
        }

        let Quad { nw, ne, sw, se } = self.table.quad(self.root);

        let depth = self.table.pinned();
        let t = self.empty_tree(level - 1)?;
        self.table.pin(t);

        let mut corners = [NodeId::DEAD; 4];
        let framed = [
            Quad::new(t, t, t, nw),
            Quad::new(t, t, ne, t),
            Quad::new(t, sw, t, t),
            Quad::new(se, t, t, t),
        ];
        for (c, q) in corners.iter_mut().zip(framed) {
            *c = self.canonicalize(q)?;
            self.table.pin(*c);
        }

        let [nw, ne, sw, se] = corners;
        let root = self.canonicalize(Quad::new(nw, ne, sw, se))?;
        self.table.unpin(depth);
        self.set_root(root);

        trace!(level = level + 1, "expanded universe");

        Ok(())
    }

    /// The nine overlapping half-size squares of a node of level 2 or more, row by row.
    fn windows(&self, id: NodeId) -> [Quad; 9] {
        let Quad { nw, ne, sw, se } = self.table.quad(id);
        let (nw, ne, sw, se) = (
            self.table.quad(nw),
            self.table.quad(ne),
            self.table.quad(sw),
            self.table.quad(se),
        );

        [
            nw,
            Quad::new(nw.ne, ne.nw, nw.se, ne.sw),
            ne,
            Quad::new(nw.sw, nw.se, sw.nw, sw.ne),
            Quad::new(nw.se, ne.sw, sw.ne, se.nw),
            Quad::new(ne.sw, ne.se, se.nw, se.ne),
            sw,
            Quad::new(sw.ne, se.nw, sw.se, se.sw),
            se,
        ]
    }

    /// Center half of the square with quadrants `w`, one level below it.
    fn center(&mut self, w: Quad) -> UniverseResult<NodeId> {
        let (nw, ne, sw, se) = (
            self.table.quad(w.nw),
            self.table.quad(w.ne),
            self.table.quad(w.sw),
            self.table.quad(w.se),
        );

        self.canonicalize(Quad::new(nw.se, ne.sw, sw.ne, se.nw))
    }

    /// Advance the four overlapping 2x2 groups of `n` and join the results.
    ///
    /// The nodes of `n` must be pinned by the caller.
    fn join<F>(&mut self, n: [NodeId; 9], mut next: F) -> UniverseResult<NodeId>
    where
        F: FnMut(&mut Self, NodeId) -> UniverseResult<NodeId>,
    {
        let depth = self.table.pinned();

        let groups = [
            Quad::new(n[0], n[1], n[3], n[4]),
            Quad::new(n[1], n[2], n[4], n[5]),
            Quad::new(n[3], n[4], n[6], n[7]),
            Quad::new(n[4], n[5], n[7], n[8]),
        ];

        let mut res = [NodeId::DEAD; 4];
        for (r, g) in res.iter_mut().zip(groups) {
            let g = self.canonicalize(g)?;
            self.table.pin(g);
            *r = next(self, g)?;
            self.table.pin(*r);
        }

        let [nw, ne, sw, se] = res;
        let joined = self.canonicalize(Quad::new(nw, ne, sw, se))?;
        self.table.unpin(depth);

        Ok(joined)
    }

    /// The center of `id` advanced by `2^step` generations, one level below it.
    ///
    /// `id` must be at least 2 levels above `step`, and reachable from the root or pinned.
    pub(crate) fn advance(&mut self, id: NodeId) -> UniverseResult<NodeId> {
        let node = self.node(id);
        if let Some(next) = node.cache {
            return Ok(next);
        }

        let level = node.level();
        debug_assert!(level >= self.step + 2, "level {level} is too small to step");
        if level == self.step + 2 {
            return self.advance_quick(id);
        }

        let depth = self.table.pinned();

        let mut centers = [NodeId::DEAD; 9];
        for (c, w) in centers.iter_mut().zip(self.windows(id)) {
            *c = self.center(w)?;
            self.table.pin(*c);
        }

        let next = self.join(centers, Self::advance)?;
        self.table.unpin(depth);

        self.table.touch(id);
        self.table.touch(next);
        self.table.node_mut(id).cache = Some(next);

        Ok(next)
    }

    /// The center of `id` advanced by `2^(level - 2)` generations, one level below it.
    pub(crate) fn advance_quick(&mut self, id: NodeId) -> UniverseResult<NodeId> {
        let node = self.node(id);
        if let Some(next) = node.quick_cache {
            return Ok(next);
        }

        let next = if node.level() == 2 {
            self.level2_next(id)?
        } else {
            let depth = self.table.pinned();
            let corners = self.table.quad(id);

            let mut stepped = [NodeId::DEAD; 9];
            for (i, (s, w)) in stepped.iter_mut().zip(self.windows(id)).enumerate() {
                let window = match i {
                    0 => corners.nw,
                    2 => corners.ne,
                    6 => corners.sw,
                    8 => corners.se,
                    _ => self.canonicalize(w)?,
                };

                self.table.pin(window);
                *s = self.advance_quick(window)?;
                self.table.pin(*s);
            }

            let next = self.join(stepped, Self::advance_quick)?;
            self.table.unpin(depth);

            next
        };

        self.table.node_mut(id).quick_cache = Some(next);

        Ok(next)
    }

    /// One generation of the 2x2 center of a level 2 node.
    fn level2_next(&mut self, id: NodeId) -> UniverseResult<NodeId> {
        let Quad { nw, ne, sw, se } = self.table.quad(id);
        let (nw, ne, sw, se) = (
            self.table.quad(nw),
            self.table.quad(ne),
            self.table.quad(sw),
            self.table.quad(se),
        );

        #[rustfmt::skip]
        let cells = [
            nw.nw, nw.ne, ne.nw, ne.ne,
            nw.sw, nw.se, ne.sw, ne.se,
            sw.nw, sw.ne, se.nw, se.ne,
            sw.sw, sw.se, se.sw, se.se,
        ];

        let block = cells
            .iter()
            .fold(0u16, |acc, &c| acc << 1 | (c == NodeId::LIVE) as u16);

        self.level1(self.rule.next_center(block))
    }
}

/// A step of `2^step` generations needs a root of level `step + 3`.
fn check_step(step: u32) -> UniverseResult<()> {
    let level = step.saturating_add(3);
    if level > UNIVERSE_LEVEL_LIMIT {
        return Err(UniverseError::LevelLimit {
            level,
            limit: UNIVERSE_LEVEL_LIMIT,
        });
    }

    Ok(())
}

enum Quadrant {
    Nw,
    Ne,
    Sw,
    Se,
}

/// Whether a root of level `level` contains `(x, y)`.
fn covers(level: u32, x: &BigInt, y: &BigInt) -> bool {
    let half = pow2(level.saturating_sub(1));
    let lo = -&half;

    *x >= lo && *x < half && *y >= lo && *y < half
}

/// Pick the quadrant of a node of level `level` that holds `(x, y)`, given relative to the node's
/// center, and move the coordinates to be relative to that quadrant's center.
fn descend(level: u32, x: &mut BigInt, y: &mut BigInt) -> Quadrant {
    let offset = if level <= 1 {
        BigInt::ZERO
    } else {
        pow2(level - 2)
    };

    let west = x.sign() == Sign::Minus;
    let north = y.sign() == Sign::Minus;

    if west {
        *x += &offset;
    } else {
        *x -= &offset;
    }
    if north {
        *y += &offset;
    } else {
        *y -= &offset;
    }

    match (west, north) {
        (true, true) => Quadrant::Nw,
        (false, true) => Quadrant::Ne,
        (true, false) => Quadrant::Sw,
        (false, false) => Quadrant::Se,
    }
}
