use num_bigint::BigUint;
use tracing::info;

use crate::WorldOffset;
use crate::bounds::Bounds;
use crate::error::UniverseResult;
use crate::node::NodeId;
use crate::node::Quad;
use crate::universe::Universe;

/// A cell recentered so that the root's top left corner is `(0, 0)`
type Cell = (u128, u128);

/// Takes `&mut [T]` and a predicate `P: FnMut(&T) -> bool` and partitions the list according to
/// the predicate. Swaps elements of the list such that all elements satisfying `P` appear before
/// any element not satisfying `P`.
///
/// The index `i` returned by the function always points at the first element for which `P` is false.
/// Note that if `P` is trivial, then `i = |list|` points outside the list.
pub(crate) fn partition_in_place<T, P>(list: &mut [T], mut predicate: P) -> usize
where
    P: FnMut(&T) -> bool,
{
    if list.is_empty() {
        return 0;
    }

    let (mut lo, mut hi) = (0, list.len() - 1);

    while lo < hi {
        if predicate(&list[lo]) {
            lo += 1;
            continue;
        }

        if !predicate(&list[hi]) {
            hi -= 1;
            continue;
        }

        list.swap(lo, hi);
        lo += 1;
        hi -= 1;
    }

    if lo < list.len() && predicate(&list[lo]) {
        lo + 1
    } else {
        lo
    }
}

impl Universe {
    /// Replace the contents of the universe with exactly the given live cells, and reset the
    /// generation count. Duplicate cells are fine.
    pub fn load_field(&mut self, cells: &[(WorldOffset, WorldOffset)]) -> UniverseResult<()> {
        let level = Bounds::from_points(cells).level();
        let shift = 1u128 << (level - 1);

        let mut field: Vec<Cell> = cells
            .iter()
            .map(|&(x, y)| {
                (
                    (x as u128).wrapping_add(shift),
                    (y as u128).wrapping_add(shift),
                )
            })
            .collect();

        let root = self.build_field(&mut field, level);
        self.settle();
        self.set_root(root?);
        *self.generation_mut() = BigUint::ZERO;

        self.reclaim();
        self.update_stats();

        info!(cells = cells.len(), level, "loaded field");

        Ok(())
    }

    /// Bucket `cells` into quadrants, one coordinate bit per level, down to level 2.
    fn build_field(&mut self, cells: &mut [Cell], level: u32) -> UniverseResult<NodeId> {
        if cells.is_empty() {
            return self.empty_tree(level);
        }

        if level == 2 {
            return self.level2_setup(cells);
        }

        let bit = 1u128 << (level - 1);

        let i = partition_in_place(cells, |&(_, y)| y & bit == 0);
        let (north, south) = cells.split_at_mut(i);

        let i = partition_in_place(north, |&(x, _)| x & bit == 0);
        let (nw, ne) = north.split_at_mut(i);

        let i = partition_in_place(south, |&(x, _)| x & bit == 0);
        let (sw, se) = south.split_at_mut(i);

        let depth = self.pinned();

        let mut quads = [NodeId::DEAD; 4];
        for (id, part) in quads.iter_mut().zip([nw, ne, sw, se]) {
            *id = self.build_field(part, level - 1)?;
            self.pin(*id);
        }

        let [nw, ne, sw, se] = quads;
        let id = self.canonicalize(Quad::new(nw, ne, sw, se))?;
        self.unpin(depth);

        Ok(id)
    }

    /// Level 2 node holding `cells`, which all lie in the same 4x4 block.
    fn level2_setup(&mut self, cells: &[Cell]) -> UniverseResult<NodeId> {
        // bit x0 | y0 << 1 | x1 << 2 | y1 << 3, so each nibble is one level 1 quadrant
        let mut set = 0u16;
        for &(x, y) in cells {
            let i = (x & 1) | (y & 1) << 1 | (x & 2) << 1 | (y & 2) << 2;
            set |= 1u16 << i;
        }

        self.sync_caches();
        if let Some(&id) = self.level2_cache.get(&set) {
            return Ok(id);
        }

        let depth = self.pinned();

        let mut quads = [NodeId::DEAD; 4];
        for (i, id) in quads.iter_mut().enumerate() {
            *id = self.level1((set >> (4 * i)) as u8)?;
            self.pin(*id);
        }

        let [nw, ne, sw, se] = quads;
        let id = self.canonicalize(Quad::new(nw, ne, sw, se))?;
        self.unpin(depth);
        self.level2_cache.insert(set, id);

        Ok(id)
    }
}
