use std::fmt::Display;

use num_bigint::BigInt;
use num_bigint::BigUint;

use crate::bounds::compute_bounds;
use crate::node::NodeId;
use crate::table::NodeTable;

/// Summary of a universe, refreshed after every call that changes its contents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Level of the root
    pub level: u32,

    /// Generations per step, `2^step`
    pub step: BigUint,

    pub generation: BigUint,
    pub population: BigUint,

    /// Size of the bounding box of the live cells, `0` when there are none
    pub width: BigInt,
    pub height: BigInt,

    /// Node table state
    pub max_load: usize,
    pub last_id: usize,
    pub collections: u64,
}

impl Stats {
    pub(crate) fn gather(table: &NodeTable, root: NodeId, step: u32, generation: &BigUint) -> Self {
        let node = table.node(root);

        let (width, height) = if node.is_empty() {
            (BigInt::ZERO, BigInt::ZERO)
        } else {
            let bounds = compute_bounds(table, root);
            (bounds.width(), bounds.height())
        };

        Self {
            level: node.level(),
            step: BigUint::from(1u8) << step,
            generation: generation.clone(),
            population: node.population().clone(),
            width,
            height,
            max_load: table.max_load(),
            last_id: table.last_id(),
            collections: table.collections(),
        }
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "generation {} (+{}), population {}, {}x{}, level {}, nodes {}/{}",
            self.generation,
            self.step,
            self.population,
            self.width,
            self.height,
            self.level,
            self.last_id,
            self.max_load
        )
    }
}
