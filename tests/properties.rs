mod common;

use std::collections::HashMap;

use common::Cells;
use common::live;
use common::naive;
use macrocell::Config;
use macrocell::NodeId;
use macrocell::Quad;
use macrocell::Universe;
use macrocell::WorldOffset;
use num_bigint::BigInt;
use num_bigint::BigUint;
use proptest::prelude::*;

fn soup() -> impl Strategy<Value = Vec<(WorldOffset, WorldOffset)>> {
    proptest::collection::vec((-6i128..6, -6i128..6), 0..40)
}

fn reachable(u: &Universe) -> Vec<NodeId> {
    let mut seen = std::collections::HashSet::new();
    let mut stack = vec![u.root()];

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }

        if let Some(q) = u.node(id).children() {
            stack.extend(q.to_array());
        }
    }

    seen.into_iter().collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn matches_reference(pattern in soup(), step in 0u32..3) {
        let mut u = Universe::with_config(Config::default().with_step(step)).unwrap();
        u.load_field(&pattern).unwrap();

        let start: Cells = common::cells(&pattern);
        u.step().unwrap();

        prop_assert_eq!(live(&u), naive(&start, 1 << step));
        prop_assert_eq!(u.generation(), &BigUint::from(1u32 << step));
    }

    #[test]
    fn population_is_sum_of_children(pattern in soup(), steps in 0usize..6) {
        let mut u = Universe::with_config(Config::default().with_table_bits(4)).unwrap();
        u.load_field(&pattern).unwrap();
        for _ in 0..steps {
            u.step().unwrap();
        }

        for id in reachable(&u) {
            let node = u.node(id);
            match node.children() {
                Some(q) => {
                    let sum: BigUint = q.to_array().iter().map(|&c| u.node(c).population()).sum();
                    prop_assert_eq!(node.population(), &sum);
                }
                None => prop_assert!(node.population() <= &BigUint::from(1u8)),
            }
        }
    }

    #[test]
    fn nodes_are_unique(pattern in soup(), steps in 0usize..6) {
        let mut u = Universe::with_config(Config::default().with_table_bits(4)).unwrap();
        u.load_field(&pattern).unwrap();
        for _ in 0..steps {
            u.step().unwrap();
        }

        let mut by_children: HashMap<Quad, NodeId> = HashMap::new();
        for id in reachable(&u) {
            if let Some(q) = u.node(id).children() {
                let prev = by_children.insert(q, id);
                prop_assert!(prev.is_none() || prev == Some(id), "{q:?} is stored twice");
            }
        }
    }

    #[test]
    fn bounds_are_tight(pattern in soup()) {
        let mut u = Universe::new().unwrap();
        u.load_field(&pattern).unwrap();

        let b = u.root_bounds();
        let cells = common::cells(&pattern);

        if cells.is_empty() {
            prop_assert_eq!(b, macrocell::Bounds::zero());
        } else {
            let xs = cells.iter().map(|c| c.0);
            let ys = cells.iter().map(|c| c.1);
            prop_assert_eq!(b.left, BigInt::from(xs.clone().min().unwrap()));
            prop_assert_eq!(b.right, BigInt::from(xs.max().unwrap()));
            prop_assert_eq!(b.top, BigInt::from(ys.clone().min().unwrap()));
            prop_assert_eq!(b.bottom, BigInt::from(ys.max().unwrap()));
        }
    }

    #[test]
    fn set_cell_matches_load(pattern in soup()) {
        let mut loaded = Universe::new().unwrap();
        loaded.load_field(&pattern).unwrap();

        let mut edited = Universe::new().unwrap();
        for &(x, y) in &pattern {
            edited.set_cell(x, y, true).unwrap();
        }

        prop_assert_eq!(live(&loaded), live(&edited));
        for &(x, y) in &pattern {
            prop_assert!(edited.get_cell(x, y));
        }
    }
}
