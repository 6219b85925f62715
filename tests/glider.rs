mod common;

use common::BLOCK;
use common::GLIDER;
use common::cells;
use common::init_tracing;
use common::live;
use common::render;
use common::shifted;
use macrocell::Universe;
use num_bigint::BigInt;
use num_bigint::BigUint;

fn bounds_of(u: &Universe) -> (BigInt, BigInt, BigInt, BigInt) {
    let b = u.root_bounds();
    (b.top, b.left, b.bottom, b.right)
}

fn big(top: i64, left: i64, bottom: i64, right: i64) -> (BigInt, BigInt, BigInt, BigInt) {
    (top.into(), left.into(), bottom.into(), right.into())
}

#[test]
fn glider_round_trip() -> anyhow::Result<()> {
    init_tracing();

    let mut u = Universe::new()?;
    u.load_field(&GLIDER)?;

    insta::assert_snapshot!(render(&live(&u)), @".#./..#/###");
    assert_eq!(bounds_of(&u), big(0, 0, 2, 2));

    for _ in 0..4 {
        u.step()?;
        assert_eq!(u.population(), &BigUint::from(5u8));
    }

    assert_eq!(u.generation(), &BigUint::from(4u8));
    assert_eq!(live(&u), shifted(&cells(&GLIDER), 1, 1));
    insta::assert_snapshot!(render(&live(&u)), @".#./..#/###");
    assert_eq!(bounds_of(&u), big(1, 1, 3, 3));

    Ok(())
}

#[test]
fn glider_phases() -> anyhow::Result<()> {
    let mut u = Universe::new()?;
    u.load_field(&GLIDER)?;

    let mut phases = Vec::new();
    for _ in 0..4 {
        u.step()?;
        phases.push(render(&live(&u)));
    }

    insta::assert_snapshot!(phases.join(" "), @"#.#/.##/.#. ..#/#.#/.## #../.##/##. .#./..#/###");

    Ok(())
}

#[test]
fn block_is_still() -> anyhow::Result<()> {
    let mut u = Universe::new()?;
    u.load_field(&BLOCK)?;

    for step in [0, 0, 3, 5, 1] {
        u.set_step(step)?;
        u.step()?;

        assert_eq!(u.population(), &BigUint::from(4u8));
        assert_eq!(bounds_of(&u), big(0, 0, 1, 1));
    }

    assert_eq!(u.generation(), &BigUint::from(1u8 + 1 + 8 + 32 + 2));

    Ok(())
}

#[test]
fn extremal_bounds() -> anyhow::Result<()> {
    let mut u = Universe::new()?;
    u.load_field(&[(-3, -3), (3, 3), (0, 0)])?;

    assert_eq!(bounds_of(&u), big(-3, -3, 3, 3));
    assert_eq!(u.stats().width, BigInt::from(7));
    assert_eq!(u.stats().height, BigInt::from(7));

    Ok(())
}

#[test]
fn empty_universe() -> anyhow::Result<()> {
    let mut u = Universe::new()?;
    u.step()?;
    u.step()?;

    assert!(u.live_cells().is_empty());
    assert_eq!(bounds_of(&u), big(0, 0, 0, 0));
    assert_eq!(u.stats().width, BigInt::ZERO);
    assert_eq!(u.generation(), &BigUint::from(2u8));

    Ok(())
}

#[test]
fn glider_large_step() -> anyhow::Result<()> {
    let mut u = Universe::new()?;
    u.load_field(&GLIDER)?;
    u.set_step(10)?;

    u.step()?;
    assert_eq!(u.generation(), &BigUint::from(1024u32));
    assert_eq!(live(&u), shifted(&cells(&GLIDER), 256, 256));

    u.step()?;
    assert_eq!(live(&u), shifted(&cells(&GLIDER), 512, 512));
    assert_eq!(u.stats().step, BigUint::from(1024u32));

    Ok(())
}

#[test]
fn glider_very_large_step() -> anyhow::Result<()> {
    let mut u = Universe::new()?;
    u.load_field(&GLIDER)?;
    u.set_step(100)?;

    u.step()?;

    let travelled = BigInt::from(1) << 98;
    let want: Vec<_> = GLIDER
        .iter()
        .map(|&(x, y)| (BigInt::from(x) + &travelled, BigInt::from(y) + &travelled))
        .collect();

    let mut got = u.live_cells();
    got.sort();
    let mut want = want;
    want.sort();

    assert_eq!(got, want);
    assert_eq!(u.population(), &BigUint::from(5u8));

    Ok(())
}

#[test]
fn expansion_keeps_edge_cells() -> anyhow::Result<()> {
    // fills the corner of the smallest universe
    let corner = BLOCK.map(|(x, y)| (x + 2, y + 2));

    let mut u = Universe::new()?;
    u.load_field(&corner)?;
    assert_eq!(u.node(u.root()).level(), 3);

    for step in [0, 1, 0, 4, 2, 0] {
        u.set_step(step)?;
        u.step()?;

        assert_eq!(u.population(), &BigUint::from(4u8));
        assert_eq!(live(&u), cells(&corner));
    }

    Ok(())
}

#[test]
fn step_reports_changed_nodes() -> anyhow::Result<()> {
    let mut u = Universe::new()?;
    u.load_field(&GLIDER)?;

    let changed = u.step()?;
    assert!(changed.contains(&u.root()));

    for id in &changed {
        // every handle is usable after the step
        let _ = u.node(*id).population();
    }

    Ok(())
}

#[test]
fn cell_edits_then_step() -> anyhow::Result<()> {
    let mut u = Universe::new()?;
    for &(x, y) in &GLIDER {
        u.set_cell(x, y, true)?;
    }
    assert_eq!(live(&u), cells(&GLIDER));

    u.set_step(2)?;
    u.step()?;
    assert_eq!(live(&u), shifted(&cells(&GLIDER), 1, 1));

    // kill the glider's tail
    u.set_cell(1, 3, false)?;
    assert!(!u.get_cell(1, 3));
    assert_eq!(u.population(), &BigUint::from(4u8));

    Ok(())
}
