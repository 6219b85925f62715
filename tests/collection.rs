mod common;

use common::GLIDER;
use common::R_PENTOMINO;
use common::cells;
use common::init_tracing;
use common::live;
use common::naive;
use macrocell::Config;
use macrocell::Universe;
use macrocell::WorldOffset;

fn pair(pattern: &[(WorldOffset, WorldOffset)]) -> anyhow::Result<(Universe, Universe)> {
    let mut tiny = Universe::with_config(Config::default().with_table_bits(4))?;
    let mut roomy = Universe::with_config(Config::default().with_table_bits(22))?;

    tiny.load_field(pattern)?;
    roomy.load_field(pattern)?;

    Ok((tiny, roomy))
}

#[test]
fn collection_is_transparent() -> anyhow::Result<()> {
    init_tracing();

    let (mut tiny, mut roomy) = pair(&R_PENTOMINO)?;
    let mut reference = cells(&R_PENTOMINO);

    for generation in 1..=120u64 {
        tiny.step()?;
        roomy.step()?;

        assert_eq!(tiny.population(), roomy.population(), "generation {generation}");
        assert_eq!(tiny.root_bounds(), roomy.root_bounds(), "generation {generation}");

        if generation % 20 == 0 {
            reference = naive(&reference, 20);
            assert_eq!(live(&tiny), reference, "generation {generation}");
        }
    }

    assert!(tiny.stats().collections > 0);
    assert_eq!(roomy.stats().collections, 0);

    Ok(())
}

#[test]
fn collection_with_large_steps() -> anyhow::Result<()> {
    init_tracing();

    let (mut tiny, mut roomy) = pair(&R_PENTOMINO)?;
    tiny.set_step(3)?;
    roomy.set_step(3)?;

    for _ in 0..25 {
        tiny.step()?;
        roomy.step()?;

        assert_eq!(live(&tiny), live(&roomy));
        assert_eq!(tiny.stats().generation, roomy.stats().generation);
    }

    assert!(tiny.stats().collections > 0);

    Ok(())
}

#[test]
fn handles_survive_collection() -> anyhow::Result<()> {
    let (mut tiny, _) = pair(&GLIDER)?;

    for _ in 0..40 {
        let changed = tiny.step()?;

        let root = tiny.root();
        assert_eq!(tiny.node(root).population(), tiny.population());
        for id in changed {
            let node = tiny.node(id);
            assert!(node.level() >= 1);
        }
    }

    assert_eq!(live(&tiny), common::shifted(&cells(&GLIDER), 10, 10));

    Ok(())
}

#[test]
fn stats_track_the_table() -> anyhow::Result<()> {
    let (mut tiny, _) = pair(&R_PENTOMINO)?;
    let before = tiny.stats().max_load;

    for _ in 0..50 {
        tiny.step()?;
    }

    let stats = tiny.stats();
    assert!(stats.max_load > before);
    assert!(stats.last_id >= 2);
    assert_eq!(&stats.population, tiny.population());

    Ok(())
}
