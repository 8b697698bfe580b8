//! Simulated host for the cellmeta attribute store.
//!
//! Runs the reference push and explosion scenarios, a seeded random run of
//! pushers with an invariant check, and a chunk save/load round trip, then
//! prints the final attribute tables as JSON.

mod world;

use cellmeta_config::{CliArgs, Config, RelocationConfig, default_config_dir};
use cellmeta_relocate::EventOutcome;
use cellmeta_store::{CellPos, Direction};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use tracing::{error, info, warn};

use world::{DemoError, Host, SimWorld};

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args
        .config
        .clone()
        .or_else(default_config_dir)
        .unwrap_or_else(|| std::path::PathBuf::from(".cellmeta"));

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    cellmeta_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    info!(
        placement = ?config.relocation.write_placement,
        seed = config.demo.seed,
        "cellmeta demo starting"
    );

    if let Err(e) = run(&config) {
        error!("demo failed: {e}");
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), DemoError> {
    let relocation = &config.relocation;

    demonstrate_line_push(relocation)?;
    demonstrate_destroyed_in_place(relocation)?;
    demonstrate_explosion(relocation)?;
    demonstrate_destructive_events(relocation)?;
    let mut host = demonstrate_random_run(config)?;
    demonstrate_chunk_round_trip(&mut host)?;

    println!("{}", host.tables_json()?);
    Ok(())
}

fn p(x: i32, y: i32, z: i32) -> CellPos {
    CellPos::new(x, y, z)
}

/// Tags a line of stone with ids `1..=len` starting at the origin.
fn stone_line(host: &mut Host, len: i32) -> Result<(), DemoError> {
    let stone = host.world.palette().stone;
    for x in 0..len {
        host.world.set(p(x, 0, 0), stone);
        host.tag(p(x, 0, 0), "id", x + 1)?;
    }
    Ok(())
}

fn expect_id(host: &mut Host, pos: CellPos, expected: Option<i32>) -> Result<(), DemoError> {
    let actual = host.attribute(pos, "id")?;
    if actual != expected {
        return Err(DemoError::Invariant(format!(
            "expected id {expected:?} at {pos}, found {actual:?}"
        )));
    }
    Ok(())
}

/// Three tagged cells pushed one step along +X.
fn demonstrate_line_push(relocation: &RelocationConfig) -> Result<(), DemoError> {
    info!("Starting line push demonstration");
    let mut host = Host::new(SimWorld::new()?, relocation);
    stone_line(&mut host, 3)?;

    let outcome = host.extend(p(-1, 0, 0), Direction::PosX)?;
    host.begin_turn()?;

    expect_id(&mut host, p(0, 0, 0), None)?;
    for x in 1..=3 {
        expect_id(&mut host, p(x, 0, 0), Some(x))?;
    }
    info!("Line push: {:?}, {}", outcome, host.describe(p(3, 0, 0))?);
    Ok(())
}

/// Same line with a fragile cell in the middle.
fn demonstrate_destroyed_in_place(relocation: &RelocationConfig) -> Result<(), DemoError> {
    info!("Starting destroyed-in-place demonstration");
    let mut host = Host::new(SimWorld::new()?, relocation);
    stone_line(&mut host, 3)?;
    let glass = host.world.palette().glass;
    host.world.set(p(1, 0, 0), glass);

    host.extend(p(-1, 0, 0), Direction::PosX)?;
    host.begin_turn()?;

    expect_id(&mut host, p(1, 0, 0), Some(1))?;
    expect_id(&mut host, p(2, 0, 0), None)?;
    expect_id(&mut host, p(3, 0, 0), Some(3))?;
    info!("Fragile cell dropped its attributes, neighbours moved");
    Ok(())
}

/// Two adjacent tagged cells caught in a blast.
fn demonstrate_explosion(relocation: &RelocationConfig) -> Result<(), DemoError> {
    info!("Starting explosion demonstration");
    let mut host = Host::new(SimWorld::new()?, relocation);
    let stone = host.world.palette().stone;
    for (i, pos) in [p(5, 5, 5), p(5, 5, 6)].into_iter().enumerate() {
        host.world.set(pos, stone);
        host.tag(pos, "id", i as i32 + 1)?;
    }

    let outcome = host.explode(p(5, 5, 5), 1)?;
    expect_id(&mut host, p(5, 5, 5), None)?;
    expect_id(&mut host, p(5, 5, 6), None)?;
    info!(
        "Explosion: {:?}, chunks with tables left: {}",
        outcome,
        host.chunks_with_tables()?
    );
    Ok(())
}

/// Break, burn and replace each drop custom data; a same-type replace does not.
fn demonstrate_destructive_events(relocation: &RelocationConfig) -> Result<(), DemoError> {
    info!("Starting destructive events demonstration");
    let mut host = Host::new(SimWorld::new()?, relocation);
    stone_line(&mut host, 4)?;
    let palette = host.world.palette();

    host.break_cell(p(0, 0, 0))?;
    host.burn(p(1, 0, 0))?;
    let unchanged = host.replace(p(2, 0, 0), palette.stone)?;
    let replaced = host.replace(p(3, 0, 0), palette.sand)?;

    expect_id(&mut host, p(0, 0, 0), None)?;
    expect_id(&mut host, p(1, 0, 0), None)?;
    expect_id(&mut host, p(2, 0, 0), Some(3))?;
    expect_id(&mut host, p(3, 0, 0), None)?;
    if unchanged != EventOutcome::Unchanged {
        return Err(DemoError::Invariant(format!(
            "same-type replace reported {unchanged:?}"
        )));
    }
    info!(
        "Destructive events done ({:?}); cell (3, 0, 0) is now {}",
        replaced,
        host.world.type_name(palette.sand)
    );
    Ok(())
}

/// Scatters tagged stone and glass, then fires random pushers.
///
/// Stone ids must survive every push exactly once; glass ids may vanish
/// when the glass is destroyed in place.
fn demonstrate_random_run(config: &Config) -> Result<Host, DemoError> {
    info!("Starting random push run");
    let demo = &config.demo;
    let radius = demo.clamped_radius();
    let mut rng = Xoshiro256StarStar::seed_from_u64(demo.seed);
    let mut host = Host::new(SimWorld::new()?, &config.relocation);
    let palette = host.world.palette();

    let target = scatter_target(radius);
    let mut next_id = 1;
    let mut stone_ids = Vec::new();
    for _ in 0..target {
        let pos = p(
            rng.gen_range(-radius..radius),
            rng.gen_range(-radius / 2..radius / 2),
            rng.gen_range(-radius..radius),
        );
        if host.world.is_solid(pos) {
            continue;
        }
        let fragile = rng.gen_bool(0.1);
        host.world
            .set(pos, if fragile { palette.glass } else { palette.stone });
        host.tag(pos, "id", next_id)?;
        if !fragile {
            stone_ids.push(next_id);
        }
        next_id += 1;
    }

    let mut moved = 0u32;
    let mut blocked = 0u32;
    for _ in 0..demo.random_pushes {
        let solid = host.world.solid_cells();
        if solid.is_empty() {
            break;
        }
        let target = solid[rng.gen_range(0..solid.len())];
        let direction = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
        let pusher = target.step(direction.opposite());

        let outcome = if rng.gen_bool(0.8) {
            host.extend(pusher, direction)?
        } else {
            host.retract(pusher.step(direction.opposite()), direction)?
        };
        match outcome {
            Some(_) => moved += 1,
            None => blocked += 1,
        }
    }
    host.begin_turn()?;

    let entries = host.check_invariants()?;
    let ids = host.id_positions()?;
    let missing: Vec<_> = stone_ids.iter().filter(|id| !ids.contains_key(id)).collect();
    if !missing.is_empty() {
        return Err(DemoError::Invariant(format!("stone ids lost: {missing:?}")));
    }
    if blocked > moved {
        warn!(moved, blocked, "most random pushes were blocked");
    }
    info!(
        "Random run: {} pushes moved, {} blocked, {} entries, {} turns",
        moved,
        blocked,
        entries,
        host.turn()
    );
    Ok(host)
}

/// Number of cells the random run tries to tag inside a world of `radius`.
fn scatter_target(radius: i32) -> usize {
    let side = radius.unsigned_abs() as usize;
    side.saturating_mul(side).max(16)
}

/// Saves every chunk, unloads it and reloads it; the tables must match.
fn demonstrate_chunk_round_trip(host: &mut Host) -> Result<(), DemoError> {
    info!("Starting chunk round-trip demonstration");
    let before = host.entries()?;
    let bytes = host.reload_chunks()?;
    let after = host.entries()?;
    if before != after {
        return Err(DemoError::Invariant(
            "attribute tables changed across save/load".to_string(),
        ));
    }
    info!("Round-tripped {} entries through {} bytes", after.len(), bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use cellmeta_config::DemoConfig;

    use super::*;

    #[test]
    fn test_scatter_target_has_floor() {
        assert_eq!(scatter_target(2), 16);
        assert_eq!(scatter_target(20), 400);
    }

    #[test]
    fn test_scatter_target_survives_extreme_radius() {
        assert!(scatter_target(i32::MAX) > scatter_target(20));
        assert!(scatter_target(i32::MIN) > scatter_target(20));
    }

    #[test]
    fn test_random_run_with_oversized_radius_stays_bounded() {
        let mut config = Config::default();
        config.demo.world_radius = i32::MAX;
        config.demo.random_pushes = 20;
        let host = demonstrate_random_run(&config).unwrap();
        let bound = DemoConfig::MAX_WORLD_RADIUS;
        for pos in host.world.solid_cells() {
            assert!(pos.x.abs() <= bound && pos.z.abs() <= bound, "{pos} escaped");
        }
    }
}
