//! Headless Duel Runner
//!
//! Pits two scripted fighters against each other and prints the event log.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use riposte_core::catalog::{ClipRef, MoveCatalog, WeaponId};
use riposte_core::fighter::{FighterId, FighterState, Transform};
use riposte_core::selector::AttackRequest;
use riposte_core::settings::{CombatSettings, FighterConfig};
use riposte_core::{CombatEvent, CombatWorld, EventEnvelope};

const DEFAULT_CATALOG: &str = include_str!("../data/catalog.json");

/// Headless Duel Runner - two scripted fighters, one event log
#[derive(Parser, Debug)]
#[command(name = "riposte-duel")]
#[command(about = "Run a scripted duel and print the combat events")]
struct Args {
    /// Random seed for the world and the script
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Maximum ticks before the duel is called a draw
    #[arg(long, default_value_t = 3600)]
    max_ticks: u64,

    /// Simulation rate in ticks per second
    #[arg(long, default_value_t = 60)]
    tick_rate: u32,

    /// Catalog JSON (the bundled sword catalog if omitted)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Combat settings JSON (defaults if omitted)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,
}

/// Scripted input for one fighter.
struct Script {
    rng: ChaCha8Rng,
    aggression: f32,
}

impl Script {
    fn new(seed: u64, aggression: f32) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            aggression,
        }
    }

    /// Issues this tick's requests for `me` against `foe`.
    fn drive(&mut self, world: &mut CombatWorld, me: FighterId, foe: FighterId) {
        let (Some(fighter), Some(opponent)) = (world.fighter(me), world.fighter(foe)) else {
            return;
        };
        if fighter.is_dead() || opponent.is_dead() {
            return;
        }
        let under_attack = fighter.is_being_attacked();
        let blocking = fighter.is_blocking();
        let idle = fighter.state() == FighterState::None;
        let roll: f32 = self.rng.gen();

        if under_attack {
            if roll < 0.05 {
                world.request_attack(me, AttackRequest::new(Some(foe)).counter());
            } else if roll < 0.15 && !blocking {
                world.set_blocking(me, true);
            } else if roll < 0.18 && idle {
                world.request_dodge(me, Vec3::ZERO);
            }
            return;
        }
        if blocking {
            if roll < 0.1 {
                world.set_blocking(me, false);
            }
            return;
        }

        let attack_chance = 0.03 * self.aggression;
        if roll < attack_chance {
            let mut request = AttackRequest::new(Some(foe));
            if self.rng.gen_bool(0.2) {
                request = request.heavy();
            } else if self.rng.gen_bool(0.1) {
                request = request.charged();
            }
            let outcome = world.request_attack(me, request);
            tracing::debug!(fighter = %me, ?outcome, "scripted attack");
        }
    }
}

fn duelist() -> FighterConfig {
    FighterConfig {
        default_weapon: Some(WeaponId::new("sword")),
        lying_on_back: Some(ClipRef::new("lying_back", 1.0)),
        get_up_from_back: Some(ClipRef::new("get_up_back", 1.2)),
        lying_on_front: Some(ClipRef::new("lying_front", 1.0)),
        get_up_from_front: Some(ClipRef::new("get_up_front", 1.2)),
        death_clips: vec![
            ClipRef::new("death_fall", 1.5),
            ClipRef::new("death_kneel", 2.0),
        ],
        ..FighterConfig::default()
    }
}

fn load_catalog(path: Option<&PathBuf>) -> Result<MoveCatalog> {
    match path {
        Some(path) => MoveCatalog::load(path)
            .with_context(|| format!("loading catalog {}", path.display())),
        None => MoveCatalog::from_json_str(DEFAULT_CATALOG).context("parsing bundled catalog"),
    }
}

fn load_settings(path: Option<&PathBuf>) -> Result<CombatSettings> {
    match path {
        Some(path) => CombatSettings::load(path)
            .with_context(|| format!("loading settings {}", path.display())),
        None => Ok(CombatSettings::default()),
    }
}

fn print_text(envelope: &EventEnvelope) {
    println!("[{:>5}] {:?}", envelope.tick, envelope.event);
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let json = match args.format.as_str() {
        "json" => true,
        "text" => false,
        other => anyhow::bail!("unknown format '{other}', expected json or text"),
    };

    let catalog = load_catalog(args.catalog.as_ref())?;
    let settings = load_settings(args.settings.as_ref())?;
    settings.validate()?;
    tracing::info!(
        seed = args.seed,
        attacks = catalog.attack_count(),
        weapons = catalog.weapon_count(),
        "starting duel"
    );

    let mut world = CombatWorld::headless(args.seed, catalog, settings);
    let a = world.spawn_fighter(duelist(), Transform::new(Vec3::ZERO, Vec3::Z))?;
    let b = world.spawn_fighter(
        duelist(),
        Transform::new(Vec3::new(0.0, 0.0, 2.0), Vec3::NEG_Z),
    )?;
    world.set_target(a, Some(b));
    world.set_target(b, Some(a));

    let mut scripts = [
        Script::new(args.seed.wrapping_add(1), 1.2),
        Script::new(args.seed.wrapping_add(2), 0.8),
    ];
    let dt = 1.0 / args.tick_rate.max(1) as f32;
    let mut log = Vec::new();
    let mut winner = None;

    for _ in 0..args.max_ticks {
        scripts[0].drive(&mut world, a, b);
        scripts[1].drive(&mut world, b, a);
        world.step(dt);

        for envelope in world.take_events() {
            if let CombatEvent::Death { fighter } = envelope.event {
                winner = Some(if fighter == a { b } else { a });
            }
            if json {
                log.push(envelope);
            } else {
                print_text(&envelope);
            }
        }
        if winner.is_some() {
            break;
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&log)?);
    } else {
        for id in [a, b] {
            if let Some(fighter) = world.fighter(id) {
                println!(
                    "{id}: health {:.1}/{:.1}, state {:?}",
                    fighter.health(),
                    fighter.max_health(),
                    fighter.state()
                );
            }
        }
        match winner {
            Some(id) => println!("winner: {id} after {} ticks", world.current_tick()),
            None => println!("draw after {} ticks", world.current_tick()),
        }
    }
    Ok(())
}
