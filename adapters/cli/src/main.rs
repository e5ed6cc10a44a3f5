#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives a headless Grimhold simulation.
//!
//! Boots a world from a TOML scenario (or the built-in skirmish), runs the
//! requested number of turns with keeper AIs playing their seats, and
//! reports what happened each turn.

mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use grimhold_core::{Command, Event};
use grimhold_system_keeper_ai::KeeperAi;
use grimhold_world::{apply, query, World};
use tracing::warn;

/// Headless driver for the Grimhold dungeon simulation.
#[derive(Debug, Parser)]
#[command(name = "grimhold", about = "Run a headless Grimhold skirmish")]
struct Args {
    /// Path to a TOML scenario file; the built-in skirmish runs without one.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Number of turns to simulate.
    #[arg(long, default_value_t = 30)]
    turns: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let scenario = match &args.scenario {
        Some(path) => scenario::load(path)
            .with_context(|| format!("loading scenario {}", path.display()))?,
        None => scenario::Scenario::demo(),
    };
    let mut ais: Vec<KeeperAi> = scenario.ai_colors().map(KeeperAi::new).collect();

    let mut world = World::new();
    let mut events = Vec::new();
    for command in scenario.bootstrap_commands() {
        apply(&mut world, command, &mut events);
    }
    report_rejections(&events);

    let (width, height) = query::dimensions(&world);
    println!(
        "Grimhold: {width}x{height} map, {} seats, {} creatures",
        query::seat_view(&world).iter().count(),
        query::creature_view(&world).len()
    );

    for _ in 0..args.turns {
        events.clear();
        apply(&mut world, Command::DoTurn, &mut events);
        summarize_turn(&events);

        let mut orders = Vec::new();
        for ai in &mut ais {
            ai.handle(&events, &world, &mut orders);
        }
        events.clear();
        for command in orders {
            apply(&mut world, command, &mut events);
        }
        report_rejections(&events);
    }

    println!("--- final standings ---");
    for seat in query::seat_view(&world).iter() {
        println!(
            "seat {} ({}): {} gold, {} mana, {} tiles claimed, {} creatures{}",
            seat.color.get(),
            seat.faction,
            seat.gold,
            seat.mana,
            seat.claimed_tiles,
            seat.controlled_creatures,
            if seat.winner { ", WINNER" } else { "" }
        );
    }

    Ok(())
}

/// One line per turn describing what the simulation did.
fn summarize_turn(events: &[Event]) {
    let mut spawned = 0u32;
    let mut dug = 0u32;
    let mut claimed = 0u32;
    let mut strikes = 0u32;
    let mut missiles = 0u32;
    let mut deletions = 0u32;
    let mut summary = None;
    let mut winners: Vec<u32> = Vec::new();

    for event in events {
        match event {
            Event::WorkerSpawned { .. } | Event::CreatureSpawned { .. } => spawned += 1,
            Event::TileDug { .. } => dug += 1,
            Event::TileClaimed { .. } => claimed += 1,
            Event::CreatureDamaged { .. } => strikes += 1,
            Event::MissileLaunched { .. } => missiles += 1,
            Event::EntityQueuedForDeletion { .. } => deletions += 1,
            Event::SeatWon { color } => winners.push(color.get()),
            Event::TurnComputed {
                turn,
                path_calls,
                creature_turns_micros,
                upkeep_micros,
            } => {
                summary = Some((*turn, *path_calls, *creature_turns_micros, *upkeep_micros));
            }
            _ => {}
        }
    }

    if let Some((turn, path_calls, creature_micros, upkeep_micros)) = summary {
        print!(
            "turn {turn:>3}: {path_calls} path calls, {creature_micros}us creatures, \
             {upkeep_micros}us upkeep"
        );
        if spawned > 0 {
            print!(", {spawned} spawned");
        }
        if dug > 0 {
            print!(", {dug} dug");
        }
        if claimed > 0 {
            print!(", {claimed} claimed");
        }
        if strikes > 0 {
            print!(", {strikes} strikes");
        }
        if missiles > 0 {
            print!(", {missiles} missiles");
        }
        if deletions > 0 {
            print!(", {deletions} deletions");
        }
        for color in winners {
            print!(", seat {color} WON");
        }
        println!();
    }
}

/// Surfaces rejection events so scenario and AI mistakes are not silent.
fn report_rejections(events: &[Event]) {
    for event in events {
        match event {
            Event::SeatRejected { color, reason } => {
                warn!(color = color.get(), ?reason, "seat rejected");
            }
            Event::PlayerRejected { nick, reason } => {
                warn!(nick = %nick, ?reason, "player rejected");
            }
            Event::CreatureRejected { color, reason, .. } => {
                warn!(color = color.get(), ?reason, "creature spawn rejected");
            }
            Event::RoomRejected { kind, color, reason } => {
                warn!(?kind, color = color.get(), ?reason, "room rejected");
            }
            Event::TrapRejected { kind, color, reason } => {
                warn!(?kind, color = color.get(), ?reason, "trap rejected");
            }
            _ => {}
        }
    }
}
