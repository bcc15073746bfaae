//! Petri - headless loopback arena.
//!
//! Runs two engine sessions in one process and feeds each one's
//! outbound sync operations straight back into the other, standing in
//! for the realtime room and the durable store. Useful for watching
//! the full reconciliation loop (broadcasts, upserts, deletes, GC)
//! without any network at all.

use engine::{Config, Game, InputSnapshot, TickOutcome};
use glam::Vec2;
use protocol::{
    CellChange, CellRecord, ChangeOp, Identity, InboundEvent, Outbound, PixelChange, PixelRecord,
};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const TICK: Duration = Duration::from_millis(16);
const RUN_FOR: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,engine=debug")),
        )
        .init();

    info!("Petri loopback arena v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    info!("World half extent: {}", config.world.half_extent);

    let now = 0.0;
    let (alice_tx, mut alice_rx) = unbounded_channel();
    let (bob_tx, mut bob_rx) = unbounded_channel();
    let mut alice = Game::new(
        Identity {
            id: "alice-session".to_string(),
            name: "Alice".to_string(),
        },
        config.clone(),
        alice_tx,
        now,
    );
    let mut bob = Game::new(
        Identity {
            id: "bob-session".to_string(),
            name: "Bob".to_string(),
        },
        config,
        bob_tx,
        now,
    );

    let viewport = Vec2::new(1280.0, 720.0);
    let start = Instant::now();
    let mut interval = tokio::time::interval(TICK);

    while start.elapsed() < RUN_FOR {
        interval.tick().await;
        let now = start.elapsed().as_secs_f64() * 1000.0;

        // Relay each side's sync traffic to the other.
        relay(&mut alice_rx, &mut bob, now);
        relay(&mut bob_rx, &mut alice, now);

        // Alice chases a slowly orbiting pointer; Bob wanders on a
        // slower orbit so the two eventually meet.
        let t = (now / 1000.0) as f32;
        let mut alice_input = InputSnapshot::idle(viewport);
        alice_input.pointer = viewport / 2.0 + Vec2::new(t.cos(), t.sin()) * 200.0;
        let mut bob_input = InputSnapshot::idle(viewport);
        bob_input.pointer = viewport / 2.0 + Vec2::new((t * 0.3).sin(), (t * 0.3).cos()) * 200.0;

        if alice.tick(&alice_input, now) == TickOutcome::Eliminated {
            info!("Alice eliminated, respawning");
            alice.respawn(now);
        }
        if bob.tick(&bob_input, now) == TickOutcome::Eliminated {
            info!("Bob eliminated, respawning");
            bob.respawn(now);
        }
    }

    info!("Final scores: Alice {:.1}, Bob {:.1}", alice.score(), bob.score());
    for (rank, entry) in alice.leaderboard.entries().iter().enumerate() {
        info!("  #{} {} ({:.1})", rank + 1, entry.name, entry.mass);
    }

    Ok(())
}

/// Drain one session's outbound queue into the other session's inbound
/// path, playing both the broadcast room and the store notifier.
fn relay(rx: &mut UnboundedReceiver<Outbound>, peer: &mut Game, now: f64) {
    while let Ok(op) = rx.try_recv() {
        match op {
            Outbound::Broadcast(broadcast) => {
                peer.handle_event(InboundEvent::Broadcast(broadcast), now);
            }
            Outbound::UpsertCells(records) => {
                for record in records {
                    peer.handle_event(cell_change(ChangeOp::Update, record), now);
                }
            }
            Outbound::DeleteCells(ids) => {
                for id in ids {
                    peer.handle_event(cell_change(ChangeOp::Delete, tombstone_cell(id, now)), now);
                }
            }
            Outbound::UpsertPixels(records) => {
                for record in records {
                    peer.handle_event(
                        InboundEvent::Pixel(PixelChange {
                            op: ChangeOp::Update,
                            record,
                        }),
                        now,
                    );
                }
            }
            Outbound::DeletePixels(ids) => {
                for id in ids {
                    peer.handle_event(
                        InboundEvent::Pixel(PixelChange {
                            op: ChangeOp::Delete,
                            record: tombstone_pixel(id, now),
                        }),
                        now,
                    );
                }
            }
            Outbound::DeleteCellsOlderThan(cutoff) => {
                // A real store would sweep rows here; the loopback has
                // no store, so the sessions' own staleness GC covers it.
                debug!("Ignoring durable sweep older than {}", cutoff);
            }
        }
    }
}

fn cell_change(op: ChangeOp, record: CellRecord) -> InboundEvent {
    InboundEvent::Cell(CellChange { op, record })
}

/// Store delete notifications carry the old row; only the id matters.
fn tombstone_cell(id: String, now: f64) -> CellRecord {
    CellRecord {
        id,
        name: String::new(),
        x: 0.0,
        y: 0.0,
        mass: 0.0,
        color: String::new(),
        skin: None,
        show_name: false,
        updated_at: now as i64,
    }
}

fn tombstone_pixel(id: String, now: f64) -> PixelRecord {
    PixelRecord {
        id,
        x: 0.0,
        y: 0.0,
        color: String::new(),
        updated_at: now as i64,
    }
}
