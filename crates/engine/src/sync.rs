//! Network reconciliation: outbound throttling, inbound merge, GC.
//!
//! All remote-entity mutation funnels through this module so "last
//! known network state" has a single source of truth. Outbound traffic
//! is fire-and-forget: operations are enqueued on a non-blocking
//! channel the host transport drains; a failed or dropped send is
//! superseded by the next interval's resend.

use crate::config::Config;
use crate::entity::{Pixel, RemoteCell};
use crate::player::{LocalPlayer, PlayerStatus};
use crate::world::World;
use protocol::{CellChange, ChangeOp, InboundEvent, Outbound, PixelChange, PositionBroadcast};
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

pub struct Reconciler {
    outbox: UnboundedSender<Outbound>,
    last_broadcast: f64,
    last_persist: f64,
    last_gc: f64,
}

impl Reconciler {
    pub fn new(outbox: UnboundedSender<Outbound>) -> Self {
        Self {
            outbox,
            last_broadcast: f64::NEG_INFINITY,
            last_persist: f64::NEG_INFINITY,
            last_gc: f64::NEG_INFINITY,
        }
    }

    /// Enqueue without waiting. Failure means the transport is gone;
    /// the simulation keeps running regardless.
    fn send(&self, op: Outbound) {
        if self.outbox.send(op).is_err() {
            warn!("Outbound channel closed, dropping sync operation");
        }
    }

    /// Outbound flush for this tick: a positional broadcast on the
    /// fast interval, a durable upsert of the same data on the coarse
    /// one. Late joiners bootstrap from the store; everyone else rides
    /// the broadcast path.
    pub fn flush_outbound(&mut self, player: &LocalPlayer, config: &Config, now: f64) {
        if player.status != PlayerStatus::Alive {
            return;
        }
        if now - self.last_broadcast >= config.sync.broadcast_interval_ms {
            self.last_broadcast = now;
            self.send(Outbound::Broadcast(player.to_broadcast()));
        }
        if now - self.last_persist >= config.sync.persist_interval_ms {
            self.last_persist = now;
            self.send(Outbound::UpsertCells(player.to_records(now as i64)));
        }
    }

    /// Immediate durable upsert of all owned cells, outside the
    /// throttle (spawn and respawn).
    pub fn persist_now(&mut self, player: &LocalPlayer, now: f64) {
        self.last_persist = now;
        self.send(Outbound::UpsertCells(player.to_records(now as i64)));
    }

    /// Merge one inbound event into the entity model.
    ///
    /// Broadcasts own position/mass (targets only); store changes own
    /// existence. Updates for unknown entities are inserts, deletes
    /// for unknown entities are no-ops: arrival order is not ours to
    /// control.
    pub fn apply_event(&mut self, world: &mut World, session: &str, event: InboundEvent, now: f64) {
        match event {
            InboundEvent::Broadcast(broadcast) => {
                self.apply_broadcast(world, session, broadcast, now)
            }
            InboundEvent::Cell(change) => self.apply_cell_change(world, session, change, now),
            InboundEvent::Pixel(change) => self.apply_pixel_change(world, session, change),
        }
    }

    fn apply_broadcast(
        &mut self,
        world: &mut World,
        session: &str,
        broadcast: PositionBroadcast,
        now: f64,
    ) {
        // Own echoes never touch owned cells.
        if broadcast.session == session {
            return;
        }
        for snap in &broadcast.cells {
            if world.is_owned(&snap.id) {
                continue;
            }
            match world.remote_cells.get_mut(&snap.id) {
                Some(remote) => remote.apply_snapshot(snap, now),
                None => {
                    // First observation: the broadcast carries enough
                    // identity to create the cell without the durable
                    // insert having arrived yet.
                    let record = protocol::CellRecord {
                        id: snap.id.clone(),
                        name: broadcast.name.clone(),
                        x: snap.x,
                        y: snap.y,
                        mass: snap.mass,
                        color: broadcast.color.clone(),
                        skin: None,
                        show_name: true,
                        updated_at: now as i64,
                    };
                    world.insert_remote_cell(RemoteCell::from_record(&record, now));
                }
            }
        }
    }

    fn apply_cell_change(
        &mut self,
        world: &mut World,
        session: &str,
        change: CellChange,
        now: f64,
    ) {
        let record = change.record;
        if record.session_id() == session || world.is_owned(&record.id) {
            return;
        }
        match change.op {
            ChangeOp::Insert | ChangeOp::Update => match world.remote_cells.get_mut(&record.id) {
                Some(remote) => remote.apply_record(&record, now),
                None => world.insert_remote_cell(RemoteCell::from_record(&record, now)),
            },
            ChangeOp::Delete => {
                if world.remove_remote_cell(&record.id).is_some() {
                    debug!("Remote cell {} deleted by store notification", record.id);
                }
            }
        }
    }

    fn apply_pixel_change(&mut self, world: &mut World, session: &str, change: PixelChange) {
        let record = change.record;
        match change.op {
            ChangeOp::Insert | ChangeOp::Update => {
                // Own in-flight ejections are simulated locally; the
                // store echo must not reset their flight.
                if let Some(existing) = world.pixels.get(&record.id) {
                    if existing.owner.as_deref() == Some(session) && existing.speed() > 0.0 {
                        return;
                    }
                }
                world.insert_pixel(Pixel::from_record(&record));
            }
            ChangeOp::Delete => {
                world.remove_pixel(&record.id);
            }
        }
    }

    /// Apply this tick's collision decisions through the canonical
    /// mutation path: remove locally, persist the deletes.
    pub fn apply_consumption(
        &mut self,
        world: &mut World,
        eaten_pixels: &[String],
        eaten_remote: &[String],
    ) {
        for id in eaten_remote {
            // Optimistic removal; the authoritative delete from the
            // losing client may still arrive later and will no-op.
            world.remove_remote_cell(id);
        }
        if !eaten_pixels.is_empty() {
            for id in eaten_pixels {
                world.remove_pixel(id);
            }
            self.send(Outbound::DeletePixels(eaten_pixels.to_vec()));
        }
    }

    /// Persist locally spawned or updated pixels.
    pub fn upsert_pixels(&self, pixels: &[&Pixel], now_ms: i64) {
        if pixels.is_empty() {
            return;
        }
        self.send(Outbound::UpsertPixels(
            pixels.iter().map(|p| p.to_record(now_ms)).collect(),
        ));
    }

    /// Durably delete own cell rows (on death or respawn).
    pub fn delete_cells(&self, ids: Vec<String>) {
        if !ids.is_empty() {
            self.send(Outbound::DeleteCells(ids));
        }
    }

    /// Staleness sweep. Remote cells silent for longer than the window
    /// are dropped locally; the largest surviving player additionally
    /// issues one durable older-than delete so abandoned sessions do
    /// not accumulate in storage.
    pub fn collect_garbage(
        &mut self,
        world: &mut World,
        player: &LocalPlayer,
        config: &Config,
        now: f64,
    ) {
        if now - self.last_gc < config.sync.gc_interval_ms {
            return;
        }
        self.last_gc = now;

        let staleness = config.sync.staleness_ms;
        let stale: Vec<String> = world
            .remote_cells
            .values()
            .filter(|cell| cell.is_stale(now, staleness))
            .map(|cell| cell.id.clone())
            .collect();
        if !stale.is_empty() {
            debug!("Dropping {} stale remote cells", stale.len());
            for id in &stale {
                world.remove_remote_cell(id);
            }
        }

        if player.status == PlayerStatus::Alive && is_largest(world, player) {
            self.send(Outbound::DeleteCellsOlderThan((now - staleness) as i64));
        }
    }
}

/// Cost-saving heuristic: only the largest surviving player pays for
/// the durable cleanup sweep.
fn is_largest(world: &World, player: &LocalPlayer) -> bool {
    let mut by_session: HashMap<&str, f32> = HashMap::new();
    for cell in world.remote_cells.values() {
        *by_session.entry(cell.session.as_str()).or_insert(0.0) += cell.mass;
    }
    let best_remote = by_session.values().cloned().fold(0.0, f32::max);
    player.total_mass() >= best_remote
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use protocol::{CellRecord, CellSnapshot, Identity, PixelRecord};
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn setup() -> (Reconciler, UnboundedReceiver<Outbound>, World, LocalPlayer) {
        let (tx, rx) = unbounded_channel();
        let mut player = LocalPlayer::new(Identity {
            id: "me".to_string(),
            name: "Tester".to_string(),
        });
        let world = World::new(2000.0);
        player.status = PlayerStatus::Alive;
        player.cells.push(crate::entity::OwnedCell::new(
            "me:1".to_string(),
            Vec2::ZERO,
            10.0,
            0.0,
        ));
        (Reconciler::new(tx), rx, world, player)
    }

    fn record(id: &str, mass: f32, updated_at: i64) -> CellRecord {
        CellRecord {
            id: id.to_string(),
            name: "enemy".to_string(),
            x: 50.0,
            y: 50.0,
            mass,
            color: "#ff0000".to_string(),
            skin: None,
            show_name: true,
            updated_at,
        }
    }

    #[test]
    fn test_broadcast_throttling() {
        let (mut sync, mut rx, _world, player) = setup();
        let config = Config::default();
        sync.flush_outbound(&player, &config, 0.0);
        sync.flush_outbound(&player, &config, 10.0); // inside both intervals
        sync.flush_outbound(&player, &config, 60.0); // past broadcast only

        let mut broadcasts = 0;
        let mut upserts = 0;
        while let Ok(op) = rx.try_recv() {
            match op {
                Outbound::Broadcast(_) => broadcasts += 1,
                Outbound::UpsertCells(_) => upserts += 1,
                other => panic!("unexpected op {other:?}"),
            }
        }
        assert_eq!(broadcasts, 2);
        assert_eq!(upserts, 1);
    }

    #[test]
    fn test_broadcast_creates_then_updates_remote() {
        let (mut sync, _rx, mut world, _player) = setup();
        let broadcast = PositionBroadcast {
            session: "them".to_string(),
            name: "enemy".to_string(),
            color: "#00ff00".to_string(),
            cells: vec![CellSnapshot {
                id: "them:1".to_string(),
                x: 10.0,
                y: 20.0,
                mass: 30.0,
            }],
        };
        sync.apply_event(&mut world, "me", InboundEvent::Broadcast(broadcast.clone()), 0.0);
        let created = &world.remote_cells["them:1"];
        assert_eq!(created.name, "enemy");
        assert_eq!(created.target_position, Vec2::new(10.0, 20.0));

        let mut update = broadcast;
        update.cells[0].x = 99.0;
        update.cells[0].mass = 31.0;
        sync.apply_event(&mut world, "me", InboundEvent::Broadcast(update), 100.0);
        let cell = &world.remote_cells["them:1"];
        assert_eq!(cell.target_position.x, 99.0);
        assert_eq!(cell.target_mass, 31.0);
        assert_eq!(cell.last_seen, 100.0);
    }

    #[test]
    fn test_own_broadcast_echo_is_ignored() {
        let (mut sync, _rx, mut world, _player) = setup();
        world.mark_owned("me:1");
        let echo = PositionBroadcast {
            session: "me".to_string(),
            name: "Tester".to_string(),
            color: "#ffffff".to_string(),
            cells: vec![CellSnapshot {
                id: "me:1".to_string(),
                x: 1.0,
                y: 1.0,
                mass: 1.0,
            }],
        };
        sync.apply_event(&mut world, "me", InboundEvent::Broadcast(echo), 0.0);
        assert!(world.remote_cells.is_empty());
    }

    #[test]
    fn test_store_delete_then_late_update_recreates() {
        // A delete and an update for the same id can arrive in either
        // order; both must be handled as normal merges.
        let (mut sync, _rx, mut world, _player) = setup();
        sync.apply_event(
            &mut world,
            "me",
            InboundEvent::Cell(CellChange {
                op: ChangeOp::Delete,
                record: record("them:1", 30.0, 0),
            }),
            0.0,
        );
        assert!(world.remote_cells.is_empty());

        sync.apply_event(
            &mut world,
            "me",
            InboundEvent::Cell(CellChange {
                op: ChangeOp::Update,
                record: record("them:1", 30.0, 1),
            }),
            1.0,
        );
        assert!(world.remote_cells.contains_key("them:1"));
    }

    #[test]
    fn test_stale_remote_cells_are_collected() {
        let (mut sync, mut rx, mut world, player) = setup();
        let config = Config::default();
        sync.apply_event(
            &mut world,
            "me",
            InboundEvent::Cell(CellChange {
                op: ChangeOp::Insert,
                record: record("them:1", 30.0, 0),
            }),
            0.0,
        );
        assert_eq!(world.remote_cells.len(), 1);

        // Inside the window: survives.
        sync.collect_garbage(&mut world, &player, &config, 4_999.0);
        assert_eq!(world.remote_cells.len(), 1);

        // Past the window on the next sweep: gone.
        sync.collect_garbage(&mut world, &player, &config, 10_001.0);
        assert!(world.remote_cells.is_empty());

        // With no bigger player around, we also issued the durable
        // cleanup for abandoned rows.
        let mut saw_cleanup = false;
        while let Ok(op) = rx.try_recv() {
            if let Outbound::DeleteCellsOlderThan(cutoff) = op {
                saw_cleanup = true;
                assert!(cutoff <= (10_001.0 - config.sync.staleness_ms) as i64);
            }
        }
        assert!(saw_cleanup);
    }

    #[test]
    fn test_only_largest_player_issues_durable_cleanup() {
        let (mut sync, mut rx, mut world, player) = setup();
        let config = Config::default();
        // A much larger remote player exists and keeps broadcasting.
        sync.apply_event(
            &mut world,
            "me",
            InboundEvent::Cell(CellChange {
                op: ChangeOp::Insert,
                record: record("them:1", 500.0, 0),
            }),
            9_000.0,
        );
        sync.collect_garbage(&mut world, &player, &config, 10_000.0);
        while let Ok(op) = rx.try_recv() {
            assert!(!matches!(op, Outbound::DeleteCellsOlderThan(_)));
        }
    }

    #[test]
    fn test_pixel_store_echo_keeps_local_flight() {
        let (mut sync, _rx, mut world, _player) = setup();
        world.insert_pixel(Pixel::ejected(
            "p1".to_string(),
            Vec2::new(40.0, 0.0),
            Vec2::new(500.0, 0.0),
            protocol::Color::default(),
            "me".to_string(),
        ));
        sync.apply_event(
            &mut world,
            "me",
            InboundEvent::Pixel(PixelChange {
                op: ChangeOp::Insert,
                record: PixelRecord {
                    id: "p1".to_string(),
                    x: 0.0,
                    y: 0.0,
                    color: "#ffffff::e".to_string(),
                    updated_at: 0,
                },
            }),
            10.0,
        );
        let pixel = &world.pixels["p1"];
        assert_eq!(pixel.position, Vec2::new(40.0, 0.0));
        assert!(pixel.speed() > 0.0);
    }

    #[test]
    fn test_gc_never_drops_pixels() {
        // Pixel rows are written once and not refreshed, so silence
        // means nothing for them; only an explicit delete or local
        // consumption removes a pixel.
        let (mut sync, _rx, mut world, player) = setup();
        let config = Config::default();
        world.insert_pixel(Pixel::food(
            "f1".to_string(),
            Vec2::ZERO,
            protocol::Color::default(),
        ));
        sync.collect_garbage(&mut world, &player, &config, 60_000.0);
        assert!(world.pixels.contains_key("f1"));
    }

    #[test]
    fn test_consumption_removes_and_persists_deletes() {
        let (mut sync, mut rx, mut world, _player) = setup();
        world.insert_pixel(Pixel::food(
            "f1".to_string(),
            Vec2::ZERO,
            protocol::Color::default(),
        ));
        sync.apply_event(
            &mut world,
            "me",
            InboundEvent::Cell(CellChange {
                op: ChangeOp::Insert,
                record: record("them:1", 5.0, 0),
            }),
            0.0,
        );

        sync.apply_consumption(
            &mut world,
            &["f1".to_string()],
            &["them:1".to_string()],
        );
        assert!(world.pixels.is_empty());
        assert!(world.remote_cells.is_empty());

        match rx.try_recv().unwrap() {
            Outbound::DeletePixels(ids) => assert_eq!(ids, vec!["f1".to_string()]),
            other => panic!("unexpected op {other:?}"),
        }
        // Eating a remote cell sends nothing; its owner deletes it.
        assert!(rx.try_recv().is_err());
    }
}
