//! Tick driver: one simulation step per render frame.
//!
//! The host owns the render loop, input devices and transport; the
//! engine owns everything between. A tick runs physics, growth edges,
//! the merge pass, collision, outbound sync, garbage collection and
//! the leaderboard, in that order, against explicit context state with
//! no ambient globals.

use crate::collision;
use crate::config::Config;
use crate::entity::Pixel;
use crate::growth;
use crate::input::InputSnapshot;
use crate::leaderboard::Leaderboard;
use crate::physics;
use crate::player::{random_color, LocalPlayer, PlayerStatus};
use crate::sync::Reconciler;
use crate::world::World;
use glam::Vec2;
use protocol::{CellRecord, Identity, InboundEvent, Outbound, PixelRecord};
use rand::Rng;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Longest frame the integrator will accept; a paused tab resuming
/// must not produce one giant integration step.
const FRAME_DT_MAX: f32 = 0.1;

/// Result of one tick, surfaced to the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    /// All owned cells are gone; nothing simulates until `respawn`.
    Eliminated,
}

/// The whole client-side game: entity model, local player, sync and
/// leaderboard, driven by the host one tick per frame.
pub struct Game {
    pub config: Config,
    pub world: World,
    pub player: LocalPlayer,
    pub leaderboard: Leaderboard,
    sync: Reconciler,
    last_tick: Option<f64>,
}

impl Game {
    /// Create a session for a signed-in identity and spawn the first
    /// cell. The initial durable upsert goes out immediately so other
    /// clients can bootstrap us.
    pub fn new(
        identity: Identity,
        config: Config,
        outbox: UnboundedSender<Outbound>,
        now: f64,
    ) -> Self {
        let world = World::new(config.world.half_extent);
        let player = LocalPlayer::new(identity);
        let mut game = Self {
            config,
            world,
            player,
            leaderboard: Leaderboard::default(),
            sync: Reconciler::new(outbox),
            last_tick: None,
        };
        game.spawn_player(now);
        info!(
            "Session {} ({}) joined the arena",
            game.player.session, game.player.name
        );
        game
    }

    fn spawn_player(&mut self, now: f64) {
        let cell = self
            .player
            .spawn(&self.world.bounds, self.config.player.start_mass, now);
        let id = cell.id.clone();
        self.world.mark_owned(&id);
        self.sync.persist_now(&self.player, now);
        debug!("Spawned cell {} at {}", id, self.player.cells[0].position);
    }

    /// Feed the initial select-all of the cell table. Own rows are
    /// filtered inside the reconciler.
    pub fn bootstrap_cells(&mut self, records: Vec<CellRecord>, now: f64) {
        for record in records {
            self.sync.apply_event(
                &mut self.world,
                &self.player.session,
                InboundEvent::Cell(protocol::CellChange {
                    op: protocol::ChangeOp::Insert,
                    record,
                }),
                now,
            );
        }
    }

    /// Feed the initial select-all of the pixel table.
    pub fn bootstrap_pixels(&mut self, records: Vec<PixelRecord>, now: f64) {
        for record in records {
            self.sync.apply_event(
                &mut self.world,
                &self.player.session,
                InboundEvent::Pixel(protocol::PixelChange {
                    op: protocol::ChangeOp::Insert,
                    record,
                }),
                now,
            );
        }
    }

    /// Merge one asynchronously delivered network event. Safe to call
    /// between any two ticks in any order.
    pub fn handle_event(&mut self, event: InboundEvent, now: f64) {
        self.sync
            .apply_event(&mut self.world, &self.player.session, event, now);
    }

    /// Run one simulation tick. `now` is the frame timestamp in
    /// milliseconds; the step duration is derived and clamped.
    pub fn tick(&mut self, input: &InputSnapshot, now: f64) -> TickOutcome {
        if self.player.status == PlayerStatus::Eliminated {
            return TickOutcome::Eliminated;
        }

        let dt = match self.last_tick {
            Some(last) => (((now - last) / 1000.0) as f32).clamp(0.0, FRAME_DT_MAX),
            None => 0.0,
        };
        self.last_tick = Some(now);

        // Motion: impulses, steering, pixel flight, remote easing.
        let rested =
            physics::integrate(&mut self.player, &mut self.world, input, &self.config, dt);
        if !rested.is_empty() {
            // Re-persist ejections at their final resting position.
            let pixels: Vec<&Pixel> = rested
                .iter()
                .filter_map(|id| self.world.pixels.get(id))
                .collect();
            self.sync.upsert_pixels(&pixels, now as i64);
        }

        // Player-triggered growth transitions (edge-triggered).
        if input.eject {
            let spawned = growth::eject(&mut self.player, input.aim_direction(), &self.config);
            self.sync
                .upsert_pixels(&spawned.iter().collect::<Vec<_>>(), now as i64);
            for pixel in spawned {
                self.world.insert_pixel(pixel);
            }
        }
        if input.split {
            for id in growth::split(&mut self.player, input.aim_direction(), &self.config, now) {
                self.world.mark_owned(&id);
            }
        }

        // Sibling merge/repel/attract pass.
        let merged = growth::merge_pass(&mut self.player, &self.config, now, dt);
        for id in &merged {
            self.world.unmark_owned(id);
        }
        self.sync.delete_cells(merged);

        // Consumption and kill decisions.
        let report = collision::resolve(&mut self.player, &self.world, &self.config, now);
        for id in &report.created_cells {
            self.world.mark_owned(id);
        }
        self.sync
            .apply_consumption(&mut self.world, &report.eaten_pixels, &report.eaten_remote);
        for id in &report.lost_cells {
            self.world.unmark_owned(id);
        }
        self.sync.delete_cells(report.lost_cells.clone());

        // Keep the arena stocked while the population is low.
        self.seed_food(now);

        // Outbound sync and cleanup.
        self.sync.flush_outbound(&self.player, &self.config, now);
        self.sync
            .collect_garbage(&mut self.world, &self.player, &self.config, now);
        self.leaderboard
            .update(&self.world, &self.player, &self.config, now);

        if report.eliminated {
            info!("Player {} eliminated", self.player.session);
            TickOutcome::Eliminated
        } else {
            TickOutcome::Running
        }
    }

    /// Probabilistically insert one food pixel while the global pixel
    /// population is under the cap. Every client shares this duty; the
    /// upsert makes it visible to the room.
    fn seed_food(&mut self, now: f64) {
        if self.world.pixels.len() >= self.config.food.max_pixels {
            return;
        }
        let mut rng = rand::rng();
        if !rng.random_bool(self.config.food.spawn_chance) {
            return;
        }
        let pixel = Pixel::food(
            self.player.next_id(),
            self.world.bounds.random_position(),
            random_color(),
        );
        self.sync.upsert_pixels(&[&pixel], now as i64);
        self.world.insert_pixel(pixel);
    }

    /// Re-enter the arena after elimination.
    pub fn respawn(&mut self, now: f64) {
        if self.player.status == PlayerStatus::Alive {
            return;
        }
        self.spawn_player(now);
        self.last_tick = None;
        info!("Player {} respawned", self.player.session);
    }

    /// Aggregate owned mass, for the score display.
    pub fn score(&self) -> f32 {
        self.player.total_mass()
    }

    /// Camera anchor: mass-weighted center of the owned cells.
    pub fn camera(&self) -> Option<Vec2> {
        physics::camera_center(&self.player)
    }
}
