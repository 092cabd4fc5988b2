use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, trace, warn};

use crate::config::{DifficultyProfile, MatchConfig};
use crate::constants::{
    active_ghost_count, scaled_points, BONUS_SPAWN_INTERVAL, COLLISION_FACTOR, DEATH_FREEZE_TICKS,
    DOT_POINTS, FRUIT_POINTS_STEP, FRUIT_SPAWN_CHANCE, GHOST_POINTS, KEY_POINTS,
    KEY_RESCUE_RADIUS, KEY_SPAWN_CHANCE, PELLET_POINTS, TILE_SIZE,
};
use crate::input::MetaCommand;
use crate::map::{Tile, TileMap};
use crate::net::prediction::{Interpolator, Reconciler};
use crate::net::snapshot::{GhostSnapshot, PlayerSnapshot, SequenceGate, Snapshot};
use crate::pathfinding::find_path;
use crate::rng::Rng;
use crate::types::{
    Direction, GhostKind, GhostMode, GhostView, MatchOutcome, MatchPhase, MatchResult,
    PlayerSlot, PlayerView, RenderView, Role, Vec2,
};

pub mod entity;
pub mod ghost;
pub mod mode;
pub mod targeting;
pub(crate) mod utils;

pub use self::utils::offset;

use self::entity::Entity;
use self::ghost::Ghost;
use self::mode::ModeCycle;
use self::targeting::{Pursuit, Quarry};
use self::utils::{euclid, pixel_distance};

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub slot: PlayerSlot,
    pub body: Entity,
    /// Held direction; the player keeps trying it every tick.
    pub input: Option<Direction>,
    pub alive: bool,
    pub score: i32,
    pub dots_eaten: u32,
    pub has_key: bool,
}

impl Player {
    fn new(slot: PlayerSlot, spawn: Vec2, speed: f64) -> Self {
        Self {
            slot,
            body: Entity::new(spawn, speed, false),
            input: None,
            alive: true,
            score: 0,
            dots_eaten: 0,
            has_key: false,
        }
    }

    fn quarry(&self) -> Quarry {
        Quarry {
            cell: self.body.cell,
            dir: self.body.last_dir,
            dots_eaten: self.dots_eaten,
        }
    }
}

/// Display smoothing owned by a client engine.
#[derive(Clone, Debug)]
struct ClientSync {
    gate: SequenceGate,
    reconciler: Reconciler,
    remote_player: Interpolator,
    ghosts: Vec<Interpolator>,
}

/// One match. Owned by a single simulation task; never touches I/O.
#[derive(Clone, Debug)]
pub struct MatchEngine {
    config: MatchConfig,
    profile: DifficultyProfile,
    map: TileMap,
    players: Vec<Player>,
    ghosts: Vec<Ghost>,
    modes: ModeCycle,
    rng: Rng,
    phase: MatchPhase,
    outcome: Option<MatchOutcome>,
    pending_result: Option<MatchResult>,
    global_tick: u64,
    sim_tick: u64,
    freeze_ticks: u32,
    pellets_eaten: u32,
    key_spawned: bool,
    bonus_timer: u32,
    client: Option<ClientSync>,
}

impl MatchEngine {
    pub fn new(config: MatchConfig) -> Self {
        let profile = config.profile();
        let map = TileMap::from_template(profile.map);
        let player_count = if config.role.is_duo() { 2 } else { 1 };
        let players: Vec<Player> = [PlayerSlot::One, PlayerSlot::Two]
            .into_iter()
            .take(player_count)
            .map(|slot| {
                let spawn = map.clamp(profile.player_spawns[slot.index()]);
                Player::new(slot, spawn, profile.speed)
            })
            .collect();

        let nominal = map.clamp(profile.ghost_spawn);
        let jail_exit = profile.jail_exit(&map);
        let (cells, fallback) = map.jail_spawn_cells(nominal);
        if fallback {
            warn!(
                x = nominal.x,
                y = nominal.y,
                "no open jail tiles near ghost spawn; using unchecked offsets"
            );
        }
        let ghosts: Vec<Ghost> = GhostKind::ALL
            .iter()
            .enumerate()
            .map(|(index, kind)| {
                let spawn = cells[index % cells.len()];
                Ghost::new(*kind, spawn, jail_exit, profile.jail_ticks, profile.speed)
            })
            .collect();

        let client = (config.role == Role::Client).then(|| ClientSync {
            gate: SequenceGate::default(),
            reconciler: Reconciler::default(),
            remote_player: Interpolator::new(players[0].body.target_pixel()),
            ghosts: ghosts
                .iter()
                .map(|ghost| Interpolator::new(ghost.body.target_pixel()))
                .collect(),
        });

        info!(
            difficulty = config.difficulty.label(),
            role = ?config.role,
            seed = config.seed,
            "match created"
        );

        Self {
            config,
            profile,
            map,
            players,
            ghosts,
            modes: ModeCycle::new(profile.scatter_secs, profile.chase_secs),
            rng: Rng::new(config.seed),
            phase: MatchPhase::Menu,
            outcome: None,
            pending_result: None,
            global_tick: 0,
            sim_tick: 0,
            freeze_ticks: 0,
            pellets_eaten: 0,
            key_spawned: false,
            bonus_timer: 0,
            client,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    pub fn mode(&self) -> GhostMode {
        self.modes.current()
    }

    pub fn frightened_ticks(&self) -> u32 {
        self.modes.frightened_ticks()
    }

    pub fn global_tick(&self) -> u64 {
        self.global_tick
    }

    pub fn sim_tick(&self) -> u64 {
        self.sim_tick
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn ghosts(&self) -> &[Ghost] {
        &self.ghosts
    }

    pub fn player(&self, slot: PlayerSlot) -> Option<&Player> {
        self.players.get(slot.index())
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze_ticks > 0
    }

    /// Score of the player this process controls.
    pub fn local_score(&self) -> i32 {
        self.player(self.config.role.local_slot())
            .map(|player| player.score)
            .unwrap_or(0)
    }

    pub fn set_input(&mut self, slot: PlayerSlot, dir: Direction) {
        if let Some(player) = self.players.get_mut(slot.index()) {
            player.input = Some(dir);
        }
    }

    pub fn start(&mut self) {
        if self.phase == MatchPhase::Menu && self.outcome.is_none() {
            self.phase = MatchPhase::Running;
            info!(tick = self.sim_tick, "match running");
        }
    }

    /// Applies a lifecycle command. Quit is left to the caller.
    pub fn handle_meta(&mut self, command: MetaCommand) {
        match command {
            MetaCommand::Start => self.start(),
            MetaCommand::TogglePause => {
                self.phase = match self.phase {
                    MatchPhase::Running => MatchPhase::Paused,
                    MatchPhase::Paused => MatchPhase::Running,
                    other => other,
                };
            }
            MetaCommand::Menu => {
                if self.phase != MatchPhase::GameOver {
                    self.phase = MatchPhase::Menu;
                }
            }
            MetaCommand::Quit => {}
        }
    }

    /// The match result, handed out exactly once.
    pub fn take_result(&mut self) -> Option<MatchResult> {
        self.pending_result.take()
    }

    pub fn step(&mut self) {
        if self.phase != MatchPhase::Running {
            return;
        }
        self.sim_tick += 1;
        if self.freeze_ticks > 0 {
            self.freeze_ticks -= 1;
            if self.freeze_ticks == 0 {
                self.check_defeat();
            }
            return;
        }

        let authoritative = self.config.role.is_authoritative();
        if authoritative {
            self.modes.advance(self.global_tick);
        }
        self.move_players();
        if authoritative {
            self.update_ghosts();
            self.collect_pickups();
            self.update_bonus_spawns();
            self.rescue_with_key();
            if self.outcome.is_none() && !self.map.has_collectibles() {
                self.finish(MatchOutcome::Won);
            }
        } else {
            self.apply_corrections();
        }
        self.global_tick += 1;
    }

    fn move_players(&mut self) {
        let local = self.config.role.local_slot();
        let predict_only = !self.config.role.is_authoritative();
        let multiplier = self.profile.point_multiplier;
        for player in &mut self.players {
            if !player.alive || (predict_only && player.slot != local) {
                continue;
            }
            player.body.advance(player.input, &mut self.map);
            if player.body.ate_dot {
                player.score += scaled_points(DOT_POINTS, multiplier);
                player.dots_eaten += 1;
            }
        }
    }

    fn pursuit(&self) -> Option<Pursuit> {
        let mut alive = self.players.iter().filter(|player| player.alive);
        match (alive.next(), alive.next()) {
            (Some(one), Some(two)) => Some(Pursuit::Pair(one.quarry(), two.quarry())),
            (Some(one), None) => Some(Pursuit::Single(one.quarry())),
            _ => None,
        }
    }

    fn update_ghosts(&mut self) {
        let active = active_ghost_count(self.pellets_eaten).min(self.ghosts.len());
        for index in 0..active {
            let pursuit = self.pursuit();
            let reference = self.ghosts[0].cell();
            let mode = self.modes.current();
            let ghost = &mut self.ghosts[index];
            if ghost.tick_jail() {
                ghost.retarget(mode, pursuit, reference, &self.map, &mut self.rng);
                ghost.step(&mut self.map);
            }
            self.resolve_collisions(index);
        }
    }

    fn resolve_collisions(&mut self, index: usize) {
        let frightened = self.modes.current() == GhostMode::Frightened;
        let multiplier = self.profile.point_multiplier;
        let reach = TILE_SIZE * COLLISION_FACTOR;
        for slot in 0..self.players.len() {
            let ghost = &mut self.ghosts[index];
            let player = &mut self.players[slot];
            if !player.alive || !ghost.is_tangible() {
                continue;
            }
            let dist = pixel_distance(
                player.body.pixel_x,
                player.body.pixel_y,
                ghost.body.pixel_x,
                ghost.body.pixel_y,
            );
            if dist >= reach {
                continue;
            }
            if frightened {
                ghost.set_eaten();
                player.score += scaled_points(GHOST_POINTS, multiplier);
                debug!(ghost = ?ghost.kind, player = ?player.slot, "ghost eaten");
            } else {
                player.alive = false;
                self.freeze_ticks = DEATH_FREEZE_TICKS;
                info!(player = ?player.slot, ghost = ?ghost.kind, tick = self.sim_tick, "player caught");
            }
        }
    }

    fn collect_pickups(&mut self) {
        let multiplier = self.profile.point_multiplier;
        for player in &mut self.players {
            if !player.alive {
                continue;
            }
            let cell = player.body.cell;
            match self.map.get(cell.x, cell.y) {
                Some(Tile::PowerPellet) => {
                    self.map.take_collectible(cell.x, cell.y);
                    self.modes.frighten();
                    self.pellets_eaten += 1;
                    player.score += scaled_points(PELLET_POINTS, multiplier);
                    debug!(player = ?player.slot, pellets = self.pellets_eaten, "power pellet");
                }
                Some(Tile::Bonus(kind)) => {
                    self.map.take_collectible(cell.x, cell.y);
                    let base = (i32::from(kind) + 1) * FRUIT_POINTS_STEP;
                    player.score += scaled_points(base, multiplier);
                }
                Some(Tile::Key) => {
                    self.map.take_collectible(cell.x, cell.y);
                    player.has_key = true;
                    player.score += scaled_points(KEY_POINTS, multiplier);
                    info!(player = ?player.slot, "key collected");
                }
                _ => {}
            }
        }
    }

    fn update_bonus_spawns(&mut self) {
        self.bonus_timer += 1;
        if self.bonus_timer < BONUS_SPAWN_INTERVAL {
            return;
        }
        self.bonus_timer = 0;
        let dots = self.map.cells_of(Tile::Dot);
        if dots.is_empty() {
            return;
        }
        if self.rng.chance(FRUIT_SPAWN_CHANCE) {
            let cell = dots[self.rng.pick_index(dots.len())];
            let kind = self.rng.below(7) as u8;
            self.map.set(cell.x, cell.y, Tile::Bonus(kind));
            debug!(x = cell.x, y = cell.y, kind, "bonus fruit spawned");
        }
        if self.config.role.is_duo() && !self.key_spawned && self.rng.chance(KEY_SPAWN_CHANCE) {
            let cell = dots[self.rng.pick_index(dots.len())];
            self.map.set(cell.x, cell.y, Tile::Key);
            self.key_spawned = true;
            info!(x = cell.x, y = cell.y, "key spawned");
        }
    }

    fn rescue_with_key(&mut self) {
        if self.players.len() < 2 {
            return;
        }
        for (holder, partner) in [(0usize, 1usize), (1, 0)] {
            let (h, p) = (&self.players[holder], &self.players[partner]);
            if !h.alive || !h.has_key || p.alive {
                continue;
            }
            if euclid(h.body.cell, p.body.cell) > KEY_RESCUE_RADIUS {
                continue;
            }
            let cell = h.body.cell;
            self.players[holder].has_key = false;
            let partner = &mut self.players[partner];
            partner.alive = true;
            partner.body.place(cell);
            info!(player = ?partner.slot, "partner revived with key");
        }
    }

    fn check_defeat(&mut self) {
        if self.outcome.is_none() && self.players.iter().all(|player| !player.alive) {
            self.finish(MatchOutcome::Lost);
        }
    }

    fn finish(&mut self, outcome: MatchOutcome) {
        if self.outcome.is_some() {
            return;
        }
        self.outcome = Some(outcome);
        self.phase = MatchPhase::GameOver;
        let result = MatchResult {
            score: self.local_score(),
            difficulty: self.config.difficulty,
            mode: self.config.role.game_mode(),
            outcome,
            finished_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        info!(
            outcome = ?outcome,
            score = result.score,
            mode = result.mode.label(),
            tick = self.sim_tick,
            "match finished"
        );
        self.pending_result = Some(result);
    }

    fn apply_corrections(&mut self) {
        let local = self.config.role.local_slot().index();
        let Some(client) = self.client.as_mut() else {
            return;
        };
        if let Some(player) = self.players.get_mut(local) {
            client.reconciler.apply(&mut player.body);
        }
        for player in &mut self.players {
            if player.slot.index() != local {
                (player.body.pixel_x, player.body.pixel_y) = client.remote_player.tick();
            }
        }
        for (ghost, interp) in self.ghosts.iter_mut().zip(client.ghosts.iter_mut()) {
            (ghost.body.pixel_x, ghost.body.pixel_y) = interp.tick();
        }
    }

    /// Host-side frame for the broadcaster. `seq` is stamped on send.
    pub fn capture_snapshot(&self) -> Snapshot {
        let player = |slot: usize| {
            self.players.get(slot).map(|player| PlayerSnapshot {
                cell: player.body.cell,
                pixel_x: player.body.pixel_x as i32,
                pixel_y: player.body.pixel_y as i32,
                dir: player.body.last_dir,
            })
        };
        let field = |slot: usize, read: fn(&Player) -> bool| {
            self.players.get(slot).map(read).unwrap_or(false)
        };
        Snapshot {
            players: [player(0), player(1)],
            scores: [
                self.players.first().map_or(0, |p| p.score),
                self.players.get(1).map_or(0, |p| p.score),
            ],
            alive: [field(0, |p| p.alive), field(1, |p| p.alive)],
            mode: self.modes.current(),
            frightened_ticks: self.modes.frightened_ticks(),
            pellets_eaten: self.pellets_eaten,
            has_key: [field(0, |p| p.has_key), field(1, |p| p.has_key)],
            key_spawned: self.key_spawned,
            ghosts: self
                .ghosts
                .iter()
                .map(|ghost| {
                    let (eaten, jailed, jail_ticks) = GhostSnapshot::flags_for(ghost.state);
                    GhostSnapshot {
                        cell: ghost.body.cell,
                        pixel_x: ghost.body.pixel_x as i32,
                        pixel_y: ghost.body.pixel_y as i32,
                        eaten,
                        jailed,
                        jail_ticks,
                        dir: ghost.heading,
                    }
                })
                .collect(),
            collectibles: self.map.collectibles(),
            seq: 0,
            global_tick: self.global_tick,
            sim_tick: self.sim_tick,
        }
    }

    /// Client side. Returns false, leaving every field untouched, when the
    /// snapshot is not newer than the last one applied.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) -> bool {
        let local = self.config.role.local_slot().index();
        let Some(client) = self.client.as_mut() else {
            return false;
        };
        if !client.gate.accept(snapshot.seq) {
            trace!(seq = snapshot.seq, "stale snapshot dropped");
            return false;
        }

        self.map.replace_collectibles(&snapshot.collectibles);
        self.modes.sync(snapshot.mode, snapshot.frightened_ticks);
        self.pellets_eaten = snapshot.pellets_eaten;
        self.key_spawned = snapshot.key_spawned;
        self.global_tick = snapshot.global_tick;
        self.sim_tick = snapshot.sim_tick;

        for (index, player) in self.players.iter_mut().enumerate() {
            let was_alive = player.alive;
            player.score = snapshot.scores[index];
            player.alive = snapshot.alive[index];
            player.has_key = snapshot.has_key[index];
            let Some(remote) = snapshot.players[index] else {
                continue;
            };
            let pixel = (f64::from(remote.pixel_x), f64::from(remote.pixel_y));
            if index == local {
                if !was_alive && player.alive {
                    player.body.place(remote.cell);
                    client.reconciler.clear();
                } else {
                    client.reconciler.observe(player.body.cell, remote.cell, pixel);
                }
            } else {
                player.body.cell = remote.cell;
                player.body.last_dir = remote.dir;
                client
                    .remote_player
                    .retarget((player.body.pixel_x, player.body.pixel_y), pixel);
            }
        }

        for ((ghost, remote), interp) in self
            .ghosts
            .iter_mut()
            .zip(&snapshot.ghosts)
            .zip(client.ghosts.iter_mut())
        {
            ghost.body.cell = remote.cell;
            ghost.body.last_dir = remote.dir;
            ghost.heading = remote.dir;
            ghost.state = remote.state();
            ghost.target = remote.cell;
            interp.retarget(
                (ghost.body.pixel_x, ghost.body.pixel_y),
                (f64::from(remote.pixel_x), f64::from(remote.pixel_y)),
            );
        }

        if self.outcome.is_none() {
            if !self.map.has_collectibles() {
                self.finish(MatchOutcome::Won);
            } else if self.players.iter().all(|player| !player.alive) {
                self.finish(MatchOutcome::Lost);
            }
        }
        true
    }

    pub fn render_view(&self) -> RenderView {
        let authoritative = self.config.role.is_authoritative();
        RenderView {
            tick: self.sim_tick,
            phase: self.phase,
            mode: self.modes.current(),
            frightened_ticks: self.modes.frightened_ticks(),
            pellets_eaten: self.pellets_eaten,
            key_spawned: self.key_spawned,
            tiles: self.map.codes(),
            players: self
                .players
                .iter()
                .map(|player| PlayerView {
                    slot: player.slot,
                    x: player.body.cell.x,
                    y: player.body.cell.y,
                    pixel_x: player.body.pixel_x,
                    pixel_y: player.body.pixel_y,
                    dir: player.body.last_dir,
                    alive: player.alive,
                    score: player.score,
                    has_key: player.has_key,
                })
                .collect(),
            ghosts: self
                .ghosts
                .iter()
                .map(|ghost| GhostView {
                    kind: ghost.kind,
                    x: ghost.cell().x,
                    y: ghost.cell().y,
                    pixel_x: ghost.body.pixel_x,
                    pixel_y: ghost.body.pixel_y,
                    dir: ghost.heading,
                    phase: ghost.state.phase(),
                    target: ghost.target,
                    path: if authoritative {
                        find_path(&self.map, ghost.cell(), ghost.target, ghost.may_cross_gate())
                    } else {
                        Vec::new()
                    },
                })
                .collect(),
        }
    }
}
