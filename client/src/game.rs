//! Client-side arena state
//!
//! The client keeps a local view of the arena: its own actor is
//! predicted from unacknowledged inputs and reconciled against
//! authoritative snapshots; every other actor is driven by snapshots
//! until a movement ability takes over, at which point the client runs
//! the same deterministic phase machine the authority runs, seeded
//! from the activation broadcast. Nothing decided here is gameplay
//! truth; the authority's snapshots and flags always win.

use log::{debug, info, warn};
use shared::ability::{PhaseEvent, RejectReason};
use shared::intent::MovementIntent;
use shared::packet::{ActorSnapshot, CooldownEntry, InputState};
use shared::registry::{AbilityRegistry, SlotEntry};
use shared::replication::{should_apply, PeerId, WirePhase};
use shared::{Actor, ActorId, Vec2, Vec3, DESYNC_SNAP_DISTANCE};
use std::collections::HashMap;

/// Fixed step used when replaying inputs during reconciliation.
const SIM_DT: f32 = 1.0 / 60.0;
/// How long interpolation snapshots are kept, milliseconds.
const INTERP_BUFFER_MS: u64 = 500;

/// Cue handed to the effects collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FxEvent {
    Impact { at: Vec3 },
    ShieldRaised { actor: ActorId },
    ShieldDropped { actor: ActorId },
    BoltFired { from: Vec3, direction: Vec2 },
}

/// The rendering/VFX boundary. The simulation pushes effect cues
/// through this trait and knows nothing else about presentation.
pub trait FxSink {
    fn spawn(&mut self, fx: FxEvent);
}

/// Sink for headless peers.
#[derive(Debug, Default)]
pub struct NullFx;

impl FxSink for NullFx {
    fn spawn(&mut self, _fx: FxEvent) {}
}

pub struct ClientGameState {
    /// Assigned by the authority on connect.
    pub peer: Option<PeerId>,
    pub own_actor: Option<ActorId>,
    /// Local view of every actor: predicted self, simulated remotes.
    pub actors: HashMap<ActorId, Actor>,
    /// Local mirror of each actor's loadout, running the same phase
    /// machines as the authority.
    pub registries: HashMap<ActorId, AbilityRegistry>,
    /// Latest authoritative snapshot per actor.
    pub confirmed: HashMap<ActorId, ActorSnapshot>,
    pub input_history: Vec<InputState>,
    pub last_confirmed_tick: u32,
    /// Timestamped snapshots for remote-actor smoothing.
    pub interpolation_buffer: Vec<(u64, Vec<ActorSnapshot>)>,
    /// Authoritative cooldown mirror for the HUD.
    pub cooldowns: Vec<CooldownEntry>,
    /// Most recent activation refusal, for the HUD to surface.
    pub last_rejection: Option<(u8, RejectReason)>,
    /// Local simulation clock, seconds.
    pub now: f64,
    /// Level state of our dash trigger, fed to the local machine.
    pub dash_held: bool,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self {
            peer: None,
            own_actor: None,
            actors: HashMap::new(),
            registries: HashMap::new(),
            confirmed: HashMap::new(),
            input_history: Vec::new(),
            last_confirmed_tick: 0,
            interpolation_buffer: Vec::new(),
            cooldowns: Vec::new(),
            last_rejection: None,
            now: 0.0,
            dash_held: false,
        }
    }

    pub fn bind(&mut self, peer: PeerId, actor: ActorId) {
        self.peer = Some(peer);
        self.own_actor = Some(actor);
        info!("bound as {} owning {}", peer, actor);
    }

    fn is_own(&self, actor: ActorId) -> bool {
        self.own_actor == Some(actor)
    }

    fn movement_active(&self, actor: ActorId) -> bool {
        self.registries
            .get(&actor)
            .map(|r| r.any_movement_active())
            .unwrap_or(false)
    }

    /// Spawns the local mirror of an actor the first time a snapshot
    /// mentions it, and keeps its loadout aligned afterwards.
    fn ensure_actor(&mut self, snap: &ActorSnapshot) {
        self.actors
            .entry(snap.id)
            .or_insert_with(|| Actor::new(snap.id, snap.position));
        let registry = self.registries.entry(snap.id).or_default();
        for (index, kind) in snap.loadout.iter().enumerate() {
            if !registry.has(*kind) {
                registry.add(*kind, Some(index as u8));
            }
        }
    }

    /// Applies an authoritative state snapshot.
    ///
    /// Remote actors adopt the snapshot outright unless a movement
    /// ability owns their transform locally, in which case only their
    /// steering input and resource scalars flow through. The own actor
    /// reconciles: acknowledged inputs are dropped and, past the drift
    /// threshold, the predicted state is rebuilt from the confirmed one
    /// by replaying what the authority has not seen yet.
    pub fn apply_snapshot(
        &mut self,
        tick: u32,
        timestamp: u64,
        last_processed: &HashMap<PeerId, u32>,
        snaps: Vec<ActorSnapshot>,
    ) {
        for snap in &snaps {
            self.ensure_actor(snap);
        }
        // Actors missing from the snapshot despawned.
        self.actors.retain(|id, _| snaps.iter().any(|s| s.id == *id));
        self.registries.retain(|id, _| snaps.iter().any(|s| s.id == *id));

        for snap in &snaps {
            self.confirmed.insert(snap.id, snap.clone());

            let phase_owned = self.movement_active(snap.id);
            let own = self.is_own(snap.id);
            let Some(actor) = self.actors.get_mut(&snap.id) else {
                continue;
            };

            // Authority-owned scalars always flow.
            actor.mana.current = snap.mana;
            actor.health.current = snap.health;

            if own {
                continue;
            }
            // Steering input still flows while a machine owns the
            // transform; the transform itself does not.
            actor.move_target = snap.move_target;
            if !phase_owned {
                actor.position = snap.position;
                actor.velocity = snap.velocity;
                actor.facing = snap.facing;
            }
        }

        self.interpolation_buffer.push((timestamp, snaps));
        let cutoff = timestamp.saturating_sub(INTERP_BUFFER_MS);
        self.interpolation_buffer.retain(|(ts, _)| *ts > cutoff);

        self.reconcile_own(last_processed);
        self.last_confirmed_tick = tick;
    }

    fn reconcile_own(&mut self, last_processed: &HashMap<PeerId, u32>) {
        let (Some(peer), Some(own)) = (self.peer, self.own_actor) else {
            return;
        };
        if let Some(&acked) = last_processed.get(&peer) {
            self.input_history.retain(|i| i.sequence > acked);
        }
        // Never fight the phase machine for the transform.
        if self.movement_active(own) {
            return;
        }
        let Some(confirmed) = self.confirmed.get(&own) else {
            return;
        };
        let pending = self.input_history.clone();
        let Some(actor) = self.actors.get_mut(&own) else {
            return;
        };

        let drift = actor.position.distance(&confirmed.position);
        if drift <= DESYNC_SNAP_DISTANCE {
            return;
        }
        debug!("rollback: drifted {:.2} from confirmed", drift);
        actor.position = confirmed.position;
        actor.velocity = confirmed.velocity;
        actor.facing = confirmed.facing;
        actor.move_target = confirmed.move_target;
        for input in &pending {
            actor.move_target = input.move_target;
            actor.step_locomotion(SIM_DT);
        }
    }

    /// Records a sent input and applies its steering locally.
    pub fn apply_prediction(&mut self, input: &InputState) {
        self.input_history.push(input.clone());
        self.dash_held = input.dash_held;
        let Some(own) = self.own_actor else {
            return;
        };
        if self.movement_active(own) {
            return;
        }
        if let Some(actor) = self.actors.get_mut(&own) {
            actor.move_target = input.move_target;
        }
    }

    /// Advances the local simulation one tick: every mirrored phase
    /// machine, then own-actor locomotion prediction.
    pub fn step(&mut self, dt: f32, fx: &mut dyn FxSink) {
        self.now += dt as f64;
        let now = self.now;

        let mut ids: Vec<ActorId> = self.actors.keys().copied().collect();
        ids.sort();

        for id in ids {
            // Remote dash holds until the authority flags the brake;
            // our own dash predicts from the real trigger state.
            let held = if self.is_own(id) { self.dash_held } else { true };
            let count = self.registries.get(&id).map(|r| r.len()).unwrap_or(0);

            for index in 0..count {
                let events = {
                    let (Some(actor), Some(registry)) =
                        (self.actors.get_mut(&id), self.registries.get_mut(&id))
                    else {
                        continue;
                    };
                    let Some(instance) = registry.at_mut(index) else {
                        continue;
                    };
                    instance.tick(actor, now, dt, held)
                };
                self.emit_fx(id, &events, fx);
            }

            if self.is_own(id) && !self.movement_active(id) {
                if let Some(actor) = self.actors.get_mut(&id) {
                    actor.step_locomotion(dt);
                }
            }
        }
    }

    /// Adopts an activation broadcast: reconstructs the canonical
    /// intent and starts the local phase machine from it. Returns
    /// whether the broadcast was applied.
    pub fn apply_broadcast(
        &mut self,
        origin: PeerId,
        activator: PeerId,
        actor_id: ActorId,
        ability: u8,
        direction: Vec2,
        distance: f32,
        target: Vec3,
        fx: &mut dyn FxSink,
    ) -> bool {
        if let Some(me) = self.peer {
            if !should_apply(origin, me) {
                debug!("dropping echoed activation for {}", actor_id);
                return false;
            }
        }
        let now = self.now;
        let events = {
            let (Some(actor), Some(registry)) = (
                self.actors.get_mut(&actor_id),
                self.registries.get_mut(&actor_id),
            ) else {
                warn!("activation broadcast for unknown {}", actor_id);
                return false;
            };
            let Some(instance) = registry.at_mut(ability as usize) else {
                warn!("{} has no ability index {}", actor_id, ability);
                return false;
            };
            // A re-delivered broadcast must not restart the machine.
            if instance.wire_phase() != WirePhase::Idle {
                debug!("duplicate activation for {} ignored", actor_id);
                return false;
            }
            // The canonical origin is recoverable from target and
            // distance; the actor's local position may have drifted.
            let origin_pos = Vec3::new(
                target.x - direction.x * distance,
                target.y,
                target.z - direction.z * distance,
            );
            let intent =
                MovementIntent::from_broadcast(origin_pos, direction, distance, actor.facing);
            instance.adopt_broadcast(actor, intent, now)
        };
        self.emit_fx(actor_id, &events, fx);
        debug!("{} adopted activation from {}", actor_id, activator);
        true
    }

    /// Applies an authority phase flag. Self-originated echoes are
    /// filtered; re-applied flags are no-ops inside the machine.
    pub fn apply_phase(
        &mut self,
        origin: PeerId,
        actor_id: ActorId,
        ability: u8,
        phase: WirePhase,
        fx: &mut dyn FxSink,
    ) -> bool {
        if let Some(me) = self.peer {
            if !should_apply(origin, me) {
                return false;
            }
        }
        let now = self.now;
        let events = {
            let (Some(actor), Some(registry)) = (
                self.actors.get_mut(&actor_id),
                self.registries.get_mut(&actor_id),
            ) else {
                return false;
            };
            let Some(instance) = registry.at_mut(ability as usize) else {
                return false;
            };
            instance.apply_wire_phase(actor, phase, now)
        };
        let applied = !events.is_empty();
        self.emit_fx(actor_id, &events, fx);
        applied
    }

    /// Cosmetic smoothing toward the authority's throttled position
    /// stream. Gameplay state is never driven from here.
    pub fn apply_live_position(&mut self, actor_id: ActorId, position: Vec3) {
        if self.is_own(actor_id) {
            return;
        }
        if let Some(actor) = self.actors.get_mut(&actor_id) {
            actor.position = actor.position.lerp(&position, 0.5);
        }
    }

    /// Authoritative cooldown values for our own loadout.
    pub fn apply_cooldown_sync(&mut self, entries: Vec<CooldownEntry>) {
        let now = self.now;
        if let Some(registry) = self.own_actor.and_then(|id| self.registries.get_mut(&id)) {
            for entry in &entries {
                if let Some(instance) = registry.at_mut(entry.ability as usize) {
                    instance.cooldown_until = now + entry.remaining as f64;
                    instance.ready = entry.ready;
                }
            }
        }
        self.cooldowns = entries;
    }

    /// Forced correction from the authority; prediction restarts from
    /// the snapped state.
    pub fn apply_force_snap(&mut self, actor_id: ActorId, position: Vec3, facing: Vec2) {
        warn!("{} snapped by authority", actor_id);
        if let Some(actor) = self.actors.get_mut(&actor_id) {
            actor.position = position;
            actor.facing = facing;
            actor.velocity = Vec3::default();
        }
        if self.is_own(actor_id) {
            self.input_history.clear();
        }
    }

    pub fn apply_rejection(&mut self, ability: u8, reason: RejectReason) {
        info!("ability {} refused: {:?}", ability, reason);
        self.last_rejection = Some((ability, reason));
    }

    /// HUD-facing slot table for our own loadout.
    pub fn slot_view(&self) -> Vec<SlotEntry> {
        self.own_actor
            .and_then(|id| self.registries.get(&id))
            .map(|r| r.slot_view(self.now))
            .unwrap_or_default()
    }

    /// Presentation read surface: where each actor should be drawn at
    /// `render_time` (milliseconds, same clock as snapshot timestamps).
    /// Our own actor and phase-controlled actors come from the local
    /// simulation; everything else interpolates between snapshots.
    pub fn view_positions(&self, render_time: u64) -> Vec<(ActorId, Vec3)> {
        let mut ids: Vec<ActorId> = self.actors.keys().copied().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| {
                let actor = self.actors.get(&id)?;
                if self.is_own(id) || self.movement_active(id) {
                    return Some((id, actor.position));
                }
                Some((id, self.interpolated_position(id, render_time).unwrap_or(actor.position)))
            })
            .collect()
    }

    fn interpolated_position(&self, id: ActorId, render_time: u64) -> Option<Vec3> {
        let mut before = None;
        let mut after = None;
        for (ts, snaps) in &self.interpolation_buffer {
            let Some(snap) = snaps.iter().find(|s| s.id == id) else {
                continue;
            };
            if *ts <= render_time {
                before = Some((*ts, snap.position));
            } else {
                after = Some((*ts, snap.position));
                break;
            }
        }
        match (before, after) {
            (Some((t1, p1)), Some((t2, p2))) if t2 > t1 => {
                let alpha = ((render_time - t1) as f32) / ((t2 - t1) as f32);
                Some(p1.lerp(&p2, alpha.clamp(0.0, 1.0)))
            }
            (Some((_, p)), _) => Some(p),
            (None, Some((_, p))) => Some(p),
            (None, None) => None,
        }
    }

    fn emit_fx(&mut self, id: ActorId, events: &[PhaseEvent], fx: &mut dyn FxSink) {
        for event in events {
            match *event {
                PhaseEvent::Impact { center } => fx.spawn(FxEvent::Impact { at: center }),
                PhaseEvent::ShieldRaised => fx.spawn(FxEvent::ShieldRaised { actor: id }),
                PhaseEvent::ShieldDropped => fx.spawn(FxEvent::ShieldDropped { actor: id }),
                PhaseEvent::ProjectileSpawn { origin, direction } => fx.spawn(FxEvent::BoltFired {
                    from: origin,
                    direction,
                }),
                PhaseEvent::Transition(_) | PhaseEvent::CooldownStart => {}
            }
        }
    }
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::ability::leap::{LEAP_FALL_TIME, LEAP_IMPACT_PAUSE, LEAP_RISE_TIME};
    use shared::ability::AbilityKind;
    use shared::GROUND_Y;

    const DT: f32 = 0.05;

    #[derive(Default)]
    struct RecordingFx(Vec<FxEvent>);

    impl FxSink for RecordingFx {
        fn spawn(&mut self, fx: FxEvent) {
            self.0.push(fx);
        }
    }

    fn snapshot(id: ActorId, position: Vec3) -> ActorSnapshot {
        ActorSnapshot {
            id,
            position,
            velocity: Vec3::default(),
            facing: Vec2::new(0.0, 1.0),
            move_target: None,
            mana: shared::MANA_MAX,
            health: shared::HEALTH_MAX,
            loadout: AbilityKind::ALL.to_vec(),
            movement_locked: false,
        }
    }

    /// An observer with a bound peer and one remote actor in view.
    fn observer(me: PeerId, remote: ActorId) -> ClientGameState {
        let mut state = ClientGameState::new();
        state.peer = Some(me);
        state.apply_snapshot(
            1,
            1000,
            &HashMap::new(),
            vec![snapshot(remote, Vec3::new(0.0, GROUND_Y, 0.0))],
        );
        state
    }

    fn leap_index(state: &ClientGameState, actor: ActorId) -> u8 {
        state
            .registries
            .get(&actor)
            .unwrap()
            .index_of(AbilityKind::Leap)
            .unwrap() as u8
    }

    #[test]
    fn test_snapshot_spawns_actor_and_loadout() {
        let state = observer(PeerId(2), ActorId(7));
        assert!(state.actors.contains_key(&ActorId(7)));
        assert_eq!(state.registries[&ActorId(7)].len(), AbilityKind::ALL.len());
    }

    #[test]
    fn test_snapshot_despawns_missing_actors() {
        let mut state = observer(PeerId(2), ActorId(7));
        state.apply_snapshot(
            2,
            1100,
            &HashMap::new(),
            vec![snapshot(ActorId(8), Vec3::default())],
        );
        assert!(!state.actors.contains_key(&ActorId(7)));
        assert!(state.actors.contains_key(&ActorId(8)));
    }

    #[test]
    fn test_broadcast_adoption_starts_local_machine() {
        let mut state = observer(PeerId(2), ActorId(7));
        let mut fx = NullFx;
        let applied = state.apply_broadcast(
            PeerId(0),
            PeerId(1),
            ActorId(7),
            leap_index(&state, ActorId(7)),
            Vec2::new(0.0, 1.0),
            6.0,
            Vec3::new(0.0, GROUND_Y, 6.0),
            &mut fx,
        );
        assert!(applied);
        assert!(state.movement_active(ActorId(7)));
    }

    #[test]
    fn test_self_originated_broadcast_is_dropped() {
        let mut state = observer(PeerId(0), ActorId(7));
        let mut fx = NullFx;
        let applied = state.apply_broadcast(
            PeerId(0),
            PeerId(0),
            ActorId(7),
            leap_index(&state, ActorId(7)),
            Vec2::new(0.0, 1.0),
            6.0,
            Vec3::new(0.0, GROUND_Y, 6.0),
            &mut fx,
        );
        assert!(!applied);
        assert!(!state.movement_active(ActorId(7)));
    }

    #[test]
    fn test_adopted_leap_lands_at_broadcast_target() {
        let mut state = observer(PeerId(2), ActorId(7));
        let index = leap_index(&state, ActorId(7));
        let mut fx = RecordingFx::default();
        state.apply_broadcast(
            PeerId(0),
            PeerId(1),
            ActorId(7),
            index,
            Vec2::new(0.0, 1.0),
            6.0,
            Vec3::new(0.0, GROUND_Y, 6.0),
            &mut fx,
        );

        let total = LEAP_RISE_TIME + LEAP_FALL_TIME + LEAP_IMPACT_PAUSE;
        let steps = (total / DT as f64).ceil() as usize + 1;
        for _ in 0..steps {
            state.step(DT, &mut fx);
        }

        let actor = &state.actors[&ActorId(7)];
        assert!(!state.movement_active(ActorId(7)));
        assert_approx_eq!(actor.position.z, 6.0, 1e-3);
        assert_approx_eq!(actor.position.y, GROUND_Y, 1e-5);
        assert_eq!(
            fx.0.iter()
                .filter(|e| matches!(e, FxEvent::Impact { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_phase_flag_applied_once_despite_redelivery() {
        let mut state = observer(PeerId(2), ActorId(7));
        let index = leap_index(&state, ActorId(7));
        let mut fx = RecordingFx::default();
        state.apply_broadcast(
            PeerId(0),
            PeerId(1),
            ActorId(7),
            index,
            Vec2::new(0.0, 1.0),
            6.0,
            Vec3::new(0.0, GROUND_Y, 6.0),
            &mut fx,
        );
        state.step(DT, &mut fx);

        assert!(state.apply_phase(PeerId(0), ActorId(7), index, WirePhase::ImpactPause, &mut fx));
        assert!(!state.apply_phase(PeerId(0), ActorId(7), index, WirePhase::ImpactPause, &mut fx));
        let impacts = fx
            .0
            .iter()
            .filter(|e| matches!(e, FxEvent::Impact { .. }))
            .count();
        assert_eq!(impacts, 1);
    }

    #[test]
    fn test_reconciliation_replays_unacked_inputs() {
        let mut state = ClientGameState::new();
        state.bind(PeerId(1), ActorId(5));
        state.apply_snapshot(
            1,
            1000,
            &HashMap::new(),
            vec![snapshot(ActorId(5), Vec3::default())],
        );

        // Predict far from where the authority will put us.
        let input = InputState {
            sequence: 3,
            timestamp: 1001,
            move_target: Some(Vec3::new(10.0, GROUND_Y, 0.0)),
            dash_held: false,
            reported_position: Vec3::default(),
        };
        state.apply_prediction(&input);
        state.actors.get_mut(&ActorId(5)).unwrap().position = Vec3::new(9.0, GROUND_Y, 0.0);

        // Authority says we are at origin and has seen nothing.
        let mut acked = HashMap::new();
        acked.insert(PeerId(1), 0u32);
        state.apply_snapshot(
            2,
            1050,
            &acked,
            vec![snapshot(ActorId(5), Vec3::default())],
        );

        // Rolled back to confirmed, then replayed one unacked input.
        let pos = state.actors[&ActorId(5)].position;
        assert!(pos.x < 1.0);
        assert_approx_eq!(pos.x, shared::BASE_MOVE_SPEED * SIM_DT, 1e-4);
        assert_eq!(state.input_history.len(), 1);
    }

    #[test]
    fn test_acked_inputs_are_dropped() {
        let mut state = ClientGameState::new();
        state.bind(PeerId(1), ActorId(5));
        state.apply_snapshot(
            1,
            1000,
            &HashMap::new(),
            vec![snapshot(ActorId(5), Vec3::default())],
        );
        for sequence in 1..=4 {
            state.apply_prediction(&InputState {
                sequence,
                timestamp: 1000 + sequence as u64,
                move_target: None,
                dash_held: false,
                reported_position: Vec3::default(),
            });
        }
        let mut acked = HashMap::new();
        acked.insert(PeerId(1), 3u32);
        state.apply_snapshot(2, 1050, &acked, vec![snapshot(ActorId(5), Vec3::default())]);
        assert_eq!(state.input_history.len(), 1);
        assert_eq!(state.input_history[0].sequence, 4);
    }

    #[test]
    fn test_cooldown_sync_updates_slot_view() {
        let mut state = ClientGameState::new();
        state.bind(PeerId(1), ActorId(5));
        state.apply_snapshot(
            1,
            1000,
            &HashMap::new(),
            vec![snapshot(ActorId(5), Vec3::default())],
        );

        state.apply_cooldown_sync(vec![CooldownEntry {
            ability: 0,
            ready: false,
            remaining: 2.5,
        }]);

        let view = state.slot_view();
        let entry = view.iter().find(|e| e.slot == 0).unwrap();
        assert!(!entry.ready);
        assert_approx_eq!(entry.remaining_cooldown, 2.5, 1e-4);
    }

    #[test]
    fn test_force_snap_resets_prediction() {
        let mut state = ClientGameState::new();
        state.bind(PeerId(1), ActorId(5));
        state.apply_snapshot(
            1,
            1000,
            &HashMap::new(),
            vec![snapshot(ActorId(5), Vec3::default())],
        );
        state.apply_prediction(&InputState {
            sequence: 1,
            timestamp: 1001,
            move_target: Some(Vec3::new(5.0, GROUND_Y, 0.0)),
            dash_held: false,
            reported_position: Vec3::default(),
        });

        let snapped = Vec3::new(2.0, GROUND_Y, 2.0);
        state.apply_force_snap(ActorId(5), snapped, Vec2::new(1.0, 0.0));
        assert_eq!(state.actors[&ActorId(5)].position, snapped);
        assert!(state.input_history.is_empty());
    }

    #[test]
    fn test_prediction_suppressed_while_phase_owns_transform() {
        let mut state = ClientGameState::new();
        state.bind(PeerId(1), ActorId(5));
        state.apply_snapshot(
            1,
            1000,
            &HashMap::new(),
            vec![snapshot(ActorId(5), Vec3::default())],
        );
        let index = leap_index(&state, ActorId(5));
        let mut fx = NullFx;
        state.apply_broadcast(
            PeerId(0),
            PeerId(1),
            ActorId(5),
            index,
            Vec2::new(0.0, 1.0),
            6.0,
            Vec3::new(0.0, GROUND_Y, 6.0),
            &mut fx,
        );

        state.apply_prediction(&InputState {
            sequence: 1,
            timestamp: 1001,
            move_target: Some(Vec3::new(5.0, GROUND_Y, 0.0)),
            dash_held: false,
            reported_position: Vec3::default(),
        });
        assert!(state.actors[&ActorId(5)].move_target.is_none());
    }

    #[test]
    fn test_view_interpolates_between_snapshots() {
        let mut state = observer(PeerId(2), ActorId(7));
        state.apply_snapshot(
            2,
            2000,
            &HashMap::new(),
            vec![snapshot(ActorId(7), Vec3::new(0.0, GROUND_Y, 0.0))],
        );
        state.apply_snapshot(
            3,
            2100,
            &HashMap::new(),
            vec![snapshot(ActorId(7), Vec3::new(10.0, GROUND_Y, 0.0))],
        );

        let view = state.view_positions(2050);
        let (_, pos) = view.iter().find(|(id, _)| *id == ActorId(7)).unwrap();
        assert_approx_eq!(pos.x, 5.0, 1e-4);
    }
}
