//! Authoritative arena state
//!
//! Everything gameplay-relevant is decided here, inside the tick:
//! activation gating (cooldown, mana, preconditions), canonical
//! movement parameters, phase advancement, impact effects, projectile
//! flight and desync correction. Peers receive the decisions as
//! broadcasts; nothing a client sends is trusted beyond "I pressed
//! this".

use log::{debug, info, warn};
use rand::Rng;
use shared::ability::bolt::{BOLT_DAMAGE, BOLT_HIT_RADIUS, BOLT_RANGE, BOLT_SPEED};
use shared::ability::dash::DASH_DRAIN_PER_SEC;
use shared::ability::leap::{LEAP_IMPACT_DAMAGE, LEAP_IMPACT_RADIUS};
use shared::ability::{resolve_intent, AbilityKind, ActivationOutcome, PhaseEvent, RejectReason};
use shared::packet::{ActorSnapshot, CooldownEntry, InputState, Packet};
use shared::registry::AbilityRegistry;
use shared::replication::{PeerId, ReplicatedAbilityState, WirePhase};
use shared::scheduler::EventQueue;
use shared::{Actor, ActorId, Vec2, Vec3, DESYNC_SNAP_DISTANCE, GROUND_Y};
use std::collections::HashMap;

/// Spawn-point scatter around the arena center.
const SPAWN_SPREAD: f32 = 8.0;
/// Ticks between periodic cooldown mirrors pushed to owners.
const COOLDOWN_SYNC_INTERVAL: u32 = 30;

/// Where an outgoing packet is headed.
#[derive(Debug, Clone)]
pub enum Outbound {
    Broadcast(Packet),
    To(PeerId, Packet),
}

/// Time-deferred continuations drained once per tick.
#[derive(Debug, Clone, Copy)]
pub enum ScheduledEvent {
    CooldownReady { actor: ActorId, ability: u8 },
}

/// A live bolt in flight. Authority-only; observers render from the
/// activation broadcast.
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u32,
    pub owner: ActorId,
    pub position: Vec3,
    pub direction: Vec2,
    pub traveled: f32,
}

/// The canonical game state.
pub struct GameState {
    pub tick: u32,
    /// Simulation clock, seconds.
    pub now: f64,
    /// Origin tag stamped on every replicated write.
    pub authority: PeerId,
    /// Set in listen mode: the peer that is both authority and player.
    pub local_peer: Option<PeerId>,
    pub local_actor: Option<ActorId>,
    pub actors: HashMap<ActorId, Actor>,
    pub registries: HashMap<ActorId, AbilityRegistry>,
    pub projectiles: Vec<Projectile>,
    owners: HashMap<ActorId, PeerId>,
    replicated: HashMap<ActorId, Vec<ReplicatedAbilityState>>,
    dash_held: HashMap<ActorId, bool>,
    events: EventQueue<ScheduledEvent>,
    outbound: Vec<Outbound>,
    next_actor_id: u32,
    next_projectile_id: u32,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            tick: 0,
            now: 0.0,
            authority: PeerId(0),
            local_peer: None,
            local_actor: None,
            actors: HashMap::new(),
            registries: HashMap::new(),
            projectiles: Vec::new(),
            owners: HashMap::new(),
            replicated: HashMap::new(),
            dash_held: HashMap::new(),
            events: EventQueue::new(),
            outbound: Vec::new(),
            next_actor_id: 1,
            next_projectile_id: 1,
        }
    }

    /// Listen mode: the authority also fields a player of its own.
    pub fn enable_local_host(&mut self) -> ActorId {
        let actor = self.add_actor(self.authority);
        self.local_peer = Some(self.authority);
        self.local_actor = Some(actor);
        info!("listen mode: host owns {}", actor);
        actor
    }

    pub fn add_actor(&mut self, peer: PeerId) -> ActorId {
        let mut rng = rand::thread_rng();
        let x = rng.gen_range(-SPAWN_SPREAD..SPAWN_SPREAD);
        let z = rng.gen_range(-SPAWN_SPREAD..SPAWN_SPREAD);
        self.add_actor_at(peer, Vec3::new(x, GROUND_Y, z))
    }

    /// Deterministic spawn, used by tests and scripted scenarios.
    pub fn add_actor_at(&mut self, peer: PeerId, position: Vec3) -> ActorId {
        let id = ActorId(self.next_actor_id);
        self.next_actor_id += 1;

        let actor = Actor::new(id, position);
        let registry = AbilityRegistry::with_default_loadout();
        self.replicated
            .insert(id, vec![ReplicatedAbilityState::default(); registry.len()]);
        self.actors.insert(id, actor);
        self.registries.insert(id, registry);
        self.owners.insert(id, peer);
        info!("spawned {} for {} at ({:.1}, {:.1})", id, peer, position.x, position.z);
        id
    }

    pub fn remove_actor(&mut self, id: ActorId) {
        if let (Some(mut actor), Some(mut registry)) =
            (self.actors.remove(&id), self.registries.remove(&id))
        {
            registry.remove_all(&mut actor);
            info!("despawned {}", id);
        }
        self.owners.remove(&id);
        self.replicated.remove(&id);
        self.dash_held.remove(&id);
        self.projectiles.retain(|p| p.owner != id);
    }

    pub fn owner_of(&self, actor: ActorId) -> Option<PeerId> {
        self.owners.get(&actor).copied()
    }

    /// Power-up / loadout surface.
    pub fn grant_ability(&mut self, actor: ActorId, kind: AbilityKind, slot: Option<u8>) {
        if let Some(registry) = self.registries.get_mut(&actor) {
            registry.add(kind, slot);
            let len = registry.len();
            let slots = self.replicated.entry(actor).or_default();
            if slots.len() < len {
                slots.resize(len, ReplicatedAbilityState::default());
            }
        }
    }

    pub fn revoke_ability(&mut self, actor_id: ActorId, kind: AbilityKind) -> bool {
        let (Some(actor), Some(registry)) = (
            self.actors.get_mut(&actor_id),
            self.registries.get_mut(&actor_id),
        ) else {
            return false;
        };
        registry.remove(kind, actor)
    }

    /// Applies one sequenced input from a peer: click-to-move steering,
    /// the dash hold state, and the drift check.
    ///
    /// Movement orders are suppressed while a movement ability owns the
    /// transform; the phase machine's writes take priority.
    pub fn apply_input(&mut self, actor_id: ActorId, input: &InputState) {
        let movement_active = self
            .registries
            .get(&actor_id)
            .map(|r| r.any_movement_active())
            .unwrap_or(false);

        let prev_held = self.dash_held.insert(actor_id, input.dash_held).unwrap_or(false);
        if prev_held && !input.dash_held {
            // Early dash termination rides the input stream.
            if let Some(instance) = self
                .registries
                .get_mut(&actor_id)
                .and_then(|r| r.get_mut(AbilityKind::Dash))
            {
                instance.release(self.now);
            }
        }

        let Some(actor) = self.actors.get_mut(&actor_id) else {
            return;
        };

        if movement_active {
            if input.move_target.is_some() {
                debug!("{}: movement input rejected mid-ability", actor_id);
            }
            return;
        }

        actor.move_target = input.move_target.map(|t| t.with_y(GROUND_Y));

        let drift = actor.position.distance(&input.reported_position);
        if drift > DESYNC_SNAP_DISTANCE {
            warn!("{} drifted {:.2} units, snapping", actor_id, drift);
            let snap = Packet::ForceSnap {
                actor: actor_id,
                position: actor.position,
                facing: actor.facing,
            };
            if let Some(owner) = self.owners.get(&actor_id).copied() {
                self.outbound.push(Outbound::To(owner, snap));
            }
        }
    }

    /// The activation gate and broadcast, for a request arriving from
    /// `requester`. Exactly one outcome per attempt; rejections go back
    /// to the requester alone and have no side effects.
    pub fn request_activation(
        &mut self,
        requester: PeerId,
        actor_id: ActorId,
        ability_index: u8,
    ) -> ActivationOutcome {
        let now = self.now;
        let last_dash_ended = self
            .registries
            .get(&actor_id)
            .and_then(|r| r.get(AbilityKind::Dash))
            .and_then(|i| i.dash_last_ended());

        let staged = {
            let (Some(actor), Some(registry)) = (
                self.actors.get_mut(&actor_id),
                self.registries.get_mut(&actor_id),
            ) else {
                warn!("activation request for unknown {}", actor_id);
                return self.reject(requester, ability_index, RejectReason::PreconditionNotMet);
            };
            let movement_busy = registry.any_movement_active();
            let Some(instance) = registry.at_mut(ability_index as usize) else {
                warn!("{} has no ability index {}", actor_id, ability_index);
                return self.reject(requester, ability_index, RejectReason::PreconditionNotMet);
            };

            let wants_transform = matches!(
                instance.kind(),
                AbilityKind::Dash | AbilityKind::Leap | AbilityKind::StrongJump
            );
            if wants_transform && movement_busy {
                // Only one machine may own the transform at a time.
                Err(RejectReason::PreconditionNotMet)
            } else {
                match instance.can_activate(actor, now) {
                    Err(reason) => Err(reason),
                    Ok(()) => {
                        let kind = instance.kind();
                        // Deduct exactly once, before anything is broadcast.
                        actor.mana.spend(instance.def.mana_cost);
                        let intent = resolve_intent(kind, actor, now, last_dash_ended);
                        // Local (authoritative) state is written first ...
                        let events = instance.activate(actor, intent, now);
                        Ok((kind, intent, events))
                    }
                }
            }
        };

        match staged {
            Err(reason) => self.reject(requester, ability_index, reason),
            Ok((kind, intent, events)) => {
                // ... then the replicated variables and the broadcast.
                self.replicated_slot(actor_id, ability_index as usize)
                    .stamp_activation(&intent);
                self.outbound.push(Outbound::Broadcast(Packet::AbilityBroadcast {
                    origin: self.authority,
                    activator: requester,
                    actor: actor_id,
                    ability: ability_index,
                    direction: intent.direction,
                    distance: intent.distance,
                    target: intent.target,
                }));
                self.process_events(actor_id, ability_index, &events);
                info!(
                    "{} activated {} (dist {:.2}) for {}",
                    actor_id, kind, intent.distance, requester
                );
                ActivationOutcome::Activated
            }
        }
    }

    /// Host activation: the authority activating on its own behalf goes
    /// through the identical gate and broadcast path as a remote
    /// request; the host's local view drops the echo by provenance.
    pub fn activate_local(&mut self, ability_index: u8) -> ActivationOutcome {
        let (Some(peer), Some(actor)) = (self.local_peer, self.local_actor) else {
            warn!("local activation without listen mode");
            return ActivationOutcome::Rejected(RejectReason::PreconditionNotMet);
        };
        self.request_activation(peer, actor, ability_index)
    }

    /// Advances the simulation one tick.
    pub fn step(&mut self, dt: f32) {
        self.now += dt as f64;
        self.tick += 1;
        let now = self.now;

        // Scheduled continuations come first.
        for event in self.events.drain_due(now) {
            match event {
                ScheduledEvent::CooldownReady { actor, ability } => {
                    if let Some(instance) = self
                        .registries
                        .get_mut(&actor)
                        .and_then(|r| r.at_mut(ability as usize))
                    {
                        instance.refresh(now);
                        debug!("{} ability {} ready", actor, ability);
                    }
                    self.push_cooldown_sync(actor);
                }
            }
        }

        let mut ids: Vec<ActorId> = self.actors.keys().copied().collect();
        ids.sort();

        for id in ids {
            let held = self.dash_held.get(&id).copied().unwrap_or(false);
            let count = self.registries.get(&id).map(|r| r.len()).unwrap_or(0);

            for index in 0..count {
                let events = {
                    let (Some(actor), Some(registry)) = (
                        self.actors.get_mut(&id),
                        self.registries.get_mut(&id),
                    ) else {
                        continue;
                    };
                    let Some(instance) = registry.at_mut(index) else {
                        continue;
                    };
                    let mut events = instance.tick(actor, now, dt, held);

                    // Continuous dash drain is authority business.
                    if instance.kind() == AbilityKind::Dash
                        && instance.wire_phase() == WirePhase::Phase1
                    {
                        if actor.mana.drain(DASH_DRAIN_PER_SEC * dt) <= 0.0 {
                            debug!("{} dash ended: mana dry", id);
                            events.extend(instance.force_dash_brake(now));
                        }
                    }
                    events
                };
                self.process_events(id, index as u8, &events);
            }

            let movement_active = self
                .registries
                .get(&id)
                .map(|r| r.any_movement_active())
                .unwrap_or(false);

            if let Some(actor) = self.actors.get_mut(&id) {
                if !movement_active {
                    actor.step_locomotion(dt);
                }
                actor.mana.regen(dt);
            }

            if movement_active {
                let active_index = self
                    .registries
                    .get(&id)
                    .and_then(|r| r.iter().position(|a| a.is_movement_active()));
                if let (Some(index), Some(position)) =
                    (active_index, self.actors.get(&id).map(|a| a.position))
                {
                    if self.replicated_slot(id, index).update_live_position(position) {
                        self.outbound
                            .push(Outbound::Broadcast(Packet::LivePosition {
                                actor: id,
                                position,
                            }));
                    }
                }
            }
        }

        self.step_projectiles(dt);

        if self.tick % COOLDOWN_SYNC_INTERVAL == 0 {
            let actors: Vec<ActorId> = {
                let mut a: Vec<ActorId> = self.owners.keys().copied().collect();
                a.sort();
                a
            };
            for actor in actors {
                self.push_cooldown_sync(actor);
            }
        }
    }

    /// Drains the packets queued since the last flush.
    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbound)
    }

    pub fn actor_snapshots(&self) -> Vec<ActorSnapshot> {
        let mut ids: Vec<ActorId> = self.actors.keys().copied().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| {
                let actor = self.actors.get(&id)?;
                let registry = self.registries.get(&id)?;
                Some(ActorSnapshot {
                    id,
                    position: actor.position,
                    velocity: actor.velocity,
                    facing: actor.facing,
                    move_target: actor.move_target,
                    mana: actor.mana.current,
                    health: actor.health.current,
                    loadout: registry.kinds(),
                    movement_locked: registry.any_movement_active(),
                })
            })
            .collect()
    }

    pub fn cooldown_entries(&self, actor: ActorId) -> Vec<CooldownEntry> {
        let now = self.now;
        self.registries
            .get(&actor)
            .map(|registry| {
                registry
                    .iter()
                    .enumerate()
                    .map(|(i, a)| {
                        let remaining = a.remaining_cooldown(now);
                        CooldownEntry {
                            ability: i as u8,
                            ready: remaining == 0.0,
                            remaining: remaining as f32,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn reject(
        &mut self,
        requester: PeerId,
        ability: u8,
        reason: RejectReason,
    ) -> ActivationOutcome {
        debug!("rejecting ability {} for {}: {:?}", ability, requester, reason);
        self.outbound.push(Outbound::To(
            requester,
            Packet::AbilityRejected { ability, reason },
        ));
        ActivationOutcome::Rejected(reason)
    }

    fn replicated_slot(&mut self, actor: ActorId, index: usize) -> &mut ReplicatedAbilityState {
        let slots = self.replicated.entry(actor).or_default();
        if slots.len() <= index {
            slots.resize(index + 1, ReplicatedAbilityState::default());
        }
        &mut slots[index]
    }

    fn process_events(&mut self, actor_id: ActorId, ability: u8, events: &[PhaseEvent]) {
        for event in events {
            match *event {
                PhaseEvent::Transition(phase) => {
                    let slot = self.replicated_slot(actor_id, ability as usize);
                    if phase == WirePhase::Idle {
                        slot.reset_neutral();
                    } else {
                        slot.phase = phase;
                    }
                    // The activation broadcast itself announces Phase1.
                    if phase != WirePhase::Phase1 {
                        self.outbound.push(Outbound::Broadcast(Packet::PhaseUpdate {
                            origin: self.authority,
                            actor: actor_id,
                            ability,
                            phase,
                        }));
                    }
                }
                PhaseEvent::CooldownStart => {
                    if let Some(instance) = self
                        .registries
                        .get(&actor_id)
                        .and_then(|r| r.at(ability as usize))
                    {
                        self.events.schedule(
                            instance.cooldown_until,
                            ScheduledEvent::CooldownReady {
                                actor: actor_id,
                                ability,
                            },
                        );
                    }
                    self.push_cooldown_sync(actor_id);
                }
                PhaseEvent::Impact { center } => self.apply_impact(actor_id, center),
                PhaseEvent::ProjectileSpawn { origin, direction } => {
                    self.spawn_projectile(actor_id, origin, direction)
                }
                // Visual-only; clients derive effects from the flags.
                PhaseEvent::ShieldRaised | PhaseEvent::ShieldDropped => {}
            }
        }
    }

    fn push_cooldown_sync(&mut self, actor: ActorId) {
        let entries = self.cooldown_entries(actor);
        if entries.is_empty() {
            return;
        }
        if let Some(owner) = self.owners.get(&actor).copied() {
            self.outbound
                .push(Outbound::To(owner, Packet::CooldownSync { entries }));
        }
    }

    /// Earthquake landing: area damage around the impact point.
    fn apply_impact(&mut self, source: ActorId, center: Vec3) {
        let mut ids: Vec<ActorId> = self.actors.keys().copied().collect();
        ids.sort();
        for id in ids {
            if id == source {
                continue;
            }
            let Some(actor) = self.actors.get_mut(&id) else {
                continue;
            };
            if actor.position.horizontal_distance(&center) <= LEAP_IMPACT_RADIUS {
                let dealt = actor.apply_damage(LEAP_IMPACT_DAMAGE);
                info!("earthquake from {} hit {} for {:.1}", source, id, dealt);
            }
        }
    }

    fn spawn_projectile(&mut self, owner: ActorId, origin: Vec3, direction: Vec2) {
        let id = self.next_projectile_id;
        self.next_projectile_id += 1;
        debug!("{} fired bolt {}", owner, id);
        self.projectiles.push(Projectile {
            id,
            owner,
            position: origin,
            direction: direction.normalize(),
            traveled: 0.0,
        });
    }

    fn step_projectiles(&mut self, dt: f32) {
        let mut ids: Vec<ActorId> = self.actors.keys().copied().collect();
        ids.sort();

        let projectiles = std::mem::take(&mut self.projectiles);
        for mut p in projectiles {
            let step = BOLT_SPEED * dt;
            p.position = p
                .position
                .add(&Vec3::new(p.direction.x * step, 0.0, p.direction.z * step));
            p.traveled += step;

            let mut hit = false;
            for id in &ids {
                if *id == p.owner {
                    continue;
                }
                let Some(actor) = self.actors.get_mut(id) else {
                    continue;
                };
                if actor.position.horizontal_distance(&p.position) <= BOLT_HIT_RADIUS {
                    let dealt = actor.apply_damage(BOLT_DAMAGE);
                    info!("bolt {} from {} hit {} for {:.1}", p.id, p.owner, id, dealt);
                    hit = true;
                    break;
                }
            }

            if !hit && p.traveled < BOLT_RANGE {
                self.projectiles.push(p);
            }
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
