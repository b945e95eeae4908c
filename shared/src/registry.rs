//! Per-actor ability container and slot surface

use log::info;
use serde::{Deserialize, Serialize};

use crate::ability::{AbilityInstance, AbilityKind, ActivationKey, IconId};
use crate::actor::Actor;

/// One row of the HUD-facing slot table.
///
/// This is the whole surface the UI layer sees; it carries no handle
/// back into the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotEntry {
    pub slot: u8,
    pub kind: AbilityKind,
    pub icon: IconId,
    pub ready: bool,
    pub remaining_cooldown: f32,
}

/// The abilities granted to one actor, in activation-index order.
///
/// At most one instance per kind: granting an already-held kind only
/// updates its slot assignment. Removal always runs the instance's
/// cleanup so standing effects (the barrier's damage modifier) are
/// released before the instance is dropped.
#[derive(Debug, Clone, Default)]
pub struct AbilityRegistry {
    abilities: Vec<AbilityInstance>,
}

impl AbilityRegistry {
    pub fn new() -> Self {
        Self {
            abilities: Vec::new(),
        }
    }

    /// Standard starting loadout.
    pub fn with_default_loadout() -> Self {
        let mut registry = Self::new();
        for (slot, kind) in AbilityKind::ALL.iter().enumerate() {
            registry.add(*kind, Some(slot as u8));
        }
        registry
    }

    /// Grants `kind`, or re-slots it if already granted.
    pub fn add(&mut self, kind: AbilityKind, slot: Option<u8>) -> &mut AbilityInstance {
        if let Some(index) = self.index_of(kind) {
            self.abilities[index].slot = slot;
            return &mut self.abilities[index];
        }
        let mut instance = AbilityInstance::new(kind);
        instance.slot = slot;
        info!("granted {}", kind);
        self.abilities.push(instance);
        self.abilities.last_mut().unwrap()
    }

    /// Revokes `kind` after running its cleanup. Returns whether it was
    /// held.
    pub fn remove(&mut self, kind: AbilityKind, actor: &mut Actor) -> bool {
        if let Some(index) = self.index_of(kind) {
            self.abilities[index].cleanup(actor);
            self.abilities.remove(index);
            info!("revoked {}", kind);
            true
        } else {
            false
        }
    }

    pub fn remove_all(&mut self, actor: &mut Actor) {
        for instance in &mut self.abilities {
            instance.cleanup(actor);
        }
        self.abilities.clear();
    }

    pub fn has(&self, kind: AbilityKind) -> bool {
        self.index_of(kind).is_some()
    }

    pub fn get(&self, kind: AbilityKind) -> Option<&AbilityInstance> {
        self.index_of(kind).map(|i| &self.abilities[i])
    }

    pub fn get_mut(&mut self, kind: AbilityKind) -> Option<&mut AbilityInstance> {
        self.index_of(kind).map(move |i| &mut self.abilities[i])
    }

    pub fn index_of(&self, kind: AbilityKind) -> Option<usize> {
        self.abilities.iter().position(|a| a.kind() == kind)
    }

    /// Activation index for the wire protocol.
    pub fn at(&self, index: usize) -> Option<&AbilityInstance> {
        self.abilities.get(index)
    }

    pub fn at_mut(&mut self, index: usize) -> Option<&mut AbilityInstance> {
        self.abilities.get_mut(index)
    }

    /// Resolves a pressed key to an activation index.
    pub fn index_for_trigger(&self, key: ActivationKey) -> Option<usize> {
        self.abilities.iter().position(|a| a.def.trigger == key)
    }

    /// UI slot assignment without granting.
    pub fn register_in_slot(&mut self, kind: AbilityKind, slot: u8) -> bool {
        match self.index_of(kind) {
            Some(index) => {
                self.abilities[index].slot = Some(slot);
                true
            }
            None => false,
        }
    }

    pub fn unregister_slot(&mut self, slot: u8) {
        for instance in &mut self.abilities {
            if instance.slot == Some(slot) {
                instance.slot = None;
            }
        }
    }

    pub fn instance_at_slot(&self, slot: u8) -> Option<&AbilityInstance> {
        self.abilities.iter().find(|a| a.slot == Some(slot))
    }

    /// Read-only snapshot for the HUD collaborator.
    pub fn slot_view(&self, now: f64) -> Vec<SlotEntry> {
        let mut entries: Vec<SlotEntry> = self
            .abilities
            .iter()
            .filter_map(|a| {
                a.slot.map(|slot| SlotEntry {
                    slot,
                    kind: a.kind(),
                    icon: a.def.icon,
                    ready: a.remaining_cooldown(now) == 0.0,
                    remaining_cooldown: a.remaining_cooldown(now) as f32,
                })
            })
            .collect();
        entries.sort_by_key(|e| e.slot);
        entries
    }

    /// True while any movement ability owns the actor's transform.
    pub fn any_movement_active(&self) -> bool {
        self.abilities.iter().any(|a| a.is_movement_active())
    }

    pub fn kinds(&self) -> Vec<AbilityKind> {
        self.abilities.iter().map(|a| a.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AbilityInstance> {
        self.abilities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AbilityInstance> {
        self.abilities.iter_mut()
    }
}
