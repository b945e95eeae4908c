//! # Arena Server Library
//!
//! Authoritative server for the arena's ability and movement
//! subsystem. Every gameplay decision (activation gating, resource
//! deduction, canonical movement parameters, phase transitions, impact
//! effects, desync correction) is made here; clients receive those
//! decisions as broadcasts and conform to them.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server runs the definitive simulation. Clients send nothing but
//! steering input and bare activation requests; the authority re-runs
//! every check and recomputes every movement parameter server-side, so
//! a modified client cannot forge direction, distance or cost.
//!
//! ### Request/Validate/Broadcast
//! An ability request passes the resource and cooldown gate exactly
//! once, deducts mana exactly once, and is then broadcast with the
//! canonical parameters to every peer. Phase transitions are decided
//! here and replicated as flags; observers react to the transition,
//! never to polling. In listen mode the host activates through the
//! identical path and filters the echo of its own broadcast by
//! provenance.
//!
//! ### Client Management
//! Connection lifecycle (connect, disconnect, timeout), peer-to-actor
//! binding, and chronological input ordering across peers so the
//! simulation is fair and repeatable regardless of socket timing.
//!
//! ## Architecture
//!
//! One `select!` loop owns all game mutation; auxiliary tokio tasks
//! only shuttle packets and timeout notices over channels. Each tick
//! processes buffered inputs in global chronological order, advances
//! the simulation (phase machines, projectiles, scheduled cooldown
//! continuations, mana regen), flushes the outbound queue and
//! broadcasts a state snapshot for client reconciliation.
//!
//! ## Module Organization
//!
//! - [`client_manager`]: peer roster, input buffering and timeouts.
//! - [`game`]: the authoritative [`game::GameState`] and its tick.
//! - [`network`]: UDP socket plumbing and the main loop.

pub mod client_manager;
pub mod game;
pub mod network;
