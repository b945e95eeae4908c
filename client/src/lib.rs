//! # Arena Client Library
//!
//! Client-side implementation of the arena peer: input sequencing,
//! server communication, and the local mirror of the authoritative
//! simulation.
//!
//! ## Architecture Overview
//!
//! The client is an observer with one privileged actor. Its own
//! actor's locomotion is predicted immediately from local input and
//! reconciled against authoritative snapshots; everything
//! gameplay-relevant about abilities is decided by the authority and
//! adopted from broadcasts.
//!
//! ### Ability Replication
//! An ability press sends a bare activation request. The authority
//! validates it, deducts the resource, stamps the canonical movement
//! parameters and broadcasts them; only then does the client's local
//! phase machine start, seeded from the broadcast. Both acceptance and
//! refusal are therefore authority messages, never local guesses; the
//! local cooldown mirror exists purely so the HUD reads responsively.
//!
//! ### Prediction & Reconciliation
//! Click-to-move steering is applied locally as soon as it is sent.
//! When a snapshot arrives, acknowledged inputs are discarded and, if
//! the predicted position drifted past the threshold, the local state
//! rolls back to the confirmed one and replays the unacknowledged
//! tail. Reconciliation never runs while a movement ability owns the
//! transform; the phase machine's writes take priority.
//!
//! ### Provenance Filtering
//! Every replicated write carries its authoring peer. A peer never
//! reacts to its own writes coming back around, which is what lets a
//! dual-role host apply an activation exactly once.
//!
//! ## Module Organization
//!
//! - [`game`]: the local arena view with prediction, reconciliation,
//!   broadcast adoption, phase simulation, the `FxSink` effects
//!   boundary and the HUD slot table.
//! - [`input`]: `InputFrame`/`InputSource` sampling boundary plus
//!   sequencing and rate limiting of the outgoing input stream.
//! - [`network`]: UDP connection, packet dispatch and the peer loop.

pub mod game;
pub mod input;
pub mod network;
