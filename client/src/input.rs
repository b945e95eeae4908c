//! Input sequencing and rate limiting for the owning peer
//!
//! The input device itself is a collaborator: the embedding
//! application (or the scripted demo driver) samples keys and clicks
//! into an `InputFrame`. This module turns frames into sequenced,
//! rate-limited `Input` packets and surfaces ability trigger presses.

use shared::ability::ActivationKey;
use shared::math::Vec3;
use shared::packet::InputState;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Minimum spacing between outgoing input packets (keep-alive rate).
const SEND_INTERVAL: Duration = Duration::from_millis(50);

/// One sampled frame of player intent.
#[derive(Debug, Clone, Default)]
pub struct InputFrame {
    /// Ground point of a new movement click, if any this frame.
    pub move_click: Option<Vec3>,
    /// Ability triggers pressed this frame (edges, not levels).
    pub pressed: Vec<ActivationKey>,
    /// Level state of the dash trigger.
    pub dash_held: bool,
}

/// Source of input frames. Implemented by the real input glue and by
/// scripted drivers.
pub trait InputSource {
    /// Samples the frame for the current simulation time (seconds).
    fn sample(&mut self, now: f64) -> InputFrame;
}

/// Turns input frames into the outgoing input stream.
///
/// A packet goes out when the steering state changed or the keep-alive
/// interval elapsed; either way it carries the full current state, so
/// a lost packet heals on the next send.
pub struct InputManager {
    next_sequence: u32,
    /// Sticky movement order; persists until replaced by a new click.
    current_target: Option<Vec3>,
    dash_held: bool,
    last_input_sent: Instant,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            next_sequence: 1,
            current_target: None,
            dash_held: false,
            last_input_sent: Instant::now() - SEND_INTERVAL,
        }
    }

    /// Folds a frame into the current state and decides whether an
    /// input packet is due. `reported_position` is the caller's
    /// predicted position, carried for drift detection.
    pub fn update(&mut self, frame: &InputFrame, reported_position: Vec3) -> Option<InputState> {
        let mut changed = false;

        if let Some(click) = frame.move_click {
            self.current_target = Some(click);
            changed = true;
        }
        if frame.dash_held != self.dash_held {
            self.dash_held = frame.dash_held;
            changed = true;
        }

        let keep_alive_due = self.last_input_sent.elapsed() >= SEND_INTERVAL;
        if !changed && !keep_alive_due {
            return None;
        }

        let input = InputState {
            sequence: self.next_sequence,
            timestamp: Self::timestamp(),
            move_target: self.current_target,
            dash_held: self.dash_held,
            reported_position,
        };
        self.next_sequence += 1;
        self.last_input_sent = Instant::now();
        Some(input)
    }

    pub fn dash_held(&self) -> bool {
        self.dash_held
    }

    fn timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis() as u64
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
