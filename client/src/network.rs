//! Client network layer: connection, packet handling and the peer loop

use crate::game::{ClientGameState, FxSink};
use crate::input::{InputManager, InputSource};
use bincode::{deserialize, serialize};
use log::{error, info, warn};
use shared::packet::Packet;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep, Instant};

/// Local simulation step, matching the server tick.
const SIM_DT: f32 = 1.0 / 60.0;

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    connected: bool,

    pub game_state: ClientGameState,
    input_manager: InputManager,

    /// Artificial one-way latency for netcode testing.
    fake_ping_ms: u64,
    ping_ms: u64,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        fake_ping_ms: u64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            connected: false,
            game_state: ClientGameState::new(),
            input_manager: InputManager::new(),
            fake_ping_ms,
            ping_ms: 0,
        })
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("connecting to {}", self.server_addr);
        self.send_packet(&Packet::Connect { client_version: 1 }).await
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }
        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    /// Sends an activation request. The authority recomputes every
    /// movement parameter; this names only the ability index.
    pub async fn request_ability(&self, ability: u8) -> Result<(), Box<dyn std::error::Error>> {
        self.send_packet(&Packet::AbilityRequest { ability }).await
    }

    /// Asks the authority for fresh cooldown values (on top of the
    /// periodic push).
    pub async fn request_cooldown_sync(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.send_packet(&Packet::CooldownSyncRequest).await
    }

    async fn handle_packet(&mut self, packet: Packet, fx: &mut dyn FxSink) {
        match packet {
            Packet::Connected { client_id, actor_id } => {
                info!("connected as {} owning {}", client_id, actor_id);
                self.game_state.bind(client_id, actor_id);
                self.connected = true;
            }

            Packet::StateSnapshot {
                tick,
                timestamp,
                last_processed_input,
                actors,
            } => {
                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or(Duration::from_secs(0))
                    .as_millis() as u64;
                if timestamp > 0 {
                    self.ping_ms = now.saturating_sub(timestamp);
                }
                self.game_state
                    .apply_snapshot(tick, timestamp, &last_processed_input, actors);
            }

            Packet::AbilityBroadcast {
                origin,
                activator,
                actor,
                ability,
                direction,
                distance,
                target,
            } => {
                self.game_state.apply_broadcast(
                    origin, activator, actor, ability, direction, distance, target, fx,
                );
            }

            Packet::PhaseUpdate {
                origin,
                actor,
                ability,
                phase,
            } => {
                self.game_state.apply_phase(origin, actor, ability, phase, fx);
            }

            Packet::LivePosition { actor, position } => {
                self.game_state.apply_live_position(actor, position);
            }

            Packet::AbilityRejected { ability, reason } => {
                self.game_state.apply_rejection(ability, reason);
            }

            Packet::CooldownSync { entries } => {
                self.game_state.apply_cooldown_sync(entries);
            }

            Packet::ForceSnap {
                actor,
                position,
                facing,
            } => {
                self.game_state.apply_force_snap(actor, position, facing);
            }

            Packet::Disconnected { reason } => {
                warn!("disconnected: {}", reason);
                self.connected = false;
            }

            _ => {
                warn!("unexpected packet from server");
            }
        }
    }

    /// Samples input, sends due packets and maps trigger presses to
    /// activation requests.
    async fn drive_input(&mut self, source: &mut dyn InputSource) {
        let frame = source.sample(self.game_state.now);

        if self.connected {
            for key in &frame.pressed {
                let index = self
                    .game_state
                    .own_actor
                    .and_then(|id| self.game_state.registries.get(&id))
                    .and_then(|r| r.index_for_trigger(*key));
                match index {
                    Some(index) => {
                        if let Err(e) = self.request_ability(index as u8).await {
                            error!("failed to request ability: {}", e);
                        }
                    }
                    None => warn!("no ability bound to {:?}", key),
                }
            }
        }

        let reported = self
            .game_state
            .own_actor
            .and_then(|id| self.game_state.actors.get(&id))
            .map(|a| a.position)
            .unwrap_or_default();

        if let Some(input) = self.input_manager.update(&frame, reported) {
            if self.connected {
                if let Err(e) = self.send_packet(&Packet::Input {
                    sequence: input.sequence,
                    timestamp: input.timestamp,
                    move_target: input.move_target,
                    dash_held: input.dash_held,
                    reported_position: input.reported_position,
                })
                .await
                {
                    error!("failed to send input: {}", e);
                }
                self.game_state.apply_prediction(&input);
            }
        }
    }

    pub fn ping_ms(&self) -> u64 {
        self.ping_ms
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Runs the peer loop until `run_for` elapses (forever if `None`).
    pub async fn run(
        &mut self,
        source: &mut dyn InputSource,
        fx: &mut dyn FxSink,
        run_for: Option<Duration>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let deadline = run_for.map(|d| Instant::now() + d);
        let mut input_interval = interval(Duration::from_millis(16));
        let mut sim_interval = interval(Duration::from_millis(16));
        let mut buffer = [0u8; 2048];

        loop {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    break;
                }
            }

            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }
                            match deserialize::<Packet>(&buffer[0..len]) {
                                Ok(packet) => self.handle_packet(packet, fx).await,
                                Err(_) => warn!("malformed packet from server"),
                            }
                        }
                        Err(e) => error!("error receiving packet: {}", e),
                    }
                },

                _ = input_interval.tick() => {
                    self.drive_input(source).await;
                },

                _ = sim_interval.tick() => {
                    self.game_state.step(SIM_DT, fx);
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }
        Ok(())
    }
}
