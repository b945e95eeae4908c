//! Server network layer handling UDP communications and the tick loop
//!
//! All game mutation happens inside the main `select!` loop; the
//! spawned tasks only shuttle packets and timeout notices over
//! channels. Ability requests are resolved the moment they arrive,
//! still inside the loop, so the authority never races itself, and
//! the resulting broadcasts, rejections and phase flags are flushed
//! from the game's outbound queue.

use crate::client_manager::ClientManager;
use crate::game::{GameState, Outbound};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::packet::{InputState, Packet};
use shared::replication::PeerId;
use shared::ActorId;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Messages sent from network tasks to the main server loop.
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        peer: PeerId,
        actor: Option<ActorId>,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the main loop to the sender task.
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<PeerId>,
    },
}

/// Main server coordinating networking and the authoritative simulation.
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game_state: GameState,
    tick_duration: Duration,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
        max_clients: usize,
        listen: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        let mut game_state = GameState::new();
        if listen {
            game_state.enable_local_host();
        }

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            game_state,
            tick_duration,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Host-side activation in listen mode: same gate and broadcast
    /// path as any remote request.
    pub fn activate_local(&mut self, ability: u8) -> shared::ability::ActivationOutcome {
        self.game_state.activate_local(ability)
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    /// Spawns the task that continuously listens for incoming packets.
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that drains the outgoing packet queue.
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (peer, addr) in client_addrs {
                            if Some(peer) == exclude {
                                continue;
                            }
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("failed to send to {}: {}", peer, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns the task that monitors client timeouts.
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for (peer, actor) in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { peer, actor }) {
                        error!("failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    async fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket {
            packet: packet.clone(),
            addr,
        }) {
            error!("failed to queue packet for sending: {}", e);
        }
    }

    async fn broadcast_packet(&self, packet: &Packet, exclude: Option<PeerId>) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket {
            packet: packet.clone(),
            exclude,
        }) {
            error!("failed to queue broadcast packet: {}", e);
        }
    }

    async fn peer_by_addr(&self, addr: SocketAddr) -> Option<PeerId> {
        let clients = self.clients.read().await;
        clients.find_client_by_addr(addr)
    }

    /// Processes one incoming packet.
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => {
                info!("client connecting from {} (version {})", addr, client_version);

                // A reconnect from the same address replaces the old
                // session and despawns its actor.
                if let Some(existing) = self.peer_by_addr(addr).await {
                    info!("replacing existing session {} from {}", existing, addr);
                    let actor = {
                        let mut clients = self.clients.write().await;
                        clients.remove_client(&existing)
                    };
                    if let Some(actor) = actor {
                        self.game_state.remove_actor(actor);
                    }
                }

                let peer = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                match peer {
                    Some(peer) => {
                        let actor = self.game_state.add_actor(peer);
                        {
                            let mut clients = self.clients.write().await;
                            clients.assign_actor(peer, actor);
                        }
                        let response = Packet::Connected {
                            client_id: peer,
                            actor_id: actor,
                        };
                        self.send_packet(&response, addr).await;
                    }
                    None => {
                        let response = Packet::Disconnected {
                            reason: "Server full".to_string(),
                        };
                        self.send_packet(&response, addr).await;
                    }
                }
            }

            Packet::Input {
                sequence,
                timestamp,
                move_target,
                dash_held,
                reported_position,
            } => {
                if let Some(peer) = self.peer_by_addr(addr).await {
                    let input = InputState {
                        sequence,
                        timestamp,
                        move_target,
                        dash_held,
                        reported_position,
                    };
                    let mut clients = self.clients.write().await;
                    clients.add_input(peer, input);
                }
            }

            Packet::AbilityRequest { ability } => {
                let Some(peer) = self.peer_by_addr(addr).await else {
                    warn!("ability request from unconnected {}", addr);
                    return;
                };
                let actor = {
                    let clients = self.clients.read().await;
                    clients.actor_of(peer)
                };
                if let Some(actor) = actor {
                    let outcome = self.game_state.request_activation(peer, actor, ability);
                    debug!("{} requested ability {}: {:?}", peer, ability, outcome);
                    // Broadcasts and rejections go out immediately, not
                    // at the next tick.
                    self.flush_outbound().await;
                }
            }

            Packet::CooldownSyncRequest => {
                if let Some(peer) = self.peer_by_addr(addr).await {
                    let actor = {
                        let clients = self.clients.read().await;
                        clients.actor_of(peer)
                    };
                    if let Some(actor) = actor {
                        let entries = self.game_state.cooldown_entries(actor);
                        self.send_packet(&Packet::CooldownSync { entries }, addr).await;
                    }
                }
            }

            Packet::Disconnect => {
                if let Some(peer) = self.peer_by_addr(addr).await {
                    let actor = {
                        let mut clients = self.clients.write().await;
                        clients.remove_client(&peer)
                    };
                    if let Some(actor) = actor {
                        self.game_state.remove_actor(actor);
                    }
                }
            }

            _ => {
                warn!("unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Applies all buffered inputs in one global chronological order.
    async fn process_inputs(&mut self) {
        let all_inputs = {
            let clients = self.clients.read().await;
            clients.get_chronological_inputs()
        };

        for (peer, input) in all_inputs {
            let actor = {
                let clients = self.clients.read().await;
                clients.actor_of(peer)
            };
            if let Some(actor) = actor {
                self.game_state.apply_input(actor, &input);
            }
            let mut clients = self.clients.write().await;
            clients.mark_input_processed(peer, input.sequence);
        }

        let mut clients = self.clients.write().await;
        clients.cleanup_processed_inputs();
    }

    /// Routes everything the simulation queued since the last flush.
    async fn flush_outbound(&mut self) {
        for outbound in self.game_state.take_outbound() {
            match outbound {
                Outbound::Broadcast(packet) => {
                    self.broadcast_packet(&packet, None).await;
                }
                Outbound::To(peer, packet) => {
                    // The host's own view is this process; nothing to
                    // send over the wire.
                    if Some(peer) == self.game_state.local_peer {
                        continue;
                    }
                    let addr = {
                        let clients = self.clients.read().await;
                        clients.addr_of(peer)
                    };
                    if let Some(addr) = addr {
                        self.send_packet(&packet, addr).await;
                    }
                }
            }
        }
    }

    /// Broadcasts the authoritative state snapshot.
    async fn broadcast_snapshot(&mut self) {
        let client_count = {
            let clients = self.clients.read().await;
            clients.len()
        };
        if client_count == 0 {
            return;
        }

        let actors = self.game_state.actor_snapshots();
        let last_processed_input = {
            let clients = self.clients.read().await;
            clients.get_last_processed_inputs()
        };

        let packet = Packet::StateSnapshot {
            tick: self.game_state.tick,
            timestamp: current_timestamp(),
            last_processed_input,
            actors,
        };

        self.broadcast_packet(&packet, None).await;
    }

    /// Main server loop coordinating all operations.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut tick_interval = interval(self.tick_duration);
        let mut last_tick = Instant::now();

        info!("server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { peer, actor }) => {
                            info!("{} timed out", peer);
                            if let Some(actor) = actor {
                                self.game_state.remove_actor(actor);
                            }
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    self.process_inputs().await;
                    self.game_state.step(dt);
                    self.flush_outbound().await;
                    self.broadcast_snapshot().await;

                    if self.game_state.tick % 60 == 0 {
                        let client_count = {
                            let clients = self.clients.read().await;
                            clients.len()
                        };
                        if client_count > 0 {
                            debug!(
                                "tick {}: {} clients, {:.1}Hz, {} actors",
                                self.game_state.tick,
                                client_count,
                                1.0 / dt,
                                self.game_state.actors.len()
                            );
                        }
                    }
                },
            }
        }

        Ok(())
    }
}

fn current_timestamp() -> u64 {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();
    (timestamp.min(u64::MAX as u128)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::sync::mpsc;

    fn test_addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    #[test]
    fn test_server_message_creation() {
        let packet = Packet::Connect { client_version: 1 };
        let addr = test_addr(8080);

        let msg = ServerMessage::PacketReceived {
            packet: packet.clone(),
            addr,
        };

        match msg {
            ServerMessage::PacketReceived { packet: p, addr: a } => {
                assert_eq!(a, addr);
                match p {
                    Packet::Connect { client_version } => assert_eq!(client_version, 1),
                    _ => panic!("unexpected packet type"),
                }
            }
            _ => panic!("unexpected message type"),
        }
    }

    #[test]
    fn test_client_timeout_message() {
        let msg = ServerMessage::ClientTimeout {
            peer: PeerId(42),
            actor: Some(ActorId(7)),
        };

        match msg {
            ServerMessage::ClientTimeout { peer, actor } => {
                assert_eq!(peer, PeerId(42));
                assert_eq!(actor, Some(ActorId(7)));
            }
            _ => panic!("unexpected message type"),
        }
    }

    #[test]
    fn test_game_message_broadcast_excludes_peer() {
        let packet = Packet::StateSnapshot {
            tick: 100,
            timestamp: 1234567890,
            last_processed_input: std::collections::HashMap::new(),
            actors: vec![],
        };

        let msg = GameMessage::BroadcastPacket {
            packet: packet.clone(),
            exclude: Some(PeerId(5)),
        };

        match msg {
            GameMessage::BroadcastPacket { packet: p, exclude } => {
                assert_eq!(exclude, Some(PeerId(5)));
                match p {
                    Packet::StateSnapshot { tick, .. } => assert_eq!(tick, 100),
                    _ => panic!("unexpected packet type"),
                }
            }
            _ => panic!("unexpected message type"),
        }
    }

    #[test]
    fn test_channel_communication() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

        let msg = ServerMessage::PacketReceived {
            packet: Packet::AbilityRequest { ability: 2 },
            addr: test_addr(8080),
        };
        assert!(tx.send(msg).is_ok());

        match rx.try_recv().unwrap() {
            ServerMessage::PacketReceived { packet, .. } => match packet {
                Packet::AbilityRequest { ability } => assert_eq!(ability, 2),
                _ => panic!("unexpected packet type"),
            },
            _ => panic!("unexpected message type"),
        }
    }

    #[test]
    fn test_address_validation() {
        let valid_addrs = vec![
            "127.0.0.1:8080",
            "0.0.0.0:0",
            "192.168.1.1:9090",
            "[::1]:8080",
        ];
        for addr_str in valid_addrs {
            assert!(
                addr_str.parse::<SocketAddr>().is_ok(),
                "failed to parse address: {}",
                addr_str
            );
        }

        let invalid_addrs = vec!["invalid", "127.0.0.1:99999", "256.256.256.256:8080", ""];
        for addr_str in invalid_addrs {
            assert!(
                addr_str.parse::<SocketAddr>().is_err(),
                "should fail to parse: {}",
                addr_str
            );
        }
    }

    #[test]
    fn test_tick_duration_validation() {
        let valid_durations = vec![
            Duration::from_millis(16), // 60 Hz
            Duration::from_millis(33), // 30 Hz
            Duration::from_millis(8),  // 120 Hz
        ];

        for duration in valid_durations {
            assert!(duration.as_millis() > 0);
            assert!(duration.as_millis() < 1000);
        }
    }

    #[test]
    fn test_timestamp_is_monotonic() {
        let first = current_timestamp();
        std::thread::sleep(Duration::from_millis(2));
        let second = current_timestamp();
        assert!(second > first);
    }
}
