use std::{
    net::{Ipv4Addr, SocketAddr, UdpSocket},
    time::{Duration, Instant, SystemTime},
};

use anyhow::{anyhow, Context};
use czar_core::{
    player::PeerId,
    protocol::{Message, Recipient},
    session::{ConnectionEvent, ConnectionRegistry},
};
use log::{debug, error, info, trace, warn};
use renet::{
    transport::{
        ClientAuthentication, NetcodeClientTransport, NetcodeServerTransport,
        ServerAuthentication, ServerConfig,
    },
    ClientId, ConnectionConfig, DefaultChannel, RenetClient, RenetServer, ServerEvent,
};

pub const PROTOCOL_ID: u64 = 0x6361_7264_637a_6172;
pub const MAX_PEERS: usize = 16;
pub const TICK: Duration = Duration::from_millis(50);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug)]
pub enum TransportEvent {
    Connected(PeerId),
    Disconnected(PeerId),
    Message(PeerId, Message),
}

impl From<ConnectionEvent> for TransportEvent {
    fn from(event: ConnectionEvent) -> Self {
        match event {
            ConnectionEvent::Joined(peer) => TransportEvent::Connected(peer),
            ConnectionEvent::Left(peer) => TransportEvent::Disconnected(peer),
        }
    }
}

pub fn peer_id_of(client_id: ClientId) -> PeerId {
    PeerId::new(format!("{:016x}", client_id.raw()))
}

fn decode(from: &PeerId, bytes: &[u8]) -> Option<Message> {
    match Message::from_bytes(bytes) {
        Ok(message) => {
            trace!("<- {} from {}", message.label(), from);
            Some(message)
        }
        Err(e) => {
            warn!("dropping malformed message from {}: {}", from, e);
            None
        }
    }
}

fn encode(message: &Message) -> Option<Vec<u8>> {
    match message.to_bytes() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            error!("could not encode {}: {}", message.label(), e);
            None
        }
    }
}

fn unix_time() -> anyhow::Result<Duration> {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .context("system clock is before the unix epoch")
}

/// Server side of the link, run by the hosting peer. Its public address is the
/// room code other peers join with.
pub struct HostTransport {
    server: RenetServer,
    transport: NetcodeServerTransport,
    registry: ConnectionRegistry<ClientId>,
    peer_id: PeerId,
    last_updated: Instant,
}

impl HostTransport {
    pub fn bind(ip: Ipv4Addr, port: u16) -> anyhow::Result<Self> {
        let public_addr = SocketAddr::from((ip, port));
        let socket = UdpSocket::bind(public_addr)
            .with_context(|| format!("could not bind {}", public_addr))?;
        let server_config = ServerConfig {
            current_time: unix_time()?,
            max_clients: MAX_PEERS,
            protocol_id: PROTOCOL_ID,
            public_addresses: vec![public_addr],
            authentication: ServerAuthentication::Unsecure,
        };
        let transport = NetcodeServerTransport::new(server_config, socket)
            .context("could not start the netcode server")?;
        info!("hosting on {}", public_addr);
        Ok(HostTransport {
            server: RenetServer::new(ConnectionConfig::default()),
            transport,
            registry: ConnectionRegistry::default(),
            peer_id: PeerId::new(public_addr.to_string()),
            last_updated: Instant::now(),
        })
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn poll(&mut self) -> anyhow::Result<Vec<TransportEvent>> {
        let now = Instant::now();
        let duration = now - self.last_updated;
        self.last_updated = now;

        self.server.update(duration);
        self.transport
            .update(duration, &mut self.server)
            .map_err(|e| anyhow!("server transport failed: {:?}", e))?;

        let mut events: Vec<TransportEvent> = vec![];
        while let Some(event) = self.server.get_event() {
            match event {
                ServerEvent::ClientConnected { client_id } => {
                    events.push(self.registry.connect(peer_id_of(client_id), client_id).into());
                }
                ServerEvent::ClientDisconnected { client_id, reason } => {
                    debug!("client {} disconnected: {}", client_id, reason);
                    if let Some(event) = self.registry.disconnect(client_id) {
                        events.push(event.into());
                    }
                }
            }
        }

        for client_id in self.server.clients_id() {
            while let Some(bytes) =
                self.server
                    .receive_message(client_id, DefaultChannel::ReliableOrdered)
            {
                let peer = match self.registry.peer_of(client_id) {
                    Some(peer) => peer.clone(),
                    None => continue,
                };
                if let Some(message) = decode(&peer, &bytes) {
                    events.push(TransportEvent::Message(peer, message));
                }
            }
        }
        Ok(events)
    }

    /// Queues `message` for every connected peer `to` covers. The host's own
    /// id never maps to a connection, so loopback is up to the caller.
    pub fn send(&mut self, to: &Recipient, message: &Message) {
        let bytes = match encode(message) {
            Some(bytes) => bytes,
            None => return,
        };
        match to {
            Recipient::All => {
                trace!("-> {} to {} peers", message.label(), self.registry.len());
                self.server
                    .broadcast_message(DefaultChannel::ReliableOrdered, bytes);
            }
            Recipient::Peer(peer) => match self.registry.handle_of(peer) {
                Some(client_id) => {
                    trace!("-> {} to {}", message.label(), peer);
                    self.server
                        .send_message(client_id, DefaultChannel::ReliableOrdered, bytes);
                }
                None if peer == &self.peer_id => {}
                None => debug!("no connection to {}, dropping {}", peer, message.label()),
            },
        }
    }

    pub fn flush(&mut self) {
        self.transport.send_packets(&mut self.server);
    }

    pub fn shutdown(&mut self) {
        self.transport.disconnect_all(&mut self.server);
    }
}

/// Client side of the link, run by a joining peer.
pub struct JoinTransport {
    client: RenetClient,
    transport: NetcodeClientTransport,
    host_id: PeerId,
    peer_id: PeerId,
    connected: bool,
    last_updated: Instant,
}

impl JoinTransport {
    pub fn connect(room_code: &str) -> anyhow::Result<Self> {
        let server_addr: SocketAddr = room_code
            .parse()
            .with_context(|| format!("invalid room code {}", room_code))?;
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .context("could not bind a local socket")?;
        let client_id: u64 = rand::random();
        let authentication = ClientAuthentication::Unsecure {
            server_addr,
            client_id,
            user_data: None,
            protocol_id: PROTOCOL_ID,
        };
        let transport = NetcodeClientTransport::new(unix_time()?, authentication, socket)
            .map_err(|e| anyhow!("could not start the netcode client: {:?}", e))?;
        Ok(JoinTransport {
            client: RenetClient::new(ConnectionConfig::default()),
            transport,
            host_id: PeerId::new(room_code),
            peer_id: peer_id_of(ClientId::from_raw(client_id)),
            connected: false,
            last_updated: Instant::now(),
        })
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn host_id(&self) -> &PeerId {
        &self.host_id
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn poll(&mut self) -> anyhow::Result<Vec<TransportEvent>> {
        let now = Instant::now();
        let duration = now - self.last_updated;
        self.last_updated = now;

        let mut events: Vec<TransportEvent> = vec![];
        self.client.update(duration);
        if let Err(e) = self.transport.update(duration, &mut self.client) {
            if self.connected {
                self.connected = false;
                info!("link to host dropped: {:?}", e);
                events.push(TransportEvent::Disconnected(self.host_id.clone()));
                return Ok(events);
            }
            return Err(anyhow!("could not reach host {}: {:?}", self.host_id, e));
        }

        if !self.connected && self.client.is_connected() {
            self.connected = true;
            info!("connected to host {}", self.host_id);
            events.push(TransportEvent::Connected(self.host_id.clone()));
        }
        while let Some(bytes) = self.client.receive_message(DefaultChannel::ReliableOrdered) {
            if let Some(message) = decode(&self.host_id, &bytes) {
                events.push(TransportEvent::Message(self.host_id.clone(), message));
            }
        }
        if self.connected && self.client.is_disconnected() {
            self.connected = false;
            events.push(TransportEvent::Disconnected(self.host_id.clone()));
        }
        Ok(events)
    }

    pub fn send(&mut self, message: &Message) {
        if let Some(bytes) = encode(message) {
            trace!("-> {} to host", message.label());
            self.client
                .send_message(DefaultChannel::ReliableOrdered, bytes);
        }
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.transport.send_packets(&mut self.client) {
            debug!("could not send packets: {:?}", e);
        }
    }

    pub fn shutdown(&mut self) {
        self.transport.disconnect();
    }
}
