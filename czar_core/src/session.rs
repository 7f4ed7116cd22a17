use std::{collections::HashMap, hash::Hash};

use log::{debug, info};

use crate::player::PeerId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Joined(PeerId),
    Left(PeerId),
}

/// Maps peer ids to transport handles for the peers currently linked to us.
#[derive(Debug)]
pub struct ConnectionRegistry<H> {
    handles: HashMap<PeerId, H>,
    peers: HashMap<H, PeerId>,
}

impl<H> Default for ConnectionRegistry<H> {
    fn default() -> Self {
        ConnectionRegistry {
            handles: HashMap::new(),
            peers: HashMap::new(),
        }
    }
}

impl<H> ConnectionRegistry<H>
where
    H: Copy + Eq + Hash + std::fmt::Debug,
{
    pub fn connect(&mut self, peer: PeerId, handle: H) -> ConnectionEvent {
        info!("peer {} connected ({:?})", peer, handle);
        if let Some(stale) = self.handles.insert(peer.clone(), handle) {
            debug!("peer {} reconnected, dropping handle {:?}", peer, stale);
            self.peers.remove(&stale);
        }
        self.peers.insert(handle, peer.clone());
        ConnectionEvent::Joined(peer)
    }

    pub fn disconnect(&mut self, handle: H) -> Option<ConnectionEvent> {
        let peer = self.peers.remove(&handle)?;
        self.handles.remove(&peer);
        info!("peer {} disconnected", peer);
        Some(ConnectionEvent::Left(peer))
    }

    pub fn handle_of(&self, peer: &PeerId) -> Option<H> {
        self.handles.get(peer).copied()
    }

    pub fn peer_of(&self, handle: H) -> Option<&PeerId> {
        self.peers.get(&handle)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        player::PeerId,
        session::{ConnectionEvent, ConnectionRegistry},
    };

    #[test]
    fn connect_and_disconnect_should_emit_join_and_leave() {
        let mut registry = ConnectionRegistry::default();

        assert_eq!(
            registry.connect(PeerId::from("a"), 7u64),
            ConnectionEvent::Joined(PeerId::from("a"))
        );
        assert_eq!(registry.handle_of(&PeerId::from("a")), Some(7));
        assert_eq!(registry.peer_of(7), Some(&PeerId::from("a")));

        assert_eq!(
            registry.disconnect(7),
            Some(ConnectionEvent::Left(PeerId::from("a")))
        );
        assert_eq!(registry.disconnect(7), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn reconnect_should_replace_the_stale_handle() {
        let mut registry = ConnectionRegistry::default();
        registry.connect(PeerId::from("a"), 1u64);
        registry.connect(PeerId::from("a"), 2u64);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.peer_of(1), None);
        assert_eq!(registry.handle_of(&PeerId::from("a")), Some(2));
    }
}
