//! Channel-to-player bookkeeping for the authority.

use shared::transport::Channel;
use std::collections::{HashMap, HashSet};

/// One connected channel and what the authority knows about it.
pub struct Peer {
    pub channel: Box<dyn Channel>,
    /// Bound by the first accepted claim on this channel; claims carrying
    /// any other id are dropped afterwards.
    pub player_id: Option<String>,
    introduced: HashSet<String>,
}

impl Peer {
    fn new(channel: Box<dyn Channel>) -> Self {
        Self {
            channel,
            player_id: None,
            introduced: HashSet::new(),
        }
    }

    /// True exactly once per participant id on this channel; the caller
    /// attaches the color then and strips it afterwards.
    pub fn needs_intro(&mut self, participant: &str) -> bool {
        self.introduced.insert(participant.to_string())
    }
}

/// All live channels, keyed by the transport's peer label.
#[derive(Default)]
pub struct PeerRegistry {
    peers: HashMap<String, Peer>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, channel: Box<dyn Channel>) {
        let label = channel.peer().to_string();
        self.peers.insert(label, Peer::new(channel));
    }

    pub fn remove(&mut self, peer: &str) -> Option<Peer> {
        self.peers.remove(peer)
    }

    pub fn get_mut(&mut self, peer: &str) -> Option<&mut Peer> {
        self.peers.get_mut(peer)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn player_of(&self, peer: &str) -> Option<&str> {
        self.peers.get(peer)?.player_id.as_deref()
    }

    pub fn bind(&mut self, peer: &str, player_id: &str) {
        if let Some(entry) = self.peers.get_mut(peer) {
            entry.player_id = Some(player_id.to_string());
        }
    }

    /// Join collision guard: the id is already claimed by a different
    /// channel.
    pub fn is_bound_elsewhere(&self, player_id: &str, peer: &str) -> bool {
        self.peers
            .iter()
            .any(|(label, entry)| label != peer && entry.player_id.as_deref() == Some(player_id))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Peer)> {
        self.peers.iter_mut()
    }

    /// Drops a participant from every channel's introduction set, so a
    /// rejoining id gets its new color delivered again.
    pub fn forget_everywhere(&mut self, participant: &str) {
        for peer in self.peers.values_mut() {
            peer.introduced.remove(participant);
        }
    }
}
