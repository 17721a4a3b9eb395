//! Event routing for many connection objects.
//!
//! The stack reports every event tagged with the [`Handle`] it concerns (or,
//! for name resolution, the [`QueryId`]). [`ConnectionSet`] owns a group of
//! [`AsyncClient`]s and forwards each [`TransportEvent`] to the one it
//! belongs to.

use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;

use tracing::trace;

use crate::client::AsyncClient;
use crate::core::ErrorCode;
use crate::transport::{Handle, QueryId, Transport};

/// Key of a connection object inside a [`ConnectionSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientKey(u64);

impl ClientKey {
    /// The raw key value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// Event delivered by the network stack.
#[derive(Debug, Clone, Copy)]
pub enum TransportEvent<'a> {
    /// The opening handshake completed.
    Connected(Handle),
    /// The connection failed; the stack has already released the handle.
    Error(Handle, ErrorCode),
    /// Inbound segments, or `None` when the peer closed.
    Received(Handle, Option<&'a [&'a [u8]]>),
    /// The peer acknowledged this many sent bytes.
    Sent(Handle, usize),
    /// Periodic tick.
    Poll(Handle),
    /// A deferred name lookup finished; `None` on failure.
    Resolved(QueryId, Option<Ipv4Addr>),
}

/// A set of connection objects sharing one stack.
pub struct ConnectionSet<T: Transport> {
    clients: HashMap<ClientKey, AsyncClient<T>>,
    next_key: u64,
}

impl<T: Transport> ConnectionSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            next_key: 0,
        }
    }

    /// Take ownership of `client`.
    pub fn insert(&mut self, client: AsyncClient<T>) -> ClientKey {
        self.next_key += 1;
        let key = ClientKey(self.next_key);
        self.clients.insert(key, client);
        key
    }

    /// Give back the client stored under `key`.
    pub fn remove(&mut self, key: ClientKey) -> Option<AsyncClient<T>> {
        self.clients.remove(&key)
    }

    /// Get a client by key.
    pub fn get(&self, key: ClientKey) -> Option<&AsyncClient<T>> {
        self.clients.get(&key)
    }

    /// Get a client mutably by key.
    pub fn get_mut(&mut self, key: ClientKey) -> Option<&mut AsyncClient<T>> {
        self.clients.get_mut(&key)
    }

    /// Number of clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Iterate over all clients.
    pub fn iter(&self) -> impl Iterator<Item = (ClientKey, &AsyncClient<T>)> {
        self.clients.iter().map(|(key, client)| (*key, client))
    }

    /// Iterate mutably over all clients.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ClientKey, &mut AsyncClient<T>)> {
        self.clients.iter_mut().map(|(key, client)| (*key, client))
    }

    /// Key of the client holding `handle`.
    pub fn find(&self, handle: Handle) -> Option<ClientKey> {
        self.clients
            .iter()
            .find(|(_, client)| client.handle() == Some(handle))
            .map(|(key, _)| *key)
    }

    fn find_query(&self, query: QueryId) -> Option<ClientKey> {
        self.clients
            .iter()
            .find(|(_, client)| client.pending_query() == Some(query))
            .map(|(key, _)| *key)
    }

    /// Route `event` to the client it concerns.
    ///
    /// Returns `false` if no client in the set owns the handle or query.
    pub fn dispatch(&mut self, event: TransportEvent<'_>) -> bool {
        let key = match event {
            TransportEvent::Resolved(query, _) => self.find_query(query),
            TransportEvent::Connected(handle)
            | TransportEvent::Error(handle, _)
            | TransportEvent::Received(handle, _)
            | TransportEvent::Sent(handle, _)
            | TransportEvent::Poll(handle) => self.find(handle),
        };
        let Some(client) = key.and_then(|key| self.clients.get_mut(&key)) else {
            trace!(?event, "unrouted event");
            return false;
        };

        match event {
            TransportEvent::Connected(handle) => client.handle_connected(handle),
            TransportEvent::Error(handle, code) => client.handle_error(handle, code),
            TransportEvent::Received(handle, segments) => client.handle_received(handle, segments),
            TransportEvent::Sent(handle, len) => client.handle_sent(handle, len),
            TransportEvent::Poll(handle) => client.handle_poll(handle),
            TransportEvent::Resolved(query, addr) => client.handle_resolved(query, addr),
        }
        true
    }

    /// Deliver a tick to every client holding a handle.
    pub fn poll_all(&mut self) {
        for client in self.clients.values_mut() {
            if let Some(handle) = client.handle() {
                client.handle_poll(handle);
            }
        }
    }

    /// Drop clients that hold no handle and await no resolution.
    ///
    /// Returns the number of clients removed.
    pub fn retain_live(&mut self) -> usize {
        let before = self.clients.len();
        self.clients.retain(|_, client| !client.is_idle());
        before - self.clients.len()
    }
}

impl<T: Transport> Default for ConnectionSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> fmt::Debug for ConnectionSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.clients.iter()).finish()
    }
}
