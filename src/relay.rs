//! The per-connection runtime: ordered dispatch and forwarding to a peer.

pub use {
    connection::{Connection, ConnectionError, ConnectionHandle, Inbound},
    events::{EventError, EventSink, event_channel},
    peer::{Peer, PeerError, RelayMessage},
};

mod connection;
mod events;
mod peer;
#[cfg(test)]
mod tests;
