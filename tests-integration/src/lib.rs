//! Workspace integration tests
//!
//! End-to-end flows against the public crate surface: command dispatch on a
//! bootstrapped app, and the full pairing handshake over a real WebSocket
//! connection.

#[cfg(test)]
mod commands;
#[cfg(test)]
mod pairing;
