//! Event Transport Crate
//!
//! Provides a clean abstraction for delivering completion events from the
//! worker layer to whoever is listening (request handlers, relays, metrics
//! exporters) without the two sides sharing anything beyond a handle.
//!
//! # Architecture
//!
//! This crate uses a trait-based design where all transports implement the
//! `Transport` trait. The in-memory implementation covers single-process
//! deployments; a distributed backend (NATS, Redis streams, etc.) can slot
//! in behind the same trait without touching the dispatch layer.
//!
//! # Example
//!
//! ```rust,no_run
//! use lingo_transport::{InMemTransport, Transport};
//!
//! async fn example() {
//!     let transport = InMemTransport::<String>::new(100);
//!     let mut rx = transport.subscribe();
//!
//!     transport.publish("Hello!".to_string()).await.ok();
//!
//!     if let Ok(msg) = rx.recv().await {
//!         println!("Received: {}", msg);
//!     }
//! }
//! ```

pub mod error;
pub mod inmem;
pub mod traits;

pub use error::TransportError;
pub use inmem::{InMemSubscription, InMemTransport};
pub use traits::Transport;
