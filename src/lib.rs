//! A Minecraft Java Edition client protocol engine.
//!
//! lodestone turns the byte stream from a Minecraft server into structured,
//! queryable game state, and structured commands back into bytes. It covers
//! packet framing and the play/configuration session state machine, the
//! chunk data model (paletted containers, bit-packed storage, heightmaps,
//! lightmaps), server-driven registries with tags, the data-component
//! framework behind item stacks, and container/screen tracking.
//!
//! The login handshake (encryption and compression negotiation) is an
//! external collaborator: this crate consumes the framed byte stream that
//! handshake produces. Packet-id and registry-id tables are generated
//! artifacts consumed as inputs, so retargeting the protocol version is a
//! table swap, not a rewrite.
//!
//! # Overview
//!
//! - [`protocol`]: `Encode`/`Decode` and the wire primitive types.
//! - [`codec`]: frame encoder/decoder (length prefix, optional zlib).
//! - [`conn`]: the queue-backed framed [`Connection`](conn::Connection).
//! - [`client`]: handler registry and the session read loops.
//! - [`chunk`], [`bit_storage`], [`paletted_container`]: the world model.
//! - [`registry`]: dynamic registries, tags, and typed views.
//! - [`item`], [`component`]: item stacks and their data components.
//! - [`inventory`]: screens, containers, and the click protocol.

#![forbid(unsafe_code)]
#![warn(
    trivial_casts,
    trivial_numeric_casts,
    unused_lifetimes,
    unused_import_braces,
    clippy::dbg_macro
)]

pub mod bit_storage;
pub mod chunk;
pub mod client;
pub mod codec;
pub mod component;
pub mod conn;
pub mod error;
pub mod generated;
pub mod inventory;
pub mod item;
pub mod packets;
pub mod paletted_container;
pub mod protocol;
pub mod registry;

pub use client::Client;
pub use conn::{Connection, ConnectionConfig};
pub use error::SessionError;
pub use item::ItemStack;
pub use protocol::{Decode, Encode, Packet};

/// Re-exported NBT data model (the wire codec lives in
/// [`protocol::nbt`]).
pub use valence_nbt;
