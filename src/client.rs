//! The session driver: handler dispatch, the play read loop, bundle
//! coalescing, and the configuration phase.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::conn::{Connection, ReceivedPacket};
use crate::error::SessionError;
use crate::packets::{config, play};
use crate::protocol::ident::Ident;
use crate::protocol::Packet;
use crate::registry::RegistrySet;

/// Hard limit on packets between two bundle delimiters.
pub const MAX_BUNDLE_LEN: usize = 4096;

/// A registered packet callback. Handlers with lower priority values run
/// first; registration order breaks ties.
pub struct PacketHandler {
    pub priority: i32,
    pub handle: Box<dyn FnMut(&ReceivedPacket) -> anyhow::Result<()> + Send>,
}

/// Two handler tables keyed by inbound packet id: a generic list invoked for
/// every packet, and a per-id list. Each packet is delivered exactly once to
/// each matching handler, in priority order.
#[derive(Default)]
pub struct HandlerRegistry {
    generic: Vec<PacketHandler>,
    by_id: HashMap<i32, Vec<PacketHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_generic(
        &mut self,
        priority: i32,
        handle: impl FnMut(&ReceivedPacket) -> anyhow::Result<()> + Send + 'static,
    ) {
        insert_by_priority(
            &mut self.generic,
            PacketHandler {
                priority,
                handle: Box::new(handle),
            },
        );
    }

    pub fn add(
        &mut self,
        id: i32,
        priority: i32,
        handle: impl FnMut(&ReceivedPacket) -> anyhow::Result<()> + Send + 'static,
    ) {
        insert_by_priority(
            self.by_id.entry(id).or_default(),
            PacketHandler {
                priority,
                handle: Box::new(handle),
            },
        );
    }

    /// Fans one packet out to the generic table, then the per-id table.
    fn dispatch(&mut self, pkt: &ReceivedPacket) -> Result<(), SessionError> {
        for handler in &mut self.generic {
            (handler.handle)(pkt).map_err(|cause| SessionError::Handler { id: pkt.id, cause })?;
        }

        if let Some(handlers) = self.by_id.get_mut(&pkt.id) {
            for handler in handlers {
                (handler.handle)(pkt)
                    .map_err(|cause| SessionError::Handler { id: pkt.id, cause })?;
            }
        }

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn dispatch_for_test(&mut self, pkt: &ReceivedPacket) -> Result<(), SessionError> {
        self.dispatch(pkt)
    }
}

fn insert_by_priority(handlers: &mut Vec<PacketHandler>, handler: PacketHandler) {
    let at = handlers.partition_point(|h| h.priority <= handler.priority);
    handlers.insert(at, handler);
}

/// A connected client in the play phase.
pub struct Client {
    pub conn: Connection,
    pub handlers: HandlerRegistry,
    pub registries: RegistrySet,
    /// Feature flags announced during configuration.
    pub enabled_features: Vec<Ident>,
}

impl Client {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            handlers: HandlerRegistry::new(),
            registries: RegistrySet::new(),
            enabled_features: Vec::new(),
        }
    }

    /// Runs the play-phase read loop until the connection closes cleanly
    /// (`Ok`) or a non-recoverable error occurs.
    ///
    /// Bundles are buffered and dispatched atomically; a server-initiated
    /// `StartConfiguration` runs the configuration loop inline and then
    /// resumes play.
    pub async fn handle_game(&mut self) -> Result<(), SessionError> {
        loop {
            let pkt = match self.conn.read_packet().await {
                Ok(pkt) => pkt,
                Err(SessionError::ConnectionClosed) => return Ok(()),
                Err(e) => return Err(e),
            };

            if pkt.id == play::BundleDelimiterS2c::ID {
                self.handle_bundle().await?;
            } else if pkt.id == play::StartConfigurationS2c::ID {
                self.enter_configuration().await?;
            } else {
                self.handlers.dispatch(&pkt)?;
                // Dropping the packet returns its buffer to the pool.
            }
        }
    }

    /// Buffers packets until the closing delimiter, then dispatches them
    /// contiguously. Buffers of bundled packets are reclaimed only after the
    /// whole batch has been handled.
    async fn handle_bundle(&mut self) -> Result<(), SessionError> {
        let mut packets = Vec::new();

        loop {
            let pkt = self.conn.read_packet().await?;
            if pkt.id == play::BundleDelimiterS2c::ID {
                break;
            }
            if packets.len() == MAX_BUNDLE_LEN {
                return Err(SessionError::BundleOverflow);
            }
            packets.push(pkt);
        }

        trace!(len = packets.len(), "dispatching bundle");
        for pkt in &packets {
            self.handlers.dispatch(pkt)?;
        }

        Ok(())
    }

    /// Acknowledges a server-initiated reconfiguration and runs the
    /// configuration loop on the same connection. The queue-backed reader
    /// guarantees no packet sent between the ACK and the first
    /// configuration packet is lost.
    async fn enter_configuration(&mut self) -> Result<(), SessionError> {
        debug!("server requested reconfiguration");
        self.conn
            .write_packet(&play::ConfigurationAcknowledgedC2s)
            .await?;
        self.run_configuration().await
    }

    /// The configuration loop: registries, tags, known packs, feature
    /// flags, and cookies, until `FinishConfiguration`. Registry state from
    /// any previous configuration phase is dropped on entry.
    pub async fn run_configuration(&mut self) -> Result<(), SessionError> {
        self.registries.clear();

        loop {
            let pkt = self.conn.read_packet().await?;

            match pkt.id {
                config::RegistryDataS2c::ID => {
                    let data: config::RegistryDataS2c =
                        pkt.decode().map_err(SessionError::Decode)?;
                    debug!(registry = %data.registry, entries = data.entries.len(), "registry data");
                    self.registries.registry_mut(data.registry).load(data.entries);
                }
                config::UpdateTagsS2c::ID => {
                    let update: config::UpdateTagsS2c =
                        pkt.decode().map_err(SessionError::Decode)?;
                    for group in update.registries {
                        self.registries
                            .registry_mut(group.registry)
                            .apply_tags(group.tags);
                    }
                }
                config::FinishConfigurationS2c::ID => {
                    self.conn
                        .write_packet(&config::FinishConfigurationC2s)
                        .await?;
                    debug!("configuration finished, resuming play");
                    return Ok(());
                }
                config::SelectKnownPacksS2c::ID => {
                    // Claim no packs so the server sends everything inline.
                    self.conn
                        .write_packet(&config::SelectKnownPacksC2s { packs: Vec::new() })
                        .await?;
                }
                config::KeepAliveS2c::ID => {
                    let keep_alive: config::KeepAliveS2c =
                        pkt.decode().map_err(SessionError::Decode)?;
                    self.conn
                        .write_packet(&config::KeepAliveC2s { id: keep_alive.id })
                        .await?;
                }
                config::PingS2c::ID => {
                    let ping: config::PingS2c = pkt.decode().map_err(SessionError::Decode)?;
                    self.conn.write_packet(&config::PongC2s { id: ping.id }).await?;
                }
                config::CookieRequestS2c::ID => {
                    let request: config::CookieRequestS2c =
                        pkt.decode().map_err(SessionError::Decode)?;
                    // No cookie storage; answer with an empty payload.
                    self.conn
                        .write_packet(&config::CookieResponseC2s {
                            key: request.key,
                            payload: None,
                        })
                        .await?;
                }
                config::UpdateEnabledFeaturesS2c::ID => {
                    let features: config::UpdateEnabledFeaturesS2c =
                        pkt.decode().map_err(SessionError::Decode)?;
                    self.enabled_features = features.features;
                }
                config::ResetChatS2c::ID => {}
                id if id == play::StartConfigurationS2c::ID => {
                    return Err(SessionError::Protocol(
                        "StartConfiguration received while already configuring".into(),
                    ));
                }
                config::DisconnectS2c::ID => {
                    let disconnect: config::DisconnectS2c =
                        pkt.decode().map_err(SessionError::Decode)?;
                    warn!(reason = ?disconnect.reason, "disconnected during configuration");
                    return Err(SessionError::ConnectionClosed);
                }
                _ => {
                    // Anything else (resource packs, plugin payloads, ...)
                    // goes to the generic handlers.
                    self.handlers.dispatch(&pkt)?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use tokio::io::AsyncWriteExt;
    use valence_nbt::compound;

    use super::*;
    use crate::codec::PacketEncoder;
    use crate::conn::ConnectionConfig;
    use crate::protocol::{Decode, Encode};
    use crate::registry::RegistryEntry;

    fn frame<P: Packet + Encode>(pkt: &P) -> Vec<u8> {
        let mut enc = PacketEncoder::new();
        enc.append_packet(pkt).unwrap();
        enc.take().to_vec()
    }

    fn test_client() -> (Client, tokio::io::DuplexStream) {
        let (local, remote) = tokio::io::duplex(1 << 16);
        let (read_half, write_half) = tokio::io::split(local);
        let conn = Connection::new(read_half, write_half, ConnectionConfig::default());
        (Client::new(conn), remote)
    }

    #[test]
    fn handlers_run_in_priority_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();

        for (priority, label) in [(10, "late"), (0, "early"), (5, "middle")] {
            let order = order.clone();
            registry.add(7, priority, move |_| {
                order.lock().unwrap().push(label);
                Ok(())
            });
        }
        {
            let order = order.clone();
            registry.add_generic(0, move |_| {
                order.lock().unwrap().push("generic");
                Ok(())
            });
        }

        let pkt = ReceivedPacket::detached(7, vec![]);
        registry.dispatch(&pkt).unwrap();

        assert_eq!(
            *order.lock().unwrap(),
            ["generic", "early", "middle", "late"]
        );
    }

    #[test]
    fn handler_error_carries_packet_id() {
        let mut registry = HandlerRegistry::new();
        registry.add(0x3A, 0, |_| anyhow::bail!("boom"));

        let pkt = ReceivedPacket::detached(0x3A, vec![]);
        match registry.dispatch(&pkt) {
            Err(SessionError::Handler { id, .. }) => assert_eq!(id, 0x3A),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn bundle_dispatches_atomically_in_order() {
        let (mut client, mut remote) = test_client();

        // Bundled velocity+position, then a stand-alone packet.
        const VELOCITY: i32 = 0x5A;
        const POSITION: i32 = 0x2F;
        const CHAT: i32 = 0x3B;

        let log = Arc::new(Mutex::new(Vec::new()));
        for id in [VELOCITY, POSITION, CHAT] {
            let log = log.clone();
            client.handlers.add(id, 0, move |pkt| {
                log.lock().unwrap().push(pkt.id);
                Ok(())
            });
        }

        // Terminate the session right after the chat packet.
        let mut bytes = frame(&play::BundleDelimiterS2c);
        bytes.extend([2, VELOCITY as u8, 1]); // length-framed raw packet
        bytes.extend([2, POSITION as u8, 2]);
        bytes.extend(frame(&play::BundleDelimiterS2c));
        bytes.extend([2, CHAT as u8, 3]);
        remote.write_all(&bytes).await.unwrap();
        drop(remote);

        client.handle_game().await.unwrap();

        assert_eq!(*log.lock().unwrap(), [VELOCITY, POSITION, CHAT]);
    }

    #[tokio::test]
    async fn bundled_buffers_are_reclaimed_after_the_batch() {
        let (mut client, mut remote) = test_client();

        const A: i32 = 0x51;
        const B: i32 = 0x52;

        let pool = client.conn.buffer_pool().clone();
        let seen = Arc::new(AtomicUsize::new(0));
        for id in [A, B] {
            let pool = pool.clone();
            let seen = seen.clone();
            client.handlers.add(id, 0, move |_| {
                // While any bundle member is being handled, no buffer has
                // been returned yet.
                assert_eq!(pool.idle_buffers(), 0);
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        let mut bytes = frame(&play::BundleDelimiterS2c);
        bytes.extend([2, A as u8, 9]);
        bytes.extend([2, B as u8, 9]);
        bytes.extend(frame(&play::BundleDelimiterS2c));
        remote.write_all(&bytes).await.unwrap();
        drop(remote);

        client.handle_game().await.unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(pool.idle_buffers(), 2);
    }

    #[tokio::test]
    async fn bundle_overflow_is_detected() {
        let (mut client, mut remote) = test_client();

        let mut bytes = frame(&play::BundleDelimiterS2c);
        for _ in 0..=MAX_BUNDLE_LEN {
            bytes.extend([2, 0x51, 0]);
        }
        remote.write_all(&bytes).await.unwrap();
        drop(remote);

        match client.handle_game().await {
            Err(SessionError::BundleOverflow) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn phase_round_trip_populates_registries() {
        let (mut client, mut remote) = test_client();

        // Play-phase handler that records the packets it observes.
        const LOGIN_PLAY: i32 = 0x2C;
        let play_log = Arc::new(Mutex::new(Vec::new()));
        {
            let play_log = play_log.clone();
            client.handlers.add_generic(0, move |pkt| {
                play_log.lock().unwrap().push(pkt.id);
                Ok(())
            });
        }

        let dimension = RegistryEntry {
            name: Ident::new("minecraft:overworld").unwrap(),
            data: Some(compound! { "min_y" => -64, "height" => 384 }),
        };

        let mut bytes = frame(&play::StartConfigurationS2c);
        bytes.extend(frame(&config::RegistryDataS2c {
            registry: Ident::new("minecraft:dimension_type").unwrap(),
            entries: vec![dimension],
        }));
        bytes.extend(frame(&config::UpdateTagsS2c {
            registries: vec![crate::registry::RegistryTags {
                registry: Ident::new("minecraft:dimension_type").unwrap(),
                tags: vec![crate::registry::Tag {
                    name: Ident::new("minecraft:all").unwrap(),
                    entries: vec![crate::protocol::var_int::VarInt(0),
                                  crate::protocol::var_int::VarInt(9)],
                }],
            }],
        }));
        bytes.extend(frame(&config::FinishConfigurationS2c));
        bytes.extend([2, LOGIN_PLAY as u8, 0]);
        remote.write_all(&bytes).await.unwrap();

        let driver = tokio::spawn(async move {
            let mut client = client;
            client.handle_game().await.unwrap();
            client
        });

        // The client must have ACKed and finished configuration.
        use tokio::io::AsyncReadExt;
        let mut reply = vec![0u8; 4];
        remote.read_exact(&mut reply).await.unwrap();
        assert_eq!(
            reply,
            [
                1,
                play::ConfigurationAcknowledgedC2s::ID as u8,
                1,
                config::FinishConfigurationC2s::ID as u8,
            ]
        );

        drop(remote);
        let client = driver.await.unwrap();

        // Configuration packets never leaked into play handlers.
        assert_eq!(*play_log.lock().unwrap(), [LOGIN_PLAY]);

        // Registry and tags resolved, with the out-of-range index dropped.
        let dim = client.registries.dimension_type("minecraft:overworld").unwrap();
        assert_eq!(dim.section_count(), 24);
        let registry = client.registries.registry("minecraft:dimension_type").unwrap();
        assert_eq!(registry.tag("minecraft:all"), Some(&[0][..]));
    }

    #[tokio::test]
    async fn config_keepalive_and_ping_are_answered() {
        let (mut client, mut remote) = test_client();

        let mut bytes = frame(&play::StartConfigurationS2c);
        bytes.extend(frame(&config::KeepAliveS2c { id: 0x1122334455667788 }));
        bytes.extend(frame(&config::PingS2c { id: 77 }));
        bytes.extend(frame(&config::FinishConfigurationS2c));
        remote.write_all(&bytes).await.unwrap();

        let driver = tokio::spawn(async move {
            let mut client = client;
            let _ = client.handle_game().await;
        });

        use tokio::io::AsyncReadExt;

        // ACK.
        let mut ack = [0u8; 2];
        remote.read_exact(&mut ack).await.unwrap();

        // KeepAlive echo.
        let mut keep_alive = [0u8; 10];
        remote.read_exact(&mut keep_alive).await.unwrap();
        let mut r = &keep_alive[1..];
        use crate::protocol::var_int::VarInt;
        assert_eq!(VarInt::decode(&mut r).unwrap().0, config::KeepAliveC2s::ID);
        assert_eq!(i64::decode(&mut r).unwrap(), 0x1122334455667788);

        // Pong.
        let mut pong = [0u8; 6];
        remote.read_exact(&mut pong).await.unwrap();
        let mut r = &pong[1..];
        assert_eq!(VarInt::decode(&mut r).unwrap().0, config::PongC2s::ID);
        assert_eq!(i32::decode(&mut r).unwrap(), 77);

        // FinishConfiguration ack.
        let mut finish = [0u8; 2];
        remote.read_exact(&mut finish).await.unwrap();
        assert_eq!(finish[1], config::FinishConfigurationC2s::ID as u8);

        drop(remote);
        driver.await.unwrap();
    }
}
