//! The queue-backed framed connection.
//!
//! A background task parses frames off the stream and pushes them into a
//! bounded queue; the foreground read loop pulls from that queue. This keeps
//! phase transitions race-free: when the server starts reconfiguration
//! mid-play, packets it sent right behind the transition are already sitting
//! in the queue and are observed in order by whichever loop reads next.

use std::mem;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::codec::{PacketDecoder, PacketEncoder};
use crate::error::SessionError;
use crate::protocol::var_int::VarInt;
use crate::protocol::{Decode, Encode, Packet};

const READ_BUF_SIZE: usize = 4096;

/// Connection tuning knobs.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Capacity of the parsed-frame queue, sized to absorb one chunk batch.
    pub queue_capacity: usize,
    /// Zlib threshold negotiated at login, if any.
    pub compression_threshold: Option<u32>,
    /// Zero payload buffers when they return to the pool. Debugging aid for
    /// catching use-after-reclaim.
    pub zero_buffers_on_reclaim: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            compression_threshold: None,
            zero_buffers_on_reclaim: false,
        }
    }
}

/// A pool of payload buffers shared between the frame reader and packet
/// consumers. Size-class-free: payloads are small to medium, so any buffer
/// serves any packet.
#[derive(Debug)]
pub struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
    zero_on_reclaim: bool,
}

impl BufferPool {
    pub fn new(zero_on_reclaim: bool) -> Arc<Self> {
        Arc::new(Self {
            buffers: Mutex::new(Vec::new()),
            zero_on_reclaim,
        })
    }

    /// A cleared buffer with at least `capacity` bytes reserved.
    pub fn take(&self, capacity: usize) -> Vec<u8> {
        let mut buf = self
            .buffers
            .lock()
            .expect("buffer pool poisoned")
            .pop()
            .unwrap_or_default();
        buf.clear();
        buf.reserve(capacity);
        buf
    }

    pub fn reclaim(&self, mut buf: Vec<u8>) {
        if self.zero_on_reclaim {
            buf.iter_mut().for_each(|b| *b = 0);
        }
        self.buffers.lock().expect("buffer pool poisoned").push(buf);
    }

    #[cfg(test)]
    pub(crate) fn idle_buffers(&self) -> usize {
        self.buffers.lock().unwrap().len()
    }
}

/// A parsed inbound packet. The payload buffer goes back to the pool when
/// the packet is dropped, so handlers borrow the body rather than keep it.
#[derive(Debug)]
pub struct ReceivedPacket {
    pub id: i32,
    body: Vec<u8>,
    pool: Option<Arc<BufferPool>>,
}

impl ReceivedPacket {
    /// A packet that owns its body outright (tests, replays).
    pub fn detached(id: i32, body: Vec<u8>) -> Self {
        Self {
            id,
            body,
            pool: None,
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decodes the body as `P`, requiring the id to match and the body to be
    /// fully consumed.
    pub fn decode<'a, P: Packet + Decode<'a>>(&'a self) -> anyhow::Result<P> {
        anyhow::ensure!(
            self.id == P::ID,
            "packet id {:#04x} does not match expected {:#04x}",
            self.id,
            P::ID
        );

        let mut r = self.body();
        let value = P::decode(&mut r).with_context(|| format!("packet {:#04x}", self.id))?;
        anyhow::ensure!(
            r.is_empty(),
            "{} bytes left over after decoding packet {:#04x}",
            r.len(),
            self.id
        );

        Ok(value)
    }
}

impl Drop for ReceivedPacket {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.reclaim(mem::take(&mut self.body));
        }
    }
}

/// A duplex framed connection. Reads come from the queue fed by the
/// background frame parser; writes are encoded and flushed inline, so a
/// single `write_packet` is atomic with respect to concurrent reads.
pub struct Connection {
    incoming: flume::Receiver<Result<ReceivedPacket, SessionError>>,
    writer: Box<dyn AsyncWrite + Send + Unpin>,
    enc: PacketEncoder,
    pool: Arc<BufferPool>,
    reader_task: JoinHandle<()>,
}

impl Connection {
    /// Wraps a connected TCP stream.
    pub async fn connect(addr: impl ToSocketAddrs, config: ConnectionConfig) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self::new(reader, writer, config))
    }

    /// Builds a connection over any byte stream and spawns the frame-reader
    /// task. Must be called within a tokio runtime.
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
        config: ConnectionConfig,
    ) -> Self {
        let pool = BufferPool::new(config.zero_buffers_on_reclaim);
        let (tx, rx) = flume::bounded(config.queue_capacity);

        #[allow(unused_mut)]
        let mut enc = PacketEncoder::new();
        #[allow(unused_mut)]
        let mut dec = PacketDecoder::new();
        #[cfg(feature = "compression")]
        {
            enc.set_compression(config.compression_threshold);
            dec.set_compression(config.compression_threshold);
        }

        let reader_task = tokio::spawn(read_loop(reader, dec, tx, pool.clone()));

        Self {
            incoming: rx,
            writer: Box::new(writer),
            enc,
            pool,
            reader_task,
        }
    }

    /// The next inbound packet, in wire order.
    pub async fn read_packet(&mut self) -> Result<ReceivedPacket, SessionError> {
        match self.incoming.recv_async().await {
            Ok(result) => result,
            // Sender dropped: the reader task saw EOF or stopped.
            Err(flume::RecvError::Disconnected) => Err(SessionError::ConnectionClosed),
        }
    }

    /// A packet from the queue if one is already parsed.
    pub fn try_read_packet(&mut self) -> Result<Option<ReceivedPacket>, SessionError> {
        match self.incoming.try_recv() {
            Ok(result) => result.map(Some),
            Err(flume::TryRecvError::Empty) => Ok(None),
            Err(flume::TryRecvError::Disconnected) => Err(SessionError::ConnectionClosed),
        }
    }

    /// Frames, encodes, and flushes one packet.
    pub async fn write_packet<P>(&mut self, pkt: &P) -> Result<(), SessionError>
    where
        P: Packet + Encode,
    {
        self.enc
            .append_packet(pkt)
            .map_err(SessionError::Decode)?;
        let bytes = self.enc.take();
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Stops the frame reader and drains the queue. In-flight packets are
    /// dropped, which returns their buffers to the pool; subsequent reads
    /// see `ConnectionClosed`.
    pub fn close(&mut self) {
        self.reader_task.abort();
        while let Ok(pkt) = self.incoming.try_recv() {
            drop(pkt);
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

/// The background frame parser feeding the bounded queue.
async fn read_loop(
    mut reader: impl AsyncRead + Send + Unpin,
    mut dec: PacketDecoder,
    tx: flume::Sender<Result<ReceivedPacket, SessionError>>,
    pool: Arc<BufferPool>,
) {
    let mut buf = BytesMut::new();

    loop {
        let frame = match dec.try_next_packet() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                // Incomplete frame; need more data.
                buf.reserve(READ_BUF_SIZE);
                match reader.read_buf(&mut buf).await {
                    Ok(0) => break, // EOF
                    Ok(_) => {}
                    Err(e) => {
                        debug!("error reading from stream: {e}");
                        let _ = tx.send_async(Err(SessionError::Io(e))).await;
                        break;
                    }
                }

                dec.queue_bytes(buf.split());
                continue;
            }
            Err(e) => {
                warn!("error decoding packet frame: {e:#}");
                let _ = tx.send_async(Err(SessionError::Decode(e))).await;
                break;
            }
        };

        // Split the leading packet id off the frame.
        let mut r = &frame[..];
        let id = match VarInt::decode(&mut r) {
            Ok(id) => id.0,
            Err(e) => {
                let _ = tx
                    .send_async(Err(SessionError::Decode(e.context("packet id"))))
                    .await;
                break;
            }
        };

        // Empty bodies (delimiters, phase markers) don't need pooling.
        let packet = if r.is_empty() {
            ReceivedPacket::detached(id, Vec::new())
        } else {
            let mut body = pool.take(r.len());
            body.extend_from_slice(r);
            ReceivedPacket {
                id,
                body,
                pool: Some(pool.clone()),
            }
        };

        // Blocks when the queue is full; that backpressure is what bounds
        // memory during chunk batches.
        if tx.send_async(Ok(packet)).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::play;

    fn frame<P: Packet + Encode>(pkt: &P) -> Vec<u8> {
        let mut enc = PacketEncoder::new();
        enc.append_packet(pkt).unwrap();
        enc.take().to_vec()
    }

    #[tokio::test]
    async fn reads_framed_packets_in_order() {
        let (client, mut server) = tokio::io::duplex(1024);
        let (read_half, write_half) = tokio::io::split(client);
        let mut conn = Connection::new(read_half, write_half, ConnectionConfig::default());

        let mut bytes = frame(&play::BundleDelimiterS2c);
        bytes.extend(frame(&play::StartConfigurationS2c));
        server.write_all(&bytes).await.unwrap();

        let pkt = conn.read_packet().await.unwrap();
        assert_eq!(pkt.id, play::BundleDelimiterS2c::ID);
        assert!(pkt.body().is_empty());

        let pkt = conn.read_packet().await.unwrap();
        assert_eq!(pkt.id, play::StartConfigurationS2c::ID);
    }

    #[tokio::test]
    async fn eof_reports_connection_closed() {
        let (client, server) = tokio::io::duplex(64);
        let (read_half, write_half) = tokio::io::split(client);
        let mut conn = Connection::new(read_half, write_half, ConnectionConfig::default());

        drop(server);

        match conn.read_packet().await {
            Err(SessionError::ConnectionClosed) => {}
            other => panic!("expected ConnectionClosed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn write_packet_frames_bytes() {
        let (client, mut server) = tokio::io::duplex(1024);
        let (read_half, write_half) = tokio::io::split(client);
        let mut conn = Connection::new(read_half, write_half, ConnectionConfig::default());

        conn.write_packet(&play::ConfigurationAcknowledgedC2s)
            .await
            .unwrap();

        let mut buf = [0u8; 2];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [1, play::ConfigurationAcknowledgedC2s::ID as u8]);
    }

    #[tokio::test]
    async fn dropped_packets_return_buffers_to_the_pool() {
        let (client, mut server) = tokio::io::duplex(1024);
        let (read_half, write_half) = tokio::io::split(client);
        let mut conn = Connection::new(read_half, write_half, ConnectionConfig::default());

        server
            .write_all(&frame(&play::ContainerCloseS2c { container_id: 9 }))
            .await
            .unwrap();

        let pool = conn.buffer_pool().clone();
        let pkt = conn.read_packet().await.unwrap();
        assert_eq!(pool.idle_buffers(), 0);
        drop(pkt);
        assert_eq!(pool.idle_buffers(), 1);
    }

    #[test]
    fn detached_packet_decode_checks_id_and_consumption() {
        let pkt = ReceivedPacket::detached(play::ContainerCloseS2c::ID, vec![7]);
        let decoded: play::ContainerCloseS2c = pkt.decode().unwrap();
        assert_eq!(decoded.container_id, 7);

        assert!(pkt.decode::<play::OpenScreenS2c>().is_err());

        let trailing = ReceivedPacket::detached(play::ContainerCloseS2c::ID, vec![7, 7]);
        assert!(trailing.decode::<play::ContainerCloseS2c>().is_err());
    }
}
