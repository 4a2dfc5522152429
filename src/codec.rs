//! Packet framing: `VarInt length || VarInt id || body`, with optional
//! transparent zlib compression negotiated at login.

use anyhow::{bail, ensure};
use bytes::{Buf, BufMut, BytesMut};

use crate::protocol::var_int::{VarInt, VarIntDecodeError};
use crate::protocol::{Encode, Packet, MAX_PACKET_SIZE};

#[derive(Default)]
pub struct PacketEncoder {
    buf: BytesMut,
    #[cfg(feature = "compression")]
    compress_buf: Vec<u8>,
    #[cfg(feature = "compression")]
    compression_threshold: Option<u32>,
}

impl PacketEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_packet<P>(&mut self, pkt: &P) -> anyhow::Result<()>
    where
        P: Packet + Encode,
    {
        let start_len = self.buf.len();

        pkt.encode_with_id((&mut self.buf).writer())?;

        let data_len = self.buf.len() - start_len;

        #[cfg(feature = "compression")]
        if let Some(threshold) = self.compression_threshold {
            use std::io::Read;

            use flate2::bufread::ZlibEncoder;
            use flate2::Compression;

            if data_len > threshold as usize {
                let mut z = ZlibEncoder::new(&self.buf[start_len..], Compression::new(4));

                self.compress_buf.clear();

                let data_len_size = VarInt(data_len as i32).written_size();

                let packet_len = data_len_size + z.read_to_end(&mut self.compress_buf)?;

                ensure!(
                    packet_len <= MAX_PACKET_SIZE as usize,
                    "packet exceeds maximum length"
                );

                drop(z);

                self.buf.truncate(start_len);

                let mut writer = (&mut self.buf).writer();

                VarInt(packet_len as i32).encode(&mut writer)?;
                VarInt(data_len as i32).encode(&mut writer)?;
                self.buf.extend_from_slice(&self.compress_buf);
            } else {
                let data_len_size = 1;
                let packet_len = data_len_size + data_len;

                ensure!(
                    packet_len <= MAX_PACKET_SIZE as usize,
                    "packet exceeds maximum length"
                );

                let packet_len_size = VarInt(packet_len as i32).written_size();

                let data_prefix_len = packet_len_size + data_len_size;

                self.buf.put_bytes(0, data_prefix_len);
                self.buf
                    .copy_within(start_len..start_len + data_len, start_len + data_prefix_len);

                let mut front = &mut self.buf[start_len..];

                VarInt(packet_len as i32).encode(&mut front)?;
                // Zero for no compression on this packet.
                VarInt(0).encode(front)?;
            }

            return Ok(());
        }

        let packet_len = data_len;

        ensure!(
            packet_len <= MAX_PACKET_SIZE as usize,
            "packet exceeds maximum length"
        );

        let packet_len_size = VarInt(packet_len as i32).written_size();

        self.buf.put_bytes(0, packet_len_size);
        self.buf
            .copy_within(start_len..start_len + packet_len, start_len + packet_len_size);

        let front = &mut self.buf[start_len..];
        VarInt(packet_len as i32).encode(front)?;

        Ok(())
    }

    /// Takes all the packets written so far.
    pub fn take(&mut self) -> BytesMut {
        self.buf.split()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    #[cfg(feature = "compression")]
    pub fn set_compression(&mut self, threshold: Option<u32>) {
        self.compression_threshold = threshold;
    }
}

#[derive(Default)]
pub struct PacketDecoder {
    buf: BytesMut,
    #[cfg(feature = "compression")]
    decompress_buf: BytesMut,
    #[cfg(feature = "compression")]
    compression_threshold: Option<u32>,
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pops the next whole frame (packet ID + body) off the buffer, or
    /// returns `None` if a full frame hasn't arrived yet.
    pub fn try_next_packet(&mut self) -> anyhow::Result<Option<BytesMut>> {
        let mut r = &self.buf[..];

        let packet_len = match VarInt::decode_partial(&mut r) {
            Ok(len) => len,
            Err(VarIntDecodeError::Incomplete) => return Ok(None),
            Err(VarIntDecodeError::TooLarge) => bail!("malformed packet length VarInt"),
        };

        ensure!(
            (0..=MAX_PACKET_SIZE).contains(&packet_len),
            "packet length of {packet_len} is out of bounds"
        );

        if r.len() < packet_len as usize {
            // Not enough data arrived yet.
            return Ok(None);
        }

        let packet_len_len = VarInt(packet_len).written_size();

        #[cfg(feature = "compression")]
        if let Some(threshold) = self.compression_threshold {
            use std::io::Write;

            use flate2::write::ZlibDecoder;

            use crate::protocol::Decode;

            r = &r[..packet_len as usize];

            let data_len = VarInt::decode(&mut r)?.0;

            ensure!(
                (0..MAX_PACKET_SIZE).contains(&data_len),
                "decompressed packet length of {data_len} is out of bounds"
            );

            // Is this packet compressed?
            if data_len > 0 {
                ensure!(
                    data_len as u32 > threshold,
                    "decompressed packet length of {data_len} is <= the compression threshold of \
                     {threshold}"
                );

                debug_assert!(self.decompress_buf.is_empty());

                self.decompress_buf.put_bytes(0, data_len as usize);

                let mut z = ZlibDecoder::new(&mut self.decompress_buf[..]);

                z.write_all(r)?;

                ensure!(
                    z.finish()?.is_empty(),
                    "decompressed packet length is shorter than expected"
                );

                let total_packet_len = VarInt(packet_len).written_size() + packet_len as usize;

                self.buf.advance(total_packet_len);

                return Ok(Some(self.decompress_buf.split()));
            } else {
                debug_assert_eq!(data_len, 0);

                ensure!(
                    r.len() <= threshold as usize,
                    "uncompressed packet length of {} exceeds compression threshold of {}",
                    r.len(),
                    threshold
                );

                let remaining_len = r.len();

                self.buf.advance(packet_len_len + 1);
                return Ok(Some(self.buf.split_to(remaining_len)));
            }
        }

        self.buf.advance(packet_len_len);
        Ok(Some(self.buf.split_to(packet_len as usize)))
    }

    #[cfg(feature = "compression")]
    pub fn set_compression(&mut self, threshold: Option<u32>) {
        self.compression_threshold = threshold;
    }

    pub fn queue_bytes(&mut self, bytes: BytesMut) {
        self.buf.unsplit(bytes);
    }

    pub fn queue_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn take_capacity(&mut self) -> BytesMut {
        self.buf.split_off(self.buf.len())
    }

    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::play;
    use crate::protocol::{Decode, Packet};

    fn ack() -> play::ConfigurationAcknowledgedC2s {
        play::ConfigurationAcknowledgedC2s
    }

    #[test]
    fn frame_round_trip() {
        let mut enc = PacketEncoder::new();
        enc.append_packet(&ack()).unwrap();
        enc.append_packet(&ack()).unwrap();
        let bytes = enc.take();

        let mut dec = PacketDecoder::new();
        dec.queue_slice(&bytes);

        for _ in 0..2 {
            let frame = dec.try_next_packet().unwrap().expect("frame expected");
            let mut r = &frame[..];
            let id = VarInt::decode(&mut r).unwrap().0;
            assert_eq!(id, play::ConfigurationAcknowledgedC2s::ID);
            assert!(r.is_empty());
        }

        assert!(dec.try_next_packet().unwrap().is_none());
    }

    #[test]
    fn partial_frame_waits_for_more_data() {
        let mut enc = PacketEncoder::new();
        enc.append_packet(&ack()).unwrap();
        let bytes = enc.take();

        let mut dec = PacketDecoder::new();
        dec.queue_slice(&bytes[..1]);
        assert!(dec.try_next_packet().unwrap().is_none());

        dec.queue_slice(&bytes[1..]);
        assert!(dec.try_next_packet().unwrap().is_some());
    }

    #[cfg(feature = "compression")]
    #[test]
    fn compressed_round_trip() {
        use crate::item::ItemStack;
        use crate::packets::play::ContainerSetSlotS2c;

        let mut enc = PacketEncoder::new();
        enc.set_compression(Some(0));

        let pkt = ContainerSetSlotS2c {
            container_id: 1,
            state_id: VarInt(7),
            slot: 3,
            slot_data: ItemStack::empty(),
        };
        enc.append_packet(&pkt).unwrap();

        let mut dec = PacketDecoder::new();
        dec.set_compression(Some(0));
        dec.queue_bytes(enc.take());

        let frame = dec.try_next_packet().unwrap().expect("frame expected");
        let mut r = &frame[..];
        assert_eq!(VarInt::decode(&mut r).unwrap().0, ContainerSetSlotS2c::ID);

        let decoded = ContainerSetSlotS2c::decode(&mut r).unwrap();
        assert_eq!(decoded.state_id, VarInt(7));
        assert!(r.is_empty());
    }
}
