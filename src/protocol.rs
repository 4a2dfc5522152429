//! The wire value layer: how individual values are read from and written to
//! the Minecraft protocol.

pub mod bit_set;
pub mod block_pos;
pub mod ident;
pub mod impls;
pub mod nbt;
pub mod var_int;
pub mod var_long;

use std::io::Write;

/// The maximum number of bytes in a single Minecraft packet.
pub const MAX_PACKET_SIZE: i32 = 2097152;

/// The maximum number of elements a length-prefixed array is allowed to
/// declare. Lengths above this are rejected before any allocation happens.
pub const MAX_ARRAY_LEN: usize = 1 << 20;

/// The `Encode` trait allows objects to be written to the Minecraft protocol.
/// It is the inverse of [`Decode`].
///
/// Components of a composite type are encoded in the order they appear in the
/// type definition.
pub trait Encode {
    /// Writes this object to the provided writer.
    ///
    /// If this type also implements [`Decode`] then successful calls to this
    /// function returning `Ok(())` must always successfully [`decode`] using
    /// the data that was written to the writer. The exact number of bytes
    /// that were originally written must be consumed during the decoding.
    ///
    /// [`decode`]: Decode::decode
    fn encode(&self, w: impl Write) -> anyhow::Result<()>;

    /// Like [`Encode::encode`], except that a whole slice of values is
    /// encoded with no leading length prefix.
    ///
    /// This must be semantically equivalent to encoding every element of the
    /// slice in sequence (which is what the default implementation does), but
    /// a more efficient implementation may be used for types like `u8`.
    fn encode_slice(slice: &[Self], mut w: impl Write) -> anyhow::Result<()>
    where
        Self: Sized,
    {
        for value in slice {
            value.encode(&mut w)?;
        }

        Ok(())
    }
}

/// The `Decode` trait allows objects to be read from the Minecraft protocol.
/// It is the inverse of [`Encode`].
///
/// `Decode` is parameterized by a lifetime. This allows the decoded value to
/// borrow data from the byte slice it was read from.
pub trait Decode<'a>: Sized {
    /// Reads this object from the provided byte slice.
    ///
    /// Implementations of `Decode` are expected to shrink the slice from the
    /// front as bytes are read.
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self>;
}

/// Types that are sent as a frame body with a leading packet ID.
///
/// The ID tables live in [`packets`](crate::packets) and are generated from
/// registry data for the target protocol version.
pub trait Packet: std::fmt::Debug {
    /// The leading VarInt ID of this packet.
    const ID: i32;

    /// Encodes the packet ID followed by the packet body.
    fn encode_with_id(&self, mut w: impl Write) -> anyhow::Result<()>
    where
        Self: Encode,
    {
        use anyhow::Context;

        var_int::VarInt(Self::ID)
            .encode(&mut w)
            .context("failed to encode packet ID")?;

        self.encode(w)
    }
}
