//! `Encode`/`Decode` implementations for standard types.

use std::io::Write;
use std::mem;

use anyhow::ensure;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use uuid::Uuid;

use crate::protocol::var_int::VarInt;
use crate::protocol::{Decode, Encode, MAX_ARRAY_LEN, MAX_PACKET_SIZE};

// ==== Primitive ==== //

impl Encode for bool {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_u8(*self as u8)?)
    }
}

impl Decode<'_> for bool {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let n = r.read_u8()?;
        ensure!(n <= 1, "decoded boolean is not 0 or 1 (got {n})");
        Ok(n == 1)
    }
}

impl Encode for u8 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_u8(*self)?)
    }

    fn encode_slice(slice: &[u8], mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_all(slice)?)
    }
}

impl Decode<'_> for u8 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_u8()?)
    }
}

impl Encode for i8 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_i8(*self)?)
    }
}

impl Decode<'_> for i8 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_i8()?)
    }
}

macro_rules! impl_int {
    ($ty:ty, $write:ident, $read:ident) => {
        impl Encode for $ty {
            fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
                Ok(w.$write::<BigEndian>(*self)?)
            }
        }

        impl Decode<'_> for $ty {
            fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
                Ok(r.$read::<BigEndian>()?)
            }
        }
    };
}

impl_int!(u16, write_u16, read_u16);
impl_int!(i16, write_i16, read_i16);
impl_int!(u32, write_u32, read_u32);
impl_int!(i32, write_i32, read_i32);
impl_int!(u64, write_u64, read_u64);
impl_int!(i64, write_i64, read_i64);
impl_int!(u128, write_u128, read_u128);
impl_int!(f32, write_f32, read_f32);
impl_int!(f64, write_f64, read_f64);

// ==== Pointer ==== //

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        (**self).encode(w)
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.as_ref().encode(w)
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for Box<T> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        T::decode(r).map(Box::new)
    }
}

// ==== Tuple ==== //

macro_rules! impl_tuple {
    ($($ty:ident)*) => {
        #[allow(non_snake_case)]
        impl<$($ty: Encode,)*> Encode for ($($ty,)*) {
            fn encode(&self, mut _w: impl Write) -> anyhow::Result<()> {
                let ($($ty,)*) = self;
                $(
                    $ty.encode(&mut _w)?;
                )*
                Ok(())
            }
        }

        impl<'a, $($ty: Decode<'a>,)*> Decode<'a> for ($($ty,)*) {
            fn decode(_r: &mut &'a [u8]) -> anyhow::Result<Self> {
                Ok(($($ty::decode(_r)?,)*))
            }
        }
    }
}

impl_tuple!();
impl_tuple!(A);
impl_tuple!(A B);
impl_tuple!(A B C);
impl_tuple!(A B C D);
impl_tuple!(A B C D E);
impl_tuple!(A B C D E F);
impl_tuple!(A B C D E F G);
impl_tuple!(A B C D E F G H);
impl_tuple!(A B C D E F G H I);
impl_tuple!(A B C D E F G H I J);
impl_tuple!(A B C D E F G H I J K);
impl_tuple!(A B C D E F G H I J K L);

// ==== Sequence ==== //

/// Like tuples, arrays are encoded and decoded without a VarInt length prefix.
impl<const N: usize, T: Encode> Encode for [T; N] {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        T::encode_slice(self, w)
    }
}

impl<'a, const N: usize, T: Decode<'a>> Decode<'a> for [T; N] {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        let mut elems = Vec::with_capacity(N);
        for _ in 0..N {
            elems.push(T::decode(r)?);
        }

        elems
            .try_into()
            .map_err(|_| anyhow::anyhow!("array length mismatch"))
    }
}

/// References to fixed-length byte arrays are not length prefixed.
impl<'a, const N: usize> Decode<'a> for &'a [u8; N] {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        ensure!(
            r.len() >= N,
            "not enough data to decode u8 array of length {N}"
        );

        let (res, remaining) = r.split_at(N);
        let arr = <&[u8; N]>::try_from(res).unwrap();
        *r = remaining;
        Ok(arr)
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        let len = self.len();
        ensure!(
            len <= i32::MAX as usize,
            "length of slice ({len}) exceeds i32::MAX"
        );

        VarInt(len as i32).encode(&mut w)?;
        T::encode_slice(self, w)
    }
}

impl<'a> Decode<'a> for &'a [u8] {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        let len = VarInt::decode(r)?.0;
        ensure!(len >= 0, "attempt to decode slice with negative length");
        let len = len as usize;
        ensure!(r.len() >= len, "not enough data remaining to decode slice");

        let (res, remaining) = r.split_at(len);
        *r = remaining;
        Ok(res)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.as_slice().encode(w)
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for Vec<T> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        let len = VarInt::decode(r)?.0;
        ensure!(len >= 0, "attempt to decode Vec with negative length");
        let len = len as usize;
        ensure!(
            len <= MAX_ARRAY_LEN,
            "array length of {len} exceeds maximum of {MAX_ARRAY_LEN}"
        );

        // Don't allocate more memory than what would roughly fit in a single
        // packet in case we get a malicious array length.
        let cap = (MAX_PACKET_SIZE as usize / mem::size_of::<T>().max(1)).min(len);
        let mut vec = Vec::with_capacity(cap);

        for _ in 0..len {
            vec.push(T::decode(r)?);
        }

        Ok(vec)
    }
}

// ==== String ==== //

impl Encode for str {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        let len = self.len();
        ensure!(
            len <= i32::MAX as usize,
            "byte length of string ({len}) exceeds i32::MAX"
        );

        VarInt(len as i32).encode(&mut w)?;
        Ok(w.write_all(self.as_bytes())?)
    }
}

impl<'a> Decode<'a> for &'a str {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        let len = VarInt::decode(r)?.0;
        ensure!(len >= 0, "attempt to decode string with negative length");
        let len = len as usize;
        ensure!(
            len <= MAX_PACKET_SIZE as usize,
            "string byte length of {len} exceeds maximum"
        );
        ensure!(r.len() >= len, "not enough data remaining to decode string");

        let (res, remaining) = r.split_at(len);
        *r = remaining;

        Ok(std::str::from_utf8(res)?)
    }
}

impl Encode for String {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.as_str().encode(w)
    }
}

impl Decode<'_> for String {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(<&str>::decode(r)?.into())
    }
}

// ==== Other ==== //

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        match self {
            Some(t) => {
                true.encode(&mut w)?;
                t.encode(w)
            }
            None => false.encode(w),
        }
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for Option<T> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(match bool::decode(r)? {
            true => Some(T::decode(r)?),
            false => None,
        })
    }
}

impl Encode for Uuid {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.as_u128().encode(w)
    }
}

impl<'a> Decode<'a> for Uuid {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        u128::decode(r).map(Uuid::from_u128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::var_long::VarLong;

    fn round_trip<T>(value: T)
    where
        T: Encode + for<'a> Decode<'a> + PartialEq + std::fmt::Debug,
    {
        let mut buf = vec![];
        value.encode(&mut buf).unwrap();

        let mut slice = buf.as_slice();
        assert_eq!(value, T::decode(&mut slice).unwrap());
        assert!(slice.is_empty(), "{value:?} did not consume all its bytes");
    }

    #[test]
    fn primitives_round_trip() {
        round_trip(true);
        round_trip(false);
        round_trip(0xABu8);
        round_trip(-5i8);
        round_trip(0xBEEFu16);
        round_trip(-12345i16);
        round_trip(-123456789i32);
        round_trip(-1234567890123i64);
        round_trip(3.5f32);
        round_trip(-2.25f64);
        round_trip(Uuid::from_u128(0x0123456789ABCDEF0123456789ABCDEF));
    }

    #[test]
    fn composites_round_trip() {
        round_trip((VarInt(7), "hello".to_owned(), true));
        round_trip(Some(VarLong(-1)));
        round_trip(Option::<i32>::None);
        round_trip(vec![VarInt(1), VarInt(128), VarInt(-1)]);
        round_trip(vec![String::from("a"), String::from("b")]);
        round_trip([1u8, 2, 3]);
    }

    #[test]
    fn fixed_ints_are_big_endian() {
        let mut buf = vec![];
        0x0102_0304i32.encode(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn bad_bool_is_rejected() {
        let mut slice: &[u8] = &[2];
        assert!(bool::decode(&mut slice).is_err());
    }

    #[test]
    fn negative_lengths_are_rejected() {
        // VarInt(-1) length prefix.
        let mut slice: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F];
        assert!(<&str>::decode(&mut slice).is_err());

        let mut slice: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F];
        assert!(Vec::<u8>::decode(&mut slice).is_err());
    }

    #[test]
    fn oversized_array_is_rejected_before_allocating() {
        let mut buf = vec![];
        VarInt(MAX_ARRAY_LEN as i32 + 1).encode(&mut buf).unwrap();
        let mut slice = buf.as_slice();
        assert!(Vec::<u64>::decode(&mut slice).is_err());
    }

    #[test]
    fn short_read_is_an_error() {
        let mut buf = vec![];
        "hello".encode(&mut buf).unwrap();
        buf.truncate(buf.len() - 1);

        let mut slice = buf.as_slice();
        assert!(<&str>::decode(&mut slice).is_err());
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let mut slice: &[u8] = &[2, 0xC0, 0x80];
        assert!(<&str>::decode(&mut slice).is_err());
    }
}
