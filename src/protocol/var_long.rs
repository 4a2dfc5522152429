use std::io::Write;

use anyhow::bail;
use byteorder::ReadBytesExt;

use crate::protocol::{Decode, Encode};

/// An `i64` encoded with variable length.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct VarLong(pub i64);

impl VarLong {
    /// The maximum number of bytes a VarLong can occupy on the wire.
    pub const MAX_SIZE: usize = 10;
}

impl Encode for VarLong {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        let mut val = self.0 as u64;
        loop {
            if val & 0xFFFFFFFFFFFFFF80 == 0 {
                w.write_all(&[val as u8])?;
                return Ok(());
            }
            w.write_all(&[val as u8 & 0x7F | 0x80])?;
            val >>= 7;
        }
    }
}

impl Decode<'_> for VarLong {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let mut val = 0;
        for i in 0..Self::MAX_SIZE {
            let byte = r.read_u8()?;
            val |= (byte as i64 & 0x7F) << (i * 7);
            if byte & 0x80 == 0 {
                return Ok(VarLong(val));
            }
        }
        bail!("VarLong is too large")
    }
}

impl From<i64> for VarLong {
    fn from(i: i64) -> Self {
        VarLong(i)
    }
}

impl From<VarLong> for i64 {
    fn from(i: VarLong) -> Self {
        i.0
    }
}

#[cfg(test)]
mod tests {
    use rand::{thread_rng, Rng};

    use super::*;

    #[test]
    fn encode_decode_random() {
        let mut rng = thread_rng();
        let mut buf = vec![];

        for n in (0..100_000)
            .map(|_| rng.gen())
            .chain([0, i64::MIN, i64::MAX])
        {
            buf.clear();
            VarLong(n).encode(&mut buf).unwrap();
            assert!(buf.len() <= VarLong::MAX_SIZE);

            let mut slice = buf.as_slice();
            assert_eq!(n, VarLong::decode(&mut slice).unwrap().0);
            assert!(slice.is_empty());
        }
    }

    #[test]
    fn negative_takes_ten_bytes() {
        let mut buf = vec![];
        VarLong(-1).encode(&mut buf).unwrap();
        assert_eq!(buf.len(), VarLong::MAX_SIZE);
    }
}
