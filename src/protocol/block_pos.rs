use std::io::Write;

use anyhow::bail;

use crate::protocol::{Decode, Encode};

/// An absolute block position packed into a single `i64` as
/// `x:26 | z:26 | y:12`, each field sign extended.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl Encode for BlockPos {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        match (self.x, self.y, self.z) {
            (-0x2000000..=0x1FFFFFF, -0x800..=0x7FF, -0x2000000..=0x1FFFFFF) => {
                let packed = (self.x as u64 & 0x3FFFFFF) << 38
                    | (self.z as u64 & 0x3FFFFFF) << 12
                    | (self.y as u64 & 0xFFF);
                packed.encode(w)
            }
            _ => bail!("out of range: {self:?}"),
        }
    }
}

impl Decode<'_> for BlockPos {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        // Use arithmetic right shift to sign-extend each field.
        let packed = i64::decode(r)?;
        let x = packed >> 38;
        let z = packed << 26 >> 38;
        let y = packed << 52 >> 52;
        Ok(Self {
            x: x as i32,
            y: y as i32,
            z: z as i32,
        })
    }
}
