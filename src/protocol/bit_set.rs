use std::io::Write;

use crate::protocol::{Decode, Encode};

/// A growable bit set encoded as a VarInt word count followed by that many
/// `i64` words, bit 0 of word 0 first.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct BitSet(pub Vec<i64>);

impl BitSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// A bit set with enough zeroed words to address `bits` bits.
    pub fn with_capacity(bits: usize) -> Self {
        Self(vec![0; bits.div_ceil(64)])
    }

    pub fn bit(&self, idx: usize) -> bool {
        match self.0.get(idx / 64) {
            Some(word) => word >> (idx % 64) & 1 == 1,
            None => false,
        }
    }

    /// Sets a bit, growing the word vector as needed.
    pub fn set_bit(&mut self, idx: usize, val: bool) {
        if idx / 64 >= self.0.len() {
            self.0.resize(idx / 64 + 1, 0);
        }

        let word = &mut self.0[idx / 64];
        if val {
            *word |= 1 << (idx % 64);
        } else {
            *word &= !(1 << (idx % 64));
        }
    }

    /// The complement over the same word span.
    pub fn inverted(&self) -> Self {
        Self(self.0.iter().map(|w| !w).collect())
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Indices of set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.0.len() * 64).filter(|&i| self.bit(i))
    }
}

impl Encode for BitSet {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.0.encode(w)
    }
}

impl Decode<'_> for BitSet {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self(Vec::decode(r)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_ops() {
        let mut bits = BitSet::with_capacity(20);

        assert!(!bits.bit(5));
        bits.set_bit(5, true);
        assert!(bits.bit(5));
        assert_eq!(bits.0, [0b100000]);

        bits.set_bit(5, false);
        assert_eq!(bits.count_ones(), 0);

        // Setting past the current span grows it.
        bits.set_bit(64, true);
        assert_eq!(bits.0.len(), 2);
        assert!(bits.bit(64));
        assert_eq!(bits.iter_ones().collect::<Vec<_>>(), [64]);
    }

    #[test]
    fn round_trip() {
        let mut bits = BitSet::with_capacity(130);
        bits.set_bit(0, true);
        bits.set_bit(63, true);
        bits.set_bit(64, true);
        bits.set_bit(129, true);

        let mut buf = vec![];
        bits.encode(&mut buf).unwrap();
        // VarInt word count then three 8-byte words.
        assert_eq!(buf.len(), 1 + 3 * 8);

        let mut slice = buf.as_slice();
        assert_eq!(BitSet::decode(&mut slice).unwrap(), bits);
        assert!(slice.is_empty());
    }
}
