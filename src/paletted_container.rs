//! Paletted containers for section block states and biomes.

use std::io::Write;
use std::marker::PhantomData;

use anyhow::{ensure, Context};
use byteorder::ReadBytesExt;

use crate::bit_storage::{bit_width, BitStorage};
use crate::generated;
use crate::protocol::var_int::VarInt;
use crate::protocol::{Decode, Encode};

/// A palette domain fixes the cell count and bit-width policy of a
/// [`PalettedContainer`]. Block states and biomes use the same container
/// machinery with different parameters.
pub trait PaletteDomain {
    /// Cells per section container.
    const CELLS: usize;
    /// Smallest allowed indirect-palette width.
    const MIN_INDIRECT_BITS: usize;
    /// Largest allowed indirect-palette width; above this the container goes
    /// direct.
    const MAX_INDIRECT_BITS: usize;

    /// Bits needed to hold any registry ID of this domain.
    fn direct_bits() -> usize;
}

/// The 16×16×16 block-state domain.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct BlockStates;

impl PaletteDomain for BlockStates {
    const CELLS: usize = 4096;
    const MIN_INDIRECT_BITS: usize = 4;
    const MAX_INDIRECT_BITS: usize = 8;

    fn direct_bits() -> usize {
        bit_width(generated::BLOCK_STATE_COUNT - 1)
    }
}

/// The 4×4×4 biome domain.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Biomes;

impl PaletteDomain for Biomes {
    const CELLS: usize = 64;
    const MIN_INDIRECT_BITS: usize = 1;
    const MAX_INDIRECT_BITS: usize = 3;

    fn direct_bits() -> usize {
        bit_width(generated::BIOME_COUNT - 1)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
enum Palette {
    /// One implicit entry; every cell refers to it. No backing storage.
    Single(u32),
    /// An explicit palette indexed by the bit storage.
    Indirect(Vec<u32>),
    /// The bit storage holds registry IDs verbatim.
    Direct,
}

/// A container of `D::CELLS` registry IDs stored in one of three modes
/// selected by bits-per-entry. Mutations upgrade the mode in place and
/// preserve every cell value exactly.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PalettedContainer<D> {
    palette: Palette,
    data: BitStorage,
    _marker: PhantomData<D>,
}

impl<D: PaletteDomain> PalettedContainer<D> {
    /// A container with every cell set to `value`.
    pub fn filled(value: u32) -> Self {
        Self {
            palette: Palette::Single(value),
            data: BitStorage::new(0, D::CELLS),
            _marker: PhantomData,
        }
    }

    /// Rebuilds a container from an explicit palette plus packed data, the
    /// shape chunk saves use. A one-entry palette with no data collapses to
    /// single mode.
    pub fn from_parts(palette: Vec<u32>, data: Vec<u64>) -> anyhow::Result<Self> {
        ensure!(!palette.is_empty(), "palette must not be empty");

        if palette.len() == 1 && data.is_empty() {
            return Ok(Self::filled(palette[0]));
        }

        let bits = D::MIN_INDIRECT_BITS.max(bit_width(palette.len() - 1));
        ensure!(
            bits <= D::MAX_INDIRECT_BITS,
            "palette of {} entries does not fit an indirect container",
            palette.len()
        );

        Ok(Self {
            palette: Palette::Indirect(palette),
            data: BitStorage::from_raw(bits, D::CELLS, data)?,
            _marker: PhantomData,
        })
    }

    pub fn get(&self, index: usize) -> u32 {
        debug_assert!(index < D::CELLS);

        match &self.palette {
            Palette::Single(value) => *value,
            Palette::Indirect(palette) => palette[self.data.get(index) as usize],
            Palette::Direct => self.data.get(index) as u32,
        }
    }

    /// Sets a cell, returning its previous value.
    pub fn set(&mut self, index: usize, value: u32) -> u32 {
        debug_assert!(index < D::CELLS);

        match &mut self.palette {
            Palette::Single(current) => {
                let old = *current;
                if old == value {
                    return old;
                }

                // Upgrade to indirect with a two-entry palette.
                self.palette = Palette::Indirect(vec![old, value]);
                self.data = BitStorage::new(D::MIN_INDIRECT_BITS, D::CELLS);
                self.data.set(index, 1);
                old
            }
            Palette::Indirect(palette) => {
                if let Some(i) = palette.iter().position(|&v| v == value) {
                    let old = palette[self.data.get(index) as usize];
                    self.data.set(index, i as u64);
                    return old;
                }

                self.insert_new_entry(index, value)
            }
            Palette::Direct => {
                let old = self.data.get(index) as u32;
                self.data.set(index, value as u64);
                old
            }
        }
    }

    /// Slow path of [`set`](Self::set): the value is not in the palette yet.
    /// May widen the storage or tip the container into direct mode.
    fn insert_new_entry(&mut self, index: usize, value: u32) -> u32 {
        let palette_index = match &mut self.palette {
            Palette::Indirect(palette) => {
                palette.push(value);
                palette.len() - 1
            }
            _ => unreachable!("insert_new_entry on a non-indirect container"),
        };

        if bit_width(palette_index) > self.data.bits() {
            let bits = D::MIN_INDIRECT_BITS.max(bit_width(palette_index));
            if bits > D::MAX_INDIRECT_BITS {
                self.to_direct();
                let old = self.data.get(index) as u32;
                self.data.set(index, value as u64);
                return old;
            }
            self.grow(bits);
        }

        let old = self.get(index);
        self.data.set(index, palette_index as u64);
        old
    }

    /// Rewrites the indirect storage at a wider index width.
    fn grow(&mut self, bits: usize) {
        let mut data = BitStorage::new(bits, D::CELLS);
        for i in 0..D::CELLS {
            data.set(i, self.data.get(i));
        }
        self.data = data;
    }

    /// Converts to direct mode, preserving every cell.
    fn to_direct(&mut self) {
        let mut data = BitStorage::new(D::direct_bits(), D::CELLS);
        for i in 0..D::CELLS {
            data.set(i, self.get(i) as u64);
        }
        self.palette = Palette::Direct;
        self.data = data;
    }

    /// The explicit palette, if the container has one.
    pub fn palette_entries(&self) -> Option<&[u32]> {
        match &self.palette {
            Palette::Single(_) => None,
            Palette::Indirect(palette) => Some(palette),
            Palette::Direct => None,
        }
    }

    /// The packed words backing this container (empty in single mode).
    pub fn raw_data(&self) -> &[u64] {
        self.data.raw()
    }
}

impl<D: PaletteDomain> Encode for PalettedContainer<D> {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        match &self.palette {
            Palette::Single(value) => {
                0u8.encode(&mut w)?;
                VarInt(*value as i32).encode(&mut w)?;
                VarInt(0).encode(w)
            }
            Palette::Indirect(palette) => {
                (self.data.bits() as u8).encode(&mut w)?;

                VarInt(palette.len() as i32).encode(&mut w)?;
                for &entry in palette {
                    VarInt(entry as i32).encode(&mut w)?;
                }

                encode_data(&self.data, w)
            }
            Palette::Direct => {
                (self.data.bits() as u8).encode(&mut w)?;
                encode_data(&self.data, w)
            }
        }
    }
}

fn encode_data(data: &BitStorage, mut w: impl Write) -> anyhow::Result<()> {
    VarInt(data.raw().len() as i32).encode(&mut w)?;
    for &word in data.raw() {
        (word as i64).encode(&mut w)?;
    }
    Ok(())
}

fn decode_data(r: &mut &[u8], bits: usize, cells: usize) -> anyhow::Result<BitStorage> {
    let len = VarInt::decode(r)?.0;
    ensure!(len >= 0, "negative data array length of {len}");

    let mut words = Vec::with_capacity((len as usize).min(1024));
    for _ in 0..len {
        words.push(i64::decode(r)? as u64);
    }

    BitStorage::from_raw(bits, cells, words)
}

impl<D: PaletteDomain> Decode<'_> for PalettedContainer<D> {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let bits = r.read_u8()? as usize;

        if bits == 0 {
            let value = VarInt::decode(r)?.0 as u32;
            let data_len = VarInt::decode(r)?.0;
            ensure!(
                data_len == 0,
                "single-value container declared {data_len} data words"
            );
            return Ok(Self::filled(value));
        }

        if bits <= D::MAX_INDIRECT_BITS {
            // Widths below the minimum are normalised upward; the sender
            // packed the data at the normalised width.
            let bits = bits.max(D::MIN_INDIRECT_BITS);

            let palette_len = VarInt::decode(r)?.0;
            ensure!(
                palette_len > 0 && palette_len as usize <= 1 << bits,
                "indirect palette length of {palette_len} does not fit {bits} bits"
            );

            let mut palette = Vec::with_capacity(palette_len as usize);
            for _ in 0..palette_len {
                palette.push(VarInt::decode(r)?.0 as u32);
            }

            let data = decode_data(r, bits, D::CELLS).context("indirect container data")?;

            return Ok(Self {
                palette: Palette::Indirect(palette),
                data,
                _marker: PhantomData,
            });
        }

        // Any width past the indirect maximum reads at the registry width.
        let data = decode_data(r, D::direct_bits(), D::CELLS).context("direct container data")?;

        Ok(Self {
            palette: Palette::Direct,
            data,
            _marker: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<D: PaletteDomain>(container: &PalettedContainer<D>) -> PalettedContainer<D> {
        let mut buf = vec![];
        container.encode(&mut buf).unwrap();

        let mut slice = buf.as_slice();
        let decoded = PalettedContainer::<D>::decode(&mut slice).unwrap();
        assert!(slice.is_empty(), "container left bytes behind");

        // Byte-exact re-encode.
        let mut buf2 = vec![];
        decoded.encode(&mut buf2).unwrap();
        assert_eq!(buf, buf2);

        decoded
    }

    #[test]
    fn single_mode_round_trip() {
        let container = PalettedContainer::<BlockStates>::filled(0);
        let decoded = round_trip(&container);
        assert_eq!(decoded, container);
        assert_eq!(decoded.get(4095), 0);
    }

    #[test]
    fn first_set_upgrades_to_indirect() {
        let stone = 1;
        let mut container = PalettedContainer::<BlockStates>::filled(0);

        assert_eq!(container.set(0, stone), 0);
        assert_eq!(container.palette_entries(), Some(&[0, stone][..]));
        assert_eq!(container.data.bits(), 4);
        assert_eq!(container.get(0), stone);
        assert_eq!(container.get(1), 0);

        let decoded = round_trip(&container);
        assert_eq!(decoded.get(0), stone);
    }

    #[test]
    fn many_values_force_direct_mode() {
        let mut container = PalettedContainer::<BlockStates>::filled(0);

        // 17 distinct states exceed a 4-bit palette; hundreds exceed 8 bits.
        for i in 0..256usize {
            container.set(i, (i * 7 + 1) as u32);
        }

        assert!(container.palette_entries().is_none());
        assert_eq!(container.data.bits(), BlockStates::direct_bits());

        for i in 0..256usize {
            assert_eq!(container.get(i), (i * 7 + 1) as u32, "cell {i}");
        }
        assert_eq!(container.get(256), 0);

        let decoded = round_trip(&container);
        for i in 0..256usize {
            assert_eq!(decoded.get(i), (i * 7 + 1) as u32);
        }
    }

    #[test]
    fn biome_widths_grow_from_one_bit() {
        let mut container = PalettedContainer::<Biomes>::filled(0);

        container.set(0, 1);
        assert_eq!(container.data.bits(), 1);

        container.set(1, 2);
        assert_eq!(container.data.bits(), 2);

        container.set(2, 3);
        container.set(3, 4);
        assert_eq!(container.data.bits(), 3);

        // Ninth distinct biome exceeds 3 bits.
        for (cell, biome) in (4..9).zip(5..) {
            container.set(cell, biome);
        }
        assert!(container.palette_entries().is_none());

        for i in 0..9 {
            assert_eq!(container.get(i), i as u32 + 1, "cell {i}");
        }

        round_trip(&container);
    }

    #[test]
    fn set_returns_previous_value() {
        let mut container = PalettedContainer::<BlockStates>::filled(9);
        assert_eq!(container.set(5, 10), 9);
        assert_eq!(container.set(5, 11), 10);
        assert_eq!(container.set(5, 11), 11);
    }

    #[test]
    fn from_parts_matches_save_shape() {
        // Two-entry palette at the 4-bit minimum: 4096 cells in 256 words.
        let mut data = vec![0u64; 256];
        data[0] = 0x1; // cell 0 reads palette[1]

        let container = PalettedContainer::<BlockStates>::from_parts(vec![0, 77], data).unwrap();
        assert_eq!(container.get(0), 77);
        assert_eq!(container.get(1), 0);

        let single = PalettedContainer::<BlockStates>::from_parts(vec![42], vec![]).unwrap();
        assert_eq!(single.get(1234), 42);

        assert!(PalettedContainer::<BlockStates>::from_parts(vec![0, 1], vec![]).is_err());
    }

    #[test]
    fn undersized_declared_width_is_normalised() {
        // A container wired at 2 bits for blocks must be read at 4.
        let mut buf = vec![];
        2u8.encode(&mut buf).unwrap();
        VarInt(2).encode(&mut buf).unwrap(); // palette length
        VarInt(0).encode(&mut buf).unwrap();
        VarInt(1).encode(&mut buf).unwrap();
        VarInt(256).encode(&mut buf).unwrap(); // words at 4 bits
        for _ in 0..256 {
            0i64.encode(&mut buf).unwrap();
        }

        let mut slice = buf.as_slice();
        let container = PalettedContainer::<BlockStates>::decode(&mut slice).unwrap();
        assert!(slice.is_empty());
        assert_eq!(container.data.bits(), 4);
    }

    #[test]
    fn mismatched_word_count_is_rejected() {
        let mut buf = vec![];
        4u8.encode(&mut buf).unwrap();
        VarInt(2).encode(&mut buf).unwrap();
        VarInt(0).encode(&mut buf).unwrap();
        VarInt(1).encode(&mut buf).unwrap();
        VarInt(10).encode(&mut buf).unwrap(); // should be 256
        for _ in 0..10 {
            0i64.encode(&mut buf).unwrap();
        }

        let mut slice = buf.as_slice();
        assert!(PalettedContainer::<BlockStates>::decode(&mut slice).is_err());
    }
}
