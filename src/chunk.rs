//! The chunk data model and its wire serialization.

use std::collections::HashMap;
use std::io::Write;

use anyhow::{ensure, Context};
use tracing::warn;

use crate::bit_storage::{bit_width, BitStorage};
use crate::generated;
use crate::paletted_container::{Biomes, BlockStates, PalettedContainer};
use crate::protocol::bit_set::BitSet;
use crate::protocol::nbt::Nbt;
use crate::protocol::var_int::VarInt;
use crate::protocol::{Decode, Encode};

/// Cells in a section's block-state container.
pub const SECTION_BLOCKS: usize = 4096;

/// Bytes in a nibble-packed section lightmap: half a byte per cell.
pub const LIGHT_BYTES: usize = SECTION_BLOCKS / 2;

/// A chunk column position.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl Encode for ChunkPos {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.x.encode(&mut w)?;
        self.z.encode(w)
    }
}

impl Decode<'_> for ChunkPos {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            x: i32::decode(r)?,
            z: i32::decode(r)?,
        })
    }
}

/// A 16×16×16 cube of blocks with its biomes and lightmaps.
#[derive(Clone, PartialEq, Debug)]
pub struct Section {
    /// Number of non-air blocks; kept in sync by [`set_block`](Self::set_block).
    pub block_count: i16,
    pub states: PalettedContainer<BlockStates>,
    pub biomes: PalettedContainer<Biomes>,
    pub sky_light: Option<Box<[u8; LIGHT_BYTES]>>,
    pub block_light: Option<Box<[u8; LIGHT_BYTES]>>,
}

impl Section {
    pub fn empty() -> Self {
        Self {
            block_count: 0,
            states: PalettedContainer::filled(generated::AIR),
            biomes: PalettedContainer::filled(0),
            sky_light: None,
            block_light: None,
        }
    }

    pub fn block(&self, index: usize) -> u32 {
        self.states.get(index)
    }

    /// Sets a block state, keeping `block_count` in step.
    pub fn set_block(&mut self, index: usize, state: u32) {
        let old = self.states.set(index, state);
        if !generated::is_air(old) {
            self.block_count -= 1;
        }
        if !generated::is_air(state) {
            self.block_count += 1;
        }
    }
}

impl Encode for Section {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.block_count.encode(&mut w)?;
        self.states.encode(&mut w)?;
        self.biomes.encode(w)
    }
}

impl Decode<'_> for Section {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            block_count: i16::decode(r)?,
            states: PalettedContainer::decode(r)?,
            biomes: PalettedContainer::decode(r)?,
            sky_light: None,
            block_light: None,
        })
    }
}

/// The six vanilla heightmaps. The numeric wire tag of each entry is
/// authoritative for which field it lands in.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct HeightMaps {
    pub world_surface_wg: Option<BitStorage>,
    pub world_surface: Option<BitStorage>,
    pub ocean_floor_wg: Option<BitStorage>,
    pub ocean_floor: Option<BitStorage>,
    pub motion_blocking: Option<BitStorage>,
    pub motion_blocking_no_leaves: Option<BitStorage>,
}

impl HeightMaps {
    /// All six maps zeroed at the right width for `section_count`.
    pub fn empty(section_count: usize) -> Self {
        let new = || Some(BitStorage::new(height_bits(section_count), 256));
        Self {
            world_surface_wg: new(),
            world_surface: new(),
            ocean_floor_wg: new(),
            ocean_floor: new(),
            motion_blocking: new(),
            motion_blocking_no_leaves: new(),
        }
    }

    fn slot(&mut self, tag: i32) -> Option<&mut Option<BitStorage>> {
        match tag {
            0 => Some(&mut self.world_surface_wg),
            1 => Some(&mut self.world_surface),
            2 => Some(&mut self.ocean_floor_wg),
            3 => Some(&mut self.ocean_floor),
            4 => Some(&mut self.motion_blocking),
            5 => Some(&mut self.motion_blocking_no_leaves),
            _ => None,
        }
    }

    fn entries(&self) -> impl Iterator<Item = (i32, &BitStorage)> {
        [
            (0, &self.world_surface_wg),
            (1, &self.world_surface),
            (2, &self.ocean_floor_wg),
            (3, &self.ocean_floor),
            (4, &self.motion_blocking),
            (5, &self.motion_blocking_no_leaves),
        ]
        .into_iter()
        .filter_map(|(tag, map)| map.as_ref().map(|m| (tag, m)))
    }
}

/// Bit width of a heightmap entry for a world `section_count` sections tall.
pub fn height_bits(section_count: usize) -> usize {
    bit_width(section_count * 16 + 1)
}

/// A block entity within a chunk: XZ packed into one byte, the type as a
/// registry index, and an opaque NBT body.
#[derive(Clone, PartialEq, Debug)]
pub struct BlockEntity {
    pub xz: u8,
    pub y: i16,
    pub kind: VarInt,
    pub data: Nbt,
}

impl BlockEntity {
    /// Packs chunk-relative coordinates, failing when out of range.
    pub fn pack_xz(x: u32, z: u32) -> Option<u8> {
        (x <= 0xF && z <= 0xF).then(|| (x << 4 | z) as u8)
    }

    pub fn unpack_xz(&self) -> (u32, u32) {
        ((self.xz >> 4) as u32 & 0xF, self.xz as u32 & 0xF)
    }
}

impl Encode for BlockEntity {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.xz.encode(&mut w)?;
        self.y.encode(&mut w)?;
        self.kind.encode(&mut w)?;
        self.data.encode(w)
    }
}

impl Decode<'_> for BlockEntity {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            xz: u8::decode(r)?,
            y: i16::decode(r)?,
            kind: VarInt::decode(r)?,
            data: Nbt::decode(r)?,
        })
    }
}

/// Generation status tag carried by saved chunks.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ChunkStatus(pub String);

impl ChunkStatus {
    pub fn empty() -> Self {
        Self("minecraft:empty".to_owned())
    }

    pub fn full() -> Self {
        Self("minecraft:full".to_owned())
    }
}

/// A column of sections plus heightmaps, block entities, and a status tag.
///
/// The section count comes from the dimension, not the wire, so chunks are
/// constructed with an explicit count and decoded with
/// [`read_payload`](Self::read_payload).
#[derive(Clone, PartialEq, Debug)]
pub struct Chunk {
    pub sections: Vec<Section>,
    pub heightmaps: HeightMaps,
    pub block_entities: Vec<BlockEntity>,
    pub status: ChunkStatus,
}

impl Chunk {
    pub fn empty(section_count: usize) -> Self {
        Self {
            sections: (0..section_count).map(|_| Section::empty()).collect(),
            heightmaps: HeightMaps::empty(section_count),
            block_entities: Vec::new(),
            status: ChunkStatus::empty(),
        }
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Reads a chunk-data payload (everything after the chunk position) for
    /// a chunk `section_count` sections tall.
    pub fn read_payload(r: &mut &[u8], section_count: usize) -> anyhow::Result<Self> {
        let mut chunk = Chunk::empty(section_count);
        chunk.heightmaps = HeightMaps::default();

        // Heightmap entries, selected by numeric tag.
        let entry_count = VarInt::decode(r)?.0;
        ensure!(entry_count >= 0, "negative heightmap entry count");
        let bits = height_bits(section_count);

        for _ in 0..entry_count {
            let tag = VarInt::decode(r)?.0;
            let longs: Vec<i64> = Vec::decode(r)?;
            let storage =
                BitStorage::from_raw(bits, 256, longs.into_iter().map(|l| l as u64).collect())
                    .context("heightmap storage")?;

            match chunk.heightmaps.slot(tag) {
                Some(slot) => *slot = Some(storage),
                None => warn!(tag, "ignoring unknown heightmap kind"),
            }
        }

        // The opaque blob of concatenated section encodings.
        let mut blob = <&[u8]>::decode(r).context("section blob")?;
        for i in 0..section_count {
            chunk.sections[i] = Section::decode(&mut blob).with_context(|| format!("section {i}"))?;
        }
        ensure!(
            blob.is_empty(),
            "{} trailing bytes after {section_count} sections",
            blob.len()
        );

        chunk.block_entities = Vec::decode(r).context("block entities")?;

        let light = LightData::decode(r).context("light data")?;
        light.apply(&mut chunk.sections);

        chunk.status = ChunkStatus::full();
        Ok(chunk)
    }

    /// Writes the chunk-data payload: heightmaps, section blob, block
    /// entities, light.
    pub fn write_payload(&self, mut w: impl Write) -> anyhow::Result<()> {
        let entries: Vec<_> = self.heightmaps.entries().collect();
        VarInt(entries.len() as i32).encode(&mut w)?;
        for (tag, storage) in entries {
            VarInt(tag).encode(&mut w)?;
            VarInt(storage.raw().len() as i32).encode(&mut w)?;
            for &word in storage.raw() {
                (word as i64).encode(&mut w)?;
            }
        }

        let mut blob = Vec::new();
        for section in &self.sections {
            section.encode(&mut blob)?;
        }
        blob.as_slice().encode(&mut w)?;

        self.block_entities.encode(&mut w)?;

        LightData::build(&self.sections).encode(w)
    }
}

/// The light block of a chunk-data payload.
///
/// The "empty" masks are derived as the complement of the present masks.
/// That is only correct under the assumption that every section without
/// light data attached is genuinely empty of light, which holds for the
/// chunks this engine produces.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct LightData {
    pub sky_mask: BitSet,
    pub block_mask: BitSet,
    pub empty_sky_mask: BitSet,
    pub empty_block_mask: BitSet,
    pub sky_light: Vec<Box<[u8; LIGHT_BYTES]>>,
    pub block_light: Vec<Box<[u8; LIGHT_BYTES]>>,
}

impl LightData {
    pub fn build(sections: &[Section]) -> Self {
        let mut data = LightData {
            sky_mask: BitSet::with_capacity(sections.len()),
            block_mask: BitSet::with_capacity(sections.len()),
            ..Default::default()
        };

        for (i, section) in sections.iter().enumerate() {
            if let Some(light) = &section.sky_light {
                data.sky_mask.set_bit(i, true);
                data.sky_light.push(light.clone());
            }
            if let Some(light) = &section.block_light {
                data.block_mask.set_bit(i, true);
                data.block_light.push(light.clone());
            }
        }

        data.empty_sky_mask = data.sky_mask.inverted();
        data.empty_block_mask = data.block_mask.inverted();
        data
    }

    /// Attaches the received lightmaps to their sections, in ascending mask
    /// bit order. Bits past the section span belong to the padding sections
    /// below and above the world and are skipped.
    pub fn apply(&self, sections: &mut [Section]) {
        debug_assert!(
            self.empty_sky_mask.0.is_empty()
                || (0..sections.len()).all(|i| self.sky_mask.bit(i) || self.empty_sky_mask.bit(i)),
            "sky light mask and empty mask disagree"
        );

        for (light, i) in self.sky_light.iter().zip(self.sky_mask.iter_ones()) {
            match sections.get_mut(i) {
                Some(section) => section.sky_light = Some(light.clone()),
                None => warn!(section = i, "sky light for out-of-range section"),
            }
        }

        for (light, i) in self.block_light.iter().zip(self.block_mask.iter_ones()) {
            match sections.get_mut(i) {
                Some(section) => section.block_light = Some(light.clone()),
                None => warn!(section = i, "block light for out-of-range section"),
            }
        }
    }
}

fn encode_light_maps(maps: &[Box<[u8; LIGHT_BYTES]>], mut w: impl Write) -> anyhow::Result<()> {
    VarInt(maps.len() as i32).encode(&mut w)?;
    for map in maps {
        map.as_slice().encode(&mut w)?;
    }
    Ok(())
}

fn decode_light_maps(r: &mut &[u8]) -> anyhow::Result<Vec<Box<[u8; LIGHT_BYTES]>>> {
    let count = VarInt::decode(r)?.0;
    ensure!(count >= 0, "negative lightmap count");

    let mut maps = Vec::with_capacity((count as usize).min(64));
    for _ in 0..count {
        let bytes = <&[u8]>::decode(r)?;
        ensure!(
            bytes.len() == LIGHT_BYTES,
            "lightmap of {} bytes, expected {LIGHT_BYTES}",
            bytes.len()
        );
        let mut map = Box::new([0u8; LIGHT_BYTES]);
        map.copy_from_slice(bytes);
        maps.push(map);
    }
    Ok(maps)
}

impl Encode for LightData {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.sky_mask.encode(&mut w)?;
        self.block_mask.encode(&mut w)?;
        self.empty_sky_mask.encode(&mut w)?;
        self.empty_block_mask.encode(&mut w)?;
        encode_light_maps(&self.sky_light, &mut w)?;
        encode_light_maps(&self.block_light, w)
    }
}

impl Decode<'_> for LightData {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let sky_mask = BitSet::decode(r)?;
        let block_mask = BitSet::decode(r)?;
        let empty_sky_mask = BitSet::decode(r)?;
        let empty_block_mask = BitSet::decode(r)?;

        let sky_light = decode_light_maps(r).context("sky light")?;
        let block_light = decode_light_maps(r).context("block light")?;

        ensure!(
            sky_light.len() == sky_mask.count_ones()
                && block_light.len() == block_mask.count_ones(),
            "light array count does not match mask"
        );

        Ok(Self {
            sky_mask,
            block_mask,
            empty_sky_mask,
            empty_block_mask,
            sky_light,
            block_light,
        })
    }
}

/// All loaded chunks, keyed by column position. Reads hand out shared views;
/// writes take the column exclusively.
#[derive(Default, Debug)]
pub struct World {
    chunks: HashMap<ChunkPos, Chunk>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pos: ChunkPos, chunk: Chunk) -> Option<Chunk> {
        self.chunks.insert(pos, chunk)
    }

    pub fn remove(&mut self, pos: ChunkPos) -> Option<Chunk> {
        self.chunks.remove(&pos)
    }

    pub fn chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    pub fn chunk_mut(&mut self, pos: ChunkPos) -> Option<&mut Chunk> {
        self.chunks.get_mut(&pos)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// World state shared with the chunk packet handlers registered on a
/// [`Client`](crate::client::Client).
#[derive(Clone)]
pub struct WorldManager {
    state: std::sync::Arc<std::sync::Mutex<WorldState>>,
}

struct WorldState {
    world: World,
    section_count: usize,
}

impl WorldManager {
    /// Creates the manager and wires chunk load/unload handlers into the
    /// client. `section_count` comes from the dimension the player is in
    /// (see [`DimensionType::section_count`](crate::registry::DimensionType)).
    pub fn new(client: &mut crate::client::Client, section_count: usize) -> Self {
        use crate::packets::play;
        use crate::protocol::Packet;

        let state = std::sync::Arc::new(std::sync::Mutex::new(WorldState {
            world: World::new(),
            section_count,
        }));

        let manager = Self { state };

        {
            let state = manager.state.clone();
            client.handlers.add(play::LEVEL_CHUNK_WITH_LIGHT, 0, move |pkt| {
                let mut state = state.lock().expect("world state poisoned");

                let mut r = pkt.body();
                let pos = ChunkPos::decode(&mut r)?;
                let chunk = Chunk::read_payload(&mut r, state.section_count)
                    .with_context(|| format!("chunk at {pos:?}"))?;
                ensure!(r.is_empty(), "{} bytes left over after chunk data", r.len());

                state.world.insert(pos, chunk);
                Ok(())
            });
        }

        {
            let state = manager.state.clone();
            client
                .handlers
                .add(play::ForgetLevelChunkS2c::ID, 0, move |pkt| {
                    let forget: play::ForgetLevelChunkS2c = pkt.decode()?;
                    let mut state = state.lock().expect("world state poisoned");
                    if state.world.remove(forget.pos).is_none() {
                        warn!(pos = ?forget.pos, "asked to forget a chunk that was never loaded");
                    }
                    Ok(())
                });
        }

        manager
    }

    /// Dimension changes alter the section count; loaded chunks from the old
    /// dimension are dropped.
    pub fn change_dimension(&self, section_count: usize) {
        let mut state = self.state.lock().expect("world state poisoned");
        state.section_count = section_count;
        state.world = World::new();
    }

    /// Shared read access to the loaded chunks.
    pub fn with_world<R>(&self, f: impl FnOnce(&World) -> R) -> R {
        f(&self.state.lock().expect("world state poisoned").world)
    }

    /// Exclusive access to the loaded chunks.
    pub fn with_world_mut<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        f(&mut self.state.lock().expect("world state poisoned").world)
    }
}
