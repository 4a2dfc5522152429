//! Server-driven registries and tags.
//!
//! During configuration the server streams registry entries and tag
//! groupings. Entries are kept in insertion order because the position of an
//! entry *is* its wire id. Registries the client has no typed binding for
//! are still captured as opaque NBT so session setup never fails on
//! forward-compatibility gaps; typing happens at lookup via the views at the
//! bottom of this module.

use std::collections::HashMap;
use std::io::Write;

use anyhow::{anyhow, Context};
use indexmap::IndexMap;
use tracing::debug;
use valence_nbt::{Compound, Value};

use crate::protocol::ident::Ident;
use crate::protocol::var_int::VarInt;
use crate::protocol::{Decode, Encode};

/// One entry of a `RegistryData` packet: a name and an optional NBT body.
/// Entries without a body still occupy an index.
#[derive(Clone, PartialEq, Debug)]
pub struct RegistryEntry {
    pub name: Ident,
    pub data: Option<Compound>,
}

impl Encode for RegistryEntry {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.name.encode(&mut w)?;
        self.data.encode(w)
    }
}

impl Decode<'_> for RegistryEntry {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            name: Ident::decode(r)?,
            data: Option::decode(r)?,
        })
    }
}

/// A named group of registry indices.
#[derive(Clone, PartialEq, Debug)]
pub struct Tag {
    pub name: Ident,
    pub entries: Vec<VarInt>,
}

impl Encode for Tag {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.name.encode(&mut w)?;
        self.entries.encode(w)
    }
}

impl Decode<'_> for Tag {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            name: Ident::decode(r)?,
            entries: Vec::decode(r)?,
        })
    }
}

/// All tags for one registry, as sent by `UpdateTags`.
#[derive(Clone, PartialEq, Debug)]
pub struct RegistryTags {
    pub registry: Ident,
    pub tags: Vec<Tag>,
}

impl Encode for RegistryTags {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.registry.encode(&mut w)?;
        self.tags.encode(w)
    }
}

impl Decode<'_> for RegistryTags {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            registry: Ident::decode(r)?,
            tags: Vec::decode(r)?,
        })
    }
}

/// One registry: insertion-ordered entries (index = wire id) plus tag
/// groupings resolved against those indices.
#[derive(Clone, Default, Debug)]
pub struct DynamicRegistry {
    entries: IndexMap<Ident, Option<Compound>>,
    tags: HashMap<Ident, Vec<usize>>,
}

impl DynamicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.tags.clear();
    }

    /// Appends an entry, returning its index. Re-sent names keep their
    /// original index.
    pub fn put(&mut self, name: Ident, data: Option<Compound>) -> usize {
        let entry = self.entries.entry(name);
        let index = entry.index();
        entry.or_insert(data);
        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Option<Compound>> {
        self.entries.get(name)
    }

    pub fn get_by_index(&self, index: usize) -> Option<(&Ident, &Option<Compound>)> {
        self.entries.get_index(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.get_index_of(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Ident, &Option<Compound>)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, (name, data))| (i, name, data))
    }

    /// Replaces this registry's contents from a `RegistryData` entry list.
    pub fn load(&mut self, entries: Vec<RegistryEntry>) {
        self.entries.clear();
        for entry in entries {
            self.put(entry.name, entry.data);
        }
    }

    /// Stores tag groupings. Indices that don't resolve against the current
    /// entries are dropped: servers send tags for registries the client
    /// never materialises (known-packs data), and a partial membership list
    /// beats a failed configuration.
    pub fn apply_tags(&mut self, tags: Vec<Tag>) {
        for tag in tags {
            let mut members = Vec::with_capacity(tag.entries.len());
            for id in tag.entries {
                let index = id.0 as usize;
                if id.0 >= 0 && index < self.entries.len() {
                    members.push(index);
                } else {
                    debug!(tag = %tag.name, id = id.0, "dropping unresolvable tag entry");
                }
            }
            self.tags.insert(tag.name, members);
        }
    }

    /// Indices grouped under a tag, if the tag was received.
    pub fn tag(&self, name: &str) -> Option<&[usize]> {
        self.tags.get(name).map(Vec::as_slice)
    }
}

/// Every registry received this session, keyed by registry id.
#[derive(Clone, Default, Debug)]
pub struct RegistrySet {
    registries: IndexMap<Ident, DynamicRegistry>,
}

impl RegistrySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all session registry state (configuration re-entry).
    pub fn clear(&mut self) {
        self.registries.clear();
    }

    /// The registry with the given id, created empty on first reference.
    pub fn registry_mut(&mut self, id: Ident) -> &mut DynamicRegistry {
        self.registries.entry(id).or_default()
    }

    pub fn registry(&self, id: &str) -> Option<&DynamicRegistry> {
        self.registries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ident, &DynamicRegistry)> {
        self.registries.iter()
    }

    /// The decoded dimension type with the given name, from
    /// `minecraft:dimension_type`.
    pub fn dimension_type(&self, name: &str) -> anyhow::Result<DimensionType> {
        let compound = self
            .registry("minecraft:dimension_type")
            .and_then(|reg| reg.get(name))
            .and_then(|data| data.as_ref())
            .ok_or_else(|| anyhow!("no dimension type named {name}"))?;

        DimensionType::from_nbt(compound).with_context(|| format!("dimension type {name}"))
    }
}

fn get_i32(compound: &Compound, key: &str) -> Option<i32> {
    match compound.get(key)? {
        Value::Byte(v) => Some(*v as i32),
        Value::Short(v) => Some(*v as i32),
        Value::Int(v) => Some(*v),
        _ => None,
    }
}

fn get_i64(compound: &Compound, key: &str) -> Option<i64> {
    match compound.get(key)? {
        Value::Long(v) => Some(*v),
        _ => get_i32(compound, key).map(i64::from),
    }
}

fn get_f32(compound: &Compound, key: &str) -> Option<f32> {
    match compound.get(key)? {
        Value::Float(v) => Some(*v),
        Value::Double(v) => Some(*v as f32),
        _ => None,
    }
}

fn get_f64(compound: &Compound, key: &str) -> Option<f64> {
    match compound.get(key)? {
        Value::Float(v) => Some(*v as f64),
        Value::Double(v) => Some(*v),
        _ => None,
    }
}

fn get_bool(compound: &Compound, key: &str) -> Option<bool> {
    get_i32(compound, key).map(|v| v != 0)
}

fn get_string(compound: &Compound, key: &str) -> Option<String> {
    match compound.get(key)? {
        Value::String(v) => Some(v.clone()),
        _ => None,
    }
}

/// Typed view of a `minecraft:dimension_type` entry. The chunk layer needs
/// `min_y` and `height`; the rest rides along for callers.
#[derive(Clone, PartialEq, Debug)]
pub struct DimensionType {
    pub fixed_time: Option<i64>,
    pub has_skylight: bool,
    pub has_ceiling: bool,
    pub ultrawarm: bool,
    pub natural: bool,
    pub coordinate_scale: f64,
    pub bed_works: bool,
    pub respawn_anchor_works: bool,
    pub min_y: i32,
    pub height: i32,
    pub logical_height: i32,
    pub infiniburn: String,
    pub effects: String,
    pub ambient_light: f64,
    pub piglin_safe: bool,
    pub has_raids: bool,
    pub monster_spawn_block_light_limit: i32,
}

impl DimensionType {
    pub fn from_nbt(compound: &Compound) -> anyhow::Result<Self> {
        let require_i32 =
            |key| get_i32(compound, key).ok_or_else(|| anyhow!("missing int field {key}"));

        Ok(Self {
            fixed_time: get_i64(compound, "fixed_time"),
            has_skylight: get_bool(compound, "has_skylight").unwrap_or(true),
            has_ceiling: get_bool(compound, "has_ceiling").unwrap_or(false),
            ultrawarm: get_bool(compound, "ultrawarm").unwrap_or(false),
            natural: get_bool(compound, "natural").unwrap_or(true),
            coordinate_scale: get_f64(compound, "coordinate_scale").unwrap_or(1.0),
            bed_works: get_bool(compound, "bed_works").unwrap_or(true),
            respawn_anchor_works: get_bool(compound, "respawn_anchor_works").unwrap_or(false),
            min_y: require_i32("min_y")?,
            height: require_i32("height")?,
            logical_height: get_i32(compound, "logical_height")
                .unwrap_or_else(|| get_i32(compound, "height").unwrap_or(0)),
            infiniburn: get_string(compound, "infiniburn").unwrap_or_default(),
            effects: get_string(compound, "effects").unwrap_or_default(),
            ambient_light: get_f64(compound, "ambient_light").unwrap_or(0.0),
            piglin_safe: get_bool(compound, "piglin_safe").unwrap_or(false),
            has_raids: get_bool(compound, "has_raids").unwrap_or(true),
            monster_spawn_block_light_limit: get_i32(compound, "monster_spawn_block_light_limit")
                .unwrap_or(0),
        })
    }

    /// Vertical sections a chunk spans in this dimension.
    pub fn section_count(&self) -> usize {
        (self.height as usize).div_ceil(16)
    }
}

/// Typed view of a `minecraft:chat_type` entry.
#[derive(Clone, PartialEq, Debug)]
pub struct ChatType {
    pub chat: Decoration,
    pub narration: Decoration,
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct Decoration {
    pub translation_key: String,
    pub parameters: Vec<String>,
}

impl ChatType {
    pub fn from_nbt(compound: &Compound) -> anyhow::Result<Self> {
        let decoration = |key: &str| -> Decoration {
            let Some(Value::Compound(c)) = compound.get(key) else {
                return Decoration::default();
            };
            Decoration {
                translation_key: get_string(c, "translation_key").unwrap_or_default(),
                parameters: match c.get("parameters") {
                    Some(Value::List(valence_nbt::List::String(params))) => params.clone(),
                    _ => Vec::new(),
                },
            }
        };

        Ok(Self {
            chat: decoration("chat"),
            narration: decoration("narration"),
        })
    }
}

/// Typed view of a `minecraft:damage_type` entry.
#[derive(Clone, PartialEq, Debug)]
pub struct DamageType {
    pub message_id: String,
    pub scaling: String,
    pub exhaustion: f32,
    pub effects: Option<String>,
    pub death_message_type: Option<String>,
}

impl DamageType {
    pub fn from_nbt(compound: &Compound) -> anyhow::Result<Self> {
        Ok(Self {
            message_id: get_string(compound, "message_id")
                .ok_or_else(|| anyhow!("missing message_id"))?,
            scaling: get_string(compound, "scaling").unwrap_or_default(),
            exhaustion: get_f32(compound, "exhaustion").unwrap_or(0.0),
            effects: get_string(compound, "effects"),
            death_message_type: get_string(compound, "death_message_type"),
        })
    }
}

#[cfg(test)]
mod tests {
    use valence_nbt::compound;

    use super::*;

    fn ident(s: &str) -> Ident {
        Ident::new(s).unwrap()
    }

    #[test]
    fn indices_follow_insertion_order() {
        let mut registry = DynamicRegistry::new();
        assert_eq!(registry.put(ident("minecraft:overworld"), None), 0);
        assert_eq!(
            registry.put(ident("minecraft:the_nether"), Some(compound! {})),
            1
        );
        assert_eq!(registry.index_of("minecraft:the_nether"), Some(1));
        assert_eq!(registry.get_by_index(0).unwrap().0.as_str(), "minecraft:overworld");
    }

    #[test]
    fn dataless_entries_keep_their_index() {
        let mut registry = DynamicRegistry::new();
        registry.load(vec![
            RegistryEntry {
                name: ident("minecraft:a"),
                data: None,
            },
            RegistryEntry {
                name: ident("minecraft:b"),
                data: Some(compound! { "x" => 1 }),
            },
        ]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.index_of("minecraft:b"), Some(1));
        assert!(registry.get("minecraft:a").unwrap().is_none());
    }

    #[test]
    fn out_of_range_tag_entries_are_dropped() {
        let mut registry = DynamicRegistry::new();
        registry.put(ident("minecraft:a"), None);
        registry.put(ident("minecraft:b"), None);

        registry.apply_tags(vec![Tag {
            name: ident("minecraft:everything"),
            entries: vec![VarInt(0), VarInt(5), VarInt(1), VarInt(-1)],
        }]);

        assert_eq!(registry.tag("minecraft:everything"), Some(&[0, 1][..]));
    }

    #[test]
    fn unknown_registries_are_materialised_opaque() {
        let mut set = RegistrySet::new();
        let registry = set.registry_mut(ident("minecraft:frobnicator"));
        registry.put(ident("minecraft:x"), Some(compound! { "weird" => 3_i8 }));

        assert_eq!(set.registry("minecraft:frobnicator").unwrap().len(), 1);
        assert!(set.registry("minecraft:absent").is_none());
    }

    #[test]
    fn dimension_type_view() {
        let nbt = compound! {
            "min_y" => -64,
            "height" => 384,
            "logical_height" => 384,
            "has_skylight" => 1_i8,
            "coordinate_scale" => 1.0,
            "infiniburn" => "#minecraft:infiniburn_overworld",
            "effects" => "minecraft:overworld",
        };

        let mut set = RegistrySet::new();
        set.registry_mut(ident("minecraft:dimension_type"))
            .put(ident("minecraft:overworld"), Some(nbt));

        let dim = set.dimension_type("minecraft:overworld").unwrap();
        assert_eq!(dim.min_y, -64);
        assert_eq!(dim.section_count(), 24);
        assert!(dim.has_skylight);

        assert!(set.dimension_type("minecraft:the_end").is_err());
    }

    #[test]
    fn damage_type_view_requires_message_id() {
        assert!(DamageType::from_nbt(&compound! {}).is_err());

        let damage = DamageType::from_nbt(&compound! {
            "message_id" => "fall",
            "scaling" => "when_caused_by_living_non_player",
            "exhaustion" => 0.0_f32,
        })
        .unwrap();
        assert_eq!(damage.message_id, "fall");
        assert_eq!(damage.effects, None);
    }
}
