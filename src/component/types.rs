//! Wire structures shared by several data components.

use std::io::Write;

use anyhow::ensure;
use uuid::Uuid;

use crate::protocol::block_pos::BlockPos;
use crate::protocol::ident::Ident;
use crate::protocol::nbt::Nbt;
use crate::protocol::var_int::VarInt;
use crate::protocol::{Decode, Encode};

/// A value held either inline or as a reference into a registry.
///
/// On the wire a tag of `0` introduces the inline struct; any other tag is
/// `registry index + 1`.
#[derive(Clone, PartialEq, Debug)]
pub enum Holder<T> {
    Ref(i32),
    Inline(T),
}

impl<T: Encode> Encode for Holder<T> {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        match self {
            Self::Ref(id) => VarInt(id + 1).encode(w),
            Self::Inline(value) => {
                VarInt(0).encode(&mut w)?;
                value.encode(w)
            }
        }
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for Holder<T> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        let tag = VarInt::decode(r)?.0;
        ensure!(tag >= 0, "negative registry holder tag of {tag}");
        Ok(match tag {
            0 => Self::Inline(T::decode(r)?),
            id => Self::Ref(id - 1),
        })
    }
}

/// Either a registry id or a resource key, boolean prefixed.
#[derive(Clone, PartialEq, Debug)]
pub enum EitherHolder {
    Id(i32),
    Key(Ident),
}

impl Encode for EitherHolder {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        match self {
            Self::Id(id) => {
                true.encode(&mut w)?;
                VarInt(*id).encode(w)
            }
            Self::Key(key) => {
                false.encode(&mut w)?;
                key.encode(w)
            }
        }
    }
}

impl Decode<'_> for EitherHolder {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(if bool::decode(r)? {
            Self::Id(VarInt::decode(r)?.0)
        } else {
            Self::Key(Ident::decode(r)?)
        })
    }
}

/// A holder-or-tag-key alternative, boolean prefixed: `true` introduces a
/// [`Holder`], `false` a tag key string.
#[derive(Clone, PartialEq, Debug)]
pub enum OrTag<T> {
    Holder(Holder<T>),
    Tag(Ident),
}

impl<T: Encode> Encode for OrTag<T> {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        match self {
            Self::Holder(holder) => {
                true.encode(&mut w)?;
                holder.encode(w)
            }
            Self::Tag(tag) => {
                false.encode(&mut w)?;
                tag.encode(w)
            }
        }
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for OrTag<T> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(if bool::decode(r)? {
            Self::Holder(Holder::decode(r)?)
        } else {
            Self::Tag(Ident::decode(r)?)
        })
    }
}

/// A set of registry entries: a tag name, or an explicit id list.
///
/// Wire: VarInt tag; `0` is followed by the tag name, `n > 0` by `n - 1` ids.
#[derive(Clone, PartialEq, Debug)]
pub enum IdSet {
    Tag(Ident),
    Ids(Vec<i32>),
}

impl Encode for IdSet {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        match self {
            Self::Tag(name) => {
                VarInt(0).encode(&mut w)?;
                name.encode(w)
            }
            Self::Ids(ids) => {
                VarInt(ids.len() as i32 + 1).encode(&mut w)?;
                for &id in ids {
                    VarInt(id).encode(&mut w)?;
                }
                Ok(())
            }
        }
    }
}

impl Decode<'_> for IdSet {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let tag = VarInt::decode(r)?.0;
        ensure!(tag >= 0, "negative id set tag of {tag}");

        if tag == 0 {
            return Ok(Self::Tag(Ident::decode(r)?));
        }

        let mut ids = Vec::with_capacity((tag as usize - 1).min(1024));
        for _ in 0..tag - 1 {
            ids.push(VarInt::decode(r)?.0);
        }
        Ok(Self::Ids(ids))
    }
}

/// Inline sound event data; most components carry `Holder<SoundEventData>`.
#[derive(Clone, PartialEq, Debug)]
pub struct SoundEventData {
    pub name: Ident,
    pub fixed_range: Option<f32>,
}

pub type SoundEvent = Holder<SoundEventData>;

impl Encode for SoundEventData {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.name.encode(&mut w)?;
        self.fixed_range.encode(w)
    }
}

impl Decode<'_> for SoundEventData {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            name: Ident::decode(r)?,
            fixed_range: Option::decode(r)?,
        })
    }
}

/// One applied status effect, with the chained hidden effect the vanilla
/// "stacked potion" mechanic produces.
#[derive(Clone, PartialEq, Debug)]
pub struct EffectDetail {
    pub amplifier: VarInt,
    pub duration: VarInt,
    pub ambient: bool,
    pub show_particles: bool,
    pub show_icon: bool,
    pub hidden_effect: Option<Box<EffectDetail>>,
}

impl Encode for EffectDetail {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.amplifier.encode(&mut w)?;
        self.duration.encode(&mut w)?;
        self.ambient.encode(&mut w)?;
        self.show_particles.encode(&mut w)?;
        self.show_icon.encode(&mut w)?;
        self.hidden_effect.encode(w)
    }
}

impl Decode<'_> for EffectDetail {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            amplifier: VarInt::decode(r)?,
            duration: VarInt::decode(r)?,
            ambient: bool::decode(r)?,
            show_particles: bool::decode(r)?,
            show_icon: bool::decode(r)?,
            hidden_effect: Option::decode(r)?,
        })
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct PotionEffect {
    pub id: VarInt,
    pub detail: EffectDetail,
}

impl Encode for PotionEffect {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.id.encode(&mut w)?;
        self.detail.encode(w)
    }
}

impl Decode<'_> for PotionEffect {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            id: VarInt::decode(r)?,
            detail: EffectDetail::decode(r)?,
        })
    }
}

/// A consume effect, tagged by kind.
#[derive(Clone, PartialEq, Debug)]
pub enum ConsumeEffect {
    ApplyEffects {
        effects: Vec<PotionEffect>,
        probability: f32,
    },
    RemoveEffects(IdSet),
    ClearAllEffects,
    TeleportRandomly {
        diameter: f32,
    },
    PlaySound(SoundEvent),
}

impl Encode for ConsumeEffect {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        match self {
            Self::ApplyEffects {
                effects,
                probability,
            } => {
                VarInt(0).encode(&mut w)?;
                effects.encode(&mut w)?;
                probability.encode(w)
            }
            Self::RemoveEffects(effects) => {
                VarInt(1).encode(&mut w)?;
                effects.encode(w)
            }
            Self::ClearAllEffects => VarInt(2).encode(w),
            Self::TeleportRandomly { diameter } => {
                VarInt(3).encode(&mut w)?;
                diameter.encode(w)
            }
            Self::PlaySound(sound) => {
                VarInt(4).encode(&mut w)?;
                sound.encode(w)
            }
        }
    }
}

impl Decode<'_> for ConsumeEffect {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(match VarInt::decode(r)?.0 {
            0 => Self::ApplyEffects {
                effects: Vec::decode(r)?,
                probability: f32::decode(r)?,
            },
            1 => Self::RemoveEffects(IdSet::decode(r)?),
            2 => Self::ClearAllEffects,
            3 => Self::TeleportRandomly {
                diameter: f32::decode(r)?,
            },
            4 => Self::PlaySound(SoundEvent::decode(r)?),
            tag => anyhow::bail!("unknown consume effect tag of {tag}"),
        })
    }
}

/// A block-state property matcher in a block predicate.
#[derive(Clone, PartialEq, Debug)]
pub struct BlockProperty {
    pub name: String,
    pub matches: PropertyMatch,
}

#[derive(Clone, PartialEq, Debug)]
pub enum PropertyMatch {
    Exact(String),
    Range { min: String, max: String },
}

impl Encode for BlockProperty {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.name.encode(&mut w)?;
        match &self.matches {
            PropertyMatch::Exact(value) => {
                true.encode(&mut w)?;
                value.encode(w)
            }
            PropertyMatch::Range { min, max } => {
                false.encode(&mut w)?;
                min.encode(&mut w)?;
                max.encode(w)
            }
        }
    }
}

impl Decode<'_> for BlockProperty {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let name = String::decode(r)?;
        let matches = if bool::decode(r)? {
            PropertyMatch::Exact(String::decode(r)?)
        } else {
            PropertyMatch::Range {
                min: String::decode(r)?,
                max: String::decode(r)?,
            }
        };
        Ok(Self { name, matches })
    }
}

/// A block predicate for `can_place_on` / `can_break`.
#[derive(Clone, PartialEq, Debug)]
pub struct BlockPredicate {
    pub blocks: Option<IdSet>,
    pub properties: Option<Vec<BlockProperty>>,
    pub nbt: Nbt,
    /// Exact component matchers: full components the target must carry.
    pub exact_components: Vec<super::DataComponent>,
    /// Partial matchers, by component id.
    pub partial_components: Vec<VarInt>,
}

impl Encode for BlockPredicate {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.blocks.encode(&mut w)?;
        self.properties.encode(&mut w)?;
        self.nbt.encode(&mut w)?;
        self.exact_components.encode(&mut w)?;
        self.partial_components.encode(w)
    }
}

impl Decode<'_> for BlockPredicate {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            blocks: Option::decode(r)?,
            properties: Option::decode(r)?,
            nbt: Nbt::decode(r)?,
            exact_components: Vec::decode(r)?,
            partial_components: Vec::decode(r)?,
        })
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct FireworkExplosion {
    pub shape: VarInt,
    pub colors: Vec<i32>,
    pub fade_colors: Vec<i32>,
    pub trail: bool,
    pub twinkle: bool,
}

impl Encode for FireworkExplosion {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.shape.encode(&mut w)?;
        self.colors.encode(&mut w)?;
        self.fade_colors.encode(&mut w)?;
        self.trail.encode(&mut w)?;
        self.twinkle.encode(w)
    }
}

impl Decode<'_> for FireworkExplosion {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            shape: VarInt::decode(r)?,
            colors: Vec::decode(r)?,
            fade_colors: Vec::decode(r)?,
            trail: bool::decode(r)?,
            twinkle: bool::decode(r)?,
        })
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Fireworks {
    pub flight_duration: VarInt,
    pub explosions: Vec<FireworkExplosion>,
}

impl Encode for Fireworks {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.flight_duration.encode(&mut w)?;
        self.explosions.encode(w)
    }
}

impl Decode<'_> for Fireworks {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            flight_duration: VarInt::decode(r)?,
            explosions: Vec::decode(r)?,
        })
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct AttributeModifier {
    pub attribute: VarInt,
    pub name: String,
    pub value: f64,
    pub operation: VarInt,
    pub slot: VarInt,
}

impl Encode for AttributeModifier {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.attribute.encode(&mut w)?;
        self.name.encode(&mut w)?;
        self.value.encode(&mut w)?;
        self.operation.encode(&mut w)?;
        self.slot.encode(w)
    }
}

impl Decode<'_> for AttributeModifier {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            attribute: VarInt::decode(r)?,
            name: String::decode(r)?,
            value: f64::decode(r)?,
            operation: VarInt::decode(r)?,
            slot: VarInt::decode(r)?,
        })
    }
}

/// The `attribute_modifiers` payload: the modifier list plus a display
/// override whose NBT body is only present for display kind 2.
#[derive(Clone, PartialEq, Debug)]
pub struct AttributeModifiers {
    pub modifiers: Vec<AttributeModifier>,
    pub display_kind: VarInt,
    pub display_override: Nbt,
}

impl Encode for AttributeModifiers {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.modifiers.encode(&mut w)?;
        self.display_kind.encode(&mut w)?;
        if self.display_kind.0 == 2 {
            self.display_override.encode(&mut w)?;
        }
        Ok(())
    }
}

impl Decode<'_> for AttributeModifiers {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let modifiers = Vec::decode(r)?;
        let display_kind = VarInt::decode(r)?;
        let display_override = if display_kind.0 == 2 {
            Nbt::decode(r)?
        } else {
            Nbt::default()
        };
        Ok(Self {
            modifiers,
            display_kind,
            display_override,
        })
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct GameProfileProperty {
    pub name: String,
    pub value: String,
    pub signature: Option<String>,
}

impl Encode for GameProfileProperty {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.name.encode(&mut w)?;
        self.value.encode(&mut w)?;
        self.signature.encode(w)
    }
}

impl Decode<'_> for GameProfileProperty {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            name: String::decode(r)?,
            value: String::decode(r)?,
            signature: Option::decode(r)?,
        })
    }
}

/// A profile that may be partial (name/uuid optional) or complete.
#[derive(Clone, PartialEq, Debug)]
pub enum ResolvableProfile {
    Partial {
        name: Option<String>,
        uuid: Option<Uuid>,
        properties: Vec<GameProfileProperty>,
    },
    Complete {
        uuid: Uuid,
        name: String,
        properties: Vec<GameProfileProperty>,
    },
}

#[derive(Clone, PartialEq, Debug)]
pub struct Profile {
    pub profile: ResolvableProfile,
    pub skin_patch: SkinPatch,
}

#[derive(Clone, PartialEq, Debug)]
pub struct SkinPatch {
    pub body: Option<String>,
    pub cape: Option<String>,
    pub elytra: Option<String>,
    pub model: Option<VarInt>,
}

impl Encode for SkinPatch {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.body.encode(&mut w)?;
        self.cape.encode(&mut w)?;
        self.elytra.encode(&mut w)?;
        self.model.encode(w)
    }
}

impl Decode<'_> for SkinPatch {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            body: Option::decode(r)?,
            cape: Option::decode(r)?,
            elytra: Option::decode(r)?,
            model: Option::decode(r)?,
        })
    }
}

impl Encode for Profile {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        match &self.profile {
            ResolvableProfile::Partial {
                name,
                uuid,
                properties,
            } => {
                VarInt(0).encode(&mut w)?;
                name.encode(&mut w)?;
                uuid.encode(&mut w)?;
                properties.encode(&mut w)?;
            }
            ResolvableProfile::Complete {
                uuid,
                name,
                properties,
            } => {
                VarInt(1).encode(&mut w)?;
                uuid.encode(&mut w)?;
                name.encode(&mut w)?;
                properties.encode(&mut w)?;
            }
        }
        self.skin_patch.encode(w)
    }
}

impl Decode<'_> for Profile {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let profile = match VarInt::decode(r)?.0 {
            0 => ResolvableProfile::Partial {
                name: Option::decode(r)?,
                uuid: Option::decode(r)?,
                properties: Vec::decode(r)?,
            },
            1 => ResolvableProfile::Complete {
                uuid: Uuid::decode(r)?,
                name: String::decode(r)?,
                properties: Vec::decode(r)?,
            },
            tag => anyhow::bail!("unknown profile tag of {tag}"),
        };
        Ok(Self {
            profile,
            skin_patch: SkinPatch::decode(r)?,
        })
    }
}

macro_rules! record {
    (
        $(#[$attrs:meta])*
        struct $Name:ident {
            $($field:ident: $ty:ty),* $(,)?
        }
    ) => {
        $(#[$attrs])*
        #[derive(Clone, PartialEq, Debug)]
        pub struct $Name {
            $(pub $field: $ty,)*
        }

        impl Encode for $Name {
            fn encode(&self, mut _w: impl Write) -> anyhow::Result<()> {
                $(self.$field.encode(&mut _w)?;)*
                Ok(())
            }
        }

        impl Decode<'_> for $Name {
            fn decode(_r: &mut &[u8]) -> anyhow::Result<Self> {
                Ok(Self {
                    $($field: Decode::decode(_r)?,)*
                })
            }
        }
    };
}

record! {
    /// Inline trim material data for `trim` / `provides_trim_material`.
    struct TrimMaterialData {
        asset_base: String,
        override_armor_assets: Vec<(String, String)>,
        description: Nbt,
    }
}

record! {
    struct TrimPatternData {
        asset_id: String,
        description: Nbt,
        decal: bool,
    }
}

record! {
    struct Trim {
        material: Holder<TrimMaterialData>,
        pattern: Holder<TrimPatternData>,
    }
}

record! {
    struct BannerPatternData {
        asset_id: String,
        translation_key: String,
    }
}

record! {
    struct BannerLayer {
        pattern: Holder<BannerPatternData>,
        color: VarInt,
    }
}

record! {
    struct PaintingVariantData {
        width: i32,
        height: i32,
        asset_id: String,
        title: Option<Nbt>,
        author: Option<Nbt>,
    }
}

record! {
    struct InstrumentData {
        sound: SoundEvent,
        use_duration: f32,
        range: f32,
        description: Nbt,
    }
}

record! {
    struct JukeboxSongData {
        sound: SoundEvent,
        description: Nbt,
        length_seconds: f32,
        comparator_output: VarInt,
    }
}

record! {
    struct ToolRule {
        blocks: IdSet,
        speed: Option<f32>,
        correct_drop_for_blocks: Option<bool>,
    }
}

record! {
    struct Tool {
        rules: Vec<ToolRule>,
        default_mining_speed: f32,
        damage_per_block: VarInt,
        can_destroy_blocks_in_creative: bool,
    }
}

record! {
    struct Weapon {
        item_damage_per_attack: VarInt,
        disable_blocking_for_seconds: f32,
    }
}

record! {
    struct DamageReduction {
        horizontal_blocking_angle: f32,
        kind: Option<IdSet>,
        base: f32,
        factor: f32,
    }
}

record! {
    struct ItemDamageFunction {
        threshold: f32,
        base: f32,
        factor: f32,
    }
}

record! {
    struct BlocksAttacks {
        block_delay_seconds: f32,
        disable_cooldown_scale: f32,
        damage_reductions: Vec<DamageReduction>,
        item_damage: ItemDamageFunction,
        bypassed_by: Option<Ident>,
        block_sound: Option<SoundEvent>,
        disable_sound: Option<SoundEvent>,
    }
}

record! {
    struct Food {
        nutrition: VarInt,
        saturation: f32,
        can_always_eat: bool,
    }
}

record! {
    struct Consumable {
        consume_seconds: f32,
        animation: VarInt,
        sound: SoundEvent,
        makes_particles: bool,
        effects: Vec<ConsumeEffect>,
    }
}

record! {
    struct UseCooldown {
        seconds: f32,
        cooldown_group: Option<String>,
    }
}

record! {
    struct Equippable {
        slot: VarInt,
        equip_sound: SoundEvent,
        model: Option<String>,
        camera_overlay: Option<String>,
        allowed_entities: Option<IdSet>,
        dispensable: bool,
        swappable: bool,
        damage_on_hurt: bool,
        equip_on_interact: bool,
        shearable: bool,
        shearing_sound: SoundEvent,
    }
}

record! {
    struct CustomModelData {
        floats: Vec<f32>,
        flags: Vec<bool>,
        strings: Vec<String>,
        colors: Vec<i32>,
    }
}

record! {
    struct TooltipDisplay {
        hide_tooltip: bool,
        hidden_components: Vec<VarInt>,
    }
}

record! {
    struct PotionContents {
        potion: Option<VarInt>,
        custom_color: Option<i32>,
        custom_effects: Vec<PotionEffect>,
        custom_name: Option<String>,
    }
}

record! {
    struct StewEffect {
        effect: VarInt,
        duration: VarInt,
    }
}

record! {
    struct WritablePage {
        raw: String,
        filtered: Option<String>,
    }
}

record! {
    struct WritableBookContent {
        pages: Vec<WritablePage>,
    }
}

record! {
    /// Content is an anonymous text payload; the filtered variant uses a
    /// `TAG_End` byte when absent.
    struct WrittenPage {
        content: Nbt,
        filtered: Nbt,
    }
}

record! {
    struct WrittenBookContent {
        raw_title: String,
        filtered_title: Option<String>,
        author: String,
        generation: VarInt,
        pages: Vec<WrittenPage>,
        resolved: bool,
    }
}

record! {
    struct EnchantmentEntry {
        enchantment: VarInt,
        level: VarInt,
    }
}

record! {
    struct GlobalPos {
        dimension: Ident,
        position: BlockPos,
    }
}

record! {
    struct LodestoneTracker {
        target: Option<GlobalPos>,
        tracked: bool,
    }
}

record! {
    struct BeeData {
        entity_data: Nbt,
        ticks_in_hive: VarInt,
        min_ticks_in_hive: VarInt,
    }
}

record! {
    struct BlockStateProperties {
        properties: Vec<(String, String)>,
    }
}

record! {
    /// NBT payload bound to a block-entity type id.
    struct TypedEntityData {
        kind: VarInt,
        data: Nbt,
    }
}

record! {
    struct MapDecoration {
        kind: Nbt,
    }
}

record! {
    struct UseEffects {
        can_sprint: bool,
        interact_vibrations: bool,
        speed_multiplier: f32,
    }
}

record! {
    struct AttackRange {
        min_range: f32,
        max_range: f32,
        min_creative_range: f32,
        max_creative_range: f32,
        hitbox_margin: f32,
        mob_factor: f32,
    }
}

record! {
    struct PiercingWeapon {
        deals_knockback: bool,
        dismounts: bool,
        sound: Option<SoundEvent>,
        hit_sound: Option<SoundEvent>,
    }
}

record! {
    struct KineticCondition {
        max_duration_ticks: VarInt,
        min_speed: f32,
        min_relative_speed: f32,
    }
}

record! {
    struct KineticWeapon {
        condition: KineticCondition,
        damage_per_block_speed: f32,
        knockback_factor: f32,
    }
}

record! {
    struct SwingAnimation {
        kind: VarInt,
        duration: VarInt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T>(value: T) -> Vec<u8>
    where
        T: Encode + for<'a> Decode<'a> + PartialEq + std::fmt::Debug,
    {
        let mut buf = vec![];
        value.encode(&mut buf).unwrap();

        let mut slice = buf.as_slice();
        assert_eq!(value, T::decode(&mut slice).unwrap());
        assert!(slice.is_empty());
        buf
    }

    #[test]
    fn holder_tag_zero_means_inline() {
        let inline: SoundEvent = Holder::Inline(SoundEventData {
            name: Ident::new("minecraft:block.note_block.harp").unwrap(),
            fixed_range: Some(16.0),
        });
        let buf = round_trip(inline);
        assert_eq!(buf[0], 0);

        let referenced: SoundEvent = Holder::Ref(41);
        let buf = round_trip(referenced);
        assert_eq!(buf[0], 42);
    }

    #[test]
    fn id_set_forms() {
        let buf = round_trip(IdSet::Tag(Ident::new("minecraft:planks").unwrap()));
        assert_eq!(buf[0], 0);

        let buf = round_trip(IdSet::Ids(vec![5, 6, 7]));
        assert_eq!(buf[0], 4);
    }

    #[test]
    fn either_holder_forms() {
        round_trip(EitherHolder::Id(12));
        round_trip(EitherHolder::Key(Ident::new("minecraft:fall").unwrap()));
    }

    #[test]
    fn nested_hidden_effects() {
        let detail = EffectDetail {
            amplifier: VarInt(1),
            duration: VarInt(100),
            ambient: false,
            show_particles: true,
            show_icon: true,
            hidden_effect: Some(Box::new(EffectDetail {
                amplifier: VarInt(0),
                duration: VarInt(50),
                ambient: true,
                show_particles: false,
                show_icon: false,
                hidden_effect: None,
            })),
        };
        round_trip(detail);
    }

    #[test]
    fn consume_effect_tags() {
        round_trip(ConsumeEffect::ClearAllEffects);
        round_trip(ConsumeEffect::TeleportRandomly { diameter: 8.0 });
        round_trip(ConsumeEffect::RemoveEffects(IdSet::Ids(vec![1])));
    }

    #[test]
    fn attribute_display_override_is_conditional() {
        let plain = AttributeModifiers {
            modifiers: vec![],
            display_kind: VarInt(0),
            display_override: Nbt::default(),
        };
        let buf = round_trip(plain);
        // Array length + display kind only; no NBT byte.
        assert_eq!(buf.len(), 2);
    }
}
