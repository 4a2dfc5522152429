//! Structured data components attached to item stacks.
//!
//! Every component is identified on the wire by its protocol id in the
//! `minecraft:data_component_type` registry. The catalogue below mirrors that
//! registry for the target protocol version ([`crate::generated`]); the id
//! order, names, and payload schemas come from extracted registry reports and
//! must be regenerated when retargeting.
//!
//! Component payloads are not length-delimited, so an id missing from the
//! catalogue is fatal for the enclosing decode: there is no way to skip past
//! the unknown body.

pub mod types;

use std::io::Write;

use thiserror::Error;

use crate::item::ItemStack;
use crate::protocol::nbt::Nbt;
use crate::protocol::var_int::VarInt;
use crate::protocol::{Decode, Encode};

use types::*;

/// A data component id that the catalogue doesn't cover.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
#[error("unknown data component id {0}")]
pub struct UnknownComponentError(pub i32);

/// The `minecraft:data_component_type` registry, in protocol-id order.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum DataComponentKind {
    CustomData,
    MaxStackSize,
    MaxDamage,
    Damage,
    Unbreakable,
    CustomName,
    ItemName,
    ItemModel,
    Lore,
    Rarity,
    Enchantments,
    CanPlaceOn,
    CanBreak,
    AttributeModifiers,
    CustomModelData,
    TooltipDisplay,
    RepairCost,
    CreativeSlotLock,
    EnchantmentGlintOverride,
    IntangibleProjectile,
    Food,
    Consumable,
    UseRemainder,
    UseCooldown,
    DamageResistant,
    Tool,
    Weapon,
    Enchantable,
    Equippable,
    Repairable,
    Glider,
    TooltipStyle,
    DeathProtection,
    BlocksAttacks,
    StoredEnchantments,
    DyedColor,
    MapColor,
    MapId,
    MapDecorations,
    MapPostProcessing,
    ChargedProjectiles,
    BundleContents,
    PotionContents,
    PotionDurationScale,
    SuspiciousStewEffects,
    WritableBookContent,
    WrittenBookContent,
    Trim,
    DebugStickState,
    EntityData,
    BucketEntityData,
    BlockEntityData,
    Instrument,
    ProvidesTrimMaterial,
    OminousBottleAmplifier,
    JukeboxPlayable,
    ProvidesBannerPatterns,
    Recipes,
    LodestoneTracker,
    FireworkExplosion,
    Fireworks,
    Profile,
    NoteBlockSound,
    BannerPatterns,
    BaseColor,
    PotDecorations,
    Container,
    BlockState,
    Bees,
    Lock,
    ContainerLoot,
    BreakSound,
    VillagerVariant,
    WolfVariant,
    WolfSoundVariant,
    WolfCollar,
    FoxVariant,
    SalmonSize,
    ParrotVariant,
    TropicalFishPattern,
    TropicalFishBaseColor,
    TropicalFishPatternColor,
    MooshroomVariant,
    RabbitVariant,
    PigVariant,
    CowVariant,
    ChickenVariant,
    FrogVariant,
    HorseVariant,
    PaintingVariant,
    LlamaVariant,
    AxolotlVariant,
    CatVariant,
    CatCollar,
    SheepColor,
    ShulkerColor,
    UseEffects,
    MinimumAttackCharge,
    AttackRange,
    PiercingWeapon,
    KineticWeapon,
    SwingAnimation,
    DamageType,
    ZombieNautilusVariant,
}

use DataComponentKind as Kind;

/// All kinds in protocol-id order: `BY_ID[id] == kind`.
#[rustfmt::skip]
const BY_ID: [Kind; DataComponentKind::COUNT] = [
    Kind::CustomData, Kind::MaxStackSize, Kind::MaxDamage, Kind::Damage,
    Kind::Unbreakable, Kind::CustomName, Kind::ItemName, Kind::ItemModel,
    Kind::Lore, Kind::Rarity, Kind::Enchantments, Kind::CanPlaceOn,
    Kind::CanBreak, Kind::AttributeModifiers, Kind::CustomModelData,
    Kind::TooltipDisplay, Kind::RepairCost, Kind::CreativeSlotLock,
    Kind::EnchantmentGlintOverride, Kind::IntangibleProjectile, Kind::Food,
    Kind::Consumable, Kind::UseRemainder, Kind::UseCooldown,
    Kind::DamageResistant, Kind::Tool, Kind::Weapon, Kind::Enchantable,
    Kind::Equippable, Kind::Repairable, Kind::Glider, Kind::TooltipStyle,
    Kind::DeathProtection, Kind::BlocksAttacks, Kind::StoredEnchantments,
    Kind::DyedColor, Kind::MapColor, Kind::MapId, Kind::MapDecorations,
    Kind::MapPostProcessing, Kind::ChargedProjectiles, Kind::BundleContents,
    Kind::PotionContents, Kind::PotionDurationScale,
    Kind::SuspiciousStewEffects, Kind::WritableBookContent,
    Kind::WrittenBookContent, Kind::Trim, Kind::DebugStickState,
    Kind::EntityData, Kind::BucketEntityData, Kind::BlockEntityData,
    Kind::Instrument, Kind::ProvidesTrimMaterial, Kind::OminousBottleAmplifier,
    Kind::JukeboxPlayable, Kind::ProvidesBannerPatterns, Kind::Recipes,
    Kind::LodestoneTracker, Kind::FireworkExplosion, Kind::Fireworks,
    Kind::Profile, Kind::NoteBlockSound, Kind::BannerPatterns, Kind::BaseColor,
    Kind::PotDecorations, Kind::Container, Kind::BlockState, Kind::Bees,
    Kind::Lock, Kind::ContainerLoot, Kind::BreakSound, Kind::VillagerVariant,
    Kind::WolfVariant, Kind::WolfSoundVariant, Kind::WolfCollar,
    Kind::FoxVariant, Kind::SalmonSize, Kind::ParrotVariant,
    Kind::TropicalFishPattern, Kind::TropicalFishBaseColor,
    Kind::TropicalFishPatternColor, Kind::MooshroomVariant, Kind::RabbitVariant,
    Kind::PigVariant, Kind::CowVariant, Kind::ChickenVariant, Kind::FrogVariant,
    Kind::HorseVariant, Kind::PaintingVariant, Kind::LlamaVariant,
    Kind::AxolotlVariant, Kind::CatVariant, Kind::CatCollar, Kind::SheepColor,
    Kind::ShulkerColor, Kind::UseEffects, Kind::MinimumAttackCharge,
    Kind::AttackRange, Kind::PiercingWeapon, Kind::KineticWeapon,
    Kind::SwingAnimation, Kind::DamageType, Kind::ZombieNautilusVariant,
];

impl DataComponentKind {
    /// Number of networkable component kinds at the target version.
    pub const COUNT: usize = 104;

    pub fn from_id(id: i32) -> Result<Self, UnknownComponentError> {
        usize::try_from(id)
            .ok()
            .and_then(|i| BY_ID.get(i).copied())
            .ok_or(UnknownComponentError(id))
    }

    pub fn id(self) -> i32 {
        BY_ID.iter().position(|&k| k == self).unwrap() as i32
    }

    /// The registry name, e.g. `minecraft:custom_data`.
    pub fn name(self) -> &'static str {
        match self {
            Kind::CustomData => "minecraft:custom_data",
            Kind::MaxStackSize => "minecraft:max_stack_size",
            Kind::MaxDamage => "minecraft:max_damage",
            Kind::Damage => "minecraft:damage",
            Kind::Unbreakable => "minecraft:unbreakable",
            Kind::CustomName => "minecraft:custom_name",
            Kind::ItemName => "minecraft:item_name",
            Kind::ItemModel => "minecraft:item_model",
            Kind::Lore => "minecraft:lore",
            Kind::Rarity => "minecraft:rarity",
            Kind::Enchantments => "minecraft:enchantments",
            Kind::CanPlaceOn => "minecraft:can_place_on",
            Kind::CanBreak => "minecraft:can_break",
            Kind::AttributeModifiers => "minecraft:attribute_modifiers",
            Kind::CustomModelData => "minecraft:custom_model_data",
            Kind::TooltipDisplay => "minecraft:tooltip_display",
            Kind::RepairCost => "minecraft:repair_cost",
            Kind::CreativeSlotLock => "minecraft:creative_slot_lock",
            Kind::EnchantmentGlintOverride => "minecraft:enchantment_glint_override",
            Kind::IntangibleProjectile => "minecraft:intangible_projectile",
            Kind::Food => "minecraft:food",
            Kind::Consumable => "minecraft:consumable",
            Kind::UseRemainder => "minecraft:use_remainder",
            Kind::UseCooldown => "minecraft:use_cooldown",
            Kind::DamageResistant => "minecraft:damage_resistant",
            Kind::Tool => "minecraft:tool",
            Kind::Weapon => "minecraft:weapon",
            Kind::Enchantable => "minecraft:enchantable",
            Kind::Equippable => "minecraft:equippable",
            Kind::Repairable => "minecraft:repairable",
            Kind::Glider => "minecraft:glider",
            Kind::TooltipStyle => "minecraft:tooltip_style",
            Kind::DeathProtection => "minecraft:death_protection",
            Kind::BlocksAttacks => "minecraft:blocks_attacks",
            Kind::StoredEnchantments => "minecraft:stored_enchantments",
            Kind::DyedColor => "minecraft:dyed_color",
            Kind::MapColor => "minecraft:map_color",
            Kind::MapId => "minecraft:map_id",
            Kind::MapDecorations => "minecraft:map_decorations",
            Kind::MapPostProcessing => "minecraft:map_post_processing",
            Kind::ChargedProjectiles => "minecraft:charged_projectiles",
            Kind::BundleContents => "minecraft:bundle_contents",
            Kind::PotionContents => "minecraft:potion_contents",
            Kind::PotionDurationScale => "minecraft:potion_duration_scale",
            Kind::SuspiciousStewEffects => "minecraft:suspicious_stew_effects",
            Kind::WritableBookContent => "minecraft:writable_book_content",
            Kind::WrittenBookContent => "minecraft:written_book_content",
            Kind::Trim => "minecraft:trim",
            Kind::DebugStickState => "minecraft:debug_stick_state",
            Kind::EntityData => "minecraft:entity_data",
            Kind::BucketEntityData => "minecraft:bucket_entity_data",
            Kind::BlockEntityData => "minecraft:block_entity_data",
            Kind::Instrument => "minecraft:instrument",
            Kind::ProvidesTrimMaterial => "minecraft:provides_trim_material",
            Kind::OminousBottleAmplifier => "minecraft:ominous_bottle_amplifier",
            Kind::JukeboxPlayable => "minecraft:jukebox_playable",
            Kind::ProvidesBannerPatterns => "minecraft:provides_banner_patterns",
            Kind::Recipes => "minecraft:recipes",
            Kind::LodestoneTracker => "minecraft:lodestone_tracker",
            Kind::FireworkExplosion => "minecraft:firework_explosion",
            Kind::Fireworks => "minecraft:fireworks",
            Kind::Profile => "minecraft:profile",
            Kind::NoteBlockSound => "minecraft:note_block_sound",
            Kind::BannerPatterns => "minecraft:banner_patterns",
            Kind::BaseColor => "minecraft:base_color",
            Kind::PotDecorations => "minecraft:pot_decorations",
            Kind::Container => "minecraft:container",
            Kind::BlockState => "minecraft:block_state",
            Kind::Bees => "minecraft:bees",
            Kind::Lock => "minecraft:lock",
            Kind::ContainerLoot => "minecraft:container_loot",
            Kind::BreakSound => "minecraft:break_sound",
            Kind::VillagerVariant => "minecraft:villager/variant",
            Kind::WolfVariant => "minecraft:wolf/variant",
            Kind::WolfSoundVariant => "minecraft:wolf/sound_variant",
            Kind::WolfCollar => "minecraft:wolf/collar",
            Kind::FoxVariant => "minecraft:fox/variant",
            Kind::SalmonSize => "minecraft:salmon/size",
            Kind::ParrotVariant => "minecraft:parrot/variant",
            Kind::TropicalFishPattern => "minecraft:tropical_fish/pattern",
            Kind::TropicalFishBaseColor => "minecraft:tropical_fish/base_color",
            Kind::TropicalFishPatternColor => "minecraft:tropical_fish/pattern_color",
            Kind::MooshroomVariant => "minecraft:mooshroom/variant",
            Kind::RabbitVariant => "minecraft:rabbit/variant",
            Kind::PigVariant => "minecraft:pig/variant",
            Kind::CowVariant => "minecraft:cow/variant",
            Kind::ChickenVariant => "minecraft:chicken/variant",
            Kind::FrogVariant => "minecraft:frog/variant",
            Kind::HorseVariant => "minecraft:horse/variant",
            Kind::PaintingVariant => "minecraft:painting/variant",
            Kind::LlamaVariant => "minecraft:llama/variant",
            Kind::AxolotlVariant => "minecraft:axolotl/variant",
            Kind::CatVariant => "minecraft:cat/variant",
            Kind::CatCollar => "minecraft:cat/collar",
            Kind::SheepColor => "minecraft:sheep/color",
            Kind::ShulkerColor => "minecraft:shulker/color",
            Kind::UseEffects => "minecraft:use_effects",
            Kind::MinimumAttackCharge => "minecraft:minimum_attack_charge",
            Kind::AttackRange => "minecraft:attack_range",
            Kind::PiercingWeapon => "minecraft:piercing_weapon",
            Kind::KineticWeapon => "minecraft:kinetic_weapon",
            Kind::SwingAnimation => "minecraft:swing_animation",
            Kind::DamageType => "minecraft:damage_type",
            Kind::ZombieNautilusVariant => "minecraft:zombie_nautilus/variant",
        }
    }
}

/// A decoded data component value, one variant per catalogue entry.
#[derive(Clone, PartialEq, Debug)]
pub enum DataComponent {
    CustomData(Nbt),
    MaxStackSize(VarInt),
    MaxDamage(VarInt),
    Damage(VarInt),
    Unbreakable,
    CustomName(Nbt),
    ItemName(Nbt),
    ItemModel(String),
    Lore(Vec<Nbt>),
    Rarity(VarInt),
    Enchantments(Vec<EnchantmentEntry>),
    CanPlaceOn(Vec<BlockPredicate>),
    CanBreak(Vec<BlockPredicate>),
    AttributeModifiers(AttributeModifiers),
    CustomModelData(CustomModelData),
    TooltipDisplay(TooltipDisplay),
    RepairCost(VarInt),
    CreativeSlotLock,
    EnchantmentGlintOverride(bool),
    IntangibleProjectile(Nbt),
    Food(Food),
    Consumable(Consumable),
    UseRemainder(Box<ItemStack>),
    UseCooldown(UseCooldown),
    DamageResistant(String),
    Tool(Tool),
    Weapon(Weapon),
    Enchantable(VarInt),
    Equippable(Equippable),
    Repairable(IdSet),
    Glider,
    TooltipStyle(String),
    DeathProtection(Vec<ConsumeEffect>),
    BlocksAttacks(BlocksAttacks),
    StoredEnchantments(Vec<EnchantmentEntry>),
    DyedColor(i32),
    MapColor(i32),
    MapId(VarInt),
    MapDecorations(Nbt),
    MapPostProcessing(VarInt),
    ChargedProjectiles(Vec<ItemStack>),
    BundleContents(Vec<ItemStack>),
    PotionContents(PotionContents),
    PotionDurationScale(f32),
    SuspiciousStewEffects(Vec<StewEffect>),
    WritableBookContent(WritableBookContent),
    WrittenBookContent(WrittenBookContent),
    Trim(Trim),
    DebugStickState(Nbt),
    EntityData(TypedEntityData),
    BucketEntityData(Nbt),
    BlockEntityData(TypedEntityData),
    Instrument(OrTag<InstrumentData>),
    ProvidesTrimMaterial(OrTag<TrimMaterialData>),
    OminousBottleAmplifier(VarInt),
    JukeboxPlayable(OrTag<JukeboxSongData>),
    ProvidesBannerPatterns(String),
    Recipes(Nbt),
    LodestoneTracker(LodestoneTracker),
    FireworkExplosion(FireworkExplosion),
    Fireworks(Fireworks),
    Profile(Profile),
    NoteBlockSound(String),
    BannerPatterns(Vec<BannerLayer>),
    BaseColor(VarInt),
    PotDecorations(Vec<VarInt>),
    Container(Vec<ItemStack>),
    BlockState(BlockStateProperties),
    Bees(Vec<BeeData>),
    Lock(Nbt),
    ContainerLoot(Nbt),
    BreakSound(SoundEvent),
    VillagerVariant(VarInt),
    WolfVariant(VarInt),
    WolfSoundVariant(VarInt),
    WolfCollar(VarInt),
    FoxVariant(VarInt),
    SalmonSize(VarInt),
    ParrotVariant(VarInt),
    TropicalFishPattern(VarInt),
    TropicalFishBaseColor(VarInt),
    TropicalFishPatternColor(VarInt),
    MooshroomVariant(VarInt),
    RabbitVariant(VarInt),
    PigVariant(VarInt),
    CowVariant(VarInt),
    ChickenVariant(Holder<String>),
    FrogVariant(VarInt),
    HorseVariant(VarInt),
    PaintingVariant(Holder<PaintingVariantData>),
    LlamaVariant(VarInt),
    AxolotlVariant(VarInt),
    CatVariant(VarInt),
    CatCollar(VarInt),
    SheepColor(VarInt),
    ShulkerColor(VarInt),
    UseEffects(UseEffects),
    MinimumAttackCharge(f32),
    AttackRange(AttackRange),
    PiercingWeapon(PiercingWeapon),
    KineticWeapon(KineticWeapon),
    SwingAnimation(SwingAnimation),
    DamageType(EitherHolder),
    ZombieNautilusVariant(EitherHolder),
}

impl DataComponent {
    pub fn kind(&self) -> DataComponentKind {
        match self {
            Self::CustomData(_) => Kind::CustomData,
            Self::MaxStackSize(_) => Kind::MaxStackSize,
            Self::MaxDamage(_) => Kind::MaxDamage,
            Self::Damage(_) => Kind::Damage,
            Self::Unbreakable => Kind::Unbreakable,
            Self::CustomName(_) => Kind::CustomName,
            Self::ItemName(_) => Kind::ItemName,
            Self::ItemModel(_) => Kind::ItemModel,
            Self::Lore(_) => Kind::Lore,
            Self::Rarity(_) => Kind::Rarity,
            Self::Enchantments(_) => Kind::Enchantments,
            Self::CanPlaceOn(_) => Kind::CanPlaceOn,
            Self::CanBreak(_) => Kind::CanBreak,
            Self::AttributeModifiers(_) => Kind::AttributeModifiers,
            Self::CustomModelData(_) => Kind::CustomModelData,
            Self::TooltipDisplay(_) => Kind::TooltipDisplay,
            Self::RepairCost(_) => Kind::RepairCost,
            Self::CreativeSlotLock => Kind::CreativeSlotLock,
            Self::EnchantmentGlintOverride(_) => Kind::EnchantmentGlintOverride,
            Self::IntangibleProjectile(_) => Kind::IntangibleProjectile,
            Self::Food(_) => Kind::Food,
            Self::Consumable(_) => Kind::Consumable,
            Self::UseRemainder(_) => Kind::UseRemainder,
            Self::UseCooldown(_) => Kind::UseCooldown,
            Self::DamageResistant(_) => Kind::DamageResistant,
            Self::Tool(_) => Kind::Tool,
            Self::Weapon(_) => Kind::Weapon,
            Self::Enchantable(_) => Kind::Enchantable,
            Self::Equippable(_) => Kind::Equippable,
            Self::Repairable(_) => Kind::Repairable,
            Self::Glider => Kind::Glider,
            Self::TooltipStyle(_) => Kind::TooltipStyle,
            Self::DeathProtection(_) => Kind::DeathProtection,
            Self::BlocksAttacks(_) => Kind::BlocksAttacks,
            Self::StoredEnchantments(_) => Kind::StoredEnchantments,
            Self::DyedColor(_) => Kind::DyedColor,
            Self::MapColor(_) => Kind::MapColor,
            Self::MapId(_) => Kind::MapId,
            Self::MapDecorations(_) => Kind::MapDecorations,
            Self::MapPostProcessing(_) => Kind::MapPostProcessing,
            Self::ChargedProjectiles(_) => Kind::ChargedProjectiles,
            Self::BundleContents(_) => Kind::BundleContents,
            Self::PotionContents(_) => Kind::PotionContents,
            Self::PotionDurationScale(_) => Kind::PotionDurationScale,
            Self::SuspiciousStewEffects(_) => Kind::SuspiciousStewEffects,
            Self::WritableBookContent(_) => Kind::WritableBookContent,
            Self::WrittenBookContent(_) => Kind::WrittenBookContent,
            Self::Trim(_) => Kind::Trim,
            Self::DebugStickState(_) => Kind::DebugStickState,
            Self::EntityData(_) => Kind::EntityData,
            Self::BucketEntityData(_) => Kind::BucketEntityData,
            Self::BlockEntityData(_) => Kind::BlockEntityData,
            Self::Instrument(_) => Kind::Instrument,
            Self::ProvidesTrimMaterial(_) => Kind::ProvidesTrimMaterial,
            Self::OminousBottleAmplifier(_) => Kind::OminousBottleAmplifier,
            Self::JukeboxPlayable(_) => Kind::JukeboxPlayable,
            Self::ProvidesBannerPatterns(_) => Kind::ProvidesBannerPatterns,
            Self::Recipes(_) => Kind::Recipes,
            Self::LodestoneTracker(_) => Kind::LodestoneTracker,
            Self::FireworkExplosion(_) => Kind::FireworkExplosion,
            Self::Fireworks(_) => Kind::Fireworks,
            Self::Profile(_) => Kind::Profile,
            Self::NoteBlockSound(_) => Kind::NoteBlockSound,
            Self::BannerPatterns(_) => Kind::BannerPatterns,
            Self::BaseColor(_) => Kind::BaseColor,
            Self::PotDecorations(_) => Kind::PotDecorations,
            Self::Container(_) => Kind::Container,
            Self::BlockState(_) => Kind::BlockState,
            Self::Bees(_) => Kind::Bees,
            Self::Lock(_) => Kind::Lock,
            Self::ContainerLoot(_) => Kind::ContainerLoot,
            Self::BreakSound(_) => Kind::BreakSound,
            Self::VillagerVariant(_) => Kind::VillagerVariant,
            Self::WolfVariant(_) => Kind::WolfVariant,
            Self::WolfSoundVariant(_) => Kind::WolfSoundVariant,
            Self::WolfCollar(_) => Kind::WolfCollar,
            Self::FoxVariant(_) => Kind::FoxVariant,
            Self::SalmonSize(_) => Kind::SalmonSize,
            Self::ParrotVariant(_) => Kind::ParrotVariant,
            Self::TropicalFishPattern(_) => Kind::TropicalFishPattern,
            Self::TropicalFishBaseColor(_) => Kind::TropicalFishBaseColor,
            Self::TropicalFishPatternColor(_) => Kind::TropicalFishPatternColor,
            Self::MooshroomVariant(_) => Kind::MooshroomVariant,
            Self::RabbitVariant(_) => Kind::RabbitVariant,
            Self::PigVariant(_) => Kind::PigVariant,
            Self::CowVariant(_) => Kind::CowVariant,
            Self::ChickenVariant(_) => Kind::ChickenVariant,
            Self::FrogVariant(_) => Kind::FrogVariant,
            Self::HorseVariant(_) => Kind::HorseVariant,
            Self::PaintingVariant(_) => Kind::PaintingVariant,
            Self::LlamaVariant(_) => Kind::LlamaVariant,
            Self::AxolotlVariant(_) => Kind::AxolotlVariant,
            Self::CatVariant(_) => Kind::CatVariant,
            Self::CatCollar(_) => Kind::CatCollar,
            Self::SheepColor(_) => Kind::SheepColor,
            Self::ShulkerColor(_) => Kind::ShulkerColor,
            Self::UseEffects(_) => Kind::UseEffects,
            Self::MinimumAttackCharge(_) => Kind::MinimumAttackCharge,
            Self::AttackRange(_) => Kind::AttackRange,
            Self::PiercingWeapon(_) => Kind::PiercingWeapon,
            Self::KineticWeapon(_) => Kind::KineticWeapon,
            Self::SwingAnimation(_) => Kind::SwingAnimation,
            Self::DamageType(_) => Kind::DamageType,
            Self::ZombieNautilusVariant(_) => Kind::ZombieNautilusVariant,
        }
    }

    /// Decodes the payload of the component identified by `kind`.
    pub fn decode_body(kind: DataComponentKind, r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(match kind {
            Kind::CustomData => Self::CustomData(Nbt::decode(r)?),
            Kind::MaxStackSize => Self::MaxStackSize(VarInt::decode(r)?),
            Kind::MaxDamage => Self::MaxDamage(VarInt::decode(r)?),
            Kind::Damage => Self::Damage(VarInt::decode(r)?),
            Kind::Unbreakable => Self::Unbreakable,
            Kind::CustomName => Self::CustomName(Nbt::decode(r)?),
            Kind::ItemName => Self::ItemName(Nbt::decode(r)?),
            Kind::ItemModel => Self::ItemModel(String::decode(r)?),
            Kind::Lore => Self::Lore(Vec::decode(r)?),
            Kind::Rarity => Self::Rarity(VarInt::decode(r)?),
            Kind::Enchantments => Self::Enchantments(Vec::decode(r)?),
            Kind::CanPlaceOn => Self::CanPlaceOn(Vec::decode(r)?),
            Kind::CanBreak => Self::CanBreak(Vec::decode(r)?),
            Kind::AttributeModifiers => Self::AttributeModifiers(Decode::decode(r)?),
            Kind::CustomModelData => Self::CustomModelData(Decode::decode(r)?),
            Kind::TooltipDisplay => Self::TooltipDisplay(Decode::decode(r)?),
            Kind::RepairCost => Self::RepairCost(VarInt::decode(r)?),
            Kind::CreativeSlotLock => Self::CreativeSlotLock,
            Kind::EnchantmentGlintOverride => Self::EnchantmentGlintOverride(bool::decode(r)?),
            Kind::IntangibleProjectile => Self::IntangibleProjectile(Nbt::decode(r)?),
            Kind::Food => Self::Food(Decode::decode(r)?),
            Kind::Consumable => Self::Consumable(Decode::decode(r)?),
            Kind::UseRemainder => Self::UseRemainder(Box::new(ItemStack::decode(r)?)),
            Kind::UseCooldown => Self::UseCooldown(Decode::decode(r)?),
            Kind::DamageResistant => Self::DamageResistant(String::decode(r)?),
            Kind::Tool => Self::Tool(Decode::decode(r)?),
            Kind::Weapon => Self::Weapon(Decode::decode(r)?),
            Kind::Enchantable => Self::Enchantable(VarInt::decode(r)?),
            Kind::Equippable => Self::Equippable(Decode::decode(r)?),
            Kind::Repairable => Self::Repairable(IdSet::decode(r)?),
            Kind::Glider => Self::Glider,
            Kind::TooltipStyle => Self::TooltipStyle(String::decode(r)?),
            Kind::DeathProtection => Self::DeathProtection(Vec::decode(r)?),
            Kind::BlocksAttacks => Self::BlocksAttacks(Decode::decode(r)?),
            Kind::StoredEnchantments => Self::StoredEnchantments(Vec::decode(r)?),
            Kind::DyedColor => Self::DyedColor(i32::decode(r)?),
            Kind::MapColor => Self::MapColor(i32::decode(r)?),
            Kind::MapId => Self::MapId(VarInt::decode(r)?),
            Kind::MapDecorations => Self::MapDecorations(Nbt::decode(r)?),
            Kind::MapPostProcessing => Self::MapPostProcessing(VarInt::decode(r)?),
            Kind::ChargedProjectiles => Self::ChargedProjectiles(Vec::decode(r)?),
            Kind::BundleContents => Self::BundleContents(Vec::decode(r)?),
            Kind::PotionContents => Self::PotionContents(Decode::decode(r)?),
            Kind::PotionDurationScale => Self::PotionDurationScale(f32::decode(r)?),
            Kind::SuspiciousStewEffects => Self::SuspiciousStewEffects(Vec::decode(r)?),
            Kind::WritableBookContent => Self::WritableBookContent(Decode::decode(r)?),
            Kind::WrittenBookContent => Self::WrittenBookContent(Decode::decode(r)?),
            Kind::Trim => Self::Trim(Decode::decode(r)?),
            Kind::DebugStickState => Self::DebugStickState(Nbt::decode(r)?),
            Kind::EntityData => Self::EntityData(Decode::decode(r)?),
            Kind::BucketEntityData => Self::BucketEntityData(Nbt::decode(r)?),
            Kind::BlockEntityData => Self::BlockEntityData(Decode::decode(r)?),
            Kind::Instrument => Self::Instrument(Decode::decode(r)?),
            Kind::ProvidesTrimMaterial => Self::ProvidesTrimMaterial(Decode::decode(r)?),
            Kind::OminousBottleAmplifier => Self::OminousBottleAmplifier(VarInt::decode(r)?),
            Kind::JukeboxPlayable => Self::JukeboxPlayable(Decode::decode(r)?),
            Kind::ProvidesBannerPatterns => Self::ProvidesBannerPatterns(String::decode(r)?),
            Kind::Recipes => Self::Recipes(Nbt::decode(r)?),
            Kind::LodestoneTracker => Self::LodestoneTracker(Decode::decode(r)?),
            Kind::FireworkExplosion => Self::FireworkExplosion(Decode::decode(r)?),
            Kind::Fireworks => Self::Fireworks(Decode::decode(r)?),
            Kind::Profile => Self::Profile(Decode::decode(r)?),
            Kind::NoteBlockSound => Self::NoteBlockSound(String::decode(r)?),
            Kind::BannerPatterns => Self::BannerPatterns(Vec::decode(r)?),
            Kind::BaseColor => Self::BaseColor(VarInt::decode(r)?),
            Kind::PotDecorations => Self::PotDecorations(Vec::decode(r)?),
            Kind::Container => Self::Container(Vec::decode(r)?),
            Kind::BlockState => Self::BlockState(Decode::decode(r)?),
            Kind::Bees => Self::Bees(Vec::decode(r)?),
            Kind::Lock => Self::Lock(Nbt::decode(r)?),
            Kind::ContainerLoot => Self::ContainerLoot(Nbt::decode(r)?),
            Kind::BreakSound => Self::BreakSound(Decode::decode(r)?),
            Kind::VillagerVariant => Self::VillagerVariant(VarInt::decode(r)?),
            Kind::WolfVariant => Self::WolfVariant(VarInt::decode(r)?),
            Kind::WolfSoundVariant => Self::WolfSoundVariant(VarInt::decode(r)?),
            Kind::WolfCollar => Self::WolfCollar(VarInt::decode(r)?),
            Kind::FoxVariant => Self::FoxVariant(VarInt::decode(r)?),
            Kind::SalmonSize => Self::SalmonSize(VarInt::decode(r)?),
            Kind::ParrotVariant => Self::ParrotVariant(VarInt::decode(r)?),
            Kind::TropicalFishPattern => Self::TropicalFishPattern(VarInt::decode(r)?),
            Kind::TropicalFishBaseColor => Self::TropicalFishBaseColor(VarInt::decode(r)?),
            Kind::TropicalFishPatternColor => Self::TropicalFishPatternColor(VarInt::decode(r)?),
            Kind::MooshroomVariant => Self::MooshroomVariant(VarInt::decode(r)?),
            Kind::RabbitVariant => Self::RabbitVariant(VarInt::decode(r)?),
            Kind::PigVariant => Self::PigVariant(VarInt::decode(r)?),
            Kind::CowVariant => Self::CowVariant(VarInt::decode(r)?),
            Kind::ChickenVariant => Self::ChickenVariant(Decode::decode(r)?),
            Kind::FrogVariant => Self::FrogVariant(VarInt::decode(r)?),
            Kind::HorseVariant => Self::HorseVariant(VarInt::decode(r)?),
            Kind::PaintingVariant => Self::PaintingVariant(Decode::decode(r)?),
            Kind::LlamaVariant => Self::LlamaVariant(VarInt::decode(r)?),
            Kind::AxolotlVariant => Self::AxolotlVariant(VarInt::decode(r)?),
            Kind::CatVariant => Self::CatVariant(VarInt::decode(r)?),
            Kind::CatCollar => Self::CatCollar(VarInt::decode(r)?),
            Kind::SheepColor => Self::SheepColor(VarInt::decode(r)?),
            Kind::ShulkerColor => Self::ShulkerColor(VarInt::decode(r)?),
            Kind::UseEffects => Self::UseEffects(Decode::decode(r)?),
            Kind::MinimumAttackCharge => Self::MinimumAttackCharge(f32::decode(r)?),
            Kind::AttackRange => Self::AttackRange(Decode::decode(r)?),
            Kind::PiercingWeapon => Self::PiercingWeapon(Decode::decode(r)?),
            Kind::KineticWeapon => Self::KineticWeapon(Decode::decode(r)?),
            Kind::SwingAnimation => Self::SwingAnimation(Decode::decode(r)?),
            Kind::DamageType => Self::DamageType(EitherHolder::decode(r)?),
            Kind::ZombieNautilusVariant => Self::ZombieNautilusVariant(EitherHolder::decode(r)?),
        })
    }

    /// Encodes the payload with no id prefix.
    pub fn encode_body(&self, mut w: impl Write) -> anyhow::Result<()> {
        match self {
            Self::Unbreakable | Self::CreativeSlotLock | Self::Glider => Ok(()),
            Self::CustomData(v) => v.encode(&mut w),
            Self::MaxStackSize(v) => v.encode(&mut w),
            Self::MaxDamage(v) => v.encode(&mut w),
            Self::Damage(v) => v.encode(&mut w),
            Self::CustomName(v) => v.encode(&mut w),
            Self::ItemName(v) => v.encode(&mut w),
            Self::ItemModel(v) => v.encode(&mut w),
            Self::Lore(v) => v.encode(&mut w),
            Self::Rarity(v) => v.encode(&mut w),
            Self::Enchantments(v) => v.encode(&mut w),
            Self::CanPlaceOn(v) => v.encode(&mut w),
            Self::CanBreak(v) => v.encode(&mut w),
            Self::AttributeModifiers(v) => v.encode(&mut w),
            Self::CustomModelData(v) => v.encode(&mut w),
            Self::TooltipDisplay(v) => v.encode(&mut w),
            Self::RepairCost(v) => v.encode(&mut w),
            Self::EnchantmentGlintOverride(v) => v.encode(&mut w),
            Self::IntangibleProjectile(v) => v.encode(&mut w),
            Self::Food(v) => v.encode(&mut w),
            Self::Consumable(v) => v.encode(&mut w),
            Self::UseRemainder(v) => v.encode(&mut w),
            Self::UseCooldown(v) => v.encode(&mut w),
            Self::DamageResistant(v) => v.encode(&mut w),
            Self::Tool(v) => v.encode(&mut w),
            Self::Weapon(v) => v.encode(&mut w),
            Self::Enchantable(v) => v.encode(&mut w),
            Self::Equippable(v) => v.encode(&mut w),
            Self::Repairable(v) => v.encode(&mut w),
            Self::TooltipStyle(v) => v.encode(&mut w),
            Self::DeathProtection(v) => v.encode(&mut w),
            Self::BlocksAttacks(v) => v.encode(&mut w),
            Self::StoredEnchantments(v) => v.encode(&mut w),
            Self::DyedColor(v) => v.encode(&mut w),
            Self::MapColor(v) => v.encode(&mut w),
            Self::MapId(v) => v.encode(&mut w),
            Self::MapDecorations(v) => v.encode(&mut w),
            Self::MapPostProcessing(v) => v.encode(&mut w),
            Self::ChargedProjectiles(v) => v.encode(&mut w),
            Self::BundleContents(v) => v.encode(&mut w),
            Self::PotionContents(v) => v.encode(&mut w),
            Self::PotionDurationScale(v) => v.encode(&mut w),
            Self::SuspiciousStewEffects(v) => v.encode(&mut w),
            Self::WritableBookContent(v) => v.encode(&mut w),
            Self::WrittenBookContent(v) => v.encode(&mut w),
            Self::Trim(v) => v.encode(&mut w),
            Self::DebugStickState(v) => v.encode(&mut w),
            Self::EntityData(v) => v.encode(&mut w),
            Self::BucketEntityData(v) => v.encode(&mut w),
            Self::BlockEntityData(v) => v.encode(&mut w),
            Self::Instrument(v) => v.encode(&mut w),
            Self::ProvidesTrimMaterial(v) => v.encode(&mut w),
            Self::OminousBottleAmplifier(v) => v.encode(&mut w),
            Self::JukeboxPlayable(v) => v.encode(&mut w),
            Self::ProvidesBannerPatterns(v) => v.encode(&mut w),
            Self::Recipes(v) => v.encode(&mut w),
            Self::LodestoneTracker(v) => v.encode(&mut w),
            Self::FireworkExplosion(v) => v.encode(&mut w),
            Self::Fireworks(v) => v.encode(&mut w),
            Self::Profile(v) => v.encode(&mut w),
            Self::NoteBlockSound(v) => v.encode(&mut w),
            Self::BannerPatterns(v) => v.encode(&mut w),
            Self::BaseColor(v) => v.encode(&mut w),
            Self::PotDecorations(v) => v.encode(&mut w),
            Self::Container(v) => v.encode(&mut w),
            Self::BlockState(v) => v.encode(&mut w),
            Self::Bees(v) => v.encode(&mut w),
            Self::Lock(v) => v.encode(&mut w),
            Self::ContainerLoot(v) => v.encode(&mut w),
            Self::BreakSound(v) => v.encode(&mut w),
            Self::VillagerVariant(v) => v.encode(&mut w),
            Self::WolfVariant(v) => v.encode(&mut w),
            Self::WolfSoundVariant(v) => v.encode(&mut w),
            Self::WolfCollar(v) => v.encode(&mut w),
            Self::FoxVariant(v) => v.encode(&mut w),
            Self::SalmonSize(v) => v.encode(&mut w),
            Self::ParrotVariant(v) => v.encode(&mut w),
            Self::TropicalFishPattern(v) => v.encode(&mut w),
            Self::TropicalFishBaseColor(v) => v.encode(&mut w),
            Self::TropicalFishPatternColor(v) => v.encode(&mut w),
            Self::MooshroomVariant(v) => v.encode(&mut w),
            Self::RabbitVariant(v) => v.encode(&mut w),
            Self::PigVariant(v) => v.encode(&mut w),
            Self::CowVariant(v) => v.encode(&mut w),
            Self::ChickenVariant(v) => v.encode(&mut w),
            Self::FrogVariant(v) => v.encode(&mut w),
            Self::HorseVariant(v) => v.encode(&mut w),
            Self::PaintingVariant(v) => v.encode(&mut w),
            Self::LlamaVariant(v) => v.encode(&mut w),
            Self::AxolotlVariant(v) => v.encode(&mut w),
            Self::CatVariant(v) => v.encode(&mut w),
            Self::CatCollar(v) => v.encode(&mut w),
            Self::SheepColor(v) => v.encode(&mut w),
            Self::ShulkerColor(v) => v.encode(&mut w),
            Self::UseEffects(v) => v.encode(&mut w),
            Self::MinimumAttackCharge(v) => v.encode(&mut w),
            Self::AttackRange(v) => v.encode(&mut w),
            Self::PiercingWeapon(v) => v.encode(&mut w),
            Self::KineticWeapon(v) => v.encode(&mut w),
            Self::SwingAnimation(v) => v.encode(&mut w),
            Self::DamageType(v) => v.encode(&mut w),
            Self::ZombieNautilusVariant(v) => v.encode(&mut w),
        }
    }
}

/// Full component framing: VarInt id followed by the payload.
impl Encode for DataComponent {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarInt(self.kind().id()).encode(&mut w)?;
        self.encode_body(w)
    }
}

impl Decode<'_> for DataComponent {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let id = VarInt::decode(r)?.0;
        let kind = DataComponentKind::from_id(id)?;
        Self::decode_body(kind, r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(component: DataComponent) -> Vec<u8> {
        let mut buf = vec![];
        component.encode(&mut buf).unwrap();

        let mut slice = buf.as_slice();
        let decoded = DataComponent::decode(&mut slice).unwrap();
        assert!(slice.is_empty(), "{component:?} left bytes behind");
        assert_eq!(decoded, component);
        buf
    }

    #[test]
    fn id_table_is_dense_and_stable() {
        for id in 0..DataComponentKind::COUNT as i32 {
            let kind = DataComponentKind::from_id(id).unwrap();
            assert_eq!(kind.id(), id);
            assert!(kind.name().starts_with("minecraft:"));
        }

        assert_eq!(
            DataComponentKind::from_id(-1),
            Err(UnknownComponentError(-1))
        );
        assert_eq!(
            DataComponentKind::from_id(DataComponentKind::COUNT as i32),
            Err(UnknownComponentError(DataComponentKind::COUNT as i32))
        );
    }

    #[test]
    fn anchor_ids() {
        assert_eq!(Kind::CustomData.id(), 0);
        assert_eq!(Kind::ProvidesTrimMaterial.id(), 53);
        assert_eq!(Kind::Profile.id(), 61);
        assert_eq!(Kind::ChickenVariant.id(), 86);
        assert_eq!(Kind::PaintingVariant.id(), 89);
    }

    #[test]
    fn trivial_components_have_empty_bodies() {
        let buf = round_trip(DataComponent::Glider);
        assert_eq!(buf, [Kind::Glider.id() as u8]);
    }

    #[test]
    fn scalar_components() {
        round_trip(DataComponent::MaxStackSize(VarInt(64)));
        round_trip(DataComponent::DyedColor(0x00FF_00FF));
        round_trip(DataComponent::DamageResistant("minecraft:fire".into()));
        round_trip(DataComponent::MinimumAttackCharge(0.9));
    }

    #[test]
    fn enchantments_round_trip() {
        round_trip(DataComponent::Enchantments(vec![
            EnchantmentEntry {
                enchantment: VarInt(12),
                level: VarInt(3),
            },
            EnchantmentEntry {
                enchantment: VarInt(1),
                level: VarInt(1),
            },
        ]));
    }

    #[test]
    fn holder_components() {
        round_trip(DataComponent::PaintingVariant(Holder::Ref(3)));
        round_trip(DataComponent::ChickenVariant(Holder::Inline("cold".into())));
        round_trip(DataComponent::DamageType(EitherHolder::Key(
            crate::protocol::ident::Ident::new("minecraft:fall").unwrap(),
        )));
        round_trip(DataComponent::Instrument(OrTag::Tag(
            crate::protocol::ident::Ident::new("minecraft:goat_horns").unwrap(),
        )));
    }

    #[test]
    fn nested_slot_components() {
        let inner = ItemStack::new(5, 2);
        round_trip(DataComponent::BundleContents(vec![
            inner.clone(),
            ItemStack::empty(),
        ]));
        round_trip(DataComponent::UseRemainder(Box::new(inner)));
    }

    #[test]
    fn unknown_id_is_fatal() {
        let mut buf = vec![];
        VarInt(999).encode(&mut buf).unwrap();

        let mut slice = buf.as_slice();
        let err = DataComponent::decode(&mut slice).unwrap_err();
        assert_eq!(
            err.downcast_ref::<UnknownComponentError>(),
            Some(&UnknownComponentError(999))
        );
    }
}
