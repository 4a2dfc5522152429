//! Registry-derived constants for the target protocol version.
//!
//! This file is produced from extracted registry reports. Do not edit by
//! hand; regenerate it when retargeting the protocol version.

/// The wire protocol version these tables describe.
pub const PROTOCOL_VERSION: i32 = 774;

/// Total number of block states in the registry.
pub const BLOCK_STATE_COUNT: usize = 26684;

/// Total number of biomes in `minecraft:worldgen/biome`.
pub const BIOME_COUNT: usize = 64;

/// Block states that count as air for section block counting.
pub const AIR: u32 = 0;
pub const VOID_AIR: u32 = 13690;
pub const CAVE_AIR: u32 = 13691;

pub fn is_air(state: u32) -> bool {
    matches!(state, AIR | VOID_AIR | CAVE_AIR)
}

/// Slot counts for the `minecraft:menu` registry, excluding the player
/// inventory (which is not a menu). Generic chests are handled separately
/// since their size follows from the row count.
const MENU_SLOT_COUNTS: [usize; 19] = [
    9,  // 6: generic_3x3
    9,  // 7: crafter_3x3
    3,  // 8: anvil
    1,  // 9: beacon
    3,  // 10: blast_furnace
    5,  // 11: brewing_stand
    10, // 12: crafting
    2,  // 13: enchantment
    3,  // 14: furnace
    3,  // 15: grindstone
    5,  // 16: hopper
    1,  // 17: lectern
    4,  // 18: loom
    3,  // 19: merchant
    27, // 20: shulker_box
    4,  // 21: smithing
    3,  // 22: smoker
    3,  // 23: cartography_table
    2,  // 24: stonecutter
];

/// Number of rows in a generic chest menu, if `kind` is one.
pub fn generic_chest_rows(kind: i32) -> Option<usize> {
    (0..6).contains(&kind).then(|| kind as usize + 1)
}

/// Container slot count for a menu kind, not counting the appended player
/// slots.
pub fn menu_slot_count(kind: i32) -> Option<usize> {
    if let Some(rows) = generic_chest_rows(kind) {
        return Some(rows * 9);
    }
    MENU_SLOT_COUNTS.get(kind as usize - 6).copied()
}
