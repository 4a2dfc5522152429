//! Item stacks as they appear in container slots.

use std::io::Write;

use anyhow::ensure;

use crate::component::{DataComponent, DataComponentKind};
use crate::protocol::var_int::VarInt;
use crate::protocol::{Decode, Encode};

/// An inventory slot: a count, an item id, and a patch of data components
/// added to or removed from the item's defaults.
///
/// An empty slot (count <= 0) is a single `0` byte on the wire.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct ItemStack {
    pub count: i32,
    /// Protocol id in the `minecraft:item` registry.
    pub item: i32,
    pub components: Vec<DataComponent>,
    pub removed_components: Vec<DataComponentKind>,
}

impl ItemStack {
    pub fn new(item: i32, count: i32) -> Self {
        Self {
            count,
            item,
            components: Vec::new(),
            removed_components: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.count <= 0
    }

    pub fn with_component(mut self, component: DataComponent) -> Self {
        self.components.push(component);
        self
    }

    /// The added component of the given kind, if present.
    pub fn component(&self, kind: DataComponentKind) -> Option<&DataComponent> {
        self.components.iter().find(|c| c.kind() == kind)
    }
}

impl Encode for ItemStack {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        if self.is_empty() {
            return VarInt(0).encode(w);
        }

        VarInt(self.count).encode(&mut w)?;
        VarInt(self.item).encode(&mut w)?;
        VarInt(self.components.len() as i32).encode(&mut w)?;
        VarInt(self.removed_components.len() as i32).encode(&mut w)?;

        for component in &self.components {
            component.encode(&mut w)?;
        }

        for &removed in &self.removed_components {
            VarInt(removed.id()).encode(&mut w)?;
        }

        Ok(())
    }
}

impl Decode<'_> for ItemStack {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let count = VarInt::decode(r)?.0;
        if count <= 0 {
            return Ok(Self::empty());
        }

        let item = VarInt::decode(r)?.0;
        let added = VarInt::decode(r)?.0;
        let removed = VarInt::decode(r)?.0;
        ensure!(
            added >= 0 && removed >= 0,
            "negative component patch counts ({added}, {removed})"
        );

        // Component payloads are not length-delimited: an id missing from
        // the catalogue poisons the rest of the stream, so decoding fails
        // rather than skipping.
        let mut components = Vec::with_capacity(added.min(64) as usize);
        for _ in 0..added {
            components.push(DataComponent::decode(r)?);
        }

        let mut removed_components = Vec::with_capacity(removed.min(64) as usize);
        for _ in 0..removed {
            removed_components.push(DataComponentKind::from_id(VarInt::decode(r)?.0)?);
        }

        Ok(Self {
            count,
            item,
            components,
            removed_components,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::types::EnchantmentEntry;
    use crate::component::UnknownComponentError;

    fn round_trip(stack: &ItemStack) -> Vec<u8> {
        let mut buf = vec![];
        stack.encode(&mut buf).unwrap();

        let mut slice = buf.as_slice();
        let decoded = ItemStack::decode(&mut slice).unwrap();
        assert!(slice.is_empty());
        assert_eq!(&decoded, stack);

        // Byte-for-byte reproducibility.
        let mut buf2 = vec![];
        decoded.encode(&mut buf2).unwrap();
        assert_eq!(buf, buf2);
        buf
    }

    #[test]
    fn empty_slot_is_one_zero_byte() {
        assert_eq!(round_trip(&ItemStack::empty()), [0]);
    }

    #[test]
    fn plain_stack() {
        round_trip(&ItemStack::new(42, 17));
    }

    #[test]
    fn stack_with_enchantments() {
        // A stone pickaxe with Sharpness III.
        let stack = ItemStack::new(831, 1).with_component(DataComponent::Enchantments(vec![
            EnchantmentEntry {
                enchantment: VarInt(12),
                level: VarInt(3),
            },
        ]));

        round_trip(&stack);
    }

    #[test]
    fn stack_with_removed_components() {
        let mut stack = ItemStack::new(3, 2);
        stack.removed_components = vec![DataComponentKind::Lore, DataComponentKind::Damage];
        round_trip(&stack);
    }

    #[test]
    fn unknown_component_fails_the_slot() {
        let mut buf = vec![];
        VarInt(1).encode(&mut buf).unwrap(); // count
        VarInt(7).encode(&mut buf).unwrap(); // item
        VarInt(1).encode(&mut buf).unwrap(); // one added component
        VarInt(0).encode(&mut buf).unwrap(); // no removals
        VarInt(9999).encode(&mut buf).unwrap(); // bogus component id

        let mut slice = buf.as_slice();
        let err = ItemStack::decode(&mut slice).unwrap_err();
        assert!(err.downcast_ref::<UnknownComponentError>().is_some());
    }
}
