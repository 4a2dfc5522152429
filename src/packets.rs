//! Typed packets and packet-id tables.
//!
//! The numeric ids below are generated from packet reports for the target
//! protocol version ([`crate::generated::PROTOCOL_VERSION`]). Only packets
//! the engine itself consumes or produces get typed definitions; everything
//! else flows through the generic handler tables by raw id.

use std::io::Write;

use crate::protocol::{Decode, Encode, Packet};

macro_rules! unit_packet {
    ($(#[$attrs:meta])* $Name:ident) => {
        $(#[$attrs])*
        #[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
        pub struct $Name;

        impl Encode for $Name {
            fn encode(&self, _w: impl Write) -> anyhow::Result<()> {
                Ok(())
            }
        }

        impl Decode<'_> for $Name {
            fn decode(_r: &mut &[u8]) -> anyhow::Result<Self> {
                Ok(Self)
            }
        }
    };
}

macro_rules! field_packet {
    (
        $(#[$attrs:meta])*
        $Name:ident {
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

macro_rules! packet_ids {
    ($($id:literal = $packet:ty;)*) => {
        $(
            impl Packet for $packet {
                const ID: i32 = $id;
            }
        )*
    };
}

/// Packets exchanged during the play phase.
pub mod play {
    use super::*;
    use crate::chunk::ChunkPos;
    use crate::item::ItemStack;
    use crate::protocol::nbt::Nbt;
    use crate::protocol::var_int::VarInt;

    // ==== Clientbound ==== //

    unit_packet! {
        /// Brackets a group of packets to be applied atomically.
        BundleDelimiterS2c
    }

    field_packet! {
        ContainerCloseS2c {
            container_id: u8,
        }
    }

    field_packet! {
        /// Replaces the whole content of a container.
        ContainerSetContentS2c {
            container_id: u8,
            state_id: VarInt,
            slots: Vec<ItemStack>,
            carried: ItemStack,
        }
    }

    field_packet! {
        /// Updates a single slot. `container_id == -1 && slot == -1`
        /// addresses the cursor; `container_id == -2` the player inventory.
        ContainerSetSlotS2c {
            container_id: i8,
            state_id: VarInt,
            slot: i16,
            slot_data: ItemStack,
        }
    }

    field_packet! {
        ForgetLevelChunkS2c {
            pos: ChunkPos,
        }
    }

    field_packet! {
        OpenScreenS2c {
            container_id: VarInt,
            kind: VarInt,
            title: Nbt,
        }
    }

    field_packet! {
        /// Direct inventory write without a state id (1.21.2+).
        SetPlayerInventoryS2c {
            slot: VarInt,
            slot_data: ItemStack,
        }
    }

    unit_packet! {
        /// The server wants to re-enter the configuration phase.
        StartConfigurationS2c
    }

    /// Chunk payloads decode against dimension context, so
    /// `LevelChunkWithLight` has no context-free typed struct; the world
    /// layer consumes it by id.
    pub const LEVEL_CHUNK_WITH_LIGHT: i32 = 0x27;

    packet_ids! {
        0x00 = BundleDelimiterS2c;
        0x11 = ContainerCloseS2c;
        0x12 = ContainerSetContentS2c;
        0x14 = ContainerSetSlotS2c;
        0x21 = ForgetLevelChunkS2c;
        0x34 = OpenScreenS2c;
        0x66 = SetPlayerInventoryS2c;
        0x70 = StartConfigurationS2c;
    }

    // ==== Serverbound ==== //

    unit_packet! {
        /// Acknowledges [`StartConfigurationS2c`]; the connection is in the
        /// configuration phase once this is sent.
        ConfigurationAcknowledgedC2s
    }

    field_packet! {
        ChangedSlot {
            slot: i16,
            slot_data: ItemStack,
        }
    }

    field_packet! {
        /// A container interaction. `state_id` must echo the last state id
        /// received for the container, or the server resyncs.
        ContainerClickC2s {
            container_id: u8,
            state_id: VarInt,
            slot: i16,
            button: u8,
            mode: VarInt,
            changed_slots: Vec<ChangedSlot>,
            carried: ItemStack,
        }
    }

    field_packet! {
        ContainerCloseC2s {
            container_id: u8,
        }
    }

    packet_ids! {
        0x0E = ConfigurationAcknowledgedC2s;
        0x11 = ContainerClickC2s;
        0x12 = ContainerCloseC2s;
    }
}

/// Packets exchanged during the configuration phase.
pub mod config {
    use super::*;
    use crate::protocol::ident::Ident;
    use crate::protocol::nbt::Nbt;
    use crate::registry::{RegistryEntry, RegistryTags};

    // ==== Clientbound ==== //

    field_packet! {
        CookieRequestS2c {
            key: Ident,
        }
    }

    field_packet! {
        DisconnectS2c {
            reason: Nbt,
        }
    }

    unit_packet! {
        FinishConfigurationS2c
    }

    field_packet! {
        KeepAliveS2c {
            id: i64,
        }
    }

    field_packet! {
        PingS2c {
            id: i32,
        }
    }

    unit_packet! {
        ResetChatS2c
    }

    field_packet! {
        /// One registry's worth of entries; the server sends one of these
        /// per dynamic registry.
        RegistryDataS2c {
            registry: Ident,
            entries: Vec<RegistryEntry>,
        }
    }

    field_packet! {
        UpdateEnabledFeaturesS2c {
            features: Vec<Ident>,
        }
    }

    field_packet! {
        UpdateTagsS2c {
            registries: Vec<RegistryTags>,
        }
    }

    field_packet! {
        KnownPack {
            namespace: String,
            id: String,
            version: String,
        }
    }

    field_packet! {
        SelectKnownPacksS2c {
            packs: Vec<KnownPack>,
        }
    }

    pub const CUSTOM_PAYLOAD: i32 = 0x01;
    pub const RESOURCE_PACK_POP: i32 = 0x08;
    pub const RESOURCE_PACK_PUSH: i32 = 0x09;
    pub const STORE_COOKIE: i32 = 0x0A;
    pub const TRANSFER: i32 = 0x0B;

    packet_ids! {
        0x00 = CookieRequestS2c;
        0x02 = DisconnectS2c;
        0x03 = FinishConfigurationS2c;
        0x04 = KeepAliveS2c;
        0x05 = PingS2c;
        0x06 = ResetChatS2c;
        0x07 = RegistryDataS2c;
        0x0C = UpdateEnabledFeaturesS2c;
        0x0D = UpdateTagsS2c;
        0x0E = SelectKnownPacksS2c;
    }

    // ==== Serverbound ==== //

    field_packet! {
        CookieResponseC2s {
            key: Ident,
            payload: Option<Vec<u8>>,
        }
    }

    unit_packet! {
        FinishConfigurationC2s
    }

    field_packet! {
        KeepAliveC2s {
            id: i64,
        }
    }

    field_packet! {
        PongC2s {
            id: i32,
        }
    }

    field_packet! {
        SelectKnownPacksC2s {
            packs: Vec<KnownPack>,
        }
    }

    packet_ids! {
        0x01 = CookieResponseC2s;
        0x03 = FinishConfigurationC2s;
        0x04 = KeepAliveC2s;
        0x05 = PongC2s;
        0x07 = SelectKnownPacksC2s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemStack;
    use crate::protocol::var_int::VarInt;

    #[test]
    fn click_packet_round_trip() {
        let pkt = play::ContainerClickC2s {
            container_id: 2,
            state_id: VarInt(33),
            slot: 10,
            button: 0,
            mode: VarInt(0),
            changed_slots: vec![play::ChangedSlot {
                slot: 10,
                slot_data: ItemStack::empty(),
            }],
            carried: ItemStack::new(5, 1),
        };

        let mut buf = vec![];
        pkt.encode_with_id(&mut buf).unwrap();

        let mut slice = buf.as_slice();
        let id = VarInt::decode(&mut slice).unwrap().0;
        assert_eq!(id, play::ContainerClickC2s::ID);

        let decoded = play::ContainerClickC2s::decode(&mut slice).unwrap();
        assert!(slice.is_empty());
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn unit_packets_have_no_body() {
        let mut buf = vec![];
        play::BundleDelimiterS2c.encode_with_id(&mut buf).unwrap();
        assert_eq!(buf, [play::BundleDelimiterS2c::ID as u8]);
    }
}
