//! Container and screen state driven by server packets.
//!
//! The manager owns the player inventory (container id 0, permanent), any
//! server-opened screens, the cursor stack, and the last seen state id,
//! which every outgoing click must echo.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, warn};

use crate::client::Client;
use crate::conn::{Connection, ReceivedPacket};
use crate::error::SessionError;
use crate::generated;
use crate::item::ItemStack;
use crate::packets::play;
use crate::protocol::nbt::Nbt;
use crate::protocol::var_int::VarInt;
use crate::protocol::Packet;

/// Slots in the player inventory screen (crafting, armor, main, hotbar,
/// offhand).
pub const PLAYER_INVENTORY_SLOTS: usize = 46;

/// Slots of the player's main inventory appended to every other screen.
const APPENDED_PLAYER_SLOTS: usize = 36;

/// Locally recoverable screen-state problems. The offending packet is
/// dropped and the error surfaced to the [`ScreenEvents::error`] callback.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum ScreenError {
    #[error("container id {0} is already open")]
    AlreadyOpen(i32),
    #[error("container type {0} is not known")]
    UnknownType(i32),
}

/// User callbacks for screen activity. A callback returning an error
/// terminates the session via `HandlerError`.
#[allow(clippy::type_complexity)]
#[derive(Default)]
pub struct ScreenEvents {
    /// A screen was opened: `(container_id, kind, title)`.
    pub open: Option<Box<dyn FnMut(i32, i32, &Nbt) -> anyhow::Result<()> + Send>>,
    /// A screen was closed by the server.
    pub close: Option<Box<dyn FnMut(i32) -> anyhow::Result<()> + Send>>,
    /// A slot changed: `(container_id, slot_index)`. Cursor updates arrive
    /// as `(-1, -1)`.
    pub set_slot: Option<Box<dyn FnMut(i32, i32) -> anyhow::Result<()> + Send>>,
    /// A recoverable screen error was absorbed.
    pub error: Option<Box<dyn FnMut(&ScreenError) -> anyhow::Result<()> + Send>>,
}

/// One open container and its slots (the container's own section followed by
/// the 36 mirrored player slots).
#[derive(Clone, PartialEq, Debug)]
pub struct Container {
    pub id: i32,
    pub kind: i32,
    pub title: Nbt,
    pub slots: Vec<ItemStack>,
}

impl Container {
    fn player_inventory() -> Self {
        Self {
            id: 0,
            kind: -1,
            title: Nbt::default(),
            slots: vec![ItemStack::empty(); PLAYER_INVENTORY_SLOTS],
        }
    }

    fn for_kind(id: i32, kind: i32, title: Nbt) -> Option<Self> {
        let container_slots = generated::menu_slot_count(kind)?;
        Some(Self {
            id,
            kind,
            title,
            slots: vec![ItemStack::empty(); container_slots + APPENDED_PLAYER_SLOTS],
        })
    }
}

struct ScreenState {
    screens: HashMap<i32, Container>,
    cursor: ItemStack,
    state_id: i32,
    events: ScreenEvents,
}

impl ScreenState {
    fn surface(&mut self, error: ScreenError) -> anyhow::Result<()> {
        warn!(%error, "ignoring screen packet");
        if let Some(on_error) = &mut self.events.error {
            on_error(&error)?;
        }
        Ok(())
    }

    fn fire_set_slot(&mut self, container_id: i32, slot: i32) -> anyhow::Result<()> {
        if let Some(on_set_slot) = &mut self.events.set_slot {
            on_set_slot(container_id, slot)?;
        }
        Ok(())
    }

    fn on_open_screen(&mut self, pkt: &ReceivedPacket) -> anyhow::Result<()> {
        let open: play::OpenScreenS2c = pkt.decode()?;
        let id = open.container_id.0;

        if self.screens.contains_key(&id) {
            return self.surface(ScreenError::AlreadyOpen(id));
        }

        match Container::for_kind(id, open.kind.0, open.title.clone()) {
            Some(container) => {
                self.screens.insert(id, container);
            }
            None => return self.surface(ScreenError::UnknownType(open.kind.0)),
        }

        if let Some(on_open) = &mut self.events.open {
            on_open(id, open.kind.0, &open.title)?;
        }
        Ok(())
    }

    fn on_set_content(&mut self, pkt: &ReceivedPacket) -> anyhow::Result<()> {
        let content: play::ContainerSetContentS2c = pkt.decode()?;
        let id = content.container_id as i32;

        self.state_id = content.state_id.0;
        self.cursor = content.carried;

        let Some(container) = self.screens.get_mut(&id) else {
            // Servers echo stale updates for containers the client never
            // opened (death, dimension change); drop them quietly.
            debug!(container = id, "content for unknown container");
            return Ok(());
        };

        let count = content.slots.len();
        container.slots = content.slots;

        for slot in 0..count {
            self.fire_set_slot(id, slot as i32)?;
        }
        Ok(())
    }

    fn on_set_slot(&mut self, pkt: &ReceivedPacket) -> anyhow::Result<()> {
        let update: play::ContainerSetSlotS2c = pkt.decode()?;
        let id = update.container_id as i32;
        let slot = update.slot as i32;

        self.state_id = update.state_id.0;

        if id == -1 && slot == -1 {
            self.cursor = update.slot_data;
        } else if id == -2 {
            self.put_slot(0, slot, update.slot_data);
        } else {
            self.put_slot(id, slot, update.slot_data);
        }

        self.fire_set_slot(id, slot)
    }

    fn on_set_player_inventory(&mut self, pkt: &ReceivedPacket) -> anyhow::Result<()> {
        let update: play::SetPlayerInventoryS2c = pkt.decode()?;
        self.put_slot(0, update.slot.0, update.slot_data);
        self.fire_set_slot(0, update.slot.0)
    }

    fn on_close_screen(&mut self, pkt: &ReceivedPacket) -> anyhow::Result<()> {
        let close: play::ContainerCloseS2c = pkt.decode()?;
        let id = close.container_id as i32;

        // The player inventory never closes.
        if id != 0 && self.screens.remove(&id).is_some() {
            if let Some(on_close) = &mut self.events.close {
                on_close(id)?;
            }
        }
        Ok(())
    }

    fn put_slot(&mut self, container_id: i32, slot: i32, stack: ItemStack) {
        let Some(container) = self.screens.get_mut(&container_id) else {
            debug!(container = container_id, "slot update for unknown container");
            return;
        };

        match container.slots.get_mut(slot as usize) {
            Some(dest) => *dest = stack,
            None => warn!(
                container = container_id,
                slot, "slot index out of range, dropping update"
            ),
        }
    }
}

/// Screen state shared with the packet handlers registered on a [`Client`].
#[derive(Clone)]
pub struct ScreenManager {
    state: Arc<Mutex<ScreenState>>,
}

impl ScreenManager {
    /// Creates the manager and wires its handlers into the client.
    pub fn new(client: &mut Client, events: ScreenEvents) -> Self {
        let mut screens = HashMap::new();
        screens.insert(0, Container::player_inventory());

        let state = Arc::new(Mutex::new(ScreenState {
            screens,
            cursor: ItemStack::empty(),
            state_id: 0,
            events,
        }));

        let manager = Self { state };

        macro_rules! wire {
            ($id:expr, $method:ident) => {{
                let state = manager.state.clone();
                client.handlers.add($id, 0, move |pkt| {
                    state.lock().expect("screen state poisoned").$method(pkt)
                });
            }};
        }

        wire!(play::OpenScreenS2c::ID, on_open_screen);
        wire!(play::ContainerSetContentS2c::ID, on_set_content);
        wire!(play::ContainerSetSlotS2c::ID, on_set_slot);
        wire!(play::SetPlayerInventoryS2c::ID, on_set_player_inventory);
        wire!(play::ContainerCloseS2c::ID, on_close_screen);

        manager
    }

    fn state(&self) -> MutexGuard<'_, ScreenState> {
        self.state.lock().expect("screen state poisoned")
    }

    /// Read-only view of the stack on the cursor.
    pub fn cursor(&self) -> ItemStack {
        self.state().cursor.clone()
    }

    /// The state id the next click will echo.
    pub fn state_id(&self) -> i32 {
        self.state().state_id
    }

    pub fn container(&self, id: i32) -> Option<Container> {
        self.state().screens.get(&id).cloned()
    }

    pub fn inventory(&self) -> Container {
        self.container(0).expect("player inventory is permanent")
    }

    pub fn open_screens(&self) -> Vec<i32> {
        let mut ids: Vec<_> = self.state().screens.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Sends a container click carrying the most recently received state id.
    #[allow(clippy::too_many_arguments)]
    pub async fn container_click(
        &self,
        conn: &mut Connection,
        container_id: u8,
        slot: i16,
        button: u8,
        mode: i32,
        changed_slots: Vec<(i16, ItemStack)>,
        carried: ItemStack,
    ) -> Result<(), SessionError> {
        let state_id = self.state_id();
        conn.write_packet(&play::ContainerClickC2s {
            container_id,
            state_id: VarInt(state_id),
            slot,
            button,
            mode: VarInt(mode),
            changed_slots: changed_slots
                .into_iter()
                .map(|(slot, slot_data)| play::ChangedSlot { slot, slot_data })
                .collect(),
            carried,
        })
        .await
    }

    /// Tells the server a screen was closed locally, and forgets it.
    pub async fn close_screen(
        &self,
        conn: &mut Connection,
        container_id: u8,
    ) -> Result<(), SessionError> {
        conn.write_packet(&play::ContainerCloseC2s { container_id })
            .await?;

        let id = container_id as i32;
        if id != 0 {
            self.state().screens.remove(&id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::conn::ConnectionConfig;
    use crate::protocol::{Decode, Encode};

    fn body_of<P: Packet + Encode>(pkt: &P) -> ReceivedPacket {
        let mut body = vec![];
        pkt.encode(&mut body).unwrap();
        ReceivedPacket::detached(P::ID, body)
    }

    async fn test_client() -> (Client, tokio::io::DuplexStream) {
        let (local, remote) = tokio::io::duplex(1 << 16);
        let (read_half, write_half) = tokio::io::split(local);
        let conn = Connection::new(read_half, write_half, ConnectionConfig::default());
        (Client::new(conn), remote)
    }

    fn open_chest(client: &mut Client, id: i32, kind: i32) {
        client
            .handlers
            .dispatch_for_test(&body_of(&play::OpenScreenS2c {
                container_id: VarInt(id),
                kind: VarInt(kind),
                title: Nbt::default(),
            }))
            .unwrap();
    }

    #[tokio::test]
    async fn open_and_fill_a_chest() {
        let (mut client, _remote) = test_client().await;
        let manager = ScreenManager::new(&mut client, ScreenEvents::default());

        // Three-row chest: kind 2 has 27 + 36 slots.
        open_chest(&mut client, 5, 2);
        let chest = manager.container(5).unwrap();
        assert_eq!(chest.slots.len(), 27 + 36);

        let mut slots = vec![ItemStack::empty(); 63];
        slots[4] = ItemStack::new(77, 3);
        client
            .handlers
            .dispatch_for_test(&body_of(&play::ContainerSetContentS2c {
                container_id: 5,
                state_id: VarInt(41),
                slots,
                carried: ItemStack::new(1, 1),
            }))
            .unwrap();

        assert_eq!(manager.state_id(), 41);
        assert_eq!(manager.cursor(), ItemStack::new(1, 1));
        assert_eq!(manager.container(5).unwrap().slots[4], ItemStack::new(77, 3));
    }

    #[tokio::test]
    async fn already_open_is_recoverable_and_surfaced() {
        let (mut client, _remote) = test_client().await;

        let errors = Arc::new(AtomicUsize::new(0));
        let seen = errors.clone();
        let events = ScreenEvents {
            error: Some(Box::new(move |error| {
                assert_eq!(*error, ScreenError::AlreadyOpen(3));
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
            ..Default::default()
        };
        let manager = ScreenManager::new(&mut client, events);

        open_chest(&mut client, 3, 0);
        open_chest(&mut client, 3, 5); // duplicate id; dropped, session continues

        assert_eq!(errors.load(Ordering::SeqCst), 1);
        // The original 1-row chest survived.
        assert_eq!(manager.container(3).unwrap().slots.len(), 9 + 36);
    }

    #[tokio::test]
    async fn unknown_container_content_is_ignored() {
        let (mut client, _remote) = test_client().await;
        let manager = ScreenManager::new(&mut client, ScreenEvents::default());

        client
            .handlers
            .dispatch_for_test(&body_of(&play::ContainerSetContentS2c {
                container_id: 9,
                state_id: VarInt(7),
                slots: vec![ItemStack::empty(); 5],
                carried: ItemStack::empty(),
            }))
            .unwrap();

        // State id still advances; no container appears.
        assert_eq!(manager.state_id(), 7);
        assert!(manager.container(9).is_none());
    }

    #[tokio::test]
    async fn set_slot_sentinels() {
        let (mut client, _remote) = test_client().await;
        let manager = ScreenManager::new(&mut client, ScreenEvents::default());

        // Cursor sentinel.
        client
            .handlers
            .dispatch_for_test(&body_of(&play::ContainerSetSlotS2c {
                container_id: -1,
                state_id: VarInt(10),
                slot: -1,
                slot_data: ItemStack::new(2, 64),
            }))
            .unwrap();
        assert_eq!(manager.cursor(), ItemStack::new(2, 64));

        // Inventory sentinel bypasses screen lookup.
        client
            .handlers
            .dispatch_for_test(&body_of(&play::ContainerSetSlotS2c {
                container_id: -2,
                state_id: VarInt(11),
                slot: 36,
                slot_data: ItemStack::new(3, 1),
            }))
            .unwrap();
        assert_eq!(manager.inventory().slots[36], ItemStack::new(3, 1));
        assert_eq!(manager.state_id(), 11);

        // Direct write without a state id.
        client
            .handlers
            .dispatch_for_test(&body_of(&play::SetPlayerInventoryS2c {
                slot: VarInt(37),
                slot_data: ItemStack::new(4, 2),
            }))
            .unwrap();
        assert_eq!(manager.inventory().slots[37], ItemStack::new(4, 2));
        assert_eq!(manager.state_id(), 11);
    }

    #[tokio::test]
    async fn close_screen_emits_callback_once() {
        let (mut client, _remote) = test_client().await;

        let closed = Arc::new(AtomicUsize::new(0));
        let seen = closed.clone();
        let events = ScreenEvents {
            close: Some(Box::new(move |id| {
                assert_eq!(id, 4);
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
            ..Default::default()
        };
        let manager = ScreenManager::new(&mut client, events);

        open_chest(&mut client, 4, 1);

        let close = body_of(&play::ContainerCloseS2c { container_id: 4 });
        client.handlers.dispatch_for_test(&close).unwrap();
        // Closing an absent container is not an error and fires nothing.
        client.handlers.dispatch_for_test(&close).unwrap();

        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(manager.container(4).is_none());
        assert!(manager.container(0).is_some());
    }

    #[tokio::test]
    async fn click_echoes_latest_state_id() {
        let (mut client, mut remote) = test_client().await;
        let manager = ScreenManager::new(&mut client, ScreenEvents::default());

        open_chest(&mut client, 2, 0);
        client
            .handlers
            .dispatch_for_test(&body_of(&play::ContainerSetContentS2c {
                container_id: 2,
                state_id: VarInt(33),
                slots: vec![ItemStack::empty(); 45],
                carried: ItemStack::empty(),
            }))
            .unwrap();
        client
            .handlers
            .dispatch_for_test(&body_of(&play::ContainerSetSlotS2c {
                container_id: 2,
                state_id: VarInt(34),
                slot: 0,
                slot_data: ItemStack::empty(),
            }))
            .unwrap();

        manager
            .container_click(
                &mut client.conn,
                2,
                0,
                0,
                0,
                vec![(0, ItemStack::empty())],
                ItemStack::empty(),
            )
            .await
            .unwrap();

        use tokio::io::AsyncReadExt;
        let mut len = [0u8; 1];
        remote.read_exact(&mut len).await.unwrap();
        let mut frame = vec![0u8; len[0] as usize];
        remote.read_exact(&mut frame).await.unwrap();

        let mut r = frame.as_slice();
        assert_eq!(
            VarInt::decode(&mut r).unwrap().0,
            play::ContainerClickC2s::ID
        );
        let click = play::ContainerClickC2s::decode(&mut r).unwrap();
        // The click echoes the latest state id, from the SetSlot.
        assert_eq!(click.state_id, VarInt(34));
    }
}
