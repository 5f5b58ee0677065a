use std::fmt;

use crate::entity::EntityId;
use crate::math::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterDamage {
    pub entity: EntityId,
    pub amount: f32,
    pub pos: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameStarted {
    pub game_plus: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneEvent {
    CharacterDamaged(CharacterDamage),
    GameStarted(GameStarted),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEventKind {
    CharacterDamaged,
    GameStarted,
}

impl SceneEvent {
    pub fn kind(&self) -> SceneEventKind {
        match self {
            Self::CharacterDamaged(_) => SceneEventKind::CharacterDamaged,
            Self::GameStarted(_) => SceneEventKind::GameStarted,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneEventCounts {
    pub total: u32,
    pub character_damaged: u32,
    pub game_started: u32,
}

impl SceneEventCounts {
    fn record(&mut self, kind: SceneEventKind) {
        self.total = self.total.saturating_add(1);
        match kind {
            SceneEventKind::CharacterDamaged => {
                self.character_damaged = self.character_damaged.saturating_add(1)
            }
            SceneEventKind::GameStarted => self.game_started = self.game_started.saturating_add(1),
        }
    }
}

pub type EventListener = Box<dyn FnMut(&SceneEvent)>;

/// Synchronous dispatch to listeners registered per kind. Listeners run in
/// registration order before `dispatch` returns.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(SceneEventKind, EventListener)>,
    current_tick: SceneEventCounts,
    last_tick_counts: SceneEventCounts,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("current_tick", &self.current_tick)
            .field("last_tick_counts", &self.last_tick_counts)
            .finish()
    }
}

impl EventBus {
    pub fn add_listener(&mut self, kind: SceneEventKind, listener: EventListener) {
        self.listeners.push((kind, listener));
    }

    pub fn dispatch(&mut self, event: SceneEvent) {
        let kind = event.kind();
        self.current_tick.record(kind);
        for (listener_kind, listener) in &mut self.listeners {
            if *listener_kind == kind {
                listener(&event);
            }
        }
    }

    pub(crate) fn finish_tick_rollover(&mut self) {
        self.last_tick_counts = std::mem::take(&mut self.current_tick);
    }

    pub fn last_tick_counts(&self) -> SceneEventCounts {
        self.last_tick_counts
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn listeners_only_receive_their_kind() {
        let mut bus = EventBus::default();
        let damaged = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&damaged);
        bus.add_listener(
            SceneEventKind::CharacterDamaged,
            Box::new(move |event| sink.borrow_mut().push(*event)),
        );

        let hit = SceneEvent::CharacterDamaged(CharacterDamage {
            entity: EntityId(3),
            amount: 2.0,
            pos: Vec2::new(1.0, 1.0),
        });
        bus.dispatch(SceneEvent::GameStarted(GameStarted { game_plus: false }));
        bus.dispatch(hit);

        assert_eq!(damaged.borrow().as_slice(), &[hit]);
    }

    #[test]
    fn rollover_moves_counts_to_last_tick() {
        let mut bus = EventBus::default();
        bus.dispatch(SceneEvent::GameStarted(GameStarted { game_plus: true }));
        assert_eq!(bus.last_tick_counts().total, 0);

        bus.finish_tick_rollover();
        let counts = bus.last_tick_counts();
        assert_eq!(counts.total, 1);
        assert_eq!(counts.game_started, 1);

        bus.finish_tick_rollover();
        assert_eq!(bus.last_tick_counts(), SceneEventCounts::default());
    }
}
