use crate::math::Vec2;

/// Intents a character acts on during one tick. Hosts fill it from input
/// devices for the player; enemies rebuild one every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Controller {
    pub equip1: bool,
    pub equip2: bool,
    pub equip3: bool,
    pub roll: bool,
    pub action1: bool,
    pub action2: bool,
    /// Unit vector or zero.
    pub direction: Vec2,
    /// World position the character aims at.
    pub action_pos: Vec2,
}

impl Controller {
    pub fn idle() -> Self {
        Self::default()
    }

    /// Selected hotbar slot, if any equip intent is set. The first slot wins.
    pub fn equip_slot(&self) -> Option<usize> {
        if self.equip1 {
            Some(0)
        } else if self.equip2 {
            Some(1)
        } else if self.equip3 {
            Some(2)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equip_slot_prefers_lowest_index() {
        let ctrl = Controller {
            equip2: true,
            equip3: true,
            ..Controller::idle()
        };
        assert_eq!(ctrl.equip_slot(), Some(1));
        assert_eq!(Controller::idle().equip_slot(), None);
    }
}
