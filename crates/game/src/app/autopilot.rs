use skirmish_sim::{Controller, EntityType, Session, Vec2};

/// Enemies farther than this many tiles are shot at instead of approached.
const BOW_RANGE_TILES: f32 = 5.0;
const SWORD_RANGE_TILES: f32 = 1.5;
/// The trigger is released for part of every cycle so weapon switches land.
const TRIGGER_CYCLE_TICKS: u64 = 40;
const TRIGGER_HELD_TICKS: u64 = 30;
const DODGE_EVERY_TICKS: u64 = 90;

/// Scripted player for headless runs: hunts the nearest living enemy with the
/// bow at range and the sword up close, dodging now and then.
#[derive(Debug, Default)]
pub(crate) struct Autopilot {
    ticks: u64,
}

impl Autopilot {
    pub(crate) fn next_input(&mut self, session: &Session) -> Controller {
        self.ticks = self.ticks.wrapping_add(1);
        let scene = &session.scene;
        let Some(player) = session.levels.player().and_then(|id| scene.entity(id)) else {
            return Controller::idle();
        };
        let pos = player.body.pos;
        let nearest = scene
            .entities()
            .filter(|entity| entity.entity_type() == EntityType::Enemy && entity.body.alive)
            .map(|entity| entity.body.pos)
            .min_by(|a, b| (*a - pos).len().total_cmp(&(*b - pos).len()));
        let Some(target) = nearest else {
            return Controller::idle();
        };

        let tile = scene.tile_size();
        let to_target = target - pos;
        let distance = to_target.len();
        let trigger = self.ticks % TRIGGER_CYCLE_TICKS < TRIGGER_HELD_TICKS;
        let mut ctrl = Controller {
            action_pos: target,
            action1: trigger,
            ..Controller::idle()
        };
        if distance > BOW_RANGE_TILES * tile {
            ctrl.equip2 = true;
            ctrl.direction = to_target.norm();
        } else {
            ctrl.equip1 = true;
            if distance > SWORD_RANGE_TILES * tile {
                ctrl.direction = to_target.norm();
            } else if self.ticks % DODGE_EVERY_TICKS == 0 {
                ctrl.direction = Vec2::new(-to_target.y, to_target.x).norm();
                ctrl.roll = true;
            }
        }
        ctrl
    }
}

#[cfg(test)]
mod tests {
    use skirmish_sim::{SimConfig, WeaponName};

    use super::*;

    fn started() -> Session {
        let mut session = Session::new(SimConfig::seeded(12));
        session.start(false).expect("start");
        session
    }

    #[test]
    fn aims_at_the_nearest_enemy() {
        let session = started();
        let player = session
            .levels
            .player()
            .and_then(|id| session.scene.entity(id))
            .map(|entity| entity.body.pos)
            .expect("player");
        let nearest = session
            .scene
            .entities()
            .filter(|entity| entity.entity_type() == EntityType::Enemy)
            .map(|entity| entity.body.pos)
            .min_by(|a, b| (*a - player).len().total_cmp(&(*b - player).len()))
            .expect("enemy");

        let ctrl = Autopilot::default().next_input(&session);
        assert_eq!(ctrl.action_pos, nearest);
        assert!(ctrl.action1);
        assert!(!ctrl.direction.is_zero());
    }

    #[test]
    fn idles_without_enemies() {
        let mut session = started();
        let enemies: Vec<_> = session
            .scene
            .entities()
            .filter(|entity| entity.entity_type() == EntityType::Enemy)
            .map(|entity| entity.id)
            .collect();
        for id in enemies {
            session.scene.despawn(id);
        }
        assert_eq!(Autopilot::default().next_input(&session), Controller::idle());
    }

    #[test]
    fn switches_to_the_bow_at_range() {
        let mut session = started();
        let mut pilot = Autopilot::default();
        for _ in 0..5 {
            let input = pilot.next_input(&session);
            session.tick(1.0 / 60.0, &input).expect("tick");
        }
        let weapon = session
            .levels
            .player()
            .and_then(|id| session.scene.character(id))
            .map(|player| player.weapon().name());
        assert_eq!(weapon, Some(WeaponName::Bow));
    }
}
