use crate::entity::{Body, EntityId};
use crate::math::lerp;
use crate::render::{Color, RenderSurface, TextShape};
use crate::scene::Scene;
use crate::tuning::INDICATOR_SECONDS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorStyle {
    Damage,
    Dodged,
    Deflected,
    Upgrade,
}

impl IndicatorStyle {
    fn colors(self) -> (Option<Color>, Option<Color>) {
        match self {
            IndicatorStyle::Damage => (Some(Color::RED), Some(Color::BLACK)),
            IndicatorStyle::Dodged => (Some(Color::WHITE), None),
            IndicatorStyle::Deflected => (Some(Color::WHITE), Some(Color::BLACK)),
            IndicatorStyle::Upgrade => (Some(Color::LIGHT_GREEN), Some(Color::LIGHT_GREEN)),
        }
    }
}

/// Floating text that drifts upward and fades out.
#[derive(Debug, Clone, PartialEq)]
pub struct TextIndicator {
    pub text: String,
    pub style: IndicatorStyle,
    pub max_age: f32,
}

impl TextIndicator {
    pub fn new(text: impl Into<String>, style: IndicatorStyle) -> Self {
        Self {
            text: text.into(),
            style,
            max_age: INDICATOR_SECONDS,
        }
    }

    pub fn damage(amount: f32) -> Self {
        Self::new(amount.to_string(), IndicatorStyle::Damage)
    }

    pub fn dodged() -> Self {
        Self::new("dodged", IndicatorStyle::Dodged)
    }

    pub fn deflected() -> Self {
        Self::new("Deflected", IndicatorStyle::Deflected)
    }

    pub fn upgrade(text: impl Into<String>) -> Self {
        Self::new(text, IndicatorStyle::Upgrade)
    }
}

pub(crate) fn update(
    id: EntityId,
    body: &mut Body,
    indicator: &TextIndicator,
    scene: &mut Scene,
    dt: f32,
) {
    body.age += dt;
    body.integrate(dt);
    body.opacity = lerp(0.0, 1.0, 1.0 - body.age / indicator.max_age).max(0.0);
    if body.age >= indicator.max_age {
        body.alive = false;
        scene.despawn(id);
    }
}

pub(crate) fn render(body: &Body, indicator: &TextIndicator, surface: &mut dyn RenderSurface) {
    let (fill, stroke) = indicator.style.colors();
    surface.text(&TextShape {
        text: &indicator.text,
        pos: body.pos,
        size: 20.0,
        fill,
        stroke,
        opacity: body.opacity,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::controller::Controller;
    use crate::entity::EntityType;
    use crate::math::Vec2;

    #[test]
    fn indicator_drifts_up_and_expires() {
        let mut scene = Scene::new(SimConfig::seeded(3));
        let id = scene.spawn_indicator(Vec2::new(100.0, 100.0), TextIndicator::dodged());
        assert_eq!(scene.count(EntityType::Entity), 1);

        scene.update(0.5, &Controller::idle()).expect("tick");
        let body = scene.entity(id).map(|entity| entity.body.clone()).expect("indicator");
        assert_eq!(body.pos, Vec2::new(100.0, 90.0));
        assert!((body.opacity - 0.5).abs() < 1e-6);

        scene.update(0.5, &Controller::idle()).expect("tick");
        assert!(scene.entity(id).is_none());
        assert_eq!(scene.count(EntityType::Entity), 0);
    }
}
