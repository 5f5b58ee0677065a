use crate::audio::AudioSink;
use crate::character::CharacterSnapshot;
use crate::config::SimConfig;
use crate::controller::Controller;
use crate::level::LevelManager;
use crate::render::RenderSurface;
use crate::scene::Scene;
use crate::SimError;

/// One game: the scene plus the level progression driving it.
#[derive(Debug)]
pub struct Session {
    pub scene: Scene,
    pub levels: LevelManager,
}

impl Session {
    pub fn new(config: SimConfig) -> Self {
        Self::from_scene(Scene::new(config))
    }

    pub fn with_audio(config: SimConfig, audio: Box<dyn AudioSink>) -> Self {
        Self::from_scene(Scene::with_audio(config, audio))
    }

    fn from_scene(scene: Scene) -> Self {
        Self {
            scene,
            levels: LevelManager::new(),
        }
    }

    pub fn start(&mut self, game_plus: bool) -> Result<(), SimError> {
        self.levels.restart(&mut self.scene, game_plus)
    }

    /// Advances the game by `dt` seconds. Entities settle first so the level
    /// logic sees this tick's final counts.
    pub fn tick(&mut self, dt: f32, player_input: &Controller) -> Result<(), SimError> {
        if self.scene.is_paused() {
            return Ok(());
        }
        self.scene.update(dt, player_input)?;
        self.levels.update(&mut self.scene, dt);
        self.scene.finish_tick();
        Ok(())
    }

    pub fn render(&self, surface: &mut dyn RenderSurface) {
        self.scene.render(surface);
        self.levels.render(&self.scene, surface);
    }

    pub fn player_snapshot(&self) -> Option<CharacterSnapshot> {
        let id = self.levels.player()?;
        let entity = self.scene.entity(id)?;
        let character = entity.as_character()?;
        Some(character.snapshot(&entity.body))
    }
}
