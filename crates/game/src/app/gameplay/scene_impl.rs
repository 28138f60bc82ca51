use tilewalk_engine::{
    camera_offset, CharacterRoster, DrawTarget, InputSnapshot, MapLibrary, Scene, SceneCommand,
    SceneError, TransitionTarget,
};
use tracing::info;

use super::dialog::DialogMachine;
use super::frames::OverworldFrames;
use super::overlay;
use super::setup::{self, SetupParams, World, WorldSetupError};
use super::transition::TransitionMachine;

/// Builds complete worlds by map name and spawn point.
pub(crate) trait WorldSource {
    fn build_world(&mut self, map: &str, spawn: &str) -> Result<World, WorldSetupError>;
}

/// World source over the decoded content directory.
pub(crate) struct LibraryWorldSource {
    library: MapLibrary,
    frames: OverworldFrames,
    roster: CharacterRoster,
    params: SetupParams,
}

impl LibraryWorldSource {
    pub(crate) fn new(
        library: MapLibrary,
        frames: OverworldFrames,
        roster: CharacterRoster,
        params: SetupParams,
    ) -> Self {
        Self {
            library,
            frames,
            roster,
            params,
        }
    }
}

impl WorldSource for LibraryWorldSource {
    fn build_world(&mut self, map: &str, spawn: &str) -> Result<World, WorldSetupError> {
        let data = self
            .library
            .get(map)
            .ok_or_else(|| WorldSetupError::UnknownMap {
                map: map.to_string(),
            })?;
        setup::build_world(data, spawn, &self.frames, &self.roster, self.params)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SceneParams {
    pub(crate) start_map: String,
    pub(crate) start_spawn: String,
    pub(crate) animation_speed: f32,
    pub(crate) interaction_radius: f32,
    pub(crate) tint_speed: f32,
}

pub(crate) struct OverworldScene<S: WorldSource> {
    source: S,
    params: SceneParams,
    world: Option<World>,
    transition: TransitionMachine,
    dialog: DialogMachine,
    reloads: u32,
}

impl<S: WorldSource> OverworldScene<S> {
    pub(crate) fn new(source: S, params: SceneParams) -> Self {
        let transition = TransitionMachine::new(params.tint_speed);
        Self {
            source,
            params,
            world: None,
            transition,
            dialog: DialogMachine::new(),
            reloads: 0,
        }
    }

    pub(crate) fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub(crate) fn transition(&self) -> &TransitionMachine {
        &self.transition
    }

    pub(crate) fn dialog(&self) -> &DialogMachine {
        &self.dialog
    }

    /// Completed world swaps since the scene loaded.
    pub(crate) fn reloads(&self) -> u32 {
        self.reloads
    }

    /// Builds the destination in full, then swaps it in. The old world is
    /// never touched after this point.
    fn reload(&mut self, target: &TransitionTarget) -> Result<(), WorldSetupError> {
        let fresh = self.source.build_world(&target.map, &target.spawn)?;
        let arrival = fresh
            .player_hitbox()
            .and_then(|hitbox| fresh.collisions.transition_zone_at(&hitbox))
            .map(|zone| zone.area);
        self.dialog.force_close();
        info!(
            map = %target.map,
            spawn = %target.spawn,
            entity_count = fresh.sprites.len(),
            "world_reloaded"
        );
        self.world = Some(fresh);
        self.transition.complete_reload(arrival);
        self.reloads += 1;
        Ok(())
    }
}

impl<S: WorldSource> Scene for OverworldScene<S> {
    fn load(&mut self) -> Result<(), SceneError> {
        let world = self
            .source
            .build_world(&self.params.start_map, &self.params.start_spawn)?;
        info!(
            map = %world.map_name,
            spawn = %self.params.start_spawn,
            entity_count = world.sprites.len(),
            "world_loaded"
        );
        self.world = Some(world);
        Ok(())
    }

    fn update(&mut self, dt: f32, input: &InputSnapshot) -> Result<SceneCommand, SceneError> {
        if input.quit_requested() {
            return Ok(SceneCommand::Quit);
        }
        let Some(world) = self.world.as_mut() else {
            return Ok(SceneCommand::None);
        };

        self.dialog
            .update(input, world, self.params.interaction_radius);
        self.transition.check(input, world);
        world
            .player
            .update(dt, input, &mut world.sprites, &world.collisions);
        world.sprites.update(dt, self.params.animation_speed);

        if let Some(target) = self.transition.tick(dt) {
            self.reload(&target)?;
        }
        Ok(SceneCommand::None)
    }

    fn render(&mut self, target: &mut dyn DrawTarget) {
        let Some(world) = self.world.as_mut() else {
            overlay::draw_tint(target, self.transition.tint());
            return;
        };
        let focus = world.focus();
        world.sprites.draw(focus, target);

        if let Some(session) = self.dialog.session() {
            let speaker = world.sprites.get(session.speaker()).map(|entity| entity.hitbox());
            if let (Some(speaker), Some(line)) = (speaker, session.current_line()) {
                let offset = camera_offset(focus, target.size());
                overlay::draw_dialog_bubble(target, speaker, offset, line);
            }
        }
        if self.transition.is_awaiting_confirmation() {
            overlay::draw_transition_prompt(target);
        }
        overlay::draw_tint(target, self.transition.tint());
    }

    fn unload(&mut self) {
        self.dialog.force_close();
        self.world = None;
    }

    fn debug_title(&self) -> Option<String> {
        self.world
            .as_ref()
            .map(|world| format!("Tilewalk | {}", world.map_name))
    }

    fn entity_count(&self) -> usize {
        self.world.as_ref().map_or(0, |world| world.sprites.len())
    }
}
