use std::error::Error;

use tracing::info;

use super::input::{ActionStates, InputAction};
use super::rendering::DrawTarget;

/// Failure raised by a scene. Boxed so each game can bring its own error
/// enums through the engine loop.
pub type SceneError = Box<dyn Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// Input state for one simulation tick: held actions plus the press edges
/// that happened since the previous tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    /// True only on the tick the action went from released to held.
    pub fn was_pressed(&self, action: InputAction) -> bool {
        self.actions.was_pressed(action)
    }

    pub fn any_directional_down(&self) -> bool {
        InputAction::ALL
            .iter()
            .any(|action| action.is_directional() && self.is_down(*action))
    }

    /// True when any movement key was freshly pressed this tick. Holding a
    /// key across ticks does not count.
    pub fn any_directional_pressed(&self) -> bool {
        InputAction::ALL
            .iter()
            .any(|action| action.is_directional() && self.was_pressed(*action))
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self.actions.set_pressed(action, false);
        self
    }

    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.actions.set(action, true);
        self.actions.set_pressed(action, true);
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

pub trait Scene {
    fn load(&mut self) -> Result<(), SceneError>;
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
    ) -> Result<SceneCommand, SceneError>;
    fn render(&mut self, target: &mut dyn DrawTarget);
    fn unload(&mut self) {}
    fn debug_title(&self) -> Option<String> {
        None
    }
    fn entity_count(&self) -> usize {
        0
    }
}

/// Tracks whether the scene is loaded so load and unload each run once.
pub(crate) struct SceneHost {
    scene: Box<dyn Scene>,
    is_loaded: bool,
}

impl SceneHost {
    pub(crate) fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            is_loaded: false,
        }
    }

    pub(crate) fn load(&mut self) -> Result<(), SceneError> {
        if self.is_loaded {
            return Ok(());
        }
        self.scene.load()?;
        self.is_loaded = true;
        info!(entity_count = self.scene.entity_count(), "scene_loaded");
        Ok(())
    }

    pub(crate) fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
    ) -> Result<SceneCommand, SceneError> {
        if !self.is_loaded {
            return Ok(SceneCommand::None);
        }
        self.scene.update(fixed_dt_seconds, input)
    }

    pub(crate) fn scene_mut(&mut self) -> &mut dyn Scene {
        self.scene.as_mut()
    }

    pub(crate) fn debug_title(&self) -> Option<String> {
        self.scene.debug_title()
    }

    pub(crate) fn entity_count(&self) -> usize {
        self.scene.entity_count()
    }

    pub(crate) fn shutdown(&mut self) {
        if !self.is_loaded {
            return;
        }
        self.scene.unload();
        self.is_loaded = false;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct Counters {
        loads: Cell<u32>,
        updates: Cell<u32>,
        unloads: Cell<u32>,
    }

    struct CountingScene {
        counters: Rc<Counters>,
    }

    impl Scene for CountingScene {
        fn load(&mut self) -> Result<(), SceneError> {
            self.counters.loads.set(self.counters.loads.get() + 1);
            Ok(())
        }

        fn update(
            &mut self,
            _fixed_dt_seconds: f32,
            input: &InputSnapshot,
        ) -> Result<SceneCommand, SceneError> {
            self.counters.updates.set(self.counters.updates.get() + 1);
            if input.was_pressed(InputAction::Quit) {
                return Ok(SceneCommand::Quit);
            }
            Ok(SceneCommand::None)
        }

        fn render(&mut self, _target: &mut dyn DrawTarget) {}

        fn unload(&mut self) {
            self.counters.unloads.set(self.counters.unloads.get() + 1);
        }
    }

    fn host() -> (SceneHost, Rc<Counters>) {
        let counters = Rc::new(Counters::default());
        let scene = CountingScene {
            counters: Rc::clone(&counters),
        };
        (SceneHost::new(Box::new(scene)), counters)
    }

    #[test]
    fn load_and_shutdown_run_once() {
        let (mut host, counters) = host();
        host.load().expect("load");
        host.load().expect("load");
        host.shutdown();
        host.shutdown();
        assert_eq!(counters.loads.get(), 1);
        assert_eq!(counters.unloads.get(), 1);
    }

    #[test]
    fn update_before_load_is_skipped() {
        let (mut host, counters) = host();
        let command = host.update(1.0 / 60.0, &InputSnapshot::empty()).expect("update");
        assert_eq!(command, SceneCommand::None);
        assert_eq!(counters.updates.get(), 0);
    }

    #[test]
    fn update_forwards_commands() {
        let (mut host, _counters) = host();
        host.load().expect("load");
        let input = InputSnapshot::empty().with_action_pressed(InputAction::Quit);
        assert_eq!(host.update(0.016, &input).expect("update"), SceneCommand::Quit);
    }

    #[test]
    fn snapshot_builders_separate_held_and_pressed() {
        let held = InputSnapshot::empty().with_action_down(InputAction::MoveLeft, true);
        assert!(held.is_down(InputAction::MoveLeft));
        assert!(!held.was_pressed(InputAction::MoveLeft));
        assert!(held.any_directional_down());
        assert!(!held.any_directional_pressed());

        let pressed = InputSnapshot::empty().with_action_pressed(InputAction::Interact);
        assert!(pressed.was_pressed(InputAction::Interact));
        assert!(!pressed.any_directional_down());
        assert!(!pressed.any_directional_pressed());
        assert!(InputSnapshot::empty()
            .with_action_pressed(InputAction::MoveUp)
            .any_directional_pressed());
    }
}
