use tilewalk_engine::{check_connection, EntityId, InputAction, InputSnapshot};
use tracing::info;

use super::actors::Facing;
use super::setup::World;

/// One conversation with a character, walked line by line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DialogSession {
    character: usize,
    speaker: EntityId,
    character_id: String,
    lines: Vec<String>,
    cursor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DialogStep {
    Continue,
    Finished,
}

impl DialogSession {
    fn new(character: usize, speaker: EntityId, character_id: String, lines: Vec<String>) -> Self {
        Self {
            character,
            speaker,
            character_id,
            lines,
            cursor: 0,
        }
    }

    /// Index of the speaking character in [`World::characters`].
    pub(crate) fn character(&self) -> usize {
        self.character
    }

    pub(crate) fn speaker(&self) -> EntityId {
        self.speaker
    }

    pub(crate) fn character_id(&self) -> &str {
        &self.character_id
    }

    pub(crate) fn current_line(&self) -> Option<&str> {
        self.lines.get(self.cursor).map(String::as_str)
    }

    fn advance(&mut self) -> DialogStep {
        self.cursor += 1;
        if self.cursor >= self.lines.len() {
            DialogStep::Finished
        } else {
            DialogStep::Continue
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DialogMachine {
    session: Option<DialogSession>,
}

impl DialogMachine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn session(&self) -> Option<&DialogSession> {
        self.session.as_ref()
    }

    pub(crate) fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Advances an open session, or opens one with the nearest character in
    /// `radius` when interact is pressed and nothing else holds the player.
    pub(crate) fn update(&mut self, input: &InputSnapshot, world: &mut World, radius: f32) {
        if let Some(session) = self.session.as_mut() {
            if input.was_pressed(InputAction::Advance)
                && session.advance() == DialogStep::Finished
            {
                info!(character_id = %session.character_id, "dialog_closed");
                self.session = None;
                world.player.unblock();
            }
            return;
        }

        if !input.was_pressed(InputAction::Interact) || world.player.is_blocked() {
            return;
        }
        let Some(player) = world.player_entity() else {
            return;
        };
        let player_center = player.hitbox().center();
        let nearest = world
            .characters
            .iter()
            .enumerate()
            .filter_map(|(index, character)| {
                let entity = world.sprites.get(character.entity)?;
                check_connection(radius, player, entity)
                    .then(|| (index, entity.hitbox().center().distance(player_center)))
            })
            .min_by(|left, right| left.1.total_cmp(&right.1))
            .map(|(index, _)| index);
        let Some(index) = nearest else {
            return;
        };

        let character = &mut world.characters[index];
        let Some(character_center) = world
            .sprites
            .get(character.entity)
            .map(|entity| entity.hitbox().center())
        else {
            return;
        };
        let facing = Facing::toward(character_center, player_center);
        character.face(facing, &mut world.sprites);
        world.player.block();
        info!(
            character_id = %character.character_id,
            facing = facing.name(),
            "dialog_opened"
        );
        self.session = Some(DialogSession::new(
            index,
            character.entity,
            character.character_id.clone(),
            character.lines.clone(),
        ));
    }

    /// Drops the session without touching the world it referred to. Returns
    /// whether one was open.
    pub(crate) fn force_close(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                info!(character_id = %session.character_id, "dialog_force_closed");
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_finishes_after_last_line() {
        let mut session = DialogSession::new(
            0,
            EntityId(3),
            "o1".to_string(),
            vec!["one".to_string(), "two".to_string()],
        );
        assert_eq!(session.current_line(), Some("one"));
        assert_eq!(session.advance(), DialogStep::Continue);
        assert_eq!(session.current_line(), Some("two"));
        assert_eq!(session.advance(), DialogStep::Finished);
        assert_eq!(session.current_line(), None);
    }

    #[test]
    fn force_close_reports_whether_a_session_was_open() {
        let mut machine = DialogMachine::new();
        assert!(!machine.force_close());
        machine.session = Some(DialogSession::new(
            0,
            EntityId(1),
            "o1".to_string(),
            vec!["x".to_string()],
        ));
        assert!(machine.force_close());
        assert!(!machine.is_open());
    }
}
