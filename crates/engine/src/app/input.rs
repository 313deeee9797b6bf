#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    SaveMap,
    ReloadMap,
    CompleteLevel,
    Quit,
}

const ACTION_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::SaveMap => 0,
            InputAction::ReloadMap => 1,
            InputAction::CompleteLevel => 2,
            InputAction::Quit => 3,
        }
    }
}

/// Input seen by one fixed update.
///
/// `*_pressed` flags are set only on the first tick after the key goes down.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    pressed: ActionStates,
}

impl InputSnapshot {
    pub(crate) fn new(quit_requested: bool, actions: ActionStates, pressed: ActionStates) -> Self {
        Self {
            quit_requested,
            actions,
            pressed,
        }
    }

    /// Builds a snapshot where each listed action was just pressed.
    pub fn with_pressed(actions: &[InputAction]) -> Self {
        let mut snapshot = Self::default();
        for action in actions {
            snapshot.actions.set(*action, true);
            snapshot.pressed.set(*action, true);
        }
        snapshot
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn pressed(&self, action: InputAction) -> bool {
        self.pressed.is_down(action)
    }

    pub fn save_pressed(&self) -> bool {
        self.pressed(InputAction::SaveMap)
    }

    pub fn reload_pressed(&self) -> bool {
        self.pressed(InputAction::ReloadMap)
    }

    pub fn complete_level_pressed(&self) -> bool {
        self.pressed(InputAction::CompleteLevel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_pressed_sets_down_and_edge() {
        let snapshot = InputSnapshot::with_pressed(&[InputAction::SaveMap]);
        assert!(snapshot.save_pressed());
        assert!(snapshot.is_down(InputAction::SaveMap));
        assert!(!snapshot.reload_pressed());
        assert!(!snapshot.quit_requested());
    }
}
