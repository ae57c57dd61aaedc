use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Named actions delivered by the external input-capture layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    Jump,
    Dash,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Self::MoveLeft,
        Self::MoveRight,
        Self::MoveUp,
        Self::MoveDown,
        Self::Jump,
        Self::Dash,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::MoveLeft => "move_left",
            Self::MoveRight => "move_right",
            Self::MoveUp => "move_up",
            Self::MoveDown => "move_down",
            Self::Jump => "jump",
            Self::Dash => "dash",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| format!("unknown action `{s}`"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    Pressed(Action, f64),
    Released(Action, f64),
}

/// When and in which order a held action was pressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyPress {
    pub pressed_at_ms: u64,
    /// Registration order across all presses; breaks timestamp ties.
    pub sequence: u64,
}

/// Snapshot of one entity's input for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawInput {
    pub left: Option<KeyPress>,
    pub right: Option<KeyPress>,
    pub up: Option<KeyPress>,
    pub down: Option<KeyPress>,
    pub jump_pressed: bool,
    pub dash_pressed: bool,
    /// Analog strength of the directional input, 0..1. Keyboards report 1.
    pub strength: f32,
}

impl RawInput {
    pub fn is_idle(&self) -> bool {
        self.left.is_none()
            && self.right.is_none()
            && self.up.is_none()
            && self.down.is_none()
            && !self.jump_pressed
            && !self.dash_pressed
    }
}

/// Held/pressed bookkeeping fed by `InputEvent`s.
pub struct InputState {
    held: HashMap<Action, KeyPress>,
    pressed: HashSet<Action>,
    next_sequence: u64,
    pub strength: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashMap::new(),
            pressed: HashSet::new(),
            next_sequence: 0,
            strength: 1.0,
        }
    }

    pub fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::Pressed(action, at) => {
                // Key repeat: keep the original press.
                if self.held.contains_key(&action) {
                    return;
                }
                let press = KeyPress {
                    pressed_at_ms: seconds_to_ms(at),
                    sequence: self.next_sequence,
                };
                self.next_sequence += 1;
                self.held.insert(action, press);
                self.pressed.insert(action);
            }
            InputEvent::Released(action, _) => {
                self.held.remove(&action);
            }
        }
    }

    /// Parse `name` as an action and apply it. Unknown names are ignored.
    pub fn apply_named(&mut self, name: &str, pressed: bool, at: f64) {
        match name.parse::<Action>() {
            Ok(action) if pressed => self.apply(InputEvent::Pressed(action, at)),
            Ok(action) => self.apply(InputEvent::Released(action, at)),
            Err(err) => log::debug!("{err}"),
        }
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.held.contains_key(&action)
    }

    pub fn raw_input(&self) -> RawInput {
        RawInput {
            left: self.held.get(&Action::MoveLeft).copied(),
            right: self.held.get(&Action::MoveRight).copied(),
            up: self.held.get(&Action::MoveUp).copied(),
            down: self.held.get(&Action::MoveDown).copied(),
            jump_pressed: self.pressed.contains(&Action::Jump),
            dash_pressed: self.pressed.contains(&Action::Dash),
            strength: self.strength,
        }
    }

    /// Forget this frame's press edges. Held keys stay held.
    pub fn end_frame(&mut self) {
        self.pressed.clear();
    }

    pub fn clear(&mut self) {
        self.held.clear();
        self.pressed.clear();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

/// Timestamps are compared at millisecond resolution so that presses the
/// capture layer stamped identically stay identical after float round-trips.
fn seconds_to_ms(at: f64) -> u64 {
    (at.max(0.0) * 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_actions() {
        assert_eq!("move_left".parse::<Action>(), Ok(Action::MoveLeft));
        assert_eq!("dash".parse::<Action>(), Ok(Action::Dash));
        assert!("fly".parse::<Action>().is_err());
    }

    #[test]
    fn press_edges_last_one_frame() {
        let mut input = InputState::new();
        input.apply(InputEvent::Pressed(Action::Jump, 0.0));
        assert!(input.raw_input().jump_pressed);
        input.end_frame();
        assert!(!input.raw_input().jump_pressed);
        assert!(input.is_held(Action::Jump));
    }

    #[test]
    fn sequence_orders_registrations() {
        let mut input = InputState::new();
        input.apply(InputEvent::Pressed(Action::MoveLeft, 1.0));
        input.apply(InputEvent::Pressed(Action::MoveRight, 1.0));
        let raw = input.raw_input();
        let (left, right) = (raw.left.unwrap(), raw.right.unwrap());
        assert_eq!(left.pressed_at_ms, right.pressed_at_ms);
        assert!(left.sequence < right.sequence);
    }

    #[test]
    fn repeat_press_keeps_original_timestamp() {
        let mut input = InputState::new();
        input.apply(InputEvent::Pressed(Action::MoveLeft, 1.0));
        input.apply(InputEvent::Pressed(Action::MoveLeft, 2.0));
        assert_eq!(input.raw_input().left.unwrap().pressed_at_ms, 1000);
        input.apply_named("move_left", false, 2.5);
        assert!(!input.is_held(Action::MoveLeft));
    }
}
