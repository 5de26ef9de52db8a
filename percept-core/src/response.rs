use serde::{Deserialize, Serialize};

/// One of the two designated response actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseAction {
    A,
    B,
}

/// Input as reported by a presentation frontend, before mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput {
    Key(char),
    /// An on-screen button already bound to an action.
    Button(ResponseAction),
}

/// Keyboard layout for the two response actions and the slideshow continue key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub a: char,
    pub b: char,
    pub proceed: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            a: 'm',
            b: 'v',
            proceed: ' ',
        }
    }
}

impl KeyBindings {
    /// Maps raw input to a response action. Keys outside the two bindings yield `None`.
    pub fn action_for(&self, input: RawInput) -> Option<ResponseAction> {
        match input {
            RawInput::Button(action) => Some(action),
            RawInput::Key(c) => {
                let c = c.to_ascii_lowercase();
                if c == self.a.to_ascii_lowercase() {
                    Some(ResponseAction::A)
                } else if c == self.b.to_ascii_lowercase() {
                    Some(ResponseAction::B)
                } else {
                    None
                }
            }
        }
    }

    pub fn is_proceed(&self, input: RawInput) -> bool {
        matches!(input, RawInput::Key(c) if c.eq_ignore_ascii_case(&self.proceed))
    }

    /// All three keys must differ.
    pub fn is_unambiguous(&self) -> bool {
        let [a, b, p] = [self.a, self.b, self.proceed].map(|c| c.to_ascii_lowercase());
        a != b && a != p && b != p
    }
}

/// Which ground-truth value each action asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMapping {
    pub a_asserts: bool,
}

impl Default for ResponseMapping {
    fn default() -> Self {
        Self { a_asserts: true }
    }
}

impl ResponseMapping {
    pub fn reversed() -> Self {
        Self { a_asserts: false }
    }

    /// Counterbalanced mapping: identifiers ending in an even digit get the
    /// reversed layout, everything else the standard one.
    pub fn for_participant(participant: &str) -> Self {
        match participant.chars().last().and_then(|c| c.to_digit(10)) {
            Some(d) if d % 2 == 0 => Self::reversed(),
            _ => Self::default(),
        }
    }

    pub fn meaning(&self, action: ResponseAction) -> bool {
        match action {
            ResponseAction::A => self.a_asserts,
            ResponseAction::B => !self.a_asserts,
        }
    }

    /// True when `action` agrees with the trial's ground truth.
    pub fn is_correct(&self, action: ResponseAction, ground_truth: bool) -> bool {
        self.meaning(action) == ground_truth
    }
}
