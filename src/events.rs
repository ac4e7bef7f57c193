use std::fmt;

use crate::scripting::bridge::Handle;

/// Contact transitions reported by a room's physics step, keyed by the owning objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactEvent {
    Began { a: Handle, b: Handle },
    Ended { a: Handle, b: Handle },
}

impl ContactEvent {
    fn ordered_pair(a: Handle, b: Handle) -> (Handle, Handle) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn began(a: Handle, b: Handle) -> Self {
        let (a, b) = Self::ordered_pair(a, b);
        ContactEvent::Began { a, b }
    }

    pub fn ended(a: Handle, b: Handle) -> Self {
        let (a, b) = Self::ordered_pair(a, b);
        ContactEvent::Ended { a, b }
    }

    pub fn pair(&self) -> (Handle, Handle) {
        match *self {
            ContactEvent::Began { a, b } | ContactEvent::Ended { a, b } => (a, b),
        }
    }
}

impl fmt::Display for ContactEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactEvent::Began { a, b } => write!(f, "ContactBegan a={a} b={b}"),
            ContactEvent::Ended { a, b } => write!(f, "ContactEnded a={a} b={b}"),
        }
    }
}
