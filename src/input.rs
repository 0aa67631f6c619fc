// input.rs — host-agnostic input events fed to the gesture state machine

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Other(u16),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touch {
    pub id: u64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.ctrl || self.alt || self.shift || self.meta
    }
}

/// Raw input in viewer-relative logical pixels.
///
/// Keys use web-style names: `"ArrowUp"`, `"PageDown"`, `"+"`, `"Control"`...
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        x: f64,
        y: f64,
        button: MouseButton,
    },
    PointerMove {
        x: f64,
        y: f64,
    },
    PointerUp {
        x: f64,
        y: f64,
        button: MouseButton,
    },
    /// `touches` holds every finger still on the surface, `changed` the ones that triggered the event.
    TouchStart {
        touches: Vec<Touch>,
        changed: Vec<Touch>,
    },
    TouchMove {
        touches: Vec<Touch>,
        changed: Vec<Touch>,
    },
    TouchEnd {
        touches: Vec<Touch>,
        changed: Vec<Touch>,
    },
    Wheel {
        delta_y: f64,
    },
    KeyDown {
        key: String,
        modifiers: Modifiers,
    },
    KeyUp {
        key: String,
    },
    FullscreenChanged(bool),
}
