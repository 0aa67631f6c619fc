// lib.rs — panosphere: motion and interaction engine of a 360° panorama viewer
//
// The engine is host-agnostic: feed it input with `Viewer::handle_input`, drive it with
// `Viewer::frame` and draw `ViewerState` with any `SceneRenderer`.

pub mod adapter;
pub mod animation;
pub mod config;
pub mod data_helper;
pub mod dynamic;
pub mod dynamics;
pub mod easing;
pub mod error;
pub mod events;
pub mod events_handler;
pub mod input;
pub mod multi_dynamic;
pub mod press_handler;
pub mod scene;
pub mod state;
pub mod step;
pub mod timers;
pub mod utils;
pub mod viewer;

pub use adapter::{CoordinateAdapter, EquirectangularAdapter, PanoData, PanoDataHint, TextureCoords};
pub use animation::{Animation, AnimationOptions, AnimationState};
pub use config::{AnimateOptions, AnimationSpeed, KeyboardMode, TransitionEffect, TransitionOptions, ViewerConfig};
pub use easing::Easing;
pub use error::{ConfigError, ViewerError};
pub use events::{EventContext, EventKind, ListenerId, ViewerEvent};
pub use input::{InputEvent, Modifiers, MouseButton, Touch};
pub use scene::{Intersection, SceneObject, SceneRenderer, SphereRaycaster};
pub use state::{Position, Size, ViewerState};
pub use viewer::{LoadTicket, PanoramaOptions, Transition, Viewer};

/// Radius of the panorama sphere, in scene units.
pub const SPHERE_RADIUS: f64 = 10.0;

/// Shortest animation computed from a speed, ms.
pub const ANIMATION_MIN_DURATION: f64 = 500.0;

/// Pointer travel (logical px, scaled by the pixel ratio) that turns a press into a drag.
pub const MOVE_THRESHOLD: f64 = 4.0;

/// Max delay between the two clicks of a double click, ms.
pub const DBLCLICK_DELAY: f64 = 300.0;

pub const LONGTOUCH_DELAY: f64 = 500.0;

/// Delay before the "use two fingers" hint shows up, ms.
pub const TWOFINGERSOVERLAY_DELAY: f64 = 100.0;

/// How long the "use ctrl + wheel" hint stays visible, ms.
pub const CTRLZOOM_TIMEOUT: f64 = 2000.0;
