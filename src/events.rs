// events.rs — typed publish/subscribe notifications raised by the viewer

use crate::config::AnimateOptions;
use crate::state::{Position, Size};

pub const TWO_FINGERS_OVERLAY: &str = "twoFingers";
pub const CTRL_ZOOM_OVERLAY: &str = "ctrlZoom";

/// Payload of click and double-click events.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickData {
    pub rightclick: bool,
    /// Position in the host window.
    pub client_x: f64,
    pub client_y: f64,
    /// Position relative to the viewer.
    pub viewer_x: f64,
    pub viewer_y: f64,
    pub yaw: f64,
    pub pitch: f64,
    /// Pixel in the panorama image, when the adapter supports it.
    pub texture_x: Option<f64>,
    pub texture_y: Option<f64>,
    /// Ids of non-sphere objects under the pointer.
    pub objects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// Cancelable; listeners may edit the position.
    BeforeRotate { position: Position },
    /// Cancelable; listeners may edit the options.
    BeforeAnimate { options: AnimateOptions },
    PositionUpdated { position: Position },
    ZoomUpdated { zoom_level: f64 },
    RollUpdated { roll: f64 },
    BeforeRender { timestamp: f64, elapsed: f64 },
    Render,
    StopAll,
    Click(ClickData),
    DoubleClick(ClickData),
    /// Cancelable.
    Keypress { key: String },
    ShowOverlay { id: &'static str },
    HideOverlay { id: &'static str },
    SizeUpdated { size: Size },
    Fullscreen { enabled: bool },
    PanoramaLoad { path: String },
    PanoramaLoaded { path: String },
    TransitionDone { completed: bool },
    Ready,
    ConfigChanged { options: Vec<&'static str> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    BeforeRotate,
    BeforeAnimate,
    PositionUpdated,
    ZoomUpdated,
    RollUpdated,
    BeforeRender,
    Render,
    StopAll,
    Click,
    DoubleClick,
    Keypress,
    ShowOverlay,
    HideOverlay,
    SizeUpdated,
    Fullscreen,
    PanoramaLoad,
    PanoramaLoaded,
    TransitionDone,
    Ready,
    ConfigChanged,
}

impl ViewerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ViewerEvent::BeforeRotate { .. } => EventKind::BeforeRotate,
            ViewerEvent::BeforeAnimate { .. } => EventKind::BeforeAnimate,
            ViewerEvent::PositionUpdated { .. } => EventKind::PositionUpdated,
            ViewerEvent::ZoomUpdated { .. } => EventKind::ZoomUpdated,
            ViewerEvent::RollUpdated { .. } => EventKind::RollUpdated,
            ViewerEvent::BeforeRender { .. } => EventKind::BeforeRender,
            ViewerEvent::Render => EventKind::Render,
            ViewerEvent::StopAll => EventKind::StopAll,
            ViewerEvent::Click(_) => EventKind::Click,
            ViewerEvent::DoubleClick(_) => EventKind::DoubleClick,
            ViewerEvent::Keypress { .. } => EventKind::Keypress,
            ViewerEvent::ShowOverlay { .. } => EventKind::ShowOverlay,
            ViewerEvent::HideOverlay { .. } => EventKind::HideOverlay,
            ViewerEvent::SizeUpdated { .. } => EventKind::SizeUpdated,
            ViewerEvent::Fullscreen { .. } => EventKind::Fullscreen,
            ViewerEvent::PanoramaLoad { .. } => EventKind::PanoramaLoad,
            ViewerEvent::PanoramaLoaded { .. } => EventKind::PanoramaLoaded,
            ViewerEvent::TransitionDone { .. } => EventKind::TransitionDone,
            ViewerEvent::Ready => EventKind::Ready,
            ViewerEvent::ConfigChanged { .. } => EventKind::ConfigChanged,
        }
    }

    pub fn is_cancelable(&self) -> bool {
        matches!(
            self.kind(),
            EventKind::BeforeRotate | EventKind::BeforeAnimate | EventKind::Keypress
        )
    }
}

/// What a listener receives. Edits to `event` are seen by later listeners and by the
/// dispatcher.
#[derive(Debug)]
pub struct EventContext {
    pub event: ViewerEvent,
    default_prevented: bool,
}

impl EventContext {
    /// Cancels the action announced by a cancelable event. Ignored otherwise.
    pub fn prevent_default(&mut self) {
        if self.event.is_cancelable() {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&mut EventContext)>;

/// Synchronous dispatcher, listeners run in registration order.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, EventKind, Listener)>,
    next_id: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn on(&mut self, kind: EventKind, listener: impl FnMut(&mut EventContext) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, kind, Box::new(listener)));
        id
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn dispatch(&mut self, event: ViewerEvent) -> EventContext {
        let kind = event.kind();
        let mut context = EventContext {
            event,
            default_prevented: false,
        };
        for (_, listener_kind, listener) in &mut self.listeners {
            if *listener_kind == kind {
                listener(&mut context);
            }
        }
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn listeners_receive_their_kind_only() {
        let mut bus = EventBus::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        bus.on(EventKind::ZoomUpdated, move |ctx| {
            if let ViewerEvent::ZoomUpdated { zoom_level } = ctx.event {
                sink.borrow_mut().push(zoom_level);
            }
        });
        bus.dispatch(ViewerEvent::RollUpdated { roll: 1.0 });
        bus.dispatch(ViewerEvent::ZoomUpdated { zoom_level: 42.0 });
        assert_eq!(*seen.borrow(), vec![42.0]);
    }

    #[test]
    fn cancel_and_edit() {
        let mut bus = EventBus::default();
        bus.on(EventKind::BeforeRotate, |ctx| {
            if let ViewerEvent::BeforeRotate { position } = &mut ctx.event {
                position.pitch = 0.0;
            }
        });
        let context = bus.dispatch(ViewerEvent::BeforeRotate {
            position: Position::new(1.0, 0.5),
        });
        assert!(!context.default_prevented());
        assert_eq!(
            context.event,
            ViewerEvent::BeforeRotate {
                position: Position::new(1.0, 0.0)
            }
        );

        bus.on(EventKind::BeforeRotate, |ctx| ctx.prevent_default());
        bus.on(EventKind::Render, |ctx| ctx.prevent_default());
        assert!(bus
            .dispatch(ViewerEvent::BeforeRotate {
                position: Position::default()
            })
            .default_prevented());
        assert!(!bus.dispatch(ViewerEvent::Render).default_prevented());
    }

    #[test]
    fn off_removes_listener() {
        let mut bus = EventBus::default();
        let count = Rc::new(RefCell::new(0));
        let counter = count.clone();
        let id = bus.on(EventKind::Render, move |_| *counter.borrow_mut() += 1);
        bus.dispatch(ViewerEvent::Render);
        assert!(bus.off(id));
        assert!(!bus.off(id));
        bus.dispatch(ViewerEvent::Render);
        assert_eq!(*count.borrow(), 1);
    }
}
