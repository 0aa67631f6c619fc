// events_handler.rs — turns pointer, touch, wheel and key input into camera motion

use log::debug;

use crate::config::{Action, KeyboardMode};
use crate::data_helper::vector3_to_spherical;
use crate::events::{ClickData, ViewerEvent, CTRL_ZOOM_OVERLAY, TWO_FINGERS_OVERLAY};
use crate::input::{InputEvent, Modifiers, MouseButton, Touch};
use crate::press_handler::PressHandler;
use crate::state::Position;
use crate::step::{Step, StepFlag};
use crate::timers::{TimerKey, Timers};
use crate::utils::distance;
use crate::viewer::Viewer;
use crate::{
    CTRLZOOM_TIMEOUT, DBLCLICK_DELAY, LONGTOUCH_DELAY, MOVE_THRESHOLD, TWOFINGERSOVERLAY_DELAY,
};

const MOVE_DELTA_EPSILON: f64 = 1e-3;

/// Gesture motion waiting to be applied on the next frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveDelta {
    pub yaw: f64,
    pub pitch: f64,
    pub zoom: f64,
}

impl MoveDelta {
    pub fn is_zero(&self) -> bool {
        self.yaw == 0.0 && self.pitch == 0.0 && self.zoom == 0.0
    }

    pub fn clear(&mut self) {
        *self = MoveDelta::default();
    }
}

#[derive(Debug, Clone, Copy)]
struct TouchData {
    distance: f64,
    center_x: f64,
    center_y: f64,
}

impl TouchData {
    fn from_touches(touches: &[Touch]) -> Option<Self> {
        match touches {
            [p1, p2, ..] => Some(Self {
                distance: distance(p1.x, p1.y, p2.x, p2.y),
                center_x: (p1.x + p2.x) / 2.0,
                center_y: (p1.y + p2.y) / 2.0,
            }),
            _ => None,
        }
    }
}

/// Per-session gesture state. Owned by the [`Viewer`], which lends itself to every call.
#[derive(Debug, Default)]
pub struct EventsHandler {
    step: Step,
    start_x: f64,
    start_y: f64,
    mouse_x: f64,
    mouse_y: f64,
    pinch_dist: f64,
    accumulator_factor: f64,
    ctrl_key_down: bool,
    dblclick_data: Option<ClickData>,
    long_touch_at: Option<(f64, f64)>,
    two_fingers_overlay: bool,
    ctrl_zoom_overlay: bool,
    key_handler: PressHandler<Action>,
    timers: Timers,
}

impl EventsHandler {
    pub fn handle(&mut self, viewer: &mut Viewer, event: InputEvent, now: f64) {
        match event {
            InputEvent::PointerDown { x, y, .. } => self.on_pointer_down(x, y),
            InputEvent::PointerMove { x, y } => self.on_pointer_move(viewer, x, y),
            InputEvent::PointerUp { x, y, button } => self.on_pointer_up(viewer, x, y, button, now),
            InputEvent::TouchStart { touches, .. } => self.on_touch_start(viewer, &touches, now),
            InputEvent::TouchMove { touches, .. } => self.on_touch_move(viewer, &touches, now),
            InputEvent::TouchEnd { touches, changed } => {
                self.on_touch_end(viewer, &touches, &changed, now)
            }
            InputEvent::Wheel { delta_y } => self.on_wheel(viewer, delta_y, now),
            InputEvent::KeyDown { key, modifiers } => self.on_key_down(viewer, key, modifiers, now),
            InputEvent::KeyUp { .. } => self.on_key_up(viewer, now),
            InputEvent::FullscreenChanged(enabled) => self.on_fullscreen_change(viewer, enabled),
        }
    }

    /// Fires due timeouts and deferred key releases.
    pub fn fire_timers(&mut self, viewer: &mut Viewer, now: f64) {
        if let Some(action) = self.key_handler.poll(now) {
            self.release_key(viewer, action);
        }

        for key in self.timers.take_due(now) {
            match key {
                TimerKey::DoubleClick => self.dblclick_data = None,
                TimerKey::LongTouch => {
                    if let Some((x, y)) = self.long_touch_at.take() {
                        debug!("long touch at ({x}, {y})");
                        self.stop_move(viewer, x, y, true, now);
                    }
                }
                TimerKey::TwoFingersOverlay => {
                    self.two_fingers_overlay = true;
                    viewer.dispatch(ViewerEvent::ShowOverlay {
                        id: TWO_FINGERS_OVERLAY,
                    });
                }
                TimerKey::CtrlZoomOverlay => self.hide_ctrl_zoom_overlay(viewer),
            }
        }
    }

    /// Applies the accumulated gesture motion, then lets it decay.
    pub fn apply_move_delta(&mut self, viewer: &mut Viewer) {
        let inertia = viewer.config.move_inertia;
        let mut delta = viewer.move_delta;

        if delta.yaw != 0.0 || delta.pitch != 0.0 {
            let current = viewer.get_position();
            viewer.rotate(Position {
                yaw: current.yaw - delta.yaw * (1.0 - inertia),
                pitch: current.pitch + delta.pitch * (1.0 - inertia),
            });
            delta.yaw *= self.accumulator_factor;
            delta.pitch *= self.accumulator_factor;
            if delta.yaw.abs() <= MOVE_DELTA_EPSILON {
                delta.yaw = 0.0;
            }
            if delta.pitch.abs() <= MOVE_DELTA_EPSILON {
                delta.pitch = 0.0;
            }
        }

        if delta.zoom != 0.0 {
            let current = viewer.get_zoom_level();
            viewer.zoom(current + delta.zoom * (1.0 - inertia));
            delta.zoom *= inertia;
            if delta.zoom.abs() <= MOVE_DELTA_EPSILON {
                delta.zoom = 0.0;
            }
        }

        viewer.move_delta = delta;
    }

    fn move_threshold(viewer: &Viewer) -> f64 {
        MOVE_THRESHOLD * viewer.state.pixel_ratio
    }

    fn on_key_down(&mut self, viewer: &mut Viewer, key: String, modifiers: Modifiers, now: f64) {
        if viewer.config.mousewheel_ctrl_key {
            self.ctrl_key_down = key == "Control";
            if self.ctrl_key_down {
                self.timers.clear(TimerKey::CtrlZoomOverlay);
                self.hide_ctrl_zoom_overlay(viewer);
            }
        }

        let context = viewer.dispatch(ViewerEvent::Keypress { key: key.clone() });
        if context.default_prevented() || !viewer.state.keyboard_enabled || modifiers.any() {
            return;
        }

        let Some(action) = viewer.config.keyboard_actions.get(&key).copied() else {
            return;
        };
        if self.key_handler.pending() {
            return;
        }

        if !action.is_zoom() {
            viewer.stop_all();
        }
        let dynamics = &mut viewer.dynamics;
        match action {
            Action::RotateUp => dynamics.position.roll([("pitch", false)], 1.0),
            Action::RotateDown => dynamics.position.roll([("pitch", true)], 1.0),
            Action::RotateRight => dynamics.position.roll([("yaw", false)], 1.0),
            Action::RotateLeft => dynamics.position.roll([("yaw", true)], 1.0),
            Action::ZoomIn => dynamics.zoom.roll(false, 1.0),
            Action::ZoomOut => dynamics.zoom.roll(true, 1.0),
        }
        self.key_handler.down(action, now);
    }

    fn on_key_up(&mut self, viewer: &mut Viewer, now: f64) {
        self.ctrl_key_down = false;
        if !viewer.state.keyboard_enabled {
            return;
        }
        if let Some(action) = self.key_handler.up(now) {
            self.release_key(viewer, action);
        }
    }

    fn release_key(&mut self, viewer: &mut Viewer, action: Action) {
        if action.is_zoom() {
            viewer.dynamics.zoom.stop();
        } else {
            viewer.dynamics.position.stop();
            viewer.reset_idle_timer();
        }
    }

    fn on_pointer_down(&mut self, x: f64, y: f64) {
        self.step.add(StepFlag::Click);
        self.start_x = x;
        self.start_y = y;
    }

    fn on_pointer_up(&mut self, viewer: &mut Viewer, x: f64, y: f64, button: MouseButton, now: f64) {
        if self.step.has(&[StepFlag::Click, StepFlag::Moving]) {
            self.stop_move(viewer, x, y, button == MouseButton::Right, now);
        }
    }

    fn on_pointer_move(&mut self, viewer: &mut Viewer, x: f64, y: f64) {
        if viewer.config.mousemove && self.step.has(&[StepFlag::Click, StepFlag::Moving]) {
            self.do_move(viewer, x, y);
        }
    }

    fn on_touch_start(&mut self, viewer: &mut Viewer, touches: &[Touch], now: f64) {
        match touches.len() {
            1 => {
                let touch = touches[0];
                self.step.add(StepFlag::Click);
                self.start_x = touch.x;
                self.start_y = touch.y;
                if !self.timers.is_set(TimerKey::LongTouch) {
                    self.long_touch_at = Some((touch.x, touch.y));
                    self.timers.set(TimerKey::LongTouch, now, LONGTOUCH_DELAY);
                }
            }
            2 => {
                self.step.reset();
                self.cancel_long_touch();
                if viewer.config.mousemove {
                    self.cancel_two_fingers_overlay(viewer);
                    self.start_move_zoom(viewer, touches);
                }
            }
            0 => {}
            _ => {
                if self.step.has(&[StepFlag::Moving]) {
                    self.rebaseline_touches(touches);
                }
            }
        }
    }

    fn on_touch_end(&mut self, viewer: &mut Viewer, touches: &[Touch], changed: &[Touch], now: f64) {
        self.cancel_long_touch();
        if !self.step.has(&[StepFlag::Click, StepFlag::Moving]) {
            return;
        }
        self.cancel_two_fingers_overlay(viewer);

        match touches {
            [remaining] if !viewer.config.touchmove_two_fingers => {
                // keep dragging with the finger left on the surface
                self.step.set(StepFlag::Moving);
                self.start_x = remaining.x;
                self.start_y = remaining.y;
                self.mouse_x = remaining.x;
                self.mouse_y = remaining.y;
                self.accumulator_factor = viewer.config.move_inertia;
            }
            [_] => self.stop_move(viewer, self.mouse_x, self.mouse_y, false, now),
            [] => {
                if let Some(touch) = changed.first() {
                    self.stop_move(viewer, touch.x, touch.y, false, now);
                } else {
                    self.stop_move(viewer, self.mouse_x, self.mouse_y, false, now);
                }
            }
            _ => self.rebaseline_touches(touches),
        }
    }

    fn on_touch_move(&mut self, viewer: &mut Viewer, touches: &[Touch], now: f64) {
        self.cancel_long_touch();
        if !viewer.config.mousemove {
            return;
        }

        match touches {
            [] => {}
            [touch] => {
                if viewer.config.touchmove_two_fingers {
                    if self.step.has(&[StepFlag::Click])
                        && !self.timers.is_set(TimerKey::TwoFingersOverlay)
                    {
                        self.timers
                            .set(TimerKey::TwoFingersOverlay, now, TWOFINGERSOVERLAY_DELAY);
                    }
                } else if self.step.has(&[StepFlag::Click, StepFlag::Moving]) {
                    self.do_move(viewer, touch.x, touch.y);
                }
            }
            _ => {
                self.do_move_zoom(viewer, touches);
                self.cancel_two_fingers_overlay(viewer);
            }
        }
    }

    fn on_wheel(&mut self, viewer: &mut Viewer, delta_y: f64, now: f64) {
        if !viewer.config.mousewheel || delta_y == 0.0 {
            return;
        }

        if viewer.config.mousewheel_ctrl_key && !self.ctrl_key_down {
            self.ctrl_zoom_overlay = true;
            viewer.dispatch(ViewerEvent::ShowOverlay {
                id: CTRL_ZOOM_OVERLAY,
            });
            self.timers.set(TimerKey::CtrlZoomOverlay, now, CTRLZOOM_TIMEOUT);
            return;
        }

        let delta = delta_y.signum() * 5.0 * viewer.config.zoom_speed;
        if delta != 0.0 {
            viewer.dynamics.zoom.step(-delta, 5.0);
        }
    }

    fn on_fullscreen_change(&mut self, viewer: &mut Viewer, enabled: bool) {
        if viewer.config.keyboard == KeyboardMode::Fullscreen {
            if enabled {
                viewer.start_keyboard_control();
            } else {
                viewer.stop_keyboard_control();
            }
        }
        viewer.dispatch(ViewerEvent::Fullscreen { enabled });
    }

    fn cancel_long_touch(&mut self) {
        self.timers.clear(TimerKey::LongTouch);
        self.long_touch_at = None;
    }

    fn cancel_two_fingers_overlay(&mut self, viewer: &mut Viewer) {
        if viewer.config.touchmove_two_fingers {
            self.timers.clear(TimerKey::TwoFingersOverlay);
            if self.two_fingers_overlay {
                self.two_fingers_overlay = false;
                viewer.dispatch(ViewerEvent::HideOverlay {
                    id: TWO_FINGERS_OVERLAY,
                });
            }
        }
    }

    fn hide_ctrl_zoom_overlay(&mut self, viewer: &mut Viewer) {
        if self.ctrl_zoom_overlay {
            self.ctrl_zoom_overlay = false;
            viewer.dispatch(ViewerEvent::HideOverlay {
                id: CTRL_ZOOM_OVERLAY,
            });
        }
    }

    fn reset_move(&mut self) {
        self.step.reset();
        self.mouse_x = 0.0;
        self.mouse_y = 0.0;
        self.start_x = 0.0;
        self.start_y = 0.0;
    }

    fn start_move_zoom(&mut self, viewer: &mut Viewer, touches: &[Touch]) {
        viewer.stop_all();
        self.reset_move();
        let Some(touch_data) = TouchData::from_touches(touches) else {
            return;
        };
        self.step.set(StepFlag::Moving);
        self.accumulator_factor = viewer.config.move_inertia;
        self.pinch_dist = touch_data.distance;
        self.mouse_x = touch_data.center_x;
        self.mouse_y = touch_data.center_y;
    }

    /// Ends the gesture; a press that never crossed the move threshold is a click.
    fn stop_move(&mut self, viewer: &mut Viewer, x: f64, y: f64, rightclick: bool, now: f64) {
        if self.step.has(&[StepFlag::Click]) && !self.move_threshold_reached(viewer, x, y) {
            self.do_click(viewer, x, y, rightclick, now);
        }
        if viewer.config.move_inertia != 0.0 {
            self.accumulator_factor = viewer.config.move_inertia.sqrt();
        }
        self.reset_move();
        viewer.reset_idle_timer();
    }

    fn do_click(&mut self, viewer: &mut Viewer, x: f64, y: f64, rightclick: bool, now: f64) {
        let Some(data) = viewer.click_data(x, y, rightclick) else {
            return;
        };

        if !self.timers.is_set(TimerKey::DoubleClick) {
            viewer.dispatch(ViewerEvent::Click(data.clone()));
            self.dblclick_data = Some(data);
            self.timers.set(TimerKey::DoubleClick, now, DBLCLICK_DELAY);
        } else {
            let threshold = Self::move_threshold(viewer);
            if let Some(first) = self.dblclick_data.take() {
                if (first.client_x - data.client_x).abs() < threshold
                    && (first.client_y - data.client_y).abs() < threshold
                {
                    viewer.dispatch(ViewerEvent::DoubleClick(first));
                }
            }
            self.timers.clear(TimerKey::DoubleClick);
        }
    }

    fn move_threshold_reached(&self, viewer: &Viewer, x: f64, y: f64) -> bool {
        let threshold = Self::move_threshold(viewer);
        (x - self.start_x).abs() >= threshold || (y - self.start_y).abs() >= threshold
    }

    fn do_move(&mut self, viewer: &mut Viewer, x: f64, y: f64) {
        if self.step.has(&[StepFlag::Click]) && self.move_threshold_reached(viewer, x, y) {
            debug!("drag started at ({x}, {y})");
            let (start_x, start_y) = (self.start_x, self.start_y);
            viewer.stop_all();
            self.reset_move();
            self.step.set(StepFlag::Moving);
            self.mouse_x = start_x;
            self.mouse_y = start_y;
            self.accumulator_factor = viewer.config.move_inertia;
            // the move that crossed the threshold already counts
            self.accumulate_move(viewer, x, y);
        } else if self.step.has(&[StepFlag::Moving]) {
            self.accumulate_move(viewer, x, y);
        }
    }

    /// Adds the pointer motion since the last position to the pending camera delta.
    fn accumulate_move(&mut self, viewer: &mut Viewer, x: f64, y: f64) {
        let state = &viewer.state;
        let (sin, cos) = state.roll.sin_cos();
        let dx = x - self.mouse_x;
        let dy = y - self.mouse_y;
        let rotated_x = dx * cos - dy * sin;
        let rotated_y = dy * cos + dx * sin;

        if state.size.width > 0.0 && state.size.height > 0.0 {
            let move_speed = viewer.config.move_speed;
            let yaw = move_speed * (rotated_x / state.size.width) * state.h_fov.to_radians();
            let pitch = move_speed * (rotated_y / state.size.height) * state.v_fov.to_radians();
            viewer.move_delta.yaw += yaw;
            viewer.move_delta.pitch += pitch;
        }
        self.mouse_x = x;
        self.mouse_y = y;
    }

    /// Restarts pinch tracking from the fingers now down, so a finger joining or
    /// leaving does not read as motion.
    fn rebaseline_touches(&mut self, touches: &[Touch]) {
        if let Some(touch_data) = TouchData::from_touches(touches) {
            self.pinch_dist = touch_data.distance;
            self.mouse_x = touch_data.center_x;
            self.mouse_y = touch_data.center_y;
        }
    }

    fn do_move_zoom(&mut self, viewer: &mut Viewer, touches: &[Touch]) {
        if !self.step.has(&[StepFlag::Moving]) {
            return;
        }
        let Some(touch_data) = TouchData::from_touches(touches) else {
            return;
        };
        self.do_move(viewer, touch_data.center_x, touch_data.center_y);
        viewer.move_delta.zoom += viewer.config.zoom_speed
            * ((touch_data.distance - self.pinch_dist) / viewer.state.pixel_ratio);
        self.pinch_dist = touch_data.distance;
    }
}

impl Viewer {
    /// Builds the click payload for viewer point `(x, y)`, `None` when the sphere is not hit.
    pub(crate) fn click_data(&self, x: f64, y: f64, rightclick: bool) -> Option<ClickData> {
        let intersections = self.renderer.intersections(&self.state, x, y);
        let sphere = intersections.iter().find(|hit| hit.object.is_sphere)?;
        let position = vector3_to_spherical(sphere.point);

        let texture = self.state.texture.as_ref().and_then(|data| {
            self.adapter
                .spherical_to_texture_coords(position, data)
                .ok()
        });

        Some(ClickData {
            rightclick,
            client_x: x,
            client_y: y,
            viewer_x: x,
            viewer_y: y,
            yaw: position.yaw,
            pitch: position.pitch,
            texture_x: texture.map(|coords| coords.x),
            texture_y: texture.map(|coords| coords.y),
            objects: intersections
                .iter()
                .filter(|hit| !hit.object.is_sphere)
                .map(|hit| hit.object.id.clone())
                .collect(),
        })
    }
}
