// viewer.rs — owns the camera state and drives it from input, animations and the frame clock

use log::{debug, info};

use crate::adapter::{CoordinateAdapter, EquirectangularAdapter, PanoData};
use crate::animation::{Animation, AnimationOptions, AnimationValues};
use crate::config::{AnimateOptions, KeyboardMode, TransitionEffect, TransitionOptions, ViewerConfig};
use crate::data_helper::{
    animation_properties, clean_position, fov_to_zoom_level, spherical_to_vector3, v_fov_to_h_fov,
    zoom_level_to_fov,
};
use crate::dynamics::{AxisChanges, ViewerDynamics};
use crate::easing::Easing;
use crate::error::{ConfigError, Result, ViewerError};
use crate::events::{EventBus, EventContext, EventKind, ListenerId, ViewerEvent};
use crate::events_handler::{EventsHandler, MoveDelta};
use crate::input::InputEvent;
use crate::scene::SceneRenderer;
use crate::state::{Position, Size, TransitionState, ViewerState};

/// Which transition to use when showing a new panorama.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Transition {
    /// `defaultTransition` from the config.
    #[default]
    Default,
    Disabled,
    Custom(TransitionOptions),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanoramaOptions {
    pub position: Option<Position>,
    pub zoom: Option<f64>,
    pub transition: Transition,
}

/// Identifies one `begin_load` call; only the latest ticket can finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    id: u64,
    pub path: String,
}

struct RunningAnimation {
    animation: Animation,
    position: bool,
    zoom: bool,
}

struct RunningTransition {
    animation: Animation,
    path: String,
    position: Option<Position>,
    zoom: Option<f64>,
    rotation: bool,
    /// Zoom follows the animation instead of jumping at mid transition.
    zoom_transition: bool,
}

/// The panorama viewer engine.
///
/// Single threaded and host clocked: the host forwards input through
/// [`Viewer::handle_input`] and calls [`Viewer::frame`] on every display refresh.
pub struct Viewer {
    pub(crate) config: ViewerConfig,
    pub(crate) state: ViewerState,
    pub(crate) dynamics: ViewerDynamics,
    pub(crate) move_delta: MoveDelta,
    pub(crate) renderer: Box<dyn SceneRenderer>,
    pub(crate) adapter: Box<dyn CoordinateAdapter>,
    events: EventBus,
    events_handler: EventsHandler,
    animation: Option<RunningAnimation>,
    transition: Option<RunningTransition>,
    load_id: u64,
    last_timestamp: Option<f64>,
    clock: f64,
}

impl Viewer {
    pub fn new(mut config: ViewerConfig, renderer: impl SceneRenderer + 'static) -> Result<Self, ConfigError> {
        config.validate()?;
        let dynamics = ViewerDynamics::new(&config)?;

        let mut viewer = Self {
            state: ViewerState {
                keyboard_enabled: config.keyboard == KeyboardMode::Always,
                fisheye: config.fisheye,
                ..Default::default()
            },
            config,
            dynamics,
            move_delta: MoveDelta::default(),
            renderer: Box::new(renderer),
            adapter: Box::new(EquirectangularAdapter),
            events: EventBus::default(),
            events_handler: EventsHandler::default(),
            animation: None,
            transition: None,
            load_id: 0,
            last_timestamp: None,
            clock: 0.0,
        };
        viewer.update_fov();
        viewer.state.direction = spherical_to_vector3(viewer.get_position());
        viewer.state.roll = viewer.dynamics.roll.current();
        Ok(viewer)
    }

    pub fn with_adapter(mut self, adapter: impl CoordinateAdapter + 'static) -> Self {
        self.adapter = Box::new(adapter);
        self
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    /// Gesture motion not yet applied to the camera.
    pub fn move_delta(&self) -> MoveDelta {
        self.move_delta
    }

    pub fn on(&mut self, kind: EventKind, listener: impl FnMut(&mut EventContext) + 'static) -> ListenerId {
        self.events.on(kind, listener)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub(crate) fn dispatch(&mut self, event: ViewerEvent) -> EventContext {
        self.events.dispatch(event)
    }

    pub fn handle_input(&mut self, event: InputEvent, now: f64) {
        self.clock = now;
        let mut handler = std::mem::take(&mut self.events_handler);
        handler.handle(self, event, now);
        self.events_handler = handler;
    }

    /// Runs one tick of the render loop. Returns true if the scene was rendered.
    pub fn frame(&mut self, now: f64) -> bool {
        self.clock = now;
        let elapsed = self.last_timestamp.map_or(0.0, |last| now - last);
        self.last_timestamp = Some(now);

        let mut handler = std::mem::take(&mut self.events_handler);
        handler.fire_timers(self, now);
        self.dispatch(ViewerEvent::BeforeRender {
            timestamp: now,
            elapsed,
        });
        handler.apply_move_delta(self);
        self.events_handler = handler;

        self.advance_animations(now);

        let changes = self.dynamics.update(elapsed);
        self.apply_changes(changes);

        if self.state.needs_update || self.state.continuous_update_count > 0 {
            self.state.needs_update = false;
            self.renderer.render(&self.state);
            self.dispatch(ViewerEvent::Render);
            true
        } else {
            false
        }
    }

    pub fn get_position(&self) -> Position {
        clean_position(Position::new(self.dynamics.yaw(), self.dynamics.pitch()))
    }

    pub fn get_zoom_level(&self) -> f64 {
        self.dynamics.zoom.current()
    }

    pub fn get_roll(&self) -> f64 {
        self.dynamics.roll.current()
    }

    pub fn get_size(&self) -> Size {
        self.state.size
    }

    /// Moves the camera immediately. Listeners of `BeforeRotate` may alter or cancel it.
    pub fn rotate(&mut self, position: Position) {
        let context = self.dispatch(ViewerEvent::BeforeRotate {
            position: clean_position(position),
        });
        if context.default_prevented() {
            return;
        }
        if let ViewerEvent::BeforeRotate { position } = context.event {
            let changed = self
                .dynamics
                .position
                .set_value([("yaw", position.yaw), ("pitch", position.pitch)]);
            self.apply_changes(AxisChanges {
                position: changed,
                ..Default::default()
            });
        }
    }

    /// Sets the zoom level (0 to 100) immediately.
    pub fn zoom(&mut self, level: f64) {
        let changed = self.dynamics.zoom.set_value(level);
        self.apply_changes(AxisChanges {
            zoom: changed,
            ..Default::default()
        });
    }

    pub fn zoom_in(&mut self, step: f64) {
        self.dynamics.zoom.step(step, 1.0);
    }

    pub fn zoom_out(&mut self, step: f64) {
        self.dynamics.zoom.step(-step, 1.0);
    }

    /// Tilts the camera, radians in `[-π, π]`.
    pub fn set_roll(&mut self, roll: f64) {
        let changed = self.dynamics.roll.set_value(roll);
        self.apply_changes(AxisChanges {
            roll: changed,
            ..Default::default()
        });
    }

    /// Rotates and/or zooms with an animation.
    ///
    /// Returns `Ok(None)` when a `BeforeAnimate` listener cancelled it, and an already
    /// resolved animation when the computed duration is 0.
    pub fn animate(&mut self, options: AnimateOptions) -> Result<Option<Animation>, ConfigError> {
        let context = self.dispatch(ViewerEvent::BeforeAnimate {
            options: AnimateOptions {
                position: options.position.map(clean_position),
                ..options
            },
        });
        if context.default_prevented() {
            return Ok(None);
        }
        let ViewerEvent::BeforeAnimate { options } = context.event else {
            return Ok(None);
        };

        let plan = animation_properties(
            &options.speed,
            self.get_position(),
            self.get_zoom_level(),
            options.position,
            options.zoom,
        )?;

        self.stop_all();

        if plan.duration == 0.0 {
            if let Some(position) = options.position {
                self.rotate(position);
            }
            if let Some(zoom) = options.zoom {
                self.zoom(zoom);
            }
            return Ok(Some(Animation::resolved()));
        }

        let animation_options = plan
            .properties
            .iter()
            .fold(
                AnimationOptions::new(plan.duration).easing(options.easing),
                |acc, &(name, start, end)| acc.property(name, start, end),
            );
        let animation = Animation::new(animation_options);
        self.animation = Some(RunningAnimation {
            animation: animation.clone(),
            position: options.position.is_some(),
            zoom: options.zoom.is_some(),
        });
        Ok(Some(animation))
    }

    /// Cancels the running animation, if any.
    pub fn stop_animation(&mut self) {
        if let Some(running) = self.animation.take() {
            running.animation.cancel();
            self.reset_idle_timer();
        }
    }

    /// Cancels every motion source: animation, transition and gesture inertia.
    pub fn stop_all(&mut self) {
        self.dispatch(ViewerEvent::StopAll);
        self.move_delta.clear();
        self.state.idle_time = None;
        self.stop_animation();
        if let Some(transition) = self.transition.take() {
            transition.animation.cancel();
            self.end_transition(transition, false);
        }
    }

    pub fn resize(&mut self, size: Size) {
        if size == self.state.size {
            return;
        }
        self.state.size = size;
        if size.height > 0.0 {
            self.state.aspect = size.width / size.height;
        }
        self.state.h_fov = v_fov_to_h_fov(self.state.v_fov, self.state.aspect);
        self.needs_update();
        self.dispatch(ViewerEvent::SizeUpdated { size });
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f64) {
        if pixel_ratio > 0.0 {
            self.state.pixel_ratio = pixel_ratio;
        }
    }

    /// Replaces the whole configuration, reacting to the options that changed.
    pub fn set_options(&mut self, mut config: ViewerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let old = std::mem::replace(&mut self.config, config);
        let new = &self.config;

        let mut changed = Vec::new();
        let mut check = |name: &'static str, differs: bool| {
            if differs {
                changed.push(name);
            }
        };
        check("minFov", old.min_fov != new.min_fov);
        check("maxFov", old.max_fov != new.max_fov);
        check("defaultZoomLvl", old.default_zoom_lvl != new.default_zoom_lvl);
        check("defaultYaw", old.default_yaw != new.default_yaw);
        check("defaultPitch", old.default_pitch != new.default_pitch);
        check("moveSpeed", old.move_speed != new.move_speed);
        check("zoomSpeed", old.zoom_speed != new.zoom_speed);
        check("moveInertia", old.move_inertia != new.move_inertia);
        check("mousewheel", old.mousewheel != new.mousewheel);
        check("mousemove", old.mousemove != new.mousemove);
        check("mousewheelCtrlKey", old.mousewheel_ctrl_key != new.mousewheel_ctrl_key);
        check("touchmoveTwoFingers", old.touchmove_two_fingers != new.touchmove_two_fingers);
        check("keyboard", old.keyboard != new.keyboard);
        check("keyboardActions", old.keyboard_actions != new.keyboard_actions);
        check("defaultTransition", old.default_transition != new.default_transition);
        check("fisheye", old.fisheye != new.fisheye);
        check("lang", old.lang != new.lang);

        if changed.contains(&"moveSpeed") || changed.contains(&"zoomSpeed") {
            self.dynamics.update_speeds(&self.config);
        }
        if changed.contains(&"minFov") || changed.contains(&"maxFov") {
            let level = fov_to_zoom_level(self.state.v_fov, self.config.min_fov, self.config.max_fov);
            self.dynamics.zoom.set_value(level);
            self.apply_changes(AxisChanges {
                zoom: true,
                ..Default::default()
            });
        }
        if changed.contains(&"fisheye") {
            self.state.fisheye = self.config.fisheye;
        }
        if changed.contains(&"keyboard") {
            if self.config.keyboard == KeyboardMode::Always {
                self.start_keyboard_control();
            } else {
                self.stop_keyboard_control();
            }
        }

        self.needs_update();
        self.dispatch(ViewerEvent::ConfigChanged { options: changed });
        Ok(())
    }

    pub fn start_keyboard_control(&mut self) {
        self.state.keyboard_enabled = true;
    }

    pub fn stop_keyboard_control(&mut self) {
        self.state.keyboard_enabled = false;
    }

    /// Requests a render on the next frame.
    pub fn needs_update(&mut self) {
        self.state.needs_update = true;
    }

    /// Requests (or releases a request for) a render on every frame.
    pub fn needs_continuous_update(&mut self, enabled: bool) {
        if enabled {
            self.state.continuous_update_count += 1;
        } else if self.state.continuous_update_count > 0 {
            self.state.continuous_update_count -= 1;
        }
    }

    pub fn reset_idle_timer(&mut self) {
        self.state.idle_time = Some(self.clock);
    }

    pub fn is_ready(&self) -> bool {
        self.state.ready
    }

    /// Starts loading a panorama. Any previous load is superseded and a running
    /// transition is cancelled.
    pub fn begin_load(&mut self, path: impl Into<String>) -> LoadTicket {
        let path = path.into();
        self.load_id += 1;
        if let Some(transition) = self.transition.take() {
            transition.animation.cancel();
            self.end_transition(transition, false);
        }
        self.reset_idle_timer();
        info!("loading panorama {path}");
        self.dispatch(ViewerEvent::PanoramaLoad { path: path.clone() });
        LoadTicket {
            id: self.load_id,
            path,
        }
    }

    /// Shows a loaded panorama.
    ///
    /// Returns the transition animation when one runs, `Ok(None)` when the panorama was
    /// swapped immediately, and [`ViewerError::Aborted`] when a newer load superseded this one.
    pub fn finish_load(
        &mut self,
        ticket: &LoadTicket,
        data: PanoData,
        options: PanoramaOptions,
    ) -> Result<Option<Animation>> {
        if ticket.id != self.load_id {
            debug!("load of {} superseded", ticket.path);
            return Err(ViewerError::Aborted);
        }

        let transition = match options.transition {
            Transition::Default => self.config.default_transition.clone(),
            Transition::Disabled => None,
            Transition::Custom(transition) => Some(transition),
        };
        if options.position.is_some() || options.zoom.is_some() {
            self.stop_all();
        }

        let transition = match transition {
            Some(transition) if self.state.ready && self.adapter.supports_transition() => transition,
            _ => {
                self.state.texture = Some(data);
                self.needs_update();
                if !self.state.ready {
                    self.state.ready = true;
                    self.dispatch(ViewerEvent::Ready);
                }
                info!("panorama {} loaded", ticket.path);
                self.dispatch(ViewerEvent::PanoramaLoaded {
                    path: ticket.path.clone(),
                });
                if let Some(zoom) = options.zoom {
                    self.zoom(zoom);
                }
                if let Some(position) = options.position {
                    self.rotate(position);
                }
                return Ok(None);
            }
        };

        self.dispatch(ViewerEvent::PanoramaLoaded {
            path: ticket.path.clone(),
        });

        let zoom_transition = transition.effect == TransitionEffect::Fade || transition.rotation;
        let context = self.dispatch(ViewerEvent::BeforeAnimate {
            options: AnimateOptions {
                position: options.position.map(clean_position),
                zoom: options.zoom,
                speed: transition.speed.clone(),
                easing: Easing::InOutCubic,
            },
        });
        let (position, zoom) = match context.event {
            ViewerEvent::BeforeAnimate { options } => (options.position, options.zoom),
            _ => (options.position, options.zoom),
        };

        let plan = animation_properties(
            &transition.speed,
            self.get_position(),
            self.get_zoom_level(),
            position.filter(|_| transition.rotation),
            zoom.filter(|_| zoom_transition),
        )?;
        let animation_options = plan.properties.iter().fold(
            AnimationOptions::new(plan.duration)
                .easing(Easing::InOutCubic)
                .property("opacity", 0.0, 1.0),
            |acc, &(name, start, end)| acc.property(name, start, end),
        );
        let animation = Animation::new(animation_options);

        self.state.transition = Some(TransitionState {
            effect: transition.effect,
            progress: 0.0,
            incoming: data,
        });
        self.transition = Some(RunningTransition {
            animation: animation.clone(),
            path: ticket.path.clone(),
            position,
            zoom,
            rotation: transition.rotation,
            zoom_transition,
        });
        self.needs_update();
        Ok(Some(animation))
    }

    fn advance_animations(&mut self, now: f64) {
        if let Some(running) = &self.animation {
            let animation = running.animation.clone();
            let (position, zoom) = (running.position, running.zoom);
            if let Some(tick) = animation.advance(now) {
                self.apply_animation_values(&tick.values, position, zoom);
            }
            if animation.is_settled() {
                self.animation = None;
                self.reset_idle_timer();
            }
        }

        if let Some(running) = &self.transition {
            let animation = running.animation.clone();
            let position = running.position.filter(|_| running.rotation);
            let zoom_transition = running.zoom_transition;
            let zoom = running.zoom;

            if let Some(tick) = animation.advance(now) {
                let progress = tick.values.get("opacity").copied().unwrap_or(tick.progress);
                let mut jump_zoom = false;
                if let Some(state) = self.state.transition.as_mut() {
                    state.progress = progress;
                    jump_zoom = state.effect != TransitionEffect::Fade && progress >= 0.5;
                }
                self.apply_animation_values(&tick.values, position.is_some(), zoom_transition && zoom.is_some());
                if let (Some(level), true, false) = (zoom, jump_zoom, zoom_transition) {
                    self.zoom(level);
                }
                self.needs_update();
            }
            if animation.is_settled() {
                if let Some(transition) = self.transition.take() {
                    let completed = animation.state() == crate::animation::AnimationState::Resolved;
                    self.end_transition(transition, completed);
                }
            }
        }
    }

    fn end_transition(&mut self, transition: RunningTransition, completed: bool) {
        if let Some(state) = self.state.transition.take() {
            if completed {
                self.state.texture = Some(state.incoming);
                info!("transition to {} done", transition.path);
                if let (Some(position), false) = (transition.position, transition.rotation) {
                    self.rotate(position);
                }
            }
        }
        self.needs_update();
        self.dispatch(ViewerEvent::TransitionDone { completed });
    }

    fn apply_animation_values(&mut self, values: &AnimationValues, position: bool, zoom: bool) {
        let mut changes = AxisChanges::default();
        if position {
            if let (Some(yaw), Some(pitch)) = (values.get("yaw"), values.get("pitch")) {
                changes.position = self
                    .dynamics
                    .position
                    .set_value([("yaw", *yaw), ("pitch", *pitch)]);
            }
        }
        if zoom {
            if let Some(level) = values.get("zoom") {
                changes.zoom = self.dynamics.zoom.set_value(*level);
            }
        }
        self.apply_changes(changes);
    }

    fn update_fov(&mut self) {
        self.state.v_fov = zoom_level_to_fov(
            self.dynamics.zoom.current(),
            self.config.min_fov,
            self.config.max_fov,
        );
        self.state.h_fov = v_fov_to_h_fov(self.state.v_fov, self.state.aspect);
    }

    /// Mirrors moved axes into the view state and announces them.
    fn apply_changes(&mut self, changes: AxisChanges) {
        if changes.zoom {
            self.update_fov();
            self.needs_update();
            self.dispatch(ViewerEvent::ZoomUpdated {
                zoom_level: self.get_zoom_level(),
            });
        }
        if changes.position {
            let position = self.get_position();
            self.state.direction = spherical_to_vector3(position);
            self.needs_update();
            self.dispatch(ViewerEvent::PositionUpdated { position });
        }
        if changes.roll {
            self.state.roll = self.dynamics.roll.current();
            self.needs_update();
            self.dispatch(ViewerEvent::RollUpdated {
                roll: self.state.roll,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationState;
    use crate::scene::SphereRaycaster;
    use std::cell::RefCell;
    use std::f64::consts::PI;
    use std::rc::Rc;

    fn viewer() -> Viewer {
        let mut viewer = Viewer::new(ViewerConfig::default(), SphereRaycaster::default()).unwrap();
        viewer.resize(Size {
            width: 800.0,
            height: 600.0,
        });
        viewer
    }

    fn record(viewer: &mut Viewer, kind: EventKind) -> Rc<RefCell<Vec<ViewerEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        viewer.on(kind, move |ctx| sink.borrow_mut().push(ctx.event.clone()));
        events
    }

    #[test]
    fn initial_state_follows_config() {
        let viewer = viewer();
        assert_eq!(viewer.get_zoom_level(), 50.0);
        assert_eq!(viewer.state().v_fov, 60.0);
        assert!((viewer.state().aspect - 4.0 / 3.0).abs() < 1e-12);
        assert!(viewer.state().h_fov > 60.0);
        assert!(!viewer.state().keyboard_enabled);
    }

    #[test]
    fn renders_only_when_needed() {
        let mut viewer = viewer();
        let renders = record(&mut viewer, EventKind::Render);
        assert!(viewer.frame(0.0));
        assert!(!viewer.frame(16.0));
        viewer.needs_continuous_update(true);
        assert!(viewer.frame(32.0));
        assert!(viewer.frame(48.0));
        viewer.needs_continuous_update(false);
        viewer.needs_continuous_update(false);
        assert_eq!(viewer.state().continuous_update_count, 0);
        assert!(!viewer.frame(64.0));
        assert_eq!(renders.borrow().len(), 3);
    }

    #[test]
    fn before_render_reports_elapsed() {
        let mut viewer = viewer();
        let events = record(&mut viewer, EventKind::BeforeRender);
        viewer.frame(100.0);
        viewer.frame(116.0);
        assert_eq!(
            *events.borrow(),
            vec![
                ViewerEvent::BeforeRender {
                    timestamp: 100.0,
                    elapsed: 0.0
                },
                ViewerEvent::BeforeRender {
                    timestamp: 116.0,
                    elapsed: 16.0
                },
            ]
        );
    }

    #[test]
    fn rotate_can_be_prevented_or_edited() {
        let mut viewer = viewer();
        let updates = record(&mut viewer, EventKind::PositionUpdated);
        viewer.rotate(Position::new(1.0, 0.5));
        assert_eq!(viewer.get_position(), Position::new(1.0, 0.5));
        assert_eq!(updates.borrow().len(), 1);

        let id = viewer.on(EventKind::BeforeRotate, |ctx| ctx.prevent_default());
        viewer.rotate(Position::new(2.0, 0.0));
        assert_eq!(viewer.get_position(), Position::new(1.0, 0.5));
        viewer.off(id);

        viewer.on(EventKind::BeforeRotate, |ctx| {
            if let ViewerEvent::BeforeRotate { position } = &mut ctx.event {
                position.pitch = 0.0;
            }
        });
        viewer.rotate(Position::new(2.0, 1.0));
        assert_eq!(viewer.get_position(), Position::new(2.0, 0.0));
    }

    #[test]
    fn zoom_updates_fov() {
        let mut viewer = viewer();
        let events = record(&mut viewer, EventKind::ZoomUpdated);
        viewer.zoom(100.0);
        assert_eq!(viewer.state().v_fov, 30.0);
        viewer.zoom(100.0);
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn zoom_in_seeks_over_frames() {
        let mut viewer = viewer();
        viewer.zoom_in(10.0);
        assert_eq!(viewer.get_zoom_level(), 50.0);
        let mut now = 0.0;
        for _ in 0..200 {
            viewer.frame(now);
            now += 16.0;
        }
        assert!(viewer.get_zoom_level() > 50.0);
        assert!(viewer.get_zoom_level() <= 60.0);
    }

    #[test]
    fn animate_reaches_target() {
        let mut viewer = viewer();
        let animation = viewer
            .animate(
                AnimateOptions::new(1000.0)
                    .position(Position::new(PI, 0.3))
                    .zoom(80.0),
            )
            .unwrap()
            .unwrap();
        let done = Rc::new(RefCell::new(None));
        let sink = done.clone();
        animation.then(move |completed| *sink.borrow_mut() = Some(completed));

        let mut now = 0.0;
        while now <= 1100.0 {
            viewer.frame(now);
            now += 16.0;
        }
        assert_eq!(*done.borrow(), Some(true));
        assert!((viewer.get_position().yaw - PI).abs() < 1e-9);
        assert!((viewer.get_position().pitch - 0.3).abs() < 1e-9);
        assert_eq!(viewer.get_zoom_level(), 80.0);
        assert!(viewer.state().idle_time.is_some());
    }

    #[test]
    fn animate_can_be_cancelled_by_listener() {
        let mut viewer = viewer();
        viewer.on(EventKind::BeforeAnimate, |ctx| ctx.prevent_default());
        let result = viewer.animate(AnimateOptions::new(500.0).zoom(10.0)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn zero_duration_animation_applies_immediately() {
        let mut viewer = viewer();
        let animation = viewer
            .animate(AnimateOptions::new(0.0).zoom(10.0))
            .unwrap()
            .unwrap();
        assert_eq!(animation.state(), AnimationState::Resolved);
        assert_eq!(viewer.get_zoom_level(), 10.0);
    }

    #[test]
    fn invalid_speed_is_reported_without_stopping() {
        let mut viewer = viewer();
        let running = viewer
            .animate(AnimateOptions::new(1000.0).zoom(90.0))
            .unwrap()
            .unwrap();
        let err = viewer
            .animate(AnimateOptions::new("12 knots").zoom(10.0))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSpeedUnit(_)));
        assert_eq!(running.state(), AnimationState::PendingDelay);
    }

    #[test]
    fn stop_all_cancels_animation() {
        let mut viewer = viewer();
        let stops = record(&mut viewer, EventKind::StopAll);
        let animation = viewer
            .animate(AnimateOptions::new(1000.0).zoom(90.0))
            .unwrap()
            .unwrap();
        viewer.frame(0.0);
        viewer.frame(100.0);
        viewer.stop_all();
        assert_eq!(animation.state(), AnimationState::Cancelled);
        assert_eq!(stops.borrow().len(), 2);
        let level = viewer.get_zoom_level();
        viewer.frame(200.0);
        assert_eq!(viewer.get_zoom_level(), level);
    }

    #[test]
    fn set_options_reacts_to_changes() {
        let mut viewer = viewer();
        let changes = record(&mut viewer, EventKind::ConfigChanged);
        let config = ViewerConfig {
            keyboard: KeyboardMode::Always,
            min_fov: 10.0,
            ..viewer.config().clone()
        };
        viewer.set_options(config).unwrap();
        assert!(viewer.state().keyboard_enabled);
        assert_eq!(
            *changes.borrow(),
            vec![ViewerEvent::ConfigChanged {
                options: vec!["minFov", "keyboard"]
            }]
        );
        // the field of view is kept, the level adapts to the new range
        assert!((viewer.state().v_fov - 60.0).abs() < 1.0);
        assert_eq!(viewer.get_zoom_level(), 37.0);
    }

    #[test]
    fn first_load_is_immediate() {
        let mut viewer = viewer();
        let ready = record(&mut viewer, EventKind::Ready);
        let ticket = viewer.begin_load("a.jpg");
        let result = viewer
            .finish_load(
                &ticket,
                PanoData::merge(2000, 1000, None),
                PanoramaOptions {
                    zoom: Some(20.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(result.is_none());
        assert!(viewer.is_ready());
        assert_eq!(ready.borrow().len(), 1);
        assert_eq!(viewer.get_zoom_level(), 20.0);
    }

    #[test]
    fn superseded_load_is_aborted() {
        let mut viewer = viewer();
        let first = viewer.begin_load("a.jpg");
        let second = viewer.begin_load("b.jpg");
        let err = viewer
            .finish_load(&first, PanoData::merge(2000, 1000, None), PanoramaOptions::default())
            .unwrap_err();
        assert!(err.is_abort());
        assert!(viewer
            .finish_load(&second, PanoData::merge(2000, 1000, None), PanoramaOptions::default())
            .is_ok());
    }

    #[test]
    fn transition_fades_in_next_panorama() {
        let mut viewer = viewer();
        let ticket = viewer.begin_load("a.jpg");
        viewer
            .finish_load(&ticket, PanoData::merge(2000, 1000, None), PanoramaOptions::default())
            .unwrap();
        let done = record(&mut viewer, EventKind::TransitionDone);

        let ticket = viewer.begin_load("b.jpg");
        let next = PanoData::merge(4000, 2000, None);
        let animation = viewer
            .finish_load(
                &ticket,
                next,
                PanoramaOptions {
                    position: Some(Position::new(1.0, 0.0)),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        viewer.frame(0.0);
        viewer.frame(750.0);
        let progress = viewer.state().transition.as_ref().unwrap().progress;
        assert!(progress > 0.0 && progress < 1.0);
        viewer.frame(1600.0);

        assert_eq!(animation.state(), AnimationState::Resolved);
        assert!(viewer.state().transition.is_none());
        assert_eq!(viewer.state().texture, Some(next));
        assert!((viewer.get_position().yaw - 1.0).abs() < 1e-9);
        assert_eq!(
            *done.borrow(),
            vec![ViewerEvent::TransitionDone { completed: true }]
        );
    }

    #[test]
    fn new_load_cancels_transition() {
        let mut viewer = viewer();
        let ticket = viewer.begin_load("a.jpg");
        viewer
            .finish_load(&ticket, PanoData::merge(2000, 1000, None), PanoramaOptions::default())
            .unwrap();
        let ticket = viewer.begin_load("b.jpg");
        let animation = viewer
            .finish_load(&ticket, PanoData::merge(4000, 2000, None), PanoramaOptions::default())
            .unwrap()
            .unwrap();
        let done = record(&mut viewer, EventKind::TransitionDone);
        viewer.begin_load("c.jpg");
        assert_eq!(animation.state(), AnimationState::Cancelled);
        assert_eq!(
            *done.borrow(),
            vec![ViewerEvent::TransitionDone { completed: false }]
        );
        assert_eq!(viewer.state().texture, Some(PanoData::merge(2000, 1000, None)));
    }
}
