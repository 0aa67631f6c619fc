// animation.rs — time-boxed interpolation of named values, driven by the frame clock

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::easing::Easing;

/// Current value of every animated property, keyed by name.
pub type AnimationValues = BTreeMap<&'static str, f64>;

pub type TickCallback = Box<dyn FnMut(&AnimationValues, f64)>;
type SettleCallback = Box<dyn FnOnce(bool)>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyRange {
    pub start: f64,
    pub end: f64,
}

pub struct AnimationOptions {
    pub properties: BTreeMap<&'static str, PropertyRange>,
    /// Milliseconds.
    pub duration: f64,
    /// Milliseconds before the first frame.
    pub delay: f64,
    pub easing: Easing,
    pub on_tick: Option<TickCallback>,
}

impl AnimationOptions {
    pub fn new(duration: f64) -> Self {
        Self {
            properties: BTreeMap::new(),
            duration,
            delay: 0.0,
            easing: Easing::Linear,
            on_tick: None,
        }
    }

    pub fn property(mut self, name: &'static str, start: f64, end: f64) -> Self {
        self.properties.insert(name, PropertyRange { start, end });
        self
    }

    pub fn delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn on_tick(mut self, on_tick: impl FnMut(&AnimationValues, f64) + 'static) -> Self {
        self.on_tick = Some(Box::new(on_tick));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    PendingDelay,
    Running,
    Resolved,
    Cancelled,
}

/// Values produced by one frame of an animation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTick {
    pub values: AnimationValues,
    pub progress: f64,
}

struct Inner {
    properties: BTreeMap<&'static str, PropertyRange>,
    duration: f64,
    delay: f64,
    easing: Easing,
    on_tick: Option<TickCallback>,
    state: AnimationState,
    armed_at: Option<f64>,
    start: Option<f64>,
    callbacks: Vec<SettleCallback>,
}

/// Cancelable animation handle. Clones share the same animation.
///
/// The owner calls [`Animation::advance`] once per frame. The animation settles exactly
/// once, either resolved (`then` receives `true`) or cancelled (`false`).
#[derive(Clone)]
pub struct Animation {
    inner: Rc<RefCell<Inner>>,
}

impl std::fmt::Debug for Animation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Animation")
            .field("state", &inner.state)
            .field("duration", &inner.duration)
            .field("properties", &inner.properties)
            .finish()
    }
}

impl Animation {
    pub fn new(options: AnimationOptions) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                properties: options.properties,
                duration: options.duration,
                delay: options.delay.max(0.0),
                easing: options.easing,
                on_tick: options.on_tick,
                state: AnimationState::PendingDelay,
                armed_at: None,
                start: None,
                callbacks: Vec::new(),
            })),
        }
    }

    /// A no-op animation, already resolved.
    pub fn resolved() -> Self {
        let animation = Self::new(AnimationOptions::new(0.0));
        animation.inner.borrow_mut().state = AnimationState::Resolved;
        animation
    }

    pub fn state(&self) -> AnimationState {
        self.inner.borrow().state
    }

    pub fn is_settled(&self) -> bool {
        matches!(
            self.state(),
            AnimationState::Resolved | AnimationState::Cancelled
        )
    }

    /// True if both handles point to the same animation.
    pub fn ptr_eq(&self, other: &Animation) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Runs one frame at timestamp `now` (ms).
    pub fn advance(&self, now: f64) -> Option<AnimationTick> {
        let (tick, done) = {
            let mut inner = self.inner.borrow_mut();
            match inner.state {
                AnimationState::Resolved | AnimationState::Cancelled => return None,
                AnimationState::PendingDelay => {
                    let armed_at = *inner.armed_at.get_or_insert(now);
                    if now - armed_at < inner.delay {
                        return None;
                    }
                    inner.state = AnimationState::Running;
                    inner.start = Some(now);
                }
                AnimationState::Running => {}
            }

            let start = inner.start.unwrap_or(now);
            let progress = if inner.duration > 0.0 {
                ((now - start) / inner.duration).max(0.0)
            } else {
                1.0
            };

            if progress < 1.0 {
                let eased = inner.easing.apply(progress);
                let values = inner
                    .properties
                    .iter()
                    .map(|(name, prop)| (*name, prop.start + (prop.end - prop.start) * eased))
                    .collect();
                (AnimationTick { values, progress }, false)
            } else {
                let values = inner
                    .properties
                    .iter()
                    .map(|(name, prop)| (*name, prop.end))
                    .collect();
                (
                    AnimationTick {
                        values,
                        progress: 1.0,
                    },
                    true,
                )
            }
        };

        // the callback may cancel this animation, it must run without a borrow held
        let on_tick = self.inner.borrow_mut().on_tick.take();
        if let Some(mut on_tick) = on_tick {
            on_tick(&tick.values, tick.progress);
            self.inner.borrow_mut().on_tick = Some(on_tick);
        }

        if done {
            self.settle(true);
        }
        Some(tick)
    }

    /// Registers a continuation receiving `true` when completed, `false` when cancelled.
    /// Fires immediately if the animation already settled.
    pub fn then(&self, callback: impl FnOnce(bool) + 'static) -> &Self {
        let settled = match self.state() {
            AnimationState::Resolved => Some(true),
            AnimationState::Cancelled => Some(false),
            _ => None,
        };
        match settled {
            Some(completed) => callback(completed),
            None => self.inner.borrow_mut().callbacks.push(Box::new(callback)),
        }
        self
    }

    /// Cancels the animation. No effect once settled.
    pub fn cancel(&self) {
        if !self.is_settled() {
            self.settle(false);
        }
    }

    fn settle(&self, completed: bool) {
        let callbacks = {
            let mut inner = self.inner.borrow_mut();
            if matches!(
                inner.state,
                AnimationState::Resolved | AnimationState::Cancelled
            ) {
                return;
            }
            inner.state = if completed {
                AnimationState::Resolved
            } else {
                AnimationState::Cancelled
            };
            inner.armed_at = None;
            std::mem::take(&mut inner.callbacks)
        };
        for callback in callbacks {
            callback(completed);
        }
    }
}
