// press_handler.rs — pairs press/release so a quick tap still lasts a minimum duration

pub const DEFAULT_PRESS_DELAY: f64 = 200.0;

/// Debounced press/release pairing.
///
/// A release arriving less than `delay` ms after the press is deferred until `delay`
/// has elapsed since the press; [`PressHandler::poll`] hands it out exactly once.
#[derive(Debug, Clone)]
pub struct PressHandler<T> {
    delay: f64,
    /// 0 means idle.
    time: f64,
    data: Option<T>,
    deferred_until: Option<f64>,
}

impl<T> Default for PressHandler<T> {
    fn default() -> Self {
        Self::new(DEFAULT_PRESS_DELAY)
    }
}

impl<T> PressHandler<T> {
    pub fn new(delay: f64) -> Self {
        Self {
            delay,
            time: 0.0,
            data: None,
            deferred_until: None,
        }
    }

    /// True while a press is recorded, released or not.
    pub fn pending(&self) -> bool {
        self.time != 0.0
    }

    pub fn down(&mut self, data: T, now: f64) {
        self.deferred_until = None;
        // keep 0 reserved for "idle"
        self.time = if now == 0.0 { f64::MIN_POSITIVE } else { now };
        self.data = Some(data);
    }

    /// Returns the payload if the release can be processed immediately.
    pub fn up(&mut self, now: f64) -> Option<T> {
        if !self.pending() || self.deferred_until.is_some() {
            return None;
        }
        if now - self.time < self.delay {
            self.deferred_until = Some(self.time + self.delay);
            None
        } else {
            self.release()
        }
    }

    /// Returns the payload of a deferred release once its window has elapsed.
    pub fn poll(&mut self, now: f64) -> Option<T> {
        match self.deferred_until {
            Some(deadline) if now >= deadline => self.release(),
            _ => None,
        }
    }

    fn release(&mut self) -> Option<T> {
        self.time = 0.0;
        self.deferred_until = None;
        self.data.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_release_is_deferred_until_delay() {
        let mut handler = PressHandler::new(200.0);
        handler.down("left", 1000.0);
        assert_eq!(handler.up(1050.0), None);
        assert!(handler.pending());

        assert_eq!(handler.poll(1100.0), None);
        assert_eq!(handler.poll(1199.0), None);
        assert_eq!(handler.poll(1200.0), Some("left"));
        assert_eq!(handler.poll(1300.0), None);
        assert!(!handler.pending());
    }

    #[test]
    fn slow_release_is_immediate() {
        let mut handler = PressHandler::new(200.0);
        handler.down(7, 1000.0);
        assert_eq!(handler.up(1250.0), Some(7));
        assert!(!handler.pending());
        assert_eq!(handler.poll(2000.0), None);
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut handler: PressHandler<u8> = PressHandler::default();
        assert_eq!(handler.up(500.0), None);
        assert_eq!(handler.poll(5000.0), None);
    }

    #[test]
    fn new_press_cancels_deferred_release() {
        let mut handler = PressHandler::new(200.0);
        handler.down(1, 1000.0);
        assert_eq!(handler.up(1010.0), None);
        handler.down(2, 1100.0);
        assert_eq!(handler.poll(1250.0), None);
        assert_eq!(handler.up(1400.0), Some(2));
    }

    #[test]
    fn double_release_fires_once() {
        let mut handler = PressHandler::new(200.0);
        handler.down('a', 0.0);
        assert_eq!(handler.up(10.0), None);
        assert_eq!(handler.up(20.0), None);
        assert_eq!(handler.poll(200.0), Some('a'));
        assert_eq!(handler.poll(400.0), None);
    }
}
