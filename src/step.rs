// step.rs — gesture progress flags of the input state machine

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepFlag {
    /// A press happened and has not crossed the move threshold yet.
    Click,
    /// The pointer is dragging the view.
    Moving,
}

impl StepFlag {
    fn bit(self) -> u8 {
        match self {
            StepFlag::Click => 0b01,
            StepFlag::Moving => 0b10,
        }
    }
}

/// Set of [`StepFlag`]; empty means idle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Step(u8);

impl Step {
    pub const IDLE: Step = Step(0);

    /// True if any of `flags` is set.
    pub fn has(&self, flags: &[StepFlag]) -> bool {
        flags.iter().any(|flag| self.0 & flag.bit() != 0)
    }

    pub fn is_idle(&self) -> bool {
        self.0 == 0
    }

    /// Replaces the whole set with `flag`.
    pub fn set(&mut self, flag: StepFlag) {
        self.0 = flag.bit();
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }

    pub fn add(&mut self, flag: StepFlag) {
        self.0 |= flag.bit();
    }

    pub fn remove(&mut self, flag: StepFlag) {
        self.0 &= !flag.bit();
    }
}
