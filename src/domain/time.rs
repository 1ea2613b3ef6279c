// Pause / time-scale control and the simulated clock feeding the orbit model.

const SCALE_STEP: f64 = 2.0;
pub const MIN_TIME_SCALE: f64 = 0.125;
pub const MAX_TIME_SCALE: f64 = 64.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeCommand {
    Pause,
    Resume,
    Faster,
    Slower,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeControl {
    paused: bool,
    scale: f64,
}

impl Default for TimeControl {
    fn default() -> Self {
        Self {
            paused: false,
            scale: 1.0,
        }
    }
}

impl TimeControl {
    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn apply(&mut self, command: TimeCommand) {
        match command {
            TimeCommand::Pause => self.paused = true,
            TimeCommand::Resume => self.paused = false,
            TimeCommand::Faster => {
                self.scale = (self.scale * SCALE_STEP).clamp(MIN_TIME_SCALE, MAX_TIME_SCALE)
            }
            TimeCommand::Slower => {
                self.scale = (self.scale / SCALE_STEP).clamp(MIN_TIME_SCALE, MAX_TIME_SCALE)
            }
            TimeCommand::Reset => self.scale = 1.0,
        }
    }

    /// Real seconds -> scaled seconds, zero while paused.
    pub fn scaled(&self, real_seconds: f64) -> f64 {
        if self.paused {
            0.0
        } else {
            real_seconds * self.scale
        }
    }
}

/// Node-local simulated time. Not synchronised across nodes, which is why only the authority
/// evaluates time-driven models.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationClock {
    elapsed_seconds: f64,
    acceleration: f64,
    pub control: TimeControl,
}

impl SimulationClock {
    pub fn new(acceleration: f64) -> Self {
        Self {
            elapsed_seconds: 0.0,
            acceleration,
            control: TimeControl::default(),
        }
    }

    /// Simulated seconds since start.
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn advance(&mut self, real_seconds: f64) -> f64 {
        let step = self.control.scaled(real_seconds) * self.acceleration;
        self.elapsed_seconds += step;
        step
    }
}
