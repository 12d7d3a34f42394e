//! Engine state machine, kept free of GPU handles so hosts and tests can
//! reason about call ordering on its own.

use crate::error::EffectError;
use crate::types::{EngineState, FrameSize};

/// Outcome of a successful `configure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configured {
    pub size: FrameSize,
    /// False when the host re-announced the resolution already cached.
    pub changed: bool,
}

#[derive(Debug, Clone)]
pub struct FrameState {
    state: EngineState,
    size: Option<FrameSize>,
}

impl Default for FrameState {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameState {
    pub fn new() -> Self {
        Self {
            state: EngineState::Uninitialized,
            size: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn size(&self) -> Option<FrameSize> {
        self.size
    }

    /// Caches a new input resolution. A rejected call leaves the previous
    /// configuration untouched.
    pub fn configure(&mut self, width: i32, height: i32) -> Result<Configured, EffectError> {
        if self.state == EngineState::Released {
            return Err(EffectError::Released);
        }
        let size = FrameSize::new(width, height)?;
        let changed = self.size != Some(size);
        self.size = Some(size);
        self.state = EngineState::Configured;
        Ok(Configured { size, changed })
    }

    /// Returns the size frames must be drawn at, or why drawing is not allowed.
    pub fn begin_frame(&self) -> Result<FrameSize, EffectError> {
        match (self.state, self.size) {
            (EngineState::Released, _) => Err(EffectError::Released),
            (_, None) => Err(EffectError::NotConfigured),
            (_, Some(size)) => Ok(size),
        }
    }

    pub fn finish_frame(&mut self) {
        if self.state == EngineState::Configured {
            self.state = EngineState::Ready;
        }
    }

    /// Marks the engine released; returns false if it already was.
    pub fn release(&mut self) -> bool {
        if self.state == EngineState::Released {
            return false;
        }
        self.state = EngineState::Released;
        self.size = None;
        true
    }
}
