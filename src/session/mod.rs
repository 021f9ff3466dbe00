// src/session/mod.rs — Client-side session lifecycle

pub mod controller;
pub mod driver;
pub mod liveness;
pub mod state;

pub use controller::{SessionController, SessionSnapshot, StartRequest};
pub use liveness::{LivenessDetector, LivenessEvent};
pub use state::SessionPhase;
