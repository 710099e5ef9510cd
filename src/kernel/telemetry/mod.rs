//! Playback telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer.
//! It must **NEVER** be read inside decision logic (reducer, decode pipeline, transport).
//!
//! # PRIVACY INVARIANT
//! Telemetry events must **NEVER** contain audio or transcript text.
//! Only clip ordinals, counts and durations are allowed.

pub mod event;
pub mod metrics;
pub mod recorder;
