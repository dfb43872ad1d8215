//! `robohand-perception` – turning human input into actuator intent.
//!
//! Both input modalities end in the same place: a
//! [`CommandVector`][robohand_types::CommandVector] handed to a
//! [`CommandSink`][robohand_types::CommandSink].
//!
//! # Modules
//!
//! - [`landmarks`] – [`HandLandmarks`][landmarks::HandLandmarks]: the 21-point
//!   hand model produced by the landmark engine.
//! - [`gesture`] – [`GestureNormalizer`][gesture::GestureNormalizer]:
//!   per-frame finger classification with a minimum send interval.
//! - [`voice`] – [`interpret`][voice::interpret]: ordered keyword matching
//!   from a transcript to a vector or a stop request, plus the
//!   [`RetryPolicy`][voice::RetryPolicy] for recognition failures.
//! - [`source`] – the [`LandmarkSource`][source::LandmarkSource] and
//!   [`TranscriptSource`][source::TranscriptSource] contracts for the
//!   external engines, with line-oriented replay implementations.

pub mod gesture;
pub mod landmarks;
pub mod source;
pub mod voice;

pub use gesture::{FrameResult, GestureNormalizer, SendThrottle, classify};
pub use landmarks::{HandLandmarks, Landmark};
pub use source::{FrameInput, LandmarkSource, TranscriptSource};
pub use voice::{RetryPolicy, VoiceCommand, interpret};
