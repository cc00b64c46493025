//! rollcall-speech — Spoken roll-number capture.
//!
//! A captured [`Utterance`](rollcall_hw::Utterance) is transcribed by an
//! [`SttBackend`] and the last word of the transcript is taken as the roll
//! number ("my roll number is 42" → `42`).

pub mod roll;
pub mod stt;

pub use roll::{extract_roll_number, recognize_roll, SpeechOutcome};
pub use stt::{HttpStt, SttBackend, SttError};
