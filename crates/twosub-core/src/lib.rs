//! # twosub-core
//!
//! Canonical transcript model shared by all speech-recognition backends.
//!
//! Every backend, regardless of the shape or units of its native response,
//! is normalized into a [`StandardResult`]: full text, chronologically
//! ordered [`Word`]s, optional [`Sentence`] segments and an optional
//! language code. All timestamps are integer milliseconds.

#![deny(unsafe_code)]

pub mod transcript;

pub use transcript::{Sentence, StandardResult, Word, seconds_to_ms};
