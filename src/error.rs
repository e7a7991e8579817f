//! Typed failure kinds for construction and decode-start contracts.
//!
//! Internal fallible lookups (prefix tree misses, unknown words) never
//! surface here — they return neutral values (empty list, probability 0)
//! per the decoder's error handling contract. Only the failures below are
//! fatal for the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown language model type: {0:?} (expected one of Words, NGrams, NGramsForecast, NGramsForecastAndSample)")]
    UnknownLmType(String),

    #[error("wordChars must contain at least one character")]
    EmptyWordChars,

    #[error("wordChars must be a subset of chars: {0:?} does not appear in chars")]
    WordCharsNotSubset(char),

    #[error("beamWidth must be a positive integer")]
    ZeroBeamWidth,

    #[error("codepoint {0:?} appears in the corpus but not in chars")]
    OutOfAlphabet(char),

    #[error("matrix has {got} columns but chars implies {expected} (|chars| + 1)")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("i/o error loading or saving a language model: {0}")]
    Io(#[from] std::io::Error),

    #[error("language model (de)serialization failed: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;
