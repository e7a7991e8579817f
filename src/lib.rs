//! Dictionary- and language-model-constrained CTC word beam search decoding.
//!
//! A [`LanguageModel`] owns the dictionary (as a [`trie::PrefixTree`]) and,
//! depending on its [`LanguageModelType`], unigram/bigram statistics fit
//! from a training corpus. [`decode`] runs one matrix of per-timestep label
//! probabilities through a beam search constrained to only ever spell
//! dictionary words, breaking optical ties with the language model's score.
//! [`batch::decode_batch`] fans the same language model out across many
//! matrices in parallel.

pub mod alphabet;
pub mod batch;
pub mod beam;
pub mod beam_list;
pub mod decoder;
pub mod error;
pub mod language_model;
pub mod matrix;
pub mod trie;

pub use alphabet::{Alphabet, Label};
pub use beam::Beam;
pub use beam_list::BeamList;
pub use decoder::decode;
pub use error::{Error, Result};
pub use language_model::{LanguageModel, LanguageModelConfig, LanguageModelType};
pub use matrix::{DenseMatrix, Matrix};
pub use trie::PrefixTree;
