//! Parallel decode over a batch of matrices sharing one language model.
//!
//! Per-matrix decoding is independent once the dictionary and n-gram tables
//! exist, so a batch fans out over `rayon`'s global pool; only the prefix
//! tree's depth-1 cache sees concurrent writers, and it is mutex-guarded for
//! exactly that reason (see [`crate::trie::PrefixTree`]).

use std::sync::Arc;

use rayon::prelude::*;

use crate::alphabet::Label;
use crate::decoder;
use crate::error::Result;
use crate::language_model::LanguageModel;
use crate::matrix::Matrix;

/// Decode every matrix in `batch` against `lm`, in parallel. The result
/// order matches `batch`'s order.
pub fn decode_batch(
    batch: &[Box<dyn Matrix + Sync>],
    beam_width: usize,
    lm: &Arc<LanguageModel>,
) -> Vec<Result<Vec<Label>>> {
    batch
        .par_iter()
        .map(|matrix| decoder::decode(matrix.as_ref(), beam_width, lm))
        .collect()
}
