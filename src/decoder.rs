//! The per-matrix decode loop: classic CTC prefix search, constrained at
//! each word boundary by the dictionary and scored by the language model.

use std::sync::Arc;

use tracing::{debug_span, trace};

use crate::alphabet::Label;
use crate::beam::Beam;
use crate::beam_list::BeamList;
use crate::error::{Error, Result};
use crate::language_model::LanguageModel;
use crate::matrix::Matrix;

/// Decode one `matrix` (one time-major label-probability sequence) into its
/// most likely label sequence, constrained by `lm`'s dictionary and scored
/// by its language model.
pub fn decode(matrix: &dyn Matrix, beam_width: usize, lm: &Arc<LanguageModel>) -> Result<Vec<Label>> {
    if beam_width == 0 {
        return Err(Error::ZeroBeamWidth);
    }

    let num_labels = lm.alphabet().num_labels();
    let expected_cols = num_labels + 1;
    if matrix.cols() != expected_cols {
        return Err(Error::ShapeMismatch {
            expected: expected_cols,
            got: matrix.cols(),
        });
    }
    let blank = num_labels as usize;

    let mut last = BeamList::new();
    last.add(Beam::genesis(lm.clone()));

    for t in 0..matrix.rows() {
        let _span = debug_span!("timestep", t).entered();
        let mut curr = BeamList::new();

        for beam in last.best(beam_width) {
            let last_char = beam.text().last().copied();

            // Stay: no new label emitted this step, either by repeating the
            // trailing non-blank label or by emitting blank.
            let pr_non_blank_stay = match last_char {
                Some(c) => beam.pr_non_blank() * matrix.get_at(t, c as usize) as f64,
                None => 0.0,
            };
            let pr_blank_stay = beam.pr_total() * matrix.get_at(t, blank) as f64;
            curr.add(beam.create_child(pr_blank_stay, pr_non_blank_stay, None));

            // Extend: append every dictionary-legal next character. A
            // repeated label can only be reached by passing through blank,
            // so it draws from `pr_blank` alone to avoid double counting the
            // "stay on non-blank" path above.
            for c in beam.next_chars() {
                let pr = matrix.get_at(t, c as usize) as f64;
                let pr_non_blank = if Some(c) == last_char {
                    beam.pr_blank() * pr
                } else {
                    beam.pr_total() * pr
                };
                if pr_non_blank <= 0.0 {
                    continue;
                }
                curr.add(beam.create_child(0.0, pr_non_blank, Some(c)));
            }
        }

        last = curr;
        trace!(beams = last.len(), "timestep complete");
    }

    let mut winner = last
        .into_best(1)
        .pop()
        .expect("beam list always holds at least the genesis beam");
    winner.complete_text();
    Ok(winner.text().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language_model::{LanguageModelConfig, LanguageModelType};
    use crate::matrix::DenseMatrix;

    fn lm(mode: LanguageModelType) -> Arc<LanguageModel> {
        Arc::new(
            LanguageModelConfig {
                corpus: "this is a text. this and that.".to_string(),
                chars: "abcdefghijklmnopqrstuvwxyz., ".to_string(),
                word_chars: "abcdefghijklmnopqrstuvwxyz".to_string(),
                lm_type: mode,
                smoothing: 0.0,
                seed: 3,
            }
            .build()
            .unwrap(),
        )
    }

    fn peaked_matrix(lm: &LanguageModel, text: &str) -> DenseMatrix {
        let alpha = lm.alphabet().clone();
        let labels = alpha.str_to_labels(text).unwrap();
        let cols = alpha.num_labels() + 1;
        let mut data = Vec::new();
        for &c in &labels {
            let mut row = vec![0.01f32 / (cols as f32 - 1.0); cols];
            row[c as usize] = 0.99;
            data.extend(row);
        }
        DenseMatrix::new(labels.len(), cols, data).unwrap()
    }

    #[test]
    fn s3_decodes_dominant_path_to_dictionary_word() {
        let lm = lm(LanguageModelType::Words);
        let matrix = peaked_matrix(&lm, "this");
        let labels = decode(&matrix, 10, &lm).unwrap();
        assert_eq!(lm.alphabet().labels_to_string(&labels), "this");
    }

    #[test]
    fn rejects_zero_beam_width() {
        let lm = lm(LanguageModelType::Words);
        let matrix = peaked_matrix(&lm, "a");
        assert!(matches!(decode(&matrix, 0, &lm), Err(Error::ZeroBeamWidth)));
    }

    #[test]
    fn rejects_mismatched_matrix_shape() {
        let lm = lm(LanguageModelType::Words);
        let bad = DenseMatrix::new(1, 3, vec![0.3, 0.3, 0.4]).unwrap();
        assert!(matches!(
            decode(&bad, 5, &lm),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn decoding_is_deterministic_across_repeated_runs() {
        let lm = lm(LanguageModelType::NGrams);
        let matrix = peaked_matrix(&lm, "this");
        let first = decode(&matrix, 10, &lm).unwrap();
        let second = decode(&matrix, 10, &lm).unwrap();
        assert_eq!(first, second);
    }
}
