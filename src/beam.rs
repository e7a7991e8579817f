//! A single beam search hypothesis: its emitted label sequence plus the CTC
//! blank/non-blank optical mass and textual (LM) score that summarize the
//! paths collapsing to it.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::alphabet::Label;
use crate::language_model::LanguageModel;

/// Cap on lookahead completions considered per in-word character when
/// `NGramsForecastAndSample` is active.
const MAX_SAMPLE_SIZE: usize = 20;

#[derive(Clone)]
pub struct Beam {
    lm: Arc<LanguageModel>,
    text: Vec<Label>,
    word_dev: Vec<Label>,
    word_hist: Vec<Vec<Label>>,
    pr_blank: f64,
    pr_non_blank: f64,
    pr_text_total: f64,
    pr_text_unnormalized: f64,
}

impl Beam {
    /// The genesis beam: empty text, all optical mass on "blank so far".
    pub fn genesis(lm: Arc<LanguageModel>) -> Self {
        Self {
            lm,
            text: Vec::new(),
            word_dev: Vec::new(),
            word_hist: Vec::new(),
            pr_blank: 1.0,
            pr_non_blank: 0.0,
            pr_text_total: 1.0,
            pr_text_unnormalized: 1.0,
        }
    }

    pub fn text(&self) -> &[Label] {
        &self.text
    }

    pub fn pr_blank(&self) -> f64 {
        self.pr_blank
    }

    pub fn pr_non_blank(&self) -> f64 {
        self.pr_non_blank
    }

    pub fn pr_total(&self) -> f64 {
        self.pr_blank + self.pr_non_blank
    }

    pub fn pr_text_total(&self) -> f64 {
        self.pr_text_total
    }

    /// Ranking score: optical mass times textual score. Higher is better.
    pub fn score(&self) -> f64 {
        self.pr_total() * self.pr_text_total
    }

    /// Union of legal word-character extensions and, at a word boundary, the
    /// non-word-labels (delegates to the language model).
    pub fn next_chars(&self) -> Vec<Label> {
        self.lm.get_next_chars(&self.word_dev)
    }

    /// Clone this beam, optionally appending `new_char` and updating
    /// `text`/`word_dev`/textual score per the scoring mode, then assign the
    /// given optical probabilities.
    pub fn create_child(&self, pr_blank: f64, pr_non_blank: f64, new_char: Option<Label>) -> Beam {
        let mut child = self.clone();

        if let Some(c) = new_char {
            if self.lm.lm_type().uses_ngrams() {
                child.handle_ngrams(c);
            } else if self.lm.alphabet().is_word_label(c) {
                child.word_dev.push(c);
            } else {
                child.word_dev.clear();
            }
            child.text.push(c);
        }

        child.pr_blank = pr_blank;
        child.pr_non_blank = pr_non_blank;
        child
    }

    fn handle_ngrams(&mut self, new_char: Label) {
        if self.lm.alphabet().is_word_label(new_char) {
            self.word_dev.push(new_char);

            if self.lm.lm_type().forecasts() {
                let (sample_factor, next_words) = self.next_words_sampled();
                let num_words = self.word_hist.len();

                let mut sum = 0.0;
                if num_words == 0 {
                    for w in &next_words {
                        sum += self.lm.unigram_prob(w);
                    }
                } else {
                    let last_word = self.word_hist.last().unwrap();
                    for w in &next_words {
                        sum += self.lm.bigram_prob(last_word, w);
                    }
                }
                sum = (sum * sample_factor).min(1.0);

                self.pr_text_total = self.pr_text_unnormalized * sum;
                if num_words >= 1 {
                    self.pr_text_total = self.pr_text_total.powf(1.0 / (num_words as f64 + 1.0));
                }
            }
        } else if !self.word_dev.is_empty() {
            let finished = std::mem::take(&mut self.word_dev);
            self.word_hist.push(finished);
            let num_words = self.word_hist.len();

            if num_words == 1 {
                self.pr_text_unnormalized *= self.lm.unigram_prob(&self.word_hist[0]);
                self.pr_text_total = self.pr_text_unnormalized;
            } else {
                let w2 = self.word_hist[num_words - 1].clone();
                let w1 = self.word_hist[num_words - 2].clone();
                self.pr_text_unnormalized *= self.lm.bigram_prob(&w1, &w2);
                self.pr_text_total = self.pr_text_unnormalized.powf(1.0 / num_words as f64);
            }
        }
    }

    /// Next dictionary completions of the current `word_dev`, sampled down
    /// to `MAX_SAMPLE_SIZE` when the LM type samples; returns the scaling
    /// factor to compensate for the subset.
    fn next_words_sampled(&self) -> (f64, Vec<Vec<Label>>) {
        let mut next_words = self.lm.get_next_words(&self.word_dev);

        if !self.lm.lm_type().samples() || next_words.len() < MAX_SAMPLE_SIZE {
            return (1.0, next_words);
        }

        let factor = next_words.len() as f64 / MAX_SAMPLE_SIZE as f64;
        let mut rng = StdRng::seed_from_u64(derive_seed(self.lm.seed(), &self.word_dev));
        next_words.shuffle(&mut rng);
        next_words.truncate(MAX_SAMPLE_SIZE);
        (factor, next_words)
    }

    /// Sum two beams' optical mass when they share the same `text`. Textual
    /// score is untouched: identical `text` implies identical score.
    pub fn merge(&mut self, other: &Beam) {
        debug_assert_eq!(self.text, other.text);
        self.pr_blank += other.pr_blank;
        self.pr_non_blank += other.pr_non_blank;
    }

    /// If `word_dev` is non-empty and the dictionary has exactly one
    /// completion for it, replace the trailing `word_dev` in `text` with
    /// that completion. Otherwise leaves `text` unchanged.
    pub fn complete_text(&mut self) {
        if self.word_dev.is_empty() {
            return;
        }
        let next_words = self.lm.get_next_words(&self.word_dev);
        if let [completion] = next_words.as_slice() {
            let keep = self.text.len() - self.word_dev.len();
            self.text.truncate(keep);
            self.text.extend_from_slice(completion);
        }
    }
}

/// Deterministic FNV-1a style mixer over a label sequence and a base seed,
/// so repeated lookahead calls for the same beam state are reproducible
/// without threading a mutable RNG through beam clones.
fn derive_seed(base: u64, labels: &[Label]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut h = FNV_OFFSET ^ base;
    for &l in labels {
        h ^= l as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}
