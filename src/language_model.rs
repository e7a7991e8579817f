//! Vocabulary, unigram/bigram probabilities with add-k smoothing, and the
//! word/non-word character classification used to constrain beam extensions.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::str::FromStr;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::alphabet::{Alphabet, Label};
use crate::error::{Error, Result};
use crate::trie::PrefixTree;

/// Interned word id. Stable only within one `LanguageModel` instance.
type WordId = u32;

/// Scoring mode, set at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageModelType {
    /// Constrain to dictionary only; no LM scoring (`prTextTotal = 1`).
    Words,
    /// Score a word's unigram/bigram probability when it completes.
    NGrams,
    /// As `NGrams`, plus lookahead over every completion of the in-progress word.
    NGramsForecast,
    /// As `NGramsForecast`, but sample at most 20 candidate completions.
    NGramsForecastAndSample,
}

impl LanguageModelType {
    pub fn uses_ngrams(self) -> bool {
        !matches!(self, LanguageModelType::Words)
    }

    pub fn forecasts(self) -> bool {
        matches!(
            self,
            LanguageModelType::NGramsForecast | LanguageModelType::NGramsForecastAndSample
        )
    }

    pub fn samples(self) -> bool {
        matches!(self, LanguageModelType::NGramsForecastAndSample)
    }
}

impl FromStr for LanguageModelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "words" => Ok(LanguageModelType::Words),
            "ngrams" => Ok(LanguageModelType::NGrams),
            "ngramsforecast" => Ok(LanguageModelType::NGramsForecast),
            "ngramsforecastandsample" => Ok(LanguageModelType::NGramsForecastAndSample),
            _ => Err(Error::UnknownLmType(s.to_string())),
        }
    }
}

/// Construction parameters for a [`LanguageModel`]: a plain data bag with a
/// `build` entry point rather than a long positional-argument constructor.
#[derive(Debug, Clone)]
pub struct LanguageModelConfig {
    pub corpus: String,
    pub chars: String,
    pub word_chars: String,
    pub lm_type: LanguageModelType,
    /// Add-k smoothing constant (`α ≥ 0`).
    pub smoothing: f64,
    /// Base seed for `NGramsForecastAndSample`'s deterministic sampling.
    pub seed: u64,
}

impl LanguageModelConfig {
    pub fn build(self) -> Result<LanguageModel> {
        LanguageModel::new(self)
    }
}

#[derive(Debug, Clone, Default)]
struct BigramRow {
    /// `count(w1) + α·|V|`, precomputed so unseen-w2 queries are O(1).
    denom: f64,
    probs: AHashMap<WordId, f64>,
}

#[derive(Debug)]
pub struct LanguageModel {
    alphabet: Alphabet,
    tree: PrefixTree,
    word_ids: AHashMap<Vec<Label>, WordId>,
    id_to_word: Vec<Vec<Label>>,
    unigrams: AHashMap<WordId, f64>,
    bigrams: AHashMap<WordId, BigramRow>,
    lm_type: LanguageModelType,
    smoothing: f64,
    seed: u64,
}

impl LanguageModel {
    fn new(config: LanguageModelConfig) -> Result<Self> {
        let alphabet = Alphabet::new(&config.chars, &config.word_chars)?;

        // Step 3: tokenize the corpus into words, preserving occurrence order
        // and multiplicity. Splitting happens on any non-word codepoint.
        let mut words: Vec<Vec<Label>> = Vec::new();
        let mut current: Vec<Label> = Vec::new();
        for c in config.corpus.chars() {
            let label = alphabet
                .str_to_labels(&c.to_string())
                .map_err(|_| Error::OutOfAlphabet(c))?[0];
            if alphabet.is_word_label(label) {
                current.push(label);
            } else if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            words.push(current);
        }

        // Step 4: insert each unique word into the prefix tree, assign ids.
        let mut tree = PrefixTree::new();
        let mut word_ids: AHashMap<Vec<Label>, WordId> = AHashMap::new();
        let mut id_to_word: Vec<Vec<Label>> = Vec::new();
        for w in &words {
            if !word_ids.contains_key(w) {
                tree.add_word(w);
                word_ids.insert(w.clone(), id_to_word.len() as WordId);
                id_to_word.push(w.clone());
            }
        }
        tree.finalize();

        let mut model = Self {
            alphabet,
            tree,
            word_ids,
            id_to_word,
            unigrams: AHashMap::new(),
            bigrams: AHashMap::new(),
            lm_type: config.lm_type,
            smoothing: config.smoothing,
            seed: config.seed,
        };

        if !config.lm_type.uses_ngrams() {
            return Ok(model);
        }

        model.fit_ngrams(&words);
        Ok(model)
    }

    fn fit_ngrams(&mut self, words: &[Vec<Label>]) {
        if words.is_empty() {
            return;
        }

        let total_words = words.len() as f64;
        let vocab_size = self.id_to_word.len() as f64;

        // Unigrams: count(w) / |words|.
        let mut unigram_counts: AHashMap<WordId, u64> = AHashMap::new();
        for w in words {
            let uid = self.word_ids[w];
            *unigram_counts.entry(uid).or_insert(0) += 1;
        }
        for (uid, count) in &unigram_counts {
            self.unigrams.insert(*uid, *count as f64 / total_words);
        }

        // Bigrams: raw counts over adjacent pairs, then add-k normalize.
        let mut raw_bigrams: AHashMap<WordId, AHashMap<WordId, f64>> = AHashMap::new();
        let mut transition_counts: AHashMap<WordId, f64> = AHashMap::new();
        for pair in words.windows(2) {
            let uid1 = self.word_ids[&pair[0]];
            let uid2 = self.word_ids[&pair[1]];
            *raw_bigrams.entry(uid1).or_default().entry(uid2).or_insert(0.0) += 1.0;
            *transition_counts.entry(uid1).or_insert(0.0) += 1.0;
        }

        let alpha = self.smoothing;
        for uid1 in 0..self.id_to_word.len() as WordId {
            let count_w1 = *transition_counts.get(&uid1).unwrap_or(&0.0);
            let denom = count_w1 + alpha * vocab_size;
            let mut row = BigramRow {
                denom,
                probs: AHashMap::new(),
            };
            if let Some(successors) = raw_bigrams.get(&uid1) {
                for (&uid2, &count) in successors {
                    if denom > 0.0 {
                        row.probs.insert(uid2, (count + alpha) / denom);
                    }
                }
            }
            self.bigrams.insert(uid1, row);
        }
    }

    pub fn lm_type(&self) -> LanguageModelType {
        self.lm_type
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn word_id(&self, word: &[Label]) -> Option<WordId> {
        self.word_ids.get(word).copied()
    }

    /// `0` if unknown, else the stored unigram probability.
    pub fn unigram_prob(&self, word: &[Label]) -> f64 {
        self.word_id(word)
            .and_then(|uid| self.unigrams.get(&uid))
            .copied()
            .unwrap_or(0.0)
    }

    /// Smoothed `P(w2 | w1)`, `0` if either word never occurred in the corpus.
    pub fn bigram_prob(&self, w1: &[Label], w2: &[Label]) -> f64 {
        let (Some(uid1), Some(uid2)) = (self.word_id(w1), self.word_id(w2)) else {
            return 0.0;
        };
        let Some(row) = self.bigrams.get(&uid1) else {
            return 0.0;
        };
        if let Some(&p) = row.probs.get(&uid2) {
            p
        } else if row.denom > 0.0 {
            self.smoothing / row.denom
        } else {
            0.0
        }
    }

    pub fn is_word(&self, text: &[Label]) -> bool {
        self.tree.is_word(text)
    }

    pub fn get_next_words(&self, text: &[Label]) -> Vec<Vec<Label>> {
        self.tree.get_next_words(text)
    }

    /// `tree.getNextChars(text)`, plus every non-word-label when `text` is
    /// empty or already a complete word (a word boundary is legal there).
    pub fn get_next_chars(&self, text: &[Label]) -> Vec<Label> {
        let mut res = self.tree.get_next_chars(text);
        if text.is_empty() || self.is_word(text) {
            res.extend(self.alphabet.non_word_labels().iter().copied());
        }
        res
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let snapshot = Snapshot::from(self);
        let file = File::create(path).map_err(Error::Io)?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, &snapshot).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(Error::Io)?;
        let reader = BufReader::new(file);
        let snapshot: Snapshot =
            bincode::deserialize_from(reader).map_err(|e| Error::Serialization(e.to_string()))?;
        snapshot.into_model()
    }
}

/// Serializable projection of a [`LanguageModel`]: stores the vocabulary and
/// normalized probability tables, and rebuilds the trie/alphabet on load
/// rather than trying to (de)serialize the `Mutex`-guarded trie directly.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    chars: String,
    word_chars: String,
    lm_type: LanguageModelType,
    smoothing: f64,
    seed: u64,
    words: Vec<Vec<Label>>,
    unigrams: Vec<(WordId, f64)>,
    bigrams: Vec<(WordId, f64, Vec<(WordId, f64)>)>,
}

impl From<&LanguageModel> for Snapshot {
    fn from(lm: &LanguageModel) -> Self {
        Self {
            chars: lm
                .alphabet
                .labels_to_string(&(0..lm.alphabet.num_labels() as Label).collect::<Vec<_>>()),
            word_chars: lm
                .alphabet
                .labels_to_string(&lm.alphabet.word_labels().iter().copied().collect::<Vec<_>>()),
            lm_type: lm.lm_type,
            smoothing: lm.smoothing,
            seed: lm.seed,
            words: lm.id_to_word.clone(),
            unigrams: lm.unigrams.iter().map(|(&k, &v)| (k, v)).collect(),
            bigrams: lm
                .bigrams
                .iter()
                .map(|(&uid, row)| {
                    (
                        uid,
                        row.denom,
                        row.probs.iter().map(|(&k, &v)| (k, v)).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl Snapshot {
    fn into_model(self) -> Result<LanguageModel> {
        let alphabet = Alphabet::new(&self.chars, &self.word_chars)?;
        let mut tree = PrefixTree::new();
        let mut word_ids = AHashMap::new();
        for (idx, w) in self.words.iter().enumerate() {
            tree.add_word(w);
            word_ids.insert(w.clone(), idx as WordId);
        }
        tree.finalize();

        let unigrams = self.unigrams.into_iter().collect();
        let bigrams = self
            .bigrams
            .into_iter()
            .map(|(uid, denom, probs)| {
                (
                    uid,
                    BigramRow {
                        denom,
                        probs: probs.into_iter().collect(),
                    },
                )
            })
            .collect();

        Ok(LanguageModel {
            alphabet,
            tree,
            word_ids,
            id_to_word: self.words,
            unigrams,
            bigrams,
            lm_type: self.lm_type,
            smoothing: self.smoothing,
            seed: self.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lm(mode: LanguageModelType) -> LanguageModel {
        LanguageModelConfig {
            corpus: "this is a text. this and that.".to_string(),
            chars: "abcdefghijklmnopqrstuvwxyz., ".to_string(),
            word_chars: "abcdefghijklmnopqrstuvwxyz".to_string(),
            lm_type: mode,
            smoothing: 0.0,
            seed: 42,
        }
        .build()
        .unwrap()
    }

    fn w(alpha: &Alphabet, s: &str) -> Vec<Label> {
        alpha.str_to_labels(s).unwrap()
    }

    #[test]
    fn s1_unigram_and_bigram_probabilities() {
        let model = lm(LanguageModelType::NGrams);
        let a = model.alphabet().clone();

        assert!((model.unigram_prob(&w(&a, "this")) - 2.0 / 7.0).abs() < 1e-9);
        assert_eq!(model.unigram_prob(&w(&a, "yyy")), 0.0);

        assert!((model.bigram_prob(&w(&a, "this"), &w(&a, "and")) - 0.5).abs() < 1e-9);
        assert_eq!(model.bigram_prob(&w(&a, "this"), &w(&a, "that")), 0.0);
    }

    #[test]
    fn words_mode_skips_ngram_fitting() {
        let model = lm(LanguageModelType::Words);
        let a = model.alphabet().clone();
        assert_eq!(model.unigram_prob(&w(&a, "this")), 0.0);
        assert_eq!(model.bigram_prob(&w(&a, "this"), &w(&a, "and")), 0.0);
        assert!(model.is_word(&w(&a, "this")));
    }

    #[test]
    fn unknown_w1_yields_zero_bigram_prob() {
        let model = lm(LanguageModelType::NGrams);
        let a = model.alphabet().clone();
        assert_eq!(model.bigram_prob(&w(&a, "yyy"), &w(&a, "this")), 0.0);
    }

    #[test]
    fn get_next_chars_appends_non_word_labels_at_boundaries() {
        let model = lm(LanguageModelType::Words);
        let a = model.alphabet().clone();
        // empty prefix: only whole-word starts plus boundary chars are legal
        let next_empty = model.get_next_chars(&[]);
        assert!(next_empty
            .iter()
            .any(|&l| model.alphabet().non_word_labels().contains(&l)));

        // mid-word: only tree edges, no boundary chars
        let th = w(&a, "th");
        let next_mid = model.get_next_chars(&th);
        assert!(next_mid
            .iter()
            .all(|&l| !model.alphabet().non_word_labels().contains(&l)));
    }

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!(
            "ngramsForecast".parse::<LanguageModelType>().unwrap(),
            LanguageModelType::NGramsForecast
        );
        assert!("bogus".parse::<LanguageModelType>().is_err());
    }

    #[test]
    fn save_and_load_round_trips_via_tempfile() {
        let model = lm(LanguageModelType::NGrams);
        let a = model.alphabet().clone();
        let mut path = std::env::temp_dir();
        path.push(format!("word_beam_search_test_{}.bincode", std::process::id()));
        model.save(&path).unwrap();
        let loaded = LanguageModel::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(
            loaded.unigram_prob(&w(&a, "this")),
            model.unigram_prob(&w(&a, "this"))
        );
        assert_eq!(
            loaded.bigram_prob(&w(&a, "this"), &w(&a, "and")),
            model.bigram_prob(&w(&a, "this"), &w(&a, "and"))
        );
    }
}
