//! Codepoint↔label bijection and the word-label / non-word-label partition.
//!
//! Labels are a dense space `{0 .. chars.len()-1}` seeded by the order
//! characters appear in the configured `chars` string; `chars.len()` itself
//! is reserved as the CTC blank by callers (it is never a valid entry here).

use ahash::{AHashMap, AHashSet};

use crate::error::{Error, Result};

/// Label type used throughout the crate. `u32` matches the matrix column
/// index space and keeps `Beam::text` compact.
pub type Label = u32;

#[derive(Debug, Clone)]
pub struct Alphabet {
    label_to_codepoint: Vec<char>,
    codepoint_to_label: AHashMap<char, Label>,
    word_labels: AHashSet<Label>,
    non_word_labels: AHashSet<Label>,
}

impl Alphabet {
    /// Build the bijection from `chars` and partition labels using `word_chars`.
    ///
    /// Errors if `word_chars` is empty or contains a character absent from
    /// `chars`.
    pub fn new(chars: &str, word_chars: &str) -> Result<Self> {
        let label_to_codepoint: Vec<char> = chars.chars().collect();
        let mut codepoint_to_label = AHashMap::with_capacity(label_to_codepoint.len());
        for (label, &cp) in label_to_codepoint.iter().enumerate() {
            codepoint_to_label.insert(cp, label as Label);
        }

        if word_chars.is_empty() {
            return Err(Error::EmptyWordChars);
        }

        let mut word_labels = AHashSet::default();
        for cp in word_chars.chars() {
            let label = *codepoint_to_label
                .get(&cp)
                .ok_or(Error::WordCharsNotSubset(cp))?;
            word_labels.insert(label);
        }

        let non_word_labels = (0..label_to_codepoint.len() as Label)
            .filter(|l| !word_labels.contains(l))
            .collect();

        Ok(Self {
            label_to_codepoint,
            codepoint_to_label,
            word_labels,
            non_word_labels,
        })
    }

    pub fn num_labels(&self) -> usize {
        self.label_to_codepoint.len()
    }

    pub fn is_word_label(&self, label: Label) -> bool {
        self.word_labels.contains(&label)
    }

    pub fn word_labels(&self) -> &AHashSet<Label> {
        &self.word_labels
    }

    pub fn non_word_labels(&self) -> &AHashSet<Label> {
        &self.non_word_labels
    }

    /// Decode a UTF-8 string to labels. Errors on a codepoint outside `chars`.
    pub fn str_to_labels(&self, s: &str) -> Result<Vec<Label>> {
        s.chars()
            .map(|c| {
                self.codepoint_to_label
                    .get(&c)
                    .copied()
                    .ok_or(Error::OutOfAlphabet(c))
            })
            .collect()
    }

    /// Encode labels back to a UTF-8 string. Labels outside the table are
    /// skipped (callers should only pass labels this alphabet produced).
    pub fn labels_to_string(&self, labels: &[Label]) -> String {
        labels
            .iter()
            .filter_map(|&l| self.label_to_codepoint.get(l as usize))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bijection_round_trips() {
        let alpha = Alphabet::new("abc., ", "abc").unwrap();
        let labels = alpha.str_to_labels("cab.").unwrap();
        assert_eq!(alpha.labels_to_string(&labels), "cab.");
    }

    #[test]
    fn partitions_word_and_non_word_labels() {
        let alpha = Alphabet::new("abc., ", "abc").unwrap();
        assert_eq!(alpha.word_labels().len(), 3);
        assert_eq!(alpha.non_word_labels().len(), 3);
        for l in 0..alpha.num_labels() as Label {
            assert_ne!(alpha.is_word_label(l), alpha.non_word_labels().contains(&l));
        }
    }

    #[test]
    fn rejects_empty_word_chars() {
        assert!(matches!(
            Alphabet::new("abc", ""),
            Err(Error::EmptyWordChars)
        ));
    }

    #[test]
    fn rejects_word_chars_outside_chars() {
        assert!(matches!(
            Alphabet::new("abc", "abz"),
            Err(Error::WordCharsNotSubset('z'))
        ));
    }

    #[test]
    fn rejects_out_of_alphabet_codepoint() {
        let alpha = Alphabet::new("abc", "abc").unwrap();
        assert!(matches!(
            alpha.str_to_labels("abz"),
            Err(Error::OutOfAlphabet('z'))
        ));
    }
}
