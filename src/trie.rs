//! Dictionary trie (prefix tree) over word-labels.
//!
//! Children are stored as an unsorted `Vec<(label, child)>` during
//! construction and sorted once by [`PrefixTree::finalize`] to enable binary
//! search; queries issued before `finalize` still work (linear scan) but are
//! not the supported path.

use std::collections::VecDeque;
use std::sync::Mutex;

use ahash::AHashMap;

use crate::alphabet::Label;

#[derive(Debug, Default)]
struct Node {
    children: Vec<(Label, Box<Node>)>,
    /// Set on the node reached after inserting a word; holds the full word
    /// so callers never need to reconstruct it from the path.
    word: Option<Vec<Label>>,
}

impl Node {
    fn find_child(&self, label: Label, sorted: bool) -> Option<&Node> {
        if sorted {
            self.children
                .binary_search_by_key(&label, |(l, _)| *l)
                .ok()
                .map(|idx| self.children[idx].1.as_ref())
        } else {
            self.children
                .iter()
                .find(|(l, _)| *l == label)
                .map(|(_, n)| n.as_ref())
        }
    }
}

/// Dictionary trie over word-labels.
#[derive(Debug)]
pub struct PrefixTree {
    root: Node,
    finalized: bool,
    /// Depth-1 memoization cache for `get_next_words`, keyed by the single
    /// label prefix. Guarded by a mutex so a `PrefixTree` shared behind an
    /// `Arc` across batch workers fills it safely.
    level1_cache: Mutex<AHashMap<Label, Vec<Vec<Label>>>>,
}

impl Default for PrefixTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixTree {
    pub fn new() -> Self {
        Self {
            root: Node::default(),
            finalized: false,
            level1_cache: Mutex::new(AHashMap::new()),
        }
    }

    /// Insert a word (sequence of word-labels), creating nodes as needed.
    pub fn add_word(&mut self, word: &[Label]) {
        let mut node = &mut self.root;
        for &label in word {
            let idx = node.children.iter().position(|(l, _)| *l == label);
            node = match idx {
                Some(i) => node.children[i].1.as_mut(),
                None => {
                    node.children.push((label, Box::new(Node::default())));
                    node.children.last_mut().unwrap().1.as_mut()
                }
            };
        }
        node.word = Some(word.to_vec());
    }

    /// Sort every node's children by label. Must be called once after all
    /// insertions and before any query.
    pub fn finalize(&mut self) {
        let mut queue: VecDeque<&mut Node> = VecDeque::new();
        queue.push_back(&mut self.root);
        while let Some(node) = queue.pop_front() {
            node.children.sort_by_key(|(l, _)| *l);
            for (_, child) in node.children.iter_mut() {
                queue.push_back(child.as_mut());
            }
        }
        self.finalized = true;
        self.level1_cache.lock().unwrap().clear();
    }

    fn get_node(&self, text: &[Label]) -> Option<&Node> {
        let mut node = &self.root;
        for &label in text {
            node = node.find_child(label, self.finalized)?;
        }
        Some(node)
    }

    /// `true` iff `text` ends on a node marked as a complete word.
    pub fn is_word(&self, text: &[Label]) -> bool {
        self.get_node(text)
            .map(|n| n.word.is_some())
            .unwrap_or(false)
    }

    /// Labels on the outgoing edges of the node reached by `text`; empty if
    /// `text` leaves the tree.
    pub fn get_next_chars(&self, text: &[Label]) -> Vec<Label> {
        match self.get_node(text) {
            Some(node) => node.children.iter().map(|(l, _)| *l).collect(),
            None => Vec::new(),
        }
    }

    /// Every complete word whose prefix is `text`, via breadth-first sweep
    /// under the node reached by `text`.
    pub fn get_next_words(&self, text: &[Label]) -> Vec<Vec<Label>> {
        let is_level1 = text.len() == 1;
        if is_level1 {
            if let Some(cached) = self.level1_cache.lock().unwrap().get(&text[0]) {
                return cached.clone();
            }
        }

        let start = match self.get_node(text) {
            Some(n) => n,
            None => return Vec::new(),
        };

        let mut res = Vec::new();
        let mut queue: VecDeque<&Node> = VecDeque::new();
        queue.push_back(start);
        while let Some(node) = queue.pop_front() {
            for (_, child) in node.children.iter() {
                queue.push_back(child.as_ref());
            }
            if let Some(word) = &node.word {
                res.push(word.clone());
            }
        }

        if is_level1 {
            self.level1_cache
                .lock()
                .unwrap()
                .insert(text[0], res.clone());
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(words: &[&[Label]]) -> PrefixTree {
        let mut tree = PrefixTree::new();
        for w in words {
            tree.add_word(w);
        }
        tree.finalize();
        tree
    }

    // label space: t=0 h=1 i=2 s=3 a=4 (arbitrary for unit test purposes)
    const T: Label = 0;
    const H: Label = 1;
    const I: Label = 2;
    const S: Label = 3;
    const A: Label = 4;

    #[test]
    fn s2_prefix_tree_queries() {
        let this: Vec<Label> = vec![T, H, I, S];
        let that: Vec<Label> = vec![T, H, A, T];
        let tree = build(&[&this, &that]);

        let mut next = tree.get_next_chars(&[T, H]);
        next.sort();
        assert_eq!(next, vec![A, I]);

        assert_eq!(tree.get_next_words(&[T, H, I]), vec![this.clone()]);
        assert!(tree.is_word(&that));
        assert!(!tree.is_word(&[T, H, I])); // "thi" is a prefix, not a word
    }

    #[test]
    fn empty_prefix_yields_no_edges() {
        let tree = PrefixTree::new();
        assert!(tree.get_next_chars(&[T]).is_empty());
        assert!(tree.get_next_words(&[T]).is_empty());
        assert!(!tree.is_word(&[T]));
    }

    #[test]
    fn get_next_words_enumerates_all_matching_prefix() {
        let hel: Vec<Label> = vec![H, I, S];
        let help: Vec<Label> = vec![H, I, S, S];
        let tree = build(&[&hel, &help]);
        let mut words = tree.get_next_words(&[H]);
        words.sort();
        let mut expected = vec![hel, help];
        expected.sort();
        assert_eq!(words, expected);
    }

    #[test]
    fn level1_cache_is_consistent_across_repeated_queries() {
        let this: Vec<Label> = vec![T, H, I, S];
        let tree = build(&[&this]);
        let first = tree.get_next_words(&[T]);
        let second = tree.get_next_words(&[T]);
        assert_eq!(first, second);
        assert_eq!(first, vec![this]);
    }
}
