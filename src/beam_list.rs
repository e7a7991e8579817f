//! Aggregates the beams alive at one timestep, merging beams that share a
//! `text` and selecting the top-k survivors to seed the next timestep.

use ahash::AHashMap;

use crate::alphabet::Label;
use crate::beam::Beam;

#[derive(Default)]
pub struct BeamList {
    beams: Vec<Beam>,
    index: AHashMap<Vec<Label>, usize>,
}

impl BeamList {
    pub fn new() -> Self {
        Self {
            beams: Vec::new(),
            index: AHashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.beams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beams.is_empty()
    }

    /// Insert `beam`, merging its optical mass into an existing beam with
    /// the same `text` if one is already present.
    pub fn add(&mut self, beam: Beam) {
        if let Some(&idx) = self.index.get(beam.text()) {
            self.beams[idx].merge(&beam);
        } else {
            self.index.insert(beam.text().to_vec(), self.beams.len());
            self.beams.push(beam);
        }
    }

    /// The `k` highest-scoring beams, stable on ties (insertion order
    /// preserved for equal scores, since `sort_by` is a stable sort).
    pub fn best(&self, k: usize) -> Vec<&Beam> {
        let mut ranked: Vec<&Beam> = self.beams.iter().collect();
        ranked.sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap());
        ranked.truncate(k);
        ranked
    }

    pub fn into_best(mut self, k: usize) -> Vec<Beam> {
        self.beams
            .sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap());
        self.beams.truncate(k);
        self.beams
    }
}
