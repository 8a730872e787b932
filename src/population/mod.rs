//! # AgeLayeredPop
//!
//! A population split into age layers, layer 0 holding the youngest
//! individuals. Competition for survival happens inside a layer, which keeps
//! fresh genetic material from being swamped by older, better-tuned designs.

use std::collections::HashSet;

use tracing::debug;

use crate::genotype::Genotype;
use crate::individual::Individual;

#[derive(Debug, Clone)]
pub struct AgeLayeredPop<G: Genotype> {
    layers: Vec<Vec<Individual<G>>>,
}

impl<G: Genotype> AgeLayeredPop<G> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    pub fn from_layers(layers: Vec<Vec<Individual<G>>>) -> Self {
        Self { layers }
    }

    pub fn num_age_layers(&self) -> usize {
        self.layers.len()
    }

    /// Number of individuals over all layers.
    pub fn num_inds(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.num_inds() == 0
    }

    pub fn layer(&self, index: usize) -> Option<&[Individual<G>]> {
        self.layers.get(index).map(Vec::as_slice)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Vec<Individual<G>>> {
        self.layers.get_mut(index)
    }

    pub fn layers(&self) -> &[Vec<Individual<G>>] {
        &self.layers
    }

    /// Appends an older layer.
    pub fn push_layer(&mut self, layer: Vec<Individual<G>>) {
        self.layers.push(layer);
    }

    /// All individuals, layer by layer, each layer in its own order.
    pub fn flattened(&self) -> Vec<&Individual<G>> {
        self.layers.iter().flatten().collect()
    }

    /// Drops, within each layer, every individual whose worst-case metric
    /// signature equals that of an earlier individual in the same layer.
    ///
    /// Layers are deduplicated independently; the first occurrence is kept
    /// and relative order is preserved. Returns the number removed.
    pub fn uniquify_inds(&mut self) -> usize {
        let mut removed = 0;
        for (index, layer) in self.layers.iter_mut().enumerate() {
            let before = layer.len();
            let mut seen = HashSet::with_capacity(before);
            layer.retain(|ind| seen.insert(ind.worst_case_signature()));
            let dropped = before - layer.len();
            if dropped > 0 {
                debug!(layer = index, removed = dropped, "removed duplicate individuals");
            }
            removed += dropped;
        }
        removed
    }

    /// Ages every individual by one generation.
    pub fn increment_ages(&mut self) {
        for ind in self.layers.iter_mut().flatten() {
            ind.set_genetic_age(ind.genetic_age().saturating_add(1));
        }
    }
}

impl<G: Genotype> Default for AgeLayeredPop<G> {
    fn default() -> Self {
        Self::new()
    }
}
