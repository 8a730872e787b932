use std::sync::Arc;

use crate::genotype::Genotype;
use crate::individual::Individual;
use crate::minmax::MinMaxMetrics;
use crate::problem::{Analysis, AnalysisId, EnvPoint, EnvPointId, Metric, ProblemSetup};

#[derive(Debug, Clone)]
pub(crate) struct Design(pub(crate) u64);

impl Genotype for Design {
    fn id(&self) -> u64 {
        self.0
    }
}

/// Seven individuals over a maximized `f1` (feasible from 1.5) and a
/// minimized `f2` (feasible up to 10), ranked against fixed ranges.
pub(crate) fn scenario_population() -> (Vec<Individual<Design>>, MinMaxMetrics) {
    let problem = Arc::new(
        ProblemSetup::new(vec![Analysis::new(
            AnalysisId(0),
            vec![EnvPoint::new(EnvPointId(0))],
            vec![
                Metric::maximize("f1", 1.5, true),
                Metric::minimize("f2", 10.0, true),
            ],
        )])
        .unwrap(),
    );
    let raw = [(2.0, 1.0), (2.0, 3.0), (1.0, 4.0), (0.0, 5.0), (3.0, 4.0), (4.0, 3.0), (3.0, 2.0)];
    let population = raw
        .iter()
        .enumerate()
        .map(|(i, &(f1, f2))| {
            let mut ind = Individual::new(Design(i as u64), Arc::clone(&problem));
            ind.report_sim_request(AnalysisId(0), EnvPointId(0)).unwrap();
            ind.set_sim_results([("f1", f1), ("f2", f2)], AnalysisId(0), EnvPointId(0), None)
                .unwrap();
            ind
        })
        .collect();

    let mut minmax = MinMaxMetrics::new();
    minmax.insert("f1", 0.0, 4.0);
    minmax.insert("f2", 1.0, 5.0);
    (population, minmax)
}

/// Layers as sorted genotype ids.
pub(crate) fn layer_ids(population: &[Individual<Design>], layers: &[Vec<usize>]) -> Vec<Vec<u64>> {
    layers
        .iter()
        .map(|layer| {
            let mut ids: Vec<u64> = layer.iter().map(|&i| population[i].id()).collect();
            ids.sort_unstable();
            ids
        })
        .collect()
}
