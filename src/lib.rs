pub mod error;
pub mod genotype;
pub mod individual;
pub mod minmax;
pub mod population;
pub mod problem;
pub mod rng;
pub mod sorting;
pub mod state;
pub mod strategy;

// Re-export commonly used types for convenience
pub use error::{OptionExt, Result, ResultExt, SynthError};
pub use individual::Individual;
pub use population::AgeLayeredPop;
pub use sorting::{DebSort, MergeSort, NondominatedSorter, SortOptions};
pub use state::{load_synth_state, SynthState};
