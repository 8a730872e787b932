//! # Genotype Trait
//!
//! The ranking core never looks inside a genotype. Decoding a genotype into a
//! netlist, varying it and simulating it all happen outside this crate; here a
//! genotype only has to say who it is.
//!
//! ## Example
//!
//! ```rust
//! use paretosynth::genotype::Genotype;
//!
//! #[derive(Clone, Debug)]
//! struct TopologyChoice {
//!     id: u64,
//!     genes: Vec<u8>,
//! }
//!
//! impl Genotype for TopologyChoice {
//!     fn id(&self) -> u64 {
//!         self.id
//!     }
//! }
//! ```

use std::fmt::Debug;

/// Trait for the opaque design encoding carried by an
/// [`Individual`](crate::individual::Individual).
///
/// Types implementing this trait must also implement `Clone`, `Debug`, `Send`
/// and `Sync` so populations can be ranked in parallel. To checkpoint a
/// population, the genotype additionally has to implement `serde::Serialize`
/// and `serde::Deserialize`.
pub trait Genotype: Clone + Debug + Send + Sync {
    /// Returns the identity of this genotype.
    ///
    /// Two individuals are the same candidate iff their genotype ids match.
    fn id(&self) -> u64;
}
