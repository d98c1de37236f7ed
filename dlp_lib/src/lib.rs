// Warning groups (as of rust 1.55)
#![deny(
    future_incompatible,
    nonstandard_style,
    rust_2018_compatibility,
    rust_2021_compatibility,
    rust_2018_idioms,
    unused
)]

//! Derivation of DLP library aliquots and quadrant pools from a chip scan.

pub mod aliquot;
pub mod allocator;
pub mod assemble_pools;
pub mod derive_aliquots;
pub mod errors;
pub mod index_assigner;
pub mod run;
pub mod stages;

pub use aliquot::{AliquotKind, DerivedAliquot, SourceSample};
pub use errors::{DeriveErrors, PoolErrors};
pub use run::{derive_chip_pools, DerivationOutcome, DerivationSummary};
