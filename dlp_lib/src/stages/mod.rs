//! dlp_lib::stages

mod derive_chip_pools;

pub use derive_chip_pools::{
    DeriveChipPools, DeriveChipPoolsStageInputs, DeriveChipPoolsStageOutputs,
};
