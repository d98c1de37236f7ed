// Warning groups (as of rust 1.55)
#![deny(
    future_incompatible,
    nonstandard_style,
    rust_2018_compatibility,
    rust_2021_compatibility,
    rust_2018_idioms,
    unused
)]
// Other warnings (as of rust 1.55)
#![deny(
    bindings_with_variant_name,
    confusable_idents,
    const_item_mutation,
    deprecated,
    drop_bounds,
    elided_lifetimes_in_paths,
    exported_private_dependencies,
    function_item_references,
    irrefutable_let_patterns,
    non_shorthand_field_patterns,
    renamed_and_removed_lints,
    stable_features,
    trivial_bounds,
    type_alias_bounds,
    unconditional_recursion,
    unknown_lints,
    unused_comparisons,
    while_true
)]

//! Tunables of the chip derivation, read from `parameters.toml` next to the
//! running executable. Every key is optional; missing keys keep their default.

use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use std::sync::OnceLock;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
struct Parameters {
    /// Rows and columns up to this value form the first half of the chip.
    /// 36 for the 72x72 DLP chip.
    chip_half_width: u32,
    /// Chip rows that are never processed: edge rows and the midline.
    skip_rows: Vec<u32>,
    /// Chip columns that are never processed.
    skip_columns: Vec<u32>,
    /// Chip column reserved for negative (no cell) controls.
    negative_control_column: u32,
    /// Chip column reserved for salt controls.
    salt_control_column: u32,
    /// Chip column reserved for germline controls.
    germline_control_column: u32,
    /// Prepended to the position-derived index key, e.g. `i7_10-i5_05`.
    index_key_prefix: String,
    /// Requested reads (millions) per aliquot in a pool.
    requested_reads_per_aliquot: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            chip_half_width: 36,
            skip_rows: vec![1, 2, 36, 37, 71, 72],
            skip_columns: vec![1, 2, 36, 37, 71, 72],
            negative_control_column: 3,
            salt_control_column: 4,
            germline_control_column: 5,
            index_key_prefix: String::new(),
            requested_reads_per_aliquot: 2.0,
        }
    }
}

fn default_parameters() -> &'static Parameters {
    static DEFAULT_PARAMETERS: OnceLock<Parameters> = OnceLock::new();
    DEFAULT_PARAMETERS.get_or_init(Parameters::default)
}

static PARAMETERS: OnceLock<Result<Parameters>> = OnceLock::new();

fn parse_parameters(contents: &str) -> Result<Parameters> {
    Ok(toml::from_str(contents)?)
}

/// Return a reference to the global parameters.
/// The parameters may need to be loaded; if loading fails, return Err.
fn parameters() -> &'static Result<Parameters> {
    PARAMETERS.get_or_init(|| {
        let path = std::env::current_exe()
            .context("Unable to locate the running executable")?
            .with_file_name("parameters.toml");
        if !path.exists() {
            warn!(
                "could not find parameters.toml at {}, falling back to defaults",
                path.display()
            );
            Ok(Parameters::default())
        } else {
            let s = std::fs::read_to_string(&path).with_context(|| path.display().to_string())?;
            parse_parameters(&s).with_context(|| path.display().to_string())
        }
    })
}

macro_rules! parameter_getter {
    ($a:ident, $t:ty) => {
        pub fn $a() -> Result<&'static $t> {
            let val = match parameters() {
                Err(e) => return Err(anyhow::anyhow!("{e:#}")),
                Ok(p) => &p.$a,
            };
            if default_parameters().$a != *val {
                warn!("using non-default {} = {:?}", stringify!($a), val);
            }
            Ok(val)
        }
    };
}

parameter_getter!(chip_half_width, u32);
parameter_getter!(skip_rows, Vec<u32>);
parameter_getter!(skip_columns, Vec<u32>);
parameter_getter!(negative_control_column, u32);
parameter_getter!(salt_control_column, u32);
parameter_getter!(germline_control_column, u32);
parameter_getter!(index_key_prefix, String);
parameter_getter!(requested_reads_per_aliquot, f64);
