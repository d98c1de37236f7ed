//! dlp_lib
#![deny(missing_docs)]

use anyhow::Result;
use docopt::Docopt;
use martian::prelude::*;
use serde::Deserialize;

const HEADER: &str = "# Copyright 2023 10x Genomics, Inc. All rights reserved.";

const USAGE: &str = "
DLP chip derivation stages
Usage:
  dlp_lib martian <adapter>...
  dlp_lib mro [--file=<filename>] [--rewrite]
  dlp_lib --help
Options:
     --help            Show this screen.
";

#[derive(Debug, Deserialize)]
struct Args {
    // Martian interface
    cmd_martian: bool,
    cmd_mro: bool,
    arg_adapter: Vec<String>,
    flag_file: Option<String>,
    flag_rewrite: bool,
}

fn main() -> Result<()> {
    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    let (stage_registry, mro_registry) =
        martian_stages![dlp_lib::stages::DeriveChipPools];

    if args.cmd_martian {
        // Stages log the derivation audit trail at info level.
        let adapter = MartianAdapter::new(stage_registry).log_level(LevelFilter::Info);
        let retcode = adapter.run(args.arg_adapter);
        std::process::exit(retcode);
    } else if args.cmd_mro {
        martian_make_mro(HEADER, args.flag_file, args.flag_rewrite, mro_registry)?;
    }
    Ok(())
}
