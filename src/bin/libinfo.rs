// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Inspect the gate-library catalog parsed from a Liberty file.

use std::path::PathBuf;

use clap::Parser;
use libertydb::gate_library::GateLibrary;

#[derive(Parser, Debug)]
#[command(name = "libinfo", about = "Print the gate-library catalog parsed from a Liberty file")]
struct LibInfoArgs {
    /// Liberty (.lib) gate library path.
    liberty: PathBuf,

    /// Print one line per cell with its pins and directions.
    #[clap(long)]
    cells: bool,

    /// Dump the whole catalog as JSON to stdout.
    #[clap(long)]
    json: bool,
}

fn main() {
    clilog::init_stderr_color_debug();
    let args = LibInfoArgs::parse();

    let lib = match GateLibrary::parse_file(&args.liberty) {
        Ok(lib) => lib,
        Err(e) => {
            clilog::error!("cannot load {}: {}", args.liberty.display(), e);
            std::process::exit(1);
        }
    };

    clilog::info!("{}", lib.summary());

    if args.cells {
        for cell in &lib.gate_types {
            let mut pins = Vec::new();
            for (map, dir) in [
                (&lib.gate_to_input_map, "input"),
                (&lib.gate_to_inout_map, "inout"),
                (&lib.gate_to_output_map, "output"),
            ] {
                if let Some(names) = map.get(cell) {
                    for name in names {
                        pins.push(format!("{}:{}", name, dir));
                    }
                }
            }
            let mut tags = String::new();
            if lib.is_global_gnd(cell) {
                tags.push_str(" [tie-low]");
            }
            if lib.is_global_vcc(cell) {
                tags.push_str(" [tie-high]");
            }
            println!("{}{} {}", cell, tags, pins.join(" "));
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&lib).unwrap());
    }
}
