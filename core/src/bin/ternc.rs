/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Tern Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 *
 * 1. OPEN SOURCE: You may use this file under the terms of the GNU Affero
 * General Public License v3.0. If you link to this code, your ENTIRE
 * application must be open-sourced under AGPLv3.
 *
 * 2. COMMERCIAL: For proprietary use, you must obtain a Commercial License
 * from Sovereign Systems.
 *
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 * NO IMPLIED LICENSE to rights of Mohamad Al-Zawahreh or Sovereign Systems.
 */

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use tern_core::{compile_json, compile_source};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: ternc <program.tn> [-o <out.wasm>] [--json] [--hex] [--run]");
        process::exit(2);
    }

    let mut input: Option<String> = None;
    let mut output: Option<PathBuf> = None;
    let mut json = false;
    let mut hex = false;
    let mut run = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--json" => json = true,
            "--hex" => hex = true,
            "--run" => run = true,
            "-o" => {
                i += 1;
                match args.get(i) {
                    Some(path) => output = Some(PathBuf::from(path)),
                    None => {
                        eprintln!("-o requires a path");
                        process::exit(2);
                    }
                }
            }
            other => {
                if input.is_some() {
                    eprintln!("unexpected argument: {}", other);
                    process::exit(2);
                }
                input = Some(other.to_string());
            }
        }
        i += 1;
    }

    let input = match input {
        Some(path) => path,
        None => {
            eprintln!("no input file given");
            process::exit(2);
        }
    };

    let source = match fs::read_to_string(&input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {}", input, e);
            process::exit(1);
        }
    };

    let result = if json {
        compile_json(&source)
    } else {
        compile_source(&source)
    };
    let bytes = match result {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Compile Error: {}", e);
            process::exit(1);
        }
    };

    println!("Bytecode length: {}", bytes.len());
    if hex {
        hexdump(&bytes);
    }

    let out_path = output.unwrap_or_else(|| PathBuf::from(&input).with_extension("wasm"));
    if let Err(e) = fs::write(&out_path, &bytes) {
        eprintln!("Failed to write {}: {}", out_path.display(), e);
        process::exit(1);
    }
    println!("Wrote {}", out_path.display());

    if run {
        execute(&bytes);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn execute(bytes: &[u8]) {
    match tern_core::runner::run_main(bytes) {
        Ok(value) => println!("=> {}", value),
        Err(e) => {
            eprintln!("Execution Error: {}", e);
            process::exit(1);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn execute(_bytes: &[u8]) {
    eprintln!("--run is unavailable in wasm32 builds");
}

/// 16 bytes per row: offset, hex (split 8+8), ASCII gutter.
fn hexdump(buffer: &[u8]) {
    for (row, slice) in buffer.chunks(16).enumerate() {
        let mut hex = String::new();
        for (i, byte) in slice.iter().enumerate() {
            hex.push_str(&format!("{:02x} ", byte));
            if i == 7 {
                hex.push(' ');
            }
        }
        let chars: String = slice
            .iter()
            .map(|&b| if (32..127).contains(&b) { b as char } else { '.' })
            .collect();
        println!("{:08x}  {:<49} |{}|", row * 16, hex, chars);
    }
}
