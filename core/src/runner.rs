/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * Wasmtime Runtime Execution for Tern Modules.
 *
 * The host-loader side of the compiler contract: instantiate the emitted
 * bytes, call an exported function with raw (untagged) float arguments,
 * and decode the returned bit pattern into the host-side tagged value.
 * Runtime traps, including indirect-call signature mismatches the
 * compiler deliberately does not prevent, surface here as errors.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 */

use crate::value::TaggedValue;
use thiserror::Error;
use wasmtime::{Engine, Linker, Module, Store, Val};

#[derive(Error, Debug)]
pub enum RunError {
    #[error("failed to load module: {0}")]
    Load(String),
    #[error("failed to instantiate: {0}")]
    Instantiate(String),
    #[error("no exported function named `{0}`")]
    MissingExport(String),
    #[error("execution trapped: {0}")]
    Trap(String),
    #[error("export `{0}` returned no value")]
    NoResult(String),
}

/// Instantiate `bytes` and call the export `name`. Arguments cross the
/// boundary as plain floats; only values computed inside the module carry
/// tags, so the result is decoded on the way out.
pub fn call_export(bytes: &[u8], name: &str, args: &[f64]) -> Result<TaggedValue, RunError> {
    let engine = Engine::default();
    let module =
        Module::from_binary(&engine, bytes).map_err(|e| RunError::Load(e.to_string()))?;

    // The language needs no imports; an empty linker satisfies every
    // module this compiler emits.
    let linker: Linker<()> = Linker::new(&engine);
    let mut store = Store::new(&engine, ());
    let instance = linker
        .instantiate(&mut store, &module)
        .map_err(|e| RunError::Instantiate(e.to_string()))?;

    let func = instance
        .get_func(&mut store, name)
        .ok_or_else(|| RunError::MissingExport(name.to_string()))?;

    let params: Vec<Val> = args.iter().map(|&a| Val::F64(a.to_bits())).collect();
    let result_count = func.ty(&store).results().len();
    let mut results = vec![Val::F64(0); result_count];
    func.call(&mut store, &params, &mut results)
        .map_err(|e| RunError::Trap(e.to_string()))?;

    match results.first() {
        Some(Val::F64(bits)) => Ok(TaggedValue::from_bits(*bits)),
        _ => Err(RunError::NoResult(name.to_string())),
    }
}

/// Run the conventional nullary entry point.
pub fn run_main(bytes: &[u8]) -> Result<TaggedValue, RunError> {
    call_export(bytes, "main", &[])
}
