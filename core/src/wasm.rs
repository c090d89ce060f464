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

use std::mem;
use std::slice;
use std::str;

/// Allocates a buffer of `size` bytes for the embedder to write into.
#[no_mangle]
pub extern "C" fn tern_alloc(size: usize) -> *mut u8 {
    let mut buf = Vec::with_capacity(size);
    let ptr = buf.as_mut_ptr();
    mem::forget(buf);
    ptr
}

/// Deallocates a buffer obtained from `tern_alloc` or returned by
/// `tern_compile`.
#[no_mangle]
pub unsafe extern "C" fn tern_dealloc(ptr: *mut u8, size: usize) {
    let _ = Vec::from_raw_parts(ptr, 0, size);
}

/// Compiles Tern source text to a WASM module.
///
/// Input:
/// - input_ptr: Pointer to the UTF-8 source text.
/// - input_len: Length of the source text.
///
/// Output:
/// - Returns a pointer to a buffer laid out as
///   [status (u8)] [len (u32, little-endian)] [payload].
///   Status 0: the payload is the compiled module bytes.
///   Status 1: the payload is a UTF-8 error message.
/// - The caller is responsible for freeing this buffer via tern_dealloc
///   (size = len + 5).
///
/// # Safety
/// `input_ptr` must point to `input_len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn tern_compile(input_ptr: *mut u8, input_len: usize) -> *mut u8 {
    let input_slice = slice::from_raw_parts(input_ptr, input_len);
    let input_str = match str::from_utf8(input_slice) {
        Ok(s) => s,
        Err(_) => return make_response(1, b"invalid UTF-8 input"),
    };

    match crate::compile_source(input_str) {
        Ok(bytes) => make_response(0, &bytes),
        Err(e) => make_response(1, e.to_string().as_bytes()),
    }
}

unsafe fn make_response(status: u8, payload: &[u8]) -> *mut u8 {
    let len = payload.len() as u32;

    // Layout: [status (1 byte)] [len (4 bytes)] [payload...]
    let mut buf = Vec::with_capacity(5 + payload.len());
    buf.push(status);
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(payload);

    let ptr = buf.as_mut_ptr();
    mem::forget(buf);
    ptr
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn read_response(ptr: *mut u8) -> (u8, Vec<u8>) {
        let status = *ptr;
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(slice::from_raw_parts(ptr.add(1), 4));
        let len = u32::from_le_bytes(len_bytes) as usize;
        let payload = slice::from_raw_parts(ptr.add(5), len).to_vec();
        tern_dealloc(ptr, len + 5);
        (status, payload)
    }

    #[test]
    fn test_compile_roundtrip_through_raw_abi() {
        let source = "(add 1 2)";
        let mut input = source.as_bytes().to_vec();
        let (status, payload) =
            unsafe { read_response(tern_compile(input.as_mut_ptr(), input.len())) };
        assert_eq!(status, 0);
        assert_eq!(&payload[0..4], b"\0asm");
    }

    #[test]
    fn test_compile_error_reported_through_raw_abi() {
        let source = "(set! a 3)";
        let mut input = source.as_bytes().to_vec();
        let (status, payload) =
            unsafe { read_response(tern_compile(input.as_mut_ptr(), input.len())) };
        assert_eq!(status, 1);
        let message = String::from_utf8(payload).unwrap();
        assert!(message.contains("undeclared local"), "got: {}", message);
    }
}
