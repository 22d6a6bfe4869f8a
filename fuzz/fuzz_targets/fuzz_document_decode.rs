// Copyright (c) 2026 Docanchor
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;

use docanchor::core::types::{decode_canonical_limited, Document, MAX_DOCUMENT_ENCODED_BYTES};

fuzz_target!(|data: &[u8]| {
    // Decoder robustness: arbitrary bytes must never panic or over-allocate.
    let _ = decode_canonical_limited::<Document>(data, MAX_DOCUMENT_ENCODED_BYTES);
});
