#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use refindex::index::codec::decode_bucket;
use refindex::index::store::verify_index;
use refindex::index::IndexKind;

#[derive(Debug, Arbitrary)]
struct IndexFiles {
    selector: u8,
    dict: Vec<u8>,
    postings: Vec<u8>,
}

fuzz_target!(|input: IndexFiles| {
    // Corrupt dictionaries and postings must fail cleanly, never panic
    let kind = IndexKind::ALL[input.selector as usize % IndexKind::ALL.len()];
    let _ = decode_bucket(kind, &input.postings);
    let _ = verify_index(kind, &input.dict, &input.postings);
});
