#![no_main]

use libfuzzer_sys::fuzz_target;
use url::Url;

use golf_buddy::reducer::{Reducer, RuleTables, normalize, prune};

fuzz_target!(|data: &[u8]| {
    // Convert raw bytes to string, handling invalid UTF-8 gracefully
    let html = String::from_utf8_lossy(data);
    let page = Url::parse("https://course.example/tee-times").unwrap();

    // The reducer should never panic and never exceed its budget
    let reduction = Reducer::new(RuleTables::default(), 512).reduce(&html, &page);
    assert!(reduction.text.len() <= 512);

    // A second prune over an already pruned tree changes nothing
    let doc = normalize(&html);
    prune(&doc);
    assert!(prune(&doc).is_noop());
});
