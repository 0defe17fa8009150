#![no_main]

use codeq::query::{SearchType, init, parse, pipeline, string_human};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and planning may reject input but must never panic
    for search_type in SearchType::ALL {
        let _ = parse(data, search_type);
        if let Ok(plan) = pipeline(vec![init(data, search_type)]) {
            let _ = string_human(&plan.to_parse_tree());
        }
    }
    let _ = codeq::changeset::parse_text_search(data);
});
