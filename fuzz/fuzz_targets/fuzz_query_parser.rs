#![no_main]

use libfuzzer_sys::fuzz_target;
use zkgen_core::query::{parse_query, Planner};
use zkgen_core::CircuitConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(sql) = std::str::from_utf8(data) {
        // Limit query length to prevent timeout
        if sql.len() > 10_000 {
            return;
        }

        // Parsing and planning must never panic
        if let Ok(query) = parse_query(sql) {
            let reparsed = parse_query(&query.to_string());
            assert_eq!(reparsed.as_ref().ok(), Some(&query));

            let config = CircuitConfig::new(4);
            let _ = Planner::new(&config).plan(&query);
        }
    }
});
