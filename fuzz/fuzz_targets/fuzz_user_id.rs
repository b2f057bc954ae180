// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for user id normalization

#![no_main]

use libfuzzer_sys::fuzz_target;
use rolegate_model::{RawUserId, UserId};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // Strings either normalize to a value that prints back to an equivalent
    // decimal, or are rejected. Never a panic.
    if let Ok(id) = RawUserId::from(s).normalize() {
        let reparsed = RawUserId::from(id.to_string()).normalize();
        assert_eq!(reparsed.ok(), Some(id));
        assert!(s.trim().trim_start_matches('+').trim_start_matches('-').bytes().all(|b| b.is_ascii_digit()));
    }

    // Arbitrary JSON documents go through the same path.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(s) {
        let raw = RawUserId::from(&value);
        if let Ok(id) = raw.normalize() {
            assert!(value.is_i64() || value.is_u64() || value.is_string());
            let _: i64 = UserId::get(id);
        }
    }
});
