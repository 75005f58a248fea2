#![no_main]

use libfuzzer_sys::fuzz_target;
use stackscrub::cleaner::StackTraceCleaner;
use stackscrub::trace_text::{parse_trace, render_trace};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing must never panic, and anything that parses must clean
        // and render without panicking, even with circular references
        if let Ok(throwable) = parse_trace(input) {
            StackTraceCleaner::standard().clean(&throwable);
            let _ = render_trace(&throwable);
        }
    }
});
