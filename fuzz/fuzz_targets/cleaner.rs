#![no_main]

use libfuzzer_sys::fuzz_target;

use postclean::cleaner::Cleaner;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let cleaner = Cleaner::default();

    // Neither entry point may panic, and re-cleaning must be a no-op.
    let from_html = cleaner.clean_html(&input);
    assert_eq!(cleaner.clean_text(&from_html), from_html);

    let from_text = cleaner.clean_text(&input);
    assert_eq!(cleaner.clean_text(&from_text), from_text);
    assert!(!from_text.contains("\n\n\n"));
});
