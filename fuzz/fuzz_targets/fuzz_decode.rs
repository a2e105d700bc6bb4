#![no_main]

use libfuzzer_sys::fuzz_target;
use pagekeep::page::{extract_title, render_page};
use pagekeep::state::{decode, encode};
use pagekeep::{MemorySlot, PageStateStore, StoreOptions};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Loading any slot text must not panic.
    let store = PageStateStore::load(MemorySlot::with_text(text), StoreOptions::default());

    // Whatever decoded must survive a second trip unchanged.
    if let Ok(state) = decode(text) {
        let once = encode(&state);
        let again = decode(&once).expect("encoded state must decode");
        assert_eq!(again, state);
        assert_eq!(encode(&again), once);
        assert_eq!(store.state(), &state);

        // The same state embedded in a page title reads back unchanged.
        let page = render_page("# t\n", &state);
        let title = extract_title(&page).expect("page has a title");
        assert_eq!(decode(&title).expect("title state must decode"), state);
    }
});
