#![no_main]

use libfuzzer_sys::fuzz_target;
use pagekeep::anchor::collect_anchors;
use pagekeep::preview::{collect_links, preview_label};

fuzz_target!(|data: &[u8]| {
    let Ok(markdown) = std::str::from_utf8(data) else {
        return;
    };
    let line_count = markdown.lines().count().max(1);

    let anchors = collect_anchors(markdown);
    for (i, a) in anchors.iter().enumerate() {
        assert!(!a.slug.is_empty());
        assert!((1..=6).contains(&a.level));
        assert!(a.line <= line_count + 1, "line {} past end ({line_count})", a.line);
        // Anchors must be unique.
        assert!(anchors[..i].iter().all(|b| b.slug != a.slug), "duplicate slug {}", a.slug);
    }

    for link in collect_links(markdown) {
        assert!(!link.url.is_empty());
        let label = preview_label(&link.url, 24);
        assert!(label.chars().count() <= 24);
    }
});
