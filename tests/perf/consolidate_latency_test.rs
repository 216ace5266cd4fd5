use std::time::Instant;

use crate::consolidate::consolidate;
use crate::model::DocumentRecord;
use crate::presenter::{to_items, IconLookup, Platform};

struct NoIcons;

impl IconLookup for NoIcons {
    fn lookup(&self, _name: &str) -> Option<String> {
        None
    }
}

fn p95_ms(samples: &mut [f64]) -> f64 {
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let last = samples.len().saturating_sub(1);
    let idx = ((last as f64) * 0.95).round() as usize;
    samples[idx.min(last)]
}

#[test]
fn warm_consolidate_and_present_p95_under_15ms() {
    // 100 epubs with 10 chapters each, ratings rising with the chapter number.
    let records: Vec<DocumentRecord> = (0..1_000)
        .map(|i| {
            DocumentRecord::new(
                &format!("file:///home/u/books/book_{:03}.epub#{}", i / 10, i % 10),
                &format!("book_{:03}.epub", i / 10),
                Some("application/epub+zip"),
                &format!("{}%", 50 + i % 10),
            )
            .with_ipath(&(i % 10).to_string())
        })
        .collect();

    for _ in 0..10 {
        let _ = to_items(&consolidate(records.clone()), Platform::Linux, &NoIcons);
    }

    let mut batch_p95 = Vec::with_capacity(5);
    for _ in 0..5 {
        let mut samples = Vec::with_capacity(40);
        for _ in 0..40 {
            let input = records.clone();
            let start = Instant::now();
            let items = to_items(&consolidate(input), Platform::Linux, &NoIcons);
            samples.push(start.elapsed().as_secs_f64() * 1000.0);
            assert_eq!(items.len(), 100);
        }
        batch_p95.push(p95_ms(&mut samples));
    }

    batch_p95.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median_p95 = batch_p95[batch_p95.len() / 2];

    assert!(
        median_p95 <= 15.0,
        "median batch p95 too high: {median_p95:.3}ms (limit 15.0ms); batches={batch_p95:?}",
    );
}
