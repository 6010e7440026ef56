//! 📦 Batching: cutting a pile of documents into request-sized pieces.
//!
//! 🧠 Two ways to cut:
//! - [`batch`] by count, which is just `chunks` with a guard against zero.
//! - [`generate_auto_batches`] by serialized byte size, so no request goes over the
//!   server's payload ceiling.
//!
//! Both hand out sub-slices of the input in order. Nothing is copied, nothing is
//! reordered, nothing gets lost between batches.

use std::io;

use serde::Serialize;
use tracing::{debug, trace};

use crate::errors::{MeilixError, Result};

/// 🐘 100 MiB, the server's default payload limit.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 104_857_600;

/// 🔢 Fixed-count batches. A size of zero is a validation error, not an infinite loop.
pub fn batch<T>(documents: &[T], batch_size: usize) -> Result<std::slice::Chunks<'_, T>> {
    if batch_size == 0 {
        return Err(MeilixError::Validation(
            "batch_size must be greater than zero".to_string(),
        ));
    }
    Ok(documents.chunks(batch_size))
}

/// 📏 An `io::Write` that only counts. Lets serde_json tell us a size without
/// allocating the bytes.
#[derive(Debug, Default)]
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn serialized_len<T: Serialize + ?Sized>(value: &T) -> Result<usize> {
    let mut counter = ByteCounter::default();
    serde_json::to_writer(&mut counter, value)?;
    Ok(counter.0)
}

/// 🎯 Pack documents into batches whose serialized size stays under `max_payload_size`.
///
/// If the whole array serializes below the limit, it comes back as one batch. Otherwise
/// every document is measured up front, and if any single one is bigger than the limit
/// the call fails with [`MeilixError::PayloadTooLarge`] before a single batch is handed out.
///
/// Packing is greedy: a document joins the running batch, and when the running total
/// reaches the limit the batch is emitted without that document, which then opens the
/// next batch. A document exactly as large as the limit rides alone. Empty input yields
/// no batches.
pub fn generate_auto_batches<T: Serialize>(
    documents: &[T],
    max_payload_size: usize,
) -> Result<AutoBatches<'_, T>> {
    if documents.is_empty() {
        return Ok(AutoBatches::whole(documents, max_payload_size, true));
    }

    let total = serialized_len(documents)?;
    if total < max_payload_size {
        trace!(
            "📦 {} documents fit in one payload ({} < {} bytes)",
            documents.len(),
            total,
            max_payload_size
        );
        return Ok(AutoBatches::whole(documents, max_payload_size, false));
    }

    let sizes = documents
        .iter()
        .map(serialized_len)
        .collect::<Result<Vec<_>>>()?;
    if let Some(&size) = sizes.iter().find(|&&size| size > max_payload_size) {
        return Err(MeilixError::PayloadTooLarge {
            size,
            max: max_payload_size,
        });
    }

    debug!(
        "✂️ {} documents ({} bytes) need splitting to stay under {} bytes",
        documents.len(),
        total,
        max_payload_size
    );
    Ok(AutoBatches {
        documents,
        sizes,
        max_payload_size,
        cursor: 0,
        whole_pending: false,
    })
}

/// 🔁 Iterator over the batches produced by [`generate_auto_batches`].
#[derive(Debug, Clone)]
pub struct AutoBatches<'a, T> {
    documents: &'a [T],
    sizes: Vec<usize>,
    max_payload_size: usize,
    cursor: usize,
    whole_pending: bool,
}

impl<'a, T> AutoBatches<'a, T> {
    fn whole(documents: &'a [T], max_payload_size: usize, exhausted: bool) -> Self {
        AutoBatches {
            documents,
            sizes: Vec::new(),
            max_payload_size,
            cursor: if exhausted { documents.len() } else { 0 },
            whole_pending: !exhausted,
        }
    }
}

impl<'a, T> Iterator for AutoBatches<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        if self.whole_pending {
            self.whole_pending = false;
            self.cursor = self.documents.len();
            return Some(self.documents);
        }

        let start = self.cursor;
        let mut running = 0usize;
        while self.cursor < self.documents.len() {
            running += self.sizes[self.cursor];
            if running >= self.max_payload_size {
                if self.cursor == start {
                    // 🐘 one document that fills the whole payload on its own
                    self.cursor += 1;
                }
                return Some(&self.documents[start..self.cursor]);
            }
            self.cursor += 1;
        }

        if self.cursor > start {
            Some(&self.documents[start..self.cursor])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    /// 🧪 A document whose compact JSON is exactly `len` bytes: `{"p":"xx…"}` is 8 + n.
    fn doc_of_len(len: usize) -> Value {
        json!({ "p": "x".repeat(len - 8) })
    }

    fn sizes(batches: &[&[Value]]) -> Vec<Vec<usize>> {
        batches
            .iter()
            .map(|batch| {
                batch
                    .iter()
                    .map(|doc| serde_json::to_vec(doc).map(|bytes| bytes.len()).unwrap_or(0))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn the_one_where_the_doc_helper_is_not_lying() {
        assert_eq!(serialized_len(&doc_of_len(40)).expect("💀 should count"), 40);
    }

    #[test]
    fn the_one_where_a_small_pile_goes_out_in_one_trip() {
        let documents = vec![json!({"id": 1}), json!({"id": 2})];
        let batches: Vec<&[Value]> = generate_auto_batches(&documents, 1024)
            .expect("💀 should pack")
            .collect();
        assert_eq!(batches, vec![documents.as_slice()]);
    }

    #[test]
    fn the_one_where_the_greedy_packer_does_its_greedy_thing() {
        // 🧪 sizes 40, 40, 40, 90 with a limit of 100
        let documents = vec![doc_of_len(40), doc_of_len(40), doc_of_len(40), doc_of_len(90)];
        let batches: Vec<&[Value]> = generate_auto_batches(&documents, 100)
            .expect("💀 should pack")
            .collect();

        assert_eq!(sizes(&batches), vec![vec![40, 40], vec![40], vec![90]]);
        let rejoined: Vec<Value> = batches.concat();
        assert_eq!(rejoined, documents);
    }

    #[test]
    fn the_one_where_one_chonky_doc_ruins_it_for_everyone() {
        let documents = vec![doc_of_len(10), doc_of_len(150), doc_of_len(10)];
        let error = generate_auto_batches(&documents, 100).expect_err("💀 150 > 100 should fail");
        match error {
            MeilixError::PayloadTooLarge { size, max } => {
                assert_eq!(size, 150);
                assert_eq!(max, 100);
            }
            other => panic!("💀 expected PayloadTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn the_one_where_a_doc_exactly_at_the_limit_rides_alone() {
        let documents = vec![doc_of_len(30), doc_of_len(100), doc_of_len(30)];
        let batches: Vec<&[Value]> = generate_auto_batches(&documents, 100)
            .expect("💀 exactly-max is allowed")
            .collect();

        assert_eq!(sizes(&batches), vec![vec![30], vec![100], vec![30]]);
        assert!(batches.iter().all(|batch| !batch.is_empty()));
    }

    #[test]
    fn the_one_where_nothing_in_means_nothing_out() {
        let documents: Vec<Value> = Vec::new();
        let mut batches = generate_auto_batches(&documents, 100).expect("💀 empty is fine");
        assert!(batches.next().is_none());
    }

    #[test]
    fn the_one_where_every_batch_but_one_hugs_the_ceiling() {
        let documents: Vec<Value> = (0..50).map(|i| doc_of_len(20 + (i % 7) * 5)).collect();
        let max = 120;
        let batches: Vec<&[Value]> = generate_auto_batches(&documents, max)
            .expect("💀 should pack")
            .collect();

        for batch in &batches {
            let batch_total: usize = sizes(&[*batch])[0].iter().sum();
            assert!(batch_total < max, "💀 batch of {batch_total} bytes busts the {max} limit");
        }
        assert_eq!(batches.concat(), documents);
    }

    #[test]
    fn the_one_where_fixed_batches_refuse_a_size_of_zero() {
        let documents = vec![1, 2, 3, 4, 5];
        assert!(matches!(batch(&documents, 0), Err(MeilixError::Validation(_))));

        let chunks: Vec<&[i32]> = batch(&documents, 2).expect("💀 2 is a fine size").collect();
        assert_eq!(chunks, vec![&[1, 2][..], &[3, 4][..], &[5][..]]);
    }
}
