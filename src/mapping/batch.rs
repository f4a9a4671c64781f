//! Chunked embedding of match descriptions.

use std::ops::Range;

use crate::error::MappingError;
use crate::llm::EmbeddingClient;

/// Upper bound on descriptions per embedding request.
pub const EMBEDDING_CHUNK_LIMIT: usize = 100;

/// Split `len` items into `ceil(len / limit)` contiguous, nearly equal ranges.
///
/// The first `len % k` ranges hold one extra item, so 250 items with a limit
/// of 100 split as 84/83/83 rather than 100/100/50.
pub fn chunk_ranges(len: usize, limit: usize) -> Vec<Range<usize>> {
    if len == 0 || limit == 0 {
        return Vec::new();
    }

    let chunks = len.div_ceil(limit);
    let base = len / chunks;
    let extra = len % chunks;

    let mut ranges = Vec::with_capacity(chunks);
    let mut start = 0;
    for i in 0..chunks {
        let size = base + usize::from(i < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// Embed `texts` chunk by chunk, returning one vector per text in input order.
///
/// Chunks are requested sequentially. An empty input makes no calls.
pub async fn embed_in_chunks(
    client: &dyn EmbeddingClient,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, MappingError> {
    let ranges = chunk_ranges(texts.len(), EMBEDDING_CHUNK_LIMIT);
    let mut embeddings = Vec::with_capacity(texts.len());

    for (i, range) in ranges.iter().enumerate() {
        let chunk = &texts[range.clone()];
        tracing::debug!(chunk = i, size = chunk.len(), "embedding description chunk");

        let vectors = client.embed(chunk).await?;
        if vectors.len() != chunk.len() {
            return Err(MappingError::EmbeddingCountMismatch {
                expected: chunk.len(),
                actual: vectors.len(),
            });
        }
        embeddings.extend(vectors);
    }

    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records chunk sizes and encodes each text's index into its vector.
    struct RecordingEmbedder {
        calls: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl EmbeddingClient for RecordingEmbedder {
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            self.calls.lock().unwrap().push(texts.len());
            Ok(texts
                .iter()
                .map(|t| vec![t.parse::<f32>().unwrap()])
                .collect())
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl EmbeddingClient for ShortEmbedder {
        async fn embed(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(vec![vec![0.0]])
        }
    }

    fn sizes(ranges: &[Range<usize>]) -> Vec<usize> {
        ranges.iter().map(|r| r.len()).collect()
    }

    #[test]
    fn chunk_ranges_balance_sizes() {
        assert!(chunk_ranges(0, 100).is_empty());
        assert_eq!(sizes(&chunk_ranges(1, 100)), vec![1]);
        assert_eq!(sizes(&chunk_ranges(100, 100)), vec![100]);
        assert_eq!(sizes(&chunk_ranges(101, 100)), vec![51, 50]);
        assert_eq!(sizes(&chunk_ranges(250, 100)), vec![84, 83, 83]);
    }

    #[test]
    fn chunk_ranges_are_contiguous() {
        let ranges = chunk_ranges(250, 100);
        assert_eq!(ranges.first().unwrap().start, 0);
        assert_eq!(ranges.last().unwrap().end, 250);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[tokio::test]
    async fn embeds_250_in_three_ordered_chunks() {
        let embedder = RecordingEmbedder {
            calls: Mutex::new(Vec::new()),
        };
        let texts: Vec<String> = (0..250).map(|i| i.to_string()).collect();

        let vectors = embed_in_chunks(&embedder, &texts).await.unwrap();

        assert_eq!(*embedder.calls.lock().unwrap(), vec![84, 83, 83]);
        assert_eq!(vectors.len(), 250);
        for (i, v) in vectors.iter().enumerate() {
            assert_eq!(v[0], i as f32);
        }
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let embedder = RecordingEmbedder {
            calls: Mutex::new(Vec::new()),
        };
        let vectors = embed_in_chunks(&embedder, &[]).await.unwrap();
        assert!(vectors.is_empty());
        assert!(embedder.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_chunk_is_an_error() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let err = embed_in_chunks(&ShortEmbedder, &texts).await.unwrap_err();
        assert!(matches!(
            err,
            MappingError::EmbeddingCountMismatch { expected: 2, actual: 1 }
        ));
    }
}
