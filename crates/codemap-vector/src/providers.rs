use async_trait::async_trait;
use codemap_core::{CodeMapError, Result};

/// Turns text into fixed-dimension vectors.
///
/// Implementations are typically network clients; the engine only depends on this trait.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embeds `texts` in slices of at most `batch_size` and concatenates the results.
    async fn embed_batch(&self, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size.max(1)) {
            let embedded = self.embed(batch).await?;
            if embedded.len() != batch.len() {
                return Err(CodeMapError::Embedding(format!(
                    "{} returned {} vectors for {} texts",
                    self.model(),
                    embedded.len(),
                    batch.len()
                )));
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize;

    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recording {
        calls: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Embedder for Recording {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.lock().push(texts.len());
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }

        fn dimensions(&self) -> usize {
            1
        }

        fn model(&self) -> &str {
            "recording"
        }
    }

    #[tokio::test]
    async fn embed_batch_preserves_order_across_batches() {
        let embedder = Recording {
            calls: Mutex::new(Vec::new()),
        };
        let texts: Vec<String> = (1..=5).map(|n| "x".repeat(n)).collect();

        let vectors = embedder.embed_batch(&texts, 2).await.unwrap();
        assert_eq!(
            vectors,
            vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0], vec![5.0]]
        );
        assert_eq!(*embedder.calls.lock(), vec![2, 2, 1]);
    }

    struct Short;

    #[async_trait]
    impl Embedder for Short {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![])
        }

        fn dimensions(&self) -> usize {
            1
        }

        fn model(&self) -> &str {
            "short"
        }
    }

    #[tokio::test]
    async fn embed_batch_rejects_missing_vectors() {
        let err = Short
            .embed_batch(&["a".to_string()], 8)
            .await
            .unwrap_err();
        assert!(matches!(err, CodeMapError::Embedding(_)));
    }
}
