//! Embedding provider trait and vector utilities.
//!
//! Every fact item carries a fixed-length embedding slot. Until a real
//! provider is wired in, [`PlaceholderEmbedder`] fills the slot with zeros
//! of the configured width, so swapping providers later never changes the
//! stored shape. Retrieval does not rank by these vectors.

/// Width of the embedding slot when nothing else is configured.
pub const DEFAULT_EMBEDDING_DIMS: usize = 768;

/// Trait for embedding providers.
///
/// Implementations must return exactly [`dims`](Embedder::dims) values for
/// every input; the shredder rejects anything else.
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"placeholder"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `768`).
    fn dims(&self) -> usize;
    /// Embed one fact's text.
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Zero-filled stand-in for a real embedding model.
#[derive(Debug, Clone)]
pub struct PlaceholderEmbedder {
    dims: usize,
}

impl PlaceholderEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl Default for PlaceholderEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIMS)
    }
}

impl Embedder for PlaceholderEmbedder {
    fn model_name(&self) -> &str {
        "placeholder"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn embed(&self, _text: &str) -> Vec<f32> {
        vec![0.0; self.dims]
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use factstore_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_shape_is_fixed() {
        let embedder = PlaceholderEmbedder::new(16);
        assert_eq!(embedder.embed("short").len(), 16);
        assert_eq!(embedder.embed(&"long ".repeat(500)).len(), 16);
        assert_eq!(embedder.embed(""), vec![0.0; 16]);
    }

    #[test]
    fn test_placeholder_default_dims() {
        let embedder = PlaceholderEmbedder::default();
        assert_eq!(embedder.dims(), DEFAULT_EMBEDDING_DIMS);
        assert_eq!(embedder.model_name(), "placeholder");
    }

    #[test]
    fn test_blob_of_placeholder() {
        let blob = vec_to_blob(&PlaceholderEmbedder::new(768).embed("x"));
        assert_eq!(blob.len(), 768 * 4);
        assert!(blob_to_vec(&blob).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_blob_ignores_trailing_bytes() {
        let mut blob = vec_to_blob(&[1.5, 2.5]);
        blob.push(0xff);
        assert_eq!(blob_to_vec(&blob), vec![1.5, 2.5]);
    }
}
