//! Append-only chunk sequence

/// Encoded chunks of one recording, in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkSequence {
    chunks: Vec<Vec<u8>>,
    total_bytes: usize,
}

impl ChunkSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk; empty chunks are ignored
    pub fn push(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.total_bytes += chunk.len();
        self.chunks.push(chunk);
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.chunks.iter().map(Vec::as_slice)
    }

    /// All chunks joined in order
    pub fn concat(&self) -> Vec<u8> {
        self.chunks.concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_and_totals() {
        let mut seq = ChunkSequence::new();
        seq.push(b"ab".to_vec());
        seq.push(Vec::new());
        seq.push(b"cde".to_vec());
        seq.push(b"f".to_vec());

        assert_eq!(seq.len(), 3);
        assert_eq!(seq.total_bytes(), 6);
        assert_eq!(seq.concat(), b"abcdef");
        assert_eq!(seq.iter().next(), Some(&b"ab"[..]));
    }
}
