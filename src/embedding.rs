//! Text vectorization with a growing, process-wide vocabulary
//!
//! The encoder has two schemes and flips between them once, at call time:
//! while the vocabulary holds fewer distinct tokens than the vector has
//! components, every vocabulary token owns one coordinate and the value is
//! that token's count in the text. From then on each token is hashed into a
//! bucket and occurrences accumulate there. Vectors already handed out are
//! never re-encoded, so old and new vectors may come from different schemes.

use std::collections::HashMap;

use indexmap::IndexSet;

use crate::error::{Error, Result};
use crate::text::tokenize;

/// Which scheme the next `encode` call will use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingScheme {
    /// One coordinate per vocabulary token, valued by occurrence count
    Vocabulary,

    /// Occurrences summed into `hash(token) mod dimensions`
    Hashed,
}

impl std::fmt::Display for EncodingScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodingScheme::Vocabulary => write!(f, "vocabulary"),
            EncodingScheme::Hashed => write!(f, "hashed"),
        }
    }
}

/// Stateful encoder owning the vocabulary
#[derive(Debug, Clone)]
pub struct TextEncoder {
    dimensions: usize,
    // Iteration order decides coordinate assignment in the vocabulary scheme.
    vocabulary: IndexSet<String>,
}

impl TextEncoder {
    /// Create an encoder producing vectors of `dimensions` components
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::config("vector dimensions must be at least 1"));
        }

        Ok(Self {
            dimensions,
            vocabulary: IndexSet::new(),
        })
    }

    /// Get the vector dimensions
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of distinct tokens seen so far
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Whether `token` has been observed
    pub fn knows(&self, token: &str) -> bool {
        self.vocabulary.contains(token)
    }

    /// The scheme selected by the current vocabulary size
    pub fn scheme(&self) -> EncodingScheme {
        if self.vocabulary.len() < self.dimensions {
            EncodingScheme::Vocabulary
        } else {
            EncodingScheme::Hashed
        }
    }

    /// Encode `text` into a unit-length vector, registering its tokens first.
    ///
    /// Text without tokens yields the zero vector.
    pub fn encode(&mut self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        for token in &tokens {
            if !self.vocabulary.contains(token) {
                self.vocabulary.insert(token.clone());
            }
        }

        let mut vector = vec![0.0_f32; self.dimensions];
        match self.scheme() {
            EncodingScheme::Vocabulary => {
                let mut counts: HashMap<&str, f32> = HashMap::new();
                for token in &tokens {
                    *counts.entry(token.as_str()).or_default() += 1.0;
                }
                for (i, word) in self.vocabulary.iter().enumerate() {
                    vector[i] = counts.get(word.as_str()).copied().unwrap_or(0.0);
                }
            }
            EncodingScheme::Hashed => {
                for token in &tokens {
                    vector[bucket(token, self.dimensions)] += 1.0;
                }
            }
        }

        normalize_in_place(&mut vector);
        vector
    }
}

/// Stable bucket of `token` among `dimensions` hashed coordinates
pub fn bucket(token: &str, dimensions: usize) -> usize {
    let digest = blake3::hash(token.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    (u64::from_le_bytes(head) % dimensions as u64) as usize
}

/// Dot product over the shared prefix of two vectors
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Euclidean length
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

fn normalize_in_place(vector: &mut [f32]) {
    let norm = l2_norm(vector);
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
