/// HNSW graph over chunk embeddings
use hnsw_rs::prelude::*;
use thiserror::Error;

/// hnsw_rs caps the number of layers at 16
const MAX_LAYERS: usize = 16;

#[derive(Error, Debug)]
pub enum HnswIndexError {
    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Invalid index parameter: {0}")]
    InvalidParameter(String),
}

/// Search hit with graph id and cosine similarity
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Id given at insertion (position of the chunk in the corpus)
    pub id: usize,
    /// Cosine similarity, higher is more similar
    pub score: f32,
}

/// In-memory HNSW index using cosine distance.
///
/// The graph is built once at startup from the corpus export and is only
/// read afterwards, so searches take `&self`.
pub struct HnswIndex {
    graph: Hnsw<'static, f32, DistCosine>,
    dimension: usize,
    len: usize,
}

impl HnswIndex {
    /// Create an empty index
    ///
    /// # Arguments
    /// * `dimension` - Vector dimension (must match the embedding model)
    /// * `capacity` - Expected number of vectors, used to size the graph
    /// * `ef_construction` - Construction breadth (higher = better recall, slower build)
    /// * `m` - Connections per node and layer
    pub fn new(
        dimension: usize,
        capacity: usize,
        ef_construction: usize,
        m: usize,
    ) -> Result<Self, HnswIndexError> {
        if dimension == 0 {
            return Err(HnswIndexError::InvalidParameter(
                "dimension must be greater than 0".to_string(),
            ));
        }
        if m == 0 || ef_construction == 0 {
            return Err(HnswIndexError::InvalidParameter(
                "m and ef_construction must be greater than 0".to_string(),
            ));
        }

        let graph = Hnsw::<f32, DistCosine>::new(
            m,
            capacity.max(1),
            MAX_LAYERS,
            ef_construction,
            DistCosine,
        );

        Ok(Self {
            graph,
            dimension,
            len: 0,
        })
    }

    /// Insert a vector under `id`
    pub fn insert(&mut self, id: usize, vector: &[f32]) -> Result<(), HnswIndexError> {
        if vector.len() != self.dimension {
            return Err(HnswIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        self.graph.insert((vector, id));
        self.len += 1;

        Ok(())
    }

    /// Search for the `k` nearest neighbours, most similar first
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<Neighbor>, HnswIndexError> {
        if query.len() != self.dimension {
            return Err(HnswIndexError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let k = k.min(self.len);
        let mut neighbors: Vec<Neighbor> = self
            .graph
            .search(query, k, ef_search.max(k))
            .into_iter()
            .map(|n| Neighbor {
                id: n.d_id,
                score: 1.0 - n.distance,
            })
            .collect();

        neighbors.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(neighbors)
    }

    /// Number of vectors in the index
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(dim: usize, hot: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[hot] = 1.0;
        v
    }

    #[test]
    fn test_index_creation() {
        let index = HnswIndex::new(384, 100, 200, 16).unwrap();
        assert_eq!(index.dimension(), 384);
        assert_eq!(index.len(), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(HnswIndex::new(0, 10, 200, 16).is_err());
    }

    #[test]
    fn test_insert_and_search_ordering() {
        let mut index = HnswIndex::new(8, 10, 200, 16).unwrap();

        let mut near = axis(8, 0);
        near[1] = 0.1;

        index.insert(0, &axis(8, 0)).unwrap();
        index.insert(1, &axis(8, 1)).unwrap();
        index.insert(2, &near).unwrap();

        let results = index.search(&axis(8, 0), 2, 50).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 0);
        assert_eq!(results[1].id, 2);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_k_larger_than_index() {
        let mut index = HnswIndex::new(4, 10, 200, 16).unwrap();
        index.insert(0, &axis(4, 0)).unwrap();
        index.insert(1, &axis(4, 1)).unwrap();

        let results = index.search(&axis(4, 0), 5, 50).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_empty_index_search() {
        let index = HnswIndex::new(4, 10, 200, 16).unwrap();
        let results = index.search(&axis(4, 0), 3, 50).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_dimension_validation() {
        let mut index = HnswIndex::new(384, 10, 200, 16).unwrap();
        assert!(index.insert(1, &vec![1.0; 128]).is_err());
        assert!(index.search(&vec![1.0; 128], 1, 10).is_err());
    }
}
