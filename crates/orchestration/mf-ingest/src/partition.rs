//! Batch partitioning.

/// Split a path list into fixed-size, order-preserving batches.
///
/// Produces `ceil(N / batch_size)` contiguous slices; the last batch may
/// be shorter. Batch membership is a pure function of the input order
/// and `batch_size` - callers must sort the path list first, because
/// resumption correctness depends on batch indices being reproducible
/// across runs.
///
/// `batch_size` must be validated (>= 1) before the call.
pub fn partition_paths(paths: &[String], batch_size: usize) -> Vec<Vec<String>> {
    debug_assert!(batch_size > 0, "batch_size validated by IngestConfig");
    paths
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{i:03}.parquet")).collect()
    }

    #[test]
    fn test_even_split() {
        let batches = partition_paths(&paths(6), 2);
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.len() == 2));
    }

    #[test]
    fn test_short_final_batch() {
        let batches = partition_paths(&paths(7), 3);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].len(), 1);
    }

    #[test]
    fn test_batch_size_one() {
        let batches = partition_paths(&paths(3), 1);
        assert_eq!(batches.len(), 3);
    }

    #[test]
    fn test_batch_size_exceeds_input() {
        let batches = partition_paths(&paths(3), 100);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 3);
    }

    #[test]
    fn test_empty_input() {
        let batches = partition_paths(&[], 10);
        assert!(batches.is_empty());
    }

    #[test]
    fn test_order_preserved() {
        let input = paths(5);
        let batches = partition_paths(&input, 2);
        let flattened: Vec<String> = batches.into_iter().flatten().collect();
        assert_eq!(flattened, input);
    }
}
