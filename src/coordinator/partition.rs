//! Worker count and index partitioning.

/// Number of processing units available to this process.
pub fn system_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Number of workers to run.
///
/// `min(requested or system, system, config_count)`: never more workers than
/// processing units, never more than there are configurations.
pub fn resolve_parallelism(requested: Option<usize>, system: usize, config_count: usize) -> usize {
    let available = match requested {
        Some(cpus) if cpus > 0 => cpus.min(system),
        _ => system,
    };
    available.min(config_count)
}

/// Split `indices` into `worker_count` contiguous chunks of
/// `ceil(len / worker_count)` entries each.
///
/// Chunk `i` holds `indices[i * size..(i + 1) * size]`; trailing chunks may
/// be shorter or empty. Zero workers yields no chunks.
pub fn partition(indices: &[usize], worker_count: usize) -> Vec<Vec<usize>> {
    if worker_count == 0 {
        return Vec::new();
    }
    let size = indices.len().div_ceil(worker_count);
    (0..worker_count)
        .map(|i| {
            let start = (i * size).min(indices.len());
            let end = (start + size).min(indices.len());
            indices[start..end].to_vec()
        })
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Chunks concatenate back to the original sequence with nothing lost or duplicated.
        #[test]
        fn partition_is_exact(count in 1usize..200, workers in 1usize..64) {
            prop_assume!(workers <= count);
            let indices: Vec<usize> = (0..count).collect();
            let chunks = partition(&indices, workers);

            prop_assert_eq!(chunks.len(), workers);
            let joined: Vec<usize> = chunks.concat();
            prop_assert_eq!(joined, indices);
        }

        /// Every chunk is at most ceil(count / workers) long.
        #[test]
        fn partition_chunk_size_bounded(count in 0usize..200, workers in 1usize..64) {
            let indices: Vec<usize> = (0..count).collect();
            let size = count.div_ceil(workers);
            for chunk in partition(&indices, workers) {
                prop_assert!(chunk.len() <= size);
            }
        }

        /// Never more workers than processing units or configurations.
        #[test]
        fn parallelism_bounded(
            requested in proptest::option::of(0usize..128),
            system in 1usize..128,
            count in 1usize..500,
        ) {
            let workers = resolve_parallelism(requested, system, count);
            prop_assert!(workers <= system.min(count));
            prop_assert!(workers >= 1);
        }
    }
}
