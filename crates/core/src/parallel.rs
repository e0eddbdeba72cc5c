use rayon::prelude::*;

const PARALLEL_THRESHOLD: usize = 1024;

pub fn for_each_indexed_mut<T, F>(slice: &mut [T], f: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync + Send,
{
    if slice.len() >= PARALLEL_THRESHOLD {
        slice
            .par_iter_mut()
            .enumerate()
            .for_each(|(idx, value)| f(idx, value));
        return;
    }

    for (idx, value) in slice.iter_mut().enumerate() {
        f(idx, value);
    }
}

/// Runs `f(row, row_slice)` over consecutive `row_len` chunks, in parallel
/// once the whole slice is large enough.
pub fn for_each_row_mut<T, F>(slice: &mut [T], row_len: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    let row_len = row_len.max(1);
    if slice.len() >= PARALLEL_THRESHOLD {
        slice
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(row, values)| f(row, values));
        return;
    }

    for (row, values) in slice.chunks_mut(row_len).enumerate() {
        f(row, values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visits_every_index_once() {
        for len in [10, 5000] {
            let mut values = vec![0usize; len];
            for_each_indexed_mut(&mut values, |idx, value| *value += idx + 1);
            assert!(values.iter().enumerate().all(|(idx, v)| *v == idx + 1));
        }
    }

    #[test]
    fn rows_see_their_own_slice() {
        let mut values = vec![0usize; 64 * 32];
        for_each_row_mut(&mut values, 64, |row, slice| slice.fill(row));
        assert_eq!(values[64 * 5 + 3], 5);
        assert_eq!(values[values.len() - 1], 31);
    }
}
