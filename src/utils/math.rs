//! Math utility functions

/// Argmax - index of the largest value (first one on ties, 0 when empty)
pub fn argmax(x: &[f32]) -> usize {
    x.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (idx, &v)| match best {
            Some((_, b)) if b.total_cmp(&v).is_ge() => best,
            _ => Some((idx, v)),
        })
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}
