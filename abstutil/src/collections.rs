/// Index into a list, wrapping around in either direction.
pub fn wraparound_get<T>(vec: &[T], idx: isize) -> &T {
    let len = vec.len() as isize;
    let idx = idx % len;
    let idx = if idx >= 0 { idx } else { idx + len };
    &vec[idx as usize]
}
