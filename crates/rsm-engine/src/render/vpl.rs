/// Deterministic Hammersley point set over the unit square.
///
/// Entries are `(u, v, weight, 0)` with weights summing to one. The same `count`
/// always yields the same samples, so the indirect term does not flicker.
pub fn hammersley(count: u32) -> Vec<[f32; 4]> {
    if count == 0 {
        return Vec::new();
    }
    let weight = 1.0 / count as f32;
    (0..count)
        .map(|i| {
            let u = (i as f32 + 0.5) / count as f32;
            let v = radical_inverse(i);
            [u, v, weight, 0.0]
        })
        .collect()
}

/// Van der Corput sequence in base 2.
fn radical_inverse(i: u32) -> f32 {
    i.reverse_bits() as f32 * 2.328_306_4e-10
}
