// src/engine/kernel.rs
//
// Brightness kernel: clamp(component + delta, 0, 255), per component.
// Pure functions with no shared state; callers hand in disjoint storage.

/// New value of one component.
#[inline]
pub fn brighten_component(component: u8, delta: i32) -> u8 {
    (component as i32).saturating_add(delta).clamp(0, 255) as u8
}

/// Brighten every component of one pixel in place. Alpha is treated like any
/// other channel.
#[inline]
pub fn apply(pixel: &mut [u8], delta: i32) {
    for component in pixel.iter_mut() {
        *component = brighten_component(*component, delta);
    }
}

/// Brighten a copy of `pixel`.
pub fn applied(pixel: &[u8], delta: i32) -> Vec<u8> {
    let mut out = pixel.to_vec();
    apply(&mut out, delta);
    out
}

/// Brighten one row, pixel by pixel.
///
/// `row.len()` must be a multiple of `channels`; a trailing partial pixel is
/// left untouched.
pub fn apply_row(row: &mut [u8], channels: usize, delta: i32) {
    if delta == 0 {
        return;
    }
    for pixel in row.chunks_exact_mut(channels.max(1)) {
        apply(pixel, delta);
    }
}
