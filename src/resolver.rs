//! Maps a settled wheel rotation back to the item under the pointer.
//!
//! The pointer is fixed at 12 o'clock and the wheel turns clockwise, so after
//! rotating by `r` degrees the pointer sits at `(360 - r) mod 360` in the
//! wheel's original frame.

use crate::sector;

/// Wheel-frame angle under the fixed top pointer after rotating by `rotation` degrees.
pub fn pointer_angle(rotation: f64) -> f64 {
    let normalized = rotation.rem_euclid(360.0);
    (360.0 - normalized) % 360.0
}

/// Winning sector index for a wheel of `count` items.
pub fn resolve_index(rotation: f64, count: usize) -> usize {
    sector::sector_at(pointer_angle(rotation), count)
}

/// Winning item, or `None` when the list is empty.
pub fn resolve<S: AsRef<str>>(rotation: f64, items: &[S]) -> Option<&str> {
    if items.is_empty() {
        return None;
    }
    items
        .get(resolve_index(rotation, items.len()))
        .map(AsRef::as_ref)
}
