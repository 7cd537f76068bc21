//! Wheel geometry.
//!
//! Angles are degrees measured clockwise from 12 o'clock. Screen trigonometry
//! measures from 3 o'clock, so every conversion to canvas coordinates shifts by
//! -90° first. Both the renderer and the selection resolver go through this
//! module so the two never disagree about where a sector sits.

/// One angular slice of the wheel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sector {
    pub index: usize,
    pub start_angle: f64,
    pub end_angle: f64,
}

impl Sector {
    /// Angle used to place the sector label.
    pub fn mid_angle(&self) -> f64 {
        (self.start_angle + self.end_angle) / 2.0
    }

    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.start_angle && angle < self.end_angle
    }
}

/// Width of each sector for a wheel of `count` items.
pub fn sector_angle(count: usize) -> f64 {
    360.0 / count.max(1) as f64
}

pub fn sector(index: usize, count: usize) -> Sector {
    let step = sector_angle(count);
    Sector {
        index,
        start_angle: index as f64 * step,
        end_angle: (index + 1) as f64 * step,
    }
}

/// All sectors in list order.
pub fn sectors(count: usize) -> impl Iterator<Item = Sector> {
    (0..count).map(move |i| sector(i, count))
}

/// Index of the sector that covers `wheel_angle` (in the wheel's own frame).
///
/// The angle may be negative or exceed 360; the result is always in `[0, count)`.
pub fn sector_at(wheel_angle: f64, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let angle = if wheel_angle.is_finite() { wheel_angle.rem_euclid(360.0) } else { 0.0 };
    let idx = (angle / sector_angle(count)).floor() as usize;
    idx.min(count - 1)
}

/// Top-referenced degrees to canvas radians.
pub fn to_screen_radians(angle: f64) -> f64 {
    (angle - 90.0).to_radians()
}

/// Screen point at `radius` from `(cx, cy)` for a top-referenced angle.
pub fn point_on_circle(cx: f64, cy: f64, radius: f64, angle: f64) -> (f64, f64) {
    let rad = to_screen_radians(angle);
    (cx + radius * rad.cos(), cy + radius * rad.sin())
}

/// Inverse of [`point_on_circle`]: top-referenced angle in `[0, 360)` of `(x, y)` around the center.
pub fn angle_of_point(cx: f64, cy: f64, x: f64, y: f64) -> f64 {
    let deg = (y - cy).atan2(x - cx).to_degrees() + 90.0;
    deg.rem_euclid(360.0)
}

/// SVG/canvas large-arc flag: set when a single sector spans more than half the wheel.
pub fn large_arc(count: usize) -> bool {
    sector_angle(count) > 180.0
}

/// Shorten a label for narrow screens. Crowded wheels get shorter labels.
///
/// Labels longer than `floor(8 - count / 3)` characters keep one character
/// fewer than that limit, followed by `..`. From 24 items on the limit is zero
/// and every label collapses to `..`.
pub fn truncate_label(label: &str, count: usize) -> String {
    // negative limits saturate to 0 in the cast
    let max_len = (8.0 - count as f64 / 3.0).floor() as usize;
    if label.chars().count() <= max_len {
        return label.to_string();
    }
    let mut out: String = label.chars().take(max_len.saturating_sub(1)).collect();
    out.push_str("..");
    out
}
