//! Footprint placement in layout space and its KiCad rendering.

use crate::fmt_num;

/// Position and rotation of one footprint instance, in layout coordinates
/// (Y grows upwards, angles counter-clockwise in degrees).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

impl Placement {
    pub fn new(x: f64, y: f64, r: f64) -> Self {
        Self { x, y, r }
    }

    /// KiCad coordinates of the anchor.
    pub fn kicad_xy(&self) -> (f64, f64) {
        to_kicad_xy(self.x, self.y)
    }

    /// The `(at X Y R)` placement string handed to footprints.
    pub fn at(&self) -> String {
        let (at_x, at_y) = self.kicad_xy();
        format!(
            "(at {} {} {})",
            fmt_num(at_x),
            fmt_num(at_y),
            fmt_num(self.r)
        )
    }

    /// Maps a footprint-local offset to a KiCad `X Y` pair.
    pub fn xy(&self, x: f64, y: f64) -> String {
        let (at_x, at_y) = self.kicad_xy();
        let (dx, dy) = rotate_ccw((x, y), -self.r);
        format!("{} {}", fmt_num(at_x + dx), fmt_num(at_y + dy))
    }
}

pub(crate) fn to_kicad_xy(x: f64, y: f64) -> (f64, f64) {
    (x, -y)
}

pub(crate) fn rotate_ccw(p: (f64, f64), angle_deg: f64) -> (f64, f64) {
    let a = angle_deg.to_radians();
    let (s, c) = a.sin_cos();
    (p.0 * c - p.1 * s, p.0 * s + p.1 * c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_flips_y_into_kicad_space() {
        let p = Placement::new(10.0, 20.0, 90.0);
        assert_eq!(p.at(), "(at 10 -20 90)");
        assert_eq!(Placement::default().at(), "(at 0 0 0)");
    }

    #[test]
    fn xy_applies_rotation_and_translation() {
        let p = Placement::new(10.0, 20.0, 90.0);
        // rotate (1,2) by -90 => (2, -1), then translate by (10, -20)
        assert_eq!(p.xy(1.0, 2.0), "12 -21");
    }
}
