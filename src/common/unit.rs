//! Length conversions for DrawingML geometry.
//!
//! All package geometry is stored in English Metric Units (EMU). Font sizes
//! in run properties are stored in hundredths of a point.

pub const EMUS_PER_INCH: i64 = 914_400;
pub const EMUS_PER_CM: i64 = 360_000;
pub const EMUS_PER_PT: i64 = 12_700;

#[inline]
pub fn inches_to_emu(inches: f64) -> i64 {
    (inches * EMUS_PER_INCH as f64).round() as i64
}

#[inline]
pub fn emu_to_inches(emu: i64) -> f64 {
    emu as f64 / EMUS_PER_INCH as f64
}

#[inline]
pub fn cm_to_emu(cm: f64) -> i64 {
    (cm * EMUS_PER_CM as f64).round() as i64
}

#[inline]
pub fn pt_to_emu(pt: f64) -> i64 {
    (pt * EMUS_PER_PT as f64).round() as i64
}

#[inline]
pub fn emu_to_pt(emu: i64) -> f64 {
    emu as f64 / EMUS_PER_PT as f64
}

/// Convert a font size in points to the `sz` attribute value (centipoints).
#[inline]
pub fn pt_to_centipoints(pt: f64) -> u32 {
    (pt * 100.0).round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inch_conversions() {
        assert_eq!(inches_to_emu(1.0), 914_400);
        assert_eq!(inches_to_emu(13.333_333_333), 12_192_000);
        assert!((emu_to_inches(6_858_000) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_point_conversions() {
        assert_eq!(pt_to_emu(1.0), 12_700);
        assert!((emu_to_pt(25_400) - 2.0).abs() < 1e-9);
        assert_eq!(pt_to_centipoints(18.0), 1800);
        assert_eq!(cm_to_emu(2.54), 914_400);
    }
}
