use nalgebra::Vector3;

use crate::geometry::FloatType;

/// RGB radiance / reflectance triple.
pub type Spectrum = Vector3<FloatType>;

pub trait SpectrumExt {
    /// Photometric luminance of the linear RGB value.
    fn illuminance(&self) -> FloatType;
    fn is_black(&self) -> bool;
}

impl SpectrumExt for Spectrum {
    fn illuminance(&self) -> FloatType {
        0.2126 * self.x + 0.7152 * self.y + 0.0722 * self.z
    }

    fn is_black(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

pub fn black() -> Spectrum {
    Spectrum::zeros()
}

pub fn grey(value: FloatType) -> Spectrum {
    Spectrum::repeat(value)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;

    #[test]
    fn white_has_unit_illuminance() {
        assert!((grey(1.0).illuminance() - 1.0).abs() < 1e-12);
        assert!(black().is_black());
        assert!(!grey(1e-9).is_black());
    }
}
