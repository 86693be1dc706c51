use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::{
    geometry::{FloatType, ScreenBlock, ScreenPoint, ScreenSize},
    screen_block::ScreenBlockExt as _,
    spectrum::{Spectrum, SpectrumExt as _, black},
    util::Stats,
};

/// Converts linear radiance to displayable 8-bit colors.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tonemapper {
    pub gamma: FloatType,
    /// Exposure multiplier applied after tone mapping
    pub level: FloatType,
    /// Luminance the log-average scene luminance is mapped to
    pub key: FloatType,
    /// Smallest scaled luminance that maps to pure white
    pub white: FloatType,
}

impl Default for Tonemapper {
    fn default() -> Self {
        Tonemapper {
            gamma: 2.2,
            level: 1.0,
            key: 0.18,
            white: 5.0,
        }
    }
}

impl Tonemapper {
    /// Reinhard operator with white point, scaled by the key over the log-average luminance.
    fn map(&self, radiance: &Spectrum, log_average: FloatType) -> Rgb<u8> {
        let luminance = radiance.illuminance();
        let scaled = if luminance > 0.0 {
            let l = self.key / log_average * luminance;
            let mapped = l * (1.0 + l / (self.white * self.white)) / (1.0 + l);
            radiance * (mapped / luminance)
        } else {
            black()
        };

        let gamma = 1.0 / self.gamma;
        let [r, g, b] = (scaled * self.level)
            .map(|c| (c.max(0.0).powf(gamma) * 255.0).round().clamp(0.0, 255.0) as u8)
            .into();
        Rgb([r, g, b])
    }
}

/// Accumulated radiance and sample counts of the whole image.
#[derive(Clone, Debug)]
pub struct Film {
    size: ScreenSize,
    radiance: Vec<Spectrum>,
    sample_counts: Vec<u32>,
}

impl Film {
    pub fn new(size: ScreenSize) -> Self {
        let len = pixel_count(&size);
        Film {
            size,
            radiance: vec![black(); len],
            sample_counts: vec![0; len],
        }
    }

    pub fn size(&self) -> ScreenSize {
        self.size
    }

    fn index(&self, p: &ScreenPoint) -> usize {
        pixel_index(&self.size, p)
    }

    pub fn radiance(&self, p: &ScreenPoint) -> Spectrum {
        self.radiance[self.index(p)]
    }

    pub fn sample_count(&self, p: &ScreenPoint) -> u32 {
        self.sample_counts[self.index(p)]
    }

    /// Copies a rendered tile in. Buffers are row-major over the tile.
    pub fn write_tile(&mut self, tile: &ScreenBlock, radiance: &[Spectrum], sample_counts: &[u32]) {
        debug_assert!(ScreenBlock::from_size(self.size).contains_block(tile));
        for (i, p) in tile.internal_points().enumerate() {
            let index = self.index(&p);
            self.radiance[index] = radiance[i];
            self.sample_counts[index] = sample_counts[i];
        }
    }

    pub fn total_samples(&self) -> u64 {
        self.sample_counts.iter().map(|c| *c as u64).sum()
    }

    /// Distribution of samples taken per pixel.
    pub(crate) fn sample_stats(&self) -> Stats {
        self.sample_counts.iter().map(|c| *c as usize).collect()
    }

    fn log_average_luminance(&self) -> FloatType {
        if self.radiance.is_empty() {
            return 1.0;
        }
        let sum: FloatType = self
            .radiance
            .iter()
            .map(|r| (1e-7 + r.illuminance().max(0.0)).ln())
            .sum();
        (sum / self.radiance.len() as FloatType).exp()
    }

    pub fn to_image(&self, tonemapper: &Tonemapper) -> RgbImage {
        let log_average = self.log_average_luminance();
        RgbImage::from_fn(self.size.x, self.size.y, |x, y| {
            tonemapper.map(&self.radiance(&ScreenPoint::new(x, y)), log_average)
        })
    }

    /// Samples taken per pixel relative to `max_samples`, white means the full budget.
    pub fn rate_image(&self, max_samples: u32) -> GrayImage {
        let max_samples = max_samples.max(1) as FloatType;
        GrayImage::from_fn(self.size.x, self.size.y, |x, y| {
            let rate = self.sample_count(&ScreenPoint::new(x, y)) as FloatType / max_samples;
            Luma([(rate * 255.0).round().clamp(0.0, 255.0) as u8])
        })
    }
}

fn pixel_count(size: &ScreenSize) -> usize {
    size.x as usize * size.y as usize
}

/// Row major index, computed in usize so that large films don't wrap around.
fn pixel_index(size: &ScreenSize, p: &ScreenPoint) -> usize {
    p.x as usize + p.y as usize * size.x as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::grey;
    use assert2::{assert, check};

    #[test]
    fn tiles_land_in_place() {
        let mut film = Film::new(ScreenSize::new(4, 3));
        let tile = ScreenBlock::new(ScreenPoint::new(2, 1), ScreenPoint::new(4, 3));
        let radiance = [grey(1.0), grey(2.0), grey(3.0), grey(4.0)];
        film.write_tile(&tile, &radiance, &[1, 2, 3, 4]);

        check!(film.radiance(&ScreenPoint::new(3, 1)) == grey(2.0));
        check!(film.radiance(&ScreenPoint::new(2, 2)) == grey(3.0));
        check!(film.sample_count(&ScreenPoint::new(3, 2)) == 4);
        check!(film.radiance(&ScreenPoint::new(0, 0)) == black());
        check!(film.total_samples() == 10);
    }

    #[test]
    fn indices_beyond_u32() {
        let size = ScreenSize::new(70_000, 70_000);
        check!(pixel_count(&size) == 4_900_000_000);
        check!(pixel_index(&size, &ScreenPoint::new(69_999, 69_999)) == 4_899_999_999);
        check!(pixel_index(&size, &ScreenPoint::new(5, 61_400)) == 4_298_000_005);
        check!(pixel_index(&ScreenSize::new(4, 3), &ScreenPoint::new(1, 2)) == 9);
    }

    #[test]
    fn tonemapping_is_monotonic() {
        let mut film = Film::new(ScreenSize::new(3, 1));
        let tile = ScreenBlock::from_size(ScreenSize::new(3, 1));
        film.write_tile(&tile, &[grey(0.1), grey(0.2), grey(0.4)], &[1, 1, 1]);

        let image = film.to_image(&Tonemapper::default());
        let values: Vec<u8> = image.pixels().map(|p| p.0[0]).collect();
        assert!(values[0] > 0);
        assert!(values[0] < values[1]);
        assert!(values[1] < values[2]);
        assert!(values[2] < 255);
        assert!(image.pixels().all(|p| p.0[0] == p.0[1] && p.0[1] == p.0[2]));
    }

    #[test]
    fn black_stays_black() {
        let mut film = Film::new(ScreenSize::new(2, 1));
        let tile = ScreenBlock::from_size(ScreenSize::new(2, 1));
        film.write_tile(&tile, &[black(), grey(1.0)], &[1, 1]);
        let image = film.to_image(&Tonemapper::default());
        check!(image.get_pixel(0, 0).0 == [0, 0, 0]);
    }

    #[test]
    fn log_average_of_uniform_image() {
        let mut film = Film::new(ScreenSize::new(2, 2));
        film.write_tile(
            &ScreenBlock::from_size(ScreenSize::new(2, 2)),
            &[grey(0.5); 4],
            &[1; 4],
        );
        check!((film.log_average_luminance() - 0.5).abs() < 1e-6);

        // Key maps the average to 0.18 before the curve and gamma
        let tonemapper = Tonemapper::default();
        let l: FloatType = 0.18;
        let expected = l * (1.0 + l / 25.0) / (1.0 + l);
        let expected = (expected.powf(1.0 / 2.2) * 255.0).round() as u8;
        let image = film.to_image(&tonemapper);
        let actual = image.get_pixel(0, 0).0[0];
        check!(actual.abs_diff(expected) <= 1);
    }

    #[test]
    fn sample_rate() {
        let mut film = Film::new(ScreenSize::new(2, 1));
        film.write_tile(
            &ScreenBlock::from_size(ScreenSize::new(2, 1)),
            &[black(); 2],
            &[16, 64],
        );
        let rate = film.rate_image(64);
        check!(rate.get_pixel(0, 0).0[0] == 64);
        check!(rate.get_pixel(1, 0).0[0] == 255);

        let stats = film.sample_stats();
        check!(stats.min == 16);
        check!(stats.max == 64);
        check!(stats.mean == 40.0);
    }
}
