use nalgebra::Unit;
use rand::Rng;

use crate::{
    geometry::{FloatType, WorldPoint, WorldVector},
    spectrum::{Spectrum, black},
};

/// Direction towards a light as seen from a shading point.
#[derive(Copy, Clone, Debug)]
pub struct LightSample {
    /// Unit vector from the shading point towards the light
    pub direction: WorldVector,
    /// Distance to the sampled point on the light, infinite for directional lights
    pub distance: FloatType,
    /// Density of the sample with respect to solid angle, 1 for delta lights
    pub pdf: FloatType,
    pub radiance: Spectrum,
}

#[derive(Clone, Debug)]
pub enum Light {
    /// Emits `radiance` from a single point in all directions.
    Point {
        position: WorldPoint,
        radiance: Spectrum,
    },
    /// Infinitely far light arriving from `direction`.
    Directional {
        direction: Unit<WorldVector>,
        radiance: Spectrum,
    },
    /// Point light restricted to a cone around `direction`.
    Spot {
        position: WorldPoint,
        direction: Unit<WorldVector>,
        cos_cutoff: FloatType,
        radiance: Spectrum,
    },
    /// Emitting parallelogram centered at `position`, spanned by `dim_x` and `dim_y`,
    /// emitting to the side `direction` points to.
    Area {
        position: WorldPoint,
        direction: Unit<WorldVector>,
        dim_x: WorldVector,
        dim_y: WorldVector,
        radiance: Spectrum,
    },
}

impl Light {
    pub fn point(position: WorldPoint, radiance: Spectrum) -> Self {
        Light::Point { position, radiance }
    }

    pub fn directional(towards_light: WorldVector, radiance: Spectrum) -> Self {
        Light::Directional {
            direction: Unit::new_normalize(towards_light),
            radiance,
        }
    }

    pub fn spot(
        position: WorldPoint,
        direction: WorldVector,
        cutoff_degrees: FloatType,
        radiance: Spectrum,
    ) -> Self {
        Light::Spot {
            position,
            direction: Unit::new_normalize(direction),
            cos_cutoff: cutoff_degrees.to_radians().cos(),
            radiance,
        }
    }

    /// Area light whose emitting normal is `dim_x × dim_y`.
    pub fn area(
        position: WorldPoint,
        dim_x: WorldVector,
        dim_y: WorldVector,
        radiance: Spectrum,
    ) -> Self {
        Light::Area {
            position,
            direction: Unit::new_normalize(dim_x.cross(&dim_y)),
            dim_x,
            dim_y,
            radiance,
        }
    }

    /// Delta lights can only be reached by a single direction from any point.
    pub fn is_delta(&self) -> bool {
        !matches!(self, Light::Area { .. })
    }

    /// Samples incident radiance at `p`.
    pub fn sample_l<R: Rng + ?Sized>(&self, p: &WorldPoint, rng: &mut R) -> LightSample {
        match self {
            Light::Point { position, radiance } => {
                let d = position - p;
                let distance = d.norm();
                LightSample {
                    direction: d / distance,
                    distance,
                    pdf: 1.0,
                    radiance: *radiance,
                }
            }
            Light::Directional {
                direction,
                radiance,
            } => LightSample {
                direction: direction.into_inner(),
                distance: FloatType::INFINITY,
                pdf: 1.0,
                radiance: *radiance,
            },
            Light::Spot {
                position,
                direction,
                cos_cutoff,
                radiance,
            } => {
                let d = position - p;
                let distance = d.norm();
                let towards_light = d / distance;
                let inside_cone = -towards_light.dot(direction.as_ref()) >= *cos_cutoff;
                LightSample {
                    direction: towards_light,
                    distance,
                    pdf: 1.0,
                    radiance: if inside_cone { *radiance } else { black() },
                }
            }
            Light::Area {
                position,
                direction,
                dim_x,
                dim_y,
                radiance,
            } => {
                let u: FloatType = rng.random::<FloatType>() - 0.5;
                let v: FloatType = rng.random::<FloatType>() - 0.5;
                let d = position + dim_x * u + dim_y * v - p;
                let distance2 = d.norm_squared();
                let distance = distance2.sqrt();
                let towards_light = d / distance;

                let cos_theta = towards_light.dot(direction.as_ref());
                let area = dim_x.cross(dim_y).norm();
                LightSample {
                    direction: towards_light,
                    distance,
                    pdf: distance2 / (area * cos_theta.abs()),
                    radiance: if cos_theta < 0.0 { *radiance } else { black() },
                }
            }
        }
    }
}

/// Radiance arriving from infinity along rays that leave the scene.
#[derive(Clone, Debug)]
pub struct EnvironmentLight {
    pub radiance: Spectrum,
}

impl EnvironmentLight {
    pub fn uniform(radiance: Spectrum) -> Self {
        EnvironmentLight { radiance }
    }

    pub fn sample_dir(&self, _direction: &WorldVector) -> Spectrum {
        self.radiance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::grey;
    use assert2::{assert, check};
    use rand::{SeedableRng, rngs::SmallRng};

    #[test]
    fn point_light() {
        let light = Light::point(WorldPoint::new(0.0, 0.0, 4.0), grey(2.0));
        let mut rng = SmallRng::seed_from_u64(0);
        let sample = light.sample_l(&WorldPoint::origin(), &mut rng);

        check!(light.is_delta());
        check!(sample.direction == WorldVector::z());
        check!(sample.distance == 4.0);
        check!(sample.pdf == 1.0);
        check!(sample.radiance == grey(2.0));
    }

    #[test]
    fn spot_light_cone() {
        let light = Light::spot(
            WorldPoint::new(0.0, 0.0, 1.0),
            -WorldVector::z(),
            30.0,
            grey(1.0),
        );
        let mut rng = SmallRng::seed_from_u64(0);
        check!(light.sample_l(&WorldPoint::origin(), &mut rng).radiance == grey(1.0));
        check!(light.sample_l(&WorldPoint::new(2.0, 0.0, 0.0), &mut rng).radiance == black());
    }

    #[test]
    fn area_light_emits_one_side() {
        // Square of side 2 at height 2 facing down
        let light = Light::area(
            WorldPoint::new(0.0, 0.0, 2.0),
            WorldVector::new(0.0, 2.0, 0.0),
            WorldVector::new(2.0, 0.0, 0.0),
            grey(3.0),
        );
        let mut rng = SmallRng::seed_from_u64(1);
        check!(!light.is_delta());

        for _ in 0..100 {
            let below = light.sample_l(&WorldPoint::origin(), &mut rng);
            check!(below.radiance == grey(3.0));
            check!(below.direction.z > 0.0);
            let expected_pdf = below.distance.powi(2) / (4.0 * below.direction.z);
            check!((below.pdf - expected_pdf).abs() < 1e-9);

            let above = light.sample_l(&WorldPoint::new(0.0, 0.0, 4.0), &mut rng);
            check!(above.radiance == black());
        }
    }

    /// Integrating the sampled radiance over the light gives the solid angle it subtends.
    #[test]
    fn area_light_solid_angle() {
        let light = Light::area(
            WorldPoint::new(0.0, 0.0, 1.0),
            WorldVector::new(0.0, 0.2, 0.0),
            WorldVector::new(0.2, 0.0, 0.0),
            grey(1.0),
        );
        let mut rng = SmallRng::seed_from_u64(2);
        let n = 10_000;
        let solid_angle = (0..n)
            .map(|_| 1.0 / light.sample_l(&WorldPoint::origin(), &mut rng).pdf)
            .sum::<FloatType>()
            / n as FloatType;

        // Small light far away: area / distance²
        assert!((solid_angle - 0.04).abs() < 0.001);
    }
}
