//! Camera placement and primary ray generation.
//!
//! Camera space looks down -Z with +Y up; `c2w` maps camera space directions to the world.

mod lens;

pub use lens::{Aperture, CompoundLens, LensElement, LensError, LensSurface};

use std::f64::consts::PI;

use assert2::assert;
use bon::bon;
use nalgebra::Matrix3;

use crate::{
    geometry::{EPSILON, FloatType, Ray, ScreenSize, SensorPoint, WorldPoint, WorldVector},
    sampling::disk_point,
};

/// What sits between the scene and the sensor.
#[derive(Clone, Debug, Default)]
pub enum Optics {
    /// Everything is in focus
    #[default]
    Pinhole,
    /// Ideal thin lens with depth of field
    ThinLens {
        lens_radius: FloatType,
        focal_distance: FloatType,
    },
    /// Chain of real spherical lens elements
    Compound(CompoundLens),
}

impl Optics {
    pub fn thin_lens(lens_radius: FloatType, focal_distance: FloatType) -> Result<Optics, LensError> {
        let optics = Optics::ThinLens {
            lens_radius,
            focal_distance,
        };
        optics.validate()?;
        Ok(optics)
    }

    /// Checks thin lens parameters, compound lenses are checked when built.
    pub fn validate(&self) -> Result<(), LensError> {
        if let Optics::ThinLens {
            lens_radius,
            focal_distance,
        } = self
        {
            if !(lens_radius.is_finite() && *lens_radius >= 0.0) {
                return Err(LensError::InvalidThinLens {
                    parameter: "lens radius",
                    value: *lens_radius,
                });
            }
            if !(focal_distance.is_finite() && *focal_distance > 0.0) {
                return Err(LensError::InvalidThinLens {
                    parameter: "focal distance",
                    value: *focal_distance,
                });
            }
        }
        Ok(())
    }
}

/// Random numbers for picking a point on the lens: `r` uniform in [0, 1), `theta` in [0, 2π).
#[derive(Copy, Clone, Debug)]
pub struct LensSample {
    pub r: FloatType,
    pub theta: FloatType,
}

impl LensSample {
    pub fn random<R: rand::Rng + ?Sized>(rng: &mut R) -> Self {
        LensSample {
            r: rng.random(),
            theta: 2.0 * PI * rng.random::<FloatType>(),
        }
    }

    /// Sample at the center of the lens.
    pub fn center() -> Self {
        LensSample { r: 0.0, theta: 0.0 }
    }
}

#[derive(Clone, Debug)]
pub struct Camera {
    position: WorldPoint,
    target: WorldPoint,

    /// Polar angle of the camera position around the target, measured from +Y
    phi: FloatType,
    /// Azimuth of the camera position around the target, measured from +Z towards +X
    theta: FloatType,
    /// Distance from the target
    r: FloatType,
    min_r: FloatType,
    max_r: FloatType,

    c2w: Matrix3<FloatType>,

    /// Field of view in degrees
    h_fov: FloatType,
    v_fov: FloatType,
    near_clip: FloatType,
    far_clip: FloatType,

    resolution: ScreenSize,
    optics: Optics,
}

#[bon]
impl Camera {
    #[builder]
    pub fn new(
        position: WorldPoint,
        target: WorldPoint,
        resolution: ScreenSize,
        /// Vertical field of view in degrees
        #[builder(default = 45.0)]
        v_fov: FloatType,
        #[builder(default = 0.01)] near_clip: FloatType,
        #[builder(default = 1e4)] far_clip: FloatType,
        #[builder(default = 0.0)] min_distance: FloatType,
        #[builder(default = FloatType::INFINITY)] max_distance: FloatType,
        #[builder(default)] optics: Optics,
    ) -> Self {
        assert!(resolution.x > 0);
        assert!(resolution.y > 0);
        assert!(v_fov > 0.0 && v_fov < 180.0);
        assert!(near_clip >= 0.0 && near_clip < far_clip);
        assert!(min_distance <= max_distance);
        assert!(optics.validate().is_ok(), "Invalid optics {optics:?}");

        let offset = position - target;
        let r = offset.norm();
        assert!(r > 0.0, "Camera position must differ from its target");

        let mut camera = Camera {
            position,
            target,
            phi: (offset.y / r).clamp(-1.0, 1.0).acos(),
            theta: offset.x.atan2(offset.z),
            r: clamp_distance(r, min_distance, max_distance),
            min_r: min_distance,
            max_r: max_distance,
            c2w: Matrix3::identity(),
            h_fov: 0.0,
            v_fov,
            near_clip,
            far_clip,
            resolution,
            optics,
        };
        camera.set_screen_size(resolution);
        camera.compute_position();
        camera
    }
}

impl Camera {
    pub fn resolution(&self) -> ScreenSize {
        self.resolution
    }

    pub fn position(&self) -> WorldPoint {
        self.position
    }

    pub fn target(&self) -> WorldPoint {
        self.target
    }

    pub fn up_dir(&self) -> WorldVector {
        self.c2w.column(1).into_owned()
    }

    pub fn h_fov(&self) -> FloatType {
        self.h_fov
    }

    pub fn v_fov(&self) -> FloatType {
        self.v_fov
    }

    pub fn aspect_ratio(&self) -> FloatType {
        self.resolution.x as FloatType / self.resolution.y as FloatType
    }

    pub fn optics(&self) -> &Optics {
        &self.optics
    }

    pub fn set_optics(&mut self, optics: Optics) -> Result<(), LensError> {
        optics.validate()?;
        self.optics = optics;
        Ok(())
    }

    /// Changes the output resolution. The vertical field of view is kept, the horizontal one
    /// follows the new aspect ratio.
    pub fn set_screen_size(&mut self, resolution: ScreenSize) {
        assert!(resolution.x > 0);
        assert!(resolution.y > 0);
        self.resolution = resolution;
        let half_v = (self.v_fov / 2.0).to_radians();
        self.h_fov = 2.0 * (half_v.tan() * self.aspect_ratio()).atan().to_degrees();
    }

    /// Places the camera on a sphere around `target`.
    pub fn place(
        &mut self,
        target: WorldPoint,
        phi: FloatType,
        theta: FloatType,
        r: FloatType,
        min_r: FloatType,
        max_r: FloatType,
    ) {
        self.target = target;
        self.phi = phi;
        self.theta = theta;
        self.min_r = min_r;
        self.max_r = max_r;
        self.r = clamp_distance(r, min_r, max_r);
        self.compute_position();
    }

    /// Copies position and orientation, keeps optics and projection.
    pub fn copy_placement(&mut self, other: &Camera) {
        self.position = other.position;
        self.target = other.target;
        self.phi = other.phi;
        self.theta = other.theta;
        self.r = other.r;
        self.min_r = other.min_r;
        self.max_r = other.max_r;
        self.c2w = other.c2w;
    }

    /// Orbits around the target.
    pub fn rotate_by(&mut self, d_phi: FloatType, d_theta: FloatType) {
        self.phi = (self.phi + d_phi).clamp(0.0, PI);
        self.theta += d_theta;
        self.compute_position();
    }

    /// Moves towards the target, keeping the distance within limits.
    pub fn move_forward(&mut self, distance: FloatType) {
        self.r = clamp_distance(self.r - distance, self.min_r, self.max_r);
        self.compute_position();
    }

    /// Pans the camera and its target so that a point at distance `d` in front of the
    /// camera moves by (`dx`, `dy`) pixels on the screen.
    pub fn move_by(&mut self, dx: FloatType, dy: FloatType, d: FloatType) {
        let scale = d * 2.0 * (self.v_fov.to_radians() / 2.0).tan() / self.resolution.y as FloatType;
        let displacement =
            self.c2w.column(0) * (-dx * scale) + self.c2w.column(1) * (dy * scale);
        self.position += displacement;
        self.target += displacement;
    }

    fn compute_position(&mut self) {
        let mut sin_phi = self.phi.sin();
        if sin_phi == 0.0 {
            self.phi += FloatType::EPSILON;
            sin_phi = self.phi.sin();
        }

        let to_camera = WorldVector::new(
            self.r * sin_phi * self.theta.sin(),
            self.r * self.phi.cos(),
            self.r * sin_phi * self.theta.cos(),
        );
        self.position = self.target + to_camera;

        let up = WorldVector::new(0.0, sin_phi.signum(), 0.0);
        let screen_x = up.cross(&to_camera).normalize();
        let screen_y = to_camera.cross(&screen_x).normalize();

        self.c2w = Matrix3::from_columns(&[screen_x, screen_y, to_camera.normalize()]);
    }

    /// Camera space point of the virtual film at z = -1 seen through the sensor point.
    fn film_direction(&self, sensor: &SensorPoint) -> WorldVector {
        let tan_h = (self.h_fov.to_radians() / 2.0).tan();
        let tan_v = (self.v_fov.to_radians() / 2.0).tan();
        WorldVector::new(
            tan_h * (2.0 * sensor.x - 1.0),
            tan_v * (2.0 * sensor.y - 1.0),
            -1.0,
        )
    }

    fn world_ray(&self, origin: &WorldPoint, direction: &WorldVector) -> Ray {
        Ray::new(
            self.position + self.c2w * origin.coords,
            self.c2w * direction,
        )
        .with_range(self.near_clip, self.far_clip)
    }

    /// Pinhole ray through the normalized sensor point, ignoring the optics.
    pub fn generate_ray(&self, sensor: &SensorPoint) -> Ray {
        self.world_ray(&WorldPoint::origin(), &self.film_direction(sensor))
    }

    /// Ray through the normalized sensor point and the optics.
    /// None if the sample is blocked inside a compound lens.
    pub fn sample_ray(&self, sensor: &SensorPoint, lens: &LensSample) -> Option<Ray> {
        match &self.optics {
            Optics::Pinhole => Some(self.generate_ray(sensor)),
            Optics::ThinLens {
                lens_radius,
                focal_distance,
            } => {
                let p_focus = self.film_direction(sensor) * *focal_distance;
                let (x, y) = disk_point(*lens_radius, lens.r, lens.theta);
                let p_lens = WorldPoint::new(x, y, 0.0);
                Some(self.world_ray(&p_lens, &(p_focus - p_lens.coords)))
            }
            Optics::Compound(compound) => {
                let (origin, direction) = compound.trace(sensor, lens)?;
                Some(
                    self.world_ray(&origin, &direction)
                        .with_range(0.0, self.far_clip),
                )
            }
        }
    }

    /// Focuses the optics at `distance` in front of the camera. Returns false for a pinhole,
    /// for invalid distances and for distances a compound lens can't focus on.
    pub fn set_focal_distance(&mut self, distance: FloatType) -> bool {
        if !(distance.is_finite() && distance > 0.0) {
            return false;
        }
        match &mut self.optics {
            Optics::Pinhole => false,
            Optics::ThinLens { focal_distance, .. } => {
                *focal_distance = distance;
                true
            }
            Optics::Compound(lens) => lens.focus_on(distance),
        }
    }

    pub fn focal_distance(&self) -> Option<FloatType> {
        match &self.optics {
            Optics::Pinhole => None,
            Optics::ThinLens { focal_distance, .. } => Some(*focal_distance),
            Optics::Compound(lens) => lens.focus_distance(),
        }
    }
}

/// Distance limits never let the camera reach its target, where the orientation is lost.
fn clamp_distance(r: FloatType, min_r: FloatType, max_r: FloatType) -> FloatType {
    r.clamp(min_r, max_r).max(EPSILON)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::{assert, check, let_assert};
    use test_case::test_case;

    fn camera(optics: Optics) -> Camera {
        // Looking down -Z from +Z, X goes right, Y goes up
        Camera::builder()
            .position(WorldPoint::new(0.0, 0.0, 5.0))
            .target(WorldPoint::origin())
            .resolution(ScreenSize::new(800, 600))
            .v_fov(60.0)
            .optics(optics)
            .build()
    }

    #[test]
    fn placement_reproduces_position() {
        let c = Camera::builder()
            .position(WorldPoint::new(1.0, 2.0, 3.0))
            .target(WorldPoint::new(0.0, 1.0, 0.0))
            .resolution(ScreenSize::new(10, 10))
            .build();
        assert!((c.position() - WorldPoint::new(1.0, 2.0, 3.0)).norm() < 1e-9);

        let forward = c.generate_ray(&SensorPoint::new(0.5, 0.5));
        let expected = (c.target() - c.position()).normalize();
        assert!((forward.direction - expected).norm() < 1e-9);
        assert!(c.up_dir().y > 0.0);
    }

    #[test]
    fn left_right_up_down() {
        let c = camera(Optics::Pinhole);
        let center = c.generate_ray(&SensorPoint::new(0.5, 0.5));
        let left = c.generate_ray(&SensorPoint::new(0.0, 0.5));
        let right = c.generate_ray(&SensorPoint::new(1.0, 0.5));
        let up = c.generate_ray(&SensorPoint::new(0.5, 1.0));
        let down = c.generate_ray(&SensorPoint::new(0.5, 0.0));

        check!((center.direction - -WorldVector::z()).norm() < 1e-9);
        check!(left.direction.x < 0.0);
        check!(right.direction.x > 0.0);
        check!(up.direction.y > 0.0);
        check!(down.direction.y < 0.0);

        // Top edge is half the vertical fov away from the axis
        let angle = up.direction.angle(&center.direction).to_degrees();
        check!((angle - 30.0).abs() < 1e-9);
        check!(center.min_t == 0.01);
    }

    #[test]
    fn horizontal_fov_follows_aspect_ratio() {
        let mut c = camera(Optics::Pinhole);
        let expected = 2.0 * ((30.0f64).to_radians().tan() * 800.0 / 600.0).atan().to_degrees();
        check!((c.h_fov() - expected).abs() < 1e-9);

        c.set_screen_size(ScreenSize::new(600, 600));
        check!(c.v_fov() == 60.0);
        check!((c.h_fov() - 60.0).abs() < 1e-9);
    }

    #[test_case(0.0, 0.0)]
    #[test_case(0.9, 1.0)]
    #[test_case(0.3, 4.0)]
    fn thin_lens_rays_meet_at_focal_plane(r: FloatType, theta: FloatType) {
        let c = camera(Optics::ThinLens {
            lens_radius: 0.2,
            focal_distance: 3.0,
        });
        let sensor = SensorPoint::new(0.7, 0.4);
        let pinhole = c.generate_ray(&sensor);
        let_assert!(Some(ray) = c.sample_ray(&sensor, &LensSample { r, theta }));

        // The focal plane is at z = 5 - 3 in world space
        let t_lens = (2.0 - ray.origin.z) / ray.direction.z;
        let t_pinhole = (2.0 - pinhole.origin.z) / pinhole.direction.z;
        assert!((ray.point_at(t_lens) - pinhole.point_at(t_pinhole)).norm() < 1e-9);
        assert!((ray.origin.z - 5.0).abs() < 1e-12);
        assert!((ray.origin - c.position()).norm() <= 0.2 + 1e-12);
    }

    #[test]
    fn rotation_keeps_distance_to_target() {
        let mut c = camera(Optics::Pinhole);
        c.rotate_by(0.3, 1.2);
        check!(((c.position() - c.target()).norm() - 5.0).abs() < 1e-9);

        let forward = c.generate_ray(&SensorPoint::new(0.5, 0.5));
        check!((forward.direction - (c.target() - c.position()).normalize()).norm() < 1e-9);

        // Polar angle is clamped at the poles
        c.rotate_by(10.0, 0.0);
        check!(c.position().y < -4.99);
    }

    #[test]
    fn move_forward_is_clamped() {
        let mut c = Camera::builder()
            .position(WorldPoint::new(0.0, 0.0, 5.0))
            .target(WorldPoint::origin())
            .resolution(ScreenSize::new(10, 10))
            .min_distance(1.0)
            .max_distance(10.0)
            .build();

        c.move_forward(2.0);
        check!((c.position().z - 3.0).abs() < 1e-9);
        c.move_forward(100.0);
        check!((c.position().z - 1.0).abs() < 1e-9);
        c.move_forward(-100.0);
        check!((c.position().z - 10.0).abs() < 1e-9);
    }

    #[test]
    fn moving_through_the_target_keeps_orientation() {
        let mut c = camera(Optics::Pinhole);
        c.move_forward(10.0);
        check!(c.position().iter().all(|x| x.is_finite()));
        c.move_forward(-1.0);

        let_assert!(Some(offset) = (c.position() - c.target()).try_normalize(0.0));
        check!(((c.position() - c.target()).norm() - 1.0).abs() < 1e-4);
        check!((offset - WorldVector::z()).norm() < 1e-9);

        let ray = c.generate_ray(&SensorPoint::new(0.3, 0.6));
        check!(ray.origin.iter().all(|x| x.is_finite()));
        check!(ray.direction.iter().all(|x| x.is_finite()));
        check!((c.generate_ray(&SensorPoint::new(0.5, 0.5)).direction + WorldVector::z()).norm() < 1e-9);
    }

    #[test_case(-0.1, 1.0 ; "negative_radius")]
    #[test_case(FloatType::NAN, 1.0 ; "nan_radius")]
    #[test_case(0.1, 0.0 ; "zero_distance")]
    #[test_case(0.1, -2.0 ; "negative_distance")]
    #[test_case(0.1, FloatType::INFINITY ; "infinite_distance")]
    fn invalid_thin_lens(lens_radius: FloatType, focal_distance: FloatType) {
        let_assert!(Err(LensError::InvalidThinLens { .. }) = Optics::thin_lens(lens_radius, focal_distance));

        let mut c = camera(Optics::Pinhole);
        let optics = Optics::ThinLens {
            lens_radius,
            focal_distance,
        };
        check!(c.set_optics(optics).is_err());
        let_assert!(Optics::Pinhole = c.optics());
    }

    #[test]
    fn focal_distance_must_be_positive() {
        let_assert!(Ok(optics) = Optics::thin_lens(0.0, 2.0));
        let mut c = camera(optics);
        check!(!c.set_focal_distance(0.0));
        check!(!c.set_focal_distance(-1.0));
        check!(!c.set_focal_distance(FloatType::NAN));
        check!(c.focal_distance() == Some(2.0));
    }

    #[test]
    fn compound_lens_refocuses() {
        let mut c = camera(Optics::Pinhole);
        let_assert!(Ok(lens) = CompoundLens::biconvex(0.2, 0.02, 1.5, 0.05, 0.04, 5.0, 60.0, 4.0 / 3.0));
        let_assert!(Ok(()) = c.set_optics(Optics::Compound(lens)));
        let_assert!(Some(initial) = c.focal_distance());
        check!((initial - 5.0).abs() < 0.25);

        check!(c.set_focal_distance(2.0));
        let_assert!(Some(refocused) = c.focal_distance());
        check!((refocused - 2.0).abs() < 1e-3);
    }

    #[test]
    fn move_by_pans_target_too() {
        let mut c = camera(Optics::Pinhole);
        let offset = c.position() - c.target();
        c.move_by(100.0, 0.0, 5.0);
        check!(c.position().x < 0.0);
        check!((c.position() - c.target() - offset).norm() < 1e-9);
    }

    #[test]
    fn copy_placement_keeps_optics() {
        let mut a = camera(Optics::ThinLens {
            lens_radius: 0.1,
            focal_distance: 2.0,
        });
        let mut b = camera(Optics::Pinhole);
        b.rotate_by(0.5, 0.5);

        a.copy_placement(&b);
        check!(a.position() == b.position());
        check!(a.focal_distance() == Some(2.0));
        check!(a.set_focal_distance(4.0));
        check!(!b.set_focal_distance(4.0));
    }
}
