//! Compound lens made of spherical elements.
//!
//! Lens space is the camera space: the optical axis is Z, the scene lies towards -Z and the
//! sensor sits behind the elements at positive Z. Elements are ordered from the sensor
//! towards the scene.

use arrayvec::ArrayVec;
use bon::bon;
use itertools::Itertools;
use nalgebra::{Unit, Vector2};
use thiserror::Error;

use super::LensSample;
use crate::{
    bsdf::refract,
    geometry::{FloatType, Ray, SensorPoint, ShadingFrame, WorldPoint, WorldVector, sphere_roots},
    sampling::disk_point,
};

pub const MAX_ELEMENTS: usize = 6;

#[derive(Debug, Error, PartialEq)]
pub enum LensError {
    #[error("Lens needs at least one element")]
    NoElements,

    #[error("Lens can have at most {MAX_ELEMENTS} elements")]
    TooManyElements,

    #[error("Element {0} is not in front of the previous one")]
    UnorderedElements(usize),

    #[error("Element {index} has invalid {parameter}: {value}")]
    InvalidParameter {
        index: usize,
        parameter: &'static str,
        value: FloatType,
    },

    #[error("Sensor at z = {0} is not behind the first element")]
    SensorInFront(FloatType),

    #[error("Invalid aperture radius {0}")]
    InvalidAperture(FloatType),

    #[error("Thin lens has invalid {parameter}: {value}")]
    InvalidThinLens {
        parameter: &'static str,
        value: FloatType,
    },
}

/// One spherical face of a lens element.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LensSurface {
    /// Radius of the sphere the surface is cut from, only the magnitude matters
    pub radius_of_curvature: FloatType,
    /// Position of the sphere center along the axis, relative to the element
    pub sphere_offset: FloatType,
    /// Index of refraction of the element glass as seen through this surface
    pub ior: FloatType,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LensElement {
    /// Axial position
    pub z: FloatType,
    /// Physical radius, rays hitting a surface further from the axis are vignetted
    pub radius: FloatType,
    /// Surface facing the sensor
    pub back: LensSurface,
    /// Surface facing the scene
    pub front: LensSurface,
}

/// Circular stop perpendicular to the axis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aperture {
    pub z: FloatType,
    pub radius: FloatType,
}

/// How far past its initial distance from the rear element the sensor may move when focusing,
/// as a multiple of that distance.
const FOCUS_RANGE: FloatType = 4.0;
const FOCUS_ITERATIONS: usize = 64;

#[derive(Clone, Debug)]
pub struct CompoundLens {
    elements: ArrayVec<LensElement, MAX_ELEMENTS>,
    aperture: Option<Aperture>,
    /// Number of elements a ray passes before reaching the aperture plane
    aperture_slot: usize,
    sensor_z: FloatType,
    /// Shift of the sensor along the axis set by focusing, positive moves it away from the lens
    focus_offset: FloatType,
    sensor_size: Vector2<FloatType>,
    /// Distance a refracted ray is pushed past the surface it leaves
    exit_offset: FloatType,
}

#[bon]
impl CompoundLens {
    #[builder]
    pub fn new(
        elements: Vec<LensElement>,
        aperture: Option<Aperture>,
        sensor_z: FloatType,
        sensor_size: Vector2<FloatType>,
        #[builder(default = 1e-6)] exit_offset: FloatType,
    ) -> Result<Self, LensError> {
        let elements = ArrayVec::<LensElement, MAX_ELEMENTS>::try_from(elements.as_slice())
            .map_err(|_| LensError::TooManyElements)?;

        let first = elements.first().ok_or(LensError::NoElements)?;
        if sensor_z <= first.z {
            return Err(LensError::SensorInFront(sensor_z));
        }

        for (index, element) in elements.iter().enumerate() {
            validate_element(index, element)?;
        }

        if let Some((index, _)) = elements
            .iter()
            .tuple_windows()
            .enumerate()
            .find(|(_, (previous, next))| next.z >= previous.z)
        {
            return Err(LensError::UnorderedElements(index + 1));
        }

        if let Some(aperture) = &aperture {
            if !(aperture.radius > 0.0) {
                return Err(LensError::InvalidAperture(aperture.radius));
            }
        }
        let aperture_slot = aperture.map_or(0, |aperture| {
            elements.iter().take_while(|e| e.z > aperture.z).count()
        });

        Ok(CompoundLens {
            elements,
            aperture,
            aperture_slot,
            sensor_z,
            focus_offset: 0.0,
            sensor_size,
            exit_offset,
        })
    }
}

fn validate_element(index: usize, element: &LensElement) -> Result<(), LensError> {
    let invalid = |parameter, value| LensError::InvalidParameter {
        index,
        parameter,
        value,
    };

    if !(element.radius > 0.0) {
        return Err(invalid("radius", element.radius));
    }
    for surface in [&element.back, &element.front] {
        if !(surface.radius_of_curvature.is_finite() && surface.radius_of_curvature != 0.0) {
            return Err(invalid("radius of curvature", surface.radius_of_curvature));
        }
        if !(surface.ior > 0.0) {
            return Err(invalid("index of refraction", surface.ior));
        }
    }
    Ok(())
}

impl CompoundLens {
    /// Single symmetric biconvex element focused at `focus_distance` in front of the lens,
    /// with the sensor sized for the given vertical field of view and aspect ratio.
    #[allow(clippy::too_many_arguments)]
    pub fn biconvex(
        radius_of_curvature: FloatType,
        thickness: FloatType,
        ior: FloatType,
        element_radius: FloatType,
        aperture_radius: FloatType,
        focus_distance: FloatType,
        v_fov_degrees: FloatType,
        aspect_ratio: FloatType,
    ) -> Result<Self, LensError> {
        let r = radius_of_curvature;
        let d = thickness;
        let n = ior;

        // Thick lens equations
        let focal_length = 1.0 / ((n - 1.0) * (2.0 / r - (n - 1.0) * d / (n * r * r)));
        let principal_offset = focal_length * (n - 1.0) * d / (n * r);
        let object_distance = focus_distance - d / 2.0 + principal_offset;
        let image_distance = 1.0 / (1.0 / focal_length - 1.0 / object_distance);

        let sensor_height = 2.0 * image_distance * (v_fov_degrees.to_radians() / 2.0).tan();

        Self::builder()
            .elements(vec![LensElement {
                z: 0.0,
                radius: element_radius,
                back: LensSurface {
                    radius_of_curvature: r,
                    sphere_offset: d / 2.0 - r,
                    ior,
                },
                front: LensSurface {
                    radius_of_curvature: r,
                    sphere_offset: r - d / 2.0,
                    ior,
                },
            }])
            .aperture(Aperture {
                z: -d,
                radius: aperture_radius,
            })
            .sensor_z(d / 2.0 - principal_offset + image_distance)
            .sensor_size(Vector2::new(sensor_height * aspect_ratio, sensor_height))
            .build()
    }

    pub fn elements(&self) -> &[LensElement] {
        &self.elements
    }

    pub fn aperture(&self) -> Option<&Aperture> {
        self.aperture.as_ref()
    }

    /// Axial position of the sensor, including the focus offset.
    pub fn sensor_z(&self) -> FloatType {
        self.sensor_z + self.focus_offset
    }

    pub fn focus_offset(&self) -> FloatType {
        self.focus_offset
    }

    /// Distance in front of the lens that is in focus with the current sensor position.
    /// None if the lens can't form a real image there.
    pub fn focus_distance(&self) -> Option<FloatType> {
        self.axis_crossing(self.sensor_z())
    }

    /// Moves the sensor so that the plane at `distance` in front of the lens is in focus.
    /// Returns false and keeps the sensor where it was if no sensor position focuses there.
    pub fn focus_on(&mut self, distance: FloatType) -> bool {
        if !(distance.is_finite() && distance > 0.0) {
            return false;
        }

        // Moving the sensor away from the lens brings the focus closer
        let Some(rear) = self.elements.first() else {
            return false;
        };
        let gap = self.sensor_z - vertex_z(rear, &rear.back);
        let mut near = vertex_z(rear, &rear.back) + gap * 1e-3;
        let mut far = self.sensor_z + gap * FOCUS_RANGE;

        let focuses_beyond = |z| self.axis_crossing(z).is_none_or(|d| d > distance);
        if !focuses_beyond(near) || focuses_beyond(far) {
            log::debug!("Distance {distance} is outside of the focusing range");
            return false;
        }

        for _ in 0..FOCUS_ITERATIONS {
            let mid = (near + far) / 2.0;
            if focuses_beyond(mid) {
                near = mid;
            } else {
                far = mid;
            }
        }

        self.focus_offset = (near + far) / 2.0 - self.sensor_z;
        true
    }

    /// Distance in front of the lens where a paraxial ray from the center of a sensor
    /// placed at `sensor_z` crosses the axis.
    fn axis_crossing(&self, sensor_z: FloatType) -> Option<FloatType> {
        let sensor = WorldPoint::new(0.0, 0.0, sensor_z);
        let (origin, direction) = self.trace_from(sensor, &LensSample { r: 1e-6, theta: 0.0 })?;
        if !(direction.x * origin.x < 0.0) {
            return None;
        }
        let t = -origin.x / direction.x;
        Some(-(origin.z + direction.z * t))
    }

    /// Traces a ray from the sensor point through a sampled point on the rear element.
    /// Returns the origin and direction of the ray leaving the front of the lens in camera
    /// space, or None if the ray is blocked.
    pub(super) fn trace(
        &self,
        sensor: &SensorPoint,
        lens: &LensSample,
    ) -> Option<(WorldPoint, WorldVector)> {
        // The lens flips the image, the sensor is mirrored to compensate
        let film = WorldPoint::new(
            (0.5 - sensor.x) * self.sensor_size.x,
            (0.5 - sensor.y) * self.sensor_size.y,
            self.sensor_z(),
        );
        self.trace_from(film, lens)
    }

    fn trace_from(&self, film: WorldPoint, lens: &LensSample) -> Option<(WorldPoint, WorldVector)> {
        let rear = self.elements.first()?;
        let (x, y) = disk_point(rear.radius, lens.r, lens.theta);
        let target = WorldPoint::new(x, y, vertex_z(rear, &rear.back));
        let mut ray = Ray::new(film, target - film);

        for (i, element) in self.elements.iter().enumerate() {
            if i == self.aperture_slot {
                self.check_aperture(&ray)?;
            }
            ray = self.refract_through(&ray, element, &element.back, false)?;
            ray = self.refract_through(&ray, element, &element.front, true)?;
        }
        if self.aperture_slot == self.elements.len() {
            self.check_aperture(&ray)?;
        }

        Some((ray.origin, ray.direction))
    }

    fn check_aperture(&self, ray: &Ray) -> Option<()> {
        let Some(aperture) = &self.aperture else {
            return Some(());
        };
        if ray.direction.z == 0.0 {
            return None;
        }
        let t = (aperture.z - ray.origin.z) / ray.direction.z;
        let p = ray.point_at(t);
        (t >= 0.0 && p.x * p.x + p.y * p.y <= aperture.radius * aperture.radius).then_some(())
    }

    fn refract_through(
        &self,
        ray: &Ray,
        element: &LensElement,
        surface: &LensSurface,
        exiting: bool,
    ) -> Option<Ray> {
        let radius = surface.radius_of_curvature.abs();
        let center = WorldPoint::new(0.0, 0.0, element.z + surface.sphere_offset);
        let vertex = vertex_z(element, surface);

        let (t1, t2) = sphere_roots(ray, &center, radius)?;
        let t = [t1, t2]
            .into_iter()
            .filter(|t| *t > 0.0)
            .min_by(|a, b| {
                let da = (ray.point_at(*a).z - vertex).abs();
                let db = (ray.point_at(*b).z - vertex).abs();
                da.total_cmp(&db)
            })?;

        let p = ray.point_at(t);
        if p.x * p.x + p.y * p.y > element.radius * element.radius {
            return None;
        }

        let mut normal = (p - center) / radius;
        if normal.dot(&ray.direction) > 0.0 {
            normal = -normal;
        }
        let frame = ShadingFrame::new(&Unit::new_normalize(normal));

        let wo = frame.to_local(&-ray.direction);
        let ior = if exiting {
            1.0 / surface.ior
        } else {
            surface.ior
        };
        let direction = frame.to_world(&refract(&wo, ior)?);

        Some(Ray::new(p + direction * self.exit_offset, direction))
    }
}

/// Axial position of the point where the surface crosses the axis.
fn vertex_z(element: &LensElement, surface: &LensSurface) -> FloatType {
    let center = element.z + surface.sphere_offset;
    let radius = surface.radius_of_curvature.abs();
    [center - radius, center + radius]
        .into_iter()
        .min_by(|a, b| (a - element.z).abs().total_cmp(&(b - element.z).abs()))
        .unwrap_or(center)
}
