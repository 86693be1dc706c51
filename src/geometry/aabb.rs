use num_traits::One;
use std::ops::Sub;

use nalgebra::{ClosedAddAssign, ClosedDivAssign, Point, Point2, Scalar};

use super::{FloatType, ScreenPoint, ScreenSize, WorldPoint, WorldVector};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AABB<Point> {
    pub min: Point,
    pub max: Point,
}

impl<Point> AABB<Point> {
    pub fn new(min: Point, max: Point) -> AABB<Point> {
        AABB { min, max }
    }

    pub fn map<Point2, F: FnMut(&Point) -> Point2>(&self, mut f: F) -> AABB<Point2> {
        AABB {
            min: f(&self.min),
            max: f(&self.max),
        }
    }

    pub fn zip_map<Point2, Point3, F: FnMut(&Point, &Point2) -> Point3>(
        &self,
        rhs: &AABB<Point2>,
        mut f: F,
    ) -> AABB<Point3> {
        AABB {
            min: f(&self.min, &rhs.min),
            max: f(&self.max, &rhs.max),
        }
    }
}

impl<Point: Sub + Copy> AABB<Point> {
    pub fn size(&self) -> Point::Output {
        self.max - self.min
    }
}

impl<T: Scalar + Copy + Sub> AABB<Point2<T>> {
    pub fn width(&self) -> T::Output {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> T::Output {
        self.max[1] - self.min[1]
    }
}

impl<T: Scalar + ClosedAddAssign + ClosedDivAssign + One, const D: usize> AABB<Point<T, D>> {
    pub fn center(&self) -> Point<T, D> {
        let two = T::one() + T::one();
        let avg_coords = (&self.min.coords + &self.max.coords) / two;
        Point::from(avg_coords)
    }
}

impl<Point> From<[Point; 2]> for AABB<Point> {
    fn from(value: [Point; 2]) -> Self {
        let [min, max] = value;
        AABB { min, max }
    }
}

impl<Point> From<(Point, Point)> for AABB<Point> {
    fn from(value: (Point, Point)) -> Self {
        let (min, max) = value;
        AABB { min, max }
    }
}

impl AABB<WorldPoint> {
    /// Box that contains nothing, neutral element of `union`.
    pub fn empty() -> Self {
        AABB {
            min: WorldPoint::from(WorldVector::repeat(FloatType::INFINITY)),
            max: WorldPoint::from(WorldVector::repeat(FloatType::NEG_INFINITY)),
        }
    }

    pub fn from_point(p: &WorldPoint) -> Self {
        AABB { min: *p, max: *p }
    }

    /// Smallest box containing all points, None if the iterator is empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a WorldPoint>) -> Option<Self> {
        let mut it = points.into_iter();
        let first = it.next()?;
        let mut ret = Self::from_point(first);
        for p in it {
            ret.expand_point(p);
        }
        Some(ret)
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand_point(&mut self, p: &WorldPoint) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn expand(&mut self, other: &Self) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut ret = self.clone();
        ret.expand(other);
        ret
    }

    /// Returns true if `other` lies completely inside this box (boundaries included).
    pub fn contains_box(&self, other: &Self) -> bool {
        (0..3).all(|i| self.min[i] <= other.min[i] && other.max[i] <= self.max[i])
    }

    /// Index of the axis along which the box is largest.
    /// Ties go to the first of the tied axes in X, Y, Z order.
    pub fn longest_axis(&self) -> usize {
        let size = self.size();
        let mut axis = 0;
        for i in 1..3 {
            if size[i] > size[axis] {
                axis = i;
            }
        }
        axis
    }
}

impl AABB<ScreenPoint> {
    pub fn from_size(size: ScreenSize) -> Self {
        AABB {
            min: ScreenPoint::origin(),
            max: ScreenPoint::from(size),
        }
    }

    pub fn is_empty_or_negative(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    pub fn area(&self) -> u32 {
        if self.is_empty_or_negative() {
            0
        } else {
            self.width() * self.height()
        }
    }

    /// Returns true if the point is inside, max is exclusive.
    pub fn contains(&self, p: &ScreenPoint) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    pub fn contains_block(&self, other: &Self) -> bool {
        other.min.x >= self.min.x
            && other.min.y >= self.min.y
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
    }
}
