use std::ops::{Add, Index, IndexMut, Mul};

use nalgebra::{DefaultAllocator, DimName, OPoint, OVector, Scalar, allocator::Allocator};

use super::{FloatType, WorldPoint, WorldVector};

#[derive(Clone, Debug, PartialEq)]
pub struct Triangle<Point>([Point; 3]);

impl<Point> Triangle<Point> {
    pub fn new(a: Point, b: Point, c: Point) -> Triangle<Point> {
        Triangle([a, b, c])
    }

    pub fn iter<'a>(&'a self) -> impl Iterator<Item = &'a Point> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        3
    }

    pub fn map<Point2, F: FnMut(&Point) -> Point2>(&self, mut f: F) -> Triangle<Point2> {
        Triangle([f(&self[0]), f(&self[1]), f(&self[2])])
    }

    pub fn zip_map<Point2, Point3, F: FnMut(&Point, &Point2) -> Point3>(
        &self,
        rhs: &Triangle<Point2>,
        mut f: F,
    ) -> Triangle<Point3> {
        Triangle([
            f(&self.0[0], &rhs.0[0]),
            f(&self.0[1], &rhs.0[1]),
            f(&self.0[2], &rhs.0[2]),
        ])
    }
}

impl<Point: Default> Default for Triangle<Point> {
    fn default() -> Self {
        Triangle([Default::default(), Default::default(), Default::default()])
    }
}

impl<Point> Index<usize> for Triangle<Point> {
    type Output = Point;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<Point> IndexMut<usize> for Triangle<Point> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<D: DimName> Triangle<OPoint<FloatType, D>>
where
    DefaultAllocator: Allocator<D>,
{
    pub fn centroid(&self) -> OPoint<FloatType, D> {
        OPoint {
            coords: self.0.iter().map(|p| &p.coords).sum::<OVector<FloatType, D>>()
                / (self.0.len() as FloatType),
        }
    }
}

impl Triangle<WorldPoint> {
    /// Returns edge vectors, coming from self[0]
    pub fn edges(&self) -> [WorldVector; 2] {
        [self.0[1] - self.0[0], self.0[2] - self.0[0]]
    }

    /// Returns a normal vector of the triangle, not normalized.
    pub fn normal(&self) -> WorldVector {
        let [e1, e2] = self.edges();
        e1.cross(&e2)
    }
}

/// Barycentric coordinates of a point in a triangle, weights of the second and third vertex.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BarycentricCoordinates<T: Scalar> {
    pub u: T,
    pub v: T,
}

impl BarycentricCoordinates<FloatType> {
    pub fn interpolate<T2>(&self, a: &T2, b: &T2, c: &T2) -> T2
    where
        for<'a> &'a T2: Mul<FloatType, Output = T2>,
        T2: Add<Output = T2>,
    {
        let w = 1.0 - self.u - self.v;
        a * w + b * self.u + c * self.v
    }

    pub fn interpolate_triangle<T2>(&self, triangle: &Triangle<T2>) -> T2
    where
        for<'a> &'a T2: Mul<FloatType, Output = T2>,
        T2: Add<Output = T2>,
    {
        self.interpolate(&triangle[0], &triangle[1], &triangle[2])
    }
}
