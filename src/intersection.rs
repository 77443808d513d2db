//! Cutting oriented boxes and rectangles with an image plane

use crate::geometry::{Matrix3f, Point2, Point3, Vector3f};
use crate::image_geometry::ImageGeometry;

/// Points closer than this to the plane count as lying on it.
const PLANE_TOLERANCE_MM: f64 = 1e-9;

/// Intersection points closer than this are merged.
const MERGE_TOLERANCE_MM: f64 = 1e-6;

/// Corner `i` sits at `centre + Σ ±half[k]·axis[k]`, with bit `k` of `i`
/// selecting the sign.
const BOX_EDGES: [(usize, usize); 12] = [
    (0, 1), (2, 3), (4, 5), (6, 7),
    (0, 2), (1, 3), (4, 6), (5, 7),
    (0, 4), (1, 5), (2, 6), (3, 7),
];

const RECTANGLE_EDGES: [(usize, usize); 4] = [(0, 1), (1, 2), (2, 3), (3, 0)];

/// A box in LPS space; the columns of `axes` are its unit edge directions.
#[derive(Clone, Debug, PartialEq)]
pub struct OrientedBox {
    pub centre: Point3,
    pub axes: Matrix3f,
    pub half_extents: Vector3f,
}

impl OrientedBox {
    pub fn corners(&self) -> [Point3; 8] {
        std::array::from_fn(|i| {
            let sign = |bit: usize| if i & (1 << bit) == 0 { -1.0 } else { 1.0 };
            self.centre
                + self.axes.column(0) * (sign(0) * self.half_extents.x)
                + self.axes.column(1) * (sign(1) * self.half_extents.y)
                + self.axes.column(2) * (sign(2) * self.half_extents.z)
        })
    }
}

/// Outline of the scan volume and its slices as seen in one image, in pixel
/// coordinates. All three are empty when the volume misses the image.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IntersectionPolygons {
    pub volume: Vec<Point2>,
    pub middle_slice: Vec<Point2>,
    pub slices: Vec<Vec<Point2>>,
}

impl IntersectionPolygons {
    pub fn is_empty(&self) -> bool {
        self.volume.is_empty() && self.middle_slice.is_empty() && self.slices.is_empty()
    }

    /// Mean of the outline's vertices, if there is an outline.
    pub fn centre(&self) -> Option<Point2> {
        if self.volume.is_empty() {
            return None;
        }
        let sum = self.volume.iter().fold(Point2::origin(), |acc, p| acc + p.coords);
        Some(sum / self.volume.len() as f64)
    }
}

/// Cut a box with the image plane; returns the section polygon in pixel
/// coordinates, ordered around its centroid, or nothing if fewer than three
/// distinct points remain.
pub fn box_section(shape: &OrientedBox, image: &ImageGeometry) -> Vec<Point2> {
    let points = plane_crossings(&shape.corners(), &BOX_EDGES, image);
    if points.len() < 3 {
        return Vec::new();
    }
    order_around_centroid(points.iter().map(|p| image.lps_to_pixel(p)).collect())
}

/// Cut a rectangle (corners in cyclic order) with the image plane; normally a
/// segment, or the whole rectangle when it lies in the plane.
pub fn rectangle_section(corners: &[Point3; 4], image: &ImageGeometry) -> Vec<Point2> {
    let points = plane_crossings(corners, &RECTANGLE_EDGES, image);
    if points.len() < 2 {
        return Vec::new();
    }
    order_around_centroid(points.iter().map(|p| image.lps_to_pixel(p)).collect())
}

/// Whether the bounding box of `polygon` overlaps the image's pixel area.
pub fn overlaps_image(polygon: &[Point2], image: &ImageGeometry) -> bool {
    let (min, max) = polygon.iter().fold(
        (
            Point2::new(f64::INFINITY, f64::INFINITY),
            Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        ),
        |(min, max), p| (min.inf(p), max.sup(p)),
    );
    let (columns, rows) = (image.columns() as f64, image.rows() as f64);
    max.x >= 0.0 && max.y >= 0.0 && min.x <= columns && min.y <= rows
}

fn plane_crossings(
    corners: &[Point3],
    edges: &[(usize, usize)],
    image: &ImageGeometry,
) -> Vec<Point3> {
    let distances: Vec<f64> = corners.iter().map(|c| image.signed_distance(c)).collect();
    let mut points: Vec<Point3> = Vec::new();
    let mut push = |p: Point3| {
        if points.iter().all(|q| (q - p).norm() > MERGE_TOLERANCE_MM) {
            points.push(p);
        }
    };

    for &(a, b) in edges {
        let (da, db) = (distances[a], distances[b]);
        let (pa, pb) = (corners[a], corners[b]);
        if da.abs() <= PLANE_TOLERANCE_MM {
            push(pa);
        }
        if db.abs() <= PLANE_TOLERANCE_MM {
            push(pb);
        }
        let opposite = (da < -PLANE_TOLERANCE_MM && db > PLANE_TOLERANCE_MM)
            || (da > PLANE_TOLERANCE_MM && db < -PLANE_TOLERANCE_MM);
        if opposite {
            let t = da / (da - db);
            push(pa + (pb - pa) * t);
        }
    }
    points
}

fn order_around_centroid(mut points: Vec<Point2>) -> Vec<Point2> {
    let n = points.len() as f64;
    let centroid = points.iter().fold(Point2::origin(), |acc, p| acc + p.coords) / n;
    points.sort_by(|a, b| {
        let angle_a = (a.y - centroid.y).atan2(a.x - centroid.x);
        let angle_b = (b.y - centroid.y).atan2(b.x - centroid.x);
        angle_a.total_cmp(&angle_b)
    });
    points
}
