use crate::enums::{GeometryError, ScanPlane};
use crate::geometry::{Point2, Point3, Vector2, Vector3f};

/// Frame of a single 2D image in patient (LPS) space.
///
/// Three coordinate systems are tied together here:
///  - pixel coordinates, continuous, with pixel `(i, j)` covering
///    `[i, i+1) × [j, j+1)`; `x` runs along columns and `y` along rows
///  - in-plane millimetres measured from the outer corner of pixel `(0, 0)`
///  - LPS millimetres
///
/// `origin_lps` is the centre of pixel `(0, 0)` and is written unchanged as
/// DICOM ImagePositionPatient; `axis_x_lps`/`axis_y_lps` form
/// ImageOrientationPatient.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageGeometry {
    pub plane: ScanPlane,
    pub origin_lps: Point3,
    pub axis_x_lps: Vector3f,
    pub axis_y_lps: Vector3f,
    pub axis_z_lps: Vector3f,
    pub resolution_mm: [f64; 2],
    pub extent_mm: [f64; 2],
}

impl ImageGeometry {
    /// Build a geometry from the image centre and its in-plane axes.
    pub fn from_centre(
        plane: ScanPlane,
        centre: Point3,
        axis_x: Vector3f,
        axis_y: Vector3f,
        extent_mm: [f64; 2],
        resolution_mm: [f64; 2],
    ) -> Self {
        let axis_x = axis_x.normalize();
        let axis_y = axis_y.normalize();
        let axis_z = axis_x.cross(&axis_y).normalize();
        let corner = centre - axis_x * (extent_mm[0] / 2.0) - axis_y * (extent_mm[1] / 2.0);
        let origin_lps =
            corner + axis_x * (resolution_mm[0] / 2.0) + axis_y * (resolution_mm[1] / 2.0);
        Self {
            plane,
            origin_lps,
            axis_x_lps: axis_x,
            axis_y_lps: axis_y,
            axis_z_lps: axis_z,
            resolution_mm,
            extent_mm,
        }
    }

    /// An unrotated image in one of the three principal planes, oriented the
    /// way radiological viewers display it.
    pub fn principal(
        plane: ScanPlane,
        centre: Point3,
        extent_mm: [f64; 2],
        resolution_mm: [f64; 2],
    ) -> Result<Self, GeometryError> {
        let (axis_x, axis_y) = match plane {
            ScanPlane::Axial => (Vector3f::x(), Vector3f::y()),
            ScanPlane::Sagittal => (Vector3f::y(), -Vector3f::z()),
            ScanPlane::Coronal => (Vector3f::x(), -Vector3f::z()),
            ScanPlane::Oblique => return Err(GeometryError::UnknownPlane(plane)),
        };
        Ok(Self::from_centre(plane, centre, axis_x, axis_y, extent_mm, resolution_mm))
    }

    pub fn columns(&self) -> usize {
        ((self.extent_mm[0] / self.resolution_mm[0]).round() as usize).max(1)
    }

    pub fn rows(&self) -> usize {
        ((self.extent_mm[1] / self.resolution_mm[1]).round() as usize).max(1)
    }

    /// Outer corner of pixel `(0, 0)`
    pub fn corner_lps(&self) -> Point3 {
        self.origin_lps
            - self.axis_x_lps * (self.resolution_mm[0] / 2.0)
            - self.axis_y_lps * (self.resolution_mm[1] / 2.0)
    }

    pub fn centre_lps(&self) -> Point3 {
        self.mm_to_lps(&Point2::new(self.extent_mm[0] / 2.0, self.extent_mm[1] / 2.0))
    }

    pub fn pixel_to_mm(&self, pixel: &Point2) -> Point2 {
        Point2::new(pixel.x * self.resolution_mm[0], pixel.y * self.resolution_mm[1])
    }

    pub fn mm_to_pixel(&self, mm: &Point2) -> Point2 {
        Point2::new(mm.x / self.resolution_mm[0], mm.y / self.resolution_mm[1])
    }

    pub fn mm_to_lps(&self, mm: &Point2) -> Point3 {
        self.corner_lps() + self.axis_x_lps * mm.x + self.axis_y_lps * mm.y
    }

    /// Orthogonal projection of an LPS point onto the image plane.
    pub fn lps_to_mm(&self, lps: &Point3) -> Point2 {
        let offset = lps - self.corner_lps();
        Point2::new(offset.dot(&self.axis_x_lps), offset.dot(&self.axis_y_lps))
    }

    pub fn pixel_to_lps(&self, pixel: &Point2) -> Point3 {
        self.mm_to_lps(&self.pixel_to_mm(pixel))
    }

    pub fn lps_to_pixel(&self, lps: &Point3) -> Point2 {
        self.mm_to_pixel(&self.lps_to_mm(lps))
    }

    /// LPS displacement corresponding to a drag of `delta` pixels.
    pub fn pixel_delta_to_lps(&self, delta: &Vector2) -> Vector3f {
        self.axis_x_lps * (delta.x * self.resolution_mm[0])
            + self.axis_y_lps * (delta.y * self.resolution_mm[1])
    }

    /// In-plane position of the centre of pixel `(column, row)`
    pub fn pixel_centre_mm(&self, column: usize, row: usize) -> Point2 {
        Point2::new(
            (column as f64 + 0.5) * self.resolution_mm[0],
            (row as f64 + 0.5) * self.resolution_mm[1],
        )
    }

    /// Distance of `lps` from the image plane along the plane normal.
    pub fn signed_distance(&self, lps: &Point3) -> f64 {
        (lps - self.origin_lps).dot(&self.axis_z_lps)
    }
}
