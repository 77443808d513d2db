use crate::acquisition::AcquiredImage;
use crate::config::ScannerConfig;
use crate::enums::{GeometryError, RotationAxis, ScanPlane, VolumeAxis};
use crate::geometry::{Matrix3f, Point2, Point3, Rotations, Vector3f};
use crate::image_geometry::ImageGeometry;
use crate::intersection::{
    IntersectionPolygons, OrientedBox, box_section, overlaps_image, rectangle_section,
};

/// Shrinking to fit the scanner is skipped when it would change extents by
/// less than this relative amount.
const FIT_TOLERANCE: f64 = 1e-12;

const VOLUME_AXES: [VolumeAxis; 3] = [VolumeAxis::X, VolumeAxis::Y, VolumeAxis::Z];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SliceLayout {
    pub count: usize,
    pub thickness_mm: f64,
    pub gap_mm: f64,
}

impl SliceLayout {
    pub fn new(count: usize, thickness_mm: f64, gap_mm: f64) -> Self {
        Self {
            count: count.max(1),
            thickness_mm,
            gap_mm,
        }
    }

    /// Distance between the centres of neighbouring slices
    pub fn pitch_mm(&self) -> f64 {
        self.thickness_mm + self.gap_mm
    }

    /// Total thickness covered by all slices and the gaps between them
    pub fn slab_mm(&self) -> f64 {
        self.count as f64 * self.thickness_mm + (self.count as f64 - 1.0) * self.gap_mm
    }

    /// Offset of slice `index` from the slab centre along the slice direction
    pub fn offset_mm(&self, index: usize) -> f64 {
        (index as f64 - (self.count as f64 - 1.0) / 2.0) * self.pitch_mm()
    }

    fn scaled(&self, factor: f64) -> Self {
        Self {
            count: self.count,
            thickness_mm: self.thickness_mm * factor,
            gap_mm: self.gap_mm * factor,
        }
    }
}

/// The oriented box a user plans to acquire.
///
/// Extents are given along the volume's own axes (the columns of its
/// orientation matrix). The extent along the slice direction is always the
/// slab thickness of the slice layout.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanVolume {
    scan_plane: ScanPlane,
    position: Point3,
    rotations: Rotations,
    orientation: Matrix3f,
    extents: Vector3f,
    slices: SliceLayout,
    scanner_dimensions: Vector3f,
    min_extent_mm: f64,
}

/// Volume axes spanning the images of a scan in `plane`, as (columns, rows).
pub fn in_plane_axes(plane: ScanPlane) -> Result<(VolumeAxis, VolumeAxis), GeometryError> {
    match plane {
        ScanPlane::Axial => Ok((VolumeAxis::X, VolumeAxis::Y)),
        ScanPlane::Sagittal => Ok((VolumeAxis::Y, VolumeAxis::Z)),
        ScanPlane::Coronal => Ok((VolumeAxis::X, VolumeAxis::Z)),
        ScanPlane::Oblique => Err(GeometryError::UnknownPlane(plane)),
    }
}

/// Volume axes a scale gesture on a viewer of `plane` acts on, as
/// (screen x, screen y).
///
/// Once the volume is turned about the viewer's axis by roughly a quarter
/// turn, its axes appear swapped on screen. The angle about that axis is
/// folded onto [0°, 180°) and the axes swap in the [45°, 135°) quadrant.
pub fn determine_axis_to_scale(
    plane: ScanPlane,
    rotations: &Rotations,
) -> Result<(VolumeAxis, VolumeAxis), GeometryError> {
    let (screen_x, screen_y) = in_plane_axes(plane)?;
    let angle = rotations.get(RotationAxis::normal_to(plane)?);
    let folded = angle.to_degrees().rem_euclid(180.0);
    if (45.0..135.0).contains(&folded) {
        Ok((screen_y, screen_x))
    } else {
        Ok((screen_x, screen_y))
    }
}

fn slice_axis(plane: ScanPlane) -> Result<VolumeAxis, GeometryError> {
    match plane {
        ScanPlane::Axial => Ok(VolumeAxis::Z),
        ScanPlane::Sagittal => Ok(VolumeAxis::X),
        ScanPlane::Coronal => Ok(VolumeAxis::Y),
        ScanPlane::Oblique => Err(GeometryError::UnknownPlane(plane)),
    }
}

impl ScanVolume {
    /// A volume centred on the isocentre with no rotation
    ///
    /// # Arguments
    ///
    /// * `scan_plane` - Plane the slices are acquired in
    /// * `fov_mm` - In-plane size of every slice (columns, rows)
    /// * `slices` - Number, thickness and spacing of the slices
    /// * `scanner` - Bounds the volume must stay within
    ///
    /// # Errors
    ///
    /// Returns error for an oblique scan plane, which has no slice direction
    pub fn new(
        scan_plane: ScanPlane,
        fov_mm: [f64; 2],
        slices: SliceLayout,
        scanner: &ScannerConfig,
    ) -> Result<Self, GeometryError> {
        let (columns, rows) = in_plane_axes(scan_plane)?;
        let mut extents = Vector3f::zeros();
        extents[columns.index()] = fov_mm[0];
        extents[rows.index()] = fov_mm[1];
        extents[slice_axis(scan_plane)?.index()] = slices.slab_mm();

        let mut volume = Self {
            scan_plane,
            position: Point3::origin(),
            rotations: Rotations::default(),
            orientation: Matrix3f::identity(),
            extents,
            slices,
            scanner_dimensions: Vector3f::from(scanner.dimensions_mm),
            min_extent_mm: scanner.min_extent_mm,
        };
        volume.clamp_to_scanner_dimensions();
        Ok(volume)
    }

    pub fn scan_plane(&self) -> ScanPlane {
        self.scan_plane
    }

    pub fn position(&self) -> Point3 {
        self.position
    }

    pub fn get_rotations(&self) -> Rotations {
        self.rotations
    }

    pub fn orientation(&self) -> &Matrix3f {
        &self.orientation
    }

    pub fn extents(&self) -> Vector3f {
        self.extents
    }

    pub fn slices(&self) -> SliceLayout {
        self.slices
    }

    pub fn slice_axis(&self) -> VolumeAxis {
        // Oblique volumes are never constructed
        slice_axis(self.scan_plane).unwrap_or(VolumeAxis::Z)
    }

    /// Direction of `axis` in LPS
    pub fn local_axis(&self, axis: VolumeAxis) -> Vector3f {
        self.orientation.column(axis.index()).into_owned()
    }

    /// Move the volume by `direction` (LPS, mm).
    pub fn translate_scan_volume(&mut self, direction: &Vector3f) {
        self.position += *direction;
        self.clamp_to_scanner_dimensions();
    }

    /// Add `angle` (radians) to the stored rotation about `axis` and rebuild
    /// the orientation.
    pub fn rotate_scan_volume(&mut self, angle: f64, axis: RotationAxis) {
        *self.rotations.get_mut(axis) += angle;
        self.orientation = self.rotations.orientation();
        self.clamp_to_scanner_dimensions();
    }

    /// Scale the two extents seen on a viewer of `origin_plane`.
    ///
    /// The volume centre stays put. A factor is ignored when the grabbed
    /// handle lies on the centre's x or y axis respectively.
    pub fn scale_scan_volume(
        &mut self,
        scale_factor_x: f64,
        scale_factor_y: f64,
        origin_plane: ScanPlane,
        handle_pos: &Point2,
        center_pos: &Point2,
    ) -> Result<(), GeometryError> {
        let (axis_x, axis_y) = determine_axis_to_scale(origin_plane, &self.rotations)?;
        let factor_x = if (handle_pos.x - center_pos.x).abs() < f64::EPSILON {
            1.0
        } else {
            scale_factor_x
        };
        let factor_y = if (handle_pos.y - center_pos.y).abs() < f64::EPSILON {
            1.0
        } else {
            scale_factor_y
        };
        self.set_extent(axis_x, self.extents[axis_x.index()] * factor_x);
        self.set_extent(axis_y, self.extents[axis_y.index()] * factor_y);
        self.clamp_to_scanner_dimensions();
        Ok(())
    }

    /// Replace the in-plane size of the slices.
    pub fn set_fov(&mut self, fov_mm: [f64; 2]) {
        // Oblique volumes are never constructed
        if let Ok((columns, rows)) = in_plane_axes(self.scan_plane) {
            self.extents[columns.index()] = fov_mm[0];
            self.extents[rows.index()] = fov_mm[1];
            self.clamp_to_scanner_dimensions();
        }
    }

    pub fn set_slice_layout(&mut self, slices: SliceLayout) {
        let axis = self.slice_axis().index();
        self.slices = slices;
        self.extents[axis] = slices.slab_mm();
        self.clamp_to_scanner_dimensions();
    }

    fn set_extent(&mut self, axis: VolumeAxis, extent: f64) {
        if axis == self.slice_axis() {
            let slab = self.slices.slab_mm();
            if slab > 0.0 {
                self.slices = self.slices.scaled(extent / slab);
            }
            self.extents[axis.index()] = self.slices.slab_mm();
        } else {
            self.extents[axis.index()] = extent;
        }
    }

    /// Half size of the axis-aligned box enclosing the rotated volume
    pub fn bounding_half_extents(&self) -> Vector3f {
        self.orientation.abs() * (self.extents / 2.0)
    }

    /// Pull extents and position back inside the scanner.
    ///
    /// Extents are first limited to `[min_extent, largest scanner dimension]`.
    /// If the rotated volume still does not fit, the extents above the lower
    /// bound shrink by a common factor. An extent that would drop below the
    /// bound stops there and the rest shrink further. Finally the centre is
    /// clamped so the enclosing box lies inside the scanner. Applying this
    /// twice changes nothing.
    pub fn clamp_to_scanner_dimensions(&mut self) {
        let max_extent = self.scanner_dimensions.max();
        let min_extent = self.min_extent_mm.min(max_extent);
        for axis in VOLUME_AXES {
            let extent = self.extents[axis.index()];
            let clamped = extent.clamp(min_extent, max_extent);
            if clamped != extent {
                self.set_extent(axis, clamped);
            }
        }

        let half_scanner = self.scanner_dimensions / 2.0;
        // each pass either fits or pins at least one more extent at the bound
        for _ in 0..=VOLUME_AXES.len() {
            let shrinkable = VOLUME_AXES
                .map(|axis| self.extents[axis.index()] > min_extent * (1.0 + FIT_TOLERANCE));
            let fit = self.fit_factor(&shrinkable, &half_scanner);
            if fit >= 1.0 - FIT_TOLERANCE {
                break;
            }
            for axis in VOLUME_AXES.into_iter().filter(|axis| shrinkable[axis.index()]) {
                let shrunk = self.extents[axis.index()] * fit.max(0.0);
                self.set_extent(axis, shrunk.max(min_extent));
            }
        }

        let half = self.bounding_half_extents();
        for i in 0..3 {
            let room = (half_scanner[i] - half[i]).max(0.0);
            self.position[i] = self.position[i].clamp(-room, room);
        }
    }

    /// Largest common factor for the `shrinkable` extents that keeps the
    /// enclosing box within `half_scanner`, with the other extents held.
    fn fit_factor(&self, shrinkable: &[bool; 3], half_scanner: &Vector3f) -> f64 {
        let projection = self.orientation.abs();
        let mut fit = f64::INFINITY;
        for row in 0..3 {
            let (mut held, mut scaled) = (0.0, 0.0);
            for (column, &can_shrink) in shrinkable.iter().enumerate() {
                let half = projection[(row, column)] * self.extents[column] / 2.0;
                if can_shrink {
                    scaled += half;
                } else {
                    held += half;
                }
            }
            if scaled > 0.0 {
                fit = fit.min((half_scanner[row] - held) / scaled);
            }
        }
        fit
    }

    pub fn as_box(&self) -> OrientedBox {
        OrientedBox {
            centre: self.position,
            axes: self.orientation,
            half_extents: self.extents / 2.0,
        }
    }

    /// Box occupied by slice `index`
    pub fn slice_box(&self, index: usize) -> OrientedBox {
        let axis = self.slice_axis();
        let mut half_extents = self.extents / 2.0;
        half_extents[axis.index()] = self.slices.thickness_mm / 2.0;
        OrientedBox {
            centre: self.position + self.local_axis(axis) * self.slices.offset_mm(index),
            axes: self.orientation,
            half_extents,
        }
    }

    /// Corners of the slab's mid-plane rectangle, in cyclic order
    pub fn middle_slice_corners(&self) -> [Point3; 4] {
        let (u, v) = self.image_axes();
        let (columns, rows) = self.in_plane_extents();
        let (u, v) = (u * (columns / 2.0), v * (rows / 2.0));
        let c = self.position;
        [c - u - v, c + u - v, c + u + v, c - u + v]
    }

    /// LPS directions of image columns and rows for this volume's slices.
    fn image_axes(&self) -> (Vector3f, Vector3f) {
        let e1 = self.local_axis(VolumeAxis::X);
        let e2 = self.local_axis(VolumeAxis::Y);
        let e3 = self.local_axis(VolumeAxis::Z);
        match self.scan_plane {
            ScanPlane::Sagittal => (e2, -e3),
            ScanPlane::Coronal => (e1, -e3),
            ScanPlane::Axial | ScanPlane::Oblique => (e1, e2),
        }
    }

    fn in_plane_extents(&self) -> (f64, f64) {
        let (columns, rows) =
            in_plane_axes(self.scan_plane).unwrap_or((VolumeAxis::X, VolumeAxis::Y));
        (self.extents[columns.index()], self.extents[rows.index()])
    }

    /// Image frame of every slice, for an acquisition matrix of
    /// `[columns, rows]` pixels.
    pub fn slice_geometries(&self, matrix: [usize; 2]) -> Vec<ImageGeometry> {
        let (axis_x, axis_y) = self.image_axes();
        let (columns, rows) = self.in_plane_extents();
        let extent_mm = [columns, rows];
        let resolution_mm = [
            columns / matrix[0].max(1) as f64,
            rows / matrix[1].max(1) as f64,
        ];
        let normal = self.local_axis(self.slice_axis());
        (0..self.slices.count)
            .map(|index| {
                let centre = self.position + normal * self.slices.offset_mm(index);
                ImageGeometry::from_centre(
                    self.scan_plane,
                    centre,
                    axis_x,
                    axis_y,
                    extent_mm,
                    resolution_mm,
                )
            })
            .collect()
    }

    /// Outline of the volume, its middle slice and each slice on `image`.
    pub fn compute_intersection_with_acquired_image(
        &self,
        image: &AcquiredImage,
    ) -> IntersectionPolygons {
        self.compute_intersection(&image.geometry)
    }

    pub fn compute_intersection(&self, geometry: &ImageGeometry) -> IntersectionPolygons {
        let volume = box_section(&self.as_box(), geometry);
        if volume.is_empty() || !overlaps_image(&volume, geometry) {
            return IntersectionPolygons::default();
        }
        let middle_slice = rectangle_section(&self.middle_slice_corners(), geometry);
        let slices = (0..self.slices.count)
            .map(|index| box_section(&self.slice_box(index), geometry))
            .filter(|polygon| !polygon.is_empty())
            .collect();
        IntersectionPolygons {
            volume,
            middle_slice,
            slices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    fn scanner() -> ScannerConfig {
        ScannerConfig {
            dimensions_mm: [600.0, 600.0, 600.0],
            min_extent_mm: 1.0,
        }
    }

    fn volume(plane: ScanPlane, fov_mm: [f64; 2], slices: SliceLayout) -> ScanVolume {
        ScanVolume::new(plane, fov_mm, slices, &scanner()).unwrap()
    }

    fn axial_volume() -> ScanVolume {
        volume(ScanPlane::Axial, [100.0, 80.0], SliceLayout::new(5, 4.0, 1.0))
    }

    fn image(plane: ScanPlane, size_mm: f64) -> ImageGeometry {
        ImageGeometry::principal(plane, Point3::origin(), [size_mm; 2], [1.0, 1.0]).unwrap()
    }

    #[test]
    fn slab_covers_slices_and_gaps() {
        let layout = SliceLayout::new(5, 4.0, 1.0);
        assert_eq!(layout.slab_mm(), 24.0);
        assert_eq!(layout.offset_mm(0), -10.0);
        assert_eq!(layout.offset_mm(2), 0.0);
        assert_eq!(layout.offset_mm(4), 10.0);
    }

    #[rstest]
    #[case(ScanPlane::Axial, [100.0, 80.0, 24.0])]
    #[case(ScanPlane::Sagittal, [24.0, 100.0, 80.0])]
    #[case(ScanPlane::Coronal, [100.0, 24.0, 80.0])]
    fn extents_follow_scan_plane(#[case] plane: ScanPlane, #[case] extents: [f64; 3]) {
        let e = volume(plane, [100.0, 80.0], SliceLayout::new(5, 4.0, 1.0)).extents();
        assert_float_eq!([e.x, e.y, e.z], extents, abs_all <= 1e-12);
    }

    #[test]
    fn oblique_scan_plane_is_rejected() {
        let slices = SliceLayout::new(1, 4.0, 0.0);
        let result = ScanVolume::new(ScanPlane::Oblique, [100.0, 80.0], slices, &scanner());
        assert_eq!(result, Err(GeometryError::UnknownPlane(ScanPlane::Oblique)));
    }

    #[test]
    fn translation_adds_displacement() {
        let mut volume = axial_volume();
        volume.translate_scan_volume(&Vector3f::new(10.0, -5.0, 2.5));
        volume.translate_scan_volume(&Vector3f::new(1.0, 1.0, 1.0));
        let p = volume.position();
        assert_float_eq!([p.x, p.y, p.z], [11.0, -4.0, 3.5], abs_all <= 1e-12);
    }

    #[test]
    fn translation_stops_at_scanner_wall() {
        let mut volume = axial_volume();
        volume.translate_scan_volume(&Vector3f::new(1000.0, 0.0, -1000.0));
        let p = volume.position();
        assert_float_eq!([p.x, p.y, p.z], [250.0, 0.0, -288.0], abs_all <= 1e-9);
    }

    #[rstest]
    #[case(RotationAxis::RL)]
    #[case(RotationAxis::AP)]
    #[case(RotationAxis::FH)]
    fn rotation_rebuilds_orientation(#[case] axis: RotationAxis) {
        let mut volume = axial_volume();
        volume.rotate_scan_volume(0.3, axis);
        volume.rotate_scan_volume(-0.1, axis);
        assert_float_eq!(volume.get_rotations().get(axis), 0.2, abs <= 1e-12);
        let expected = volume.get_rotations().orientation();
        assert!((volume.orientation() - expected).norm() < 1e-12);
    }

    #[test]
    fn scaling_multiplies_in_plane_extents_about_centre() {
        let mut volume = axial_volume();
        volume.translate_scan_volume(&Vector3f::new(5.0, 5.0, 0.0));
        let (handle, centre) = (Point2::new(60.0, 70.0), Point2::new(50.0, 50.0));
        volume
            .scale_scan_volume(1.05, 0.95, ScanPlane::Axial, &handle, &centre)
            .unwrap();
        let e = volume.extents();
        assert_float_eq!([e.x, e.y, e.z], [105.0, 76.0, 24.0], abs_all <= 1e-9);
        let p = volume.position();
        assert_float_eq!([p.x, p.y], [5.0, 5.0], abs_all <= 1e-12);
    }

    #[test]
    fn handle_on_centre_axis_locks_that_factor() {
        let mut volume = axial_volume();
        let (handle, centre) = (Point2::new(50.0, 70.0), Point2::new(50.0, 50.0));
        volume
            .scale_scan_volume(1.05, 1.05, ScanPlane::Axial, &handle, &centre)
            .unwrap();
        let e = volume.extents();
        assert_float_eq!([e.x, e.y], [100.0, 84.0], abs_all <= 1e-9);
    }

    #[test]
    fn scaling_slice_direction_rescales_thickness_and_gap() {
        let mut volume = axial_volume();
        let (handle, centre) = (Point2::new(60.0, 70.0), Point2::new(50.0, 50.0));
        volume
            .scale_scan_volume(1.0, 1.05, ScanPlane::Sagittal, &handle, &centre)
            .unwrap();
        let slices = volume.slices();
        assert_eq!(slices.count, 5);
        assert_float_eq!(slices.thickness_mm, 4.2, abs <= 1e-9);
        assert_float_eq!(slices.gap_mm, 1.05, abs <= 1e-9);
        assert_float_eq!(volume.extents().z, 25.2, abs <= 1e-9);
    }

    #[test]
    fn scaling_from_oblique_viewer_fails() {
        let mut volume = axial_volume();
        let result = volume.scale_scan_volume(
            1.05,
            1.05,
            ScanPlane::Oblique,
            &Point2::new(60.0, 70.0),
            &Point2::new(50.0, 50.0),
        );
        assert_eq!(result, Err(GeometryError::UnknownPlane(ScanPlane::Oblique)));
    }

    #[rstest]
    #[case(ScanPlane::Axial, 0.0, (VolumeAxis::X, VolumeAxis::Y))]
    #[case(ScanPlane::Axial, 30.0, (VolumeAxis::X, VolumeAxis::Y))]
    #[case(ScanPlane::Axial, 90.0, (VolumeAxis::Y, VolumeAxis::X))]
    #[case(ScanPlane::Axial, -60.0, (VolumeAxis::Y, VolumeAxis::X))]
    #[case(ScanPlane::Axial, 170.0, (VolumeAxis::X, VolumeAxis::Y))]
    #[case(ScanPlane::Axial, 260.0, (VolumeAxis::Y, VolumeAxis::X))]
    #[case(ScanPlane::Sagittal, 0.0, (VolumeAxis::Y, VolumeAxis::Z))]
    #[case(ScanPlane::Sagittal, 100.0, (VolumeAxis::Z, VolumeAxis::Y))]
    #[case(ScanPlane::Coronal, 0.0, (VolumeAxis::X, VolumeAxis::Z))]
    #[case(ScanPlane::Coronal, -120.0, (VolumeAxis::Z, VolumeAxis::X))]
    fn axis_to_scale_follows_quadrant(
        #[case] plane: ScanPlane,
        #[case] degrees: f64,
        #[case] expected: (VolumeAxis, VolumeAxis),
    ) {
        let mut rotations = Rotations::default();
        *rotations.get_mut(RotationAxis::normal_to(plane).unwrap()) = degrees.to_radians();
        assert_eq!(determine_axis_to_scale(plane, &rotations), Ok(expected));
    }

    #[test]
    fn slice_geometries_step_along_slice_normal() {
        let mut volume = axial_volume();
        volume.translate_scan_volume(&Vector3f::new(0.0, 0.0, 20.0));
        let geometries = volume.slice_geometries([50, 40]);
        assert_eq!(geometries.len(), 5);
        for (index, geometry) in geometries.iter().enumerate() {
            let centre = geometry.centre_lps();
            assert_float_eq!(centre.z, 20.0 + 5.0 * (index as f64 - 2.0), abs <= 1e-9);
            assert_eq!(geometry.resolution_mm, [2.0, 2.0]);
            assert_eq!((geometry.columns(), geometry.rows()), (50, 40));
            assert_eq!(geometry.plane, ScanPlane::Axial);
        }
    }

    #[test]
    fn sagittal_slices_use_radiological_axes() {
        let volume = volume(ScanPlane::Sagittal, [100.0, 80.0], SliceLayout::new(1, 4.0, 0.0));
        let geometry = &volume.slice_geometries([100, 80])[0];
        let (x, y) = (geometry.axis_x_lps, geometry.axis_y_lps);
        assert_float_eq!([x.x, x.y, x.z], [0.0, 1.0, 0.0], abs_all <= 1e-12);
        assert_float_eq!([y.x, y.y, y.z], [0.0, 0.0, -1.0], abs_all <= 1e-12);
    }

    #[test]
    fn intersection_has_one_outline_per_cut_slice() {
        let volume = axial_volume();
        let image = image(ScanPlane::Coronal, 200.0);
        let polygons = volume.compute_intersection(&image);
        assert_eq!(polygons.volume.len(), 4);
        assert_eq!(polygons.middle_slice.len(), 2);
        assert_eq!(polygons.slices.len(), 5);
    }

    #[test]
    fn volume_far_from_image_plane_has_no_intersection() {
        let mut volume = axial_volume();
        volume.translate_scan_volume(&Vector3f::new(0.0, 0.0, 200.0));
        let image = image(ScanPlane::Axial, 200.0);
        assert!(volume.compute_intersection(&image).is_empty());
    }

    #[test]
    fn volume_beside_small_image_has_no_intersection() {
        let mut volume = axial_volume();
        volume.translate_scan_volume(&Vector3f::new(200.0, 0.0, 0.0));
        let image = image(ScanPlane::Axial, 100.0);
        assert!(volume.compute_intersection(&image).is_empty());
    }

    #[test]
    fn rotated_volume_that_no_longer_fits_is_shrunk() {
        let config = ScannerConfig {
            dimensions_mm: [300.0, 300.0, 300.0],
            min_extent_mm: 1.0,
        };
        let slices = SliceLayout::new(1, 10.0, 0.0);
        let mut volume =
            ScanVolume::new(ScanPlane::Axial, [290.0, 290.0], slices, &config).unwrap();
        volume.rotate_scan_volume(std::f64::consts::FRAC_PI_4, RotationAxis::FH);
        let half = volume.bounding_half_extents();
        assert!(half.x <= 150.0 + 1e-9 && half.y <= 150.0 + 1e-9);
    }

    #[test]
    fn slice_layout_replaces_slab_extent() {
        let mut volume = axial_volume();
        volume.set_slice_layout(SliceLayout::new(3, 2.0, 0.5));
        assert_eq!(volume.slices(), SliceLayout::new(3, 2.0, 0.5));
        let e = volume.extents();
        assert_float_eq!([e.x, e.y, e.z], [100.0, 80.0, 7.0], abs_all <= 1e-12);
        assert_eq!(volume.slice_geometries([10, 8]).len(), 3);
    }

    #[test]
    fn thin_slab_in_full_bore_volume_clamps_once() {
        let config = ScannerConfig {
            dimensions_mm: [500.0, 500.0, 500.0],
            min_extent_mm: 1.0,
        };
        let slices = SliceLayout::new(1, 1.0, 0.0);
        let mut volume =
            ScanVolume::new(ScanPlane::Axial, [500.0, 500.0], slices, &config).unwrap();
        volume.rotate_scan_volume(std::f64::consts::FRAC_PI_4, RotationAxis::FH);

        let once = volume.clone();
        volume.clamp_to_scanner_dimensions();
        assert_eq!(volume, once);

        let e = volume.extents();
        assert!(e.z >= 1.0);
        assert_float_eq!(volume.slices().thickness_mm, 1.0, abs <= 1e-12);
        assert_float_eq!(e.x, 250.0 * std::f64::consts::SQRT_2, abs <= 1e-9);
        let half = volume.bounding_half_extents();
        assert!(half.x <= 250.0 + 1e-9 && half.y <= 250.0 + 1e-9);
    }

    #[test]
    fn extents_at_lower_bound_are_not_shrunk_further() {
        let config = ScannerConfig {
            dimensions_mm: [20.0, 20.0, 20.0],
            min_extent_mm: 8.0,
        };
        let slices = SliceLayout::new(1, 8.0, 0.0);
        let mut volume = ScanVolume::new(ScanPlane::Axial, [20.0, 20.0], slices, &config).unwrap();
        volume.rotate_scan_volume(0.5, RotationAxis::AP);
        volume.rotate_scan_volume(0.7, RotationAxis::RL);

        let e = volume.extents();
        assert!(e.x >= 8.0 && e.y >= 8.0 && e.z >= 8.0, "{e:?}");
        let once = volume.clone();
        volume.clamp_to_scanner_dimensions();
        assert!((volume.extents() - once.extents()).norm() < 1e-12);
        assert!((volume.position() - once.position()).norm() < 1e-12);
    }

    proptest! {
        #[test]
        fn repeated_rotation_equals_summed_rotation(
            a in -3.0..3.0_f64,
            b in -3.0..3.0_f64,
            axis in prop_oneof![
                Just(RotationAxis::RL),
                Just(RotationAxis::AP),
                Just(RotationAxis::FH)
            ],
        ) {
            let mut stepped = axial_volume();
            stepped.rotate_scan_volume(a, axis);
            stepped.rotate_scan_volume(b, axis);
            let mut once = axial_volume();
            once.rotate_scan_volume(a + b, axis);
            let (stepped_angle, once_angle) =
                (stepped.get_rotations().get(axis), once.get_rotations().get(axis));
            prop_assert!((stepped_angle - once_angle).abs() < 1e-12);
            prop_assert!((stepped.orientation() - once.orientation()).norm() < 1e-9);
        }

        #[test]
        fn clamping_is_idempotent(
            x in -2000.0..2000.0_f64,
            y in -2000.0..2000.0_f64,
            z in -2000.0..2000.0_f64,
            rl in -3.2..3.2_f64,
            ap in -3.2..3.2_f64,
            fh in -3.2..3.2_f64,
            width in 10.0..800.0_f64,
            height in 10.0..800.0_f64,
            count in 1..6_usize,
            thickness in 0.2..6.0_f64,
            gap in 0.0..2.0_f64,
        ) {
            let slices = SliceLayout::new(count, thickness, gap);
            let mut volume = volume(ScanPlane::Axial, [width, height], slices);
            volume.rotate_scan_volume(fh, RotationAxis::FH);
            volume.rotate_scan_volume(ap, RotationAxis::AP);
            volume.rotate_scan_volume(rl, RotationAxis::RL);
            volume.translate_scan_volume(&Vector3f::new(x, y, z));
            let once = volume.clone();
            volume.clamp_to_scanner_dimensions();
            prop_assert!((volume.position() - once.position()).norm() < 1e-9);
            prop_assert!((volume.extents() - once.extents()).norm() < 1e-9);
            prop_assert_eq!(volume.slices().count, once.slices().count);
            let e = volume.extents();
            prop_assert!(e.x >= 1.0 - 1e-9 && e.y >= 1.0 - 1e-9 && e.z >= 1.0 - 1e-9);
            let half = volume.bounding_half_extents();
            prop_assert!(half.max() <= 300.0 + 1e-9);
        }
    }
}
