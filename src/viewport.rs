//! Keeping every 2D view of a scan volume in step
//!
//! The [`ScanVolumeBus`] owns the one [`ScanVolume`] all viewers share. A
//! gesture in one viewer becomes a [`ScanVolumeEvent`]; the bus applies it to
//! the volume in full and only then tells every other attached observer, so
//! the viewer driving the gesture is never re-entered. Overlays are always
//! recomputed from the volume, never patched.

use std::cell::RefCell;
use std::rc::Rc;

use crate::acquisition::AcquiredImage;
use crate::config::InteractionConfig;
use crate::enums::{GeometryError, RotationAxis, ScanPlane};
use crate::geometry::{Point2, Rotations, Vector2, Vector3f, rotation_matrix, wrap_angle};
use crate::intersection::IntersectionPolygons;
use crate::scan_volume::ScanVolume;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

#[derive(Clone, Debug, PartialEq)]
pub enum ScanVolumeEvent {
    /// The volume was changed by something other than a drag gesture.
    VolumeChanged,
    DisplayTranslated {
        delta: Vector3f,
    },
    DisplayRotated {
        angle: f64,
        axis: RotationAxis,
    },
    DisplayScaled {
        factor_x: f64,
        factor_y: f64,
        origin_plane: ScanPlane,
        handle_pos: Point2,
        center_pos: Point2,
    },
}

pub trait ScanVolumeObserver {
    /// Called after the volume has been fully updated by `event`.
    fn update(&mut self, event: &ScanVolumeEvent, volume: &ScanVolume);
}

pub struct ScanVolumeBus {
    volume: ScanVolume,
    observers: Vec<(ObserverId, Rc<RefCell<dyn ScanVolumeObserver>>)>,
    next_id: usize,
}

impl ScanVolumeBus {
    pub fn new(volume: ScanVolume) -> Self {
        Self {
            volume,
            observers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn volume(&self) -> &ScanVolume {
        &self.volume
    }

    pub fn into_volume(self) -> ScanVolume {
        self.volume
    }

    /// Hand out a token identifying a future observer.
    pub fn allocate_id(&mut self) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn attach(&mut self, id: ObserverId, observer: Rc<RefCell<dyn ScanVolumeObserver>>) {
        self.detach(id);
        self.observers.push((id, observer));
    }

    pub fn detach(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(other, _)| *other != id);
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Apply `event` to the volume, then notify every observer except
    /// `origin`.
    ///
    /// # Errors
    ///
    /// Returns error if a scale event names a plane with no RL/AP/FH axis;
    /// the volume is left untouched and nobody is notified.
    pub fn apply(
        &mut self,
        origin: Option<ObserverId>,
        event: ScanVolumeEvent,
    ) -> Result<(), GeometryError> {
        match &event {
            ScanVolumeEvent::VolumeChanged => {}
            ScanVolumeEvent::DisplayTranslated { delta } => {
                self.volume.translate_scan_volume(delta)
            }
            ScanVolumeEvent::DisplayRotated { angle, axis } => {
                self.volume.rotate_scan_volume(*angle, *axis)
            }
            ScanVolumeEvent::DisplayScaled {
                factor_x,
                factor_y,
                origin_plane,
                handle_pos,
                center_pos,
            } => self
                .volume
                .scale_scan_volume(*factor_x, *factor_y, *origin_plane, handle_pos, center_pos)?,
        }
        self.notify(origin, &event);
        Ok(())
    }

    /// Change the volume directly (e.g. from the parameter form) and tell
    /// every observer except `origin`.
    pub fn modify(&mut self, origin: Option<ObserverId>, change: impl FnOnce(&mut ScanVolume)) {
        change(&mut self.volume);
        self.notify(origin, &ScanVolumeEvent::VolumeChanged);
    }

    fn notify(&self, origin: Option<ObserverId>, event: &ScanVolumeEvent) {
        for (id, observer) in &self.observers {
            if Some(*id) == origin {
                continue;
            }
            match observer.try_borrow_mut() {
                Ok(mut observer) => observer.update(event, &self.volume),
                Err(_) => log::warn!("Observer {id:?} is busy and missed {event:?}"),
            }
        }
    }
}

/// Keep only drag ratios inside the configured band; anything else is
/// treated as noise and becomes 1.0.
pub fn filter_scale_factor(ratio: f64, interaction: &InteractionConfig) -> f64 {
    if (interaction.scale_factor_min..=interaction.scale_factor_max).contains(&ratio) {
        ratio
    } else {
        1.0
    }
}

/// Split a rotation by `angle` about the axis a viewer of `plane` looks along
/// into increments of the three stored angles.
///
/// Once a volume is rotated, turning it about a screen axis is no longer a
/// change of a single stored angle. The target orientation
/// `R · R_axis(angle)` is decomposed back into angles and the wrapped
/// differences to the current angles are returned.
pub fn compute_rotation_projection(
    current: &Rotations,
    plane: ScanPlane,
    angle: f64,
) -> Result<Rotations, GeometryError> {
    let axis = RotationAxis::normal_to(plane)?;
    let target = current.orientation() * rotation_matrix(axis, angle);
    let decomposed = Rotations::from_orientation(&target, current.fh);
    Ok(Rotations::new(
        wrap_angle(decomposed.rl - current.rl),
        wrap_angle(decomposed.ap - current.ap),
        wrap_angle(decomposed.fh - current.fh),
    ))
}

/// Increments of `projection` larger than `epsilon_deg`, in RL, AP, FH order
pub fn significant_increments(
    projection: &Rotations,
    epsilon_deg: f64,
) -> Vec<(RotationAxis, f64)> {
    RotationAxis::ALL
        .into_iter()
        .map(|axis| (axis, projection.get(axis)))
        .filter(|(_, increment)| increment.abs().to_degrees() > epsilon_deg)
        .collect()
}

/// A 2D viewer showing one acquired image with the scan volume outlined on
/// top of it.
pub struct Viewport {
    id: ObserverId,
    image: AcquiredImage,
    overlay: IntersectionPolygons,
    interaction: InteractionConfig,
}

impl Viewport {
    pub fn new(
        id: ObserverId,
        image: AcquiredImage,
        interaction: InteractionConfig,
        volume: &ScanVolume,
    ) -> Self {
        let overlay = volume.compute_intersection_with_acquired_image(&image);
        Self {
            id,
            image,
            overlay,
            interaction,
        }
    }

    /// Create a viewport for `image` and attach it to `bus`.
    pub fn attach_new(
        bus: &mut ScanVolumeBus,
        image: AcquiredImage,
        interaction: InteractionConfig,
    ) -> Rc<RefCell<Viewport>> {
        let id = bus.allocate_id();
        let viewport = Rc::new(RefCell::new(Viewport::new(id, image, interaction, bus.volume())));
        bus.attach(id, viewport.clone());
        viewport
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn image(&self) -> &AcquiredImage {
        &self.image
    }

    pub fn plane(&self) -> ScanPlane {
        self.image.geometry.plane
    }

    pub fn overlay(&self) -> &IntersectionPolygons {
        &self.overlay
    }

    pub fn refresh(&mut self, volume: &ScanVolume) {
        self.overlay = volume.compute_intersection_with_acquired_image(&self.image);
    }

    /// Move the volume by a drag of `delta_px` pixels on this image.
    pub fn drag_translate(
        &mut self,
        bus: &mut ScanVolumeBus,
        delta_px: &Vector2,
    ) -> Result<(), GeometryError> {
        let delta = self.image.geometry.pixel_delta_to_lps(delta_px);
        bus.apply(Some(self.id), ScanVolumeEvent::DisplayTranslated { delta })?;
        self.refresh(bus.volume());
        Ok(())
    }

    /// Turn the volume by `angle` radians about the RL/AP/FH axis this
    /// viewer looks along.
    ///
    /// # Errors
    ///
    /// Returns error for an oblique image, which has no such axis
    pub fn drag_rotate(
        &mut self,
        bus: &mut ScanVolumeBus,
        angle: f64,
    ) -> Result<(), GeometryError> {
        let rotations = bus.volume().get_rotations();
        let projection = compute_rotation_projection(&rotations, self.plane(), angle)?;
        let epsilon_deg = self.interaction.rotation_epsilon_deg;
        for (axis, increment) in significant_increments(&projection, epsilon_deg) {
            bus.apply(
                Some(self.id),
                ScanVolumeEvent::DisplayRotated {
                    angle: increment,
                    axis,
                },
            )?;
        }
        self.refresh(bus.volume());
        Ok(())
    }

    /// Scale the volume by dragging a handle from `from` to `to` (pixels).
    ///
    /// Each factor is the ratio of the handle's distances from the overlay
    /// centre along that screen axis. Nothing happens while the volume is
    /// not visible in this image.
    pub fn drag_scale(
        &mut self,
        bus: &mut ScanVolumeBus,
        from: &Point2,
        to: &Point2,
    ) -> Result<(), GeometryError> {
        let Some(centre) = self.overlay.centre() else {
            return Ok(());
        };
        let ratio = |from: f64, to: f64, centre: f64| {
            let reach = (from - centre).abs();
            if reach < self.interaction.scale_dead_zone_px {
                1.0
            } else {
                filter_scale_factor((to - centre).abs() / reach, &self.interaction)
            }
        };
        let factor_x = ratio(from.x, to.x, centre.x);
        let factor_y = ratio(from.y, to.y, centre.y);
        if factor_x == 1.0 && factor_y == 1.0 {
            return Ok(());
        }

        bus.apply(
            Some(self.id),
            ScanVolumeEvent::DisplayScaled {
                factor_x,
                factor_y,
                origin_plane: self.plane(),
                handle_pos: *from,
                center_pos: centre,
            },
        )?;
        self.refresh(bus.volume());
        Ok(())
    }
}

impl ScanVolumeObserver for Viewport {
    fn update(&mut self, _event: &ScanVolumeEvent, volume: &ScanVolume) {
        self.refresh(volume);
    }
}
