use crate::config::ScannerConfig;
use crate::enums::{GeometryError, ScanStatus};
use crate::parameters::{ParameterError, ParameterMap, ScanParameters};
use crate::scan_volume::ScanVolume;

/// A named acquisition in the scan list: its parameters, where it is
/// planned (one scan volume per stack) and how far along it is.
#[derive(Clone, Debug)]
pub struct ScanItem {
    name: String,
    parameters: ScanParameters,
    status: ScanStatus,
    stacks: Vec<ScanVolume>,
    scanner: ScannerConfig,
}

impl ScanItem {
    /// # Errors
    ///
    /// Returns error if the parameters ask for an oblique scan plane
    pub fn new(
        name: &str,
        parameters: ScanParameters,
        scanner: &ScannerConfig,
    ) -> Result<Self, GeometryError> {
        let stack = Self::build_stack(&parameters, scanner)?;
        Ok(Self {
            name: name.to_owned(),
            parameters,
            status: ScanStatus::Ready,
            stacks: vec![stack],
            scanner: scanner.clone(),
        })
    }

    fn build_stack(
        parameters: &ScanParameters,
        scanner: &ScannerConfig,
    ) -> Result<ScanVolume, GeometryError> {
        ScanVolume::new(
            parameters.scan_plane,
            parameters.fov_mm,
            parameters.slice_layout(),
            scanner,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &ScanParameters {
        &self.parameters
    }

    pub fn status(&self) -> ScanStatus {
        self.status
    }

    pub fn stacks(&self) -> &[ScanVolume] {
        &self.stacks
    }

    pub fn stack(&self, index: usize) -> Option<&ScanVolume> {
        self.stacks.get(index)
    }

    pub fn stack_mut(&mut self, index: usize) -> Option<&mut ScanVolume> {
        self.stacks.get_mut(index)
    }

    /// Append a fresh stack at the isocentre; returns its index.
    pub fn add_stack(&mut self) -> Result<usize, GeometryError> {
        self.stacks.push(Self::build_stack(&self.parameters, &self.scanner)?);
        Ok(self.stacks.len() - 1)
    }

    /// Remove stack `index`. The last remaining stack is never removed.
    pub fn delete_stack(&mut self, index: usize) -> bool {
        if self.stacks.len() <= 1 || index >= self.stacks.len() {
            log::warn!(
                "Refusing to delete stack {index} of {} ({} stacks)",
                self.name,
                self.stacks.len()
            );
            return false;
        }
        self.stacks.remove(index);
        true
    }

    pub fn begin_modification(&mut self) {
        self.status = ScanStatus::BeingModified;
    }

    /// Take over edited parameters and resize every stack to match.
    ///
    /// On failure the previous parameters stay and the item is marked
    /// invalid until a later commit succeeds.
    pub fn commit_parameters(&mut self, map: &ParameterMap) -> Result<(), ParameterError> {
        let parameters = match ScanParameters::from_map(map) {
            Ok(parameters) => parameters,
            Err(e) => {
                self.status = ScanStatus::Invalid;
                return Err(e);
            }
        };

        if parameters.scan_plane != self.parameters.scan_plane {
            let rebuilt: Result<Vec<_>, _> = self
                .stacks
                .iter()
                .map(|_| Self::build_stack(&parameters, &self.scanner))
                .collect();
            match rebuilt {
                Ok(stacks) => self.stacks = stacks,
                Err(_) => {
                    self.status = ScanStatus::Invalid;
                    return Err(ParameterError::UnknownChoice {
                        name: "ScanPlane".to_owned(),
                        value: parameters.scan_plane.label().to_owned(),
                    });
                }
            }
        } else {
            for stack in &mut self.stacks {
                stack.set_fov(parameters.fov_mm);
                stack.set_slice_layout(parameters.slice_layout());
            }
        }
        self.parameters = parameters;
        self.status = ScanStatus::Ready;
        Ok(())
    }

    /// Ready → being scanned. Returns `false` for any other status.
    pub fn begin_scan(&mut self) -> bool {
        if self.status != ScanStatus::Ready {
            return false;
        }
        self.status = ScanStatus::BeingScanned;
        true
    }

    /// Being scanned → complete (or back to ready if the scan failed).
    pub fn finish_scan(&mut self, succeeded: bool) {
        if self.status == ScanStatus::BeingScanned {
            self.status = if succeeded {
                ScanStatus::Complete
            } else {
                ScanStatus::Ready
            };
        }
    }
}
