use thiserror::Error;

use crate::acquisition::{AcquiredSeries, AcquisitionError, ColorScale, Scanner};
use crate::config::Config;
use crate::enums::{GeometryError, ScanStatus};
use crate::parameters::{ParameterError, ParameterMap, ScanParameters};
use crate::scan_item::ScanItem;
use crate::scan_volume::ScanVolume;
use crate::tissue_model::TissueModel;
use crate::viewport::ScanVolumeBus;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("No scan item at index {0}")]
    NoSuchScanItem(usize),

    #[error("Scan item {item} has no stack {stack}")]
    NoSuchStack { item: usize, stack: usize },

    #[error("Scan item {name} cannot be scanned while {status:?}")]
    NotReady { name: String, status: ScanStatus },
}

/// Settings shared by everything in a session, handed to whoever needs
/// them instead of living in globals.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppContext {
    pub config: Config,
    pub color_scale: ColorScale,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            color_scale: ColorScale::default(),
        }
    }
}

/// A scanning session: one tissue model, the scan list planned on it and
/// the series acquired so far.
pub struct Session {
    context: AppContext,
    scanner: Scanner,
    model: TissueModel,
    scan_items: Vec<ScanItem>,
    series: Vec<AcquiredSeries>,
}

impl Session {
    pub fn new(context: AppContext, model: TissueModel) -> Self {
        let scanner = Scanner::new(context.config.acquisition.interpolation);
        Self {
            context,
            scanner,
            model,
            scan_items: Vec::new(),
            series: Vec::new(),
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut AppContext {
        &mut self.context
    }

    pub fn model(&self) -> &TissueModel {
        &self.model
    }

    pub fn scan_items(&self) -> &[ScanItem] {
        &self.scan_items
    }

    pub fn series(&self) -> &[AcquiredSeries] {
        &self.series
    }

    pub fn scan_item(&self, index: usize) -> Result<&ScanItem, SessionError> {
        self.scan_items.get(index).ok_or(SessionError::NoSuchScanItem(index))
    }

    pub fn scan_item_mut(&mut self, index: usize) -> Result<&mut ScanItem, SessionError> {
        self.scan_items.get_mut(index).ok_or(SessionError::NoSuchScanItem(index))
    }

    /// Append a scan item to the scan list; returns its index.
    pub fn add_scan_item(
        &mut self,
        name: &str,
        parameters: ScanParameters,
    ) -> Result<usize, SessionError> {
        let item = ScanItem::new(name, parameters, &self.context.config.scanner)?;
        self.scan_items.push(item);
        log::info!("Added scan item {name}");
        Ok(self.scan_items.len() - 1)
    }

    pub fn add_scan_item_from_map(
        &mut self,
        name: &str,
        map: &ParameterMap,
    ) -> Result<usize, SessionError> {
        self.add_scan_item(name, ScanParameters::from_map(map)?)
    }

    /// A bus around a copy of one stack, for viewers to plan it with.
    /// Hand the result back through [`Session::store_plan`].
    pub fn planning_bus(&self, item: usize, stack: usize) -> Result<ScanVolumeBus, SessionError> {
        let volume = self
            .scan_item(item)?
            .stack(stack)
            .ok_or(SessionError::NoSuchStack { item, stack })?;
        Ok(ScanVolumeBus::new(volume.clone()))
    }

    pub fn store_plan(
        &mut self,
        item: usize,
        stack: usize,
        volume: ScanVolume,
    ) -> Result<(), SessionError> {
        let slot = self
            .scan_item_mut(item)?
            .stack_mut(stack)
            .ok_or(SessionError::NoSuchStack { item, stack })?;
        *slot = volume;
        Ok(())
    }

    /// Acquire scan item `index` and keep the resulting series.
    ///
    /// # Errors
    ///
    /// Returns error if the item does not exist, is not ready, or the
    /// acquisition fails; a failed acquisition leaves the item ready
    pub fn scan(&mut self, index: usize) -> Result<&AcquiredSeries, SessionError> {
        let item = self.scan_items.get_mut(index).ok_or(SessionError::NoSuchScanItem(index))?;
        if !item.begin_scan() {
            return Err(SessionError::NotReady {
                name: item.name().to_owned(),
                status: item.status(),
            });
        }

        let result = self.scanner.scan(item, &self.model);
        item.finish_scan(result.is_ok());
        let series = result.inspect_err(|e| log::error!("Scan of {} failed: {e}", item.name()))?;
        self.series.push(series);
        let last = self.series.len() - 1;
        Ok(&self.series[last])
    }
}
