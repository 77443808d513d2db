//! Pulse-sequence signal equations
//!
//! Each technique maps the tissue maps of a [`TissueModel`] to a signal
//! intensity per voxel. Calculators are stateless and cached by
//! [`SignalCalculatorFactory`].

use std::collections::HashMap;

use ndarray::{Array3, Zip};
use thiserror::Error;

use crate::parameters::ScanParameters;
use crate::tissue_model::TissueModel;

#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("Unknown scan technique: {0:?}")]
    InvalidTechnique(String),

    #[error("Signal equation for {0} is not implemented")]
    NotImplemented(String),
}

pub trait SignalCalculator {
    fn calculate_signal(
        &self,
        parameters: &ScanParameters,
        model: &TissueModel,
    ) -> Result<Array3<f64>, SignalError>;
}

/// Inversion-prepared spin echo:
/// `|PD · e^(−TE/T2) · (1 − 2·e^(−TI/T1) + e^(−TR/T1))|`
///
/// Zero relaxation times give non-finite values, which are left for the
/// caller to clean up.
pub struct SpinEchoSignalCalculator;

impl SpinEchoSignalCalculator {
    #[inline]
    pub fn signal(pd: f64, t1: f64, t2: f64, te: f64, tr: f64, ti: f64) -> f64 {
        let recovery = 1.0 - 2.0 * (-ti / t1).exp() + (-tr / t1).exp();
        (pd * (-te / t2).exp() * recovery).abs()
    }
}

impl SignalCalculator for SpinEchoSignalCalculator {
    fn calculate_signal(
        &self,
        parameters: &ScanParameters,
        model: &TissueModel,
    ) -> Result<Array3<f64>, SignalError> {
        let (te, tr, ti) = (parameters.te_ms, parameters.tr_ms, parameters.ti_ms);
        Ok(Zip::from(model.pd())
            .and(model.t1())
            .and(model.t2())
            .par_map_collect(|&pd, &t1, &t2| Self::signal(pd, t1, t2, te, tr, ti)))
    }
}

/// Registered so that "GE" is a known technique, but has no signal equation yet.
pub struct GradientEchoSignalCalculator;

impl SignalCalculator for GradientEchoSignalCalculator {
    fn calculate_signal(
        &self,
        _parameters: &ScanParameters,
        _model: &TissueModel,
    ) -> Result<Array3<f64>, SignalError> {
        Err(SignalError::NotImplemented("GE".to_owned()))
    }
}

/// Replace every NaN or infinite value by zero; returns how many were replaced.
pub fn remove_non_finite(signal: &mut Array3<f64>) -> usize {
    let mut replaced = 0;
    signal.map_inplace(|value| {
        if !value.is_finite() {
            *value = 0.0;
            replaced += 1;
        }
    });
    replaced
}

#[derive(Default)]
pub struct SignalCalculatorFactory {
    calculators: HashMap<String, Box<dyn SignalCalculator>>,
}

impl SignalCalculatorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn build(technique: &str) -> Option<Box<dyn SignalCalculator>> {
        match technique {
            "SE" => Some(Box::new(SpinEchoSignalCalculator)),
            "GE" => Some(Box::new(GradientEchoSignalCalculator)),
            _ => None,
        }
    }

    /// Calculator for the technique named in `parameters`, built on first use.
    pub fn create_signal_calculator(
        &mut self,
        parameters: &ScanParameters,
    ) -> Result<&dyn SignalCalculator, SignalError> {
        let technique = parameters.technique.trim().to_ascii_uppercase();
        if !self.calculators.contains_key(&technique) {
            let calculator = Self::build(&technique)
                .ok_or_else(|| SignalError::InvalidTechnique(parameters.technique.clone()))?;
            log::debug!("Created signal calculator for {technique}");
            self.calculators.insert(technique.clone(), calculator);
        }
        self.calculators
            .get(&technique)
            .map(|calculator| &**calculator)
            .ok_or(SignalError::InvalidTechnique(technique))
    }

    pub fn cached(&self) -> usize {
        self.calculators.len()
    }
}
