//! Scan parameters and the form fields they are edited through
//!
//! Parameters travel as a plain name → value map. Numeric text is parsed
//! here; formatting rules beyond that belong to whoever fills the map.

use std::collections::BTreeMap;
use std::str::FromStr;

use thiserror::Error;

use crate::enums::ScanPlane;
use crate::scan_volume::SliceLayout;

pub type ParameterMap = BTreeMap<String, String>;

#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("Missing scan parameter {0}")]
    Missing(String),

    #[error("Invalid value {value:?} for scan parameter {name}")]
    Invalid { name: String, value: String },

    #[error("{value:?} is not one of the choices for {name}")]
    UnknownChoice { name: String, value: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScanParameters {
    pub technique: String,
    pub te_ms: f64,
    pub tr_ms: f64,
    pub ti_ms: f64,
    pub scan_plane: ScanPlane,
    pub n_slices: usize,
    pub slice_thickness_mm: f64,
    pub slice_gap_mm: f64,
    pub fov_mm: [f64; 2],
    pub matrix: [usize; 2],
}

impl Default for ScanParameters {
    fn default() -> Self {
        Self {
            technique: "SE".to_owned(),
            te_ms: 20.0,
            tr_ms: 500.0,
            ti_ms: 0.0,
            scan_plane: ScanPlane::Axial,
            n_slices: 1,
            slice_thickness_mm: 5.0,
            slice_gap_mm: 1.0,
            fov_mm: [250.0, 250.0],
            matrix: [256, 256],
        }
    }
}

fn required<'m>(map: &'m ParameterMap, name: &str) -> Result<&'m str, ParameterError> {
    map.get(name)
        .map(|value| value.trim())
        .ok_or_else(|| ParameterError::Missing(name.to_owned()))
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T, ParameterError> {
    value.parse().map_err(|_| ParameterError::Invalid {
        name: name.to_owned(),
        value: value.to_owned(),
    })
}

fn parse_required<T: FromStr>(map: &ParameterMap, name: &str) -> Result<T, ParameterError> {
    parse(name, required(map, name)?)
}

fn parse_optional<T: FromStr>(
    map: &ParameterMap,
    name: &str,
    default: T,
) -> Result<T, ParameterError> {
    match map.get(name) {
        Some(value) => parse(name, value.trim()),
        None => Ok(default),
    }
}

impl ScanParameters {
    /// Read parameters from a name → value map
    ///
    /// `TE`, `TR`, `TI`, `ScanTechnique`, `NSlices`, `ScanPlane`,
    /// `SliceThickness_mm` and `SliceGap_mm` are required; `FOVX_mm`,
    /// `FOVY_mm`, `NX` and `NY` fall back to the defaults.
    pub fn from_map(map: &ParameterMap) -> Result<Self, ParameterError> {
        let defaults = Self::default();
        let plane_label = required(map, "ScanPlane")?;
        let scan_plane = ScanPlane::parse(plane_label).ok_or_else(|| ParameterError::UnknownChoice {
            name: "ScanPlane".to_owned(),
            value: plane_label.to_owned(),
        })?;

        Ok(Self {
            technique: required(map, "ScanTechnique")?.to_owned(),
            te_ms: parse_required(map, "TE")?,
            tr_ms: parse_required(map, "TR")?,
            ti_ms: parse_required(map, "TI")?,
            scan_plane,
            n_slices: parse_required(map, "NSlices")?,
            slice_thickness_mm: parse_required(map, "SliceThickness_mm")?,
            slice_gap_mm: parse_required(map, "SliceGap_mm")?,
            fov_mm: [
                parse_optional(map, "FOVX_mm", defaults.fov_mm[0])?,
                parse_optional(map, "FOVY_mm", defaults.fov_mm[1])?,
            ],
            matrix: [
                parse_optional(map, "NX", defaults.matrix[0])?,
                parse_optional(map, "NY", defaults.matrix[1])?,
            ],
        })
    }

    pub fn to_map(&self) -> ParameterMap {
        [
            ("ScanTechnique", self.technique.clone()),
            ("TE", self.te_ms.to_string()),
            ("TR", self.tr_ms.to_string()),
            ("TI", self.ti_ms.to_string()),
            ("ScanPlane", self.scan_plane.label().to_owned()),
            ("NSlices", self.n_slices.to_string()),
            ("SliceThickness_mm", self.slice_thickness_mm.to_string()),
            ("SliceGap_mm", self.slice_gap_mm.to_string()),
            ("FOVX_mm", self.fov_mm[0].to_string()),
            ("FOVY_mm", self.fov_mm[1].to_string()),
            ("NX", self.matrix[0].to_string()),
            ("NY", self.matrix[1].to_string()),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value))
        .collect()
    }

    pub fn slice_layout(&self) -> SliceLayout {
        SliceLayout::new(self.n_slices, self.slice_thickness_mm, self.slice_gap_mm)
    }
}

/// One editable entry of the parameter form.
#[derive(Clone, Debug, PartialEq)]
pub enum ParameterField {
    /// Free text that must parse as a number
    Text { name: String, value: String },
    /// One of a fixed list of options
    Choice {
        name: String,
        options: Vec<String>,
        selected: String,
    },
}

impl ParameterField {
    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::Choice { name, .. } => name,
        }
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        match self {
            Self::Text { name, value } => parse::<f64>(name, value.trim()).map(|_| ()),
            Self::Choice {
                name,
                options,
                selected,
            } => {
                if options.iter().any(|option| option == selected) {
                    Ok(())
                } else {
                    Err(ParameterError::UnknownChoice {
                        name: name.clone(),
                        value: selected.clone(),
                    })
                }
            }
        }
    }

    /// The `(name, value)` entry this field contributes to a [`ParameterMap`]
    pub fn serialize(&self) -> (String, String) {
        match self {
            Self::Text { name, value } => (name.clone(), value.trim().to_owned()),
            Self::Choice { name, selected, .. } => (name.clone(), selected.clone()),
        }
    }
}

/// Validate every field and collect them into a parameter map.
pub fn collect_fields(fields: &[ParameterField]) -> Result<ParameterMap, ParameterError> {
    fields
        .iter()
        .map(|field| field.validate().map(|_| field.serialize()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> ParameterMap {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    fn minimal() -> ParameterMap {
        map(&[
            ("TE", "20"),
            ("TR", "2000"),
            ("TI", "0"),
            ("ScanTechnique", "SE"),
            ("NSlices", "3"),
            ("ScanPlane", "Sagittal"),
            ("SliceThickness_mm", "4.5"),
            ("SliceGap_mm", " 0.5 "),
        ])
    }

    #[test]
    fn required_parameters_are_parsed() {
        let parameters = ScanParameters::from_map(&minimal()).unwrap();
        assert_eq!(parameters.te_ms, 20.0);
        assert_eq!(parameters.tr_ms, 2000.0);
        assert_eq!(parameters.scan_plane, ScanPlane::Sagittal);
        assert_eq!(parameters.slice_layout(), SliceLayout::new(3, 4.5, 0.5));
        assert_eq!(parameters.matrix, [256, 256]);
    }

    #[test]
    fn map_round_trip_keeps_values() {
        let parameters = ScanParameters {
            fov_mm: [200.0, 180.0],
            matrix: [128, 96],
            ..ScanParameters::from_map(&minimal()).unwrap()
        };
        assert_eq!(ScanParameters::from_map(&parameters.to_map()).unwrap(), parameters);
    }

    #[test]
    fn missing_parameter_is_reported_by_name() {
        let mut entries = minimal();
        entries.remove("TR");
        assert_eq!(
            ScanParameters::from_map(&entries),
            Err(ParameterError::Missing("TR".to_owned()))
        );
    }

    #[test]
    fn unparsable_number_is_invalid() {
        let mut entries = minimal();
        entries.insert("NSlices".to_owned(), "three".to_owned());
        assert_eq!(
            ScanParameters::from_map(&entries),
            Err(ParameterError::Invalid {
                name: "NSlices".to_owned(),
                value: "three".to_owned()
            })
        );
    }

    #[test]
    fn form_fields_validate_themselves() {
        let fields = vec![
            ParameterField::Text {
                name: "TE".to_owned(),
                value: "15".to_owned(),
            },
            ParameterField::Choice {
                name: "ScanTechnique".to_owned(),
                options: vec!["SE".to_owned(), "GE".to_owned()],
                selected: "GE".to_owned(),
            },
        ];
        let collected = collect_fields(&fields).unwrap();
        assert_eq!(collected["TE"], "15");
        assert_eq!(collected["ScanTechnique"], "GE");

        let bad = ParameterField::Choice {
            name: "ScanTechnique".to_owned(),
            options: vec!["SE".to_owned()],
            selected: "EPI".to_owned(),
        };
        assert_eq!(bad.name(), "ScanTechnique");
        assert!(matches!(bad.validate(), Err(ParameterError::UnknownChoice { .. })));
        let text = ParameterField::Text {
            name: "TR".to_owned(),
            value: "long".to_owned(),
        };
        assert!(matches!(collect_fields(&[text]), Err(ParameterError::Invalid { .. })));
    }
}
