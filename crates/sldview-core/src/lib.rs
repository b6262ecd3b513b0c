use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod equipment;
pub mod error;
pub mod payload;

pub use equipment::{EquipmentType, MenuKind};
pub use error::ServiceError;
pub use payload::{SvgDocument, SvgPayload, SwitchVisual, ViewBox};

/// Stable identifier of a diagram: the voltage-level or substation id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagramId(pub String);

impl DiagramId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DiagramId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a node in the study tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudyId(pub String);

impl fmt::Display for StudyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagramKind {
    VoltageLevel,
    Substation,
}

impl DiagramKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramKind::VoltageLevel => "VOLTAGE_LEVEL",
            DiagramKind::Substation => "SUBSTATION",
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagramKind {
    type Err = EnumConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VOLTAGE_LEVEL" => Ok(DiagramKind::VoltageLevel),
            "SUBSTATION" => Ok(DiagramKind::Substation),
            other => Err(EnumConversionError::InvalidDiagramKind(other.to_string())),
        }
    }
}

/// Display status of a tracked diagram.
///
/// At most one tracked diagram is `Opened` at a time. `Pinned` diagrams are
/// displayed alongside it; `Minimized` ones only appear as chips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewStatus {
    Opened,
    Pinned,
    Minimized,
}

impl ViewStatus {
    pub fn is_displayed(&self) -> bool {
        matches!(self, ViewStatus::Opened | ViewStatus::Pinned)
    }
}

/// Error type for enum conversion failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnumConversionError {
    #[error("Invalid diagram kind: {0}")]
    InvalidDiagramKind(String),
}

/// Network facts about a voltage level or substation needed to label a
/// diagram and group it under its substation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentInfo {
    pub name: Option<String>,
    pub substation_id: Option<DiagramId>,
    pub country: Option<String>,
}

impl EquipmentInfo {
    /// Name when `use_name` is set and a name exists, the id otherwise,
    /// suffixed with the country when known.
    pub fn label(&self, id: &DiagramId, use_name: bool) -> String {
        let base = match (&self.name, use_name) {
            (Some(name), true) if !name.is_empty() => name.as_str(),
            _ => id.as_str(),
        };
        match &self.country {
            Some(country) if !country.is_empty() => format!("{base} - {country}"),
            _ => base.to_string(),
        }
    }
}

/// Everything needed to fetch and label one diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramDescriptor {
    pub id: DiagramId,
    pub kind: DiagramKind,
    /// Recomputed whenever study, node or display parameters change.
    pub svg_url: Option<String>,
    pub name: String,
    pub substation_id: Option<DiagramId>,
}

impl DiagramDescriptor {
    pub fn new(id: DiagramId, kind: DiagramKind, info: &EquipmentInfo, use_name: bool) -> Self {
        let substation_id = match kind {
            DiagramKind::Substation => Some(id.clone()),
            DiagramKind::VoltageLevel => info.substation_id.clone(),
        };
        Self {
            name: info.label(&id, use_name),
            id,
            kind,
            svg_url: None,
            substation_id,
        }
    }

    /// True when deleting `deleted` must close this diagram.
    pub fn depends_on(&self, deleted: &DiagramId) -> bool {
        &self.id == deleted || self.substation_id.as_ref() == Some(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagram_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&DiagramKind::VoltageLevel).unwrap(),
            "\"VOLTAGE_LEVEL\""
        );
        assert_eq!(
            "SUBSTATION".parse::<DiagramKind>().unwrap(),
            DiagramKind::Substation
        );
        assert_eq!(
            "LINE".parse::<DiagramKind>(),
            Err(EnumConversionError::InvalidDiagramKind("LINE".to_string()))
        );
    }

    #[test]
    fn test_label_prefers_name_and_appends_country() {
        let info = EquipmentInfo {
            name: Some("Paris Nord".to_string()),
            substation_id: Some(DiagramId::from("S1")),
            country: Some("FR".to_string()),
        };
        let id = DiagramId::from("VL1");
        assert_eq!(info.label(&id, true), "Paris Nord - FR");
        assert_eq!(info.label(&id, false), "VL1 - FR");
        assert_eq!(EquipmentInfo::default().label(&id, true), "VL1");
    }

    #[test]
    fn test_descriptor_dependencies() {
        let info = EquipmentInfo {
            substation_id: Some(DiagramId::from("S1")),
            ..Default::default()
        };
        let vl = DiagramDescriptor::new(DiagramId::from("VL1"), DiagramKind::VoltageLevel, &info, true);
        assert!(vl.depends_on(&DiagramId::from("VL1")));
        assert!(vl.depends_on(&DiagramId::from("S1")));
        assert!(!vl.depends_on(&DiagramId::from("S2")));

        let sub = DiagramDescriptor::new(
            DiagramId::from("S2"),
            DiagramKind::Substation,
            &EquipmentInfo::default(),
            true,
        );
        assert_eq!(sub.substation_id, Some(DiagramId::from("S2")));
    }
}
