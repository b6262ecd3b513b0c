use serde::{Deserialize, Serialize};
use std::fmt;

/// Equipment types the renderer can report on a feeder or bus click.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EquipmentType {
    Line,
    Load,
    Generator,
    Battery,
    DanglingLine,
    TwoWindingsTransformer,
    ThreeWindingsTransformer,
    HvdcLine,
    LccConverterStation,
    VscConverterStation,
    ShuntCompensator,
    StaticVarCompensator,
    Bus,
    Switch,
    /// Anything outside the known set, kept verbatim for logging.
    Unknown(String),
}

impl EquipmentType {
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "LINE" => EquipmentType::Line,
            "LOAD" => EquipmentType::Load,
            "GENERATOR" => EquipmentType::Generator,
            "BATTERY" => EquipmentType::Battery,
            "DANGLING_LINE" => EquipmentType::DanglingLine,
            "TWO_WINDINGS_TRANSFORMER" => EquipmentType::TwoWindingsTransformer,
            "THREE_WINDINGS_TRANSFORMER" => EquipmentType::ThreeWindingsTransformer,
            "HVDC_LINE" => EquipmentType::HvdcLine,
            "LCC_CONVERTER_STATION" => EquipmentType::LccConverterStation,
            "VSC_CONVERTER_STATION" => EquipmentType::VscConverterStation,
            "SHUNT_COMPENSATOR" => EquipmentType::ShuntCompensator,
            "STATIC_VAR_COMPENSATOR" => EquipmentType::StaticVarCompensator,
            "BUS" => EquipmentType::Bus,
            "SWITCH" => EquipmentType::Switch,
            other => EquipmentType::Unknown(other.to_string()),
        }
    }

    pub fn wire_name(&self) -> &str {
        match self {
            EquipmentType::Line => "LINE",
            EquipmentType::Load => "LOAD",
            EquipmentType::Generator => "GENERATOR",
            EquipmentType::Battery => "BATTERY",
            EquipmentType::DanglingLine => "DANGLING_LINE",
            EquipmentType::TwoWindingsTransformer => "TWO_WINDINGS_TRANSFORMER",
            EquipmentType::ThreeWindingsTransformer => "THREE_WINDINGS_TRANSFORMER",
            EquipmentType::HvdcLine => "HVDC_LINE",
            EquipmentType::LccConverterStation => "LCC_CONVERTER_STATION",
            EquipmentType::VscConverterStation => "VSC_CONVERTER_STATION",
            EquipmentType::ShuntCompensator => "SHUNT_COMPENSATOR",
            EquipmentType::StaticVarCompensator => "STATIC_VAR_COMPENSATOR",
            EquipmentType::Bus => "BUS",
            EquipmentType::Switch => "SWITCH",
            EquipmentType::Unknown(raw) => raw,
        }
    }
}

impl From<String> for EquipmentType {
    fn from(value: String) -> Self {
        EquipmentType::from_wire(&value)
    }
}

impl From<EquipmentType> for String {
    fn from(value: EquipmentType) -> Self {
        value.wire_name().to_string()
    }
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Which context menu an equipment click opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MenuKind {
    /// Lines and transformers: trip, lock out, energise one side.
    Branch,
    Hvdc,
    /// Single-terminal equipment: loads, generators, compensators...
    Injection,
    Bus,
    /// No menu exists for this type.
    Unsupported,
}

impl MenuKind {
    pub fn for_equipment(equipment_type: &EquipmentType) -> Self {
        match equipment_type {
            EquipmentType::Line
            | EquipmentType::TwoWindingsTransformer
            | EquipmentType::ThreeWindingsTransformer => MenuKind::Branch,
            EquipmentType::HvdcLine => MenuKind::Hvdc,
            EquipmentType::Load
            | EquipmentType::Generator
            | EquipmentType::Battery
            | EquipmentType::DanglingLine
            | EquipmentType::LccConverterStation
            | EquipmentType::VscConverterStation
            | EquipmentType::ShuntCompensator
            | EquipmentType::StaticVarCompensator => MenuKind::Injection,
            EquipmentType::Bus => MenuKind::Bus,
            EquipmentType::Switch | EquipmentType::Unknown(_) => MenuKind::Unsupported,
        }
    }
}
