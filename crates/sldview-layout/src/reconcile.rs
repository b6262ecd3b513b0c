//! Pane geometry reconciliation.
//!
//! Merges the size a diagram would like to have (as measured by the renderer
//! after its first draw) with the room the viewport actually offers.

use serde::{Deserialize, Serialize};
use sldview_core::DiagramKind;

/// One bound per diagram kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KindLimits {
    pub voltage_level: f64,
    pub substation: f64,
}

impl KindLimits {
    pub fn new(voltage_level: f64, substation: f64) -> Self {
        Self {
            voltage_level,
            substation,
        }
    }

    pub fn for_kind(&self, kind: DiagramKind) -> f64 {
        match kind {
            DiagramKind::VoltageLevel => self.voltage_level,
            DiagramKind::Substation => self.substation,
        }
    }
}

/// Decoration around the SVG and regions of the viewport reserved for other
/// panels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Chrome {
    pub header_height: f64,
    pub border_thickness: f64,
    pub right_offset: f64,
    pub bottom_offset: f64,
}

impl Chrome {
    fn horizontal(&self) -> f64 {
        2.0 * self.border_thickness
    }

    fn vertical(&self) -> f64 {
        self.header_height + 2.0 * self.border_thickness
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeInputs {
    pub kind: DiagramKind,
    pub available_width: Option<f64>,
    pub available_height: Option<f64>,
    pub preferred_width: Option<f64>,
    pub preferred_height: Option<f64>,
    pub chrome: Chrome,
    pub max_width: KindLimits,
    pub max_height: KindLimits,
    /// Number of panes sharing the viewport width.
    pub display_count: Option<usize>,
    pub fullscreen: bool,
}

/// Final render target of a pane. `paper_*` includes header and borders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagramGeometry {
    pub svg_width: f64,
    pub svg_height: f64,
    pub paper_width: f64,
    pub paper_height: f64,
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Compute the geometry of one pane.
///
/// Returns `None` while the viewport or the preferred size is unknown (or
/// zero); callers keep their previous render in that case.
pub fn reconcile(inputs: &SizeInputs) -> Option<DiagramGeometry> {
    let available_width = positive(inputs.available_width)?;
    let available_height = positive(inputs.available_height)?;
    let preferred_width = positive(inputs.preferred_width)?;
    let preferred_height = positive(inputs.preferred_height)?;
    let chrome = inputs.chrome;

    let (mut width, mut height) = if inputs.fullscreen {
        (
            available_width - chrome.horizontal(),
            available_height - chrome.vertical(),
        )
    } else {
        let width = preferred_width
            .min(inputs.max_width.for_kind(inputs.kind))
            .min(available_width - chrome.right_offset - chrome.horizontal());
        let height = preferred_height
            .min(inputs.max_height.for_kind(inputs.kind))
            .min(available_height - chrome.bottom_offset - chrome.vertical());
        (width, height)
    };

    if !inputs.fullscreen
        && let Some(count) = inputs.display_count
        && count > 1
    {
        let share = available_width / count as f64;
        if width > share {
            height *= share / width;
            width = share;
        }
    }

    if width <= 0.0 || height <= 0.0 {
        return None;
    }

    Some(DiagramGeometry {
        svg_width: width,
        svg_height: height,
        paper_width: width + chrome.horizontal(),
        paper_height: height + chrome.vertical(),
    })
}
