use serde::{Deserialize, Serialize};

/// Server response for one diagram: markup plus positional metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvgDocument {
    pub svg: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Fetched content of a pane.
///
/// Once loading completes exactly one of `svg` and `error` is set; both are
/// `None` while uninitialized or loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SvgPayload {
    svg: Option<String>,
    metadata: Option<serde_json::Value>,
    error: Option<String>,
    svg_url: Option<String>,
}

impl SvgPayload {
    pub fn ready(svg_url: impl Into<String>, document: SvgDocument) -> Self {
        Self {
            svg: Some(document.svg),
            metadata: Some(document.metadata),
            error: None,
            svg_url: Some(svg_url.into()),
        }
    }

    pub fn failed(svg_url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            svg: None,
            metadata: None,
            error: Some(error.into()),
            svg_url: Some(svg_url.into()),
        }
    }

    pub fn svg(&self) -> Option<&str> {
        self.svg.as_deref()
    }

    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn svg_url(&self) -> Option<&str> {
        self.svg_url.as_deref()
    }
}

/// Pan/zoom window of a rendered SVG, in SVG user units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Visual state of a breaker or disconnector in the diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwitchVisual {
    Open,
    Closed,
}

impl SwitchVisual {
    pub fn from_open(open: bool) -> Self {
        if open {
            SwitchVisual::Open
        } else {
            SwitchVisual::Closed
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            SwitchVisual::Open => "sld-open",
            SwitchVisual::Closed => "sld-closed",
        }
    }
}
