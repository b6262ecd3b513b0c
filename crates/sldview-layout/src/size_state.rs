use crate::reconcile::{DiagramGeometry, SizeInputs, reconcile};
use sldview_core::DiagramKind;
use tracing::trace;

/// Identity of what was drawn. The preferred size is only re-measured when
/// this changes, never because the final size changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentKey {
    pub revision: u64,
    pub kind: DiagramKind,
    pub disabled: bool,
}

/// Memoizes `reconcile` so that identical inputs hand back the stored
/// geometry and report no change, which stops resize feedback loops.
#[derive(Debug, Default, Clone)]
pub struct GeometryCache {
    last_inputs: Option<SizeInputs>,
    current: Option<DiagramGeometry>,
}

impl GeometryCache {
    /// Returns true when a new, ready geometry replaced the previous one.
    /// Not-ready inputs keep the previous geometry.
    pub fn update(&mut self, inputs: &SizeInputs) -> bool {
        if self.last_inputs.as_ref() == Some(inputs) {
            return false;
        }
        self.last_inputs = Some(*inputs);
        match reconcile(inputs) {
            Some(geometry) if self.current != Some(geometry) => {
                trace!(?geometry, "pane geometry changed");
                self.current = Some(geometry);
                true
            }
            _ => false,
        }
    }

    pub fn current(&self) -> Option<&DiagramGeometry> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.last_inputs = None;
        self.current = None;
    }
}

/// Per-pane sizing state. Each pane owns one; nothing is shared between
/// instances.
#[derive(Debug, Default, Clone)]
pub struct SizeState {
    preferred: Option<(f64, f64)>,
    content: Option<ContentKey>,
    geometry: GeometryCache,
}

impl SizeState {
    /// Declare what is about to be drawn. Returns true (and forgets the
    /// preferred size) when the content differs from the last declaration.
    pub fn begin_content(&mut self, key: ContentKey) -> bool {
        if self.content == Some(key) {
            return false;
        }
        self.content = Some(key);
        self.preferred = None;
        true
    }

    pub fn record_preferred(&mut self, width: f64, height: f64) {
        self.preferred = Some((width, height));
    }

    pub fn preferred(&self) -> Option<(f64, f64)> {
        self.preferred
    }

    pub fn preferred_width(&self) -> Option<f64> {
        self.preferred.map(|(w, _)| w)
    }

    pub fn preferred_height(&self) -> Option<f64> {
        self.preferred.map(|(_, h)| h)
    }

    pub fn update_geometry(&mut self, inputs: &SizeInputs) -> bool {
        self.geometry.update(inputs)
    }

    pub fn geometry(&self) -> Option<&DiagramGeometry> {
        self.geometry.current()
    }

    pub fn reset(&mut self) {
        self.preferred = None;
        self.content = None;
        self.geometry.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{Chrome, KindLimits};

    fn inputs(preferred: Option<(f64, f64)>, width: f64) -> SizeInputs {
        SizeInputs {
            kind: DiagramKind::Substation,
            available_width: Some(width),
            available_height: Some(900.0),
            preferred_width: preferred.map(|p| p.0),
            preferred_height: preferred.map(|p| p.1),
            chrome: Chrome {
                header_height: 36.0,
                border_thickness: 1.0,
                right_offset: 0.0,
                bottom_offset: 0.0,
            },
            max_width: KindLimits::new(800.0, 1200.0),
            max_height: KindLimits::new(800.0, 1000.0),
            display_count: Some(1),
            fullscreen: false,
        }
    }

    fn key(revision: u64) -> ContentKey {
        ContentKey {
            revision,
            kind: DiagramKind::Substation,
            disabled: false,
        }
    }

    #[test]
    fn test_cache_reports_change_once() {
        let mut cache = GeometryCache::default();
        let input = inputs(Some((500.0, 400.0)), 1000.0);
        assert!(cache.update(&input));
        assert!(!cache.update(&input));
        assert_eq!(cache.current().map(|g| g.svg_width), Some(500.0));
    }

    #[test]
    fn test_cache_keeps_previous_when_not_ready() {
        let mut cache = GeometryCache::default();
        assert!(cache.update(&inputs(Some((500.0, 400.0)), 1000.0)));
        assert!(!cache.update(&inputs(None, 1000.0)));
        assert_eq!(cache.current().map(|g| g.svg_height), Some(400.0));
    }

    #[test]
    fn test_preferred_survives_final_size_changes() {
        let mut state = SizeState::default();
        assert!(state.begin_content(key(1)));
        state.record_preferred(500.0, 400.0);

        assert!(state.update_geometry(&inputs(state.preferred(), 1000.0)));
        assert!(state.update_geometry(&inputs(state.preferred(), 300.0)));
        assert!(!state.begin_content(key(1)));
        assert_eq!(state.preferred(), Some((500.0, 400.0)));
    }

    #[test]
    fn test_preferred_reset_on_new_content() {
        let mut state = SizeState::default();
        state.begin_content(key(1));
        state.record_preferred(500.0, 400.0);

        assert!(state.begin_content(key(2)));
        assert_eq!(state.preferred(), None);

        state.record_preferred(500.0, 400.0);
        assert!(state.begin_content(ContentKey {
            disabled: true,
            ..key(2)
        }));
        assert_eq!(state.preferred(), None);
    }
}
