//! Read-only voltage level diagram shown while choosing where a new feeder
//! goes. It is never tracked as a view and never interactive.

use crate::interactivity::{InteractionGate, InteractionPolicy, build_callbacks};
use crate::messages::PaneMessage;
use crate::pane::{DiagramPane, FetchOutcome, PaneBounds};
use crate::services::{DiagramRenderer, SvgFetcher};
use crate::settings::ViewerSettings;
use crate::spawner::{TaskSpawner, spawn_fetch};
use crate::urls::{StudyContext, UrlError, voltage_level_svg_url};
use crossbeam_channel::{Receiver, Sender, unbounded};
use sldview_core::{DiagramDescriptor, DiagramId, DiagramKind, EquipmentInfo, ServiceError};
use std::sync::Arc;

pub struct PositionDiagram {
    pane: DiagramPane,
    settings: ViewerSettings,
    fetcher: Arc<dyn SvgFetcher>,
    spawner: Arc<dyn TaskSpawner>,
    tx: Sender<PaneMessage>,
    rx: Receiver<PaneMessage>,
    bounds: PaneBounds,
}

impl PositionDiagram {
    /// Build the pane and start fetching its diagram.
    pub fn open(
        context: &StudyContext,
        settings: ViewerSettings,
        voltage_level_id: DiagramId,
        info: &EquipmentInfo,
        fetcher: Arc<dyn SvgFetcher>,
        spawner: Arc<dyn TaskSpawner>,
    ) -> Result<Self, UrlError> {
        let url = voltage_level_svg_url(context, &voltage_level_id, &settings.display)?;
        let descriptor = DiagramDescriptor::new(
            voltage_level_id,
            DiagramKind::VoltageLevel,
            info,
            settings.display.use_name,
        );
        let (tx, rx) = unbounded();
        let mut diagram = Self {
            pane: DiagramPane::new(descriptor, InteractionPolicy::ReadOnly),
            settings,
            fetcher,
            spawner,
            tx,
            rx,
            bounds: PaneBounds {
                available_width: None,
                available_height: None,
                display_count: 1,
                fullscreen: false,
            },
        };
        if let Some(request) = diagram.pane.set_svg_url(url) {
            spawn_fetch(
                diagram.spawner.as_ref(),
                diagram.fetcher.clone(),
                diagram.tx.clone(),
                request,
            );
        }
        Ok(diagram)
    }

    pub fn pane(&self) -> &DiagramPane {
        &self.pane
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.bounds.available_width = Some(width);
        self.bounds.available_height = Some(height);
    }

    pub fn reload(&mut self) {
        if let Some(request) = self.pane.force_reload() {
            spawn_fetch(
                self.spawner.as_ref(),
                self.fetcher.clone(),
                self.tx.clone(),
                request,
            );
        }
    }

    /// Apply a finished fetch, then draw and size the diagram. A failed fetch
    /// is returned to the caller, which owns the surrounding dialog.
    pub fn pump(&mut self, renderer: &mut dyn DiagramRenderer) -> Result<(), ServiceError> {
        let mut failure = None;
        while let Ok(message) = self.rx.try_recv() {
            if let PaneMessage::SvgFetched { url, result, .. } = message
                && let FetchOutcome::Failed(message) = self.pane.apply_fetch(&url, result)
            {
                failure = Some(ServiceError::Fetch(message));
            }
        }
        if let Some(error) = failure {
            return Err(error);
        }

        let callbacks = build_callbacks(
            self.pane.id(),
            self.pane.policy(),
            InteractionGate::default(),
            &self.tx,
        );
        self.pane.render(renderer, &self.settings, callbacks)?;
        self.pane.update_geometry(&self.settings, self.bounds);
        Ok(())
    }
}
