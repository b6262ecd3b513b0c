//! Fetch URL builders. Pure: identical inputs give identical strings, so the
//! URL doubles as the cache key of a pane's content.

use crate::settings::DisplayParameters;
use sldview_core::{DiagramId, DiagramKind, NodeId, StudyId};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("Invalid base URL: {0}")]
    InvalidBase(#[from] url::ParseError),
    #[error("Base URL cannot carry a path: {0}")]
    CannotBeABase(String),
}

/// Where a pane's diagram lives on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyContext {
    pub base_url: String,
    pub study_id: StudyId,
    pub node_id: NodeId,
}

fn diagram_url(
    context: &StudyContext,
    collection: &str,
    id: &DiagramId,
) -> Result<Url, UrlError> {
    let mut url = Url::parse(&context.base_url)?;
    url.path_segments_mut()
        .map_err(|_| UrlError::CannotBeABase(context.base_url.clone()))?
        .pop_if_empty()
        .extend([
            "v1",
            "studies",
            context.study_id.0.as_str(),
            "nodes",
            context.node_id.0.as_str(),
            "network",
            collection,
            id.as_str(),
            "svg-and-metadata",
        ]);
    Ok(url)
}

fn push_common_params(url: &mut Url, params: &DisplayParameters) {
    let mut query = url.query_pairs_mut();
    query
        .append_pair("useName", &params.use_name.to_string())
        .append_pair("centerLabel", &params.center_label.to_string())
        .append_pair("diagonalLabel", &params.diagonal_label.to_string())
        .append_pair(
            "topologicalColoring",
            &params.topological_coloring.to_string(),
        );
    if let Some(library) = &params.component_library {
        query.append_pair("componentLibrary", library);
    }
    query.append_pair("language", &params.language);
}

pub fn voltage_level_svg_url(
    context: &StudyContext,
    voltage_level_id: &DiagramId,
    params: &DisplayParameters,
) -> Result<String, UrlError> {
    let mut url = diagram_url(context, "voltage-levels", voltage_level_id)?;
    push_common_params(&mut url, params);
    Ok(url.into())
}

pub fn substation_svg_url(
    context: &StudyContext,
    substation_id: &DiagramId,
    params: &DisplayParameters,
) -> Result<String, UrlError> {
    let mut url = diagram_url(context, "substations", substation_id)?;
    push_common_params(&mut url, params);
    url.query_pairs_mut()
        .append_pair("substationLayout", params.substation_layout.as_query_value());
    Ok(url.into())
}

pub fn svg_url(
    context: &StudyContext,
    kind: DiagramKind,
    id: &DiagramId,
    params: &DisplayParameters,
) -> Result<String, UrlError> {
    match kind {
        DiagramKind::VoltageLevel => voltage_level_svg_url(context, id, params),
        DiagramKind::Substation => substation_svg_url(context, id, params),
    }
}
