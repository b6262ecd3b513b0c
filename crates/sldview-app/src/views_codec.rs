//! `views` query parameter codec.
//!
//! Open diagrams are written as an index-array: `views[0][id]=VL1`,
//! `views[0][type]=VOLTAGE_LEVEL`, `views[0][lastOpen]=true`, ... Other query
//! parameters are left untouched.

use serde::{Deserialize, Serialize};
use sldview_core::{DiagramId, DiagramKind, EnumConversionError};
use std::collections::BTreeMap;
use thiserror::Error;
use url::form_urlencoded;

pub const VIEWS_PARAM: &str = "views";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewEntry {
    pub id: DiagramId,
    #[serde(rename = "type")]
    pub kind: DiagramKind,
    #[serde(rename = "lastOpen", default)]
    pub last_open: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewsCodecError {
    #[error("Malformed views key: {0}")]
    MalformedKey(String),
    #[error("views[{index}] is missing `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error(transparent)]
    InvalidKind(#[from] EnumConversionError),
}

#[derive(Default)]
struct RawEntry {
    id: Option<String>,
    kind: Option<String>,
    last_open: bool,
}

/// Split `views[3][id]` into `(3, "id")`. Keys outside `views` give `None`.
fn parse_key(key: &str) -> Option<Result<(usize, &str), ViewsCodecError>> {
    let rest = key.strip_prefix(VIEWS_PARAM)?;
    if !rest.is_empty() && !rest.starts_with('[') {
        return None;
    }
    let parsed = (|| {
        let rest = rest.strip_prefix('[')?;
        let (index, rest) = rest.split_once(']')?;
        let field = rest.strip_prefix('[')?.strip_suffix(']')?;
        Some((index.parse::<usize>().ok()?, field))
    })();
    Some(parsed.ok_or_else(|| ViewsCodecError::MalformedKey(key.to_string())))
}

/// Decode the tracked views, ordered by index.
pub fn decode_views(query: &str) -> Result<Vec<ViewEntry>, ViewsCodecError> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut raw: BTreeMap<usize, RawEntry> = BTreeMap::new();

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let Some(parsed) = parse_key(&key) else {
            continue;
        };
        let (index, field) = parsed?;
        let entry = raw.entry(index).or_default();
        match field {
            "id" => entry.id = Some(value.into_owned()),
            "type" => entry.kind = Some(value.into_owned()),
            "lastOpen" => entry.last_open = value == "true",
            _ => {}
        }
    }

    raw.into_iter()
        .map(|(index, entry)| {
            let id = entry
                .id
                .ok_or(ViewsCodecError::MissingField { index, field: "id" })?;
            let kind = entry
                .kind
                .ok_or(ViewsCodecError::MissingField {
                    index,
                    field: "type",
                })?
                .parse::<DiagramKind>()?;
            Ok(ViewEntry {
                id: DiagramId(id),
                kind,
                last_open: entry.last_open,
            })
        })
        .collect()
}

/// Replace the `views` entries of `query`, keeping every other parameter.
pub fn encode_views(query: &str, entries: &[ViewEntry]) -> String {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut serializer = form_urlencoded::Serializer::new(String::new());

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if parse_key(&key).is_none() {
            serializer.append_pair(&key, &value);
        }
    }

    for (index, entry) in entries.iter().enumerate() {
        serializer.append_pair(&format!("{VIEWS_PARAM}[{index}][id]"), entry.id.as_str());
        serializer.append_pair(&format!("{VIEWS_PARAM}[{index}][type]"), entry.kind.as_str());
        if entry.last_open {
            serializer.append_pair(&format!("{VIEWS_PARAM}[{index}][lastOpen]"), "true");
        }
    }

    serializer.finish()
}
