//! Request and event payloads exchanged with clients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cell::Cell;
use crate::ids::SessionId;
use crate::params::SimulationParameters;

/// A possibly partial field description. Cells that are not listed take the
/// default state when the dense field is reconstructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SparseField {
    /// Grid width in cells.
    pub width: i32,
    /// Grid height in cells.
    pub height: i32,
    /// Cells that differ from the default state.
    #[serde(default)]
    pub cells: Vec<Cell>,
}

/// Body of `POST /api/sessions`.
///
/// Every part is optional here so that an absent part is reported as
/// missing input instead of a generic decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CreateSessionRequest {
    /// The initial field.
    pub field: Option<SparseField>,
    /// Simulation parameters.
    pub params: Option<SimulationParameters>,
    /// `"x,y"` key to position in `field.cells`.
    pub coords: Option<BTreeMap<String, usize>>,
}

/// Body returned from `POST /api/sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct CreateSessionResponse {
    /// Identifier to stream or cancel the session with.
    pub session_id: SessionId,
}

/// Payload of one delta event: every cell that changed in a generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct DeltaPayload {
    /// `"x,y"` key to the cell's new value.
    pub updated_cells_map: BTreeMap<String, Cell>,
}

impl DeltaPayload {
    /// Whether the generation changed nothing.
    pub fn is_empty(&self) -> bool {
        self.updated_cells_map.is_empty()
    }

    /// Number of changed cells.
    pub fn len(&self) -> usize {
        self.updated_cells_map.len()
    }
}

/// What a cancel request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum CancelOutcome {
    /// The session was live and has been cancelled.
    Cancelled,
    /// The session had already completed or been cancelled.
    AlreadyFinished,
}

/// Body returned from `DELETE /api/sessions/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CancelResponse {
    /// Always `true`; failures are reported as error responses.
    pub ok: bool,
    /// What the request did.
    pub outcome: CancelOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellState, Coord};

    #[test]
    fn request_parts_are_optional() {
        let req: Result<CreateSessionRequest, _> = serde_json::from_str("{}");
        assert_eq!(req.ok(), Some(CreateSessionRequest::default()));
    }

    #[test]
    fn full_request_parses() {
        let body = serde_json::json!({
            "field": {
                "width": 3,
                "height": 3,
                "cells": [{"x": 0, "y": 0, "state": "Burning", "burnTime": 0}]
            },
            "params": {"updateIntervalSeconds": 1.0},
            "coords": {"0,0": 0}
        });
        let req: Result<CreateSessionRequest, _> = serde_json::from_value(body);
        let req = req.ok().unwrap_or_default();
        let field = req.field.unwrap_or(SparseField { width: 0, height: 0, cells: Vec::new() });
        assert_eq!(field.width, 3);
        assert_eq!(field.cells.first().map(|c| c.state), Some(CellState::Burning));
        assert_eq!(req.coords.map(|c| c.len()), Some(1));
    }

    #[test]
    fn delta_payload_uses_wire_name() {
        let mut payload = DeltaPayload::default();
        let cell = Cell::new(Coord::new(2, 1), CellState::Empty);
        payload.updated_cells_map.insert(cell.coord().key(), cell);
        let json = serde_json::to_value(&payload).ok();
        assert_eq!(
            json,
            Some(serde_json::json!({
                "updatedCellsMap": {"2,1": {"x": 2, "y": 1, "state": "Empty", "burnTime": 0}}
            }))
        );
    }

    #[test]
    fn cancel_outcome_is_camel_case() {
        let json = serde_json::to_string(&CancelOutcome::AlreadyFinished).ok();
        assert_eq!(json.as_deref(), Some("\"alreadyFinished\""));
    }
}
