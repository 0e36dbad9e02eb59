//! JSON command protocol for scripted and batch editing.
//!
//! Each edit command carries the fields of the matching transaction, e.g.
//! `{"command": "add_lane", "road_id": "R1", "side": "left", "lane_index": 0}`.

use serde::{Deserialize, Serialize};

use crate::harness::EditorHarness;
use crate::transaction::{
    transaction, AddLane, CompositeTransaction, CreateConnectionRoad, CreateJunction, CreateRoad,
    CreateSignal, EditJunctionEdge, EditJunctionEdgeAltitude, EditLaneLineAltitude,
    EditLaneLineBoundary, EditLaneLineCatmull, EditLaneWidth, EditRoadAltitude, EditRoadCatmull,
    EditRoadTransparency, ExtendRoad, ReformatRoad, ReformatSignal, RemoveJunction, RemoveLane,
    RemoveRoad, RemoveSignal, Transaction,
};

/// A command understood by [`execute_command`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EditCommand {
    CreateRoad(CreateRoad),
    CreateConnectionRoad(CreateConnectionRoad),
    RemoveRoad(RemoveRoad),
    AddLane(AddLane),
    RemoveLane(RemoveLane),
    EditRoadCatmull(EditRoadCatmull),
    ExtendRoad(ExtendRoad),
    ReformatRoad(ReformatRoad),
    EditRoadAltitude(EditRoadAltitude),
    EditLaneLineCatmull(EditLaneLineCatmull),
    EditLaneLineAltitude(EditLaneLineAltitude),
    EditLaneWidth(EditLaneWidth),
    EditLaneLineBoundary(EditLaneLineBoundary),
    EditRoadTransparency(EditRoadTransparency),
    CreateJunction(CreateJunction),
    RemoveJunction(RemoveJunction),
    EditJunctionEdge(EditJunctionEdge),
    EditJunctionEdgeAltitude(EditJunctionEdgeAltitude),
    CreateSignal(CreateSignal),
    RemoveSignal(RemoveSignal),
    ReformatSignal(ReformatSignal),
    /// Several edit commands committed as one undo step.
    Group {
        label: String,
        commands: Vec<EditCommand>,
    },
    /// Undo the last operation.
    Undo,
    /// Redo the last undone operation.
    Redo,
    /// Summary of the map and the history.
    Inspect,
    /// Full JSON of one road.
    InspectRoad { road_id: String },
    /// Export the map as JSON.
    ExportMap,
}

impl EditCommand {
    /// The transaction behind an edit command; None for queries and history commands.
    pub fn into_transaction(self) -> Option<Box<dyn Transaction>> {
        let tx: Box<dyn Transaction> = match self {
            EditCommand::CreateRoad(e) => transaction(e),
            EditCommand::CreateConnectionRoad(e) => transaction(e),
            EditCommand::RemoveRoad(e) => transaction(e),
            EditCommand::AddLane(e) => transaction(e),
            EditCommand::RemoveLane(e) => transaction(e),
            EditCommand::EditRoadCatmull(e) => transaction(e),
            EditCommand::ExtendRoad(e) => transaction(e),
            EditCommand::ReformatRoad(e) => transaction(e),
            EditCommand::EditRoadAltitude(e) => transaction(e),
            EditCommand::EditLaneLineCatmull(e) => transaction(e),
            EditCommand::EditLaneLineAltitude(e) => transaction(e),
            EditCommand::EditLaneWidth(e) => transaction(e),
            EditCommand::EditLaneLineBoundary(e) => transaction(e),
            EditCommand::EditRoadTransparency(e) => transaction(e),
            EditCommand::CreateJunction(e) => transaction(e),
            EditCommand::RemoveJunction(e) => transaction(e),
            EditCommand::EditJunctionEdge(e) => transaction(e),
            EditCommand::EditJunctionEdgeAltitude(e) => transaction(e),
            EditCommand::CreateSignal(e) => transaction(e),
            EditCommand::RemoveSignal(e) => transaction(e),
            EditCommand::ReformatSignal(e) => transaction(e),
            EditCommand::Group { label, commands } => {
                let parts = commands
                    .into_iter()
                    .map(EditCommand::into_transaction)
                    .collect::<Option<Vec<_>>>()?;
                Box::new(CompositeTransaction::new(label, parts))
            }
            EditCommand::Undo
            | EditCommand::Redo
            | EditCommand::Inspect
            | EditCommand::InspectRoad { .. }
            | EditCommand::ExportMap => return None,
        };
        Some(tx)
    }
}

/// Response from executing a command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CommandResponse {
    fn ok_with_data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            data: None,
        }
    }
}

/// Execute a single command on the harness.
pub fn execute_command(harness: &mut EditorHarness, cmd: EditCommand) -> CommandResponse {
    match cmd {
        EditCommand::Undo => match harness.undo() {
            Ok(undone) => CommandResponse::ok_with_data(serde_json::json!({ "undone": undone })),
            Err(e) => CommandResponse::err(e),
        },

        EditCommand::Redo => match harness.redo() {
            Ok(redone) => CommandResponse::ok_with_data(serde_json::json!({ "redone": redone })),
            Err(e) => CommandResponse::err(e),
        },

        EditCommand::Inspect => {
            let store = harness.ctx.store.borrow();
            let roads: Vec<serde_json::Value> = store
                .roads()
                .map(|road| {
                    serde_json::json!({
                        "id": road.id,
                        "category": road.category,
                        "left_lanes": road.left_lanes.len(),
                        "right_lanes": road.right_lanes.len(),
                    })
                })
                .collect();
            let junctions: Vec<&str> = store.junctions().map(|j| j.id.as_str()).collect();
            let signals: Vec<&str> = store.signals().map(|s| s.id.as_str()).collect();
            CommandResponse::ok_with_data(serde_json::json!({
                "road_count": roads.len(),
                "roads": roads,
                "junctions": junctions,
                "signals": signals,
                "undo_depth": harness.history.undo_depth(),
                "redo_depth": harness.history.redo_depth(),
            }))
        }

        EditCommand::InspectRoad { road_id } => match harness.road(&road_id) {
            Some(road) => match serde_json::to_value(&*road) {
                Ok(value) => CommandResponse::ok_with_data(value),
                Err(e) => CommandResponse::err(format!("Failed to serialize road: {e}")),
            },
            None => CommandResponse::err(format!("Road '{road_id}' not found")),
        },

        EditCommand::ExportMap => match harness.export_map_json() {
            Ok(json) => CommandResponse::ok_with_data(serde_json::json!({ "map_json": json })),
            Err(e) => CommandResponse::err(e),
        },

        edit => match edit.into_transaction() {
            Some(tx) => match harness.submit_boxed(tx) {
                Ok(receipt) => CommandResponse::ok_with_data(serde_json::json!({
                    "transaction": receipt.label,
                    "id": receipt.entity_id,
                })),
                Err(e) => CommandResponse::err(e),
            },
            None => CommandResponse::err("Groups may only contain edit commands"),
        },
    }
}

/// Parse and execute a single JSON command string.
pub fn execute_json(harness: &mut EditorHarness, json: &str) -> Result<CommandResponse, String> {
    let cmd: EditCommand =
        serde_json::from_str(json).map_err(|e| format!("Invalid command JSON: {e}"))?;
    Ok(execute_command(harness, cmd))
}

/// Parse and execute multiple JSON commands (array).
pub fn execute_json_batch(
    harness: &mut EditorHarness,
    json: &str,
) -> Result<Vec<CommandResponse>, String> {
    let cmds: Vec<EditCommand> =
        serde_json::from_str(json).map_err(|e| format!("Invalid commands JSON: {e}"))?;
    Ok(cmds
        .into_iter()
        .map(|cmd| execute_command(harness, cmd))
        .collect())
}
