use crate::signaling::{SignalingService, ws_handler};
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use huddle_core::utils::SIGNALING_PATH;
use huddle_core::{PeerId, RoomCode};
use serde::{Deserialize, Serialize};

/// One room as shown by the diagnostic endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListing {
    pub room: RoomCode,
    pub members: Vec<PeerId>,
}

pub fn router(service: SignalingService) -> Router {
    Router::new()
        .route(SIGNALING_PATH, get(ws_handler))
        .route("/rooms", get(list_rooms))
        .route("/rooms/{code}", get(room_members))
        .with_state(service)
}

async fn list_rooms(State(service): State<SignalingService>) -> Json<Vec<RoomListing>> {
    let rooms = service
        .registry()
        .rooms()
        .into_iter()
        .map(|(room, members)| RoomListing { room, members })
        .collect();
    Json(rooms)
}

async fn room_members(
    Path(code): Path<String>,
    State(service): State<SignalingService>,
) -> Result<Json<RoomListing>, StatusCode> {
    let room = RoomCode::from(code);
    let members = service.registry().members(&room);
    if members.is_empty() {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(RoomListing { room, members }))
}
