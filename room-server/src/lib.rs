use std::sync::Arc;
use warp::Filter;
use warp::http::StatusCode;

use crate::auth::AuthService;
use crate::room_manager::{ManagerError, RoomManager};
use crate::websocket::ConnectionManager;

pub mod auth;
pub mod config;
pub mod lookup;
pub mod room_manager;
pub mod sweeps;
pub mod websocket;

pub fn create_routes(
    connection_manager: Arc<ConnectionManager>,
    room_manager: Arc<RoomManager>,
    auth_service: Arc<AuthService>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let connection_manager_filter = warp::any().map({
        let connection_manager = connection_manager.clone();
        move || connection_manager.clone()
    });

    let room_manager_filter = warp::any().map({
        let room_manager = room_manager.clone();
        move || room_manager.clone()
    });

    let auth_filter = warp::any().map({
        let auth_service = auth_service.clone();
        move || auth_service.clone()
    });

    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(connection_manager_filter)
        .and(room_manager_filter.clone())
        .and(auth_filter.clone())
        .map(|ws: warp::ws::Ws, conn_mgr, room_mgr, auth| {
            ws.on_upgrade(move |socket| websocket::handle_connection(socket, conn_mgr, room_mgr, auth))
        });

    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    // Room snapshot for reconnecting clients; a bearer token personalizes it.
    let room_state = warp::path!("rooms" / String / "state")
        .and(warp::get())
        .and(warp::header::optional::<String>("authorization"))
        .and(room_manager_filter)
        .and(auth_filter)
        .and_then(handle_room_state_request);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET"]);

    websocket
        .or(health)
        .or(room_state)
        .with(cors)
        .with(warp::log("wordmoney"))
}

fn error_reply(message: &str, status: StatusCode) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": message })),
        status,
    )
}

async fn handle_room_state_request(
    room_id: String,
    auth_header: Option<String>,
    room_manager: Arc<RoomManager>,
    auth_service: Arc<AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let viewer = match auth_header {
        Some(auth_header) => {
            let token = auth_header.strip_prefix("Bearer ").unwrap_or(&auth_header);
            match auth_service.validate_token(token).await {
                Ok(user) => Some(user.id),
                Err(_) => {
                    return Ok(error_reply(
                        "Invalid authentication token",
                        StatusCode::UNAUTHORIZED,
                    ));
                }
            }
        }
        None => None,
    };

    match room_manager.room_view(&room_id, viewer.as_deref()).await {
        Ok(room) => Ok(warp::reply::with_status(
            warp::reply::json(&room),
            StatusCode::OK,
        )),
        Err(ManagerError::RoomNotFound(_)) => {
            Ok(error_reply("Room not found", StatusCode::NOT_FOUND))
        }
        Err(e) => {
            tracing::error!("Failed to load room {}: {}", room_id, e);
            Ok(error_reply(
                "Internal server error",
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}
