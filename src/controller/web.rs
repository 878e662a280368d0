// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{error::Error, io, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{error, info, span, Level};

use crate::{
    clips::{Clip, ClipId},
    config,
    scheduler::{Rescan, ScheduleError, Scheduler},
};

/// A controller that serves the HTTP control surface.
pub struct Driver {
    scheduler: Arc<Scheduler>,
    /// The socket address to serve on.
    addr: SocketAddr,
}

impl Driver {
    pub fn new(
        config: &config::WebController,
        scheduler: Arc<Scheduler>,
    ) -> Result<Arc<Self>, Box<dyn Error>> {
        let addr: SocketAddr = format!("0.0.0.0:{}", config.port()).parse()?;

        Ok(Arc::new(Driver { scheduler, addr }))
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self) -> JoinHandle<Result<(), io::Error>> {
        let addr = self.addr;
        let app = router(self.scheduler.clone());

        tokio::spawn(async move {
            let listener = TcpListener::bind(addr).await?;
            {
                let _enter = span!(Level::INFO, "web driver").entered();
                info!(addr = %addr, "Starting HTTP server");
            }
            axum::serve(listener, app).await
        })
    }
}

/// Builds the HTTP routes.
pub fn router(scheduler: Arc<Scheduler>) -> Router {
    Router::new()
        .route("/sounds", get(list_sounds))
        .route("/toggle_state/:id", post(toggle_state))
        .route("/play_on_device/:id", post(play_on_device))
        .route("/play", get(play_random))
        .route("/stop", post(stop))
        .route("/is_playing", get(is_playing))
        .route("/volume", get(get_volume).post(set_volume))
        .route("/rescan", post(rescan))
        .with_state(scheduler)
}

/// An error reported to an HTTP client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: String) -> ApiError {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        let status = match err {
            ScheduleError::NotFound(_) | ScheduleError::NoClips => StatusCode::NOT_FOUND,
            ScheduleError::InvalidVolume(_) => StatusCode::BAD_REQUEST,
            ScheduleError::MissingFile(_) => StatusCode::GONE,
            ScheduleError::Sink(_) | ScheduleError::Io(_) => {
                error!(err = %err, "Error handling request.");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Runs a scheduler call off the async workers. Sink commands can block on device I/O.
async fn blocking<T, F>(scheduler: Arc<Scheduler>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Scheduler) -> Result<T, ScheduleError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || f(&scheduler)).await {
        Ok(result) => Ok(result?),
        Err(e) => Err(ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    #[serde(default)]
    pub on_open: Option<bool>,
    #[serde(default)]
    pub on_close: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayResponse {
    pub id: ClipId,
    pub name: String,
    pub length_ms: u64,
}

impl PlayResponse {
    fn new(clip: Clip, length: Duration) -> PlayResponse {
        PlayResponse {
            id: clip.id,
            name: clip.name,
            length_ms: u64::try_from(length.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayingResponse {
    pub is_playing: bool,
}

/// Volume as sent by clients. Wider than the accepted range so bad values get a 400.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Volume {
    pub volume: i64,
}

async fn list_sounds(State(scheduler): State<Arc<Scheduler>>) -> Json<Vec<Clip>> {
    Json(scheduler.list_clips())
}

async fn toggle_state(
    State(scheduler): State<Arc<Scheduler>>,
    Path(id): Path<u64>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<Clip>, ApiError> {
    let clip = blocking(scheduler, move |scheduler| {
        scheduler.toggle_flags(ClipId(id), request.on_open, request.on_close)
    })
    .await?;
    Ok(Json(clip))
}

async fn play_on_device(
    State(scheduler): State<Arc<Scheduler>>,
    Path(id): Path<u64>,
) -> Result<Json<PlayResponse>, ApiError> {
    let (clip, length) =
        blocking(scheduler, move |scheduler| scheduler.trigger_preview(ClipId(id))).await?;
    Ok(Json(PlayResponse::new(clip, length)))
}

async fn play_random(
    State(scheduler): State<Arc<Scheduler>>,
) -> Result<Json<PlayResponse>, ApiError> {
    let (clip, length) =
        blocking(scheduler, |scheduler| scheduler.trigger_random_preview()).await?;
    Ok(Json(PlayResponse::new(clip, length)))
}

async fn stop(State(scheduler): State<Arc<Scheduler>>) -> Result<StatusCode, ApiError> {
    blocking(scheduler, |scheduler| scheduler.stop()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn is_playing(
    State(scheduler): State<Arc<Scheduler>>,
) -> Result<Json<PlayingResponse>, ApiError> {
    let is_playing = blocking(scheduler, |scheduler| Ok(scheduler.is_playing())).await?;
    Ok(Json(PlayingResponse { is_playing }))
}

async fn get_volume(State(scheduler): State<Arc<Scheduler>>) -> Result<Json<Volume>, ApiError> {
    let volume = blocking(scheduler, |scheduler| Ok(scheduler.volume())).await?;
    Ok(Json(Volume {
        volume: i64::from(volume),
    }))
}

async fn set_volume(
    State(scheduler): State<Arc<Scheduler>>,
    Json(request): Json<Volume>,
) -> Result<Json<Volume>, ApiError> {
    let volume = u8::try_from(request.volume)
        .ok()
        .filter(|volume| *volume <= 100)
        .ok_or_else(|| {
            ApiError::bad_request(format!("volume {} is out of range (0-100)", request.volume))
        })?;

    blocking(scheduler, move |scheduler| scheduler.set_volume(volume)).await?;
    Ok(Json(Volume {
        volume: i64::from(volume),
    }))
}

async fn rescan(State(scheduler): State<Arc<Scheduler>>) -> Result<Json<Rescan>, ApiError> {
    let rescan = blocking(scheduler, |scheduler| scheduler.rescan()).await?;
    Ok(Json(rescan))
}
