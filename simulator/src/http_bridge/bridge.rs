use crate::http_bridge::model::BridgeModel;
use crate::workflow::runner::Runner;
use serde_json::json;
use smrcore::{CalibrationRequest, InvocationSummary};
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, Filter};

pub fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

type SharedModel = Arc<RwLock<BridgeModel>>;

/// HTTP endpoint through which an orchestrator submits calibration requests.
///
/// * `POST /calibrate` takes a JSON [`CalibrationRequest`] and answers with
///   the invocation summary.
/// * `GET /spectra` lists the stored calibrated spectra.
/// * `GET /status` reports the last summary.
pub struct CalibrationBridge {
    state: SharedModel,
}

impl CalibrationBridge {
    pub fn new(runner: Arc<Runner>, addr: SocketAddr) -> Self {
        let state: SharedModel = Arc::new(RwLock::new(BridgeModel::default()));
        let state_for_filter = state.clone();
        let state_filter = warp::any().map(move || state_for_filter.clone());
        let runner_filter = warp::any().map(move || runner.clone());

        let calibrate_route = warp::path("calibrate")
            .and(warp::post())
            .and(warp::body::json())
            .and(state_filter.clone())
            .and(runner_filter.clone())
            .and_then(
                |request: CalibrationRequest, state: SharedModel, runner: Arc<Runner>| async move {
                    let file_id = request.file_id.clone();
                    let result =
                        tokio::task::spawn_blocking(move || runner.execute(&request)).await;
                    let reply = match result {
                        Ok(Ok(summary)) => {
                            let body = warp::reply::json(&summary);
                            if let Ok(mut guard) = state.write() {
                                guard.record(summary);
                            }
                            warp::reply::with_status(body, StatusCode::OK)
                        }
                        Ok(Err(err)) => {
                            log::error!("calibration of {} failed: {:#}", file_id, err);
                            error_reply(format!("{:#}", err))
                        }
                        Err(err) => {
                            log::error!("calibration task for {} aborted: {}", file_id, err);
                            error_reply(err.to_string())
                        }
                    };
                    Ok::<_, warp::Rejection>(reply)
                },
            );

        let spectra_route = warp::path("spectra")
            .and(warp::get())
            .and(runner_filter)
            .map(|runner: Arc<Runner>| match runner.stored_spectra() {
                Ok(spectra) => warp::reply::with_status(warp::reply::json(&spectra), StatusCode::OK),
                Err(err) => {
                    log::error!("reading stored spectra failed: {:#}", err);
                    error_reply(format!("{:#}", err))
                }
            });

        let status_route = warp::path("status")
            .and(warp::get())
            .and(state_filter)
            .map(|state: SharedModel| match state.read() {
                Ok(guard) => warp::reply::with_status(warp::reply::json(&*guard), StatusCode::OK),
                Err(_) => error_reply("bridge state poisoned".into()),
            });

        thread::spawn(move || {
            let routes = calibrate_route.or(spectra_route).or(status_route);
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    log::error!("failed to build bridge runtime: {}", err);
                    return;
                }
            };
            log::info!("calibration bridge listening on {}", addr);
            runtime.block_on(async move {
                warp::serve(routes).run(addr).await;
            });
        });

        Self { state }
    }

    pub fn publish(&self, summary: &InvocationSummary) {
        if let Ok(mut guard) = self.state.write() {
            guard.record(summary.clone());
            log::info!("[bridge] {}", guard.status);
        }
    }

    pub fn publish_status(&self, message: &str) {
        if let Ok(mut guard) = self.state.write() {
            guard.status = message.to_string();
        }
        log::info!("[bridge] {}", message);
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> BridgeModel {
        self.state
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

fn error_reply(message: String) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&json!({ "status": "error", "message": message })),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
}
