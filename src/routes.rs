use log::error;
use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, guard, http::Method, web};

use crate::api::{
    HealthResponse, MessageResponse, RelayResponse, STATUS_HEALTHY, STATUS_SUCCESS,
    StatusResponse, VersionResponse,
};
use crate::config::AppConfig;
use crate::error::{AppError, CommandError};
use crate::relay::RelayController;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<RelayController>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(controller: Arc<RelayController>, config: Arc<AppConfig>) -> Self {
        Self { controller, config }
    }
}

pub fn api_scope() -> actix_web::Scope {
    // fixed paths first so `all` is never taken for a relay id
    web::scope("")
        .service(
            web::resource("/relay/all/on")
                .route(web::post().to(all_on))
                .route(
                    web::route()
                        .guard(guard_not_methods(&[Method::POST]))
                        .to(method_not_allowed),
                ),
        )
        .service(
            web::resource("/relay/all/off")
                .route(web::post().to(all_off))
                .route(
                    web::route()
                        .guard(guard_not_methods(&[Method::POST]))
                        .to(method_not_allowed),
                ),
        )
        .service(
            web::resource("/relay/status")
                .route(web::get().to(relay_status))
                .route(
                    web::route()
                        .guard(guard_not_methods(&[Method::GET]))
                        .to(method_not_allowed),
                ),
        )
        .service(
            web::resource("/relay/{relay_id}/on")
                .route(web::post().to(relay_on))
                .route(
                    web::route()
                        .guard(guard_not_methods(&[Method::POST]))
                        .to(method_not_allowed),
                ),
        )
        .service(
            web::resource("/relay/{relay_id}/off")
                .route(web::post().to(relay_off))
                .route(
                    web::route()
                        .guard(guard_not_methods(&[Method::POST]))
                        .to(method_not_allowed),
                ),
        )
        .service(
            web::resource("/system/version")
                .route(web::get().to(system_version))
                .route(
                    web::route()
                        .guard(guard_not_methods(&[Method::GET]))
                        .to(method_not_allowed),
                ),
        )
        .service(
            web::resource("/system/health")
                .route(web::get().to(system_health))
                .route(
                    web::route()
                        .guard(guard_not_methods(&[Method::GET]))
                        .to(method_not_allowed),
                ),
        )
}

async fn all_on(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    state.controller.turn_all_on().inspect_err(log_error)?;

    Ok(web::Json(success_message("All relays turned ON")))
}

async fn all_off(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    state.controller.turn_all_off().inspect_err(log_error)?;

    Ok(web::Json(success_message("All relays turned OFF")))
}

async fn relay_on(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<impl Responder, CommandError> {
    switch_relay(&req, &state, true)
}

async fn relay_off(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<impl Responder, CommandError> {
    switch_relay(&req, &state, false)
}

async fn relay_status(state: web::Data<AppState>) -> impl Responder {
    web::Json(StatusResponse {
        relays: state.controller.status(),
    })
}

async fn system_version(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    let system = &state.config.system;
    let build_date = system.build_date().inspect_err(log_error)?;

    Ok(web::Json(VersionResponse {
        version: system.version.clone(),
        build_date,
    }))
}

async fn system_health() -> impl Responder {
    web::Json(HealthResponse {
        status: STATUS_HEALTHY.to_string(),
    })
}

fn switch_relay(
    req: &HttpRequest,
    state: &AppState,
    on: bool,
) -> Result<web::Json<RelayResponse>, CommandError> {
    let relay_id = parse_relay_id(req).inspect_err(log_error)?;
    let result = if on {
        state.controller.turn_on(relay_id)
    } else {
        state.controller.turn_off(relay_id)
    };
    result.inspect_err(log_error)?;

    Ok(web::Json(RelayResponse {
        status: STATUS_SUCCESS.to_string(),
        relay: relay_id,
        state: on.into(),
    }))
}

fn success_message(message: &str) -> MessageResponse {
    MessageResponse {
        status: STATUS_SUCCESS.to_string(),
        message: message.to_string(),
    }
}

fn log_error(e: &AppError) {
    error!("{e}");
}

fn parse_relay_id(req: &HttpRequest) -> Result<u32, AppError> {
    let relay_id = req
        .match_info()
        .get("relay_id")
        .ok_or_else(|| AppError::InvalidValue("Missing relay id".into()))?;
    let relay_id = relay_id
        .parse::<u32>()
        .map_err(|_| AppError::InvalidValue(format!("Invalid relay id '{relay_id}'")))?;

    Ok(relay_id)
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().finish()
}

fn guard_not_methods(methods: &[Method]) -> impl guard::Guard {
    let allowed: Vec<Method> = methods.to_vec();
    guard::fn_guard(move |ctx| !allowed.iter().any(|m| m == ctx.head().method))
}
