mod config;
mod dashboard;
mod derived;
mod entities;
mod error;
mod feed;
mod selection;
mod transit;

#[cfg(test)]
mod test_utils;

use std::env;
use std::sync::Arc;

use actix_web::{get, middleware::Logger, post, put, web, App, HttpResponse, HttpServer, Responder};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use config::{Config, TokenSource};
use dashboard::Dashboard;
use entities::RouteId;
use error::{DashError, DashResult};
use transit::auth::{login, LoginOutcome};
use transit::client::{Session, TransitClient};
use transit::error::AuthError;

#[derive(Clone)]
pub struct ContextData {
    dashboard: Arc<Dashboard<TransitClient>>,
}

#[derive(Deserialize)]
struct SelectionBody {
    route_id: RouteId,
}

#[derive(Deserialize)]
struct MappingBody {
    origin: String,
    destination: String,
}

#[get("/ok")]
async fn ok() -> DashResult<impl Responder> {
    Ok(HttpResponse::Ok().finish())
}

#[get("/routes")]
async fn get_routes(ctx: web::Data<ContextData>) -> DashResult<impl Responder> {
    let (routes, selected) = ctx.dashboard.routes();
    let response = web::Json(json!({
        "routes": routes,
        "selected": selected,
    }));
    Ok(response)
}

#[post("/routes/reload")]
async fn reload_routes(ctx: web::Data<ContextData>) -> DashResult<impl Responder> {
    let commit = ctx.dashboard.load_routes().await?;
    let response = web::Json(json!({
        "commit": commit,
        "view": ctx.dashboard.view(Utc::now()),
    }));
    Ok(response)
}

#[put("/selection")]
async fn select_route(
    body: web::Json<SelectionBody>,
    ctx: web::Data<ContextData>,
) -> DashResult<impl Responder> {
    let SelectionBody { route_id } = body.into_inner();

    let commit = ctx.dashboard.select_route(route_id).await?;
    let response = web::Json(json!({
        "committed": commit == dashboard::Commit::Applied,
        "view": ctx.dashboard.view(Utc::now()),
    }));
    Ok(response)
}

#[get("/dashboard")]
async fn get_dashboard(ctx: web::Data<ContextData>) -> DashResult<impl Responder> {
    Ok(web::Json(ctx.dashboard.view(Utc::now())))
}

#[post("/mapping")]
async fn update_mapping(
    body: web::Json<MappingBody>,
    ctx: web::Data<ContextData>,
) -> DashResult<impl Responder> {
    ctx.dashboard
        .update_mapping(&body.origin, &body.destination)
        .await?;
    Ok(web::Json(ctx.dashboard.view(Utc::now())))
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(ok)
        .service(get_routes)
        .service(reload_routes)
        .service(select_route)
        .service(get_dashboard)
        .service(update_mapping);
}

/// Resolves the bearer token, logging in if none was configured
async fn open_session(config: &Config) -> DashResult<Session> {
    let token = match &config.token_source {
        TokenSource::Token(token) => token.clone(),
        TokenSource::Login(credentials) => match login(&config.api_base, credentials).await? {
            LoginOutcome::Tokens { access, refresh } => {
                log::info!("Logged in as {}", credentials.email);
                log::debug!("Refresh token issued: {}", refresh.is_some());
                access
            }
            LoginOutcome::MfaRequired => {
                return Err(DashError::Auth(AuthError::Rejected(
                    "MFA required, set TRANSIT_TOTP_CODE".to_string(),
                )))
            }
        },
    };

    Ok(Session::new(config.api_base.clone(), token))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::try_init().ok();

    log::debug!("Debug logging enabled");

    dotenvy::from_filename(".env").ok();

    let config = Config::from_env().map_err(DashError::from)?;
    let session = open_session(&config).await?;
    let client = TransitClient::new(session).map_err(DashError::from)?;

    let dashboard = Arc::new(Dashboard::new(client, config.display_tz));

    // The dashboard still serves an empty view if the first load fails
    if let Err(e) = dashboard.load_routes().await {
        log::error!("Error loading routes: {}", e);
    }

    let ctx = ContextData { dashboard };
    let allow_origin = config.allow_origin.clone();

    log::info!("Starting server at {}", config.listen_address);

    HttpServer::new(move || {
        let logger = Logger::default();

        let mut cors = actix_cors::Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT"])
            .allowed_headers(vec!["accept", "content-type"]);

        if let Some(allowed_origin) = &allow_origin {
            if allowed_origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(allowed_origin);
            }
        }

        App::new()
            .wrap(logger)
            .wrap(cors)
            .app_data(web::Data::new(ctx.clone()))
            .configure(routes)
    })
    .bind(&config.listen_address)?
    .run()
    .await
}
