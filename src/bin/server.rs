use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use strip_planner::types::{KindPlan, Order, PlanResponse};
use strip_planner::{CutOptions, calculate_cuts, calculate_grouped};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct CalculateRequest {
    orders: Vec<Order>,
    #[serde(default)]
    options: CutOptions,
}

fn validate(req: &CalculateRequest) -> Result<(), (StatusCode, String)> {
    if req.options.sheet_width == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "sheetWidth must be non-zero".to_string(),
        ));
    }
    Ok(())
}

async fn calculate(
    Json(req): Json<CalculateRequest>,
) -> Result<Json<PlanResponse>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /calculate"
    );
    validate(&req)?;

    let result = calculate_cuts(&req.orders, &req.options);
    if let Err(e) = &result {
        tracing::warn!(error = %e, "calculation aborted");
    }
    Ok(Json(PlanResponse::from_result(
        result,
        req.options.tail_wanted_b,
    )))
}

async fn calculate_by_kind(
    Json(req): Json<CalculateRequest>,
) -> Result<Json<Vec<KindPlan>>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /calculate/grouped"
    );
    validate(&req)?;

    Ok(Json(calculate_grouped(&req.orders, &req.options)))
}

fn app() -> Router {
    Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/calculate", post(calculate))
        .route("/calculate/grouped", post(calculate_by_kind))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

fn main() {
    let _sentry = sentry::init((
        std::env::var("SENTRY_DSN").ok(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    ));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(async {
            let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
            eprintln!("Listening on {addr}");
            axum::serve(listener, app()).await.unwrap();
        });
}
