use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use shared::{
    domain::{PerfumeForm, PerfumeId, PerfumeSummary},
    error::{ApiError, ErrorCode},
};
use storage::Storage;
use tower_cookies::{CookieManagerLayer, Cookies};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;
mod flash;
mod templates;

use api::ApiContext;
use app_state::AppState;
use config::{load_settings, normalize_database_url};
use flash::{redirect_with_flash, take_flash, Flash, RedirectResponse};
use templates::load_templates;

const MAX_FORM_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = load_settings()?;
    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            error = %format!("{error:#}"),
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let state = AppState {
        api: ApiContext { storage },
        templates: load_templates()?,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.bind_addr))?;
    info!(%addr, "perfume catalog listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/perfumes/new", get(new_perfume_page).post(create_perfume))
        .route(
            "/perfumes/update/:perfume_id",
            get(edit_perfume_page).post(update_perfume),
        )
        .route(
            "/perfumes/delete/:perfume_id",
            get(delete_perfume).post(delete_perfume),
        )
        .route("/api/perfumes", get(http_list_perfumes))
        .route("/api/perfumes/:perfume_id", get(http_get_perfume))
        .route("/healthz", get(healthz))
        .layer(CookieManagerLayer::new())
        .layer(RequestBodyLimitLayer::new(MAX_FORM_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, StatusCode> {
    state.api.storage.health_check().await.map_err(|error| {
        error!(error = %format!("{error:#}"), "health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok("ok")
}

async fn index(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Result<Html<String>, Response> {
    let perfumes = api::list_perfumes(&state.api)
        .await
        .map_err(|e| error_page(&state, e))?;

    let mut ctx = tera::Context::new();
    ctx.insert("perfumes", &perfumes);
    if let Some(flash) = take_flash(&cookies) {
        ctx.insert("flash", &flash);
    }
    render(&state, "index.html", &ctx)
}

async fn new_perfume_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, Response> {
    let ctx = form_context(FormPage::Create, &PerfumeForm::default(), None);
    render(&state, "form.html", &ctx)
}

async fn create_perfume(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Form(form): Form<PerfumeForm>,
) -> Result<RedirectResponse, Response> {
    match api::create_perfume(&state.api, form.clone()).await {
        Ok(_) => Ok(redirect_with_flash(&cookies, Flash::success("Perfume added"))),
        Err(e) => Err(rejected_form(&state, FormPage::Create, &form, e)),
    }
}

async fn edit_perfume_page(
    State(state): State<Arc<AppState>>,
    perfume_id: Result<Path<i64>, PathRejection>,
) -> Result<Html<String>, Response> {
    let perfume_id = perfume_id_from(perfume_id).map_err(|e| error_page(&state, e))?;
    let perfume = api::get_perfume(&state.api, perfume_id)
        .await
        .map_err(|e| error_page(&state, e))?;
    render(
        &state,
        "form.html",
        &form_context(FormPage::Update(perfume.id), &perfume.to_form(), None),
    )
}

async fn update_perfume(
    State(state): State<Arc<AppState>>,
    perfume_id: Result<Path<i64>, PathRejection>,
    cookies: Cookies,
    Form(form): Form<PerfumeForm>,
) -> Result<RedirectResponse, Response> {
    let perfume_id = perfume_id_from(perfume_id).map_err(|e| error_page(&state, e))?;
    match api::update_perfume(&state.api, perfume_id, form.clone()).await {
        Ok(()) => Ok(redirect_with_flash(&cookies, Flash::success("Perfume updated"))),
        Err(e) => Err(rejected_form(&state, FormPage::Update(perfume_id), &form, e)),
    }
}

async fn delete_perfume(
    State(state): State<Arc<AppState>>,
    perfume_id: Result<Path<i64>, PathRejection>,
    cookies: Cookies,
) -> Result<RedirectResponse, Response> {
    let perfume_id = perfume_id_from(perfume_id).map_err(|e| error_page(&state, e))?;
    let deleted = api::delete_perfume(&state.api, perfume_id)
        .await
        .map_err(|e| error_page(&state, e))?;
    let flash = if deleted {
        Flash::success("Perfume deleted")
    } else {
        Flash::error("Perfume not found")
    };
    Ok(redirect_with_flash(&cookies, flash))
}

async fn http_list_perfumes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PerfumeSummary>>, (StatusCode, Json<ApiError>)> {
    let perfumes = api::list_perfumes(&state.api)
        .await
        .map_err(|e| (status_for(e.code), Json(e)))?;
    Ok(Json(perfumes.iter().map(|p| p.summary()).collect()))
}

async fn http_get_perfume(
    State(state): State<Arc<AppState>>,
    perfume_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<PerfumeSummary>, (StatusCode, Json<ApiError>)> {
    let perfume_id = perfume_id_from(perfume_id).map_err(|e| (status_for(e.code), Json(e)))?;
    let perfume = api::get_perfume(&state.api, perfume_id)
        .await
        .map_err(|e| (status_for(e.code), Json(e)))?;
    Ok(Json(perfume.summary()))
}

/// Ids that are not integers name no perfume, so they are a 404 rather than
/// a bad request.
fn perfume_id_from(path: Result<Path<i64>, PathRejection>) -> Result<PerfumeId, ApiError> {
    path.map(|Path(id)| PerfumeId(id))
        .map_err(|_| ApiError::not_found("perfume not found"))
}

#[derive(Debug, Clone, Copy)]
enum FormPage {
    Create,
    Update(PerfumeId),
}

fn form_context(page: FormPage, form: &PerfumeForm, error: Option<&str>) -> tera::Context {
    let (heading, action) = match page {
        FormPage::Create => ("New perfume".to_string(), "/perfumes/new".to_string()),
        FormPage::Update(id) => (
            "Edit perfume".to_string(),
            format!("/perfumes/update/{}", id.0),
        ),
    };
    let mut ctx = tera::Context::new();
    ctx.insert("heading", &heading);
    ctx.insert("action", &action);
    ctx.insert("form", form);
    if let Some(error) = error {
        ctx.insert("error", error);
    }
    ctx
}

/// Validation failures re-render the submitted form; anything else gets the
/// error page.
fn rejected_form(
    state: &AppState,
    page: FormPage,
    form: &PerfumeForm,
    err: ApiError,
) -> Response {
    if err.code != ErrorCode::Validation {
        return error_page(state, err);
    }
    let ctx = form_context(page, form, Some(&err.message));
    match render(state, "form.html", &ctx) {
        Ok(html) => (StatusCode::UNPROCESSABLE_ENTITY, html).into_response(),
        Err(response) => response,
    }
}

fn error_page(state: &AppState, err: ApiError) -> Response {
    let status = status_for(err.code);
    let mut ctx = tera::Context::new();
    ctx.insert("status", &status.to_string());
    ctx.insert("message", &err.message);
    match render(state, "error.html", &ctx) {
        Ok(html) => (status, html).into_response(),
        Err(response) => response,
    }
}

fn render(
    state: &AppState,
    template: &str,
    ctx: &tera::Context,
) -> Result<Html<String>, Response> {
    state.templates.render(template, ctx).map(Html).map_err(|error| {
        error!(template, %error, "template rendering failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
    })
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
