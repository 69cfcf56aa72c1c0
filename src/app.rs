use axum::{
    Extension, Form, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;

use crate::config::Config;
use crate::downloader;
use crate::error::{FleetError, Result};
use crate::graph::{self, GraphOptions};
use crate::grid;
use crate::loader;
use crate::login::{self, Authenticator, Session, SessionStore};
use crate::record::RecordSet;
use crate::store::{DEFAULT_COLUMNS, RecordStore, SqliteStore};
use crate::summary::summarize;
use crate::views::{Flash, OverviewPage, PREVIEW_ROWS, TableView, Views};

/// Shared state behind every request
///
/// The store sits behind a mutex so a whole-table replace never interleaves
/// with a read from another request.
pub struct AppState {
    pub store: Mutex<SqliteStore>,
    pub sessions: SessionStore,
    pub auth: Authenticator,
    pub views: Views,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        Ok(AppState {
            store: Mutex::new(SqliteStore::new(&config.db_path)),
            sessions: SessionStore::new(Duration::from_secs(config.session_ttl_secs)),
            auth: Authenticator::new(&config.accounts())?,
            views: Views::new()?,
            config,
        })
    }

    /// Run `f` with exclusive access to the record store
    pub fn with_store<T>(&self, f: impl FnOnce(&SqliteStore) -> Result<T>) -> Result<T> {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        f(&store)
    }

    pub fn fetch_records(&self) -> Result<RecordSet> {
        self.with_store(|store| store.fetch_all())
    }
}

impl IntoResponse for FleetError {
    fn into_response(self) -> Response {
        let status = match &self {
            FleetError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            FleetError::ImportParseFailure(_) | FleetError::InvalidGridEdit(_) => {
                StatusCode::BAD_REQUEST
            }
            FleetError::ColumnUnresolved(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FleetError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            FleetError::AccessDenied => StatusCode::FORBIDDEN,
            FleetError::RecordNotFound(_) => StatusCode::NOT_FOUND,
            FleetError::Export(_)
            | FleetError::Chart(_)
            | FleetError::Template(_)
            | FleetError::CredentialSetup(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Build the application router around `state`
pub fn router(state: Arc<AppState>) -> Router {
    let max_upload = state.config.max_upload_bytes;

    let protected = Router::new()
        .route("/", get(|| async { Redirect::to("/overview") }))
        .route("/logout", post(login::handle_logout))
        .route("/overview", get(overview))
        .route("/table", get(data_table))
        .route("/table/save", post(save_table))
        .route("/table/add", post(add_row))
        .route("/table/delete/:id", post(delete_row))
        .route("/table/export.csv", get(export_csv))
        .route("/settings", get(settings))
        .route("/settings/import", post(import_upload))
        .route("/settings/export.csv", get(settings_export_csv))
        .route("/settings/export.xlsx", get(settings_export_xlsx))
        .route("/settings/ensure-table", post(ensure_table))
        .route("/charts/status.png", get(status_chart))
        .route("/charts/priority.png", get(priority_chart))
        .route("/api/summary", get(api_summary))
        .route("/api/records", get(api_records))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login::require_auth,
        ));

    Router::new()
        .route(
            "/login",
            get(login::serve_login_page).post(login::handle_login),
        )
        .merge(protected)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(RequestBodyLimitLayer::new(max_upload))
        .with_state(state)
}

/// Start the dashboard server with `config`
pub async fn run(config: Config) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let bind = config.bind;
    log::info!("using record store at {}", config.db_path.display());
    let state = Arc::new(AppState::new(config)?);

    match state.fetch_records() {
        Ok(set) => log::info!("record store holds {} records", set.len()),
        Err(e) => log::warn!("record store not readable yet: {}", e),
    }

    let app = router(state);
    let listener = TcpListener::bind(bind).await?;
    log::info!("Listening on http://{}", bind);
    axum::serve(listener, app).await?;

    Ok(())
}

fn redirect(path: &str, flash: Flash) -> Response {
    Redirect::to(&flash.redirect_target(path)).into_response()
}

fn download(content_type: &'static str, filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

async fn overview(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(flash): Query<Flash>,
) -> Response {
    let page = match state.fetch_records() {
        Ok(set) => {
            let summary = summarize(&set);
            OverviewPage::from_records(&set, summary)
        }
        Err(e) => {
            log::warn!("overview read failed: {}", e);
            OverviewPage::unavailable(&e)
        }
    };
    state.views.overview(&session, &flash, &page)
}

async fn data_table(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(flash): Query<Flash>,
) -> Response {
    match state.fetch_records() {
        Ok(set) => state.views.table(&session, &flash, Some(&set), None),
        Err(e) => {
            log::warn!("table read failed: {}", e);
            state.views.table(&session, &flash, None, Some(&e))
        }
    }
}

async fn save_table(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let result = grid::records_from_form(&fields)
        .and_then(|set| state.with_store(|store| store.replace_all(&set)).map(|_| set.len()));
    match result {
        Ok(count) => {
            log::info!("{} saved {} rows from the grid", session.username, count);
            redirect("/table", Flash::notice("Saved to DB."))
        }
        Err(e) => {
            log::warn!("grid save failed: {}", e);
            redirect("/table", Flash::error(format!("Save error: {}", e)))
        }
    }
}

async fn add_row(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Response {
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    let result = state.with_store(|store| {
        let mut set = store.fetch_all()?;
        if set.columns.is_empty() {
            set.columns = DEFAULT_COLUMNS.iter().map(|(c, _)| c.to_string()).collect();
        }
        let id = grid::append_blank_row(&mut set, &today);
        store.replace_all(&set)?;
        Ok(id)
    });
    match result {
        Ok(id) => {
            log::info!("{} added row {}", session.username, id);
            redirect("/table", Flash::notice(format!("Added row {}.", id)))
        }
        Err(e) => redirect("/table", Flash::error(format!("Add error: {}", e))),
    }
}

async fn delete_row(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> Response {
    match state.with_store(|store| store.delete_one(id)) {
        Ok(()) => {
            log::info!("{} deleted row {}", session.username, id);
            redirect("/table", Flash::notice(format!("Deleted row {}.", id)))
        }
        Err(e) => redirect("/table", Flash::error(format!("Delete error: {}", e))),
    }
}

async fn export_csv(State(state): State<Arc<AppState>>) -> Response {
    match state.fetch_records().and_then(|set| downloader::to_csv(&set)) {
        Ok(body) => download("text/csv", downloader::CSV_FILENAME, body),
        Err(e) => e.into_response(),
    }
}

async fn settings(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(flash): Query<Flash>,
) -> Response {
    if session.require_admin().is_err() {
        return state.views.denied(&session);
    }
    state.views.settings(&session, &flash, None)
}

/// Read the uploaded file and the requested action from the settings form
async fn read_upload(mut multipart: Multipart) -> Result<(String, String, Vec<u8>)> {
    let mut action = String::from("import");
    let mut filename = String::new();
    let mut data = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| FleetError::ImportParseFailure(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "action" => {
                action = field
                    .text()
                    .await
                    .map_err(|e| FleetError::ImportParseFailure(e.to_string()))?;
            }
            "file" => {
                filename = field.file_name().unwrap_or_default().to_string();
                data = field
                    .bytes()
                    .await
                    .map_err(|e| FleetError::ImportParseFailure(e.to_string()))?
                    .to_vec();
            }
            _ => {}
        }
    }

    if data.is_empty() {
        return Err(FleetError::ImportParseFailure(
            "no file data received".to_string(),
        ));
    }
    Ok((action, filename, data))
}

async fn import_upload(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    multipart: Multipart,
) -> Response {
    if session.require_admin().is_err() {
        return state.views.denied(&session);
    }

    let (action, filename, data) = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(e) => return redirect("/settings", Flash::error(e.to_string())),
    };

    let set = match loader::load_upload(&filename, &data) {
        Ok(set) => set,
        Err(e) => {
            log::warn!("import of {} rejected: {}", filename, e);
            return redirect("/settings", Flash::error(e.to_string()));
        }
    };

    if action == "preview" {
        let preview = TableView::from_records(&set, &set.columns, PREVIEW_ROWS);
        let flash = Flash::notice(format!("{} rows parsed from {}.", set.len(), filename));
        return state.views.settings(&session, &flash, Some(&preview));
    }

    match state.with_store(|store| store.replace_all(&set)) {
        Ok(()) => {
            log::info!("{} imported {} rows from {}", session.username, set.len(), filename);
            redirect(
                "/settings",
                Flash::notice(format!("Imported {} rows to DB successfully.", set.len())),
            )
        }
        Err(e) => redirect("/settings", Flash::error(e.to_string())),
    }
}

async fn settings_export_csv(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Response {
    if let Err(e) = session.require_admin() {
        return e.into_response();
    }
    export_csv(State(state)).await
}

async fn settings_export_xlsx(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Response {
    if let Err(e) = session.require_admin() {
        return e.into_response();
    }
    match state.fetch_records().and_then(|set| downloader::to_xlsx(&set)) {
        Ok(body) => download(downloader::XLSX_MIME, downloader::XLSX_FILENAME, body),
        Err(e) => {
            log::error!("xlsx export failed: {}", e);
            e.into_response()
        }
    }
}

async fn ensure_table(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Response {
    if session.require_admin().is_err() {
        return state.views.denied(&session);
    }
    match state.with_store(|store| store.ensure_schema()) {
        Ok(()) => redirect("/settings", Flash::notice("Table ensured.")),
        Err(e) => redirect("/settings", Flash::error(e.to_string())),
    }
}

fn png(result: Result<Vec<u8>>) -> Response {
    match result {
        Ok(body) => ([(header::CONTENT_TYPE, "image/png")], body).into_response(),
        Err(e) => {
            log::error!("{}", e);
            e.into_response()
        }
    }
}

async fn status_chart(State(state): State<Arc<AppState>>) -> Response {
    png(state.fetch_records().and_then(|set| {
        graph::create_status_pie(&summarize(&set).slices, &GraphOptions::default())
    }))
}

async fn priority_chart(State(state): State<Arc<AppState>>) -> Response {
    png(state.fetch_records().and_then(|set| {
        graph::create_priority_bars(&summarize(&set).priority, &GraphOptions::default())
    }))
}

async fn api_summary(State(state): State<Arc<AppState>>) -> Response {
    match state.fetch_records() {
        Ok(set) => Json(summarize(&set)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn api_records(State(state): State<Arc<AppState>>) -> Response {
    match state.fetch_records() {
        Ok(set) => Json(set).into_response(),
        Err(e) => e.into_response(),
    }
}
