//! HTML pages, rendered with Handlebars from the templates in `src/templates`.
//!
//! Every page render takes the caller's [`Session`] explicitly; there is no
//! ambient "current user".

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::columns::{Role, resolve};
use crate::error::{FleetError, Result};
use crate::graph::PRIORITY_COLORS;
use crate::grid::cell_field;
use crate::login::Session;
use crate::record::RecordSet;
use crate::summary::{OverviewSummary, PRIORITY_LEVELS, priority_level};

/// Rows shown in the overview quick view
pub const QUICK_VIEW_ROWS: usize = 20;

/// Rows shown when previewing an upload
pub const PREVIEW_ROWS: usize = 10;

/// Columns listed in the overview quick view, when present
const QUICK_VIEW_COLUMNS: [&str; 3] = ["Parent fleet", "Fleet number", "Comments"];

/// One-shot message carried in the query string after a redirect
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Flash {
    pub notice: Option<String>,
    pub error: Option<String>,
}

impl Flash {
    pub fn notice(message: impl Into<String>) -> Self {
        Flash {
            notice: Some(message.into()),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Flash {
            notice: None,
            error: Some(message.into()),
        }
    }

    /// Append the message to `path` as a query string
    pub fn redirect_target(&self, path: &str) -> String {
        match (&self.notice, &self.error) {
            (_, Some(error)) => format!("{}?error={}", path, urlencoding::encode(error)),
            (Some(notice), None) => format!("{}?notice={}", path, urlencoding::encode(notice)),
            (None, None) => path.to_string(),
        }
    }
}

/// Plain table used for the quick view and the upload preview
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    /// The first `limit` rows of `set`, restricted to `columns`
    pub fn from_records(set: &RecordSet, columns: &[String], limit: usize) -> Self {
        let rows = set
            .records
            .iter()
            .take(limit)
            .map(|r| columns.iter().map(|c| r.get(c).to_string()).collect())
            .collect();
        TableView {
            columns: columns.to_vec(),
            rows,
        }
    }
}

#[derive(Debug, Serialize)]
struct Nav<'a> {
    username: &'a str,
    role: &'static str,
    is_admin: bool,
    active: &'static str,
}

impl<'a> Nav<'a> {
    fn new(session: &'a Session, active: &'static str) -> Self {
        Nav {
            username: &session.username,
            role: session.role.as_str(),
            is_admin: session.is_admin(),
            active,
        }
    }
}

#[derive(Debug, Serialize)]
struct PriorityTile {
    level: i64,
    count: usize,
    color: &'static str,
}

/// Everything the overview page needs beyond the session
#[derive(Debug, Clone, Default, Serialize)]
pub struct OverviewPage {
    pub summary: Option<OverviewSummary>,
    pub quick_view: TableView,
    pub store_error: Option<String>,
}

impl OverviewPage {
    pub fn from_records(set: &RecordSet, summary: OverviewSummary) -> Self {
        let mut columns: Vec<String> = QUICK_VIEW_COLUMNS[..2]
            .iter()
            .filter(|c| set.has_column(c))
            .map(|c| c.to_string())
            .collect();
        columns.extend(summary.status_column.map(String::from));
        if set.has_column(QUICK_VIEW_COLUMNS[2]) {
            columns.push(QUICK_VIEW_COLUMNS[2].to_string());
        }
        columns.extend(summary.priority_column.map(String::from));

        OverviewPage {
            quick_view: TableView::from_records(set, &columns, QUICK_VIEW_ROWS),
            summary: Some(summary),
            store_error: None,
        }
    }

    pub fn unavailable(error: &FleetError) -> Self {
        OverviewPage {
            store_error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct GridCell {
    name: String,
    value: String,
    kind: &'static str,
    options: Vec<GridOption>,
    class: String,
}

#[derive(Debug, Serialize)]
struct GridOption {
    value: String,
    selected: bool,
}

#[derive(Debug, Serialize)]
struct GridRow {
    id: i64,
    cells: Vec<GridCell>,
}

fn select_options(choices: &[String], current: &str) -> Vec<GridOption> {
    let mut options: Vec<GridOption> = choices
        .iter()
        .map(|c| GridOption {
            value: c.clone(),
            selected: c == current,
        })
        .collect();
    if !current.is_empty() && !choices.iter().any(|c| c == current) {
        options.insert(
            0,
            GridOption {
                value: current.to_string(),
                selected: true,
            },
        );
    }
    options
}

fn grid_rows(set: &RecordSet) -> Vec<GridRow> {
    let status_column = resolve(&set.columns, Role::Status);
    let priority_column = resolve(&set.columns, Role::Priority);
    let status_choices = status_column
        .map(|c| set.distinct_values(c))
        .unwrap_or_default();
    let priority_choices: Vec<String> = PRIORITY_LEVELS.iter().map(|l| l.to_string()).collect();

    set.rows()
        .map(|(id, cells)| {
            let cells = cells
                .into_iter()
                .enumerate()
                .map(|(index, value)| {
                    let column = set.columns[index].as_str();
                    let text = value.to_string();
                    let name = cell_field(id, index);
                    if Some(column) == status_column {
                        GridCell {
                            name,
                            options: select_options(&status_choices, &text),
                            value: text,
                            kind: "select",
                            class: String::new(),
                        }
                    } else if Some(column) == priority_column {
                        let level = priority_level(value);
                        let class = if PRIORITY_LEVELS.contains(&level) {
                            format!("priority-{}", level)
                        } else {
                            String::new()
                        };
                        let current = if value.is_null() { String::new() } else { level.to_string() };
                        GridCell {
                            name,
                            options: select_options(&priority_choices, &current),
                            value: current,
                            kind: "select",
                            class,
                        }
                    } else {
                        GridCell {
                            name,
                            value: text,
                            kind: "text",
                            options: Vec::new(),
                            class: String::new(),
                        }
                    }
                })
                .collect();
            GridRow { id, cells }
        })
        .collect()
}

/// Template registry for all pages
pub struct Views {
    registry: Handlebars<'static>,
}

impl Views {
    /// Register every template; fails if any of them does not parse
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        let template_error = |e: handlebars::TemplateError| FleetError::Template(e.to_string());

        registry
            .register_partial("header", include_str!("./templates/header.hbs"))
            .map_err(template_error)?;
        registry
            .register_partial("footer", include_str!("./templates/footer.hbs"))
            .map_err(template_error)?;
        for (name, source) in [
            ("login", include_str!("./templates/login.hbs")),
            ("overview", include_str!("./templates/overview.hbs")),
            ("table", include_str!("./templates/table.hbs")),
            ("settings", include_str!("./templates/settings.hbs")),
            ("denied", include_str!("./templates/denied.hbs")),
        ] {
            registry
                .register_template_string(name, source)
                .map_err(template_error)?;
        }

        Ok(Views { registry })
    }

    fn render(&self, name: &str, context: &serde_json::Value) -> Response {
        match self.registry.render(name, context) {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                log::error!("failed to render {}: {}", name, e);
                FleetError::Template(e.to_string()).into_response()
            }
        }
    }

    pub fn login(&self, flash: &Flash, username: &str) -> Response {
        self.render(
            "login",
            &json!({ "title": "Login", "flash": flash, "username": username }),
        )
    }

    pub fn overview(&self, session: &Session, flash: &Flash, page: &OverviewPage) -> Response {
        let missing: Vec<String> = page
            .summary
            .as_ref()
            .map(|s| {
                s.missing_roles()
                    .into_iter()
                    .map(|role| FleetError::ColumnUnresolved(role).to_string())
                    .collect()
            })
            .unwrap_or_default();
        let priority: Vec<PriorityTile> = page
            .summary
            .as_ref()
            .filter(|s| s.priority_column.is_some())
            .map(|s| {
                s.priority
                    .iter()
                    .zip(PRIORITY_COLORS)
                    .map(|(bucket, color)| PriorityTile {
                        level: bucket.level,
                        count: bucket.count,
                        color,
                    })
                    .collect()
            })
            .unwrap_or_default();
        let empty = page.summary.as_ref().is_some_and(|s| s.total_records == 0);

        self.render(
            "overview",
            &json!({
                "title": "Fleet Health - Overview",
                "nav": Nav::new(session, "overview"),
                "flash": flash,
                "page": page,
                "empty": empty,
                "missing": missing,
                "priority": priority,
            }),
        )
    }

    pub fn table(
        &self,
        session: &Session,
        flash: &Flash,
        set: Option<&RecordSet>,
        store_error: Option<&FleetError>,
    ) -> Response {
        let (columns, rows) = set
            .map(|s| (s.columns.clone(), grid_rows(s)))
            .unwrap_or_default();
        let empty = set.is_some_and(|s| s.is_empty());

        self.render(
            "table",
            &json!({
                "title": "Data Table",
                "nav": Nav::new(session, "table"),
                "flash": flash,
                "store_error": store_error.map(|e| e.to_string()),
                "columns": columns,
                "rows": rows,
                "empty": empty,
            }),
        )
    }

    pub fn settings(&self, session: &Session, flash: &Flash, preview: Option<&TableView>) -> Response {
        self.render(
            "settings",
            &json!({
                "title": "Settings - Admin",
                "nav": Nav::new(session, "settings"),
                "flash": flash,
                "preview": preview,
            }),
        )
    }

    pub fn denied(&self, session: &Session) -> Response {
        let page = self.render(
            "denied",
            &json!({
                "title": "Access denied",
                "nav": Nav::new(session, "settings"),
                "message": "Access denied. Admin only for Settings.",
            }),
        );
        (StatusCode::FORBIDDEN, page).into_response()
    }
}
