/*!
# Fleet Dashboard

A browser-based dashboard for tracking a fleet of assets and their repair status,
built in Rust.

## Overview

Users sign in under one of two fixed roles. Admins import and export spreadsheet
data into a single SQLite table; any signed-in user can view the aggregate
overview or edit rows in a spreadsheet-like grid.

## Architecture

### Aggregation Engine
- **columns**: alias table and resolver deciding which header means "repair status"
  and which means "priority"
- **summary**: status normalization, status counts, the five overview tiles and
  the priority buckets, recomputed from raw rows on every render

### Data Layer
- **record**: cells, rows and the ordered record set
- **store**: the `RecordStore` trait and its SQLite implementation (whole-table
  replace, single-row delete, schema utility)
- **loader**: CSV and workbook import
- **downloader**: CSV and XLSX export
- **grid**: turning a submitted grid form back into records

### Web Layer (`web` feature)
- **app**: routing, shared state and handlers
- **login**: credentials, sessions and the authentication middleware
- **views**: Handlebars pages
- **graph**: status and priority charts
- **config**: command line / environment configuration

## Routes

- `/login`, `/logout` - session lifecycle
- `/overview` - status tiles, distribution chart, priority buckets, quick view
- `/table` - editable grid (`/table/save`, `/table/add`, `/table/delete/{id}`)
- `/settings` - admin only: import, export, create table
- `/api/summary`, `/api/records` - JSON views of the same data
*/

pub mod columns;
pub mod downloader;
pub mod error;
pub mod grid;
pub mod loader;
pub mod record;
pub mod store;
pub mod summary;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod config;
#[cfg(feature = "web")]
pub mod graph;
#[cfg(feature = "web")]
pub mod login;
#[cfg(feature = "web")]
pub mod views;

pub use error::{FleetError, Result};
pub use record::{CellValue, FleetRecord, RecordSet};
pub use store::{RecordStore, SqliteStore};
