//! API Routes
//!
//! Read-only views over the latest sync snapshot:
//! - `GET /status` - synchronization detail
//! - `GET /postfix` - applied access-file policy plus live Postfix agent checks

mod postfix;
mod status;


use axum::{routing::get, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status::get_status))
        .route("/postfix", get(postfix::get_postfix))
}
