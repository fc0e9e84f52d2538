mod dto;
mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::main_lib::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/holdings/changes", get(handlers::get_holding_changes))
}
