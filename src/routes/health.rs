use super::AppState;
use crate::provider::resolve_provider;
use axum::{extract::State, Json};
use serde_json::{json, Value};

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let provider = match resolve_provider(state.config.fax_provider.as_deref()) {
        Ok(p) => json!(p.name()),
        Err(e) => json!({ "error": e.to_string() }),
    };
    Json(json!({ "ok": true, "provider": provider }))
}
