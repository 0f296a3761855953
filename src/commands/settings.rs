use super::SharedState;
use crate::config::mask_secret;
use axum::extract::State;
use axum::response::Json;
use std::collections::BTreeMap;

pub async fn get_settings(State(state): State<SharedState>) -> Json<BTreeMap<String, String>> {
    let config = &state.config;
    let mut map = BTreeMap::new();
    // Never echo the key back in full
    map.insert("gemini_api_key".to_string(), mask_secret(&config.gemini.api_key));
    map.insert("gemini_base_url".to_string(), config.gemini.base_url.clone());
    map.insert("gemini_model".to_string(), config.gemini.model.clone());
    map.insert(
        "response_mime_type".to_string(),
        config.gemini.response_mime_type.clone(),
    );
    map.insert(
        "timeout_secs".to_string(),
        config.gemini.timeout_secs.to_string(),
    );
    map.insert("bind".to_string(), config.server.bind.clone());
    map.insert(
        "max_upload_bytes".to_string(),
        config.server.max_upload_bytes.to_string(),
    );
    Json(map)
}
