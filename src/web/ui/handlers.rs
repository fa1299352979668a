use axum::{extract::State, response::IntoResponse};

use crate::web::state::AppState;

use super::templates::DashboardTemplate;

// Busan
const DEFAULT_LAT: f64 = 35.1796;
const DEFAULT_LON: f64 = 129.0750;
const DEFAULT_DATE: &str = "2023-06-02";

pub async fn dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let search = &state.config.search;
    DashboardTemplate {
        default_lat: DEFAULT_LAT,
        default_lon: DEFAULT_LON,
        default_date: DEFAULT_DATE.to_string(),
        default_days: search.day_window,
        default_cloud: search.cloud_ceiling,
        chat_enabled: state.agent.is_some(),
    }
}
