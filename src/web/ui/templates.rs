use askama::Template;
use askama_web::WebTemplate;

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub default_lat: f64,
    pub default_lon: f64,
    pub default_date: String,
    pub default_days: u32,
    pub default_cloud: f64,
    pub chat_enabled: bool,
}
