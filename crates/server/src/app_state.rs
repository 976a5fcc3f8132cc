use std::time::Duration;

use server_api::ApiContext;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    pub(crate) render_timeout: Duration,
    pub(crate) login_path: String,
}
