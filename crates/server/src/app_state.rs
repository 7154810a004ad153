use crate::api::ApiContext;
use tera::Tera;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    pub(crate) templates: Tera,
}
