pub mod account;
pub mod chat;
pub mod glossary;
pub mod images;
pub mod process;
pub mod settings;

#[cfg(test)]
pub mod test_support;

use crate::state::AppState;
use axum::Router;

pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(glossary::routes(state.clone()))
        .merge(process::routes(state.clone()))
        .merge(settings::routes(state.clone()))
        .merge(account::routes(state.clone()))
        .merge(chat::routes(state.clone()))
        .merge(images::routes(state))
}
