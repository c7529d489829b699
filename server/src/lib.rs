pub mod config;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;

pub use config::Config;
pub use routes::create_routes;
pub use state::AppState;
