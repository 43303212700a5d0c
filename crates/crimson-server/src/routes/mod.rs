//! HTTP routes.

pub mod health;
pub mod session;

pub use health::health_routes;
pub use session::{
    CountResponse, SessionOverview, ValueResponse, count_handler, delete_value_handler,
    get_value_handler, logout_handler, overview_handler, put_value_handler, session_routes,
};
