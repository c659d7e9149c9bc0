pub mod handlers;
pub mod middleware;
pub mod requests;
pub mod routes;

pub use routes::create_router;
