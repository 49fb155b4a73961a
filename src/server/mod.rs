pub mod flash;
pub mod guards;
pub mod pages;
pub mod router;
pub mod routes;

pub use router::{AppState, satchel_router};
