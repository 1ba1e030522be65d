pub use models::*;
pub use provider::*;

mod models;
mod provider;
