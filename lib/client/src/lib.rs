mod admin;
mod api;
mod media_types;
mod session;
mod tracker;

pub use admin::*;
pub use api::*;
pub use media_types::*;
pub use session::*;
pub use tracker::*;
