mod decoder;
mod error;
mod table;
mod term;
pub mod vocab;

pub use decoder::*;
pub use error::*;
pub use table::*;
pub use term::*;
