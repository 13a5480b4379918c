mod load;
mod model;
mod types;
mod validate;

pub use load::*;
pub use model::*;
pub use types::*;
pub use validate::*;
