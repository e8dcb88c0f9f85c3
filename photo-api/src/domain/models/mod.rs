mod asset;
mod change_set;
mod ids;
mod photo;

pub use asset::*;
pub use change_set::*;
pub use ids::*;
pub use photo::*;
