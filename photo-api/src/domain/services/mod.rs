mod photos;

pub use photos::{PhotoPolicy, PhotoServiceImpl};
