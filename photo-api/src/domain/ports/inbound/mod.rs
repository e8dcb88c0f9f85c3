mod photos;

pub use photos::*;
