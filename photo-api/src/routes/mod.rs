pub(crate) mod error;
pub(crate) mod photos;

pub(crate) use error::ApiError;
