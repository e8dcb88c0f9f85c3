pub mod cloudinary;
pub mod memory;
pub mod postgres;
