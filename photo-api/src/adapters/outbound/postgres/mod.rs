mod photos;

pub use photos::PostgresPhotoRepository;
