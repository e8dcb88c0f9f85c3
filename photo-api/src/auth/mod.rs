mod extractor;

pub use extractor::CallerIdentity;
