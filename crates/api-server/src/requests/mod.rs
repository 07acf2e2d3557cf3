mod articles;

pub use articles::{PageParams, ReadStateRequest};
