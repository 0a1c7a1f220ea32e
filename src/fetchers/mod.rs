mod request;

pub use request::{PageResponse, RequestFetcher};
