pub mod http;

pub use http::{FetchErrorKind, HttpFetchWork};
