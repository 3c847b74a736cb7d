mod app;
mod storage;

pub use app::{resolve_path, tokenize_path, PathToken, TestApp, TestRequest, TestResponse};
pub use storage::{row, MockStorage};
