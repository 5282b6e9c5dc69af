pub mod completion;
pub mod http;
pub mod mock;
pub mod ocr;
pub mod search;

pub use completion::HttpCompletionClient;
pub use http::ServiceClient;
pub use mock::{MockCompletion, MockOcr, MockResponse, MockSearch};
pub use ocr::HttpOcrClient;
pub use search::HttpSourceSearch;
