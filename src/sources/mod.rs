pub mod http;
pub mod source;

pub use self::http::HttpStateSource;
pub use source::StateSource;
