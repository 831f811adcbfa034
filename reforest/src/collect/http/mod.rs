pub mod http_collect;

pub use http_collect::HttpBackend;
