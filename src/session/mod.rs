pub mod auth;
pub mod credentials;
pub mod refresh;
pub mod storage;
pub mod store;
