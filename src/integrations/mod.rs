//! 外部接入：HTTP 服务（需 web feature）

#[cfg(feature = "web")]
pub mod http;
