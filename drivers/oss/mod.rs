//! Aliyun OSS 驱动
//!
//! 通过 [`OssClient`] 访问对象存储，对外实现 [`crate::storage::FilesystemAdapter`]。

pub mod adapter;
pub mod client;
pub mod config;
pub mod factory;
pub mod http;
pub mod memory;

pub use adapter::OssAdapter;
pub use client::{OssClient, OssError, OssResult};
pub use config::OssConfig;
pub use factory::{MemoryOssDriverFactory, OssDriverFactory};
pub use http::OssHttpClient;
pub use memory::MemoryOssClient;
