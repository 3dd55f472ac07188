//! Generation requests and their cache keys
//!
//! A [`GenerationRequest`] is an owned value: builders consume and return it,
//! so a request can never alias a caller's message list. [`CacheKey`] is the
//! single place where a request is normalized before fingerprinting.

pub mod cache_key;
pub mod request;

pub use cache_key::{CacheKey, NormalizedRequest};
pub use request::{GenerationRequest, SamplingParams};
