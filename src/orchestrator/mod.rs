//! Result aggregation: sequential pagination, URL normalisation, dedup.
//!
//! This module pages through every configured provider one request at a
//! time, normalises each discovered URL, and keeps the first occurrence of
//! each until the result cap is reached.

pub mod aggregate;
pub mod dedup;
pub mod url_normalize;
