//! Extractors whose rejections use the JSON error body

use axum::extract::{FromRequest, FromRequestParts, Path, Query};
use axum::Json;

use crate::error::Error;

/// `Json` body; malformed or incomplete bodies become validation errors
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// `Query` string parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);

/// `Path` parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(Error))]
pub struct ApiPath<T>(pub T);
