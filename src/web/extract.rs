//! Request extractors whose rejections surface as [`Error::InvalidInput`] with the usual
//! JSON error body instead of axum's plain-text responses.

use axum::extract::{FromRequest, FromRequestParts};

use crate::Error;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct JsonBody<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct PathParam<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct QueryParams<T>(pub T);
