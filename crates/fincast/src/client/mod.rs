//! Access to the remote modeling service.
//!
//! The session talks to the service only through the [`ModelService`] trait,
//! so tests and alternative transports can stand in for HTTP. The production
//! implementation is [`HttpModelService`], which speaks the JSON contract:
//!
//! - `POST /predict` with a [`PredictionRequest`](crate::types::PredictionRequest),
//! - `POST /upload` (legacy server-side CSV parsing),
//! - `GET /` as a health probe.

mod http;
mod service;

pub use http::HttpModelService;
pub use service::ModelService;
