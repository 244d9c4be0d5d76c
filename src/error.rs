use http::StatusCode;
use thiserror::Error;

/// A poll tick that did not produce a JSON body.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid endpoint uri '{0}'")]
    InvalidUri(String),

    #[error("transport error: {0}")]
    Transport(#[from] hyper::Error),

    #[error("request timed out after {0} ms")]
    Timeout(u128),

    #[error("endpoint answered {0}")]
    Status(StatusCode),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("malformed json: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

/// The payload parsed as JSON but matches none of the accepted shapes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("unrecognized payload shape: {0}")]
    Unrecognized(String),

    #[error("invalid field '{field}' in {context}: {reason}")]
    InvalidField {
        field: &'static str,
        context: String,
        reason: String,
    },

    #[error("server at index {0} has neither 'id' nor 'name'")]
    MissingIdentity(usize),

    #[error("duplicate server identity '{0}'")]
    DuplicateServer(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("mixed angle presence: {with_angle} vnodes with an angle, {without_angle} without")]
    MixedAngles {
        with_angle: usize,
        without_angle: usize,
    },

    #[error("ring radius must be positive, got {0}")]
    InvalidRadius(f64),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid endpoint '{endpoint}': {reason}")]
    Endpoint { endpoint: String, reason: String },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}
