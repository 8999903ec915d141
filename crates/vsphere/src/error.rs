use thiserror::Error;

/// Why a vCenter session could not be established. The three kinds only
/// differ in how they are reported; any of them aborts the run.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The server answered with a vim fault (bad credentials, no permission, ...)
    #[error("Failed to connect to VMware vCenter: {0}")]
    Fault(String),

    /// Connection, TLS or certificate failure
    #[error("SSL error encountered: {0}")]
    Transport(String),

    #[error("An unexpected error occurred: {0}")]
    Unknown(String),
}

#[derive(Debug, Error)]
pub enum VsphereError {
    #[error("request `{method}` failed: {source}")]
    Request {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("`{method}` raised {fault}: {message}")]
    Fault {
        method: String,
        fault: String,
        message: String,
    },

    #[error("`{method}` returned HTTP {status}: {body}")]
    Http {
        method: String,
        status: u16,
        body: String,
    },

    #[error("decoding `{method}` response: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("`{method}` returned no result")]
    EmptyResponse { method: String },

    #[error("login response carried no session id")]
    MissingSessionId,

    #[error("service content has no `{0}`")]
    MissingManager(&'static str),

    #[error("invalid endpoint `{0}`")]
    InvalidUrl(String),
}

impl From<VsphereError> for ConnectError {
    fn from(err: VsphereError) -> Self {
        match err {
            VsphereError::Fault { .. } => ConnectError::Fault(err.to_string()),
            VsphereError::Request { ref source, .. }
                if source.is_connect() || source.is_timeout() =>
            {
                ConnectError::Transport(err.to_string())
            }
            other => ConnectError::Unknown(other.to_string()),
        }
    }
}

/// A VM property bag that does not match the expected schema.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("`{object}` is missing property `{path}`")]
    MissingProperty { object: String, path: String },

    #[error("`{object}` has an invalid `{path}`: {source}")]
    InvalidProperty {
        object: String,
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
