use thiserror::Error;

/// Failures talking to the backing store. Clonable so a single failed batch
/// flush can settle every pending lookup in its window with the same error.
///
/// A missing record is not an error anywhere in this taxonomy; absent values
/// travel as `Option::None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("backing store unreachable: {0}")]
    Unreachable(String),

    #[error("backing store returned status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("malformed backing store payload: {0}")]
    MalformedPayload(String),

    /// A pending batched lookup was abandoned before its flush completed,
    /// typically because the request that opened the window was dropped.
    #[error("batched lookup dropped before completion")]
    BatchDropped,
}

/// Request-level failures: anything that prevents a query document from
/// executing at all. Field-local store failures are not represented here;
/// the executor attaches those to the field's result path instead.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to parse query: {0}")]
    QueryParse(String),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("{0} operations are not supported")]
    UnsupportedOperation(&'static str),

    #[error("cannot query field \"{field}\" on type \"{type_name}\"")]
    UnknownField { type_name: String, field: String },

    #[error("field \"{field}\" of type \"{type_name}\" requires a selection set")]
    MissingSelection { type_name: String, field: String },

    #[error("variable ${0} is not defined")]
    UndefinedVariable(String),

    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error("invalid schema: {0}")]
    Schema(String),

    #[error("failed to load config file {path}: {reason}")]
    Config { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}
