use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SnowflakeGrantError {
    #[error("We were expecting a JSON result, but got Arrow")]
    UnexpectedArrowResult,

    #[error("database_name must be set.")]
    MissingDatabaseName,
    #[error("schema_name must be set unless on_future is true.")]
    MissingSchemaName,
    #[error("{field} must be set unless on_future is true.")]
    MissingObjectName { field: &'static str },
    #[error("{field} must be empty if on_future is true.")]
    ObjectNameWithFuture { field: &'static str },
    #[error("shares cannot be used with on_future")]
    FutureGrantToShare,
    #[error("at least one role or share must be granted the privilege")]
    NoGrantees,
    #[error("invalid privilege {privilege} for {object_type}, expected one of: {valid}")]
    InvalidPrivilege {
        privilege: String,
        object_type: &'static str,
        valid: String,
    },
    #[error("{field} may not contain '/': {value}")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("1 line per grant")]
    GrantIdLineCount,
    #[error("4 or 5 fields allowed")]
    GrantIdFieldCount,
    #[error("malformed grant id {id}: {reason}")]
    MalformedGrantId { id: String, reason: String },
    #[error("grant definition resolves to id `{definition}`, but its address is `{address}`")]
    AddressMismatch { definition: String, address: String },
}
