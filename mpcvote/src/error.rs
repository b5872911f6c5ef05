use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("mpcvote: secret {0} is outside the field")]
    SecretOutOfRange(u64),

    #[error("mpcvote: invalid committee size {0}, need at least {1} authorities")]
    InvalidCommitteeSize(usize, usize),

    #[error("mpcvote: committee has {0} authority stores but is configured for {1}")]
    CommitteeSizeMismatch(usize, usize),

    #[error("mpcvote: configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("mpcvote: CBOR error: {0}")]
    CBOR(#[from] serde_cbor::Error),

    #[error("mpcvote: JSON error: {0}")]
    JSON(#[from] serde_json::Error),

    #[error("mpcvote: error deserializing bulletin board: unknown format")]
    DeserializationUnknownFormat,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not a valid number: {1}")]
    BadNumber(&'static str, String),

    #[error("{0} is not valid hex")]
    BadHex(&'static str),

    #[error("signing key is invalid: {0}")]
    BadSigningKey(#[from] ed25519_dalek::SignatureError),

    #[error("committee needs at least 2 authorities, got {0}")]
    CommitteeTooSmall(usize),

    #[error("token validity window must be positive")]
    ZeroValidity,

    #[error("admin secret must not be empty")]
    EmptyAdminSecret,
}

/// Public bulletin board audit failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuditError {
    #[error("mpcvote audit: entry {0}: token was never issued")]
    UnissuedToken(usize),

    #[error("mpcvote audit: entry {0}: token issued twice")]
    DuplicateToken(usize),

    #[error("mpcvote audit: entry {0}: token was issued to a different voter")]
    VoterMismatch(usize),

    #[error("mpcvote audit: entry {0}: token used more than once")]
    TokenReused(usize),

    #[error("mpcvote audit: entry {0}: timestamp goes backwards")]
    TimestampRegression(usize),

    #[error("mpcvote audit: entry {index}: published total {published} but local sums add up to {expected}")]
    TallyMismatch {
        index: usize,
        expected: u64,
        published: u64,
    },

    #[error("mpcvote audit: entry {0}: value outside the field")]
    OutOfField(usize),
}

/// Protocol rejections
///
/// Every variant is a per-request failure carrying a human-readable reason.
/// None of them are transient: retrying requires new input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("invalid token signature: {0}")]
    InvalidSignature(String),

    #[error("token unknown to the election authority: {0}")]
    UnknownToken(String),

    #[error("token already used: {0}")]
    TokenAlreadyUsed(String),

    #[error("token expired: {0}")]
    TokenExpired(String),

    #[error("token does not match voter id: {0}")]
    IdentityMismatch(String),

    #[error("malformed submission: {0}")]
    MalformedSubmission(String),

    #[error("invalid proof: {0}")]
    ProofMismatch(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl ProtocolError {
    /// Stable name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolError::InvalidSignature(_) => "InvalidSignature",
            ProtocolError::UnknownToken(_) => "UnknownToken",
            ProtocolError::TokenAlreadyUsed(_) => "TokenAlreadyUsed",
            ProtocolError::TokenExpired(_) => "TokenExpired",
            ProtocolError::IdentityMismatch(_) => "IdentityMismatch",
            ProtocolError::MalformedSubmission(_) => "MalformedSubmission",
            ProtocolError::ProofMismatch(_) => "ProofMismatch",
            ProtocolError::Unauthorized(_) => "Unauthorized",
        }
    }

    /// The human-readable reason, without the kind prefix
    pub fn reason(&self) -> &str {
        match self {
            ProtocolError::InvalidSignature(r)
            | ProtocolError::UnknownToken(r)
            | ProtocolError::TokenAlreadyUsed(r)
            | ProtocolError::TokenExpired(r)
            | ProtocolError::IdentityMismatch(r)
            | ProtocolError::MalformedSubmission(r)
            | ProtocolError::ProofMismatch(r)
            | ProtocolError::Unauthorized(r) => r,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_reason() {
        let err = ProtocolError::TokenAlreadyUsed("abc".to_owned());
        assert_eq!(err.kind(), "TokenAlreadyUsed");
        assert_eq!(err.reason(), "abc");
        assert_eq!(err.to_string(), "token already used: abc");
    }
}
