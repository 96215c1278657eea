//! Errors surfaced by chain data providers.

use alloy_json_rpc::ErrorPayload;
use alloy_transport::{RpcError, TransportErrorKind};
use quarry_types::BlockRange;

/// JSON-RPC error code used by most node implementations when a request
/// would return more data than they are willing to serve.
pub const LIMIT_EXCEEDED_CODE: i64 = -32005;

/// Message fragments that nodes use to reject oversized `eth_getLogs` or
/// batch requests with a generic error code.
const LIMIT_MESSAGES: &[&str] = &[
    "limit exceeded",
    "query returned more than",
    "response size exceeded",
    "block range is too large",
    "block range too large",
    "too many results",
    "exceed maximum block range",
];

/// An error returned by a [`crate::ChainDataProvider`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The endpoint could not be reached or the transport failed.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
    /// The node refused the request because the response would be too large.
    #[error("Range {range} is too large for the provider")]
    RangeTooLarge {
        /// The rejected range.
        range: BlockRange,
    },
    /// The node returned nothing for a block that should exist.
    #[error("Block {0} is missing")]
    MissingBlock(u64),
    /// The node answered with an error.
    #[error("RPC error: {0}")]
    Rpc(String),
}

impl ProviderError {
    /// Classifies an alloy RPC error raised while fetching `range`.
    pub fn from_rpc(err: RpcError<TransportErrorKind>, range: BlockRange) -> Self {
        match err {
            RpcError::ErrorResp(payload) if is_limit_error(&payload) => {
                Self::RangeTooLarge { range }
            }
            RpcError::ErrorResp(payload) => Self::Rpc(payload.to_string()),
            RpcError::Transport(TransportErrorKind::HttpError(http)) if http.status == 413 => {
                Self::RangeTooLarge { range }
            }
            RpcError::Transport(kind) => Self::Unavailable(kind.to_string()),
            RpcError::NullResp => Self::MissingBlock(range.start),
            other => Self::Rpc(other.to_string()),
        }
    }
}

fn is_limit_error(payload: &ErrorPayload) -> bool {
    if payload.code == LIMIT_EXCEEDED_CODE {
        return true;
    }
    let message = payload.message.to_lowercase();
    LIMIT_MESSAGES.iter().any(|fragment| message.contains(fragment))
}

/// Result type of provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn payload(code: i64, message: &'static str) -> ErrorPayload {
        ErrorPayload { code, message: message.into(), data: None }
    }

    #[rstest]
    #[case(payload(-32005, "query timeout exceeded"))]
    #[case(payload(
        -32000,
        "Log response size exceeded. You can make eth_getLogs requests with up to a 2K block range"
    ))]
    #[case(payload(-32602, "query returned more than 10000 results"))]
    fn test_limit_errors_are_range_too_large(#[case] payload: ErrorPayload) {
        let range = BlockRange::new(0, 1000);
        assert_eq!(
            ProviderError::from_rpc(RpcError::ErrorResp(payload), range),
            ProviderError::RangeTooLarge { range }
        );
    }

    #[test]
    fn test_other_error_response_is_rpc() {
        let err = ProviderError::from_rpc(
            RpcError::ErrorResp(payload(-32601, "method not found")),
            BlockRange::new(0, 1),
        );
        assert!(matches!(err, ProviderError::Rpc(msg) if msg.contains("method not found")));
    }

    #[test]
    fn test_transport_error_is_unavailable() {
        let err = ProviderError::from_rpc(
            TransportErrorKind::custom_str("connection refused"),
            BlockRange::new(0, 1),
        );
        assert!(matches!(
            err,
            ProviderError::Unavailable(msg) if msg.contains("connection refused")
        ));
    }

    #[test]
    fn test_null_response_is_missing_block() {
        assert_eq!(
            ProviderError::from_rpc(RpcError::NullResp, BlockRange::new(7, 8)),
            ProviderError::MissingBlock(7)
        );
    }
}
