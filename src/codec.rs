//! Restorable session tokens.
//!
//! A token is `{state, history}` serialized as JSON, zlib-compressed, and
//! encoded with the URL-safe base64 alphabet without padding, so it can be
//! used directly as an address fragment. There is no version field: any
//! token that fails a stage is reported as corrupt.
//!
//! ```rust
//! use story_stream::codec::{decode_session, encode_session};
//! use story_stream::SessionSnapshot;
//!
//! # fn example() -> Result<(), story_stream::TokenError> {
//! let snapshot = SessionSnapshot {
//!     history: vec![1, 2, 3],
//!     ..SessionSnapshot::default()
//! };
//! let token = encode_session(&snapshot)?;
//! assert_eq!(decode_session(&token)?, snapshot);
//! # Ok(())
//! # }
//! ```

extern crate alloc;

use alloc::string::{String, ToString};

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::TokenError;
use crate::history::SessionSnapshot;

/// zlib level used for tokens; favors size over speed since tokens are tiny.
const COMPRESSION_LEVEL: u8 = 9;

/// URL-safe alphabet; padding is never written but tolerated on input.
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Bounds applied when decoding untrusted tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenLimits {
    /// Maximum token length in bytes (after stripping a leading `#`).
    pub max_token_bytes: usize,
    /// Maximum inflated JSON payload size.
    pub max_decoded_bytes: usize,
    /// Maximum number of history entries accepted.
    pub max_history_len: usize,
}

impl Default for TokenLimits {
    fn default() -> Self {
        Self {
            max_token_bytes: 256 * 1024,
            max_decoded_bytes: 4 * 1024 * 1024,
            max_history_len: 100_000,
        }
    }
}

impl TokenLimits {
    /// Tighter preset for constrained hosts.
    pub fn embedded() -> Self {
        Self {
            max_token_bytes: 16 * 1024,
            max_decoded_bytes: 256 * 1024,
            max_history_len: 8192,
        }
    }
}

/// Encode a session snapshot into a restorable token.
pub fn encode_session(snapshot: &SessionSnapshot) -> Result<String, TokenError> {
    let json =
        serde_json::to_vec(snapshot).map_err(|err| TokenError::Payload(err.to_string()))?;
    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&json, COMPRESSION_LEVEL);
    Ok(TOKEN_ENGINE.encode(compressed))
}

/// Decode a restorable token with default limits.
pub fn decode_session(token: &str) -> Result<SessionSnapshot, TokenError> {
    decode_session_with_limits(token, TokenLimits::default())
}

/// Decode a restorable token with explicit limits.
///
/// A single leading `#` is ignored so raw address fragments can be passed
/// straight through.
pub fn decode_session_with_limits(
    token: &str,
    limits: TokenLimits,
) -> Result<SessionSnapshot, TokenError> {
    let token = token.strip_prefix('#').unwrap_or(token).trim();
    if token.is_empty() {
        return Err(TokenError::Empty);
    }
    if token.len() > limits.max_token_bytes {
        return Err(TokenError::TooLarge {
            actual: token.len(),
            limit: limits.max_token_bytes,
        });
    }

    let compressed = TOKEN_ENGINE
        .decode(token)
        .map_err(|err| TokenError::Encoding(err.to_string()))?;
    let json =
        miniz_oxide::inflate::decompress_to_vec_zlib_with_limit(&compressed, limits.max_decoded_bytes)
            .map_err(|err| match err.status {
                miniz_oxide::inflate::TINFLStatus::HasMoreOutput => TokenError::Compression(
                    alloc::format!("inflated payload exceeds {} bytes", limits.max_decoded_bytes),
                ),
                status => TokenError::Compression(alloc::format!("{:?}", status)),
            })?;

    let snapshot: SessionSnapshot =
        serde_json::from_slice(&json).map_err(|err| TokenError::Payload(err.to_string()))?;
    if snapshot.history.len() > limits.max_history_len {
        return Err(TokenError::HistoryTooLong {
            actual: snapshot.history.len(),
            limit: limits.max_history_len,
        });
    }
    Ok(snapshot)
}
