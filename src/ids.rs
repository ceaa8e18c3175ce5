//! Identifier allocation. Tokens are short random alphanumerics, so they are
//! unique with high probability only; allocation probes the target key and
//! retries on a detected collision instead of trusting the generator.

use nanoid::nanoid;
use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::warn;

use crate::error::{Error, Result};

pub const TOKEN_LEN: usize = 5;

const MAX_ATTEMPTS: usize = 8;

const ALPHABET: [char; 62] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B',
    'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V', 'W', 'X', 'Y', 'Z',
];

pub fn token() -> String {
    nanoid!(TOKEN_LEN, &ALPHABET)
}

/// Allocate a token whose owning key does not exist yet. `key_for` maps a
/// candidate token to the key it would occupy.
pub async fn allocate<F>(conn: &ConnectionManager, key_for: F) -> Result<String>
where
    F: Fn(&str) -> String,
{
    let mut conn = conn.clone();

    for _ in 0..MAX_ATTEMPTS {
        let id = token();
        let taken: bool = conn.exists(key_for(&id)).await?;

        if !taken {
            return Ok(id);
        }

        warn!("id collision on {id}, retrying");
    }

    Err(Error::Consistency(format!(
        "no free id after {MAX_ATTEMPTS} attempts"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let id = token();
        assert_eq!(id.len(), TOKEN_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_tokens_differ() {
        assert_ne!(token(), token());
    }
}
