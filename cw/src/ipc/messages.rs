//! Wire format for path notifications
//!
//! One connection carries one message: the raw bytes of a directory path,
//! optionally followed by whitespace. There is no length prefix and no reply.

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// Maximum message size, longer messages are truncated
pub const MAX_MESSAGE_SIZE: usize = 1024;

/// Turn raw message bytes into a path notification
///
/// Trims the message and collapses newlines and runs of whitespace to single
/// spaces. Returns `None` when nothing is left.
pub fn normalize_message(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let path = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if path.is_empty() { None } else { Some(path) }
}

/// Read a single message from a connection
///
/// Performs exactly one read of at most [`MAX_MESSAGE_SIZE`] bytes.
pub async fn read_message<R>(reader: &mut R) -> std::io::Result<Option<String>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = [0u8; MAX_MESSAGE_SIZE];
    let n = reader.read(&mut buf).await?;
    debug!(bytes = n, "read_message: read complete");
    Ok(normalize_message(&buf[..n]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_trims_trailing_newline() {
        assert_eq!(normalize_message(b"/home/me/repo\n"), Some("/home/me/repo".to_string()));
    }

    #[test]
    fn test_normalize_collapses_internal_whitespace() {
        assert_eq!(
            normalize_message(b"  /home/me/my\n  repo \r\n"),
            Some("/home/me/my repo".to_string())
        );
    }

    #[test]
    fn test_normalize_empty_message() {
        assert_eq!(normalize_message(b""), None);
        assert_eq!(normalize_message(b" \n\t "), None);
    }

    #[test]
    fn test_normalize_invalid_utf8_is_lossy() {
        let msg = normalize_message(b"/tmp/\xffrepo").unwrap();
        assert!(msg.starts_with("/tmp/"));
        assert!(msg.ends_with("repo"));
    }

    #[tokio::test]
    async fn test_read_message_truncates_at_limit() {
        let long = vec![b'a'; MAX_MESSAGE_SIZE + 100];
        let mut reader: &[u8] = &long;
        let msg = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(msg.len(), MAX_MESSAGE_SIZE);
    }

    #[tokio::test]
    async fn test_read_message_empty_stream() {
        let mut reader: &[u8] = b"";
        assert_eq!(read_message(&mut reader).await.unwrap(), None);
    }

    proptest! {
        #[test]
        fn prop_normalized_has_no_surrounding_or_repeated_whitespace(input in "[ a-z/\\n\\t]{0,64}") {
            if let Some(path) = normalize_message(input.as_bytes()) {
                prop_assert!(!path.starts_with(' '));
                prop_assert!(!path.ends_with(' '));
                prop_assert!(!path.contains("  "));
                prop_assert!(!path.contains('\n'));
                prop_assert!(!path.contains('\t'));
            }
        }
    }
}
