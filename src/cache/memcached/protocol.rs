//! memcached ASCII protocol: the `get`, `set` and `delete` exchanges.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::cache::keys::MAX_KEY_LEN;
use crate::cache::store::CacheStoreError;

/// memcached reads larger expiry values as absolute Unix timestamps.
pub(crate) const MAX_RELATIVE_EXPIRY_SECS: u64 = 60 * 60 * 24 * 30;

const MAX_LINE_LEN: u64 = 2048;
const MAX_VALUE_LEN: usize = 64 * 1024 * 1024;

pub(crate) fn validate_key(key: &str) -> Result<(), CacheStoreError> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.len() > MAX_KEY_LEN {
        "key is longer than 250 bytes"
    } else if key.bytes().any(|b| b <= b' ' || b == 0x7f) {
        "key contains whitespace or control characters"
    } else {
        return Ok(());
    };
    Err(CacheStoreError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}

/// The `exptime` field for `ttl`, evaluated at `now`.
///
/// Zero would mean "never expires", so sub-second TTLs round up to one second.
pub(crate) fn expiry_field(ttl: Duration, now: SystemTime) -> u64 {
    let mut secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 || secs == 0 {
        secs += 1;
    }
    if secs <= MAX_RELATIVE_EXPIRY_SECS {
        return secs;
    }
    let unix_now = now
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    unix_now.saturating_add(secs)
}

pub(crate) async fn get<S>(conn: &mut S, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    conn.write_all(format!("get {key}\r\n").as_bytes()).await?;
    conn.flush().await?;

    let line = read_line(conn).await?;
    if line == "END" {
        return Ok(None);
    }
    let Some(header) = line.strip_prefix("VALUE ") else {
        return Err(error_reply("get", &line));
    };

    let len = parse_value_header(header, key)?;
    let mut data = vec![0u8; len + 2];
    conn.read_exact(&mut data).await?;
    if !data.ends_with(b"\r\n") {
        return Err(CacheStoreError::protocol("value block not terminated by CRLF"));
    }
    data.truncate(len);

    let trailer = read_line(conn).await?;
    if trailer != "END" {
        return Err(CacheStoreError::protocol(format!(
            "expected END after value, got `{trailer}`"
        )));
    }
    Ok(Some(data))
}

pub(crate) async fn set<S>(
    conn: &mut S,
    key: &str,
    value: &[u8],
    exptime: u64,
) -> Result<(), CacheStoreError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    let mut request = format!("set {key} 0 {exptime} {}\r\n", value.len()).into_bytes();
    request.extend_from_slice(value);
    request.extend_from_slice(b"\r\n");
    conn.write_all(&request).await?;
    conn.flush().await?;

    let line = read_line(conn).await?;
    match line.as_str() {
        "STORED" => Ok(()),
        "NOT_STORED" => Err(CacheStoreError::Server {
            op: "set",
            message: "item not stored".to_string(),
        }),
        _ => Err(error_reply("set", &line)),
    }
}

pub(crate) async fn delete<S>(conn: &mut S, key: &str) -> Result<(), CacheStoreError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    conn.write_all(format!("delete {key}\r\n").as_bytes()).await?;
    conn.flush().await?;

    let line = read_line(conn).await?;
    match line.as_str() {
        "DELETED" | "NOT_FOUND" => Ok(()),
        _ => Err(error_reply("delete", &line)),
    }
}

// VALUE <key> <flags> <bytes> [<cas unique>]
fn parse_value_header(header: &str, expected_key: &str) -> Result<usize, CacheStoreError> {
    let mut fields = header.split(' ');
    let key = fields.next().unwrap_or_default();
    if key != expected_key {
        return Err(CacheStoreError::protocol(format!(
            "reply for `{key}` while waiting for `{expected_key}`"
        )));
    }
    let _flags = fields.next();
    let len = fields
        .next()
        .and_then(|raw| raw.parse::<usize>().ok())
        .ok_or_else(|| CacheStoreError::protocol(format!("malformed VALUE line `{header}`")))?;
    if len > MAX_VALUE_LEN {
        return Err(CacheStoreError::protocol(format!(
            "value of {len} bytes exceeds limit"
        )));
    }
    Ok(len)
}

async fn read_line<R>(reader: &mut R) -> Result<String, CacheStoreError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let read = (&mut *reader)
        .take(MAX_LINE_LEN)
        .read_until(b'\n', &mut buf)
        .await?;
    if read == 0 {
        return Err(CacheStoreError::Closed);
    }
    if !buf.ends_with(b"\r\n") {
        return Err(CacheStoreError::protocol("reply line not terminated by CRLF"));
    }
    buf.truncate(buf.len() - 2);
    String::from_utf8(buf).map_err(|_| CacheStoreError::protocol("reply line is not UTF-8"))
}

fn error_reply(op: &'static str, line: &str) -> CacheStoreError {
    if line == "ERROR" {
        return CacheStoreError::Server {
            op,
            message: "unknown command".to_string(),
        };
    }
    if let Some(message) = line
        .strip_prefix("CLIENT_ERROR ")
        .or_else(|| line.strip_prefix("SERVER_ERROR "))
    {
        return CacheStoreError::Server {
            op,
            message: message.to_string(),
        };
    }
    CacheStoreError::protocol(format!("unexpected reply to {op}: `{line}`"))
}
