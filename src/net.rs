use thiserror::Error;

/// One-byte kind tags distinguishing sync traffic from other packets on the
/// same channel.
pub const KIND_SYNC_REQUEST: u8 = 0x01;
pub const KIND_SYNC_RESPONSE: u8 = 0x02;

/// The two-message history sync protocol. A joining peer sends `Request`
/// once; the authoritative host answers with its full play history, which the
/// peer adopts wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMessage {
    Request,
    Response { played: Vec<String> },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("unknown message kind {0:#04x}")]
    UnknownKind(u8),
    #[error("unexpected end of packet")]
    UnexpectedEof,
    #[error("event identifier is not valid utf-8")]
    InvalidUtf8,
    #[error("trailing bytes after message")]
    TrailingBytes,
}

impl SyncMessage {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            SyncMessage::Request => vec![KIND_SYNC_REQUEST],
            SyncMessage::Response { played } => {
                let mut out = vec![KIND_SYNC_RESPONSE];
                out.extend_from_slice(&(played.len() as i32).to_le_bytes());
                for id in played {
                    out.extend_from_slice(&(id.len() as u32).to_le_bytes());
                    out.extend_from_slice(id.as_bytes());
                }
                out
            }
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        let (&kind, mut rest) = data.split_first().ok_or(WireError::UnexpectedEof)?;

        let message = match kind {
            KIND_SYNC_REQUEST => SyncMessage::Request,
            KIND_SYNC_RESPONSE => {
                let count = read_i32(&mut rest)?;
                let mut played = Vec::new();
                for _ in 0..count.max(0) {
                    played.push(read_string(&mut rest)?);
                }
                SyncMessage::Response { played }
            }
            other => return Err(WireError::UnknownKind(other)),
        };

        if rest.is_empty() {
            Ok(message)
        } else {
            Err(WireError::TrailingBytes)
        }
    }
}

fn read_i32(data: &mut &[u8]) -> Result<i32, WireError> {
    let (bytes, rest) = data
        .split_first_chunk::<4>()
        .ok_or(WireError::UnexpectedEof)?;
    *data = rest;
    Ok(i32::from_le_bytes(*bytes))
}

fn read_string(data: &mut &[u8]) -> Result<String, WireError> {
    let (len_bytes, rest) = data
        .split_first_chunk::<4>()
        .ok_or(WireError::UnexpectedEof)?;
    let len = u32::from_le_bytes(*len_bytes) as usize;
    if rest.len() < len {
        return Err(WireError::UnexpectedEof);
    }
    let (raw, rest) = rest.split_at(len);
    *data = rest;
    String::from_utf8(raw.to_vec()).map_err(|_| WireError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_a_single_kind_byte() {
        let bytes = SyncMessage::Request.encode();
        assert_eq!(bytes, [KIND_SYNC_REQUEST]);
        assert_eq!(SyncMessage::decode(&bytes), Ok(SyncMessage::Request));
    }

    #[test]
    fn response_round_trip_preserves_order() {
        let message = SyncMessage::Response {
            played: vec!["A".to_string(), "B".to_string()],
        };
        let decoded = SyncMessage::decode(&message.encode()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn empty_response_is_valid() {
        let message = SyncMessage::Response { played: vec![] };
        let bytes = message.encode();
        assert_eq!(bytes.len(), 5); // kind + i32 count
        assert_eq!(SyncMessage::decode(&bytes), Ok(message));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert_eq!(
            SyncMessage::decode(&[0x7f]),
            Err(WireError::UnknownKind(0x7f))
        );
    }

    #[test]
    fn truncated_response_is_rejected() {
        let mut bytes = SyncMessage::Response {
            played: vec!["hardmode".to_string()],
        }
        .encode();
        bytes.truncate(bytes.len() - 3);
        assert_eq!(SyncMessage::decode(&bytes), Err(WireError::UnexpectedEof));
    }

    #[test]
    fn empty_packet_is_rejected() {
        assert_eq!(SyncMessage::decode(&[]), Err(WireError::UnexpectedEof));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = SyncMessage::Request.encode();
        bytes.push(0);
        assert_eq!(SyncMessage::decode(&bytes), Err(WireError::TrailingBytes));
    }
}
