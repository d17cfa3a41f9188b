use anyhow::{Result, ensure};

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

#[cfg(all(feature = "json", not(feature = "bincode")))]
use serde::{Serialize, de::DeserializeOwned};

// Largest message accepted by `decode`.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

// ============================================================================
// Message Codec
// ============================================================================

#[cfg(feature = "bincode")]
pub fn encode<T: Encode>(msg: &T) -> Result<Vec<u8>> {
    let data = bincode::encode_to_vec(msg, bincode::config::standard())?;
    Ok(data)
}

#[cfg(feature = "bincode")]
pub fn decode<T: Decode<()>>(data: &[u8]) -> Result<T> {
    ensure!(data.len() <= MAX_MESSAGE_SIZE, "message too large: {} bytes", data.len());
    let (msg, read) = bincode::decode_from_slice(data, bincode::config::standard())?;
    ensure!(read == data.len(), "{} trailing bytes after message", data.len() - read);
    Ok(msg)
}

#[cfg(all(feature = "json", not(feature = "bincode")))]
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    let data = serde_json::to_vec(msg)?;
    Ok(data)
}

#[cfg(all(feature = "json", not(feature = "bincode")))]
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    ensure!(data.len() <= MAX_MESSAGE_SIZE, "message too large: {} bytes", data.len());
    let msg = serde_json::from_slice(data)?;
    Ok(msg)
}

#[cfg(all(test, feature = "bincode"))]
mod tests {
    use super::*;
    use crate::protocol::{PlayerId, ShotId, ShotInfo, ShotInfoKind};

    fn info() -> ShotInfo {
        ShotInfo {
            player: PlayerId(4),
            shot: ShotId(513),
            kind: ShotInfoKind::Teleport,
            pos: [1.0, -2.5, 3.0],
            obstacle: None,
            link_src: Some(2),
            link_dst: Some(5),
        }
    }

    #[test]
    fn shot_info_survives_the_wire() {
        let data = encode(&info()).unwrap();
        let decoded: ShotInfo = decode(&data).unwrap();
        assert_eq!(decoded, info());
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut data = encode(&info()).unwrap();
        data.push(0);
        assert!(decode::<ShotInfo>(&data).is_err());
    }
}
