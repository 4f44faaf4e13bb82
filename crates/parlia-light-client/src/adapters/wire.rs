//! Bincode Wire Adapter
//!
//! Implements `MessageCodec` for messages handed to the relayer.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::ParliaError;
use crate::ports::outbound::MessageCodec;

/// Default message codec using bincode.
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeCodec;

impl MessageCodec for BincodeCodec {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ParliaError> {
        bincode::serialize(value).map_err(|e| ParliaError::WireFormat(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, ParliaError> {
        bincode::deserialize(bytes).map_err(|e| ParliaError::WireFormat(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{encode_account_proof, HeaderUpdate, Height, Misbehaviour, ParliaHeader};
    use crate::ports::mock_validators;

    fn update(number: u64) -> HeaderUpdate {
        HeaderUpdate {
            headers: vec![ParliaHeader {
                number,
                ..Default::default()
            }
            .encode_rlp()],
            trusted_height: Some(Height::new(0, number - 1)),
            account_proof: encode_account_proof(&[]),
            current_validators: mock_validators(4, 1),
            previous_validators: mock_validators(3, 2),
            current_turn_length: 4,
            previous_turn_length: 1,
        }
    }

    #[test]
    fn test_misbehaviour_over_the_wire() {
        let codec = BincodeCodec;
        let misbehaviour = Misbehaviour::new("xx-parlia-0", update(10), update(10)).unwrap();
        let bytes = codec.serialize(&misbehaviour).unwrap();
        let decoded: Misbehaviour = codec.deserialize(&bytes).unwrap();
        assert_eq!(decoded, misbehaviour);
        assert!(decoded.validate_basic().is_ok());
    }

    #[test]
    fn test_truncated_message() {
        let codec = BincodeCodec;
        let bytes = codec.serialize(&update(10)).unwrap();
        let result: Result<HeaderUpdate, _> = codec.deserialize(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(ParliaError::WireFormat(_))));
    }
}
