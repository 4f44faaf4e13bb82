//! # Vote Attestation
//!
//! Fast-finality attestation carried in a header's `extra` between the
//! (optional) validator section and the seal.

use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

use super::errors::ParliaError;
use super::header::{ParliaHeader, EXTRA_SEAL, EXTRA_VANITY};
use super::validators::{TURN_LENGTH_SIZE, VALIDATOR_BYTES_LENGTH, VALIDATOR_NUMBER_SIZE};
use super::value_objects::Hash;

/// Aggregated BLS signature length.
pub const BLS_SIGNATURE_LENGTH: usize = 96;

/// Justified source and target of a vote.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteData {
    /// Source (justified) block number
    pub source_number: u64,
    /// Source block hash
    pub source_hash: Hash,
    /// Target block number
    pub target_number: u64,
    /// Target block hash
    pub target_hash: Hash,
}

/// Aggregated vote attestation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteAttestation {
    /// Bitset of validators that signed
    pub vote_address_set: u64,
    /// Aggregated BLS signature
    pub agg_signature: Vec<u8>,
    /// Attested data
    pub data: VoteData,
    /// Reserved
    pub extra: Vec<u8>,
}

impl VoteAttestation {
    /// Number of validators that signed.
    pub fn signer_count(&self) -> u32 {
        self.vote_address_set.count_ones()
    }

    /// RLP encode the attestation.
    pub fn encode_rlp(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }
}

impl Encodable for VoteData {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&self.source_number);
        s.append(&self.source_hash.to_vec());
        s.append(&self.target_number);
        s.append(&self.target_hash.to_vec());
    }
}

impl Decodable for VoteData {
    fn decode(rlp: &Rlp<'_>) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 4 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            source_number: rlp.val_at(0)?,
            source_hash: hash_at(rlp, 1)?,
            target_number: rlp.val_at(2)?,
            target_hash: hash_at(rlp, 3)?,
        })
    }
}

impl Encodable for VoteAttestation {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&self.vote_address_set);
        s.append(&self.agg_signature);
        s.append(&self.data);
        s.append(&self.extra);
    }
}

impl Decodable for VoteAttestation {
    fn decode(rlp: &Rlp<'_>) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 4 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let agg_signature: Vec<u8> = rlp.val_at(1)?;
        if agg_signature.len() != BLS_SIGNATURE_LENGTH {
            return Err(DecoderError::RlpInvalidLength);
        }
        Ok(Self {
            vote_address_set: rlp.val_at(0)?,
            agg_signature,
            data: rlp.val_at(2)?,
            extra: rlp.val_at(3)?,
        })
    }
}

fn hash_at(rlp: &Rlp<'_>, index: usize) -> Result<Hash, DecoderError> {
    let bytes: Vec<u8> = rlp.val_at(index)?;
    bytes.try_into().map_err(|_| DecoderError::RlpInvalidLength)
}

/// Extract the vote attestation of `header`.
///
/// `Ok(None)` when the header has no attestation region; an error when the
/// region is present but does not decode.
pub fn vote_attestation_from_header(
    header: &ParliaHeader,
    is_epoch_block: bool,
) -> Result<Option<VoteAttestation>, ParliaError> {
    let extra = &header.extra;
    if extra.len() <= EXTRA_VANITY + EXTRA_SEAL {
        return Ok(None);
    }

    let start = if is_epoch_block {
        let num = extra[EXTRA_VANITY] as usize;
        let validators_end =
            EXTRA_VANITY + VALIDATOR_NUMBER_SIZE + num * VALIDATOR_BYTES_LENGTH + TURN_LENGTH_SIZE;
        if extra.len() <= validators_end + EXTRA_SEAL {
            return Ok(None);
        }
        validators_end
    } else {
        EXTRA_VANITY
    };
    let bytes = &extra[start..extra.len() - EXTRA_SEAL];

    rlp::decode::<VoteAttestation>(bytes)
        .map(Some)
        .map_err(|e| ParliaError::InvalidVoteAttestation {
            height: header.number,
            reason: e.to_string(),
        })
}
