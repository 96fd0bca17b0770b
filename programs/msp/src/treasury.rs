use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_pack::{IsInitialized, Pack, Sealed};

use crate::codec::{ByteReader, ByteWriter};
use crate::errors::ErrorCode;

/// Escrow holder of a single stream. The escrowed tokens live in
/// `treasury_token`, owned by the treasury authority derived from this
/// account's address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Treasury {
    pub initialized: bool,
    pub bump: u8,
    /// Bump of the treasury authority
    pub authority_bump: u8,
    pub stream_address: Pubkey,
    pub associated_token_address: Pubkey,
    pub treasury_token_address: Pubkey,
    pub created_on_utc: u64,
    // total bytes: 107
}

impl Sealed for Treasury {}

impl IsInitialized for Treasury {
    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl Treasury {
    pub const LEN: usize = 3 + 32 * 3 + 8;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(Self::LEN);
        w.bool(self.initialized)
            .u8(self.bump)
            .u8(self.authority_bump)
            .pubkey(&self.stream_address)
            .pubkey(&self.associated_token_address)
            .pubkey(&self.treasury_token_address)
            .u64(self.created_on_utc);
        w.into_inner()
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::exact(data, Self::LEN)?;
        Ok(Self {
            initialized: r.bool()?,
            bump: r.u8()?,
            authority_bump: r.u8()?,
            stream_address: r.pubkey()?,
            associated_token_address: r.pubkey()?,
            treasury_token_address: r.pubkey()?,
            created_on_utc: r.u64()?,
        })
    }

    /// Checks the treasury backs `stream` and escrows `mint`
    pub fn validate_for(&self, stream: &Pubkey, mint: &Pubkey) -> Result<()> {
        if !self.initialized || self.stream_address != *stream {
            return Err(ErrorCode::InvalidTreasury.into());
        }
        if self.associated_token_address != *mint {
            return Err(ErrorCode::InvalidAssociatedToken.into());
        }
        Ok(())
    }
}

impl Pack for Treasury {
    const LEN: usize = Treasury::LEN;

    fn pack_into_slice(&self, dst: &mut [u8]) {
        dst[..Treasury::LEN].copy_from_slice(&self.to_bytes());
    }

    fn unpack_from_slice(src: &[u8]) -> std::result::Result<Self, ProgramError> {
        Treasury::decode(src).map_err(Into::into)
    }
}
