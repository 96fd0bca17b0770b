use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_pack::{IsInitialized, Pack, Sealed};

use crate::codec::{bytes_to_string, ByteReader, ByteWriter};
use crate::constants::*;
use crate::enums::StreamState;
use crate::errors::ErrorCode;
use crate::terms::{PendingUpdate, StreamTerms};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stream {
    pub initialized: bool,
    pub state: StreamState,
    /// Bump of the stream address, derived from (treasurer, nonce)
    pub bump: u8,
    pub nonce: u64,
    pub treasurer_address: Pubkey,
    pub beneficiary_address: Pubkey,
    pub beneficiary_associated_token: Pubkey,
    pub treasury_address: Pubkey,
    /// Memo, asset, rate, cliff and auto-pause. Only replaced as a whole,
    /// through an approved update proposal.
    pub terms: StreamTerms,
    /// The start timestamp in seconds
    pub start_utc: u64,
    /// Funding tracking. Both counters only grow and
    /// `total_withdrawals <= total_deposits` always holds.
    pub total_deposits: u64,
    pub total_withdrawals: u64,
    /// Cumulative vested units at the last pause or rebase. While the stream
    /// is paused this is the vested amount.
    pub vested_snapshot_units: u64,
    pub vested_snapshot_slot: u64,
    pub vested_snapshot_block_time: u64,
    /// The vesting leg after the snapshot accrues from this blocktime.
    /// Zero until the first rebase.
    pub last_resume_slot: u64,
    pub last_resume_block_time: u64,
    /// The total seconds that have been paused since the start_utc
    /// (manual pauses plus the gaps where the stream ran out of funds)
    pub total_seconds_in_paused_status: u64,
    pub pending_update: PendingUpdate,
    // total bytes: 500
}

impl Sealed for Stream {}

impl IsInitialized for Stream {
    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl Stream {
    pub const LEN: usize = 3 + 8 + 32 * 4 + StreamTerms::LEN + 8 * 9 + PendingUpdate::LEN;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(Self::LEN);
        w.bool(self.initialized)
            .u8(self.state as u8)
            .u8(self.bump)
            .u64(self.nonce)
            .pubkey(&self.treasurer_address)
            .pubkey(&self.beneficiary_address)
            .pubkey(&self.beneficiary_associated_token)
            .pubkey(&self.treasury_address);
        self.terms.write(&mut w);
        w.u64(self.start_utc)
            .u64(self.total_deposits)
            .u64(self.total_withdrawals)
            .u64(self.vested_snapshot_units)
            .u64(self.vested_snapshot_slot)
            .u64(self.vested_snapshot_block_time)
            .u64(self.last_resume_slot)
            .u64(self.last_resume_block_time)
            .u64(self.total_seconds_in_paused_status);
        self.pending_update.write(&mut w);
        w.into_inner()
    }

    /// Decodes a stream record. Fails with `MalformedRecord` unless `data`
    /// is exactly [`Stream::LEN`] bytes with a known state byte.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::exact(data, Self::LEN)?;
        Ok(Self {
            initialized: r.bool()?,
            state: StreamState::try_from(r.u8()?)?,
            bump: r.u8()?,
            nonce: r.u64()?,
            treasurer_address: r.pubkey()?,
            beneficiary_address: r.pubkey()?,
            beneficiary_associated_token: r.pubkey()?,
            treasury_address: r.pubkey()?,
            terms: StreamTerms::read(&mut r)?,
            start_utc: r.u64()?,
            total_deposits: r.u64()?,
            total_withdrawals: r.u64()?,
            vested_snapshot_units: r.u64()?,
            vested_snapshot_slot: r.u64()?,
            vested_snapshot_block_time: r.u64()?,
            last_resume_slot: r.u64()?,
            last_resume_block_time: r.u64()?,
            total_seconds_in_paused_status: r.u64()?,
            pending_update: PendingUpdate::read(&mut r)?,
        })
    }

    pub fn memo(&self) -> String {
        bytes_to_string(&self.terms.memo)
    }

    /// Calculates the cliff amount. When both the absolute amount and the
    /// percent are set, the amount takes precedence.
    pub fn primitive_get_cliff_units(&self) -> u64 {
        if self.terms.cliff_vest_amount > 0 {
            return self.terms.cliff_vest_amount;
        }
        let units = (self.total_deposits as u128)
            .saturating_mul(self.terms.cliff_vest_percent as u128)
            / CLIFF_PERCENT_DENOMINATOR as u128;
        units.min(self.total_deposits as u128) as u64
    }

    /// Converts a percent cliff into an absolute amount so later deposits
    /// do not change a cliff that already vested.
    pub fn save_effective_cliff(&mut self) {
        if self.terms.cliff_vest_amount == 0 && self.terms.cliff_vest_percent > 0 {
            self.terms.cliff_vest_amount = self.primitive_get_cliff_units();
        }
        self.terms.cliff_vest_percent = 0;
    }

    /// Check is the stream was manually paused
    pub fn primitive_is_manually_paused(&self) -> bool {
        self.state == StreamState::Paused
    }

    /// The party opposite to `party`, if `party` is one of the two.
    pub fn counterparty_of(&self, party: &Pubkey) -> Option<Pubkey> {
        if *party == self.treasurer_address {
            Some(self.beneficiary_address)
        } else if *party == self.beneficiary_address {
            Some(self.treasurer_address)
        } else {
            None
        }
    }
}

impl Pack for Stream {
    const LEN: usize = Stream::LEN;

    fn pack_into_slice(&self, dst: &mut [u8]) {
        dst[..Stream::LEN].copy_from_slice(&self.to_bytes());
    }

    fn unpack_from_slice(src: &[u8]) -> std::result::Result<Self, ProgramError> {
        Stream::decode(src).map_err(Into::into)
    }
}
