//! Read-side view of a stream: the decoded record plus the figures computed
//! at one instant. Every call builds a fresh view.

use std::fmt;

use anchor_lang::prelude::*;

use crate::enums::{AddressFormat, StreamState, StreamStatus};
use crate::stream::Stream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayAddress {
    Friendly(String),
    Raw(Pubkey),
}

impl DisplayAddress {
    pub fn new(address: &Pubkey, format: AddressFormat) -> Self {
        match format {
            AddressFormat::Friendly => DisplayAddress::Friendly(address.to_string()),
            AddressFormat::Raw => DisplayAddress::Raw(*address),
        }
    }
}

impl fmt::Display for DisplayAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayAddress::Friendly(address) => f.write_str(address),
            DisplayAddress::Raw(address) => write!(f, "{:?}", address.to_bytes()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub id: DisplayAddress,
    pub memo: String,
    pub state: StreamState,
    pub status: StreamStatus,
    pub treasurer_address: DisplayAddress,
    pub beneficiary_address: DisplayAddress,
    pub beneficiary_associated_token: DisplayAddress,
    pub treasury_address: DisplayAddress,
    pub associated_token: DisplayAddress,
    pub rate_amount: u64,
    pub rate_interval_in_seconds: u64,
    pub start_utc: u64,
    pub cliff_in_seconds: u64,
    pub cliff_vest_amount: u64,
    pub cliff_vest_percent: u64,
    pub auto_pause_in_seconds: u64,
    pub total_deposits: u64,
    pub total_withdrawals: u64,
    pub total_seconds_in_paused_status: u64,
    pub pending_update: bool,
    pub current_block_time: u64,
    pub vested_units: u64,
    pub beneficiary_withdrawable_amount: u64,
    pub unvested_units: u64,
    pub is_streaming: bool,
    pub estimated_depletion_time: Option<u64>,
}

impl StreamInfo {
    pub fn new(id: &Pubkey, stream: &Stream, now: u64, format: AddressFormat) -> Self {
        let vesting = stream.vesting(now);
        let address = |key: &Pubkey| DisplayAddress::new(key, format);

        StreamInfo {
            id: address(id),
            memo: stream.memo(),
            state: stream.state,
            status: stream.get_status(now),
            treasurer_address: address(&stream.treasurer_address),
            beneficiary_address: address(&stream.beneficiary_address),
            beneficiary_associated_token: address(&stream.beneficiary_associated_token),
            treasury_address: address(&stream.treasury_address),
            associated_token: address(&stream.terms.associated_token),
            rate_amount: stream.terms.rate_amount,
            rate_interval_in_seconds: stream.terms.rate_interval_in_seconds,
            start_utc: stream.start_utc,
            cliff_in_seconds: stream.terms.cliff_in_seconds,
            cliff_vest_amount: stream.terms.cliff_vest_amount,
            cliff_vest_percent: stream.terms.cliff_vest_percent,
            auto_pause_in_seconds: stream.terms.auto_pause_in_seconds,
            total_deposits: stream.total_deposits,
            total_withdrawals: stream.total_withdrawals,
            total_seconds_in_paused_status: stream.total_seconds_in_paused_status,
            pending_update: stream.pending_update.is_pending(),
            current_block_time: now,
            vested_units: vesting.vested,
            beneficiary_withdrawable_amount: vesting.withdrawable,
            unvested_units: vesting.unvested,
            is_streaming: vesting.is_streaming,
            estimated_depletion_time: vesting.estimated_depletion,
        }
    }

    /// Decodes raw account bytes and builds the view in one step
    pub fn from_account_data(id: &Pubkey, data: &[u8], now: u64, format: AddressFormat) -> Result<Self> {
        let stream = Stream::decode(data)?;
        Ok(Self::new(id, &stream, now, format))
    }
}
