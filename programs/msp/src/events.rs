//! One event per instruction, emitted by the processor after the stream
//! record has been written.

use anchor_lang::prelude::*;

#[event]
pub struct CreateStreamEvent {
    pub timestamp: u64,
    pub stream_start_ts: u64,
    pub stream_rate_amount: u64,
    pub stream_rate_interval: u64,
    pub stream_funding: u64,
    pub stream_cliff: u64,
    pub stream: Pubkey,
    pub treasury: Pubkey,
}

#[event]
pub struct AddFundsEvent {
    pub timestamp: u64,
    pub amount: u64,
    pub resumed: bool,
    pub stream_total_deposits_after: u64,
    pub stream_total_seconds_in_paused_status_after: u64,
    pub contributor: Pubkey,
    pub stream: Pubkey,
}

#[event]
pub struct StreamWithdrawEvent {
    pub timestamp: u64,
    pub amount: u64,
    pub fee_amount: u64,
    pub stream_withdrawable_before: u64,
    pub stream_is_manually_paused: bool,
    pub stream_total_withdrawals_after: u64,
    pub stream: Pubkey,
    pub treasury: Pubkey,
}

#[event]
pub struct StreamPauseEvent {
    pub timestamp: u64,
    pub stream_vested_snapshot_after: u64,
    pub initiator: Pubkey,
    pub stream: Pubkey,
}

#[event]
pub struct StreamResumeEvent {
    pub timestamp: u64,
    pub stream_total_seconds_in_paused_status_after: u64,
    pub stream_was_manually_paused: bool,
    pub initiator: Pubkey,
    pub stream: Pubkey,
}

#[event]
pub struct ProposeUpdateEvent {
    pub timestamp: u64,
    pub proposed_rate_amount: u64,
    pub proposed_rate_interval: u64,
    pub proposed_cliff_vest_amount: u64,
    pub proposed_cliff_vest_percent: u64,
    pub proposed_by: Pubkey,
    pub counterparty: Pubkey,
    pub stream: Pubkey,
}

#[event]
pub struct AnswerUpdateEvent {
    pub timestamp: u64,
    pub approved: bool,
    pub answered_by: Pubkey,
    pub stream: Pubkey,
}

#[event]
pub struct CloseStreamEvent {
    pub timestamp: u64,
    pub token_amount_sent_to_beneficiary: u64,
    pub fee_amount: u64,
    pub token_amount_returned_to_treasurer: u64,
    pub stream_total_deposits: u64,
    pub stream_total_withdrawals_after: u64,
    pub initiator: Pubkey,
    pub stream: Pubkey,
    pub treasury: Pubkey,
}
