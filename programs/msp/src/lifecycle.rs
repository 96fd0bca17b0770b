//! Stream state transitions. Every operation validates first and only then
//! mutates, so a failed operation leaves the stream untouched.

use anchor_lang::prelude::*;

use crate::constants::*;
use crate::enums::{StreamState, StreamStatus};
use crate::errors::ErrorCode;
use crate::instruction::CreateStreamParams;
use crate::stream::Stream;
use crate::terms::PendingUpdate;

/// Token movements owed when a stream closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloseSettlement {
    /// Vested and not yet withdrawn
    pub beneficiary_amount: u64,
    /// Never vested, returned to the treasurer
    pub treasurer_amount: u64,
}

pub fn clock_timestamp(clock: &Clock) -> u64 {
    clock.unix_timestamp.max(0) as u64
}

impl Stream {
    /// Builds a new `Active` stream. A start in the past is moved to the
    /// current blocktime.
    pub fn create(
        treasurer: &Pubkey,
        params: &CreateStreamParams,
        beneficiary_associated_token: Pubkey,
        treasury_address: Pubkey,
        clock: &Clock,
    ) -> Result<Stream> {
        if params.beneficiary == *treasurer {
            return Err(ErrorCode::InvalidBeneficiary.into());
        }
        if params.cliff_vest_percent > CLIFF_PERCENT_DENOMINATOR {
            return Err(ErrorCode::InvalidCliff.into());
        }
        if params.funding_amount > 0 && params.cliff_vest_amount > params.funding_amount {
            return Err(ErrorCode::InvalidCliff.into());
        }

        let now = clock_timestamp(clock);
        let start_utc = params.start_utc.max(now);

        msg!(
            "clock: {0}, start_utc: {1}, funding: {2}, rate_amount: {3}, rate_interval_in_seconds: {4}",
            now, start_utc, params.funding_amount, params.rate_amount, params.rate_interval_in_seconds
        );

        Ok(Stream {
            initialized: true,
            state: StreamState::Active,
            bump: params.stream_bump,
            nonce: params.nonce,
            treasurer_address: *treasurer,
            beneficiary_address: params.beneficiary,
            beneficiary_associated_token,
            treasury_address,
            terms: params.terms(),
            start_utc,
            total_deposits: params.funding_amount,
            total_withdrawals: 0,
            vested_snapshot_units: 0,
            vested_snapshot_slot: 0,
            vested_snapshot_block_time: 0,
            last_resume_slot: 0,
            last_resume_block_time: 0,
            total_seconds_in_paused_status: 0,
            pending_update: PendingUpdate::None,
        })
    }

    /// Fails unless the stream exists and is not closed
    pub fn ensure_open(&self) -> Result<()> {
        if !self.initialized || self.state == StreamState::Draft {
            return Err(ErrorCode::StreamNotInitialized.into());
        }
        if self.state == StreamState::Closed {
            return Err(ErrorCode::StreamClosed.into());
        }
        Ok(())
    }

    /// Fails unless `initiator` is the treasurer or the beneficiary
    pub fn ensure_party(&self, initiator: &Pubkey) -> Result<()> {
        if *initiator != self.treasurer_address && *initiator != self.beneficiary_address {
            return Err(ErrorCode::Unauthorized.into());
        }
        Ok(())
    }

    /// Adds `amount` to the deposits. Anyone may fund a stream; only the
    /// treasurer or the beneficiary may ask for a resume on top.
    pub fn add_funds(&mut self, contributor: &Pubkey, amount: u64, resume: bool, clock: &Clock) -> Result<()> {
        self.ensure_open()?;
        if amount == 0 {
            return Err(ErrorCode::ZeroContributionAmount.into());
        }
        if resume {
            self.ensure_party(contributor)?;
        }

        let now = clock_timestamp(clock);
        let mut updated = *self;

        updated.settle_depletion(clock)?;

        if updated.terms.cliff_vest_percent > 0
            && now >= updated.start_utc
            && updated.primitive_active_seconds(now) >= updated.terms.cliff_in_seconds
        {
            updated.save_effective_cliff();
        }

        updated.total_deposits = updated
            .total_deposits
            .checked_add(amount)
            .ok_or(ErrorCode::Overflow)?;

        if resume && updated.state == StreamState::Paused {
            updated.apply_resume(clock)?;
        }

        msg!(
            "clock: {0}, amount: {1}, total_deposits: {2}, status: {3}",
            now, amount, updated.total_deposits, updated.get_status(now).name()
        );

        *self = updated;
        Ok(())
    }

    /// Records a withdrawal by the beneficiary
    pub fn withdraw(&mut self, initiator: &Pubkey, amount: u64, clock: &Clock) -> Result<()> {
        self.ensure_open()?;
        if *initiator != self.beneficiary_address {
            return Err(ErrorCode::Unauthorized.into());
        }
        if amount == 0 {
            return Err(ErrorCode::ZeroWithdrawalAmount.into());
        }

        let now = clock_timestamp(clock);
        let withdrawable = self.get_beneficiary_withdrawable_amount(now);

        msg!("clock: {0}, amount: {1}, withdrawable: {2}", now, amount, withdrawable);

        if amount > withdrawable {
            return Err(ErrorCode::InsufficientVestedBalance.into());
        }

        self.total_withdrawals = self
            .total_withdrawals
            .checked_add(amount)
            .ok_or(ErrorCode::Overflow)?;
        Ok(())
    }

    pub fn pause(&mut self, initiator: &Pubkey, clock: &Clock) -> Result<()> {
        self.ensure_open()?;
        self.ensure_party(initiator)?;
        if self.state != StreamState::Active {
            return Err(ErrorCode::AlreadyPaused.into());
        }

        let now = clock_timestamp(clock);
        let mut updated = *self;
        updated.settle_depletion(clock)?;
        updated.vested_snapshot_units = updated.primitive_snapshot_units(now);
        updated.vested_snapshot_slot = clock.slot;
        updated.vested_snapshot_block_time = now;
        updated.state = StreamState::Paused;

        msg!("clock: {0}, vested_snapshot_units: {1}", now, updated.vested_snapshot_units);
        *self = updated;
        Ok(())
    }

    /// Resumes a manually paused stream. Resuming a stream that only
    /// auto-paused changes nothing.
    pub fn resume(&mut self, initiator: &Pubkey, clock: &Clock) -> Result<()> {
        self.ensure_open()?;
        self.ensure_party(initiator)?;

        let now = clock_timestamp(clock);
        match self.state {
            StreamState::Paused => self.apply_resume(clock),
            StreamState::Active if self.get_status(now) == StreamStatus::AutoPaused => {
                msg!("clock: {0}, stream is auto-paused, nothing to resume", now);
                Ok(())
            }
            _ => Err(ErrorCode::NotPaused.into()),
        }
    }

    /// Settles the stream and marks it closed. Any pending proposal is
    /// discarded with it.
    pub fn close(&mut self, initiator: &Pubkey, clock: &Clock) -> Result<CloseSettlement> {
        self.ensure_open()?;
        self.ensure_party(initiator)?;

        let now = clock_timestamp(clock);
        let vesting = self.vesting(now);
        let settlement = CloseSettlement {
            beneficiary_amount: vesting.withdrawable,
            treasurer_amount: vesting.unvested,
        };

        self.total_withdrawals = vesting.vested;
        self.state = StreamState::Closed;
        self.pending_update = PendingUpdate::None;

        msg!(
            "clock: {0}, beneficiary_amount: {1}, treasurer_amount: {2}",
            now, settlement.beneficiary_amount, settlement.treasurer_amount
        );
        Ok(settlement)
    }

    /// A stream that ran out of funds stopped vesting at its depletion time.
    /// Records the gap since then as paused time and rebases on the vested
    /// amount at depletion, so later deposits vest from now on.
    pub(crate) fn settle_depletion(&mut self, clock: &Clock) -> Result<()> {
        let now = clock_timestamp(clock);
        if !self.is_depleted(now) {
            return Ok(());
        }

        let depleted_at = self.primitive_depletion_time().unwrap_or(now).min(now);
        let gap = self.primitive_effective_time(now) - self.primitive_effective_time(depleted_at);
        let snapshot = self.primitive_snapshot_units(depleted_at);

        self.total_seconds_in_paused_status = self
            .total_seconds_in_paused_status
            .checked_add(gap)
            .ok_or(ErrorCode::Overflow)?;
        self.rebase(snapshot, clock);

        msg!("depleted_at: {0}, paused_gap: {1}, snapshot: {2}", depleted_at, gap, snapshot);
        Ok(())
    }

    /// Re-anchors vesting at the current instant: later accrual is computed
    /// from here on, starting from `snapshot` vested units.
    pub(crate) fn rebase(&mut self, snapshot: u64, clock: &Clock) {
        let now = clock_timestamp(clock);
        self.vested_snapshot_units = snapshot;
        self.vested_snapshot_slot = clock.slot;
        self.vested_snapshot_block_time = now;
        self.last_resume_slot = clock.slot;
        self.last_resume_block_time = now;
    }

    fn apply_resume(&mut self, clock: &Clock) -> Result<()> {
        let now = clock_timestamp(clock);
        let paused_at = self.vested_snapshot_block_time.min(now);
        let gap = self.primitive_effective_time(now) - self.primitive_effective_time(paused_at);

        self.total_seconds_in_paused_status = self
            .total_seconds_in_paused_status
            .checked_add(gap)
            .ok_or(ErrorCode::Overflow)?;
        self.last_resume_slot = clock.slot;
        self.last_resume_block_time = now;
        self.state = StreamState::Active;

        msg!(
            "clock: {0}, paused_gap: {1}, total_seconds_in_paused_status: {2}",
            now, gap, self.total_seconds_in_paused_status
        );
        Ok(())
    }
}
