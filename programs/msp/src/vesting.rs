//! Vesting calculator. Every figure here is derived from a stream record and a
//! wall-clock timestamp only; nothing in this module fails or mutates.
//!
//! Time is measured in "active seconds": seconds since `start_utc`, capped at
//! the auto-pause threshold, minus every second spent paused.

#[cfg(feature = "test")]
use anchor_lang::prelude::msg;

use crate::enums::{StreamState, StreamStatus};
use crate::stream::Stream;

/// Figures of a stream at one observation instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vesting {
    /// Cumulative vested units, withdrawn ones included. Always within
    /// `[total_withdrawals, total_deposits]`, which is what makes
    /// `withdrawable + unvested == total_deposits - total_withdrawals` hold.
    pub vested: u64,
    /// Vested and not yet withdrawn.
    pub withdrawable: u64,
    /// Deposited and not vested yet.
    pub unvested: u64,
    pub is_streaming: bool,
    /// Wall-clock second at which the stream runs out of funds on its
    /// current terms, if it ever does.
    pub estimated_depletion: Option<u64>,
}

/// Computes the vesting figures of `stream` at `now`.
pub fn vesting(stream: &Stream, now: u64) -> Vesting {
    stream.vesting(now)
}

impl Stream {
    pub fn vesting(&self, now: u64) -> Vesting {
        let vested = self.get_vested_units(now);
        let status = self.get_status(now);

        // a scheduled stream counts as streaming; only a pause stops it
        let is_streaming = vested < self.total_deposits
            && self.terms.rate_amount > 0
            && !matches!(status, StreamStatus::Paused | StreamStatus::AutoPaused | StreamStatus::Closed);

        let estimated_depletion = match status {
            StreamStatus::Paused | StreamStatus::Closed => None,
            _ => self.primitive_depletion_time(),
        };

        #[cfg(feature = "test")]
        msg!(
            "now: {0}, vested: {1}, deposits: {2}, withdrawals: {3}, status: {4}",
            now, vested, self.total_deposits, self.total_withdrawals, status.name()
        );

        Vesting {
            vested,
            // both differences are non-negative because of the clamp
            withdrawable: vested - self.total_withdrawals,
            unvested: self.total_deposits - vested,
            is_streaming,
            estimated_depletion,
        }
    }

    /// Gets the status of the stream at `now`
    pub fn get_status(&self, now: u64) -> StreamStatus {
        match self.state {
            StreamState::Closed => return StreamStatus::Closed,
            StreamState::Paused => return StreamStatus::Paused,
            StreamState::Draft => return StreamStatus::Scheduled,
            StreamState::Active => {}
        }

        if now < self.start_utc {
            return StreamStatus::Scheduled;
        }

        if let Some(deadline) = self.primitive_auto_pause_deadline() {
            if now >= deadline {
                return StreamStatus::AutoPaused;
            }
        }

        if self.primitive_vested_units(now) >= self.total_deposits as u128 {
            return StreamStatus::AutoPaused;
        }

        StreamStatus::Running
    }

    /// Cumulative vested units clamped to `[total_withdrawals, total_deposits]`
    pub fn get_vested_units(&self, now: u64) -> u64 {
        let vested = self
            .primitive_vested_units(now)
            .min(self.total_deposits as u128) as u64;
        vested.max(self.total_withdrawals)
    }

    /// The vested amount to persist when rebasing at `now`. Not clamped to
    /// the deposits, so a cliff that vested while underfunded is still owed
    /// once funds arrive.
    pub fn primitive_snapshot_units(&self, now: u64) -> u64 {
        self.primitive_vested_units(now).min(u64::MAX as u128) as u64
    }

    /// Gets the amount the beneficiary can withdraw at `now`
    pub fn get_beneficiary_withdrawable_amount(&self, now: u64) -> u64 {
        self.get_vested_units(now) - self.total_withdrawals
    }

    /// True when a running stream has vested everything deposited so far.
    pub fn is_depleted(&self, now: u64) -> bool {
        self.state == StreamState::Active
            && now >= self.start_utc
            && self.primitive_vested_units(now) >= self.total_deposits as u128
    }

    /// `start_utc + auto_pause_in_seconds`, when auto-pause is enabled.
    pub fn primitive_auto_pause_deadline(&self) -> Option<u64> {
        match self.terms.auto_pause_in_seconds {
            0 => None,
            seconds => Some(self.start_utc.saturating_add(seconds)),
        }
    }

    /// Maps a wall-clock timestamp into the window in which vesting can
    /// happen at all: `[start_utc, auto_pause_deadline]`.
    pub fn primitive_effective_time(&self, timestamp: u64) -> u64 {
        let timestamp = timestamp.max(self.start_utc);
        match self.primitive_auto_pause_deadline() {
            Some(deadline) => timestamp.min(deadline),
            None => timestamp,
        }
    }

    pub fn primitive_active_seconds(&self, timestamp: u64) -> u64 {
        self.primitive_effective_time(timestamp)
            .saturating_sub(self.start_utc)
            .saturating_sub(self.total_seconds_in_paused_status)
    }

    pub fn primitive_linear_units(&self, seconds: u64) -> u128 {
        if self.terms.rate_amount == 0 || self.terms.rate_interval_in_seconds == 0 {
            return 0;
        }
        (self.terms.rate_amount as u128) * (seconds as u128)
            / (self.terms.rate_interval_in_seconds as u128)
    }

    /// Units earned after `active_seconds` under the current terms. The cliff
    /// amount is part of every value from the cliff on, so a difference of
    /// two earned values never counts it twice.
    pub fn primitive_earned_units(&self, active_seconds: u64) -> u128 {
        let cliff = self.terms.cliff_in_seconds;
        if active_seconds < cliff {
            return 0;
        }
        self.primitive_get_cliff_units() as u128 + self.primitive_linear_units(active_seconds - cliff)
    }

    /// A rebase taken before the start carries nothing: the snapshot is zero
    /// and no paused time was recorded, so the stream vests from its start.
    pub fn primitive_is_rebased(&self) -> bool {
        self.last_resume_block_time > self.start_utc
    }

    /// Unclamped cumulative vested units.
    pub fn primitive_vested_units(&self, now: u64) -> u128 {
        if self.primitive_is_manually_paused() {
            return self.vested_snapshot_units as u128;
        }

        if now < self.start_utc {
            return 0;
        }

        let active_now = self.primitive_active_seconds(now);

        if self.primitive_is_rebased() {
            let active_at_resume = self.primitive_active_seconds(self.last_resume_block_time);
            let accrued_since_resume = self
                .primitive_earned_units(active_now)
                .saturating_sub(self.primitive_earned_units(active_at_resume));

            #[cfg(feature = "test")]
            msg!(
                "snapshot: {0}, active_at_resume: {1}, active_now: {2}, accrued: {3}",
                self.vested_snapshot_units, active_at_resume, active_now, accrued_since_resume
            );

            return self.vested_snapshot_units as u128 + accrued_since_resume;
        }

        self.primitive_earned_units(active_now)
    }

    /// The first wall-clock second at which the vested amount reaches the
    /// deposits on the current leg. `None` when the rate is degenerate or
    /// auto-pause stops the stream first.
    pub fn primitive_depletion_time(&self) -> Option<u64> {
        // vested(a) = snapshot + earned(a) - earned(leg_start) for active
        // seconds a >= leg_start, so the target is expressed in earned units
        let (target, leg_start) = if self.primitive_is_rebased() {
            let active_at_resume = self.primitive_active_seconds(self.last_resume_block_time);
            let target = (self.total_deposits as u128)
                .saturating_add(self.primitive_earned_units(active_at_resume))
                .saturating_sub(self.vested_snapshot_units as u128);
            (target, active_at_resume)
        } else {
            (self.total_deposits as u128, 0)
        };

        let active_seconds = if self.primitive_earned_units(leg_start) >= target {
            leg_start
        } else {
            let cliff = self.terms.cliff_in_seconds;
            let cliff_units = self.primitive_get_cliff_units() as u128;

            if target <= cliff_units {
                cliff
            } else {
                let rate = self.terms.rate_amount as u128;
                let interval = self.terms.rate_interval_in_seconds as u128;
                if rate == 0 || interval == 0 {
                    return None;
                }
                let seconds = (target - cliff_units)
                    .checked_mul(interval)?
                    .checked_add(rate - 1)?
                    / rate;
                let seconds = u64::try_from(seconds).ok()?;
                cliff.checked_add(seconds)?.max(leg_start)
            }
        };

        let depletion = self
            .start_utc
            .checked_add(self.total_seconds_in_paused_status)?
            .checked_add(active_seconds)?;

        match self.primitive_auto_pause_deadline() {
            Some(deadline) if depletion > deadline => None,
            _ => Some(depletion),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::stream::tests::sample_stream;

    pub const T0: u64 = 1_000_000;

    /// rate 100 per hour, 1000 deposited, no cliff, starts at T0
    pub fn scenario_stream() -> Stream {
        Stream { start_utc: T0, ..sample_stream() }
    }

    fn assert_conserved(stream: &Stream, now: u64) {
        let v = stream.vesting(now);
        assert_eq!(v.withdrawable + v.unvested, stream.total_deposits - stream.total_withdrawals);
        assert!(v.vested <= stream.total_deposits);
        assert!(v.vested >= stream.total_withdrawals);
    }

    #[test]
    fn scenario_a_linear_vesting() {
        let stream = scenario_stream();
        let v = vesting(&stream, T0 + 1800);
        assert_eq!(v.vested, 50);
        assert_eq!(v.withdrawable, 50);
        assert_eq!(v.unvested, 950);
        assert!(v.is_streaming);
        assert_eq!(v.estimated_depletion, Some(T0 + 36_000));
    }

    #[test]
    fn scenario_b_cliff_then_linear() {
        let mut stream = scenario_stream();
        stream.terms.cliff_in_seconds = 1800;
        stream.terms.cliff_vest_amount = 200;

        assert_eq!(stream.vesting(T0 + 1799).vested, 0);
        assert_eq!(stream.vesting(T0 + 1800).vested, 200);
        assert_eq!(stream.vesting(T0 + 3600).vested, 250);
    }

    #[test]
    fn scenario_c_paused_gap_does_not_vest() {
        let mut stream = scenario_stream();
        // pause at T0 + 1800
        stream.vested_snapshot_units = stream.get_vested_units(T0 + 1800);
        stream.state = StreamState::Paused;
        stream.vested_snapshot_block_time = T0 + 1800;
        assert_eq!(stream.vested_snapshot_units, 50);
        assert_eq!(stream.vesting(T0 + 5000).vested, 50);
        assert_eq!(stream.get_status(T0 + 5000), StreamStatus::Paused);
        assert!(!stream.vesting(T0 + 5000).is_streaming);

        // resume at T0 + 5400
        stream.state = StreamState::Active;
        stream.total_seconds_in_paused_status = 3600;
        stream.last_resume_block_time = T0 + 5400;

        assert_eq!(stream.vesting(T0 + 5400).vested, 50);
        assert_eq!(stream.vesting(T0 + 7200).vested, 100);
        assert_eq!(stream.vesting(T0 + 7200).estimated_depletion, Some(T0 + 3600 + 36_000));
    }

    #[test]
    fn scenario_d_fully_withdrawn() {
        let mut stream = scenario_stream();
        stream.total_deposits = 500;
        stream.total_withdrawals = 500;
        for now in [T0, T0 + 1, T0 + 1_000_000] {
            let v = stream.vesting(now);
            assert_eq!(v.unvested, 0);
            assert_eq!(v.withdrawable, 0);
            assert!(!v.is_streaming);
        }
    }

    #[test]
    fn before_start_nothing_vests() {
        let mut stream = scenario_stream();
        stream.terms.cliff_vest_amount = 300;
        let v = stream.vesting(T0 - 1);
        assert_eq!(v.vested, 0);
        assert_eq!(stream.get_status(T0 - 1), StreamStatus::Scheduled);
        assert!(v.is_streaming);
        // without a cliff period the cliff amount vests at start
        assert_eq!(stream.vesting(T0).vested, 300);
    }

    #[test]
    fn percent_cliff_uses_deposits() {
        let mut stream = scenario_stream();
        stream.terms.cliff_in_seconds = 3600;
        stream.terms.cliff_vest_percent = 10;
        assert_eq!(stream.vesting(T0 + 3600).vested, 100);
        assert_eq!(stream.vesting(T0 + 7200).vested, 200);
    }

    #[test]
    fn cliff_vests_exactly_once() {
        let mut stream = scenario_stream();
        stream.terms.cliff_in_seconds = 600;
        stream.terms.cliff_vest_amount = 200;

        let mut previous = 0;
        for now in (T0..T0 + 7200).step_by(60) {
            let vested = stream.vesting(now).vested;
            let linear = stream.primitive_linear_units(now.saturating_sub(T0 + 600)) as u64;
            if now >= T0 + 600 {
                assert_eq!(vested, 200 + linear);
            } else {
                assert_eq!(vested, 0);
            }
            assert!(vested >= previous);
            previous = vested;
        }

        // rebasing after the cliff keeps the cliff out of the new leg
        let snapshot = stream.get_vested_units(T0 + 3600);
        stream.vested_snapshot_units = snapshot;
        stream.last_resume_block_time = T0 + 3600;
        assert_eq!(stream.vesting(T0 + 3600).vested, snapshot);
        assert_eq!(stream.vesting(T0 + 7200).vested, snapshot + 100);
    }

    #[test]
    fn vesting_is_monotonic_and_conserved() {
        let mut stream = scenario_stream();
        stream.terms.rate_amount = 7;
        stream.terms.rate_interval_in_seconds = 13;
        stream.terms.cliff_in_seconds = 100;
        stream.terms.cliff_vest_percent = 33;
        stream.total_withdrawals = 120;

        let mut previous = 0;
        for now in (T0 - 500..T0 + 5000).step_by(17) {
            assert_conserved(&stream, now);
            let vested = stream.vesting(now).vested;
            assert!(vested >= previous);
            previous = vested;
        }
        assert_eq!(previous, stream.total_deposits);
    }

    #[test]
    fn degenerate_rates_never_divide_by_zero() {
        let mut stream = scenario_stream();
        stream.terms.rate_interval_in_seconds = 0;
        let v = stream.vesting(T0 + 10_000);
        assert_eq!(v.vested, 0);
        assert_eq!(v.unvested, 1000);
        assert_eq!(v.estimated_depletion, None);

        stream.terms.rate_interval_in_seconds = 3600;
        stream.terms.rate_amount = 0;
        assert_eq!(stream.vesting(T0 + 10_000).vested, 0);
        assert!(!stream.vesting(T0 + 10_000).is_streaming);

        // a cliff still pays out once
        stream.terms.cliff_vest_amount = 400;
        assert_eq!(stream.vesting(T0 + 10_000).vested, 400);

        stream.total_deposits = 0;
        let v = stream.vesting(T0 + 10_000);
        assert_eq!((v.vested, v.unvested, v.withdrawable), (0, 0, 0));
    }

    #[test]
    fn huge_values_saturate_instead_of_overflowing() {
        let mut stream = scenario_stream();
        stream.terms.rate_amount = u64::MAX;
        stream.terms.rate_interval_in_seconds = 1;
        stream.total_deposits = u64::MAX;
        let v = stream.vesting(u64::MAX);
        assert_eq!(v.vested, u64::MAX);
        assert_eq!(v.unvested, 0);
        assert_conserved(&stream, u64::MAX);
    }

    #[test]
    fn auto_pause_threshold_stops_vesting() {
        let mut stream = scenario_stream();
        stream.terms.auto_pause_in_seconds = 3600;
        assert_eq!(stream.get_status(T0 + 3599), StreamStatus::Running);
        assert_eq!(stream.get_status(T0 + 3600), StreamStatus::AutoPaused);
        assert_eq!(stream.vesting(T0 + 100_000).vested, 100);
        assert!(!stream.vesting(T0 + 100_000).is_streaming);
        assert_eq!(stream.vesting(T0).estimated_depletion, None);
    }

    #[test]
    fn running_out_of_funds_auto_pauses() {
        let stream = scenario_stream();
        assert_eq!(stream.get_status(T0 + 35_999), StreamStatus::Running);
        assert_eq!(stream.get_status(T0 + 36_000), StreamStatus::AutoPaused);
        assert!(stream.is_depleted(T0 + 36_000));
        assert_eq!(stream.vesting(T0 + 40_000).vested, 1000);
        assert_eq!(stream.primitive_depletion_time(), Some(T0 + 36_000));
    }

    #[test]
    fn depletion_rounds_up_to_whole_seconds() {
        let mut stream = scenario_stream();
        stream.terms.rate_amount = 3;
        stream.terms.rate_interval_in_seconds = 2;
        stream.total_deposits = 10;
        let depletion = stream.primitive_depletion_time().unwrap();
        assert_eq!(depletion, T0 + 7);
        assert_eq!(stream.vesting(depletion - 1).vested, 9);
        assert_eq!(stream.vesting(depletion).vested, 10);
    }

    #[test]
    fn closed_streams_report_closed() {
        let mut stream = scenario_stream();
        stream.state = StreamState::Closed;
        assert_eq!(stream.get_status(T0 + 10), StreamStatus::Closed);
        assert_eq!(stream.vesting(T0 + 10).estimated_depletion, None);
    }
}
