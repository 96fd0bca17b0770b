//! Two-phase renegotiation of stream terms. Either party proposes a full set
//! of replacement terms; only the other party can answer.

use anchor_lang::prelude::*;

use crate::constants::*;
use crate::enums::StreamState;
use crate::errors::ErrorCode;
use crate::lifecycle::clock_timestamp;
use crate::stream::Stream;
use crate::terms::{PendingUpdate, StreamTerms, StreamTermsProposal};

impl Stream {
    pub fn propose_update(&mut self, initiator: &Pubkey, terms: StreamTerms) -> Result<()> {
        self.ensure_open()?;
        let counterparty = self
            .counterparty_of(initiator)
            .ok_or(ErrorCode::Unauthorized)?;

        if self.pending_update.is_pending() {
            return Err(ErrorCode::UpdateAlreadyPending.into());
        }
        if terms.cliff_vest_percent > CLIFF_PERCENT_DENOMINATOR {
            return Err(ErrorCode::InvalidCliff.into());
        }
        // the escrow holds a single asset for the life of the stream
        if terms.associated_token != self.terms.associated_token {
            return Err(ErrorCode::InvalidAssociatedToken.into());
        }

        self.pending_update = PendingUpdate::Pending(StreamTermsProposal {
            proposed_by: *initiator,
            counterparty,
            terms,
        });

        msg!(
            "proposed_by: {0}, counterparty: {1}, rate_amount: {2}, rate_interval_in_seconds: {3}",
            initiator, counterparty, terms.rate_amount, terms.rate_interval_in_seconds
        );
        Ok(())
    }

    /// Approving replaces every term at once, after re-anchoring vesting at
    /// the current instant. Rejecting leaves the terms untouched.
    pub fn answer_update(&mut self, initiator: &Pubkey, approve: bool, clock: &Clock) -> Result<()> {
        self.ensure_open()?;
        let proposal = *self
            .pending_update
            .proposal()
            .ok_or(ErrorCode::NoPendingUpdate)?;

        if *initiator != proposal.counterparty {
            return Err(ErrorCode::Unauthorized.into());
        }

        if approve {
            let now = clock_timestamp(clock);
            // a paused stream keeps its snapshot; the new terms apply from
            // the next resume
            if self.state == StreamState::Active && now > self.start_utc {
                let mut updated = *self;
                updated.settle_depletion(clock)?;
                let snapshot = updated.primitive_snapshot_units(now);
                updated.rebase(snapshot, clock);
                *self = updated;
            }
            self.terms = proposal.terms;
        }
        self.pending_update = PendingUpdate::None;

        msg!("answered_by: {0}, approved: {1}", initiator, approve);
        Ok(())
    }
}
