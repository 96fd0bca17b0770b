use anchor_lang::prelude::*;

use crate::codec::{ByteReader, ByteWriter, Memo};
use crate::constants::MEMO_LEN;

/// The negotiable terms of a stream. A proposal carries a full candidate set;
/// approval replaces all of them at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamTerms {
    pub memo: Memo,
    pub associated_token: Pubkey,
    pub rate_amount: u64,
    pub rate_interval_in_seconds: u64,
    pub cliff_in_seconds: u64,
    pub cliff_vest_amount: u64,
    pub cliff_vest_percent: u64,
    /// Zero disables auto-pause.
    pub auto_pause_in_seconds: u64,
}

impl StreamTerms {
    pub const LEN: usize = MEMO_LEN + 32 + 8 * 6;

    pub fn write(&self, w: &mut ByteWriter) {
        w.bytes32(&self.memo)
            .pubkey(&self.associated_token)
            .u64(self.rate_amount)
            .u64(self.rate_interval_in_seconds)
            .u64(self.cliff_in_seconds)
            .u64(self.cliff_vest_amount)
            .u64(self.cliff_vest_percent)
            .u64(self.auto_pause_in_seconds);
    }

    pub fn read(r: &mut ByteReader) -> Result<Self> {
        Ok(Self {
            memo: r.bytes32()?,
            associated_token: r.pubkey()?,
            rate_amount: r.u64()?,
            rate_interval_in_seconds: r.u64()?,
            cliff_in_seconds: r.u64()?,
            cliff_vest_amount: r.u64()?,
            cliff_vest_percent: r.u64()?,
            auto_pause_in_seconds: r.u64()?,
        })
    }
}

/// A pending renegotiation of a stream's terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTermsProposal {
    pub proposed_by: Pubkey,
    /// The only party allowed to answer.
    pub counterparty: Pubkey,
    pub terms: StreamTerms,
}

impl StreamTermsProposal {
    pub const LEN: usize = 32 + 32 + StreamTerms::LEN;
}

/// Update negotiation state attached to a stream. Persisted as a flag byte
/// followed by a fixed proposal block that is zeroed when nothing is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingUpdate {
    #[default]
    None,
    Pending(StreamTermsProposal),
}

impl PendingUpdate {
    pub const LEN: usize = 1 + StreamTermsProposal::LEN;

    pub fn is_pending(&self) -> bool {
        matches!(self, PendingUpdate::Pending(_))
    }

    pub fn proposal(&self) -> Option<&StreamTermsProposal> {
        match self {
            PendingUpdate::Pending(proposal) => Some(proposal),
            PendingUpdate::None => None,
        }
    }

    pub fn write(&self, w: &mut ByteWriter) {
        match self {
            PendingUpdate::None => {
                w.bool(false)
                    .pubkey(&Pubkey::default())
                    .pubkey(&Pubkey::default());
                StreamTerms::default().write(w);
            }
            PendingUpdate::Pending(proposal) => {
                w.bool(true)
                    .pubkey(&proposal.proposed_by)
                    .pubkey(&proposal.counterparty);
                proposal.terms.write(w);
            }
        }
    }

    pub fn read(r: &mut ByteReader) -> Result<Self> {
        let pending = r.bool()?;
        let proposed_by = r.pubkey()?;
        let counterparty = r.pubkey()?;
        let terms = StreamTerms::read(r)?;

        if !pending {
            return Ok(PendingUpdate::None);
        }
        Ok(PendingUpdate::Pending(StreamTermsProposal { proposed_by, counterparty, terms }))
    }
}
