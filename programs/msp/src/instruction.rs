//! Instruction payloads and builders.

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};

use crate::codec::{ByteReader, ByteWriter, Memo};
use crate::constants::fee_treasury;
use crate::enums::MspAction;
use crate::errors::ErrorCode;
use crate::pda::*;
use crate::stream::Stream;
use crate::terms::StreamTerms;

/// Payload of `CreateStream`. The bumps are the ones found for the stream,
/// treasury and treasury authority addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CreateStreamParams {
    pub memo: Memo,
    pub beneficiary: Pubkey,
    pub associated_token: Pubkey,
    pub nonce: u64,
    /// Initial deposit, may be zero
    pub funding_amount: u64,
    pub rate_amount: u64,
    pub rate_interval_in_seconds: u64,
    pub start_utc: u64,
    pub cliff_in_seconds: u64,
    pub cliff_vest_amount: u64,
    pub cliff_vest_percent: u64,
    pub auto_pause_in_seconds: u64,
    pub stream_bump: u8,
    pub treasury_bump: u8,
    pub authority_bump: u8,
}

impl CreateStreamParams {
    pub const LEN: usize = 32 * 3 + 8 * 9 + 3;

    pub fn terms(&self) -> StreamTerms {
        StreamTerms {
            memo: self.memo,
            associated_token: self.associated_token,
            rate_amount: self.rate_amount,
            rate_interval_in_seconds: self.rate_interval_in_seconds,
            cliff_in_seconds: self.cliff_in_seconds,
            cliff_vest_amount: self.cliff_vest_amount,
            cliff_vest_percent: self.cliff_vest_percent,
            auto_pause_in_seconds: self.auto_pause_in_seconds,
        }
    }

    fn write(&self, w: &mut ByteWriter) {
        w.bytes32(&self.memo)
            .pubkey(&self.beneficiary)
            .pubkey(&self.associated_token)
            .u64(self.nonce)
            .u64(self.funding_amount)
            .u64(self.rate_amount)
            .u64(self.rate_interval_in_seconds)
            .u64(self.start_utc)
            .u64(self.cliff_in_seconds)
            .u64(self.cliff_vest_amount)
            .u64(self.cliff_vest_percent)
            .u64(self.auto_pause_in_seconds)
            .u8(self.stream_bump)
            .u8(self.treasury_bump)
            .u8(self.authority_bump);
    }

    fn read(r: &mut ByteReader) -> Result<Self> {
        Ok(Self {
            memo: r.bytes32()?,
            beneficiary: r.pubkey()?,
            associated_token: r.pubkey()?,
            nonce: r.u64()?,
            funding_amount: r.u64()?,
            rate_amount: r.u64()?,
            rate_interval_in_seconds: r.u64()?,
            start_utc: r.u64()?,
            cliff_in_seconds: r.u64()?,
            cliff_vest_amount: r.u64()?,
            cliff_vest_percent: r.u64()?,
            auto_pause_in_seconds: r.u64()?,
            stream_bump: r.u8()?,
            treasury_bump: r.u8()?,
            authority_bump: r.u8()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MspInstruction {
    /// Creates a stream and its treasury, optionally funding it
    ///
    /// 0. `[signer, writable]` The treasurer account
    /// 1. `[writable]` The treasurer token account
    /// 2. `[]` The beneficiary account
    /// 3. `[]` The associated token mint
    /// 4. `[writable]` The stream account
    /// 5. `[writable]` The treasury account
    /// 6. `[]` The treasury authority account
    /// 7. `[writable]` The treasury token account
    /// 8. `[]` The token program
    /// 9. `[]` The system program
    CreateStream(CreateStreamParams),

    /// Adds funds to a stream, resuming it when requested
    ///
    /// 0. `[signer]` The contributor account
    /// 1. `[writable]` The contributor token account
    /// 2. `[writable]` The stream account
    /// 3. `[]` The treasury account
    /// 4. `[writable]` The treasury token account
    /// 5. `[]` The associated token mint
    /// 6. `[]` The token program
    AddFunds { amount: u64, resume: bool },

    /// Withdraws vested funds to the beneficiary
    ///
    /// 0. `[signer]` The beneficiary account
    /// 1. `[writable]` The beneficiary token account
    /// 2. `[writable]` The stream account
    /// 3. `[]` The treasury account
    /// 4. `[]` The treasury authority account
    /// 5. `[writable]` The treasury token account
    /// 6. `[]` The associated token mint
    /// 7. `[]` The token program
    Withdraw { amount: u64 },

    /// 0. `[signer]` The treasurer or the beneficiary
    /// 1. `[writable]` The stream account
    PauseStream,

    /// 0. `[signer]` The treasurer or the beneficiary
    /// 1. `[writable]` The stream account
    ResumeStream,

    /// 0. `[signer]` The treasurer or the beneficiary
    /// 1. `[writable]` The stream account
    ProposeUpdate { terms: StreamTerms },

    /// 0. `[signer]` The counterparty of the pending proposal
    /// 1. `[writable]` The stream account
    AnswerUpdate { approve: bool },

    /// Settles and closes a stream and its treasury
    ///
    /// 0. `[signer, writable]` The treasurer or the beneficiary
    /// 1. `[writable]` The stream account
    /// 2. `[writable]` The treasury account
    /// 3. `[]` The treasury authority account
    /// 4. `[writable]` The treasury token account
    /// 5. `[writable]` The beneficiary token account
    /// 6. `[writable]` The treasurer token account
    /// 7. `[writable]` The treasurer account
    /// 8. `[]` The associated token mint
    /// 9. `[]` The token program
    CloseStream,
}

impl MspInstruction {
    pub fn tag(&self) -> u8 {
        match self {
            MspInstruction::CreateStream(_) => 0,
            MspInstruction::AddFunds { .. } => 1,
            MspInstruction::Withdraw { .. } => 2,
            MspInstruction::PauseStream => 3,
            MspInstruction::ResumeStream => 4,
            MspInstruction::ProposeUpdate { .. } => 5,
            MspInstruction::AnswerUpdate { .. } => 6,
            MspInstruction::CloseStream => 7,
        }
    }

    pub fn action(&self) -> MspAction {
        match self {
            MspInstruction::CreateStream(_) => MspAction::CreateStream,
            MspInstruction::AddFunds { .. } => MspAction::AddFunds,
            MspInstruction::Withdraw { .. } => MspAction::Withdraw,
            MspInstruction::PauseStream => MspAction::PauseStream,
            MspInstruction::ResumeStream => MspAction::ResumeStream,
            MspInstruction::ProposeUpdate { .. } => MspAction::ProposeUpdate,
            MspInstruction::AnswerUpdate { .. } => MspAction::AnswerUpdate,
            MspInstruction::CloseStream => MspAction::CloseStream,
        }
    }

    /// Total payload length for `tag`, the tag byte included.
    pub fn span(tag: u8) -> Result<usize> {
        let span = match tag {
            0 => 1 + CreateStreamParams::LEN,
            1 => 1 + 8 + 1,
            2 => 1 + 8,
            3 | 4 | 7 => 1,
            5 => 1 + StreamTerms::LEN,
            6 => 1 + 1,
            _ => return Err(ErrorCode::UnknownInstruction.into()),
        };
        Ok(span)
    }

    pub fn pack(&self) -> Vec<u8> {
        let tag = self.tag();
        let span = Self::span(tag).unwrap_or(1);
        let mut w = ByteWriter::with_capacity(span);
        w.u8(tag);

        match self {
            MspInstruction::CreateStream(params) => params.write(&mut w),
            MspInstruction::AddFunds { amount, resume } => {
                w.u64(*amount).bool(*resume);
            }
            MspInstruction::Withdraw { amount } => {
                w.u64(*amount);
            }
            MspInstruction::ProposeUpdate { terms } => terms.write(&mut w),
            MspInstruction::AnswerUpdate { approve } => {
                w.bool(*approve);
            }
            MspInstruction::PauseStream
            | MspInstruction::ResumeStream
            | MspInstruction::CloseStream => {}
        }

        w.into_inner()
    }

    pub fn unpack(input: &[u8]) -> Result<Self> {
        let tag = *input.first().ok_or(ErrorCode::MalformedRecord)?;
        let mut r = ByteReader::exact(input, Self::span(tag)?)?;
        r.u8()?;

        Ok(match tag {
            0 => MspInstruction::CreateStream(CreateStreamParams::read(&mut r)?),
            1 => MspInstruction::AddFunds { amount: r.u64()?, resume: r.bool()? },
            2 => MspInstruction::Withdraw { amount: r.u64()? },
            3 => MspInstruction::PauseStream,
            4 => MspInstruction::ResumeStream,
            5 => MspInstruction::ProposeUpdate { terms: StreamTerms::read(&mut r)? },
            6 => MspInstruction::AnswerUpdate { approve: r.bool()? },
            7 => MspInstruction::CloseStream,
            _ => return Err(ErrorCode::UnknownInstruction.into()),
        })
    }
}

/// Builds `CreateStream`. The stream, treasury and authority addresses are
/// derived here and their bumps written into the payload.
pub fn create_stream(
    program_id: &Pubkey,
    treasurer: &Pubkey,
    treasurer_token: &Pubkey,
    mut params: CreateStreamParams,
) -> Result<Instruction> {
    let addresses = StreamAddresses::derive(treasurer, params.nonce, &params.associated_token, program_id)?;
    params.stream_bump = addresses.stream.bump;
    params.treasury_bump = addresses.treasury.bump;
    params.authority_bump = addresses.treasury_authority.bump;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*treasurer, true),
            AccountMeta::new(*treasurer_token, false),
            AccountMeta::new_readonly(params.beneficiary, false),
            AccountMeta::new_readonly(params.associated_token, false),
            AccountMeta::new(addresses.stream.address, false),
            AccountMeta::new(addresses.treasury.address, false),
            AccountMeta::new_readonly(addresses.treasury_authority.address, false),
            AccountMeta::new(addresses.treasury_token, false),
            AccountMeta::new_readonly(anchor_spl::token::ID, false),
            AccountMeta::new_readonly(anchor_lang::system_program::ID, false),
            AccountMeta::new(fee_treasury::ID, false),
        ],
        data: MspInstruction::CreateStream(params).pack(),
    })
}

pub fn add_funds(
    program_id: &Pubkey,
    contributor: &Pubkey,
    contributor_token: &Pubkey,
    stream_address: &Pubkey,
    stream: &Stream,
    amount: u64,
    resume: bool,
) -> Result<Instruction> {
    let mint = stream.terms.associated_token;
    let authority = find_treasury_authority_address(&stream.treasury_address, program_id)?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*contributor, true),
            AccountMeta::new(*contributor_token, false),
            AccountMeta::new(*stream_address, false),
            AccountMeta::new_readonly(stream.treasury_address, false),
            AccountMeta::new(treasury_token_address(&authority.address, &mint), false),
            AccountMeta::new_readonly(mint, false),
            AccountMeta::new_readonly(anchor_spl::token::ID, false),
            AccountMeta::new(fee_treasury::ID, false),
            AccountMeta::new_readonly(anchor_lang::system_program::ID, false),
        ],
        data: MspInstruction::AddFunds { amount, resume }.pack(),
    })
}

pub fn withdraw(
    program_id: &Pubkey,
    stream_address: &Pubkey,
    stream: &Stream,
    amount: u64,
) -> Result<Instruction> {
    let mint = stream.terms.associated_token;
    let authority = find_treasury_authority_address(&stream.treasury_address, program_id)?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(stream.beneficiary_address, true),
            AccountMeta::new(stream.beneficiary_associated_token, false),
            AccountMeta::new(*stream_address, false),
            AccountMeta::new_readonly(stream.treasury_address, false),
            AccountMeta::new_readonly(authority.address, false),
            AccountMeta::new(treasury_token_address(&authority.address, &mint), false),
            AccountMeta::new_readonly(mint, false),
            AccountMeta::new_readonly(anchor_spl::token::ID, false),
            AccountMeta::new(fee_treasury_token_address(&mint), false),
        ],
        data: MspInstruction::Withdraw { amount }.pack(),
    })
}

fn stream_party_instruction(
    program_id: &Pubkey,
    initiator: &Pubkey,
    stream_address: &Pubkey,
    instruction: MspInstruction,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*initiator, true),
            AccountMeta::new(*stream_address, false),
        ],
        data: instruction.pack(),
    }
}

pub fn pause_stream(program_id: &Pubkey, initiator: &Pubkey, stream_address: &Pubkey) -> Instruction {
    stream_party_instruction(program_id, initiator, stream_address, MspInstruction::PauseStream)
}

pub fn resume_stream(program_id: &Pubkey, initiator: &Pubkey, stream_address: &Pubkey) -> Instruction {
    stream_party_instruction(program_id, initiator, stream_address, MspInstruction::ResumeStream)
}

pub fn propose_update(
    program_id: &Pubkey,
    initiator: &Pubkey,
    stream_address: &Pubkey,
    terms: StreamTerms,
) -> Instruction {
    stream_party_instruction(program_id, initiator, stream_address, MspInstruction::ProposeUpdate { terms })
}

pub fn answer_update(
    program_id: &Pubkey,
    initiator: &Pubkey,
    stream_address: &Pubkey,
    approve: bool,
) -> Instruction {
    stream_party_instruction(program_id, initiator, stream_address, MspInstruction::AnswerUpdate { approve })
}

pub fn close_stream(
    program_id: &Pubkey,
    initiator: &Pubkey,
    stream_address: &Pubkey,
    stream: &Stream,
) -> Result<Instruction> {
    let mint = stream.terms.associated_token;
    let authority = find_treasury_authority_address(&stream.treasury_address, program_id)?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*initiator, true),
            AccountMeta::new(*stream_address, false),
            AccountMeta::new(stream.treasury_address, false),
            AccountMeta::new_readonly(authority.address, false),
            AccountMeta::new(treasury_token_address(&authority.address, &mint), false),
            AccountMeta::new(stream.beneficiary_associated_token, false),
            AccountMeta::new(
                anchor_spl::associated_token::get_associated_token_address(&stream.treasurer_address, &mint),
                false,
            ),
            AccountMeta::new(stream.treasurer_address, false),
            AccountMeta::new_readonly(mint, false),
            AccountMeta::new_readonly(anchor_spl::token::ID, false),
            AccountMeta::new(fee_treasury::ID, false),
            AccountMeta::new(fee_treasury_token_address(&mint), false),
            AccountMeta::new_readonly(anchor_lang::system_program::ID, false),
        ],
        data: MspInstruction::CloseStream.pack(),
    })
}
