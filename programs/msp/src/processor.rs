//! Applies decoded instructions to real accounts. Account checks happen
//! before any state transition; token movements happen after it, so a failing
//! transition never leaves a CPI behind.

use std::slice::Iter;

use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_pack::Pack;
use anchor_spl::associated_token::get_associated_token_address;

use crate::constants::*;
use crate::errors::ErrorCode;
use crate::events::*;
use crate::instruction::{CreateStreamParams, MspInstruction};
use crate::lifecycle::clock_timestamp;
use crate::pda::*;
use crate::stream::Stream;
use crate::terms::StreamTerms;
use crate::treasury::Treasury;
use crate::utils::*;

pub struct Processor;

impl Processor {
    pub fn process<'info>(program_id: &Pubkey, accounts: &[AccountInfo<'info>], input: &[u8]) -> Result<()> {
        let instruction = MspInstruction::unpack(input)?;
        let clock = Clock::get()?;
        Self::process_instruction(program_id, accounts, instruction, &clock)
    }

    /// Dispatches an already decoded instruction at the given clock
    pub fn process_instruction<'info>(
        program_id: &Pubkey,
        accounts: &[AccountInfo<'info>],
        instruction: MspInstruction,
        clock: &Clock,
    ) -> Result<()> {
        msg!("instruction: {0:?}, clock: {1}", instruction.action(), clock.unix_timestamp);

        match instruction {
            MspInstruction::CreateStream(params) => Self::process_create_stream(program_id, accounts, params, clock),
            MspInstruction::AddFunds { amount, resume } => {
                Self::process_add_funds(program_id, accounts, amount, resume, clock)
            }
            MspInstruction::Withdraw { amount } => Self::process_withdraw(program_id, accounts, amount, clock),
            MspInstruction::PauseStream => Self::process_pause_stream(program_id, accounts, clock),
            MspInstruction::ResumeStream => Self::process_resume_stream(program_id, accounts, clock),
            MspInstruction::ProposeUpdate { terms } => Self::process_propose_update(program_id, accounts, terms, clock),
            MspInstruction::AnswerUpdate { approve } => {
                Self::process_answer_update(program_id, accounts, approve, clock)
            }
            MspInstruction::CloseStream => Self::process_close_stream(program_id, accounts, clock),
        }
    }

    fn process_create_stream<'info>(
        program_id: &Pubkey,
        accounts: &[AccountInfo<'info>],
        params: CreateStreamParams,
        clock: &Clock,
    ) -> Result<()> {
        let account_info_iter = &mut accounts.iter();
        let treasurer_info = next_account(account_info_iter)?;
        let treasurer_token_info = next_account(account_info_iter)?;
        let beneficiary_info = next_account(account_info_iter)?;
        let mint_info = next_account(account_info_iter)?;
        let stream_info = next_account(account_info_iter)?;
        let treasury_info = next_account(account_info_iter)?;
        let treasury_authority_info = next_account(account_info_iter)?;
        let treasury_token_info = next_account(account_info_iter)?;
        let token_program_info = next_account(account_info_iter)?;
        let system_program_info = next_account(account_info_iter)?;
        let fee_treasury_info = next_account(account_info_iter)?;

        check_signer(treasurer_info)?;
        check_token_program(token_program_info)?;
        check_system_program(system_program_info)?;
        check_fee_treasury(fee_treasury_info)?;
        if *mint_info.key != params.associated_token {
            return Err(ErrorCode::InvalidAssociatedToken.into());
        }
        if *beneficiary_info.key != params.beneficiary {
            return Err(ErrorCode::InvalidBeneficiary.into());
        }

        // bumps in the payload must be the canonical ones
        let stream_pda = find_stream_address(treasurer_info.key, params.nonce, program_id)?;
        if stream_pda.address != *stream_info.key {
            return Err(ErrorCode::InvalidStream.into());
        }
        let treasury_pda = find_treasury_address(stream_info.key, program_id)?;
        if treasury_pda.address != *treasury_info.key {
            return Err(ErrorCode::InvalidTreasury.into());
        }
        let authority_pda = find_treasury_authority_address(treasury_info.key, program_id)?;
        if authority_pda.address != *treasury_authority_info.key {
            return Err(ErrorCode::InvalidTreasuryAuthority.into());
        }
        if stream_pda.bump != params.stream_bump
            || treasury_pda.bump != params.treasury_bump
            || authority_pda.bump != params.authority_bump
        {
            return Err(ErrorCode::InvalidSeeds.into());
        }
        if treasury_token_address(treasury_authority_info.key, mint_info.key) != *treasury_token_info.key {
            return Err(ErrorCode::InvalidTokenAccount.into());
        }

        let stream = Stream::create(
            treasurer_info.key,
            &params,
            get_associated_token_address(beneficiary_info.key, mint_info.key),
            *treasury_info.key,
            clock,
        )?;
        let now = clock_timestamp(clock);
        let treasury = Treasury {
            initialized: true,
            bump: params.treasury_bump,
            authority_bump: params.authority_bump,
            stream_address: *stream_info.key,
            associated_token_address: *mint_info.key,
            treasury_token_address: *treasury_token_info.key,
            created_on_utc: now,
        };

        create_program_account(
            treasurer_info,
            stream_info,
            &[STREAM_SEED, treasurer_info.key.as_ref(), &params.nonce.to_le_bytes(), &[params.stream_bump]],
            Stream::LEN,
            system_program_info,
            program_id,
        )?;
        create_program_account(
            treasurer_info,
            treasury_info,
            &[TREASURY_SEED, stream_info.key.as_ref(), &[params.treasury_bump]],
            Treasury::LEN,
            system_program_info,
            program_id,
        )?;

        if params.funding_amount > 0 {
            let decimals = get_mint_decimals(mint_info)?;
            transfer_token_amount(
                treasurer_token_info,
                treasury_token_info,
                treasurer_info,
                mint_info,
                token_program_info,
                params.funding_amount,
                decimals,
            )?;
        }

        transfer_sol_amount(treasurer_info, fee_treasury_info, system_program_info, CREATE_STREAM_FLAT_FEE)?;

        save_stream(stream_info, &stream)?;
        Treasury::pack(treasury, &mut treasury_info.try_borrow_mut_data()?)?;

        emit!(CreateStreamEvent {
            timestamp: now,
            stream_start_ts: stream.start_utc,
            stream_rate_amount: stream.terms.rate_amount,
            stream_rate_interval: stream.terms.rate_interval_in_seconds,
            stream_funding: stream.total_deposits,
            stream_cliff: stream.primitive_get_cliff_units(),
            stream: *stream_info.key,
            treasury: *treasury_info.key,
        });

        Ok(())
    }

    fn process_add_funds<'info>(
        program_id: &Pubkey,
        accounts: &[AccountInfo<'info>],
        amount: u64,
        resume: bool,
        clock: &Clock,
    ) -> Result<()> {
        let account_info_iter = &mut accounts.iter();
        let contributor_info = next_account(account_info_iter)?;
        let contributor_token_info = next_account(account_info_iter)?;
        let stream_info = next_account(account_info_iter)?;
        let treasury_info = next_account(account_info_iter)?;
        let treasury_token_info = next_account(account_info_iter)?;
        let mint_info = next_account(account_info_iter)?;
        let token_program_info = next_account(account_info_iter)?;
        let fee_treasury_info = next_account(account_info_iter)?;
        let system_program_info = next_account(account_info_iter)?;

        check_signer(contributor_info)?;
        check_token_program(token_program_info)?;
        check_system_program(system_program_info)?;
        check_fee_treasury(fee_treasury_info)?;

        let mut stream = load_stream(program_id, stream_info)?;
        let treasury = load_treasury(program_id, treasury_info, stream_info.key, &stream)?;
        check_mint(mint_info, &stream)?;
        if *treasury_token_info.key != treasury.treasury_token_address {
            return Err(ErrorCode::InvalidTokenAccount.into());
        }

        let was_paused = stream.primitive_is_manually_paused();
        stream.add_funds(contributor_info.key, amount, resume, clock)?;

        let decimals = get_mint_decimals(mint_info)?;
        transfer_token_amount(
            contributor_token_info,
            treasury_token_info,
            contributor_info,
            mint_info,
            token_program_info,
            amount,
            decimals,
        )?;
        transfer_sol_amount(contributor_info, fee_treasury_info, system_program_info, ADD_FUNDS_FLAT_FEE)?;

        save_stream(stream_info, &stream)?;

        emit!(AddFundsEvent {
            timestamp: clock_timestamp(clock),
            amount,
            resumed: was_paused && !stream.primitive_is_manually_paused(),
            stream_total_deposits_after: stream.total_deposits,
            stream_total_seconds_in_paused_status_after: stream.total_seconds_in_paused_status,
            contributor: *contributor_info.key,
            stream: *stream_info.key,
        });

        Ok(())
    }

    fn process_withdraw<'info>(
        program_id: &Pubkey,
        accounts: &[AccountInfo<'info>],
        amount: u64,
        clock: &Clock,
    ) -> Result<()> {
        let account_info_iter = &mut accounts.iter();
        let beneficiary_info = next_account(account_info_iter)?;
        let beneficiary_token_info = next_account(account_info_iter)?;
        let stream_info = next_account(account_info_iter)?;
        let treasury_info = next_account(account_info_iter)?;
        let treasury_authority_info = next_account(account_info_iter)?;
        let treasury_token_info = next_account(account_info_iter)?;
        let mint_info = next_account(account_info_iter)?;
        let token_program_info = next_account(account_info_iter)?;
        let fee_treasury_token_info = next_account(account_info_iter)?;

        check_signer(beneficiary_info)?;
        check_token_program(token_program_info)?;
        check_fee_treasury_token(fee_treasury_token_info, mint_info)?;

        let mut stream = load_stream(program_id, stream_info)?;
        let treasury = load_treasury(program_id, treasury_info, stream_info.key, &stream)?;
        check_treasury_authority(program_id, treasury_authority_info, treasury_info.key, &treasury)?;
        check_mint(mint_info, &stream)?;
        if *treasury_token_info.key != treasury.treasury_token_address
            || *beneficiary_token_info.key != stream.beneficiary_associated_token
        {
            return Err(ErrorCode::InvalidTokenAccount.into());
        }

        let now = clock_timestamp(clock);
        let withdrawable_before = stream.get_beneficiary_withdrawable_amount(now);
        stream.withdraw(beneficiary_info.key, amount, clock)?;

        let signer = TreasurySigner {
            treasury: treasury_info.key,
            authority: treasury_authority_info,
            authority_bump: treasury.authority_bump,
            treasury_token: treasury_token_info,
            mint: mint_info,
            token_program: token_program_info,
        };
        let split = split_percent_fee(amount, WITHDRAW_PERCENT_FEE);
        let decimals = get_mint_decimals(mint_info)?;
        signer.transfer(beneficiary_token_info, split.net, decimals)?;
        if split.fee > 0 {
            signer.transfer(fee_treasury_token_info, split.fee, decimals)?;
        }

        save_stream(stream_info, &stream)?;

        emit!(StreamWithdrawEvent {
            timestamp: now,
            amount,
            fee_amount: split.fee,
            stream_withdrawable_before: withdrawable_before,
            stream_is_manually_paused: stream.primitive_is_manually_paused(),
            stream_total_withdrawals_after: stream.total_withdrawals,
            stream: *stream_info.key,
            treasury: *treasury_info.key,
        });

        Ok(())
    }

    fn process_pause_stream<'info>(program_id: &Pubkey, accounts: &[AccountInfo<'info>], clock: &Clock) -> Result<()> {
        let (initiator_info, stream_info) = party_accounts(accounts)?;
        let mut stream = load_stream(program_id, stream_info)?;

        stream.pause(initiator_info.key, clock)?;
        save_stream(stream_info, &stream)?;

        emit!(StreamPauseEvent {
            timestamp: clock_timestamp(clock),
            stream_vested_snapshot_after: stream.vested_snapshot_units,
            initiator: *initiator_info.key,
            stream: *stream_info.key,
        });
        Ok(())
    }

    fn process_resume_stream<'info>(program_id: &Pubkey, accounts: &[AccountInfo<'info>], clock: &Clock) -> Result<()> {
        let (initiator_info, stream_info) = party_accounts(accounts)?;
        let mut stream = load_stream(program_id, stream_info)?;

        let was_manually_paused = stream.primitive_is_manually_paused();
        stream.resume(initiator_info.key, clock)?;
        save_stream(stream_info, &stream)?;

        emit!(StreamResumeEvent {
            timestamp: clock_timestamp(clock),
            stream_total_seconds_in_paused_status_after: stream.total_seconds_in_paused_status,
            stream_was_manually_paused: was_manually_paused,
            initiator: *initiator_info.key,
            stream: *stream_info.key,
        });
        Ok(())
    }

    fn process_propose_update<'info>(
        program_id: &Pubkey,
        accounts: &[AccountInfo<'info>],
        terms: StreamTerms,
        clock: &Clock,
    ) -> Result<()> {
        let (initiator_info, stream_info) = party_accounts(accounts)?;
        let mut stream = load_stream(program_id, stream_info)?;

        stream.propose_update(initiator_info.key, terms)?;
        save_stream(stream_info, &stream)?;

        let counterparty = stream
            .pending_update
            .proposal()
            .map(|proposal| proposal.counterparty)
            .unwrap_or_default();
        emit!(ProposeUpdateEvent {
            timestamp: clock_timestamp(clock),
            proposed_rate_amount: terms.rate_amount,
            proposed_rate_interval: terms.rate_interval_in_seconds,
            proposed_cliff_vest_amount: terms.cliff_vest_amount,
            proposed_cliff_vest_percent: terms.cliff_vest_percent,
            proposed_by: *initiator_info.key,
            counterparty,
            stream: *stream_info.key,
        });
        Ok(())
    }

    fn process_answer_update<'info>(
        program_id: &Pubkey,
        accounts: &[AccountInfo<'info>],
        approve: bool,
        clock: &Clock,
    ) -> Result<()> {
        let (initiator_info, stream_info) = party_accounts(accounts)?;
        let mut stream = load_stream(program_id, stream_info)?;

        stream.answer_update(initiator_info.key, approve, clock)?;
        save_stream(stream_info, &stream)?;

        emit!(AnswerUpdateEvent {
            timestamp: clock_timestamp(clock),
            approved: approve,
            answered_by: *initiator_info.key,
            stream: *stream_info.key,
        });
        Ok(())
    }

    fn process_close_stream<'info>(program_id: &Pubkey, accounts: &[AccountInfo<'info>], clock: &Clock) -> Result<()> {
        let account_info_iter = &mut accounts.iter();
        let initiator_info = next_account(account_info_iter)?;
        let stream_info = next_account(account_info_iter)?;
        let treasury_info = next_account(account_info_iter)?;
        let treasury_authority_info = next_account(account_info_iter)?;
        let treasury_token_info = next_account(account_info_iter)?;
        let beneficiary_token_info = next_account(account_info_iter)?;
        let treasurer_token_info = next_account(account_info_iter)?;
        let treasurer_info = next_account(account_info_iter)?;
        let mint_info = next_account(account_info_iter)?;
        let token_program_info = next_account(account_info_iter)?;
        let fee_treasury_info = next_account(account_info_iter)?;
        let fee_treasury_token_info = next_account(account_info_iter)?;
        let system_program_info = next_account(account_info_iter)?;

        check_signer(initiator_info)?;
        check_token_program(token_program_info)?;
        check_system_program(system_program_info)?;
        check_fee_treasury(fee_treasury_info)?;
        check_fee_treasury_token(fee_treasury_token_info, mint_info)?;

        let mut stream = load_stream(program_id, stream_info)?;
        let treasury = load_treasury(program_id, treasury_info, stream_info.key, &stream)?;
        check_treasury_authority(program_id, treasury_authority_info, treasury_info.key, &treasury)?;
        check_mint(mint_info, &stream)?;
        if *treasurer_info.key != stream.treasurer_address {
            return Err(ErrorCode::Unauthorized.into());
        }
        if *treasury_token_info.key != treasury.treasury_token_address
            || *beneficiary_token_info.key != stream.beneficiary_associated_token
            || *treasurer_token_info.key != get_associated_token_address(treasurer_info.key, mint_info.key)
        {
            return Err(ErrorCode::InvalidTokenAccount.into());
        }

        let settlement = stream.close(initiator_info.key, clock)?;

        let decimals = get_mint_decimals(mint_info)?;
        let signer = TreasurySigner {
            treasury: treasury_info.key,
            authority: treasury_authority_info,
            authority_bump: treasury.authority_bump,
            treasury_token: treasury_token_info,
            mint: mint_info,
            token_program: token_program_info,
        };

        let split = split_percent_fee(settlement.beneficiary_amount, CLOSE_STREAM_PERCENT_FEE);
        if split.net > 0 {
            signer.transfer(beneficiary_token_info, split.net, decimals)?;
        }
        if split.fee > 0 {
            signer.transfer(fee_treasury_token_info, split.fee, decimals)?;
        }
        // whatever is left in escrow goes back to the treasurer, including
        // tokens sent to the escrow outside of add funds
        let remaining = get_token_balance(treasury_token_info)?;
        if remaining > 0 {
            signer.transfer(treasurer_token_info, remaining, decimals)?;
        }
        signer.close(treasurer_info)?;
        transfer_sol_amount(initiator_info, fee_treasury_info, system_program_info, CLOSE_STREAM_FLAT_FEE)?;

        save_stream(stream_info, &stream)?;
        close_program_account(treasury_info, treasurer_info)?;
        close_program_account(stream_info, treasurer_info)?;

        emit!(CloseStreamEvent {
            timestamp: clock_timestamp(clock),
            token_amount_sent_to_beneficiary: split.net,
            fee_amount: split.fee,
            token_amount_returned_to_treasurer: remaining,
            stream_total_deposits: stream.total_deposits,
            stream_total_withdrawals_after: stream.total_withdrawals,
            initiator: *initiator_info.key,
            stream: *stream_info.key,
            treasury: *treasury_info.key,
        });

        Ok(())
    }
}

fn next_account<'a, 'info>(iter: &mut Iter<'a, AccountInfo<'info>>) -> Result<&'a AccountInfo<'info>> {
    iter.next().ok_or_else(|| ErrorCode::NotEnoughAccountKeys.into())
}

fn check_signer(account: &AccountInfo) -> Result<()> {
    if !account.is_signer {
        return Err(ErrorCode::MissingSignature.into());
    }
    Ok(())
}

fn check_token_program(account: &AccountInfo) -> Result<()> {
    if *account.key != anchor_spl::token::ID {
        return Err(ProgramError::IncorrectProgramId.into());
    }
    Ok(())
}

fn check_system_program(account: &AccountInfo) -> Result<()> {
    if *account.key != anchor_lang::system_program::ID {
        return Err(ProgramError::IncorrectProgramId.into());
    }
    Ok(())
}

fn check_fee_treasury(account: &AccountInfo) -> Result<()> {
    if *account.key != fee_treasury::ID {
        return Err(ErrorCode::InvalidFeeTreasuryAccount.into());
    }
    Ok(())
}

/// The fee treasury's token account for `mint` must already exist
fn check_fee_treasury_token(account: &AccountInfo, mint: &AccountInfo) -> Result<()> {
    if *account.key != fee_treasury_token_address(mint.key) {
        return Err(ErrorCode::InvalidFeeTreasuryAccount.into());
    }
    Ok(())
}

fn check_mint(mint: &AccountInfo, stream: &Stream) -> Result<()> {
    if *mint.key != stream.terms.associated_token {
        return Err(ErrorCode::InvalidAssociatedToken.into());
    }
    Ok(())
}

/// The signer and the stream of the two-account instructions
fn party_accounts<'a, 'info>(
    accounts: &'a [AccountInfo<'info>],
) -> Result<(&'a AccountInfo<'info>, &'a AccountInfo<'info>)> {
    let account_info_iter = &mut accounts.iter();
    let initiator_info = next_account(account_info_iter)?;
    let stream_info = next_account(account_info_iter)?;
    check_signer(initiator_info)?;
    Ok((initiator_info, stream_info))
}

/// Decodes a stream owned by this program and checks it lives at its
/// derived address
fn load_stream(program_id: &Pubkey, stream_info: &AccountInfo) -> Result<Stream> {
    if stream_info.owner != program_id {
        return Err(ErrorCode::InvalidOwner.into());
    }
    let stream = Stream::decode(&stream_info.try_borrow_data()?)?;
    if !stream.initialized {
        return Err(ErrorCode::StreamNotInitialized.into());
    }
    let address = create_stream_address(&stream.treasurer_address, stream.nonce, stream.bump, program_id)?;
    if address != *stream_info.key {
        return Err(ErrorCode::InvalidStream.into());
    }
    Ok(stream)
}

fn save_stream(stream_info: &AccountInfo, stream: &Stream) -> Result<()> {
    Stream::pack(*stream, &mut stream_info.try_borrow_mut_data()?)?;
    Ok(())
}

fn load_treasury(
    program_id: &Pubkey,
    treasury_info: &AccountInfo,
    stream_address: &Pubkey,
    stream: &Stream,
) -> Result<Treasury> {
    if treasury_info.owner != program_id {
        return Err(ErrorCode::InvalidOwner.into());
    }
    if *treasury_info.key != stream.treasury_address {
        return Err(ErrorCode::InvalidTreasury.into());
    }
    let treasury = Treasury::decode(&treasury_info.try_borrow_data()?)?;
    treasury.validate_for(stream_address, &stream.terms.associated_token)?;
    Ok(treasury)
}

fn check_treasury_authority(
    program_id: &Pubkey,
    authority_info: &AccountInfo,
    treasury_address: &Pubkey,
    treasury: &Treasury,
) -> Result<()> {
    let authority = create_treasury_authority_address(treasury_address, treasury.authority_bump, program_id)?;
    if authority != *authority_info.key {
        return Err(ErrorCode::InvalidTreasuryAuthority.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::StreamState;
    use crate::lifecycle::tests::{clock_at, create_params, new_stream};
    use crate::vesting::tests::T0;

    struct TestAccount {
        key: Pubkey,
        owner: Pubkey,
        lamports: u64,
        data: Vec<u8>,
        is_signer: bool,
    }

    impl TestAccount {
        fn info(&mut self) -> AccountInfo<'_> {
            AccountInfo::new(
                &self.key,
                self.is_signer,
                true,
                &mut self.lamports,
                &mut self.data,
                &self.owner,
                false,
                0,
            )
        }
    }

    /// A stream record stored at its derived address
    fn stored_stream() -> (TestAccount, Stream, Pubkey, Pubkey) {
        let program_id = crate::ID;
        let (mut stream, treasurer, beneficiary) = new_stream();
        let derived = find_stream_address(&treasurer, stream.nonce, &program_id).unwrap();
        stream.bump = derived.bump;
        let account = TestAccount {
            key: derived.address,
            owner: program_id,
            lamports: 1,
            data: stream.to_bytes(),
            is_signer: false,
        };
        (account, stream, treasurer, beneficiary)
    }

    fn signer(key: Pubkey) -> TestAccount {
        TestAccount { key, owner: Pubkey::default(), lamports: 0, data: vec![], is_signer: true }
    }

    #[test]
    fn pause_and_resume_through_the_processor() {
        let program_id = crate::ID;
        let (mut stream_account, _, treasurer, _) = stored_stream();
        let mut initiator = signer(treasurer);

        let accounts = vec![initiator.info(), stream_account.info()];
        Processor::process_instruction(&program_id, &accounts, MspInstruction::PauseStream, &clock_at(T0 + 1800))
            .unwrap();
        let paused = Stream::decode(&accounts[1].try_borrow_data().unwrap()).unwrap();
        assert_eq!(paused.state, StreamState::Paused);
        assert_eq!(paused.vested_snapshot_units, 50);

        let err = Processor::process_instruction(
            &program_id,
            &accounts,
            MspInstruction::PauseStream,
            &clock_at(T0 + 1900),
        )
        .unwrap_err();
        assert_eq!(err, ErrorCode::AlreadyPaused.into());

        Processor::process_instruction(&program_id, &accounts, MspInstruction::ResumeStream, &clock_at(T0 + 5400))
            .unwrap();
        let resumed = Stream::decode(&accounts[1].try_borrow_data().unwrap()).unwrap();
        assert_eq!(resumed.state, StreamState::Active);
        assert_eq!(resumed.vesting(T0 + 7200).vested, 100);
    }

    #[test]
    fn negotiation_through_the_processor() {
        let program_id = crate::ID;
        let (mut stream_account, stream, treasurer, beneficiary) = stored_stream();
        let mut treasurer_account = signer(treasurer);
        let mut beneficiary_account = signer(beneficiary);
        let stream_info = stream_account.info();
        let treasurer_info = treasurer_account.info();
        let beneficiary_info = beneficiary_account.info();

        let terms = StreamTerms { rate_amount: 500, ..stream.terms };
        Processor::process_instruction(
            &program_id,
            &[treasurer_info.clone(), stream_info.clone()],
            MspInstruction::ProposeUpdate { terms },
            &clock_at(T0),
        )
        .unwrap();

        let err = Processor::process_instruction(
            &program_id,
            &[treasurer_info, stream_info.clone()],
            MspInstruction::AnswerUpdate { approve: true },
            &clock_at(T0 + 10),
        )
        .unwrap_err();
        assert_eq!(err, ErrorCode::Unauthorized.into());

        Processor::process_instruction(
            &program_id,
            &[beneficiary_info, stream_info.clone()],
            MspInstruction::AnswerUpdate { approve: true },
            &clock_at(T0 + 10),
        )
        .unwrap();
        let updated = Stream::decode(&stream_info.try_borrow_data().unwrap()).unwrap();
        assert_eq!(updated.terms, terms);
        assert!(!updated.pending_update.is_pending());
    }

    #[test]
    fn account_checks_come_first() {
        let program_id = crate::ID;
        let (mut stream_account, _, treasurer, _) = stored_stream();

        // unsigned initiator
        let mut initiator = signer(treasurer);
        initiator.is_signer = false;
        let err = Processor::process_instruction(
            &program_id,
            &[initiator.info(), stream_account.info()],
            MspInstruction::PauseStream,
            &clock_at(T0),
        )
        .unwrap_err();
        assert_eq!(err, ErrorCode::MissingSignature.into());

        // missing accounts
        let mut initiator = signer(treasurer);
        let err = Processor::process_instruction(
            &program_id,
            &[initiator.info()],
            MspInstruction::PauseStream,
            &clock_at(T0),
        )
        .unwrap_err();
        assert_eq!(err, ErrorCode::NotEnoughAccountKeys.into());

        // record owned by someone else
        stream_account.owner = Pubkey::new_unique();
        let err = Processor::process_instruction(
            &program_id,
            &[initiator.info(), stream_account.info()],
            MspInstruction::PauseStream,
            &clock_at(T0),
        )
        .unwrap_err();
        assert_eq!(err, ErrorCode::InvalidOwner.into());

        // record at an address it does not derive to
        stream_account.owner = program_id;
        stream_account.key = Pubkey::new_unique();
        let err = Processor::process_instruction(
            &program_id,
            &[initiator.info(), stream_account.info()],
            MspInstruction::PauseStream,
            &clock_at(T0),
        )
        .unwrap_err();
        assert_eq!(err, ErrorCode::InvalidStream.into());

        // truncated record
        let (mut stream_account, _, _, _) = stored_stream();
        stream_account.data.truncate(100);
        let err = Processor::process_instruction(
            &program_id,
            &[initiator.info(), stream_account.info()],
            MspInstruction::PauseStream,
            &clock_at(T0),
        )
        .unwrap_err();
        assert_eq!(err, ErrorCode::MalformedRecord.into());
    }

    /// Accounts of a withdraw against `stream`, with the treasury and the
    /// fee treasury token account supplied by the caller
    fn withdraw_accounts(stream: &Stream, treasury: Pubkey, fee_treasury_token: Pubkey) -> Vec<TestAccount> {
        let account = |key: Pubkey| TestAccount {
            key,
            owner: crate::ID,
            lamports: 1,
            data: vec![0; Treasury::LEN],
            is_signer: false,
        };
        vec![
            signer(stream.beneficiary_address),
            account(stream.beneficiary_associated_token),
            account(Pubkey::default()),
            account(treasury),
            account(Pubkey::new_unique()),
            account(Pubkey::new_unique()),
            account(stream.terms.associated_token),
            account(anchor_spl::token::ID),
            account(fee_treasury_token),
        ]
    }

    #[test]
    fn withdraw_rejects_a_foreign_treasury_before_moving_tokens() {
        let program_id = crate::ID;
        let (mut stream_account, stream, _, _) = stored_stream();
        let fee_treasury_token = fee_treasury_token_address(&stream.terms.associated_token);
        let mut others = withdraw_accounts(&stream, Pubkey::new_unique(), fee_treasury_token);

        let mut accounts: Vec<AccountInfo> = others.iter_mut().map(|a| a.info()).collect();
        accounts[2] = stream_account.info();
        let err = Processor::process_instruction(
            &program_id,
            &accounts,
            MspInstruction::Withdraw { amount: 10 },
            &clock_at(T0 + 1800),
        )
        .unwrap_err();
        assert_eq!(err, ErrorCode::InvalidTreasury.into());
        assert_eq!(Stream::decode(&accounts[2].try_borrow_data().unwrap()).unwrap(), stream);
    }

    #[test]
    fn withdraw_rejects_a_foreign_fee_account() {
        let program_id = crate::ID;
        let (mut stream_account, stream, _, _) = stored_stream();
        let mut others = withdraw_accounts(&stream, stream.treasury_address, Pubkey::new_unique());

        let mut accounts: Vec<AccountInfo> = others.iter_mut().map(|a| a.info()).collect();
        accounts[2] = stream_account.info();
        let err = Processor::process_instruction(
            &program_id,
            &accounts,
            MspInstruction::Withdraw { amount: 10 },
            &clock_at(T0 + 1800),
        )
        .unwrap_err();
        assert_eq!(err, ErrorCode::InvalidFeeTreasuryAccount.into());

        // one account short of the fee treasury token account
        let err = Processor::process_instruction(
            &program_id,
            &accounts[..8],
            MspInstruction::Withdraw { amount: 10 },
            &clock_at(T0 + 1800),
        )
        .unwrap_err();
        assert_eq!(err, ErrorCode::NotEnoughAccountKeys.into());
    }

    fn run_create(keys: &[Pubkey], treasurer: Pubkey, params: CreateStreamParams) -> Result<()> {
        let mut accounts: Vec<TestAccount> = keys
            .iter()
            .map(|key| TestAccount {
                key: *key,
                owner: anchor_lang::system_program::ID,
                lamports: 0,
                data: vec![],
                is_signer: *key == treasurer,
            })
            .collect();
        let infos: Vec<AccountInfo> = accounts.iter_mut().map(|a| a.info()).collect();
        Processor::process_instruction(&crate::ID, &infos, MspInstruction::CreateStream(params), &clock_at(T0))
    }

    #[test]
    fn create_insists_on_canonical_bumps() {
        let program_id = crate::ID;
        let treasurer = Pubkey::new_unique();
        let mut params = create_params(Pubkey::new_unique());
        let addresses = StreamAddresses::derive(&treasurer, params.nonce, &params.associated_token, &program_id).unwrap();
        params.stream_bump = addresses.stream.bump;
        params.treasury_bump = addresses.treasury.bump;
        params.authority_bump = addresses.treasury_authority.bump;

        let keys = [
            treasurer,
            Pubkey::new_unique(),
            params.beneficiary,
            params.associated_token,
            addresses.stream.address,
            addresses.treasury.address,
            addresses.treasury_authority.address,
            addresses.treasury_token,
            anchor_spl::token::ID,
            anchor_lang::system_program::ID,
            fee_treasury::ID,
        ];

        // right accounts, non-canonical bump in the payload
        let mut tampered = params;
        tampered.authority_bump = params.authority_bump.wrapping_sub(1);
        assert_eq!(run_create(&keys, treasurer, tampered).unwrap_err(), ErrorCode::InvalidSeeds.into());

        // an address derived from a lower bump is a different account
        let (bump, address) = (0..addresses.stream.bump)
            .rev()
            .find_map(|bump| {
                create_stream_address(&treasurer, params.nonce, bump, &program_id)
                    .ok()
                    .map(|address| (bump, address))
            })
            .unwrap();
        let mut shadow_keys = keys;
        shadow_keys[4] = address;
        let mut shadow = params;
        shadow.stream_bump = bump;
        assert_eq!(run_create(&shadow_keys, treasurer, shadow).unwrap_err(), ErrorCode::InvalidStream.into());

        let mut wrong_fee_keys = keys;
        wrong_fee_keys[10] = Pubkey::new_unique();
        assert_eq!(
            run_create(&wrong_fee_keys, treasurer, params).unwrap_err(),
            ErrorCode::InvalidFeeTreasuryAccount.into()
        );
    }
}
