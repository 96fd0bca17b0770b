use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_pack::Pack;
use anchor_lang::system_program::{
    allocate, assign, create_account, transfer, Allocate, Assign, CreateAccount, Transfer,
};
use anchor_spl::token::{close_account, transfer_checked, CloseAccount, TransferChecked};

use crate::constants::*;
use crate::errors::ErrorCode;

/// How a derived address gets turned into a program owned account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountCreation {
    /// Nothing lives at the address yet
    Create { lamports: u64 },
    /// Someone already sent lamports to the address. The account is adopted
    /// after topping it up to the rent exempt minimum.
    Adopt { shortfall: u64 },
}

impl AccountCreation {
    pub fn plan(new_account: &AccountInfo, rent_exempt_lamports: u64) -> Result<Self> {
        if !new_account.data_is_empty() {
            return Err(ErrorCode::StreamAlreadyInitialized.into());
        }
        let current = new_account.lamports();
        if current == 0 {
            return Ok(AccountCreation::Create { lamports: rent_exempt_lamports });
        }
        if *new_account.owner != anchor_lang::system_program::ID {
            return Err(ErrorCode::StreamAlreadyInitialized.into());
        }
        Ok(AccountCreation::Adopt { shortfall: rent_exempt_lamports.saturating_sub(current) })
    }
}

/// Creates a program owned account at a derived address, paid by `payer`
pub fn create_program_account<'info>(
    payer: &AccountInfo<'info>,
    new_account: &AccountInfo<'info>,
    signer_seeds: &[&[u8]],
    space: usize,
    system_program: &AccountInfo<'info>,
    program_id: &Pubkey,
) -> Result<()> {
    let rent_exempt_lamports = Rent::get()?.minimum_balance(space);
    let plan = AccountCreation::plan(new_account, rent_exempt_lamports)?;
    msg!("space: {0}, rent_exempt_lamports: {1}, plan: {2:?}", space, rent_exempt_lamports, plan);

    let signer = &[signer_seeds];
    match plan {
        AccountCreation::Create { lamports } => {
            let cpi_accounts = CreateAccount { from: payer.clone(), to: new_account.clone() };
            let cpi_ctx = CpiContext::new_with_signer(system_program.clone(), cpi_accounts, signer);
            create_account(cpi_ctx, lamports, space as u64, program_id)
        }
        AccountCreation::Adopt { shortfall } => {
            if shortfall > 0 {
                transfer_sol_amount(payer, new_account, system_program, shortfall)?;
            }

            let cpi_accounts = Allocate { account_to_allocate: new_account.clone() };
            allocate(CpiContext::new_with_signer(system_program.clone(), cpi_accounts, signer), space as u64)?;

            let cpi_accounts = Assign { account_to_assign: new_account.clone() };
            assign(CpiContext::new_with_signer(system_program.clone(), cpi_accounts, signer), program_id)
        }
    }
}

/// Pays `amount` lamports from a signer owned by the system program
pub fn transfer_sol_amount<'info>(
    from: &AccountInfo<'info>,
    to: &AccountInfo<'info>,
    system_program: &AccountInfo<'info>,
    amount: u64,
) -> Result<()> {
    let cpi_accounts = Transfer { from: from.clone(), to: to.clone() };
    transfer(CpiContext::new(system_program.clone(), cpi_accounts), amount)
}

/// An amount leaving the escrow, split between its recipient and the fee
/// treasury.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeeSplit {
    pub net: u64,
    pub fee: u64,
}

/// Takes `percent_fee` parts of [`PERCENT_DENOMINATOR`] out of `amount`,
/// rounding the fee down.
pub fn split_percent_fee(amount: u64, percent_fee: u64) -> FeeSplit {
    let fee = (amount as u128)
        .saturating_mul(percent_fee as u128)
        .checked_div(PERCENT_DENOMINATOR as u128)
        .unwrap_or(0)
        .min(amount as u128) as u64;
    FeeSplit { net: amount - fee, fee }
}

/// Moves every lamport of a program owned account to `destination`. The
/// runtime reclaims the account once the transaction ends.
pub fn close_program_account<'info>(
    account: &AccountInfo<'info>,
    destination: &AccountInfo<'info>,
) -> Result<()> {
    let account_lamports = account.lamports();

    **destination.try_borrow_mut_lamports()? = destination
        .lamports()
        .checked_add(account_lamports)
        .ok_or(ErrorCode::Overflow)?;
    **account.try_borrow_mut_lamports()? = 0;

    msg!("reclaimed_lamports: {0}", account_lamports);
    Ok(())
}

pub fn get_mint_decimals(mint: &AccountInfo) -> Result<u8> {
    if *mint.owner != anchor_spl::token::ID {
        return Err(ErrorCode::InvalidAssociatedToken.into());
    }
    let mint_state = spl_token::state::Mint::unpack(&mint.try_borrow_data()?)?;
    Ok(mint_state.decimals)
}

pub fn get_token_balance(token_account: &AccountInfo) -> Result<u64> {
    if *token_account.owner != anchor_spl::token::ID {
        return Err(ErrorCode::InvalidTokenAccount.into());
    }
    let account_state = spl_token::state::Account::unpack(&token_account.try_borrow_data()?)?;
    Ok(account_state.amount)
}

/// Transfers tokens signed by a regular signer
pub fn transfer_token_amount<'info>(
    from: &AccountInfo<'info>,
    to: &AccountInfo<'info>,
    authority: &AccountInfo<'info>,
    mint: &AccountInfo<'info>,
    token_program: &AccountInfo<'info>,
    amount: u64,
    decimals: u8,
) -> Result<()> {
    let cpi_accounts = TransferChecked {
        from: from.clone(),
        mint: mint.clone(),
        to: to.clone(),
        authority: authority.clone(),
    };
    let cpi_ctx = CpiContext::new(token_program.clone(), cpi_accounts);
    transfer_checked(cpi_ctx, amount, decimals)
}

/// Accounts needed to move tokens out of a treasury's escrow
pub struct TreasurySigner<'a, 'info> {
    pub treasury: &'a Pubkey,
    pub authority: &'a AccountInfo<'info>,
    pub authority_bump: u8,
    pub treasury_token: &'a AccountInfo<'info>,
    pub mint: &'a AccountInfo<'info>,
    pub token_program: &'a AccountInfo<'info>,
}

impl<'a, 'info> TreasurySigner<'a, 'info> {
    /// Transfers escrowed tokens, signed by the treasury authority
    pub fn transfer(&self, to_token: &AccountInfo<'info>, amount: u64, decimals: u8) -> Result<()> {
        let bump = [self.authority_bump];
        let authority_signer_seed: &[&[&[u8]]] = &[&[
            TREASURY_AUTHORITY_SEED,
            self.treasury.as_ref(),
            &bump,
        ]];
        let cpi_accounts = TransferChecked {
            from: self.treasury_token.clone(),
            mint: self.mint.clone(),
            to: to_token.clone(),
            authority: self.authority.clone(),
        };
        let cpi_ctx = CpiContext::new_with_signer(self.token_program.clone(), cpi_accounts, authority_signer_seed);
        transfer_checked(cpi_ctx, amount, decimals)
    }

    /// Closes the (empty) escrow token account, its rent goes to `destination`
    pub fn close(&self, destination: &AccountInfo<'info>) -> Result<()> {
        let bump = [self.authority_bump];
        let authority_signer_seed: &[&[&[u8]]] = &[&[
            TREASURY_AUTHORITY_SEED,
            self.treasury.as_ref(),
            &bump,
        ]];
        let cpi_accounts = CloseAccount {
            account: self.treasury_token.clone(),
            destination: destination.clone(),
            authority: self.authority.clone(),
        };
        let cpi_ctx = CpiContext::new_with_signer(self.token_program.clone(), cpi_accounts, authority_signer_seed);
        close_account(cpi_ctx)
    }
}
