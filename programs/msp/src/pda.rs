use anchor_lang::prelude::*;
use anchor_spl::associated_token::get_associated_token_address;

use crate::constants::*;
use crate::errors::ErrorCode;

/// A program derived address together with the bump that produced it. The
/// bump must be persisted to re-derive the address later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub bump: u8,
}

/// Searches bumps from 255 down for the first off-curve address.
pub fn find_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<DerivedAddress> {
    let (address, bump) = Pubkey::try_find_program_address(seeds, program_id)
        .ok_or(ErrorCode::NoValidBumpFound)?;
    Ok(DerivedAddress { address, bump })
}

/// Re-derives an address from seeds and a previously found bump.
pub fn create_address(seeds: &[&[u8]], bump: u8, program_id: &Pubkey) -> Result<Pubkey> {
    let bump_seed = [bump];
    let mut full_seeds: Vec<&[u8]> = seeds.to_vec();
    full_seeds.push(&bump_seed);
    Pubkey::create_program_address(&full_seeds, program_id)
        .map_err(|_| ErrorCode::InvalidSeeds.into())
}

pub fn find_stream_address(treasurer: &Pubkey, nonce: u64, program_id: &Pubkey) -> Result<DerivedAddress> {
    find_address(&[STREAM_SEED, treasurer.as_ref(), &nonce.to_le_bytes()], program_id)
}

pub fn create_stream_address(treasurer: &Pubkey, nonce: u64, bump: u8, program_id: &Pubkey) -> Result<Pubkey> {
    create_address(&[STREAM_SEED, treasurer.as_ref(), &nonce.to_le_bytes()], bump, program_id)
}

pub fn find_treasury_address(stream: &Pubkey, program_id: &Pubkey) -> Result<DerivedAddress> {
    find_address(&[TREASURY_SEED, stream.as_ref()], program_id)
}

pub fn create_treasury_address(stream: &Pubkey, bump: u8, program_id: &Pubkey) -> Result<Pubkey> {
    create_address(&[TREASURY_SEED, stream.as_ref()], bump, program_id)
}

/// The delegated signer that owns the escrow token account of a treasury.
pub fn find_treasury_authority_address(treasury: &Pubkey, program_id: &Pubkey) -> Result<DerivedAddress> {
    find_address(&[TREASURY_AUTHORITY_SEED, treasury.as_ref()], program_id)
}

pub fn create_treasury_authority_address(treasury: &Pubkey, bump: u8, program_id: &Pubkey) -> Result<Pubkey> {
    create_address(&[TREASURY_AUTHORITY_SEED, treasury.as_ref()], bump, program_id)
}

/// Escrow token account of a treasury authority for `mint`.
pub fn treasury_token_address(treasury_authority: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(treasury_authority, mint)
}

/// Token account the beneficiary receives `mint` in.
pub fn beneficiary_token_address(beneficiary: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(beneficiary, mint)
}

/// Token account the fee treasury collects percent fees in.
pub fn fee_treasury_token_address(mint: &Pubkey) -> Pubkey {
    get_associated_token_address(&fee_treasury::ID, mint)
}

/// Every address a stream needs, derived in one go for instruction builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamAddresses {
    pub stream: DerivedAddress,
    pub treasury: DerivedAddress,
    pub treasury_authority: DerivedAddress,
    pub treasury_token: Pubkey,
}

impl StreamAddresses {
    pub fn derive(treasurer: &Pubkey, nonce: u64, mint: &Pubkey, program_id: &Pubkey) -> Result<Self> {
        let stream = find_stream_address(treasurer, nonce, program_id)?;
        let treasury = find_treasury_address(&stream.address, program_id)?;
        let treasury_authority = find_treasury_authority_address(&treasury.address, program_id)?;
        let treasury_token = treasury_token_address(&treasury_authority.address, mint);
        Ok(Self { stream, treasury, treasury_authority, treasury_token })
    }
}
