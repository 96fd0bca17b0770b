use anchor_lang::prelude::*;

pub mod client;
pub mod codec;
pub mod constants;
pub mod enums;
pub mod errors;
pub mod events;
pub mod info;
pub mod instruction;
pub mod lifecycle;
pub mod negotiation;
pub mod pda;
pub mod processor;
pub mod stream;
pub mod terms;
pub mod treasury;
pub mod utils;
pub mod vesting;

use crate::processor::Processor;

declare_id!("MSPCUMbLfy2MeT6geLMMzrUkv1Tx88XRApaVRdyxTuu");

#[cfg(not(feature = "no-entrypoint"))]
anchor_lang::solana_program::entrypoint!(process_instruction);

pub fn process_instruction<'info>(
    program_id: &Pubkey,
    accounts: &[AccountInfo<'info>],
    input: &[u8],
) -> std::result::Result<(), ProgramError> {
    Processor::process(program_id, accounts, input).map_err(|e| {
        e.log();
        e.into()
    })
}
