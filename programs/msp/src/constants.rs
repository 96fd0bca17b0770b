// Seeds
pub const STREAM_SEED: &[u8] = b"stream";
pub const TREASURY_SEED: &[u8] = b"treasury";
pub const TREASURY_AUTHORITY_SEED: &[u8] = b"authority";

// Collects the protocol fees, in lamports and in tokens
pub mod fee_treasury {
    anchor_lang::declare_id!("3TD6SWY9M1mLY2kZWJNavPLhwXvcRsWdnZLRaMzERJBw");
}

// Fee constants
pub const CREATE_STREAM_FLAT_FEE: u64 = 10_000;
pub const ADD_FUNDS_FLAT_FEE: u64 = 25_000;
pub const WITHDRAW_PERCENT_FEE: u64 = 2_500;
// pub const PROPOSE_UPDATE_FLAT_FEE: u64 = 10_000; // Not in use at the moment
pub const CLOSE_STREAM_FLAT_FEE: u64 = 10_000;
pub const CLOSE_STREAM_PERCENT_FEE: u64 = 2_500;
pub const LAMPORTS_PER_SIGNATURE: u64 = 5_000;

pub const PERCENT_DENOMINATOR: u64 = 1_000_000;

// Cliff percents are whole percents
pub const CLIFF_PERCENT_DENOMINATOR: u64 = 100;

// General
pub const MEMO_LEN: usize = 32;

// Client
pub const DEFAULT_MAX_SUBMIT_ATTEMPTS: u32 = 3;
pub const DEFAULT_MAX_STALENESS_SECONDS: u64 = 30;
