use anchor_lang::error::{Error, ERROR_CODE_OFFSET};
use anchor_lang::prelude::*;

#[error_code]
pub enum ErrorCode {
    // Codec
    #[msg("Record length does not match the layout span")]
    MalformedRecord,
    #[msg("Unknown instruction tag")]
    UnknownInstruction,
    // Address derivation
    #[msg("No bump seed produces an off-curve address for these seeds")]
    NoValidBumpFound,
    #[msg("The stored bump does not re-derive a valid address for these seeds")]
    InvalidSeeds,
    // Authorization
    #[msg("Not Authorized")]
    Unauthorized,
    #[msg("Instruction signature is missing")]
    MissingSignature,
    // Stream domain
    #[msg("Withdrawal amount exceeds the vested balance")]
    InsufficientVestedBalance, // 6006
    #[msg("An update proposal is already pending for this stream")]
    UpdateAlreadyPending,
    #[msg("There is no pending update proposal for this stream")]
    NoPendingUpdate,
    #[msg("The stream is already paused")]
    AlreadyPaused,
    #[msg("The stream is not paused")]
    NotPaused,
    #[msg("The stream is closed")]
    StreamClosed,
    #[msg("Stream state changed since it was read")]
    StaleState,
    #[msg("Stream not initialized")]
    StreamNotInitialized,
    #[msg("Stream is already initialized")]
    StreamAlreadyInitialized,
    #[msg("The string length is larger than 32 bytes")]
    StringTooLong,
    #[msg("Invalid cliff")]
    InvalidCliff, // 6016
    #[msg("Invalid beneficiary")]
    InvalidBeneficiary,
    #[msg("Contribution amount is zero")]
    ZeroContributionAmount,
    #[msg("Withdrawal amount is zero")]
    ZeroWithdrawalAmount,
    #[msg("Overflow")]
    Overflow,
    // Accounts
    #[msg("Invalid account owner")]
    InvalidOwner,
    #[msg("Invalid stream account")]
    InvalidStream,
    #[msg("Invalid treasury account")]
    InvalidTreasury,
    #[msg("Invalid treasury authority account")]
    InvalidTreasuryAuthority,
    #[msg("Invalid associated token address")]
    InvalidAssociatedToken,
    #[msg("Invalid token account")]
    InvalidTokenAccount, // 6026
    #[msg("Not enough account keys were provided")]
    NotEnoughAccountKeys,
    #[msg("Invalid fee treasury account")]
    InvalidFeeTreasuryAccount,
}

/// What a caller should do after receiving an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Local and deterministic; retrying with the same input fails again.
    Fatal,
    /// Re-read the stream, recompute and resubmit.
    RereadAndRetry,
    /// Report to the caller verbatim.
    Surface,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 29] = [
        ErrorCode::MalformedRecord,
        ErrorCode::UnknownInstruction,
        ErrorCode::NoValidBumpFound,
        ErrorCode::InvalidSeeds,
        ErrorCode::Unauthorized,
        ErrorCode::MissingSignature,
        ErrorCode::InsufficientVestedBalance,
        ErrorCode::UpdateAlreadyPending,
        ErrorCode::NoPendingUpdate,
        ErrorCode::AlreadyPaused,
        ErrorCode::NotPaused,
        ErrorCode::StreamClosed,
        ErrorCode::StaleState,
        ErrorCode::StreamNotInitialized,
        ErrorCode::StreamAlreadyInitialized,
        ErrorCode::StringTooLong,
        ErrorCode::InvalidCliff,
        ErrorCode::InvalidBeneficiary,
        ErrorCode::ZeroContributionAmount,
        ErrorCode::ZeroWithdrawalAmount,
        ErrorCode::Overflow,
        ErrorCode::InvalidOwner,
        ErrorCode::InvalidStream,
        ErrorCode::InvalidTreasury,
        ErrorCode::InvalidTreasuryAuthority,
        ErrorCode::InvalidAssociatedToken,
        ErrorCode::InvalidTokenAccount,
        ErrorCode::NotEnoughAccountKeys,
        ErrorCode::InvalidFeeTreasuryAccount,
    ];

    /// The custom program error number this code is reported with.
    pub fn code(self) -> u32 {
        ERROR_CODE_OFFSET + self as u32
    }

    pub fn from_code(code: u32) -> Option<ErrorCode> {
        ErrorCode::ALL.iter().copied().find(|e| e.code() == code)
    }

    pub fn recovery(self) -> Recovery {
        match self {
            ErrorCode::MalformedRecord
            | ErrorCode::UnknownInstruction
            | ErrorCode::NoValidBumpFound
            | ErrorCode::InvalidSeeds
            | ErrorCode::StringTooLong
            | ErrorCode::InvalidCliff
            | ErrorCode::InvalidBeneficiary
            | ErrorCode::ZeroContributionAmount
            | ErrorCode::ZeroWithdrawalAmount
            | ErrorCode::Overflow => Recovery::Fatal,
            ErrorCode::InsufficientVestedBalance
            | ErrorCode::UpdateAlreadyPending
            | ErrorCode::NoPendingUpdate
            | ErrorCode::AlreadyPaused
            | ErrorCode::NotPaused
            | ErrorCode::StaleState => Recovery::RereadAndRetry,
            _ => Recovery::Surface,
        }
    }
}

/// Classifies any error returned by this crate. Errors that did not originate
/// from [`ErrorCode`] are surfaced as-is.
pub fn recovery_of(error: &Error) -> Recovery {
    match error {
        Error::AnchorError(e) => ErrorCode::from_code(e.error_code_number)
            .map(ErrorCode::recovery)
            .unwrap_or(Recovery::Surface),
        Error::ProgramError(_) => Recovery::Surface,
    }
}
