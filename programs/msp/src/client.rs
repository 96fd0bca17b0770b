//! Off-chain side of the protocol: the external interfaces a client consumes
//! and the read-latest, recompute, resubmit loop built on top of them.

use anchor_lang::error::Error;
use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;

use crate::constants::*;
use crate::enums::{AddressFormat, MspAction};
use crate::errors::{ErrorCode, Recovery};
use crate::info::StreamInfo;
use crate::stream::Stream;
use crate::utils::split_percent_fee;

pub trait AccountReader {
    /// Raw account bytes, `None` when the account does not exist
    fn read_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>>;
}

#[derive(Debug, Clone)]
pub enum Rejection {
    /// The program refused the transaction with one of its own codes
    Program(ErrorCode),
    /// The ledger state the transaction was built from is no longer current
    StaleState,
    Other(String),
}

impl Rejection {
    pub fn recovery(&self) -> Recovery {
        match self {
            Rejection::Program(code) => code.recovery(),
            Rejection::StaleState => Recovery::RereadAndRetry,
            Rejection::Other(_) => Recovery::Surface,
        }
    }
}

impl PartialEq for Rejection {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Rejection::Program(a), Rejection::Program(b)) => a.code() == b.code(),
            (Rejection::StaleState, Rejection::StaleState) => true,
            (Rejection::Other(a), Rejection::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Rejection {}

impl From<Error> for Rejection {
    fn from(error: Error) -> Self {
        match &error {
            Error::AnchorError(e) => match ErrorCode::from_code(e.error_code_number) {
                Some(ErrorCode::StaleState) => Rejection::StaleState,
                Some(code) => Rejection::Program(code),
                None => Rejection::Other(error.to_string()),
            },
            Error::ProgramError(_) => Rejection::Other(error.to_string()),
        }
    }
}

impl From<ErrorCode> for Rejection {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::StaleState => Rejection::StaleState,
            code => Rejection::Program(code),
        }
    }
}

pub trait TransactionSubmitter {
    /// Submits the instructions as one transaction and returns its signature
    fn submit(&self, instructions: &[Instruction]) -> std::result::Result<String, Rejection>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionFees {
    /// Lamports paid to the network for the transaction signatures
    pub blockchain_fee: u64,
    /// Lamports charged by the protocol for the action
    pub msp_flat_fee: u64,
    /// Parts of [`PERCENT_DENOMINATOR`] charged on the amount moved
    pub msp_percent_fee: u64,
}

impl TransactionFees {
    /// Protocol fee charged on `amount` at `msp_percent_fee`
    pub fn percent_fee_on(&self, amount: u64) -> u64 {
        split_percent_fee(amount, self.msp_percent_fee).fee
    }
}

pub trait FeeSchedule {
    fn fees(&self, action: MspAction, signatures: u64) -> TransactionFees;
}

/// Published protocol fees
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtocolFeeSchedule;

impl FeeSchedule for ProtocolFeeSchedule {
    fn fees(&self, action: MspAction, signatures: u64) -> TransactionFees {
        let (msp_flat_fee, msp_percent_fee) = match action {
            MspAction::CreateStream => (CREATE_STREAM_FLAT_FEE, 0),
            MspAction::AddFunds => (ADD_FUNDS_FLAT_FEE, 0),
            MspAction::Withdraw => (0, WITHDRAW_PERCENT_FEE),
            MspAction::PauseStream
            | MspAction::ResumeStream
            | MspAction::ProposeUpdate
            | MspAction::AnswerUpdate => (0, 0),
            MspAction::CloseStream => (CLOSE_STREAM_FLAT_FEE, CLOSE_STREAM_PERCENT_FEE),
        };
        TransactionFees {
            blockchain_fee: signatures.saturating_mul(LAMPORTS_PER_SIGNATURE),
            msp_flat_fee,
            msp_percent_fee,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Submissions attempted before a retryable rejection is returned
    pub max_attempts: u32,
    /// Oldest clock reading accepted for local advisory checks
    pub max_staleness_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            max_attempts: DEFAULT_MAX_SUBMIT_ATTEMPTS,
            max_staleness_seconds: DEFAULT_MAX_STALENESS_SECONDS,
        }
    }
}

pub struct StreamClient<R, S> {
    pub reader: R,
    pub submitter: S,
    pub config: ClientConfig,
}

impl<R: AccountReader, S: TransactionSubmitter> StreamClient<R, S> {
    pub fn new(reader: R, submitter: S) -> Self {
        Self::with_config(reader, submitter, ClientConfig::default())
    }

    pub fn with_config(reader: R, submitter: S, config: ClientConfig) -> Self {
        StreamClient { reader, submitter, config }
    }

    pub fn fetch_stream(&self, address: &Pubkey) -> Result<Option<Stream>> {
        match self.reader.read_account(address)? {
            Some(data) => Ok(Some(Stream::decode(&data)?)),
            None => Ok(None),
        }
    }

    pub fn fetch_stream_info(&self, address: &Pubkey, now: u64, format: AddressFormat) -> Result<Option<StreamInfo>> {
        Ok(self
            .fetch_stream(address)?
            .map(|stream| StreamInfo::new(address, &stream, now, format)))
    }

    /// Fails with `StaleState` when a clock reading taken at `read_at` is too
    /// old to be trusted at `now`
    pub fn ensure_fresh(&self, read_at: u64, now: u64) -> Result<()> {
        if now.saturating_sub(read_at) > self.config.max_staleness_seconds {
            return Err(ErrorCode::StaleState.into());
        }
        Ok(())
    }

    /// Reads the latest record, builds instructions from it and submits them.
    /// Retryable rejections cause a fresh read and a rebuilt submission, up to
    /// `max_attempts` submissions in total.
    pub fn submit_with_refresh<F>(&self, address: &Pubkey, mut build: F) -> std::result::Result<String, Rejection>
    where
        F: FnMut(&Stream) -> Result<Vec<Instruction>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let stream = self
                .fetch_stream(address)?
                .ok_or(Rejection::Program(ErrorCode::StreamNotInitialized))?;
            let instructions = build(&stream)?;

            match self.submitter.submit(&instructions) {
                Ok(signature) => return Ok(signature),
                Err(rejection)
                    if rejection.recovery() == Recovery::RereadAndRetry && attempt < self.config.max_attempts =>
                {
                    msg!("attempt: {0}, rejection: {1:?}, retrying", attempt, rejection);
                }
                Err(rejection) => return Err(rejection),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{pause_stream, withdraw};
    use crate::stream::tests::sample_stream;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryLedger {
        accounts: RefCell<HashMap<Pubkey, Vec<u8>>>,
    }

    impl AccountReader for &MemoryLedger {
        fn read_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
            Ok(self.accounts.borrow().get(address).cloned())
        }
    }

    /// Rejects the first submissions with the queued rejections
    struct ScriptedSubmitter {
        rejections: RefCell<Vec<Rejection>>,
        submitted: RefCell<Vec<Vec<Instruction>>>,
    }

    impl ScriptedSubmitter {
        fn new(mut rejections: Vec<Rejection>) -> Self {
            rejections.reverse();
            ScriptedSubmitter { rejections: RefCell::new(rejections), submitted: RefCell::new(vec![]) }
        }
    }

    impl TransactionSubmitter for &ScriptedSubmitter {
        fn submit(&self, instructions: &[Instruction]) -> std::result::Result<String, Rejection> {
            self.submitted.borrow_mut().push(instructions.to_vec());
            match self.rejections.borrow_mut().pop() {
                Some(rejection) => Err(rejection),
                None => Ok(format!("signature-{}", self.submitted.borrow().len())),
            }
        }
    }

    fn ledger_with_stream() -> (MemoryLedger, Pubkey, Stream) {
        let ledger = MemoryLedger::default();
        let address = Pubkey::new_unique();
        let stream = sample_stream();
        ledger.accounts.borrow_mut().insert(address, stream.to_bytes());
        (ledger, address, stream)
    }

    #[test]
    fn stale_state_is_reread_and_resubmitted() {
        let (ledger, address, stream) = ledger_with_stream();
        let submitter = ScriptedSubmitter::new(vec![Rejection::StaleState]);
        let client = StreamClient::new(&ledger, &submitter);

        let mut reads = 0;
        let signature = client
            .submit_with_refresh(&address, |latest| {
                reads += 1;
                Ok(vec![pause_stream(&crate::ID, &latest.treasurer_address, &address)])
            })
            .unwrap();

        assert_eq!(signature, "signature-2");
        assert_eq!(reads, 2);
        assert_eq!(submitter.submitted.borrow().len(), 2);
        assert_eq!(client.fetch_stream(&address).unwrap(), Some(stream));
    }

    #[test]
    fn retries_stop_at_max_attempts() {
        let (ledger, address, stream) = ledger_with_stream();
        let submitter = ScriptedSubmitter::new(vec![
            Rejection::Program(ErrorCode::InsufficientVestedBalance),
            Rejection::StaleState,
            Rejection::StaleState,
            Rejection::StaleState,
        ]);
        let client = StreamClient::with_config(&ledger, &submitter, ClientConfig { max_attempts: 3, ..Default::default() });

        let rejection = client
            .submit_with_refresh(&address, |latest| withdraw(&crate::ID, &address, latest, 10).map(|ix| vec![ix]))
            .unwrap_err();
        assert_eq!(rejection, Rejection::StaleState);
        assert_eq!(submitter.submitted.borrow().len(), 3);
        assert_eq!(stream.beneficiary_address, client.fetch_stream(&address).unwrap().unwrap().beneficiary_address);
    }

    #[test]
    fn surfaced_rejections_are_not_retried() {
        let (ledger, address, _) = ledger_with_stream();
        let submitter = ScriptedSubmitter::new(vec![Rejection::Program(ErrorCode::Unauthorized)]);
        let client = StreamClient::new(&ledger, &submitter);

        let rejection = client
            .submit_with_refresh(&address, |latest| Ok(vec![pause_stream(&crate::ID, &latest.beneficiary_address, &address)]))
            .unwrap_err();
        assert_eq!(rejection, Rejection::Program(ErrorCode::Unauthorized));
        assert_eq!(submitter.submitted.borrow().len(), 1);
    }

    #[test]
    fn missing_or_malformed_accounts() {
        let (ledger, address, _) = ledger_with_stream();
        let submitter = ScriptedSubmitter::new(vec![]);
        let client = StreamClient::new(&ledger, &submitter);

        let missing = Pubkey::new_unique();
        assert_eq!(client.fetch_stream(&missing).unwrap(), None);
        assert_eq!(
            client.submit_with_refresh(&missing, |_| Ok(vec![])).unwrap_err(),
            Rejection::Program(ErrorCode::StreamNotInitialized)
        );

        ledger.accounts.borrow_mut().insert(address, vec![1, 2, 3]);
        assert_eq!(client.fetch_stream(&address).unwrap_err(), ErrorCode::MalformedRecord.into());
        assert!(submitter.submitted.borrow().is_empty());
    }

    #[test]
    fn builder_errors_are_returned_without_submitting() {
        let (ledger, address, _) = ledger_with_stream();
        let submitter = ScriptedSubmitter::new(vec![]);
        let client = StreamClient::new(&ledger, &submitter);

        let rejection = client
            .submit_with_refresh(&address, |_| Err(ErrorCode::StringTooLong.into()))
            .unwrap_err();
        assert_eq!(rejection, Rejection::Program(ErrorCode::StringTooLong));
        assert!(submitter.submitted.borrow().is_empty());
    }

    #[test]
    fn fetched_info_and_staleness() {
        let (ledger, address, stream) = ledger_with_stream();
        let submitter = ScriptedSubmitter::new(vec![]);
        let client = StreamClient::new(&ledger, &submitter);

        let info = client
            .fetch_stream_info(&address, stream.start_utc + 3600, AddressFormat::Raw)
            .unwrap()
            .unwrap();
        assert_eq!(info.vested_units, 100);
        assert_eq!(info.memo, "monthly allowance");

        assert!(client.ensure_fresh(100, 130).is_ok());
        assert_eq!(client.ensure_fresh(100, 131).unwrap_err(), ErrorCode::StaleState.into());
    }

    #[test]
    fn rejections_compare_by_program_code() {
        assert_eq!(Rejection::from(ErrorCode::AlreadyPaused), Rejection::Program(ErrorCode::AlreadyPaused));
        assert_ne!(Rejection::from(ErrorCode::AlreadyPaused), Rejection::Program(ErrorCode::NotPaused));
        assert_eq!(Rejection::from(ErrorCode::StaleState), Rejection::StaleState);

        let err: Error = ErrorCode::InvalidFeeTreasuryAccount.into();
        assert_eq!(Rejection::from(err), Rejection::Program(ErrorCode::InvalidFeeTreasuryAccount));
        let err: Error = ProgramError::InvalidArgument.into();
        assert!(matches!(Rejection::from(err), Rejection::Other(_)));
        assert_ne!(Rejection::Other("a".into()), Rejection::StaleState);
    }

    #[test]
    fn protocol_fees() {
        let schedule = ProtocolFeeSchedule;
        let fees = schedule.fees(MspAction::CloseStream, 2);
        assert_eq!(fees.blockchain_fee, 10_000);
        assert_eq!(fees.msp_flat_fee, CLOSE_STREAM_FLAT_FEE);
        assert_eq!(fees.msp_percent_fee, CLOSE_STREAM_PERCENT_FEE);

        let fees = schedule.fees(MspAction::Withdraw, 1);
        assert_eq!(fees.msp_flat_fee, 0);
        assert_eq!(fees.msp_percent_fee, WITHDRAW_PERCENT_FEE);
        assert_eq!(fees.percent_fee_on(1_000_000), 2_500);
        assert_eq!(fees.percent_fee_on(399), 0);
        assert_eq!(schedule.fees(MspAction::AnswerUpdate, 1).msp_flat_fee, 0);
        assert_eq!(schedule.fees(MspAction::PauseStream, 1).msp_flat_fee, 0);
    }
}
