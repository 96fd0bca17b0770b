use crate::errors::ErrorCode;

/// Persisted lifecycle state of a stream record. `Draft` is the state of a
/// zeroed, not yet created account.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Draft = 0,
    Active = 1,
    Paused = 2,
    Closed = 3,
}

impl TryFrom<u8> for StreamState {
    type Error = ErrorCode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(StreamState::Draft),
            1 => Ok(StreamState::Active),
            2 => Ok(StreamState::Paused),
            3 => Ok(StreamState::Closed),
            _ => Err(ErrorCode::MalformedRecord),
        }
    }
}

/// Stream status as observed at a given timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Scheduled = 0,
    Running = 1,
    Paused = 2,
    AutoPaused = 3,
    Closed = 4,
}

impl StreamStatus {
    pub fn name(&self) -> &'static str {
        match self {
            StreamStatus::Scheduled => "Scheduled",
            StreamStatus::Running => "Running",
            StreamStatus::Paused => "Paused",
            StreamStatus::AutoPaused => "AutoPaused",
            StreamStatus::Closed => "Closed",
        }
    }
}

/// Instruction kinds as known to fee schedules and activity feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MspAction {
    CreateStream = 0,
    AddFunds = 1,
    Withdraw = 2,
    PauseStream = 3,
    ResumeStream = 4,
    ProposeUpdate = 5,
    AnswerUpdate = 6,
    CloseStream = 7,
}

/// How addresses are rendered in read views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressFormat {
    /// Base58 strings
    #[default]
    Friendly,
    Raw,
}
