use thiserror::Error;

pub type Result<T> = std::result::Result<T, QrsError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QrsError {
    #[error("Invalid ECG data: {0}")]
    InvalidData(String),

    #[error("ECG data has more leads ({leads}) than points ({points}), is it transposed?")]
    Transposed { leads: usize, points: usize },

    #[error("Recording has {points} points, at least {required} (8 seconds) are required")]
    RecordingTooShort { points: usize, required: usize },

    #[error("Invalid sampling rate: {0} Hz")]
    InvalidSamplingRate(u32),

    #[error("Lead {lead} out of range, recording has {leads} leads")]
    LeadOutOfRange { lead: usize, leads: usize },

    #[error("Invalid detector parameters: {0}")]
    InvalidParams(String),

    #[error("Signal of {len} samples is too short for filtering, more than {required} are required")]
    SignalTooShort { len: usize, required: usize },

    #[error("Filter design failed: {0}")]
    FilterDesign(String),

    #[error("Reconciliation did not converge at row {row} after {corrections} corrections")]
    ReconciliationStalled { row: usize, corrections: usize },
}
