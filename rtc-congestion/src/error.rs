use thiserror::Error;
use units::DataRate;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("field trial: missing '/' separator in {0:?}")]
    ErrFieldTrialMissingSeparator(String),
    #[error("field trial: empty key")]
    ErrFieldTrialEmptyKey,
    #[error("field trial: empty value for key {0}")]
    ErrFieldTrialEmptyValue(String),
    #[error("field trial: malformed parameter {0:?}, expected Key:Value")]
    ErrFieldTrialFormat(String),
    #[error("field trial: invalid value {value:?} for {key}")]
    ErrFieldTrialValue { key: String, value: String },
    #[error("field trial: unknown parameter {0}")]
    ErrFieldTrialUnknownKey(String),
    #[error("target rate constraints: max {max} is below min {min}")]
    ErrInvalidTargetRateConstraints { min: DataRate, max: DataRate },
    #[error("network controller: closed")]
    ErrClosed,

    #[error("{0}")]
    Other(String),
}
