use thiserror::Error;

/// Every failure the simulator can report. All variants are structural: a
/// configuration or model defect that would recur on retry.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown day_count_model {0:?} (expected constant, two_point or poisson)")]
    UnknownDayCountModel(String),

    #[error("unknown mode {0:?} (expected expected or daily)")]
    UnknownMode(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("choice set `{0}` is empty")]
    EmptyChoiceSet(&'static str),

    #[error("drink PMF invalid: {0}")]
    InvalidPmf(String),

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
