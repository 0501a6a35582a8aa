use thiserror::Error;

/// Main error type for TLV codec operations
#[derive(Error, Debug)]
pub enum TlvError {
    /// End of the encoding, or of the current container. A control-flow
    /// signal rather than a failure; most APIs express it as `Ok(false)` or
    /// `Ok(None)` instead.
    #[error("End of TLV encoding")]
    EndOfTlv,

    #[error("TLV underrun: input ended inside an element")]
    Underrun,

    #[error("Invalid TLV element: {0}")]
    InvalidElement(String),

    #[error("TLV tag form not legal in the current container")]
    InvalidTag,

    #[error("Implicitly encoded tag with no implicit profile id configured")]
    UnknownImplicitTag,

    #[error("Wrong TLV type")]
    WrongType,

    #[error("Unexpected TLV element")]
    UnexpectedElement,

    #[error("Output buffer too small")]
    BufferTooSmall,

    #[error("Backing store allocation failed: {0}")]
    NoMemory(String),

    #[error("TLV container still open")]
    ContainerOpen,

    #[error("Incorrect state: {0}")]
    IncorrectState(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("String element is not valid UTF-8")]
    InvalidUtf8,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for TLV codec operations
pub type TlvResult<T> = Result<T, TlvError>;
