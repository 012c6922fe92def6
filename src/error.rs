// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

use std::error;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure codes returned to the crypto core
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Status {
    GenericError,
    NotPermitted,
    NotSupported,
    InvalidArgument,
    BadState,
    BufferTooSmall,
    InsufficientMemory,
    ServiceFailure,
    CommunicationFailure,
    StorageFailure,
    HardwareFailure,
    InvalidSignature,
    InvalidPadding,
    CorruptionDetected,
}

impl Status {
    /// The numeric `PSA_ERROR_*` value of the status
    pub fn code(&self) -> i32 {
        match self {
            Status::GenericError => -132,
            Status::NotPermitted => -133,
            Status::NotSupported => -134,
            Status::InvalidArgument => -135,
            Status::BadState => -137,
            Status::BufferTooSmall => -138,
            Status::InsufficientMemory => -141,
            Status::ServiceFailure => -144,
            Status::CommunicationFailure => -145,
            Status::StorageFailure => -146,
            Status::HardwareFailure => -147,
            Status::InvalidSignature => -149,
            Status::InvalidPadding => -150,
            Status::CorruptionDetected => -151,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Status::GenericError => "PSA_ERROR_GENERIC_ERROR",
            Status::NotPermitted => "PSA_ERROR_NOT_PERMITTED",
            Status::NotSupported => "PSA_ERROR_NOT_SUPPORTED",
            Status::InvalidArgument => "PSA_ERROR_INVALID_ARGUMENT",
            Status::BadState => "PSA_ERROR_BAD_STATE",
            Status::BufferTooSmall => "PSA_ERROR_BUFFER_TOO_SMALL",
            Status::InsufficientMemory => "PSA_ERROR_INSUFFICIENT_MEMORY",
            Status::ServiceFailure => "PSA_ERROR_SERVICE_FAILURE",
            Status::CommunicationFailure => "PSA_ERROR_COMMUNICATION_FAILURE",
            Status::StorageFailure => "PSA_ERROR_STORAGE_FAILURE",
            Status::HardwareFailure => "PSA_ERROR_HARDWARE_FAILURE",
            Status::InvalidSignature => "PSA_ERROR_INVALID_SIGNATURE",
            Status::InvalidPadding => "PSA_ERROR_INVALID_PADDING",
            Status::CorruptionDetected => "PSA_ERROR_CORRUPTION_DETECTED",
        }
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    origin: Option<Box<dyn error::Error>>,
    errmsg: Option<String>,
    status: Status,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[non_exhaustive]
pub enum ErrorKind {
    /* A driver status error, see status Error field */
    Status,
    /* Other error, see origin */
    Nested,
}

impl Error {
    pub fn status(status: Status) -> Error {
        Error {
            kind: ErrorKind::Status,
            origin: None,
            errmsg: None,
            status: status,
        }
    }

    pub fn status_from_error<E>(status: Status, error: E) -> Error
    where
        E: Into<Box<dyn error::Error>>,
    {
        Error {
            kind: ErrorKind::Status,
            origin: Some(error.into()),
            errmsg: None,
            status: status,
        }
    }

    pub fn status_with_errmsg(status: Status, errmsg: String) -> Error {
        Error {
            kind: ErrorKind::Status,
            origin: None,
            errmsg: Some(errmsg),
            status: status,
        }
    }

    pub fn other_error<E>(error: E) -> Error
    where
        E: Into<Box<dyn error::Error>>,
    {
        Error {
            kind: ErrorKind::Nested,
            origin: Some(error.into()),
            errmsg: None,
            status: Status::GenericError,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn rv(&self) -> Status {
        self.status
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ErrorKind::Status => {
                if let Some(ref e) = self.errmsg {
                    write!(f, "{}: {}", self.status.name(), e)
                } else if let Some(ref o) = self.origin {
                    write!(f, "{} ({})", self.status.name(), o)
                } else {
                    write!(f, "{}", self.status.name())
                }
            }
            ErrorKind::Nested => match self.origin {
                Some(ref o) => o.fmt(f),
                None => write!(f, "{}", self.status.name()),
            },
        }
    }
}

impl error::Error for Error {}

impl From<Status> for Error {
    fn from(status: Status) -> Error {
        Error::status(status)
    }
}

/* The single point where accelerator failures become driver statuses */
impl From<accel::Error> for Error {
    fn from(error: accel::Error) -> Error {
        let status = match error.kind() {
            accel::ErrorKind::InvalidTag => Status::InvalidSignature,
            accel::ErrorKind::Unavailable => Status::ServiceFailure,
            _ => Status::HardwareFailure,
        };
        trace_err!("accelerator failure: {}", error);
        Error::status_from_error(status, error)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::other_error(error)
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(error: std::num::TryFromIntError) -> Error {
        Error::other_error(error)
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(error: std::convert::Infallible) -> Error {
        Error::other_error(error)
    }
}
