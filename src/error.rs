/// Errors produced while recovering frames from a byte stream (TCP or serial)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// TCP ADU shorter than the fixed MBAP prefix
    TooShort(usize),
    /// MBAP protocol id was not zero
    UnknownProtocolId(u16),
    /// MBAP length field too small to cover the unit id and function code
    MbapLengthTooSmall(usize),
    /// MBAP length field exceeds the maximum allowed ADU size
    MbapLengthTooBig(usize, usize),
    /// MBAP length field disagrees with the number of bytes that follow it
    MbapLengthMismatch(usize, usize),
    /// RTU ADU shorter than the 4-byte minimum
    RtuTooShort(usize),
    /// RTU CRC did not match the value computed over the frame contents
    CrcMismatch { received: u16, computed: u16 },
    /// function code the RTU sizer cannot compute a frame length for
    UnsupportedFunction(u8),
}

impl std::error::Error for FrameError {}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FrameError::TooShort(size) => {
                write!(f, "TCP ADU of {size} bytes is shorter than the MBAP prefix")
            }
            FrameError::UnknownProtocolId(id) => {
                write!(f, "MBAP protocol id must be zero, received {id}")
            }
            FrameError::MbapLengthTooSmall(len) => {
                write!(f, "MBAP length field of {len} cannot contain a PDU")
            }
            FrameError::MbapLengthTooBig(len, max) => {
                write!(f, "MBAP length field of {len} exceeds the maximum of {max}")
            }
            FrameError::MbapLengthMismatch(len, actual) => write!(
                f,
                "MBAP length field of {len} disagrees with the {actual} bytes present"
            ),
            FrameError::RtuTooShort(size) => {
                write!(f, "RTU ADU of {size} bytes is shorter than the 4-byte minimum")
            }
            FrameError::CrcMismatch { received, computed } => write!(
                f,
                "RTU CRC mismatch: received {received:#06X}, computed {computed:#06X}"
            ),
            FrameError::UnsupportedFunction(function) => {
                write!(f, "unsupported function code: {function:#04X}")
            }
        }
    }
}

/// Errors that indicate a bug in the library's own buffer handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalError {
    /// attempted to read more bytes than currently buffered
    InsufficientBytesForRead(usize, usize),
}

impl std::error::Error for InternalError {}

impl std::fmt::Display for InternalError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InternalError::InsufficientBytesForRead(requested, remaining) => write!(
                f,
                "attempted to read {requested} bytes with only {remaining} remaining"
            ),
        }
    }
}

/// Errors surfaced by transport workers while reading requests
#[derive(Debug)]
pub enum RequestError {
    /// I/O error on the underlying socket or serial port
    Io(std::io::Error),
    /// the byte stream did not contain a well-formed frame
    Frame(FrameError),
    /// bug in the library's own buffer handling
    Internal(InternalError),
}

impl RequestError {
    /// a serial read timed out before the frame completed
    pub fn is_timeout(&self) -> bool {
        matches!(self, RequestError::Io(err) if err.kind() == std::io::ErrorKind::TimedOut)
    }
}

impl std::error::Error for RequestError {}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RequestError::Io(err) => write!(f, "i/o error: {err}"),
            RequestError::Frame(err) => err.fmt(f),
            RequestError::Internal(err) => err.fmt(f),
        }
    }
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        RequestError::Io(err)
    }
}

impl From<FrameError> for RequestError {
    fn from(err: FrameError) -> Self {
        RequestError::Frame(err)
    }
}

impl From<InternalError> for RequestError {
    fn from(err: InternalError) -> Self {
        RequestError::Internal(err)
    }
}

/// Error returned when constructing a server with the broadcast address (0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidUnitId;

impl std::error::Error for InvalidUnitId {}

impl std::fmt::Display for InvalidUnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("slave unit id must not be the broadcast address (0)")
    }
}

/// Error returned by operations that must happen before the server starts receiving requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyRunning;

impl std::error::Error for AlreadyRunning {}

impl std::fmt::Display for AlreadyRunning {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("the server has already started receiving requests")
    }
}
