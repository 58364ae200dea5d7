use crate::constants::exceptions;

/// Exception codes defined in the Modbus specification
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExceptionCode {
    /// The function code received in the query is not an allowable action for the server
    IllegalFunction,
    /// The data address received in the query is not an allowable address for the server
    IllegalDataAddress,
    /// A value contained in the request is not an allowable value for the server
    IllegalDataValue,
    /// An unrecoverable error occurred while the server was attempting the requested action
    ServerDeviceFailure,
    /// The server has accepted the request and is processing it
    Acknowledge,
    /// The server is engaged in processing a long-duration command, try again later
    ServerDeviceBusy,
    /// The server attempted to read a record file, but detected a parity error in the memory
    MemoryParityError,
    /// The gateway was unable to allocate an internal communication path for the request
    GatewayPathUnavailable,
    /// No response was obtained from the target device behind a gateway
    GatewayTargetDeviceFailedToRespond,
    /// The exception code is not defined in the standard
    Unknown(u8),
}

impl From<u8> for ExceptionCode {
    fn from(value: u8) -> Self {
        match value {
            exceptions::ILLEGAL_FUNCTION => ExceptionCode::IllegalFunction,
            exceptions::ILLEGAL_DATA_ADDRESS => ExceptionCode::IllegalDataAddress,
            exceptions::ILLEGAL_DATA_VALUE => ExceptionCode::IllegalDataValue,
            exceptions::SERVER_DEVICE_FAILURE => ExceptionCode::ServerDeviceFailure,
            exceptions::ACKNOWLEDGE => ExceptionCode::Acknowledge,
            exceptions::SERVER_DEVICE_BUSY => ExceptionCode::ServerDeviceBusy,
            exceptions::MEMORY_PARITY_ERROR => ExceptionCode::MemoryParityError,
            exceptions::GATEWAY_PATH_UNAVAILABLE => ExceptionCode::GatewayPathUnavailable,
            exceptions::GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND => {
                ExceptionCode::GatewayTargetDeviceFailedToRespond
            }
            _ => ExceptionCode::Unknown(value),
        }
    }
}

impl From<ExceptionCode> for u8 {
    fn from(ex: ExceptionCode) -> Self {
        match ex {
            ExceptionCode::IllegalFunction => exceptions::ILLEGAL_FUNCTION,
            ExceptionCode::IllegalDataAddress => exceptions::ILLEGAL_DATA_ADDRESS,
            ExceptionCode::IllegalDataValue => exceptions::ILLEGAL_DATA_VALUE,
            ExceptionCode::ServerDeviceFailure => exceptions::SERVER_DEVICE_FAILURE,
            ExceptionCode::Acknowledge => exceptions::ACKNOWLEDGE,
            ExceptionCode::ServerDeviceBusy => exceptions::SERVER_DEVICE_BUSY,
            ExceptionCode::MemoryParityError => exceptions::MEMORY_PARITY_ERROR,
            ExceptionCode::GatewayPathUnavailable => exceptions::GATEWAY_PATH_UNAVAILABLE,
            ExceptionCode::GatewayTargetDeviceFailedToRespond => {
                exceptions::GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND
            }
            ExceptionCode::Unknown(value) => value,
        }
    }
}

impl std::error::Error for ExceptionCode {}

impl std::fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ExceptionCode::IllegalFunction => f.write_str("function code is not an allowable action for the server"),
            ExceptionCode::IllegalDataAddress => f.write_str("data address is not an allowable address for the server"),
            ExceptionCode::IllegalDataValue => f.write_str("value in the request is not an allowable value for the server"),
            ExceptionCode::ServerDeviceFailure => f.write_str("unrecoverable error occurred while performing the requested action"),
            ExceptionCode::Acknowledge => f.write_str("server has accepted the request and is processing it"),
            ExceptionCode::ServerDeviceBusy => f.write_str("server is busy processing a long-duration command"),
            ExceptionCode::MemoryParityError => f.write_str("server detected a parity error reading record memory"),
            ExceptionCode::GatewayPathUnavailable => f.write_str("gateway was unable to allocate an internal communication path"),
            ExceptionCode::GatewayTargetDeviceFailedToRespond => f.write_str("gateway did not receive a response from the target device"),
            ExceptionCode::Unknown(code) => write!(f, "unknown exception code: {code}"),
        }
    }
}
