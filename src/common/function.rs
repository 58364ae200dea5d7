use std::fmt::{Display, Formatter};

pub(crate) mod constants {
    pub(crate) const READ_COILS: u8 = 1;
    pub(crate) const READ_DISCRETE_INPUTS: u8 = 2;
    pub(crate) const READ_HOLDING_REGISTERS: u8 = 3;
    pub(crate) const READ_INPUT_REGISTERS: u8 = 4;
    pub(crate) const WRITE_SINGLE_COIL: u8 = 5;
    pub(crate) const WRITE_SINGLE_REGISTER: u8 = 6;
    pub(crate) const READ_EXCEPTION_STATUS: u8 = 7;
    pub(crate) const GET_COMM_EVENT_COUNTER: u8 = 11;
    pub(crate) const GET_COMM_EVENT_LOG: u8 = 12;
    pub(crate) const WRITE_MULTIPLE_COILS: u8 = 15;
    pub(crate) const WRITE_MULTIPLE_REGISTERS: u8 = 16;
    pub(crate) const REPORT_SERVER_ID: u8 = 17;
    pub(crate) const READ_FILE_RECORD: u8 = 20;
    pub(crate) const WRITE_FILE_RECORD: u8 = 21;
    pub(crate) const MASK_WRITE_REGISTER: u8 = 22;
    pub(crate) const READ_WRITE_MULTIPLE_REGISTERS: u8 = 23;
    pub(crate) const READ_FIFO_QUEUE: u8 = 24;
    pub(crate) const READ_DEVICE_IDENTIFICATION: u8 = 43;
}

/// Function codes this library can at least recognize on the wire.
///
/// The first eight are serviced by the default handler registry; the rest are
/// sized by the RTU parser but answered with an IllegalFunction exception.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCode {
    ReadCoils = constants::READ_COILS,
    ReadDiscreteInputs = constants::READ_DISCRETE_INPUTS,
    ReadHoldingRegisters = constants::READ_HOLDING_REGISTERS,
    ReadInputRegisters = constants::READ_INPUT_REGISTERS,
    WriteSingleCoil = constants::WRITE_SINGLE_COIL,
    WriteSingleRegister = constants::WRITE_SINGLE_REGISTER,
    ReadExceptionStatus = constants::READ_EXCEPTION_STATUS,
    GetCommEventCounter = constants::GET_COMM_EVENT_COUNTER,
    GetCommEventLog = constants::GET_COMM_EVENT_LOG,
    WriteMultipleCoils = constants::WRITE_MULTIPLE_COILS,
    WriteMultipleRegisters = constants::WRITE_MULTIPLE_REGISTERS,
    ReportServerId = constants::REPORT_SERVER_ID,
    ReadFileRecord = constants::READ_FILE_RECORD,
    WriteFileRecord = constants::WRITE_FILE_RECORD,
    MaskWriteRegister = constants::MASK_WRITE_REGISTER,
    ReadWriteMultipleRegisters = constants::READ_WRITE_MULTIPLE_REGISTERS,
    ReadFifoQueue = constants::READ_FIFO_QUEUE,
    ReadDeviceIdentification = constants::READ_DEVICE_IDENTIFICATION,
}

impl FunctionCode {
    pub const fn get_value(self) -> u8 {
        self as u8
    }

    pub const fn as_error(self) -> u8 {
        self.get_value() | 0x80
    }

    pub fn get(value: u8) -> Option<Self> {
        match value {
            constants::READ_COILS => Some(FunctionCode::ReadCoils),
            constants::READ_DISCRETE_INPUTS => Some(FunctionCode::ReadDiscreteInputs),
            constants::READ_HOLDING_REGISTERS => Some(FunctionCode::ReadHoldingRegisters),
            constants::READ_INPUT_REGISTERS => Some(FunctionCode::ReadInputRegisters),
            constants::WRITE_SINGLE_COIL => Some(FunctionCode::WriteSingleCoil),
            constants::WRITE_SINGLE_REGISTER => Some(FunctionCode::WriteSingleRegister),
            constants::READ_EXCEPTION_STATUS => Some(FunctionCode::ReadExceptionStatus),
            constants::GET_COMM_EVENT_COUNTER => Some(FunctionCode::GetCommEventCounter),
            constants::GET_COMM_EVENT_LOG => Some(FunctionCode::GetCommEventLog),
            constants::WRITE_MULTIPLE_COILS => Some(FunctionCode::WriteMultipleCoils),
            constants::WRITE_MULTIPLE_REGISTERS => Some(FunctionCode::WriteMultipleRegisters),
            constants::REPORT_SERVER_ID => Some(FunctionCode::ReportServerId),
            constants::READ_FILE_RECORD => Some(FunctionCode::ReadFileRecord),
            constants::WRITE_FILE_RECORD => Some(FunctionCode::WriteFileRecord),
            constants::MASK_WRITE_REGISTER => Some(FunctionCode::MaskWriteRegister),
            constants::READ_WRITE_MULTIPLE_REGISTERS => {
                Some(FunctionCode::ReadWriteMultipleRegisters)
            }
            constants::READ_FIFO_QUEUE => Some(FunctionCode::ReadFifoQueue),
            constants::READ_DEVICE_IDENTIFICATION => Some(FunctionCode::ReadDeviceIdentification),
            _ => None,
        }
    }

    /// short name used in observation records
    pub fn name(self) -> &'static str {
        match self {
            FunctionCode::ReadCoils => "readCoils",
            FunctionCode::ReadDiscreteInputs => "readDiscreteInputs",
            FunctionCode::ReadHoldingRegisters => "readHoldingRegisters",
            FunctionCode::ReadInputRegisters => "readInputRegisters",
            FunctionCode::WriteSingleCoil => "writeSingleCoil",
            FunctionCode::WriteSingleRegister => "writeSingleRegister",
            FunctionCode::ReadExceptionStatus => "readExceptionStatus",
            FunctionCode::GetCommEventCounter => "getCommEventCounter",
            FunctionCode::GetCommEventLog => "getCommEventLog",
            FunctionCode::WriteMultipleCoils => "writeMultipleCoils",
            FunctionCode::WriteMultipleRegisters => "writeMultipleRegisters",
            FunctionCode::ReportServerId => "reportServerId",
            FunctionCode::ReadFileRecord => "readFileRecord",
            FunctionCode::WriteFileRecord => "writeFileRecord",
            FunctionCode::MaskWriteRegister => "maskWriteRegister",
            FunctionCode::ReadWriteMultipleRegisters => "readWriteMultipleRegisters",
            FunctionCode::ReadFifoQueue => "readFifoQueue",
            FunctionCode::ReadDeviceIdentification => "readDeviceIdentification",
        }
    }
}

/// observation-record name for any raw function code byte
pub(crate) fn name_of(value: u8) -> &'static str {
    match FunctionCode::get(value) {
        Some(code) => code.name(),
        None => "unknownFunction",
    }
}

impl Display for FunctionCode {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} ({:#04X})", self.name(), self.get_value())
    }
}
