pub mod coil {
    /// u16 representation of COIL == ON in a write single coil request
    pub const ON: u16 = 0xFF00;
    /// permissive ON representation some masters send instead of 0xFF00
    pub const ON_ALT: u16 = 0xFFFF;
    /// u16 representation of COIL == OFF in a write single coil request
    pub const OFF: u16 = 0x0000;
}

pub mod frame {
    /// maximum size of a PDU (function code + data)
    pub const MAX_PDU_LENGTH: usize = 253;
    /// maximum size of an RTU ADU (device + PDU + CRC)
    pub const MAX_RTU_ADU_LENGTH: usize = 256;
    /// minimum size of an RTU ADU
    pub const MIN_RTU_ADU_LENGTH: usize = 4;
    /// maximum size of a TCP ADU (MBAP header + PDU)
    pub const MAX_TCP_ADU_LENGTH: usize = 260;
    /// number of fixed bytes preceding the PDU data in a TCP ADU
    pub const MBAP_PREFIX_LENGTH: usize = 8;
    /// maximum value of the MBAP length field (unit id + function code + data)
    pub const MAX_MBAP_LENGTH_FIELD: usize = MAX_PDU_LENGTH + 1;
}

pub mod exceptions {
    pub const ILLEGAL_FUNCTION: u8 = 0x01;
    pub const ILLEGAL_DATA_ADDRESS: u8 = 0x02;
    pub const ILLEGAL_DATA_VALUE: u8 = 0x03;
    pub const SERVER_DEVICE_FAILURE: u8 = 0x04;
    pub const ACKNOWLEDGE: u8 = 0x05;
    pub const SERVER_DEVICE_BUSY: u8 = 0x06;
    pub const MEMORY_PARITY_ERROR: u8 = 0x08;
    pub const GATEWAY_PATH_UNAVAILABLE: u8 = 0x0A;
    pub const GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND: u8 = 0x0B;
}

pub(crate) mod queue {
    /// capacity of the dispatcher request queue
    pub(crate) const REQUEST_CAPACITY: usize = 16;
    /// capacity of the observation record channel
    pub(crate) const OBSERVATION_CAPACITY: usize = 1;
}
