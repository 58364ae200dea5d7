use crate::constants::frame::{
    MAX_MBAP_LENGTH_FIELD, MBAP_PREFIX_LENGTH, MIN_RTU_ADU_LENGTH,
};
use crate::error::FrameError;
use crate::exception::ExceptionCode;

fn crc16(bytes: &[u8]) -> u16 {
    let crc = crc::Crc::<u16>::new(&crc::CRC_16_MODBUS);
    crc.checksum(bytes)
}

/// MBAP + PDU frame as exchanged over TCP.
///
/// The length field always equals `data.len() + 2`, covering the unit id and
/// function code; `set_data` maintains that invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpFrame {
    pub transaction_id: u16,
    pub protocol_id: u16,
    pub length: u16,
    pub device: u8,
    pub function: u8,
    data: Vec<u8>,
}

impl TcpFrame {
    /// parse a complete ADU
    pub fn new(adu: &[u8]) -> Result<Self, FrameError> {
        if adu.len() < MBAP_PREFIX_LENGTH {
            return Err(FrameError::TooShort(adu.len()));
        }

        let transaction_id = u16::from_be_bytes([adu[0], adu[1]]);
        let protocol_id = u16::from_be_bytes([adu[2], adu[3]]);
        let length = u16::from_be_bytes([adu[4], adu[5]]);

        if protocol_id != 0 {
            return Err(FrameError::UnknownProtocolId(protocol_id));
        }
        if (length as usize) > MAX_MBAP_LENGTH_FIELD {
            return Err(FrameError::MbapLengthTooBig(
                length as usize,
                MAX_MBAP_LENGTH_FIELD,
            ));
        }
        if (length as usize) != adu.len() - 6 {
            return Err(FrameError::MbapLengthMismatch(length as usize, adu.len() - 6));
        }

        Ok(TcpFrame {
            transaction_id,
            protocol_id,
            length,
            device: adu[6],
            function: adu[7],
            data: adu[8..].to_vec(),
        })
    }

    /// build a request frame, deriving the length field from the data
    pub fn request(transaction_id: u16, device: u8, function: u8, data: Vec<u8>) -> Self {
        TcpFrame {
            transaction_id,
            protocol_id: 0,
            length: (data.len() + 2) as u16,
            device,
            function,
            data,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.length = (data.len() + 2) as u16;
        self.data = data;
    }

    pub fn set_exception(&mut self, code: ExceptionCode) {
        self.function |= 0x80;
        self.set_data(vec![code.into()]);
    }

    /// full serialized wire form
    pub fn bytes(&self) -> Vec<u8> {
        let mut adu = Vec::with_capacity(MBAP_PREFIX_LENGTH + self.data.len());
        adu.extend_from_slice(&self.transaction_id.to_be_bytes());
        adu.extend_from_slice(&self.protocol_id.to_be_bytes());
        adu.extend_from_slice(&self.length.to_be_bytes());
        adu.push(self.device);
        adu.push(self.function);
        adu.extend_from_slice(&self.data);
        adu
    }
}

/// RTU ADU: device, function, payload, trailing CRC-16/MODBUS.
///
/// `crc` is the checksum received on the wire; `bytes()` always recomputes the
/// checksum over the current contents so a mutated response stays valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtuFrame {
    pub device: u8,
    pub function: u8,
    pub crc: u16,
    data: Vec<u8>,
}

impl RtuFrame {
    /// parse a complete ADU, verifying the trailing CRC
    pub fn new(adu: &[u8]) -> Result<Self, FrameError> {
        if adu.len() < MIN_RTU_ADU_LENGTH {
            return Err(FrameError::RtuTooShort(adu.len()));
        }

        let content = &adu[..adu.len() - 2];
        let received = u16::from_le_bytes([adu[adu.len() - 2], adu[adu.len() - 1]]);
        let computed = crc16(content);
        if received != computed {
            return Err(FrameError::CrcMismatch { received, computed });
        }

        Ok(RtuFrame {
            device: adu[0],
            function: adu[1],
            crc: received,
            data: adu[2..adu.len() - 2].to_vec(),
        })
    }

    /// build a request frame with a freshly computed CRC
    pub fn request(device: u8, function: u8, data: Vec<u8>) -> Self {
        let mut frame = RtuFrame {
            device,
            function,
            crc: 0,
            data,
        };
        frame.crc = crc16(&frame.content());
        frame
    }

    fn content(&self) -> Vec<u8> {
        let mut content = Vec::with_capacity(2 + self.data.len());
        content.push(self.device);
        content.push(self.function);
        content.extend_from_slice(&self.data);
        content
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
        self.crc = crc16(&self.content());
    }

    pub fn set_exception(&mut self, code: ExceptionCode) {
        self.function |= 0x80;
        self.set_data(vec![code.into()]);
    }

    /// full serialized wire form, CRC recomputed over the current contents
    pub fn bytes(&self) -> Vec<u8> {
        let mut adu = self.content();
        let crc = crc16(&adu);
        adu.extend_from_slice(&crc.to_le_bytes());
        adu
    }
}

/// A request or response ADU, independent of the transport that framed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Tcp(TcpFrame),
    Rtu(RtuFrame),
}

impl Frame {
    pub fn device(&self) -> u8 {
        match self {
            Frame::Tcp(frame) => frame.device,
            Frame::Rtu(frame) => frame.device,
        }
    }

    pub fn function(&self) -> u8 {
        match self {
            Frame::Tcp(frame) => frame.function,
            Frame::Rtu(frame) => frame.function,
        }
    }

    /// bytes after the function code, excluding any transport trailer
    pub fn data(&self) -> &[u8] {
        match self {
            Frame::Tcp(frame) => frame.data(),
            Frame::Rtu(frame) => frame.data(),
        }
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        match self {
            Frame::Tcp(frame) => frame.set_data(data),
            Frame::Rtu(frame) => frame.set_data(data),
        }
    }

    /// turn this frame into an exception response for the given code
    pub fn set_exception(&mut self, code: ExceptionCode) {
        match self {
            Frame::Tcp(frame) => frame.set_exception(code),
            Frame::Rtu(frame) => frame.set_exception(code),
        }
    }

    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Frame::Tcp(frame) => frame.bytes(),
            Frame::Rtu(frame) => frame.bytes(),
        }
    }
}
