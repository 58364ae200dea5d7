use scursor::ReadCursor;

use crate::common::bits::bit_at;
use crate::common::frame::Frame;
use crate::common::function::constants as fc;
use crate::constants::coil;
use crate::exception::ExceptionCode;
use crate::server::database::Database;

/// A function-code handler: reads or mutates the tables and produces the data
/// portion of the response, or an exception with the tables untouched.
pub type FunctionHandler = fn(&mut Database, &Frame) -> Result<Vec<u8>, ExceptionCode>;

/// Registry mapping function codes to handlers.
///
/// The default registry contains the eight canonical data-access codes.
/// Entries may be replaced or added, but only before the server starts
/// receiving requests; the dispatcher treats the registry as read-only.
pub struct HandlerMap {
    handlers: [Option<FunctionHandler>; 256],
}

impl HandlerMap {
    pub fn new() -> Self {
        let mut map = HandlerMap {
            handlers: [None; 256],
        };
        map.register(fc::READ_COILS, read_coils);
        map.register(fc::READ_DISCRETE_INPUTS, read_discrete_inputs);
        map.register(fc::READ_HOLDING_REGISTERS, read_holding_registers);
        map.register(fc::READ_INPUT_REGISTERS, read_input_registers);
        map.register(fc::WRITE_SINGLE_COIL, write_single_coil);
        map.register(fc::WRITE_SINGLE_REGISTER, write_single_register);
        map.register(fc::WRITE_MULTIPLE_COILS, write_multiple_coils);
        map.register(fc::WRITE_MULTIPLE_REGISTERS, write_multiple_registers);
        map
    }

    /// replace or add the handler for a function code
    pub fn register(&mut self, function: u8, handler: FunctionHandler) {
        self.handlers[function as usize] = Some(handler);
    }

    pub(crate) fn get(&self, function: u8) -> Option<FunctionHandler> {
        self.handlers[function as usize]
    }
}

impl Default for HandlerMap {
    fn default() -> Self {
        Self::new()
    }
}

/// starting address and element count from the first four data bytes
fn address_and_count(frame: &Frame) -> Result<(usize, usize), ExceptionCode> {
    let mut cursor = ReadCursor::new(frame.data());
    let start = cursor
        .read_u16_be()
        .map_err(|_| ExceptionCode::IllegalDataValue)? as usize;
    let count = cursor
        .read_u16_be()
        .map_err(|_| ExceptionCode::IllegalDataValue)? as usize;
    Ok((start, count))
}

/// address and value from the first four data bytes of a single-write request
fn address_and_value(frame: &Frame) -> Result<(usize, u16), ExceptionCode> {
    let mut cursor = ReadCursor::new(frame.data());
    let address = cursor
        .read_u16_be()
        .map_err(|_| ExceptionCode::IllegalDataValue)? as usize;
    let value = cursor
        .read_u16_be()
        .map_err(|_| ExceptionCode::IllegalDataValue)?;
    Ok((address, value))
}

/// write requests echo the first four data bytes of the request
fn echo(frame: &Frame) -> Result<Vec<u8>, ExceptionCode> {
    match frame.data().get(..4) {
        Some(bytes) => Ok(bytes.to_vec()),
        None => Err(ExceptionCode::IllegalDataValue),
    }
}

fn read_bits(table: &[u8], frame: &Frame) -> Result<Vec<u8>, ExceptionCode> {
    let (start, count) = address_and_count(frame)?;
    let end = start + count;
    if end > table.len() {
        return Err(ExceptionCode::IllegalDataAddress);
    }

    let byte_count = count.div_ceil(8);
    let mut data = vec![0; 1 + byte_count];
    data[0] = byte_count as u8;
    for (i, value) in table[start..end].iter().enumerate() {
        if *value != 0 {
            data[1 + i / 8] |= 1 << (i % 8);
        }
    }
    Ok(data)
}

fn read_words(table: &[u8], frame: &Frame) -> Result<Vec<u8>, ExceptionCode> {
    let (start, count) = address_and_count(frame)?;
    let end = start + count;
    if 2 * end > table.len() {
        return Err(ExceptionCode::IllegalDataAddress);
    }

    let mut data = Vec::with_capacity(1 + 2 * count);
    data.push((2 * count) as u8);
    data.extend_from_slice(&table[2 * start..2 * end]);
    Ok(data)
}

/// function 1, read coils as LSB-first packed bits
pub fn read_coils(db: &mut Database, frame: &Frame) -> Result<Vec<u8>, ExceptionCode> {
    read_bits(&db.coils, frame)
}

/// function 2, read discrete inputs as LSB-first packed bits
pub fn read_discrete_inputs(db: &mut Database, frame: &Frame) -> Result<Vec<u8>, ExceptionCode> {
    read_bits(&db.discrete_inputs, frame)
}

/// function 3, read holding registers
pub fn read_holding_registers(db: &mut Database, frame: &Frame) -> Result<Vec<u8>, ExceptionCode> {
    read_words(&db.holding_registers, frame)
}

/// function 4, read input registers
pub fn read_input_registers(db: &mut Database, frame: &Frame) -> Result<Vec<u8>, ExceptionCode> {
    read_words(&db.input_registers, frame)
}

/// function 5, write a single coil
pub fn write_single_coil(db: &mut Database, frame: &Frame) -> Result<Vec<u8>, ExceptionCode> {
    let (address, value) = address_and_value(frame)?;

    if address >= db.coils.len() {
        return Err(ExceptionCode::IllegalDataAddress);
    }

    match value {
        coil::OFF => db.coils[address] = 0,
        coil::ON | coil::ON_ALT => db.coils[address] = 1,
        _ => return Err(ExceptionCode::IllegalDataValue),
    }

    echo(frame)
}

/// function 6, write a single holding register
pub fn write_single_register(db: &mut Database, frame: &Frame) -> Result<Vec<u8>, ExceptionCode> {
    let (address, value) = address_and_value(frame)?;

    if 2 * (address + 1) > db.holding_registers.len() {
        return Err(ExceptionCode::IllegalDataAddress);
    }

    db.holding_registers[2 * address..2 * (address + 1)].copy_from_slice(&value.to_be_bytes());
    echo(frame)
}

/// function 15, write multiple coils from an LSB-first packed bit payload
pub fn write_multiple_coils(db: &mut Database, frame: &Frame) -> Result<Vec<u8>, ExceptionCode> {
    let (start, count) = address_and_count(frame)?;
    let end = start + count;

    if end > db.coils.len() {
        return Err(ExceptionCode::IllegalDataAddress);
    }

    // skip the byte-count byte at offset 4
    let payload = match frame.data().get(5..) {
        Some(bytes) => bytes,
        None => return Err(ExceptionCode::IllegalDataValue),
    };
    if payload.len() * 8 < count {
        return Err(ExceptionCode::IllegalDataValue);
    }

    let mut written = 0;
    'bytes: for (i, value) in payload.iter().enumerate() {
        for pos in 0..8 {
            if written == count {
                break 'bytes;
            }
            db.coils[start + i * 8 + pos] = bit_at(*value, pos);
            written += 1;
        }
    }

    echo(frame)
}

/// function 16, write multiple holding registers
pub fn write_multiple_registers(db: &mut Database, frame: &Frame) -> Result<Vec<u8>, ExceptionCode> {
    let (start, count) = address_and_count(frame)?;
    let end = start + count;

    let payload = match frame.data().get(5..) {
        Some(bytes) => bytes,
        None => return Err(ExceptionCode::IllegalDataValue),
    };
    if payload.len() / 2 != count {
        return Err(ExceptionCode::IllegalDataAddress);
    }
    if 2 * end > db.holding_registers.len() {
        return Err(ExceptionCode::IllegalDataAddress);
    }

    db.holding_registers[2 * start..2 * end].copy_from_slice(&payload[..2 * count]);
    echo(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::bits::words_to_be_bytes;
    use crate::common::frame::TcpFrame;

    fn request(function: u8, data: Vec<u8>) -> Frame {
        Frame::Tcp(TcpFrame::request(1, 0xFF, function, data))
    }

    fn range_request(function: u8, start: u16, count: u16) -> Frame {
        let mut data = start.to_be_bytes().to_vec();
        data.extend_from_slice(&count.to_be_bytes());
        request(function, data)
    }

    fn multi_write_request(function: u8, start: u16, count: u16, payload: &[u8]) -> Frame {
        let mut data = start.to_be_bytes().to_vec();
        data.extend_from_slice(&count.to_be_bytes());
        data.push(payload.len() as u8);
        data.extend_from_slice(payload);
        request(function, data)
    }

    #[test]
    fn reads_coils_as_packed_bits() {
        let mut db = Database::default();
        db.coils = vec![0; 65535];
        db.coils[10] = 1;
        db.coils[11] = 1;
        db.coils[17] = 1;
        db.coils[18] = 1;

        let frame = range_request(fc::READ_COILS, 10, 9);
        assert_eq!(
            read_coils(&mut db, &frame).unwrap(),
            vec![0x02, 0x83, 0x01]
        );
    }

    #[test]
    fn reads_discrete_inputs_as_packed_bits() {
        let mut db = Database::default();
        db.discrete_inputs = vec![0; 500];
        db.discrete_inputs[0] = 1;
        db.discrete_inputs[7] = 1;
        db.discrete_inputs[8] = 1;
        db.discrete_inputs[9] = 1;

        let frame = range_request(fc::READ_DISCRETE_INPUTS, 0, 10);
        assert_eq!(
            read_discrete_inputs(&mut db, &frame).unwrap(),
            vec![0x02, 0x81, 0x03]
        );
    }

    #[test]
    fn reads_holding_registers_verbatim() {
        let mut db = Database::default();
        db.holding_registers = vec![0; 500];
        db.holding_registers[200..206].copy_from_slice(&[0x00, 0x01, 0x00, 0x02, 0xFF, 0xFF]);

        let frame = range_request(fc::READ_HOLDING_REGISTERS, 100, 3);
        assert_eq!(
            read_holding_registers(&mut db, &frame).unwrap(),
            vec![0x06, 0x00, 0x01, 0x00, 0x02, 0xFF, 0xFF]
        );
    }

    #[test]
    fn reads_input_registers_verbatim() {
        let mut db = Database::default();
        db.input_registers = vec![0; 500];
        db.input_registers[400..406].copy_from_slice(&[0x00, 0x01, 0x00, 0x02, 0xFF, 0xFF]);

        let frame = range_request(fc::READ_INPUT_REGISTERS, 200, 3);
        assert_eq!(
            read_input_registers(&mut db, &frame).unwrap(),
            vec![0x06, 0x00, 0x01, 0x00, 0x02, 0xFF, 0xFF]
        );
    }

    #[test]
    fn writes_single_coil_with_permissive_on_value() {
        let mut db = Database::default();
        db.coils = vec![0; 100_000];

        let frame = range_request(fc::WRITE_SINGLE_COIL, 65535, 0xFFFF);
        let echoed = write_single_coil(&mut db, &frame).unwrap();
        assert_eq!(echoed, vec![0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(db.coils[65535], 1);
    }

    #[test]
    fn writes_single_coil_on_and_off_sentinels() {
        let mut db = Database::default();
        db.coils = vec![0; 10];

        let on = range_request(fc::WRITE_SINGLE_COIL, 3, coil::ON);
        write_single_coil(&mut db, &on).unwrap();
        assert_eq!(db.coils[3], 1);

        let off = range_request(fc::WRITE_SINGLE_COIL, 3, coil::OFF);
        write_single_coil(&mut db, &off).unwrap();
        assert_eq!(db.coils[3], 0);
    }

    #[test]
    fn rejects_unknown_coil_state() {
        let mut db = Database::default();
        db.coils = vec![0; 10];

        let frame = range_request(fc::WRITE_SINGLE_COIL, 3, 0x1234);
        assert_eq!(
            write_single_coil(&mut db, &frame),
            Err(ExceptionCode::IllegalDataValue)
        );
        assert_eq!(db.coils[3], 0);
    }

    #[test]
    fn writes_single_register_big_endian() {
        let mut db = Database::default();
        db.holding_registers = vec![0; 100];

        let frame = range_request(fc::WRITE_SINGLE_REGISTER, 5, 6);
        write_single_register(&mut db, &frame).unwrap();
        assert_eq!(db.holding_registers[10..12], [0, 6]);
    }

    #[test]
    fn writes_multiple_coils_lsb_first() {
        let mut db = Database::default();
        db.coils = vec![0; 500];

        let frame = multi_write_request(fc::WRITE_MULTIPLE_COILS, 1, 2, &[0x03]);
        let echoed = write_multiple_coils(&mut db, &frame).unwrap();
        assert_eq!(echoed, vec![0x00, 0x01, 0x00, 0x02]);
        assert_eq!(db.coils[1..4], [1, 1, 0]);
    }

    #[test]
    fn ignores_padding_bits_past_the_count() {
        let mut db = Database::default();
        db.coils = vec![0; 16];

        let frame = multi_write_request(fc::WRITE_MULTIPLE_COILS, 0, 3, &[0xFF]);
        write_multiple_coils(&mut db, &frame).unwrap();
        assert_eq!(db.coils[..5], [1, 1, 1, 0, 0]);
    }

    #[test]
    fn writes_multiple_registers_verbatim() {
        let mut db = Database::default();
        db.holding_registers = vec![0; 500];

        let payload = words_to_be_bytes(&[3, 4]);
        let frame = multi_write_request(fc::WRITE_MULTIPLE_REGISTERS, 1, 2, &payload);
        let echoed = write_multiple_registers(&mut db, &frame).unwrap();
        assert_eq!(echoed, vec![0x00, 0x01, 0x00, 0x02]);
        assert_eq!(db.holding_registers[2..6], [0, 3, 0, 4]);
    }

    #[test]
    fn rejects_register_payload_count_mismatch() {
        let mut db = Database::default();
        db.holding_registers = vec![0; 500];

        let payload = words_to_be_bytes(&[3]);
        let frame = multi_write_request(fc::WRITE_MULTIPLE_REGISTERS, 1, 2, &payload);
        assert_eq!(
            write_multiple_registers(&mut db, &frame),
            Err(ExceptionCode::IllegalDataAddress)
        );
    }

    #[test]
    fn out_of_range_requests_leave_tables_unchanged() {
        let mut db = Database::default();

        for frame in [
            range_request(fc::READ_COILS, 65535, 2),
            range_request(fc::READ_DISCRETE_INPUTS, 65535, 2),
            range_request(fc::READ_HOLDING_REGISTERS, 65535, 2),
            range_request(fc::READ_INPUT_REGISTERS, 65535, 2),
            multi_write_request(fc::WRITE_MULTIPLE_COILS, 65535, 2, &[0x03]),
            multi_write_request(
                fc::WRITE_MULTIPLE_REGISTERS,
                65535,
                2,
                &words_to_be_bytes(&[0, 0]),
            ),
        ] {
            let handler = HandlerMap::new().get(frame.function()).unwrap();
            assert_eq!(
                handler(&mut db, &frame),
                Err(ExceptionCode::IllegalDataAddress)
            );
        }

        assert!(db.coils.is_empty());
        assert!(db.discrete_inputs.is_empty());
        assert!(db.holding_registers.is_empty());
        assert!(db.input_registers.is_empty());
    }

    #[test]
    fn read_after_write_round_trips_registers() {
        let mut db = Database::default();
        db.holding_registers = vec![0; 64];

        let payload = words_to_be_bytes(&[0xCAFE, 0x0001, 0xFF00]);
        let write = multi_write_request(fc::WRITE_MULTIPLE_REGISTERS, 4, 3, &payload);
        write_multiple_registers(&mut db, &write).unwrap();

        let read = range_request(fc::READ_HOLDING_REGISTERS, 4, 3);
        let mut expected = vec![6];
        expected.extend_from_slice(&payload);
        assert_eq!(read_holding_registers(&mut db, &read).unwrap(), expected);
    }

    #[test]
    fn read_after_write_round_trips_coils() {
        let mut db = Database::default();
        db.coils = vec![0; 64];

        let write = multi_write_request(fc::WRITE_MULTIPLE_COILS, 8, 9, &[0xFF, 0x01]);
        write_multiple_coils(&mut db, &write).unwrap();

        let read = range_request(fc::READ_COILS, 8, 9);
        assert_eq!(read_coils(&mut db, &read).unwrap(), vec![0x02, 0xFF, 0x01]);
    }
}
