/// In-memory Modbus data tables.
///
/// Coils and discrete inputs use one byte per bit: 0 is off, any non-zero
/// value reads as on, and the handlers only ever write 0 or 1. Registers are
/// byte-addressed big-endian 16-bit words, so register `r` occupies bytes
/// `[2r, 2r+1]` and the register vectors must stay even in length.
///
/// Tables start empty; the owner sizes them before (or while) serving. Every
/// handler validates its addresses against the current length, so a request
/// touching bytes past the end of a table answers with IllegalDataAddress and
/// leaves the table untouched.
#[derive(Debug, Default)]
pub struct Database {
    pub coils: Vec<u8>,
    pub discrete_inputs: Vec<u8>,
    pub holding_registers: Vec<u8>,
    pub input_registers: Vec<u8>,
}

impl Database {
    /// create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// allocate tables by element count (bits for the first two, registers for the rest)
    pub fn with_sizes(
        coils: usize,
        discrete_inputs: usize,
        holding_registers: usize,
        input_registers: usize,
    ) -> Self {
        Database {
            coils: vec![0; coils],
            discrete_inputs: vec![0; discrete_inputs],
            holding_registers: vec![0; holding_registers * 2],
            input_registers: vec![0; input_registers * 2],
        }
    }
}
