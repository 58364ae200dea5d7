use std::time::Duration;

use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

pub(crate) mod frame;
pub(crate) mod server;

/// Serial port configuration for an RTU transport
#[derive(Clone, Debug)]
pub struct SerialSettings {
    /// path to the serial device, e.g. `/dev/ttyUSB0` on Linux or `COM1` on Windows
    pub path: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
    /// how long a read may block before it counts as an inter-frame gap
    pub read_timeout: Duration,
}

impl SerialSettings {
    /// 19200 baud, 8 data bits, 1 stop bit, no parity, no flow control
    pub fn new(path: &str) -> Self {
        SerialSettings {
            path: path.to_string(),
            baud_rate: 19200,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
            read_timeout: Duration::from_secs(1),
        }
    }
}

pub(crate) fn open(settings: &SerialSettings) -> Result<SerialStream, std::io::Error> {
    tokio_serial::new(&settings.path, settings.baud_rate)
        .data_bits(settings.data_bits)
        .stop_bits(settings.stop_bits)
        .parity(settings.parity)
        .flow_control(settings.flow_control)
        .open_native_async()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))
}
