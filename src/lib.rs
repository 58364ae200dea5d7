//! A Modbus slave (server) speaking both the TCP and RTU framings on top of
//! [Tokio](https://docs.rs/tokio).
//!
//! Any number of TCP listeners and serial ports feed a single dispatcher
//! task, which services the canonical eight data-access function codes
//! against four in-memory tables and replies with either a normal response
//! or a Modbus exception response.
//!
//! # Supported functions
//!
//! * Read Coils
//! * Read Discrete Inputs
//! * Read Holding Registers
//! * Read Input Registers
//! * Write Single Coil
//! * Write Single Register
//! * Write Multiple Coils
//! * Write Multiple Registers
//!
//! Other well-known function codes are recognized on the wire (the RTU
//! parser can size their frames) but answered with an `IllegalFunction`
//! exception unless a custom handler is registered for them.
//!
//! # Example
//!
//! ```no_run
//! use mbslave::{Server, UnitId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(UnitId::new(0x01))?;
//!
//!     {
//!         let database = server.database();
//!         let mut tables = database.lock().await;
//!         tables.coils = vec![0; 100];
//!         tables.holding_registers = vec![0; 200];
//!     }
//!
//!     server.listen_tcp("127.0.0.1:502".parse()?).await?;
//!
//!     // ... the server runs until closed or dropped
//!     server.close();
//!     Ok(())
//! }
//! ```

#![deny(
    non_camel_case_types,
    non_shorthand_field_patterns,
    non_snake_case,
    non_upper_case_globals,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces
)]
#![forbid(unsafe_code, while_true, bare_trait_objects)]

/// public constant values related to the Modbus specification
pub mod constants;
/// error types produced by framing, transports, and construction
pub mod error;
/// Modbus exception codes
pub mod exception;
/// serial port settings for the RTU transport
pub mod serial;
/// the server, its data tables, and the function handler registry
pub mod server;
/// basic protocol types
pub mod types;

// internal modules
mod common;
mod shutdown;
mod tcp;

pub use common::frame::{Frame, RtuFrame, TcpFrame};
pub use common::function::FunctionCode;
pub use error::{AlreadyRunning, FrameError, InvalidUnitId, RequestError};
pub use exception::ExceptionCode;
pub use serial::SerialSettings;
pub use server::{Database, FunctionHandler, HandlerMap, Server};
pub use types::UnitId;
