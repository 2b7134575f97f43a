// SPDX-License-Identifier: Apache-2.0
//! The outbound command seam.
//!
//! Events flow in through the dispatcher; commands flow out through
//! [`CommandPort`]. The engine stays free of I/O: hosts implement this
//! trait on top of their transport (SPI, UART, a test double), and the
//! ready-made protocols call it from their perform actions.

use thiserror::Error;

use crate::address::BdAddr;
use crate::decode::{AttributeInfo, ConnUpdateRequest};
use crate::trace::status_name;

/// One-byte command status returned by the controller; nonzero is
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("command status {code:#04x} ({})", status_name(*.code))]
pub struct Status {
    /// The raw status byte.
    pub code: u8,
}

impl Status {
    /// Builds a status from the raw byte.
    #[must_use]
    pub const fn new(code: u8) -> Self {
        Self { code }
    }

    /// The controller's timeout status; commands reporting it may be
    /// treated as still-in-progress rather than failed.
    pub const TIMEOUT: Self = Self::new(0xFF);
}

/// Result of issuing a command.
pub type CommandResult = Result<(), Status>;

/// GAP role to initialize the controller into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Scan-only observer.
    Observer,
    /// Central: discovery plus connections.
    Central,
}

/// Handles returned by GAP initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapHandles {
    /// The GAP service handle.
    pub service: u16,
    /// Characteristic handle for the device name.
    pub device_name: u16,
    /// Characteristic handle for the appearance value.
    pub appearance: u16,
}

/// Scan timing; values are in 0.625 ms units per the controller's
/// convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParams {
    /// Time between scan windows.
    pub interval: u16,
    /// Length of one scan window.
    pub window: u16,
    /// Whether the controller should filter duplicate reports.
    pub filter_duplicates: bool,
}

impl Default for ScanParams {
    fn default() -> Self {
        // 10 s between scans, 4 s of scanning.
        Self { interval: 16000, window: 6400, filter_duplicates: false }
    }
}

/// Commands the protocols issue to the controller. Each method wraps
/// one controller operation and reports its one-byte status.
#[allow(clippy::missing_errors_doc)] // every method: Err is the controller's status byte
pub trait CommandPort {
    /// Initializes the transport and resets the controller. Completion
    /// shows up as a "HAL initialized" event.
    fn start_controller(&mut self) -> CommandResult;

    /// Writes the public device address into the controller's
    /// configuration.
    fn set_public_address(&mut self, addr: BdAddr) -> CommandResult;

    /// Initializes the GATT server.
    fn init_gatt(&mut self) -> CommandResult;

    /// Initializes GAP in the given role.
    fn init_gap(&mut self, role: Role) -> Result<GapHandles, Status>;

    /// Updates a characteristic value (used for the device name).
    fn update_char_value(&mut self, service: u16, characteristic: u16, value: &[u8])
        -> CommandResult;

    /// Starts the GAP observation procedure. Reports arrive as LE
    /// advertising-report meta events.
    fn start_observation(&mut self, scan: ScanParams) -> CommandResult;

    /// Starts the GAP general-discovery procedure.
    fn start_general_discovery(&mut self, scan: ScanParams) -> CommandResult;

    /// Creates a connection to `peer`. Completion shows up as an LE
    /// connection-complete meta event.
    fn create_connection(&mut self, peer: BdAddr) -> CommandResult;

    /// Terminates the connection. Completion shows up as a
    /// disconnection-complete event.
    fn terminate_connection(&mut self, conn_handle: u16) -> CommandResult;

    /// Terminates an ongoing GAP procedure by its procedure code.
    fn terminate_procedure(&mut self, procedure: u8) -> CommandResult;

    /// Answers the peer's connection-parameter-update request.
    fn conn_update_response(&mut self, request: &ConnUpdateRequest, accept: bool) -> CommandResult;

    /// Discovers all primary services on the connection. The responses
    /// arrive as ATT read-by-group-type events, closed by a GATT
    /// procedure-complete event.
    fn discover_primary_services(&mut self, conn_handle: u16) -> CommandResult;

    /// Finds services included in the given service's handle range.
    fn find_included_services(&mut self, attr: &AttributeInfo) -> CommandResult;

    /// Discovers the characteristics in the given service's handle
    /// range. The responses arrive as ATT read-by-type events, closed
    /// by a GATT procedure-complete event.
    fn discover_characteristics(&mut self, attr: &AttributeInfo) -> CommandResult;
}
