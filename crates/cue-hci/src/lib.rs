// SPDX-License-Identifier: Apache-2.0
//! cue-hci: BLE HCI glue for the cue engine.
//!
//! Everything the event-agnostic engine leaves to the host, for a
//! BlueNRG-flavoured controller: the bit-exact event envelope
//! ([`EventBuf`]), event-code constants, typed payload decoding, the
//! address book and discovery database filled while scanning and
//! walking GATT, diagnostics, the outbound [`CommandPort`] seam, and
//! two ready-made protocols (observation and GATT walk) written
//! against the engine's script API.
//!
//! The transport itself is out of scope: events come in through
//! [`cue_core::Dispatcher::on_event`], commands go out through a
//! host-provided [`CommandPort`] implementation.

#![forbid(unsafe_code)]
#![deny(missing_docs, unused_must_use)]
#![warn(rust_2018_idioms)]
#![deny(
    clippy::all,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]

pub mod address;
pub mod codes;
pub mod db;
pub mod decode;
pub mod event;
pub mod observe;
pub mod port;
pub mod trace;
pub mod walk;

pub use address::{AddrEntry, AddressBook, BdAddr};
pub use db::{DiscoveryDb, IngestContext, Record, RecordData, RecordKind};
pub use decode::{
    AdvertisingInfo, AttListResponse, AttributeInfo, ConnUpdateRequest, ConnectionComplete,
    DisconnectionComplete, HandleValuePair, Uuid,
};
pub use event::{EventBuf, PacketError, MAX_PACKET};
pub use observe::Observer;
pub use port::{CommandPort, CommandResult, GapHandles, Role, ScanParams, Status};
pub use walk::Central;

/// Default device name written into the GAP service.
pub const DEFAULT_DEVICE_NAME: &str = "cue-scanner";

/// Default public address, matching the vendor evaluation boards.
pub const DEFAULT_ADDRESS: BdAddr = BdAddr([0x12, 0x34, 0x00, 0xE1, 0x80, 0x02]);
