// SPDX-License-Identifier: Apache-2.0
//! Shared fixtures: a settable per-thread clock and a recording
//! command-port double.
#![allow(dead_code)] // each test binary uses its own slice of this

use std::cell::Cell;

use cue_hci::{
    AttributeInfo, BdAddr, CommandPort, CommandResult, ConnUpdateRequest, GapHandles, Role,
    ScanParams, Status,
};

thread_local! {
    static NOW_MS: Cell<u64> = const { Cell::new(0) };
}

/// Clock collaborator reading the per-thread test time.
pub fn test_clock() -> u64 {
    NOW_MS.with(Cell::get)
}

pub fn set_now(ms: u64) {
    NOW_MS.with(|now| now.set(ms));
}

/// Command port that records every command and can be told to fail one
/// of them.
#[derive(Debug, Default)]
pub struct FakePort {
    pub issued: Vec<&'static str>,
    pub fail: Option<&'static str>,
    pub peers: Vec<BdAddr>,
}

impl FakePort {
    pub fn failing(command: &'static str) -> Self {
        Self { fail: Some(command), ..Self::default() }
    }

    fn issue(&mut self, command: &'static str) -> CommandResult {
        self.issued.push(command);
        if self.fail == Some(command) {
            Err(Status::new(0x0C))
        } else {
            Ok(())
        }
    }
}

impl CommandPort for FakePort {
    fn start_controller(&mut self) -> CommandResult {
        self.issue("start_controller")
    }

    fn set_public_address(&mut self, _addr: BdAddr) -> CommandResult {
        self.issue("set_public_address")
    }

    fn init_gatt(&mut self) -> CommandResult {
        self.issue("init_gatt")
    }

    fn init_gap(&mut self, _role: Role) -> Result<GapHandles, Status> {
        self.issue("init_gap")?;
        Ok(GapHandles { service: 1, device_name: 2, appearance: 3 })
    }

    fn update_char_value(
        &mut self,
        _service: u16,
        _characteristic: u16,
        _value: &[u8],
    ) -> CommandResult {
        self.issue("update_char_value")
    }

    fn start_observation(&mut self, _scan: ScanParams) -> CommandResult {
        self.issue("start_observation")
    }

    fn start_general_discovery(&mut self, _scan: ScanParams) -> CommandResult {
        self.issue("start_general_discovery")
    }

    fn create_connection(&mut self, peer: BdAddr) -> CommandResult {
        self.peers.push(peer);
        self.issue("create_connection")
    }

    fn terminate_connection(&mut self, _conn_handle: u16) -> CommandResult {
        self.issue("terminate_connection")
    }

    fn terminate_procedure(&mut self, _procedure: u8) -> CommandResult {
        self.issue("terminate_procedure")
    }

    fn conn_update_response(
        &mut self,
        _request: &ConnUpdateRequest,
        _accept: bool,
    ) -> CommandResult {
        self.issue("conn_update_response")
    }

    fn discover_primary_services(&mut self, _conn_handle: u16) -> CommandResult {
        self.issue("discover_primary_services")
    }

    fn find_included_services(&mut self, _attr: &AttributeInfo) -> CommandResult {
        self.issue("find_included_services")
    }

    fn discover_characteristics(&mut self, _attr: &AttributeInfo) -> CommandResult {
        self.issue("discover_characteristics")
    }
}

/// An advertising report for `addr` with the given advertising event
/// type and address type.
pub fn adv_report(addr: BdAddr, evt_type: u8, addr_type: u8) -> cue_hci::EventBuf {
    let mut data = vec![0x01, evt_type, addr_type];
    data.extend_from_slice(&addr.0);
    data.push(3); // advertising data length
    data.extend_from_slice(&[0x02, 0x01, 0x06]);
    data.push(0xC0); // RSSI
    cue_hci::EventBuf::meta(cue_hci::codes::EVT_LE_ADVERTISING_REPORT as u8, &data)
        .expect("report fits")
}
