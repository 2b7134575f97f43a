// SPDX-License-Identifier: Apache-2.0
//! Ready-made observation protocol: boot the controller, scan for a
//! while, and collect every advertiser seen into an address book.

use tracing::{debug, info, warn};

use cue_core::{EventCheck, Protocol, Rule, Script};

use crate::address::{AddressBook, BdAddr};
use crate::codes::{
    ADV_DIRECT_IND, ADV_IND, EVT_LE_ADVERTISING_REPORT, GAP_OBSERVATION_PROC, PUBLIC_ADDR,
    RESET_NORMAL,
};
use crate::decode::advertising_info;
use crate::event::EventBuf;
use crate::port::{CommandPort, Role, ScanParams};
use crate::trace;
use crate::{DEFAULT_ADDRESS, DEFAULT_DEVICE_NAME};

/// How long to wait for the controller's reset event.
const BOOT_TIMEOUT_MS: u64 = 2_000;
/// How long to wait for the procedure-complete after stopping.
const DRAIN_TIMEOUT_MS: u64 = 1_000;

/// Context for the observation protocol.
pub struct Observer<P> {
    /// The outbound command seam.
    pub port: P,
    /// Devices seen while scanning.
    pub found: AddressBook,
    /// Name written into the GAP device-name characteristic.
    pub device_name: &'static str,
    /// Our public address.
    pub address: BdAddr,
    /// Scan timing handed to the controller.
    pub scan: ScanParams,
    /// How long to collect advertising reports, in milliseconds.
    pub scan_ms: u64,
}

impl<P> Observer<P> {
    /// Observer with default name, address, and a 10-second scan.
    pub fn new(port: P) -> Self {
        Self {
            port,
            found: AddressBook::default(),
            device_name: DEFAULT_DEVICE_NAME,
            address: DEFAULT_ADDRESS,
            scan: ScanParams::default(),
            scan_ms: 10_000,
        }
    }
}

/// The observation protocol, ready for
/// [`set_current_protocol`](cue_core::Dispatcher::set_current_protocol).
#[must_use]
pub fn protocol<P: CommandPort>() -> Protocol<EventBuf, Observer<P>> {
    Protocol::new("observation", body::<P>)
}

fn body<P: CommandPort>(script: &mut Script<'_, EventBuf, Observer<P>>) -> bool {
    script.step(|cue| {
        // Blanket traps for anything the expectations below don't
        // cover; they persist for the whole protocol.
        cue.expect_global(Rule::watch_when(trace::note_initialization));
        cue.expect_global(Rule::watch_when(trace::note_any_event));

        cue.perform(boot, "boot");
        cue.expect(Rule::on(EventCheck::reset_reason(RESET_NORMAL), set_address));
        cue.until_event(EventCheck::reset_reason(RESET_NORMAL));
        cue.timeout_ms(BOOT_TIMEOUT_MS);
    });
    script.step(|cue| {
        cue.perform(begin_scan, "begin_scan");
        cue.expect(Rule::on(
            EventCheck::meta_subevent(EVT_LE_ADVERTISING_REPORT),
            record_report,
        ));
        let window = cue.context().scan_ms;
        cue.timeout_ms(window);
    });
    script.step(|cue| {
        cue.perform(end_scan, "end_scan");
        cue.until_event(EventCheck::procedure_complete(u16::from(GAP_OBSERVATION_PROC)));
        cue.timeout_ms(DRAIN_TIMEOUT_MS);
    });
    script.finish(|ctx| info!(devices = %ctx.found, "observation finished"));
    script.outcome()
}

fn boot<P: CommandPort>(ctx: &mut Observer<P>) -> bool {
    match ctx.port.start_controller() {
        Ok(()) => true,
        Err(status) => {
            warn!(%status, "controller start failed");
            false
        }
    }
}

fn set_address<P: CommandPort>(_event: &EventBuf, ctx: &mut Observer<P>) -> bool {
    match ctx.port.set_public_address(ctx.address) {
        Ok(()) => true,
        Err(status) => {
            warn!(%status, "setting public address failed");
            false
        }
    }
}

/// GATT/GAP init in the observer role, then kick off the scan.
fn begin_scan<P: CommandPort>(ctx: &mut Observer<P>) -> bool {
    if let Err(status) = ctx.port.init_gatt() {
        warn!(%status, "GATT init failed");
        return false;
    }
    let handles = match ctx.port.init_gap(Role::Observer) {
        Ok(handles) => handles,
        Err(status) => {
            warn!(%status, "GAP init failed");
            return false;
        }
    };
    if let Err(status) = ctx.port.update_char_value(
        handles.service,
        handles.device_name,
        ctx.device_name.as_bytes(),
    ) {
        warn!(%status, "writing device name failed");
        return false;
    }
    if let Err(status) = ctx.port.start_observation(ctx.scan) {
        warn!(%status, "starting observation failed");
        return false;
    }
    debug!("observation scan started");
    true
}

fn record_report<P: CommandPort>(event: &EventBuf, ctx: &mut Observer<P>) -> bool {
    let Some(report) = advertising_info(event) else {
        return false;
    };
    let connectable = matches!(report.evt_type, ADV_IND | ADV_DIRECT_IND);
    let public = report.bdaddr_type == PUBLIC_ADDR;
    if ctx.found.add(report.bdaddr, connectable, public) {
        debug!(addr = %report.bdaddr, rssi = report.rssi, connectable, "device found");
    }
    true
}

fn end_scan<P: CommandPort>(ctx: &mut Observer<P>) -> bool {
    match ctx.port.terminate_procedure(GAP_OBSERVATION_PROC) {
        Ok(()) => true,
        Err(status) => {
            warn!(%status, "terminating observation failed");
            false
        }
    }
}
