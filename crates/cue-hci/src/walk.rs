// SPDX-License-Identifier: Apache-2.0
//! Ready-made GATT walk: discover devices, connect to the first
//! connectable one, and fold its primary services and their
//! characteristics into a discovery database.

use tracing::{debug, info, warn};

use cue_core::{EventCheck, Protocol, Rule, Script};

use crate::address::{AddressBook, BdAddr};
use crate::codes::{
    ADV_DIRECT_IND, ADV_IND, EVT_BLUE_ATT_READ_BY_GROUP_TYPE_RESP, EVT_BLUE_ATT_READ_BY_TYPE_RESP,
    EVT_BLUE_GATT_PROCEDURE_COMPLETE, EVT_BLUE_L2CAP_CONN_UPD_REQ, EVT_DISCONN_COMPLETE,
    EVT_LE_ADVERTISING_REPORT, EVT_LE_CONN_COMPLETE, GAP_GENERAL_DISCOVERY_PROC, PUBLIC_ADDR,
    RESET_NORMAL,
};
use crate::db::{DiscoveryDb, IngestContext, Record, RecordKind};
use crate::decode::{advertising_info, conn_update_request, connection_complete};
use crate::event::EventBuf;
use crate::port::{CommandPort, Role, ScanParams};
use crate::trace;
use crate::{DEFAULT_ADDRESS, DEFAULT_DEVICE_NAME};

/// How long to wait for the controller's reset event.
const BOOT_TIMEOUT_MS: u64 = 2_000;
/// Fallback for the connection-complete event.
const CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Fallback for ATT discovery procedures.
const PROCEDURE_TIMEOUT_MS: u64 = 3_000;

/// Context for the GATT-walk protocol.
pub struct Central<P> {
    /// The outbound command seam.
    pub port: P,
    /// Devices seen during general discovery.
    pub found: AddressBook,
    /// Everything discovered on the connected device.
    pub db: DiscoveryDb,
    /// Handle of the active connection (valid when `connected`).
    pub conn_handle: u16,
    /// Whether a connection is up.
    pub connected: bool,
    /// Address we connected to.
    pub target: Option<BdAddr>,
    /// Database index of the connected device's record.
    pub device_index: Option<usize>,
    /// Where ATT responses are filed while a discovery runs.
    pub ingest: IngestContext,
    /// Name written into the GAP device-name characteristic.
    pub device_name: &'static str,
    /// Our public address.
    pub address: BdAddr,
    /// Scan timing handed to the controller.
    pub scan: ScanParams,
    /// How long to run general discovery if no completion arrives.
    pub discovery_ms: u64,
}

impl<P> Central<P> {
    /// Central with default name, address, and discovery window.
    pub fn new(port: P) -> Self {
        Self {
            port,
            found: AddressBook::default(),
            db: DiscoveryDb::default(),
            conn_handle: 0,
            connected: false,
            target: None,
            device_index: None,
            ingest: IngestContext::default(),
            device_name: DEFAULT_DEVICE_NAME,
            address: DEFAULT_ADDRESS,
            scan: ScanParams { filter_duplicates: true, ..ScanParams::default() },
            discovery_ms: 10_000,
        }
    }
}

/// The GATT-walk protocol, ready for
/// [`set_current_protocol`](cue_core::Dispatcher::set_current_protocol).
#[must_use]
pub fn protocol<P: CommandPort>() -> Protocol<EventBuf, Central<P>> {
    Protocol::new("gatt_walk", body::<P>)
}

fn body<P: CommandPort>(script: &mut Script<'_, EventBuf, Central<P>>) -> bool {
    script.step(|cue| {
        cue.expect_global(Rule::watch_when(trace::note_initialization));
        cue.expect_global(Rule::watch_when(trace::note_any_event));

        cue.perform(boot, "boot");
        cue.expect(Rule::on(EventCheck::reset_reason(RESET_NORMAL), set_address));
        cue.until_event(EventCheck::reset_reason(RESET_NORMAL));
        cue.timeout_ms(BOOT_TIMEOUT_MS);
    });
    script.step(|cue| {
        cue.perform(begin_discovery, "begin_discovery");
        cue.expect(Rule::on(
            EventCheck::meta_subevent(EVT_LE_ADVERTISING_REPORT),
            record_report,
        ));
        cue.until_event(EventCheck::procedure_complete(u16::from(GAP_GENERAL_DISCOVERY_PROC)));
        let window = cue.context().discovery_ms;
        cue.timeout_ms(window);
    });
    script.step(|cue| {
        cue.perform(connect_first, "connect_first");
        cue.expect_exclusive(Rule::on(
            EventCheck::meta_subevent(EVT_LE_CONN_COMPLETE),
            record_connection,
        ));
        cue.expect(Rule::on(
            EventCheck::vendor(EVT_BLUE_L2CAP_CONN_UPD_REQ),
            answer_conn_update,
        ));
        cue.until_event(EventCheck::meta_subevent(EVT_LE_CONN_COMPLETE));
        cue.timeout_ms(CONNECT_TIMEOUT_MS);
    });
    script.step(|cue| {
        cue.perform(discover_services, "discover_services");
        cue.expect(Rule::on(
            EventCheck::vendor(EVT_BLUE_ATT_READ_BY_GROUP_TYPE_RESP),
            ingest_response,
        ));
        cue.expect(Rule::on(
            EventCheck::vendor(EVT_BLUE_L2CAP_CONN_UPD_REQ),
            answer_conn_update,
        ));
        cue.until_event(EventCheck::vendor(EVT_BLUE_GATT_PROCEDURE_COMPLETE));
        cue.timeout_ms(PROCEDURE_TIMEOUT_MS);
    });
    script.step_while(
        |cue| {
            cue.perform(discover_next_characteristics, "discover_next_characteristics");
            cue.expect(Rule::on(
                EventCheck::vendor(EVT_BLUE_ATT_READ_BY_TYPE_RESP),
                ingest_response,
            ));
            cue.until_event(EventCheck::vendor(EVT_BLUE_GATT_PROCEDURE_COMPLETE));
            cue.timeout_ms(PROCEDURE_TIMEOUT_MS);
        },
        services_remain,
    );
    script.step(|cue| {
        cue.perform(disconnect, "disconnect");
        cue.until_event(EventCheck::event(EVT_DISCONN_COMPLETE));
        cue.timeout_ms(BOOT_TIMEOUT_MS);
    });
    script.finish(|ctx| info!(db = %ctx.db, "walk finished"));
    script.outcome()
}

/// The staged characteristics discovery takes one service; repeat the
/// step while more than that one remains unprocessed.
fn services_remain<P>(ctx: &Central<P>) -> bool {
    ctx.device_index
        .is_some_and(|device| ctx.db.unprocessed_for_device(RecordKind::PrimaryService, device) > 1)
}

fn boot<P: CommandPort>(ctx: &mut Central<P>) -> bool {
    match ctx.port.start_controller() {
        Ok(()) => true,
        Err(status) => {
            warn!(%status, "controller start failed");
            false
        }
    }
}

fn set_address<P: CommandPort>(_event: &EventBuf, ctx: &mut Central<P>) -> bool {
    match ctx.port.set_public_address(ctx.address) {
        Ok(()) => true,
        Err(status) => {
            warn!(%status, "setting public address failed");
            false
        }
    }
}

/// GATT/GAP init in the central role, then start general discovery.
fn begin_discovery<P: CommandPort>(ctx: &mut Central<P>) -> bool {
    if let Err(status) = ctx.port.init_gatt() {
        warn!(%status, "GATT init failed");
        return false;
    }
    let handles = match ctx.port.init_gap(Role::Central) {
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
    if let Err(status) = ctx.port.start_general_discovery(ctx.scan) {
        warn!(%status, "starting general discovery failed");
        return false;
    }
    debug!("general discovery started");
    true
}

fn record_report<P: CommandPort>(event: &EventBuf, ctx: &mut Central<P>) -> bool {
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

/// Connects to the first connectable public device; failing to find
/// one aborts the walk.
fn connect_first<P: CommandPort>(ctx: &mut Central<P>) -> bool {
    let Some(target) = ctx.found.matching(Some(true), Some(true)).next().map(|e| e.addr) else {
        warn!(seen = ctx.found.len(), "no connectable public device to walk");
        return false;
    };
    match ctx.port.create_connection(target) {
        Ok(()) => {
            debug!(addr = %target, "connecting");
            ctx.target = Some(target);
            true
        }
        Err(status) => {
            warn!(addr = %target, %status, "create connection failed");
            false
        }
    }
}

fn record_connection<P: CommandPort>(event: &EventBuf, ctx: &mut Central<P>) -> bool {
    let Some(result) = connection_complete(event) else {
        return false;
    };
    if result.status != 0 {
        warn!(status = trace::status_name(result.status), "connection failed");
        return false;
    }
    ctx.conn_handle = result.handle;
    ctx.connected = true;
    debug!(handle = result.handle, "connected");
    true
}

/// Accept the peer's connection parameters as offered.
fn answer_conn_update<P: CommandPort>(event: &EventBuf, ctx: &mut Central<P>) -> bool {
    let Some(request) = conn_update_request(event) else {
        return false;
    };
    match ctx.port.conn_update_response(&request, true) {
        Ok(()) => true,
        Err(status) => {
            warn!(%status, "connection-update response failed");
            false
        }
    }
}

/// Files the device into the database and starts primary-service
/// discovery. Requires the connection from the previous step.
fn discover_services<P: CommandPort>(ctx: &mut Central<P>) -> bool {
    if !ctx.connected {
        warn!("connection did not come up; aborting walk");
        return false;
    }
    let addr = ctx.target.unwrap_or(BdAddr::ZERO);
    let Some(device_index) = ctx.db.add_device(addr) else {
        return false;
    };
    ctx.device_index = Some(device_index);
    ctx.ingest = IngestContext {
        kind: RecordKind::PrimaryService,
        parent: Some(device_index),
        conn_handle: ctx.conn_handle,
    };
    match ctx.port.discover_primary_services(ctx.conn_handle) {
        Ok(()) => true,
        Err(status) if status == crate::port::Status::TIMEOUT => {
            debug!("primary service discovery reported timeout; continuing");
            true
        }
        Err(status) => {
            warn!(%status, "primary service discovery failed");
            false
        }
    }
}

fn ingest_response<P: CommandPort>(event: &EventBuf, ctx: &mut Central<P>) -> bool {
    let context = ctx.ingest;
    ctx.db.ingest_att_response(event, context)
}

/// Takes the next unprocessed primary service and discovers its
/// characteristics.
fn discover_next_characteristics<P: CommandPort>(ctx: &mut Central<P>) -> bool {
    let Some(device_index) = ctx.device_index else {
        warn!("no device on file; aborting walk");
        return false;
    };
    let Some(service_index) =
        ctx.db.first_unprocessed_for_device(RecordKind::PrimaryService, device_index)
    else {
        debug!("no unprocessed primary services left");
        return true;
    };
    ctx.db.mark_processed(service_index);
    let Some(attr) = ctx.db.get(service_index).and_then(Record::attribute).copied() else {
        return true;
    };
    ctx.ingest = IngestContext {
        kind: RecordKind::Characteristic,
        parent: Some(service_index),
        conn_handle: ctx.conn_handle,
    };
    match ctx.port.discover_characteristics(&attr) {
        Ok(()) => true,
        Err(status) if status == crate::port::Status::TIMEOUT => {
            debug!("characteristic discovery reported timeout; continuing");
            true
        }
        Err(status) => {
            warn!(%status, "characteristic discovery failed");
            false
        }
    }
}

fn disconnect<P: CommandPort>(ctx: &mut Central<P>) -> bool {
    if !ctx.connected {
        return true;
    }
    match ctx.port.terminate_connection(ctx.conn_handle) {
        Ok(()) => {
            ctx.connected = false;
            true
        }
        Err(status) => {
            warn!(%status, "terminating connection failed");
            false
        }
    }
}
