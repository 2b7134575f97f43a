// SPDX-License-Identifier: Apache-2.0
//! End-to-end run of the GATT walk: discovery, connection, service and
//! characteristic discovery into the database, disconnect.

mod common;

use common::{adv_report, set_now, test_clock, FakePort};
use cue_core::{Dispatcher, Disposition};
use cue_hci::codes::{
    ADV_IND, ADV_NONCONN_IND, EVT_BLUE_ATT_READ_BY_GROUP_TYPE_RESP, EVT_BLUE_ATT_READ_BY_TYPE_RESP,
    EVT_BLUE_GATT_PROCEDURE_COMPLETE, EVT_BLUE_L2CAP_CONN_UPD_REQ, EVT_DISCONN_COMPLETE,
    EVT_LE_CONN_COMPLETE, GAP_GENERAL_DISCOVERY_PROC, PUBLIC_ADDR, RANDOM_ADDR, RESET_NORMAL,
};
use cue_hci::{walk, BdAddr, Central, EventBuf, RecordKind};

const PEER_A: BdAddr = BdAddr([0x02, 0x80, 0xE1, 0x00, 0x34, 0x12]);
const PEER_B: BdAddr = BdAddr([0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
const CONN_HANDLE: u16 = 0x0040;

fn dispatcher() -> Dispatcher<EventBuf, Central<FakePort>> {
    set_now(0);
    Dispatcher::new(Central::new(FakePort::default()), test_clock)
}

fn gatt_complete() -> EventBuf {
    EventBuf::vendor(EVT_BLUE_GATT_PROCEDURE_COMPLETE, &[0x40, 0x00, 0x00]).expect("fits")
}

/// Two primary services: handles 1..=11 and 12..=31.
fn two_services() -> EventBuf {
    let mut data = vec![0x40, 0x00, 12, 6];
    data.extend_from_slice(&[0x01, 0x00, 0x0B, 0x00, 0x0D, 0x18]);
    data.extend_from_slice(&[0x0C, 0x00, 0x1F, 0x00, 0x0F, 0x18]);
    EventBuf::vendor(EVT_BLUE_ATT_READ_BY_GROUP_TYPE_RESP, &data).expect("fits")
}

/// One characteristic declaration at the given handle.
fn one_characteristic(handle: u16) -> EventBuf {
    let mut data = vec![0x40, 0x00, 5, 5];
    data.extend_from_slice(&handle.to_le_bytes());
    data.extend_from_slice(&[0x10, 0x21, 0x00]);
    EventBuf::vendor(EVT_BLUE_ATT_READ_BY_TYPE_RESP, &data).expect("fits")
}

fn conn_update_req() -> EventBuf {
    let data = [
        0x40, 0x00, 0x0B, 0x07, 0x08, 0x00, 0x18, 0x00, 0x28, 0x00, 0x00, 0x00, 0x64, 0x00,
    ];
    EventBuf::vendor(EVT_BLUE_L2CAP_CONN_UPD_REQ, &data).expect("fits")
}

#[test]
fn walk_builds_the_database_and_disconnects() {
    let mut d = dispatcher();
    assert!(d.set_current_protocol(walk::protocol::<FakePort>()));

    // Boot.
    let reset = EventBuf::hal_initialized(RESET_NORMAL as u8).expect("fits");
    assert_eq!(d.on_event(&reset), Disposition::Done);

    // General discovery: one connectable peer, one not.
    assert_eq!(
        d.on_event(&adv_report(PEER_A, ADV_IND, PUBLIC_ADDR)),
        Disposition::Advanced
    );
    assert_eq!(
        d.on_event(&adv_report(PEER_B, ADV_NONCONN_IND, RANDOM_ADDR)),
        Disposition::Advanced
    );
    let discovery_done = EventBuf::procedure_complete(GAP_GENERAL_DISCOVERY_PROC).expect("fits");
    assert_eq!(d.on_event(&discovery_done), Disposition::Done);

    // Connection: the peer asks for new parameters before the
    // connection-complete lands.
    assert_eq!(d.on_event(&conn_update_req()), Disposition::Advanced);
    let connected =
        EventBuf::meta(EVT_LE_CONN_COMPLETE as u8, &[0x00, 0x40, 0x00]).expect("fits");
    assert_eq!(d.on_event(&connected), Disposition::Done);
    assert_eq!(d.context().port.peers, vec![PEER_A], "connects to the connectable peer");
    assert!(d.context().connected);
    assert_eq!(d.context().conn_handle, CONN_HANDLE);

    // Primary services.
    assert_eq!(d.on_event(&two_services()), Disposition::Advanced);
    assert_eq!(d.on_event(&gatt_complete()), Disposition::Done);
    let device = d.context().device_index.expect("device on file");
    assert_eq!(
        d.context().db.unprocessed_for_device(RecordKind::PrimaryService, device),
        2
    );

    // Characteristics, one service at a time.
    assert_eq!(d.on_event(&one_characteristic(0x0002)), Disposition::Advanced);
    assert_eq!(d.on_event(&gatt_complete()), Disposition::Done);
    assert_eq!(d.on_event(&one_characteristic(0x000D)), Disposition::Advanced);
    assert_eq!(d.on_event(&gatt_complete()), Disposition::Done);
    assert_eq!(
        d.context().db.unprocessed_for_device(RecordKind::PrimaryService, device),
        0,
        "every service was walked"
    );

    // Disconnect ends the protocol.
    let gone =
        EventBuf::event(EVT_DISCONN_COMPLETE as u8, &[0x00, 0x40, 0x00, 0x13]).expect("fits");
    assert_eq!(d.on_event(&gone), Disposition::Done);
    assert!(!d.is_running());
    assert!(!d.context().connected);

    // One device, two services, two characteristics.
    let central = d.context();
    assert_eq!(central.db.len(), 5);
    let rendered = central.db.to_string();
    assert!(rendered.contains("device 12:34:00:E1:80:02"));
    assert!(rendered.contains("primary service 180d"));
    assert!(rendered.contains("primary service 180f"));
    assert!(rendered.contains("characteristic handle 0x0002"));
    assert!(rendered.contains("characteristic handle 0x000d"));

    assert_eq!(
        central.port.issued,
        vec![
            "start_controller",
            "set_public_address",
            "init_gatt",
            "init_gap",
            "update_char_value",
            "start_general_discovery",
            "create_connection",
            "conn_update_response",
            "discover_primary_services",
            "discover_characteristics",
            "discover_characteristics",
            "terminate_connection",
        ]
    );
}

#[test]
fn walk_aborts_when_no_connectable_device_was_seen() {
    let mut d = dispatcher();
    d.set_current_protocol(walk::protocol::<FakePort>());

    let reset = EventBuf::hal_initialized(RESET_NORMAL as u8).expect("fits");
    d.on_event(&reset);
    // Only a non-connectable device shows up.
    d.on_event(&adv_report(PEER_B, ADV_NONCONN_IND, RANDOM_ADDR));
    let discovery_done = EventBuf::procedure_complete(GAP_GENERAL_DISCOVERY_PROC).expect("fits");
    d.on_event(&discovery_done);
    assert!(d.is_running(), "connect step is staged");

    // The connect perform finds no candidate and aborts the walk.
    assert_eq!(d.on_event(&conn_update_req()), Disposition::Done);
    assert!(!d.is_running());
    assert!(d.context().db.is_empty());
}

#[test]
fn failed_connection_status_leaves_expectations_unmet() {
    let mut d = dispatcher();
    d.set_current_protocol(walk::protocol::<FakePort>());

    let reset = EventBuf::hal_initialized(RESET_NORMAL as u8).expect("fits");
    d.on_event(&reset);
    d.on_event(&adv_report(PEER_A, ADV_IND, PUBLIC_ADDR));
    let discovery_done = EventBuf::procedure_complete(GAP_GENERAL_DISCOVERY_PROC).expect("fits");
    d.on_event(&discovery_done);

    // Connection-complete with a failure status: the until condition
    // still ends the production, but nothing was recorded.
    let failed =
        EventBuf::meta(EVT_LE_CONN_COMPLETE as u8, &[0x3E, 0x00, 0x00]).expect("fits");
    assert_eq!(d.on_event(&failed), Disposition::Done);
    assert!(!d.context().connected);

    // The service-discovery perform sees no connection and aborts.
    assert_eq!(d.on_event(&gatt_complete()), Disposition::Done);
    assert!(!d.is_running());
}
