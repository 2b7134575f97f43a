// SPDX-License-Identifier: Apache-2.0
//! Event-code constants for the BlueNRG-flavoured HCI event stream.
//!
//! Vendor event codes pack a 6-bit event group id and a 10-bit event
//! id: `ecode = (egid << 10) | eid`. Group 0 is HAL, 1 GAP, 2 L2CAP,
//! 3 GATT/ATT.

/// Transport packet-type byte marking an event packet.
pub const HCI_EVENT_PKT: u8 = 0x04;

// Top-level event codes.

/// Connection complete (BR/EDR).
pub const EVT_CONN_COMPLETE: u16 = 0x03;
/// Disconnection complete.
pub const EVT_DISCONN_COMPLETE: u16 = 0x05;
/// Encryption change.
pub const EVT_ENCRYPT_CHANGE: u16 = 0x08;
/// Read remote version information complete.
pub const EVT_READ_REMOTE_VERSION_COMPLETE: u16 = 0x0C;
/// Command status.
pub const EVT_CMD_STATUS: u16 = 0x0F;
/// Hardware error.
pub const EVT_HARDWARE_ERROR: u16 = 0x10;
/// Number of completed packets.
pub const EVT_NUM_COMP_PKTS: u16 = 0x13;
/// Data buffer overflow.
pub const EVT_DATA_BUFFER_OVERFLOW: u16 = 0x1A;
/// Encryption key refresh complete.
pub const EVT_ENCRYPTION_KEY_REFRESH_COMPLETE: u16 = 0x30;
/// LE meta event; the subevent code is the first payload byte.
pub const EVT_LE_META_EVENT: u16 = 0x3E;
/// Vendor-specific event; a 16-bit vendor code leads the payload.
pub const EVT_VENDOR: u16 = 0xFF;

// LE meta subevents.

/// LE connection complete.
pub const EVT_LE_CONN_COMPLETE: u16 = 0x01;
/// LE advertising report.
pub const EVT_LE_ADVERTISING_REPORT: u16 = 0x02;
/// LE connection update complete.
pub const EVT_LE_CONN_UPDATE_COMPLETE: u16 = 0x03;
/// LE read remote used features complete.
pub const EVT_LE_READ_REMOTE_USED_FEATURES_COMPLETE: u16 = 0x04;
/// LE long-term key request.
pub const EVT_LE_LTK_REQUEST: u16 = 0x05;

// Vendor event codes, HAL group.

/// Controller (re)initialized; the reason byte says why.
pub const EVT_BLUE_HAL_INITIALIZED: u16 = 0x0001;
/// Controller event queue overflowed; a bitmask of lost events follows.
pub const EVT_BLUE_HAL_EVENTS_LOST: u16 = 0x0002;

// Vendor event codes, GAP group.

/// Limited discoverable period ended.
pub const EVT_BLUE_GAP_LIMITED_DISCOVERABLE: u16 = 0x0400;
/// Pairing complete.
pub const EVT_BLUE_GAP_PAIRING_CMPLT: u16 = 0x0401;
/// Passkey request.
pub const EVT_BLUE_GAP_PASS_KEY_REQUEST: u16 = 0x0402;
/// Authorization request.
pub const EVT_BLUE_GAP_AUTHORIZATION_REQUEST: u16 = 0x0403;
/// Peripheral security initiated.
pub const EVT_BLUE_GAP_SLAVE_SECURITY_INITIATED: u16 = 0x0404;
/// Bond lost.
pub const EVT_BLUE_GAP_BOND_LOST: u16 = 0x0405;
/// Device found during discovery.
pub const EVT_BLUE_GAP_DEVICE_FOUND: u16 = 0x0406;
/// A GAP procedure finished; the procedure byte says which.
pub const EVT_BLUE_GAP_PROCEDURE_COMPLETE: u16 = 0x0407;
/// Address not resolved.
pub const EVT_BLUE_GAP_ADDR_NOT_RESOLVED: u16 = 0x0408;

// Vendor event codes, L2CAP group.

/// Connection-parameter-update response.
pub const EVT_BLUE_L2CAP_CONN_UPD_RESP: u16 = 0x0800;
/// L2CAP procedure timeout.
pub const EVT_BLUE_L2CAP_PROCEDURE_TIMEOUT: u16 = 0x0801;
/// Connection-parameter-update request from the peer.
pub const EVT_BLUE_L2CAP_CONN_UPD_REQ: u16 = 0x0802;

// Vendor event codes, GATT/ATT group.

/// Attribute modified.
pub const EVT_BLUE_GATT_ATTRIBUTE_MODIFIED: u16 = 0x0C01;
/// GATT procedure timeout.
pub const EVT_BLUE_GATT_PROCEDURE_TIMEOUT: u16 = 0x0C02;
/// ATT exchange-MTU response.
pub const EVT_BLUE_ATT_EXCHANGE_MTU_RESP: u16 = 0x0C03;
/// ATT find-information response.
pub const EVT_BLUE_ATT_FIND_INFORMATION_RESP: u16 = 0x0C04;
/// ATT find-by-type-value response.
pub const EVT_BLUE_ATT_FIND_BY_TYPE_VAL_RESP: u16 = 0x0C05;
/// ATT read-by-type response (characteristic discovery).
pub const EVT_BLUE_ATT_READ_BY_TYPE_RESP: u16 = 0x0C06;
/// ATT read response.
pub const EVT_BLUE_ATT_READ_RESP: u16 = 0x0C07;
/// ATT read-blob response.
pub const EVT_BLUE_ATT_READ_BLOB_RESP: u16 = 0x0C08;
/// ATT read-multiple response.
pub const EVT_BLUE_ATT_READ_MULTIPLE_RESP: u16 = 0x0C09;
/// ATT read-by-group-type response (primary service discovery).
pub const EVT_BLUE_ATT_READ_BY_GROUP_TYPE_RESP: u16 = 0x0C0A;
/// ATT prepare-write response.
pub const EVT_BLUE_ATT_PREPARE_WRITE_RESP: u16 = 0x0C0C;
/// ATT execute-write response.
pub const EVT_BLUE_ATT_EXEC_WRITE_RESP: u16 = 0x0C0D;
/// GATT indication.
pub const EVT_BLUE_GATT_INDICATION: u16 = 0x0C0E;
/// GATT notification.
pub const EVT_BLUE_GATT_NOTIFICATION: u16 = 0x0C0F;
/// GATT client procedure complete.
pub const EVT_BLUE_GATT_PROCEDURE_COMPLETE: u16 = 0x0C10;
/// GATT error response.
pub const EVT_BLUE_GATT_ERROR_RESP: u16 = 0x0C11;

// Reset reasons carried by `EVT_BLUE_HAL_INITIALIZED`.

/// Normal startup.
pub const RESET_NORMAL: u16 = 0x01;
/// Updater mode entered with an ACI command.
pub const RESET_UPDATER_ACI: u16 = 0x02;
/// Updater mode entered due to a bad BLUE flag.
pub const RESET_UPDATER_BAD_FLAG: u16 = 0x03;
/// Updater mode entered via the IRQ pin.
pub const RESET_UPDATER_PIN: u16 = 0x04;
/// Reset caused by the watchdog.
pub const RESET_WATCHDOG: u16 = 0x05;
/// Reset due to lockup.
pub const RESET_LOCKUP: u16 = 0x06;
/// Brownout reset.
pub const RESET_BROWNOUT: u16 = 0x07;
/// Reset caused by a crash (NMI or hard fault).
pub const RESET_CRASH: u16 = 0x08;
/// Reset caused by an ECC error.
pub const RESET_ECC_ERR: u16 = 0x09;

// GAP procedure codes carried by `EVT_BLUE_GAP_PROCEDURE_COMPLETE`.

/// Limited discovery.
pub const GAP_LIMITED_DISCOVERY_PROC: u8 = 0x01;
/// General discovery.
pub const GAP_GENERAL_DISCOVERY_PROC: u8 = 0x02;
/// Name discovery.
pub const GAP_NAME_DISCOVERY_PROC: u8 = 0x04;
/// Auto connection establishment.
pub const GAP_AUTO_CONNECTION_ESTABLISHMENT_PROC: u8 = 0x08;
/// General connection establishment.
pub const GAP_GENERAL_CONNECTION_ESTABLISHMENT_PROC: u8 = 0x10;
/// Selective connection establishment.
pub const GAP_SELECTIVE_CONNECTION_ESTABLISHMENT_PROC: u8 = 0x20;
/// Direct connection establishment.
pub const GAP_DIRECT_CONNECTION_ESTABLISHMENT_PROC: u8 = 0x40;
/// Observation.
pub const GAP_OBSERVATION_PROC: u8 = 0x80;

// Address and scan parameter values.

/// Public device address type.
pub const PUBLIC_ADDR: u8 = 0x00;
/// Random device address type.
pub const RANDOM_ADDR: u8 = 0x01;
/// Passive scanning.
pub const PASSIVE_SCAN: u8 = 0x00;
/// Active scanning.
pub const ACTIVE_SCAN: u8 = 0x01;

// Advertising report event types.

/// Connectable undirected advertising.
pub const ADV_IND: u8 = 0x00;
/// Connectable directed advertising.
pub const ADV_DIRECT_IND: u8 = 0x01;
/// Scannable undirected advertising.
pub const ADV_SCAN_IND: u8 = 0x02;
/// Non-connectable undirected advertising.
pub const ADV_NONCONN_IND: u8 = 0x03;
