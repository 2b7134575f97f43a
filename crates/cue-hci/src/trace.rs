// SPDX-License-Identifier: Apache-2.0
//! Event diagnostics: code-to-name lookups, a hex display adapter, and
//! trap conditions that make good global rules.
//!
//! Installing the two trap conditions as global expectations gives a
//! protocol blanket coverage of unexpected traffic:
//!
//! ```ignore
//! cue.expect_global(Rule::watch_when(trace::note_initialization));
//! cue.expect_global(Rule::watch_when(trace::note_any_event));
//! ```
//!
//! They only log; whether an unexpected event needs a real reaction is
//! the protocol's call.

use tracing::{debug, error, warn};

use cue_core::Envelope;

use crate::codes::*;
use crate::event::EventBuf;

/// Name of a top-level event code.
#[must_use]
pub fn event_name(code: u16) -> Option<&'static str> {
    Some(match code {
        EVT_CONN_COMPLETE => "conn_complete",
        EVT_DISCONN_COMPLETE => "disconn_complete",
        EVT_ENCRYPT_CHANGE => "encrypt_change",
        EVT_READ_REMOTE_VERSION_COMPLETE => "read_remote_version_complete",
        EVT_CMD_STATUS => "cmd_status",
        EVT_HARDWARE_ERROR => "hardware_error",
        EVT_NUM_COMP_PKTS => "num_comp_pkts",
        EVT_DATA_BUFFER_OVERFLOW => "data_buffer_overflow",
        EVT_ENCRYPTION_KEY_REFRESH_COMPLETE => "encryption_key_refresh_complete",
        EVT_LE_META_EVENT => "le_meta_event",
        EVT_VENDOR => "vendor",
        _ => return None,
    })
}

/// Name of an LE meta subevent code.
#[must_use]
pub fn subevent_name(code: u16) -> Option<&'static str> {
    Some(match code {
        EVT_LE_CONN_COMPLETE => "le_conn_complete",
        EVT_LE_ADVERTISING_REPORT => "le_advertising_report",
        EVT_LE_CONN_UPDATE_COMPLETE => "le_conn_update_complete",
        EVT_LE_READ_REMOTE_USED_FEATURES_COMPLETE => "le_read_remote_used_features_complete",
        EVT_LE_LTK_REQUEST => "le_ltk_request",
        _ => return None,
    })
}

/// Name of a vendor event code.
#[must_use]
pub fn vendor_event_name(code: u16) -> Option<&'static str> {
    Some(match code {
        EVT_BLUE_HAL_INITIALIZED => "hal_initialized",
        EVT_BLUE_HAL_EVENTS_LOST => "hal_events_lost",
        EVT_BLUE_GAP_LIMITED_DISCOVERABLE => "gap_limited_discoverable",
        EVT_BLUE_GAP_PAIRING_CMPLT => "gap_pairing_complete",
        EVT_BLUE_GAP_PASS_KEY_REQUEST => "gap_pass_key_request",
        EVT_BLUE_GAP_AUTHORIZATION_REQUEST => "gap_authorization_request",
        EVT_BLUE_GAP_SLAVE_SECURITY_INITIATED => "gap_slave_security_initiated",
        EVT_BLUE_GAP_BOND_LOST => "gap_bond_lost",
        EVT_BLUE_GAP_DEVICE_FOUND => "gap_device_found",
        EVT_BLUE_GAP_PROCEDURE_COMPLETE => "gap_procedure_complete",
        EVT_BLUE_GAP_ADDR_NOT_RESOLVED => "gap_addr_not_resolved",
        EVT_BLUE_L2CAP_CONN_UPD_RESP => "l2cap_conn_upd_resp",
        EVT_BLUE_L2CAP_PROCEDURE_TIMEOUT => "l2cap_procedure_timeout",
        EVT_BLUE_L2CAP_CONN_UPD_REQ => "l2cap_conn_upd_req",
        EVT_BLUE_GATT_ATTRIBUTE_MODIFIED => "gatt_attribute_modified",
        EVT_BLUE_GATT_PROCEDURE_TIMEOUT => "gatt_procedure_timeout",
        EVT_BLUE_ATT_EXCHANGE_MTU_RESP => "att_exchange_mtu_resp",
        EVT_BLUE_ATT_FIND_INFORMATION_RESP => "att_find_information_resp",
        EVT_BLUE_ATT_FIND_BY_TYPE_VAL_RESP => "att_find_by_type_val_resp",
        EVT_BLUE_ATT_READ_BY_TYPE_RESP => "att_read_by_type_resp",
        EVT_BLUE_ATT_READ_RESP => "att_read_resp",
        EVT_BLUE_ATT_READ_BLOB_RESP => "att_read_blob_resp",
        EVT_BLUE_ATT_READ_MULTIPLE_RESP => "att_read_multiple_resp",
        EVT_BLUE_ATT_READ_BY_GROUP_TYPE_RESP => "att_read_by_group_type_resp",
        EVT_BLUE_ATT_PREPARE_WRITE_RESP => "att_prepare_write_resp",
        EVT_BLUE_ATT_EXEC_WRITE_RESP => "att_exec_write_resp",
        EVT_BLUE_GATT_INDICATION => "gatt_indication",
        EVT_BLUE_GATT_NOTIFICATION => "gatt_notification",
        EVT_BLUE_GATT_PROCEDURE_COMPLETE => "gatt_procedure_complete",
        EVT_BLUE_GATT_ERROR_RESP => "gatt_error_resp",
        _ => return None,
    })
}

/// Name of a reset reason.
#[must_use]
pub fn reset_reason_name(code: u16) -> Option<&'static str> {
    Some(match code {
        RESET_NORMAL => "normal startup",
        RESET_UPDATER_ACI => "updater mode entered with ACI command",
        RESET_UPDATER_BAD_FLAG => "updater mode entered due to a bad BLUE flag",
        RESET_UPDATER_PIN => "updater mode entered with IRQ pin",
        RESET_WATCHDOG => "reset caused by watchdog",
        RESET_LOCKUP => "reset due to lockup",
        RESET_BROWNOUT => "brownout reset",
        RESET_CRASH => "reset caused by a crash",
        RESET_ECC_ERR => "reset caused by an ECC error",
        _ => return None,
    })
}

/// Name of a GAP procedure code.
#[must_use]
pub fn procedure_name(code: u8) -> Option<&'static str> {
    Some(match code {
        GAP_LIMITED_DISCOVERY_PROC => "limited_discovery",
        GAP_GENERAL_DISCOVERY_PROC => "general_discovery",
        GAP_NAME_DISCOVERY_PROC => "name_discovery",
        GAP_AUTO_CONNECTION_ESTABLISHMENT_PROC => "auto_connection_establishment",
        GAP_GENERAL_CONNECTION_ESTABLISHMENT_PROC => "general_connection_establishment",
        GAP_SELECTIVE_CONNECTION_ESTABLISHMENT_PROC => "selective_connection_establishment",
        GAP_DIRECT_CONNECTION_ESTABLISHMENT_PROC => "direct_connection_establishment",
        GAP_OBSERVATION_PROC => "observation",
        _ => return None,
    })
}

/// Name of a command status code (the subset the crate reports on).
#[must_use]
pub fn status_name(code: u8) -> &'static str {
    match code {
        0x00 => "success",
        0x01 => "unknown HCI command",
        0x02 => "unknown connection identifier",
        0x05 => "authentication failure",
        0x06 => "PIN or key missing",
        0x07 => "memory capacity exceeded",
        0x08 => "connection timeout",
        0x0C => "command disallowed",
        0x12 => "invalid HCI command parameters",
        0x13 => "remote user terminated connection",
        0x16 => "connection terminated by local host",
        0x1F => "unspecified error",
        0x3A => "controller busy",
        0x3C => "directed advertising timeout",
        0x3E => "connection failed to establish",
        0x41 => "failed",
        0x42 => "invalid parameters",
        0x46 => "not allowed",
        0x47 => "error",
        0x48 => "address not resolved",
        0x60 => "invalid handle",
        0x64 => "insufficient resources",
        0xFF => "timeout",
        _ => "unknown status",
    }
}

/// Displays a byte slice as colon-separated hex.
pub struct Hex<'a>(pub &'a [u8]);

impl core::fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut bytes = self.0.iter();
        if let Some(first) = bytes.next() {
            write!(f, "{first:02X}")?;
            for byte in bytes {
                write!(f, ":{byte:02X}")?;
            }
        }
        Ok(())
    }
}

/// Trap condition for initialization/reset traffic: matches (and logs)
/// any "HAL initialized" vendor event. Unexpected reset reasons are
/// logged as errors.
#[must_use]
pub fn note_initialization(event: &EventBuf) -> bool {
    let Some(reason) = event.reset_reason() else {
        return false;
    };
    match reset_reason_name(reason) {
        Some(name) if reason == RESET_NORMAL => debug!(reason = name, "controller initialized"),
        Some(name) => error!(reason = name, "controller reset"),
        None => error!(reason, "controller reset with unknown reason"),
    }
    true
}

/// Trap condition for everything else: matches any recognizable event
/// and logs what it was. Good as the last global rule.
#[must_use]
pub fn note_any_event(event: &EventBuf) -> bool {
    if !event.is_event() {
        return false;
    }
    let code = event.event_code();
    match code {
        EVT_LE_META_EVENT => {
            let Some(sub) = event.meta_subevent() else {
                warn!("meta event with empty payload");
                return false;
            };
            match subevent_name(sub) {
                Some(name) => debug!(subevent = name, "unhandled meta event"),
                None => {
                    warn!(subevent = sub, "unknown meta subevent");
                    return false;
                }
            }
        }
        EVT_VENDOR => {
            let Some(ecode) = event.vendor_code() else {
                warn!("vendor event with short payload");
                return false;
            };
            if ecode == EVT_BLUE_HAL_EVENTS_LOST {
                error!(
                    mask = %Hex(event.payload().get(2..10).unwrap_or_default()),
                    "controller lost events"
                );
                return true;
            }
            match vendor_event_name(ecode) {
                Some(name) => debug!(event = name, "unhandled vendor event"),
                None => {
                    warn!(ecode, "unknown vendor event code");
                    return false;
                }
            }
        }
        _ => match event_name(code) {
            Some(name) => debug!(event = name, "unhandled event"),
            None => {
                warn!(code, "unknown event code");
                return false;
            }
        },
    }
    true
}
