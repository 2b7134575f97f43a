// SPDX-License-Identifier: Apache-2.0
//! Typed views over event payloads.
//!
//! The controller's own structures lean on variable-length arrays;
//! these are fixed-size owned replacements so actions can stash them in
//! statically sized storage. Every accessor bounds-checks and returns
//! `None` on malformed payloads rather than trusting the wire.

use tracing::warn;

use cue_core::Envelope;

use crate::address::BdAddr;
use crate::codes::{
    EVT_BLUE_ATT_READ_BY_GROUP_TYPE_RESP, EVT_BLUE_ATT_READ_BY_TYPE_RESP,
    EVT_BLUE_L2CAP_CONN_UPD_REQ, EVT_DISCONN_COMPLETE, EVT_LE_ADVERTISING_REPORT,
    EVT_LE_CONN_COMPLETE,
};
use crate::event::EventBuf;

/// Longest characteristic value kept from a read-by-type response.
pub const MAX_VALUE_LEN: usize = 10;

/// Longest advertising payload kept from a report (legacy advertising).
pub const MAX_ADV_DATA: usize = 31;

/// A 16-bit or 128-bit attribute UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uuid {
    /// 16-bit assigned UUID.
    Short(u16),
    /// Full 128-bit UUID, as transported (little-endian).
    Long([u8; 16]),
}

impl Uuid {
    /// Parses a little-endian UUID of 2 or 16 bytes.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match bytes.len() {
            2 => Some(Self::Short(u16::from_le_bytes([bytes[0], bytes[1]]))),
            16 => {
                let mut long = [0u8; 16];
                long.copy_from_slice(bytes);
                Some(Self::Long(long))
            }
            _ => None,
        }
    }
}

impl core::fmt::Display for Uuid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Short(value) => write!(f, "{value:04x}"),
            Self::Long(bytes) => {
                for byte in bytes.iter().rev() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// Handle range and UUID of a discovered service, kept together with
/// the connection it was discovered on for later requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeInfo {
    /// Connection the attribute was discovered on.
    pub conn_handle: u16,
    /// First handle of the group.
    pub starting_handle: u16,
    /// Last handle of the group.
    pub ending_handle: u16,
    /// Group UUID.
    pub uuid: Uuid,
}

impl AttributeInfo {
    /// Parses one attribute-data element: starting handle, ending
    /// handle, then a 2- or 16-byte UUID (element sizes 6 and 20).
    #[must_use]
    pub fn parse(element: &[u8], conn_handle: u16) -> Option<Self> {
        if element.len() != 6 && element.len() != 20 {
            warn!(len = element.len(), "attribute element of unexpected size");
            return None;
        }
        let starting_handle = u16::from_le_bytes([element[0], element[1]]);
        let ending_handle = u16::from_le_bytes([element[2], element[3]]);
        let uuid = Uuid::parse(&element[4..])?;
        Some(Self { conn_handle, starting_handle, ending_handle, uuid })
    }
}

/// One handle/value element from a read-by-type response. The value is
/// truncated to [`MAX_VALUE_LEN`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleValuePair {
    /// Connection the pair was read on.
    pub conn_handle: u16,
    /// Attribute handle.
    pub handle: u16,
    len: u8,
    value: [u8; MAX_VALUE_LEN],
}

impl HandleValuePair {
    /// Parses one handle/value element of `element.len()` bytes: a
    /// 16-bit handle followed by the value.
    #[must_use]
    pub fn parse(element: &[u8], conn_handle: u16) -> Option<Self> {
        if element.len() < 2 {
            return None;
        }
        let handle = u16::from_le_bytes([element[0], element[1]]);
        let raw = &element[2..];
        let keep = raw.len().min(MAX_VALUE_LEN);
        if keep < raw.len() {
            warn!(handle, dropped = raw.len() - keep, "characteristic value truncated");
        }
        let mut value = [0u8; MAX_VALUE_LEN];
        value[..keep].copy_from_slice(&raw[..keep]);
        Some(Self { conn_handle, handle, len: keep as u8, value })
    }

    /// The (possibly truncated) value bytes.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value[..usize::from(self.len)]
    }
}

/// An ATT list response: the connection handle, the element stride,
/// and the raw element bytes, ready for [`elements`](Self::elements).
#[derive(Debug, Clone, Copy)]
pub struct AttListResponse<'a> {
    /// Connection the response arrived on.
    pub conn_handle: u16,
    /// Size in bytes of each list element.
    pub element_len: usize,
    /// The packed elements.
    pub data: &'a [u8],
}

impl AttListResponse<'_> {
    /// The list elements, one slice per attribute. A trailing partial
    /// element is dropped.
    pub fn elements(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.element_len.max(1))
    }
}

/// Vendor list-response payload layout shared by the two ATT discovery
/// responses: ecode(2) || conn_handle(2) || data_len(1) ||
/// element_len(1) || elements.
fn att_list_response(event: &EventBuf, ecode: u16) -> Option<AttListResponse<'_>> {
    if event.vendor_code()? != ecode {
        return None;
    }
    let payload = event.payload();
    if payload.len() < 6 {
        warn!(len = payload.len(), "short ATT list response");
        return None;
    }
    let conn_handle = u16::from_le_bytes([payload[2], payload[3]]);
    let data_len = usize::from(payload[4]);
    let element_len = usize::from(payload[5]);
    let available = payload.len() - 6;
    let take = data_len.min(available);
    if take < data_len {
        warn!(declared = data_len, available, "ATT list shorter than declared");
    }
    Some(AttListResponse { conn_handle, element_len, data: &payload[6..6 + take] })
}

/// Decodes a read-by-group-type response (primary service discovery).
#[must_use]
pub fn read_by_group_type_response(event: &EventBuf) -> Option<AttListResponse<'_>> {
    att_list_response(event, EVT_BLUE_ATT_READ_BY_GROUP_TYPE_RESP)
}

/// Decodes a read-by-type response (characteristic discovery).
#[must_use]
pub fn read_by_type_response(event: &EventBuf) -> Option<AttListResponse<'_>> {
    att_list_response(event, EVT_BLUE_ATT_READ_BY_TYPE_RESP)
}

/// One advertising report, with the data bounded and the RSSI peeled
/// off the tail.
#[derive(Debug, Clone, Copy)]
pub struct AdvertisingInfo {
    /// Advertising event type (`ADV_IND`, ...).
    pub evt_type: u8,
    /// Peer address type (`PUBLIC_ADDR` / `RANDOM_ADDR`).
    pub bdaddr_type: u8,
    /// Peer address.
    pub bdaddr: BdAddr,
    data_len: u8,
    data: [u8; MAX_ADV_DATA],
    /// Signal strength of the report, dBm.
    pub rssi: i8,
}

impl AdvertisingInfo {
    /// The advertising (or scan-response) data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data[..usize::from(self.data_len)]
    }
}

/// Decodes the first report of an LE advertising-report meta event.
///
/// Meta payload: subevent(1) || num_reports(1) || evt_type(1) ||
/// bdaddr_type(1) || bdaddr(6) || data_len(1) || data || rssi(1).
#[must_use]
pub fn advertising_info(event: &EventBuf) -> Option<AdvertisingInfo> {
    if event.meta_subevent()? != EVT_LE_ADVERTISING_REPORT {
        return None;
    }
    let payload = event.payload();
    if payload.len() < 11 {
        warn!(len = payload.len(), "short advertising report");
        return None;
    }
    let evt_type = payload[2];
    let bdaddr_type = payload[3];
    let mut addr = [0u8; 6];
    addr.copy_from_slice(&payload[4..10]);
    let declared = usize::from(payload[10]);
    let rest = &payload[11..];
    // RSSI trails the data as a signed byte.
    if rest.len() < declared + 1 {
        warn!(declared, available = rest.len(), "advertising data shorter than declared");
        return None;
    }
    let keep = declared.min(MAX_ADV_DATA);
    let mut data = [0u8; MAX_ADV_DATA];
    data[..keep].copy_from_slice(&rest[..keep]);
    Some(AdvertisingInfo {
        evt_type,
        bdaddr_type,
        bdaddr: BdAddr(addr),
        data_len: keep as u8,
        data,
        rssi: rest[declared] as i8,
    })
}

/// Result of an LE connection-complete meta event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionComplete {
    /// Command status; zero is success.
    pub status: u8,
    /// Handle of the new connection (valid when `status == 0`).
    pub handle: u16,
}

/// Decodes an LE connection-complete meta event.
///
/// Meta payload: subevent(1) || status(1) || handle(2) || role... .
#[must_use]
pub fn connection_complete(event: &EventBuf) -> Option<ConnectionComplete> {
    if event.meta_subevent()? != EVT_LE_CONN_COMPLETE {
        return None;
    }
    let payload = event.payload();
    if payload.len() < 4 {
        warn!(len = payload.len(), "short connection-complete event");
        return None;
    }
    Some(ConnectionComplete {
        status: payload[1],
        handle: u16::from_le_bytes([payload[2], payload[3]]),
    })
}

/// Result of a disconnection-complete event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectionComplete {
    /// Command status; zero is success.
    pub status: u8,
    /// Handle of the closed connection.
    pub handle: u16,
    /// Controller-reported reason.
    pub reason: u8,
}

/// Decodes a disconnection-complete event.
///
/// Payload: status(1) || handle(2) || reason(1).
#[must_use]
pub fn disconnection_complete(event: &EventBuf) -> Option<DisconnectionComplete> {
    if event.event_code() != EVT_DISCONN_COMPLETE {
        return None;
    }
    let payload = event.payload();
    if payload.len() < 4 {
        warn!(len = payload.len(), "short disconnection-complete event");
        return None;
    }
    Some(DisconnectionComplete {
        status: payload[0],
        handle: u16::from_le_bytes([payload[1], payload[2]]),
        reason: payload[3],
    })
}

/// The peer's L2CAP connection-parameter-update request; echo the
/// identifier back in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnUpdateRequest {
    /// Connection the request arrived on.
    pub conn_handle: u16,
    /// Request identifier to echo in the response.
    pub identifier: u8,
    /// Requested minimum connection interval.
    pub interval_min: u16,
    /// Requested maximum connection interval.
    pub interval_max: u16,
    /// Requested peripheral latency.
    pub slave_latency: u16,
    /// Requested supervision timeout multiplier.
    pub timeout_mult: u16,
}

/// Decodes an L2CAP connection-parameter-update request.
///
/// Vendor payload: ecode(2) || conn_handle(2) || data_len(1) ||
/// identifier(1) || l2cap_len(2) || interval_min(2) || interval_max(2)
/// || slave_latency(2) || timeout_mult(2).
#[must_use]
pub fn conn_update_request(event: &EventBuf) -> Option<ConnUpdateRequest> {
    if event.vendor_code()? != EVT_BLUE_L2CAP_CONN_UPD_REQ {
        return None;
    }
    let payload = event.payload();
    if payload.len() < 16 {
        warn!(len = payload.len(), "short connection-update request");
        return None;
    }
    let word = |at: usize| u16::from_le_bytes([payload[at], payload[at + 1]]);
    Some(ConnUpdateRequest {
        conn_handle: word(2),
        identifier: payload[5],
        interval_min: word(8),
        interval_max: word(10),
        slave_latency: word(12),
        timeout_mult: word(14),
    })
}
