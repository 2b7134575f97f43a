// SPDX-License-Identifier: Apache-2.0
//! Discovery database: devices and their GATT contents in one flat
//! fixed-capacity store.
//!
//! Records are appended in discovery order: a device, then its primary
//! services, then per service the included services and
//! characteristics. A device's records therefore form one contiguous
//! span ending at the next device (or the end of the store). Services
//! and characteristics carry the index of their parent record.
//!
//! Each record tracks a `processed` mark so a walk can take "the next
//! unprocessed service of this device" repeatedly, and reset the marks
//! to enumerate again for a different purpose.

use tracing::{debug, warn};

use crate::address::BdAddr;
use crate::decode::{
    read_by_group_type_response, read_by_type_response, AttributeInfo, HandleValuePair,
};
use crate::event::EventBuf;

/// What a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A device; its span follows.
    Device,
    /// A primary service of the device.
    PrimaryService,
    /// A service included by another service.
    IncludedService,
    /// A characteristic of a service.
    Characteristic,
}

/// Per-kind payload of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordData {
    /// Device address.
    Address(BdAddr),
    /// Service handle range and UUID.
    Attribute(AttributeInfo),
    /// Characteristic declaration as a handle/value pair.
    HandleValue(HandleValuePair),
}

/// One database record.
#[derive(Debug, Clone, Copy)]
pub struct Record {
    /// What this record describes.
    pub kind: RecordKind,
    /// Index of the parent record (device for services, service for
    /// characteristics); `None` for devices.
    pub parent: Option<usize>,
    /// Connection the record was discovered on.
    pub conn_handle: u16,
    /// The record payload.
    pub data: RecordData,
    processed: bool,
}

impl Record {
    const EMPTY: Self = Self {
        kind: RecordKind::Device,
        parent: None,
        conn_handle: 0,
        data: RecordData::Address(BdAddr::ZERO),
        processed: false,
    };

    /// The attribute info, when this record carries one.
    #[must_use]
    pub fn attribute(&self) -> Option<&AttributeInfo> {
        match &self.data {
            RecordData::Attribute(attr) => Some(attr),
            _ => None,
        }
    }

    /// Whether the record has been taken by a walk already.
    #[must_use]
    pub const fn is_processed(&self) -> bool {
        self.processed
    }
}

/// Discovery context for records folded in from ATT responses: what
/// they are, whose they are, and on which connection they were found.
#[derive(Debug, Clone, Copy)]
pub struct IngestContext {
    /// Kind to record the response elements as.
    pub kind: RecordKind,
    /// Parent record index for the new records.
    pub parent: Option<usize>,
    /// Connection the discovery runs on.
    pub conn_handle: u16,
}

impl Default for IngestContext {
    fn default() -> Self {
        Self { kind: RecordKind::PrimaryService, parent: None, conn_handle: 0 }
    }
}

/// The flat record store.
pub struct DiscoveryDb<const N: usize = 500> {
    records: [Record; N],
    len: usize,
}

impl<const N: usize> Default for DiscoveryDb<N> {
    fn default() -> Self {
        Self { records: [Record::EMPTY; N], len: 0 }
    }
}

impl<const N: usize> core::fmt::Debug for DiscoveryDb<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DiscoveryDb")
            .field("len", &self.len)
            .field("capacity", &N)
            .finish_non_exhaustive()
    }
}

impl<const N: usize> DiscoveryDb<N> {
    /// Number of records stored.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the store is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Empties the store.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// The record at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records[..self.len].get(index)
    }

    fn push(&mut self, record: Record) -> Option<usize> {
        if self.len == N {
            warn!("discovery database full; record dropped");
            return None;
        }
        self.records[self.len] = record;
        self.len += 1;
        Some(self.len - 1)
    }

    /// Appends a device record; returns its index for parent links.
    pub fn add_device(&mut self, addr: BdAddr) -> Option<usize> {
        self.push(Record {
            kind: RecordKind::Device,
            parent: None,
            conn_handle: 0,
            data: RecordData::Address(addr),
            processed: false,
        })
    }

    /// Appends a service record under `context`.
    pub fn add_attribute(&mut self, attr: AttributeInfo, context: IngestContext) -> Option<usize> {
        self.push(Record {
            kind: context.kind,
            parent: context.parent,
            conn_handle: context.conn_handle,
            data: RecordData::Attribute(attr),
            processed: false,
        })
    }

    /// Appends a characteristic record under `context`.
    pub fn add_handle_value(
        &mut self,
        pair: HandleValuePair,
        context: IngestContext,
    ) -> Option<usize> {
        self.push(Record {
            kind: context.kind,
            parent: context.parent,
            conn_handle: context.conn_handle,
            data: RecordData::HandleValue(pair),
            processed: false,
        })
    }

    /// The records belonging to the device at `device_index`: from the
    /// record after it up to (not including) the next device.
    #[must_use]
    pub fn device_span(&self, device_index: usize) -> core::ops::Range<usize> {
        let start = device_index + 1;
        let end = (start..self.len)
            .find(|&i| self.records[i].kind == RecordKind::Device)
            .unwrap_or(self.len);
        start..end
    }

    /// Index of the first unprocessed record of any kind.
    #[must_use]
    pub fn first_unprocessed(&self) -> Option<usize> {
        (0..self.len).find(|&i| !self.records[i].processed)
    }

    /// Index of the first unprocessed record of `kind`.
    #[must_use]
    pub fn first_unprocessed_of(&self, kind: RecordKind) -> Option<usize> {
        (0..self.len).find(|&i| self.records[i].kind == kind && !self.records[i].processed)
    }

    /// Index of the first unprocessed record of `kind` within the
    /// device's span.
    #[must_use]
    pub fn first_unprocessed_for_device(
        &self,
        kind: RecordKind,
        device_index: usize,
    ) -> Option<usize> {
        self.device_span(device_index)
            .find(|&i| self.records[i].kind == kind && !self.records[i].processed)
    }

    /// Number of unprocessed records of `kind` within the device's
    /// span.
    #[must_use]
    pub fn unprocessed_for_device(&self, kind: RecordKind, device_index: usize) -> usize {
        self.device_span(device_index)
            .filter(|&i| self.records[i].kind == kind && !self.records[i].processed)
            .count()
    }

    /// Marks the record at `index` as taken.
    pub fn mark_processed(&mut self, index: usize) {
        if index < self.len {
            self.records[index].processed = true;
        }
    }

    /// Clears every processed mark, so everything can be enumerated
    /// again for a different purpose.
    pub fn reset_processed(&mut self) {
        for record in &mut self.records[..self.len] {
            record.processed = false;
        }
    }

    /// Clears the processed marks of `kind` within the device's span.
    pub fn reset_processed_for_device(&mut self, kind: RecordKind, device_index: usize) {
        let span = self.device_span(device_index);
        for record in &mut self.records[span] {
            if record.kind == kind {
                record.processed = false;
            }
        }
    }

    /// Indices of all device records.
    pub fn devices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&i| self.records[i].kind == RecordKind::Device)
    }

    /// Indices of the device-span records of `kind` whose parent is
    /// `parent_index`.
    pub fn children_of(
        &self,
        kind: RecordKind,
        device_index: usize,
        parent_index: usize,
    ) -> impl Iterator<Item = usize> + '_ {
        self.device_span(device_index)
            .filter(move |&i| self.records[i].kind == kind && self.records[i].parent == Some(parent_index))
    }

    /// Folds an ATT discovery response into the database under
    /// `context`: read-by-group-type elements become attribute records,
    /// read-by-type elements become handle/value records. Elements
    /// with an inverted handle range are skipped. Returns whether the
    /// event was one of the two response kinds.
    pub fn ingest_att_response(&mut self, event: &EventBuf, context: IngestContext) -> bool {
        if let Some(resp) = read_by_group_type_response(event) {
            for element in resp.elements() {
                let Some(attr) = AttributeInfo::parse(element, context.conn_handle) else {
                    continue;
                };
                if attr.starting_handle > attr.ending_handle {
                    debug!(
                        start = attr.starting_handle,
                        end = attr.ending_handle,
                        "skipping attribute with inverted handle range"
                    );
                    continue;
                }
                let _ = self.add_attribute(attr, context);
            }
            return true;
        }
        if let Some(resp) = read_by_type_response(event) {
            for element in resp.elements() {
                let Some(pair) = HandleValuePair::parse(element, context.conn_handle) else {
                    continue;
                };
                let _ = self.add_handle_value(pair, context);
            }
            return true;
        }
        debug!("ingest called on a non-discovery event");
        false
    }
}

/// Hierarchical rendering: device, then per primary service its
/// characteristics and included services.
impl<const N: usize> core::fmt::Display for DiscoveryDb<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for device_index in self.devices() {
            if let RecordData::Address(addr) = &self.records[device_index].data {
                writeln!(f, "device {addr}")?;
            }
            for service_index in
                self.children_of(RecordKind::PrimaryService, device_index, device_index)
            {
                if let Some(attr) = self.records[service_index].attribute() {
                    writeln!(
                        f,
                        "   primary service {} handles {:#06x}..={:#06x}",
                        attr.uuid, attr.starting_handle, attr.ending_handle
                    )?;
                }
                for child_index in
                    self.children_of(RecordKind::Characteristic, device_index, service_index)
                {
                    if let RecordData::HandleValue(pair) = &self.records[child_index].data {
                        writeln!(f, "      characteristic handle {:#06x}", pair.handle)?;
                    }
                }
                for included_index in
                    self.children_of(RecordKind::IncludedService, device_index, service_index)
                {
                    if let Some(attr) = self.records[included_index].attribute() {
                        writeln!(f, "      included service {}", attr.uuid)?;
                    }
                    for child_index in
                        self.children_of(RecordKind::Characteristic, device_index, included_index)
                    {
                        if let RecordData::HandleValue(pair) = &self.records[child_index].data {
                            writeln!(f, "         characteristic handle {:#06x}", pair.handle)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::EVT_BLUE_ATT_READ_BY_GROUP_TYPE_RESP;
    use crate::decode::Uuid;

    const ADDR_A: BdAddr = BdAddr([1, 2, 3, 4, 5, 6]);
    const ADDR_B: BdAddr = BdAddr([6, 5, 4, 3, 2, 1]);

    fn service(start: u16, end: u16) -> AttributeInfo {
        AttributeInfo {
            conn_handle: 0x40,
            starting_handle: start,
            ending_handle: end,
            uuid: Uuid::Short(0x180D),
        }
    }

    #[test]
    fn device_span_ends_at_the_next_device() {
        let mut db: DiscoveryDb<8> = DiscoveryDb::default();
        let dev_a = db.add_device(ADDR_A).expect("room");
        let ctx = IngestContext {
            kind: RecordKind::PrimaryService,
            parent: Some(dev_a),
            conn_handle: 0x40,
        };
        db.add_attribute(service(1, 11), ctx).expect("room");
        db.add_attribute(service(12, 31), ctx).expect("room");
        let dev_b = db.add_device(ADDR_B).expect("room");
        db.add_attribute(service(1, 5), IngestContext { parent: Some(dev_b), ..ctx })
            .expect("room");

        assert_eq!(db.device_span(dev_a), 1..3);
        assert_eq!(db.device_span(dev_b), 4..5);
        assert_eq!(db.unprocessed_for_device(RecordKind::PrimaryService, dev_a), 2);
    }

    #[test]
    fn recall_walks_unprocessed_records_per_device() {
        let mut db: DiscoveryDb<8> = DiscoveryDb::default();
        let dev = db.add_device(ADDR_A).expect("room");
        let ctx = IngestContext {
            kind: RecordKind::PrimaryService,
            parent: Some(dev),
            conn_handle: 0x40,
        };
        let first = db.add_attribute(service(1, 11), ctx).expect("room");
        let second = db.add_attribute(service(12, 31), ctx).expect("room");

        assert_eq!(db.first_unprocessed_for_device(RecordKind::PrimaryService, dev), Some(first));
        db.mark_processed(first);
        assert_eq!(db.first_unprocessed_for_device(RecordKind::PrimaryService, dev), Some(second));
        db.mark_processed(second);
        assert_eq!(db.first_unprocessed_for_device(RecordKind::PrimaryService, dev), None);

        db.reset_processed_for_device(RecordKind::PrimaryService, dev);
        assert_eq!(db.unprocessed_for_device(RecordKind::PrimaryService, dev), 2);
    }

    #[test]
    fn ingest_skips_inverted_handle_ranges() {
        let mut db: DiscoveryDb<8> = DiscoveryDb::default();
        let dev = db.add_device(ADDR_A).expect("room");

        let mut data = vec![0x40, 0x00, 12, 6];
        data.extend_from_slice(&[0x01, 0x00, 0x0B, 0x00, 0x0D, 0x18]); // valid
        data.extend_from_slice(&[0x1F, 0x00, 0x0C, 0x00, 0x0F, 0x18]); // inverted
        let event = EventBuf::vendor(EVT_BLUE_ATT_READ_BY_GROUP_TYPE_RESP, &data).expect("fits");

        let context = IngestContext {
            kind: RecordKind::PrimaryService,
            parent: Some(dev),
            conn_handle: 0x40,
        };
        assert!(db.ingest_att_response(&event, context));
        assert_eq!(db.len(), 2, "device plus the one valid service");
        assert_eq!(db.unprocessed_for_device(RecordKind::PrimaryService, dev), 1);
    }

    #[test]
    fn full_database_drops_records() {
        let mut db: DiscoveryDb<1> = DiscoveryDb::default();
        assert!(db.add_device(ADDR_A).is_some());
        assert!(db.add_device(ADDR_B).is_none());
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn display_renders_the_hierarchy() {
        let mut db: DiscoveryDb<8> = DiscoveryDb::default();
        let dev = db.add_device(ADDR_A).expect("room");
        let svc = db
            .add_attribute(
                service(1, 11),
                IngestContext {
                    kind: RecordKind::PrimaryService,
                    parent: Some(dev),
                    conn_handle: 0x40,
                },
            )
            .expect("room");
        let pair = HandleValuePair::parse(&[0x02, 0x00, 0xAA], 0x40).expect("parses");
        db.add_handle_value(
            pair,
            IngestContext {
                kind: RecordKind::Characteristic,
                parent: Some(svc),
                conn_handle: 0x40,
            },
        )
        .expect("room");

        let rendered = db.to_string();
        assert!(rendered.contains("device 06:05:04:03:02:01"));
        assert!(rendered.contains("primary service 180d"));
        assert!(rendered.contains("characteristic handle 0x0002"));
    }
}
