// SPDX-License-Identifier: Apache-2.0
//! Event envelope seam and tagged event checks.
//!
//! The engine never inspects packet bytes itself. It sees events through
//! the [`Envelope`] trait, which exposes exactly the fields the check
//! kinds need: the transport-level "is this an event" bit, the top-level
//! event code, and the optional deeper codes (meta subevent, vendor
//! code, reset reason, procedure code). Hosts implement the trait for
//! their packet type and own every byte offset.

/// Read-only view over an incoming packet, to the depth the rule checks
/// require.
///
/// Accessors return `None` when the packet does not carry the field in
/// question (e.g. `meta_subevent` on a non-meta event). A check against
/// a `None` field simply does not match; it is never an error.
pub trait Envelope {
    /// Whether the transport-level packet is an event packet at all.
    ///
    /// When this returns `false` the dispatcher short-circuits: no
    /// rules fire, no pending perform is consumed, and no until
    /// condition is evaluated.
    fn is_event(&self) -> bool;

    /// The top-level event code.
    fn event_code(&self) -> u16;

    /// Subevent code, if this is a "meta" event.
    fn meta_subevent(&self) -> Option<u16>;

    /// 16-bit vendor event code, if this is a vendor-specific event.
    fn vendor_code(&self) -> Option<u16>;

    /// Reset reason, if this is a vendor "initialized" event.
    fn reset_reason(&self) -> Option<u16>;

    /// Procedure code, if this is a vendor "procedure complete" event.
    fn procedure_code(&self) -> Option<u16>;
}

/// How deep into the envelope an [`EventCheck`] reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// Match on the top-level event code.
    EventCode,
    /// Match on the subevent code of a meta event.
    MetaSubevent,
    /// Match on the 16-bit vendor event code.
    VendorCode,
    /// Match on the reason byte of a vendor "initialized" event.
    ResetReason,
    /// Match on the procedure byte of a vendor "procedure complete".
    ProcedureComplete,
}

/// A check kind paired with the code it expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCheck {
    /// Which envelope field to compare.
    pub kind: CheckKind,
    /// The expected value, interpreted per `kind`.
    pub code: u16,
}

impl EventCheck {
    /// Check for a top-level event code.
    #[must_use]
    pub const fn event(code: u16) -> Self {
        Self { kind: CheckKind::EventCode, code }
    }

    /// Check for a meta-event subevent code.
    #[must_use]
    pub const fn meta_subevent(code: u16) -> Self {
        Self { kind: CheckKind::MetaSubevent, code }
    }

    /// Check for a vendor event code.
    #[must_use]
    pub const fn vendor(code: u16) -> Self {
        Self { kind: CheckKind::VendorCode, code }
    }

    /// Check for a reset reason.
    #[must_use]
    pub const fn reset_reason(code: u16) -> Self {
        Self { kind: CheckKind::ResetReason, code }
    }

    /// Check for a procedure-complete code.
    #[must_use]
    pub const fn procedure_complete(code: u16) -> Self {
        Self { kind: CheckKind::ProcedureComplete, code }
    }

    /// Whether `event` satisfies this check.
    pub fn matches<E: Envelope>(&self, event: &E) -> bool {
        match self.kind {
            CheckKind::EventCode => event.event_code() == self.code,
            CheckKind::MetaSubevent => event.meta_subevent() == Some(self.code),
            CheckKind::VendorCode => event.vendor_code() == Some(self.code),
            CheckKind::ResetReason => event.reset_reason() == Some(self.code),
            CheckKind::ProcedureComplete => event.procedure_code() == Some(self.code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake {
        code: u16,
        sub: Option<u16>,
        vendor: Option<u16>,
        reason: Option<u16>,
        procedure: Option<u16>,
    }

    impl Fake {
        fn plain(code: u16) -> Self {
            Self { code, sub: None, vendor: None, reason: None, procedure: None }
        }
    }

    impl Envelope for Fake {
        fn is_event(&self) -> bool {
            true
        }
        fn event_code(&self) -> u16 {
            self.code
        }
        fn meta_subevent(&self) -> Option<u16> {
            self.sub
        }
        fn vendor_code(&self) -> Option<u16> {
            self.vendor
        }
        fn reset_reason(&self) -> Option<u16> {
            self.reason
        }
        fn procedure_code(&self) -> Option<u16> {
            self.procedure
        }
    }

    #[test]
    fn event_code_compares_top_level_only() {
        let ev = Fake::plain(0x05);
        assert!(EventCheck::event(0x05).matches(&ev));
        assert!(!EventCheck::event(0x06).matches(&ev));
        assert!(!EventCheck::meta_subevent(0x05).matches(&ev));
    }

    #[test]
    fn deeper_checks_require_the_field_to_be_present() {
        let mut ev = Fake::plain(0x3E);
        assert!(!EventCheck::meta_subevent(0x02).matches(&ev));
        ev.sub = Some(0x02);
        assert!(EventCheck::meta_subevent(0x02).matches(&ev));

        let mut vendor = Fake::plain(0xFF);
        vendor.vendor = Some(0x0407);
        vendor.procedure = Some(0x30);
        assert!(EventCheck::vendor(0x0407).matches(&vendor));
        assert!(EventCheck::procedure_complete(0x30).matches(&vendor));
        assert!(!EventCheck::reset_reason(0x01).matches(&vendor));
    }
}
