//! Chipset compatibility classification.
//!
//! Identity spoofing only works on adapters whose EEPROM layout matches the
//! ASIX AX88772 family. [`classify`] turns a free-text chipset identifier
//! (as reported by a device descriptor or typed by the operator) into a
//! [`CompatibilityTier`], and [`can_mutate`] is the single gate consulted
//! before any mutation.

use crate::constants::{pid, ASIX_VID, DLINK_VID, REALTEK_VID, SITECOM_VID};

/// Field-tested chip variants.
const CONFIRMED_MODELS: &[&str] = &["ax88772", "ax88772a", "ax88772b"];

/// Same vendor family, different or untested generation.
const EXPERIMENTAL_MODELS: &[&str] = &["ax88172", "ax88178", "ax88179", "ax88772c"];

/// Vendor name matched when no specific model is recognised.
const GENERIC_VENDOR: &str = "asix";

/// Vendors known not to support identity rewriting.
const INCOMPATIBLE_VENDORS: &[&str] = &["realtek", "microchip", "broadcom", "davicom", "lan"];

/// Known likelihood that identity mutation succeeds on a chipset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityTier {
    /// Tested and working.
    Confirmed,
    /// Same EEPROM architecture, not fully confirmed.
    Experimental,
    /// Known not to support rewriting.
    Incompatible,
    /// No information.
    Unknown,
}

/// Presentation-layer lookup token for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MessageKey {
    #[serde(rename = "compat.confirmed")]
    Confirmed,
    #[serde(rename = "compat.experimental")]
    Experimental,
    #[serde(rename = "compat.incompatible")]
    Incompatible,
    #[serde(rename = "compat.unknown")]
    Unknown,
}

impl MessageKey {
    /// The stable string form of the token.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "compat.confirmed",
            Self::Experimental => "compat.experimental",
            Self::Incompatible => "compat.incompatible",
            Self::Unknown => "compat.unknown",
        }
    }
}

/// Classify a chipset identifier.
///
/// Matching is case-insensitive substring containment. The confirmed and
/// experimental model tables are resolved together by the longest matching
/// model name (confirmed wins a tie), so a specific model such as
/// `AX88772C` is never shadowed by the shorter `AX88772`. The vendor
/// fallback and the incompatible-vendor table only apply when no model
/// matched.
pub fn classify(identifier: &str) -> CompatibilityTier {
    let normalized = identifier.trim().to_lowercase();

    let confirmed = longest_match(&normalized, CONFIRMED_MODELS);
    let experimental = longest_match(&normalized, EXPERIMENTAL_MODELS);
    match (confirmed, experimental) {
        (Some(c), Some(e)) if e > c => return CompatibilityTier::Experimental,
        (Some(_), _) => return CompatibilityTier::Confirmed,
        (None, Some(_)) => return CompatibilityTier::Experimental,
        (None, None) => {}
    }

    if normalized.contains(GENERIC_VENDOR) {
        return CompatibilityTier::Experimental;
    }

    if INCOMPATIBLE_VENDORS.iter().any(|v| normalized.contains(v)) {
        return CompatibilityTier::Incompatible;
    }

    CompatibilityTier::Unknown
}

/// Length of the longest table entry contained in `haystack`.
fn longest_match(haystack: &str, table: &[&str]) -> Option<usize> {
    table
        .iter()
        .filter(|model| haystack.contains(*model))
        .map(|model| model.len())
        .max()
}

/// Whether a mutation may be attempted on a chipset of this tier.
#[inline]
pub fn can_mutate(tier: CompatibilityTier) -> bool {
    matches!(tier, CompatibilityTier::Confirmed | CompatibilityTier::Experimental)
}

/// Lookup token for presenting a tier to the operator.
pub fn message_key(tier: CompatibilityTier) -> MessageKey {
    match tier {
        CompatibilityTier::Confirmed => MessageKey::Confirmed,
        CompatibilityTier::Experimental => MessageKey::Experimental,
        CompatibilityTier::Incompatible => MessageKey::Incompatible,
        CompatibilityTier::Unknown => MessageKey::Unknown,
    }
}

/// Chipset identifier for a USB identity, suitable as input to [`classify`].
pub fn identify_chipset(vendor_id: u16, product_id: u16) -> &'static str {
    match (vendor_id, product_id) {
        (ASIX_VID, pid::AX88178) => "ASIX AX88178",
        (ASIX_VID, pid::AX88179) => "ASIX AX88179",
        (ASIX_VID, pid::AX88772) => "ASIX AX88772",
        (ASIX_VID, pid::AX88772A) => "ASIX AX88772A",
        (ASIX_VID, pid::AX88772B) => "ASIX AX88772B",
        (ASIX_VID, _) => "ASIX (unknown model)",
        (REALTEK_VID, _) => "Realtek RTL8153",
        (DLINK_VID, _) => "D-Link DUB-E100",
        (SITECOM_VID, _) => "Sitecom",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmed_models() {
        assert_eq!(classify(" ax88772a "), CompatibilityTier::Confirmed);
        assert_eq!(classify("AX88772"), CompatibilityTier::Confirmed);
        assert_eq!(classify("AX88772B"), CompatibilityTier::Confirmed);
        assert_eq!(classify("Ax88772a"), CompatibilityTier::Confirmed);
    }

    #[test]
    fn experimental_models() {
        assert_eq!(classify("AX88179"), CompatibilityTier::Experimental);
        assert_eq!(classify("ax88178"), CompatibilityTier::Experimental);
        assert_eq!(classify("AX88172"), CompatibilityTier::Experimental);
    }

    #[test]
    fn specific_model_not_shadowed_by_shorter_confirmed_entry() {
        assert_eq!(classify("AX88772C"), CompatibilityTier::Experimental);
        assert_eq!(classify("ASIX AX88772C rev 2"), CompatibilityTier::Experimental);
    }

    #[test]
    fn vendor_fallback_is_experimental() {
        assert_eq!(classify("ASIX (unknown model)"), CompatibilityTier::Experimental);
    }

    #[test]
    fn vendor_match_never_beats_model_match() {
        assert_eq!(classify("ASIX AX88772B"), CompatibilityTier::Confirmed);
    }

    #[test]
    fn incompatible_and_unknown() {
        assert_eq!(classify("RTL8152"), CompatibilityTier::Unknown);
        assert_eq!(classify("Realtek RTL8152"), CompatibilityTier::Incompatible);
        assert_eq!(classify("Microchip LAN7800"), CompatibilityTier::Incompatible);
        assert_eq!(classify(""), CompatibilityTier::Unknown);
        assert_eq!(classify("Unknown"), CompatibilityTier::Unknown);
    }

    #[test]
    fn gate() {
        assert!(can_mutate(CompatibilityTier::Confirmed));
        assert!(can_mutate(CompatibilityTier::Experimental));
        assert!(!can_mutate(CompatibilityTier::Incompatible));
        assert!(!can_mutate(CompatibilityTier::Unknown));
    }

    #[test]
    fn message_keys_are_tokens() {
        assert_eq!(message_key(CompatibilityTier::Confirmed).as_str(), "compat.confirmed");
        assert_eq!(message_key(CompatibilityTier::Unknown).as_str(), "compat.unknown");
        assert_eq!(
            serde_json::to_string(&message_key(CompatibilityTier::Incompatible)).unwrap(),
            "\"compat.incompatible\""
        );
    }

    #[test]
    fn identified_chipsets_classify_as_expected() {
        let asix = identify_chipset(ASIX_VID, pid::AX88772A);
        assert_eq!(classify(asix), CompatibilityTier::Confirmed);
        let realtek = identify_chipset(REALTEK_VID, 0x8153);
        assert_eq!(classify(realtek), CompatibilityTier::Incompatible);
        assert_eq!(identify_chipset(0x1234, 0x5678), "Unknown");
    }
}
