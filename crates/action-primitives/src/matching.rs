//! Tiered text matching over a snapshot of list items.

use cdp_adapter::ListItemSnapshot;
use serde::{Deserialize, Serialize};

/// How an item was matched. Earlier tiers always win over later ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchTier {
    ExactText,
    ContainsText,
    DataValue,
}

impl MatchTier {
    pub const ORDER: [MatchTier; 3] = [
        MatchTier::ExactText,
        MatchTier::ContainsText,
        MatchTier::DataValue,
    ];

    fn accepts(self, item: &ListItemSnapshot, wanted: &str) -> bool {
        match self {
            MatchTier::ExactText => normalize(&item.text) == wanted,
            MatchTier::ContainsText => normalize(&item.text).contains(wanted),
            MatchTier::DataValue => item.data_value.as_deref() == Some(wanted),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemMatch {
    /// Position in the snapshot, which is document order.
    pub index: usize,
    pub tier: MatchTier,
}

/// Trim surrounding whitespace and lowercase.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Pick the item for `wanted`: the first exact text match, else the first item whose text
/// contains it, else the first item whose `data-value` equals it.
///
/// Text is compared after normalizing both sides; the `data-value` attribute is compared as
/// written against the normalized input. Blank input never matches.
pub fn select_match(items: &[ListItemSnapshot], wanted: &str) -> Option<ItemMatch> {
    let wanted = normalize(wanted);
    if wanted.is_empty() {
        return None;
    }
    MatchTier::ORDER.iter().find_map(|tier| {
        items
            .iter()
            .position(|item| tier.accepts(item, &wanted))
            .map(|index| ItemMatch { index, tier: *tier })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str, data_value: Option<&str>) -> ListItemSnapshot {
        ListItemSnapshot {
            text: text.to_string(),
            data_value: data_value.map(str::to_string),
        }
    }

    #[test]
    fn exact_beats_earlier_substring() {
        let items = vec![item("Export All", None), item(" export ", None)];
        assert_eq!(
            select_match(&items, "EXPORT"),
            Some(ItemMatch {
                index: 1,
                tier: MatchTier::ExactText
            })
        );
    }

    #[test]
    fn substring_takes_first_in_document_order() {
        let items = vec![
            item("Apple", None),
            item("Banana split", None),
            item("Banana bread", None),
        ];
        let found = select_match(&items, "banana").unwrap();
        assert_eq!(found.index, 1);
        assert_eq!(found.tier, MatchTier::ContainsText);
    }

    #[test]
    fn data_value_is_the_last_resort() {
        let items = vec![item("Option A", Some("alpha")), item("Option B", Some("beta"))];
        let found = select_match(&items, "  BETA ").unwrap();
        assert_eq!(found.index, 1);
        assert_eq!(found.tier, MatchTier::DataValue);

        let items = vec![item("beta release", None), item("Other", Some("beta"))];
        assert_eq!(select_match(&items, "beta").unwrap().tier, MatchTier::ContainsText);
    }

    #[test]
    fn data_value_attribute_is_not_normalized() {
        let items = vec![
            item("Save as", Some("Export")),
            item("Send to", Some("export")),
        ];
        let found = select_match(&items, "Export").unwrap();
        assert_eq!(found.index, 1);
        assert_eq!(found.tier, MatchTier::DataValue);

        let padded = vec![item("Other", Some(" beta "))];
        assert_eq!(select_match(&padded, "beta"), None);
    }

    #[test]
    fn blank_or_missing_text_matches_nothing() {
        let items = vec![item("", Some("")), item("Something", None)];
        assert_eq!(select_match(&items, "   "), None);
        assert_eq!(select_match(&items, "missing"), None);
        assert_eq!(select_match(&[], "x"), None);
    }
}
