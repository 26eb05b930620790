//! Fixed choice lists offered by the forms.

pub const ASSET_TYPES: &[&str] = &[
    "Desktop",
    "Laptop",
    "Printer",
    "Server",
    "Monitor",
    "Keyboard",
    "Mouse",
    "CPU",
    "TV",
    "Camera",
    "Headphone",
    "Paper Cutter",
    "Stapler",
    "Flash Drive",
    "Hard Drive",
    "Toner",
    "Intercom",
    "UPS",
    "RAM",
    "Power Cable",
    "Display Cable",
    "Fan",
    "Pin Remover",
    "Scissors",
];

pub const ASSET_LOCATIONS: &[&str] = &["Mamal Boys Lab", "Mamal Girls Lab", "Masakin", "Rabwat"];

/// Headline categories on the dashboard; every other type counts as "Other"
pub const DASHBOARD_TYPE_CATEGORIES: &[&str] =
    &["Monitor", "Keyboard", "CPU", "Mouse", "Printer", "Server"];

/// Types that may carry monitor/keyboard/mouse/CPU components
pub const COMPOSITE_TYPE: &str = "Desktop";

/// Component types that may be recorded with a composite
pub const COMPONENT_TYPES: &[&str] = &["Monitor", "Keyboard", "Mouse", "CPU"];

pub const STATIONERY_ITEM_TYPES: &[&str] = &[
    "A4",
    "A3",
    "A5",
    "Sticker Paper 2",
    "Sticker Paper 16",
    "Sticker Paper 24",
    "Card Paper",
    "Certificate Paper",
    "Staplers",
    "Pins",
    "Photo Paper",
    "Paper Punch",
];

pub const STATIONERY_UNITS: &[&str] = &["sheets", "reams", "boxes", "pieces"];

pub const DEFAULT_STATIONERY_LOCATION: &str = "Main Office";

/// Returns the canonical spelling when `value` matches a choice case-insensitively
pub fn canonical(choices: &[&'static str], value: &str) -> Option<&'static str> {
    let value = value.trim();
    choices
        .iter()
        .copied()
        .find(|choice| choice.eq_ignore_ascii_case(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_normalizes_case() {
        assert_eq!(canonical(ASSET_TYPES, "cpu"), Some("CPU"));
        assert_eq!(canonical(ASSET_TYPES, " desktop "), Some("Desktop"));
        assert_eq!(canonical(ASSET_LOCATIONS, "Moon Base"), None);
    }
}
