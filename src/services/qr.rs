//! QR payloads printed on asset labels and parsed back by the scanner endpoint.
//!
//! A payload is newline separated `Key: Value` pairs; only `Asset ID` is
//! needed to resolve the asset, the rest is for humans reading the label.

use std::collections::HashMap;

use crate::entities::asset;

const ASSET_ID_KEY: &str = "asset id";

/// Label text for an asset
pub fn qr_payload(asset: &asset::Model) -> String {
    format!(
        "Asset ID: {}\nName: {}\nSerial: {}\nType: {}\nLocation: {}",
        asset.id, asset.name, asset.serial_number, asset.asset_type, asset.location
    )
}

/// Splits each line on the first `": "`; keys are trimmed and lowercased
pub fn parse_qr_fields(data: &str) -> HashMap<String, String> {
    data.lines()
        .filter_map(|line| line.split_once(": "))
        .map(|(key, value)| (key.trim().to_lowercase(), value.trim().to_string()))
        .collect()
}

/// The asset id named by a payload, if present and numeric
pub fn asset_id_from_qr(data: &str) -> Option<i32> {
    parse_qr_fields(data)
        .get(ASSET_ID_KEY)
        .and_then(|id| id.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::AssetStatus;
    use chrono::Utc;

    #[test]
    fn parses_keys_case_insensitively() {
        let fields = parse_qr_fields("Asset ID: 12\nNAME: Lab PC: row 3\r\nnoise line\n");
        assert_eq!(fields.get("asset id").map(String::as_str), Some("12"));
        assert_eq!(fields.get("name").map(String::as_str), Some("Lab PC: row 3"));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn missing_or_garbled_id_yields_none() {
        assert_eq!(asset_id_from_qr("Name: Printer"), None);
        assert_eq!(asset_id_from_qr("Asset ID: twelve"), None);
        assert_eq!(asset_id_from_qr(""), None);
    }

    #[test]
    fn payload_round_trips_through_parser() {
        let asset = asset::Model {
            id: 31,
            name: "Front desk printer".into(),
            serial_number: "PR-2291".into(),
            asset_type: "Printer".into(),
            purchase_date: None,
            purchase_cost: None,
            location: "Masakin".into(),
            status: AssetStatus::Available,
            condition: None,
            notes: None,
            qr_code: None,
            parent_id: None,
            last_updated: Utc::now(),
        };
        let payload = qr_payload(&asset);
        assert_eq!(asset_id_from_qr(&payload), Some(31));
        assert_eq!(
            parse_qr_fields(&payload).get("serial").map(String::as_str),
            Some("PR-2291")
        );
    }
}
