//! Integration tests for parent locator decoding.

use vhdxmeta_core::vhdx::guid::Guid;
use vhdxmeta_core::vhdx::locator::{decode_parent_locator, VHDX_PARENT_LOCATOR_TYPE};

fn utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

/// Builds a locator payload with properly indexed key/value records.
fn locator_payload(pairs: &[(&str, &str)]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(Guid::parse(VHDX_PARENT_LOCATOR_TYPE).unwrap().as_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes());
    payload.extend_from_slice(&(pairs.len() as u16).to_le_bytes());

    let mut blob = Vec::new();
    let mut records = Vec::new();
    let blob_start = 20 + pairs.len() * 12;
    for (key, value) in pairs {
        let key = utf16(key);
        let value = utf16(value);
        let key_offset = (blob_start + blob.len()) as u32;
        blob.extend_from_slice(&key);
        let value_offset = (blob_start + blob.len()) as u32;
        blob.extend_from_slice(&value);

        records.extend_from_slice(&key_offset.to_le_bytes());
        records.extend_from_slice(&value_offset.to_le_bytes());
        records.extend_from_slice(&(key.len() as u16).to_le_bytes());
        records.extend_from_slice(&(value.len() as u16).to_le_bytes());
    }

    payload.extend(records);
    payload.extend(blob);
    payload
}

#[test]
fn test_single_entry_blob_text() {
    let mut payload = vec![0u8; 20];
    payload[18..20].copy_from_slice(&1u16.to_le_bytes());
    payload.extend_from_slice(&[0u8; 12]);
    payload.extend(utf16("C:\\a.vhdx"));

    let locator = decode_parent_locator(&payload);
    assert_eq!(locator.text, "C:\\a.vhdx");
}

#[test]
fn test_text_concatenates_keys_and_values() {
    let payload = locator_payload(&[
        ("parent_linkage", "{0F3A1E7C-2B4D-4C6E-8A9B-0123456789AB}"),
        ("relative_path", ".\\base.vhdx"),
    ]);

    let locator = decode_parent_locator(&payload);
    assert_eq!(
        locator.text,
        "parent_linkage{0F3A1E7C-2B4D-4C6E-8A9B-0123456789AB}relative_path.\\base.vhdx"
    );
}

#[test]
fn test_structured_entries() {
    let payload = locator_payload(&[
        ("parent_linkage", "{0F3A1E7C-2B4D-4C6E-8A9B-0123456789AB}"),
        ("relative_path", "..\\parents\\base.vhdx"),
        ("volume_path", "\\\\?\\Volume{1b2c}\\vms\\base.vhdx"),
        ("absolute_win32_path", "D:\\vms\\parents\\base.vhdx"),
    ]);

    let locator = decode_parent_locator(&payload);
    assert!(locator.is_vhdx_locator());
    assert_eq!(locator.entries.len(), 4);
    assert_eq!(
        locator.parent_linkage(),
        Some("{0F3A1E7C-2B4D-4C6E-8A9B-0123456789AB}")
    );
    assert_eq!(locator.relative_path(), Some("..\\parents\\base.vhdx"));
    assert_eq!(
        locator.volume_path(),
        Some("\\\\?\\Volume{1b2c}\\vms\\base.vhdx")
    );
    assert_eq!(
        locator.absolute_win32_path(),
        Some("D:\\vms\\parents\\base.vhdx")
    );
    assert_eq!(locator.get("missing"), None);
}

#[test]
fn test_non_ascii_path() {
    let payload = locator_payload(&[("relative_path", "Übung\\диск.vhdx")]);
    let locator = decode_parent_locator(&payload);
    assert_eq!(locator.relative_path(), Some("Übung\\диск.vhdx"));
    assert!(locator.text.ends_with("Übung\\диск.vhdx"));
}

#[test]
fn test_zero_entries() {
    let payload = locator_payload(&[]);
    let locator = decode_parent_locator(&payload);
    assert!(locator.text.is_empty());
    assert!(locator.entries.is_empty());
}

#[test]
fn test_payload_shorter_than_header() {
    let locator = decode_parent_locator(&[0u8; 10]);
    assert!(locator.text.is_empty());
    assert!(!locator.is_vhdx_locator());
}

#[test]
fn test_odd_length_blob_keeps_last_byte() {
    let mut payload = vec![0u8; 20];
    payload.extend(utf16("C:\\base.vhd"));
    payload.push(b'x');

    let locator = decode_parent_locator(&payload);
    assert_eq!(locator.text, "C:\\base.vhdx");
}

#[test]
fn test_parent_linkage2() {
    let payload = locator_payload(&[
        ("parent_linkage", "{0F3A1E7C-2B4D-4C6E-8A9B-0123456789AB}"),
        ("parent_linkage2", "{9C8B7A65-4321-4FED-8CBA-9876543210FE}"),
    ]);

    let locator = decode_parent_locator(&payload);
    assert_eq!(
        locator.parent_linkage2(),
        Some("{9C8B7A65-4321-4FED-8CBA-9876543210FE}")
    );
}
