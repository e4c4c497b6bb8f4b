//! Integration tests for the GUID codec.

use vhdxmeta_core::vhdx::fields::{
    FILE_PARAMETERS, LOGICAL_SECTOR_SIZE, PARENT_LOCATOR, PHYSICAL_SECTOR_SIZE, VIRTUAL_DISK_ID,
    VIRTUAL_DISK_SIZE,
};
use vhdxmeta_core::vhdx::guid::{encode, equals, Guid};
use vhdxmeta_core::vhdx::region::{BAT_REGION, METADATA_REGION};
use vhdxmeta_core::Error;

const KNOWN_IDENTIFIERS: [&str; 8] = [
    FILE_PARAMETERS,
    VIRTUAL_DISK_SIZE,
    VIRTUAL_DISK_ID,
    LOGICAL_SECTOR_SIZE,
    PHYSICAL_SECTOR_SIZE,
    PARENT_LOCATOR,
    METADATA_REGION,
    BAT_REGION,
];

#[test]
fn test_known_identifiers_match_their_encoding() {
    for text in KNOWN_IDENTIFIERS {
        let bytes = encode(text).expect("known identifier must encode");
        assert!(equals(&bytes, text), "{} should match its encoding", text);
    }
}

#[test]
fn test_known_identifiers_are_distinct() {
    for (i, a) in KNOWN_IDENTIFIERS.iter().enumerate() {
        for b in &KNOWN_IDENTIFIERS[i + 1..] {
            let bytes = encode(a).unwrap();
            assert!(!equals(&bytes, b), "{} must not match {}", a, b);
        }
    }
}

#[test]
fn test_roundtrip_to_canonical_text() {
    let samples = [
        "00000000-0000-0000-0000-000000000000",
        "FFFFFFFF-FFFF-FFFF-FFFF-FFFFFFFFFFFF",
        "01234567-89AB-CDEF-0123-456789ABCDEF",
        "B04AEFB7-D19E-4A81-B789-25B8E9445913",
    ];
    for text in samples.iter().chain(KNOWN_IDENTIFIERS.iter()) {
        let guid = Guid::parse(text).unwrap();
        assert_eq!(&guid.to_string(), text);
    }
}

#[test]
fn test_roundtrip_lowercase_input_yields_uppercase() {
    let guid = Guid::parse("caa16737-fa36-4d43-b3b6-33f0aa44e76b").unwrap();
    assert_eq!(guid.to_string(), FILE_PARAMETERS);
}

#[test]
fn test_first_three_groups_reversed() {
    let bytes = encode("01234567-89AB-CDEF-0123-456789ABCDEF").unwrap();
    assert_eq!(
        bytes,
        [
            0x67, 0x45, 0x23, 0x01, 0xAB, 0x89, 0xEF, 0xCD, 0x01, 0x23, 0x45, 0x67, 0x89, 0xAB,
            0xCD, 0xEF
        ]
    );
}

#[test]
fn test_malformed_input() {
    for text in [
        "",
        "1234",
        "01234567-89AB-CDEF-0123-456789ABCDEF00",
        "0123456G-89AB-CDEF-0123-456789ABCDEF",
        "{01234567-89AB-CDEF-0123-456789ABCDEF}",
    ] {
        assert!(
            matches!(encode(text), Err(Error::MalformedGuid { .. })),
            "{:?} should be rejected",
            text
        );
    }
}

#[test]
fn test_hyphen_placement_is_ignored() {
    let canonical = encode("01234567-89AB-CDEF-0123-456789ABCDEF").unwrap();
    let odd = encode("0123-456789AB-CDEF0123456789-ABCDEF").unwrap();
    assert_eq!(canonical, odd);
}
