//! Snapshot copying and pattern search against mock process memory

use kobot_core::Error;
use kobot_core::pattern::BytePattern;
use kobot_core::process::{MockMemoryBuilder, Protection};
use kobot_core::snapshot::MemorySnapshot;

fn three_regions() -> kobot_core::process::MockMemoryReader {
    MockMemoryBuilder::new()
        .base(0x40_0000)
        .region(0x000, 0x100, Protection::READ_WRITE)
        .region(0x100, 0x100, Protection::NO_ACCESS)
        .region(0x200, 0x100, Protection::EXECUTE_READ)
        .write_bytes(0x10, b"Spike")
        .write_bytes(0x110, b"hidden")
        .write_bytes(0x210, b"Spike")
        .build()
}

#[test]
fn test_unreadable_region_is_zero_filled_and_reported() {
    let reader = three_regions();
    let snapshot = MemorySnapshot::create(&reader, 0x40_0000, 0x300).unwrap();

    assert_eq!(snapshot.len(), 0x300);
    assert_eq!(snapshot.unreadable_ranges(), &[0x40_0100..0x40_0200]);
    assert_eq!(snapshot.readable_bytes(), 0x200);
    assert_eq!(snapshot.slice_at(0x40_0110, 6).unwrap(), &[0u8; 6]);
    assert!(!snapshot.is_readable_at(0x40_0110));
    assert!(snapshot.is_readable_at(0x40_0210));

    let hidden = BytePattern::exact(b"hidden").unwrap();
    assert!(matches!(
        snapshot.find(&hidden, None),
        Err(Error::PatternNotFound(_))
    ));
}

#[test]
fn test_offsets_stay_aligned_after_gap() {
    let reader = three_regions();
    let snapshot = MemorySnapshot::create(&reader, 0x40_0000, 0x300).unwrap();
    let spike = BytePattern::exact(b"Spike").unwrap();

    let first = snapshot.find(&spike, None).unwrap();
    let second = snapshot.find(&spike, Some(first + 1)).unwrap();
    assert_eq!(first, 0x40_0010);
    assert_eq!(second, 0x40_0210);
    assert_eq!(snapshot.find_all(&spike), vec![first, second]);
    assert_eq!(snapshot.remote_to_host(second).unwrap(), 0x210);
}

#[test]
fn test_window_inside_a_region() {
    let reader = three_regions();
    // Starts mid-way through the first region and ends inside the last one.
    let snapshot = MemorySnapshot::create(&reader, 0x40_0008, 0x210).unwrap();

    assert_eq!(snapshot.base(), 0x40_0008);
    assert_eq!(snapshot.end(), 0x40_0218);
    assert_eq!(snapshot.slice_at(0x40_0010, 5).unwrap(), b"Spike");
    assert_eq!(snapshot.slice_at(0x40_0210, 5).unwrap(), b"Spike");
}

#[test]
fn test_address_translation_bounds() {
    let reader = three_regions();
    let snapshot = MemorySnapshot::create(&reader, 0x40_0000, 0x300).unwrap();

    for offset in [0usize, 0x1FF, 0x2FF] {
        let remote = snapshot.host_to_remote(offset).unwrap();
        assert_eq!(snapshot.remote_to_host(remote).unwrap(), offset);
    }
    assert!(matches!(
        snapshot.host_to_remote(0x300),
        Err(Error::AddressOutOfRange { .. })
    ));
    assert!(matches!(
        snapshot.remote_to_host(0x3F_FFFF),
        Err(Error::AddressOutOfRange { .. })
    ));
}

#[test]
fn test_window_past_mapped_memory_is_partial() {
    let reader = three_regions();
    let err = MemorySnapshot::create(&reader, 0x40_0000, 0x1000).unwrap_err();
    match err {
        Error::PartialMap { mapped, requested } => {
            assert_eq!(mapped, 0x300);
            assert_eq!(requested, 0x1000);
        }
        other => panic!("expected PartialMap, got {:?}", other),
    }
}

#[test]
fn test_fully_unreadable_window_is_access_denied() {
    let reader = three_regions();
    let err = MemorySnapshot::create(&reader, 0x40_0100, 0x100).unwrap_err();
    assert!(matches!(err, Error::AccessDenied(_)));
    assert!(err.is_session_fatal());
}

#[test]
fn test_masked_pattern_across_snapshot() {
    let reader = MockMemoryBuilder::new()
        .with_size(0x80)
        .write_bytes(0x20, &[0x53, 0x70, 0x01, 0x6B])
        .write_bytes(0x60, &[0x53, 0x70, 0xFF, 0x6B])
        .build();
    let snapshot = MemorySnapshot::create(&reader, 0x1000, 0x80).unwrap();
    let pattern: BytePattern = "53 70 ?? 6B".parse().unwrap();

    assert_eq!(snapshot.find_all(&pattern), vec![0x1020, 0x1060]);
}
