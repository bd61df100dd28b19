use tiled_optimizer_core::error::OptimizerError;
use tiled_optimizer_core::gid::{self, FlipFlags, MAX_BASE_ID, TileRef};

#[test]
fn bit31_reference_decodes_and_survives_remap() {
    let raw = 2_147_483_648u64 + 5;
    let tile = TileRef::decode(raw).expect("decode");
    assert_eq!(tile.base, 5);
    assert!(tile.flags.horizontal());
    assert!(!tile.flags.vertical());
    assert!(!tile.flags.diagonal());

    // base 5 was deduplicated to new id 1
    assert_eq!(tile.with_base(1).encode().expect("encode"), 2_147_483_648 + 1);
    assert_eq!(gid::encode(tile.flags, 1).expect("encode"), 2_147_483_649);
}

#[test]
fn bias_table_matches_tiled_flag_bits() {
    let h = FlipFlags::HORIZONTAL;
    let v = FlipFlags::VERTICAL;
    let d = FlipFlags::DIAGONAL;
    assert_eq!(FlipFlags::NONE.bias(), 0);
    assert_eq!(d.bias(), 536_870_912);
    assert_eq!(v.bias(), 1_073_741_824);
    assert_eq!((v | d).bias(), 1_610_612_736);
    assert_eq!(h.bias(), 2_147_483_648);
    assert_eq!((h | d).bias(), 2_684_354_560);
    assert_eq!((h | v).bias(), 3_221_225_472);
    assert_eq!((h | v | d).bias(), 3_758_096_384);
    assert_eq!(FlipFlags::new(true, true, false), h | v);
}

#[test]
fn every_flag_combination_survives_a_remap() {
    for flags in FlipFlags::all() {
        for base in [1u32, 7, 4096, MAX_BASE_ID] {
            let raw = flags.bias() + base as u64;
            let (decoded_flags, decoded_base) = gid::decode(raw).expect("decode");
            assert_eq!(decoded_flags, flags, "raw={raw}");
            assert_eq!(decoded_base, base, "raw={raw}");
            assert_eq!(gid::encode(decoded_flags, decoded_base).expect("encode"), raw);

            let remapped = gid::encode(decoded_flags, 42).expect("encode");
            let again = TileRef::decode(remapped).expect("decode");
            assert_eq!(again.flags, flags);
            assert_eq!(again.base, 42);
        }
    }
}

#[test]
fn plain_and_empty_references() {
    let tile = TileRef::decode(1234).expect("decode");
    assert!(tile.flags.is_empty());
    assert_eq!(tile.base, 1234);

    let empty = TileRef::decode(0).expect("decode");
    assert!(empty.is_empty());

    // flags on an empty cell still leave base 0
    let flagged_empty = TileRef::decode(2_147_483_648).expect("decode");
    assert!(flagged_empty.is_empty());
}

#[test]
fn largest_32_bit_reference_is_valid() {
    let tile = TileRef::decode((1u64 << 32) - 1).expect("decode");
    assert_eq!(tile.flags, FlipFlags::all()[7]);
    assert_eq!(tile.base, MAX_BASE_ID);
}

#[test]
fn references_beyond_32_bits_are_rejected() {
    match TileRef::decode(1u64 << 32) {
        Err(OptimizerError::ReferenceRange(raw)) => assert_eq!(raw, 4_294_967_296),
        other => panic!("expected ReferenceRange, got {other:?}"),
    }
    assert!(TileRef::decode(u64::MAX).is_err());
}

#[test]
fn encode_rejects_ids_that_overlap_flag_bits() {
    let result = TileRef::new(FlipFlags::NONE, MAX_BASE_ID + 1).encode();
    assert!(matches!(result, Err(OptimizerError::ReferenceRange(_))));
}
