#![forbid(unsafe_code)]

use proptest::prelude::*;
use sbinfo_ondisk::Ext4Superblock;
use sbinfo_types::{EXT4_SUPER_MAGIC, EXT4_SUPERBLOCK_SIZE, ParseError};

/// u32 fields and their offsets within the superblock region.
const U32_FIELDS: &[(usize, &str)] = &[
    (0x00, "inodes_count"),
    (0x04, "blocks_count"),
    (0x08, "reserved_blocks_count"),
    (0x0C, "free_blocks_count"),
    (0x10, "free_inodes_count"),
    (0x14, "first_data_block"),
    (0x18, "log_block_size"),
    (0x20, "blocks_per_group"),
    (0x28, "inodes_per_group"),
    (0x2C, "mtime"),
    (0x30, "wtime"),
    (0x34, "mnt_count"),
];

fn u32_field(sb: &Ext4Superblock, name: &str) -> u32 {
    match name {
        "inodes_count" => sb.inodes_count,
        "blocks_count" => sb.blocks_count,
        "reserved_blocks_count" => sb.reserved_blocks_count,
        "free_blocks_count" => sb.free_blocks_count,
        "free_inodes_count" => sb.free_inodes_count,
        "first_data_block" => sb.first_data_block,
        "log_block_size" => sb.log_block_size,
        "blocks_per_group" => sb.blocks_per_group,
        "inodes_per_group" => sb.inodes_per_group,
        "mtime" => sb.mtime,
        "wtime" => sb.wtime,
        "mnt_count" => sb.mnt_count,
        other => panic!("unknown field {other}"),
    }
}

fn region_with_magic(mut bytes: Vec<u8>) -> Vec<u8> {
    bytes.resize(EXT4_SUPERBLOCK_SIZE, 0);
    bytes[0x38..0x3A].copy_from_slice(&EXT4_SUPER_MAGIC.to_le_bytes());
    bytes
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn u32_fields_are_little_endian_projections(
        bytes in proptest::collection::vec(any::<u8>(), EXT4_SUPERBLOCK_SIZE),
    ) {
        let region = region_with_magic(bytes);
        let sb = Ext4Superblock::parse_superblock_region(&region).expect("magic is set");
        for &(offset, name) in U32_FIELDS {
            let expected = u32::from_le_bytes([
                region[offset],
                region[offset + 1],
                region[offset + 2],
                region[offset + 3],
            ]);
            prop_assert_eq!(u32_field(&sb, name), expected, "field {}", name);
        }
        prop_assert_eq!(u16::from_le_bytes([region[0x3A], region[0x3B]]), sb.state.bits());
        prop_assert_eq!(u16::from_le_bytes([region[0x3C], region[0x3D]]), sb.errors);
        prop_assert_eq!(u16::from_le_bytes([region[0x3E], region[0x3F]]), sb.creator_os);
        prop_assert_eq!(&region[0x68..0x78], &sb.uuid[..]);
        prop_assert_eq!(&region[0x78..0x88], &sb.volume_name[..]);
        prop_assert_eq!(&region[0xD0..0xE0], &sb.journal_uuid[..]);
    }

    #[test]
    fn written_value_reads_back(value in any::<u32>(), field_idx in 0..U32_FIELDS.len()) {
        let (offset, name) = U32_FIELDS[field_idx];
        let mut region = region_with_magic(Vec::new());
        region[offset..offset + 4].copy_from_slice(&value.to_le_bytes());

        let sb = Ext4Superblock::parse_superblock_region(&region).expect("parse");
        prop_assert_eq!(u32_field(&sb, name), value);
    }

    #[test]
    fn any_other_magic_is_rejected(magic in any::<u16>().prop_filter("not ext4", |m| *m != EXT4_SUPER_MAGIC)) {
        let mut region = vec![0_u8; EXT4_SUPERBLOCK_SIZE];
        region[0x38..0x3A].copy_from_slice(&magic.to_le_bytes());

        let err = Ext4Superblock::parse_superblock_region(&region).expect_err("bad magic");
        prop_assert_eq!(
            err,
            ParseError::InvalidMagic {
                expected: u64::from(EXT4_SUPER_MAGIC),
                actual: u64::from(magic),
            }
        );
    }

    #[test]
    fn state_rendering_is_ordered_and_ignores_unknown_bits(bits in any::<u16>()) {
        let mut region = region_with_magic(Vec::new());
        region[0x3A..0x3C].copy_from_slice(&bits.to_le_bytes());
        let sb = Ext4Superblock::parse_superblock_region(&region).expect("parse");

        let mut expected = Vec::new();
        if bits & 0x0001 != 0 {
            expected.push("cleanly_unmounted");
        }
        if bits & 0x0002 != 0 {
            expected.push("errors_detected");
        }
        if bits & 0x0004 != 0 {
            expected.push("orphans_being_recovered");
        }
        prop_assert_eq!(sb.state_display(), expected.join(" "));
    }

    #[test]
    fn uuid_text_parses_back_to_bytes(uuid in any::<[u8; 16]>()) {
        let mut region = region_with_magic(Vec::new());
        region[0x68..0x78].copy_from_slice(&uuid);
        let sb = Ext4Superblock::parse_superblock_region(&region).expect("parse");

        let text = sb.uuid_display();
        let parsed = uuid::Uuid::parse_str(&text).expect("canonical uuid text");
        prop_assert_eq!(*parsed.as_bytes(), uuid);
    }

    #[test]
    fn timestamp_is_na_only_for_zero(mtime in any::<u32>()) {
        let mut region = region_with_magic(Vec::new());
        region[0x2C..0x30].copy_from_slice(&mtime.to_le_bytes());
        let sb = Ext4Superblock::parse_superblock_region(&region).expect("parse");

        let rendered = sb.mtime_display();
        prop_assert!(!rendered.is_empty());
        prop_assert_eq!(sb.mtime == 0, rendered == "n/a");
    }

    #[test]
    fn arbitrary_regions_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..2 * EXT4_SUPERBLOCK_SIZE)) {
        if let Ok(sb) = Ext4Superblock::parse_superblock_region(&bytes) {
            let _ = sb.block_size();
            let _ = sb.errors_display();
            let _ = sb.creator_os_display();
            let _ = sb.state_display();
            let _ = sb.volume_name_display();
            prop_assert_eq!(sb.raw_bytes().len(), EXT4_SUPERBLOCK_SIZE);
        }
    }
}
