//! Property tests for room-name derivation from request paths.
//!
//! Uses proptest to verify:
//! 1. `/<name>` always yields exactly `<name>`.
//! 2. Distinct names never collapse into the same room.
//! 3. Arbitrary paths never panic.

use proptest::prelude::*;
use whiteboard_relay::room::RoomName;

proptest! {
    #[test]
    fn leading_slash_stripped_once(name in ".*") {
        let room = RoomName::from_path(&format!("/{name}"));
        prop_assert_eq!(room.as_str(), name.as_str());
        prop_assert_eq!(room.is_default(), name.is_empty());
    }

    #[test]
    fn distinct_names_distinct_rooms(a in "[a-z0-9/_-]{0,16}", b in "[a-z0-9/_-]{0,16}") {
        prop_assume!(a != b);
        let ra = RoomName::from_path(&format!("/{a}"));
        let rb = RoomName::from_path(&format!("/{b}"));
        prop_assert_ne!(ra, rb);
    }

    #[test]
    fn any_path_accepted(path in ".*") {
        let room = RoomName::from_path(&path);
        prop_assert!(room.as_str().len() <= path.len());
    }
}
