//! Property-based tests for virtual conversation ids

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use xfchat::shared::messaging::{is_virtual_id, peer_from_virtual_id, virtual_id};

proptest! {
    #[test]
    fn test_peer_recovered_from_id(
        peer in "[a-zA-Z0-9_-]{1,24}",
        millis in 0i64..4_000_000_000_000,
    ) {
        let id = virtual_id(&peer, Utc.timestamp_millis_opt(millis).unwrap());
        prop_assert!(is_virtual_id(&id));
        prop_assert_eq!(peer_from_virtual_id(&id).unwrap(), peer.as_str());
    }

    #[test]
    fn test_server_ids_are_not_virtual(id in "[a-z0-9]{1,24}") {
        prop_assume!(!id.starts_with("virtual"));
        prop_assert!(!is_virtual_id(&id));
        prop_assert!(peer_from_virtual_id(&id).is_err());
    }
}
