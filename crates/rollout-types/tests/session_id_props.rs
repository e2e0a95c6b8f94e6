use proptest::prelude::*;
use rollout_types::{SessionId, TtlConfig};

proptest! {
    /// Any UUID survives Display -> parse unchanged.
    #[test]
    fn session_id_display_parse_round_trip(bytes in any::<[u8; 16]>()) {
        let id = SessionId::from(uuid::Uuid::from_bytes(bytes));
        let parsed = SessionId::parse(&id.to_string()).unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// Strings that are not 36 characters long are never accepted.
    #[test]
    fn wrong_length_ids_are_rejected(raw in "[0-9a-f-]{0,35}") {
        prop_assert!(SessionId::parse(&raw).is_err());
    }

    /// Day-count TTLs always expire strictly after creation.
    #[test]
    fn day_ttl_expires_after_creation(days in 1u32..3650) {
        let created = chrono::Utc::now();
        let expires = TtlConfig::Days(days).expires_at(created).unwrap().unwrap();
        prop_assert!(expires > created);
    }
}
