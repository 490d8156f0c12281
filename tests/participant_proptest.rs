//! Property tests for participant lists, direct keys and previews

use proptest::prelude::*;
use uuid::Uuid;
use wazap::shared::messaging::{dedup_participants, direct_key, MessagePayload};

fn user_id() -> impl Strategy<Value = Uuid> {
    // A small id space so duplicates actually show up
    (0u128..16).prop_map(Uuid::from_u128)
}

proptest! {
    #[test]
    fn dedup_keeps_first_occurrence_order(ids in prop::collection::vec(user_id(), 0..40)) {
        let deduped = dedup_participants(&ids);

        for (i, id) in deduped.iter().enumerate() {
            prop_assert!(!deduped[i + 1..].contains(id));
        }
        for id in &ids {
            prop_assert!(deduped.contains(id));
        }
        let first_seen: Vec<Uuid> = ids
            .iter()
            .enumerate()
            .filter(|(i, id)| !ids[..*i].contains(id))
            .map(|(_, id)| *id)
            .collect();
        prop_assert_eq!(deduped, first_seen);
    }

    #[test]
    fn dedup_is_idempotent(ids in prop::collection::vec(user_id(), 0..40)) {
        let once = dedup_participants(&ids);
        prop_assert_eq!(dedup_participants(&once), once);
    }

    #[test]
    fn direct_key_ignores_order(a in any::<u128>(), b in any::<u128>()) {
        let (a, b) = (Uuid::from_u128(a), Uuid::from_u128(b));
        prop_assert_eq!(direct_key(a, b), direct_key(b, a));
    }

    #[test]
    fn direct_key_distinguishes_pairs(a in user_id(), b in user_id(), c in user_id()) {
        prop_assume!(b != c);
        prop_assert_ne!(direct_key(a, b), direct_key(a, c));
    }

    #[test]
    fn preview_never_exceeds_limit(text in "\\PC{0,300}", max_len in 3usize..200) {
        let preview = MessagePayload::text(text.clone()).preview(max_len);
        prop_assert!(preview.chars().count() <= max_len);
        if text.chars().count() <= max_len {
            prop_assert_eq!(preview, text);
        } else {
            prop_assert!(preview.ends_with("..."));
        }
    }
}
