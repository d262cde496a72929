use std::sync::Arc;
use std::time::Duration;

use aptwatch::{InMemoryGateway, NullMessagingSender, NotificationDispatcher};
use aptwatch_mock::fixtures;
use aptwatch_types::config::NotificationConfig;
use proptest::prelude::*;

fn distinct_listings(n: usize) -> Vec<aptwatch_types::Listing> {
    let mut pool = fixtures::immoscout24();
    pool.extend(fixtures::immowelt());
    pool.extend(fixtures::kleinanzeigen());
    pool.into_iter().cycle().take(n).collect::<Vec<_>>()
}

proptest! {
    #[test]
    fn per_cycle_cap_is_never_exceeded_within_one_cycle(
        cap in 1u32..5,
        attempts in 1usize..20,
    ) {
        tokio_test::block_on(async move {
            let gw = Arc::new(InMemoryGateway::new());
            let dispatcher = NotificationDispatcher::new(
                gw,
                Arc::new(NullMessagingSender),
                NotificationConfig {
                    throttle: Duration::from_millis(0),
                    max_notify_per_cycle: cap,
                },
            );
            let user = aptwatch::User {
                id: "u1".to_string(),
                language: aptwatch::Language::De,
            };
            let filter = aptwatch::UserFilter::default();

            let mut total = 0u32;
            for (i, listing) in distinct_listings(attempts).into_iter().enumerate() {
                // Give each attempt a unique surrogate id so at-most-once
                // delivery never masks the cap itself.
                let mut listing = listing;
                listing.surrogate_id = format!("{}-{i}", listing.surrogate_id);
                total += dispatcher
                    .dispatch(&listing, &[(user.clone(), filter.clone())])
                    .await
                    .unwrap()
                    .sent;
            }
            prop_assert!(total <= cap);
        })?;
    }

    #[test]
    fn begin_cycle_resets_the_cap(cap in 1u32..5) {
        tokio_test::block_on(async move {
            let gw = Arc::new(InMemoryGateway::new());
            let dispatcher = NotificationDispatcher::new(
                gw,
                Arc::new(NullMessagingSender),
                NotificationConfig {
                    throttle: Duration::from_millis(0),
                    max_notify_per_cycle: cap,
                },
            );
            let user = aptwatch::User {
                id: "u1".to_string(),
                language: aptwatch::Language::De,
            };
            let filter = aptwatch::UserFilter::default();

            let mut first_cycle = 0u32;
            for (i, listing) in distinct_listings(cap as usize + 3).into_iter().enumerate() {
                let mut listing = listing;
                listing.surrogate_id = format!("cycle1-{i}-{}", listing.surrogate_id);
                first_cycle += dispatcher
                    .dispatch(&listing, &[(user.clone(), filter.clone())])
                    .await
                    .unwrap()
                    .sent;
            }
            prop_assert_eq!(first_cycle, cap);

            dispatcher.begin_cycle();

            let mut second_cycle = 0u32;
            for (i, listing) in distinct_listings(cap as usize + 3).into_iter().enumerate() {
                let mut listing = listing;
                listing.surrogate_id = format!("cycle2-{i}-{}", listing.surrogate_id);
                second_cycle += dispatcher
                    .dispatch(&listing, &[(user.clone(), filter.clone())])
                    .await
                    .unwrap()
                    .sent;
            }
            prop_assert_eq!(second_cycle, cap);
        })?;
    }
}
