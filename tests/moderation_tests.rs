/// Moderation service behaviour against a real SQLite database
mod common;

use account_moderation::{
    account::{AccountFilter, Role},
    audit::{actions, EventFilter, ModerationDetail},
    error::ModError,
    moderation::{ModerationService, StrikePolicy, ESCALATION_REASON},
    query::Page,
};
use chrono::Duration;
use common::{admin, events_for, fixed_now, role_of, seed_account, seed_strike, setup, FixedClock};
use sqlx::SqlitePool;
use std::sync::Arc;

fn service(pool: &SqlitePool) -> ModerationService {
    ModerationService::new(pool.clone(), StrikePolicy::default())
        .with_clock(Arc::new(FixedClock(fixed_now())))
}

#[tokio::test]
async fn test_restrict_member() {
    let (_dir, pool) = setup().await;
    seed_account(&pool, "bob", Role::Member).await;

    let outcome = service(&pool)
        .restrict_user(&admin(), "bob", "spam links")
        .await
        .unwrap();

    assert_eq!(outcome.account.role, Role::Restricted);
    assert_eq!(role_of(&pool, "bob").await, Role::Restricted);

    let events = events_for(&pool, "bob").await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, actions::RESTRICT_USER);
    assert_eq!(events[0].created_at, fixed_now());
    assert_eq!(
        events[0].detail::<ModerationDetail>().unwrap(),
        ModerationDetail::new("root", "bob", "spam links")
    );
}

#[tokio::test]
async fn test_ban_member() {
    let (_dir, pool) = setup().await;
    seed_account(&pool, "bob", Role::Member).await;

    let outcome = service(&pool).ban_user(&admin(), "bob", "fraud").await.unwrap();

    assert_eq!(outcome.account.role, Role::Banned);
    assert_eq!(role_of(&pool, "bob").await, Role::Banned);

    let events = events_for(&pool, "bob").await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, actions::BAN_USER);
    assert_eq!(
        events[0].detail::<ModerationDetail>().unwrap(),
        ModerationDetail::new("root", "bob", "fraud")
    );
}

#[tokio::test]
async fn test_non_members_are_ineligible_for_every_action() {
    let (_dir, pool) = setup().await;
    let service = service(&pool);

    for role in [Role::Admin, Role::Trusted, Role::Restricted, Role::Banned] {
        let name = format!("user-{}", role);
        seed_account(&pool, &name, role).await;

        let restrict = service.restrict_user(&admin(), &name, "r").await;
        let ban = service.ban_user(&admin(), &name, "r").await;
        let strike = service.strike_user(&admin(), &name, "r", "e").await;

        assert!(matches!(restrict, Err(ModError::IneligibleTarget(_))), "restrict {}", role);
        assert!(matches!(ban, Err(ModError::IneligibleTarget(_))), "ban {}", role);
        assert!(matches!(strike, Err(ModError::IneligibleTarget(_))), "strike {}", role);

        assert_eq!(role_of(&pool, &name).await, role);
        assert!(events_for(&pool, &name).await.is_empty());
    }
}

#[tokio::test]
async fn test_repeat_action_is_rejected_not_ignored() {
    let (_dir, pool) = setup().await;
    seed_account(&pool, "bob", Role::Member).await;
    seed_account(&pool, "eve", Role::Member).await;
    let service = service(&pool);

    service.restrict_user(&admin(), "bob", "first").await.unwrap();
    let again = service.restrict_user(&admin(), "bob", "second").await;
    assert!(matches!(again, Err(ModError::IneligibleTarget(_))));

    service.ban_user(&admin(), "eve", "first").await.unwrap();
    let again = service.ban_user(&admin(), "eve", "second").await;
    assert!(matches!(again, Err(ModError::IneligibleTarget(_))));

    assert_eq!(events_for(&pool, "bob").await.len(), 1);
    assert_eq!(events_for(&pool, "eve").await.len(), 1);
}

#[tokio::test]
async fn test_unknown_target_is_not_found() {
    let (_dir, pool) = setup().await;
    let service = service(&pool);

    assert!(matches!(
        service.restrict_user(&admin(), "ghost", "r").await,
        Err(ModError::NotFound(_))
    ));
    assert!(matches!(
        service.ban_user(&admin(), "ghost", "r").await,
        Err(ModError::NotFound(_))
    ));
    assert!(matches!(
        service.strike_user(&admin(), "ghost", "r", "e").await,
        Err(ModError::NotFound(_))
    ));
    assert!(events_for(&pool, "ghost").await.is_empty());
}

#[tokio::test]
async fn test_first_strike_records_without_role_change() {
    let (_dir, pool) = setup().await;
    seed_account(&pool, "bob", Role::Member).await;

    let outcome = service(&pool)
        .strike_user(&admin(), "bob", "rude reply", "https://example.com/c/1")
        .await
        .unwrap();

    assert_eq!(outcome.strikes_in_window, 1);
    assert!(outcome.escalation.is_none());
    assert_eq!(outcome.account.role, Role::Member);
    assert_eq!(role_of(&pool, "bob").await, Role::Member);

    let events = events_for(&pool, "bob").await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, actions::RESTRICT_USER);
    assert_eq!(
        events[0].detail::<ModerationDetail>().unwrap(),
        ModerationDetail::new("root", "bob", "rude reply").with_evidence("https://example.com/c/1")
    );
}

#[tokio::test]
async fn test_each_strike_appends_one_event() {
    let (_dir, pool) = setup().await;
    seed_account(&pool, "bob", Role::Member).await;
    let service = service(&pool);

    for expected in 1..=2 {
        let outcome = service.strike_user(&admin(), "bob", "r", "e").await.unwrap();
        assert_eq!(outcome.strikes_in_window, expected);
        assert_eq!(events_for(&pool, "bob").await.len() as i64, expected);
    }
    assert_eq!(role_of(&pool, "bob").await, Role::Member);
}

#[tokio::test]
async fn test_third_strike_restricts() {
    let (_dir, pool) = setup().await;
    seed_account(&pool, "bob", Role::Member).await;
    seed_strike(&pool, "bob", fixed_now() - Duration::days(40)).await;
    seed_strike(&pool, "bob", fixed_now() - Duration::days(5)).await;

    let outcome = service(&pool)
        .strike_user(&admin(), "bob", "spam again", "screenshot")
        .await
        .unwrap();

    assert_eq!(outcome.strikes_in_window, 3);
    assert_eq!(outcome.account.role, Role::Restricted);
    assert_eq!(role_of(&pool, "bob").await, Role::Restricted);

    let escalation = outcome.escalation.expect("escalation event");
    assert_ne!(escalation.id, outcome.strike.id);
    assert_eq!(escalation.action, actions::RESTRICT_USER);
    assert_eq!(
        escalation.detail::<ModerationDetail>().unwrap(),
        ModerationDetail::new("root", "bob", ESCALATION_REASON)
    );
    assert!(!escalation.detail.contains("evidence"));

    // Two seeded, the strike itself, and the escalation
    assert_eq!(events_for(&pool, "bob").await.len(), 4);

    // Restricted accounts take no further strikes
    let after = service(&pool).strike_user(&admin(), "bob", "r", "e").await;
    assert!(matches!(after, Err(ModError::IneligibleTarget(_))));
    assert_eq!(events_for(&pool, "bob").await.len(), 4);
}

#[tokio::test]
async fn test_window_boundary() {
    let (_dir, pool) = setup().await;
    let window = StrikePolicy::default().window;
    let one_second = Duration::seconds(1);

    // Just inside the window
    seed_account(&pool, "inside", Role::Member).await;
    for _ in 0..2 {
        seed_strike(&pool, "inside", fixed_now() - (window - one_second)).await;
    }
    let outcome = service(&pool).strike_user(&admin(), "inside", "r", "e").await.unwrap();
    assert_eq!(outcome.strikes_in_window, 3);
    assert!(outcome.escalation.is_some());

    // Just outside the window
    seed_account(&pool, "outside", Role::Member).await;
    for _ in 0..2 {
        seed_strike(&pool, "outside", fixed_now() - (window + one_second)).await;
    }
    let outcome = service(&pool).strike_user(&admin(), "outside", "r", "e").await.unwrap();
    assert_eq!(outcome.strikes_in_window, 1);
    assert!(outcome.escalation.is_none());
    assert_eq!(role_of(&pool, "outside").await, Role::Member);
}

#[tokio::test]
async fn test_strikes_on_other_accounts_do_not_count() {
    let (_dir, pool) = setup().await;
    seed_account(&pool, "bob", Role::Member).await;
    seed_strike(&pool, "bobby", fixed_now() - Duration::days(1)).await;
    seed_strike(&pool, "bob_", fixed_now() - Duration::days(1)).await;

    let outcome = service(&pool).strike_user(&admin(), "bob", "r", "e").await.unwrap();
    assert_eq!(outcome.strikes_in_window, 1);
    assert!(outcome.escalation.is_none());
}

#[tokio::test]
async fn test_configured_policy() {
    let (_dir, pool) = setup().await;
    seed_account(&pool, "bob", Role::Member).await;
    seed_strike(&pool, "bob", fixed_now() - Duration::days(20)).await;

    let strict = ModerationService::new(
        pool.clone(),
        StrikePolicy {
            window: Duration::days(30),
            threshold: 2,
        },
    )
    .with_clock(Arc::new(FixedClock(fixed_now())));

    let outcome = strict.strike_user(&admin(), "bob", "r", "e").await.unwrap();
    assert_eq!(outcome.strikes_in_window, 2);
    assert!(outcome.escalation.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_moderation_applies_once() {
    for round in 0..10 {
        let (_dir, pool) = setup().await;
        seed_account(&pool, "bob", Role::Member).await;
        let service = service(&pool);

        let restrict = {
            let service = service.clone();
            tokio::spawn(async move { service.restrict_user(&admin(), "bob", "race").await })
        };
        let ban = {
            let service = service.clone();
            tokio::spawn(async move { service.ban_user(&admin(), "bob", "race").await })
        };
        let restrict = restrict.await.unwrap();
        let ban = ban.await.unwrap();

        let (winner, loser) = match (&restrict, &ban) {
            (Ok(_), Err(e)) => (Role::Restricted, e),
            (Err(e), Ok(_)) => (Role::Banned, e),
            _ => panic!("round {}: expected exactly one success, got {:?} / {:?}", round, restrict, ban),
        };
        assert!(
            matches!(loser, ModError::IneligibleTarget(_)),
            "round {}: loser failed with {:?}",
            round,
            loser
        );
        assert_eq!(role_of(&pool, "bob").await, winner);
        assert_eq!(events_for(&pool, "bob").await.len(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_third_strikes_escalate_once() {
    for round in 0..5 {
        let (_dir, pool) = setup().await;
        seed_account(&pool, "bob", Role::Member).await;
        seed_strike(&pool, "bob", fixed_now() - Duration::days(2)).await;
        seed_strike(&pool, "bob", fixed_now() - Duration::days(1)).await;
        let service = service(&pool);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.strike_user(&admin(), "bob", "r", "e").await })
            })
            .collect();
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        let escalated = results
            .iter()
            .filter(|r| matches!(r, Ok(outcome) if outcome.escalation.is_some()))
            .count();
        assert_eq!(escalated, 1, "round {}", round);
        for result in &results {
            if let Err(e) = result {
                assert!(matches!(e, ModError::IneligibleTarget(_)), "round {}: {:?}", round, e);
            }
        }

        assert_eq!(role_of(&pool, "bob").await, Role::Restricted);
        let escalations = events_for(&pool, "bob")
            .await
            .into_iter()
            .filter(|e| e.detail::<ModerationDetail>().unwrap().reason == ESCALATION_REASON)
            .count();
        assert_eq!(escalations, 1);
    }
}

#[tokio::test]
async fn test_audit_failure_rolls_back_role_change() {
    let (_dir, pool) = setup().await;
    seed_account(&pool, "bob", Role::Member).await;
    sqlx::query(
        "CREATE TRIGGER reject_audit BEFORE INSERT ON audit_event BEGIN SELECT RAISE(ABORT, 'ledger unavailable'); END",
    )
    .execute(&pool)
    .await
    .unwrap();
    let service = service(&pool);

    let restrict = service.restrict_user(&admin(), "bob", "spam").await;
    assert!(matches!(restrict, Err(ModError::Persistence(_))), "{:?}", restrict);

    let strike = service.strike_user(&admin(), "bob", "spam", "post 1").await;
    assert!(matches!(strike, Err(ModError::Persistence(_))), "{:?}", strike);

    assert_eq!(role_of(&pool, "bob").await, Role::Member);
    assert!(events_for(&pool, "bob").await.is_empty());
}

#[tokio::test]
async fn test_unrepresentable_window_is_an_error() {
    let (_dir, pool) = setup().await;
    seed_account(&pool, "bob", Role::Member).await;

    let service = ModerationService::new(
        pool.clone(),
        StrikePolicy {
            window: Duration::days(200_000_000),
            threshold: 3,
        },
    )
    .with_clock(Arc::new(FixedClock(fixed_now())));

    let result = service.strike_user(&admin(), "bob", "r", "e").await;
    assert!(matches!(result, Err(ModError::Internal(_))), "{:?}", result);
    assert!(events_for(&pool, "bob").await.is_empty());
}

#[tokio::test]
async fn test_listing_through_service() {
    let (_dir, pool) = setup().await;
    for name in ["alice", "bob", "carol"] {
        seed_account(&pool, name, Role::Member).await;
    }
    let service = service(&pool);
    service.ban_user(&admin(), "bob", "spam").await.unwrap();

    let accounts = service
        .list_accounts(&AccountFilter::default(), Page::from_number(1, 2).unwrap())
        .await
        .unwrap();
    assert_eq!(accounts.total, 3);
    assert_eq!(accounts.items.len(), 2);
    assert_eq!(accounts.items[0].username, "alice");

    let banned = AccountFilter {
        role: Some(Role::Banned),
        ..Default::default()
    };
    let accounts = service
        .list_accounts(&banned, Page::from_number(1, 50).unwrap())
        .await
        .unwrap();
    assert_eq!(accounts.total, 1);
    assert_eq!(accounts.items[0].username, "bob");

    let bans = EventFilter {
        action: Some(actions::BAN_USER.to_string()),
        ..Default::default()
    };
    let events = service
        .list_events(&bans, Page::from_number(1, 50).unwrap())
        .await
        .unwrap();
    assert_eq!(events.total, 1);
    assert_eq!(events.items.len(), 1);
}
