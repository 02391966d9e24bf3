//! Fatal authorization failures: lock, single alert, short-circuit and recovery.

use super::support::{wait_until, Harness, ImageDouble, Reply, TextDouble};
use postcraft::auth::AuthState;
use postcraft::draft::{Platform, Tone};
use postcraft::orchestrator::{
    GenerateOutcome, ImageOutcome, Notice, OrchestratorOptions, RegenerateOutcome, SkipReason,
};

#[tokio::test]
async fn fatal_failure_skips_requests_not_yet_started() {
    let images = ImageDouble::new();
    images.script(Platform::LinkedIn, Reply::Forbidden);
    let h = Harness::with_options(
        TextDouble::new(),
        images,
        OrchestratorOptions {
            max_parallel_images: 1,
            ..OrchestratorOptions::default()
        },
    );

    let GenerateOutcome::Drafted(batch) = h.orchestrator.generate("Launch", Tone::Witty).await
    else {
        panic!("expected drafts");
    };
    let report = batch.settled().await;

    assert_eq!(h.images.call_count(), 1);
    assert!(matches!(
        report.outcome(Platform::LinkedIn),
        Some(ImageOutcome::Failed { fatal: true, .. })
    ));
    assert_eq!(report.skipped_count(), 3);
    assert_eq!(h.orchestrator.auth_state(), AuthState::Locked);
    assert_eq!(h.notifier.alert_count(), 1);
    assert_eq!(h.keys.calls(), 1);

    let snapshot = h.orchestrator.snapshot();
    assert!(snapshot.fatal_auth);
    assert!(snapshot.results.is_none());
    assert!(!snapshot.can_generate());
}

#[tokio::test]
async fn in_flight_requests_still_land_after_a_fatal_failure() {
    let images = ImageDouble::gated();
    images.script(Platform::Instagram, Reply::Forbidden);
    let h = Harness::new(TextDouble::new(), images);

    let GenerateOutcome::Drafted(batch) = h
        .orchestrator
        .generate("إطلاق منتج جديد", Tone::Professional)
        .await
    else {
        panic!("expected drafts");
    };
    wait_until(|| h.images.call_count() == 4).await;

    assert!(h.images.release(Platform::Instagram));
    wait_until(|| h.orchestrator.auth_state() == AuthState::Locked).await;
    assert!(h.orchestrator.snapshot().results.is_none());

    h.images.release_all();
    let report = batch.settled().await;
    assert!(matches!(
        report.outcome(Platform::Instagram),
        Some(ImageOutcome::Failed { fatal: true, .. })
    ));
    assert_eq!(report.stored_count(), 3);
    assert_eq!(h.images.call_count(), 4);

    // Locked hides the cards without discarding them.
    let locked = h.orchestrator.snapshot();
    assert_eq!(locked.auth, AuthState::Locked);
    assert!(locked.results.is_none());
    assert_eq!(h.notifier.alert_count(), 1);
    let alert = h
        .notifier
        .notices()
        .into_iter()
        .find(Notice::is_alert)
        .unwrap();
    assert!(alert.message().contains("billing enabled"));

    h.keys.answer_next(true);
    assert!(h.orchestrator.authorize().await);
    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.auth, AuthState::Authorized);
    assert!(!snapshot.fatal_auth);
    let results = snapshot.results.expect("cards visible again");
    assert_eq!(
        results.get(Platform::LinkedIn).unwrap().text,
        "LinkedIn: إطلاق منتج جديد"
    );
    for platform in [Platform::LinkedIn, Platform::Twitter, Platform::Facebook] {
        assert!(results.get(platform).unwrap().image.is_some());
    }
    let instagram = results.get(Platform::Instagram).unwrap();
    assert!(instagram.image.is_none());
    assert!(!instagram.image_loading);
    assert!(h.notifier.notices().contains(&Notice::Reauthorized));
}

#[tokio::test]
async fn concurrent_fatal_failures_raise_one_alert() {
    let images = ImageDouble::gated();
    images.script(Platform::Twitter, Reply::Forbidden);
    images.script(Platform::Facebook, Reply::Forbidden);
    let h = Harness::new(TextDouble::new(), images);

    let GenerateOutcome::Drafted(batch) = h.orchestrator.generate("Launch", Tone::Urgent).await
    else {
        panic!("expected drafts");
    };
    wait_until(|| h.images.call_count() == 4).await;

    h.images.release(Platform::Twitter);
    wait_until(|| h.orchestrator.auth_state() == AuthState::Locked).await;
    h.images.release_all();
    let report = batch.settled().await;

    for platform in [Platform::Twitter, Platform::Facebook] {
        assert!(matches!(
            report.outcome(platform),
            Some(ImageOutcome::Failed { fatal: true, .. })
        ));
    }
    assert_eq!(h.notifier.alert_count(), 1);
    assert_eq!(h.keys.calls(), 1);
    assert!(!h
        .notifier
        .notices()
        .iter()
        .any(|n| matches!(n, Notice::ImageGenerationFailed { .. })));
}

#[tokio::test]
async fn fatal_text_failure_locks_before_any_image_request() {
    let text = TextDouble::new();
    text.fail_next(Reply::Forbidden);
    let h = Harness::new(text, ImageDouble::new());

    let outcome = h.orchestrator.generate("Launch", Tone::Professional).await;

    assert!(matches!(outcome, GenerateOutcome::Locked));
    assert_eq!(h.images.call_count(), 0);
    assert_eq!(h.orchestrator.auth_state(), AuthState::Locked);
    let notices = h.notifier.notices();
    assert_eq!(h.notifier.alert_count(), 1);
    assert!(!notices
        .iter()
        .any(|n| matches!(n, Notice::TextGenerationFailed { .. })));

    let refused = h.orchestrator.generate("Launch", Tone::Professional).await;
    assert!(matches!(
        refused,
        GenerateOutcome::Skipped(SkipReason::NotAuthorized)
    ));
    assert_eq!(h.text.calls().len(), 1);

    h.keys.answer_next(true);
    assert!(h.orchestrator.authorize().await);
    let GenerateOutcome::Drafted(batch) = h.orchestrator.generate("Launch", Tone::Professional).await
    else {
        panic!("expected drafts after re-authorization");
    };
    assert_eq!(batch.settled().await.stored_count(), 4);
}

#[tokio::test]
async fn fatal_regeneration_locks_the_app() {
    let h = Harness::new(TextDouble::new(), ImageDouble::new());
    let GenerateOutcome::Drafted(batch) = h.orchestrator.generate("Launch", Tone::Witty).await
    else {
        panic!("expected drafts");
    };
    batch.settled().await;

    h.images.script(Platform::Twitter, Reply::Forbidden);
    let outcome = h.orchestrator.regenerate_image(Platform::Twitter).await;

    assert!(matches!(
        outcome,
        RegenerateOutcome::Finished(ImageOutcome::Failed { fatal: true, .. })
    ));
    assert_eq!(h.orchestrator.auth_state(), AuthState::Locked);
    assert_eq!(h.notifier.alert_count(), 1);
    assert_eq!(
        h.orchestrator.regenerate_image(Platform::Twitter).await,
        RegenerateOutcome::Skipped(SkipReason::NotAuthorized)
    );
}

#[tokio::test]
async fn each_cycle_gets_its_own_alert() {
    let images = ImageDouble::new();
    images.script(Platform::LinkedIn, Reply::Forbidden);
    images.script(Platform::LinkedIn, Reply::Forbidden);
    let h = Harness::with_options(
        TextDouble::new(),
        images,
        OrchestratorOptions {
            max_parallel_images: 1,
            ..OrchestratorOptions::default()
        },
    );

    let GenerateOutcome::Drafted(first) = h.orchestrator.generate("one", Tone::Witty).await else {
        panic!("expected drafts");
    };
    first.settled().await;
    assert_eq!(h.notifier.alert_count(), 1);

    h.keys.answer_next(true);
    assert!(h.orchestrator.authorize().await);

    let GenerateOutcome::Drafted(second) = h.orchestrator.generate("two", Tone::Witty).await else {
        panic!("expected drafts");
    };
    let report = second.settled().await;
    assert_eq!(report.skipped_count(), 3);
    assert_eq!(h.notifier.alert_count(), 2);
    assert_eq!(h.images.call_count(), 2);
}

#[tokio::test]
async fn fatal_failure_from_a_replaced_cycle_is_ignored() {
    let images = ImageDouble::gated();
    images.script(Platform::Twitter, Reply::Forbidden);
    let h = Harness::new(TextDouble::new(), images);

    let GenerateOutcome::Drafted(first) = h.orchestrator.generate("one", Tone::Witty).await else {
        panic!("expected drafts");
    };
    wait_until(|| h.images.call_count() == 4).await;

    let GenerateOutcome::Drafted(second) = h.orchestrator.generate("two", Tone::Witty).await
    else {
        panic!("expected drafts");
    };
    let current = second.epoch();
    wait_until(|| h.images.call_count() == 8).await;
    h.images.release_newest(4);
    assert_eq!(second.settled().await.stored_count(), 4);

    h.images.release_all();
    let stale = first.settled().await;
    assert_eq!(stale.outcome(Platform::Twitter), Some(&ImageOutcome::Stale));
    assert!(stale.outcomes.values().all(|o| *o == ImageOutcome::Stale));

    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.auth, AuthState::Authorized);
    assert!(!snapshot.fatal_auth);
    assert_eq!(h.notifier.alert_count(), 0);
    assert_eq!(h.keys.calls(), 0);
    let results = snapshot.results.expect("current cycle stays visible");
    assert_eq!(results.epoch(), current);
    assert!(results.iter().all(|(_, card)| card.image.is_some()));
}
