//! Generate, fan-out and regenerate behaviour with transient failures only.

use super::support::{wait_until, Harness, ImageDouble, Reply, TextDouble};
use postcraft::auth::AuthState;
use postcraft::draft::{HashtagError, Platform, Tone};
use postcraft::image::{AspectRatio, AspectRatioChoice, ImageRequestConfig, ResolutionTier};
use postcraft::orchestrator::{
    GenerateOutcome, ImageOutcome, Notice, RegenerateOutcome, SkipReason,
};

#[tokio::test]
async fn whitespace_idea_changes_nothing() {
    let h = Harness::new(TextDouble::new(), ImageDouble::new());
    let before = h.orchestrator.snapshot();

    let outcome = h.orchestrator.generate("   \n\t  ", Tone::Professional).await;

    assert!(matches!(outcome, GenerateOutcome::Skipped(SkipReason::EmptyIdea)));
    let after = h.orchestrator.snapshot();
    assert_eq!(after.epoch, before.epoch);
    assert!(after.results.is_none());
    assert!(!after.text_in_progress);
    assert!(h.text.calls().is_empty());
    assert_eq!(h.images.call_count(), 0);
}

#[tokio::test]
async fn idea_is_trimmed_before_sending() {
    let h = Harness::new(TextDouble::new(), ImageDouble::new());
    let GenerateOutcome::Drafted(batch) = h.orchestrator.generate("  new roast  ", Tone::Witty).await
    else {
        panic!("expected drafts");
    };
    batch.settled().await;
    assert_eq!(h.text.calls(), vec![("new roast".to_string(), Tone::Witty)]);
}

#[tokio::test]
async fn every_card_is_loading_before_any_image_resolves() {
    let h = Harness::new(TextDouble::new(), ImageDouble::gated());

    let GenerateOutcome::Drafted(batch) = h.orchestrator.generate("Launch", Tone::Urgent).await
    else {
        panic!("expected drafts");
    };

    let snapshot = h.orchestrator.snapshot();
    let results = snapshot.results.expect("drafts visible");
    assert_eq!(results.len(), 4);
    for platform in Platform::ALL {
        let card = results.get(platform).unwrap();
        assert!(card.image_loading, "{} should be loading", platform);
        assert!(card.image.is_none());
        assert_eq!(card.text, format!("{}: Launch", platform.display_name()));
    }
    assert!(!snapshot.text_in_progress);

    wait_until(|| h.images.call_count() == 4).await;
    h.images.release_all();
    let report = batch.settled().await;
    assert_eq!(report.stored_count(), 4);
    assert!(!h.orchestrator.snapshot().results.unwrap().any_loading());
}

#[tokio::test]
async fn one_transient_failure_leaves_the_others_intact() {
    let images = ImageDouble::new();
    images.script(Platform::Twitter, Reply::Network);
    let h = Harness::new(TextDouble::new(), images);

    let GenerateOutcome::Drafted(batch) = h.orchestrator.generate("Launch", Tone::Witty).await
    else {
        panic!("expected drafts");
    };
    let report = batch.settled().await;

    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.stored_count(), 3);
    assert!(matches!(
        report.outcome(Platform::Twitter),
        Some(ImageOutcome::Failed { fatal: false, .. })
    ));

    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.auth, AuthState::Authorized);
    let results = snapshot.results.unwrap();
    let twitter = results.get(Platform::Twitter).unwrap();
    assert!(!twitter.image_loading);
    assert!(twitter.image.is_none());
    assert_eq!(twitter.text, "Twitter: Launch");
    for platform in [Platform::LinkedIn, Platform::Instagram, Platform::Facebook] {
        let card = results.get(platform).unwrap();
        assert!(card.image.is_some(), "{} should have an image", platform);
        assert!(!card.image_loading);
    }

    let notices = h.notifier.notices();
    assert_eq!(h.notifier.alert_count(), 0);
    assert!(notices.iter().any(|n| matches!(
        n,
        Notice::ImageGenerationFailed { platform: Platform::Twitter, .. }
    )));
    assert_eq!(h.keys.calls(), 0);
}

#[tokio::test]
async fn transient_text_failure_notifies_once() {
    let text = TextDouble::new();
    text.fail_next(Reply::Network);
    let h = Harness::new(text, ImageDouble::new());

    let outcome = h.orchestrator.generate("Launch", Tone::Professional).await;

    assert!(matches!(outcome, GenerateOutcome::TextFailed { .. }));
    let snapshot = h.orchestrator.snapshot();
    assert!(!snapshot.text_in_progress);
    assert!(snapshot.results.is_none());
    assert_eq!(snapshot.auth, AuthState::Authorized);
    assert_eq!(h.images.call_count(), 0);
    let notices = h.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert!(matches!(notices[0], Notice::TextGenerationFailed { .. }));
    assert_eq!(notices[0].message(), "Failed to generate posts. Please try again.");
}

#[tokio::test]
async fn second_generate_is_refused_while_text_is_running() {
    let h = Harness::new(TextDouble::gated(), ImageDouble::new());
    let orchestrator = h.orchestrator.clone();
    let first = tokio::spawn(async move { orchestrator.generate("first", Tone::Witty).await });

    wait_until(|| h.orchestrator.snapshot().text_in_progress).await;
    assert!(!h.orchestrator.snapshot().can_generate());
    let second = h.orchestrator.generate("second", Tone::Witty).await;
    assert!(matches!(second, GenerateOutcome::Skipped(SkipReason::InProgress)));

    h.text.release();
    let GenerateOutcome::Drafted(batch) = first.await.unwrap() else {
        panic!("expected drafts");
    };
    batch.settled().await;
    assert_eq!(h.text.calls().len(), 1);
    assert_eq!(h.orchestrator.snapshot().idea, "first");
}

#[tokio::test]
async fn regenerate_touches_only_its_platform() {
    let h = Harness::new(TextDouble::new(), ImageDouble::new());
    let GenerateOutcome::Drafted(batch) = h.orchestrator.generate("Launch", Tone::Witty).await
    else {
        panic!("expected drafts");
    };
    batch.settled().await;
    let before = h.orchestrator.snapshot().results.unwrap();

    let outcome = h.orchestrator.regenerate_image(Platform::Instagram).await;
    assert_eq!(outcome, RegenerateOutcome::Finished(ImageOutcome::Stored));

    let after = h.orchestrator.snapshot().results.unwrap();
    assert_eq!(after.epoch(), before.epoch());
    for platform in [Platform::LinkedIn, Platform::Twitter, Platform::Facebook] {
        assert_eq!(after.get(platform), before.get(platform));
    }
    let old = before.get(Platform::Instagram).unwrap();
    let new = after.get(Platform::Instagram).unwrap();
    assert_ne!(old.image, new.image);
    assert_eq!(old.text, new.text);
    assert_eq!(old.hashtags, new.hashtags);
    assert!(!new.image_loading);
    assert_eq!(h.images.calls_for(Platform::Instagram), 2);
    assert_eq!(h.images.call_count(), 5);
}

#[tokio::test]
async fn regenerate_failure_keeps_the_previous_image() {
    let h = Harness::new(TextDouble::new(), ImageDouble::new());
    let GenerateOutcome::Drafted(batch) = h.orchestrator.generate("Launch", Tone::Witty).await
    else {
        panic!("expected drafts");
    };
    batch.settled().await;
    let before = h.orchestrator.snapshot().results.unwrap();

    h.images.script(Platform::Facebook, Reply::Network);
    let outcome = h.orchestrator.regenerate_image(Platform::Facebook).await;
    assert!(matches!(
        outcome,
        RegenerateOutcome::Finished(ImageOutcome::Failed { fatal: false, .. })
    ));
    let after = h.orchestrator.snapshot().results.unwrap();
    assert_eq!(after.get(Platform::Facebook), before.get(Platform::Facebook));
}

#[tokio::test]
async fn regenerate_without_drafts_is_a_no_op() {
    let h = Harness::new(TextDouble::new(), ImageDouble::new());
    let outcome = h.orchestrator.regenerate_image(Platform::Twitter).await;
    assert_eq!(outcome, RegenerateOutcome::Skipped(SkipReason::NoDraft));
    assert_eq!(h.images.call_count(), 0);
}

#[tokio::test]
async fn image_settings_are_read_at_request_time() {
    let h = Harness::new(TextDouble::new(), ImageDouble::new());
    let GenerateOutcome::Drafted(batch) = h.orchestrator.generate("Launch", Tone::Witty).await
    else {
        panic!("expected drafts");
    };
    batch.settled().await;
    assert!(h
        .images
        .calls()
        .iter()
        .all(|c| c.config == ImageRequestConfig::default()));

    let wide = ImageRequestConfig {
        aspect_ratio: AspectRatioChoice::Fixed(AspectRatio::Ultrawide21x9),
        resolution: ResolutionTier::Ultra,
    };
    h.orchestrator.set_image_config(wide);
    h.orchestrator.regenerate_image(Platform::LinkedIn).await;

    let last = h.images.calls().pop().unwrap();
    assert_eq!(last.platform, Platform::LinkedIn);
    assert_eq!(last.config, wide);
    assert_eq!(last.config.resolve_for(last.platform).aspect_ratio, "16:9");
    assert_eq!(last.prompt, "linkedin illustration");
}

#[tokio::test]
async fn stale_completions_are_discarded() {
    let h = Harness::new(TextDouble::new(), ImageDouble::gated());

    let GenerateOutcome::Drafted(first) = h.orchestrator.generate("first", Tone::Witty).await
    else {
        panic!("expected drafts");
    };
    wait_until(|| h.images.call_count() == 4).await;

    let GenerateOutcome::Drafted(second) = h.orchestrator.generate("second", Tone::Urgent).await
    else {
        panic!("expected drafts");
    };
    assert_eq!(second.epoch(), first.epoch() + 1);

    h.images.release_oldest(4);
    let stale = first.settled().await;
    assert!(stale
        .outcomes
        .values()
        .all(|o| *o == ImageOutcome::Stale));

    let snapshot = h.orchestrator.snapshot();
    let results = snapshot.results.unwrap();
    assert_eq!(results.epoch(), second.epoch());
    assert_eq!(results.get(Platform::Twitter).unwrap().text, "Twitter: second");
    assert!(results.iter().all(|(_, c)| c.image_loading && c.image.is_none()));

    wait_until(|| h.images.call_count() == 8).await;
    h.images.release_all();
    let fresh = second.settled().await;
    assert_eq!(fresh.stored_count(), 4);
}

#[tokio::test]
async fn hashtag_edits_apply_to_the_instagram_card() {
    let h = Harness::new(TextDouble::new(), ImageDouble::new());
    assert_eq!(h.orchestrator.add_hashtag("x"), Err(HashtagError::NoDraft));

    let GenerateOutcome::Drafted(batch) = h.orchestrator.generate("Launch", Tone::Witty).await
    else {
        panic!("expected drafts");
    };
    batch.settled().await;

    assert_eq!(h.orchestrator.add_hashtag("  morning ").unwrap(), "#morning");
    assert!(matches!(
        h.orchestrator.add_hashtag("#COFFEE"),
        Err(HashtagError::Duplicate(_))
    ));
    assert_eq!(h.orchestrator.add_hashtag("  "), Err(HashtagError::Empty));
    assert_eq!(
        h.orchestrator.remove_hashtag(0).unwrap().as_deref(),
        Some("#launch")
    );

    let results = h.orchestrator.snapshot().results.unwrap();
    let instagram = results.get(Platform::Instagram).unwrap();
    assert_eq!(
        instagram.hashtags.as_ref().unwrap().as_slice(),
        &["#coffee".to_string(), "#morning".to_string()]
    );
    assert!(results.get(Platform::Twitter).unwrap().hashtags.is_none());
}
