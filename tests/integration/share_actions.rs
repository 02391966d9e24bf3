//! Copy, share and download driven from a finished drafting cycle.

use super::support::{Harness, ImageDouble, Reply, TextDouble};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use postcraft::draft::{Platform, Tone};
use postcraft::error::ApiError;
use postcraft::orchestrator::GenerateOutcome;
use postcraft::share::{
    copy_card, download_image, share_card, share_link, Clipboard, DirectoryShare, NoShareTarget,
    ShareOutcome,
};
use std::fs;
use tempfile::TempDir;

#[derive(Default)]
struct MemoryClipboard {
    copied: Mutex<Vec<String>>,
}

impl Clipboard for MemoryClipboard {
    fn copy(&self, text: &str) -> Result<(), ApiError> {
        self.copied.lock().push(text.to_string());
        Ok(())
    }
}

async fn drafted(images: ImageDouble) -> Harness {
    let h = Harness::new(TextDouble::new(), images);
    let GenerateOutcome::Drafted(batch) = h.orchestrator.generate("Launch", Tone::Witty).await
    else {
        panic!("expected drafts");
    };
    batch.settled().await;
    h
}

#[tokio::test]
async fn copying_instagram_appends_edited_hashtags() {
    let h = drafted(ImageDouble::new()).await;
    h.orchestrator.add_hashtag("coldbrew").unwrap();

    let results = h.orchestrator.snapshot().results.unwrap();
    let clipboard = MemoryClipboard::default();
    copy_card(&clipboard, results.get(Platform::Instagram).unwrap()).unwrap();
    copy_card(&clipboard, results.get(Platform::LinkedIn).unwrap()).unwrap();

    let copied = clipboard.copied.lock().clone();
    assert_eq!(
        copied[0],
        "Instagram: Launch\n\n#launch #coffee #coldbrew"
    );
    assert_eq!(copied[1], "LinkedIn: Launch");
}

#[tokio::test]
async fn share_without_a_target_falls_back_to_the_clipboard() {
    let h = drafted(ImageDouble::new()).await;
    let results = h.orchestrator.snapshot().results.unwrap();
    let clipboard = MemoryClipboard::default();

    let outcome = share_card(
        &NoShareTarget,
        &clipboard,
        Platform::Twitter,
        results.get(Platform::Twitter).unwrap(),
    )
    .unwrap();

    assert_eq!(outcome, ShareOutcome::CopiedToClipboard);
    assert_eq!(clipboard.copied.lock().as_slice(), &["Twitter: Launch".to_string()]);
    let link = share_link(Platform::Twitter, "Twitter: Launch").unwrap();
    assert!(link.starts_with("https://twitter.com/intent/tweet?text="));
    assert!(share_link(Platform::Instagram, "x").is_none());
}

#[tokio::test]
async fn outbox_share_writes_text_and_image() {
    let h = drafted(ImageDouble::new()).await;
    let results = h.orchestrator.snapshot().results.unwrap();
    let outbox = TempDir::new().unwrap();
    let target = DirectoryShare::new(outbox.path().join("outbox"));
    let clipboard = MemoryClipboard::default();

    let outcome = share_card(
        &target,
        &clipboard,
        Platform::Facebook,
        results.get(Platform::Facebook).unwrap(),
    )
    .unwrap();

    let ShareOutcome::Shared(paths) = outcome else {
        panic!("expected files to be written");
    };
    assert_eq!(paths.len(), 2);
    assert_eq!(fs::read_to_string(&paths[0]).unwrap(), "Facebook: Launch");
    assert!(paths[1].extension().is_some_and(|e| e == "png"));
    assert!(clipboard.copied.lock().is_empty());
}

#[tokio::test]
async fn only_stored_images_can_be_downloaded() {
    let images = ImageDouble::new();
    images.script(Platform::Twitter, Reply::Network);
    let h = drafted(images).await;
    let results = h.orchestrator.snapshot().results.unwrap();
    let dir = TempDir::new().unwrap();
    let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();

    let mut written = Vec::new();
    for (platform, card) in results.iter() {
        if let Some(image) = &card.image {
            written.push(download_image(dir.path(), platform, image, now).unwrap());
        }
    }

    assert_eq!(written.len(), 3);
    assert!(results.get(Platform::Twitter).unwrap().image.is_none());
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert!(names.contains(&"instagram-20260314-092653.png".to_string()));
    let bytes = fs::read(dir.path().join("instagram-20260314-092653.png")).unwrap();
    assert!(bytes.starts_with(b"instagram illustration#"));
}
