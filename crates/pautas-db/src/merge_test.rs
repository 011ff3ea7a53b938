use std::sync::Arc;

use pautas_core::{CampaignInfo, Comment, ExtractionStatus, Placeholder};

use super::*;

const IG: &str = "https://www.instagram.com/p/ABC123xyz/";
const TT: &str = "https://www.tiktok.com/@brand/video/7300000000000000000";

fn comment(url: &str, platform: Platform, text: &str, time: Option<&str>) -> DatasetRow {
    DatasetRow::Comment(Comment {
        platform,
        post_url: url.to_owned(),
        post_url_original: url.to_owned(),
        post_number: 0,
        author_name: Some("someone".to_owned()),
        author_url: None,
        text: text.to_owned(),
        created_time: time.map(str::to_owned),
        likes_count: 1,
        replies_count: 0,
        is_reply: false,
        parent_comment_id: None,
        raw_source: None,
        campaign: Arc::new(CampaignInfo::default()),
    })
}

fn ig(text: &str, time: &str) -> DatasetRow {
    comment(IG, Platform::Instagram, text, Some(time))
}

fn placeholder(url: &str, platform: Platform, status: ExtractionStatus) -> DatasetRow {
    DatasetRow::Placeholder(Placeholder {
        platform,
        post_url: url.to_owned(),
        post_url_original: url.to_owned(),
        post_number: 0,
        status,
        campaign: Arc::new(CampaignInfo::default()),
    })
}

fn texts(dataset: &Dataset) -> Vec<String> {
    dataset
        .rows
        .iter()
        .map(|r| match r {
            DatasetRow::Comment(c) => c.text.clone(),
            DatasetRow::Placeholder(p) => p.status.to_string(),
        })
        .collect()
}

#[test]
fn basic_merge_into_empty_store() {
    let mut registry = PostRegistry::default();
    let batch = vec![ig("uno", "1000"), ig("dos", "2000"), ig("tres", "3000")];

    let outcome = merge(Dataset::default(), batch, &mut registry);

    assert_eq!(outcome.added, 3);
    assert_eq!(outcome.dataset.comment_count(), 3);
    assert_eq!(outcome.dataset.placeholder_count(), 0);
    assert_eq!(outcome.dataset.posts.len(), 1);
    assert_eq!(outcome.dataset.posts[0].post_number, 1);
    assert!(outcome.dataset.rows.iter().all(|r| r.post_number() == 1));
    // Newest first within a post.
    assert_eq!(texts(&outcome.dataset), ["tres", "dos", "uno"]);
}

#[test]
fn duplicate_across_runs_is_merged_once() {
    let mut registry = PostRegistry::default();
    let run1 = merge(
        Dataset::default(),
        vec![ig("great product", "1000")],
        &mut registry,
    );

    let mut registry = PostRegistry::from_dataset(&run1.dataset);
    let run2 = merge(
        run1.dataset,
        vec![ig("great product", "1000"), ig("D", "2000")],
        &mut registry,
    );

    assert_eq!(run2.added, 1);
    assert_eq!(run2.duplicates, 1);
    assert_eq!(texts(&run2.dataset), ["D", "great product"]);
}

#[test]
fn author_changes_do_not_create_duplicates() {
    let mut registry = PostRegistry::default();
    let first = merge(Dataset::default(), vec![ig("same", "1000")], &mut registry);

    let mut again = ig("same", "1000");
    if let DatasetRow::Comment(c) = &mut again {
        c.author_name = Some("renamed".to_owned());
        c.raw_source = Some("{}".to_owned());
    }
    let second = merge(first.dataset, vec![again], &mut registry);
    assert_eq!(second.added, 0);
    assert_eq!(second.dataset.rows.len(), 1);
}

#[test]
fn merging_the_same_batch_twice_is_idempotent() {
    let batch = vec![
        ig("uno", "1000"),
        ig("uno", "1000"),
        comment(TT, Platform::TikTok, "sin fecha", None),
        placeholder(
            "https://www.facebook.com/brand/posts/pfbid02abcdef",
            Platform::Facebook,
            ExtractionStatus::Failed,
        ),
    ];

    let mut registry = PostRegistry::default();
    let once = merge(Dataset::default(), batch.clone(), &mut registry);
    assert_eq!(once.duplicates, 1, "in-batch repeat is dropped");

    let twice = merge(once.dataset.clone(), batch, &mut registry);
    assert_eq!(twice.dataset, once.dataset);
    assert_eq!(twice.added, 0);
}

#[test]
fn real_comment_retires_placeholder() {
    let mut registry = PostRegistry::default();
    let stored = merge(
        Dataset::default(),
        vec![placeholder(IG, Platform::Instagram, ExtractionStatus::NoComments)],
        &mut registry,
    );
    assert_eq!(stored.dataset.placeholder_count(), 1);

    let outcome = merge(stored.dataset, vec![ig("first!", "5000")], &mut registry);

    assert_eq!(outcome.retired, 1);
    assert_eq!(outcome.dataset.rows.len(), 1);
    assert_eq!(outcome.dataset.placeholder_count(), 0);
    assert_eq!(texts(&outcome.dataset), ["first!"]);
}

#[test]
fn real_comment_retires_failed_placeholder() {
    let mut registry = PostRegistry::default();
    let stored = merge(
        Dataset::default(),
        vec![
            ig("hola", "1000"),
            placeholder(TT, Platform::TikTok, ExtractionStatus::Failed),
        ],
        &mut registry,
    );
    assert_eq!(stored.dataset.placeholder_count(), 1);

    let outcome = merge(
        stored.dataset,
        vec![comment(TT, Platform::TikTok, "por fin", Some("2000"))],
        &mut registry,
    );

    assert_eq!(outcome.retired, 1);
    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.dataset.placeholder_count(), 0);
    assert_eq!(texts(&outcome.dataset), ["hola", "por fin"]);
}

#[test]
fn placeholder_is_skipped_when_post_has_comments() {
    let mut registry = PostRegistry::default();
    let stored = merge(Dataset::default(), vec![ig("hola", "1000")], &mut registry);

    let outcome = merge(
        stored.dataset,
        vec![placeholder(IG, Platform::Instagram, ExtractionStatus::Failed)],
        &mut registry,
    );
    assert_eq!(outcome.added, 0);
    assert_eq!(outcome.duplicates, 1);
    assert_eq!(outcome.dataset.placeholder_count(), 0);
}

#[test]
fn newer_placeholder_replaces_older_one() {
    let mut registry = PostRegistry::default();
    let stored = merge(
        Dataset::default(),
        vec![placeholder(TT, Platform::TikTok, ExtractionStatus::NoComments)],
        &mut registry,
    );

    let outcome = merge(
        stored.dataset,
        vec![placeholder(TT, Platform::TikTok, ExtractionStatus::Failed)],
        &mut registry,
    );
    assert_eq!(outcome.retired, 1);
    assert_eq!(outcome.dataset.placeholder_count(), 1);
    assert_eq!(texts(&outcome.dataset), ["FAILED"]);
}

#[test]
fn post_numbers_are_stable_across_runs() {
    let mut registry = PostRegistry::default();
    registry.register(IG, IG, Platform::Instagram);
    registry.register(TT, TT, Platform::TikTok);
    let fb = "https://www.facebook.com/brand/posts/pfbid02abcdef";
    registry.register(fb, fb, Platform::Facebook);
    let run1 = merge(
        Dataset::default(),
        vec![comment(fb, Platform::Facebook, "fb", Some("10"))],
        &mut registry,
    );
    assert_eq!(run1.dataset.rows[0].post_number(), 3);

    // The next run lists the Facebook post first and drops the others.
    let mut registry = PostRegistry::from_dataset(&run1.dataset);
    let again = registry.register(fb, fb, Platform::Facebook);
    assert_eq!(again.post_number, 3);
    let run2 = merge(
        run1.dataset,
        vec![comment(fb, Platform::Facebook, "fb 2", Some("20"))],
        &mut registry,
    );
    assert!(run2.dataset.rows.iter().all(|r| r.post_number() == 3));

    let new_post = registry.register(
        "https://www.instagram.com/reel/NEW123456/",
        "https://www.instagram.com/reel/NEW123456/",
        Platform::Instagram,
    );
    assert_eq!(new_post.post_number, 4);
    assert_eq!(run2.dataset.posts.len(), 3);
}

#[test]
fn batch_rows_are_stamped_with_registry_numbers() {
    let mut registry = PostRegistry::default();
    registry.register(TT, TT, Platform::TikTok);
    registry.register(IG, IG, Platform::Instagram);

    let outcome = merge(Dataset::default(), vec![ig("x", "1")], &mut registry);
    assert_eq!(outcome.dataset.rows[0].post_number(), 2);
}

#[test]
fn rows_sort_by_post_then_newest_with_untimed_last() {
    let mut registry = PostRegistry::default();
    registry.register(TT, TT, Platform::TikTok);
    let batch = vec![
        ig("old", "2024-01-01T00:00:00Z"),
        comment(TT, Platform::TikTok, "tt untimed", None),
        ig("untimed", "not a date"),
        comment(TT, Platform::TikTok, "tt", Some("1700000000")),
        ig("new", "2024-06-01 12:00:00"),
    ];
    let outcome = merge(Dataset::default(), batch, &mut registry);
    assert_eq!(
        texts(&outcome.dataset),
        ["tt", "tt untimed", "new", "old", "untimed"]
    );
}

#[test]
fn registry_recovers_posts_from_legacy_rows() {
    let mut row = ig("legacy", "1000");
    if let DatasetRow::Comment(c) = &mut row {
        c.post_number = 7;
    }
    let dataset = Dataset {
        posts: Vec::new(),
        rows: vec![row],
    };
    let mut registry = PostRegistry::from_dataset(&dataset);
    assert_eq!(registry.get(IG).map(|p| p.post_number), Some(7));
    assert_eq!(registry.register(TT, TT, Platform::TikTok).post_number, 8);
}
