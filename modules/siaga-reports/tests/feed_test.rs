//! Submission, cursor feeds, archive, and history round trips.

mod harness;

use chrono::{Duration, NaiveDate};
use harness::{at, draft, world};
use siaga_common::{GeoPoint, MediaKind, SiagaError, GEOHASH_PRECISION};
use uuid::Uuid;

#[tokio::test]
async fn submit_persists_geohash_and_history() {
    let w = world();
    let new = draft(-6.2, 106.8166, at(2024, 5, 14));
    let author = new.author_id;

    let report = w.writer.submit(new).await.unwrap();
    assert_eq!(report.geohash.len(), GEOHASH_PRECISION);
    assert_eq!(report.vote_tally, 0);
    assert!(report.voter_record.is_empty());

    let history = w.reader.report_history(author).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, report.id);

    let detail = w.reader.report_detail(report.id).await.unwrap().unwrap();
    assert_eq!(detail.description, report.description);
    assert!(w.reader.report_detail(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn submit_validation() {
    let w = world();

    let mut blank_description = draft(-6.2, 106.8, at(2024, 5, 14));
    blank_description.description = "   ".to_string();
    assert!(matches!(
        w.writer.submit(blank_description).await,
        Err(SiagaError::InvalidInput(_))
    ));

    let mut no_media = draft(-6.2, 106.8, at(2024, 5, 14));
    no_media.media_ref = String::new();
    assert!(matches!(
        w.writer.submit(no_media).await,
        Err(SiagaError::InvalidInput(_))
    ));

    let mut bad_point = draft(-6.2, 106.8, at(2024, 5, 14));
    bad_point.point = GeoPoint::new(-6.2, 200.0);
    assert!(matches!(
        w.writer.submit(bad_point).await,
        Err(SiagaError::InvalidInput(_))
    ));

    let mut nil_author = draft(-6.2, 106.8, at(2024, 5, 14));
    nil_author.author_id = Uuid::nil();
    assert!(matches!(
        w.writer.submit(nil_author).await,
        Err(SiagaError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn video_reports_keep_their_thumbnail() {
    let w = world();
    let mut new = draft(-6.2, 106.8, at(2024, 5, 14));
    new.media_kind = MediaKind::Video;
    new.media_ref = "reports/videos/report-002.mp4".to_string();
    new.thumbnail_ref = Some("reports/thumbnails/report-002.jpg".to_string());

    let report = w.writer.submit(new).await.unwrap();
    assert_eq!(report.media_kind, MediaKind::Video);
    assert_eq!(
        report.thumbnail_ref.as_deref(),
        Some("reports/thumbnails/report-002.jpg")
    );
}

#[tokio::test]
async fn latest_feed_pages_newest_first() {
    let w = world();
    let base = at(2024, 5, 14);
    for i in 0..13 {
        w.writer
            .submit(draft(-6.2, 106.8, base - Duration::hours(i)))
            .await
            .unwrap();
    }

    let first = w.reader.latest(None, None).await.unwrap();
    assert_eq!(first.reports.len(), 10);
    for pair in first.reports.windows(2) {
        assert!(pair[0].occurred_at >= pair[1].occurred_at);
    }

    let second = w.reader.latest(None, first.next_cursor).await.unwrap();
    assert_eq!(second.reports.len(), 3);
    assert!(second.next_cursor.is_none());
    assert!(second.reports[0].occurred_at < first.reports[9].occurred_at);
}

#[tokio::test]
async fn latest_feed_respects_date_filter() {
    let w = world();
    w.writer.submit(draft(-6.2, 106.8, at(2024, 5, 13))).await.unwrap();
    let on_day = w.writer.submit(draft(-6.2, 106.8, at(2024, 5, 14))).await.unwrap();
    w.writer.submit(draft(-6.2, 106.8, at(2024, 5, 15))).await.unwrap();

    let day = NaiveDate::from_ymd_opt(2024, 5, 14).unwrap();
    let page = w.reader.latest(Some(day), None).await.unwrap();
    assert_eq!(page.reports.len(), 1);
    assert_eq!(page.reports[0].id, on_day.id);
}

#[tokio::test]
async fn popular_feed_orders_by_tally() {
    let w = world();
    let quiet = w.writer.submit(draft(-6.2, 106.8, at(2024, 5, 14))).await.unwrap();
    let busy = w.writer.submit(draft(-6.2, 106.8, at(2024, 5, 13))).await.unwrap();

    for _ in 0..3 {
        w.votes
            .cast_vote(busy.id, Uuid::new_v4(), siaga_common::VoteValue::Up)
            .await
            .unwrap();
    }

    let page = w.reader.popular(None).await.unwrap();
    assert_eq!(page.reports[0].id, busy.id);
    assert_eq!(page.reports[0].vote_tally, 3);
    assert_eq!(page.reports[1].id, quiet.id);
}

#[tokio::test]
async fn archive_round_trip() {
    let w = world();
    let report = w.writer.submit(draft(-6.2, 106.8, at(2024, 5, 14))).await.unwrap();
    let user = Uuid::new_v4();

    w.writer.set_archived(report.id, user, true).await.unwrap();
    let archived = w.reader.archived_reports(user).await.unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].id, report.id);

    w.writer.set_archived(report.id, user, false).await.unwrap();
    let archived = w.reader.archived_reports(user).await.unwrap();
    assert!(archived.is_empty());
}

#[tokio::test]
async fn archive_listing_for_unknown_user_is_not_found() {
    let w = world();
    let err = w.reader.archived_reports(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, SiagaError::NotFound(_)));
}
