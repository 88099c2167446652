mod common;

use common::{
    comment_on, context_with_recorder, drain, moment, seed_account, seed_follow,
};
use feed_core::db::now_epoch_ms;
use feed_core::notify::FanoutSettings;
use feed_core::{
    Account, ContentDraft, ContentKind, CoreConfig, CoreContext, DeliveryError, Notification,
    NotificationFanout, NotificationSink, SqliteOutboxSink,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn replying_notifies_the_replied_to_author_once() {
    let (ctx, sink) = context_with_recorder();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let bob = seed_account(conn, "bob");
    let cid = seed_account(conn, "cid");
    let content = ctx.content();

    let post = content.create(ana, "moments", moment("topic")).unwrap();
    let first = content
        .create(bob, "comments", comment_on(ContentKind::Moment, post.id, "agree"))
        .unwrap();
    let reply = content
        .create(
            cid,
            "comments",
            ContentDraft {
                reply_to: Some(first.id),
                ..comment_on(ContentKind::Moment, post.id, "disagree")
            },
        )
        .unwrap();
    drain(&ctx);

    assert_eq!(sink.sent_to(ana).len(), 1);
    let to_bob = sink.sent_to(bob);
    assert_eq!(to_bob.len(), 1);
    assert_eq!(to_bob[0].title, "CID replied to you");
    let link = to_bob[0].link.clone().unwrap();
    assert_eq!(link.label, "Related post");
    assert_eq!(link.url, format!("https://feed.example/comments/{}", reply.alias));
    assert!(sink.sent_to(cid).is_empty());
    assert_eq!(ctx.fanout().stats().delivered, 2);
}

#[test]
fn replying_to_yourself_sends_nothing() {
    let (ctx, sink) = context_with_recorder();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let content = ctx.content();

    let post = content.create(ana, "moments", moment("topic")).unwrap();
    content
        .create(ana, "comments", comment_on(ContentKind::Moment, post.id, "bump"))
        .unwrap();
    drain(&ctx);

    assert!(sink.sent().is_empty());
    assert_eq!(ctx.fanout().stats().submitted, 0);
}

#[test]
fn followers_hear_about_published_posts_only() {
    let (ctx, sink) = context_with_recorder();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let bob = seed_account(conn, "bob");
    let cid = seed_account(conn, "cid");
    seed_follow(conn, bob, ana);
    seed_follow(conn, cid, ana);
    seed_follow(conn, ana, ana);
    let content = ctx.content();

    content
        .create(
            ana,
            "moments",
            ContentDraft {
                draft: true,
                ..moment("not yet")
            },
        )
        .unwrap();
    drain(&ctx);
    assert!(sink.sent().is_empty());

    let post = content.create(ana, "moments", moment("now")).unwrap();
    drain(&ctx);

    let sent = sink.sent();
    assert_eq!(sent.len(), 2);
    for follower in [bob, cid] {
        let received = sink.sent_to(follower);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].title, "ANA just posted");
        assert_eq!(
            received[0].link.as_ref().map(|link| link.url.as_str()),
            Some(format!("https://feed.example/moments/{}", post.alias).as_str())
        );
    }
    assert!(sink.sent_to(ana).is_empty());
}

#[test]
fn scheduled_posts_are_not_announced_early() {
    let (ctx, sink) = context_with_recorder();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let bob = seed_account(conn, "bob");
    seed_follow(conn, bob, ana);

    let scheduled = ctx
        .content()
        .create(
            ana,
            "moments",
            ContentDraft {
                published_at: Some(now_epoch_ms() + 3_600_000),
                ..moment("tomorrow")
            },
        )
        .unwrap();
    drain(&ctx);

    assert!(!scheduled.is_draft());
    assert!(sink.sent().is_empty());
    assert_eq!(ctx.fanout().stats().submitted, 0);
}

#[test]
fn outbox_sink_persists_notifications() {
    let outbox = Arc::new(SqliteOutboxSink::open_in_memory().unwrap());
    let config = CoreConfig {
        public_base_url: Some("https://feed.example/".to_string()),
        ..CoreConfig::default()
    };
    let ctx = CoreContext::open_in_memory(config, outbox.clone()).unwrap();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let bob = seed_account(conn, "bob");
    seed_follow(conn, bob, ana);

    let post = ctx.content().create(ana, "moments", moment("hi")).unwrap();
    drain(&ctx);

    let entries = outbox.entries_for(bob).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "ANA just posted");
    assert_eq!(
        entries[0].link.as_ref().map(|link| link.url.clone()),
        Some(format!("https://feed.example/moments/{}", post.alias))
    );
    assert!(outbox.entries_for(ana).unwrap().is_empty());
    ctx.shutdown(Duration::from_secs(1));
}

struct SlowSink {
    delay: Duration,
}

impl NotificationSink for SlowSink {
    fn send(&self, _notification: &Notification) -> Result<(), DeliveryError> {
        thread::sleep(self.delay);
        Ok(())
    }
}

fn notification(recipient_id: i64) -> Notification {
    Notification {
        recipient: Account {
            id: recipient_id,
            name: format!("user{recipient_id}"),
            nick: String::new(),
            avatar: None,
            description: String::new(),
        },
        title: "title".to_string(),
        body: "body".to_string(),
        link: None,
    }
}

#[test]
fn full_pool_drops_instead_of_queueing() {
    let fanout = NotificationFanout::new(
        FanoutSettings {
            workers: 1,
            capacity: 1,
            job_deadline: Duration::from_secs(5),
        },
        Arc::new(SlowSink {
            delay: Duration::from_millis(300),
        }),
    )
    .unwrap();

    assert!(fanout.dispatch(notification(1)));
    assert!(!fanout.dispatch(notification(2)));
    assert!(fanout.drain(Duration::from_secs(5)));

    let stats = fanout.stats();
    assert_eq!(stats.submitted, 2);
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.delivered, 1);
    fanout.shutdown(Duration::from_secs(1));
}

#[test]
fn slow_jobs_hit_the_deadline() {
    let fanout = NotificationFanout::new(
        FanoutSettings {
            workers: 1,
            capacity: 4,
            job_deadline: Duration::from_millis(50),
        },
        Arc::new(SlowSink {
            delay: Duration::from_millis(500),
        }),
    )
    .unwrap();

    assert!(fanout.dispatch(notification(1)));
    assert!(fanout.drain(Duration::from_secs(5)));

    let stats = fanout.stats();
    assert_eq!(stats.timed_out, 1);
    assert_eq!(stats.delivered, 0);
    fanout.shutdown(Duration::from_secs(1));
}
