mod common;

use common::{
    article, comment_on, context, context_with_recorder, drain, moment, seed_account,
    seed_category, seed_realm, set_created_at,
};
use feed_core::{
    Attitude, ContentDraft, ContentKind, FeedScope, PageRequest, ServiceError, SortDirection,
};

#[test]
fn like_unlike_and_comment_flow() {
    let (ctx, sink) = context_with_recorder();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let bob = seed_account(conn, "bob");
    let cid = seed_account(conn, "cid");

    let post = ctx.content().create(ana, "moments", moment("first!")).unwrap();
    let reactions = ctx.reactions();
    reactions
        .toggle_reaction(bob, "moments", post.id, "like", Attitude::Positive)
        .unwrap();
    assert_eq!(reactions.count_reactions("moments", post.id).unwrap(), 1);
    reactions
        .toggle_reaction(bob, "moments", post.id, "like", Attitude::Positive)
        .unwrap();
    assert_eq!(reactions.count_reactions("moments", post.id).unwrap(), 0);

    ctx.content()
        .create(cid, "comments", comment_on(ContentKind::Moment, post.id, "nice"))
        .unwrap();
    assert_eq!(ctx.feed().count_comments("moments", post.id).unwrap(), 1);

    drain(&ctx);
    let delivered = sink.sent_to(ana);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].title, "CID replied to you");
    assert_eq!(sink.sent().len(), 1);
}

#[test]
fn feed_merges_articles_and_moments_in_time_order() {
    let ctx = context();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let content = ctx.content();

    let older = content
        .create(
            ana,
            "articles",
            ContentDraft {
                description: Some("summary".to_string()),
                ..article("Long read", "long body")
            },
        )
        .unwrap();
    let newer = content.create(ana, "moments", moment("short body")).unwrap();
    let comment = content
        .create(ana, "comments", comment_on(ContentKind::Moment, newer.id, "c"))
        .unwrap();
    set_created_at(conn, "articles", older.id, 1_000);
    set_created_at(conn, "moments", newer.id, 2_000);
    set_created_at(conn, "comments", comment.id, 3_000);

    let page = ctx
        .feed()
        .list_feed(&FeedScope::default(), PageRequest::default())
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.applied_limit, 10);
    assert_eq!(page.items.len(), 2);

    let first = &page.items[0];
    assert_eq!(first.model_type, ContentKind::Moment);
    assert_eq!(first.id, newer.id);
    assert_eq!(first.title, None);
    assert_eq!(first.content.as_deref(), Some("short body"));
    assert_eq!(first.comment_count, 1);
    assert_eq!(first.author.name, "ana");
    assert_eq!(first.author.nick, "ANA");

    let second = &page.items[1];
    assert_eq!(second.model_type, ContentKind::Article);
    assert_eq!(second.title.as_deref(), Some("Long read"));
    assert_eq!(second.description.as_deref(), Some("summary"));
    assert_eq!(second.content, None);

    let ascending = ctx
        .feed()
        .list_feed(
            &FeedScope {
                direction: SortDirection::Asc,
                ..FeedScope::default()
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(ascending.items[0].model_type, ContentKind::Article);
}

#[test]
fn equal_timestamps_keep_a_stable_order() {
    let ctx = context();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let content = ctx.content();
    let post = content.create(ana, "articles", article("A", "a")).unwrap();
    let short = content.create(ana, "moments", moment("m")).unwrap();
    set_created_at(conn, "articles", post.id, 5_000);
    set_created_at(conn, "moments", short.id, 5_000);

    let scope = FeedScope::default();
    let first = ctx.feed().list_feed(&scope, PageRequest::default()).unwrap();
    let second = ctx.feed().list_feed(&scope, PageRequest::default()).unwrap();
    let kinds = |page: &feed_core::FeedPage| -> Vec<ContentKind> {
        page.items.iter().map(|item| item.model_type).collect()
    };
    assert_eq!(kinds(&first), kinds(&second));
    assert_eq!(kinds(&first), vec![ContentKind::Moment, ContentKind::Article]);
}

#[test]
fn page_size_is_clamped_and_total_ignores_pagination() {
    let ctx = context();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let content = ctx.content();
    for index in 0..15 {
        content
            .create(ana, "moments", moment(&format!("m{index}")))
            .unwrap();
        content
            .create(ana, "articles", article(&format!("a{index}"), "body"))
            .unwrap();
    }

    let feed = ctx.feed();
    let scope = FeedScope::default();
    let wide = feed.list_feed(&scope, PageRequest::new(Some(50), 0)).unwrap();
    assert_eq!(wide.applied_limit, 20);
    assert_eq!(wide.items.len(), 20);
    assert_eq!(wide.total, 30);

    let tail = feed.list_feed(&scope, PageRequest::new(Some(20), 20)).unwrap();
    assert_eq!(tail.items.len(), 10);

    let beyond = feed.list_feed(&scope, PageRequest::new(Some(20), 100)).unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 30);
}

#[test]
fn unknown_author_or_realm_yields_an_empty_page() {
    let ctx = context();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    ctx.content().create(ana, "moments", moment("hi")).unwrap();

    let feed = ctx.feed();
    let unknown_author = feed
        .list_feed(
            &FeedScope {
                author: Some("nobody".to_string()),
                ..FeedScope::default()
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(unknown_author.total, 0);
    assert!(unknown_author.items.is_empty());

    let unknown_realm = feed
        .list_feed(
            &FeedScope {
                realm_id: Some(999),
                ..FeedScope::default()
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(unknown_realm.total, 0);

    let by_author = feed
        .list_feed(
            &FeedScope {
                author: Some("ana".to_string()),
                ..FeedScope::default()
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(by_author.total, 1);
}

#[test]
fn scope_filters_apply_to_every_branch() {
    let ctx = context();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    seed_category(conn, "rust");
    let realm = seed_realm(conn, "lounge", true);
    let content = ctx.content();

    content
        .create(
            ana,
            "articles",
            ContentDraft {
                categories: vec!["rust".to_string()],
                ..article("Tagged", "body")
            },
        )
        .unwrap();
    content
        .create(
            ana,
            "moments",
            ContentDraft {
                categories: vec!["rust".to_string()],
                tags: vec!["tokio".to_string()],
                ..moment("tagged")
            },
        )
        .unwrap();
    content.create(ana, "moments", moment("plain")).unwrap();
    content
        .create(
            ana,
            "moments",
            ContentDraft {
                realm_id: Some(realm),
                categories: vec!["rust".to_string()],
                ..moment("in realm")
            },
        )
        .unwrap();

    let feed = ctx.feed();
    let by_category = feed
        .list_feed(
            &FeedScope {
                category: Some("rust".to_string()),
                ..FeedScope::default()
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(by_category.total, 2);

    let by_tag = feed
        .list_feed(
            &FeedScope {
                tag: Some("Tokio".to_string()),
                ..FeedScope::default()
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(by_tag.total, 1);
    assert_eq!(by_tag.items[0].model_type, ContentKind::Moment);

    let in_realm = feed
        .list_feed(
            &FeedScope {
                realm_id: Some(realm),
                ..FeedScope::default()
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(in_realm.total, 1);
    assert_eq!(in_realm.items[0].realm_id, Some(realm));
}

#[test]
fn reaction_hydration_can_be_skipped() {
    let ctx = context();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let bob = seed_account(conn, "bob");
    let post = ctx.content().create(ana, "moments", moment("hi")).unwrap();
    ctx.reactions()
        .toggle_reaction(bob, "moments", post.id, "like", Attitude::Positive)
        .unwrap();

    let feed = ctx.feed();
    let hydrated = feed
        .list_feed(&FeedScope::default(), PageRequest::default())
        .unwrap();
    assert_eq!(hydrated.items[0].reaction_count, 1);
    assert_eq!(hydrated.items[0].reaction_list.get("like"), Some(&1));

    let bare = feed
        .list_feed(
            &FeedScope {
                include_reactions: false,
                ..FeedScope::default()
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(bare.items[0].reaction_count, 0);
    assert!(bare.items[0].reaction_list.is_empty());
}

#[test]
fn items_with_missing_authors_are_skipped() {
    let ctx = context();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let gone = seed_account(conn, "gone");
    ctx.content().create(ana, "moments", moment("stays")).unwrap();
    ctx.content().create(gone, "moments", moment("orphan")).unwrap();
    conn.execute("DELETE FROM accounts WHERE id = ?1;", [gone])
        .unwrap();

    let page = ctx
        .feed()
        .list_feed(&FeedScope::default(), PageRequest::default())
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].author.id, ana);
}

#[test]
fn unpublished_comments_are_not_counted_or_listed() {
    let ctx = context();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let content = ctx.content();
    let post = content.create(ana, "articles", article("T", "b")).unwrap();
    let other = content.create(ana, "articles", article("O", "b")).unwrap();

    let visible = content
        .create(ana, "comments", comment_on(ContentKind::Article, post.id, "yes"))
        .unwrap();
    content
        .create(
            ana,
            "comments",
            ContentDraft {
                draft: true,
                ..comment_on(ContentKind::Article, post.id, "draft")
            },
        )
        .unwrap();
    content
        .create(ana, "comments", comment_on(ContentKind::Article, other.id, "no"))
        .unwrap();

    let feed = ctx.feed();
    assert_eq!(feed.count_comments("articles", post.id).unwrap(), 1);

    let comments = feed
        .list_comments("articles", post.id, PageRequest::default())
        .unwrap();
    assert_eq!(comments.total, 1);
    assert_eq!(comments.items.len(), 1);
    assert_eq!(comments.items[0].id, visible.id);
    assert_eq!(comments.items[0].model_type, ContentKind::Comment);

    assert!(matches!(
        feed.list_comments("articles", other.id + 10, PageRequest::default()),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn metrics_count_published_reposts() {
    let ctx = context();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let bob = seed_account(conn, "bob");
    let content = ctx.content();
    let original = content.create(ana, "moments", moment("original")).unwrap();
    content
        .create(
            bob,
            "moments",
            ContentDraft {
                repost_to: Some(original.id),
                ..moment("repost")
            },
        )
        .unwrap();
    content
        .create(
            bob,
            "moments",
            ContentDraft {
                repost_to: Some(original.id),
                draft: true,
                ..moment("draft repost")
            },
        )
        .unwrap();

    let metrics = ctx.feed().content_metrics("moments", original.id).unwrap();
    assert_eq!(metrics.repost_count, 1);
    assert_eq!(metrics.reply_count, 0);
    assert_eq!(metrics.reaction_count, 0);

    assert!(matches!(
        ctx.feed().content_metrics("moments", original.id + 100),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn get_content_item_hides_drafts() {
    let ctx = context();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let content = ctx.content();
    content
        .create(
            ana,
            "moments",
            ContentDraft {
                alias: Some("live".to_string()),
                ..moment("live")
            },
        )
        .unwrap();
    content
        .create(
            ana,
            "moments",
            ContentDraft {
                alias: Some("hidden".to_string()),
                draft: true,
                ..moment("hidden")
            },
        )
        .unwrap();

    let feed = ctx.feed();
    assert_eq!(feed.get_content_item("moments", "live").unwrap().content, "live");
    assert!(matches!(
        feed.get_content_item("moments", "hidden"),
        Err(ServiceError::NotFound { .. })
    ));
    assert!(matches!(
        feed.get_content_item("polls", "live"),
        Err(ServiceError::InvalidContentType(_))
    ));
}
