mod common;

use common::{
    article, comment_on, context, moment, seed_account, seed_category, seed_realm, set_created_at,
};
use feed_core::db::now_epoch_ms;
use feed_core::{resolve, ContentDraft, ContentKind, ContentRef, FilterPipeline, RepoError, SortDirection};

#[test]
fn published_before_hides_drafts_and_scheduled_items_from_list_and_count() {
    let ctx = context();
    let author = seed_account(ctx.connection(), "ana");
    let content = ctx.content();

    let visible = content.create(author, "moments", moment("now")).unwrap();
    content
        .create(
            author,
            "moments",
            ContentDraft {
                draft: true,
                ..moment("draft")
            },
        )
        .unwrap();
    content
        .create(
            author,
            "moments",
            ContentDraft {
                published_at: Some(now_epoch_ms() + 3_600_000),
                ..moment("later")
            },
        )
        .unwrap();

    let all = FilterPipeline::new(ctx.connection(), resolve("moments").unwrap());
    assert_eq!(all.count().unwrap(), 3);

    let published = all.filter_published_before(now_epoch_ms());
    assert_eq!(published.count().unwrap(), 1);
    let ids: Vec<_> = published
        .list(None, 0)
        .unwrap()
        .into_iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(ids, vec![visible.id]);
}

#[test]
fn list_clamps_take_and_keeps_count_stable_past_the_end() {
    let ctx = context();
    let author = seed_account(ctx.connection(), "ana");
    let content = ctx.content();
    for index in 0..25 {
        content
            .create(author, "moments", moment(&format!("moment {index}")))
            .unwrap();
    }

    let pipeline = FilterPipeline::new(ctx.connection(), resolve("moments").unwrap())
        .filter_published_before(now_epoch_ms());
    assert_eq!(pipeline.list(Some(100), 0).unwrap().len(), 20);
    assert_eq!(pipeline.list(None, 0).unwrap().len(), 10);
    assert_eq!(pipeline.list(Some(0), 0).unwrap().len(), 10);
    assert_eq!(pipeline.list(Some(20), 20).unwrap().len(), 5);
    assert!(pipeline.list(Some(5), 30).unwrap().is_empty());
    assert_eq!(pipeline.count().unwrap(), 25);
}

#[test]
fn sorting_follows_created_at_with_id_tie_break() {
    let ctx = context();
    let conn = ctx.connection();
    let author = seed_account(conn, "ana");
    let content = ctx.content();

    let first = content.create(author, "moments", moment("first")).unwrap();
    let second = content.create(author, "moments", moment("second")).unwrap();
    let third = content.create(author, "moments", moment("third")).unwrap();
    set_created_at(conn, "moments", first.id, 3_000);
    set_created_at(conn, "moments", second.id, 1_000);
    set_created_at(conn, "moments", third.id, 1_000);

    let pipeline = FilterPipeline::new(conn, resolve("moments").unwrap());
    let newest_first: Vec<_> = pipeline
        .list(None, 0)
        .unwrap()
        .into_iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(newest_first, vec![first.id, third.id, second.id]);

    let oldest_first: Vec<_> = pipeline
        .sort_by_created_at(SortDirection::Asc)
        .list(None, 0)
        .unwrap()
        .into_iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(oldest_first, vec![second.id, third.id, first.id]);
}

#[test]
fn scope_filters_compose_in_any_order() {
    let ctx = context();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let bob = seed_account(conn, "bob");
    seed_category(conn, "rust");
    let realm = seed_realm(conn, "lounge", true);
    let content = ctx.content();

    let tagged = content
        .create(
            ana,
            "moments",
            ContentDraft {
                categories: vec!["rust".to_string()],
                tags: vec!["Async".to_string()],
                ..moment("tagged")
            },
        )
        .unwrap();
    content.create(bob, "moments", moment("plain")).unwrap();
    let in_realm = content
        .create(
            bob,
            "moments",
            ContentDraft {
                realm_id: Some(realm),
                ..moment("realm")
            },
        )
        .unwrap();

    let base = FilterPipeline::new(conn, resolve("moments").unwrap());
    let global = base.filter_realm(None);
    assert_eq!(global.count().unwrap(), 2);
    assert_eq!(base.filter_realm(Some(0)).count().unwrap(), 2);
    assert_eq!(
        base.filter_realm(Some(realm)).list(None, 0).unwrap()[0].id,
        in_realm.id
    );

    let by_category = global.filter_has_category(Some("rust"));
    let by_tag_first = base.filter_has_tag(Some(" ASYNC ")).filter_realm(None);
    assert_eq!(by_category.count().unwrap(), 1);
    assert_eq!(by_tag_first.count().unwrap(), 1);
    assert_eq!(by_tag_first.list(None, 0).unwrap()[0].id, tagged.id);
    assert_eq!(
        global.filter_author(bob).filter_has_category(None).count().unwrap(),
        1
    );
    assert_eq!(global.filter_author(ana).count().unwrap(), 1);
    assert_eq!(base.filter_has_tag(Some("missing")).count().unwrap(), 0);
}

#[test]
fn belongs_to_and_exclude_replies_select_top_level_comments() {
    let ctx = context();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let content = ctx.content();

    let post = content.create(ana, "articles", article("Title", "body")).unwrap();
    let other = content.create(ana, "articles", article("Other", "body")).unwrap();
    let top = content
        .create(ana, "comments", comment_on(ContentKind::Article, post.id, "top"))
        .unwrap();
    content
        .create(
            ana,
            "comments",
            ContentDraft {
                reply_to: Some(top.id),
                ..comment_on(ContentKind::Article, post.id, "reply")
            },
        )
        .unwrap();
    content
        .create(ana, "comments", comment_on(ContentKind::Article, other.id, "elsewhere"))
        .unwrap();

    let comments = FilterPipeline::new(conn, resolve("comments").unwrap())
        .filter_belongs_to(ContentRef::new(ContentKind::Article, post.id));
    assert_eq!(comments.count().unwrap(), 2);

    let top_level = comments.filter_exclude_replies().list(None, 0).unwrap();
    assert_eq!(top_level.len(), 1);
    assert_eq!(top_level[0].id, top.id);
    assert_eq!(
        top_level[0].parent,
        Some(ContentRef::new(ContentKind::Article, post.id))
    );
}

#[test]
fn get_by_alias_loads_links_and_reports_misses() {
    let ctx = context();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    seed_category(conn, "news");
    let created = ctx
        .content()
        .create(
            ana,
            "articles",
            ContentDraft {
                alias: Some("hello-world".to_string()),
                categories: vec!["news".to_string()],
                tags: vec!["b".to_string(), "a".to_string()],
                attachments: vec!["att-2".to_string(), "att-1".to_string()],
                ..article("Hello", "world")
            },
        )
        .unwrap();

    let pipeline = FilterPipeline::new(conn, resolve("articles").unwrap());
    let found = pipeline.get_by_alias("hello-world").unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.title.as_deref(), Some("Hello"));
    assert_eq!(found.categories, vec!["news".to_string()]);
    assert_eq!(found.tags, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(found.attachments, vec!["att-2".to_string(), "att-1".to_string()]);

    assert!(matches!(
        pipeline.get_by_alias("missing"),
        Err(RepoError::NotFound(_))
    ));
    assert!(matches!(
        pipeline.filter_author(ana + 1).get_by_alias("hello-world"),
        Err(RepoError::NotFound(_))
    ));
}

#[test]
fn malformed_rows_are_skipped_by_list() {
    let ctx = context();
    let conn = ctx.connection();
    let ana = seed_account(conn, "ana");
    let content = ctx.content();
    let good = content.create(ana, "moments", moment("fine")).unwrap();
    let bad = content.create(ana, "moments", moment("broken")).unwrap();
    conn.execute(
        "UPDATE moments SET created_at = 'not-a-number' WHERE id = ?1;",
        [bad.id],
    )
    .unwrap();

    let items = FilterPipeline::new(conn, resolve("moments").unwrap())
        .list(None, 0)
        .unwrap();
    let ids: Vec<_> = items.into_iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![good.id]);
}
