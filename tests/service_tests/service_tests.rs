//! Tests for ProjectService
//!
//! These tests verify:
//! - Index lifecycle (ensure / drop / installed)
//! - Create before install fails with nothing written
//! - Sort, filter and pagination scenarios over the search shadow
//! - Update merge semantics and delete of absent ids
//! - Scope, timeout and store failure handling

#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use common::{ids, list_until, setup, setup_with, wait_for_documents, TENANT};
use dualstore::backend::BackendError;
use dualstore::{
    Config, Error, Identity, ListArgs, ListWhere, Project, ProjectInput, ProjectPatch,
    RequestContext, WriteLeg,
};

// =============================================================================
// Helper Functions
// =============================================================================

/// Install the index and create A, B, C in that order
async fn create_three(fixture: &common::Fixture) -> (Project, Project, Project) {
    let service = &fixture.service;
    let ctx = &fixture.ctx;
    service.ensure_index(ctx).await.unwrap();

    let a = service
        .create(ctx, ProjectInput::new("Project 1").is_nice(false))
        .await
        .unwrap();
    let b = service.create(ctx, ProjectInput::new("Project 2")).await.unwrap();
    let c = service
        .create(ctx, ProjectInput::new("Project 3").is_nice(true))
        .await
        .unwrap();

    list_until(service, ctx, ListArgs::default(), |p| p.total_count == 3).await;
    (a, b, c)
}

// =============================================================================
// Index Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_ensure_index_reports_creation() {
    let fixture = setup();
    let (service, ctx) = (&fixture.service, &fixture.ctx);

    assert!(!service.is_installed(ctx).await.unwrap());
    assert!(service.ensure_index(ctx).await.unwrap());
    assert!(!service.ensure_index(ctx).await.unwrap());
    assert!(service.is_installed(ctx).await.unwrap());
}

#[tokio::test]
async fn test_drop_index_reports_removal() {
    let fixture = setup();
    let (service, ctx) = (&fixture.service, &fixture.ctx);

    assert!(!service.drop_index(ctx).await.unwrap());
    service.ensure_index(ctx).await.unwrap();
    assert!(service.drop_index(ctx).await.unwrap());
    assert!(!service.is_installed(ctx).await.unwrap());
}

#[tokio::test]
async fn test_create_before_install_fails_without_partial_write() {
    let fixture = setup();
    let (service, ctx) = (&fixture.service, &fixture.ctx);

    let err = service
        .create(ctx, ProjectInput::new("Project 1"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INDEX_NOT_READY");

    // The id the failed create was given
    let err = service.get(ctx, "p000001").await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert_eq!(fixture.backend.item_count("projects"), 0);
    assert_eq!(fixture.backend.item_count("projects-search"), 0);
}

#[tokio::test]
async fn test_list_without_index_is_not_ready() {
    let fixture = setup();
    let err = fixture
        .service
        .list(&fixture.ctx, ListArgs::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INDEX_NOT_READY");
}

// =============================================================================
// Create / Get Tests
// =============================================================================

#[tokio::test]
async fn test_create_sets_system_fields() {
    let fixture = setup();
    let identity = Identity::new("u1", "Jo Doe", "admin");
    let ctx = RequestContext::new(TENANT).with_identity(identity.clone());
    fixture.service.ensure_index(&ctx).await.unwrap();

    let project = fixture
        .service
        .create(&ctx, ProjectInput::new("Project 1").description("first"))
        .await
        .unwrap();

    assert_eq!(project.id, "p000001");
    assert_eq!(project.created_on, project.saved_on);
    assert_eq!(project.created_by, Some(identity.clone()));
    assert_eq!(project.saved_by, Some(identity));
    assert_eq!(project.description.as_deref(), Some("first"));
    assert!(!project.is_nice);

    // Point reads see the write immediately
    assert_eq!(fixture.service.get(&ctx, &project.id).await.unwrap(), project);
}

#[tokio::test]
async fn test_get_absent_is_not_found() {
    let fixture = setup();
    let err = fixture.service.get(&fixture.ctx, "nope").await.unwrap_err();
    assert!(matches!(err, Error::NotFound { ref id, .. } if id == "nope"));
    assert_eq!(err.to_string(), "Project with id \"nope\" not found.");
}

// =============================================================================
// List Scenario Tests
// =============================================================================

#[tokio::test]
async fn test_list_sort_scenarios() {
    let fixture = setup();
    let (a, b, c) = create_three(&fixture).await;
    let (service, ctx) = (&fixture.service, &fixture.ctx);

    let page = service
        .list(ctx, ListArgs::default().sort(["createdOn_ASC"]))
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![a.id.clone(), b.id.clone(), c.id.clone()]);

    let page = service
        .list(ctx, ListArgs::default().sort(["title_DESC"]))
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![c.id.clone(), b.id.clone(), a.id.clone()]);

    // Default: most recent first
    let page = service.list(ctx, ListArgs::default()).await.unwrap();
    assert_eq!(ids(&page), vec![c.id, b.id, a.id]);
    assert!(!page.has_more);
    assert_eq!(page.cursor, None);
    assert_eq!(page.total_count, 3);
}

#[tokio::test]
async fn test_delete_then_list_and_paginate() {
    let fixture = setup();
    let (a, b, c) = create_three(&fixture).await;
    let (service, ctx) = (&fixture.service, &fixture.ctx);

    assert!(service.delete(ctx, &b.id).await.unwrap());

    let page = list_until(service, ctx, ListArgs::default(), |p| p.total_count == 2).await;
    assert_eq!(ids(&page), vec![c.id.clone(), a.id.clone()]);
    assert!(!page.has_more);

    // One item per page never brings B back
    let first = service.list(ctx, ListArgs::default().limit(1)).await.unwrap();
    assert_eq!(ids(&first), vec![c.id.clone()]);
    assert!(first.has_more);
    let cursor = first.cursor.clone().unwrap();

    let second = service
        .list(ctx, ListArgs::default().limit(1).after(cursor))
        .await
        .unwrap();
    assert_eq!(ids(&second), vec![a.id.clone()]);
    assert!(!second.has_more);
    assert_eq!(second.cursor, None);

    assert!(!ids(&first).contains(&b.id) && !ids(&second).contains(&b.id));
}

#[tokio::test]
async fn test_pagination_walks_every_item_once() {
    let fixture = setup();
    let (service, ctx) = (&fixture.service, &fixture.ctx);
    service.ensure_index(ctx).await.unwrap();

    for i in 0..7 {
        service
            .create(ctx, ProjectInput::new(format!("Project {}", i)))
            .await
            .unwrap();
    }
    wait_for_documents(&fixture.engine, "root-project", 7).await;

    let mut seen = Vec::new();
    let mut after = None;
    loop {
        let mut args = ListArgs::default().sort(["title_ASC"]).limit(3);
        args.after = after.take();
        let page = service.list(ctx, args).await.unwrap();
        assert_eq!(page.total_count, 7);
        seen.extend(page.items.iter().map(|p| p.title.clone()));
        match page.cursor {
            Some(cursor) => after = Some(cursor),
            None => break,
        }
    }

    let expected: Vec<String> = (0..7).map(|i| format!("Project {}", i)).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_list_filters() {
    let fixture = setup();
    let (a, b, c) = create_three(&fixture).await;
    let (service, ctx) = (&fixture.service, &fixture.ctx);

    let by_filter = |filter: ListWhere| ListArgs::default().filter(filter);

    let page = service
        .list(
            ctx,
            by_filter(ListWhere { title_contains: Some("ject 2".into()), ..Default::default() }),
        )
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![b.id.clone()]);

    let page = service
        .list(ctx, by_filter(ListWhere { is_nice: Some(true), ..Default::default() }))
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![c.id.clone()]);

    let page = service
        .list(
            ctx,
            by_filter(ListWhere { id_not_in: Some(vec![a.id.clone()]), ..Default::default() }),
        )
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![c.id.clone(), b.id.clone()]);

    let page = service
        .list(ctx, by_filter(ListWhere { created_on_gt: Some(a.created_on), ..Default::default() }))
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![c.id.clone(), b.id.clone()]);

    let page = service
        .list(
            ctx,
            by_filter(ListWhere {
                title_not_contains: Some("project".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 0);
}

#[tokio::test]
async fn test_empty_filter_matches_everything() {
    let fixture = setup();
    create_three(&fixture).await;

    let page = fixture
        .service
        .list(&fixture.ctx, ListArgs::default().filter(ListWhere::default()))
        .await
        .unwrap();
    assert_eq!(page.total_count, 3);
}

#[tokio::test]
async fn test_limit_is_clamped_to_maximum() {
    let config = Config::builder()
        .default_list_limit(2)
        .max_list_limit(2)
        .build();
    let fixture = setup_with(config);
    create_three(&fixture).await;

    let page = fixture
        .service
        .list(&fixture.ctx, ListArgs::default().limit(100))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(page.has_more);
    assert!(page.cursor.is_some());
}

#[tokio::test]
async fn test_invalid_list_input_is_validation_error() {
    let fixture = setup();
    create_three(&fixture).await;
    let (service, ctx) = (&fixture.service, &fixture.ctx);

    let bad = [
        ListArgs::default().sort(["title"]),
        ListArgs::default().sort(["isNice_ASC"]),
        ListArgs::default().sort(["title_UP"]),
        ListArgs::default().limit(0),
        ListArgs::default().after("not a cursor!"),
    ];
    for args in bad {
        let err = service.list(ctx, args.clone()).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR", "args: {:?}", args);
    }

    // A cursor only fits a list with the same sort
    let page = service.list(ctx, ListArgs::default().limit(1)).await.unwrap();
    let cursor = page.cursor.unwrap();
    let err = service
        .list(ctx, ListArgs::default().sort(["title_ASC", "savedOn_DESC"]).after(cursor))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

// =============================================================================
// Update / Delete Tests
// =============================================================================

#[tokio::test]
async fn test_update_merges_and_advances_saved_on() {
    let fixture = setup();
    let (a, _, _) = create_three(&fixture).await;
    let (service, ctx) = (&fixture.service, &fixture.ctx);

    let editor = Identity::new("u2", "Editor", "admin");
    let ctx_editor = ctx.clone().with_identity(editor.clone());
    let updated = service
        .update(&ctx_editor, &a.id, ProjectPatch::default().is_nice(true))
        .await
        .unwrap();

    let fetched = service.get(ctx, &a.id).await.unwrap();
    assert_eq!(fetched, updated);
    assert!(fetched.is_nice);
    assert!(fetched.saved_on > fetched.created_on);
    assert_eq!(fetched.created_on, a.created_on);
    assert_eq!(fetched.title, a.title);
    assert_eq!(fetched.created_by, a.created_by);
    assert_eq!(fetched.saved_by, Some(editor));

    // The search shadow follows
    let page = list_until(
        service,
        ctx,
        ListArgs::default().filter(ListWhere { is_nice: Some(true), ..Default::default() }),
        |p| p.total_count == 2,
    )
    .await;
    assert!(ids(&page).contains(&a.id));
}

#[tokio::test]
async fn test_update_can_clear_description() {
    let fixture = setup();
    let (service, ctx) = (&fixture.service, &fixture.ctx);
    service.ensure_index(ctx).await.unwrap();

    let project = service
        .create(ctx, ProjectInput::new("Project 1").description("first"))
        .await
        .unwrap();
    let patch: ProjectPatch =
        serde_json::from_value(serde_json::json!({ "description": null })).unwrap();
    let updated = service.update(ctx, &project.id, patch).await.unwrap();

    assert_eq!(updated.description, None);
    assert_eq!(service.get(ctx, &project.id).await.unwrap().description, None);

    let page = list_until(service, ctx, ListArgs::default(), |p| {
        p.items.len() == 1 && p.items[0].description.is_none()
    })
    .await;
    assert_eq!(page.items[0].title, "Project 1");
}

#[tokio::test]
async fn test_empty_patch_writes_nothing() {
    let fixture = setup();
    let (a, _, _) = create_three(&fixture).await;

    let same = fixture
        .service
        .update(&fixture.ctx, &a.id, ProjectPatch::default())
        .await
        .unwrap();
    assert_eq!(same, a);
}

#[tokio::test]
async fn test_update_and_delete_absent_are_not_found() {
    let fixture = setup();
    let (service, ctx) = (&fixture.service, &fixture.ctx);
    service.ensure_index(ctx).await.unwrap();

    let err = service
        .update(ctx, "missing", ProjectPatch::default().title("x"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    let err = service.delete(ctx, "missing").await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_second_delete_is_not_found() {
    let fixture = setup();
    let (a, _, _) = create_three(&fixture).await;

    assert!(fixture.service.delete(&fixture.ctx, &a.id).await.unwrap());
    let err = fixture.service.delete(&fixture.ctx, &a.id).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

// =============================================================================
// Scope / Failure Tests
// =============================================================================

#[tokio::test]
async fn test_missing_scope_is_unresolved() {
    let fixture = setup();
    let ctx = RequestContext::default();

    let err = fixture.service.ensure_index(&ctx).await.unwrap_err();
    assert_eq!(err.code(), "SCOPE_UNRESOLVED");
    let err = fixture
        .service
        .create(&ctx, ProjectInput::new("x"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "SCOPE_UNRESOLVED");
    let err = fixture.service.get(&ctx, "x").await.unwrap_err();
    assert_eq!(err.code(), "SCOPE_UNRESOLVED");
    let err = fixture
        .service
        .list(&ctx, ListArgs::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "SCOPE_UNRESOLVED");
}

#[tokio::test]
async fn test_scopes_are_isolated() {
    let fixture = setup();
    let (a, _, _) = create_three(&fixture).await;
    let other = RequestContext::new("other");

    let err = fixture.service.get(&other, &a.id).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    let err = fixture
        .service
        .list(&other, ListArgs::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INDEX_NOT_READY");

    fixture.service.ensure_index(&other).await.unwrap();
    let page = fixture
        .service
        .list(&other, ListArgs::default())
        .await
        .unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_slow_store_times_out() {
    let fixture = setup();
    fixture.service.ensure_index(&fixture.ctx).await.unwrap();
    fixture.backend.set_latency(Some(Duration::from_millis(500)));

    let ctx = fixture.ctx.clone().with_timeout(Duration::from_millis(20));
    let err = fixture.service.get(&ctx, "p000001").await.unwrap_err();
    assert_eq!(err.code(), "TIMEOUT");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_batch_failure_leaves_no_trace() {
    let fixture = setup();
    let (service, ctx) = (&fixture.service, &fixture.ctx);
    service.ensure_index(ctx).await.unwrap();

    fixture.backend.fail_next_batch(
        BackendError::new("ProvisionedThroughputExceededException", "too many writes")
            .with_context(serde_json::json!({ "table": "projects" })),
    );
    let err = service
        .create(ctx, ProjectInput::new("Project 1"))
        .await
        .unwrap_err();

    match &err {
        Error::StoreWrite {
            leg, code, context, ..
        } => {
            assert_eq!(*leg, WriteLeg::Batch);
            assert_eq!(code, "ProvisionedThroughputExceededException");
            assert_eq!(context, &Some(serde_json::json!({ "table": "projects" })));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.code(), "STORE_WRITE_ERROR");
    assert!(!err.is_retryable());

    assert_eq!(service.get(ctx, "p000001").await.unwrap_err().code(), "NOT_FOUND");
    assert_eq!(fixture.backend.item_count("projects"), 0);
    assert_eq!(fixture.backend.item_count("projects-search"), 0);

    // The next write goes through
    let project = service.create(ctx, ProjectInput::new("Project 2")).await.unwrap();
    assert_eq!(service.get(ctx, &project.id).await.unwrap(), project);
}
