//! Tests for NoteService
//!
//! Run against `MemoryStore` with a fixed clock. Debounce tests use a paused
//! tokio clock, so sleeping in the test advances time deterministically.

#[cfg(test)]
mod note_service_tests {
    use crate::config::DeckConfig;
    use crate::db::{DomainEvent, MemoryStore, NoteStore};
    use crate::models::time::FixedTimeProvider;
    use crate::models::{
        DeckSession, Document, Element, ElementKind, Node, Note, NoteTree, NoteTreeItem, Point,
        TextRange, ValidationError,
    };
    use crate::services::link_extraction::extract_links;
    use crate::services::{NoteService, NoteServiceError, SaveState, UNSAVED_CHANGES_WARNING};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Duration;

    const DECK: &str = "deck";

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn paragraph(children: Vec<Node>) -> Document {
        Document::new(vec![Node::Element(Element::paragraph(children))])
    }

    /// "See <link>." pointing at `target`
    fn linking(target: &Note) -> Document {
        paragraph(vec![
            Node::text("See "),
            Node::Element(Element::note_link(&target.id, &target.title)),
            Node::text("."),
        ])
    }

    fn has_link_to(doc: &Document, target: &str) -> bool {
        doc.descendants()
            .any(|(_, node)| node.as_element().and_then(|el| el.linked_note_id()) == Some(target))
    }

    /// Helper to create a service over a memory store with a fixed clock
    async fn create_test_service_with(config: DeckConfig) -> (NoteService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = open(&store, config).await;
        (service, store)
    }

    async fn create_test_service() -> (NoteService, Arc<MemoryStore>) {
        create_test_service_with(DeckConfig::default()).await
    }

    async fn open(store: &Arc<MemoryStore>, config: DeckConfig) -> NoteService {
        let dyn_store: Arc<dyn NoteStore> = store.clone();
        NoteService::open_with_clock(
            dyn_store,
            DeckSession::new("user", DECK),
            config,
            Arc::new(FixedTimeProvider::new(start_time())),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_open_reconciles_tree_and_persists_it() {
        let store = Arc::new(MemoryStore::new());
        let a = Note::with_id("a", "A", Document::empty(), start_time());
        let c = Note::with_id("c", "C", Document::empty(), start_time());
        let mut stale = NoteTreeItem::leaf("a");
        stale.children.push(NoteTreeItem::leaf("b"));
        store.seed(DECK, vec![a, c], NoteTree::new(vec![stale])).await;

        let service = open(&store, DeckConfig::default()).await;

        let tree = service.tree().await;
        assert_eq!(tree.ids(), vec!["a", "c"]);
        assert!(tree.find("a").unwrap().children.is_empty());
        assert_eq!(store.tree(DECK).await.unwrap(), tree);
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config_before_touching_store() {
        let store = Arc::new(MemoryStore::new());
        let a = Note::with_id("a", "A", Document::empty(), start_time());
        let stale = NoteTree::new(vec![NoteTreeItem::leaf("gone")]);
        store.seed(DECK, vec![a], stale.clone()).await;

        for config in [
            DeckConfig {
                save_debounce_ms: 0,
                ..DeckConfig::default()
            },
            DeckConfig {
                max_import_blocks: 0,
                ..DeckConfig::default()
            },
        ] {
            let dyn_store: Arc<dyn NoteStore> = store.clone();
            let result = NoteService::open(dyn_store, DeckSession::new("user", DECK), config).await;
            let Err(err) = result else {
                panic!("invalid config accepted");
            };
            assert!(matches!(err, NoteServiceError::InvalidConfig { .. }));
            assert!(!err.is_recoverable());
        }

        assert_eq!(store.write_attempts(), 0);
        assert_eq!(store.tree(DECK).await, Some(stale));
    }

    #[tokio::test]
    async fn test_open_leaves_consistent_tree_alone() {
        let store = Arc::new(MemoryStore::new());
        let a = Note::with_id("a", "A", Document::empty(), start_time());
        store
            .seed(DECK, vec![a], NoteTree::new(vec![NoteTreeItem::leaf("a")]))
            .await;

        open(&store, DeckConfig::default()).await;
        assert_eq!(store.write_attempts(), 0);
    }

    #[tokio::test]
    async fn test_create_note_adds_to_store_and_tree() {
        let (service, store) = create_test_service().await;

        let parent = service
            .create_note("Projects", Document::empty(), None)
            .await
            .unwrap();
        let child = service
            .create_note("Decknote", Document::empty(), Some(&parent.id))
            .await
            .unwrap();

        assert_eq!(child.created_at, start_time());
        assert_eq!(store.note(DECK, &child.id).await.unwrap(), child);
        let tree = service.tree().await;
        assert_eq!(tree.items.len(), 1);
        assert_eq!(tree.items[0].children[0].id, child.id);
        assert_eq!(store.tree(DECK).await.unwrap(), tree);
    }

    #[tokio::test]
    async fn test_duplicate_title_rejected_before_any_store_call() {
        let (service, store) = create_test_service().await;
        service
            .create_note("Alpha", Document::empty(), None)
            .await
            .unwrap();
        let attempts = store.write_attempts();

        let err = service
            .create_note("  ALPHA ", Document::empty(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NoteServiceError::Validation(ValidationError::DuplicateTitle { .. })
        ));
        assert!(err.is_recoverable());

        let err = service
            .create_note("   ", Document::empty(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NoteServiceError::Validation(ValidationError::EmptyTitle)
        ));

        assert_eq!(store.write_attempts(), attempts);
        assert_eq!(service.notes().await.len(), 1);
    }

    #[tokio::test]
    async fn test_edit_title_rejects_duplicate_and_keeps_note_unchanged() {
        let (service, _store) = create_test_service().await;
        service
            .create_note("Alpha", Document::empty(), None)
            .await
            .unwrap();
        let beta = service
            .create_note("Beta", Document::empty(), None)
            .await
            .unwrap();

        let result = service.edit_title(&beta.id, "alpha").await;
        assert!(matches!(result, Err(NoteServiceError::Validation(_))));
        assert_eq!(service.note(&beta.id).await.unwrap().title, "Beta");
        assert!(service.is_synced(&beta.id));

        // Renaming a note to its own title in another case is allowed
        service.edit_title(&beta.id, "BETA").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_collapses_rapid_edits_into_one_save() {
        let (service, store) = create_test_service().await;
        let note = service
            .create_note("Journal", Document::empty(), None)
            .await
            .unwrap();
        let baseline = store.write_attempts();

        service
            .edit_content(&note.id, paragraph(vec![Node::text("d")]))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        service
            .edit_content(&note.id, paragraph(vec![Node::text("day one")]))
            .await
            .unwrap();
        assert_eq!(service.save_state(&note.id), SaveState::Dirty);
        assert_eq!(
            service.navigation_warning(&note.id),
            Some(UNSAVED_CHANGES_WARNING)
        );

        // First timer was reset by the second edit
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(store.write_attempts(), baseline);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.write_attempts(), baseline + 1);
        let stored = store.note(DECK, &note.id).await.unwrap();
        assert_eq!(stored.content.plain_text(), "day one");
        assert_eq!(stored.title, "Journal");
        assert!(service.is_synced(&note.id));
        assert_eq!(service.navigation_warning(&note.id), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_title_edit_propagates_rename() {
        let (service, store) = create_test_service().await;
        let beta = service
            .create_note("Beta", Document::empty(), None)
            .await
            .unwrap();
        let alpha = service
            .create_note("Alpha", linking(&beta), None)
            .await
            .unwrap();

        service.edit_title(&beta.id, "Gamma").await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let stored_alpha = store.note(DECK, &alpha.id).await.unwrap();
        assert_eq!(stored_alpha.content.plain_text(), "See Gamma.");
        assert_eq!(store.note(DECK, &beta.id).await.unwrap().title, "Gamma");
        assert!(service.is_synced(&beta.id));
    }

    #[tokio::test]
    async fn test_rename_updates_links_and_labels() {
        let (service, store) = create_test_service().await;
        let beta = service
            .create_note("Beta", Document::empty(), None)
            .await
            .unwrap();
        let alpha = service
            .create_note("Alpha", linking(&beta), None)
            .await
            .unwrap();

        let report = service.rename_note(&beta.id, "Gamma").await.unwrap();
        assert_eq!(report.updated, vec![alpha.id.clone()]);
        assert!(report.is_complete());

        for content in [
            service.note(&alpha.id).await.unwrap().content,
            store.note(DECK, &alpha.id).await.unwrap().content,
        ] {
            let link = extract_links(&content).next().unwrap();
            assert_eq!(link.element.text_content(), "Gamma");
            assert!(matches!(
                &link.element.kind,
                ElementKind::NoteLink { note_title, .. } if note_title == "Gamma"
            ));
        }
    }

    #[tokio::test]
    async fn test_rename_refreshes_unsaved_edits_of_linking_notes() {
        let (service, store) = create_test_service().await;
        let beta = service
            .create_note("Beta", Document::empty(), None)
            .await
            .unwrap();
        let alpha = service
            .create_note("Alpha", Document::empty(), None)
            .await
            .unwrap();

        // Alpha gains a link but is not saved yet
        service.edit_content(&alpha.id, linking(&beta)).await.unwrap();
        service.rename_note(&beta.id, "Gamma").await.unwrap();
        service.flush(&alpha.id).await.unwrap();

        let stored = store.note(DECK, &alpha.id).await.unwrap();
        assert_eq!(stored.content.plain_text(), "See Gamma.");
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_edits_until_retry_succeeds() {
        let (service, store) = create_test_service().await;
        let note = service
            .create_note("Draft", Document::empty(), None)
            .await
            .unwrap();
        store.fail_updates_for(note.id.clone());

        service
            .edit_content(&note.id, paragraph(vec![Node::text("unsent")]))
            .await
            .unwrap();
        let err = service.flush(&note.id).await.unwrap_err();
        assert!(matches!(err, NoteServiceError::PersistenceFailed { .. }));
        assert!(matches!(
            service.save_state(&note.id),
            SaveState::SaveFailed { .. }
        ));
        assert!(service.navigation_warning(&note.id).is_some());
        assert_eq!(service.unsaved_notes(), vec![note.id.clone()]);

        store.clear_failures();
        service.flush(&note.id).await.unwrap();
        assert!(service.is_synced(&note.id));
        assert_eq!(
            store.note(DECK, &note.id).await.unwrap().content.plain_text(),
            "unsent"
        );
    }

    #[tokio::test]
    async fn test_partial_propagation_failure_is_reported_not_rolled_back() {
        let (service, store) = create_test_service().await;
        let beta = service
            .create_note("Beta", Document::empty(), None)
            .await
            .unwrap();
        let alpha = service
            .create_note("Alpha", linking(&beta), None)
            .await
            .unwrap();
        let delta = service
            .create_note("Delta", linking(&beta), None)
            .await
            .unwrap();
        store.fail_updates_for(delta.id.clone());

        let report = service.rename_note(&beta.id, "Gamma").await.unwrap();

        assert_eq!(report.updated, vec![alpha.id.clone()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, delta.id);
        // The rename itself is confirmed
        assert!(service.is_synced(&beta.id));
        // Memory has the rewrite; the failed store copy keeps the old label
        assert_eq!(
            service.note(&delta.id).await.unwrap().content.plain_text(),
            "See Gamma."
        );
        assert_eq!(
            store.note(DECK, &delta.id).await.unwrap().content.plain_text(),
            "See Beta."
        );
    }

    #[tokio::test]
    async fn test_delete_unwraps_links_before_removing_note() {
        let (service, store) = create_test_service().await;
        let beta = service
            .create_note("Beta", Document::empty(), None)
            .await
            .unwrap();
        let alpha = service
            .create_note("Alpha", linking(&beta), None)
            .await
            .unwrap();
        let mut events = store.subscribe();

        let report = service.delete_note(&beta.id).await.unwrap();
        assert_eq!(report.updated, vec![alpha.id.clone()]);

        let first = events.try_recv().unwrap();
        assert!(matches!(first, DomainEvent::NoteUpdated { ref update, .. } if update.id == alpha.id));
        let second = events.try_recv().unwrap();
        assert!(matches!(second, DomainEvent::NoteDeleted { ref id, .. } if *id == beta.id));

        let content = service.note(&alpha.id).await.unwrap().content;
        assert!(!has_link_to(&content, &beta.id));
        assert_eq!(content.plain_text(), "See Beta.");
        assert!(service.note(&beta.id).await.is_none());
        assert!(!service.tree().await.contains(&beta.id));
        assert!(store.note(DECK, &beta.id).await.is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_note_fails() {
        let (service, store) = create_test_service().await;
        let err = service.delete_note("missing").await.unwrap_err();
        assert!(matches!(err, NoteServiceError::NoteNotFound { .. }));
        assert_eq!(store.write_attempts(), 0);
    }

    #[tokio::test]
    async fn test_import_markdown_note() {
        let (service, _store) = create_test_service().await;

        let note = service
            .import_markdown_note("Groceries", "# Weekend #shopping\n\n- [ ] milk\n- [x] eggs\n", None)
            .await
            .unwrap();

        assert_eq!(note.content.children().len(), 3);
        let index = service.tag_index().await;
        assert_eq!(index.get("shopping"), Some(&vec![note.id.clone()]));
    }

    #[tokio::test]
    async fn test_import_limits_are_enforced() {
        let config = DeckConfig {
            max_import_bytes: 64,
            max_import_blocks: 2,
            ..DeckConfig::default()
        };
        let (service, store) = create_test_service_with(config).await;

        let err = service
            .import_markdown_note("Big", &"x".repeat(65), None)
            .await
            .unwrap_err();
        assert!(matches!(err, NoteServiceError::ImportRejected { .. }));

        let err = service
            .import_markdown_note("Blocks", "one\n\ntwo\n\nthree\n", None)
            .await
            .unwrap_err();
        assert!(matches!(err, NoteServiceError::ImportRejected { .. }));
        assert_eq!(store.write_attempts(), 0);
    }

    #[tokio::test]
    async fn test_link_selection_keeps_selected_text_as_custom_text() {
        let (service, _store) = create_test_service().await;
        let beta = service
            .create_note("Beta", Document::empty(), None)
            .await
            .unwrap();
        let alpha = service
            .create_note(
                "Alpha",
                paragraph(vec![Node::text("see the second note")]),
                None,
            )
            .await
            .unwrap();

        let range = TextRange::new(Point::new(vec![0, 0], 8), Point::new(vec![0, 0], 19));
        let path = service
            .link_selection(&alpha.id, &range, &beta.id)
            .await
            .unwrap();
        assert_eq!(path, vec![0, 1]);

        let content = service.note(&alpha.id).await.unwrap().content;
        let link = extract_links(&content).next().unwrap();
        assert!(matches!(
            &link.element.kind,
            ElementKind::NoteLink { custom_text: Some(text), note_title, .. }
                if text == "second note" && note_title == "Beta"
        ));
        assert_eq!(service.backlinks(&beta.id).await.len(), 1);
        assert!(!service.is_synced(&alpha.id));

        // Custom text survives a rename
        service.rename_note(&beta.id, "Gamma").await.unwrap();
        let content = service.note(&alpha.id).await.unwrap().content;
        assert_eq!(content.plain_text(), "see the second note");
    }

    #[tokio::test]
    async fn test_sweep_repairs_dangling_links() {
        let store = Arc::new(MemoryStore::new());
        let ghost = Note::with_id("ghost", "Ghost", Document::empty(), start_time());
        let alpha = Note::with_id("alpha", "Alpha", linking(&ghost), start_time());
        store.seed(DECK, vec![alpha], NoteTree::default()).await;
        let service = open(&store, DeckConfig::default()).await;

        // Dangling links are inert until swept
        assert!(has_link_to(
            &service.note("alpha").await.unwrap().content,
            "ghost"
        ));

        let report = service.sweep_dangling_links().await;
        assert_eq!(report.updated, vec!["alpha".to_string()]);
        let stored = store.note(DECK, "alpha").await.unwrap();
        assert!(!has_link_to(&stored.content, "ghost"));
        assert_eq!(stored.content.plain_text(), "See Ghost.");
    }

    #[tokio::test]
    async fn test_graph_and_tree_operations() {
        let (service, store) = create_test_service().await;
        let beta = service
            .create_note("Beta", Document::empty(), None)
            .await
            .unwrap();
        let alpha = service
            .create_note("Alpha", linking(&beta), None)
            .await
            .unwrap();

        let graph = service.graph().await;
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.links.len(), 1);

        service.move_note(&alpha.id, Some(&beta.id), 0).await.unwrap();
        assert_eq!(service.tree().await.items.len(), 1);
        assert!(!service.toggle_collapsed(&beta.id).await.unwrap());
        assert_eq!(store.tree(DECK).await.unwrap(), service.tree().await);

        assert!(matches!(
            service.move_note("missing", None, 0).await,
            Err(NoteServiceError::NoteNotFound { .. })
        ));
    }
}
