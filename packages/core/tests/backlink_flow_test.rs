//! Backlink Flow Tests
//!
//! End-to-end rename and delete propagation through `NoteService` over the
//! memory store, checked both in the session and in what the store holds.

#[cfg(test)]
mod backlink_flow_tests {
    use anyhow::Result;
    use chrono::Utc;
    use decknote_core::db::{MemoryStore, NoteStore};
    use decknote_core::models::{
        DeckSession, Document, Element, ElementKind, Node, Note, NoteTree, NoteTreeItem,
    };
    use decknote_core::services::{compute_backlinks, extract_links, node_radius, NoteService};
    use decknote_core::DeckConfig;
    use std::sync::Arc;

    const DECK: &str = "deck-1";

    fn note_link_count(doc: &Document, target: &str) -> usize {
        doc.descendants()
            .filter(|(_, node)| {
                node.as_element().and_then(|el| el.linked_note_id()) == Some(target)
            })
            .count()
    }

    /// Alpha (id 1) links to Beta (id 2) twice, once with custom text
    async fn seeded_service() -> Result<(NoteService, Arc<MemoryStore>)> {
        let now = Utc::now();
        let alpha_content = Document::new(vec![
            Node::Element(Element::paragraph(vec![
                Node::text("Read "),
                Node::Element(Element::note_link("2", "Beta")),
                Node::text(" first."),
            ])),
            Node::Element(Element::paragraph(vec![Node::Element(
                Element::note_link_with_text("2", "Beta", "the sequel"),
            )])),
        ]);
        let alpha = Note::with_id("1", "Alpha", alpha_content, now);
        let beta = Note::with_id("2", "Beta", Document::empty(), now);

        let store = Arc::new(MemoryStore::new());
        store
            .seed(
                DECK,
                vec![alpha, beta],
                NoteTree::new(vec![NoteTreeItem::leaf("1"), NoteTreeItem::leaf("2")]),
            )
            .await;

        let dyn_store: Arc<dyn NoteStore> = store.clone();
        let service = NoteService::open(
            dyn_store,
            DeckSession::new("user-1", DECK),
            DeckConfig::default(),
        )
        .await?;
        Ok((service, store))
    }

    #[tokio::test]
    async fn test_rename_then_delete_end_to_end() -> Result<()> {
        let (service, store) = seeded_service().await?;

        let backlinks = service.backlinks("2").await;
        assert_eq!(backlinks.len(), 1);
        assert_eq!(backlinks[0].id, "1");
        assert_eq!(backlinks[0].matches.len(), 2);
        assert_eq!(backlinks[0].matches[0].context, "Read Beta first.");

        // Rename Beta to Gamma
        let report = service.rename_note("2", "Gamma").await?;
        assert_eq!(report.updated, vec!["1".to_string()]);

        let alpha = store.note(DECK, "1").await.expect("alpha stored");
        let links: Vec<_> = extract_links(&alpha.content).collect();
        assert_eq!(links.len(), 2);
        for link in &links {
            assert!(matches!(
                &link.element.kind,
                ElementKind::NoteLink { note_title, .. } if note_title == "Gamma"
            ));
        }
        // Default label tracks the title; custom text does not
        assert_eq!(links[0].element.text_content(), "Gamma");
        assert_eq!(links[1].element.text_content(), "the sequel");
        assert_eq!(store.note(DECK, "2").await.unwrap().title, "Gamma");

        // Delete Beta
        service.delete_note("2").await?;

        let alpha = store.note(DECK, "1").await.expect("alpha stored");
        assert_eq!(note_link_count(&alpha.content, "2"), 0);
        assert_eq!(alpha.content.plain_text(), "Read Gamma first.\nthe sequel");
        assert!(store.note(DECK, "2").await.is_none());
        assert_eq!(store.tree(DECK).await.unwrap().ids(), vec!["1"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_links_are_not_backlinks_but_are_removed_on_delete() -> Result<()> {
        let (service, _store) = seeded_service().await?;

        let mut stub = Element::note_link("2", "Beta");
        stub.children = vec![Node::text("")];
        let content = Document::new(vec![Node::Element(Element::paragraph(vec![
            Node::text("draft "),
            Node::Element(stub),
        ]))]);
        let draft = service.create_note("Draft", content, None).await?;

        let sources: Vec<String> = service
            .backlinks("2")
            .await
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert!(!sources.contains(&draft.id));

        service.delete_note("2").await?;
        let draft = service.note(&draft.id).await.unwrap();
        assert_eq!(note_link_count(&draft.content, "2"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_whitespace_links_follow_rename() -> Result<()> {
        let (service, store) = seeded_service().await?;

        let mut spaced = Element::note_link("2", "Beta");
        spaced.children = vec![Node::text(" ")];
        let content = Document::new(vec![Node::Element(Element::paragraph(vec![
            Node::text("see"),
            Node::Element(spaced),
        ]))]);
        let draft = service.create_note("Draft", content, None).await?;

        let sources: Vec<String> = service
            .backlinks("2")
            .await
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert!(sources.contains(&draft.id));

        let report = service.rename_note("2", "Gamma").await?;
        assert!(report.updated.contains(&draft.id));

        let stored = store.note(DECK, &draft.id).await.expect("draft stored");
        let link = extract_links(&stored.content).next().expect("link kept");
        assert!(matches!(
            &link.element.kind,
            ElementKind::NoteLink { note_title, .. } if note_title == "Gamma"
        ));
        assert_eq!(link.element.text_content(), "Gamma");
        Ok(())
    }

    #[tokio::test]
    async fn test_graph_reflects_links() -> Result<()> {
        let (service, _store) = seeded_service().await?;

        let graph = service.graph().await;
        assert_eq!(graph.links.len(), 1);
        let beta = graph.nodes.iter().find(|n| n.id == "2").unwrap();
        assert_eq!(beta.link_count, 1);
        assert_eq!(beta.radius, node_radius(1));

        assert_eq!(node_radius(0), 3.0);
        assert_eq!(node_radius(4), 5.0);
        assert_eq!(node_radius(20), 10.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_delete_propagation_is_repaired_by_sweep() -> Result<()> {
        let (service, store) = seeded_service().await?;
        store.fail_updates_for("1");

        let report = service.delete_note("2").await?;
        assert_eq!(report.failed.len(), 1);

        // The store still holds Alpha's dangling links
        let stored = store.note(DECK, "1").await.unwrap();
        assert_eq!(note_link_count(&stored.content, "2"), 2);
        let collection = [stored].into_iter().collect();
        assert!(compute_backlinks(&collection, "2")
            .first()
            .is_some_and(|b| b.matches.len() == 2));

        // A later session sweeps them once the store accepts writes
        store.clear_failures();
        let dyn_store: Arc<dyn NoteStore> = store.clone();
        let reopened = NoteService::open(
            dyn_store,
            DeckSession::new("user-1", DECK),
            DeckConfig::default(),
        )
        .await?;
        let report = reopened.sweep_dangling_links().await;
        assert_eq!(report.updated, vec!["1".to_string()]);
        assert_eq!(
            note_link_count(&store.note(DECK, "1").await.unwrap().content, "2"),
            0
        );
        Ok(())
    }
}
