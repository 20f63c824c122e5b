//! Content model tests.
//!
//! Building trees programmatically, shared identities, pre-order flattening
//! and tree summaries.

use bindery::model::{
    Binder, Document, DocumentPointer, Metadata, Node, Resource, TranslucentBinder, TreeNode,
    flatten_tree_to_ident_hashes, model_to_tree,
};

fn book() -> Node {
    let one = Document::new("e78d4f90@3", "<p>One</p>")
        .unwrap()
        .with_metadata(Metadata::new("Document One"));
    let two = Document::new("3c448dc6@1", "<p>Two</p>")
        .unwrap()
        .with_metadata(Metadata::new("Document Two"));
    let pointer = DocumentPointer::new("a1b2c3@4", Metadata::new("Elsewhere")).unwrap();

    let mut part = TranslucentBinder::new(Metadata::new("Part One"));
    part.children.push_with_title(one, Some("Renamed One".to_string()));
    part.children.push(two);

    Binder::new("8d75ea29@3", Metadata::new("Book One"))
        .unwrap()
        .with_child(part)
        .with_child(pointer)
        .into()
}

// ============================================================================
// Tree Summaries
// ============================================================================

#[test]
fn test_model_to_tree() {
    let tree = model_to_tree(&book());
    assert_eq!(tree.id.as_deref(), Some("8d75ea29@3"));
    assert_eq!(tree.title.as_deref(), Some("Book One"));

    let contents = tree.contents.as_ref().unwrap();
    assert_eq!(contents.len(), 2);
    assert_eq!(contents[0].id.as_deref(), Some("subcol"));
    assert_eq!(contents[1].id.as_deref(), Some("a1b2c3@4"));
    assert!(contents[1].contents.is_none());

    let pages = contents[0].contents.as_ref().unwrap();
    assert_eq!(pages[0].title.as_deref(), Some("Renamed One"));
    assert_eq!(pages[1].title.as_deref(), Some("Document Two"));
}

#[test]
fn test_flatten_tree_skips_translucent() {
    let ids = flatten_tree_to_ident_hashes(&model_to_tree(&book()));
    assert_eq!(ids, vec!["8d75ea29@3", "e78d4f90@3", "3c448dc6@1", "a1b2c3@4"]);
}

#[test]
fn test_tree_serializes_with_short_id_key() {
    let tree = TreeNode {
        id: Some("e78d4f90@3".to_string()),
        title: Some("Document One".to_string()),
        short_id: Some("54_PkC".to_string()),
        contents: None,
    };
    let json = serde_json::to_value(&tree).unwrap();
    assert_eq!(json["shortId"], "54_PkC");
    assert!(json.get("contents").is_none());

    let back: TreeNode = serde_json::from_value(json).unwrap();
    assert_eq!(back, tree);
}

// ============================================================================
// Traversal
// ============================================================================

#[test]
fn test_flatten_pre_order() {
    let book = book();
    let ids: Vec<Option<String>> = book.flatten().map(Node::ident_hash).collect();
    assert_eq!(
        ids,
        vec![
            Some("8d75ea29@3".to_string()),
            None,
            Some("e78d4f90@3".to_string()),
            Some("3c448dc6@1".to_string()),
            Some("a1b2c3@4".to_string()),
        ]
    );
}

#[test]
fn test_flatten_to_documents() {
    let book = book();
    assert_eq!(book.flatten_to_documents(false).count(), 2);
    assert_eq!(book.flatten_to_documents(true).count(), 3);
}

// ============================================================================
// Identity
// ============================================================================

#[test]
fn test_set_id_keeps_version_for_bare_ids() {
    let mut doc = Document::new("e78d4f90@3", "<p/>").unwrap();
    doc.set_id("ffff0000").unwrap();
    assert_eq!(doc.ident_hash(), "ffff0000@3");
    doc.set_id("abcd@7").unwrap();
    assert_eq!(doc.ident_hash(), "abcd@7");
    assert!(doc.set_id("@7").is_err());
}

#[test]
fn test_resource_rename_reaches_content() {
    let mut doc = Document::new("p@1", r#"<img src="cover.png"/>"#).unwrap();
    let resource = Resource::with_name("cover.png", b"png".to_vec(), "image/png");
    doc.references_mut()[0].bind_resource(&resource, "../resources/{}");
    doc.add_resource(resource.clone());

    doc.resources()[0].rename("front.png");
    assert!(doc.content().contains(r#"src="../resources/front.png""#));
    assert_eq!(resource.id(), "front.png");
}

#[test]
fn test_resource_named_by_content() {
    let resource = Resource::new(b"body {}".to_vec(), "text/css").unwrap();
    assert!(resource.id().ends_with(".css"));
    assert_eq!(resource.id().len(), 40 + ".css".len());
    assert!(Resource::new(b"?".to_vec(), "application/x-unknown").is_err());
}
