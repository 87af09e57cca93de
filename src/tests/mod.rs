pub mod helper;


use crate::model::{NodeError, Position, ResolvedPos, Slice};
use helper::{blockquote, doc, em, h1, img, p, strong, text};

#[test]
fn test_nested_document() {
    let d = doc(vec![
        h1(vec![text("Title")]),
        blockquote(vec![p(vec![text("a "), strong("b"), img()])]),
        p(vec![em("c")]),
    ]);
    assert_eq!(d.check(), Ok(()));
    assert_eq!(d.text_content(), "Titlea bc");
    assert_eq!(d.node_size(), 5);
    assert_eq!(d.child(1).unwrap().child(0).unwrap().node_size(), 5);

    let quote = d.child(1).unwrap();
    let wrong = quote.copy(vec![text("loose")].into());
    assert_eq!(
        wrong.check(),
        Err(NodeError::InvalidContent("blockquote".into()))
    );
}

#[test]
fn test_slice_of_document() {
    let d = doc(vec![p(vec![text("one")]), p(vec![text("two")])]);
    let slice = Slice::new(d.content().clone(), 1, 1).unwrap();
    assert_eq!(slice.size(), 2);
    assert!(slice.content().ptr_eq(d.content()));

    let pos = ResolvedPos::new(Position::new(3).offset(), d.clone(), 1);
    assert!(pos.doc().ptr_eq(&d));
    assert_eq!(pos, ResolvedPos::new(3, d, 1));
}
