pub mod document;
pub mod tree;

pub use document::parse_document;
pub use tree::{parse_tree, XmlNode};
