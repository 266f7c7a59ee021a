//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作（解析、节点查询、文本读写）
//! - `serializer`: 序列化功能

pub mod dom;
pub mod serializer;

pub use dom::{
    append_child, create_text_node, find_nodes, get_charset, get_child_node_by_name,
    get_node_attr, get_node_name, get_parent_element_name, get_parent_node, get_text_content,
    html_to_dom, remove_child, set_node_attr, set_text_content,
};
pub use serializer::serialize_document;
