//! Snapshot of the canvas elements the user has selected.
//!
//! The wire form is the flat camelCase object the plugin has always emitted,
//! e.g. `{"id":"1:2","type":"TEXT","characters":"Submit",...}`. In memory the
//! type-specific attributes are split into [`NodeProps`] so that a text node
//! cannot carry container layout fields and vice versa.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Canvas node type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeType {
    Frame,
    Group,
    Component,
    Instance,
    Text,
    Rectangle,
    Ellipse,
    Polygon,
    Star,
    Vector,
    Line,
    Other(String),
}

/// Attribute family a node type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCategory {
    Container,
    Text,
    Shape,
    Plain,
}

impl NodeType {
    pub fn as_str(&self) -> &str {
        match self {
            NodeType::Frame => "FRAME",
            NodeType::Group => "GROUP",
            NodeType::Component => "COMPONENT",
            NodeType::Instance => "INSTANCE",
            NodeType::Text => "TEXT",
            NodeType::Rectangle => "RECTANGLE",
            NodeType::Ellipse => "ELLIPSE",
            NodeType::Polygon => "POLYGON",
            NodeType::Star => "STAR",
            NodeType::Vector => "VECTOR",
            NodeType::Line => "LINE",
            NodeType::Other(tag) => tag,
        }
    }

    pub fn category(&self) -> NodeCategory {
        match self {
            NodeType::Frame | NodeType::Group | NodeType::Component | NodeType::Instance => {
                NodeCategory::Container
            }
            NodeType::Text => NodeCategory::Text,
            NodeType::Rectangle
            | NodeType::Ellipse
            | NodeType::Polygon
            | NodeType::Star
            | NodeType::Vector
            | NodeType::Line => NodeCategory::Shape,
            NodeType::Other(_) => NodeCategory::Plain,
        }
    }
}

impl From<&str> for NodeType {
    fn from(tag: &str) -> Self {
        match tag {
            "FRAME" => NodeType::Frame,
            "GROUP" => NodeType::Group,
            "COMPONENT" => NodeType::Component,
            "INSTANCE" => NodeType::Instance,
            "TEXT" => NodeType::Text,
            "RECTANGLE" => NodeType::Rectangle,
            "ELLIPSE" => NodeType::Ellipse,
            "POLYGON" => NodeType::Polygon,
            "STAR" => NodeType::Star,
            "VECTOR" => NodeType::Vector,
            "LINE" => NodeType::Line,
            other => NodeType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

/// Type-specific attributes, selected by the node's [`NodeCategory`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeProps {
    Container {
        layout_mode: Option<String>,
        item_spacing: Option<f64>,
    },
    Text {
        characters: String,
        font_size: Option<Value>,
        font_name: Option<Value>,
    },
    Shape {
        stroke_weight: Option<Value>,
    },
    Plain,
}

/// One selected canvas element and its descendants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawLayer", into = "RawLayer")]
pub struct LayerNode {
    pub id: String,
    pub name: String,
    pub node_type: NodeType,
    pub visible: bool,
    pub locked: bool,
    pub geometry: Geometry,
    pub fills: Option<Vec<Value>>,
    pub strokes: Option<Vec<Value>>,
    pub effects: Option<Vec<Value>>,
    pub url: Option<String>,
    pub props: NodeProps,
    pub children: Vec<LayerNode>,
    /// Attributes not modelled above, carried through untouched.
    pub extra: Map<String, Value>,
}

impl LayerNode {
    /// A bare node of the given type with empty props for its category.
    #[cfg(test)]
    pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: NodeType) -> Self {
        let props = match node_type.category() {
            NodeCategory::Container => NodeProps::Container {
                layout_mode: None,
                item_spacing: None,
            },
            NodeCategory::Text => NodeProps::Text {
                characters: String::new(),
                font_size: None,
                font_name: None,
            },
            NodeCategory::Shape => NodeProps::Shape {
                stroke_weight: None,
            },
            NodeCategory::Plain => NodeProps::Plain,
        };

        Self {
            id: id.into(),
            name: name.into(),
            node_type,
            visible: true,
            locked: false,
            geometry: Geometry::default(),
            fills: None,
            strokes: None,
            effects: None,
            url: None,
            props,
            children: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Convenience constructor for a text node.
    #[cfg(test)]
    pub fn text(id: impl Into<String>, name: impl Into<String>, characters: impl Into<String>) -> Self {
        let mut node = Self::new(id, name, NodeType::Text);
        node.props = NodeProps::Text {
            characters: characters.into(),
            font_size: None,
            font_name: None,
        };
        node
    }

    /// Text content if this is a text node.
    pub fn characters(&self) -> Option<&str> {
        match &self.props {
            NodeProps::Text { characters, .. } => Some(characters),
            _ => None,
        }
    }

    /// Number of nodes in this subtree, including self.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(LayerNode::node_count).sum::<usize>()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLayer {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    locked: bool,
    #[serde(flatten)]
    geometry: Geometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fills: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    strokes: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    effects: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    characters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_size: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    layout_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    item_spacing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stroke_weight: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<LayerNode>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

impl From<RawLayer> for LayerNode {
    fn from(raw: RawLayer) -> Self {
        let node_type = NodeType::from(raw.node_type.as_str());
        let props = match node_type.category() {
            NodeCategory::Container => NodeProps::Container {
                layout_mode: raw.layout_mode,
                item_spacing: raw.item_spacing,
            },
            NodeCategory::Text => NodeProps::Text {
                characters: raw.characters.unwrap_or_default(),
                font_size: raw.font_size,
                font_name: raw.font_name,
            },
            NodeCategory::Shape => NodeProps::Shape {
                stroke_weight: raw.stroke_weight,
            },
            NodeCategory::Plain => NodeProps::Plain,
        };

        Self {
            id: raw.id,
            name: raw.name,
            node_type,
            visible: raw.visible,
            locked: raw.locked,
            geometry: raw.geometry,
            fills: raw.fills,
            strokes: raw.strokes,
            effects: raw.effects,
            url: raw.url,
            props,
            children: raw.children,
            extra: raw.extra,
        }
    }
}

impl From<LayerNode> for RawLayer {
    fn from(node: LayerNode) -> Self {
        let mut raw = RawLayer {
            id: node.id,
            name: node.name,
            node_type: node.node_type.as_str().to_string(),
            visible: node.visible,
            locked: node.locked,
            geometry: node.geometry,
            fills: node.fills,
            strokes: node.strokes,
            effects: node.effects,
            url: node.url,
            characters: None,
            font_size: None,
            font_name: None,
            layout_mode: None,
            item_spacing: None,
            stroke_weight: None,
            children: node.children,
            extra: node.extra,
        };

        match node.props {
            NodeProps::Container {
                layout_mode,
                item_spacing,
            } => {
                raw.layout_mode = layout_mode;
                raw.item_spacing = item_spacing;
            }
            NodeProps::Text {
                characters,
                font_size,
                font_name,
            } => {
                raw.characters = Some(characters);
                raw.font_size = font_size;
                raw.font_name = font_name;
            }
            NodeProps::Shape { stroke_weight } => raw.stroke_weight = stroke_weight,
            NodeProps::Plain => {}
        }

        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_node_from_wire() {
        let node: LayerNode = serde_json::from_value(json!({
            "id": "1:2",
            "name": "Button Label",
            "type": "TEXT",
            "visible": true,
            "locked": false,
            "characters": "Submit",
            "fontSize": 14,
            "x": 10.0,
            "width": 80.0
        }))
        .unwrap();

        assert_eq!(node.node_type, NodeType::Text);
        assert_eq!(node.characters(), Some("Submit"));
        assert_eq!(node.geometry.x, Some(10.0));
        assert_eq!(node.geometry.y, None);
        match &node.props {
            NodeProps::Text { font_size, .. } => assert_eq!(font_size, &Some(json!(14))),
            other => panic!("unexpected props: {:?}", other),
        }
    }

    #[test]
    fn test_container_ignores_text_fields() {
        let node: LayerNode = serde_json::from_value(json!({
            "id": "1:1",
            "name": "Card",
            "type": "FRAME",
            "layoutMode": "VERTICAL",
            "characters": "stray"
        }))
        .unwrap();

        assert_eq!(
            node.props,
            NodeProps::Container {
                layout_mode: Some("VERTICAL".to_string()),
                item_spacing: None
            }
        );
        assert!(node.characters().is_none());
        assert!(node.visible);
    }

    #[test]
    fn test_unknown_type_is_plain_and_keeps_extra() {
        let node: LayerNode = serde_json::from_value(json!({
            "id": "3:4",
            "name": "Slice",
            "type": "SLICE",
            "rotation": 45
        }))
        .unwrap();

        assert_eq!(node.node_type, NodeType::Other("SLICE".to_string()));
        assert_eq!(node.props, NodeProps::Plain);
        assert_eq!(node.extra.get("rotation"), Some(&json!(45)));
    }

    #[test]
    fn test_serializes_flat_camel_case() {
        let mut frame = LayerNode::new("1:1", "Card", NodeType::Frame);
        frame.children.push(LayerNode::text("1:2", "Button Label", "Submit"));

        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "FRAME");
        assert_eq!(value["children"][0]["type"], "TEXT");
        assert_eq!(value["children"][0]["characters"], "Submit");
        assert!(value.get("layoutMode").is_none());
        assert_eq!(frame.node_count(), 2);
    }
}
