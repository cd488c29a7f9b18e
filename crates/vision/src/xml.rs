use quick_xml::events::Event;
use quick_xml::Reader;

use crate::VisionError;

/// Minimal element tree for OpenCV storage documents, which carry all their
/// data in element text.
#[derive(Debug, Clone, Default)]
pub(crate) struct XmlNode {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    fn named(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn require(&self, name: &str) -> Result<&XmlNode, VisionError> {
        self.child(name).ok_or_else(|| {
            VisionError::cascade(format!("<{}> is missing <{}>", self.name, name))
        })
    }

    pub fn text(&self) -> &str {
        self.text.trim()
    }
}

/// Parses `source` and returns a synthetic root holding the top-level elements.
pub(crate) fn parse_document(source: &str) -> Result<XmlNode, VisionError> {
    let mut reader = Reader::from_str(source);
    reader.trim_text(true);
    let mut stack = vec![XmlNode::named(String::new())];

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.push(XmlNode::named(name));
            }
            Ok(Event::Empty(empty)) => {
                let name = String::from_utf8_lossy(empty.name().as_ref()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::named(name));
                }
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| VisionError::cascade("unbalanced closing tag"))?;
                let parent = stack
                    .last_mut()
                    .ok_or_else(|| VisionError::cascade("unbalanced closing tag"))?;
                parent.children.push(node);
            }
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|e| VisionError::cascade(format!("bad text node: {e}")))?;
                if let Some(node) = stack.last_mut() {
                    if !node.text.is_empty() {
                        node.text.push(' ');
                    }
                    node.text.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(VisionError::cascade(format!(
                    "xml error at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }

    if stack.len() != 1 {
        return Err(VisionError::cascade("document ended inside an element"));
    }
    stack
        .pop()
        .ok_or_else(|| VisionError::cascade("empty document"))
}
