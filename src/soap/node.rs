use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Write;
use std::str;

use color_eyre::eyre::eyre;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::soap::config::UTF8;
use crate::soap::{Error, Result, XmlConfig};

const XML_VERSION: &str = "1.0";

/// A node of an owned XML tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
}

/// An XML element with its namespace declarations kept apart from its attributes.
///
/// Names are kept qualified (`prefix:local`) exactly as written. Attribute and
/// text values are stored unescaped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// Declarations made on this element, `""` being the default namespace
    pub namespaces: Vec<(String, String)>,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

/// An element found inside a document, together with the namespaces its
/// ancestors have in scope.
#[derive(Debug, Clone)]
pub struct Scoped<'a> {
    pub element: &'a Element,
    pub inherited: BTreeMap<String, String>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Declare a namespace on this element
    pub fn with_ns(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.push((prefix.into(), uri.into()));
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text.into());
        self
    }

    fn push_text(&mut self, text: String) {
        match self.children.last_mut() {
            Some(XmlNode::Text(previous)) => previous.push_str(&text),
            _ => self.children.push(XmlNode::Text(text)),
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Attribute value by qualified name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value by local name, whatever its prefix
    pub fn attribute_local(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.rsplit(':').next() == Some(local_name))
            .map(|(_, value)| value.as_str())
    }

    /// Child elements, skipping text
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Concatenated direct text children
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// First direct child element with the given local name
    pub fn child(&self, local_name: &str) -> Option<&Element> {
        self.elements().find(|e| e.local_name() == local_name)
    }

    /// Namespace bound to `prefix` (`""` for the default) by this element
    pub fn declared(&self, prefix: &str) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|(declared, _)| declared == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// Depth-first search by local name, starting with `self`
    pub fn find(&self, local_name: &str) -> Option<&Element> {
        self.find_scoped(|e| e.local_name() == local_name)
            .map(|scoped| scoped.element)
    }

    /// Depth-first search returning the match with its inherited namespace scope
    pub fn find_scoped<P>(&self, predicate: P) -> Option<Scoped<'_>>
    where
        P: Fn(&Element) -> bool,
    {
        fn walk<'a, P>(
            element: &'a Element,
            inherited: &BTreeMap<String, String>,
            predicate: &P,
        ) -> Option<Scoped<'a>>
        where
            P: Fn(&Element) -> bool,
        {
            if predicate(element) {
                return Some(Scoped {
                    element,
                    inherited: inherited.clone(),
                });
            }
            let mut scope = inherited.clone();
            element.declare_into(&mut scope);
            element
                .elements()
                .find_map(|child| walk(child, &scope, predicate))
        }
        walk(self, &BTreeMap::new(), &predicate)
    }

    /// The element whose `Id` attribute (any prefix) equals `id`
    pub fn find_by_id(&self, id: &str) -> Option<Scoped<'_>> {
        self.find_scoped(|e| e.attribute_local("Id") == Some(id))
    }

    pub(crate) fn find_mut<P>(&mut self, predicate: &P) -> Option<&mut Element>
    where
        P: Fn(&Element) -> bool,
    {
        if predicate(self) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| match child {
            XmlNode::Element(element) => element.find_mut(predicate),
            XmlNode::Text(_) => None,
        })
    }

    /// Apply this element's namespace declarations on top of `scope`
    pub fn declare_into(&self, scope: &mut BTreeMap<String, String>) {
        for (prefix, uri) in &self.namespaces {
            scope.insert(prefix.clone(), uri.clone());
        }
    }

    /// Parse a document and return its root element.
    ///
    /// Comments, processing instructions and the XML declaration are dropped.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);
        reader.config_mut().expand_empty_elements = true;

        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(start_element(&e)?),
                Event::End(_) => {
                    let done = stack
                        .pop()
                        .ok_or_else(|| Error::Xml(eyre!("Unbalanced end tag")))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Element(done)),
                        None if root.is_none() => root = Some(done),
                        None => return Err(Error::Xml(eyre!("Multiple root elements"))),
                    }
                }
                Event::Text(e) => {
                    let raw = normalize_line_endings(str::from_utf8(&e)?);
                    let text = unescape(&raw)?;
                    match stack.last_mut() {
                        Some(parent) => parent.push_text(text.into_owned()),
                        None if text.trim().is_empty() => {}
                        None => return Err(Error::Xml(eyre!("Text outside of root element"))),
                    }
                }
                Event::CData(e) => {
                    let raw = e.into_inner();
                    let text = normalize_line_endings(str::from_utf8(&raw)?).into_owned();
                    let parent = stack
                        .last_mut()
                        .ok_or_else(|| Error::Xml(eyre!("CDATA outside of root element")))?;
                    parent.push_text(text);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::Xml(eyre!("Element '{}' is not closed", open.name)));
        }
        root.ok_or_else(|| Error::Xml(eyre!("Document has no root element")))
    }

    /// Serialize this element as a document
    pub fn to_xml(&self, config: &XmlConfig) -> Result<String> {
        let mut writer = Writer::new(Vec::new());

        if config.xml_decl {
            let decl = BytesDecl::new(XML_VERSION, Some(UTF8), None);
            writer.write_event(Event::Decl(decl))?;
        }
        write_element(&mut writer, self)?;
        Ok(String::from_utf8(writer.into_inner())?)
    }
}

fn start_element(e: &BytesStart) -> Result<Element> {
    let mut element = Element::new(str::from_utf8(e.name().as_ref())?);

    for attr in e.attributes() {
        let attr = attr?;
        let key = str::from_utf8(attr.key.as_ref())?;
        let value = normalize_attr_whitespace(str::from_utf8(&attr.value)?);
        let value = unescape(&value)?.into_owned();

        if key == "xmlns" {
            element.namespaces.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            element.namespaces.push((prefix.to_owned(), value));
        } else {
            element.attributes.push((key.to_owned(), value));
        }
    }
    Ok(element)
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (prefix, uri) in &element.namespaces {
        let key = if prefix.is_empty() {
            "xmlns".to_owned()
        } else {
            format!("xmlns:{prefix}")
        };
        start.push_attribute((key.as_str(), uri.as_str()));
    }
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    writer.write_event(Event::Start(start))?;

    for child in &element.children {
        match child {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

/// Normalize line endings to LF as an XML processor must
fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Literal whitespace in attribute values becomes a space; character
/// references are left for unescaping.
fn normalize_attr_whitespace(value: &str) -> Cow<'_, str> {
    if !value.contains(['\t', '\n', '\r']) {
        return Cow::Borrowed(value);
    }
    let value = value.replace("\r\n", " ");
    Cow::Owned(value.replace(['\t', '\n', '\r'], " "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_separates_namespaces_from_attributes() {
        let xml = r#"<?xml version="1.0"?>
            <a:root xmlns:a="urn:a" xmlns="urn:default" id="1"><child/></a:root>"#;
        let root = Element::parse(xml).unwrap();

        assert_eq!(root.name, "a:root");
        assert_eq!(root.prefix(), Some("a"));
        assert_eq!(root.local_name(), "root");
        assert_eq!(
            root.namespaces,
            vec![
                ("a".to_string(), "urn:a".to_string()),
                (String::new(), "urn:default".to_string())
            ]
        );
        assert_eq!(root.attribute("id"), Some("1"));
        assert_eq!(root.elements().count(), 1);
    }

    #[test]
    fn test_parse_unescapes_and_normalizes() {
        let xml = "<r a=\"x\r\ny&#xA;\">one &amp; two\r\nthree<![CDATA[<four>]]></r>";
        let root = Element::parse(xml).unwrap();
        assert_eq!(root.attribute("a"), Some("x y\n"));
        assert_eq!(root.text(), "one & two\nthree<four>");
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(Element::parse("<a><b></a>").is_err());
        assert!(Element::parse("<a><b></b>").is_err());
        assert!(Element::parse("</a>").is_err());
        assert!(Element::parse("").is_err());
        assert!(Element::parse("<a/><b/>").is_err());
    }

    #[test]
    fn test_find_scoped_collects_ancestor_namespaces() {
        let xml = r#"<a:root xmlns:a="urn:a"><a:mid xmlns:b="urn:b"><leaf xmlns:c="urn:c"/></a:mid></a:root>"#;
        let root = Element::parse(xml).unwrap();
        let scoped = root.find_scoped(|e| e.name == "leaf").unwrap();

        assert_eq!(scoped.element.name, "leaf");
        assert_eq!(scoped.inherited.get("a").map(String::as_str), Some("urn:a"));
        assert_eq!(scoped.inherited.get("b").map(String::as_str), Some("urn:b"));
        // the match's own declarations are not inherited
        assert!(!scoped.inherited.contains_key("c"));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let element = Element::new("p:doc")
            .with_ns("p", "urn:p")
            .with_attr("note", "a \"quoted\" <value>")
            .with_child(Element::new("p:item").with_text("1 < 2 & 3"))
            .with_child(Element::new("p:empty"));

        let xml = element.to_xml(&XmlConfig::default()).unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains("<p:empty></p:empty>"));

        let reparsed = Element::parse(&xml).unwrap();
        assert_eq!(reparsed, element);
    }

    #[test]
    fn test_attribute_local() {
        let element = Element::new("soap:Body").with_attr("wsu:Id", "Body-1");
        assert_eq!(element.attribute_local("Id"), Some("Body-1"));
        assert_eq!(element.attribute("Id"), None);
    }
}
