use std::collections::{BTreeMap, BTreeSet};

use crate::soap::{Element, Error, Result, Scoped, XmlNode, ns};

const DEFAULT_PREFIX_TOKEN: &str = "#default";
const XML_PREFIX: &str = "xml";

/// A subtree to canonicalize, the namespaces its ancestors put in scope, and
/// the prefixes that must be declared as in inclusive canonicalization.
#[derive(Debug, Clone)]
pub struct CanonicalizationContext<'a> {
    subtree: &'a Element,
    inherited: BTreeMap<String, String>,
    inclusive_prefixes: Vec<String>,
}

impl<'a> CanonicalizationContext<'a> {
    pub fn new(scoped: Scoped<'a>, inclusive_prefixes: &[&str]) -> Self {
        Self {
            subtree: scoped.element,
            inherited: scoped.inherited,
            inclusive_prefixes: inclusive_prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Context for a document root, which inherits nothing
    pub fn root(root: &'a Element, inclusive_prefixes: &[&str]) -> Self {
        Self::new(
            Scoped {
                element: root,
                inherited: BTreeMap::new(),
            },
            inclusive_prefixes,
        )
    }

    pub fn subtree(&self) -> &Element {
        self.subtree
    }

    pub fn inclusive_prefixes(&self) -> &[String] {
        &self.inclusive_prefixes
    }
}

/// Exclusive XML Canonicalization 1.0 (without comments) of the context's subtree.
pub fn canonicalize(ctx: &CanonicalizationContext<'_>) -> Result<String> {
    let inclusive: BTreeSet<&str> = ctx
        .inclusive_prefixes
        .iter()
        .map(|p| match p.as_str() {
            DEFAULT_PREFIX_TOKEN => "",
            other => other,
        })
        .collect();

    let mut out = String::new();
    write_element(
        &mut out,
        ctx.subtree,
        &ctx.inherited,
        &BTreeMap::new(),
        &inclusive,
    )?;
    Ok(out)
}

/// Parse `xml` and canonicalize its root element.
pub fn canonicalize_str(xml: impl AsRef<str>, inclusive_prefixes: &[&str]) -> Result<String> {
    let root = Element::parse(xml.as_ref())?;
    canonicalize(&CanonicalizationContext::root(&root, inclusive_prefixes))
}

fn write_element(
    out: &mut String,
    element: &Element,
    parent_scope: &BTreeMap<String, String>,
    rendered: &BTreeMap<String, String>,
    inclusive: &BTreeSet<&str>,
) -> Result<()> {
    let mut scope = parent_scope.clone();
    element.declare_into(&mut scope);

    // Prefixes visibly utilized by the element name and its attributes
    let mut utilized: BTreeSet<&str> = BTreeSet::new();
    utilized.insert(element.prefix().unwrap_or(""));
    for (name, _) in &element.attributes {
        if let Some((prefix, _)) = name.split_once(':') {
            if prefix != XML_PREFIX {
                utilized.insert(prefix);
            }
        }
    }
    for prefix in &utilized {
        if !prefix.is_empty() && !scope.contains_key(*prefix) {
            return Err(Error::UnresolvedPrefix(prefix.to_string()));
        }
    }

    let mut now_rendered = rendered.clone();
    let mut ns_decls: Vec<(&str, &str)> = Vec::new();
    for prefix in utilized.union(inclusive) {
        if *prefix == XML_PREFIX {
            continue;
        }
        let uri = scope.get(*prefix).map(String::as_str).unwrap_or("");
        let previous = rendered.get(*prefix).map(String::as_str);

        if prefix.is_empty() {
            // An undeclared default only needs xmlns="" to cancel a rendered one
            if uri != previous.unwrap_or("") {
                ns_decls.push(("", uri));
                now_rendered.insert(String::new(), uri.to_owned());
            }
        } else if !uri.is_empty() && previous != Some(uri) {
            ns_decls.push((*prefix, uri));
            now_rendered.insert(prefix.to_string(), uri.to_owned());
        }
    }

    let mut attrs: Vec<(&str, &str, &str, &str)> = Vec::with_capacity(element.attributes.len());
    for (name, value) in &element.attributes {
        let (uri, local) = match name.split_once(':') {
            Some((XML_PREFIX, local)) => (ns::XML, local),
            Some((prefix, local)) => (scope[prefix].as_str(), local),
            None => ("", name.as_str()),
        };
        attrs.push((uri, local, name, value));
    }
    attrs.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    out.push('<');
    out.push_str(&element.name);
    for (prefix, uri) in &ns_decls {
        if prefix.is_empty() {
            out.push_str(" xmlns=\"");
        } else {
            out.push_str(" xmlns:");
            out.push_str(prefix);
            out.push_str("=\"");
        }
        out.push_str(&escape_attr_value(uri));
        out.push('"');
    }
    for (_, _, name, value) in &attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attr_value(value));
        out.push('"');
    }
    out.push('>');

    for child in &element.children {
        match child {
            XmlNode::Element(child) => write_element(out, child, &scope, &now_rendered, inclusive)?,
            XmlNode::Text(text) => out.push_str(&escape_text_value(text)),
        }
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
    Ok(())
}

/// Escape attribute value per C14N rules.
fn escape_attr_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 4);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape text node value per C14N rules.
fn escape_text_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 4);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}
