//! Namespace-resolved XML element tree.
//!
//! Capabilities documents are small enough to hold in memory, and providers
//! mix default and explicitly prefixed namespaces. Elements are therefore
//! stored with their resolved namespace URI and looked up with
//! `prefix:Local/prefix:Local` paths that go through a [`Namespaces`] table.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Reader};
use thiserror::Error;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("Invalid attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Undeclared namespace prefix: {0}")]
    UnknownPrefix(String),

    #[error("Document has no root element")]
    NoRoot,

    #[error("Document has more than one root element")]
    MultipleRoots,

    #[error("Element <{0}> is not closed")]
    Unclosed(String),
}

/// Prefix table used to resolve lookup paths.
///
/// Unprefixed path segments resolve to `default`. The prefix `none` always
/// resolves to the empty namespace, which is where bare attributes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Namespaces {
    pub default: &'static str,
    pub prefixes: &'static [(&'static str, &'static str)],
}

impl Namespaces {
    /// Split `prefix:Local` into (namespace URI, local name).
    ///
    /// Returns `None` for prefixes missing from the table.
    pub fn resolve<'a>(&self, name: &'a str) -> Option<(&'static str, &'a str)> {
        match name.split_once(':') {
            None => Some((self.default, name)),
            Some(("none", local)) => Some(("", local)),
            Some((prefix, local)) => self
                .prefixes
                .iter()
                .find(|(p, _)| *p == prefix)
                .map(|(_, uri)| (*uri, local)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Attribute {
    namespace: String,
    name: String,
    value: String,
}

/// An element with resolved namespace, attributes, children and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    namespace: String,
    name: String,
    attributes: Vec<Attribute>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    /// Parse a document and return its root element.
    pub fn parse(bytes: &[u8]) -> Result<Element, XmlError> {
        let mut reader = NsReader::from_reader(bytes);
        reader.trim_text(true).expand_empty_elements(true);

        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(start) => {
                    if stack.is_empty() && root.is_some() {
                        return Err(XmlError::MultipleRoots);
                    }
                    stack.push(start_element(&reader, &start)?);
                }
                Event::End(_) => {
                    // End names are checked by the reader
                    if let Some(element) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(element),
                            None => root = Some(element),
                        }
                    }
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&reader.decoder().decode(&data)?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(XmlError::Unclosed(open.name.clone()));
        }
        root.ok_or(XmlError::NoRoot)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn local_name(&self) -> &str {
        &self.name
    }

    /// `{namespace}Local`, the Clark notation of the element name.
    pub fn tag(&self) -> String {
        format!("{{{}}}{}", self.namespace, self.name)
    }

    /// Text content with surrounding whitespace removed.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter()
    }

    /// Whether this element has the given namespace URI and local name.
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace == namespace && self.name == local
    }

    /// Attribute value by namespace URI and local name.
    pub fn attribute(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace == namespace && a.name == local)
            .map(|a| a.value.as_str())
    }

    /// Attribute value by `prefix:name`, e.g. `xlink:href` or `none:name`.
    pub fn attr(&self, ns: &Namespaces, name: &str) -> Option<&str> {
        let (namespace, local) = ns.resolve(name)?;
        self.attribute(namespace, local)
    }

    /// All descendants matching a `/`-separated path of element names.
    pub fn findall<'e>(&'e self, ns: &Namespaces, path: &str) -> Vec<&'e Element> {
        let mut current: Vec<&Element> = vec![self];
        for step in path.split('/').filter(|s| !s.is_empty()) {
            let Some((namespace, local)) = ns.resolve(step) else {
                return Vec::new();
            };
            current = current
                .into_iter()
                .flat_map(|e| e.children.iter())
                .filter(|child| child.is(namespace, local))
                .collect();
            if current.is_empty() {
                break;
            }
        }
        current
    }

    /// First descendant matching `path`.
    pub fn find<'e>(&'e self, ns: &Namespaces, path: &str) -> Option<&'e Element> {
        self.findall(ns, path).into_iter().next()
    }

    /// Trimmed text of the first descendant matching `path`.
    pub fn findtext<'e>(&'e self, ns: &Namespaces, path: &str) -> Option<&'e str> {
        self.find(ns, path).map(Element::text)
    }

    /// Owned text of the first match, `None` when missing or empty.
    pub fn findtext_owned(&self, ns: &Namespaces, path: &str) -> Option<String> {
        self.findtext(ns, path)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

fn start_element<R>(reader: &NsReader<R>, start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let decoder = reader.decoder();
    let base_reader: &Reader<R> = reader;
    let (resolved, local) = reader.resolve_element(start.name());
    let namespace = match resolved {
        ResolveResult::Bound(ns) => decoder.decode(ns.as_ref())?.into_owned(),
        ResolveResult::Unbound => String::new(),
        ResolveResult::Unknown(prefix) => {
            return Err(XmlError::UnknownPrefix(
                String::from_utf8_lossy(&prefix).into_owned(),
            ))
        }
    };

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attr.key);
        let namespace = match resolved {
            ResolveResult::Bound(ns) => decoder.decode(ns.as_ref())?.into_owned(),
            ResolveResult::Unbound => String::new(),
            ResolveResult::Unknown(prefix) if prefix == b"xml" => XML_NAMESPACE.to_string(),
            // Attributes with undeclared prefixes are never looked up
            ResolveResult::Unknown(_) => continue,
        };
        attributes.push(Attribute {
            namespace,
            name: decoder.decode(local.as_ref())?.into_owned(),
            value: attr.decode_and_unescape_value(base_reader)?.into_owned(),
        });
    }

    Ok(Element {
        namespace,
        name: decoder.decode(local.as_ref())?.into_owned(),
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: Namespaces = Namespaces {
        default: "urn:default",
        prefixes: &[("o", "urn:other"), ("xlink", "http://www.w3.org/1999/xlink")],
    };

    const DOC: &str = r#"<?xml version="1.0"?>
<Root xmlns="urn:default" xmlns:x="urn:other" xmlns:xlink="http://www.w3.org/1999/xlink">
  <x:Title>  Hello &amp; welcome </x:Title>
  <Item name="a"><x:Identifier>first</x:Identifier></Item>
  <Item name="b" xlink:href="http://example.com/"><x:Identifier>second</x:Identifier></Item>
  <Empty/>
  <Code><![CDATA[<raw>]]></Code>
</Root>"#;

    #[test]
    fn test_resolve_prefixes() {
        assert_eq!(NS.resolve("Title"), Some(("urn:default", "Title")));
        assert_eq!(NS.resolve("o:Title"), Some(("urn:other", "Title")));
        assert_eq!(NS.resolve("none:name"), Some(("", "name")));
        assert_eq!(NS.resolve("missing:Title"), None);
    }

    #[test]
    fn test_document_prefix_differs_from_lookup_prefix() {
        let root = Element::parse(DOC.as_bytes()).unwrap();
        assert_eq!(root.tag(), "{urn:default}Root");
        // Document binds urn:other to "x", lookups use "o"
        assert_eq!(root.findtext(&NS, "o:Title"), Some("Hello & welcome"));
        assert!(root.find(&NS, "Title").is_none());
    }

    #[test]
    fn test_findall_and_attributes() {
        let root = Element::parse(DOC.as_bytes()).unwrap();
        let items = root.findall(&NS, "Item");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].attr(&NS, "none:name"), Some("a"));
        assert_eq!(items[1].attr(&NS, "xlink:href"), Some("http://example.com/"));
        assert_eq!(items[0].attr(&NS, "xlink:href"), None);

        let ids: Vec<&str> = root
            .findall(&NS, "Item/o:Identifier")
            .into_iter()
            .map(Element::text)
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_empty_element_and_cdata() {
        let root = Element::parse(DOC.as_bytes()).unwrap();
        assert_eq!(root.findtext(&NS, "Empty"), Some(""));
        assert_eq!(root.findtext_owned(&NS, "Empty"), None);
        assert_eq!(root.findtext(&NS, "Code"), Some("<raw>"));
    }

    #[test]
    fn test_declared_latin1_encoding() {
        let mut doc = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<Root xmlns=\"urn:default\" name=\"Gr".to_vec();
        doc.push(0xFC);
        doc.extend_from_slice(b"n\"><Title>Stra");
        doc.push(0xDF);
        doc.extend_from_slice(b"e</Title></Root>");

        let root = Element::parse(&doc).unwrap();
        assert_eq!(root.findtext(&NS, "Title"), Some("Straße"));
        assert_eq!(root.attr(&NS, "none:name"), Some("Grün"));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(Element::parse(b""), Err(XmlError::NoRoot)));
        assert!(matches!(
            Element::parse(b"<a><b></b>"),
            Err(XmlError::Unclosed(_))
        ));
        assert!(matches!(
            Element::parse(b"<a></a><b></b>"),
            Err(XmlError::MultipleRoots)
        ));
        assert!(Element::parse(b"<a><b></a>").is_err());
        assert!(matches!(
            Element::parse(b"<p:a></p:a>"),
            Err(XmlError::UnknownPrefix(_))
        ));
    }
}
