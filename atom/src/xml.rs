//! A small namespace-aware XML element tree.
//!
//! This is the neutral representation every bound type converts through. Parsing resolves
//! prefixes into full namespace URIs, so two documents that use different prefixes for the same
//! namespace produce equal trees. Serialization picks prefixes again, preferring the ones Google
//! Data feeds conventionally use.

use eyre::Context;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Writer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefixes used when serializing well-known namespaces.
const WELL_KNOWN_PREFIXES: &[(&str, &str)] = &[
    ("http://www.w3.org/2005/Atom", "atom"),
    ("http://www.w3.org/2007/app", "app"),
    ("http://schemas.google.com/g/2005", "gd"),
    ("http://a9.com/-/spec/opensearchrss/1.0/", "openSearch"),
    ("http://a9.com/-/spec/opensearch/1.1/", "openSearch"),
    ("http://schemas.google.com/gCal/2005", "gCal"),
    ("http://schemas.google.com/acl/2007", "gAcl"),
    ("http://search.yahoo.com/mrss/", "media"),
    ("http://gdata.youtube.com/schemas/2007", "yt"),
    ("http://www.georss.org/georss", "georss"),
    ("http://www.opengis.net/gml", "gml"),
    ("http://schemas.google.com/gdata/batch", "batch"),
];

/// The expanded name of an element or attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct XmlName {
    /// Namespace URI, or `None` for names outside any namespace.
    pub namespace: Option<String>,
    pub local: String,
}

impl XmlName {
    /// Creates a name in `namespace`; an empty namespace means "no namespace".
    pub fn new(namespace: &str, local: impl Into<String>) -> Self {
        Self {
            namespace: (!namespace.is_empty()).then(|| namespace.to_string()),
            local: local.into(),
        }
    }

    /// Creates a name outside any namespace.
    pub fn unqualified(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    /// Returns true if this name is `local` in `namespace` (`""` matching no namespace).
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.local == local && self.namespace.as_deref().unwrap_or("") == namespace
    }
}

impl fmt::Display for XmlName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{{{}}}{}", namespace, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// One element of an XML document along with its whole subtree.
///
/// Mixed content is not modelled: all character data directly inside the element is joined into
/// [`XmlElement::text`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: XmlName,
    /// Attributes in document order. Namespace declarations are not included.
    pub attributes: Vec<(XmlName, String)>,
    pub children: Vec<XmlElement>,
    pub text: Option<String>,
}

impl XmlElement {
    pub fn new(name: XmlName) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// Value of the unqualified attribute `local`.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name.is("", local))
            .map(|(_, value)| value.as_str())
    }

    /// Sets the unqualified attribute `local`, replacing any existing value.
    pub fn set_attribute(&mut self, local: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(name, _)| name.is("", local)) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((XmlName::unqualified(local), value)),
        }
    }

    /// First child named `local` in `namespace`.
    pub fn child(&self, namespace: &str, local: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name.is(namespace, local))
    }

    /// All children named `local` in `namespace`.
    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children
            .iter()
            .filter(move |c| c.name.is(namespace, local))
    }

    /// Text of the first child named `local` in `namespace`.
    pub fn child_text(&self, namespace: &str, local: &str) -> Option<&str> {
        self.child(namespace, local)?.text.as_deref()
    }

    fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    /// Visits this element and all its descendants, parents first.
    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a XmlElement)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

fn owned_namespace(resolved: ResolveResult<'_>) -> eyre::Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(Namespace(namespace)) => {
            let namespace = std::str::from_utf8(namespace).context("namespace is not UTF-8")?;
            Ok(Some(namespace.to_string()))
        }
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(eyre::eyre!(
            "undeclared namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        )),
    }
}

fn open_element(
    reader: &NsReader<&[u8]>,
    namespace: Option<String>,
    start: &BytesStart<'_>,
) -> eyre::Result<XmlElement> {
    let local = std::str::from_utf8(start.local_name().as_ref())
        .context("element name is not UTF-8")?
        .to_string();
    let mut element = XmlElement::new(XmlName { namespace, local });

    for attribute in start.attributes() {
        let attribute = attribute.context("read attribute")?;
        if attribute.key.as_namespace_binding().is_some() {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attribute.key);
        let namespace = match attribute.key.prefix() {
            Some(prefix) if prefix.as_ref() == b"xml" => Some(XML_NAMESPACE.to_string()),
            _ => owned_namespace(resolved)?,
        };
        let local = std::str::from_utf8(local.as_ref())
            .context("attribute name is not UTF-8")?
            .to_string();
        let value = attribute
            .unescape_value()
            .with_context(|| format!("unescape value of attribute '{local}'"))?
            .into_owned();
        element
            .attributes
            .push((XmlName { namespace, local }, value));
    }

    Ok(element)
}

/// Parses a complete XML document into its root element.
pub fn parse(xml: &str) -> eyre::Result<XmlElement> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut open: Vec<XmlElement> = Vec::new();
    loop {
        let (resolved, event) = reader.read_resolved_event().context("parse XML")?;
        let namespace = owned_namespace(resolved)?;

        let finished = match event {
            Event::Start(start) => {
                open.push(open_element(&reader, namespace, &start)?);
                None
            }
            Event::Empty(start) => Some(open_element(&reader, namespace, &start)?),
            Event::End(_) => Some(
                open.pop()
                    .ok_or_else(|| eyre::eyre!("closing tag without matching opening tag"))?,
            ),
            Event::Text(text) => {
                if let Some(current) = open.last_mut() {
                    current.append_text(&text.unescape().context("unescape text")?);
                }
                None
            }
            Event::CData(data) => {
                if let Some(current) = open.last_mut() {
                    let data = String::from_utf8(data.into_inner().into_owned())
                        .context("CDATA section is not UTF-8")?;
                    current.append_text(&data);
                }
                None
            }
            Event::Eof => eyre::bail!("document ended before the root element was closed"),
            // declarations, comments, processing instructions and doctypes carry no data
            _ => None,
        };

        if let Some(element) = finished {
            match open.last_mut() {
                Some(parent) => parent.children.push(element),
                None => return Ok(element),
            }
        }
    }
}

/// Prefix assignment for one serialized tree.
struct Prefixes {
    /// Namespace written without a prefix on elements.
    default: Option<String>,
    /// Namespace URI to prefix, in first-use order.
    bound: Vec<(String, String)>,
}

impl Prefixes {
    fn for_tree(root: &XmlElement) -> Self {
        let mut unqualified_elements = false;
        let mut element_namespaces: Vec<&str> = Vec::new();
        let mut attribute_namespaces: Vec<&str> = Vec::new();
        root.walk(&mut |element| {
            match element.name.namespace.as_deref() {
                Some(namespace) if !element_namespaces.contains(&namespace) => {
                    element_namespaces.push(namespace)
                }
                Some(_) => {}
                None => unqualified_elements = true,
            }
            for (name, _) in &element.attributes {
                if let Some(namespace) = name.namespace.as_deref() {
                    if namespace != XML_NAMESPACE && !attribute_namespaces.contains(&namespace) {
                        attribute_namespaces.push(namespace);
                    }
                }
            }
        });

        let default = if unqualified_elements {
            None
        } else {
            root.name.namespace.clone()
        };

        let mut bound: Vec<(String, String)> = Vec::new();
        let mut generated = 0;
        let needs_prefix = element_namespaces
            .iter()
            .filter(|ns| Some(**ns) != default.as_deref())
            .chain(attribute_namespaces.iter());
        for namespace in needs_prefix {
            if bound.iter().any(|(bound_ns, _)| bound_ns == namespace) {
                continue;
            }
            let known = WELL_KNOWN_PREFIXES
                .iter()
                .find(|(known_ns, _)| known_ns == namespace)
                .map(|(_, prefix)| prefix.to_string())
                .filter(|prefix| !bound.iter().any(|(_, taken)| taken == prefix));
            let prefix = known.unwrap_or_else(|| {
                let prefix = format!("ns{generated}");
                generated += 1;
                prefix
            });
            bound.push((namespace.to_string(), prefix));
        }

        Self { default, bound }
    }

    fn prefix_of(&self, namespace: &str) -> Option<&str> {
        self.bound
            .iter()
            .find(|(bound_ns, _)| bound_ns == namespace)
            .map(|(_, prefix)| prefix.as_str())
    }

    fn element_name(&self, name: &XmlName) -> String {
        match name.namespace.as_deref() {
            None => name.local.clone(),
            Some(namespace) if Some(namespace) == self.default.as_deref() => name.local.clone(),
            Some(namespace) => match self.prefix_of(namespace) {
                Some(prefix) => format!("{prefix}:{}", name.local),
                None => name.local.clone(),
            },
        }
    }

    fn attribute_name(&self, name: &XmlName) -> String {
        match name.namespace.as_deref() {
            None => name.local.clone(),
            Some(XML_NAMESPACE) => format!("xml:{}", name.local),
            Some(namespace) => match self.prefix_of(namespace) {
                Some(prefix) => format!("{prefix}:{}", name.local),
                None => name.local.clone(),
            },
        }
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &XmlElement,
    prefixes: &Prefixes,
    is_root: bool,
) -> eyre::Result<()> {
    let name = prefixes.element_name(&element.name);
    let mut start = BytesStart::new(name.as_str());
    if is_root {
        if let Some(default) = &prefixes.default {
            start.push_attribute(("xmlns", default.as_str()));
        }
        for (namespace, prefix) in &prefixes.bound {
            let declaration = format!("xmlns:{prefix}");
            start.push_attribute((declaration.as_str(), namespace.as_str()));
        }
    }
    for (attribute, value) in &element.attributes {
        let attribute = prefixes.attribute_name(attribute);
        start.push_attribute((attribute.as_str(), value.as_str()));
    }

    let text = element.text.as_deref().filter(|text| !text.is_empty());
    if text.is_none() && element.children.is_empty() {
        writer
            .write_event(Event::Empty(start))
            .with_context(|| format!("write <{name}/>"))?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(start))
        .with_context(|| format!("write <{name}>"))?;
    if let Some(text) = text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .with_context(|| format!("write text of <{name}>"))?;
    }
    for child in &element.children {
        write_element(writer, child, prefixes, false)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(name.as_str())))
        .with_context(|| format!("write </{name}>"))?;
    Ok(())
}

/// Serializes `element` and its subtree, declaring all namespaces on the root.
pub fn to_string(element: &XmlElement) -> eyre::Result<String> {
    let prefixes = Prefixes::for_tree(element);
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, element, &prefixes, true)?;
    String::from_utf8(writer.into_inner()).context("serialized XML is not UTF-8")
}

/// Like [`to_string`], but preceded by an XML declaration.
pub fn to_document(element: &XmlElement) -> eyre::Result<String> {
    let prefixes = Prefixes::for_tree(element);
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("write XML declaration")?;
    write_element(&mut writer, element, &prefixes, true)?;
    String::from_utf8(writer.into_inner()).context("serialized XML is not UTF-8")
}
