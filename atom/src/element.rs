//! Declarative binding between [`XmlElement`] trees and typed structs.
//!
//! A bound struct declares, through [`atom_element!`](crate::atom_element), the tag and namespace
//! it lives at, which XML attributes map to which fields, and which child elements map to which
//! members. The traits in this module then walk those declarations in both directions. Anything a
//! struct does not declare is kept in its extension fields so that documents survive a
//! parse/serialize round trip even when they carry elements this crate knows nothing about.
//!
//! Shared sets of members that have no tag of their own (the common parts of every Atom entry,
//! for example) are declared with [`atom_members!`](crate::atom_members) and embedded into
//! elements through a `base` member.

use crate::xml::{self, XmlElement, XmlName};
use eyre::Context;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Conversion between a raw XML attribute value and a typed field.
pub trait AttributeValue: Sized {
    /// Converts a raw attribute value. Returning `None` drops the attribute.
    fn from_attribute(raw: &str) -> Option<Self>;

    fn to_attribute(&self) -> Cow<'_, str>;
}

impl AttributeValue for String {
    fn from_attribute(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }

    fn to_attribute(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

/// The bound members of a struct: its mapped attributes and child elements.
pub trait Members: Default {
    /// Stores an unqualified attribute if a field is bound to it.
    ///
    /// Returns `false` if no field claims the attribute.
    fn claim_attribute(&mut self, name: &str, value: &str) -> bool;

    /// Binds `child` to a member, handing it back if no member claims it.
    fn claim_child(&mut self, child: XmlElement) -> eyre::Result<Option<XmlElement>>;

    /// Writes every bound attribute that has a value.
    fn write_attributes(&self, element: &mut XmlElement);

    /// Writes every bound child, in declaration order.
    fn write_children(&self, element: &mut XmlElement);
}

/// A struct bound to one XML element.
pub trait AtomElement: Members {
    const NAMESPACE: &'static str;
    const TAG: &'static str;

    fn text(&self) -> Option<&str>;

    fn set_text(&mut self, text: Option<String>);

    /// Child elements no member is bound to.
    fn extension_elements(&self) -> &[XmlElement];

    fn extension_elements_mut(&mut self) -> &mut Vec<XmlElement>;

    /// Attributes no field is bound to, including all namespace-qualified ones.
    fn extension_attributes(&self) -> &BTreeMap<XmlName, String>;

    fn extension_attributes_mut(&mut self) -> &mut BTreeMap<XmlName, String>;

    /// The expanded name this type binds to.
    fn xml_name() -> XmlName {
        XmlName::new(Self::NAMESPACE, Self::TAG)
    }

    /// Binds an element tree to a new instance.
    fn from_element(element: XmlElement) -> eyre::Result<Self> {
        if !element.name.is(Self::NAMESPACE, Self::TAG) {
            eyre::bail!("expected element {}, found {}", Self::xml_name(), element.name);
        }

        let XmlElement {
            attributes,
            children,
            text,
            ..
        } = element;

        let mut this = Self::default();
        for (name, value) in attributes {
            if name.namespace.is_none() && this.claim_attribute(&name.local, &value) {
                continue;
            }
            this.extension_attributes_mut().insert(name, value);
        }
        for child in children {
            let child_name = child.name.clone();
            if let Some(unclaimed) = this
                .claim_child(child)
                .with_context(|| format!("bind child {child_name} of {}", Self::xml_name()))?
            {
                this.extension_elements_mut().push(unclaimed);
            }
        }
        this.set_text(text);
        Ok(this)
    }

    /// Rebuilds the element tree for this instance.
    fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new(Self::xml_name());
        self.write_attributes(&mut element);
        element.attributes.extend(
            self.extension_attributes()
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        self.write_children(&mut element);
        element
            .children
            .extend(self.extension_elements().iter().cloned());
        element.text = self.text().map(str::to_string);
        element
    }

    /// Parses an XML document whose root is this element.
    fn from_xml(xml: &str) -> eyre::Result<Self> {
        let element = xml::parse(xml)?;
        Self::from_element(element)
    }

    /// Serializes this element as a standalone XML document.
    fn to_xml(&self) -> eyre::Result<String> {
        xml::to_document(&self.to_element())
    }

    /// Binds the first extension element of type `T`, if any.
    ///
    /// This is how a struct reads a child that a more specific binding would have claimed, such
    /// as a service-specific element nested inside a generic Atom element.
    fn find_extension<T: AtomElement>(&self) -> eyre::Result<Option<T>> {
        self.extension_elements()
            .iter()
            .find(|e| e.name.is(T::NAMESPACE, T::TAG))
            .map(|e| T::from_element(e.clone()))
            .transpose()
    }
}

impl<T: AtomElement> Members for Box<T> {
    fn claim_attribute(&mut self, name: &str, value: &str) -> bool {
        (**self).claim_attribute(name, value)
    }

    fn claim_child(&mut self, child: XmlElement) -> eyre::Result<Option<XmlElement>> {
        (**self).claim_child(child)
    }

    fn write_attributes(&self, element: &mut XmlElement) {
        (**self).write_attributes(element)
    }

    fn write_children(&self, element: &mut XmlElement) {
        (**self).write_children(element)
    }
}

// Lets bindings refer to themselves, e.g. an entry that links to another entry of its own type.
impl<T: AtomElement> AtomElement for Box<T> {
    const NAMESPACE: &'static str = T::NAMESPACE;
    const TAG: &'static str = T::TAG;

    fn text(&self) -> Option<&str> {
        (**self).text()
    }

    fn set_text(&mut self, text: Option<String>) {
        (**self).set_text(text)
    }

    fn extension_elements(&self) -> &[XmlElement] {
        (**self).extension_elements()
    }

    fn extension_elements_mut(&mut self) -> &mut Vec<XmlElement> {
        (**self).extension_elements_mut()
    }

    fn extension_attributes(&self) -> &BTreeMap<XmlName, String> {
        (**self).extension_attributes()
    }

    fn extension_attributes_mut(&mut self) -> &mut BTreeMap<XmlName, String> {
        (**self).extension_attributes_mut()
    }

    fn from_element(element: XmlElement) -> eyre::Result<Self> {
        T::from_element(element).map(Box::new)
    }

    fn to_element(&self) -> XmlElement {
        (**self).to_element()
    }
}

/// Declares a struct holding a set of bound members, without a tag of its own.
///
/// ```ignore
/// atom_members! {
///     pub struct PersonMembers {
///         base common: CommonMembers;
///         attributes { lang: String = "lang" }
///         one { name: Name, email: Email }
///         many { link: Link }
///     }
/// }
/// ```
///
/// Every section is optional but they must appear in this order. `attributes` fields become
/// `Option<T>` where `T: AttributeValue`, `one` members become `Option<T>` and `many` members
/// become `Vec<T>` where `T: AtomElement`. Children are matched by the member type's tag and
/// namespace. A `base` struct is consulted after the struct's own members, and is reachable
/// through `Deref`.
#[macro_export]
macro_rules! atom_members {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( @extension { $($extension:tt)* } )?
            $( base $base:ident : $base_ty:ty; )?
            $( attributes {
                $( $(#[$attr_meta:meta])* $attr:ident : $attr_ty:ty = $attr_name:literal ),* $(,)?
            } )?
            $( one {
                $( $(#[$one_meta:meta])* $one:ident : $one_ty:ty ),* $(,)?
            } )?
            $( many {
                $( $(#[$many_meta:meta])* $many:ident : $many_ty:ty ),* $(,)?
            } )?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $( pub $base: $base_ty, )?
            $($( $(#[$attr_meta])* pub $attr: Option<$attr_ty>, )*)?
            $($( $(#[$one_meta])* pub $one: Option<$one_ty>, )*)?
            $($( $(#[$many_meta])* pub $many: Vec<$many_ty>, )*)?
            $($($extension)*)?
        }

        impl $crate::Members for $name {
            #[allow(unused_variables)]
            fn claim_attribute(&mut self, name: &str, value: &str) -> bool {
                $($(
                    if name == $attr_name {
                        self.$attr = <$attr_ty as $crate::AttributeValue>::from_attribute(value);
                        return true;
                    }
                )*)?
                $(
                    if $crate::Members::claim_attribute(&mut self.$base, name, value) {
                        return true;
                    }
                )?
                false
            }

            fn claim_child(
                &mut self,
                child: $crate::XmlElement,
            ) -> $crate::eyre::Result<Option<$crate::XmlElement>> {
                $($(
                    if child.name.is(
                        <$one_ty as $crate::AtomElement>::NAMESPACE,
                        <$one_ty as $crate::AtomElement>::TAG,
                    ) {
                        self.$one = Some(<$one_ty as $crate::AtomElement>::from_element(child)?);
                        return Ok(None);
                    }
                )*)?
                $($(
                    if child.name.is(
                        <$many_ty as $crate::AtomElement>::NAMESPACE,
                        <$many_ty as $crate::AtomElement>::TAG,
                    ) {
                        self.$many.push(<$many_ty as $crate::AtomElement>::from_element(child)?);
                        return Ok(None);
                    }
                )*)?
                $(
                    let child = match $crate::Members::claim_child(&mut self.$base, child)? {
                        Some(child) => child,
                        None => return Ok(None),
                    };
                )?
                Ok(Some(child))
            }

            #[allow(unused_variables)]
            fn write_attributes(&self, element: &mut $crate::XmlElement) {
                $( $crate::Members::write_attributes(&self.$base, element); )?
                $($(
                    if let Some(value) = &self.$attr {
                        element.set_attribute(
                            $attr_name,
                            <$attr_ty as $crate::AttributeValue>::to_attribute(value).into_owned(),
                        );
                    }
                )*)?
            }

            #[allow(unused_variables)]
            fn write_children(&self, element: &mut $crate::XmlElement) {
                $( $crate::Members::write_children(&self.$base, element); )?
                $($(
                    if let Some(member) = &self.$one {
                        element.children.push($crate::AtomElement::to_element(member));
                    }
                )*)?
                $($(
                    for member in &self.$many {
                        element.children.push($crate::AtomElement::to_element(member));
                    }
                )*)?
            }
        }

        $(
            impl ::std::ops::Deref for $name {
                type Target = $base_ty;

                fn deref(&self) -> &$base_ty {
                    &self.$base
                }
            }

            impl ::std::ops::DerefMut for $name {
                fn deref_mut(&mut self) -> &mut $base_ty {
                    &mut self.$base
                }
            }
        )?
    };
}

/// Declares a struct bound to the element `tag` in namespace `ns`.
///
/// The body takes the same sections as [`atom_members!`](crate::atom_members). The struct also
/// gets `text`, `extension_elements` and `extension_attributes` fields, an [`AtomElement`] impl,
/// and a `with_text` constructor.
#[macro_export]
macro_rules! atom_element {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident ($ns:expr, $tag:literal) {
            $($body:tt)*
        }
    ) => {
        $crate::atom_members! {
            $(#[$meta])*
            $vis struct $name {
                @extension {
                    /// Character data directly inside the element.
                    pub text: Option<String>,
                    /// Child elements with no bound member.
                    pub extension_elements: Vec<$crate::XmlElement>,
                    /// Attributes with no bound field.
                    pub extension_attributes: ::std::collections::BTreeMap<$crate::XmlName, String>,
                }
                $($body)*
            }
        }

        impl $crate::AtomElement for $name {
            const NAMESPACE: &'static str = $ns;
            const TAG: &'static str = $tag;

            fn text(&self) -> Option<&str> {
                self.text.as_deref()
            }

            fn set_text(&mut self, text: Option<String>) {
                self.text = text;
            }

            fn extension_elements(&self) -> &[$crate::XmlElement] {
                &self.extension_elements
            }

            fn extension_elements_mut(&mut self) -> &mut Vec<$crate::XmlElement> {
                &mut self.extension_elements
            }

            fn extension_attributes(
                &self,
            ) -> &::std::collections::BTreeMap<$crate::XmlName, String> {
                &self.extension_attributes
            }

            fn extension_attributes_mut(
                &mut self,
            ) -> &mut ::std::collections::BTreeMap<$crate::XmlName, String> {
                &mut self.extension_attributes
            }
        }

        impl $name {
            /// Creates the element with only its text set.
            #[allow(dead_code)]
            pub fn with_text(text: impl Into<String>) -> Self {
                Self {
                    text: Some(text.into()),
                    ..Default::default()
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{AtomElement, XmlElement, XmlName};
    use pretty_assertions::assert_eq;

    const NS: &str = "urn:test";

    crate::atom_element! {
        struct Leaf(NS, "leaf") {
            attributes {
                kind: String = "kind",
            }
        }
    }

    crate::atom_members! {
        struct Shared {
            one {
                label: Leaf,
            }
        }
    }

    crate::atom_element! {
        struct Tree(NS, "tree") {
            base shared: Shared;
            attributes {
                size: String = "size",
            }
            many {
                branch: Box<Tree>,
            }
        }
    }

    #[test]
    fn binds_members_and_keeps_extensions() {
        let tree = Tree::from_xml(
            r#"<tree xmlns="urn:test" xmlns:o="urn:other" size="3" colour="red" o:flag="1">
                 <leaf kind="name">oak</leaf>
                 <tree size="1"/>
                 <o:mystery>?</o:mystery>
                 <tree size="2"><leaf>inner</leaf></tree>
                 grown
               </tree>"#,
        )
        .unwrap();

        assert_eq!(tree.size.as_deref(), Some("3"));
        assert_eq!(tree.text.as_deref(), Some("grown"));
        // reached through the base members
        let label = tree.label.as_ref().unwrap();
        assert_eq!(label.kind.as_deref(), Some("name"));
        assert_eq!(label.text.as_deref(), Some("oak"));

        assert_eq!(tree.branch.len(), 2);
        assert_eq!(tree.branch[0].size.as_deref(), Some("1"));
        assert_eq!(
            tree.branch[1].label.as_ref().unwrap().text.as_deref(),
            Some("inner")
        );

        assert_eq!(tree.extension_elements.len(), 1);
        assert!(tree.extension_elements[0].name.is("urn:other", "mystery"));
        assert_eq!(
            tree.extension_attributes
                .get(&XmlName::unqualified("colour"))
                .map(String::as_str),
            Some("red")
        );
        assert_eq!(
            tree.extension_attributes
                .get(&XmlName::new("urn:other", "flag"))
                .map(String::as_str),
            Some("1")
        );
    }

    #[test]
    fn round_trips_through_xml() {
        let tree = Tree::from_xml(
            r#"<tree xmlns="urn:test" xmlns:o="urn:other" size="3" o:flag="1">
                 <o:mystery a="b">?</o:mystery>
                 <tree size="1"><leaf kind="k"/></tree>
                 <leaf>top</leaf>
               </tree>"#,
        )
        .unwrap();

        let written = tree.to_xml().unwrap();
        assert_eq!(Tree::from_xml(&written).unwrap(), tree);
    }

    #[test]
    fn writes_members_before_extensions() {
        let mut tree = Tree {
            size: Some("9".to_string()),
            ..Default::default()
        };
        tree.extension_elements
            .push(XmlElement::new(XmlName::new("urn:other", "x")));
        tree.label = Some(Leaf::with_text("top"));
        tree.branch.push(Box::new(Tree::default()));

        let element = tree.to_element();
        let names: Vec<_> = element.children.iter().map(|c| c.name.local.as_str()).collect();
        assert_eq!(names, ["leaf", "tree", "x"]);
        assert_eq!(element.attribute("size"), Some("9"));
    }

    #[test]
    fn rejects_wrong_root() {
        let err = Leaf::from_xml(r#"<tree xmlns="urn:test"/>"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected element {urn:test}leaf, found {urn:test}tree"
        );
    }

    #[test]
    fn finds_extension_elements_by_type() {
        let tree = Tree::from_xml(r#"<tree xmlns="urn:test"><x:leaf xmlns:x="urn:test"/></tree>"#)
            .unwrap();
        // claimed, so not an extension
        assert_eq!(tree.find_extension::<Leaf>().unwrap(), None);

        let mut other = Tree::default();
        other
            .extension_elements
            .push(Leaf::with_text("stray").to_element());
        assert_eq!(
            other.find_extension::<Leaf>().unwrap(),
            Some(Leaf::with_text("stray"))
        );
    }
}
