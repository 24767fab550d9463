//! Atom element binding and HTTP plumbing for Google Data API clients.
//!
//! - [`xml`] parses and writes namespace-aware element trees.
//! - [`element`] binds those trees to typed structs declared with [`atom_element!`].
//! - [`elements`] holds the Atom syndication format elements themselves.
//! - [`http`] models requests and responses and the transport that carries them.
//! - [`mock`] provides transports for tests: record/replay, echo and fixed-response.

pub mod element;
pub mod elements;
pub mod http;
pub mod mock;
pub mod xml;

pub use element::{AtomElement, AttributeValue, Members};
pub use elements::*;
pub use xml::{XmlElement, XmlName};

#[doc(hidden)]
pub use eyre;
