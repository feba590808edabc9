//! OGC capabilities document parsing.
//!
//! WMTS 1.0.0 documents are parsed into [`WmtsCapabilities`], a lazily
//! populated model of service metadata, operations, tile matrix sets and
//! layers. WMS 1.1.1 and 1.3.0 documents are parsed into [`WmsCapabilities`].

pub mod wms;
pub mod wmts;
pub mod xml;

pub use wms::{parse_wms_capabilities, ResolutionHint, WmsCapabilities, WmsLayer, WmsVersion};
pub use wmts::{
    parse_capabilities, Dimension, Layer, Placeholder, ServiceMetadata, Style, TemplatePart,
    TemplateValues, TileMatrix, TileMatrixSet, TopLeftCorner, UrlTemplate, WmtsCapabilities,
};
pub use xml::{Element, Namespaces, XmlError};
