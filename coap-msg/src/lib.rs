//! Binary codec for CoAP messages: variable-length integers, the option
//! registry, the message packet format, and the `application/link-format`
//! grammar. No networking lives here — see `coap-core` for the endpoint.

pub mod error;
pub mod link;
pub mod message;
pub mod opt;
pub mod vlint;

pub use error::{
    DuplicateOption, LinkDecodeError, MessageBuildError, MessageDecodeError, MessageEncodeError, OptConstructError,
    OptDecodeError, OptEncodeError,
};
pub use link::{decode_resource_descriptions, LinkValue, ParamValue};
pub use message::{pack, unpack, Code, Kind, Message, MessageBuilder};
pub use opt::{Block, OptValue};

/// Symbolic names for the media-type registry (§6), for use with the
/// Content-Type option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaType(pub u8);

impl MediaType {
    pub const TEXT_PLAIN: MediaType = MediaType(0);
    pub const TEXT_XML: MediaType = MediaType(1);
    pub const TEXT_CSV: MediaType = MediaType(2);
    pub const TEXT_HTML: MediaType = MediaType(3);
    pub const IMAGE_GIF: MediaType = MediaType(21);
    pub const IMAGE_JPEG: MediaType = MediaType(22);
    pub const IMAGE_PNG: MediaType = MediaType(23);
    pub const IMAGE_TIFF: MediaType = MediaType(24);
    pub const AUDIO_RAW: MediaType = MediaType(25);
    pub const VIDEO_RAW: MediaType = MediaType(26);
    pub const APPLICATION_LINK_FORMAT: MediaType = MediaType(40);
    pub const APPLICATION_XML: MediaType = MediaType(41);
    pub const APPLICATION_OCTET_STREAM: MediaType = MediaType(42);
    pub const APPLICATION_RDF_XML: MediaType = MediaType(43);
    pub const APPLICATION_SOAP_XML: MediaType = MediaType(44);
    pub const APPLICATION_ATOM_XML: MediaType = MediaType(45);
    pub const APPLICATION_XMPP_XML: MediaType = MediaType(46);
    pub const APPLICATION_EXI: MediaType = MediaType(47);
    pub const APPLICATION_X_BXML: MediaType = MediaType(48);
    pub const APPLICATION_FASTINFOSET: MediaType = MediaType(49);
    pub const APPLICATION_SOAP_FASTINFOSET: MediaType = MediaType(50);
    pub const APPLICATION_JSON: MediaType = MediaType(51);

    /// The registered name, e.g. `"application/json"`. `None` for values
    /// outside the registry (still a legal Content-Type octet).
    pub fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            | 0 => "text/plain",
            | 1 => "text/xml",
            | 2 => "text/csv",
            | 3 => "text/html",
            | 21 => "image/gif",
            | 22 => "image/jpeg",
            | 23 => "image/png",
            | 24 => "image/tiff",
            | 25 => "audio/raw",
            | 26 => "video/raw",
            | 40 => "application/link-format",
            | 41 => "application/xml",
            | 42 => "application/octet-stream",
            | 43 => "application/rdf+xml",
            | 44 => "application/soap+xml",
            | 45 => "application/atom+xml",
            | 46 => "application/xmpp+xml",
            | 47 => "application/exi",
            | 48 => "application/x-bxml",
            | 49 => "application/fastinfoset",
            | 50 => "application/soap+fastinfoset",
            | 51 => "application/json",
            | _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_name_lookup() {
        assert_eq!(MediaType::APPLICATION_JSON.name(), Some("application/json"));
        assert_eq!(MediaType(199).name(), None);
    }
}
