mod config;
pub mod envelope;
mod error;
mod node;
pub mod wsse;

pub use config::XmlConfig;
pub use envelope::{EnvelopeTemplate, Slot};
pub use error::Error;
pub use node::{Element, Scoped, XmlNode};

pub type Result<T> = std::result::Result<T, Error>;

pub mod ns {
    pub const SOAP_ENV: &str = "http://schemas.xmlsoap.org/soap/envelope/";
    pub const WSSE: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
    pub const WSU: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
    pub const DS: &str = "http://www.w3.org/2000/09/xmldsig#";
    pub const EC: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
    pub const ONECLICK: &str = "http://webservices.webpayserver.transbank.com/";
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
}

pub mod prefix {
    pub const SOAP: &str = "soap";
    pub const WSSE: &str = "wsse";
    pub const WSU: &str = "wsu";
    pub const DS: &str = "ds";
    pub const EC: &str = "ec";
    pub const ONECLICK: &str = "ns1";
}
