pub(crate) const UTF8: &str = "UTF-8";

/// Configuration for XML serialization.
///
/// Output is never indented: whitespace would become part of the signed
/// content on the receiving side.
#[derive(Debug, Clone)]
pub struct XmlConfig {
    pub xml_decl: bool,
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self { xml_decl: true }
    }
}

impl XmlConfig {
    /// Set this flag to true to include the XML declaration. Default is true.
    pub fn xml_decl(mut self, decl: bool) -> Self {
        self.xml_decl = decl;
        self
    }
}
