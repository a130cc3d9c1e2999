use dicom::core::Tag;
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{DefaultDicomObject, InMemDicomObject};

/// Small helper trait to pull display text from different DICOM object shapes.
pub trait ElementAccess {
    /// Text form of the element's value, whatever its VR. `None` when the tag is
    /// absent or its value has no textual form (e.g. a sequence).
    fn element_text(&self, tag: Tag) -> Option<String>;
}

impl ElementAccess for DefaultDicomObject {
    fn element_text(&self, tag: Tag) -> Option<String> {
        self.element(tag)
            .ok()
            .and_then(|e| e.to_str().ok())
            .map(|s| trim_padding(&s))
    }
}

impl ElementAccess for InMemDicomObject<StandardDataDictionary> {
    fn element_text(&self, tag: Tag) -> Option<String> {
        self.element(tag)
            .ok()
            .and_then(|e| e.to_str().ok())
            .map(|s| trim_padding(&s))
    }
}

// Even-length padding is a space for text VRs and NUL for UIDs.
fn trim_padding(value: &str) -> String {
    value.trim_end_matches([' ', '\0']).to_string()
}
