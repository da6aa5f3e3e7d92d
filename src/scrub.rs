use lazy_static::lazy_static;
use regex::bytes::Regex;
use std::borrow::Cow;

lazy_static! {
    static ref SCHEMA_LOCATION: Regex =
        Regex::new(r#"xsi:schemaLocation="[^"]*""#).expect("valid pattern");
}

/// Blank out `xsi:schemaLocation` attribute values in a raw chunk.
///
/// The conversion backend would otherwise try to fetch the referenced schema
/// documents when it opens the staged payload. Chunks can cover an arbitrary
/// fragment of the streamed document, so this works on bytes without parsing;
/// the engine never splits a chunk inside an attribute value.
pub(crate) fn schema_locations(chunk: &[u8]) -> Cow<'_, [u8]> {
    SCHEMA_LOCATION.replace_all(chunk, &b"xsi:schemaLocation=\"\""[..])
}
