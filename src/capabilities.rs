use crate::error::Result;
use crate::formats::FormatDescriptor;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Where the advertised output formats live depends on the protocol version
/// declared on the document root.
enum Protocol {
    /// WFS 1.0.0: `ResultFormat` nodes under `GetFeature`, one empty element
    /// per format.
    Legacy,
    /// Later versions: `ows:Value` entries under the `outputFormat` parameter
    /// of the `GetFeature` operation.
    Ows,
}

struct OpenElement {
    name: Vec<u8>,
    getfeature_operation: bool,
    augment_on_close: bool,
}

/// Rewrite a GetCapabilities body so the advertised output formats include
/// every registered one, in registry order, as uppercased file extensions.
///
/// The document is streamed event by event and re-serialized; everything but
/// the inserted entries round-trips unchanged. A document without the
/// expected structure comes back unaugmented, which is not an error.
pub(crate) fn augment(body: &[u8]) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(body);
    let mut writer = Writer::new(Vec::with_capacity(body.len() + 256));
    let mut protocol: Option<Protocol> = None;
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut augmented = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if protocol.is_none() {
                    protocol = Some(detect_protocol(&e));
                }
                if let Some(proto) = &protocol {
                    stack.push(classify(proto, &stack, &e));
                }
                writer.write_event(Event::Start(e))?;
            }
            Event::End(e) => {
                if let (Some(open), Some(proto)) = (stack.pop(), &protocol) {
                    if open.augment_on_close {
                        write_format_entries(&mut writer, proto)?;
                        augmented = true;
                    }
                }
                writer.write_event(Event::End(e))?;
            }
            Event::Empty(e) => {
                let expand = match &protocol {
                    Some(proto) => classify(proto, &stack, &e).augment_on_close,
                    None => false,
                };
                if let (true, Some(proto)) = (expand, &protocol) {
                    let end = e.to_end().into_owned();
                    writer.write_event(Event::Start(e))?;
                    write_format_entries(&mut writer, proto)?;
                    augmented = true;
                    writer.write_event(Event::End(end))?;
                } else {
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    if !augmented {
        info!("no output-format node found in capabilities document");
    }
    Ok(writer.into_inner())
}

fn detect_protocol(root: &BytesStart) -> Protocol {
    // A missing version attribute is treated as a current-protocol document.
    if attr_eq(root, b"version", b"1.0.0") {
        Protocol::Legacy
    } else {
        Protocol::Ows
    }
}

fn classify(proto: &Protocol, stack: &[OpenElement], e: &BytesStart) -> OpenElement {
    let name = e.name().as_ref().to_vec();
    let mut getfeature_operation = false;
    let augment_on_close = match proto {
        Protocol::Legacy => {
            name == b"ResultFormat" && stack.iter().any(|o| o.name == b"GetFeature")
        }
        Protocol::Ows => {
            if name == b"ows:Operation" {
                getfeature_operation = attr_eq(e, b"name", b"GetFeature");
            }
            name == b"ows:Parameter"
                && attr_eq(e, b"name", b"outputFormat")
                && stack.iter().any(|o| o.name == b"ows:OperationsMetadata")
                && stack.iter().any(|o| o.getfeature_operation)
        }
    };
    OpenElement {
        name,
        getfeature_operation,
        augment_on_close,
    }
}

fn attr_eq(e: &BytesStart, name: &[u8], expected: &[u8]) -> bool {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == name {
            return attr.value.as_ref() == expected;
        }
    }
    false
}

fn write_format_entries(writer: &mut Writer<Vec<u8>>, proto: &Protocol) -> Result<()> {
    for format in FormatDescriptor::all() {
        let tag = format.file_extension.to_ascii_uppercase();
        match proto {
            Protocol::Legacy => {
                writer.write_event(Event::Empty(BytesStart::new(tag)))?;
            }
            Protocol::Ows => {
                writer.write_event(Event::Start(BytesStart::new("ows:Value")))?;
                writer.write_event(Event::Text(BytesText::new(tag.as_str())))?;
                writer.write_event(Event::End(BytesEnd::new("ows:Value")))?;
            }
        }
    }
    Ok(())
}
