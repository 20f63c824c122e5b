//! OPF manifests and `META-INF/container.xml`.

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

use super::{Item, Package, PackageMetadata};
use crate::error::{Error, Result};
use crate::util::{escape_text, escape_xml, strip_bom};

/// A manifest entry as listed in an OPF document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub href: String,
    pub media_type: String,
    pub properties: Vec<String>,
}

/// Parsed OPF package document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opf {
    pub metadata: PackageMetadata,
    pub manifest: Vec<ManifestItem>,
}

/// Path of an item relative to the container root.
pub(crate) fn item_location(item: &Item) -> String {
    if item.is_markup() {
        format!("contents/{}", item.name)
    } else {
        format!("resources/{}", item.name)
    }
}

/// Render the OPF document of a package.
pub fn write_opf(package: &Package) -> String {
    let md = package.metadata();
    let text = |value: &Option<String>| escape_text(value.as_deref().unwrap_or_default());
    let publisher = md.publisher.as_ref().or(md.creator.as_ref()).cloned();
    let creator = md.creator.as_ref().or(md.publisher.as_ref()).cloned();

    let mut opf = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    opf.push_str(
        "<package xmlns=\"http://www.idpf.org/2007/opf\" xml:lang=\"en\" version=\"3.0\" \
         unique-identifier=\"pub-id\" prefix=\"cc: http://creativecommons.org/ns#\">\n",
    );
    opf.push_str("  <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n");
    opf.push_str(&format!("    <dc:title id=\"title\">{}</dc:title>\n", text(&md.title)));
    opf.push_str("    <meta property=\"title-type\" refines=\"#title\">main</meta>\n");
    opf.push_str(&format!(
        "    <dc:creator id=\"creator\" file-as=\"{}\">{}</dc:creator>\n",
        escape_xml(creator.as_deref().unwrap_or_default()),
        text(&creator)
    ));
    opf.push_str(&format!(
        "    <dc:identifier id=\"pub-id\">{}</dc:identifier>\n",
        text(&md.identifier)
    ));
    opf.push_str(&format!("    <dc:language>{}</dc:language>\n", text(&md.language)));
    opf.push_str(&format!("    <dc:publisher>{}</dc:publisher>\n", text(&publisher)));
    opf.push_str(&format!(
        "    <meta property=\"publicationMessage\">{}</meta>\n",
        text(&md.publication_message)
    ));
    if md.license_text.is_some() {
        opf.push_str(&format!("    <dc:rights>{}</dc:rights>\n", text(&md.license_text)));
    }
    opf.push_str(&format!(
        "    <link rel=\"cc:license\" href=\"{}\"/>\n",
        escape_xml(md.license_url.as_deref().unwrap_or_default())
    ));
    opf.push_str("    <meta property=\"cc:attributionURL\">http://cnx.org/contents</meta>\n");
    opf.push_str("  </metadata>\n  <manifest>\n");

    for (index, item) in package.items().iter().enumerate() {
        let id = if item.is_navigation {
            "toc".to_string()
        } else {
            format!("item-{}", index + 1)
        };
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"",
            id,
            escape_xml(&item_location(item)),
            escape_xml(&item.media_type)
        ));
        if !item.properties.is_empty() {
            opf.push_str(&format!(
                " properties=\"{}\"",
                escape_xml(&item.properties.join(" "))
            ));
        }
        opf.push_str("/>\n");
    }

    opf.push_str("  </manifest>\n</package>\n");
    opf
}

/// Parse an OPF document. `name` is used in error messages.
///
/// The publisher (or creator) and the publication message must be present;
/// an empty element counts as present.
pub fn parse_opf(content: &str, name: &str) -> Result<Opf> {
    let mut reader = Reader::from_str(content);

    let mut metadata = PackageMetadata::default();
    let mut manifest = Vec::new();
    let mut in_metadata = false;
    let mut current: Option<&'static str> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let local = local_name(e.name().as_ref()).to_vec();
                match local.as_slice() {
                    b"metadata" => in_metadata = true,
                    _ if in_metadata => {
                        current = metadata_field(&local, &e)?;
                        buf_text.clear();
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let local = local_name(e.name().as_ref()).to_vec();
                match local.as_slice() {
                    b"item" => {
                        let href = attr(&e, b"href")?.unwrap_or_default();
                        let media_type = attr(&e, b"media-type")?.unwrap_or_default();
                        let properties = attr(&e, b"properties")?
                            .map(|p| {
                                p.split(|c: char| c.is_whitespace() || c == ',')
                                    .filter(|s| !s.is_empty())
                                    .map(str::to_string)
                                    .collect()
                            })
                            .unwrap_or_default();
                        manifest.push(ManifestItem {
                            href,
                            media_type,
                            properties,
                        });
                    }
                    b"link" if in_metadata => {
                        if attr(&e, b"rel")?.as_deref() == Some("cc:license") {
                            metadata.license_url = attr(&e, b"href")?;
                        }
                    }
                    _ if in_metadata => {
                        if let Some(field) = metadata_field(&local, &e)? {
                            set_field(&mut metadata, field, String::new());
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if current.is_some() {
                    buf_text.push('&');
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    buf_text.push(';');
                }
            }
            Event::End(e) => {
                if local_name(e.name().as_ref()) == b"metadata" {
                    in_metadata = false;
                }
                if let Some(field) = current.take() {
                    let raw = std::mem::take(&mut buf_text);
                    let value = unescape(raw.trim()).map_err(quick_xml::Error::from)?;
                    set_field(&mut metadata, field, value.into_owned());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if metadata.publisher.is_none() {
        metadata.publisher = metadata.creator.clone();
    }
    let context = format!("package {name}");
    if metadata.publisher.is_none() {
        return Err(Error::missing("publisher", context));
    }
    if metadata.publication_message.is_none() {
        return Err(Error::missing("publication_message", context));
    }
    Ok(Opf { metadata, manifest })
}

fn metadata_field(local: &[u8], e: &BytesStart<'_>) -> Result<Option<&'static str>> {
    Ok(match local {
        b"title" => Some("title"),
        b"creator" => Some("creator"),
        b"publisher" => Some("publisher"),
        b"identifier" => Some("identifier"),
        b"language" => Some("language"),
        b"rights" => Some("license_text"),
        b"meta" if attr(e, b"property")?.as_deref() == Some("publicationMessage") => {
            Some("publication_message")
        }
        _ => None,
    })
}

fn set_field(metadata: &mut PackageMetadata, field: &str, value: String) {
    let slot = match field {
        "title" => &mut metadata.title,
        "creator" => &mut metadata.creator,
        "publisher" => &mut metadata.publisher,
        "identifier" => &mut metadata.identifier,
        "language" => &mut metadata.language,
        "license_text" => &mut metadata.license_text,
        "publication_message" => &mut metadata.publication_message,
        _ => return,
    };
    if slot.is_none() {
        *slot = Some(value);
    }
}

/// `META-INF/container.xml` listing one rootfile per package.
pub fn write_container_xml<S: AsRef<str>>(package_paths: &[S]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <container xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\" version=\"1.0\">\n  \
         <rootfiles>\n",
    );
    for path in package_paths {
        xml.push_str(&format!(
            "    <rootfile media-type=\"application/oebps-package+xml\" full-path=\"{}\"/>\n",
            escape_xml(path.as_ref())
        ));
    }
    xml.push_str("  </rootfiles>\n</container>\n");
    xml
}

/// Package paths listed in `META-INF/container.xml`, in order.
pub fn parse_container_xml(bytes: &[u8]) -> Result<Vec<String>> {
    let content = String::from_utf8(strip_bom(bytes).to_vec())?;
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    let mut paths = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                if let Some(path) = attr(&e, b"full-path")? {
                    paths.push(path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if paths.is_empty() {
        return Err(Error::InvalidPackage(
            "no rootfile found in container.xml".to_string(),
        ));
    }
    Ok(paths)
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attribute in e.attributes().flatten() {
        if attribute.key.as_ref() == key {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::XHTML_MEDIA_TYPE;

    fn sample() -> Package {
        Package::new(
            "8d75ea29@3.opf",
            vec![
                Item::navigation("8d75ea29@3.xhtml", b"<html/>".to_vec()),
                Item::new("e78d4f90@3.xhtml", b"<html/>".to_vec(), XHTML_MEDIA_TYPE),
                Item::new("cover.png", b"png".to_vec(), "image/png"),
            ],
            PackageMetadata {
                title: Some("Book & One".to_string()),
                publisher: Some("Rice".to_string()),
                identifier: Some("8d75ea29@3".to_string()),
                language: Some("en".to_string()),
                license_url: Some("http://creativecommons.org/licenses/by/4.0/".to_string()),
                publication_message: Some("Initial".to_string()),
                ..PackageMetadata::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_opf_round_trip() {
        let package = sample();
        let opf = parse_opf(&write_opf(&package), package.name()).unwrap();
        let mut expected = package.metadata().clone();
        expected.creator = Some("Rice".to_string());
        assert_eq!(opf.metadata, expected);
        assert_eq!(
            opf.manifest,
            vec![
                ManifestItem {
                    href: "contents/8d75ea29@3.xhtml".to_string(),
                    media_type: XHTML_MEDIA_TYPE.to_string(),
                    properties: vec!["nav".to_string()],
                },
                ManifestItem {
                    href: "contents/e78d4f90@3.xhtml".to_string(),
                    media_type: XHTML_MEDIA_TYPE.to_string(),
                    properties: vec![],
                },
                ManifestItem {
                    href: "resources/cover.png".to_string(),
                    media_type: "image/png".to_string(),
                    properties: vec![],
                },
            ]
        );
    }

    #[test]
    fn test_missing_publication_message() {
        let opf = r#"<package xmlns="http://www.idpf.org/2007/opf">
            <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
              <dc:publisher>Rice</dc:publisher>
            </metadata><manifest/></package>"#;
        let err = parse_opf(opf, "p.opf").unwrap_err();
        assert!(matches!(
            err,
            Error::MissingMetadata { field: "publication_message", .. }
        ));
    }

    #[test]
    fn test_empty_elements_count_as_present() {
        let opf = r#"<package xmlns="http://www.idpf.org/2007/opf">
            <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
              <dc:publisher></dc:publisher>
              <meta property="publicationMessage"/>
            </metadata><manifest/></package>"#;
        let parsed = parse_opf(opf, "p.opf").unwrap();
        assert_eq!(parsed.metadata.publisher.as_deref(), Some(""));
        assert_eq!(parsed.metadata.publication_message.as_deref(), Some(""));
    }

    #[test]
    fn test_container_xml() {
        let xml = write_container_xml(&["a.opf", "b&c.opf"]);
        assert_eq!(parse_container_xml(xml.as_bytes()).unwrap(), vec!["a.opf", "b&c.opf"]);
        assert!(parse_container_xml(b"<container/>").is_err());
    }

    #[test]
    fn test_metadata_text_keeps_inner_whitespace() {
        let opf = r#"<package xmlns="http://www.idpf.org/2007/opf">
            <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
              <dc:title>
                Book &amp; One &#233;t&#xE9;
              </dc:title>
              <dc:publisher>Rice &lt;Univ&gt;</dc:publisher>
              <meta property="publicationMessage">A &quot;first&quot; cut</meta>
            </metadata><manifest>
              <item href="contents/a&amp;b.xhtml" media-type="application/xhtml+xml"/>
            </manifest></package>"#;
        let parsed = parse_opf(opf, "p.opf").unwrap();
        assert_eq!(parsed.metadata.title.as_deref(), Some("Book & One été"));
        assert_eq!(parsed.metadata.publisher.as_deref(), Some("Rice <Univ>"));
        assert_eq!(
            parsed.metadata.publication_message.as_deref(),
            Some("A \"first\" cut")
        );
        assert_eq!(parsed.manifest[0].href, "contents/a&b.xhtml");
    }

    #[test]
    fn test_unknown_entity_is_an_error() {
        let opf = r#"<package><metadata><dc:title>&bogus;</dc:title></metadata></package>"#;
        assert!(matches!(parse_opf(opf, "p.opf"), Err(Error::Xml(_))));
    }
}
