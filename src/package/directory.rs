//! Containers unpacked on disk.
//!
//! ```text
//! mimetype
//! META-INF/container.xml
//! 8d75ea29@3.opf
//! contents/8d75ea29@3.xhtml
//! resources/cover.png
//! ```

use std::fs;
use std::path::Path;

use super::opf::{item_location, parse_container_xml, parse_opf, write_container_xml, write_opf};
use super::{Container, Item, Package};
use crate::error::{Error, Result};
use crate::util::{basename, decode_markup, media_type_for_name};

const MIMETYPE: &str = "application/epub+zip";
const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Write every package of `container` under `dir`, creating it if needed.
pub fn write_container(container: &Container, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir.join("META-INF"))?;
    fs::write(dir.join("mimetype"), MIMETYPE)?;

    let names: Vec<&str> = container.packages.iter().map(Package::name).collect();
    fs::write(dir.join(CONTAINER_PATH), write_container_xml(&names))?;

    for package in &container.packages {
        tracing::debug!(package = %package.name(), items = package.items().len(), "writing package");
        for item in package.items() {
            let path = dir.join(item_location(item));
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, &item.data)?;
        }
        fs::write(dir.join(package.name()), write_opf(package))?;
    }
    Ok(())
}

/// Read a container previously written by [`write_container`].
pub fn read_container(dir: &Path) -> Result<Container> {
    if let Ok(mimetype) = fs::read(dir.join("mimetype"))
        && mimetype.trim_ascii() != MIMETYPE.as_bytes()
    {
        return Err(Error::InvalidPackage(format!(
            "unexpected mimetype {:?}",
            String::from_utf8_lossy(&mimetype)
        )));
    }

    let rootfiles = parse_container_xml(&fs::read(dir.join(CONTAINER_PATH))?)?;
    let mut packages = Vec::with_capacity(rootfiles.len());
    for rootfile in rootfiles {
        packages.push(read_package(dir, &rootfile)?);
    }
    Ok(Container::new(packages))
}

fn read_package(dir: &Path, rootfile: &str) -> Result<Package> {
    let opf_path = dir.join(rootfile);
    let base = opf_path.parent().unwrap_or(dir);
    let name = basename(rootfile).to_string();
    let opf = parse_opf(&decode_markup(&fs::read(&opf_path)?), &name)?;

    let mut items = Vec::with_capacity(opf.manifest.len());
    for entry in opf.manifest {
        let data = fs::read(base.join(&entry.href))?;
        let media_type = if entry.media_type.is_empty() {
            media_type_for_name(&entry.href)
                .unwrap_or("application/octet-stream")
                .to_string()
        } else {
            entry.media_type
        };
        let mut item = Item::new(basename(&entry.href), data, media_type);
        item.is_navigation = entry.properties.iter().any(|p| p == "nav");
        item.properties = entry.properties;
        items.push(item);
    }

    tracing::debug!(package = %name, items = items.len(), "read package");
    Package::new(name, items, opf.metadata)
}
