//! PDF normalisation – rewrites printpdf output with `lopdf` so that equal
//! input always produces equal bytes.
//!
//! printpdf stamps documents with a random ID, creation dates and XMP
//! metadata, and names image XObjects randomly. This pass strips the
//! volatile parts, renames images in order of first use, renumbers objects
//! in traversal order and writes a fixed Info dictionary.
//!
//! Text reaches the content streams as UTF-8. The standard fonts use
//! WinAnsiEncoding, so string operands of the text-showing operators are
//! re-encoded to one byte per glyph here.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;
use lopdf::content::Content;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};

use crate::error::Result;

/// Producer string written into the Info dictionary.
pub const PRODUCER: &str = concat!("pdf-press ", env!("CARGO_PKG_VERSION"));

/// Normalise a PDF and set its title.
pub fn normalize_pdf(bytes: &[u8], title: &str) -> Result<Vec<u8>> {
    let mut doc = Document::load_mem(bytes)?;

    doc.trailer.remove(b"ID");
    doc.trailer.remove(b"Info");
    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    doc.get_object_mut(root_id)?.as_dict_mut()?.remove(b"Metadata");

    rewrite_page_content(&mut doc)?;

    let info_id = doc.add_object(dictionary! {
        "Title" => text_string(title),
        "Producer" => Object::string_literal(PRODUCER),
    });
    doc.trailer.set("Info", info_id);

    renumber_in_visit_order(&mut doc);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    debug!("Normalised PDF: {} objects, {} bytes", doc.objects.len(), out.len());
    Ok(out)
}

/// A PDF text string: literal for ASCII, UTF-16BE with BOM otherwise.
fn text_string(s: &str) -> Object {
    if s.is_ascii() {
        return Object::string_literal(s);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// WinAnsiEncoding byte for a character, if it has one.
pub(crate) fn winansi_byte(c: char) -> Option<u8> {
    let byte = match c {
        '\u{20AC}' => 0x80, // euro
        '\u{201A}' => 0x82, // single low-9 quote
        '\u{0192}' => 0x83, // florin
        '\u{201E}' => 0x84, // double low-9 quote
        '\u{2026}' => 0x85, // ellipsis
        '\u{2020}' => 0x86, // dagger
        '\u{2021}' => 0x87, // double dagger
        '\u{2030}' => 0x89, // per mille
        '\u{2039}' => 0x8B, // single left angle quote
        '\u{0152}' => 0x8C, // OE
        '\u{2018}' => 0x91, // left single quote
        '\u{2019}' => 0x92, // right single quote
        '\u{201C}' => 0x93, // left double quote
        '\u{201D}' => 0x94, // right double quote
        '\u{2022}' => 0x95, // bullet
        '\u{2013}' => 0x96, // en-dash
        '\u{2014}' => 0x97, // em-dash
        '\u{2122}' => 0x99, // trademark
        '\u{203A}' => 0x9B, // single right angle quote
        '\u{0153}' => 0x9D, // oe
        '\u{00A0}' => 0x20, // non-breaking space
        c if (c as u32) < 0x80 || (0xA0..0x100).contains(&(c as u32)) => c as u8,
        _ => return None,
    };
    Some(byte)
}

/// Encode text for a standard font; unmappable characters become `?`.
pub(crate) fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars().map(|c| winansi_byte(c).unwrap_or(b'?')).collect()
}

/// Re-encode UTF-8 string operands of text-showing operators.
fn encode_text_operands(operator: &str, operands: &mut [Object]) -> bool {
    let strings: Vec<&mut Object> = match operator {
        "Tj" | "'" => operands.last_mut().into_iter().collect(),
        "\"" => operands.get_mut(2).into_iter().collect(),
        "TJ" => match operands.first_mut() {
            Some(Object::Array(items)) => items.iter_mut().collect(),
            _ => Vec::new(),
        },
        _ => return false,
    };
    let mut changed = false;
    for object in strings {
        if let Object::String(bytes, _) = object {
            if let Ok(text) = std::str::from_utf8(bytes) {
                if !text.is_ascii() {
                    let encoded = encode_winansi(text);
                    *bytes = encoded;
                    changed = true;
                }
            }
        }
    }
    changed
}

/// Rewrite each page's content stream: encode text for WinAnsi and rename
/// image XObjects to `Im1`, `Im2`, ... in order of their first `Do` across
/// the pages. Resource dictionaries follow the new names.
fn rewrite_page_content(doc: &mut Document) -> Result<()> {
    let mut names: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();

    for (_, page_id) in doc.get_pages() {
        let mut content = Content::decode(&doc.get_page_content(page_id)?)?;
        let mut changed = false;
        for op in content.operations.iter_mut() {
            if op.operator == "Do" {
                if let Some(Object::Name(name)) = op.operands.first_mut() {
                    let next = format!("Im{}", names.len() + 1).into_bytes();
                    let renamed = names.entry(name.clone()).or_insert(next).clone();
                    *name = renamed;
                    changed = true;
                }
            } else {
                changed |= encode_text_operands(&op.operator, &mut op.operands);
            }
        }
        if changed {
            doc.change_page_content(page_id, content.encode()?)?;
        }
    }

    if names.is_empty() {
        return Ok(());
    }
    let mut shared = Vec::new();
    for object in doc.objects.values() {
        collect_xobject_refs(object, &mut shared);
    }
    for object in doc.objects.values_mut() {
        rename_in_resources(object, &names);
    }
    // XObject dictionaries stored as objects of their own
    for id in shared {
        if let Ok(Object::Dictionary(xobjects)) = doc.get_object_mut(id) {
            *xobjects = renamed_xobjects(xobjects, &names);
        }
    }
    Ok(())
}

fn collect_xobject_refs(object: &Object, out: &mut Vec<ObjectId>) {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        Object::Array(items) => {
            for item in items {
                collect_xobject_refs(item, out);
            }
            return;
        }
        _ => return,
    };
    if let Ok(Object::Reference(id)) = dict.get(b"XObject") {
        out.push(*id);
    }
    for (_, value) in dict.iter() {
        collect_xobject_refs(value, out);
    }
}

fn renamed_xobjects(xobjects: &Dictionary, names: &HashMap<Vec<u8>, Vec<u8>>) -> Dictionary {
    let mut renamed: BTreeMap<Vec<u8>, Object> = BTreeMap::new();
    for (key, value) in xobjects.iter() {
        let key = names.get(key).cloned().unwrap_or_else(|| key.clone());
        renamed.insert(key, value.clone());
    }
    let mut sorted = Dictionary::new();
    for (key, value) in renamed {
        sorted.set(key, value);
    }
    sorted
}

fn rename_in_resources(object: &mut Object, names: &HashMap<Vec<u8>, Vec<u8>>) {
    match object {
        Object::Dictionary(dict) => rename_in_dict(dict, names),
        Object::Stream(stream) => rename_in_dict(&mut stream.dict, names),
        Object::Array(items) => {
            for item in items {
                rename_in_resources(item, names);
            }
        }
        _ => {}
    }
}

fn rename_in_dict(dict: &mut Dictionary, names: &HashMap<Vec<u8>, Vec<u8>>) {
    if let Ok(Object::Dictionary(xobjects)) = dict.get_mut(b"XObject") {
        *xobjects = renamed_xobjects(xobjects, names);
    }
    for (key, value) in dict.iter_mut() {
        if key.as_slice() != b"XObject" {
            rename_in_resources(value, names);
        }
    }
}

/// Renumber objects 1..n in depth-first order from the trailer. Objects that
/// cannot be reached are dropped.
fn renumber_in_visit_order(doc: &mut Document) {
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    for (_, value) in doc.trailer.iter() {
        visit(doc, value, &mut seen, &mut order);
    }

    let ids: HashMap<ObjectId, ObjectId> = order
        .iter()
        .enumerate()
        .map(|(i, old)| (*old, (i as u32 + 1, 0)))
        .collect();

    let mut objects = BTreeMap::new();
    for old in &order {
        if let Some(mut object) = doc.objects.remove(old) {
            remap(&mut object, &ids);
            objects.insert(ids[old], object);
        }
    }
    for (_, value) in doc.trailer.iter_mut() {
        remap(value, &ids);
    }
    doc.objects = objects;
    doc.max_id = order.len() as u32;
}

fn visit(doc: &Document, object: &Object, seen: &mut HashSet<ObjectId>, order: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => {
            if seen.insert(*id) {
                order.push(*id);
                if let Some(target) = doc.objects.get(id) {
                    visit(doc, target, seen, order);
                }
            }
        }
        Object::Array(items) => {
            for item in items {
                visit(doc, item, seen, order);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                visit(doc, value, seen, order);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                visit(doc, value, seen, order);
            }
        }
        _ => {}
    }
}

fn remap(object: &mut Object, ids: &HashMap<ObjectId, ObjectId>) {
    match object {
        Object::Reference(id) => {
            if let Some(new) = ids.get(id) {
                *id = *new;
            }
        }
        Object::Array(items) => {
            for item in items {
                remap(item, ids);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                remap(value, ids);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                remap(value, ids);
            }
        }
        _ => {}
    }
}
