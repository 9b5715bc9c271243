//! Document outline (bookmark) reading.
//!
//! Bookmarks are walked in pre-order, following `/First` and `/Next`.
//! Each one is resolved to a page and, for `/XYZ` destinations, a point on
//! that page. Named destinations are looked up in the catalog's `/Names`
//! tree, falling back to the older `/Dests` dictionary.

use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Object, ObjectId};

use super::backend::{convert_object, decode_pdf_string, get_number_from_value};

/// Deepest bookmark nesting followed before giving up on a subtree.
const MAX_DEPTH: usize = 64;

/// A bookmark resolved to a page location.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineTarget {
    pub title: String,
    /// The destination name, or a description of the explicit destination.
    pub dest: String,
    /// 0-based page index.
    pub page: usize,
    /// `/XYZ` left coordinate; `None` when unspecified.
    pub left: Option<f32>,
    /// `/XYZ` top coordinate; `None` when unspecified.
    pub top: Option<f32>,
}

/// Read every resolvable bookmark in document order.
///
/// Bookmarks whose destination is missing, points outside the document or
/// is not an `/XYZ` destination are skipped with a warning.
pub fn read_outlines(doc: &lopdf::Document) -> Vec<OutlineTarget> {
    let reader = OutlineReader::new(doc);
    let mut out = Vec::new();

    let Some(catalog) = reader.catalog() else {
        return out;
    };
    let Some(first) = catalog
        .get(b"Outlines")
        .ok()
        .and_then(|o| reader.resolve(o).as_dict().ok())
        .and_then(|root| root.get(b"First").ok())
    else {
        return out;
    };

    let mut visited = HashSet::new();
    reader.walk(first, 0, &mut visited, &mut out);
    out
}

struct OutlineReader<'a> {
    doc: &'a lopdf::Document,
    page_index: HashMap<ObjectId, usize>,
}

impl<'a> OutlineReader<'a> {
    fn new(doc: &'a lopdf::Document) -> Self {
        let page_index = doc
            .get_pages()
            .into_iter()
            .map(|(number, id)| (id, number as usize - 1))
            .collect();
        Self { doc, page_index }
    }

    fn resolve(&self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            other => other,
        }
    }

    fn catalog(&self) -> Option<&'a Dictionary> {
        let root = self.doc.trailer.get(b"Root").ok()?;
        self.resolve(root).as_dict().ok()
    }

    /// Visit `item` and its siblings, descending into children first.
    fn walk(
        &self,
        item: &'a Object,
        depth: usize,
        visited: &mut HashSet<ObjectId>,
        out: &mut Vec<OutlineTarget>,
    ) {
        if depth > MAX_DEPTH {
            log::warn!("outline nesting deeper than {} levels; truncating", MAX_DEPTH);
            return;
        }

        let mut current = Some(item);
        while let Some(obj) = current {
            if let Object::Reference(id) = obj {
                if !visited.insert(*id) {
                    log::warn!("outline item {:?} visited twice; stopping", id);
                    return;
                }
            }
            let Ok(dict) = self.resolve(obj).as_dict() else {
                return;
            };

            if let Some(target) = self.target(dict) {
                out.push(target);
            }
            if let Ok(child) = dict.get(b"First") {
                self.walk(child, depth + 1, visited, out);
            }
            current = dict.get(b"Next").ok();
        }
    }

    fn target(&self, item: &'a Dictionary) -> Option<OutlineTarget> {
        let title = match item.get(b"Title").map(|o| self.resolve(o)) {
            Ok(Object::String(bytes, _)) => decode_pdf_string(bytes),
            _ => String::new(),
        };

        let dest = match item.get(b"Dest") {
            Ok(dest) => dest,
            Err(_) => self.action_dest(item)?,
        };

        let (label, explicit) = match self.resolve(dest) {
            Object::Array(arr) => (None, arr.as_slice()),
            Object::Name(name) | Object::String(name, _) => {
                let name = String::from_utf8_lossy(name).into_owned();
                let Some(arr) = self.named_dest(name.as_bytes()) else {
                    log::warn!("outline '{}': unknown named destination '{}'", title, name);
                    return None;
                };
                (Some(name), arr)
            }
            other => {
                log::warn!("outline '{}': unsupported destination {:?}", title, other);
                return None;
            }
        };

        let (page, left, top) = self.explicit_dest(&title, explicit)?;
        Some(OutlineTarget {
            dest: label.unwrap_or_else(|| format!("page {} /XYZ", page + 1)),
            title,
            page,
            left,
            top,
        })
    }

    /// The `/D` entry of a `/GoTo` action.
    fn action_dest(&self, item: &'a Dictionary) -> Option<&'a Object> {
        let action = self.resolve(item.get(b"A").ok()?).as_dict().ok()?;
        match action.get(b"S") {
            Ok(Object::Name(s)) if s == b"GoTo" => action.get(b"D").ok(),
            _ => None,
        }
    }

    /// `[page /XYZ left top zoom]` into a page index and optional point.
    fn explicit_dest(
        &self,
        title: &str,
        dest: &[Object],
    ) -> Option<(usize, Option<f32>, Option<f32>)> {
        let page = match dest.first()? {
            Object::Reference(id) => match self.page_index.get(id) {
                Some(&page) => page,
                None => {
                    log::warn!("outline '{}': {:?} is not a page", title, id);
                    return None;
                }
            },
            Object::Integer(n) => usize::try_from(*n).ok()?,
            other => {
                log::warn!("outline '{}': bad destination page {:?}", title, other);
                return None;
            }
        };
        if page >= self.page_index.len() {
            log::warn!("outline '{}': page {} out of range", title, page + 1);
            return None;
        }

        match dest.get(1) {
            Some(Object::Name(kind)) if kind == b"XYZ" => {}
            Some(Object::Name(kind)) => {
                log::warn!(
                    "outline '{}': ignoring /{} destination",
                    title,
                    String::from_utf8_lossy(kind)
                );
                return None;
            }
            _ => return None,
        }

        let coord = |i: usize| {
            dest.get(i)
                .map(convert_object)
                .as_ref()
                .and_then(get_number_from_value)
        };
        Some((page, coord(2), coord(3)))
    }

    /// Look up a named destination, new-style name tree first.
    fn named_dest(&self, name: &[u8]) -> Option<&'a [Object]> {
        let catalog = self.catalog()?;

        let from_tree = catalog
            .get(b"Names")
            .ok()
            .and_then(|o| self.resolve(o).as_dict().ok())
            .and_then(|names| names.get(b"Dests").ok())
            .and_then(|o| self.resolve(o).as_dict().ok())
            .and_then(|tree| self.name_tree_lookup(tree, name, 0));

        let value = from_tree.or_else(|| {
            catalog
                .get(b"Dests")
                .ok()
                .and_then(|o| self.resolve(o).as_dict().ok())
                .and_then(|dests| dests.get(name).ok())
        })?;

        self.dest_array(value)
    }

    /// A destination value is either the array itself or a dictionary
    /// holding it under `/D`.
    fn dest_array(&self, value: &'a Object) -> Option<&'a [Object]> {
        match self.resolve(value) {
            Object::Array(arr) => Some(arr.as_slice()),
            Object::Dictionary(dict) => match self.resolve(dict.get(b"D").ok()?) {
                Object::Array(arr) => Some(arr.as_slice()),
                _ => None,
            },
            _ => None,
        }
    }

    fn name_tree_lookup(
        &self,
        node: &'a Dictionary,
        name: &[u8],
        depth: usize,
    ) -> Option<&'a Object> {
        if depth > MAX_DEPTH {
            return None;
        }

        if let Ok(pairs) = node.get(b"Names").map(|o| self.resolve(o)).and_then(Object::as_array) {
            for pair in pairs.chunks_exact(2) {
                if let Object::String(key, _) = self.resolve(&pair[0]) {
                    if key == name {
                        return Some(&pair[1]);
                    }
                }
            }
        }

        let kids = node.get(b"Kids").map(|o| self.resolve(o)).and_then(Object::as_array).ok()?;
        kids.iter()
            .filter_map(|kid| self.resolve(kid).as_dict().ok())
            .find_map(|kid| self.name_tree_lookup(kid, name, depth + 1))
    }
}
