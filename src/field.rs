//! Field-descriptor derivation and cache (§4.B).
//!
//! `#[derive(Mcpack)]` (in the sibling `mcpackv2_derive` crate) generates a [`Described`] impl per
//! struct that enumerates that struct's own declared fields, already carrying any
//! `#[mcpack(rename = "...")]`/`#[mcpack(omit_empty)]` options and, for `#[mcpack(embed)]` fields,
//! the promoted descriptors of the embedded type. The merge/sort/collapse rules that turn that raw
//! list into the final encode/decode plan for a type are generic and live here, computed once per
//! type and memoized for the life of the process.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::error::Result;

/// The raw, unmerged field enumeration a derive macro produces for one struct.
///
/// `depth` is 0 for a field declared directly on the struct, and increases by one each time a
/// field is promoted up through an `#[mcpack(embed)]` boundary — the stand-in for the Go source's
/// `index_path` length, used by the collapse rule to decide which of several same-named fields
/// wins.
pub struct RawFieldDescriptor<S> {
    pub name: &'static str,
    pub tag_name: Option<&'static str>,
    pub omit_empty: bool,
    pub depth: usize,
    /// Returns whether a member was actually written — `false` for an `omit_empty` field whose
    /// value was empty, so the caller can count real members rather than assuming one per
    /// descriptor.
    pub encode: Box<dyn Fn(&S, &str, &mut Encoder) -> Result<bool> + Send + Sync>,
    pub decode: Box<dyn Fn(&mut S, &mut Decoder) -> Result<()> + Send + Sync>,
}

/// Implemented by every `#[derive(Mcpack)]` struct.
pub trait Described: Sized + 'static {
    fn raw_descriptors() -> Vec<RawFieldDescriptor<Self>>;
}

/// A fully resolved, ready-to-use field descriptor: one entry in a type's encode/decode plan.
pub struct FieldDescriptor<S> {
    pub name: String,
    pub name_bytes: Vec<u8>,
    pub tagged: bool,
    encode: Box<dyn Fn(&S, &str, &mut Encoder) -> Result<bool> + Send + Sync>,
    decode: Box<dyn Fn(&mut S, &mut Decoder) -> Result<()> + Send + Sync>,
}

impl<S> FieldDescriptor<S> {
    /// Encode this field's member, if it has one. Returns whether a member was written — an
    /// `omit_empty` field holding an empty value writes nothing and returns `false`.
    pub fn encode(&self, value: &S, enc: &mut Encoder) -> Result<bool> {
        (self.encode)(value, &self.name, enc)
    }

    pub fn decode(&self, value: &mut S, dec: &mut Decoder) -> Result<()> {
        (self.decode)(value, dec)
    }

    /// Byte-equal match against a decoded wire key.
    pub fn matches_exact(&self, key: &[u8]) -> bool {
        self.name_bytes == key
    }

    /// ASCII case-insensitive match, used only as a fallback when no descriptor matches exactly.
    pub fn matches_fold(&self, key: &[u8]) -> bool {
        self.name_bytes.eq_ignore_ascii_case(key)
    }
}

struct Entry<S> {
    key_name: String,
    depth: usize,
    order: usize,
    tagged: bool,
    raw: RawFieldDescriptor<S>,
}

/// Run the derivation algorithm (§4.B steps 3-5) over one type's raw field list.
fn collect_descriptors<S: Described>() -> Vec<FieldDescriptor<S>> {
    let mut entries: Vec<Entry<S>> = S::raw_descriptors()
        .into_iter()
        .enumerate()
        .map(|(order, raw)| Entry {
            key_name: raw.tag_name.unwrap_or(raw.name).to_string(),
            depth: raw.depth,
            order,
            tagged: raw.tag_name.is_some(),
            raw,
        })
        .collect();

    // Sort lexicographically by name, then by increasing index-path length (our `depth` stand-in),
    // then tagged entries before untagged, then by declaration order (our index-path stand-in).
    entries.sort_by(|a, b| {
        a.key_name
            .cmp(&b.key_name)
            .then(a.depth.cmp(&b.depth))
            .then(b.tagged.cmp(&a.tagged))
            .then(a.order.cmp(&b.order))
    });

    let mut slots: Vec<Option<Entry<S>>> = entries.into_iter().map(Some).collect();

    let mut winners: Vec<(usize, usize)> = Vec::new(); // (slot index, sort key for re-sort)
    let mut i = 0;
    while i < slots.len() {
        let mut j = i + 1;
        while j < slots.len()
            && slots[j].as_ref().unwrap().key_name == slots[i].as_ref().unwrap().key_name
        {
            j += 1;
        }

        let min_depth = slots[i..j]
            .iter()
            .map(|e| e.as_ref().unwrap().depth)
            .min()
            .unwrap();
        let at_min: Vec<usize> = (i..j)
            .filter(|&k| slots[k].as_ref().unwrap().depth == min_depth)
            .collect();
        let tagged_at_min: Vec<usize> = at_min
            .iter()
            .copied()
            .filter(|&k| slots[k].as_ref().unwrap().tagged)
            .collect();

        let winner = if tagged_at_min.len() > 1 {
            // Two tagged entries at the same depth with the same name: conflict, drop the group.
            None
        } else if tagged_at_min.len() == 1 {
            Some(tagged_at_min[0])
        } else if at_min.len() == 1 {
            Some(at_min[0])
        } else {
            // Multiple untagged entries at the same shortest depth: conflict, drop the group.
            None
        };

        if let Some(k) = winner {
            winners.push((k, k));
        }
        i = j;
    }

    // Re-sort survivors by (depth, declaration order) for stable encoding order, mirroring the
    // distilled spec's "re-sort by index_path" step.
    winners.sort_by_key(|&(k, _)| {
        let e = slots[k].as_ref().unwrap();
        (e.depth, e.order)
    });

    winners
        .into_iter()
        .map(|(k, _)| {
            let e = slots[k].take().unwrap();
            FieldDescriptor {
                name_bytes: e.key_name.clone().into_bytes(),
                name: e.key_name,
                tagged: e.tagged,
                encode: e.raw.encode,
                decode: e.raw.decode,
            }
        })
        .collect()
}

/// A process-wide, type-keyed cache of derived descriptor lists. Entries are installed once and
/// never removed; readers never block each other, only the rare first-use installer takes the
/// write lock.
static CACHE: OnceLock<RwLock<HashMap<TypeId, &'static (dyn Any + Send + Sync)>>> =
    OnceLock::new();

/// Find the descriptor a decoded wire `key` should fill: an exact byte match wins outright; absent
/// one, a *single* case-fold match is used. If two or more descriptors case-fold match the same
/// key, the key is treated as unmatched (the field is dropped, not assigned arbitrarily) — this is
/// the one case where case-fold matching is deliberately conservative rather than best-effort.
pub fn find_match<'d, S>(descriptors: &'d [FieldDescriptor<S>], key: &[u8]) -> Option<&'d FieldDescriptor<S>> {
    if let Some(d) = descriptors.iter().find(|d| d.matches_exact(key)) {
        return Some(d);
    }
    let mut fold_matches = descriptors.iter().filter(|d| d.matches_fold(key));
    match (fold_matches.next(), fold_matches.next()) {
        (Some(d), None) => Some(d),
        _ => None,
    }
}

/// Fetch (deriving and caching on first use) the field-descriptor plan for `S`.
pub fn descriptors<S: Described>() -> &'static Vec<FieldDescriptor<S>> {
    let cache = CACHE.get_or_init(|| RwLock::new(HashMap::new()));
    let type_id = TypeId::of::<S>();

    if let Some(existing) = cache.read().unwrap().get(&type_id) {
        return existing
            .downcast_ref::<Vec<FieldDescriptor<S>>>()
            .expect("TypeId collision in field descriptor cache");
    }

    let mut write = cache.write().unwrap();
    // Another thread may have installed it while we waited for the write lock.
    if let Some(existing) = write.get(&type_id) {
        return existing
            .downcast_ref::<Vec<FieldDescriptor<S>>>()
            .expect("TypeId collision in field descriptor cache");
    }

    let computed: &'static Vec<FieldDescriptor<S>> = Box::leak(Box::new(collect_descriptors::<S>()));
    write.insert(type_id, computed as &'static (dyn Any + Send + Sync));
    computed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor<S>(name: &str) -> FieldDescriptor<S> {
        FieldDescriptor {
            name: name.to_string(),
            name_bytes: name.as_bytes().to_vec(),
            tagged: false,
            encode: Box::new(|_: &S, _: &str, _: &mut Encoder| Ok(true)),
            decode: Box::new(|_: &mut S, _: &mut Decoder| Ok(())),
        }
    }

    #[test]
    fn exact_match_wins_over_fold() {
        let descs = vec![descriptor::<()>("Name"), descriptor::<()>("name")];
        let found = find_match(&descs, b"name").unwrap();
        assert_eq!(found.name, "name");
    }

    #[test]
    fn single_fold_match_is_used() {
        let descs = vec![descriptor::<()>("Name")];
        let found = find_match(&descs, b"name").unwrap();
        assert_eq!(found.name, "Name");
    }

    #[test]
    fn two_fold_matches_drop_the_field() {
        let descs = vec![descriptor::<()>("Name"), descriptor::<()>("NAME")];
        assert!(find_match(&descs, b"name").is_none());
    }

    #[test]
    fn no_match_is_none() {
        let descs = vec![descriptor::<()>("Name")];
        assert!(find_match(&descs, b"other").is_none());
    }
}
