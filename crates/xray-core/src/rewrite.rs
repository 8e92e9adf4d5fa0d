//! Link target rewriting for copied link-like lines.
//!
//! Every identifier-bearing key (see [`LINK_TARGET_KEYS`]) that is *present*
//! at props level, under `props.target`, under `props.obj`, on a segment, or
//! under a segment's `obj` is overwritten with the new target. A `self: true`
//! flag is cleared, since a copied link no longer points at "this record".
//! The line type and all other fields are left alone.

use serde_json::{Map, Value};

use crate::models::{LineContent, Segment};
use crate::sniff::{Payload, LINK_TARGET_KEYS};

fn clear_self(obj: &mut Map<String, Value>) {
    if obj.get("self") == Some(&Value::Bool(true)) {
        obj.insert("self".to_string(), Value::Bool(false));
    }
}

fn retarget(obj: &mut Map<String, Value>, target: &str) {
    for key in LINK_TARGET_KEYS {
        if let Some(slot) = obj.get_mut(key) {
            *slot = Value::String(target.to_string());
        }
    }
}

fn retarget_nested(obj: &mut Map<String, Value>, nested: &str, target: &str) {
    if let Some(Value::Object(inner)) = obj.get_mut(nested) {
        retarget(inner, target);
    }
}

/// Return a copy of `payload` whose link targets all point at `target`.
///
/// The input is never mutated; the output differs from it only in
/// identifier fields and `self` flags.
pub fn rewrite_link_targets(payload: &Payload<'_>, target: &str) -> LineContent {
    let props = payload.props.map(|p| {
        let mut p = p.clone();
        clear_self(&mut p);
        retarget(&mut p, target);
        retarget_nested(&mut p, "target", target);
        retarget_nested(&mut p, "obj", target);
        p
    });

    let segments = payload
        .segments
        .iter()
        .map(|seg| match seg {
            Segment::Span(span) => {
                let mut span = span.clone();
                clear_self(&mut span.fields);
                retarget(&mut span.fields, target);
                retarget_nested(&mut span.fields, "obj", target);
                Segment::Span(span)
            }
            Segment::Opaque(v) => Segment::Opaque(v.clone()),
        })
        .collect();

    LineContent {
        kind: payload.kind.to_string(),
        segments,
        props,
    }
}
