use std::collections::{hash_map::Entry, HashMap};

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use url::Url;

use crate::{compiler::*, root::Resource, util::*, SchemaIndex, Schemas};

const POS_SELF: u8 = 1 << 0;
const POS_PROP: u8 = 1 << 1;
const POS_ITEM: u8 = 1 << 2;

pub(crate) static DRAFT4: Lazy<DraftImpl> = Lazy::new(|| DraftImpl {
    version: 4,
    id: "id",
    subschemas: HashMap::from([
        // type agnostic
        ("definitions", POS_PROP),
        ("not", POS_SELF),
        ("allOf", POS_ITEM),
        ("anyOf", POS_ITEM),
        ("oneOf", POS_ITEM),
        // object
        ("properties", POS_PROP),
        ("additionalProperties", POS_SELF),
        ("patternProperties", POS_PROP),
        // array
        ("items", POS_SELF | POS_ITEM),
        ("additionalItems", POS_SELF),
        ("dependencies", POS_PROP),
    ]),
    vocab_prefix: "",
    all_vocabs: vec![],
    default_vocabs: vec![],
});

pub(crate) static DRAFT6: Lazy<DraftImpl> = Lazy::new(|| {
    let mut subschemas = DRAFT4.subschemas.clone();
    subschemas.extend([("propertyNames", POS_SELF), ("contains", POS_SELF)]);
    DraftImpl {
        version: 6,
        id: "$id",
        subschemas,
        vocab_prefix: "",
        all_vocabs: vec![],
        default_vocabs: vec![],
    }
});

pub(crate) static DRAFT7: Lazy<DraftImpl> = Lazy::new(|| {
    let mut subschemas = DRAFT6.subschemas.clone();
    subschemas.extend([("if", POS_SELF), ("then", POS_SELF), ("else", POS_SELF)]);
    DraftImpl {
        version: 7,
        id: "$id",
        subschemas,
        vocab_prefix: "",
        all_vocabs: vec![],
        default_vocabs: vec![],
    }
});

pub(crate) static DRAFT2019: Lazy<DraftImpl> = Lazy::new(|| {
    let mut subschemas = DRAFT7.subschemas.clone();
    subschemas.extend([
        ("$defs", POS_PROP),
        ("dependentSchemas", POS_PROP),
        ("unevaluatedProperties", POS_SELF),
        ("unevaluatedItems", POS_SELF),
        ("contentSchema", POS_SELF),
    ]);
    DraftImpl {
        version: 2019,
        id: "$id",
        subschemas,
        vocab_prefix: "https://json-schema.org/draft/2019-09/vocab/",
        all_vocabs: vec![
            "core",
            "applicator",
            "validation",
            "meta-data",
            "format",
            "content",
        ],
        default_vocabs: vec!["core", "applicator", "validation"],
    }
});

pub(crate) static DRAFT2020: Lazy<DraftImpl> = Lazy::new(|| {
    let mut subschemas = DRAFT2019.subschemas.clone();
    subschemas.extend([("prefixItems", POS_ITEM)]);
    DraftImpl {
        version: 2020,
        id: "$id",
        subschemas,
        vocab_prefix: "https://json-schema.org/draft/2020-12/vocab/",
        all_vocabs: vec![
            "core",
            "applicator",
            "unevaluated",
            "validation",
            "meta-data",
            "format-annotation",
            "format-assertion",
            "content",
        ],
        default_vocabs: vec!["core", "applicator", "unevaluated", "validation"],
    }
});

pub(crate) static STD_METASCHEMAS: Lazy<Schemas> =
    Lazy::new(|| load_std_metaschemas().expect("std metaschemas must be compilable"));

pub(crate) fn latest() -> &'static DraftImpl {
    crate::Draft::default().internal()
}

/// Public enum naming the five supported drafts. [`DraftImpl`] (below) carries
/// the actual per-draft compile-time tables; this type is just the stable,
/// user-facing handle selected via [`crate::Compiler::set_default_draft`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Draft {
    V4,
    V6,
    V7,
    V2019_09,
    #[default]
    V2020_12,
}

impl Draft {
    pub(crate) fn internal(&self) -> &'static DraftImpl {
        match self {
            Draft::V4 => &DRAFT4,
            Draft::V6 => &DRAFT6,
            Draft::V7 => &DRAFT7,
            Draft::V2019_09 => &DRAFT2019,
            Draft::V2020_12 => &DRAFT2020,
        }
    }

    pub(crate) fn from_version(version: usize) -> Option<Self> {
        match version {
            4 => Some(Draft::V4),
            6 => Some(Draft::V6),
            7 => Some(Draft::V7),
            2019 => Some(Draft::V2019_09),
            2020 => Some(Draft::V2020_12),
            _ => None,
        }
    }
}

// --

pub(crate) struct DraftImpl {
    pub(crate) version: usize,
    id: &'static str,
    subschemas: HashMap<&'static str, u8>,
    pub(crate) vocab_prefix: &'static str,
    pub(crate) all_vocabs: Vec<&'static str>,
    pub(crate) default_vocabs: Vec<&'static str>,
}

impl DraftImpl {
    pub(crate) fn from_url(url: &str) -> Option<&'static DraftImpl> {
        let (mut url, fragment) = split(url);
        if !fragment.is_empty() {
            return None;
        }
        if let Some(s) = url.strip_prefix("http://") {
            url = s;
        }
        if let Some(s) = url.strip_prefix("https://") {
            url = s;
        }
        match url {
            "json-schema.org/schema" => Some(latest()),
            "json-schema.org/draft/2020-12/schema" => Some(&DRAFT2020),
            "json-schema.org/draft/2019-09/schema" => Some(&DRAFT2019),
            "json-schema.org/draft-07/schema" => Some(&DRAFT7),
            "json-schema.org/draft-06/schema" => Some(&DRAFT6),
            "json-schema.org/draft-04/schema" => Some(&DRAFT4),
            _ => None,
        }
    }

    pub(crate) fn get_schema(&self) -> Option<SchemaIndex> {
        let loc = match self.version {
            2020 => Some("https://json-schema.org/draft/2020-12/schema#"),
            2019 => Some("https://json-schema.org/draft/2019-09/schema#"),
            7 => Some("http://json-schema.org/draft-07/schema#"),
            6 => Some("http://json-schema.org/draft-06/schema#"),
            4 => Some("http://json-schema.org/draft-04/schema#"),
            _ => None,
        };
        loc.and_then(|loc| STD_METASCHEMAS.index_by_loc(loc))
    }

    fn get_id<'a>(&self, obj: &'a Map<String, Value>) -> Option<&'a Value> {
        if self.version < 2019 {
            if obj.contains_key("$ref") {
                None // All other properties in a "$ref" object MUST be ignored
            } else {
                match obj.get(self.id) {
                    Some(Value::String(id)) if id.starts_with('#') => None, // anchor only
                    id => id,
                }
            }
        } else {
            obj.get(self.id)
        }
    }

    // collects anchors/dynamic_anchors from `sch` into `res`.
    // note this does not collect from subschemas in sch.
    fn collect_anchors(
        &self,
        sch: &Value,
        ptr: &JsonPointer,
        res: &mut Resource,
        root_url: &Url,
    ) -> Result<(), CompileError> {
        let Value::Object(obj) = sch else {
            return Ok(());
        };

        let mut add_anchor = |anchor: Anchor| -> Result<(), CompileError> {
            match res.anchors.entry(anchor) {
                Entry::Occupied(entry) => Err(CompileError::DuplicateAnchor {
                    url: root_url.as_str().to_owned(),
                    anchor: entry.key().to_string(),
                    ptr1: entry.get().to_string(),
                    ptr2: ptr.to_string(),
                }),
                entry => {
                    entry.or_insert(ptr.clone());
                    Ok(())
                }
            }
        };

        if self.version < 2019 {
            if obj.contains_key("$ref") {
                return Ok(()); // All other properties in a "$ref" object MUST be ignored
            }
            // anchor is specified in id
            if let Some(Value::String(id)) = obj.get(self.id) {
                let (_, frag) = split(id);
                if frag.is_empty() || frag.starts_with('/') {
                    return Ok(()); // plain id, or a json-pointer fragment (not an anchor)
                }
                let Ok(anchor) = percent_decode(frag) else {
                    let mut url = root_url.clone();
                    url.set_fragment(Some(ptr.as_str()));
                    return Err(CompileError::ParseAnchorError { loc: url.into() });
                };
                add_anchor(Anchor(anchor))?;
                return Ok(());
            }
        }
        if self.version >= 2019 {
            if let Some(Value::String(anchor)) = obj.get("$anchor") {
                add_anchor(Anchor(anchor.clone()))?;
            }
        }
        if self.version >= 2020 {
            if let Some(Value::String(anchor)) = obj.get("$dynamicAnchor") {
                add_anchor(Anchor(anchor.clone()))?;
                res.dynamic_anchors.insert(Anchor(anchor.clone()));
            }
        }
        Ok(())
    }

    // error is json-ptr to invalid id
    pub(crate) fn collect_resources(
        &self,
        sch: &Value,
        base: &Url, // base of json
        ptr: JsonPointer,
        root_url: &Url,
        resources: &mut HashMap<JsonPointer, Resource>,
    ) -> Result<(), CompileError> {
        if let Value::Bool(_) = sch {
            if ptr.is_empty() {
                // root resource
                resources.insert(ptr.clone(), Resource::new(ptr, base.clone()));
            }
            return Ok(());
        }

        let Value::Object(obj) = sch else {
            return Ok(());
        };

        let id = self.get_id(obj);

        let mut base = base;
        let tmp;
        if let Some(Value::String(id)) = id {
            let (id, _) = split(id);
            let Ok(id) = base.join(id) else {
                let mut url = base.clone();
                url.set_fragment(Some(ptr.as_str()));
                return Err(CompileError::ParseIdError { loc: url.into() });
            };
            if let Some(existing) = resources.values().find(|r| r.id == id && r.ptr != ptr) {
                return Err(CompileError::DuplicateId {
                    url: root_url.as_str().to_owned(),
                    id: id.to_string(),
                    ptr1: existing.ptr.to_string(),
                    ptr2: ptr.to_string(),
                });
            }
            resources.insert(ptr.clone(), Resource::new(ptr.clone(), id.clone()));
            tmp = id;
            base = &tmp;
        } else if ptr.is_empty() {
            // root resource
            resources.insert(ptr.clone(), Resource::new(ptr.clone(), base.clone()));
        }

        // collect anchors
        if let Some(res) = resources.values_mut().find(|res| res.id == *base) {
            self.collect_anchors(sch, &ptr, res, root_url)?;
        } else {
            debug_assert!(false, "base resource must exist");
        }

        for (&kw, &pos) in &self.subschemas {
            let Some(v) = obj.get(kw) else {
                continue;
            };
            if pos & POS_SELF != 0 {
                let ptr = ptr.append(kw);
                self.collect_resources(v, base, ptr, root_url, resources)?;
            }
            if pos & POS_ITEM != 0 {
                if let Value::Array(arr) = v {
                    for (i, item) in arr.iter().enumerate() {
                        let ptr = ptr.append2(kw, &i.to_string());
                        self.collect_resources(item, base, ptr, root_url, resources)?;
                    }
                }
            }
            if pos & POS_PROP != 0 {
                if let Value::Object(obj) = v {
                    for (pname, pvalue) in obj {
                        let ptr = ptr.append2(kw, pname);
                        self.collect_resources(pvalue, base, ptr, root_url, resources)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn load_std_metaschemas() -> Result<Schemas, CompileError> {
    let mut schemas = Schemas::new();
    let mut compiler = Compiler::new();
    compiler.enable_format_assertions();
    for url in [
        "https://json-schema.org/draft/2020-12/schema",
        "https://json-schema.org/draft/2019-09/schema",
        "http://json-schema.org/draft-07/schema",
        "http://json-schema.org/draft-06/schema",
        "http://json-schema.org/draft-04/schema",
    ] {
        compiler.compile(url, &mut schemas)?;
    }
    Ok(schemas)
}

#[cfg(test)]
mod tests {
    use crate::{Compiler, Schemas};

    use super::*;

    #[test]
    fn test_meta() {
        let mut schemas = Schemas::default();
        let mut compiler = Compiler::default();
        let v: Value = serde_json::from_str(include_str!("metaschemas/draft-04/schema")).unwrap();
        let url = "https://json-schema.org/draft-04/schema";
        compiler.add_resource(url, v).unwrap();
        compiler.compile(url, &mut schemas).unwrap();
    }

    #[test]
    fn test_from_url() {
        let tests = [
            ("http://json-schema.org/draft/2020-12/schema", Some(2020)), // http url
            ("https://json-schema.org/draft/2020-12/schema", Some(2020)), // https url
            ("https://json-schema.org/schema", Some(latest().version)),  // latest
            ("https://json-schema.org/draft-04/schema", Some(4)),
        ];
        for (url, version) in tests {
            let got = DraftImpl::from_url(url).map(|d| d.version);
            assert_eq!(got, version, "for {url}");
        }
    }

    #[test]
    fn test_collect_ids() {
        let url = Url::parse("http://a.com/schema.json").unwrap();
        let json: Value = serde_json::from_str(
            r#"{
                "id": "http://a.com/schemas/schema.json",
                "definitions": {
                    "s1": { "id": "http://a.com/definitions/s1" },
                    "s2": {
                        "id": "../s2",
                        "items": [
                            { "id": "http://c.com/item" },
                            { "id": "http://d.com/item" }
                        ]
                    },
                    "s3": {
                        "definitions": {
                            "s1": {
                                "id": "s3",
                                "items": {
                                    "id": "http://b.com/item"
                                }
                            }
                        }
                    },
                    "s4": { "id": "http://e.com/def#abcd" }
                }
            }"#,
        )
        .unwrap();

        let want = {
            let mut m = HashMap::new();
            m.insert("", "http://a.com/schemas/schema.json"); // root with id
            m.insert("/definitions/s1", "http://a.com/definitions/s1");
            m.insert("/definitions/s2", "http://a.com/s2"); // relative id
            m.insert("/definitions/s3/definitions/s1", "http://a.com/schemas/s3");
            m.insert("/definitions/s3/definitions/s1/items", "http://b.com/item");
            m.insert("/definitions/s2/items/0", "http://c.com/item");
            m.insert("/definitions/s2/items/1", "http://d.com/item");
            m.insert("/definitions/s4", "http://e.com/def"); // id with fragments
            m
        };
        let mut got = HashMap::new();
        DRAFT4
            .collect_resources(&json, &url, JsonPointer::from(""), &url, &mut got)
            .unwrap();
        let got = got
            .iter()
            .map(|(k, v)| (k.as_str(), v.id.as_str()))
            .collect::<HashMap<&str, &str>>();
        assert_eq!(got, want);
    }

    #[test]
    fn test_collect_anchors() {
        let url = Url::parse("http://a.com/schema.json").unwrap();
        let json: Value = serde_json::from_str(
            r#"{
                "$defs": {
                    "s2": {
                        "$id": "http://b.com",
                        "$anchor": "b1",
                        "items": [
                            { "$anchor": "b2" },
                            {
                                "$id": "http//c.com",
                                "items": [
                                    {"$anchor": "c1"},
                                    {"$dynamicAnchor": "c2"}
                                ]
                            },
                            { "$dynamicAnchor": "b3" }
                        ]
                    }
                }
            }"#,
        )
        .unwrap();
        let mut resources = HashMap::new();
        DRAFT2020
            .collect_resources(&json, &url, JsonPointer::from(""), &url, &mut resources)
            .unwrap();
        assert!(resources.get("").unwrap().anchors.is_empty());
        assert_eq!(resources.get("/$defs/s2").unwrap().anchors, {
            let mut want = HashMap::new();
            want.insert(Anchor::from("b1"), JsonPointer::from("/$defs/s2"));
            want.insert(Anchor::from("b2"), JsonPointer::from("/$defs/s2/items/0"));
            want.insert(Anchor::from("b3"), JsonPointer::from("/$defs/s2/items/2"));
            want
        });
        assert_eq!(resources.get("/$defs/s2/items/1").unwrap().anchors, {
            let mut want = HashMap::new();
            want.insert(Anchor::from("c1"), JsonPointer::from("/$defs/s2/items/1/items/0"));
            want.insert(Anchor::from("c2"), JsonPointer::from("/$defs/s2/items/1/items/1"));
            want
        });
    }
}
