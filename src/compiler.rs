use std::collections::{HashMap, VecDeque};
use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

use regex::Regex;
use serde_json::{Map, Value};
use url::Url;

use crate::content::{Decoder, MediaType, DECODERS, MEDIA_TYPES};
use crate::draft::Draft;
use crate::extension::{CompileCtx, Extension};
use crate::formats::{FormatCheck, FORMATS};
use crate::loader::UrlLoader;
use crate::root::Root;
use crate::roots::Roots;
use crate::util::*;
use crate::{Additional, Dependency, Items, Schema, SchemaIndex, Schemas, Type, ValidationError};

/// Builds a [`Schemas`] arena out of one or more schema documents, resolving
/// `$ref`/`$recursiveRef`/`$dynamicRef` and registering formats, content
/// decoders/media-types and user keyword extensions along the way.
///
/// A `Compiler` is single-use per arena: call [`Compiler::add_resource`] for
/// any schema document that isn't reachable by url, then [`Compiler::compile`]
/// once per root schema you want a [`SchemaIndex`] for.
pub struct Compiler {
    roots: Roots,
    assert_format: bool,
    assert_content: bool,
    custom_formats: HashMap<String, fn(&Value) -> bool>,
    custom_decoders: HashMap<String, Decoder>,
    custom_media_types: HashMap<String, MediaType>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            roots: Roots::default(),
            assert_format: false,
            assert_content: false,
            custom_formats: HashMap::new(),
            custom_decoders: HashMap::new(),
            custom_media_types: HashMap::new(),
        }
    }

    /// Registers `doc` as the schema reachable at `url`, so that compiling
    /// `url` (or any `$ref` to it) does not need a [`UrlLoader`].
    pub fn add_resource(&mut self, url: &str, doc: Value) -> Result<bool, CompileError> {
        let uf = UrlFrag::absolute(url)?;
        self.roots.or_insert(uf.url, doc)
    }

    /// Draft used for documents that don't declare `$schema`. Defaults to the
    /// latest supported draft.
    pub fn set_default_draft(&mut self, draft: Draft) {
        self.roots.default_draft = draft.internal();
    }

    /// Makes `format` a hard assertion for every draft, including 2019-09 and
    /// 2020-12 where it is annotation-only unless the format-assertion
    /// vocabulary is required.
    pub fn enable_format_assertions(&mut self) {
        self.assert_format = true;
    }

    /// Makes `contentEncoding`/`contentMediaType`/`contentSchema` assertions
    /// rather than annotations, for drafts where they default to
    /// annotation-only (2019-09 and later).
    pub fn enable_content_assertions(&mut self) {
        self.assert_content = true;
    }

    /// Controls whether a `$vocabulary` entry marked required (`true`) that
    /// names neither a built-in nor a user-registered vocabulary is a hard
    /// [`CompileError::UnsupprtedVocabulary`] (the default) or is silently
    /// tolerated.
    pub fn assert_vocabularies(&mut self, assert: bool) {
        self.roots.assert_vocabularies = assert;
    }

    /// Adds support for resolving `url`s with the given scheme.
    pub fn register_url_loader(&mut self, scheme: &str, loader: Box<dyn UrlLoader>) {
        self.roots.loader.register(scheme.to_owned(), loader);
    }

    /// Registers a predicate for the `format` keyword's `name`. Overrides any
    /// built-in format of the same name.
    pub fn register_format(&mut self, name: impl Into<String>, check: fn(&Value) -> bool) {
        self.custom_formats.insert(name.into(), check);
    }

    /// Registers a decoder for `contentEncoding`'s `name`.
    pub fn register_decoder(&mut self, name: impl Into<String>, decoder: Decoder) {
        self.custom_decoders.insert(name.into(), decoder);
    }

    /// Registers a media-type checker for `contentMediaType`'s `name`.
    pub fn register_media_type(&mut self, name: impl Into<String>, media_type: MediaType) {
        self.custom_media_types.insert(name.into(), media_type);
    }

    /// Registers a keyword extension. If `ext` declares a [`Extension::vocabulary`],
    /// that vocabulary is treated as satisfied by `$vocabulary` blocks that require it.
    pub fn register_extension(&mut self, keyword: impl Into<String>, ext: Arc<dyn Extension>) {
        self.roots.extensions.register(keyword, ext);
    }

    /// Compiles the schema located at `loc` (an absolute url, optionally with
    /// a `#`-fragment naming an anchor or json-pointer) and everything it
    /// transitively refers to, inserting the results into `target`.
    ///
    /// Calling this more than once with locations that resolve to the same
    /// node returns the same [`SchemaIndex`].
    pub fn compile(
        &mut self,
        loc: impl Into<String>,
        target: &mut Schemas,
    ) -> Result<SchemaIndex, CompileError> {
        let loc = loc.into();
        let uf = UrlFrag::absolute(&loc)?;
        let up = self.lookup(&uf)?;
        let canonical = up.to_string();

        let index = self.compile_loc(canonical, target)?;
        self.link_dynamic_anchors(target)?;
        Ok(index)
    }

    // -- internals --

    /// Compiles everything reachable from `loc` via a BFS worklist, returning
    /// `loc`'s own index once the worklist drains.
    fn compile_loc(&mut self, loc: String, target: &mut Schemas) -> Result<SchemaIndex, CompileError> {
        if let Some(index) = target.index_by_loc(&loc) {
            return Ok(index);
        }

        let mut queue = VecDeque::new();
        let mut active = Vec::new();
        target.enqueue(&mut queue, loc.clone());
        while let Some(next) = queue.pop_front() {
            if target.index_by_loc(&next).is_some() {
                continue;
            }
            if active.contains(&next) {
                return Err(CompileError::InfiniteLoopError { loc: next });
            }
            active.push(next.clone());

            let uf = UrlFrag::absolute(&next)?;
            let up = self.lookup(&uf)?;
            let sch = self.compile_one(target, &mut queue, next.clone(), up)?;
            target.insert(next, sch);
        }

        target
            .index_by_loc(&loc)
            .ok_or_else(|| CompileError::Bug("schema must be compiled".into()))
    }

    /// Resolves `uf` against every already-loaded root first (so embedded
    /// `$id`s that aren't independently fetchable still resolve), then falls
    /// back to loading `uf.url` as a new document.
    fn lookup(&mut self, uf: &UrlFrag) -> Result<UrlPtr, CompileError> {
        if let Some(root) = self.roots.get(&uf.url) {
            if let Some(up) = root.resolve(uf)? {
                return Ok(up);
            }
        }
        for url in self.roots.urls() {
            if url == uf.url {
                continue;
            }
            let root = self.roots.get(&url).expect("url came from roots");
            if let Some(up) = root.resolve(uf)? {
                return Ok(up);
            }
        }
        self.roots.or_load(uf.url.clone())?;
        let root = self
            .roots
            .get(&uf.url)
            .expect("root must exist after or_load");
        root.resolve(uf)?
            .ok_or_else(|| CompileError::NotFound(uf.to_string()))
    }

    fn enqueue_ref(
        &mut self,
        target: &Schemas,
        queue: &mut VecDeque<String>,
        base: &Url,
        reference: &str,
    ) -> Result<usize, CompileError> {
        let uf = UrlFrag::join(base, reference)?;
        let up = self.lookup(&uf)?;
        Ok(target.enqueue(queue, up.to_string()))
    }

    fn format_active(&self, root: &Root) -> bool {
        if root.draft.version < 2019 {
            return true;
        }
        self.assert_format || root.has_vocab("format-assertion")
    }

    fn content_active(&self, root: &Root) -> bool {
        root.draft.version < 2019 || self.assert_content
    }

    fn lookup_format(&self, name: &str) -> Option<FormatCheck> {
        if let Some(&check) = self.custom_formats.get(name) {
            return Some(FormatCheck::Predicate(check));
        }
        FORMATS.get(name).copied().map(FormatCheck::Assertion)
    }

    fn lookup_decoder(&self, name: &str) -> Option<Decoder> {
        self.custom_decoders
            .get(name)
            .copied()
            .or_else(|| DECODERS.get(name).copied())
    }

    fn lookup_media_type(&self, name: &str) -> Option<MediaType> {
        self.custom_media_types
            .get(name)
            .copied()
            .or_else(|| MEDIA_TYPES.get(name).copied())
    }

    fn compile_one(
        &mut self,
        target: &Schemas,
        queue: &mut VecDeque<String>,
        loc: String,
        up: UrlPtr,
    ) -> Result<Schema, CompileError> {
        let (draft, base_url, resource_ptr) = {
            let root = self.roots.get(&up.url).expect("root must be loaded");
            (
                root.draft,
                root.base_url(&up.ptr).clone(),
                root.resource(&up.ptr).ptr.clone(),
            )
        };
        let v = {
            let root = self.roots.get(&up.url).expect("root must be loaded");
            up.lookup(&root.doc)?.clone()
        };

        let mut s = Schema::new(loc.clone());
        s.draft_version = draft.version;
        s.resource = target.enqueue(
            queue,
            UrlPtr {
                url: up.url.clone(),
                ptr: resource_ptr,
            }
            .to_string(),
        );

        if let Value::Bool(b) = &v {
            s.boolean = Some(*b);
            return Ok(s);
        }
        let Value::Object(obj) = &v else {
            return Ok(s);
        };

        // helpers --
        let load_usize = |pname: &str| {
            if let Some(Value::Number(n)) = obj.get(pname) {
                n.as_u64().map(|n| n as usize)
            } else {
                None
            }
        };
        let load_num = |pname: &str| {
            if let Some(Value::Number(n)) = obj.get(pname) {
                Some(n.clone())
            } else {
                None
            }
        };
        let load_bool = |pname: &str| matches!(obj.get(pname), Some(Value::Bool(true)));
        let load_str = |pname: &str| {
            if let Some(Value::String(s)) = obj.get(pname) {
                Some(s.clone())
            } else {
                None
            }
        };
        let to_strings = |v: &Value| -> Vec<String> {
            if let Value::Array(a) = v {
                a.iter()
                    .filter_map(|t| {
                        if let Value::String(t) = t {
                            Some(t.clone())
                        } else {
                            None
                        }
                    })
                    .collect()
            } else {
                vec![]
            }
        };
        let child_loc = |ptr: &str| {
            UrlPtr {
                url: up.url.clone(),
                ptr: up.ptr.append(ptr),
            }
            .to_string()
        };

        // $ref --
        // draft4-7: all sibling keywords of "$ref" are ignored.
        if let Some(Value::String(reference)) = obj.get("$ref") {
            s.ref_ = Some(self.enqueue_ref(target, queue, &base_url, reference)?);
            if draft.version < 2019 {
                return Ok(s);
            }
        }

        // annotations -- always collected, cheap to carry regardless of vocabulary.
        s.title = load_str("title");
        s.description = load_str("description");
        s.default = obj.get("default").cloned();
        s.examples = obj.get("examples").and_then(|v| v.as_array()).cloned();
        s.read_only = obj.get("readOnly").and_then(Value::as_bool);
        s.write_only = obj.get("writeOnly").and_then(Value::as_bool);
        s.deprecated = obj.get("deprecated").and_then(Value::as_bool);
        s.comment = load_str("$comment");

        // draft4 --
        if let Some(t) = obj.get("type") {
            match t {
                Value::String(t) => s.types.extend(Type::from_str(t)),
                Value::Array(tt) => {
                    s.types.extend(tt.iter().filter_map(|t| {
                        if let Value::String(t) = t {
                            Type::from_str(t)
                        } else {
                            None
                        }
                    }));
                }
                _ => {}
            }
        }

        if let Some(Value::Array(e)) = obj.get("enum") {
            s.enum_ = e.clone();
        }
        s.constant = obj.get("const").cloned();

        if let Some(Value::String(name)) = obj.get("format") {
            let root = self.roots.get(&up.url).expect("root must be loaded");
            if self.format_active(root) {
                if let Some(check) = self.lookup_format(name) {
                    s.format = Some((name.clone(), check));
                }
            }
        }

        // draft4 encodes exclusiveMinimum/Maximum as a bool paired with
        // minimum/maximum; draft6+ makes them standalone numbers.
        s.minimum = load_num("minimum");
        if let Some(Value::Bool(true)) = obj.get("exclusiveMinimum") {
            s.exclusive_minimum = s.minimum.take();
        } else {
            s.exclusive_minimum = load_num("exclusiveMinimum");
        }

        s.maximum = load_num("maximum");
        if let Some(Value::Bool(true)) = obj.get("exclusiveMaximum") {
            s.exclusive_maximum = s.maximum.take();
        } else {
            s.exclusive_maximum = load_num("exclusiveMaximum");
        }

        s.multiple_of = load_num("multipleOf");

        s.min_properties = load_usize("minProperties");
        s.max_properties = load_usize("maxProperties");

        if let Some(req) = obj.get("required") {
            s.required = to_strings(req);
        }

        s.min_items = load_usize("minItems");
        s.max_items = load_usize("maxItems");
        s.unique_items = load_bool("uniqueItems");

        s.min_length = load_usize("minLength");
        s.max_length = load_usize("maxLength");

        if let Some(Value::String(p)) = obj.get("pattern") {
            s.pattern = Some(Regex::new(&crate::ecma::convert(p)).map_err(|e| {
                CompileError::RegexCompileError {
                    loc: format!("{loc}/pattern"),
                    src: e.into(),
                }
            })?);
        }

        if obj.contains_key("not") {
            s.not = Some(target.enqueue(queue, child_loc("not")));
        }
        s.all_of = load_schema_arr(target, queue, &up, obj, "allOf");
        s.any_of = load_schema_arr(target, queue, &up, obj, "anyOf");
        s.one_of = load_schema_arr(target, queue, &up, obj, "oneOf");
        s.properties = load_schema_map(target, queue, &up, obj, "properties");

        if let Some(Value::Object(pp)) = obj.get("patternProperties") {
            for pname in pp.keys() {
                let regex = Regex::new(&crate::ecma::convert(pname)).map_err(|e| {
                    CompileError::RegexCompileError {
                        loc: format!("{loc}/patternProperties/{}", escape(pname)),
                        src: e.into(),
                    }
                })?;
                let idx = target.enqueue(
                    queue,
                    UrlPtr {
                        url: up.url.clone(),
                        ptr: up.ptr.append2("patternProperties", pname),
                    }
                    .to_string(),
                );
                s.pattern_properties.push((regex, idx));
            }
        }

        // additionalProperties is present in every draft; only `items`'s shape
        // (array-form + additionalItems vs. the unified 2020-12 form) differs.
        s.additional_properties = match obj.get("additionalProperties") {
            Some(Value::Bool(b)) => Some(Additional::Bool(*b)),
            Some(_) => Some(Additional::SchemaRef(
                target.enqueue(queue, child_loc("additionalProperties")),
            )),
            None => None,
        };

        if draft.version < 2020 {
            match obj.get("items") {
                Some(Value::Array(_)) => {
                    s.items = Some(Items::SchemaRefs(load_schema_arr(
                        target, queue, &up, obj, "items",
                    )));
                    s.additional_items = match obj.get("additionalItems") {
                        Some(Value::Bool(b)) => Some(Additional::Bool(*b)),
                        Some(_) => Some(Additional::SchemaRef(
                            target.enqueue(queue, child_loc("additionalItems")),
                        )),
                        None => None,
                    };
                }
                Some(_) => {
                    s.items = Some(Items::SchemaRef(target.enqueue(queue, child_loc("items"))))
                }
                None => {}
            }
        }

        if let Some(Value::Object(deps)) = obj.get("dependencies") {
            for (k, dv) in deps {
                let dep = match dv {
                    Value::Array(_) => Some(Dependency::Props(to_strings(dv))),
                    Value::Object(_) | Value::Bool(_) => Some(Dependency::SchemaRef(
                        target.enqueue(
                            queue,
                            UrlPtr {
                                url: up.url.clone(),
                                ptr: up.ptr.append2("dependencies", k),
                            }
                            .to_string(),
                        ),
                    )),
                    _ => None,
                };
                if let Some(dep) = dep {
                    s.dependencies.insert(k.clone(), dep);
                }
            }
        }

        // draft6 --
        if draft.version >= 6 {
            if obj.contains_key("propertyNames") {
                s.property_names = Some(target.enqueue(queue, child_loc("propertyNames")));
            }
            if obj.contains_key("contains") {
                s.contains = Some(target.enqueue(queue, child_loc("contains")));
            }
        }

        // draft7 --
        if draft.version >= 7 {
            if obj.contains_key("if") {
                s.if_ = Some(target.enqueue(queue, child_loc("if")));
            }
            if obj.contains_key("then") {
                s.then = Some(target.enqueue(queue, child_loc("then")));
            }
            if obj.contains_key("else") {
                s.else_ = Some(target.enqueue(queue, child_loc("else")));
            }

            let root = self.roots.get(&up.url).expect("root must be loaded");
            if self.content_active(root) {
                if let Some(Value::String(enc)) = obj.get("contentEncoding") {
                    if let Some(decoder) = self.lookup_decoder(enc) {
                        s.content_encoding = Some((enc.clone(), decoder));
                    }
                }
                if let Some(Value::String(mt)) = obj.get("contentMediaType") {
                    if let Some(checker) = self.lookup_media_type(mt) {
                        s.content_media_type = Some((mt.clone(), checker));
                    }
                }
            }
        }

        // draft2019 --
        if draft.version >= 2019 {
            s.min_contains = load_usize("minContains");
            s.max_contains = load_usize("maxContains");
            s.dependent_schemas = load_schema_map(target, queue, &up, obj, "dependentSchemas");

            if let Some(Value::Object(deps)) = obj.get("dependentRequired") {
                for (pname, pvalue) in deps {
                    s.dependent_required
                        .insert(pname.clone(), to_strings(pvalue));
                }
            }

            if obj.contains_key("unevaluatedProperties") {
                s.unevaluated_properties =
                    Some(target.enqueue(queue, child_loc("unevaluatedProperties")));
            }
            if obj.contains_key("unevaluatedItems") {
                s.unevaluated_items = Some(target.enqueue(queue, child_loc("unevaluatedItems")));
            }

            let root = self.roots.get(&up.url).expect("root must be loaded");
            if self.content_active(root) && obj.contains_key("contentSchema") {
                s.content_schema = Some(target.enqueue(queue, child_loc("contentSchema")));
            }

            if let Some(Value::Bool(anchor)) = obj.get("$recursiveAnchor") {
                s.recursive_anchor = *anchor;
            }
            if let Some(Value::String(reference)) = obj.get("$recursiveRef") {
                s.recursive_ref = Some(self.enqueue_ref(target, queue, &base_url, reference)?);
            }
        }

        // draft2020 --
        if draft.version >= 2020 {
            if obj.contains_key("prefixItems") {
                s.prefix_items = load_schema_arr(target, queue, &up, obj, "prefixItems");
            }
            if obj.contains_key("items") {
                s.items2020 = Some(target.enqueue(queue, child_loc("items")));
            }

            if let Some(Value::String(name)) = obj.get("$dynamicAnchor") {
                s.dynamic_anchor = Some(name.clone());
            }
            if let Some(Value::String(reference)) = obj.get("$dynamicRef") {
                s.dynamic_ref = Some(self.enqueue_ref(target, queue, &base_url, reference)?);
            }
        }

        // user-registered keyword extensions --
        for (keyword, ext) in self.roots.extensions.iter() {
            if let Some(raw) = obj.get(keyword) {
                let ctx = CompileCtx {
                    loc: &loc,
                    draft_version: draft.version,
                };
                if let Some(compiled) = ext.compile(&ctx, raw)? {
                    s.extensions.push((ext.clone(), compiled));
                }
            }
        }

        Ok(s)
    }

    /// Resource-root schema nodes carry a `name -> index` map of every
    /// `$dynamicAnchor` reachable from that resource, used by `$dynamicRef`
    /// at validation time to rebind along the active dynamic scope. Built as
    /// a final pass since an anchor's target may compile after the resource
    /// root that references it.
    fn link_dynamic_anchors(&mut self, target: &mut Schemas) -> Result<(), CompileError> {
        let mut work: Vec<(String, Vec<(String, String)>)> = vec![];
        for url in self.roots.urls() {
            let root = self.roots.get(&url).expect("url came from roots");
            for (ptr, res) in &root.resources {
                if res.dynamic_anchors.is_empty() {
                    continue;
                }
                let resource_loc = UrlPtr {
                    url: url.clone(),
                    ptr: ptr.clone(),
                }
                .to_string();
                let mut entries = vec![];
                for anchor in &res.dynamic_anchors {
                    let target_ptr = res
                        .anchors
                        .get(anchor)
                        .expect("dynamic anchor must also be a registered anchor");
                    let target_loc = UrlPtr {
                        url: url.clone(),
                        ptr: target_ptr.clone(),
                    }
                    .to_string();
                    entries.push((anchor.0.clone(), target_loc));
                }
                work.push((resource_loc, entries));
            }
        }

        for (resource_loc, entries) in work {
            let mut map = HashMap::new();
            for (name, target_loc) in entries {
                let idx = self.compile_loc(target_loc, target)?;
                map.insert(name, idx.0);
            }
            let idx = self.compile_loc(resource_loc, target)?;
            target.get_mut(idx.0).dynamic_anchors = map;
        }
        Ok(())
    }
}

fn load_schema_arr(
    target: &Schemas,
    queue: &mut VecDeque<String>,
    up: &UrlPtr,
    obj: &Map<String, Value>,
    pname: &str,
) -> Vec<usize> {
    if let Some(Value::Array(arr)) = obj.get(pname) {
        (0..arr.len())
            .map(|i| {
                target.enqueue(
                    queue,
                    UrlPtr {
                        url: up.url.clone(),
                        ptr: up.ptr.append2(pname, &i.to_string()),
                    }
                    .to_string(),
                )
            })
            .collect()
    } else {
        Vec::new()
    }
}

fn load_schema_map(
    target: &Schemas,
    queue: &mut VecDeque<String>,
    up: &UrlPtr,
    obj: &Map<String, Value>,
    pname: &str,
) -> HashMap<String, usize> {
    if let Some(Value::Object(obj)) = obj.get(pname) {
        obj.keys()
            .map(|k| {
                let idx = target.enqueue(
                    queue,
                    UrlPtr {
                        url: up.url.clone(),
                        ptr: up.ptr.append2(pname, k),
                    }
                    .to_string(),
                );
                (k.clone(), idx)
            })
            .collect()
    } else {
        HashMap::new()
    }
}

/// All fallible operations in the compile pipeline (C1-C7) return this. A
/// single flat enum with a hand-written `Display`, in keeping with how
/// [`ValidationError`] is built instead of reaching for a derive macro.
#[derive(Debug)]
pub enum CompileError {
    LoadUrlError {
        url: String,
        src: Box<dyn Error>,
    },
    UnsupportedUrlScheme {
        url: String,
    },
    InvalidMetaSchemaUrl {
        url: String,
        src: Box<dyn Error>,
    },
    UnsupportedDraft {
        url: Url,
    },
    MetaSchemaCycle {
        url: Url,
    },
    ValidationError {
        url: String,
        src: ValidationError,
    },
    UnsupprtedVocabulary {
        url: String,
        vocabulary: String,
    },
    DuplicateId {
        url: String,
        id: String,
        ptr1: String,
        ptr2: String,
    },
    DuplicateAnchor {
        url: String,
        anchor: String,
        ptr1: String,
        ptr2: String,
    },
    AnchorNotFound {
        url: String,
        reference: String,
    },
    ParseIdError {
        loc: Url,
    },
    ParseAnchorError {
        loc: Url,
    },
    ParseUrlError {
        url: String,
        src: Box<dyn Error>,
    },
    InvalidJsonPointer(String),
    JsonPointerNotFound(String),
    RegexCompileError {
        loc: String,
        src: Box<dyn Error>,
    },
    /// A compile-time reference cycle that never passes through an
    /// applicator (so it can't be resolved lazily at validation time the way
    /// `$recursiveRef`/`$dynamicRef` self-reference can).
    InfiniteLoopError {
        loc: String,
    },
    NotFound(String),
    Bug(Box<dyn Error>),
}

impl Error for CompileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::LoadUrlError { src, .. }
            | Self::InvalidMetaSchemaUrl { src, .. }
            | Self::ParseUrlError { src, .. }
            | Self::RegexCompileError { src, .. } => Some(src.as_ref()),
            Self::ValidationError { src, .. } => Some(src),
            Self::Bug(src) => Some(src.as_ref()),
            _ => None,
        }
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoadUrlError { url, src } => {
                if f.alternate() {
                    write!(f, "error loading {url}: {src}")
                } else {
                    write!(f, "error loading {url}")
                }
            }
            Self::UnsupportedUrlScheme { url } => write!(f, "loading {url} unsupported"),
            Self::InvalidMetaSchemaUrl { url, src } => {
                write!(f, "invalid $schema url in {url}: {src}")
            }
            Self::UnsupportedDraft { url } => write!(f, "unsupported draft {url}"),
            Self::MetaSchemaCycle { url } => write!(f, "cycle in resolving $schema in {url}"),
            Self::ValidationError { url, src } => {
                write!(f, "{url} does not validate against its metaschema: {src}")
            }
            Self::UnsupprtedVocabulary { url, vocabulary } => {
                write!(f, "unsupported vocabulary {vocabulary} in {url}")
            }
            Self::DuplicateId { url, id, ptr1, ptr2 } => {
                write!(f, "duplicate id {id} at {ptr1} and {ptr2} in {url}")
            }
            Self::DuplicateAnchor {
                url,
                anchor,
                ptr1,
                ptr2,
            } => write!(f, "duplicate anchor {anchor} at {ptr1} and {ptr2} in {url}"),
            Self::AnchorNotFound { url, reference } => {
                write!(f, "anchor in {reference} not found in {url}")
            }
            Self::ParseIdError { loc } => write!(f, "invalid id at {loc}"),
            Self::ParseAnchorError { loc } => write!(f, "invalid anchor at {loc}"),
            Self::ParseUrlError { url, src } => write!(f, "invalid url {url}: {src}"),
            Self::InvalidJsonPointer(loc) => write!(f, "invalid json pointer {loc}"),
            Self::JsonPointerNotFound(loc) => write!(f, "{loc} not found"),
            Self::RegexCompileError { loc, src } => write!(f, "invalid regex at {loc}: {src}"),
            Self::InfiniteLoopError { loc } => {
                write!(f, "infinite loop detected compiling {loc}")
            }
            Self::NotFound(loc) => write!(f, "{loc} not found"),
            Self::Bug(src) => write!(
                f,
                "encountered bug in jsonschema compiler. please report: {src}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler() {
        let sch: Value = serde_json::from_str(r#"{"type":"string"}"#).unwrap();
        let mut c = Compiler::new();
        c.add_resource("http://a.com/schema.json", sch).unwrap();
        let mut schemas = Schemas::new();
        let idx = c.compile("http://a.com/schema.json", &mut schemas).unwrap();
        let inst: Value = Value::String("xx".into());
        schemas.validate(&inst, idx).unwrap();
    }

    #[test]
    fn test_compiler_type_mismatch() {
        let sch: Value = serde_json::from_str(r#"{"type":"string"}"#).unwrap();
        let mut c = Compiler::new();
        c.add_resource("http://a.com/schema2.json", sch).unwrap();
        let mut schemas = Schemas::new();
        let idx = c
            .compile("http://a.com/schema2.json", &mut schemas)
            .unwrap();
        let inst: Value = Value::from(1);
        assert!(schemas.validate(&inst, idx).is_err());
    }

    #[test]
    fn test_compile_anchor() {
        let sch: Value = serde_json::from_str(
            r#"{
                "$id": "http://a.com/schema.json",
                "$defs": {"x": {"$anchor": "a1", "type": "number"}},
                "$ref": "#a1"
            }"#,
        )
        .unwrap();
        let mut c = Compiler::new();
        c.add_resource("http://a.com/schema.json", sch).unwrap();
        let mut schemas = Schemas::new();
        let by_anchor = c
            .compile("http://a.com/schema.json#a1", &mut schemas)
            .unwrap();
        let by_ptr = c
            .compile("http://a.com/schema.json#/$defs/x", &mut schemas)
            .unwrap();
        assert_eq!(by_anchor, by_ptr);
    }
}
