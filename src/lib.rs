#![allow(dead_code)]

mod compiler;
mod content;
mod draft;
mod ecma;
mod extension;
mod formats;
mod loader;
mod numeric;
mod output;
mod root;
mod roots;
mod util;

pub use compiler::*;
pub use draft::Draft;
pub use extension::{CompileCtx, Extension, ExtensionRegistry, ValidateCtx};
use content::{Decoder, MediaType};
use formats::FormatCheck;
pub use loader::*;
pub use output::*;

use std::{
    borrow::Cow,
    collections::{HashMap, HashSet, VecDeque},
    fmt::Display,
    sync::Arc,
};

use regex::Regex;
use serde_json::{Number, Value};
use util::{equals, escape, join_iter, quote};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaIndex(pub(crate) usize);

#[derive(Default)]
pub struct Schemas {
    list: Vec<Schema>,
    map: HashMap<String, usize>, // loc => schema-index
}

impl Schemas {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enqueue(&self, queue: &mut VecDeque<String>, mut loc: String) -> usize {
        if loc.rfind('#').is_none() {
            loc.push('#');
        }

        if let Some(&index) = self.map.get(&loc) {
            // already got compiled
            return index;
        }
        if let Some(qindex) = queue.iter().position(|e| *e == loc) {
            // already queued for compilation
            return self.list.len() + qindex;
        }

        // new compilation request
        queue.push_back(loc);
        self.list.len() + queue.len() - 1
    }

    pub(crate) fn insert(&mut self, loc: String, sch: Schema) -> SchemaIndex {
        let index = self.list.len();
        self.list.push(sch);
        self.map.insert(loc, index);
        SchemaIndex(index)
    }

    fn get(&self, index: usize) -> &Schema {
        &self.list[index] // todo: return bug
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> &mut Schema {
        &mut self.list[index]
    }

    pub(crate) fn len(&self) -> usize {
        self.list.len()
    }

    fn get_by_loc(&self, loc: &str) -> Option<&Schema> {
        let mut loc = Cow::from(loc);
        if loc.rfind('#').is_none() {
            let mut s = loc.into_owned();
            s.push('#');
            loc = Cow::from(s);
        }
        self.map.get(loc.as_ref()).and_then(|&i| self.list.get(i))
    }

    /// Index of the already-compiled schema at `loc`, or `None` if nothing
    /// was compiled there yet. Unlike [`Self::get_by_loc`] this returns a
    /// handle the caller can pass back into [`Self::validate`].
    pub(crate) fn index_by_loc(&self, loc: &str) -> Option<SchemaIndex> {
        let mut loc = Cow::from(loc);
        if loc.rfind('#').is_none() {
            let mut s = loc.into_owned();
            s.push('#');
            loc = Cow::from(s);
        }
        self.map.get(loc.as_ref()).map(|&i| SchemaIndex(i))
    }

    /// Validates `v` with schema identified by `sch_index`
    ///
    /// # Panics
    ///
    /// Panics if `sch_index` does not exist. To avoid panic make sure that
    /// `sch_index` is generated for this instance.
    pub fn validate(&self, v: &Value, sch_index: SchemaIndex) -> Result<(), ValidationError> {
        let Some(sch) = self.list.get(sch_index.0) else {
            panic!("Schemas::validate: schema index out of bounds");
        };
        let scope = Scope {
            sch: sch.index,
            kw_path: Cow::from(""),
            vid: 0,
            parent: None,
        };
        sch.validate(v, String::new(), self, scope).map(|_| ())
    }
}

macro_rules! kind {
    ($kind:ident, $name:ident: $value:expr) => {
        ErrorKind::$kind { $name: $value }
    };
    ($kind:ident, $got:expr, $want:expr) => {
        ErrorKind::$kind {
            got: $got,
            want: $want,
        }
    };
    ($kind: ident) => {
        ErrorKind::$kind
    };
}

#[derive(Default)]
pub(crate) struct Schema {
    pub(crate) draft_version: usize,
    pub(crate) index: usize,
    pub(crate) loc: String,
    pub(crate) resource: usize,
    pub(crate) dynamic_anchors: HashMap<String, usize>,

    // type agnostic --
    pub(crate) boolean: Option<bool>, // boolean schema
    pub(crate) ref_: Option<usize>,
    pub(crate) recursive_ref: Option<usize>,
    pub(crate) recursive_anchor: bool,
    pub(crate) dynamic_ref: Option<usize>,
    pub(crate) dynamic_anchor: Option<String>,
    pub(crate) types: Vec<Type>,
    pub(crate) enum_: Vec<Value>,
    pub(crate) constant: Option<Value>,
    pub(crate) not: Option<usize>,
    pub(crate) all_of: Vec<usize>,
    pub(crate) any_of: Vec<usize>,
    pub(crate) one_of: Vec<usize>,
    pub(crate) if_: Option<usize>,
    pub(crate) then: Option<usize>,
    pub(crate) else_: Option<usize>,
    pub(crate) format: Option<(String, FormatCheck)>,

    // object --
    pub(crate) min_properties: Option<usize>,
    pub(crate) max_properties: Option<usize>,
    pub(crate) required: Vec<String>,
    pub(crate) properties: HashMap<String, usize>,
    pub(crate) pattern_properties: Vec<(Regex, usize)>,
    pub(crate) property_names: Option<usize>,
    pub(crate) additional_properties: Option<Additional>,
    pub(crate) dependent_required: HashMap<String, Vec<String>>,
    pub(crate) dependent_schemas: HashMap<String, usize>,
    pub(crate) dependencies: HashMap<String, Dependency>,
    pub(crate) unevaluated_properties: Option<usize>,

    // array --
    pub(crate) min_items: Option<usize>,
    pub(crate) max_items: Option<usize>,
    pub(crate) unique_items: bool,
    pub(crate) min_contains: Option<usize>,
    pub(crate) max_contains: Option<usize>,
    pub(crate) contains: Option<usize>,
    pub(crate) items: Option<Items>,
    pub(crate) additional_items: Option<Additional>,
    pub(crate) prefix_items: Vec<usize>,
    pub(crate) items2020: Option<usize>,
    pub(crate) unevaluated_items: Option<usize>,

    // string --
    pub(crate) min_length: Option<usize>,
    pub(crate) max_length: Option<usize>,
    pub(crate) pattern: Option<Regex>,
    pub(crate) content_encoding: Option<(String, Decoder)>,
    pub(crate) content_media_type: Option<(String, MediaType)>,
    pub(crate) content_schema: Option<usize>,

    // number --
    pub(crate) minimum: Option<Number>,
    pub(crate) maximum: Option<Number>,
    pub(crate) exclusive_minimum: Option<Number>,
    pub(crate) exclusive_maximum: Option<Number>,
    pub(crate) multiple_of: Option<Number>,

    // annotations (collected only when Compiler::extract_annotations is set) --
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) default: Option<Value>,
    pub(crate) examples: Option<Vec<Value>>,
    pub(crate) read_only: Option<bool>,
    pub(crate) write_only: Option<bool>,
    pub(crate) deprecated: Option<bool>,
    pub(crate) comment: Option<String>,

    // user-registered keywords --
    pub(crate) extensions: Vec<(Arc<dyn Extension>, Value)>,
}

#[derive(Debug)]
pub(crate) enum Items {
    SchemaRef(usize),
    SchemaRefs(Vec<usize>),
}

#[derive(Debug)]
pub(crate) enum Additional {
    Bool(bool),
    SchemaRef(usize),
}

#[derive(Debug)]
pub(crate) enum Dependency {
    Props(Vec<String>),
    SchemaRef(usize),
}

#[derive(Default)]
struct Uneval<'v> {
    props: HashSet<&'v String>,
    items: HashSet<usize>,
}

impl<'v> Uneval<'v> {
    fn merge(&mut self, other: &Uneval) {
        self.props.retain(|p| other.props.contains(p));
        self.items.retain(|i| other.items.contains(i));
    }
}

impl<'v> From<&'v Value> for Uneval<'v> {
    fn from(v: &'v Value) -> Self {
        let mut uneval = Self::default();
        match v {
            Value::Object(obj) => uneval.props = obj.keys().collect(),
            Value::Array(arr) => uneval.items = (0..arr.len()).collect(),
            _ => (),
        }
        uneval
    }
}

#[derive(Debug, Default)]
struct Scope<'a> {
    sch: usize,
    kw_path: Cow<'static, str>,
    /// unique id of value being validated
    // if two scope validate same value, they will have same vid
    vid: usize,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    fn child(sch: usize, kw_path: Cow<'static, str>, vid: usize, parent: &'a Scope) -> Self {
        Self {
            sch,
            kw_path,
            vid,
            parent: Some(parent),
        }
    }

    fn kw_loc(&self, kw_path: &str) -> String {
        let mut loc = kw_path.to_string();
        let mut scope = self;
        loop {
            if !loc.is_empty() {
                loc.insert(0, '/');
            }
            loc.insert_str(0, scope.kw_path.as_ref());
            if let Some(parent) = scope.parent {
                scope = parent;
            } else {
                break;
            }
        }
        loc
    }

    fn has_cycle(&self) -> bool {
        let mut scope = self.parent;
        while let Some(scp) = scope {
            if scp.vid != self.vid {
                break;
            }
            if scp.sch == self.sch {
                return true;
            }
            scope = scp.parent;
        }
        false
    }
}

impl Schema {
    pub(crate) fn new(loc: String) -> Self {
        Self {
            loc,
            ..Default::default()
        }
    }

    fn validate<'v>(
        &self,
        v: &'v Value,
        vloc: String,
        schemas: &Schemas,
        scope: Scope,
    ) -> Result<Uneval<'v>, ValidationError> {
        let leaf = |kw_path: &str, kind: ErrorKind| ValidationError {
            keyword_location: scope.kw_loc(kw_path),
            absolute_keyword_location: match kw_path.is_empty() {
                true => self.loc.clone(),
                false => format!("{}/{kw_path}", self.loc),
            },
            instance_location: vloc.clone(),
            kind,
            causes: vec![],
        };
        let wrap_ref = |keyword: &'static str, cause: ValidationError| ValidationError {
            keyword_location: scope.kw_loc(keyword),
            absolute_keyword_location: format!("{}/{keyword}", self.loc),
            instance_location: vloc.clone(),
            kind: ErrorKind::Reference {
                keyword,
                url: cause.absolute_keyword_location.clone(),
            },
            causes: vec![cause],
        };

        if scope.has_cycle() {
            return Err(leaf("", kind!(CycleDetected)));
        }

        let mut _uneval = Uneval::from(v);
        let uneval = &mut _uneval;
        let validate = |sch: usize, kw_path, v: &Value, vpath: &str| {
            let scope = Scope::child(sch, kw_path, scope.vid + 1, &scope);
            schemas
                .get(sch)
                .validate(v, format!("{vloc}{vpath}"), schemas, scope)
                .map(|_| ())
        };
        let validate_self = |sch: usize, kw_path, uneval: &mut Uneval<'_>| {
            let scope = Scope::child(sch, kw_path, scope.vid, &scope);
            let result = schemas.get(sch).validate(v, vloc.clone(), schemas, scope);
            if let Ok(reply) = &result {
                uneval.merge(reply);
            }
            result
        };

        // boolean --
        if let Some(b) = self.boolean {
            if !b {
                return Err(leaf("", kind!(FalseSchema)));
            }
            return Ok(_uneval);
        }

        // type -- mismatch short-circuits the rest of the kind-specific checks.
        if !self.types.is_empty() {
            let v_type = Type::of(v);
            let matched = self.types.iter().any(|t| {
                if *t == Type::Integer && v_type == Type::Number {
                    if let Value::Number(n) = v {
                        return n.is_i64()
                            || n.is_u64()
                            || n.as_f64().filter(|n| n.fract() == 0.0).is_some();
                    }
                }
                *t == v_type
            });
            if !matched {
                return Err(leaf("type", kind!(Type, v_type, self.types.clone())));
            }
        }

        // remaining keywords are siblings: none of them short-circuit each
        // other, their failures accumulate into `causes` of a single error
        // wrapping this schema node.
        let mut causes: Vec<ValidationError> = vec![];

        // enum --
        if !self.enum_.is_empty() && !self.enum_.iter().any(|e| equals(e, v)) {
            causes.push(leaf("enum", kind!(Enum, v.clone(), self.enum_.clone())));
        }

        // constant --
        if let Some(c) = &self.constant {
            if !equals(v, c) {
                causes.push(leaf("const", kind!(Const, v.clone(), c.clone())));
            }
        }

        // format --
        if let Some((format, check)) = &self.format {
            if !check.check(v) {
                causes.push(leaf("format", kind!(Format, v.clone(), format.clone())));
            }
        }

        match v {
            Value::Object(obj) => {
                // minProperties --
                if let Some(min) = self.min_properties {
                    if obj.len() < min {
                        causes.push(leaf("minProperties", kind!(MinProperties, obj.len(), min)));
                    }
                }

                // maxProperties --
                if let Some(max) = self.max_properties {
                    if obj.len() > max {
                        causes.push(leaf("maxProperties", kind!(MaxProperties, obj.len(), max)));
                    }
                }

                // required --
                let missing = self
                    .required
                    .iter()
                    .filter(|p| !obj.contains_key(p.as_str()))
                    .cloned()
                    .collect::<Vec<String>>();
                if !missing.is_empty() {
                    causes.push(leaf("required", kind!(Required, want: missing)));
                }

                // dependencies --
                for (pname, dependency) in &self.dependencies {
                    if obj.contains_key(pname) {
                        let kw_path = format!("dependencies/{}", escape(pname));
                        match dependency {
                            Dependency::Props(required) => {
                                let missing = required
                                    .iter()
                                    .filter(|p| !obj.contains_key(p.as_str()))
                                    .cloned()
                                    .collect::<Vec<String>>();
                                if !missing.is_empty() {
                                    causes.push(leaf(
                                        &kw_path,
                                        kind!(DependentRequired, pname.clone(), missing),
                                    ));
                                }
                            }
                            Dependency::SchemaRef(sch) => {
                                if let Err(e) = validate_self(*sch, kw_path.into(), uneval) {
                                    causes.push(e);
                                }
                            }
                        }
                    }
                }

                // dependentSchemas --
                for (pname, sch) in &self.dependent_schemas {
                    if obj.contains_key(pname) {
                        let kw_path = format!("dependentSchemas/{}", escape(pname));
                        if let Err(e) = validate_self(*sch, kw_path.into(), uneval) {
                            causes.push(e);
                        }
                    }
                }

                // dependentRequired --
                for (pname, required) in &self.dependent_required {
                    if obj.contains_key(pname) {
                        let missing = required
                            .iter()
                            .filter(|p| !obj.contains_key(p.as_str()))
                            .cloned()
                            .collect::<Vec<String>>();
                        if !missing.is_empty() {
                            causes.push(leaf(
                                &format!("dependentRequired/{}", escape(pname)),
                                kind!(DependentRequired, pname.clone(), missing),
                            ));
                        }
                    }
                }

                // properties --
                for (pname, &psch) in &self.properties {
                    if let Some(pvalue) = obj.get(pname) {
                        uneval.props.remove(pname);
                        let kw_path = format!("properties/{}", escape(pname));
                        if let Err(e) = validate(psch, kw_path.into(), pvalue, &escape(pname)) {
                            causes.push(e);
                        }
                    }
                }

                // patternProperties --
                for (regex, psch) in &self.pattern_properties {
                    for (pname, pvalue) in obj.iter().filter(|(pname, _)| regex.is_match(pname)) {
                        uneval.props.remove(pname);
                        let kw_path = format!("patternProperties/{}", escape(regex.as_str()));
                        if let Err(e) = validate(*psch, kw_path.into(), pvalue, &escape(pname)) {
                            causes.push(e);
                        }
                    }
                }

                // propertyNames --
                if let Some(sch) = &self.property_names {
                    for pname in obj.keys() {
                        let pv = Value::String(pname.to_owned());
                        if let Err(e) = validate(*sch, "propertyNames".into(), &pv, &escape(pname))
                        {
                            causes.push(e);
                        }
                    }
                }

                // additionalProperties --
                if let Some(additional) = &self.additional_properties {
                    let kw_path = "additionalProperties";
                    match additional {
                        Additional::Bool(allowed) => {
                            if !allowed && !uneval.props.is_empty() {
                                causes.push(leaf(
                                    kw_path,
                                    kind!(AdditionalProperties, got: uneval.props.iter().cloned().cloned().collect()),
                                ));
                            }
                        }
                        Additional::SchemaRef(sch) => {
                            for &pname in uneval.props.iter() {
                                if let Some(pvalue) = obj.get(pname) {
                                    if let Err(e) =
                                        validate(*sch, kw_path.into(), pvalue, &escape(pname))
                                    {
                                        causes.push(e);
                                    }
                                }
                            }
                        }
                    }
                    uneval.props.clear();
                }
            }
            Value::Array(arr) => {
                // minItems --
                if let Some(min) = self.min_items {
                    if arr.len() < min {
                        causes.push(leaf("minItems", kind!(MinItems, arr.len(), min)));
                    }
                }

                // maxItems --
                if let Some(max) = self.max_items {
                    if arr.len() > max {
                        causes.push(leaf("maxItems", kind!(MaxItems, arr.len(), max)));
                    }
                }

                // uniqueItems --
                if self.unique_items {
                    'outer: for i in 1..arr.len() {
                        for j in 0..i {
                            if equals(&arr[i], &arr[j]) {
                                causes.push(leaf("uniqueItems", kind!(UniqueItems, got: [j, i])));
                                break 'outer;
                            }
                        }
                    }
                }

                // items --
                if let Some(items) = &self.items {
                    match items {
                        Items::SchemaRef(sch) => {
                            for (i, item) in arr.iter().enumerate() {
                                if let Err(e) =
                                    validate(*sch, "items".into(), item, &i.to_string())
                                {
                                    causes.push(e);
                                }
                            }
                            uneval.items.clear();
                        }
                        Items::SchemaRefs(list) => {
                            for (i, (item, sch)) in arr.iter().zip(list).enumerate() {
                                uneval.items.remove(&i);
                                let kw_path = format!("items/{i}");
                                if let Err(e) =
                                    validate(*sch, kw_path.into(), item, &i.to_string())
                                {
                                    causes.push(e);
                                }
                            }
                        }
                    }
                }

                // additionalItems --
                if let Some(additional) = &self.additional_items {
                    let kw_path = "additionalItems";
                    match additional {
                        Additional::Bool(allowed) => {
                            if !allowed && !uneval.items.is_empty() {
                                causes.push(leaf(
                                    kw_path,
                                    kind!(AdditionalItems, arr.len(), uneval.items.len()),
                                ));
                            }
                        }
                        Additional::SchemaRef(sch) => {
                            for &index in uneval.items.iter() {
                                if let Some(pvalue) = arr.get(index) {
                                    if let Err(e) = validate(
                                        *sch,
                                        kw_path.into(),
                                        pvalue,
                                        &index.to_string(),
                                    ) {
                                        causes.push(e);
                                    }
                                }
                            }
                        }
                    }
                    uneval.items.clear();
                }

                // prefixItems --
                for (i, (sch, item)) in self.prefix_items.iter().zip(arr).enumerate() {
                    uneval.items.remove(&i);
                    let kw_path = format!("prefixItems/{i}");
                    if let Err(e) = validate(*sch, kw_path.into(), item, &i.to_string()) {
                        causes.push(e);
                    }
                }

                // items2020 --
                if let Some(sch) = &self.items2020 {
                    for &index in uneval.items.iter() {
                        if let Some(pvalue) = arr.get(index) {
                            if let Err(e) =
                                validate(*sch, "items".into(), pvalue, &index.to_string())
                            {
                                causes.push(e);
                            }
                        }
                    }
                    uneval.items.clear();
                }

                // contains --
                let mut contains_matched = Vec::new();
                if let Some(sch) = &self.contains {
                    contains_matched = arr
                        .iter()
                        .enumerate()
                        .filter_map(|(i, item)| {
                            validate(*sch, "contains".into(), item, &i.to_string())
                                .ok()
                                .map(|_| {
                                    if self.draft_version >= 2020 {
                                        uneval.items.remove(&i);
                                    }
                                    i
                                })
                        })
                        .collect();
                    if contains_matched.is_empty() && self.min_contains.is_none() {
                        causes.push(leaf("contains", kind!(Contains)));
                    }

                    // minContains --
                    if let Some(min) = &self.min_contains {
                        if contains_matched.len() < *min {
                            causes.push(leaf(
                                "minContains",
                                kind!(MinContains, contains_matched.clone(), *min),
                            ));
                        }
                    }

                    // maxContains --
                    if let Some(max) = &self.max_contains {
                        if contains_matched.len() > *max {
                            causes.push(leaf(
                                "maxContains",
                                kind!(MaxContains, contains_matched, *max),
                            ));
                        }
                    }
                }
            }
            Value::String(s) => {
                let mut len = None;

                // minLength --
                if let Some(min) = self.min_length {
                    let len = len.get_or_insert_with(|| s.chars().count());
                    if *len < min {
                        causes.push(leaf("minLength", kind!(MinLength, *len, min)));
                    }
                }

                // maxLength --
                if let Some(max) = self.max_length {
                    let len = len.get_or_insert_with(|| s.chars().count());
                    if *len > max {
                        causes.push(leaf("maxLength", kind!(MaxLength, *len, max)));
                    }
                }

                // pattern --
                if let Some(regex) = &self.pattern {
                    if !regex.is_match(s) {
                        causes.push(leaf(
                            "pattern",
                            kind!(Pattern, s.clone(), regex.as_str().to_string()),
                        ));
                    }
                }

                // contentEncoding --
                let mut decoded = Cow::from(s.as_bytes());
                let mut encoding_ok = true;
                if let Some((encoding, decode)) = &self.content_encoding {
                    match decode(s) {
                        Some(bytes) => decoded = Cow::from(bytes),
                        None => {
                            encoding_ok = false;
                            causes.push(leaf(
                                "contentEncoding",
                                kind!(ContentEncoding, s.clone(), encoding.clone()),
                            ));
                        }
                    }
                }

                // contentMediaType --
                if encoding_ok {
                    if let Some((media_type, check)) = &self.content_media_type {
                        if !check(decoded.as_ref()) {
                            causes.push(leaf(
                                "contentMediaType",
                                kind!(ContentMediaType, decoded.clone().into_owned(), media_type.clone()),
                            ));
                        } else if let Some(sch) = self.content_schema {
                            if let Ok(nested) = serde_json::from_slice::<Value>(decoded.as_ref()) {
                                if let Err(e) =
                                    validate(sch, "contentSchema".into(), &nested, "")
                                {
                                    causes.push(leaf(
                                        "contentSchema",
                                        ErrorKind::ContentSchema,
                                    ).with_cause(e));
                                }
                            }
                        }
                    }
                }
            }
            Value::Number(n) => {
                // minimum --
                if let Some(min) = &self.minimum {
                    if matches!(numeric::lt(n, min), Some(true)) {
                        causes.push(leaf("minimum", kind!(Minimum, n.clone(), min.clone())));
                    }
                }

                // maximum --
                if let Some(max) = &self.maximum {
                    if matches!(numeric::gt(n, max), Some(true)) {
                        causes.push(leaf("maximum", kind!(Maximum, n.clone(), max.clone())));
                    }
                }

                // exclusiveMinimum --
                if let Some(ex_min) = &self.exclusive_minimum {
                    if matches!(numeric::le(n, ex_min), Some(true)) {
                        causes.push(leaf(
                            "exclusiveMinimum",
                            kind!(ExclusiveMinimum, n.clone(), ex_min.clone()),
                        ));
                    }
                }

                // exclusiveMaximum --
                if let Some(ex_max) = &self.exclusive_maximum {
                    if matches!(numeric::ge(n, ex_max), Some(true)) {
                        causes.push(leaf(
                            "exclusiveMaximum",
                            kind!(ExclusiveMaximum, n.clone(), ex_max.clone()),
                        ));
                    }
                }

                // multipleOf --
                if let Some(mul) = &self.multiple_of {
                    if matches!(numeric::is_multiple_of(n, mul), Some(false)) {
                        causes.push(leaf("multipleOf", kind!(MultipleOf, n.clone(), mul.clone())));
                    }
                }
            }
            _ => {}
        }

        // $ref --
        if let Some(ref_) = self.ref_ {
            if let Err(e) = validate_self(ref_, "$ref".into(), uneval) {
                causes.push(wrap_ref("$ref", e));
            }
        }

        // $recursiveRef --
        if let Some(mut recursive_ref) = self.recursive_ref {
            if schemas.get(recursive_ref).recursive_anchor {
                let mut sc = &scope;
                loop {
                    let scope_sch = schemas.get(sc.sch);
                    let base_sch = schemas.get(scope_sch.resource);
                    if base_sch.recursive_anchor {
                        recursive_ref = sc.sch;
                    }
                    if let Some(parent) = sc.parent {
                        sc = parent;
                    } else {
                        break;
                    }
                }
            }
            if let Err(e) = validate_self(recursive_ref, "$recursiveRef".into(), uneval) {
                causes.push(wrap_ref("$recursiveRef", e));
            }
        }

        // $dynamicRef --
        if let Some(mut dynamic_ref) = self.dynamic_ref {
            if let Some(dynamic_anchor) = &schemas.get(dynamic_ref).dynamic_anchor {
                let mut sc = &scope;
                loop {
                    let scope_sch = schemas.get(sc.sch);
                    let base_sch = schemas.get(scope_sch.resource);
                    debug_assert_eq!(base_sch.index, base_sch.resource);
                    if let Some(sch) = base_sch.dynamic_anchors.get(dynamic_anchor) {
                        dynamic_ref = *sch;
                    }
                    if let Some(parent) = sc.parent {
                        sc = parent;
                    } else {
                        break;
                    }
                }
            }
            if let Err(e) = validate_self(dynamic_ref, "$dynamicRef".into(), uneval) {
                causes.push(wrap_ref("$dynamicRef", e));
            }
        }

        // not --
        if let Some(not) = self.not {
            if validate_self(not, "not".into(), uneval).is_ok() {
                causes.push(leaf("not", kind!(Not)));
            }
        }

        // allOf --
        if !self.all_of.is_empty() {
            let mut failed_idx = vec![];
            let mut failed_causes = vec![];
            for (i, sch) in self.all_of.iter().enumerate() {
                let kw_path = format!("allOf/{i}");
                if let Err(e) = validate_self(*sch, kw_path.into(), uneval) {
                    failed_idx.push(i);
                    failed_causes.push(e);
                }
            }
            if !failed_idx.is_empty() {
                let mut err = leaf("allOf", kind!(AllOf, got: failed_idx));
                err.causes = failed_causes;
                causes.push(err);
            }
        }

        // anyOf --
        if !self.any_of.is_empty() {
            let mut branch_causes = vec![];
            let matched = self
                .any_of
                .iter()
                .enumerate()
                .filter(|(i, sch)| {
                    let kw_path = format!("anyOf/{i}");
                    match validate_self(**sch, kw_path.into(), uneval) {
                        Ok(_) => true,
                        Err(e) => {
                            branch_causes.push(e);
                            false
                        }
                    }
                }) // NOTE: all schemas must be checked
                .count();
            if matched == 0 {
                let mut err = leaf("anyOf", kind!(AnyOf));
                err.causes = branch_causes;
                causes.push(err);
            }
        }

        // oneOf --
        if !self.one_of.is_empty() {
            let mut matched: Vec<usize> = vec![];
            let mut branch_causes = vec![];
            for (i, sch) in self.one_of.iter().enumerate() {
                let kw_path = format!("oneOf/{i}");
                match validate_self(*sch, kw_path.into(), uneval) {
                    Ok(_) => matched.push(i),
                    Err(e) => branch_causes.push(e),
                }
            }
            if matched.is_empty() {
                let mut err = leaf("oneOf", kind!(OneOf, got: vec![]));
                err.causes = branch_causes;
                causes.push(err);
            } else if matched.len() > 1 {
                causes.push(leaf("oneOf", kind!(OneOf, got: matched)));
            }
        }

        // if, then, else --
        if let Some(if_) = self.if_ {
            if validate_self(if_, "if".into(), uneval).is_ok() {
                if let Some(then) = self.then {
                    if let Err(e) = validate_self(then, "then".into(), uneval) {
                        let mut err = leaf("then", kind!(IfThenElse));
                        err.causes = vec![e];
                        causes.push(err);
                    }
                }
            } else if let Some(else_) = self.else_ {
                if let Err(e) = validate_self(else_, "else".into(), uneval) {
                    let mut err = leaf("else", kind!(IfThenElse));
                    err.causes = vec![e];
                    causes.push(err);
                }
            }
        }

        // unevaluatedProps --
        if let (Some(uneval_props), Value::Object(obj)) = (self.unevaluated_properties, v) {
            for pname in uneval.props.iter().cloned().collect::<Vec<_>>() {
                if let Some(pvalue) = obj.get(pname) {
                    let kw_path = "unevaluatedProperties";
                    if let Err(e) = validate(uneval_props, kw_path.into(), pvalue, &escape(pname))
                    {
                        causes.push(e);
                    }
                }
            }
            uneval.props.clear();
        }

        // unevaluatedItems --
        if let (Some(uneval_items), Value::Array(arr)) = (self.unevaluated_items, v) {
            for i in uneval.items.iter().cloned().collect::<Vec<_>>() {
                if let Some(pvalue) = arr.get(i) {
                    let kw_path = "unevaluatedItems";
                    if let Err(e) = validate(uneval_items, kw_path.into(), pvalue, &i.to_string())
                    {
                        causes.push(e);
                    }
                }
            }
            uneval.items.clear();
        }

        // user-registered keyword extensions --
        if !self.extensions.is_empty() {
            let kw_loc = scope.kw_loc("");
            for (ext, compiled) in &self.extensions {
                let ctx = ValidateCtx {
                    keyword_location: &kw_loc,
                    instance_location: &vloc,
                };
                if let Err(e) = ext.validate(&ctx, compiled, v) {
                    causes.push(e);
                }
            }
        }

        if causes.is_empty() {
            Ok(_uneval)
        } else {
            Err(ValidationError {
                keyword_location: scope.kw_loc(""),
                absolute_keyword_location: self.loc.clone(),
                instance_location: vloc,
                kind: ErrorKind::Schema {
                    url: self.loc.clone(),
                },
                causes,
            })
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Type {
    Null,
    Bool,
    Number,
    Integer,
    String,
    Array,
    Object,
}

impl Type {
    fn of(v: &Value) -> Self {
        match v {
            Value::Null => Type::Null,
            Value::Bool(_) => Type::Bool,
            Value::Number(_) => Type::Number,
            Value::String(_) => Type::String,
            Value::Array(_) => Type::Array,
            Value::Object(_) => Type::Object,
        }
    }
    pub(crate) fn from_str(value: &str) -> Option<Self> {
        match value {
            "null" => Some(Self::Null),
            "boolean" => Some(Self::Bool),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "string" => Some(Self::String),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    fn primitive(v: &Value) -> bool {
        !matches!(Self::of(v), Self::Array | Self::Object)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Null => write!(f, "null"),
            Type::Bool => write!(f, "boolean"),
            Type::Number => write!(f, "number"),
            Type::Integer => write!(f, "integer"),
            Type::String => write!(f, "string"),
            Type::Array => write!(f, "array"),
            Type::Object => write!(f, "object"),
        }
    }
}

#[derive(Debug)]
pub struct ValidationError {
    pub keyword_location: String,
    pub absolute_keyword_location: String,
    pub instance_location: String,
    pub kind: ErrorKind,
    pub causes: Vec<ValidationError>,
}

impl ValidationError {
    fn with_cause(mut self, cause: ValidationError) -> Self {
        self.causes.push(cause);
        self
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "jsonschema: {} does not validate with {}: {}",
            quote(&self.instance_location),
            self.absolute_keyword_location,
            self.kind
        )?;
        if f.alternate() {
            for cause in &self.causes {
                write!(f, "\n  {cause:#}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug)]
pub enum ErrorKind {
    CycleDetected,
    FalseSchema,
    Type { got: Type, want: Vec<Type> },
    Enum { got: Value, want: Vec<Value> },
    Const { got: Value, want: Value },
    Format { got: Value, want: String },
    MinProperties { got: usize, want: usize },
    MaxProperties { got: usize, want: usize },
    AdditionalProperties { got: Vec<String> },
    Required { want: Vec<String> },
    DependentRequired { got: String, want: Vec<String> },
    MinItems { got: usize, want: usize },
    MaxItems { got: usize, want: usize },
    Contains,
    MinContains { got: Vec<usize>, want: usize },
    MaxContains { got: Vec<usize>, want: usize },
    UniqueItems { got: [usize; 2] },
    AdditionalItems { got: usize, want: usize },
    MinLength { got: usize, want: usize },
    MaxLength { got: usize, want: usize },
    Pattern { got: String, want: String },
    ContentEncoding { got: String, want: String },
    ContentMediaType { got: Vec<u8>, want: String },
    ContentSchema,
    Minimum { got: Number, want: Number },
    Maximum { got: Number, want: Number },
    ExclusiveMinimum { got: Number, want: Number },
    ExclusiveMaximum { got: Number, want: Number },
    MultipleOf { got: Number, want: Number },
    Not,
    AllOf { got: Vec<usize> },
    AnyOf,
    OneOf { got: Vec<usize> },
    IfThenElse,
    Reference { keyword: &'static str, url: String },
    RefCycle,
    Schema { url: String },
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // todo: use single quote for strings
        match self {
            Self::CycleDetected => write!(f, "cycle detected"),
            Self::FalseSchema => write!(f, "false schema"),
            Self::Type { got, want } => {
                // todo: why join not working for Type struct ??
                let want = join_iter(want, ", ");
                write!(f, "want {want}, but got {got}",)
            }
            Self::Enum { want, .. } => {
                if want.iter().all(Type::primitive) {
                    if want.len() == 1 {
                        write!(f, "value must be {want:?}")
                    } else {
                        let want = join_iter(want.iter().map(|e| format!("{e:?}")), " or ");
                        write!(f, "value must be one of {want}")
                    }
                } else {
                    write!(f, "enum failed")
                }
            }
            Self::Const { want, .. } => {
                if Type::primitive(want) {
                    write!(f, "value must be {want}")
                } else {
                    write!(f, "const failed")
                }
            }
            Self::Format { got, want } => write!(f, "{got} is not valid {want}"),
            Self::MinProperties { got, want } => write!(
                f,
                "minimum {want} properties allowed, but got {got} properties"
            ),
            Self::MaxProperties { got, want } => write!(
                f,
                "maximum {want} properties allowed, but got {got} properties"
            ),
            Self::AdditionalProperties { got } => {
                write!(
                    f,
                    "additionalProperties {} not allowed",
                    join_iter(got.iter().map(quote), ", ")
                )
            }
            Self::Required { want } => write!(
                f,
                "missing properties {}",
                join_iter(want.iter().map(quote), ", ")
            ),
            Self::DependentRequired { got, want } => write!(
                f,
                "properties {} required, if {} property exists",
                join_iter(want.iter().map(quote), ", "),
                quote(got)
            ),
            Self::MinItems { got, want } => {
                write!(f, "minimum {want} items allowed, but got {got} items")
            }
            Self::MaxItems { got, want } => {
                write!(f, "maximum {want} items allowed, but got {got} items")
            }
            Self::MinContains { got, want } => {
                write!(
                    f,
                    "minimum {want} valid items required, but found {} valid items at {}",
                    got.len(),
                    join_iter(got, ", ")
                )
            }
            Self::Contains => write!(f, "no items match contains schema"),
            Self::MaxContains { got, want } => {
                write!(
                    f,
                    "maximum {want} items allowed to match contains schema, but found {} items at {}",
                    got.len(),
                    join_iter(got, ", ")
                )
            }
            Self::UniqueItems { got: [i, j] } => write!(f, "items at {i} and {j} are equal"),
            Self::AdditionalItems { got, want } => {
                write!(
                    f,
                    "only {want} items allowed to match contains schema, but got {got} items",
                )
            }
            Self::MinLength { got, want } => write!(f, "length must be >={want}, but got {got}"),
            Self::MaxLength { got, want } => write!(f, "length must be <={want}, but got {got}"),
            Self::Pattern { got, want } => {
                write!(f, "{} does not match pattern {}", quote(got), quote(want))
            }
            Self::ContentEncoding { want, .. } => write!(f, "value is not {} encoded", quote(want)),
            Self::ContentMediaType { want, .. } => {
                write!(f, "value is not of mediatype {}", quote(want))
            }
            Self::ContentSchema => write!(f, "decoded content does not validate against contentSchema"),
            Self::Minimum { got, want } => write!(f, "must be >={want}, but got {got}"),
            Self::Maximum { got, want } => write!(f, "must be <={want}, but got {got}"),
            Self::ExclusiveMinimum { got, want } => write!(f, "must be > {want} but got {got}"),
            Self::ExclusiveMaximum { got, want } => write!(f, "must be < {want} but got {got}"),
            Self::MultipleOf { got, want } => write!(f, "{got} is not multipleOf {want}"),
            Self::Not => write!(f, "not failed"),
            Self::AllOf { got } => write!(f, "invalid against subschemas {}", join_iter(got, ", ")),
            Self::AnyOf => write!(f, "anyOf failed"),
            Self::OneOf { got } => {
                if got.is_empty() {
                    write!(f, "oneOf failed")
                } else {
                    write!(
                        f,
                        "want valid against oneOf subschema, but valid against subschemas {}",
                        join_iter(got, " and "),
                    )
                }
            }
            Self::IfThenElse => write!(f, "if-then-else failed"),
            Self::Reference { keyword, url } => write!(f, "{keyword} {url} failed"),
            Self::RefCycle => write!(f, "cycle detected while resolving reference"),
            Self::Schema { url } => write!(f, "validation failed against schema {url}"),
        }
    }
}
