use crate::body::text::{append_segment, concat_parts, join_lines};
use crate::body::{BodyVariant, SectionBody};
use crate::core::{BodyFormat, Classification, ResultContext, ResultError};
use crate::heuristics::{Heuristic, HeuristicId, HeuristicOptions};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{error, warn};

/// Handle to a section stored in a [`crate::ServiceResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SectionId(pub(crate) usize);

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a section bound to a body of type `B`.
pub struct TypedSectionId<B> {
    id: SectionId,
    _body: PhantomData<fn() -> B>,
}

impl<B> TypedSectionId<B> {
    pub(crate) fn new(id: SectionId) -> Self {
        Self {
            id,
            _body: PhantomData,
        }
    }

    pub fn id(&self) -> SectionId {
        self.id
    }
}

impl<B> Clone for TypedSectionId<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for TypedSectionId<B> {}

impl<B> fmt::Debug for TypedSectionId<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedSectionId").field(&self.id).finish()
    }
}

impl<B> From<TypedSectionId<B>> for SectionId {
    fn from(typed: TypedSectionId<B>) -> Self {
        typed.id
    }
}

/// Non-owning back-reference from a section to whoever lists it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    Result,
    Section(SectionId),
}

impl From<SectionId> for ParentRef {
    fn from(id: SectionId) -> Self {
        Self::Section(id)
    }
}

/// A heuristic handed to a section builder. Anything that is not a
/// constructed `Heuristic` is dropped with a warning.
#[derive(Debug, Clone)]
pub enum HeuristicSlot {
    Valid(Heuristic),
    Invalid(String),
}

impl From<Heuristic> for HeuristicSlot {
    fn from(heuristic: Heuristic) -> Self {
        Self::Valid(heuristic)
    }
}

#[derive(Debug, Clone)]
enum BodyInput {
    Text(String),
    Body(SectionBody),
}

#[derive(Debug, Clone)]
enum SectionContent {
    Raw {
        body: Option<String>,
        format: BodyFormat,
    },
    Typed(SectionBody),
}

/// Construction arguments for a section.
#[derive(Debug, Clone)]
pub struct SectionBuilder {
    title: String,
    body: Option<BodyInput>,
    body_format: BodyFormat,
    classification: Option<Classification>,
    heuristic: Option<HeuristicSlot>,
    tags: BTreeMap<String, Vec<String>>,
    parent: Option<ParentRef>,
    zeroize_on_tag_safe: bool,
    auto_collapse: bool,
    zeroize_on_sig_safe: bool,
}

impl SectionBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: None,
            body_format: BodyFormat::Text,
            classification: None,
            heuristic: None,
            tags: BTreeMap::new(),
            parent: None,
            zeroize_on_tag_safe: false,
            auto_collapse: false,
            zeroize_on_sig_safe: true,
        }
    }

    /// Title built from `parts` concatenated without a separator.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(concat_parts(parts))
    }

    pub fn memory_dump(title: impl Into<String>) -> Self {
        Self::new(title).body_format(BodyFormat::MemoryDump)
    }

    /// Raw body text. Ignored for typed sections.
    pub fn body(mut self, text: impl Into<String>) -> Self {
        self.body = Some(BodyInput::Text(text.into()));
        self
    }

    /// Captures the rendered form and format of `body` at construction.
    /// Ignored for typed sections.
    pub fn section_body(mut self, body: impl Into<SectionBody>) -> Self {
        self.body = Some(BodyInput::Body(body.into()));
        self
    }

    pub fn body_format(mut self, format: BodyFormat) -> Self {
        self.body_format = format;
        self
    }

    pub fn classification(mut self, classification: impl Into<Classification>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    pub fn heuristic(mut self, heuristic: impl Into<HeuristicSlot>) -> Self {
        self.heuristic = Some(heuristic.into());
        self
    }

    pub fn tag(mut self, tag_type: impl Into<String>, value: impl Into<String>) -> Self {
        insert_tag(&mut self.tags, tag_type.into(), value.into());
        self
    }

    pub fn tags(mut self, tags: BTreeMap<String, Vec<String>>) -> Self {
        for (tag_type, values) in tags {
            for value in values {
                insert_tag(&mut self.tags, tag_type.clone(), value);
            }
        }
        self
    }

    /// Registers the new section with `parent` as soon as it is created.
    pub fn parent(mut self, parent: impl Into<ParentRef>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn zeroize_on_tag_safe(mut self, enabled: bool) -> Self {
        self.zeroize_on_tag_safe = enabled;
        self
    }

    pub fn auto_collapse(mut self, enabled: bool) -> Self {
        self.auto_collapse = enabled;
        self
    }

    pub fn zeroize_on_sig_safe(mut self, enabled: bool) -> Self {
        self.zeroize_on_sig_safe = enabled;
        self
    }

    pub(crate) fn parent_ref(&self) -> Option<ParentRef> {
        self.parent
    }
}

fn insert_tag(tags: &mut BTreeMap<String, Vec<String>>, tag_type: String, value: String) {
    let values = tags.entry(tag_type).or_default();
    if !values.contains(&value) {
        values.push(value);
    }
}

/// One node of a result tree.
pub struct ResultSection {
    id: SectionId,
    ctx: Arc<ResultContext>,
    title_text: String,
    content: SectionContent,
    classification: Classification,
    depth: usize,
    tags: BTreeMap<String, Vec<String>>,
    heuristic: Option<Heuristic>,
    pub(crate) parent: Option<ParentRef>,
    pub(crate) subsections: Vec<SectionId>,
    zeroize_on_tag_safe: bool,
    auto_collapse: bool,
    zeroize_on_sig_safe: bool,
    finalized: bool,
}

impl ResultSection {
    pub(crate) fn build(
        id: SectionId,
        ctx: Arc<ResultContext>,
        builder: SectionBuilder,
        typed_body: Option<SectionBody>,
    ) -> Self {
        let title_text = ctx.safe(&builder.title);

        let content = match (typed_body, builder.body) {
            (Some(body), _) => SectionContent::Typed(body),
            (None, Some(BodyInput::Body(body))) => SectionContent::Raw {
                body: body.render(),
                format: body.format(),
            },
            (None, Some(BodyInput::Text(text))) => SectionContent::Raw {
                body: Some(text),
                format: builder.body_format,
            },
            (None, None) => SectionContent::Raw {
                body: None,
                format: builder.body_format,
            },
        };

        let heuristic = match builder.heuristic {
            Some(HeuristicSlot::Valid(heuristic)) => Some(heuristic),
            Some(HeuristicSlot::Invalid(description)) => {
                warn!(
                    section = %title_text,
                    heuristic = %description,
                    "This is not a valid Heuristic object"
                );
                None
            }
            None => None,
        };

        let classification = builder
            .classification
            .unwrap_or_else(|| ctx.default_classification().clone());

        Self {
            id,
            ctx,
            title_text,
            content,
            classification,
            depth: 0,
            tags: builder.tags,
            heuristic,
            parent: None,
            subsections: Vec::new(),
            zeroize_on_tag_safe: builder.zeroize_on_tag_safe,
            auto_collapse: builder.auto_collapse,
            zeroize_on_sig_safe: builder.zeroize_on_sig_safe,
            finalized: false,
        }
    }

    pub fn id(&self) -> SectionId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title_text
    }

    /// Rendered body. Typed sections render their bound body on each call.
    pub fn body(&self) -> Option<String> {
        match &self.content {
            SectionContent::Raw { body, .. } => body.clone(),
            SectionContent::Typed(body) => body.render(),
        }
    }

    pub fn body_format(&self) -> BodyFormat {
        match &self.content {
            SectionContent::Raw { format, .. } => *format,
            SectionContent::Typed(body) => body.format(),
        }
    }

    pub fn is_typed(&self) -> bool {
        matches!(self.content, SectionContent::Typed(_))
    }

    pub fn section_body(&self) -> Option<&SectionBody> {
        match &self.content {
            SectionContent::Typed(body) => Some(body),
            SectionContent::Raw { .. } => None,
        }
    }

    pub(crate) fn typed_body<B: BodyVariant>(&self) -> Result<&B, ResultError> {
        self.section_body()
            .and_then(B::from_body)
            .ok_or_else(|| self.wrong_body::<B>())
    }

    pub(crate) fn typed_body_mut<B: BodyVariant>(&mut self) -> Result<&mut B, ResultError> {
        let id = self.id;
        let format = self.body_format();
        let body = match &mut self.content {
            SectionContent::Typed(body) => B::from_body_mut(body),
            SectionContent::Raw { .. } => None,
        };
        body.ok_or_else(|| wrong_body_error::<B>(id, format))
    }

    fn wrong_body<B: BodyVariant>(&self) -> ResultError {
        wrong_body_error::<B>(self.id, self.body_format())
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn tags(&self) -> &BTreeMap<String, Vec<String>> {
        &self.tags
    }

    pub fn heuristic(&self) -> Option<&Heuristic> {
        self.heuristic.as_ref()
    }

    pub fn heuristic_mut(&mut self) -> Option<&mut Heuristic> {
        self.heuristic.as_mut()
    }

    pub fn parent(&self) -> Option<ParentRef> {
        self.parent
    }

    pub fn subsections(&self) -> &[SectionId] {
        &self.subsections
    }

    pub fn zeroize_on_tag_safe(&self) -> bool {
        self.zeroize_on_tag_safe
    }

    pub fn auto_collapse(&self) -> bool {
        self.auto_collapse
    }

    pub fn zeroize_on_sig_safe(&self) -> bool {
        self.zeroize_on_sig_safe
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn raw_body_mut(&mut self, operation: &str) -> Result<&mut Option<String>, ResultError> {
        match &mut self.content {
            SectionContent::Raw { body, .. } => Ok(body),
            SectionContent::Typed(_) => Err(ResultError::InvalidFunction(format!(
                "Do not use default {operation} method in a type specific section."
            ))),
        }
    }

    pub fn add_line(&mut self, text: &str) -> Result<(), ResultError> {
        let line = self.ctx.safe(text);
        append_segment(self.raw_body_mut("add_line")?, line);
        Ok(())
    }

    /// Adds one line made of `parts` concatenated without a separator.
    pub fn add_line_parts<I, S>(&mut self, parts: I) -> Result<(), ResultError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.add_line(&concat_parts(parts))
    }

    pub fn add_lines<I, S>(&mut self, lines: I) -> Result<(), ResultError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segment = self.ctx.safe(&join_lines(lines));
        append_segment(self.raw_body_mut("add_lines")?, segment);
        Ok(())
    }

    pub fn set_body(&mut self, text: impl Into<String>, format: BodyFormat) -> Result<(), ResultError> {
        self.raw_body_mut("set_body")?;
        self.content = SectionContent::Raw {
            body: Some(text.into()),
            format,
        };
        Ok(())
    }

    /// Replaces the body with the rendered form and format of `body`.
    pub fn set_section_body(&mut self, body: &SectionBody) -> Result<(), ResultError> {
        self.raw_body_mut("set_body")?;
        self.content = SectionContent::Raw {
            body: body.render(),
            format: body.format(),
        };
        Ok(())
    }

    pub fn add_tag(&mut self, tag_type: &str, value: &str) {
        insert_tag(&mut self.tags, tag_type.to_string(), value.to_string());
    }

    pub fn add_tag_bytes(&mut self, tag_type: &str, value: &[u8]) {
        let value = String::from_utf8_lossy(value);
        self.add_tag(tag_type, &value);
    }

    pub fn set_heuristic(
        &mut self,
        heur_id: HeuristicId,
        attack_id: Option<&str>,
        signature: Option<&str>,
    ) -> Result<(), ResultError> {
        if let Some(current) = &self.heuristic {
            return Err(ResultError::heuristic_already_set(current.heur_id(), heur_id));
        }

        let mut options = HeuristicOptions::new();
        options.attack_id = attack_id.map(str::to_string);
        options.signature = signature.map(str::to_string);

        self.heuristic = Some(Heuristic::with_options(&self.ctx, heur_id, options)?);
        Ok(())
    }

    /// Transitions the node itself to finalized. Returns whether the section
    /// should be kept; children are handled by the owning result.
    pub(crate) fn finalize_node(&mut self, depth: usize) -> Result<bool, ResultError> {
        if self.finalized {
            return Err(ResultError::ResultAggregation(format!(
                "Double finalize() on result section {} detected",
                self.id
            )));
        }
        self.finalized = true;

        if let SectionContent::Raw { body, .. } = &mut self.content {
            if body.as_deref() == Some("") {
                *body = None;
            }
        }

        self.depth = depth;

        if self.title_text.trim().is_empty() {
            error!(section = %self.id, depth, "Failed to finalize section, title is empty...");
            return Ok(false);
        }

        Ok(true)
    }
}

fn wrong_body_error<B: BodyVariant>(id: SectionId, actual: BodyFormat) -> ResultError {
    ResultError::InvalidFunction(format!(
        "Section {id} holds a {actual} body, not a type specific {} body",
        B::FORMAT
    ))
}

impl fmt::Debug for ResultSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSection")
            .field("id", &self.id)
            .field("title_text", &self.title_text)
            .field("content", &self.content)
            .field("classification", &self.classification)
            .field("depth", &self.depth)
            .field("tags", &self.tags)
            .field("heuristic", &self.heuristic)
            .field("parent", &self.parent)
            .field("subsections", &self.subsections)
            .field("finalized", &self.finalized)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{KeyValueBody, TextBody};
    use crate::heuristics::{HeuristicDefinition, HeuristicTable};

    fn context() -> Arc<ResultContext> {
        ResultContext::new(
            HeuristicTable::new()
                .with_definition(HeuristicDefinition::new(1, 100))
                .with_definition(HeuristicDefinition::new(2, 500)),
        )
        .into_shared()
    }

    fn section(builder: SectionBuilder) -> ResultSection {
        ResultSection::build(SectionId(0), context(), builder, None)
    }

    #[test]
    fn test_title_parts_and_sanitizing() {
        let s = section(SectionBuilder::from_parts(["Embedded ", "PE", "\u{0}"]));
        assert_eq!(s.title(), "Embedded PE\\x00");
        assert_eq!(s.classification().as_str(), "TLP:C");
        assert!(s.zeroize_on_sig_safe());
    }

    #[test]
    fn test_add_line_and_lines() {
        let mut s = section(SectionBuilder::new("Strings"));
        s.add_line("one").unwrap();
        s.add_lines(["two", "three"]).unwrap();
        s.add_line_parts(["fo", "ur"]).unwrap();
        assert_eq!(s.body().as_deref(), Some("one\ntwo\nthree\nfour"));
        assert_eq!(s.body_format(), BodyFormat::Text);
    }

    #[test]
    fn test_body_is_captured_not_aliased() {
        let mut text = TextBody::new();
        text.add_line("before");
        let builder = SectionBuilder::new("Captured").section_body(text.clone());
        text.add_line("after");

        let s = section(builder);
        assert_eq!(s.body().as_deref(), Some("before"));
        assert!(!s.is_typed());
    }

    #[test]
    fn test_captured_structured_body() {
        let s = section(SectionBuilder::new("KV").section_body(KeyValueBody::from_items([("a", 1)])));
        assert_eq!(s.body_format(), BodyFormat::KeyValue);
        assert_eq!(s.body().as_deref(), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_set_body_replaces_format() {
        let mut s = section(SectionBuilder::new("Dump"));
        s.set_body("4d5a", BodyFormat::MemoryDump).unwrap();
        assert_eq!(s.body_format(), BodyFormat::MemoryDump);
        assert_eq!(s.body().as_deref(), Some("4d5a"));
    }

    #[test]
    fn test_typed_section_rejects_text_mutators() {
        let mut s = ResultSection::build(
            SectionId(3),
            context(),
            SectionBuilder::new("Typed").body("ignored"),
            Some(KeyValueBody::new().into()),
        );

        assert!(matches!(s.add_line("x"), Err(ResultError::InvalidFunction(_))));
        assert!(matches!(s.add_lines(["x"]), Err(ResultError::InvalidFunction(_))));
        assert!(matches!(s.set_body("x", BodyFormat::Text), Err(ResultError::InvalidFunction(_))));
        assert_eq!(s.body_format(), BodyFormat::KeyValue);
        assert_eq!(s.body(), None);

        s.typed_body_mut::<KeyValueBody>().unwrap().set_item("k", true);
        assert_eq!(s.body().as_deref(), Some(r#"{"k": true}"#));
        assert!(s.typed_body::<TextBody>().is_err());
    }

    #[test]
    fn test_tags_are_deduplicated() {
        let mut s = section(SectionBuilder::new("Tags").tag("network.static.ip", "10.0.0.1"));
        s.add_tag("network.static.ip", "10.0.0.1");
        s.add_tag("network.static.ip", "10.0.0.2");
        s.add_tag_bytes("file.string.extracted", b"cmd.exe");

        assert_eq!(s.tags()["network.static.ip"], vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(s.tags()["file.string.extracted"], vec!["cmd.exe"]);
    }

    #[test]
    fn test_second_heuristic_is_rejected() {
        let mut s = section(SectionBuilder::new("Scored"));
        s.set_heuristic(1, None, Some("sig")).unwrap();
        let err = s.set_heuristic(2, None, None).unwrap_err();

        assert!(matches!(err, ResultError::InvalidHeuristic { heur_id: 2, .. }));
        assert_eq!(s.heuristic().map(Heuristic::heur_id), Some(1));
    }

    #[test]
    fn test_unknown_heuristic_id_fails() {
        let mut s = section(SectionBuilder::new("Scored"));
        assert!(s.set_heuristic(42, None, None).is_err());
        assert!(s.heuristic().is_none());
    }

    #[test]
    fn test_invalid_heuristic_slot_is_ignored() {
        let s = section(SectionBuilder::new("Soft").heuristic(HeuristicSlot::Invalid("\"high\"".into())));
        assert!(s.heuristic().is_none());
    }

    #[test]
    fn test_finalize_node_once() {
        let mut s = section(SectionBuilder::new("Once").body(""));
        assert!(s.finalize_node(2).unwrap());
        assert_eq!(s.depth(), 2);
        assert_eq!(s.body(), None);
        assert!(matches!(s.finalize_node(2), Err(ResultError::ResultAggregation(_))));
    }

    #[test]
    fn test_blank_title_is_rejected_after_depth_is_set() {
        let mut s = section(SectionBuilder::new("   "));
        assert!(!s.finalize_node(1).unwrap());
        assert_eq!(s.depth(), 1);
    }
}
