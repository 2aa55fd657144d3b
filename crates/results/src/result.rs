//! Result tree
//!
//! A `ServiceResult` owns every section created through it and addresses
//! them by `SectionId`. Parent links are plain ids, so attaching a section
//! somewhere new detaches it from wherever it was listed before, and a
//! section can never be listed twice.
//!
//! `finalize` runs exactly once: it validates and prunes the tree depth
//! first, assigns depths, then flattens the survivors into report records
//! and sums their heuristic scores.

use crate::body::{BodyVariant, SectionBody};
use crate::core::{ResultContext, ResultError};
use crate::report::{FinalReport, SectionRecord};
use crate::section::{ParentRef, ResultSection, SectionBuilder, SectionId, TypedSectionId};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct ServiceResult {
    ctx: Arc<ResultContext>,
    arena: Vec<ResultSection>,
    sections: Vec<SectionId>,
    score: i64,
    finalized: bool,
}

impl ServiceResult {
    pub fn new(ctx: Arc<ResultContext>) -> Self {
        Self {
            ctx,
            arena: Vec::new(),
            sections: Vec::new(),
            score: 0,
            finalized: false,
        }
    }

    /// Result whose top level starts with one section per builder, in order.
    pub fn with_sections<I>(ctx: Arc<ResultContext>, builders: I) -> Result<Self, ResultError>
    where
        I: IntoIterator<Item = SectionBuilder>,
    {
        let mut result = Self::new(ctx);
        for builder in builders {
            let id = result.create_section(builder)?;
            result.add_section(id, false)?;
        }
        Ok(result)
    }

    pub fn context(&self) -> &Arc<ResultContext> {
        &self.ctx
    }

    /// Creates a section with a raw body. If the builder names a parent the
    /// section is attached to it immediately.
    pub fn create_section(&mut self, builder: SectionBuilder) -> Result<SectionId, ResultError> {
        self.insert(builder, None)
    }

    /// Creates a section bound to `body`. The body stays mutable through
    /// [`ServiceResult::typed_body_mut`] and is rendered at finalize.
    pub fn create_typed_section<B: BodyVariant>(
        &mut self,
        builder: SectionBuilder,
        body: B,
    ) -> Result<TypedSectionId<B>, ResultError> {
        let mut body: SectionBody = body.into();
        match &mut body {
            SectionBody::Text(text) => text.bind_sanitizer(self.ctx.sanitizer_handle()),
            SectionBody::MemoryDump(dump) => dump.bind_sanitizer(self.ctx.sanitizer_handle()),
            _ => {}
        }
        let id = self.insert(builder, Some(body))?;
        Ok(TypedSectionId::new(id))
    }

    fn insert(
        &mut self,
        builder: SectionBuilder,
        typed_body: Option<SectionBody>,
    ) -> Result<SectionId, ResultError> {
        self.ensure_open()?;
        let parent = builder.parent_ref();
        if let Some(ParentRef::Section(parent)) = parent {
            self.check(parent)?;
        }

        let id = SectionId(self.arena.len());
        self.arena.push(ResultSection::build(
            id,
            Arc::clone(&self.ctx),
            builder,
            typed_body,
        ));
        debug!(section = %id, title = %self.arena[id.0].title(), "Created section");

        match parent {
            Some(ParentRef::Result) => {
                self.add_section(id, false)?;
                self.arena[id.0].parent = Some(ParentRef::Result);
            }
            Some(ParentRef::Section(parent)) => self.add_subsection(parent, id, false)?,
            None => {}
        }

        Ok(id)
    }

    fn check(&self, id: SectionId) -> Result<(), ResultError> {
        if id.0 < self.arena.len() {
            Ok(())
        } else {
            Err(ResultError::UnknownSection(id))
        }
    }

    fn ensure_open(&self) -> Result<(), ResultError> {
        if self.finalized {
            return Err(ResultError::ResultAggregation(
                "Cannot change the layout of a finalized result".to_string(),
            ));
        }
        Ok(())
    }

    pub fn section(&self, id: SectionId) -> Result<&ResultSection, ResultError> {
        self.arena.get(id.0).ok_or(ResultError::UnknownSection(id))
    }

    pub fn section_mut(&mut self, id: SectionId) -> Result<&mut ResultSection, ResultError> {
        self.arena.get_mut(id.0).ok_or(ResultError::UnknownSection(id))
    }

    pub fn typed_body<B: BodyVariant>(&self, id: TypedSectionId<B>) -> Result<&B, ResultError> {
        self.section(id.id())?.typed_body::<B>()
    }

    pub fn typed_body_mut<B: BodyVariant>(
        &mut self,
        id: TypedSectionId<B>,
    ) -> Result<&mut B, ResultError> {
        self.section_mut(id.id())?.typed_body_mut::<B>()
    }

    /// Lists `id` at the top level, first if `on_top`. The section's parent
    /// is left unset until finalize.
    pub fn add_section(&mut self, id: SectionId, on_top: bool) -> Result<(), ResultError> {
        self.ensure_open()?;
        self.check(id)?;
        self.detach(id);

        if on_top {
            self.sections.insert(0, id);
        } else {
            self.sections.push(id);
        }
        Ok(())
    }

    /// Lists `child` under `parent`, first if `on_top`. Fails if `child` is
    /// `parent` or one of its ancestors.
    pub fn add_subsection(
        &mut self,
        parent: SectionId,
        child: SectionId,
        on_top: bool,
    ) -> Result<(), ResultError> {
        self.ensure_open()?;
        self.check(parent)?;
        self.check(child)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(ResultError::SectionCycle { parent, child });
        }

        self.detach(child);

        let subsections = &mut self.arena[parent.0].subsections;
        if on_top {
            subsections.insert(0, child);
        } else {
            subsections.push(child);
        }
        self.arena[child.0].parent = Some(ParentRef::Section(parent));
        Ok(())
    }

    fn is_ancestor_or_self(&self, candidate: SectionId, mut node: SectionId) -> bool {
        loop {
            if node == candidate {
                return true;
            }
            match self.arena[node.0].parent {
                Some(ParentRef::Section(parent)) => node = parent,
                _ => return false,
            }
        }
    }

    fn detach(&mut self, id: SectionId) {
        if let Some(ParentRef::Section(parent)) = self.arena[id.0].parent.take() {
            self.arena[parent.0].subsections.retain(|s| *s != id);
        }
        self.sections.retain(|s| *s != id);
    }

    /// Top-level sections in display order.
    pub fn sections(&self) -> &[SectionId] {
        &self.sections
    }

    /// Every section created through this result, attached or not.
    pub fn all_sections(&self) -> impl Iterator<Item = &ResultSection> {
        self.arena.iter()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Total score; zero until the result is finalized.
    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn finalize(&mut self) -> Result<FinalReport, ResultError> {
        if self.finalized {
            return Err(ResultError::ResultAggregation(
                "Double finalize() on result detected.".to_string(),
            ));
        }
        self.finalized = true;

        let top_level = self.sections.clone();
        let mut kept = Vec::with_capacity(top_level.len());
        for id in top_level {
            self.arena[id.0].parent = Some(ParentRef::Result);
            if self.finalize_section(id, 0)? {
                kept.push(id);
            } else {
                self.arena[id.0].parent = None;
            }
        }
        self.sections = kept;

        let mut records = Vec::new();
        for id in &self.sections {
            self.flatten(*id, true, &mut records);
        }

        self.score = records
            .iter()
            .fold(0i64, |total, record| total.saturating_add(record.score()));

        info!(
            sections = records.len(),
            score = self.score,
            "Result finalized"
        );

        Ok(FinalReport {
            score: self.score,
            sections: records,
        })
    }

    fn finalize_section(&mut self, id: SectionId, depth: usize) -> Result<bool, ResultError> {
        if !self.arena[id.0].finalize_node(depth)? {
            debug!(section = %id, "Dropping section and its subsections");
            return Ok(false);
        }

        let children = self.arena[id.0].subsections.clone();
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            if self.finalize_section(child, depth + 1)? {
                kept.push(child);
            } else {
                self.arena[child.0].parent = None;
            }
        }
        self.arena[id.0].subsections = kept;

        Ok(true)
    }

    fn flatten(&self, id: SectionId, root: bool, records: &mut Vec<SectionRecord>) {
        let section = &self.arena[id.0];
        if section.subsections.is_empty() {
            records.push(SectionRecord::snapshot(section));
            return;
        }

        if root {
            records.push(SectionRecord::snapshot(section));
        }

        for child in &section.subsections {
            let subsection = &self.arena[child.0];
            records.push(SectionRecord::snapshot(subsection));
            if !subsection.subsections.is_empty() {
                self.flatten(*child, false, records);
            }
        }
    }
}
