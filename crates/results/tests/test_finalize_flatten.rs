//! Finalize and flatten behaviour observed through the public API
//!
//! Covers record order and depths, pruning of untitled sections, score
//! aggregation and the once-only finalize rule.

use anyhow::Result;
use assay_results::{
    HeuristicDefinition, HeuristicTable, ParentRef, ResultContext, ResultError, SectionBuilder,
    ServiceResult,
};
use std::sync::Arc;

fn context() -> Arc<ResultContext> {
    let catalog = HeuristicTable::new()
        .with_definition(HeuristicDefinition::new(1, 100))
        .with_definition(HeuristicDefinition::new(2, 40))
        .with_definition(HeuristicDefinition::new(3, 1000).with_max_score(300));
    ResultContext::new(catalog).into_shared()
}

fn titles(result: &assay_results::FinalReport) -> Vec<String> {
    result.sections.iter().map(|r| r.title_text.clone()).collect()
}

#[test]
fn test_documented_flatten_order() -> Result<()> {
    let mut result = ServiceResult::new(context());

    let r = result.create_section(SectionBuilder::new("R"))?;
    let c1 = result.create_section(SectionBuilder::new("C1"))?;
    let c1a = result.create_section(SectionBuilder::new("C1a"))?;
    let c2 = result.create_section(SectionBuilder::new("C2"))?;

    result.add_subsection(c1, c1a, false)?;
    result.add_subsection(r, c1, false)?;
    result.add_subsection(r, c2, false)?;
    result.add_section(r, false)?;

    let report = result.finalize()?;
    assert_eq!(titles(&report), ["R", "C1", "C1a", "C2"]);
    assert_eq!(
        report.sections.iter().map(|r| r.depth).collect::<Vec<_>>(),
        [0, 1, 2, 1]
    );
    Ok(())
}

#[test]
fn test_childless_top_level_sections_each_emit_once() -> Result<()> {
    let mut result = ServiceResult::with_sections(
        context(),
        [
            SectionBuilder::new("A"),
            SectionBuilder::new("B"),
            SectionBuilder::new("C"),
        ],
    )?;

    let report = result.finalize()?;
    assert_eq!(titles(&report), ["A", "B", "C"]);
    assert!(report.sections.iter().all(|r| r.depth == 0));
    Ok(())
}

#[test]
fn test_untitled_section_drops_valid_descendants() -> Result<()> {
    let mut result = ServiceResult::new(context());
    let root = result.create_section(SectionBuilder::new("Root").parent(ParentRef::Result))?;
    let untitled = result.create_section(SectionBuilder::new(" \t ").parent(root))?;
    let hidden = result.create_section(SectionBuilder::new("Hidden child").parent(untitled))?;
    result
        .section_mut(hidden)?
        .set_heuristic(1, None, None)?;

    let report = result.finalize()?;
    assert_eq!(titles(&report), ["Root"]);
    assert_eq!(report.score, 0);
    Ok(())
}

#[test]
fn test_total_is_sum_of_record_scores() -> Result<()> {
    let mut result = ServiceResult::new(context());
    let top = result.create_section(SectionBuilder::new("Top").parent(ParentRef::Result))?;
    result.section_mut(top)?.set_heuristic(1, None, None)?;

    let capped = result.create_section(SectionBuilder::new("Capped").parent(top))?;
    result.section_mut(capped)?.set_heuristic(3, None, None)?;

    result.create_section(SectionBuilder::new("Plain").parent(top))?;

    let other = result.create_section(SectionBuilder::new("Other").parent(ParentRef::Result))?;
    result.section_mut(other)?.set_heuristic(2, None, Some("sig"))?;

    let report = result.finalize()?;
    let summed: i64 = report.sections.iter().map(|r| r.score()).sum();
    assert_eq!(report.score, summed);
    assert_eq!(report.score, 100 + 300 + 40);
    Ok(())
}

#[test]
fn test_second_finalize_is_rejected() -> Result<()> {
    let mut result = ServiceResult::new(context());
    result.create_section(SectionBuilder::new("Once").parent(ParentRef::Result))?;

    let first = result.finalize()?;
    assert_eq!(first.sections.len(), 1);

    match result.finalize() {
        Err(ResultError::ResultAggregation(message)) => {
            assert!(message.contains("Double finalize"));
        }
        other => panic!("expected an aggregation error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_records_carry_section_metadata() -> Result<()> {
    let mut result = ServiceResult::new(context());
    let id = result.create_section(
        SectionBuilder::new("Indicators")
            .classification("TLP:AMBER")
            .tag("network.static.domain", "evil.example")
            .tag("network.static.domain", "evil.example")
            .zeroize_on_tag_safe(true)
            .auto_collapse(true)
            .parent(ParentRef::Result),
    )?;
    result.section_mut(id)?.add_line("first")?;
    result.section_mut(id)?.add_line("second")?;

    let report = result.finalize()?;
    let record = &report.sections[0];

    assert_eq!(record.classification.as_str(), "TLP:AMBER");
    assert_eq!(record.body.as_deref(), Some("first\nsecond"));
    assert!(record.zeroize_on_tag_safe);
    assert!(record.auto_collapse);
    assert_eq!(
        record.tags,
        serde_json::json!({"network": {"static": {"domain": ["evil.example"]}}})
    );
    Ok(())
}
