use anyhow::Result;
use assay_results::{
    BodyFormat, GraphBody, HeuristicCatalog, HeuristicDefinition, HeuristicId, JsonBody,
    KeyValueBody, MemoryDumpBody, MultiBody, ParentRef, ProcessItem, ProcessTreeBody,
    ResultContext, ResultError, SectionBody, SectionBuilder, ServiceResult, TableBody, TableRow,
    TextBody, TextSanitizer, UrlBody,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Catalog that knows every id and scores it by its own value.
struct EchoCatalog(Vec<HeuristicDefinition>);

impl EchoCatalog {
    fn new(ids: &[HeuristicId]) -> Self {
        Self(
            ids.iter()
                .map(|id| HeuristicDefinition::new(*id, i64::from(*id)))
                .collect(),
        )
    }
}

impl HeuristicCatalog for EchoCatalog {
    fn lookup(&self, heur_id: HeuristicId) -> Option<&HeuristicDefinition> {
        self.0.iter().find(|d| d.heur_id == heur_id)
    }
}

struct Redactor;

impl TextSanitizer for Redactor {
    fn safe(&self, text: &str) -> String {
        text.replace("password", "********")
    }
}

fn context() -> Arc<ResultContext> {
    ResultContext::new(EchoCatalog::new(&[5, 7]))
        .with_sanitizer(Redactor)
        .with_default_classification("TLP:GREEN")
        .into_shared()
}

fn body_json(body: Option<&str>) -> Value {
    serde_json::from_str(body.unwrap_or("null")).unwrap_or(Value::Null)
}

#[test]
fn test_injected_collaborators_are_used() -> Result<()> {
    let mut result = ServiceResult::new(context());
    let id = result.create_section(
        SectionBuilder::new("Found password in config").parent(ParentRef::Result),
    )?;
    result.section_mut(id)?.add_line("password=hunter2")?;
    result.section_mut(id)?.set_heuristic(7, None, None)?;

    let report = result.finalize()?;
    let record = &report.sections[0];
    assert_eq!(record.title_text, "Found ******** in config");
    assert_eq!(record.body.as_deref(), Some("********=hunter2"));
    assert_eq!(record.classification.as_str(), "TLP:GREEN");
    assert_eq!(report.score, 7);
    Ok(())
}

#[test]
fn test_typed_bodies_render_at_finalize() -> Result<()> {
    let mut result = ServiceResult::new(context());

    let graph = result.create_typed_section(
        SectionBuilder::new("Entropy").parent(ParentRef::Result),
        GraphBody::new(),
    )?;
    let urls = result.create_typed_section(
        SectionBuilder::new("URLs").parent(ParentRef::Result),
        UrlBody::new(),
    )?;
    let json_body = result.create_typed_section(
        SectionBuilder::new("Config").parent(ParentRef::Result),
        JsonBody::new(),
    )?;
    let tree = result.create_typed_section(
        SectionBuilder::new("Processes").parent(ParentRef::Result),
        ProcessTreeBody::new(),
    )?;
    let table = result.create_typed_section(
        SectionBuilder::new("Imports").parent(ParentRef::Result),
        TableBody::new(),
    )?;

    result.typed_body_mut(graph)?.set_colormap(0, 8, vec![1, 7, 3]);
    result
        .typed_body_mut(urls)?
        .add_url("https://example.com/a", Some("a"));
    result.typed_body_mut(urls)?.add_url("https://example.com/b", None);

    let mut partial = serde_json::Map::new();
    partial.insert("mutex".into(), json!("Global\\x"));
    result.typed_body_mut(json_body)?.update_json(partial);

    let child = ProcessItem::new(2, "cmd.exe", "cmd /c calc");
    result
        .typed_body_mut(tree)?
        .add_process(&ProcessItem::new(1, "explorer.exe", "explorer").with_child(child));

    result.typed_body_mut(table)?.add_row(
        TableRow::new()
            .with("dll", "kernel32.dll")
            .with("function", "VirtualAlloc"),
    );

    let report = result.finalize()?;
    let formats: Vec<_> = report.sections.iter().map(|r| r.body_format).collect();
    assert_eq!(
        formats,
        [
            BodyFormat::GraphData,
            BodyFormat::Url,
            BodyFormat::Json,
            BodyFormat::ProcessTree,
            BodyFormat::Table,
        ]
    );

    assert_eq!(
        body_json(report.sections[0].body.as_deref()),
        json!({"type": "colormap", "data": {"domain": [0, 8], "values": [1, 7, 3]}})
    );
    assert_eq!(
        body_json(report.sections[1].body.as_deref()),
        json!([{"url": "https://example.com/a", "name": "a"}, {"url": "https://example.com/b"}])
    );
    assert_eq!(
        body_json(report.sections[2].body.as_deref()),
        json!({"mutex": "Global\\x"})
    );
    assert_eq!(
        body_json(report.sections[3].body.as_deref())[0]["children"][0]["process_name"],
        "cmd.exe"
    );
    assert_eq!(
        body_json(report.sections[4].body.as_deref()),
        json!([{"dll": "kernel32.dll", "function": "VirtualAlloc"}])
    );
    Ok(())
}

#[test]
fn test_typed_section_refuses_raw_text() -> Result<()> {
    let mut result = ServiceResult::new(context());
    let kv = result.create_typed_section(SectionBuilder::new("KV"), KeyValueBody::new())?;

    let section = result.section_mut(kv.id())?;
    assert!(matches!(
        section.add_line("nope"),
        Err(ResultError::InvalidFunction(_))
    ));
    assert!(matches!(
        section.set_body("nope", BodyFormat::Text),
        Err(ResultError::InvalidFunction(_))
    ));
    assert!(section.is_typed());
    Ok(())
}

#[test]
fn test_memory_dump_section() -> Result<()> {
    let mut result = ServiceResult::new(context());
    let dump = result.create_typed_section(
        SectionBuilder::memory_dump("Shellcode").parent(ParentRef::Result),
        MemoryDumpBody::new(),
    )?;
    result.typed_body_mut(dump)?.add_line("00000000  fc e8 82 00");

    let raw = result.create_section(
        SectionBuilder::memory_dump("Raw dump")
            .body("4d 5a 90 00")
            .parent(ParentRef::Result),
    )?;
    assert_eq!(result.section(raw)?.body_format(), BodyFormat::MemoryDump);

    let report = result.finalize()?;
    assert_eq!(report.sections[0].body_format, BodyFormat::MemoryDump);
    assert_eq!(report.sections[0].body.as_deref(), Some("00000000  fc e8 82 00"));
    assert_eq!(report.sections[1].body.as_deref(), Some("4d 5a 90 00"));
    Ok(())
}

#[test]
fn test_multi_body_snapshots_parts() -> Result<()> {
    let mut text = TextBody::new();
    text.add_lines(["line one", "line two"]);
    let mut kv = KeyValueBody::new();
    kv.set_item("a", 1);

    let mut multi = MultiBody::new();
    multi.add_section_body(&SectionBody::from(text));
    multi.add_section_body(&SectionBody::from(kv));

    let mut result = ServiceResult::new(context());
    let section = result.create_typed_section(
        SectionBuilder::new("Mixed").parent(ParentRef::Result),
        multi,
    )?;
    assert_eq!(result.typed_body(section)?.parts().len(), 2);

    let report = result.finalize()?;
    assert_eq!(report.sections[0].body_format, BodyFormat::Multi);
    assert_eq!(
        body_json(report.sections[0].body.as_deref()),
        json!([["TEXT", "line one\nline two"], ["KEY_VALUE", {"a": 1}]])
    );
    Ok(())
}

#[test]
fn test_set_body_from_structured_body() -> Result<()> {
    let mut result = ServiceResult::new(context());
    let id = result.create_section(SectionBuilder::new("Swap").parent(ParentRef::Result))?;
    result.section_mut(id)?.add_line("temporary")?;

    let kv: SectionBody = KeyValueBody::from_items([("a", 1), ("b", 2)]).into();
    result.section_mut(id)?.set_section_body(&kv)?;

    let report = result.finalize()?;
    assert_eq!(report.sections[0].body_format, BodyFormat::KeyValue);
    assert_eq!(body_json(report.sections[0].body.as_deref()), json!({"a": 1, "b": 2}));
    Ok(())
}

#[test]
fn test_typed_text_bodies_use_context_sanitizer() -> Result<()> {
    let mut result = ServiceResult::new(context());
    let notes = result.create_typed_section(
        SectionBuilder::new("Notes").parent(ParentRef::Result),
        TextBody::new(),
    )?;
    let dump = result.create_typed_section(
        SectionBuilder::memory_dump("Strings").parent(ParentRef::Result),
        MemoryDumpBody::new(),
    )?;

    result.typed_body_mut(notes)?.add_line("password reuse");
    result
        .typed_body_mut(dump)?
        .add_lines(["00000000  password", "00000010  \u{1}"]);

    let report = result.finalize()?;
    assert_eq!(report.sections[0].body.as_deref(), Some("******** reuse"));
    assert_eq!(
        report.sections[1].body.as_deref(),
        Some("00000000  ********\n00000010  \u{1}")
    );
    Ok(())
}
