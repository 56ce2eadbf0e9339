use ludus_filter::{AttrFilter, Filter, FlagTest, Selector, Verdict};
use ludus_types::Entity;
use pretty_assertions::assert_eq;
use serde_json::json;

fn grant_like(id: &str, name: &str) -> Entity {
    Entity::named(name).with_id(id).with_kind("grant")
}

// ── Flag semantics table ──────────────────────────────────────────

#[test]
fn set_accepts_on_any_shared_flag() {
    let e = Entity::new().with_flags(["a", "b", "c"]);
    let f: Filter = serde_json::from_value(json!({"attr": {"flag": {"any": ["a", "d"]}}})).unwrap();
    assert_eq!(f.accepts(&e), Verdict::Accept);
}

#[test]
fn list_rejects_on_missing_flag() {
    let e = Entity::new().with_flags(["a", "b", "c"]);
    let f: Filter = serde_json::from_value(json!({"attr": {"flag": {"all": ["a", "d"]}}})).unwrap();
    assert_eq!(f.accepts(&e), Verdict::Reject);
}

#[test]
fn single_flag_requires_that_flag() {
    let e = Entity::new().with_flag("b");
    assert!(Filter::flag("b").matches(&e));
    assert!(!Filter::flag("a").matches(&e));
}

// ── Wire shape ────────────────────────────────────────────────────

#[test]
fn all_sentinel_serializes_as_string() {
    assert_eq!(serde_json::to_value(Filter::All).unwrap(), json!("all"));
    let back: Filter = serde_json::from_value(json!("all")).unwrap();
    assert!(back.is_all());
}

#[test]
fn attr_filter_wire_shape() {
    let f = Filter::Attr(
        AttrFilter::new()
            .with_id(Selector::AnyOf(["g1".to_string(), "g2".to_string()].into()))
            .with_kind("grant")
            .with_flag(FlagTest::Has("urgent".into())),
    );
    let wire = serde_json::to_value(&f).unwrap();
    assert_eq!(
        wire,
        json!({"attr": {"id": ["g1", "g2"], "type": "grant", "flag": {"has": "urgent"}}})
    );
    let back: Filter = serde_json::from_value(wire).unwrap();
    assert_eq!(back, f);
}

#[test]
fn combinator_wire_shape() {
    let f = Filter::name("place") & !Filter::id("g1");
    let wire = serde_json::to_value(&f).unwrap();
    assert_eq!(
        wire,
        json!({"and": [
            {"attr": {"name": "place"}},
            {"not": {"attr": {"id": "g1"}}}
        ]})
    );
}

// ── Selection ─────────────────────────────────────────────────────

#[test]
fn select_by_name_set() {
    let grants = vec![
        grant_like("g1", "place"),
        grant_like("g2", "pass"),
        grant_like("g3", "resign"),
    ];
    let picked = Filter::names(["place", "resign"]).select(&grants);
    let ids: Vec<&str> = picked.iter().map(|g| g.id()).collect();
    assert_eq!(ids, vec!["g1", "g3"]);
}

#[test]
fn nested_any_all() {
    let f = Filter::all_of(vec![
        Filter::kind("grant"),
        Filter::any_of(vec![Filter::id("g2"), Filter::id("g3")]),
    ]);
    assert!(!f.matches(&grant_like("g1", "x")));
    assert!(f.matches(&grant_like("g2", "x")));
}

#[test]
fn empty_attr_filter_selects_nothing() {
    let grants = vec![grant_like("g1", "place")];
    assert!(Filter::Attr(AttrFilter::new()).select(&grants).is_empty());
    assert_eq!(Filter::All.select(&grants).len(), 1);
}
