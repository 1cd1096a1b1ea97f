//! Combines a config section with its schema into the bindable view tree.
//!
//! `verify_schema` and `prime` run once at load; `merge` is pure and is
//! re-run after every structural edit.

use std::rc::Rc;

use log::trace;

use crate::catalog::{CheckArgs, SchemaCatalog};
use crate::events::Subscribers;
use crate::model::{Field, SectionNode};
use crate::schema::{SchemaError, SectionSpec};
use crate::store::ConfigSection;
use crate::value::Value;

/// Checks that every declared type exists in the catalog and that every
/// declared default passes its own check, wildcard templates included.
pub fn verify_schema(spec: &SectionSpec, catalog: &SchemaCatalog) -> Result<(), SchemaError> {
    for (name, scalar) in spec.scalars() {
        let entry =
            catalog
                .entry(scalar.type_name())
                .ok_or_else(|| SchemaError::UnknownType {
                    name: name.to_string(),
                    type_name: scalar.type_name().to_string(),
                })?;
        if let Some(default) = scalar.default() {
            check_default(entry, scalar, default).map_err(|source| SchemaError::BadDefault {
                name: name.to_string(),
                source,
            })?;
        }
    }
    for (_, child) in spec.sections() {
        verify_schema(child, catalog)?;
    }
    if let Some(wildcard) = spec.wildcard() {
        verify_schema(wildcard, catalog)?;
    }
    Ok(())
}

fn check_default(
    entry: &crate::catalog::CatalogEntry,
    scalar: &crate::schema::ScalarSpec,
    default: &Value,
) -> Result<Value, crate::catalog::ValidationError> {
    (entry.check)(default, &CheckArgs::new(scalar.args(), scalar.kwargs()))
}

/// Materializes declared structure into a section: missing scalars with a
/// default get the coerced default (marked as default), missing named child
/// sections are created, and wildcard-matched children are primed in turn.
///
/// Unmatched config content is left untouched.
pub fn prime(
    section: &mut ConfigSection,
    spec: &SectionSpec,
    catalog: &SchemaCatalog,
) -> Result<(), SchemaError> {
    for (name, scalar) in spec.scalars() {
        let entry =
            catalog
                .entry(scalar.type_name())
                .ok_or_else(|| SchemaError::UnknownType {
                    name: name.to_string(),
                    type_name: scalar.type_name().to_string(),
                })?;
        if section.value(name).is_some() {
            continue;
        }
        if let Some(default) = scalar.default() {
            let typed = check_default(entry, scalar, default).map_err(|source| {
                SchemaError::BadDefault {
                    name: name.to_string(),
                    source,
                }
            })?;
            trace!("priming '{name}' with default {typed}");
            section.set_value(name.to_string(), typed);
            section.mark_default(name.to_string());
        }
    }

    for (name, child_spec) in spec.sections() {
        let child = section.ensure_section(name);
        prime(child, child_spec, catalog)?;
    }

    if let Some(wildcard) = spec.wildcard() {
        let matched: Vec<String> = section
            .section_names()
            .filter(|name| spec.section(name).is_none())
            .map(str::to_string)
            .collect();
        for name in matched {
            let child = section.section_mut(&name).expect("listed above");
            prime(child, wildcard, catalog)?;
        }
    }

    Ok(())
}

/// Merges a (primed) config section with its schema into a view tree.
///
/// Pure and deterministic: identical inputs produce structurally and
/// order-identical trees. Config children with no named spec and no
/// wildcard are excluded from the view and preserved in the store.
pub fn merge(
    section: &ConfigSection,
    spec: &Rc<SectionSpec>,
    catalog: &SchemaCatalog,
    subscribers: &Subscribers,
) -> Result<SectionNode, SchemaError> {
    merge_at(section, spec, Vec::new(), None, false, catalog, subscribers)
}

fn merge_at(
    section: &ConfigSection,
    spec: &Rc<SectionSpec>,
    path: Vec<String>,
    name: Option<String>,
    via_wildcard: bool,
    catalog: &SchemaCatalog,
    subscribers: &Subscribers,
) -> Result<SectionNode, SchemaError> {
    let mut fields = Vec::new();
    for (scalar_name, scalar) in spec.scalars() {
        let entry =
            catalog
                .entry(scalar.type_name())
                .ok_or_else(|| SchemaError::UnknownType {
                    name: scalar_name.to_string(),
                    type_name: scalar.type_name().to_string(),
                })?;
        fields.push(Field::from_spec(
            scalar_name,
            path.clone(),
            scalar,
            entry,
            subscribers.clone(),
        ));
    }

    let mut children = Vec::new();
    for (child_name, child_spec) in spec.sections() {
        if let Some(child_section) = section.section(child_name) {
            children.push(merge_child(
                child_section,
                child_spec,
                &path,
                child_name,
                false,
                catalog,
                subscribers,
            )?);
        }
    }
    if let Some(wildcard) = spec.wildcard() {
        for (child_name, child_section) in section.sections() {
            if spec.section(child_name).is_some() {
                continue;
            }
            children.push(merge_child(
                child_section,
                wildcard,
                &path,
                child_name,
                true,
                catalog,
                subscribers,
            )?);
        }
    }

    Ok(SectionNode::new(
        name,
        path,
        fields,
        children,
        spec.wildcard().is_some(),
        via_wildcard,
        Rc::clone(spec),
    ))
}

#[allow(clippy::too_many_arguments)]
fn merge_child(
    section: &ConfigSection,
    spec: &Rc<SectionSpec>,
    parent_path: &[String],
    name: &str,
    via_wildcard: bool,
    catalog: &SchemaCatalog,
    subscribers: &Subscribers,
) -> Result<SectionNode, SchemaError> {
    let mut path = parent_path.to_vec();
    path.push(name.to_string());
    merge_at(
        section,
        spec,
        path,
        Some(name.to_string()),
        via_wildcard,
        catalog,
        subscribers,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::store::ConfigStore;

    const SCHEMA: &str = "\
retries = integer(default=3, min=0)
label = string
[logging]
level = option('debug', 'info', default='info')
[servers]
[[__many__]]
enabled = boolean(default=True)
";

    fn load(schema_text: &str, build: impl FnOnce(&mut ConfigStore)) -> (ConfigStore, Schema, SchemaCatalog) {
        let schema = Schema::parse(schema_text).unwrap();
        let catalog = SchemaCatalog::standard();
        let mut store = ConfigStore::new();
        build(&mut store);
        verify_schema(schema.root(), &catalog).unwrap();
        prime(store.root_mut(), schema.root(), &catalog).unwrap();
        (store, schema, catalog)
    }

    #[test]
    fn test_prime_materializes_defaults_and_sections() {
        let (store, _, _) = load(SCHEMA, |_| {});
        assert_eq!(store.root().value("retries"), Some(&Value::Int(3)));
        assert!(store.root().is_default("retries"));
        // No default declared: left unset.
        assert_eq!(store.root().value("label"), None);
        let logging = store.section(&["logging"]).unwrap();
        assert_eq!(logging.value("level"), Some(&"info".into()));
    }

    #[test]
    fn test_prime_keeps_explicit_values() {
        let (store, _, _) = load(SCHEMA, |store| {
            store.root_mut().set_value("retries", "9".into());
        });
        assert_eq!(store.root().value("retries"), Some(&"9".into()));
        assert!(!store.root().is_default("retries"));
    }

    #[test]
    fn test_prime_reaches_wildcard_children() {
        let (store, _, _) = load(SCHEMA, |store| {
            store
                .root_mut()
                .ensure_section("servers")
                .ensure_section("alpha");
        });
        let alpha = store.section(&["servers", "alpha"]).unwrap();
        assert_eq!(alpha.value("enabled"), Some(&Value::Bool(true)));
        assert!(alpha.is_default("enabled"));
    }

    #[test]
    fn test_bad_default_fails_at_load() {
        let schema = Schema::parse("port = integer(default=high)\n").unwrap();
        let catalog = SchemaCatalog::standard();
        let err = verify_schema(schema.root(), &catalog).unwrap_err();
        assert!(matches!(err, SchemaError::BadDefault { .. }));
    }

    #[test]
    fn test_bad_wildcard_default_fails_at_load() {
        let schema = Schema::parse("[s]\n[[__many__]]\nport = integer(default=high)\n").unwrap();
        let err = verify_schema(schema.root(), &SchemaCatalog::standard()).unwrap_err();
        assert!(matches!(err, SchemaError::BadDefault { .. }));
    }

    #[test]
    fn test_unknown_type_fails_at_load() {
        let schema = Schema::parse("x = flurble\n").unwrap();
        let err = verify_schema(schema.root(), &SchemaCatalog::standard()).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType { .. }));
    }

    fn layout(node: &SectionNode) -> Vec<String> {
        let mut out = vec![format!(
            "{}:{}:{}{}",
            node.path().join("."),
            node.child_names().join(","),
            u8::from(node.is_repeatable()),
            u8::from(node.is_removable()),
        )];
        for child in node.sections() {
            out.extend(layout(child));
        }
        out
    }

    #[test]
    fn test_merge_is_deterministic() {
        let (store, schema, catalog) = load(SCHEMA, |store| {
            let servers = store.root_mut().ensure_section("servers");
            servers.ensure_section("beta");
            servers.ensure_section("alpha");
        });
        let subscribers = Subscribers::new();
        let first = merge(store.root(), schema.root(), &catalog, &subscribers).unwrap();
        let second = merge(store.root(), schema.root(), &catalog, &subscribers).unwrap();
        assert_eq!(layout(&first), layout(&second));
        // Config-encounter order for wildcard children.
        let servers = first.section("servers").unwrap();
        let names: Vec<_> = servers.sections().iter().filter_map(|s| s.name()).collect();
        assert_eq!(names, ["beta", "alpha"]);
    }

    #[test]
    fn test_merge_flags() {
        let (store, schema, catalog) = load(SCHEMA, |store| {
            store
                .root_mut()
                .ensure_section("servers")
                .ensure_section("alpha");
        });
        let root = merge(store.root(), schema.root(), &catalog, &Subscribers::new()).unwrap();
        assert!(root.name().is_none());
        assert!(!root.is_removable());

        let servers = root.section("servers").unwrap();
        assert!(servers.is_repeatable());
        assert!(!servers.is_removable());

        let alpha = servers.section("alpha").unwrap();
        assert!(alpha.is_removable());
        assert!(!alpha.is_repeatable());
        assert!(alpha.field("enabled").is_some());

        let logging = root.section("logging").unwrap();
        assert!(!logging.is_repeatable());
        assert!(!logging.is_removable());
    }

    #[test]
    fn test_unmatched_config_excluded_from_view() {
        let (store, schema, catalog) = load(SCHEMA, |store| {
            store.root_mut().ensure_section("rogue").set_value("x", "1".into());
        });
        let root = merge(store.root(), schema.root(), &catalog, &Subscribers::new()).unwrap();
        assert!(root.section("rogue").is_none());
        // Preserved verbatim in the store.
        assert_eq!(
            store.section(&["rogue"]).unwrap().value("x"),
            Some(&"1".into())
        );
    }

    #[test]
    fn test_scalar_order_follows_declaration() {
        let (store, schema, catalog) = load(SCHEMA, |_| {});
        let root = merge(store.root(), schema.root(), &catalog, &Subscribers::new()).unwrap();
        let names: Vec<&str> = root.fields().iter().map(Field::name).collect();
        assert_eq!(names, ["retries", "label"]);
    }
}
