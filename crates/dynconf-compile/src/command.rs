//! Per-context command synthesis
//!
//! Each configuration context has its own administrative grammar. Values are
//! rendered with `Display`; string lists yield one command per element.

use std::collections::HashMap;

use dynconf_diff::{Change, Operation};
use dynconf_model::vocab::{singular_of, NAME_KEY};
use dynconf_model::{ConfigValue, KeyPath, Segment};

use crate::error::CompileError;
use crate::info::{log_sink_ids, node_sink_name, InfoSource};
use crate::order::XdrShape;

const SET_CONFIG: &str = "set-config:context=";
const NODE_ADDRESS_PORTS: &str = "node-address-ports";
const TYPED_INDEX_SECTIONS: &[&str] = &["index-type", "sindex-type"];
const REPORT_DATA_OP: &str = "log.report-data-op";
const REPORT_DATA_OP_ROLE: &str = "log.report-data-op-role";
const REPORT_DATA_OP_USER: &str = "log.report-data-op-user";

/// Builds commands for one compile run
///
/// Holds the sink table so the node is asked for it at most once.
pub(crate) struct Synthesizer<'a> {
    info: Option<&'a dyn InfoSource>,
    sinks: Option<HashMap<String, String>>,
}

impl<'a> Synthesizer<'a> {
    pub(crate) fn new(info: Option<&'a dyn InfoSource>) -> Self {
        Self { info, sinks: None }
    }

    pub(crate) fn commands(&mut self, key: &str, change: &Change) -> Result<Vec<String>, CompileError> {
        let path = KeyPath::parse(key);
        match path.context() {
            Some("namespaces") => namespace(key, &path, change),
            Some("security") => security(key, &path, change),
            Some("logging") => self.logging(key, &path, change),
            Some("xdr") => xdr(key, &path, change),
            Some(context) => {
                let field = dotted_fields(key, &path.segments()[1..])?;
                assignments(&format!("{SET_CONFIG}{context}"), &field, key, change)
            }
            None => Err(CompileError::malformed(key)),
        }
    }

    fn logging(&mut self, key: &str, path: &KeyPath, change: &Change) -> Result<Vec<String>, CompileError> {
        let [_, Segment::Instance(sink), Segment::Field(field)] = path.segments() else {
            return Err(CompileError::malformed(key));
        };
        if field == NAME_KEY {
            return Ok(Vec::new());
        }
        let id = self.sink_id(sink)?;
        assignments(&format!("log-set:id={id}"), field, key, change)
    }

    fn sink_id(&mut self, sink: &str) -> Result<String, CompileError> {
        if self.sinks.is_none() {
            let info = self.info.ok_or(CompileError::MissingInfoSource)?;
            self.sinks = Some(log_sink_ids(info)?);
        }
        let name = node_sink_name(sink);
        self.sinks
            .as_ref()
            .and_then(|sinks| sinks.get(name))
            .cloned()
            .ok_or_else(|| CompileError::UnknownLogSink(name.to_string()))
    }
}

fn render(key: &str, value: &ConfigValue) -> Result<Vec<String>, CompileError> {
    match value {
        ConfigValue::Scalar(scalar) => Ok(vec![scalar.to_string()]),
        ConfigValue::StringList(items) => Ok(items.clone()),
        ConfigValue::Nested(_) | ConfigValue::NestedList(_) => Err(CompileError::TransformUnsupported {
            key: key.to_string(),
            kind: value.kind(),
        }),
    }
}

/// `<base>;<field>=<value>` per update or added value
///
/// Removes have no generic command form and are skipped.
fn assignments(base: &str, field: &str, key: &str, change: &Change) -> Result<Vec<String>, CompileError> {
    let mut commands = Vec::new();
    for (op, value) in change.operations() {
        let values = render(key, value)?;
        match op {
            Operation::Update | Operation::Add => {
                commands.extend(values.into_iter().map(|v| format!("{base};{field}={v}")));
            }
            Operation::Remove => {
                tracing::warn!(%key, "field has no removal command, skipping remove");
            }
        }
    }
    Ok(commands)
}

/// Field segments joined with `.`; instance selectors are malformed here
fn dotted_fields(key: &str, segments: &[Segment]) -> Result<String, CompileError> {
    let fields = field_names(key, segments)?;
    Ok(fields.join("."))
}

fn field_names<'s>(key: &str, segments: &'s [Segment]) -> Result<Vec<&'s str>, CompileError> {
    if segments.is_empty() {
        return Err(CompileError::malformed(key));
    }
    segments
        .iter()
        .map(|s| s.as_field().ok_or_else(|| CompileError::malformed(key)))
        .collect()
}

/// Dotted field with its terminal segment in command form
fn singular_field(key: &str, segments: &[Segment]) -> Result<String, CompileError> {
    let mut fields = field_names(key, segments)?;
    if let Some(last) = fields.last_mut() {
        *last = singular_of(*last);
    }
    Ok(fields.join("."))
}

fn namespace(key: &str, path: &KeyPath, change: &Change) -> Result<Vec<String>, CompileError> {
    let (ns, rest) = match path.segments() {
        [_, Segment::Instance(ns), rest @ ..] => (ns, rest),
        _ => return Err(CompileError::malformed(key)),
    };
    let (set, rest) = match rest {
        [Segment::Field(sets), Segment::Instance(set), rest @ ..] if sets == "sets" => (Some(set), rest),
        _ => (None, rest),
    };

    let fields = field_names(key, rest)?;
    if fields == [NAME_KEY] {
        return Ok(Vec::new());
    }

    let mut base = format!("{SET_CONFIG}namespace;id={ns}");
    if let Some(set) = set {
        base.push_str(&format!(";set={set}"));
    }

    let (intermediate, terminal) = match fields.split_last() {
        Some((terminal, intermediate)) => (intermediate, singular_of(terminal)),
        None => return Err(CompileError::malformed(key)),
    };
    let field = match intermediate
        .iter()
        .rev()
        .find(|f| TYPED_INDEX_SECTIONS.contains(*f))
    {
        Some(section) => format!("{section}.{terminal}"),
        None => terminal.to_string(),
    };
    assignments(&base, &field, key, change)
}

fn security(key: &str, path: &KeyPath, change: &Change) -> Result<Vec<String>, CompileError> {
    let field = dotted_fields(key, &path.segments()[1..])?;
    let base = format!("{SET_CONFIG}security");
    if ![REPORT_DATA_OP, REPORT_DATA_OP_ROLE, REPORT_DATA_OP_USER].contains(&field.as_str()) {
        return assignments(&base, &field, key, change);
    }

    let mut commands = Vec::new();
    for (op, value) in change.operations() {
        let enable = op != Operation::Remove;
        for v in render(key, value)? {
            let target = audit_target(&field, &v);
            commands.push(format!("{base};{REPORT_DATA_OP}={enable};{target}"));
        }
    }
    Ok(commands)
}

/// Selector of a data-operation audit entry
fn audit_target(field: &str, value: &str) -> String {
    match field {
        REPORT_DATA_OP_ROLE => format!("role={value}"),
        REPORT_DATA_OP_USER => format!("user={value}"),
        _ => match value.split_once(':') {
            Some((ns, set)) => format!("namespace={ns};set={set}"),
            None => format!("namespace={value}"),
        },
    }
}

fn xdr(key: &str, path: &KeyPath, change: &Change) -> Result<Vec<String>, CompileError> {
    let base = format!("{SET_CONFIG}xdr");
    match XdrShape::of(path) {
        XdrShape::DcIdentity { dc } => {
            let mut commands = Vec::new();
            if change.has(Operation::Add) {
                commands.push(format!("{base};dc={dc};action=create"));
            }
            if change.has(Operation::Remove) {
                commands.push(format!("{base};dc={dc};action=delete"));
            }
            Ok(commands)
        }
        XdrShape::NamespaceIdentity { dc, ns } => {
            let mut commands = Vec::new();
            if change.has(Operation::Add) {
                commands.push(format!("{base};dc={dc};namespace={ns};action=add"));
            }
            if change.has(Operation::Remove) {
                commands.push(format!("{base};dc={dc};namespace={ns};action=remove"));
            }
            Ok(commands)
        }
        XdrShape::DcField { dc, field } if field == NODE_ADDRESS_PORTS => {
            let mut commands = Vec::new();
            for (op, value) in change.operations() {
                let action = if op == Operation::Remove { "remove" } else { "add" };
                for v in render(key, value)? {
                    commands.push(format!(
                        "{base};dc={dc};{}={v};action={action}",
                        singular_of(field)
                    ));
                }
            }
            Ok(commands)
        }
        XdrShape::DcField { dc, .. } | XdrShape::DcNested { dc } => {
            let field = singular_field(key, &path.segments()[3..])?;
            assignments(&format!("{base};dc={dc}"), &field, key, change)
        }
        XdrShape::NamespaceField { dc, ns } => {
            let field = singular_field(key, &path.segments()[5..])?;
            assignments(&format!("{base};dc={dc};namespace={ns}"), &field, key, change)
        }
        XdrShape::Root => {
            let field = singular_field(key, &path.segments()[1..])?;
            assignments(&base, &field, key, change)
        }
        XdrShape::Outside => Err(CompileError::malformed(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::{MockInfoSource, StaticInfo};
    use dynconf_model::ConfigTree;
    use dynconf_test_utils::string_list;
    use pretty_assertions::assert_eq;

    fn offline(key: &str, change: Change) -> Result<Vec<String>, CompileError> {
        Synthesizer::new(None).commands(key, &change)
    }

    #[test]
    fn service_and_network() {
        assert_eq!(
            offline("service.proto-fd-max", Change::update(20000_u64)).unwrap(),
            vec!["set-config:context=service;proto-fd-max=20000"]
        );
        assert_eq!(
            offline("network.heartbeat.interval", Change::update(250_u64)).unwrap(),
            vec!["set-config:context=network;heartbeat.interval=250"]
        );
    }

    #[test]
    fn list_values_one_command_each() {
        assert_eq!(
            offline("service.feature-key-files", Change::add(string_list(&["/a", "/b"]))).unwrap(),
            vec![
                "set-config:context=service;feature-key-files=/a",
                "set-config:context=service;feature-key-files=/b",
            ]
        );
    }

    #[test]
    fn namespace_and_set_fields() {
        assert_eq!(
            offline("namespaces.{test}.default-ttl", Change::update(3600_u64)).unwrap(),
            vec!["set-config:context=namespace;id=test;default-ttl=3600"]
        );
        assert_eq!(
            offline("namespaces.{test}.sets.{s1}.disable-eviction", Change::update(true)).unwrap(),
            vec!["set-config:context=namespace;id=test;set=s1;disable-eviction=true"]
        );
        assert_eq!(
            offline("namespaces.{test}.storage-engine.defrag-lwm-pct", Change::update(60_u64)).unwrap(),
            vec!["set-config:context=namespace;id=test;defrag-lwm-pct=60"]
        );
        assert_eq!(
            offline("namespaces.{test}.index-type.mounts-budget", Change::update(1024_u64)).unwrap(),
            vec!["set-config:context=namespace;id=test;index-type.mounts-budget=1024"]
        );
    }

    #[test]
    fn namespace_identity_emits_nothing() {
        assert!(offline("namespaces.{test}.name", Change::add("test")).unwrap().is_empty());
        assert!(offline("namespaces.{test}.sets.{s1}.name", Change::add("s1")).unwrap().is_empty());
    }

    #[test]
    fn namespace_list_removal_skipped() {
        let change = Change::from_lists(strings(&["a"]), strings(&["b"])).unwrap();
        assert_eq!(
            offline("namespaces.{test}.ignore-bins", change).unwrap(),
            vec!["set-config:context=namespace;id=test;ignore-bin=a"]
        );
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn security_generic_and_audit_forms() {
        assert_eq!(
            offline("security.privilege-refresh-period", Change::update(600_u64)).unwrap(),
            vec!["set-config:context=security;privilege-refresh-period=600"]
        );
        assert_eq!(
            offline("security.log.report-data-op-role", Change::from_lists(strings(&["r1"]), strings(&["r2"])).unwrap())
                .unwrap(),
            vec![
                "set-config:context=security;log.report-data-op=true;role=r1",
                "set-config:context=security;log.report-data-op=false;role=r2",
            ]
        );
        assert_eq!(
            offline("security.log.report-data-op-user", Change::add(string_list(&["u1"]))).unwrap(),
            vec!["set-config:context=security;log.report-data-op=true;user=u1"]
        );
        assert_eq!(
            offline("security.log.report-data-op", Change::add(string_list(&["ns1"]))).unwrap(),
            vec!["set-config:context=security;log.report-data-op=true;namespace=ns1"]
        );
    }

    #[test]
    fn xdr_dc_and_namespace_forms() {
        assert_eq!(
            offline("xdr.dcs.{DC1}.period-ms", Change::update(50_u64)).unwrap(),
            vec!["set-config:context=xdr;dc=DC1;period-ms=50"]
        );
        assert_eq!(
            offline("xdr.dcs.{DC1}.namespaces.{ns1}.ship-sets", Change::add(string_list(&["s1"]))).unwrap(),
            vec!["set-config:context=xdr;dc=DC1;namespace=ns1;ship-set=s1"]
        );
        assert!(offline("xdr.dcs.{DC1}.namespaces.{ns1}.ship-sets", Change::remove(string_list(&["s1"])))
            .unwrap()
            .is_empty());
        assert_eq!(
            offline("xdr.src-id", Change::update(7_u64)).unwrap(),
            vec!["set-config:context=xdr;src-id=7"]
        );
    }

    #[test]
    fn xdr_node_address_ports() {
        let change = Change::from_lists(strings(&["10.0.0.1:3000"]), strings(&["10.0.0.2:3000:tls1"])).unwrap();
        assert_eq!(
            offline("xdr.dcs.{DC1}.node-address-ports", change).unwrap(),
            vec![
                "set-config:context=xdr;dc=DC1;node-address-port=10.0.0.1:3000;action=add",
                "set-config:context=xdr;dc=DC1;node-address-port=10.0.0.2:3000:tls1;action=remove",
            ]
        );
    }

    #[test]
    fn logging_resolves_sink_once() {
        let mut info = MockInfoSource::new();
        info.expect_run_info()
            .withf(|command| command == "logs")
            .times(1)
            .returning(|_| {
                Ok([("0", "stderr"), ("1", "/var/log/aerospike.log")]
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect())
            });

        let mut synth = Synthesizer::new(Some(&info));
        assert_eq!(
            synth.commands("logging.{console}.any", &Change::update("info")).unwrap(),
            vec!["log-set:id=0;any=info"]
        );
        assert_eq!(
            synth
                .commands("logging.{/var/log/aerospike.log}.misc", &Change::update("debug"))
                .unwrap(),
            vec!["log-set:id=1;misc=debug"]
        );
    }

    #[test]
    fn logging_errors() {
        assert!(matches!(
            offline("logging.{console}.any", Change::update("info")),
            Err(CompileError::MissingInfoSource)
        ));

        let info = StaticInfo::new().with_log_sinks([("0", "stderr")]);
        let mut synth = Synthesizer::new(Some(&info));
        assert!(matches!(
            synth.commands("logging.{/tmp/x.log}.any", &Change::update("info")),
            Err(CompileError::UnknownLogSink(name)) if name == "/tmp/x.log"
        ));
        assert!(synth
            .commands("logging.{/tmp/x.log}.name", &Change::add("/tmp/x.log"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn nested_values_unsupported() {
        let change = Change::update(ConfigTree::new().with("a", 1_u64));
        assert!(matches!(
            offline("service.odd", change),
            Err(CompileError::TransformUnsupported { kind: "section", .. })
        ));
    }

    #[test]
    fn malformed_keys() {
        for key in ["", "namespaces.test.default-ttl", "logging.any", "service"] {
            assert!(
                matches!(offline(key, Change::update(1_u64)), Err(CompileError::MalformedKey(_))),
                "{key} should be malformed"
            );
        }
    }
}
