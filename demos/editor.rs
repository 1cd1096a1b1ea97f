use confbind::{ApplyMode, ConfigStore, Schema, Session, Value};

const SCHEMA: &str = "\
interval = float(default=1.0, min=0.1)  # poll interval, seconds
log_level = option('debug', 'info', 'warn', default='info')
[servers]
[[__many__]]
enabled = boolean(default=True)
host = ip_addr(default='127.0.0.1')
port = integer(default=8080, min=1, max=65535)
";

fn main() -> Result<(), confbind::Error> {
    let schema = Schema::parse(SCHEMA)?;

    let mut session = Session::builder()
        .with_store(ConfigStore::new())
        .with_schema(schema)
        .with_mode(ApplyMode::Deferred)
        .build()?;

    // Watch edits as they happen
    session.subscribe(|event| println!("changed: {:?} {:?}", event.path, event.kind));

    let root: [&str; 0] = [];
    session.set(&root, "interval", "2.5")?;
    session.add_section(&["servers"], "primary")?;
    session.set(&["servers", "primary"], "port", "9000")?;

    // Out-of-range input is rejected; the stored value is untouched
    assert!(session.set(&["servers", "primary"], "port", "70000").is_err());
    assert_eq!(
        session.get(&["servers", "primary"], "port")?,
        Value::Int(9000)
    );

    // Nothing reaches the original store until apply
    assert!(session.original().section(&["servers", "primary"]).is_none());
    session.apply();

    for server in session.root().section("servers").unwrap().sections() {
        println!("server {:?}:", server.name().unwrap());
        for field in server.fields() {
            println!(
                "  {} = {} (default: {})",
                field.name(),
                session.get(server.path(), field.name())?,
                field.is_default(session.store()),
            );
        }
    }

    Ok(())
}
